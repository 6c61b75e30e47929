//! Unlit shading: a constant factor, optionally modulated by a texture.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::cache::Resources;
use crate::error::RenderResult;
use crate::framebuffer::Framebuffer;
use crate::math::{Mat4, Vec2, Vec3, Vec4};
use crate::mesh::{Mesh, Vertex};
use crate::model::{FrameData, Model};
use crate::pipeline::{Program, ShaderProgram, Varyings};
use crate::texture::{Texture, Usage};

use super::acquire_optional;

#[derive(Debug, Clone)]
pub struct UnlitMaterial {
    pub factor: Vec4,
    pub texture: Option<String>,
    pub double_sided: bool,
    pub enable_blend: bool,
}

impl Default for UnlitMaterial {
    fn default() -> UnlitMaterial {
        UnlitMaterial {
            factor: Vec4::new(1.0, 1.0, 1.0, 1.0),
            texture: None,
            double_sided: false,
            enable_blend: false,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct UnlitAttribs {
    pub position: Vec3,
    pub texcoord: Vec2,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct UnlitVaryings {
    pub texcoord: Vec2,
}

impl Varyings for UnlitVaryings {}

pub struct UnlitUniforms {
    pub mvp_matrix: Mat4,
    pub factor: Vec4,
    pub texture: Option<Arc<Texture>>,
}

pub struct UnlitShader;

impl ShaderProgram for UnlitShader {
    type Attribs = UnlitAttribs;
    type Varyings = UnlitVaryings;
    type Uniforms = UnlitUniforms;

    fn attributes(vertex: &Vertex) -> UnlitAttribs {
        UnlitAttribs {
            position: vertex.position,
            texcoord: vertex.texcoord,
        }
    }

    fn vertex(attribs: &UnlitAttribs, varyings: &mut UnlitVaryings, uniforms: &UnlitUniforms) -> Vec4 {
        varyings.texcoord = attribs.texcoord;
        uniforms.mvp_matrix * attribs.position.push(1.0)
    }

    fn fragment(
        varyings: &UnlitVaryings,
        uniforms: &UnlitUniforms,
        _discard: &mut bool,
        _backface: bool,
    ) -> Vec4 {
        let mut color = uniforms.factor;
        if let Some(texture) = &uniforms.texture {
            color = color.component_mul(&texture.sample(varyings.texcoord));
        }
        color
    }
}

/// A mesh drawn with [`UnlitShader`].
pub struct UnlitModel {
    mesh: Arc<Mesh>,
    program: Program<UnlitShader>,
    transform: Mat4,
    opaque: bool,
    distance: f32,
}

impl UnlitModel {
    pub fn new(
        resources: &mut Resources,
        mesh: &str,
        transform: Mat4,
        material: UnlitMaterial,
    ) -> RenderResult<UnlitModel> {
        let uniforms = UnlitUniforms {
            mvp_matrix: Mat4::identity(),
            factor: material.factor,
            texture: acquire_optional(resources, &material.texture, Usage::LdrColor)?,
        };
        Ok(UnlitModel {
            mesh: resources.acquire_mesh(mesh)?,
            program: Program::new(uniforms, material.double_sided, material.enable_blend),
            transform,
            opaque: !material.enable_blend,
            distance: 0.0,
        })
    }
}

impl Model for UnlitModel {
    fn update(&mut self, frame: &FrameData) {
        self.program.uniforms.mvp_matrix =
            frame.camera_proj_matrix * frame.camera_view_matrix * self.transform;
    }

    fn draw(&mut self, framebuffer: &mut Framebuffer, shadow_pass: bool) {
        if !shadow_pass {
            let mesh = Arc::clone(&self.mesh);
            self.program.draw_mesh(framebuffer, &mesh);
        }
    }

    fn opaque(&self) -> bool {
        self.opaque
    }

    fn transform(&self) -> &Mat4 {
        &self.transform
    }

    fn center(&self) -> Vec3 {
        self.mesh.center()
    }

    fn distance(&self) -> f32 {
        self.distance
    }

    fn set_distance(&mut self, distance: f32) {
        self.distance = distance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_returns_the_factor_without_a_texture() {
        let uniforms = UnlitUniforms {
            mvp_matrix: Mat4::identity(),
            factor: Vec4::new(0.25, 0.5, 0.75, 1.0),
            texture: None,
        };
        let varyings = UnlitVaryings {
            texcoord: Vec2::zeros(),
        };
        let mut discard = false;
        let color = UnlitShader::fragment(&varyings, &uniforms, &mut discard, false);
        assert_eq!(color, uniforms.factor);
        assert!(!discard);
    }
}
