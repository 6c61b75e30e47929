//! Minimal skinned shading: vertices deform by their blended joint
//! matrices, fragments are an unlit factor-times-texture with an alpha
//! cutoff.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::cache::Resources;
use crate::error::RenderResult;
use crate::framebuffer::Framebuffer;
use crate::math::{self, Mat4, Vec2, Vec3, Vec4};
use crate::mesh::{Mesh, Vertex};
use crate::model::{FrameData, Model};
use crate::pipeline::{Program, ShaderProgram, Varyings};
use crate::skeleton::Skeleton;
use crate::texture::{Texture, Usage};

use super::acquire_optional;

#[derive(Debug, Clone)]
pub struct SkinningMaterial {
    pub factor: Vec4,
    pub alpha_cutoff: f32,
    pub texture: Option<String>,
    pub double_sided: bool,
    pub enable_blend: bool,
}

impl Default for SkinningMaterial {
    fn default() -> SkinningMaterial {
        SkinningMaterial {
            factor: Vec4::new(1.0, 1.0, 1.0, 1.0),
            alpha_cutoff: 0.0,
            texture: None,
            double_sided: false,
            enable_blend: false,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SkinningAttribs {
    pub position: Vec3,
    pub texcoord: Vec2,
    pub joint: Vec4,
    pub weight: Vec4,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SkinningVaryings {
    pub texcoord: Vec2,
}

impl Varyings for SkinningVaryings {}

pub struct SkinningUniforms {
    pub mvp_matrix: Mat4,
    pub joint_matrices: Vec<Mat4>,
    pub factor: Vec4,
    pub alpha_cutoff: f32,
    pub texture: Option<Arc<Texture>>,
}

pub struct SkinningShader;

impl ShaderProgram for SkinningShader {
    type Attribs = SkinningAttribs;
    type Varyings = SkinningVaryings;
    type Uniforms = SkinningUniforms;

    fn attributes(vertex: &Vertex) -> SkinningAttribs {
        SkinningAttribs {
            position: vertex.position,
            texcoord: vertex.texcoord,
            joint: vertex.joint,
            weight: vertex.weight,
        }
    }

    fn vertex(
        attribs: &SkinningAttribs,
        varyings: &mut SkinningVaryings,
        uniforms: &SkinningUniforms,
    ) -> Vec4 {
        let position = attribs.position.push(1.0);
        let skinned = if uniforms.joint_matrices.is_empty() {
            position
        } else {
            let joints = [
                uniforms.joint_matrices[attribs.joint.x as usize],
                uniforms.joint_matrices[attribs.joint.y as usize],
                uniforms.joint_matrices[attribs.joint.z as usize],
                uniforms.joint_matrices[attribs.joint.w as usize],
            ];
            math::combine4(&joints, attribs.weight) * position
        };
        varyings.texcoord = attribs.texcoord;
        uniforms.mvp_matrix * skinned
    }

    fn fragment(
        varyings: &SkinningVaryings,
        uniforms: &SkinningUniforms,
        discard: &mut bool,
        _backface: bool,
    ) -> Vec4 {
        let mut color = uniforms.factor;
        if let Some(texture) = &uniforms.texture {
            color = color.component_mul(&texture.sample(varyings.texcoord));
        }
        if uniforms.alpha_cutoff > 0.0 && color.w < uniforms.alpha_cutoff {
            *discard = true;
            return Vec4::zeros();
        }
        color
    }
}

/// A skeleton-deformed mesh drawn with [`SkinningShader`].
pub struct SkinningModel {
    mesh: Arc<Mesh>,
    skeleton: Skeleton,
    program: Program<SkinningShader>,
    transform: Mat4,
    opaque: bool,
    distance: f32,
}

impl SkinningModel {
    pub fn new(
        resources: &mut Resources,
        mesh: &str,
        skeleton: &str,
        transform: Mat4,
        material: SkinningMaterial,
    ) -> RenderResult<SkinningModel> {
        let uniforms = SkinningUniforms {
            mvp_matrix: Mat4::identity(),
            joint_matrices: Vec::new(),
            factor: material.factor,
            alpha_cutoff: material.alpha_cutoff,
            texture: acquire_optional(resources, &material.texture, Usage::LdrColor)?,
        };
        Ok(SkinningModel {
            mesh: resources.acquire_mesh(mesh)?,
            skeleton: resources.load_skeleton(skeleton)?,
            program: Program::new(uniforms, material.double_sided, material.enable_blend),
            transform,
            opaque: !material.enable_blend,
            distance: 0.0,
        })
    }
}

impl Model for SkinningModel {
    fn update(&mut self, frame: &FrameData) {
        self.skeleton.update_joints(frame.frame_time);
        let uniforms = &mut self.program.uniforms;
        uniforms.joint_matrices.clear();
        uniforms
            .joint_matrices
            .extend_from_slice(self.skeleton.joint_matrices());
        uniforms.mvp_matrix =
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
    fn identity_joints_leave_positions_untouched() {
        let uniforms = SkinningUniforms {
            mvp_matrix: Mat4::identity(),
            joint_matrices: vec![Mat4::identity(); 2],
            factor: Vec4::new(1.0, 1.0, 1.0, 1.0),
            alpha_cutoff: 0.0,
            texture: None,
        };
        let attribs = SkinningAttribs {
            position: Vec3::new(0.5, -0.25, 2.0),
            texcoord: Vec2::zeros(),
            joint: Vec4::new(0.0, 1.0, 0.0, 0.0),
            weight: Vec4::new(0.5, 0.5, 0.0, 0.0),
        };
        let mut varyings = SkinningVaryings {
            texcoord: Vec2::zeros(),
        };
        let clip = SkinningShader::vertex(&attribs, &mut varyings, &uniforms);
        assert_eq!(clip, Vec4::new(0.5, -0.25, 2.0, 1.0));
    }

    #[test]
    fn cutoff_discards_low_alpha() {
        let uniforms = SkinningUniforms {
            mvp_matrix: Mat4::identity(),
            joint_matrices: Vec::new(),
            factor: Vec4::new(1.0, 1.0, 1.0, 0.25),
            alpha_cutoff: 0.5,
            texture: None,
        };
        let varyings = SkinningVaryings {
            texcoord: Vec2::zeros(),
        };
        let mut discard = false;
        SkinningShader::fragment(&varyings, &uniforms, &mut discard, false);
        assert!(discard);
    }
}
