//! Skybox rendering: a unit box sampled by direction, with its depth
//! pinned to the far plane so every scene fragment wins the depth test
//! against it.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::cache::Resources;
use crate::error::RenderResult;
use crate::framebuffer::Framebuffer;
use crate::math::{Mat4, Vec3, Vec4, EPSILON};
use crate::mesh::{Mesh, Vertex};
use crate::model::{FrameData, Model};
use crate::pipeline::{Program, ShaderProgram, Varyings};
use crate::texture::Cubemap;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SkyboxAttribs {
    pub position: Vec3,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SkyboxVaryings {
    pub direction: Vec3,
}

impl Varyings for SkyboxVaryings {}

pub struct SkyboxUniforms {
    pub vp_matrix: Mat4,
    pub skybox: Arc<Cubemap>,
}

pub struct SkyboxShader;

impl ShaderProgram for SkyboxShader {
    type Attribs = SkyboxAttribs;
    type Varyings = SkyboxVaryings;
    type Uniforms = SkyboxUniforms;

    fn attributes(vertex: &Vertex) -> SkyboxAttribs {
        SkyboxAttribs {
            position: vertex.position,
        }
    }

    fn vertex(
        attribs: &SkyboxAttribs,
        varyings: &mut SkyboxVaryings,
        uniforms: &SkyboxUniforms,
    ) -> Vec4 {
        let mut clip_position = uniforms.vp_matrix * attribs.position.push(1.0);
        // z = w maps to the far plane after the divide; back off slightly so
        // the far clip keeps the fragment
        clip_position.z = clip_position.w * (1.0 - EPSILON);
        varyings.direction = attribs.position;
        clip_position
    }

    fn fragment(
        varyings: &SkyboxVaryings,
        uniforms: &SkyboxUniforms,
        _discard: &mut bool,
        _backface: bool,
    ) -> Vec4 {
        uniforms.skybox.sample(varyings.direction)
    }
}

/// The environment box drawn around a scene.
pub struct SkyboxModel {
    mesh: Arc<Mesh>,
    program: Program<SkyboxShader>,
    transform: Mat4,
    distance: f32,
}

impl SkyboxModel {
    pub fn new(resources: &mut Resources, env_name: &str, blur_level: usize) -> RenderResult<SkyboxModel> {
        let uniforms = SkyboxUniforms {
            vp_matrix: Mat4::identity(),
            skybox: resources.acquire_skybox(env_name, blur_level)?,
        };
        Ok(SkyboxModel {
            mesh: resources.acquire_mesh("common/box.obj")?,
            // the box is seen from inside, so winding is reversed
            program: Program::new(uniforms, true, false),
            transform: Mat4::identity(),
            distance: 0.0,
        })
    }
}

impl Model for SkyboxModel {
    fn update(&mut self, frame: &FrameData) {
        let mut view_matrix = frame.camera_view_matrix;
        // the skybox follows the camera: drop the translation column
        view_matrix[(0, 3)] = 0.0;
        view_matrix[(1, 3)] = 0.0;
        view_matrix[(2, 3)] = 0.0;
        self.program.uniforms.vp_matrix = frame.camera_proj_matrix * view_matrix;
    }

    fn draw(&mut self, framebuffer: &mut Framebuffer, shadow_pass: bool) {
        if !shadow_pass {
            let mesh = Arc::clone(&self.mesh);
            self.program.draw_mesh(framebuffer, &mesh);
        }
    }

    fn opaque(&self) -> bool {
        true
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
