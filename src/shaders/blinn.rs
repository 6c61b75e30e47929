//! Blinn-Phong shading with diffuse/specular/emission maps, shadow
//! mapping, alpha cutoff and skinning.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::cache::Resources;
use crate::error::RenderResult;
use crate::framebuffer::Framebuffer;
use crate::math::{self, Mat3, Mat4, Vec2, Vec3, Vec4};
use crate::mesh::{Mesh, Vertex};
use crate::model::{FrameData, Model};
use crate::pipeline::{Program, ShaderProgram, Varyings};
use crate::skeleton::Skeleton;
use crate::texture::{Texture, Usage};

use super::{
    acquire_optional, clamp_intensity, in_shadow, skin_model_matrix, skin_normal_matrix,
    view_dir,
};

#[derive(Debug, Clone)]
pub struct BlinnMaterial {
    pub basecolor: Vec4,
    pub shininess: f32,
    pub diffuse_map: Option<String>,
    pub specular_map: Option<String>,
    pub emission_map: Option<String>,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
    pub enable_blend: bool,
}

impl Default for BlinnMaterial {
    fn default() -> BlinnMaterial {
        BlinnMaterial {
            basecolor: Vec4::new(1.0, 1.0, 1.0, 1.0),
            shininess: 32.0,
            diffuse_map: None,
            specular_map: None,
            emission_map: None,
            alpha_cutoff: 0.0,
            double_sided: false,
            enable_blend: false,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BlinnAttribs {
    pub position: Vec3,
    pub texcoord: Vec2,
    pub normal: Vec3,
    pub joint: Vec4,
    pub weight: Vec4,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BlinnVaryings {
    pub world_position: Vec3,
    pub depth_position: Vec3,
    pub texcoord: Vec2,
    pub normal: Vec3,
}

impl Varyings for BlinnVaryings {}

pub struct BlinnUniforms {
    pub light_dir: Vec3,
    pub camera_pos: Vec3,
    pub model_matrix: Mat4,
    pub normal_matrix: Mat3,
    pub light_vp_matrix: Mat4,
    pub camera_vp_matrix: Mat4,
    pub joint_matrices: Vec<Mat4>,
    pub joint_normal_matrices: Vec<Mat3>,
    pub ambient_intensity: f32,
    pub punctual_intensity: f32,
    pub shadow_map: Option<Arc<Texture>>,
    pub shadow_pass: bool,
    /* from material */
    pub basecolor: Vec4,
    pub shininess: f32,
    pub diffuse_map: Option<Arc<Texture>>,
    pub specular_map: Option<Arc<Texture>>,
    pub emission_map: Option<Arc<Texture>>,
    pub alpha_cutoff: f32,
}

impl Default for BlinnUniforms {
    fn default() -> BlinnUniforms {
        BlinnUniforms {
            light_dir: Vec3::new(0.0, 0.0, -1.0),
            camera_pos: Vec3::zeros(),
            model_matrix: Mat4::identity(),
            normal_matrix: Mat3::identity(),
            light_vp_matrix: Mat4::identity(),
            camera_vp_matrix: Mat4::identity(),
            joint_matrices: Vec::new(),
            joint_normal_matrices: Vec::new(),
            ambient_intensity: 1.0,
            punctual_intensity: 1.0,
            shadow_map: None,
            shadow_pass: false,
            basecolor: Vec4::new(1.0, 1.0, 1.0, 1.0),
            shininess: 32.0,
            diffuse_map: None,
            specular_map: None,
            emission_map: None,
            alpha_cutoff: 0.0,
        }
    }
}

pub struct BlinnShader;

impl ShaderProgram for BlinnShader {
    type Attribs = BlinnAttribs;
    type Varyings = BlinnVaryings;
    type Uniforms = BlinnUniforms;

    fn attributes(vertex: &Vertex) -> BlinnAttribs {
        BlinnAttribs {
            position: vertex.position,
            texcoord: vertex.texcoord,
            normal: vertex.normal,
            joint: vertex.joint,
            weight: vertex.weight,
        }
    }

    fn vertex(attribs: &BlinnAttribs, varyings: &mut BlinnVaryings, uniforms: &BlinnUniforms) -> Vec4 {
        let model_matrix = skin_model_matrix(
            &uniforms.model_matrix,
            &uniforms.joint_matrices,
            attribs.joint,
            attribs.weight,
        );
        let world_position = model_matrix * attribs.position.push(1.0);

        if uniforms.shadow_pass {
            varyings.texcoord = attribs.texcoord;
            return uniforms.light_vp_matrix * world_position;
        }

        let normal_matrix = skin_normal_matrix(
            &uniforms.normal_matrix,
            &uniforms.joint_normal_matrices,
            attribs.joint,
            attribs.weight,
        );
        varyings.world_position = world_position.xyz();
        varyings.depth_position = (uniforms.light_vp_matrix * world_position).xyz();
        varyings.texcoord = attribs.texcoord;
        varyings.normal = (normal_matrix * attribs.normal).normalize();
        uniforms.camera_vp_matrix * world_position
    }

    fn fragment(
        varyings: &BlinnVaryings,
        uniforms: &BlinnUniforms,
        discard: &mut bool,
        _backface: bool,
    ) -> Vec4 {
        if uniforms.shadow_pass {
            return shadow_fragment(varyings, uniforms, discard);
        }

        let (basecolor, alpha) = base_color(varyings, uniforms);
        if uniforms.alpha_cutoff > 0.0 && alpha < uniforms.alpha_cutoff {
            *discard = true;
            return Vec4::zeros();
        }

        let mut color = basecolor * uniforms.ambient_intensity;
        if uniforms.punctual_intensity > 0.0 {
            color += directional_shade(varyings, uniforms, basecolor) * uniforms.punctual_intensity;
        }
        if let Some(map) = &uniforms.emission_map {
            color += map.sample(varyings.texcoord).xyz();
        }
        color.push(alpha)
    }
}

fn shadow_fragment(varyings: &BlinnVaryings, uniforms: &BlinnUniforms, discard: &mut bool) -> Vec4 {
    if uniforms.alpha_cutoff > 0.0 {
        let mut alpha = uniforms.basecolor.w;
        if let Some(map) = &uniforms.diffuse_map {
            alpha *= map.sample(varyings.texcoord).w;
        }
        if alpha < uniforms.alpha_cutoff {
            *discard = true;
        }
    }
    Vec4::zeros()
}

fn base_color(varyings: &BlinnVaryings, uniforms: &BlinnUniforms) -> (Vec3, f32) {
    let mut basecolor = uniforms.basecolor.xyz();
    let mut alpha = uniforms.basecolor.w;
    if let Some(map) = &uniforms.diffuse_map {
        let sample = map.sample(varyings.texcoord);
        basecolor = basecolor.component_mul(&sample.xyz());
        alpha *= sample.w;
    }
    (basecolor, alpha)
}

/// Surface normal oriented toward the viewer, so double-sided geometry is
/// lit from whichever side faces the camera.
fn normal_dir(varyings: &BlinnVaryings, view: &Vec3) -> Vec3 {
    let normal = varyings.normal.normalize();
    if normal.dot(view) < 0.0 {
        -normal
    } else {
        normal
    }
}

fn directional_shade(varyings: &BlinnVaryings, uniforms: &BlinnUniforms, basecolor: Vec3) -> Vec3 {
    let light_dir = -uniforms.light_dir;
    let view = view_dir(&uniforms.camera_pos, &varyings.world_position);
    let normal = normal_dir(varyings, &view);
    let n_dot_l = normal.dot(&light_dir);

    let shadowed = in_shadow(
        uniforms.shadow_map.as_deref(),
        varyings.depth_position,
        n_dot_l,
    );
    if n_dot_l <= 0.0 || shadowed {
        return Vec3::zeros();
    }

    let diffuse = basecolor * n_dot_l;
    let mut specular = Vec3::zeros();
    if let Some(map) = &uniforms.specular_map {
        let half_dir = (light_dir + view).normalize();
        let closeness = normal.dot(&half_dir);
        if closeness > 0.0 {
            let strength = closeness.powf(uniforms.shininess);
            specular = map.sample(varyings.texcoord).xyz() * strength;
        }
    }
    diffuse + specular
}

/// A mesh drawn with [`BlinnShader`].
pub struct BlinnModel {
    mesh: Arc<Mesh>,
    skeleton: Option<Skeleton>,
    attachment: Option<usize>,
    program: Program<BlinnShader>,
    transform: Mat4,
    opaque: bool,
    distance: f32,
}

impl BlinnModel {
    pub fn new(
        resources: &mut Resources,
        mesh: &str,
        skeleton: Option<&str>,
        attachment: Option<usize>,
        transform: Mat4,
        material: BlinnMaterial,
    ) -> RenderResult<BlinnModel> {
        let uniforms = BlinnUniforms {
            basecolor: material.basecolor,
            shininess: material.shininess,
            diffuse_map: acquire_optional(resources, &material.diffuse_map, Usage::LdrColor)?,
            specular_map: acquire_optional(resources, &material.specular_map, Usage::LdrColor)?,
            emission_map: acquire_optional(resources, &material.emission_map, Usage::LdrColor)?,
            alpha_cutoff: material.alpha_cutoff,
            ..BlinnUniforms::default()
        };
        let skeleton = match skeleton {
            Some(path) => Some(resources.load_skeleton(path)?),
            None => None,
        };

        Ok(BlinnModel {
            mesh: resources.acquire_mesh(mesh)?,
            skeleton,
            attachment,
            program: Program::new(uniforms, material.double_sided, material.enable_blend),
            transform,
            opaque: !material.enable_blend,
            distance: 0.0,
        })
    }

    pub fn uniforms_mut(&mut self) -> &mut BlinnUniforms {
        &mut self.program.uniforms
    }
}

impl Model for BlinnModel {
    fn update(&mut self, frame: &FrameData) {
        let mut model_matrix = self.transform;
        let uniforms = &mut self.program.uniforms;
        uniforms.joint_matrices.clear();
        uniforms.joint_normal_matrices.clear();
        if let Some(skeleton) = &mut self.skeleton {
            skeleton.update_joints(frame.frame_time);
            if let Some(joint) = self.attachment {
                model_matrix *= skeleton.joint_matrices()[joint];
            } else {
                uniforms.joint_matrices.extend_from_slice(skeleton.joint_matrices());
                uniforms
                    .joint_normal_matrices
                    .extend_from_slice(skeleton.normal_matrices());
            }
        }

        uniforms.light_dir = frame.light_dir;
        uniforms.camera_pos = frame.camera_pos;
        uniforms.model_matrix = model_matrix;
        uniforms.normal_matrix = math::upper_left3(&math::inverse_transpose(&model_matrix));
        uniforms.light_vp_matrix = frame.light_proj_matrix * frame.light_view_matrix;
        uniforms.camera_vp_matrix = frame.camera_proj_matrix * frame.camera_view_matrix;
        uniforms.ambient_intensity = clamp_intensity(frame.ambient_intensity);
        uniforms.punctual_intensity = clamp_intensity(frame.punctual_intensity);
        uniforms.shadow_map = frame.shadow_map.clone();
    }

    fn draw(&mut self, framebuffer: &mut Framebuffer, shadow_pass: bool) {
        self.program.uniforms.shadow_pass = shadow_pass;
        let mesh = Arc::clone(&self.mesh);
        self.program.draw_mesh(framebuffer, &mesh);
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

    use approx::assert_relative_eq;

    fn flat_varyings() -> BlinnVaryings {
        BlinnVaryings {
            world_position: Vec3::zeros(),
            depth_position: Vec3::zeros(),
            texcoord: Vec2::zeros(),
            normal: Vec3::new(0.0, 0.0, 1.0),
        }
    }

    #[test]
    fn rigid_vertex_is_projected_by_the_view_projection() {
        let mut uniforms = BlinnUniforms::default();
        uniforms.camera_vp_matrix = math::perspective(math::PI / 2.0, 1.0, 0.1, 10.0);
        let attribs = BlinnAttribs {
            position: Vec3::new(0.0, 0.0, -1.0),
            texcoord: Vec2::zeros(),
            normal: Vec3::new(0.0, 0.0, 1.0),
            joint: Vec4::zeros(),
            weight: Vec4::zeros(),
        };
        let mut varyings = Zeroable::zeroed();
        let clip = BlinnShader::vertex(&attribs, &mut varyings, &uniforms);
        let expected = uniforms.camera_vp_matrix * Vec4::new(0.0, 0.0, -1.0, 1.0);
        assert_relative_eq!(clip, expected, epsilon = 1e-6);
        assert_relative_eq!(varyings.world_position, attribs.position, epsilon = 1e-6);
    }

    #[test]
    fn head_on_light_shades_at_full_strength() {
        let mut uniforms = BlinnUniforms::default();
        uniforms.light_dir = Vec3::new(0.0, 0.0, -1.0);
        uniforms.camera_pos = Vec3::new(0.0, 0.0, 5.0);
        let shade = directional_shade(&flat_varyings(), &uniforms, Vec3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(shade, Vec3::new(1.0, 1.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn back_lit_surfaces_receive_no_punctual_light() {
        let mut uniforms = BlinnUniforms::default();
        uniforms.light_dir = Vec3::new(0.0, 0.0, 1.0);
        uniforms.camera_pos = Vec3::new(0.0, 0.0, 5.0);
        let shade = directional_shade(&flat_varyings(), &uniforms, Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(shade, Vec3::zeros());
    }

    #[test]
    fn alpha_cutoff_discards_transparent_fragments() {
        let mut uniforms = BlinnUniforms::default();
        uniforms.basecolor = Vec4::new(1.0, 1.0, 1.0, 0.1);
        uniforms.alpha_cutoff = 0.5;
        let mut discard = false;
        BlinnShader::fragment(&flat_varyings(), &uniforms, &mut discard, false);
        assert!(discard);
    }
}
