//! Physically based shading in both glTF workflows: metallic/roughness
//! and specular/glossiness. Direct light uses a Cook-Torrance lobe;
//! ambient light samples prefiltered environment maps through the
//! split-sum approximation. Supports normal/occlusion/emission maps,
//! shadow mapping, skinning, and a material-layer debug view.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::cache::Resources;
use crate::error::RenderResult;
use crate::framebuffer::Framebuffer;
use crate::math::{self, Mat3, Mat4, Vec2, Vec3, Vec4, PI};
use crate::mesh::{Mesh, Vertex};
use crate::model::{FrameData, Model};
use crate::pipeline::{Program, ShaderProgram, Varyings};
use crate::skeleton::Skeleton;
use crate::texture::{IblData, Texture, Usage};

use super::{
    acquire_optional, clamp_intensity, in_shadow, skin_model_matrix, skin_normal_matrix,
    tone_map, view_dir,
};

/// Dielectric reflectance at normal incidence.
const DIELECTRIC_SPECULAR: f32 = 0.04;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workflow {
    Metalness,
    Specular,
}

#[derive(Debug, Clone)]
pub struct PbrMaterial {
    pub workflow: Workflow,
    /* metallic/roughness workflow */
    pub basecolor_factor: Vec4,
    pub metalness_factor: f32,
    pub roughness_factor: f32,
    pub basecolor_map: Option<String>,
    pub metalness_map: Option<String>,
    pub roughness_map: Option<String>,
    /* specular/glossiness workflow */
    pub diffuse_factor: Vec4,
    pub specular_factor: Vec3,
    pub glossiness_factor: f32,
    pub diffuse_map: Option<String>,
    pub specular_map: Option<String>,
    pub glossiness_map: Option<String>,
    /* shared maps */
    pub normal_map: Option<String>,
    pub occlusion_map: Option<String>,
    pub emission_map: Option<String>,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
    pub enable_blend: bool,
}

impl PbrMaterial {
    pub fn metalness() -> PbrMaterial {
        PbrMaterial::new(Workflow::Metalness)
    }

    pub fn specular() -> PbrMaterial {
        PbrMaterial::new(Workflow::Specular)
    }

    fn new(workflow: Workflow) -> PbrMaterial {
        PbrMaterial {
            workflow,
            basecolor_factor: Vec4::new(1.0, 1.0, 1.0, 1.0),
            metalness_factor: 1.0,
            roughness_factor: 1.0,
            basecolor_map: None,
            metalness_map: None,
            roughness_map: None,
            diffuse_factor: Vec4::new(1.0, 1.0, 1.0, 1.0),
            specular_factor: Vec3::new(1.0, 1.0, 1.0),
            glossiness_factor: 1.0,
            diffuse_map: None,
            specular_map: None,
            glossiness_map: None,
            normal_map: None,
            occlusion_map: None,
            emission_map: None,
            alpha_cutoff: 0.0,
            double_sided: false,
            enable_blend: false,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PbrAttribs {
    pub position: Vec3,
    pub texcoord: Vec2,
    pub normal: Vec3,
    pub tangent: Vec4,
    pub joint: Vec4,
    pub weight: Vec4,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PbrVaryings {
    pub world_position: Vec3,
    pub depth_position: Vec3,
    pub texcoord: Vec2,
    pub world_normal: Vec3,
    pub world_tangent: Vec3,
    pub world_bitangent: Vec3,
}

impl Varyings for PbrVaryings {}

pub struct PbrUniforms {
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
    pub layer_view: Option<u32>,
    pub ibldata: Option<Arc<IblData>>,
    /* from material */
    pub workflow: Workflow,
    pub basecolor_factor: Vec4,
    pub metalness_factor: f32,
    pub roughness_factor: f32,
    pub basecolor_map: Option<Arc<Texture>>,
    pub metalness_map: Option<Arc<Texture>>,
    pub roughness_map: Option<Arc<Texture>>,
    pub diffuse_factor: Vec4,
    pub specular_factor: Vec3,
    pub glossiness_factor: f32,
    pub diffuse_map: Option<Arc<Texture>>,
    pub specular_map: Option<Arc<Texture>>,
    pub glossiness_map: Option<Arc<Texture>>,
    pub normal_map: Option<Arc<Texture>>,
    pub occlusion_map: Option<Arc<Texture>>,
    pub emission_map: Option<Arc<Texture>>,
    pub alpha_cutoff: f32,
}

impl Default for PbrUniforms {
    fn default() -> PbrUniforms {
        PbrUniforms {
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
            layer_view: None,
            ibldata: None,
            workflow: Workflow::Metalness,
            basecolor_factor: Vec4::new(1.0, 1.0, 1.0, 1.0),
            metalness_factor: 1.0,
            roughness_factor: 1.0,
            basecolor_map: None,
            metalness_map: None,
            roughness_map: None,
            diffuse_factor: Vec4::new(1.0, 1.0, 1.0, 1.0),
            specular_factor: Vec3::new(1.0, 1.0, 1.0),
            glossiness_factor: 1.0,
            diffuse_map: None,
            specular_map: None,
            glossiness_map: None,
            normal_map: None,
            occlusion_map: None,
            emission_map: None,
            alpha_cutoff: 0.0,
        }
    }
}

/// The sampled surface state a fragment shades with.
struct SurfaceMaterial {
    diffuse: Vec3,
    specular: Vec3,
    alpha: f32,
    roughness: f32,
    normal: Vec3,
    occlusion: f32,
    emission: Vec3,
}

pub struct PbrShader;

impl ShaderProgram for PbrShader {
    type Attribs = PbrAttribs;
    type Varyings = PbrVaryings;
    type Uniforms = PbrUniforms;

    fn attributes(vertex: &Vertex) -> PbrAttribs {
        PbrAttribs {
            position: vertex.position,
            texcoord: vertex.texcoord,
            normal: vertex.normal,
            tangent: vertex.tangent,
            joint: vertex.joint,
            weight: vertex.weight,
        }
    }

    fn vertex(attribs: &PbrAttribs, varyings: &mut PbrVaryings, uniforms: &PbrUniforms) -> Vec4 {
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
        let world_normal = normal_matrix * attribs.normal;

        if uniforms.normal_map.is_some() {
            let tangent_matrix = math::upper_left3(&model_matrix);
            let world_tangent = (tangent_matrix * attribs.tangent.xyz()).normalize();
            let world_normal = world_normal.normalize();
            let world_bitangent = world_normal.cross(&world_tangent) * attribs.tangent.w;

            varyings.world_normal = world_normal;
            varyings.world_tangent = world_tangent;
            varyings.world_bitangent = world_bitangent;
        } else {
            varyings.world_normal = world_normal.normalize();
        }

        varyings.world_position = world_position.xyz();
        varyings.depth_position = (uniforms.light_vp_matrix * world_position).xyz();
        varyings.texcoord = attribs.texcoord;
        uniforms.camera_vp_matrix * world_position
    }

    fn fragment(
        varyings: &PbrVaryings,
        uniforms: &PbrUniforms,
        discard: &mut bool,
        backface: bool,
    ) -> Vec4 {
        if uniforms.shadow_pass {
            return shadow_fragment(varyings, uniforms, discard);
        }

        let material = surface_material(varyings, uniforms, backface);
        if uniforms.alpha_cutoff > 0.0 && material.alpha < uniforms.alpha_cutoff {
            *discard = true;
            return Vec4::zeros();
        }
        if let Some(layer) = uniforms.layer_view {
            return layer_color(layer, &material);
        }

        let view = view_dir(&uniforms.camera_pos, &varyings.world_position);
        let light_dir = -uniforms.light_dir;
        let normal = material.normal;
        let n_dot_l = normal.dot(&light_dir);
        let mut color = material.emission;

        if uniforms.ambient_intensity > 0.0 {
            if let Some(ibldata) = &uniforms.ibldata {
                let shade = ibl_shade(&material, ibldata, &normal, &view);
                color += shade * uniforms.ambient_intensity;
            }
        }

        if uniforms.punctual_intensity > 0.0 && n_dot_l > 0.0 {
            let shadowed = in_shadow(
                uniforms.shadow_map.as_deref(),
                varyings.depth_position,
                n_dot_l,
            );
            if !shadowed {
                let shade = directional_shade(&material, &light_dir, &normal, &view);
                color += shade * uniforms.punctual_intensity;
            }
        }

        tone_map(color, material.alpha)
    }
}

fn shadow_fragment(varyings: &PbrVaryings, uniforms: &PbrUniforms, discard: &mut bool) -> Vec4 {
    if uniforms.alpha_cutoff > 0.0 {
        let (factor, map) = match uniforms.workflow {
            Workflow::Metalness => (uniforms.basecolor_factor.w, &uniforms.basecolor_map),
            Workflow::Specular => (uniforms.diffuse_factor.w, &uniforms.diffuse_map),
        };
        let mut alpha = factor;
        if let Some(map) = map {
            alpha *= map.sample(varyings.texcoord).w;
        }
        if alpha < uniforms.alpha_cutoff {
            *discard = true;
        }
    }
    Vec4::zeros()
}

fn max_component(v: &Vec3) -> f32 {
    v.x.max(v.y).max(v.z)
}

/// Metallic/roughness workflow: base color splits into a dielectric
/// diffuse part and a metal-tinted specular part.
fn metalness_material(uniforms: &PbrUniforms, texcoord: Vec2) -> SurfaceMaterial {
    let mut basecolor = uniforms.basecolor_factor.xyz();
    let mut alpha = uniforms.basecolor_factor.w;
    if let Some(map) = &uniforms.basecolor_map {
        let sample = map.sample(texcoord);
        basecolor = basecolor.component_mul(&sample.xyz());
        alpha *= sample.w;
    }

    let mut metalness = uniforms.metalness_factor;
    if let Some(map) = &uniforms.metalness_map {
        metalness *= map.sample(texcoord).x;
    }
    let mut roughness = uniforms.roughness_factor;
    if let Some(map) = &uniforms.roughness_map {
        roughness *= map.sample(texcoord).x;
    }

    let diffuse = basecolor * ((1.0 - DIELECTRIC_SPECULAR) * (1.0 - metalness));
    let specular = Vec3::repeat(DIELECTRIC_SPECULAR).lerp(&basecolor, metalness);

    SurfaceMaterial {
        diffuse,
        specular,
        alpha,
        roughness,
        normal: Vec3::zeros(),
        occlusion: 1.0,
        emission: Vec3::zeros(),
    }
}

/// Specular/glossiness workflow: diffuse and specular colors are authored
/// directly and glossiness is inverted into roughness.
fn specular_material(uniforms: &PbrUniforms, texcoord: Vec2) -> SurfaceMaterial {
    let mut diffuse = uniforms.diffuse_factor.xyz();
    let mut alpha = uniforms.diffuse_factor.w;
    if let Some(map) = &uniforms.diffuse_map {
        let sample = map.sample(texcoord);
        diffuse = diffuse.component_mul(&sample.xyz());
        alpha *= sample.w;
    }

    let mut specular = uniforms.specular_factor;
    if let Some(map) = &uniforms.specular_map {
        specular = specular.component_mul(&map.sample(texcoord).xyz());
    }
    let mut glossiness = uniforms.glossiness_factor;
    if let Some(map) = &uniforms.glossiness_map {
        glossiness *= map.sample(texcoord).x;
    }

    let diffuse = diffuse * (1.0 - max_component(&specular));

    SurfaceMaterial {
        diffuse,
        specular,
        alpha,
        roughness: 1.0 - glossiness,
        normal: Vec3::zeros(),
        occlusion: 1.0,
        emission: Vec3::zeros(),
    }
}

fn normal_dir(varyings: &PbrVaryings, uniforms: &PbrUniforms, backface: bool) -> Vec3 {
    let normal = if let Some(map) = &uniforms.normal_map {
        let sample = map.sample(varyings.texcoord);
        let tangent_normal = Vec3::new(
            sample.x * 2.0 - 1.0,
            sample.y * 2.0 - 1.0,
            sample.z * 2.0 - 1.0,
        );
        let tbn_matrix = Mat3::from_columns(&[
            varyings.world_tangent,
            varyings.world_bitangent,
            varyings.world_normal,
        ]);
        (tbn_matrix * tangent_normal).normalize()
    } else {
        varyings.world_normal.normalize()
    };
    if backface {
        -normal
    } else {
        normal
    }
}

fn surface_material(
    varyings: &PbrVaryings,
    uniforms: &PbrUniforms,
    backface: bool,
) -> SurfaceMaterial {
    let texcoord = varyings.texcoord;
    let mut material = match uniforms.workflow {
        Workflow::Metalness => metalness_material(uniforms, texcoord),
        Workflow::Specular => specular_material(uniforms, texcoord),
    };

    material.normal = normal_dir(varyings, uniforms, backface);
    if let Some(map) = &uniforms.occlusion_map {
        material.occlusion = map.sample(texcoord).x;
    }
    if let Some(map) = &uniforms.emission_map {
        material.emission = map.sample(texcoord).xyz();
    }
    material
}

/// Mirror of the view direction about the normal.
fn incident_dir(normal: &Vec3, view: &Vec3) -> Vec3 {
    normal * (2.0 * normal.dot(view)) - view
}

/// Split-sum image-based lighting: irradiance map for diffuse, the
/// roughness-matched prefiltered environment level scaled and biased by
/// the BRDF lookup table for specular.
fn ibl_shade(material: &SurfaceMaterial, ibldata: &IblData, normal: &Vec3, view: &Vec3) -> Vec3 {
    let diffuse_light = ibldata.diffuse.clamp_sample(*normal).xyz();
    let diffuse_shade = diffuse_light.component_mul(&(material.diffuse * material.occlusion));

    let n_dot_v = normal.dot(view);
    let lut_sample = ibldata.brdf_lut.clamp_sample(Vec2::new(n_dot_v, material.roughness));
    let specular_color = material.specular * lut_sample.x + Vec3::repeat(lut_sample.y);

    let incident = incident_dir(normal, view);
    let max_mip_level = ibldata.mip_levels() - 1;
    let specular_lod =
        ((material.roughness * max_mip_level as f32 + 0.5) as usize).min(max_mip_level);
    let specular_light = ibldata.specular[specular_lod].clamp_sample(incident).xyz();
    let specular_shade = specular_light.component_mul(&specular_color);

    diffuse_shade + specular_shade
}

/// Trowbridge-Reitz normal distribution.
fn distribution(n_dot_h: f32, alpha2: f32) -> f32 {
    let n_dot_h2 = n_dot_h * n_dot_h;
    let factor = n_dot_h2 * (alpha2 - 1.0) + 1.0;
    alpha2 / (PI * factor * factor)
}

/// Height-correlated Smith visibility.
fn visibility(n_dot_v: f32, n_dot_l: f32, alpha2: f32) -> f32 {
    let n_dot_v2 = n_dot_v * n_dot_v;
    let n_dot_l2 = n_dot_l * n_dot_l;
    let ggx_v = n_dot_l * (n_dot_v2 * (1.0 - alpha2) + alpha2).sqrt();
    let ggx_l = n_dot_v * (n_dot_l2 * (1.0 - alpha2) + alpha2).sqrt();
    0.5 / (ggx_v + ggx_l)
}

/// Schlick's Fresnel with a grazing reflectance derived from the specular
/// color's brightness.
fn fresnel(v_dot_h: f32, fresnel0: &Vec3) -> Vec3 {
    let factor = (1.0 - v_dot_h).powi(5);
    let fresnel90 = math::saturate(max_component(fresnel0) * 50.0);
    Vec3::new(
        fresnel0.x + (fresnel90 - fresnel0.x) * factor,
        fresnel0.y + (fresnel90 - fresnel0.y) * factor,
        fresnel0.z + (fresnel90 - fresnel0.z) * factor,
    )
}

/// Cook-Torrance direct lighting lobe, energy-balanced against a
/// Lambertian diffuse term.
fn directional_shade(
    material: &SurfaceMaterial,
    light_dir: &Vec3,
    normal: &Vec3,
    view: &Vec3,
) -> Vec3 {
    let n_dot_l = normal.dot(light_dir);
    let n_dot_v = normal.dot(view);
    if n_dot_l <= 0.0 || n_dot_v <= 0.0 {
        return Vec3::zeros();
    }

    let half_dir = (light_dir + view).normalize();
    let n_dot_h = normal.dot(&half_dir).max(0.0);
    let v_dot_h = view.dot(&half_dir).max(0.0);

    let alpha_roughness = material.roughness * material.roughness;
    let alpha2 = alpha_roughness * alpha_roughness;

    let d_term = distribution(n_dot_h, alpha2);
    let v_term = visibility(n_dot_v, n_dot_l, alpha2);
    let f_term = fresnel(v_dot_h, &material.specular);

    let diffuse_lobe = material.diffuse / PI;
    let specular_lobe = f_term * (v_term * d_term);

    let combined = Vec3::new(
        (1.0 - f_term.x) * diffuse_lobe.x + specular_lobe.x,
        (1.0 - f_term.y) * diffuse_lobe.y + specular_lobe.y,
        (1.0 - f_term.z) * diffuse_lobe.z + specular_lobe.z,
    );
    combined * n_dot_l
}

/// Debug visualization of one material layer.
fn layer_color(layer: u32, material: &SurfaceMaterial) -> Vec4 {
    let alpha = material.alpha;
    match layer {
        1 => tone_map(material.diffuse, alpha),
        2 => tone_map(material.specular, alpha),
        3 => Vec4::new(material.roughness, material.roughness, material.roughness, alpha),
        4 => Vec4::new(material.occlusion, material.occlusion, material.occlusion, alpha),
        _ => Vec4::new(
            material.normal.x * 0.5 + 0.5,
            material.normal.y * 0.5 + 0.5,
            material.normal.z * 0.5 + 0.5,
            alpha,
        ),
    }
}

/// A mesh drawn with [`PbrShader`] in either workflow.
pub struct PbrModel {
    mesh: Arc<Mesh>,
    skeleton: Option<Skeleton>,
    attachment: Option<usize>,
    program: Program<PbrShader>,
    transform: Mat4,
    opaque: bool,
    distance: f32,
}

impl PbrModel {
    pub fn new(
        resources: &mut Resources,
        mesh: &str,
        skeleton: Option<&str>,
        attachment: Option<usize>,
        transform: Mat4,
        environment: Option<(&str, usize)>,
        material: PbrMaterial,
    ) -> RenderResult<PbrModel> {
        let ibldata = match environment {
            Some((name, mip_levels)) => Some(resources.acquire_ibldata(name, mip_levels)?),
            None => None,
        };
        let uniforms = PbrUniforms {
            workflow: material.workflow,
            basecolor_factor: material.basecolor_factor,
            metalness_factor: material.metalness_factor,
            roughness_factor: material.roughness_factor,
            basecolor_map: acquire_optional(resources, &material.basecolor_map, Usage::HdrColor)?,
            metalness_map: acquire_optional(resources, &material.metalness_map, Usage::LdrData)?,
            roughness_map: acquire_optional(resources, &material.roughness_map, Usage::LdrData)?,
            diffuse_factor: material.diffuse_factor,
            specular_factor: material.specular_factor,
            glossiness_factor: material.glossiness_factor,
            diffuse_map: acquire_optional(resources, &material.diffuse_map, Usage::HdrColor)?,
            specular_map: acquire_optional(resources, &material.specular_map, Usage::HdrColor)?,
            glossiness_map: acquire_optional(resources, &material.glossiness_map, Usage::LdrData)?,
            normal_map: acquire_optional(resources, &material.normal_map, Usage::LdrData)?,
            occlusion_map: acquire_optional(resources, &material.occlusion_map, Usage::LdrData)?,
            emission_map: acquire_optional(resources, &material.emission_map, Usage::HdrColor)?,
            alpha_cutoff: material.alpha_cutoff,
            ibldata,
            ..PbrUniforms::default()
        };
        let skeleton = match skeleton {
            Some(path) => Some(resources.load_skeleton(path)?),
            None => None,
        };

        Ok(PbrModel {
            mesh: resources.acquire_mesh(mesh)?,
            skeleton,
            attachment,
            program: Program::new(uniforms, material.double_sided, material.enable_blend),
            transform,
            opaque: !material.enable_blend,
            distance: 0.0,
        })
    }

    pub fn uniforms_mut(&mut self) -> &mut PbrUniforms {
        &mut self.program.uniforms
    }
}

impl Model for PbrModel {
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
        uniforms.normal_matrix = math::inverse_transpose3(&math::upper_left3(&model_matrix));
        uniforms.light_vp_matrix = frame.light_proj_matrix * frame.light_view_matrix;
        uniforms.camera_vp_matrix = frame.camera_proj_matrix * frame.camera_view_matrix;
        uniforms.ambient_intensity = clamp_intensity(frame.ambient_intensity);
        uniforms.punctual_intensity = clamp_intensity(frame.punctual_intensity);
        uniforms.shadow_map = frame.shadow_map.clone();
        uniforms.layer_view = frame.layer_view;
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

    #[test]
    fn pure_metal_has_no_diffuse_lobe() {
        let mut uniforms = PbrUniforms::default();
        uniforms.basecolor_factor = Vec4::new(1.0, 0.8, 0.6, 1.0);
        uniforms.metalness_factor = 1.0;
        let material = metalness_material(&uniforms, Vec2::zeros());
        assert_relative_eq!(material.diffuse, Vec3::zeros(), epsilon = 1e-6);
        assert_relative_eq!(material.specular, Vec3::new(1.0, 0.8, 0.6), epsilon = 1e-6);
    }

    #[test]
    fn pure_dielectric_keeps_base_color_as_diffuse() {
        let mut uniforms = PbrUniforms::default();
        uniforms.basecolor_factor = Vec4::new(0.5, 0.5, 0.5, 1.0);
        uniforms.metalness_factor = 0.0;
        let material = metalness_material(&uniforms, Vec2::zeros());
        assert_relative_eq!(material.diffuse, Vec3::repeat(0.5 * 0.96), epsilon = 1e-6);
        assert_relative_eq!(
            material.specular,
            Vec3::repeat(DIELECTRIC_SPECULAR),
            epsilon = 1e-6
        );
    }

    #[test]
    fn glossiness_inverts_into_roughness() {
        let mut uniforms = PbrUniforms::default();
        uniforms.workflow = Workflow::Specular;
        uniforms.glossiness_factor = 0.7;
        uniforms.specular_factor = Vec3::zeros();
        let material = specular_material(&uniforms, Vec2::zeros());
        assert_relative_eq!(material.roughness, 0.3, epsilon = 1e-6);
    }

    #[test]
    fn fresnel_reaches_grazing_reflectance() {
        let f0 = Vec3::repeat(0.04);
        let head_on = fresnel(1.0, &f0);
        assert_relative_eq!(head_on, f0, epsilon = 1e-6);
        let grazing = fresnel(0.0, &f0);
        assert!(grazing.x > 0.9);
    }

    #[test]
    fn backface_flips_the_shading_normal() {
        let uniforms = PbrUniforms::default();
        let varyings = PbrVaryings {
            world_position: Vec3::zeros(),
            depth_position: Vec3::zeros(),
            texcoord: Vec2::zeros(),
            world_normal: Vec3::new(0.0, 0.0, 1.0),
            world_tangent: Vec3::zeros(),
            world_bitangent: Vec3::zeros(),
        };
        assert_eq!(normal_dir(&varyings, &uniforms, false), Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(normal_dir(&varyings, &uniforms, true), Vec3::new(0.0, 0.0, -1.0));
    }
}
