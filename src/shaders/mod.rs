//! Reference shader programs exercising the pipeline, plus the helpers
//! they share: skinning matrix blends, the shadow-map test, and tone
//! mapping.

use std::sync::Arc;

use crate::cache::Resources;
use crate::error::RenderResult;
use crate::math::{self, Mat3, Mat4, Vec2, Vec3, Vec4};
use crate::texture::{Texture, Usage};

pub mod blinn;
pub mod pbr;
pub mod skinning;
pub mod skybox;
pub mod unlit;

/// Blends the four joint matrices referenced by a vertex and folds the
/// result into the model matrix. An empty matrix slice means the mesh is
/// rigid and the model matrix is returned unchanged.
pub fn skin_model_matrix(
    model_matrix: &Mat4,
    joint_matrices: &[Mat4],
    joint: Vec4,
    weight: Vec4,
) -> Mat4 {
    if joint_matrices.is_empty() {
        return *model_matrix;
    }
    let joints = [
        joint_matrices[joint.x as usize],
        joint_matrices[joint.y as usize],
        joint_matrices[joint.z as usize],
        joint_matrices[joint.w as usize],
    ];
    model_matrix * math::combine4(&joints, weight)
}

/// Normal-matrix companion of [`skin_model_matrix`].
pub fn skin_normal_matrix(
    normal_matrix: &Mat3,
    joint_normal_matrices: &[Mat3],
    joint: Vec4,
    weight: Vec4,
) -> Mat3 {
    if joint_normal_matrices.is_empty() {
        return *normal_matrix;
    }
    let joints = [
        joint_normal_matrices[joint.x as usize],
        joint_normal_matrices[joint.y as usize],
        joint_normal_matrices[joint.z as usize],
        joint_normal_matrices[joint.w as usize],
    ];
    normal_matrix * math::combine3(&joints, weight)
}

/// Shadow-map test in light space. `depth_position` is the NDC position
/// under the light's view-projection; the bias scales with the surface
/// angle to avoid shadow acne on grazing geometry.
pub fn in_shadow(shadow_map: Option<&Texture>, depth_position: Vec3, n_dot_l: f32) -> bool {
    let shadow_map = match shadow_map {
        Some(map) => map,
        None => return false,
    };
    let u = (depth_position.x + 1.0) * 0.5;
    let v = (depth_position.y + 1.0) * 0.5;
    let depth = (depth_position.z + 1.0) * 0.5;

    let depth_bias = (0.05 * (1.0 - n_dot_l)).max(0.005);
    let current_depth = depth - depth_bias;
    let closest_depth = shadow_map.sample(Vec2::new(u, v)).x;
    current_depth > closest_depth
}

/// Unit vector from a world-space point toward the camera.
#[inline]
pub fn view_dir(camera_pos: &Vec3, world_position: &Vec3) -> Vec3 {
    (camera_pos - world_position).normalize()
}

/// ACES tone mapping followed by sRGB encoding, the standard finishing
/// step of the physically based shaders.
pub fn tone_map(color: Vec3, alpha: f32) -> Vec4 {
    Vec4::new(
        math::linear_to_srgb(math::aces(color.x)),
        math::linear_to_srgb(math::aces(color.y)),
        math::linear_to_srgb(math::aces(color.z)),
        alpha,
    )
}

/// Lighting intensities are clamped to a small positive range before use.
#[inline]
pub(crate) fn clamp_intensity(intensity: f32) -> f32 {
    intensity.clamp(0.0, 5.0)
}

/// Acquires a material's texture when the material names one.
pub(crate) fn acquire_optional(
    resources: &mut Resources,
    path: &Option<String>,
    usage: Usage,
) -> RenderResult<Option<Arc<Texture>>> {
    match path {
        Some(path) => Ok(Some(resources.acquire_texture(path, usage)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn rigid_meshes_keep_the_model_matrix() {
        let model_matrix = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let skinned = skin_model_matrix(&model_matrix, &[], Vec4::zeros(), Vec4::zeros());
        assert_eq!(skinned, model_matrix);
    }

    #[test]
    fn full_weight_on_one_joint_selects_its_matrix() {
        let joints = vec![
            Mat4::identity(),
            Mat4::new_translation(&Vec3::new(0.0, 5.0, 0.0)),
        ];
        let skinned = skin_model_matrix(
            &Mat4::identity(),
            &joints,
            Vec4::new(1.0, 0.0, 0.0, 0.0),
            Vec4::new(1.0, 0.0, 0.0, 0.0),
        );
        assert_relative_eq!(skinned, joints[1], epsilon = 1e-6);
    }

    #[test]
    fn no_shadow_map_means_fully_lit() {
        assert!(!in_shadow(None, Vec3::zeros(), 1.0));
    }
}
