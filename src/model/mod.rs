//! Drawable models and the per-frame context the scene driver feeds them.

use std::sync::Arc;

use crate::framebuffer::Framebuffer;
use crate::math::{Mat4, Vec3, Vec4};
use crate::texture::Texture;

/// Inputs shared by every model update in a frame.
///
/// `light_dir` points from the light toward the scene. The light matrices
/// and shadow map are only present while shadow mapping is active;
/// `layer_view` selects a material-layer debug visualization in shaders
/// that support one.
#[derive(Clone)]
pub struct FrameData {
    pub frame_time: f32,
    pub delta_time: f32,
    pub light_dir: Vec3,
    pub camera_pos: Vec3,
    pub light_view_matrix: Mat4,
    pub light_proj_matrix: Mat4,
    pub camera_view_matrix: Mat4,
    pub camera_proj_matrix: Mat4,
    pub ambient_intensity: f32,
    pub punctual_intensity: f32,
    pub shadow_map: Option<Arc<Texture>>,
    pub layer_view: Option<u32>,
}

impl Default for FrameData {
    fn default() -> FrameData {
        FrameData {
            frame_time: 0.0,
            delta_time: 0.0,
            light_dir: Vec3::new(0.0, 0.0, -1.0),
            camera_pos: Vec3::zeros(),
            light_view_matrix: Mat4::identity(),
            light_proj_matrix: Mat4::identity(),
            camera_view_matrix: Mat4::identity(),
            camera_proj_matrix: Mat4::identity(),
            ambient_intensity: 1.0,
            punctual_intensity: 1.0,
            shadow_map: None,
            layer_view: None,
        }
    }
}

/// A mesh bound to a shader program and a world transform, drawable into a
/// framebuffer. Implementations own their uniforms and update them from
/// the frame context.
pub trait Model {
    /// Refreshes uniforms (and any skeleton pose) for the coming frame.
    fn update(&mut self, frame: &FrameData);

    /// Draws the model. During a shadow pass shaders emit depth only.
    fn draw(&mut self, framebuffer: &mut Framebuffer, shadow_pass: bool);

    /// Whether the model writes opaque fragments; used by the scene driver
    /// to order draws.
    fn opaque(&self) -> bool;

    /// World transform of the model.
    fn transform(&self) -> &Mat4;

    /// Bounding-box center of the mesh, in model space.
    fn center(&self) -> Vec3;

    /// View-space distance cached by the last sort.
    fn distance(&self) -> f32;

    fn set_distance(&mut self, distance: f32);
}

/// Sorts models for drawing: opaque front-to-back first, then transparent
/// back-to-front, with distances measured along the view direction.
pub fn sort_models(models: &mut [Box<dyn Model>], view_matrix: &Mat4) {
    for model in models.iter_mut() {
        let center = model.center();
        let local = Vec4::new(center.x, center.y, center.z, 1.0);
        let view_pos = view_matrix * model.transform() * local;
        model.set_distance(-view_pos.z);
    }
    models.sort_by(|a, b| match (a.opaque(), b.opaque()) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        (true, true) => a.distance().total_cmp(&b.distance()),
        (false, false) => b.distance().total_cmp(&a.distance()),
    });
}
