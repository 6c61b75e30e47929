//! A CPU software rasterizer implementing the classic programmable pipeline:
//! vertex transform, frustum clipping, perspective-correct rasterization with
//! early depth testing, fragment shading and alpha blending, together with
//! the data substrate the pipeline runs on (images, textures, meshes,
//! skeletons) and a small library of reference shader programs.

pub mod cache;
pub mod error;
pub mod framebuffer;
pub mod image;
pub mod math;
pub mod mesh;
pub mod model;
pub mod pipeline;
pub mod shaders;
pub mod skeleton;
pub mod texture;
