//! The programmable pipeline: shader program traits, the per-program state
//! bundle, and the triangle drawing driver that feeds the clipper and
//! rasterizer.

use std::marker::PhantomData;

use bytemuck::{Pod, Zeroable};
use smallvec::SmallVec;

use crate::framebuffer::Framebuffer;
use crate::math::{self, Vec4};
use crate::mesh::{Mesh, Vertex};

pub mod clip;
pub mod raster;

pub use self::clip::{ClipPlane, ALL_CLIP_PLANES};

/// Clipping a triangle against the seven frustum planes can produce at most
/// this many vertices, so every clipping buffer is sized to it.
pub const MAX_VARYINGS: usize = 10;

/// Per-vertex data interpolated across a triangle.
///
/// Varyings travel through the fixed-function stages as a flat array of
/// floats: the clipper lerps them slot by slot in clip space and the
/// rasterizer blends them with perspective-correct weights. The `Pod`
/// bound is what makes the reinterpretation sound, and it implies the
/// layout contains nothing but bytes that may hold any value.
pub trait Varyings: Pod {
    /// Number of f32 slots in the payload.
    const FLOATS: usize = std::mem::size_of::<Self>() / std::mem::size_of::<f32>();

    #[inline]
    fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(std::slice::from_ref(self))
    }

    #[inline]
    fn as_floats_mut(&mut self) -> &mut [f32] {
        bytemuck::cast_slice_mut(std::slice::from_mut(self))
    }
}

/// A single interpolated float is the smallest useful varying payload.
impl Varyings for f32 {}

/// A vertex/fragment shader pair with its typed payloads.
///
/// The three associated types replace the byte blobs of a classic
/// fixed-function renderer: attributes enter the vertex stage, varyings
/// cross the rasterizer, uniforms are shared per draw call. Shader
/// functions are stateless; all state lives in [`Program`].
pub trait ShaderProgram {
    type Attribs: Pod;
    type Varyings: Varyings;
    type Uniforms;

    /// Extracts this program's attributes from a mesh vertex.
    fn attributes(vertex: &Vertex) -> Self::Attribs;

    /// Transforms one vertex, filling its varyings and returning the
    /// clip-space position.
    fn vertex(attribs: &Self::Attribs, varyings: &mut Self::Varyings, uniforms: &Self::Uniforms)
        -> Vec4;

    /// Shades one fragment. Setting `discard` suppresses the framebuffer
    /// write; `backface` is only ever true for double-sided programs.
    fn fragment(
        varyings: &Self::Varyings,
        uniforms: &Self::Uniforms,
        discard: &mut bool,
        backface: bool,
    ) -> Vec4;
}

/// A clip-space vertex: position plus the varyings payload produced by the
/// vertex stage.
#[derive(Debug, Clone, Copy)]
pub struct ClipVertex<V> {
    pub position: Vec4,
    pub varyings: V,
}

impl<V: Varyings> ClipVertex<V> {
    /// Linear interpolation along an edge, performed in clip space before
    /// the perspective divide so the result stays perspective-correct.
    pub fn lerp(a: &ClipVertex<V>, b: &ClipVertex<V>, t: f32) -> ClipVertex<V> {
        let mut varyings = V::zeroed();
        {
            let a_floats = a.varyings.as_floats();
            let b_floats = b.varyings.as_floats();
            let out = varyings.as_floats_mut();
            for slot in 0..V::FLOATS {
                out[slot] = math::lerp(a_floats[slot], b_floats[slot], t);
            }
        }
        ClipVertex {
            position: a.position.lerp(&b.position, t),
            varyings,
        }
    }
}

/// A convex clipped polygon, stack-resident up to the clipper's hard bound.
pub type Polygon<V> = SmallVec<[ClipVertex<V>; MAX_VARYINGS]>;

/// State bundle for one shader program: render flags, the uniform block,
/// and the three per-corner attribute slots the driver fills before each
/// triangle.
pub struct Program<S: ShaderProgram> {
    pub uniforms: S::Uniforms,
    pub double_sided: bool,
    pub enable_blend: bool,
    attribs: [S::Attribs; 3],
    shader: PhantomData<S>,
}

impl<S: ShaderProgram> Program<S> {
    pub fn new(uniforms: S::Uniforms, double_sided: bool, enable_blend: bool) -> Program<S> {
        Program {
            uniforms,
            double_sided,
            enable_blend,
            attribs: [Zeroable::zeroed(); 3],
            shader: PhantomData,
        }
    }

    /// Attribute slot for the nth triangle corner; `nth` must be 0..3.
    #[inline]
    pub fn attribs_mut(&mut self, nth: usize) -> &mut S::Attribs {
        &mut self.attribs[nth]
    }

    /// Draws the triangle currently staged in the attribute slots:
    /// runs the vertex shader on each corner, clips the result against the
    /// frustum, fans the clipped polygon and rasterizes each sub-triangle.
    pub fn draw_triangle(&mut self, framebuffer: &mut Framebuffer) {
        let mut triangle = [ClipVertex {
            position: Vec4::zeros(),
            varyings: S::Varyings::zeroed(),
        }; 3];
        for (corner, attribs) in triangle.iter_mut().zip(&self.attribs) {
            corner.position = S::vertex(attribs, &mut corner.varyings, &self.uniforms);
        }

        let polygon = clip::clip_triangle(triangle);
        if polygon.len() < 3 {
            return;
        }

        for i in 0..polygon.len() - 2 {
            let culled = raster::rasterize_triangle(
                framebuffer,
                self,
                [&polygon[0], &polygon[i + 1], &polygon[i + 2]],
            );
            // the fan shares one winding; once one sub-triangle faces away
            // they all do
            if culled {
                break;
            }
        }
    }

    /// Draws every face of a mesh through this program.
    pub fn draw_mesh(&mut self, framebuffer: &mut Framebuffer, mesh: &Mesh) {
        for face in mesh.vertices().chunks_exact(3) {
            for (corner, vertex) in face.iter().enumerate() {
                self.attribs[corner] = S::attributes(vertex);
            }
            self.draw_triangle(framebuffer);
        }
    }
}
