//! Triangle rasterization: perspective divide, back-face test, viewport
//! mapping, barycentric coverage with early depth rejection, perspective-
//! correct varying interpolation, fragment shading and the final blend and
//! write.

use crate::framebuffer::Framebuffer;
use crate::math::{self, Vec2, Vec3, EPSILON};

use super::{ClipVertex, Program, ShaderProgram, Varyings};

/// Signed screen-space area of the triangle in NDC; non-positive means the
/// triangle faces away under the counter-clockwise-front convention.
#[inline]
fn is_back_facing(ndc: &[Vec3; 3]) -> bool {
    let [a, b, c] = ndc;
    let signed_area =
        a.x * b.y - a.y * b.x + b.x * c.y - b.y * c.x + c.x * a.y - c.y * a.x;
    signed_area <= 0.0
}

/// Maps NDC to window coordinates: x and y to pixels, z to [0, 1].
#[inline]
fn viewport_transform(width: usize, height: usize, ndc: &Vec3) -> Vec3 {
    Vec3::new(
        (ndc.x + 1.0) * 0.5 * width as f32,
        (ndc.y + 1.0) * 0.5 * height as f32,
        (ndc.z + 1.0) * 0.5,
    )
}

struct BoundingBox {
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
}

fn find_bounding_box(corners: &[Vec2; 3], width: usize, height: usize) -> BoundingBox {
    let min = corners[0].inf(&corners[1]).inf(&corners[2]);
    let max = corners[0].sup(&corners[1]).sup(&corners[2]);
    BoundingBox {
        min_x: (min.x.floor() as i32).max(0),
        min_y: (min.y.floor() as i32).max(0),
        max_x: (max.x.ceil() as i32).min(width as i32 - 1),
        max_y: (max.y.ceil() as i32).min(height as i32 - 1),
    }
}

/// Barycentric weights of `point`, found by solving
/// `AB * s + AC * t = AP`; the weights are `(1 - s - t, s, t)`.
#[inline]
fn barycentric_weights(corners: &[Vec2; 3], point: Vec2) -> Vec3 {
    let ab = corners[1] - corners[0];
    let ac = corners[2] - corners[0];
    let ap = point - corners[0];
    let factor = 1.0 / (ab.x * ac.y - ab.y * ac.x);
    let s = (ac.y * ap.x - ac.x * ap.y) * factor;
    let t = (ab.x * ap.y - ab.y * ap.x) * factor;
    Vec3::new(1.0 - s - t, s, t)
}

/// Perspective-correct interpolation: each float slot is blended with
/// weights premultiplied by 1/w and renormalized, per the classic
/// hyperbolic interpolation derivation.
fn interpolate_varyings<V: Varyings>(
    sources: [&V; 3],
    weights: Vec3,
    recip_w: [f32; 3],
) -> V {
    let weight0 = recip_w[0] * weights.x;
    let weight1 = recip_w[1] * weights.y;
    let weight2 = recip_w[2] * weights.z;
    let normalizer = 1.0 / (weight0 + weight1 + weight2);

    let src0 = sources[0].as_floats();
    let src1 = sources[1].as_floats();
    let src2 = sources[2].as_floats();
    let mut varyings = V::zeroed();
    for (slot, out) in varyings.as_floats_mut().iter_mut().enumerate() {
        let sum = src0[slot] * weight0 + src1[slot] * weight1 + src2[slot] * weight2;
        *out = sum * normalizer;
    }
    varyings
}

/// Shades one covered pixel and writes color and depth, honoring discard
/// and the program's blend flag. Only the RGB bytes of the color plane are
/// written; the alpha byte keeps its cleared value.
fn draw_fragment<S: ShaderProgram>(
    framebuffer: &mut Framebuffer,
    program: &Program<S>,
    varyings: &S::Varyings,
    backface: bool,
    index: usize,
    depth: f32,
) {
    let mut discard = false;
    let color = S::fragment(varyings, &program.uniforms, &mut discard, backface);
    if discard {
        return;
    }
    let mut color = math::saturate4(color);

    let (color_buffer, depth_buffer) = framebuffer.planes_mut();
    if program.enable_blend {
        // out = src * alpha + dst * (1 - alpha)
        let alpha = color.w;
        color.x = color.x * alpha + math::from_u8(color_buffer[index * 4]) * (1.0 - alpha);
        color.y = color.y * alpha + math::from_u8(color_buffer[index * 4 + 1]) * (1.0 - alpha);
        color.z = color.z * alpha + math::from_u8(color_buffer[index * 4 + 2]) * (1.0 - alpha);
    }

    color_buffer[index * 4] = math::to_u8(color.x);
    color_buffer[index * 4 + 1] = math::to_u8(color.y);
    color_buffer[index * 4 + 2] = math::to_u8(color.z);
    depth_buffer[index] = depth;
}

/// Rasterizes one clipped sub-triangle. Returns `true` when the triangle
/// was rejected by the back-face test, which tells the fan driver the rest
/// of the fan is back-facing too.
pub(super) fn rasterize_triangle<S: ShaderProgram>(
    framebuffer: &mut Framebuffer,
    program: &Program<S>,
    vertices: [&ClipVertex<S::Varyings>; 3],
) -> bool {
    let width = framebuffer.width();
    let height = framebuffer.height();

    let mut ndc = [Vec3::zeros(); 3];
    for (out, vertex) in ndc.iter_mut().zip(&vertices) {
        *out = vertex.position.xyz() / vertex.position.w;
    }

    let backface = is_back_facing(&ndc);
    if backface && !program.double_sided {
        return true;
    }

    let mut recip_w = [0.0f32; 3];
    for (out, vertex) in recip_w.iter_mut().zip(&vertices) {
        *out = 1.0 / vertex.position.w;
    }

    let mut screen_coords = [Vec2::zeros(); 3];
    let mut screen_depths = [0.0f32; 3];
    for i in 0..3 {
        let window = viewport_transform(width, height, &ndc[i]);
        screen_coords[i] = window.xy();
        screen_depths[i] = window.z;
    }

    let bbox = find_bounding_box(&screen_coords, width, height);
    for x in bbox.min_x..=bbox.max_x {
        for y in bbox.min_y..=bbox.max_y {
            let point = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let weights = barycentric_weights(&screen_coords, point);
            let covered =
                weights.x > -EPSILON && weights.y > -EPSILON && weights.z > -EPSILON;
            if !covered {
                continue;
            }
            let index = y as usize * width + x as usize;
            let depth = screen_depths[0] * weights.x
                + screen_depths[1] * weights.y
                + screen_depths[2] * weights.z;
            // early depth test
            if depth > framebuffer.depth()[index] {
                continue;
            }
            let varyings = interpolate_varyings(
                [
                    &vertices[0].varyings,
                    &vertices[1].varyings,
                    &vertices[2].varyings,
                ],
                weights,
                recip_w,
            );
            draw_fragment(framebuffer, program, &varyings, backface, index, depth);
        }
    }

    false
}
