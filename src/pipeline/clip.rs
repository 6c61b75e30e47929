//! Homogeneous clipping against the view frustum.
//!
//! Triangles are clipped by Sutherland-Hodgman against seven half-spaces
//! in a fixed order, starting with `w >= epsilon` so the later plane tests
//! can rely on a positive w. Varyings are interpolated in clip space,
//! before the perspective divide, which keeps them perspective-correct
//! through the divide.

use std::mem;

use crate::math::{Vec4, EPSILON};

use super::{ClipVertex, Polygon, Varyings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipPlane {
    PositiveW,
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

/// The seven clipping planes in application order.
pub const ALL_CLIP_PLANES: [ClipPlane; 7] = [
    ClipPlane::PositiveW,
    ClipPlane::PositiveX,
    ClipPlane::NegativeX,
    ClipPlane::PositiveY,
    ClipPlane::NegativeY,
    ClipPlane::PositiveZ,
    ClipPlane::NegativeZ,
];

impl ClipPlane {
    /// Whether a clip-space point lies on the kept side of the plane.
    #[inline]
    pub fn has_inside(self, v: &Vec4) -> bool {
        match self {
            ClipPlane::PositiveW => v.w >= EPSILON,
            ClipPlane::PositiveX => v.x <= v.w,
            ClipPlane::NegativeX => v.x >= -v.w,
            ClipPlane::PositiveY => v.y <= v.w,
            ClipPlane::NegativeY => v.y >= -v.w,
            ClipPlane::PositiveZ => v.z <= v.w,
            ClipPlane::NegativeZ => v.z >= -v.w,
        }
    }

    /// Interpolation ratio of the plane crossing along `prev -> curr`.
    #[inline]
    pub fn intersect_ratio(self, prev: &Vec4, curr: &Vec4) -> f32 {
        match self {
            ClipPlane::PositiveW => (prev.w - EPSILON) / (prev.w - curr.w),
            ClipPlane::PositiveX => (prev.w - prev.x) / ((prev.w - prev.x) - (curr.w - curr.x)),
            ClipPlane::NegativeX => (prev.w + prev.x) / ((prev.w + prev.x) - (curr.w + curr.x)),
            ClipPlane::PositiveY => (prev.w - prev.y) / ((prev.w - prev.y) - (curr.w - curr.y)),
            ClipPlane::NegativeY => (prev.w + prev.y) / ((prev.w + prev.y) - (curr.w + curr.y)),
            ClipPlane::PositiveZ => (prev.w - prev.z) / ((prev.w - prev.z) - (curr.w - curr.z)),
            ClipPlane::NegativeZ => (prev.w + prev.z) / ((prev.w + prev.z) - (curr.w + curr.z)),
        }
    }
}

/// Whether a vertex lies inside the frustum proper (w > 0 implied by the
/// axis bounds holding with |.| <= w).
#[inline]
fn is_visible(v: &Vec4) -> bool {
    v.x.abs() <= v.w && v.y.abs() <= v.w && v.z.abs() <= v.w
}

/// Clips a triangle against the frustum, returning the resulting convex
/// polygon. Fully visible triangles pass through untouched; a polygon left
/// with fewer than three vertices by any plane is returned empty.
pub fn clip_triangle<V: Varyings>(triangle: [ClipVertex<V>; 3]) -> Polygon<V> {
    if triangle.iter().all(|vertex| is_visible(&vertex.position)) {
        return Polygon::from_slice(&triangle);
    }

    let mut input: Polygon<V> = Polygon::from_slice(&triangle);
    let mut output: Polygon<V> = Polygon::new();
    for plane in ALL_CLIP_PLANES {
        clip_against_plane(plane, &input, &mut output);
        if output.len() < 3 {
            output.clear();
            return output;
        }
        mem::swap(&mut input, &mut output);
    }
    input
}

/// One Sutherland-Hodgman pass: walks the polygon edge by edge, emitting
/// the crossing point on status changes and the current vertex when it is
/// inside.
fn clip_against_plane<V: Varyings>(plane: ClipPlane, input: &Polygon<V>, output: &mut Polygon<V>) {
    output.clear();
    for (index, curr) in input.iter().enumerate() {
        let prev = &input[(index + input.len() - 1) % input.len()];
        let prev_inside = plane.has_inside(&prev.position);
        let curr_inside = plane.has_inside(&curr.position);

        if prev_inside != curr_inside {
            let ratio = plane.intersect_ratio(&prev.position, &curr.position);
            output.push(ClipVertex::lerp(prev, curr, ratio));
        }
        if curr_inside {
            output.push(*curr);
        }
    }
    debug_assert!(output.len() <= super::MAX_VARYINGS);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32, y: f32, z: f32, w: f32, varying: f32) -> ClipVertex<f32> {
        ClipVertex {
            position: Vec4::new(x, y, z, w),
            varyings: varying,
        }
    }

    #[test]
    fn fully_visible_triangles_pass_through() {
        let triangle = [
            vertex(-0.5, -0.5, 0.0, 1.0, 1.0),
            vertex(0.5, -0.5, 0.0, 1.0, 2.0),
            vertex(0.0, 0.5, 0.0, 1.0, 3.0),
        ];
        let polygon = clip_triangle(triangle);
        assert_eq!(polygon.len(), 3);
        for (kept, original) in polygon.iter().zip(&triangle) {
            assert_eq!(kept.position, original.position);
            assert_eq!(kept.varyings, original.varyings);
        }
    }

    #[test]
    fn fully_outside_triangles_are_discarded() {
        let triangle = [
            vertex(2.0, 0.0, 0.0, 1.0, 0.0),
            vertex(3.0, 0.0, 0.0, 1.0, 0.0),
            vertex(2.0, 1.0, 0.0, 1.0, 0.0),
        ];
        assert!(clip_triangle(triangle).is_empty());
    }

    #[test]
    fn triangles_behind_the_camera_are_discarded() {
        let triangle = [
            vertex(0.0, 0.0, 0.0, -1.0, 0.0),
            vertex(1.0, 0.0, 0.0, -1.0, 0.0),
            vertex(0.0, 1.0, 0.0, -1.0, 0.0),
        ];
        assert!(clip_triangle(triangle).is_empty());
    }

    #[test]
    fn near_w_crossing_produces_valid_polygon() {
        let triangle = [
            vertex(0.0, 0.0, 0.0, -0.1, 0.0),
            vertex(0.2, 0.0, 0.0, 1.0, 1.0),
            vertex(0.0, 0.2, 0.0, 1.0, 2.0),
        ];
        let polygon = clip_triangle(triangle);
        assert!(polygon.len() >= 3);
        for kept in &polygon {
            assert!(kept.position.w > 0.0);
        }
    }

    #[test]
    fn one_clipped_corner_yields_a_quad() {
        // the +x plane cuts off one corner, leaving four vertices
        let triangle = [
            vertex(0.0, -0.5, 0.0, 1.0, 0.0),
            vertex(2.0, 0.0, 0.0, 1.0, 1.0),
            vertex(0.0, 0.5, 0.0, 1.0, 2.0),
        ];
        let polygon = clip_triangle(triangle);
        assert_eq!(polygon.len(), 4);
        for kept in &polygon {
            assert!(kept.position.x <= kept.position.w + 1e-5);
        }
    }

    #[test]
    fn crossing_varyings_interpolate_linearly() {
        // edge from w=1 to w=1 crossing x = w at the midpoint
        let a = vertex(0.0, 0.0, 0.0, 1.0, 0.0);
        let b = vertex(2.0, 0.0, 0.0, 1.0, 4.0);
        let ratio = ClipPlane::PositiveX.intersect_ratio(&a.position, &b.position);
        let crossing = ClipVertex::lerp(&a, &b, ratio);
        assert!((crossing.position.x - 1.0).abs() < 1e-6);
        assert!((crossing.varyings - 2.0).abs() < 1e-6);
    }
}
