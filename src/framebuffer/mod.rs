//! Color + depth render target with an emphasis on simplicity: fixed
//! dimensions, dense `Vec` planes, and the two blits the window boundary
//! consumes.

use crate::image::Image;
use crate::math::{self, Vec4};

/// A `width` x `height` render target holding an RGBA byte color plane and
/// an f32 depth plane. Smaller depth is closer; the cleared far plane is
/// conventionally 1.0.
pub struct Framebuffer {
    width: usize,
    height: usize,
    color: Vec<u8>,
    depth: Vec<f32>,
}

impl Framebuffer {
    /// Creates a framebuffer cleared to opaque black and far depth.
    pub fn new(width: usize, height: usize) -> Framebuffer {
        assert!(width > 0 && height > 0);
        let mut framebuffer = Framebuffer {
            width,
            height,
            color: vec![0; width * height * 4],
            depth: vec![0.0; width * height],
        };
        framebuffer.clear_color(Vec4::new(0.0, 0.0, 0.0, 1.0));
        framebuffer.clear_depth(1.0);
        framebuffer
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Fills the color plane with the sRGB-encoded bytes of `color`
    /// (alpha stays linear).
    pub fn clear_color(&mut self, color: Vec4) {
        let texel = [
            math::to_u8(math::linear_to_srgb(math::saturate(color.x))),
            math::to_u8(math::linear_to_srgb(math::saturate(color.y))),
            math::to_u8(math::linear_to_srgb(math::saturate(color.z))),
            math::to_u8(math::saturate(color.w)),
        ];
        for pixel in self.color.chunks_exact_mut(4) {
            pixel.copy_from_slice(&texel);
        }
    }

    /// Fills the depth plane with `depth`.
    pub fn clear_depth(&mut self, depth: f32) {
        self.depth.fill(depth);
    }

    #[inline]
    pub fn color(&self) -> &[u8] {
        &self.color
    }

    #[inline]
    pub fn depth(&self) -> &[f32] {
        &self.depth
    }

    /// Direct mutable access to the color plane, for callers that fill
    /// pixels outside the pipeline.
    #[inline]
    pub fn color_mut(&mut self) -> &mut [u8] {
        &mut self.color
    }

    /// Direct mutable access to the depth plane.
    #[inline]
    pub fn depth_mut(&mut self) -> &mut [f32] {
        &mut self.depth
    }

    /// Both planes at once, for the rasterizer's write path.
    #[inline]
    pub(crate) fn planes_mut(&mut self) -> (&mut [u8], &mut [f32]) {
        (&mut self.color, &mut self.depth)
    }

    /// Copies the color plane into `target` in B,G,R order, flipping
    /// vertically. The target must be a 4-channel LDR image of the same
    /// dimensions.
    pub fn blit_bgr(&self, target: &mut Image) {
        self.blit(target, true);
    }

    /// Copies the color plane into `target` in R,G,B order, flipping
    /// vertically. The target must be a 4-channel LDR image of the same
    /// dimensions.
    pub fn blit_rgb(&self, target: &mut Image) {
        self.blit(target, false);
    }

    fn blit(&self, target: &mut Image, swap_red_blue: bool) {
        assert!(target.width() == self.width && target.height() == self.height);
        assert!(target.channels() == 4);

        let width = self.width;
        let height = self.height;
        let buffer = target.ldr_pixels_mut();
        for row in 0..height {
            let flipped = height - 1 - row;
            for col in 0..width {
                let src = (row * width + col) * 4;
                let dst = (flipped * width + col) * 4;
                if swap_red_blue {
                    buffer[dst] = self.color[src + 2];
                    buffer[dst + 1] = self.color[src + 1];
                    buffer[dst + 2] = self.color[src];
                } else {
                    buffer[dst] = self.color[src];
                    buffer[dst + 1] = self.color[src + 1];
                    buffer[dst + 2] = self.color[src + 2];
                }
                buffer[dst + 3] = self.color[src + 3];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Image;

    #[test]
    fn new_framebuffer_is_black_and_far() {
        let framebuffer = Framebuffer::new(2, 2);
        assert!(framebuffer.color().chunks_exact(4).all(|p| p == [0, 0, 0, 255]));
        assert!(framebuffer.depth().iter().all(|&d| d == 1.0));
    }

    #[test]
    fn clear_color_writes_every_pixel() {
        let mut framebuffer = Framebuffer::new(3, 2);
        framebuffer.clear_color(Vec4::new(1.0, 0.0, 1.0, 1.0));
        assert!(framebuffer.color().chunks_exact(4).all(|p| p == [255, 0, 255, 255]));
    }

    #[test]
    fn blits_flip_vertically_and_order_channels() {
        let mut framebuffer = Framebuffer::new(1, 2);
        // row 0 red, row 1 blue
        framebuffer.color_mut()[..4].copy_from_slice(&[255, 0, 0, 255]);
        framebuffer.color_mut()[4..].copy_from_slice(&[0, 0, 255, 255]);

        let mut rgb = Image::new_ldr(1, 2, 4);
        framebuffer.blit_rgb(&mut rgb);
        assert_eq!(&rgb.ldr_pixels()[..4], &[0, 0, 255, 255]);
        assert_eq!(&rgb.ldr_pixels()[4..], &[255, 0, 0, 255]);

        let mut bgr = Image::new_ldr(1, 2, 4);
        framebuffer.blit_bgr(&mut bgr);
        assert_eq!(&bgr.ldr_pixels()[..4], &[255, 0, 0, 255]);
        assert_eq!(&bgr.ldr_pixels()[4..], &[0, 0, 255, 255]);
    }
}
