//! Dense 2D pixel buffers in either byte (LDR) or float (HDR) storage,
//! with the in-place processing the texture layer builds on.

use std::path::Path;

use crate::error::{RenderError, RenderResult};
use crate::math;

pub mod tga;

/// Element format of an image: unsigned bytes or 32-bit floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ldr,
    Hdr,
}

/// Pixel storage. Exactly one variant exists per image, so the
/// one-buffer-per-format invariant is carried by the type.
#[derive(Debug, Clone)]
pub enum Pixels {
    Ldr(Vec<u8>),
    Hdr(Vec<f32>),
}

/// A dense `width` x `height` pixel buffer with 1 to 4 channels.
///
/// Row 0 is the top of the image; channel order for 3- and 4-channel LDR
/// images is R, G, B(, A).
#[derive(Debug, Clone)]
pub struct Image {
    width: usize,
    height: usize,
    channels: usize,
    pixels: Pixels,
}

impl Image {
    pub fn new_ldr(width: usize, height: usize, channels: usize) -> Image {
        assert!(width > 0 && height > 0);
        assert!((1..=4).contains(&channels));
        Image {
            width,
            height,
            channels,
            pixels: Pixels::Ldr(vec![0; width * height * channels]),
        }
    }

    pub fn new_hdr(width: usize, height: usize, channels: usize) -> Image {
        assert!(width > 0 && height > 0);
        assert!((1..=4).contains(&channels));
        Image {
            width,
            height,
            channels,
            pixels: Pixels::Hdr(vec![0.0; width * height * channels]),
        }
    }

    /// Decodes an image file; the extension selects the codec. Only the TGA
    /// subset is supported.
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Image> {
        let path = path.as_ref();
        match extension(path) {
            "tga" => tga::load(path),
            other => Err(RenderError::UnsupportedFormat(format!(
                "image extension {:?} of {}",
                other,
                path.display()
            ))),
        }
    }

    /// Encodes the image to a file; the extension selects the codec.
    pub fn save(&self, path: impl AsRef<Path>) -> RenderResult<()> {
        let path = path.as_ref();
        match extension(path) {
            "tga" => tga::save(self, path),
            other => Err(RenderError::UnsupportedFormat(format!(
                "image extension {:?} of {}",
                other,
                path.display()
            ))),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn format(&self) -> Format {
        match self.pixels {
            Pixels::Ldr(_) => Format::Ldr,
            Pixels::Hdr(_) => Format::Hdr,
        }
    }

    #[inline]
    pub fn pixels(&self) -> &Pixels {
        &self.pixels
    }

    /// Byte plane of an LDR image. Calling this on an HDR image is a
    /// contract violation.
    pub fn ldr_pixels(&self) -> &[u8] {
        match &self.pixels {
            Pixels::Ldr(buffer) => buffer,
            Pixels::Hdr(_) => panic!("image is not LDR"),
        }
    }

    pub fn ldr_pixels_mut(&mut self) -> &mut [u8] {
        match &mut self.pixels {
            Pixels::Ldr(buffer) => buffer,
            Pixels::Hdr(_) => panic!("image is not LDR"),
        }
    }

    /// Float plane of an HDR image. Calling this on an LDR image is a
    /// contract violation.
    pub fn hdr_pixels(&self) -> &[f32] {
        match &self.pixels {
            Pixels::Hdr(buffer) => buffer,
            Pixels::Ldr(_) => panic!("image is not HDR"),
        }
    }

    #[inline]
    fn element_index(&self, row: usize, col: usize) -> usize {
        (row * self.width + col) * self.channels
    }

    /// Channel value as a float in storage units (0..=255 for LDR).
    fn element(&self, row: usize, col: usize, channel: usize) -> f32 {
        let index = self.element_index(row, col) + channel;
        match &self.pixels {
            Pixels::Ldr(buffer) => buffer[index] as f32,
            Pixels::Hdr(buffer) => buffer[index],
        }
    }

    fn set_element(&mut self, row: usize, col: usize, channel: usize, value: f32) {
        let index = self.element_index(row, col) + channel;
        match &mut self.pixels {
            Pixels::Ldr(buffer) => buffer[index] = (value + 0.5) as u8,
            Pixels::Hdr(buffer) => buffer[index] = value,
        }
    }

    fn swap_pixels(&mut self, a: (usize, usize), b: (usize, usize)) {
        let i = self.element_index(a.0, a.1);
        let j = self.element_index(b.0, b.1);
        let channels = self.channels;
        match &mut self.pixels {
            Pixels::Ldr(buffer) => {
                for k in 0..channels {
                    buffer.swap(i + k, j + k);
                }
            }
            Pixels::Hdr(buffer) => {
                for k in 0..channels {
                    buffer.swap(i + k, j + k);
                }
            }
        }
    }

    /// Mirrors the image left-to-right in place.
    pub fn flip_horizontal(&mut self) {
        for row in 0..self.height {
            for col in 0..self.width / 2 {
                let mirrored = self.width - 1 - col;
                self.swap_pixels((row, col), (row, mirrored));
            }
        }
    }

    /// Mirrors the image top-to-bottom in place.
    pub fn flip_vertical(&mut self) {
        for row in 0..self.height / 2 {
            let mirrored = self.height - 1 - row;
            for col in 0..self.width {
                self.swap_pixels((row, col), (mirrored, col));
            }
        }
    }

    /// Bilinear resize into a freshly allocated image of the same format
    /// and channel count. Source indices are clamped at the borders.
    pub fn resize(&self, width: usize, height: usize) -> Image {
        assert!(width > 0 && height > 0);
        let mut target = match self.pixels {
            Pixels::Ldr(_) => Image::new_ldr(width, height, self.channels),
            Pixels::Hdr(_) => Image::new_hdr(width, height, self.channels),
        };
        let scale_r = self.height as f32 / height as f32;
        let scale_c = self.width as f32 / width as f32;

        for dst_r in 0..height {
            for dst_c in 0..width {
                let mapped_r = dst_r as f32 * scale_r;
                let mapped_c = dst_c as f32 * scale_c;
                let src_r0 = mapped_r as usize;
                let src_c0 = mapped_c as usize;
                let src_r1 = (src_r0 + 1).min(self.height - 1);
                let src_c1 = (src_c0 + 1).min(self.width - 1);
                let delta_r = mapped_r - src_r0 as f32;
                let delta_c = mapped_c - src_c0 as f32;

                for k in 0..self.channels {
                    let v00 = self.element(src_r0, src_c0, k);
                    let v01 = self.element(src_r0, src_c1, k);
                    let v10 = self.element(src_r1, src_c0, k);
                    let v11 = self.element(src_r1, src_c1, k);
                    let v0 = math::lerp(v00, v01, delta_c);
                    let v1 = math::lerp(v10, v11, delta_c);
                    target.set_element(dst_r, dst_c, k, math::lerp(v0, v1, delta_r));
                }
            }
        }
        target
    }

    /// Converts byte storage to float storage by dividing by 255.
    pub fn ldr_to_hdr(&mut self) {
        if let Pixels::Ldr(buffer) = &self.pixels {
            let floats = buffer.iter().map(|&byte| math::from_u8(byte)).collect();
            self.pixels = Pixels::Hdr(floats);
        }
    }

    /// Converts float storage to byte storage, saturating and rounding.
    pub fn hdr_to_ldr(&mut self) {
        if let Pixels::Hdr(buffer) = &self.pixels {
            let bytes = buffer
                .iter()
                .map(|&value| (math::saturate(value) * 255.0 + 0.5) as u8)
                .collect();
            self.pixels = Pixels::Ldr(bytes);
        }
    }

    /// Number of leading color channels; the trailing channel of 2- and
    /// 4-channel images is alpha.
    fn color_channels(&self) -> usize {
        match self.channels {
            2 => 1,
            4 => 3,
            n => n,
        }
    }

    /// Decodes sRGB color channels to linear; alpha is preserved.
    pub fn srgb_to_linear(&mut self) {
        self.convert_colors(math::srgb_to_linear);
    }

    /// Encodes linear color channels to sRGB; alpha is preserved.
    pub fn linear_to_srgb(&mut self) {
        self.convert_colors(math::linear_to_srgb);
    }

    fn convert_colors(&mut self, convert: fn(f32) -> f32) {
        let channels = self.channels;
        let color_channels = self.color_channels();
        match &mut self.pixels {
            Pixels::Ldr(buffer) => {
                for (k, byte) in buffer.iter_mut().enumerate() {
                    if k % channels < color_channels {
                        *byte = (convert(math::from_u8(*byte)) * 255.0 + 0.5) as u8;
                    }
                }
            }
            Pixels::Hdr(buffer) => {
                for (k, value) in buffer.iter_mut().enumerate() {
                    if k % channels < color_channels {
                        *value = convert(*value);
                    }
                }
            }
        }
    }
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|ext| ext.to_str()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: usize, height: usize, channels: usize) -> Image {
        let mut image = Image::new_ldr(width, height, channels);
        for (k, byte) in image.ldr_pixels_mut().iter_mut().enumerate() {
            *byte = (k % 251) as u8;
        }
        image
    }

    #[test]
    fn flips_are_involutions() {
        let image = gradient(5, 4, 3);
        let mut flipped = image.clone();
        flipped.flip_horizontal();
        flipped.flip_horizontal();
        assert_eq!(flipped.ldr_pixels(), image.ldr_pixels());
        flipped.flip_vertical();
        flipped.flip_vertical();
        assert_eq!(flipped.ldr_pixels(), image.ldr_pixels());
    }

    #[test]
    fn flip_vertical_swaps_rows() {
        let mut image = Image::new_ldr(2, 2, 1);
        image.ldr_pixels_mut().copy_from_slice(&[1, 2, 3, 4]);
        image.flip_vertical();
        assert_eq!(image.ldr_pixels(), &[3, 4, 1, 2]);
    }

    #[test]
    fn resize_preserves_constant_images() {
        let mut image = Image::new_ldr(4, 4, 4);
        image.ldr_pixels_mut().fill(200);
        let resized = image.resize(9, 3);
        assert_eq!(resized.width(), 9);
        assert_eq!(resized.height(), 3);
        assert_eq!(resized.channels(), 4);
        assert!(resized.ldr_pixels().iter().all(|&b| b == 200));
    }

    #[test]
    fn ldr_hdr_round_trip() {
        let mut image = gradient(3, 3, 4);
        let original = image.ldr_pixels().to_vec();
        image.ldr_to_hdr();
        assert_eq!(image.format(), Format::Hdr);
        image.hdr_to_ldr();
        assert_eq!(image.ldr_pixels(), &original[..]);
    }

    #[test]
    fn srgb_conversion_preserves_alpha() {
        let mut image = Image::new_ldr(1, 1, 4);
        image.ldr_pixels_mut().copy_from_slice(&[128, 128, 128, 77]);
        image.srgb_to_linear();
        assert_eq!(image.ldr_pixels()[3], 77);
        assert!(image.ldr_pixels()[0] < 128);
    }
}
