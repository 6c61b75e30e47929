//! Sampled images. Textures are always four channels wide, in byte or float
//! storage; cubemaps bundle six faces and pick one per sampled direction.

use std::path::Path;

use crate::error::RenderResult;
use crate::framebuffer::Framebuffer;
use crate::image::{Format, Image, Pixels};
use crate::math::{self, Vec2, Vec3, Vec4};

/// How a texture's contents are meant to be consumed. Color usages carry
/// sRGB-encoded data, data usages are raw; HDR usages convert byte images
/// to float storage on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Usage {
    LdrColor,
    LdrData,
    HdrColor,
    HdrData,
}

/// Texel storage of a texture, always four channels per texel.
#[derive(Debug, Clone)]
enum Texels {
    Ldr(Vec<u8>),
    Hdr(Vec<f32>),
}

/// A sampled image with nearest-neighbor lookup and repeat/clamp wrapping.
///
/// Texture coordinates put (0, 0) at the first texel and (1, 1) at the far
/// corner; sampling returns an RGBA vector with LDR bytes mapped to
/// [0, 1] and HDR floats returned as stored.
#[derive(Debug, Clone)]
pub struct Texture {
    width: usize,
    height: usize,
    texels: Texels,
}

impl Texture {
    /// Creates a zeroed texture in the given storage format.
    pub fn new(width: usize, height: usize, format: Format) -> Texture {
        assert!(width > 0 && height > 0);
        let texels = match format {
            Format::Ldr => Texels::Ldr(vec![0; width * height * 4]),
            Format::Hdr => Texels::Hdr(vec![0.0; width * height * 4]),
        };
        Texture { width, height, texels }
    }

    /// Loads an image file and converts it for the requested usage.
    pub fn from_file(path: impl AsRef<Path>, usage: Usage) -> RenderResult<Texture> {
        Ok(Texture::from_image(Image::load(path)?, usage))
    }

    /// Converts a decoded image for the requested usage and expands it to
    /// four channels. One- and two-channel images broadcast their first
    /// channel to R, G and B; a missing alpha channel becomes opaque.
    pub fn from_image(mut image: Image, usage: Usage) -> Texture {
        match image.format() {
            Format::Ldr => match usage {
                Usage::HdrColor => {
                    image.ldr_to_hdr();
                    image.srgb_to_linear();
                }
                Usage::HdrData => image.ldr_to_hdr(),
                Usage::LdrColor | Usage::LdrData => {}
            },
            Format::Hdr => match usage {
                Usage::LdrColor => {
                    image.linear_to_srgb();
                    image.hdr_to_ldr();
                }
                Usage::LdrData => image.hdr_to_ldr(),
                Usage::HdrColor | Usage::HdrData => {}
            },
        }

        let width = image.width();
        let height = image.height();
        let channels = image.channels();
        let texels = match image.pixels() {
            Pixels::Ldr(buffer) => Texels::Ldr(expand_channels(buffer, channels, 255u8)),
            Pixels::Hdr(buffer) => Texels::Hdr(expand_channels(buffer, channels, 1.0f32)),
        };
        Texture { width, height, texels }
    }

    /// Snapshot of a framebuffer's color plane as an LDR texture.
    pub fn from_color_buffer(framebuffer: &Framebuffer) -> Texture {
        Texture {
            width: framebuffer.width(),
            height: framebuffer.height(),
            texels: Texels::Ldr(framebuffer.color().to_vec()),
        }
    }

    /// Snapshot of a framebuffer's depth plane as an HDR texture, with the
    /// depth value broadcast to R, G and B.
    pub fn from_depth_buffer(framebuffer: &Framebuffer) -> Texture {
        let mut buffer = Vec::with_capacity(framebuffer.depth().len() * 4);
        for &depth in framebuffer.depth() {
            buffer.extend_from_slice(&[depth, depth, depth, 1.0]);
        }
        Texture {
            width: framebuffer.width(),
            height: framebuffer.height(),
            texels: Texels::Hdr(buffer),
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
    pub fn format(&self) -> Format {
        match self.texels {
            Texels::Ldr(_) => Format::Ldr,
            Texels::Hdr(_) => Format::Hdr,
        }
    }

    fn fetch(&self, u: f32, v: f32) -> Vec4 {
        let col = ((self.width - 1) as f32 * u) as usize;
        let row = ((self.height - 1) as f32 * v) as usize;
        let index = (row * self.width + col) * 4;
        match &self.texels {
            Texels::Ldr(buffer) => Vec4::new(
                math::from_u8(buffer[index]),
                math::from_u8(buffer[index + 1]),
                math::from_u8(buffer[index + 2]),
                math::from_u8(buffer[index + 3]),
            ),
            Texels::Hdr(buffer) => Vec4::new(
                buffer[index],
                buffer[index + 1],
                buffer[index + 2],
                buffer[index + 3],
            ),
        }
    }

    /// Nearest sample with coordinates wrapped by their fractional part.
    pub fn repeat_sample(&self, texcoord: Vec2) -> Vec4 {
        let u = texcoord.x - texcoord.x.floor();
        let v = texcoord.y - texcoord.y.floor();
        self.fetch(u, v)
    }

    /// Nearest sample with coordinates clamped to [0, 1].
    pub fn clamp_sample(&self, texcoord: Vec2) -> Vec4 {
        self.fetch(math::saturate(texcoord.x), math::saturate(texcoord.y))
    }

    /// Nearest sample in the default (repeat) wrap mode.
    #[inline]
    pub fn sample(&self, texcoord: Vec2) -> Vec4 {
        self.repeat_sample(texcoord)
    }
}

fn expand_channels<T: Copy>(buffer: &[T], channels: usize, opaque: T) -> Vec<T> {
    let mut texels = Vec::with_capacity(buffer.len() / channels * 4);
    for pixel in buffer.chunks_exact(channels) {
        match channels {
            1 => texels.extend_from_slice(&[pixel[0], pixel[0], pixel[0], opaque]),
            2 => texels.extend_from_slice(&[pixel[0], pixel[0], pixel[0], pixel[1]]),
            3 => texels.extend_from_slice(&[pixel[0], pixel[1], pixel[2], opaque]),
            _ => texels.extend_from_slice(pixel),
        }
    }
    texels
}

/// Six textures ordered +X, -X, +Y, -Y, +Z, -Z.
#[derive(Debug, Clone)]
pub struct Cubemap {
    faces: [Texture; 6],
}

impl Cubemap {
    pub fn new(faces: [Texture; 6]) -> Cubemap {
        Cubemap { faces }
    }

    /// Loads the six faces in +X, -X, +Y, -Y, +Z, -Z order.
    pub fn from_files<P: AsRef<Path>>(paths: &[P; 6], usage: Usage) -> RenderResult<Cubemap> {
        Ok(Cubemap {
            faces: [
                Texture::from_file(&paths[0], usage)?,
                Texture::from_file(&paths[1], usage)?,
                Texture::from_file(&paths[2], usage)?,
                Texture::from_file(&paths[3], usage)?,
                Texture::from_file(&paths[4], usage)?,
                Texture::from_file(&paths[5], usage)?,
            ],
        })
    }

    pub fn repeat_sample(&self, direction: Vec3) -> Vec4 {
        let (face, texcoord) = select_face(direction);
        self.faces[face].repeat_sample(texcoord)
    }

    pub fn clamp_sample(&self, direction: Vec3) -> Vec4 {
        let (face, texcoord) = select_face(direction);
        self.faces[face].clamp_sample(texcoord)
    }

    #[inline]
    pub fn sample(&self, direction: Vec3) -> Vec4 {
        self.repeat_sample(direction)
    }
}

/// Picks the face whose axis has the largest absolute component and maps
/// the remaining components to face-local coordinates.
fn select_face(direction: Vec3) -> (usize, Vec2) {
    let abs_x = direction.x.abs();
    let abs_y = direction.y.abs();
    let abs_z = direction.z.abs();

    let (face, major, sc, tc) = if abs_x > abs_y && abs_x > abs_z {
        if direction.x > 0.0 {
            (0, abs_x, -direction.z, -direction.y)
        } else {
            (1, abs_x, direction.z, -direction.y)
        }
    } else if abs_y > abs_z {
        if direction.y > 0.0 {
            (2, abs_y, direction.x, direction.z)
        } else {
            (3, abs_y, direction.x, -direction.z)
        }
    } else if direction.z > 0.0 {
        (4, abs_z, direction.x, -direction.y)
    } else {
        (5, abs_z, -direction.x, -direction.y)
    };

    let u = (sc / major + 1.0) / 2.0;
    let v = 1.0 - (tc / major + 1.0) / 2.0;
    (face, Vec2::new(u, v))
}

/// Prefiltered environment data for image-based lighting: an irradiance
/// cubemap, a roughness-indexed chain of specular cubemaps, and the
/// split-sum BRDF lookup table.
#[derive(Debug, Clone)]
pub struct IblData {
    pub diffuse: Cubemap,
    pub specular: Vec<Cubemap>,
    pub brdf_lut: Texture,
}

impl IblData {
    /// Number of specular mip levels.
    #[inline]
    pub fn mip_levels(&self) -> usize {
        self.specular.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard() -> Texture {
        // 2x2 texture: red, green / blue, white
        let mut image = Image::new_ldr(2, 2, 3);
        image.ldr_pixels_mut().copy_from_slice(&[
            255, 0, 0, 0, 255, 0, //
            0, 0, 255, 255, 255, 255,
        ]);
        Texture::from_image(image, Usage::LdrData)
    }

    #[test]
    fn nearest_sampling_hits_corners() {
        let texture = checkerboard();
        assert_eq!(texture.sample(Vec2::new(0.0, 0.0)), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(texture.sample(Vec2::new(1.0, 0.0)), Vec4::new(0.0, 1.0, 0.0, 1.0));
        assert_eq!(texture.sample(Vec2::new(0.0, 1.0)), Vec4::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(texture.sample(Vec2::new(1.0, 1.0)), Vec4::new(1.0, 1.0, 1.0, 1.0));
    }

    #[test]
    fn repeat_wraps_and_clamp_saturates() {
        let texture = checkerboard();
        let wrapped = texture.repeat_sample(Vec2::new(2.0, -1.0));
        assert_eq!(wrapped, texture.sample(Vec2::new(0.0, 0.0)));
        let clamped = texture.clamp_sample(Vec2::new(7.5, -3.0));
        assert_eq!(clamped, texture.sample(Vec2::new(1.0, 0.0)));
    }

    #[test]
    fn gray_images_broadcast_to_rgb() {
        let mut image = Image::new_ldr(1, 1, 1);
        image.ldr_pixels_mut()[0] = 51;
        let texture = Texture::from_image(image, Usage::LdrData);
        let sample = texture.sample(Vec2::new(0.0, 0.0));
        assert_eq!(sample, Vec4::new(0.2, 0.2, 0.2, 1.0));
    }

    #[test]
    fn axis_directions_select_faces_at_center() {
        let axes = [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, -1.0),
        ];
        for (expected, axis) in axes.iter().enumerate() {
            let (face, texcoord) = select_face(*axis);
            assert_eq!(face, expected);
            assert_eq!(texcoord, Vec2::new(0.5, 0.5));
        }
    }

    #[test]
    fn depth_snapshot_broadcasts_depth() {
        let framebuffer = Framebuffer::new(2, 2);
        let texture = Texture::from_depth_buffer(&framebuffer);
        assert_eq!(texture.format(), Format::Hdr);
        assert_eq!(texture.sample(Vec2::new(0.0, 0.0)), Vec4::new(1.0, 1.0, 1.0, 1.0));
    }
}
