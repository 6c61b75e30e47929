//! TGA subset codec: uncompressed and RLE true-color/grayscale images with
//! 8-, 24- or 32-bit pixels. Decoded images are normalized to top-down,
//! left-to-right, R,G,B(,A) channel order; files are always written
//! top-down and uncompressed.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::debug;

use crate::error::{RenderError, RenderResult};
use crate::image::Image;

const HEADER_SIZE: usize = 18;

/// Top-down origin flag in the image-descriptor byte.
const DESCRIPTOR_TOP_DOWN: u8 = 0x20;
/// Right-to-left origin flag in the image-descriptor byte.
const DESCRIPTOR_RIGHT_TO_LEFT: u8 = 0x10;

pub fn load(path: &Path) -> RenderResult<Image> {
    let file = File::open(path).map_err(|source| RenderError::FileNotFound {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    if header[0] != 0 {
        return Err(RenderError::malformed("tga image id field is not empty"));
    }
    let width = u16::from_le_bytes([header[12], header[13]]) as usize;
    let height = u16::from_le_bytes([header[14], header[15]]) as usize;
    if width == 0 || height == 0 {
        return Err(RenderError::malformed("tga image has zero extent"));
    }
    let depth = header[16];
    if !matches!(depth, 8 | 24 | 32) {
        return Err(RenderError::malformed(format!("tga pixel depth {depth}")));
    }
    let channels = depth as usize / 8;

    let mut image = Image::new_ldr(width, height, channels);
    let image_type = header[2];
    match image_type {
        2 | 3 => reader.read_exact(image.ldr_pixels_mut())?,
        10 | 11 => decode_rle(&mut reader, image.ldr_pixels_mut(), channels)?,
        other => {
            return Err(RenderError::malformed(format!("tga image type {other}")));
        }
    }

    let descriptor = header[17];
    if descriptor & DESCRIPTOR_TOP_DOWN == 0 {
        image.flip_vertical();
    }
    if descriptor & DESCRIPTOR_RIGHT_TO_LEFT != 0 {
        image.flip_horizontal();
    }
    if channels >= 3 {
        swap_red_blue(&mut image);
    }

    debug!(
        "loaded tga {} ({}x{}, {} channels)",
        path.display(),
        width,
        height,
        channels
    );
    Ok(image)
}

pub fn save(image: &Image, path: &Path) -> RenderResult<()> {
    let buffer = match image.pixels() {
        crate::image::Pixels::Ldr(buffer) => buffer,
        crate::image::Pixels::Hdr(_) => {
            return Err(RenderError::UnsupportedFormat(
                "tga encoding of HDR images".into(),
            ));
        }
    };
    let channels = image.channels();

    let mut header = [0u8; HEADER_SIZE];
    header[2] = if channels == 1 { 3 } else { 2 };
    header[12] = (image.width() & 0xFF) as u8;
    header[13] = ((image.width() >> 8) & 0xFF) as u8;
    header[14] = (image.height() & 0xFF) as u8;
    header[15] = ((image.height() >> 8) & 0xFF) as u8;
    header[16] = (channels * 8) as u8;
    header[17] = DESCRIPTOR_TOP_DOWN;

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&header)?;
    if channels >= 3 {
        // back to the file's B,G,R(,A) order
        let mut pixel = [0u8; 4];
        for texel in buffer.chunks_exact(channels) {
            pixel[..channels].copy_from_slice(texel);
            pixel.swap(0, 2);
            writer.write_all(&pixel[..channels])?;
        }
    } else {
        writer.write_all(buffer)?;
    }
    writer.flush()?;
    Ok(())
}

fn decode_rle(reader: &mut impl Read, buffer: &mut [u8], channels: usize) -> RenderResult<()> {
    let mut filled = 0;
    while filled < buffer.len() {
        let mut packet = [0u8; 1];
        reader.read_exact(&mut packet)?;
        let count = (packet[0] as usize & 0x7F) + 1;
        let run_length = count * channels;
        if filled + run_length > buffer.len() {
            return Err(RenderError::malformed("tga rle packet overruns image"));
        }
        if packet[0] & 0x80 != 0 {
            let mut pixel = [0u8; 4];
            reader.read_exact(&mut pixel[..channels])?;
            for _ in 0..count {
                buffer[filled..filled + channels].copy_from_slice(&pixel[..channels]);
                filled += channels;
            }
        } else {
            reader.read_exact(&mut buffer[filled..filled + run_length])?;
            filled += run_length;
        }
    }
    Ok(())
}

fn swap_red_blue(image: &mut Image) {
    let channels = image.channels();
    for texel in image.ldr_pixels_mut().chunks_exact_mut(channels) {
        texel.swap(0, 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn rle_packets_expand_runs_and_raws() {
        // run of 3 pixels (0x82) then 2 raw pixels (0x01)
        let encoded = [0x82, 9, 9, 9, 0x01, 1, 2, 3, 4, 5, 6];
        let mut buffer = [0u8; 15];
        decode_rle(&mut Cursor::new(&encoded[..]), &mut buffer, 3).unwrap();
        assert_eq!(buffer, [9, 9, 9, 9, 9, 9, 9, 9, 9, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn overlong_rle_packet_is_rejected() {
        let encoded = [0x84, 7];
        let mut buffer = [0u8; 3];
        assert!(decode_rle(&mut Cursor::new(&encoded[..]), &mut buffer, 1).is_err());
    }
}
