//! Image file round-trip tests against the TGA subset codec.

use std::fs;
use std::path::PathBuf;

use softpipe::image::{Format, Image};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("softpipe-asset-tests").join(name);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn gradient(width: usize, height: usize, channels: usize) -> Image {
    let mut image = Image::new_ldr(width, height, channels);
    for (k, byte) in image.ldr_pixels_mut().iter_mut().enumerate() {
        *byte = (k * 7 % 256) as u8;
    }
    image
}

#[test]
fn truecolor_tga_files_round_trip_byte_identically() {
    let dir = scratch_dir("roundtrip");
    let first = dir.join("first.tga");
    let second = dir.join("second.tga");

    // a top-down, uncompressed, non-mirrored source file
    gradient(5, 4, 3).save(&first).unwrap();

    let loaded = Image::load(&first).unwrap();
    loaded.save(&second).unwrap();

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn grayscale_tga_files_round_trip() {
    let dir = scratch_dir("grayscale");
    let first = dir.join("first.tga");
    let second = dir.join("second.tga");

    gradient(7, 3, 1).save(&first).unwrap();
    Image::load(&first).unwrap().save(&second).unwrap();
    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn decoded_pixels_survive_the_trip() {
    let dir = scratch_dir("pixels");
    let path = dir.join("image.tga");
    let original = gradient(6, 6, 4);
    original.save(&path).unwrap();

    let loaded = Image::load(&path).unwrap();
    assert_eq!(loaded.width(), 6);
    assert_eq!(loaded.height(), 6);
    assert_eq!(loaded.channels(), 4);
    assert_eq!(loaded.format(), Format::Ldr);
    assert_eq!(loaded.ldr_pixels(), original.ldr_pixels());
}

#[test]
fn rle_and_bottom_up_files_are_decoded() {
    let dir = scratch_dir("rle");
    let path = dir.join("rle.tga");

    // 2x2 bottom-up RLE truecolor file: a run of 3 blue pixels (stored
    // B,G,R) followed by 1 raw red pixel
    let mut file = vec![0u8; 18];
    file[2] = 10; // RLE truecolor
    file[12] = 2;
    file[14] = 2;
    file[16] = 24;
    file[17] = 0; // bottom-up origin
    file.extend_from_slice(&[0x82, 255, 0, 0]);
    file.extend_from_slice(&[0x00, 0, 0, 255]);
    fs::write(&path, &file).unwrap();

    let image = Image::load(&path).unwrap();
    assert_eq!(image.channels(), 3);
    // bottom-up storage flips on load: the file's last row is the top row
    // in memory, so the raw red pixel lands at row 0, column 1 (R,G,B)
    assert_eq!(&image.ldr_pixels()[..3], &[0, 0, 255]);
    assert_eq!(&image.ldr_pixels()[3..6], &[255, 0, 0]);
    assert_eq!(&image.ldr_pixels()[6..], &[0, 0, 255, 0, 0, 255]);
}

#[test]
fn unsupported_files_are_rejected() {
    let dir = scratch_dir("rejects");

    let bad_type = dir.join("type.tga");
    let mut file = vec![0u8; 18];
    file[2] = 1; // color-mapped, unsupported
    file[12] = 1;
    file[14] = 1;
    file[16] = 24;
    fs::write(&bad_type, &file).unwrap();
    assert!(Image::load(&bad_type).is_err());

    let bad_extension = dir.join("image.png");
    fs::write(&bad_extension, b"not a tga").unwrap();
    assert!(Image::load(&bad_extension).is_err());

    assert!(Image::load(dir.join("missing.tga")).is_err());
}
