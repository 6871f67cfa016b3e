//! Shared test utilities for the unitpack test suite.
//!
//! Builds archives and images in memory so tests never need fixture files.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let zip = build_zip(&[("u/images/a+b+c.png", &png_bytes(4, 4))], &[]);
//! ```

use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

/// Build a ZIP in memory from `(path, bytes)` files plus explicit directory entries.
pub fn build_zip(files: &[(&str, &[u8])], dirs: &[&str]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    for dir in dirs {
        writer.add_directory(dir.to_string(), options).unwrap();
    }
    for (path, content) in files {
        writer.start_file(path.to_string(), options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

/// A small valid PNG with a gradient pattern.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient(width, height), ImageFormat::Png)
}

/// A small valid JPEG with a gradient pattern.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient(width, height), ImageFormat::Jpeg)
}

fn u16_at(bytes: &[u8], pos: usize) -> usize {
    u16::from_le_bytes([bytes[pos], bytes[pos + 1]]) as usize
}

fn u32_at(bytes: &[u8], pos: usize) -> usize {
    u32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize
}

/// Rewrite a single-entry ZIP (as made by [`build_zip`]) so its central
/// directory declares `declared` uncompressed bytes through a ZIP64 extra
/// field. The stored data is left untouched.
pub fn declare_zip64_size(zip: &[u8], declared: u64) -> Vec<u8> {
    const EOCD_LEN: usize = 22;
    const CENTRAL_HEADER_LEN: usize = 46;

    let eocd = zip.len() - EOCD_LEN;
    assert_eq!(&zip[eocd..eocd + 4], b"PK\x05\x06", "archive must have no comment");
    assert_eq!(u16_at(zip, eocd + 10), 1, "archive must hold exactly one entry");
    let cd_size = u32_at(zip, eocd + 12);
    let cd_offset = u32_at(zip, eocd + 16);
    let cd = &zip[cd_offset..cd_offset + cd_size];

    let name_len = u16_at(cd, 28);
    let extra_len = u16_at(cd, 30);
    let vars_end = CENTRAL_HEADER_LEN + name_len + extra_len;

    let mut zip64 = Vec::with_capacity(12);
    zip64.extend_from_slice(&1u16.to_le_bytes());
    zip64.extend_from_slice(&8u16.to_le_bytes());
    zip64.extend_from_slice(&declared.to_le_bytes());

    let mut header = cd[..CENTRAL_HEADER_LEN].to_vec();
    header[6..8].copy_from_slice(&45u16.to_le_bytes());
    header[24..28].copy_from_slice(&u32::MAX.to_le_bytes());
    header[30..32].copy_from_slice(&((extra_len + zip64.len()) as u16).to_le_bytes());

    let mut out = zip[..cd_offset].to_vec();
    out.extend_from_slice(&header);
    out.extend_from_slice(&cd[CENTRAL_HEADER_LEN..vars_end]);
    out.extend_from_slice(&zip64);
    out.extend_from_slice(&cd[vars_end..]);

    let mut eocd_bytes = zip[eocd..].to_vec();
    eocd_bytes[12..16].copy_from_slice(&((cd_size + zip64.len()) as u32).to_le_bytes());
    out.extend_from_slice(&eocd_bytes);
    out
}
