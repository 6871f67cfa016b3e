//! Pure Rust image backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Pick decoder | `image::guess_format` (magic bytes), else extension hint |
//! | Decode | `image::ImageReader::with_format` |
//! | Encode → PNG / BMP | `DynamicImage::write_to` |
//!
//! Files are often mislabeled (a PNG saved as `.jpg`), so the content's
//! signature decides the decoder when it has one. Each image is decoded
//! exactly once.

use super::backend::{BackendError, ImageBackend};
use super::params::CanonicalFormat;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::borrow::Cow;
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the decoder: magic bytes win, the extension hint covers formats
/// without a signature (TGA).
fn choose_format(name: &str, bytes: &[u8], hint: Option<ImageFormat>) -> Option<ImageFormat> {
    match (image::guess_format(bytes).ok(), hint) {
        (Some(sniffed), Some(hinted)) if sniffed != hinted => {
            log::debug!("{name}: extension says {hinted:?}, content is {sniffed:?}");
            Some(sniffed)
        }
        (Some(sniffed), _) => Some(sniffed),
        (None, hint) => hint,
    }
}

/// Convert pixel layouts the target encoder can't take.
///
/// BMP only stores 8-bit channels; PNG has no float variant.
fn encodable(img: &DynamicImage, format: CanonicalFormat) -> Cow<'_, DynamicImage> {
    match (format, img) {
        (
            CanonicalFormat::Bmp,
            DynamicImage::ImageRgb8(_)
            | DynamicImage::ImageRgba8(_)
            | DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLumaA8(_),
        ) => Cow::Borrowed(img),
        (CanonicalFormat::Bmp, _) if img.color().has_alpha() => {
            Cow::Owned(DynamicImage::ImageRgba8(img.to_rgba8()))
        }
        (CanonicalFormat::Bmp, _) => Cow::Owned(DynamicImage::ImageRgb8(img.to_rgb8())),
        (CanonicalFormat::Png, DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_)) => {
            Cow::Owned(DynamicImage::ImageRgba16(img.to_rgba16()))
        }
        (CanonicalFormat::Png, _) => Cow::Borrowed(img),
    }
}

impl ImageBackend for RustBackend {
    fn decode(
        &self,
        name: &str,
        bytes: &[u8],
        hint: Option<ImageFormat>,
    ) -> Result<DynamicImage, BackendError> {
        let decode_err = |reason: String| BackendError::Decode {
            name: name.to_string(),
            reason,
        };
        let format = choose_format(name, bytes, hint)
            .ok_or_else(|| decode_err("unrecognized image format".to_string()))?;
        ImageReader::with_format(Cursor::new(bytes), format)
            .decode()
            .map_err(|e| decode_err(e.to_string()))
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: CanonicalFormat,
    ) -> Result<Vec<u8>, BackendError> {
        let image = encodable(image, format);
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), format.image_format())
            .map_err(|e| BackendError::Encode {
                format,
                reason: e.to_string(),
            })?;
        Ok(buf)
    }
}
