//! High-level image operations.
//!
//! These functions pick the decoder hint from the file name and drive the
//! backend through decode → encode.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{CanonicalFormat, codec_hint};
use crate::naming::extension;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Decode `bytes` (named `file_name`) and re-encode them as `format`.
///
/// The decoded bitmap lives only for the duration of this call.
pub fn normalize_image(
    backend: &impl ImageBackend,
    file_name: &str,
    bytes: &[u8],
    format: CanonicalFormat,
) -> Result<Vec<u8>> {
    let hint = extension(file_name).and_then(|ext| codec_hint(&ext));
    let decoded = backend.decode(file_name, bytes, hint)?;
    let dims = Dimensions::from(&decoded);
    log::debug!(
        "{file_name}: decoded {}x{} ({:?})",
        dims.width,
        dims.height,
        decoded.color()
    );
    backend.encode(&decoded, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::jpeg_bytes;
    use image::ImageFormat;

    #[test]
    fn hint_comes_from_extension() {
        let backend = MockBackend::new();
        normalize_image(&backend, "A+B+C.JPEG", b"x", CanonicalFormat::Png).unwrap();

        let ops = backend.get_operations();
        assert_eq!(
            ops[0],
            RecordedOp::Decode {
                name: "A+B+C.JPEG".into(),
                hint: Some(ImageFormat::Jpeg)
            }
        );
        assert_eq!(ops[1], RecordedOp::Encode(CanonicalFormat::Png));
    }

    #[test]
    fn unknown_extension_passes_no_hint() {
        let backend = MockBackend::new();
        normalize_image(&backend, "scan.heic", b"x", CanonicalFormat::Png).unwrap();
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Decode { hint: None, .. }
        ));
    }

    #[test]
    fn decode_failure_skips_encode() {
        let backend = MockBackend::new();
        let result = normalize_image(&backend, "a.png", b"CORRUPT", CanonicalFormat::Png);
        assert!(result.is_err());
        assert_eq!(backend.get_operations().len(), 1);
    }

    #[test]
    fn real_jpeg_becomes_png() {
        let out = normalize_image(
            &RustBackend::new(),
            "photo.jpg",
            &jpeg_bytes(16, 8),
            CanonicalFormat::Png,
        )
        .unwrap();
        let back = image::load_from_memory_with_format(&out, ImageFormat::Png).unwrap();
        assert_eq!((back.width(), back.height()), (16, 8));
    }
}
