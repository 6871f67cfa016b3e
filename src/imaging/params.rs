//! Parameter types for image normalization.
//!
//! - [`CanonicalFormat`]: the one lossless output encoding every image is
//!   normalized to. Selected in config, `png` by default.
//! - [`codec_hint`]: maps a file extension to a decoder, used when the content
//!   carries no signature.

use image::ImageFormat;
use serde::{Deserialize, Serialize};

/// Lossless encoding every normalized image ends up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalFormat {
    #[default]
    Png,
    Bmp,
}

impl CanonicalFormat {
    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Bmp => ImageFormat::Bmp,
        }
    }

    /// File extension used when the encoded bytes are written out.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Bmp => "bmp",
        }
    }
}

/// Extensions with a compiled-in decoder, and the format each maps to.
const CODEC_HINTS: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("jfif", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("gif", ImageFormat::Gif),
    ("bmp", ImageFormat::Bmp),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
    ("ico", ImageFormat::Ico),
    ("tga", ImageFormat::Tga),
];

/// Decoder hint for a lowercased extension. `None` means sniff the content.
pub fn codec_hint(extension: &str) -> Option<ImageFormat> {
    CODEC_HINTS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, fmt)| *fmt)
}

/// All extensions that have a codec hint.
pub fn known_extensions() -> impl Iterator<Item = &'static str> {
    CODEC_HINTS.iter().map(|(ext, _)| *ext)
}
