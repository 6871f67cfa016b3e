//! Image backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations normalization needs:
//! decode arbitrary raster bytes, and encode a bitmap into the canonical
//! format. The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::CanonicalFormat;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to decode {name}: {reason}")]
    Decode { name: String, reason: String },
    #[error("Failed to encode as {format:?}: {reason}")]
    Encode {
        format: CanonicalFormat,
        reason: String,
    },
}

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl From<&DynamicImage> for Dimensions {
    fn from(img: &DynamicImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
        }
    }
}

/// Trait for image codec backends.
pub trait ImageBackend: Sync {
    /// Decode raw bytes. `hint` is the format suggested by the file
    /// extension; `None` asks the backend to sniff the content.
    fn decode(
        &self,
        name: &str,
        bytes: &[u8],
        hint: Option<ImageFormat>,
    ) -> Result<DynamicImage, BackendError>;

    /// Encode a decoded image into `format`, returning the file bytes.
    fn encode(&self, image: &DynamicImage, format: CanonicalFormat)
    -> Result<Vec<u8>, BackendError>;
}
