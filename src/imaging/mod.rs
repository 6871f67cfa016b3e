//! Image normalization in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (magic-byte signature, extension hint as fallback) |
//! | **Encode** | `DynamicImage::write_to` → PNG or BMP |
//!
//! The module is split into:
//! - **Parameters**: canonical output format and extension → codec hints
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: [`normalize_image`], the decode → encode driver

pub mod backend;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use operations::normalize_image;
pub use params::{CanonicalFormat, codec_hint, known_extensions};
pub use rust_backend::RustBackend;
