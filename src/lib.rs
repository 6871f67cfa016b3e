//! # Unitpack
//!
//! Batch converter for archives of "units": folders that each hold an image
//! subfolder and, optionally, a text subfolder. Archives go in; three
//! artifacts come out.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! ```text
//! A. Detect    archives  →  FolderUnit[]      (zip → tree → unit detection)
//! B. Extract   units     →  ParsedUnitData[]  (name parsing, text, image normalization)
//! C. Package   parsed    →  artifacts         (re-packaged ZIP, CSV, data package)
//! ```
//!
//! Stages communicate through plain Rust values; nothing touches the
//! filesystem until the CLI writes the final artifacts. Library code never
//! prints: diagnostics go through the `log` facade and user-facing progress is
//! a stream of [`pipeline::ProgressEvent`]s.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`archive`] | ZIP access behind the [`archive::ArchiveSource`] trait |
//! | [`tree`] | Directory tree built from archive entry paths |
//! | [`detect`] | Two-level unit detection (first match wins, no descent) |
//! | [`naming`] | `prefix+identifier+title - order` file name parser |
//! | [`imaging`] | Image decoding and re-encoding into the canonical format |
//! | [`extract`] | Unit → [`types::ParsedUnitData`] |
//! | [`package`] | Re-packaged ZIP, CSV export, data package |
//! | [`pipeline`] | Stage orchestration, progress, failure isolation |
//! | [`config`] | `unitpack.toml` loading, merging over stock defaults, validation |
//! | [`types`] | Types shared between extraction and packaging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Degrade, Don't Abort
//!
//! A batch is usually hundreds of folders assembled by hand. One corrupt
//! archive, one badly named image, or one truncated JPEG must not cost the rest
//! of the batch. Each tier (archive, unit, image, artifact) is isolated: a
//! failure drops that item, is logged, and shows up in the counts.
//!
//! ## Contiguous Indices
//!
//! Parsed units are numbered `1..=n` in detection order with no gaps, so the
//! CSV row number, the data package folder and the manifest all agree even when
//! units in between were discarded.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and encoding use the `image` crate only. No system libraries are
//! needed, and the [`imaging::ImageBackend`] trait lets tests substitute a mock.

pub mod archive;
pub mod config;
pub mod detect;
pub mod extract;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod package;
pub mod pipeline;
pub mod tree;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
