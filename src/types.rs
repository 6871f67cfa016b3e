//! Shared types produced by extraction and consumed by packaging.

use serde::Serialize;

/// One image after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedImage {
    /// File name as found in the archive.
    pub original_name: String,
    /// Sort key from the `- N` file name suffix (or position fallback).
    pub order: u32,
    /// Bytes in the run's canonical format.
    pub canonical_bytes: Vec<u8>,
}

/// A unit that survived extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUnitData {
    /// 1-based, contiguous across one run's successful units.
    pub index: u32,
    pub identifier: String,
    pub title: String,
    /// Text content, empty when the unit has no text folder.
    pub content: String,
    /// Sorted ascending by `order`.
    pub images: Vec<ParsedImage>,
    pub source_unit_name: String,
}

/// Per-run counters reported back to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Archives that opened successfully.
    pub archives_processed: usize,
    pub total_units_found: usize,
    pub unit_infos: Vec<crate::detect::UnitInfo>,
}
