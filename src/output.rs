//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every entity leads with its positional index and name. File system detail
//! (source archive, path inside the archive) follows on indented context lines,
//! so the output reads as an inventory of units while still pointing back to
//! where each one came from.
//!
//! # Output Format
//!
//! ## Detect
//!
//! ```text
//! batch-01.zip (2 units)
//!     001 Harbor (2 subfolders, 5 files)
//!         Source: 2024/Harbor
//!     002 Market (1 subfolder, 3 files)
//!         Source: 2024/Market
//! ```
//!
//! ## Run
//!
//! ```text
//! [ 42%] Parsing unit 3/7: Harbor
//! ...
//! Archives: 2 processed
//! Units: 7 found, 6 parsed
//!     001 ID7 Harbor (3 images)
//!         Source: Harbor
//! Artifacts
//!     repackaged.zip
//!     units.csv
//!     data_package.zip
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure.

use crate::detect::UnitInfo;
use crate::pipeline::{PipelineResult, ProgressEvent};

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 unit`, `2 units`.
fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{} {}", n, noun)
    } else {
        format!("{} {}s", n, noun)
    }
}

// ============================================================================
// Detect output
// ============================================================================

/// Format the units detected in one archive.
pub fn format_detect_output(archive_name: &str, units: &[UnitInfo]) -> Vec<String> {
    let mut lines = vec![format!("{} ({})", archive_name, plural(units.len(), "unit"))];
    for (i, unit) in units.iter().enumerate() {
        lines.push(format!(
            "{}{} {} ({}, {})",
            indent(1),
            format_index(i + 1),
            unit.name,
            plural(unit.subfolder_count, "subfolder"),
            plural(unit.file_count, "file"),
        ));
        lines.push(format!("{}Source: {}", indent(2), unit.original_path));
    }
    lines
}

/// Format an archive that could not be opened.
pub fn format_detect_error(archive_name: &str, error: &dyn std::fmt::Display) -> Vec<String> {
    vec![
        format!("{} (unreadable)", archive_name),
        format!("{}{}", indent(1), error),
    ]
}

/// Print detect output to stdout.
pub fn print_detect_output(archive_name: &str, units: &[UnitInfo]) {
    for line in format_detect_output(archive_name, units) {
        println!("{}", line);
    }
}

// ============================================================================
// Run output
// ============================================================================

/// Format a single progress event.
pub fn format_progress_event(event: &ProgressEvent) -> String {
    format!("[{:>3}%] {}", event.percent, event.message)
}

/// Format the end-of-run report: counts, parsed units, and which artifacts
/// were produced.
pub fn format_run_summary(result: &PipelineResult) -> Vec<String> {
    let mut lines = Vec::new();

    if !result.success {
        lines.push(format!(
            "Run failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        ));
        return lines;
    }

    let summary = &result.summary;
    lines.push(format!("Archives: {} processed", summary.archives_processed));
    lines.push(format!(
        "Units: {} found, {} parsed",
        summary.total_units_found,
        result.parsed_units.len()
    ));
    for unit in &result.parsed_units {
        lines.push(format!(
            "{}{} {} {} ({})",
            indent(1),
            format_index(unit.index as usize),
            unit.identifier,
            unit.title,
            plural(unit.images.len(), "image"),
        ));
        lines.push(format!("{}Source: {}", indent(2), unit.source_unit_name));
    }

    if let Some(message) = &result.error {
        lines.push(message.clone());
    }

    let artifacts: Vec<&str> = [
        (result.repackaged_archive.is_some(), REPACKAGED_FILE),
        (result.tabular_export.is_some(), TABULAR_FILE),
        (result.data_package.is_some(), DATA_PACKAGE_FILE),
    ]
    .into_iter()
    .filter_map(|(present, name)| present.then_some(name))
    .collect();

    if !artifacts.is_empty() {
        lines.push("Artifacts".to_string());
        for name in artifacts {
            lines.push(format!("{}{}", indent(1), name));
        }
    }
    lines
}

/// Print the end-of-run report to stdout.
pub fn print_run_summary(result: &PipelineResult) {
    for line in format_run_summary(result) {
        println!("{}", line);
    }
}

/// File name the CLI writes the re-packaged archive to.
pub const REPACKAGED_FILE: &str = "repackaged.zip";
/// File name the CLI writes the tabular export to.
pub const TABULAR_FILE: &str = "units.csv";
/// File name the CLI writes the data package to.
pub const DATA_PACKAGE_FILE: &str = "data_package.zip";
