//! Run orchestration.
//!
//! A run takes a batch of archives through three stages and reports a single
//! progress stream from 0 to 100:
//!
//! ```text
//! A  detect   0–30%   open each archive, build its tree, find units   (parallel, per archive)
//! B  extract 30–80%   parse each unit, normalize its images           (sequential)
//! C  package 80–100%  re-packaged ZIP, CSV export, data package       (each isolated)
//! ```
//!
//! ## Failure isolation
//!
//! Only an empty input (or an internal panic) makes a run fail. Everything
//! else degrades: a corrupt archive contributes no units, a malformed unit is
//! discarded, an undecodable image is dropped from its unit, and a failed
//! artifact is left `None`. Each of these is logged.
//!
//! ## Index assignment
//!
//! Stage B walks units in detection order (archives in input order, each
//! archive depth-first) and hands out indices from a single counter that only
//! advances on success, so the parsed units are always numbered `1..=n`.

use crate::archive::{ArchiveError, ArchiveInput, ZipSource};
use crate::config::{PipelineConfig, effective_threads};
use crate::detect::{FolderUnit, detect_units};
use crate::extract::extract_unit;
use crate::imaging::{ImageBackend, RustBackend};
use crate::package::{data_package, repackage_units, tabular_export};
use crate::types::{ParsedUnitData, RunSummary};
use rayon::prelude::*;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Mutex;
use std::sync::mpsc::Sender;

const DETECT_END: u8 = 30;
const EXTRACT_END: u8 = 80;

/// Everything a run needs as input.
#[derive(Debug, Clone, Default)]
pub struct PipelineInput {
    pub archives: Vec<ArchiveInput>,
}

/// A progress update. `percent` never decreases within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub message: String,
    pub percent: u8,
}

/// Outcome of a run. Always returned, even when the run failed.
#[derive(Debug, Clone, Default)]
pub struct PipelineResult {
    pub success: bool,
    pub repackaged_archive: Option<Vec<u8>>,
    pub tabular_export: Option<Vec<u8>>,
    pub data_package: Option<Vec<u8>>,
    pub summary: RunSummary,
    pub parsed_units: Vec<ParsedUnitData>,
    pub error: Option<String>,
}

impl PipelineResult {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Serializes progress events and keeps `percent` monotonic, even when
/// archive workers finish out of order.
struct Reporter {
    tx: Option<Sender<ProgressEvent>>,
    last: Mutex<u8>,
}

impl Reporter {
    fn new(tx: Option<Sender<ProgressEvent>>) -> Self {
        Self {
            tx,
            last: Mutex::new(0),
        }
    }

    fn report(&self, message: impl Into<String>, percent: u8) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let percent = percent.clamp(*last, 100);
        *last = percent;
        if let Some(tx) = &self.tx {
            // A dropped receiver just means nobody is listening.
            let _ = tx.send(ProgressEvent {
                message: message.into(),
                percent,
            });
        }
    }
}

/// Linearly map `done / total` into `start..=end`.
fn remap(done: usize, total: usize, start: u8, end: u8) -> u8 {
    if total == 0 {
        return end;
    }
    let span = (end - start) as usize;
    start + (done.min(total) * span / total) as u8
}

/// Run the pipeline with the pure Rust image backend.
pub fn run(
    input: &PipelineInput,
    config: &PipelineConfig,
    progress: Option<Sender<ProgressEvent>>,
) -> PipelineResult {
    run_with_backend(&RustBackend::new(), input, config, progress)
}

/// Run the pipeline using a specific image backend (allows testing with mock).
pub fn run_with_backend(
    backend: &impl ImageBackend,
    input: &PipelineInput,
    config: &PipelineConfig,
    progress: Option<Sender<ProgressEvent>>,
) -> PipelineResult {
    if input.archives.is_empty() {
        log::error!("run rejected: no archives supplied");
        return PipelineResult::failure("No archives supplied");
    }

    let reporter = Reporter::new(progress);
    match catch_unwind(AssertUnwindSafe(|| run_stages(backend, input, config, &reporter))) {
        Ok(result) => result,
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("run aborted by internal fault: {reason}");
            PipelineResult::failure(format!("Internal error: {reason}"))
        }
    }
}

fn run_stages(
    backend: &impl ImageBackend,
    input: &PipelineInput,
    config: &PipelineConfig,
    reporter: &Reporter,
) -> PipelineResult {
    // Stage A
    let (archives_processed, units) = detect_all(&input.archives, config, reporter);
    let summary = RunSummary {
        archives_processed,
        total_units_found: units.len(),
        unit_infos: units.iter().map(FolderUnit::info).collect(),
    };
    log::info!(
        "detected {} unit(s) in {}/{} archive(s)",
        units.len(),
        archives_processed,
        input.archives.len()
    );

    if units.is_empty() {
        reporter.report("No units found", 100);
        return PipelineResult {
            success: true,
            summary,
            error: Some(format!(
                "No qualifying folder structures found in {} archive(s)",
                input.archives.len()
            )),
            ..Default::default()
        };
    }

    // Stage B
    let parsed_units = extract_all(backend, &units, config, reporter);

    // Stage C
    let mut result = PipelineResult {
        success: true,
        summary,
        ..Default::default()
    };

    reporter.report("Building re-packaged archive", 85);
    result.repackaged_archive = isolate("re-packaged archive", || repackage_units(&units));

    if !parsed_units.is_empty() {
        reporter.report("Building tabular export", 90);
        result.tabular_export = isolate("tabular export", || {
            tabular_export(&parsed_units, config.export.max_content_chars)
        });

        reporter.report("Building data package", 95);
        result.data_package = isolate("data package", || {
            data_package(&parsed_units, config.images.canonical_format)
        });
    } else {
        log::warn!("no unit parsed successfully; skipping tabular export and data package");
    }

    reporter.report(
        format!(
            "Done: {} of {} unit(s) parsed",
            parsed_units.len(),
            units.len()
        ),
        100,
    );
    result.parsed_units = parsed_units;
    result
}

/// Stage A: open and scan every archive in parallel.
///
/// Returns how many archives opened, and all units in input order.
fn detect_all(
    archives: &[ArchiveInput],
    config: &PipelineConfig,
    reporter: &Reporter,
) -> (usize, Vec<FolderUnit>) {
    reporter.report(format!("Reading {} archive(s)", archives.len()), 0);
    let done = Mutex::new(0usize);
    let total = archives.len();

    let scan_one = |archive: &ArchiveInput| {
        let result = scan_archive(archive);
        match &result {
            Ok(units) => log::info!("{}: {} unit(s)", archive.name, units.len()),
            Err(e) => log::warn!("{}: skipped, {e}", archive.name),
        }
        let mut done = done.lock().unwrap_or_else(|e| e.into_inner());
        *done += 1;
        reporter.report(
            format!("Scanned {} ({}/{})", archive.name, *done, total),
            remap(*done, total, 0, DETECT_END),
        );
        result
    };

    let results: Vec<Result<Vec<FolderUnit>, ArchiveError>> =
        match rayon::ThreadPoolBuilder::new()
            .num_threads(effective_threads(&config.processing))
            .build()
        {
            Ok(pool) => pool.install(|| archives.par_iter().map(&scan_one).collect()),
            Err(e) => {
                log::warn!("falling back to the global thread pool: {e}");
                archives.par_iter().map(&scan_one).collect()
            }
        };

    let mut processed = 0;
    let mut units = Vec::new();
    for found in results.into_iter().flatten() {
        processed += 1;
        units.extend(found);
    }
    (processed, units)
}

/// Open one archive and detect its units.
pub fn scan_archive(archive: &ArchiveInput) -> Result<Vec<FolderUnit>, ArchiveError> {
    let mut source = ZipSource::open(&archive.bytes)?;
    Ok(detect_units(&mut source, &archive.name))
}

/// Stage B: extract units in order, numbering successes from 1.
fn extract_all(
    backend: &impl ImageBackend,
    units: &[FolderUnit],
    config: &PipelineConfig,
    reporter: &Reporter,
) -> Vec<ParsedUnitData> {
    let total = units.len();
    let mut parsed = Vec::new();
    let mut next_index: u32 = 1;

    for (i, unit) in units.iter().enumerate() {
        let percent = remap(i, total, DETECT_END, EXTRACT_END);
        reporter.report(
            format!("Parsing unit {}/{}: {}", i + 1, total, unit.name),
            percent,
        );
        let mut on_image = |status: &str| reporter.report(status, percent);

        match extract_unit(backend, unit, next_index, config, Some(&mut on_image)) {
            Ok(data) => {
                next_index += 1;
                parsed.push(data);
            }
            Err(reason) => log::warn!(
                "{} ({}): discarded, {reason}",
                unit.name,
                unit.source_archive_name
            ),
        }
    }

    reporter.report(
        format!("Parsed {}/{} unit(s)", parsed.len(), total),
        EXTRACT_END,
    );
    parsed
}

/// Run one artifact builder; a failure is logged and becomes `None`.
fn isolate<E: std::fmt::Display>(
    label: &str,
    build: impl FnOnce() -> Result<Vec<u8>, E>,
) -> Option<Vec<u8>> {
    match build() {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            log::error!("failed to build {label}: {e}");
            None
        }
    }
}
