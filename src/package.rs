//! Output artifacts.
//!
//! Three artifacts come out of a run, each built entirely in memory:
//!
//! | Artifact | Format | Built from |
//! |---|---|---|
//! | Re-packaged archive | ZIP | every detected [`FolderUnit`], raw bytes |
//! | Tabular export | CSV (UTF-8 with BOM) | successful [`ParsedUnitData`] |
//! | Data package | ZIP: `manifest.json` + image files | successful [`ParsedUnitData`] |
//!
//! ## Data package layout
//!
//! ```text
//! manifest.json
//! images/
//! ├── 1/
//! │   ├── 001_A+X01+Sunrise - 1.png
//! │   └── 002_A+X01+Sunrise - 2.png
//! └── 2/
//!     └── 001_A+X02+Dusk.png
//! ```
//!
//! The manifest lists each unit's images as relative paths in display
//! order. Pixel data is never inlined in JSON, so consumers can stream a
//! large package one image at a time.

use crate::archive::{archive_stem, read_entry};
use crate::detect::FolderUnit;
use crate::imaging::CanonicalFormat;
use crate::naming::file_stem;
use crate::types::ParsedUnitData;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::io::{Cursor, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Name of the manifest entry inside a data package.
pub const MANIFEST_NAME: &str = "manifest.json";

/// Version of the data package manifest format.
pub const MANIFEST_VERSION: u32 = 1;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Fixed leading CSV columns; image name columns follow.
const FIXED_COLUMNS: [&str; 4] = ["index", "identifier", "title", "content"];

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No parsed units to export")]
    NoUnits,
    #[error("Data package is missing {0}")]
    MissingEntry(String),
}

/// Manifest written at the root of a data package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub version: u32,
    pub generated_units: usize,
    pub units: Vec<PackageUnit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageUnit {
    pub index: u32,
    pub identifier: String,
    pub title: String,
    pub content: String,
    pub source_unit_name: String,
    /// Paths relative to the package root, in display order.
    pub images: Vec<String>,
}

/// A data package read back into memory.
#[derive(Debug, Clone)]
pub struct DataPackage {
    pub manifest: PackageManifest,
    /// Every non-manifest entry, keyed by path.
    pub files: BTreeMap<String, Vec<u8>>,
}

fn file_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Replace characters that would create extra path levels.
fn sanitize_segment(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    match cleaned.trim() {
        "" | "." | ".." => "_".to_string(),
        s => s.to_string(),
    }
}

/// Reserve `base`, or `base_2`, `base_3`, ... if it is already taken.
fn unique_name(base: String, used: &mut HashSet<String>) -> String {
    reserve(base, used, |stem, n| format!("{stem}_{n}"))
}

/// Like [`unique_name`], but the counter goes before the extension:
/// `x.png`, `x_2.png`, `x_3.png`, ...
fn unique_file_name(name: String, used: &mut HashSet<String>) -> String {
    let stem_len = file_stem(&name).len();
    let (stem, ext) = name.split_at(stem_len);
    let (stem, ext) = (stem.to_string(), ext.to_string());
    reserve(name, used, |_, n| format!("{stem}_{n}{ext}"))
}

fn reserve(
    base: String,
    used: &mut HashSet<String>,
    numbered: impl Fn(&str, usize) -> String,
) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = numbered(&base, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

// ============================================================================
// Re-packaged archive
// ============================================================================

/// Write every unit's raw files into a fresh ZIP under
/// `<archive-stem>_<unit-name>/<subfolder>/<file>`.
pub fn repackage_units(units: &[FolderUnit]) -> Result<Vec<u8>, PackageError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = file_options();
    let mut used = HashSet::new();

    for unit in units {
        let base = sanitize_segment(&format!(
            "{}_{}",
            archive_stem(&unit.source_archive_name),
            unit.name
        ));
        let folder = unique_name(base, &mut used);

        // Sanitizing can map distinct names (or duplicate entries) onto one path.
        let mut used_subfolders = HashSet::new();
        for sub in &unit.subfolders {
            let sub_name = unique_name(sanitize_segment(&sub.name), &mut used_subfolders);
            let mut used_files = HashSet::new();
            for file in &sub.files {
                let file_name = unique_file_name(sanitize_segment(&file.name), &mut used_files);
                let path = format!("{folder}/{sub_name}/{file_name}");
                writer.start_file(path, options)?;
                writer.write_all(&file.bytes)?;
            }
        }
    }

    Ok(writer.finish()?.into_inner())
}

// ============================================================================
// Tabular export
// ============================================================================

/// Truncate to at most `max_chars` characters, on a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_pos, _)) => &text[..byte_pos],
        None => text,
    }
}

/// One CSV row per unit: index, identifier, title, content, then one column
/// per image holding its original file name.
pub fn tabular_export(
    units: &[ParsedUnitData],
    max_content_chars: usize,
) -> Result<Vec<u8>, PackageError> {
    if units.is_empty() {
        return Err(PackageError::NoUnits);
    }

    let image_columns = units.iter().map(|u| u.images.len()).max().unwrap_or(0);

    let mut wtr = csv::Writer::from_writer(UTF8_BOM.to_vec());

    let mut header: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
    header.extend((1..=image_columns).map(|n| format!("image_{n}")));
    wtr.write_record(&header)?;

    for unit in units {
        let mut row = vec![
            unit.index.to_string(),
            unit.identifier.clone(),
            unit.title.clone(),
            truncate_chars(&unit.content, max_content_chars).to_string(),
        ];
        row.extend(unit.images.iter().map(|img| img.original_name.clone()));
        row.resize(FIXED_COLUMNS.len() + image_columns, String::new());
        wtr.write_record(&row)?;
    }

    wtr.into_inner().map_err(|e| PackageError::Io(e.into_error()))
}

// ============================================================================
// Structured data package
// ============================================================================

/// Relative path of a unit's `position`-th (1-based) image.
fn image_path(index: u32, position: usize, original_name: &str, format: CanonicalFormat) -> String {
    format!(
        "images/{index}/{position:03}_{}.{}",
        sanitize_segment(file_stem(original_name)),
        format.extension()
    )
}

/// Build the data package: `manifest.json` plus every canonical image.
pub fn data_package(
    units: &[ParsedUnitData],
    format: CanonicalFormat,
) -> Result<Vec<u8>, PackageError> {
    if units.is_empty() {
        return Err(PackageError::NoUnits);
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = file_options();
    let mut manifest_units = Vec::with_capacity(units.len());

    for unit in units {
        let mut paths = Vec::with_capacity(unit.images.len());
        for (i, img) in unit.images.iter().enumerate() {
            let path = image_path(unit.index, i + 1, &img.original_name, format);
            writer.start_file(path.as_str(), options)?;
            writer.write_all(&img.canonical_bytes)?;
            paths.push(path);
        }
        manifest_units.push(PackageUnit {
            index: unit.index,
            identifier: unit.identifier.clone(),
            title: unit.title.clone(),
            content: unit.content.clone(),
            source_unit_name: unit.source_unit_name.clone(),
            images: paths,
        });
    }

    let manifest = PackageManifest {
        version: MANIFEST_VERSION,
        generated_units: manifest_units.len(),
        units: manifest_units,
    };
    writer.start_file(MANIFEST_NAME, options)?;
    writer.write_all(&serde_json::to_vec_pretty(&manifest)?)?;

    Ok(writer.finish()?.into_inner())
}

/// Read a data package produced by [`data_package`].
///
/// Fails if the manifest is missing or references an image the package
/// doesn't contain.
pub fn read_data_package(bytes: &[u8]) -> Result<DataPackage, PackageError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut manifest = None;
    let mut files = BTreeMap::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let declared = entry.size();
        let buf = read_entry(&mut entry, declared)?;
        if name == MANIFEST_NAME {
            manifest = Some(serde_json::from_slice::<PackageManifest>(&buf)?);
        } else {
            files.insert(name, buf);
        }
    }

    let manifest = manifest.ok_or_else(|| PackageError::MissingEntry(MANIFEST_NAME.into()))?;
    if let Some(missing) = manifest
        .units
        .iter()
        .flat_map(|u| &u.images)
        .find(|path| !files.contains_key(path.as_str()))
    {
        return Err(PackageError::MissingEntry(missing.clone()));
    }

    Ok(DataPackage { manifest, files })
}
