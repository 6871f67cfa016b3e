//! Unit data extraction.
//!
//! Turns one detected [`FolderUnit`] into a [`ParsedUnitData`]:
//!
//! 1. find the image subfolder (configured aliases, case-insensitive)
//! 2. keep files with an image extension
//! 3. parse the first image's name for identifier and title
//! 4. read the optional text subfolder into `content`
//! 5. normalize every image, skipping the ones that fail
//! 6. sort images by their order suffix
//!
//! Any step can reject the unit. Rejection is a [`DiscardReason`], never an
//! error for the batch.

use crate::config::PipelineConfig;
use crate::detect::{FileData, FolderUnit, SubfolderData};
use crate::imaging::{ImageBackend, normalize_image};
use crate::naming::{NameParseError, extension, parse_file_name};
use crate::types::{ParsedImage, ParsedUnitData};
use thiserror::Error;

/// Why a unit produced no [`ParsedUnitData`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    #[error("no image subfolder")]
    NoImageFolder,
    #[error("image subfolder \"{0}\" has no recognized image files")]
    NoImageFiles(String),
    #[error("cannot parse lead image name \"{name}\": {source}")]
    UnparseableName {
        name: String,
        #[source]
        source: NameParseError,
    },
    #[error("none of {0} images could be normalized")]
    NoUsableImages(usize),
}

/// Extract `unit`, stamping the result with `index`.
///
/// `on_image` receives a status line before each image is normalized.
pub fn extract_unit(
    backend: &impl ImageBackend,
    unit: &FolderUnit,
    index: u32,
    config: &PipelineConfig,
    mut on_image: Option<&mut dyn FnMut(&str)>,
) -> Result<ParsedUnitData, DiscardReason> {
    let image_folder = unit
        .subfolders
        .iter()
        .find(|s| config.is_image_folder(&s.name))
        .ok_or(DiscardReason::NoImageFolder)?;

    let image_files: Vec<&FileData> = image_folder
        .files
        .iter()
        .filter(|f| extension(&f.name).is_some_and(|ext| config.is_image_extension(&ext)))
        .collect();
    let lead = image_files
        .first()
        .ok_or_else(|| DiscardReason::NoImageFiles(image_folder.name.clone()))?;

    let lead_name =
        parse_file_name(&lead.name).map_err(|source| DiscardReason::UnparseableName {
            name: lead.name.clone(),
            source,
        })?;

    let content = unit
        .subfolders
        .iter()
        .find(|s| config.is_text_folder(&s.name))
        .and_then(|s| read_text(s, config))
        .unwrap_or_default();

    let format = config.images.canonical_format;
    let total = image_files.len();
    let mut images = Vec::with_capacity(total);

    for (pos, file) in image_files.iter().enumerate() {
        if let Some(cb) = on_image.as_mut() {
            cb(&format!(
                "{}: image {}/{} {}",
                unit.name,
                pos + 1,
                total,
                file.name
            ));
        }

        let order = parse_file_name(&file.name)
            .map(|p| p.order)
            .unwrap_or(pos as u32 + 1);

        match normalize_image(backend, &file.name, &file.bytes, format) {
            Ok(canonical_bytes) => images.push(ParsedImage {
                original_name: file.name.clone(),
                order,
                canonical_bytes,
            }),
            Err(e) => log::warn!("{}: skipping image {}: {e}", unit.name, file.name),
        }
    }

    if images.is_empty() {
        return Err(DiscardReason::NoUsableImages(total));
    }

    // Stable: equal orders keep their position in the folder.
    images.sort_by_key(|img| img.order);

    Ok(ParsedUnitData {
        index,
        identifier: lead_name.identifier,
        title: lead_name.title,
        content,
        images,
        source_unit_name: unit.name.clone(),
    })
}

/// First text-like file in `folder`, decoded as UTF-8.
fn read_text(folder: &SubfolderData, config: &PipelineConfig) -> Option<String> {
    let file = folder
        .files
        .iter()
        .find(|f| extension(&f.name).is_some_and(|ext| config.is_text_extension(&ext)))?;
    let text = String::from_utf8_lossy(&file.bytes);
    Some(text.trim_start_matches('\u{feff}').trim().to_string())
}
