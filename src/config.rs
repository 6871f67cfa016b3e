//! Pipeline configuration.
//!
//! Handles loading, validating, and merging `unitpack.toml`. Stock defaults
//! are the base layer; a user file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [folders]
//! image_aliases = ["images", "image", "imgs", "img", "pics", "pictures", "photos", "图片"]
//! text_aliases = ["text", "texts", "txt", "content", "文本", "文字"]
//!
//! [files]
//! image_extensions = ["jpg", "jpeg", "jfif", "png", "gif", "bmp", "tif", "tiff", "webp", "ico", "tga"]
//! text_extensions = ["txt", "md", "text"]
//!
//! [images]
//! canonical_format = "png"  # or "bmp"
//!
//! [export]
//! max_content_chars = 30000 # CSV content cell limit (spreadsheets cap at 32767)
//!
//! [processing]
//! max_processes = 4         # Max parallel archive workers (omit for auto = CPU cores)
//! ```
//!
//! Folder aliases and extensions are matched case-insensitively. Unknown keys
//! are rejected to catch typos early.

use crate::imaging::{CanonicalFormat, known_extensions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Hard per-cell limit shared by the common spreadsheet applications.
pub const SPREADSHEET_CELL_LIMIT: usize = 32_767;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Pipeline configuration loaded from `unitpack.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Subfolder names that mark the image and text parts of a unit.
    pub folders: FoldersConfig,
    /// Which file extensions count as images and as text.
    pub files: FilesConfig,
    /// Image normalization settings.
    pub images: ImagesConfig,
    /// Tabular export settings.
    pub export: ExportConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.folders.image_aliases.is_empty() {
            return Err(ConfigError::Validation(
                "folders.image_aliases must not be empty".into(),
            ));
        }
        if self.files.image_extensions.is_empty() {
            return Err(ConfigError::Validation(
                "files.image_extensions must not be empty".into(),
            ));
        }
        let known: Vec<&str> = known_extensions().collect();
        if let Some(unknown) = self
            .files
            .image_extensions
            .iter()
            .find(|ext| !known.contains(&ext.to_lowercase().as_str()))
        {
            return Err(ConfigError::Validation(format!(
                "files.image_extensions: no decoder for \"{unknown}\" (supported: {})",
                known.join(", ")
            )));
        }
        if self.export.max_content_chars == 0
            || self.export.max_content_chars > SPREADSHEET_CELL_LIMIT
        {
            return Err(ConfigError::Validation(format!(
                "export.max_content_chars must be 1-{SPREADSHEET_CELL_LIMIT}"
            )));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Whether `name` is one of the image folder aliases.
    pub fn is_image_folder(&self, name: &str) -> bool {
        matches_alias(&self.folders.image_aliases, name)
    }

    /// Whether `name` is one of the text folder aliases.
    pub fn is_text_folder(&self, name: &str) -> bool {
        matches_alias(&self.folders.text_aliases, name)
    }

    /// Whether a lowercased extension is a configured image extension.
    pub fn is_image_extension(&self, ext: &str) -> bool {
        matches_alias(&self.files.image_extensions, ext)
    }

    /// Whether a lowercased extension is a configured text extension.
    pub fn is_text_extension(&self, ext: &str) -> bool {
        matches_alias(&self.files.text_extensions, ext)
    }
}

fn matches_alias(aliases: &[String], name: &str) -> bool {
    let name = name.trim().to_lowercase();
    aliases.iter().any(|a| a.to_lowercase() == name)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Subfolder aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FoldersConfig {
    pub image_aliases: Vec<String>,
    pub text_aliases: Vec<String>,
}

impl Default for FoldersConfig {
    fn default() -> Self {
        Self {
            image_aliases: strings(&[
                "images", "image", "imgs", "img", "pics", "pictures", "photos", "图片",
            ]),
            text_aliases: strings(&["text", "texts", "txt", "content", "文本", "文字"]),
        }
    }
}

/// Recognized file extensions (without the dot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesConfig {
    pub image_extensions: Vec<String>,
    pub text_extensions: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            image_extensions: known_extensions().map(str::to_string).collect(),
            text_extensions: strings(&["txt", "md", "text"]),
        }
    }
}

/// Image normalization settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Lossless format every image is re-encoded to.
    pub canonical_format: CanonicalFormat,
}

/// Tabular export settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Content longer than this many characters is truncated in the CSV.
    pub max_content_chars: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            max_content_chars: 30_000,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of archives opened in parallel.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(PipelineConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value. `Ok(None)` if it doesn't exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PipelineConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PipelineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when the file
/// is absent.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(path)?)
}

/// Returns a fully-commented stock `unitpack.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# unitpack configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Unit subfolders
# ---------------------------------------------------------------------------
[folders]
# A unit's image folder must match one of these (case-insensitive).
image_aliases = ["images", "image", "imgs", "img", "pics", "pictures", "photos", "图片"]

# Optional text folder; its first text file becomes the unit's content.
text_aliases = ["text", "texts", "txt", "content", "文本", "文字"]

# ---------------------------------------------------------------------------
# File types
# ---------------------------------------------------------------------------
[files]
# Extensions treated as images. Each must have a compiled-in decoder.
image_extensions = ["jpg", "jpeg", "jfif", "png", "gif", "bmp", "tif", "tiff", "webp", "ico", "tga"]

# Extensions treated as text content.
text_extensions = ["txt", "md", "text"]

# ---------------------------------------------------------------------------
# Image normalization
# ---------------------------------------------------------------------------
[images]
# Lossless format every image is re-encoded to: "png" or "bmp".
canonical_format = "png"

# ---------------------------------------------------------------------------
# Tabular export
# ---------------------------------------------------------------------------
[export]
# Content cells are truncated to this many characters (max 32767).
max_content_chars = 30000

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum archives opened in parallel.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
