//! Centralized filename parsing for the `+`-delimited naming convention.
//!
//! Image files inside a unit carry their metadata in the name:
//!
//! ```text
//! <prefix> + <identifier> + <title> [- <order>] . <ext>
//! ```
//!
//! - `A+X01+Sunrise - 2.jpg` → identifier="X01", title="Sunrise", order=2
//! - `A + X01 + Sunrise.jpg` → identifier="X01", title="Sunrise", order=0
//! - `A+X01+Sun+rise-3.jpg`  → identifier="X01", title="Sun+rise", order=3
//!
//! Whitespace around each segment is ignored. Everything after the second
//! `+` is the tail; extra `+` signs belong to the title.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

const DELIMITER: char = '+';

/// Trailing `- <digits>` order suffix, with optional whitespace around the dash.
static ORDER_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s*-\s*(\d+)$").expect("order pattern is valid"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameParseError {
    #[error("expected at least 3 '+'-separated segments, found {0}")]
    TooFewSegments(usize),
}

/// Result of parsing a file name like `A+X01+Sunrise - 2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNameParseResult {
    pub identifier: String,
    pub title: String,
    /// Trailing order number, 0 when absent.
    pub order: u32,
}

/// Parse a name with its extension already stripped.
pub fn parse_stem(stem: &str) -> Result<FileNameParseResult, NameParseError> {
    let segments: Vec<&str> = stem.split(DELIMITER).map(str::trim).collect();
    if segments.len() < 3 {
        return Err(NameParseError::TooFewSegments(segments.len()));
    }

    let identifier = segments[1].to_string();
    let tail = segments[2..].join("+");

    if let Some(caps) = ORDER_SUFFIX.captures(&tail)
        && let Ok(order) = caps[2].parse::<u32>()
    {
        return Ok(FileNameParseResult {
            identifier,
            title: caps[1].trim().to_string(),
            order,
        });
    }

    Ok(FileNameParseResult {
        identifier,
        title: tail.trim().to_string(),
        order: 0,
    })
}

/// Parse a full file name, stripping its extension first.
pub fn parse_file_name(file_name: &str) -> Result<FileNameParseResult, NameParseError> {
    parse_stem(file_stem(file_name))
}

/// File name without its final extension.
pub fn file_stem(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(pos) if pos > 0 => &file_name[..pos],
        _ => file_name,
    }
}

/// Lowercased final extension, if any.
pub fn extension(file_name: &str) -> Option<String> {
    match file_name.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < file_name.len() => {
            Some(file_name[pos + 1..].to_lowercase())
        }
        _ => None,
    }
}
