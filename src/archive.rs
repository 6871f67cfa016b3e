//! Archive reading.
//!
//! The rest of the crate never touches the `zip` crate directly. It sees an
//! archive through the [`ArchiveSource`] trait: a flat list of entries plus
//! a way to read one entry's bytes by path. [`ZipSource`] is the production
//! implementation over in-memory bytes; tests use an in-memory map.
//!
//! Entry paths are normalized on the way in: backslashes become forward
//! slashes and empty segments are dropped, so `a\b\c.png`, `/a/b/c.png` and
//! `a//b/c.png` all resolve to `a/b/c.png`, the same path the tree is built
//! from.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use thiserror::Error;

/// Upper bound on the buffer reserved up front for one entry. The size in an
/// entry header is untrusted; larger entries still read fine, they just grow.
const PREALLOC_LIMIT: u64 = 1 << 20;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to read ZIP: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Entry not found: {0}")]
    EntryNotFound(String),
}

/// A named archive handed to the pipeline.
#[derive(Debug, Clone)]
pub struct ArchiveInput {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ArchiveInput {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Archive name without its final extension (`batch.zip` → `batch`).
    pub fn stem(&self) -> &str {
        archive_stem(&self.name)
    }
}

/// Strip the final extension from an archive file name.
pub fn archive_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    }
}

/// One entry as reported by the archive's central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub is_dir: bool,
}

/// Read access to an opened archive.
pub trait ArchiveSource {
    /// All entries, in the order the archive stores them.
    fn entries(&self) -> Vec<ArchiveEntry>;

    /// Read the full contents of the entry at `path`.
    fn read(&mut self, path: &str) -> Result<Vec<u8>, ArchiveError>;
}

/// [`ArchiveSource`] over a ZIP file held in memory.
pub struct ZipSource<'a> {
    archive: zip::ZipArchive<Cursor<&'a [u8]>>,
    /// Normalized path → index into the ZIP central directory.
    index: HashMap<String, usize>,
    entries: Vec<ArchiveEntry>,
}

impl<'a> ZipSource<'a> {
    /// Parse the central directory. Fails on anything that isn't a readable ZIP.
    pub fn open(bytes: &'a [u8]) -> Result<Self, ArchiveError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut index = HashMap::with_capacity(archive.len());
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i)?;
            let path = normalize_entry_path(entry.name());
            let is_dir = entry.is_dir();
            index.insert(path.clone(), i);
            entries.push(ArchiveEntry { path, is_dir });
        }

        Ok(Self {
            archive,
            index,
            entries,
        })
    }
}

impl ArchiveSource for ZipSource<'_> {
    fn entries(&self) -> Vec<ArchiveEntry> {
        self.entries.clone()
    }

    fn read(&mut self, path: &str) -> Result<Vec<u8>, ArchiveError> {
        let i = *self
            .index
            .get(path)
            .ok_or_else(|| ArchiveError::EntryNotFound(path.to_string()))?;
        let mut entry = self.archive.by_index(i)?;
        let declared = entry.size();
        Ok(read_entry(&mut entry, declared)?)
    }
}

/// Read an entry to the end, reserving at most [`PREALLOC_LIMIT`] bytes from
/// its declared size.
pub(crate) fn read_entry(reader: &mut impl Read, declared: u64) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(declared.min(PREALLOC_LIMIT) as usize);
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

fn normalize_entry_path(name: &str) -> String {
    name.replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// In-memory [`ArchiveSource`] used by tests that don't care about ZIP encoding.
#[cfg(test)]
#[derive(Default)]
pub struct MemorySource {
    pub files: Vec<(String, Vec<u8>)>,
    pub dirs: Vec<String>,
    /// Paths whose reads fail, to exercise partial-failure handling.
    pub broken: Vec<String>,
}

#[cfg(test)]
impl MemorySource {
    pub fn with_files(files: &[(&str, &[u8])]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(p, b)| (p.to_string(), b.to_vec()))
                .collect(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
impl ArchiveSource for MemorySource {
    fn entries(&self) -> Vec<ArchiveEntry> {
        self.dirs
            .iter()
            .map(|d| ArchiveEntry {
                path: d.clone(),
                is_dir: true,
            })
            .chain(self.files.iter().map(|(p, _)| ArchiveEntry {
                path: p.clone(),
                is_dir: false,
            }))
            .collect()
    }

    fn read(&mut self, path: &str) -> Result<Vec<u8>, ArchiveError> {
        if self.broken.iter().any(|b| b == path) {
            return Err(ArchiveError::Io(std::io::Error::other("simulated read failure")));
        }
        self.files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| ArchiveError::EntryNotFound(path.to_string()))
    }
}
