//! Two-level unit detection.
//!
//! Archives arrive in arbitrary layouts. What we look for are pockets shaped
//! like this:
//!
//! ```text
//! batch.zip
//! └── 2024/                      # not a unit: has a nested directory below a child
//!     ├── notes.txt
//!     ├── A+X01+Sunrise/         # unit
//!     │   ├── images/
//!     │   │   ├── A+X01+Sunrise - 1.jpg
//!     │   │   └── A+X01+Sunrise - 2.png
//!     │   └── text/
//!     │       └── body.txt
//!     └── A+X02+Dusk/            # unit
//!         └── images/
//!             └── A+X02+Dusk.jpg
//! ```
//!
//! A node **qualifies** when it holds no files of its own, has at least one
//! child directory, and every child directory is a leaf (no subdirectories)
//! containing at least one file.
//!
//! The walk is depth-first, pre-order. A qualifying node becomes a unit and
//! its children are not visited, so units never nest. Nodes that don't
//! qualify are simply descended into; dead ends contribute nothing.

use crate::archive::{ArchiveSource, archive_stem};
use crate::tree::{DirNode, build_tree};
use serde::Serialize;

/// Raw file as read from the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileData {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// One child directory of a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubfolderData {
    pub name: String,
    pub files: Vec<FileData>,
}

/// A detected two-level unit with all of its file bytes loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderUnit {
    pub name: String,
    pub source_archive_name: String,
    /// Slash-joined path of the unit inside its archive; empty for the root.
    pub original_path: String,
    pub subfolders: Vec<SubfolderData>,
}

impl FolderUnit {
    pub fn file_count(&self) -> usize {
        self.subfolders.iter().map(|s| s.files.len()).sum()
    }

    /// Summary entry describing this unit.
    pub fn info(&self) -> UnitInfo {
        UnitInfo {
            name: self.name.clone(),
            source_archive_name: self.source_archive_name.clone(),
            original_path: self.original_path.clone(),
            subfolder_count: self.subfolders.len(),
            file_count: self.file_count(),
        }
    }
}

/// Serializable description of a detected unit, used in run summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitInfo {
    pub name: String,
    pub source_archive_name: String,
    pub original_path: String,
    pub subfolder_count: usize,
    pub file_count: usize,
}

/// Whether `node` has the two-level unit shape.
pub fn qualifies(node: &DirNode) -> bool {
    node.files.is_empty()
        && !node.subdirs.is_empty()
        && node
            .subdirs
            .values()
            .all(|child| child.subdirs.is_empty() && !child.files.is_empty())
}

/// Build the tree for an opened archive and collect every unit in it.
pub fn detect_units(source: &mut dyn ArchiveSource, archive_name: &str) -> Vec<FolderUnit> {
    let tree = build_tree(&source.entries());
    let mut units = Vec::new();
    let mut path = Vec::new();
    walk(&tree, &mut path, source, archive_name, &mut units);
    units
}

fn walk<'t>(
    node: &'t DirNode,
    path: &mut Vec<&'t str>,
    source: &mut dyn ArchiveSource,
    archive_name: &str,
    units: &mut Vec<FolderUnit>,
) {
    if qualifies(node) {
        if let Some(unit) = materialize(node, path, source, archive_name) {
            units.push(unit);
        }
        return;
    }

    for (name, child) in &node.subdirs {
        path.push(name);
        walk(child, path, source, archive_name, units);
        path.pop();
    }
}

/// Read every file under a qualifying node. Unreadable files are logged and
/// skipped; a unit that ends up with no populated subfolder is dropped.
fn materialize(
    node: &DirNode,
    path: &[&str],
    source: &mut dyn ArchiveSource,
    archive_name: &str,
) -> Option<FolderUnit> {
    let original_path = path.join("/");
    let name = path
        .last()
        .map(|s| s.to_string())
        .unwrap_or_else(|| archive_stem(archive_name).to_string());

    let mut subfolders = Vec::new();
    for (sub_name, child) in &node.subdirs {
        let mut files = Vec::new();
        for file_name in &child.files {
            let entry_path = join_path(&original_path, sub_name, file_name);
            match source.read(&entry_path) {
                Ok(bytes) => files.push(FileData {
                    name: file_name.clone(),
                    bytes,
                }),
                Err(e) => log::warn!("{archive_name}: skipping unreadable {entry_path}: {e}"),
            }
        }
        if !files.is_empty() {
            subfolders.push(SubfolderData {
                name: sub_name.clone(),
                files,
            });
        }
    }

    if subfolders.is_empty() {
        return None;
    }

    Some(FolderUnit {
        name,
        source_archive_name: archive_name.to_string(),
        original_path,
        subfolders,
    })
}

fn join_path(base: &str, subfolder: &str, file: &str) -> String {
    if base.is_empty() {
        format!("{subfolder}/{file}")
    } else {
        format!("{base}/{subfolder}/{file}")
    }
}
