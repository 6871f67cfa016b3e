//! Directory tree built from a flat archive listing.
//!
//! ZIP archives store paths, not directories. Some writers emit explicit
//! directory markers (`photos/`), many don't. The tree is therefore derived
//! purely from file paths: every file contributes its parent chain.

use crate::archive::ArchiveEntry;
use std::collections::BTreeMap;

/// One directory level. Children are keyed by name, so iteration order is
/// stable for a given archive regardless of entry order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirNode {
    pub files: Vec<String>,
    pub subdirs: BTreeMap<String, DirNode>,
}

impl DirNode {
    /// Whether this node has neither files nor subdirectories.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.subdirs.is_empty()
    }
}

/// Build a tree from archive entries. Directory markers and paths without
/// any non-empty segment are skipped.
pub fn build_tree(entries: &[ArchiveEntry]) -> DirNode {
    let mut root = DirNode::default();

    for entry in entries.iter().filter(|e| !e.is_dir) {
        let segments: Vec<&str> = entry.path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((file_name, dirs)) = segments.split_last() else {
            continue;
        };

        let mut node = &mut root;
        for dir in dirs {
            node = node.subdirs.entry((*dir).to_string()).or_default();
        }
        node.files.push((*file_name).to_string());
    }

    root
}
