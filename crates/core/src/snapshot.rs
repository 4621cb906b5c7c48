//! Snapshot: A point-in-time view of a directory tree

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;
use crate::path::RelPath;

/// A snapshot of a directory tree at a point in time
///
/// Maps every regular file, by root-relative path, to its content hash.
/// Iteration is in lexicographic path order. A changed directory is a new
/// snapshot; existing ones are never updated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    files: BTreeMap<RelPath, ContentHash>,
}

impl Snapshot {
    /// Create a snapshot from scanned entries
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (RelPath, ContentHash)>) -> Self {
        Self {
            files: entries.into_iter().collect(),
        }
    }

    /// Create an empty snapshot
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get the number of files
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Get the content hash recorded for a path
    #[must_use]
    pub fn get(&self, path: &RelPath) -> Option<&ContentHash> {
        self.files.get(path)
    }

    /// Whether a path is present
    #[must_use]
    pub fn contains(&self, path: &RelPath) -> bool {
        self.files.contains_key(path)
    }

    /// Entries in path order
    pub fn iter(&self) -> btree_map::Iter<'_, RelPath, ContentHash> {
        self.files.iter()
    }

    /// Paths in order
    pub fn paths(&self) -> impl Iterator<Item = &RelPath> {
        self.files.keys()
    }

    /// Whether both snapshots hold exactly the same paths with the same content
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.files == other.files
    }

    /// Compare two snapshots and return the differences
    #[must_use]
    pub fn diff(&self, other: &Self) -> SnapshotDiff {
        let mut added = Vec::new();
        let mut removed = Vec::new();
        let mut modified = Vec::new();

        // Find added and modified files
        for (path, new_hash) in &other.files {
            match self.files.get(path) {
                None => added.push(path.clone()),
                Some(old_hash) if old_hash != new_hash => modified.push(path.clone()),
                _ => {}
            }
        }

        // Find removed files
        for path in self.files.keys() {
            if !other.files.contains_key(path) {
                removed.push(path.clone());
            }
        }

        SnapshotDiff {
            added,
            removed,
            modified,
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = (&'a RelPath, &'a ContentHash);
    type IntoIter = btree_map::Iter<'a, RelPath, ContentHash>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

/// Cheap change gate run on every poll tick.
///
/// True when `curr` has a path `prev` lacks, when the file counts differ
/// (something was removed), or when a common path changed content. Stops at
/// the first difference; use [`Snapshot::diff`] to enumerate them.
#[must_use]
pub fn has_changed(prev: &Snapshot, curr: &Snapshot) -> bool {
    if prev.len() != curr.len() {
        return true;
    }
    curr.iter()
        .any(|(path, hash)| prev.get(path).is_none_or(|old| old != hash))
}

/// Differences between two snapshots
#[derive(Debug, Clone)]
pub struct SnapshotDiff {
    /// Files that exist in new but not in old
    pub added: Vec<RelPath>,
    /// Files that exist in old but not in new
    pub removed: Vec<RelPath>,
    /// Files that exist in both but have different content
    pub modified: Vec<RelPath>,
}
