//! Directory walking and fingerprinting via the `ignore` crate walker

use std::path::PathBuf;

use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::hash::ContentHash;
use crate::path::RelPath;
use crate::snapshot::Snapshot;

/// Name prefix of temporary files that receive uploads before being renamed
/// into place. Such files are never part of a snapshot.
pub const PARTIAL_PREFIX: &str = ".dropsync-part-";

/// Scanner for directory trees
///
/// Every regular file below the root is listed: no ignore files are
/// consulted and hidden files are included. Symbolic links are skipped, which
/// also keeps link cycles out of the walk.
pub struct Scanner {
    root: PathBuf,
}

impl Scanner {
    /// Create a new scanner for the given root directory
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a configured walk builder
    fn walk_builder(&self) -> WalkBuilder {
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(false) // No .gitignore, .ignore or hidden-file filtering
            .follow_links(false)
            .filter_entry(|e| {
                !e.file_name()
                    .to_str()
                    .is_some_and(|name| name.starts_with(PARTIAL_PREFIX))
            });
        builder
    }

    /// Walk the root and fingerprint every regular file
    ///
    /// Files that cannot be read while walking (permission denied, removed
    /// mid-walk, non UTF-8 names) are left out and reported with a warning;
    /// the directory is expected to change underneath us.
    ///
    /// # Errors
    /// Returns [`SyncError::Filesystem`] only if the root itself is missing or
    /// not a directory
    pub fn scan(&self) -> Result<Snapshot> {
        let meta = std::fs::metadata(&self.root).map_err(|e| SyncError::fs(&self.root, e))?;
        if !meta.is_dir() {
            return Err(SyncError::fs(
                &self.root,
                std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
            ));
        }

        let mut entries = Vec::new();

        for result in self.walk_builder().build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable entry under {}: {e}", self.root.display());
                    continue;
                }
            };

            // Skip directories and symlinks, only process files
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            let Some(relative_path) = path
                .strip_prefix(&self.root)
                .ok()
                .and_then(RelPath::from_relative)
            else {
                warn!("skipping {}: name is not a portable relative path", path.display());
                continue;
            };

            match ContentHash::from_file(path) {
                Ok(hash) => entries.push((relative_path, hash)),
                Err(e) => warn!("skipping {relative_path}: {e}"),
            }
        }

        debug!("scanned {} files under {}", entries.len(), self.root.display());
        Ok(Snapshot::from_entries(entries))
    }
}
