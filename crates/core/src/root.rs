//! Filesystem operations on a synced root directory
//!
//! Both ends of a sync own a [`SyncRoot`]: the client captures snapshots and
//! reads upload bodies from it, the server applies every request through it.

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncRead;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::path::RelPath;
use crate::protocol::copy_payload;
use crate::scan::{PARTIAL_PREFIX, Scanner};
use crate::snapshot::Snapshot;

/// A directory whose regular files are kept in sync
#[derive(Debug, Clone)]
pub struct SyncRoot {
    root: PathBuf,
}

impl SyncRoot {
    /// Use an existing directory
    ///
    /// # Errors
    /// Returns [`SyncError::Filesystem`] if `root` is missing or not a directory
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let meta = std::fs::metadata(&root).map_err(|e| SyncError::fs(&root, e))?;
        if !meta.is_dir() {
            return Err(SyncError::fs(
                &root,
                io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
            ));
        }
        Ok(Self { root })
    }

    /// Use `root`, creating it and any missing ancestors first
    ///
    /// # Errors
    /// Returns [`SyncError::Filesystem`] if the directory cannot be created
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| SyncError::fs(&root, e))?;
        Self::open(root)
    }

    /// Directory on disk
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Native path of a root-relative path
    #[must_use]
    pub fn resolve(&self, rel: &RelPath) -> PathBuf {
        rel.to_native(&self.root)
    }

    /// Snapshot the whole root on a blocking worker thread
    ///
    /// # Errors
    /// Returns [`SyncError::Filesystem`] if the root disappeared
    pub async fn capture(&self) -> Result<Snapshot> {
        let scanner = Scanner::new(self.root.clone());
        tokio::task::spawn_blocking(move || scanner.scan())
            .await
            .map_err(|e| SyncError::fs(&self.root, io::Error::other(e)))?
    }

    /// Open a file for sending, returning it with its current length
    ///
    /// # Errors
    /// Returns [`SyncError::Filesystem`] if the file cannot be opened
    pub async fn open_file(&self, rel: &RelPath) -> Result<(tokio::fs::File, u64)> {
        let path = self.resolve(rel);
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| SyncError::fs(&path, e))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| SyncError::fs(&path, e))?
            .len();
        Ok((file, len))
    }

    async fn create_parent(&self, rel: &RelPath) -> Result<PathBuf> {
        let target = self.resolve(rel);
        let parent = target.parent().unwrap_or(&self.root).to_path_buf();
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| SyncError::fs(&parent, e))?;
        Ok(parent)
    }

    /// Receive `size` bytes from `reader` into `rel`.
    ///
    /// The body lands in a temporary file next to the target and is renamed
    /// over it only once complete, so the target never holds partial content.
    /// An abandoned upload leaves only the temporary, removed on drop.
    ///
    /// The outer result reports the stream: after an error there the
    /// connection is unusable. The inner result reports the filesystem: the
    /// body has been fully consumed either way.
    ///
    /// # Errors
    /// See above
    pub async fn receive_upload<R: AsyncRead + Unpin>(
        &self,
        rel: &RelPath,
        size: u64,
        reader: &mut R,
        chunk_size: usize,
    ) -> Result<Result<()>> {
        let target = self.resolve(rel);

        let temp = match self.create_parent(rel).await.and_then(|parent| {
            tempfile::Builder::new()
                .prefix(PARTIAL_PREFIX)
                .tempfile_in(&parent)
                .map_err(|e| SyncError::fs(&parent, e))
        }) {
            Ok(temp) => temp,
            Err(e) => {
                warn!("cannot stage upload of {rel}, discarding {size} bytes: {e}");
                // Writing to a sink cannot fail.
                let _drained =
                    copy_payload(reader, &mut tokio::io::sink(), size, chunk_size).await?;
                return Ok(Err(e));
            }
        };

        let (file, temp_path) = temp.into_parts();
        let mut file = tokio::fs::File::from_std(file);
        if let Err(e) = copy_payload(reader, &mut file, size, chunk_size).await? {
            return Ok(Err(SyncError::fs(&temp_path, e)));
        }
        if let Err(e) = file.sync_all().await {
            return Ok(Err(SyncError::fs(&temp_path, e)));
        }
        drop(file);

        if let Err(e) = temp_path.persist(&target) {
            return Ok(Err(SyncError::fs(&target, e.error)));
        }
        debug!("stored {rel} ({size} bytes)");
        Ok(Ok(()))
    }

    /// Duplicate `src` to `dst`, keeping `src`
    ///
    /// # Errors
    /// Returns [`SyncError::Filesystem`] if `src` is missing or `dst` cannot
    /// be written
    pub async fn copy_rename(&self, src: &RelPath, dst: &RelPath) -> Result<()> {
        if src == dst {
            return Ok(());
        }
        let from = self.resolve(src);
        let to = self.resolve(dst);
        self.create_parent(dst).await?;
        tokio::fs::copy(&from, &to)
            .await
            .map_err(|e| SyncError::fs(&from, e))?;
        debug!("copied {src} -> {dst}");
        Ok(())
    }

    /// Rename `src` to `dst`, replacing `dst` if present
    ///
    /// # Errors
    /// Returns [`SyncError::Filesystem`] if `src` is missing or the rename fails
    pub async fn move_rename(&self, src: &RelPath, dst: &RelPath) -> Result<()> {
        if src == dst {
            return Ok(());
        }
        let from = self.resolve(src);
        let to = self.resolve(dst);
        self.create_parent(dst).await?;
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| SyncError::fs(&from, e))?;
        self.prune_empty_parents(src).await;
        debug!("moved {src} -> {dst}");
        Ok(())
    }

    /// Remove `rel`. A file that is already gone counts as removed.
    ///
    /// # Errors
    /// Returns [`SyncError::Filesystem`] if the file exists but cannot be removed
    pub async fn delete(&self, rel: &RelPath) -> Result<()> {
        let path = self.resolve(rel);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!("deleted {rel}"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => debug!("{rel} already absent"),
            Err(e) => return Err(SyncError::fs(&path, e)),
        }
        self.prune_empty_parents(rel).await;
        Ok(())
    }

    /// Remove directories left empty above `rel`, stopping at the first one
    /// that still has entries. The root itself is never removed.
    async fn prune_empty_parents(&self, rel: &RelPath) {
        let mut current = rel.parent();
        while let Some(dir) = current {
            if tokio::fs::remove_dir(self.resolve(&dir)).await.is_err() {
                break;
            }
            debug!("pruned empty directory {dir}");
            current = dir.parent();
        }
    }
}
