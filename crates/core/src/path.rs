//! Root-relative paths as they appear in snapshots and on the wire

use std::borrow::Borrow;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SyncError};

/// A slash-separated, case-sensitive path relative to a synced root.
///
/// Always non-empty, never absolute and never contains `..`, so joining it
/// onto a root cannot escape that root.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelPath(String);

impl RelPath {
    /// Parse a slash-separated path received from a peer or typed by a user
    ///
    /// # Errors
    /// Returns [`SyncError::Protocol`] if the path is empty, absolute, contains
    /// `..`, a backslash or a NUL byte
    pub fn new(s: &str) -> Result<Self> {
        if s.starts_with('/') {
            return Err(SyncError::protocol(format!("absolute path {s:?}")));
        }
        if s.contains('\0') || s.contains('\\') {
            return Err(SyncError::protocol(format!("illegal character in path {s:?}")));
        }

        let mut parts = Vec::new();
        for part in s.split('/') {
            match part {
                "" | "." => {}
                ".." => return Err(SyncError::protocol(format!("path escapes root: {s:?}"))),
                other => parts.push(other),
            }
        }

        if parts.is_empty() {
            return Err(SyncError::protocol(format!("empty path {s:?}")));
        }
        Ok(Self(parts.join("/")))
    }

    /// Build from a path that is already relative to the root (as yielded by
    /// stripping the root prefix from a walked entry)
    ///
    /// Returns `None` for paths that are not valid UTF-8 or would not round
    /// trip through [`RelPath::new`].
    #[must_use]
    pub fn from_relative(path: &Path) -> Option<Self> {
        let mut parts = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_str()?),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Self::new(&parts.join("/")).ok()
    }

    /// The slash-separated form
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join onto a root directory using native separators
    #[must_use]
    pub fn to_native(&self, root: &Path) -> PathBuf {
        let mut full = root.to_path_buf();
        full.extend(self.0.split('/'));
        full
    }

    /// The containing directory, or `None` for a top-level entry
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0.rsplit_once('/').map(|(parent, _)| Self(parent.to_string()))
    }
}

impl fmt::Debug for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Ordering and equality are those of the inner string, so maps keyed by
// `RelPath` can be queried with `&str` ranges.
impl Borrow<str> for RelPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Serialize for RelPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RelPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).map_err(serde::de::Error::custom)
    }
}
