//! Error types shared by the sync engine and its transports
//!
//! Errors are grouped by where they come from, which is what callers use to
//! decide between absorbing, retrying and escalating:
//! - **Filesystem**: local or remote path could not be read or written
//! - **Network**: connection refused, reset or timed out
//! - **Protocol**: malformed frame, unknown command, truncated payload
//! - **Consistency**: the remote does not match the intended state after a pass
//! - **Remote**: the peer ran a request and reported that it failed

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias used across dropsync crates.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Error type for sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A path could not be read, written, created or removed.
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        /// Path the operation was acting on.
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The connection to the peer failed.
    #[error("network error while {context}: {source}")]
    Network {
        /// What the transport was doing when it failed.
        context: String,
        #[source]
        source: io::Error,
    },

    /// The peer sent something that does not follow the message grammar.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The remote snapshot diverges from the state a plan should produce.
    #[error("consistency error: {0}")]
    Consistency(String),

    /// The peer executed a request and reported a failure.
    #[error("remote failure: {0}")]
    Remote(String),

    /// A configuration file could not be parsed.
    #[error("invalid configuration in {}: {message}", path.display())]
    Config {
        /// File that was being loaded.
        path: PathBuf,
        message: String,
    },
}

impl SyncError {
    /// Wrap an I/O error raised while touching `path`.
    pub fn fs(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Wrap an I/O error raised by a socket.
    pub fn net(context: impl Into<String>, source: io::Error) -> Self {
        Self::Network {
            context: context.into(),
            source,
        }
    }

    /// Build a protocol error from a message.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Whether retrying the same operation on a new connection may help.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Protocol(_))
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        Self::Protocol(format!("invalid directory listing: {e}"))
    }
}
