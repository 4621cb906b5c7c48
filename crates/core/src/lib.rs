//! dropsync-core: Core sync engine
//!
//! Provides file scanning, hashing, reconciliation planning, the wire
//! protocol, and the filesystem operations both ends of a sync share.

pub mod config;
pub mod error;
pub mod hash;
pub mod path;
pub mod protocol;
pub mod reconcile;
pub mod root;
pub mod scan;
pub mod snapshot;

pub use config::{ClientConfig, DropsyncConfig, ServerConfig};
pub use error::{Result, SyncError};
pub use hash::ContentHash;
pub use path::RelPath;
pub use protocol::{ProtocolReader, ProtocolWriter, Request, Response};
pub use reconcile::{Plan, SyncAction, plan};
pub use root::SyncRoot;
pub use scan::Scanner;
pub use snapshot::{Snapshot, has_changed};
