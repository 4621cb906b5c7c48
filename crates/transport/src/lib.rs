//! dropsync-transport: TCP transport layer
//!
//! Runs the sync server, the watching client, and the sessions the client
//! uses to reach a remote directory.

pub mod client;
pub mod local;
pub mod server;
pub mod service;
pub mod session;

pub use client::{PassOutcome, PassReport, SyncClient};
pub use local::{LocalConnector, LocalSession};
pub use server::SyncServer;
pub use service::{Service, ServiceHandle, Shutdown, start};
pub use session::{Connector, RemoteSession, TcpConnector, TcpSession};
