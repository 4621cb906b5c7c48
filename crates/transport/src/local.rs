//! Local in-process transport for testing
//!
//! `LocalConnector` applies every session operation directly to a second
//! directory on this machine, without a server or a socket. Useful for
//! exercising the client against a real filesystem.

use async_trait::async_trait;

use dropsync_core::{RelPath, Result, Snapshot, SyncRoot};

use crate::session::{Connector, RemoteSession};

/// Connector whose "remote" is a directory on this machine
#[derive(Debug, Clone)]
pub struct LocalConnector {
    remote: SyncRoot,
    chunk_size: usize,
}

impl LocalConnector {
    #[must_use]
    pub fn new(remote: SyncRoot, chunk_size: usize) -> Self {
        Self { remote, chunk_size }
    }
}

#[async_trait]
impl Connector for LocalConnector {
    async fn connect(&self) -> Result<Box<dyn RemoteSession>> {
        Ok(Box::new(LocalSession {
            remote: self.remote.clone(),
            chunk_size: self.chunk_size,
        }))
    }

    fn describe(&self) -> String {
        format!("local://{}", self.remote.path().display())
    }
}

/// Session that runs each request in-process
pub struct LocalSession {
    remote: SyncRoot,
    chunk_size: usize,
}

#[async_trait]
impl RemoteSession for LocalSession {
    async fn read_dir_content(&mut self) -> Result<Snapshot> {
        self.remote.capture().await
    }

    async fn upload(&mut self, local: &SyncRoot, path: &RelPath) -> Result<u64> {
        let (mut file, size) = local.open_file(path).await?;
        self.remote
            .receive_upload(path, size, &mut file, self.chunk_size)
            .await??;
        Ok(size)
    }

    async fn copy_rename(&mut self, src: &RelPath, dst: &RelPath) -> Result<()> {
        self.remote.copy_rename(src, dst).await
    }

    async fn move_rename(&mut self, src: &RelPath, dst: &RelPath) -> Result<()> {
        self.remote.move_rename(src, dst).await
    }

    async fn delete(&mut self, path: &RelPath) -> Result<()> {
        self.remote.delete(path).await
    }
}
