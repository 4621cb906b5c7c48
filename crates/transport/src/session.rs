//! Sessions against a remote sync root

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::{BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::debug;

use dropsync_core::protocol::copy_payload;
use dropsync_core::{
    ProtocolReader, ProtocolWriter, RelPath, Request, Response, Result, Snapshot, SyncAction,
    SyncError, SyncRoot,
};

/// Operations a client runs against the remote directory
///
/// A session that returned a transient error ([`SyncError::is_transient`])
/// may be out of step with its peer and should be dropped.
#[async_trait]
pub trait RemoteSession: Send {
    /// Fingerprints of every file on the remote
    async fn read_dir_content(&mut self) -> Result<Snapshot>;

    /// Send the file `path` from `local`, returning the bytes sent
    async fn upload(&mut self, local: &SyncRoot, path: &RelPath) -> Result<u64>;

    async fn copy_rename(&mut self, src: &RelPath, dst: &RelPath) -> Result<()>;

    async fn move_rename(&mut self, src: &RelPath, dst: &RelPath) -> Result<()>;

    /// Remove a remote file; a missing file is not an error
    async fn delete(&mut self, path: &RelPath) -> Result<()>;

    /// Run one planned action, returning the bytes uploaded
    async fn apply(&mut self, local: &SyncRoot, action: &SyncAction) -> Result<u64> {
        match action {
            SyncAction::Upload(path) => self.upload(local, path).await,
            SyncAction::CopyRename { src, dst } => self.copy_rename(src, dst).await.map(|()| 0),
            SyncAction::MoveRename { src, dst } => self.move_rename(src, dst).await.map(|()| 0),
            SyncAction::Delete(path) => self.delete(path).await.map(|()| 0),
        }
    }
}

/// Opens sessions to one remote
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn RemoteSession>>;

    /// Where sessions go, for log lines
    fn describe(&self) -> String;
}

/// Connects to a sync server over TCP
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
    chunk_size: usize,
}

impl TcpConnector {
    #[must_use]
    pub fn new(addr: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            addr: addr.into(),
            chunk_size,
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<Box<dyn RemoteSession>> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| SyncError::net(format!("connecting to {}", self.addr), e))?;
        let session = TcpSession::new(stream, self.chunk_size)?;
        debug!("connected to {}", session.peer);
        Ok(Box::new(session))
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.addr)
    }
}

/// One TCP connection to a sync server. Requests are strictly sequential:
/// each waits for its reply before the next is sent.
pub struct TcpSession {
    peer: SocketAddr,
    reader: ProtocolReader<BufReader<OwnedReadHalf>>,
    writer: ProtocolWriter<BufWriter<OwnedWriteHalf>>,
    chunk_size: usize,
}

impl TcpSession {
    /// Wrap a connected stream
    ///
    /// # Errors
    /// Returns [`SyncError::Network`] if the socket cannot be configured
    pub fn new(stream: TcpStream, chunk_size: usize) -> Result<Self> {
        let peer = stream
            .peer_addr()
            .map_err(|e| SyncError::net("reading peer address", e))?;
        stream
            .set_nodelay(true)
            .map_err(|e| SyncError::net("configuring socket", e))?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            peer,
            reader: ProtocolReader::new(BufReader::new(read_half)),
            writer: ProtocolWriter::new(BufWriter::new(write_half)),
            chunk_size,
        })
    }

    async fn round_trip(&mut self, request: &Request) -> Result<Response> {
        self.writer.send_request(request).await?;
        self.reader.read_response().await
    }

    async fn expect_ack(&mut self, request: &Request) -> Result<()> {
        let response = self.round_trip(request).await?;
        ack(request, response)
    }
}

fn ack(request: &Request, response: Response) -> Result<()> {
    match response {
        Response::Ok => Ok(()),
        Response::Error(message) => Err(SyncError::Remote(message)),
        Response::DirContent(_) => Err(SyncError::protocol(format!(
            "directory listing sent in reply to {}",
            request.kind()
        ))),
    }
}

#[async_trait]
impl RemoteSession for TcpSession {
    async fn read_dir_content(&mut self) -> Result<Snapshot> {
        match self.round_trip(&Request::ReadDirContent).await? {
            Response::DirContent(snapshot) => Ok(snapshot),
            Response::Error(message) => Err(SyncError::Remote(message)),
            Response::Ok => Err(SyncError::protocol("bare ok in reply to read_dir_content")),
        }
    }

    async fn upload(&mut self, local: &SyncRoot, path: &RelPath) -> Result<u64> {
        let (mut file, size) = local.open_file(path).await?;
        let request = Request::UploadFile {
            path: path.clone(),
            size,
        };
        self.writer.send_request(&request).await?;

        // The peer now expects exactly `size` bytes; a file that shrank in the
        // meantime leaves the stream unusable, reported as a protocol error.
        copy_payload(&mut file, self.writer.get_mut(), size, self.chunk_size)
            .await?
            .map_err(|e| SyncError::net("sending file body", e))?;

        let response = self.reader.read_response().await?;
        ack(&request, response)?;
        Ok(size)
    }

    async fn copy_rename(&mut self, src: &RelPath, dst: &RelPath) -> Result<()> {
        self.expect_ack(&Request::CopyRename {
            src: src.clone(),
            dst: dst.clone(),
        })
        .await
    }

    async fn move_rename(&mut self, src: &RelPath, dst: &RelPath) -> Result<()> {
        self.expect_ack(&Request::MoveRename {
            src: src.clone(),
            dst: dst.clone(),
        })
        .await
    }

    async fn delete(&mut self, path: &RelPath) -> Result<()> {
        self.expect_ack(&Request::DeleteFile { path: path.clone() })
            .await
    }
}
