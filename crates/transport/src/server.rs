//! TCP sync server
//!
//! One task accepts connections, one task per connection serves requests.
//! Each connection runs the loop
//! `await request -> dispatch -> reply -> await request ...` until the
//! client hangs up, sends something malformed, or the server stops.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use dropsync_core::{
    ProtocolReader, ProtocolWriter, Request, Response, Result, ServerConfig, SyncError, SyncRoot,
};

use crate::service::{Service, Shutdown};

/// Serves one directory to sync clients
pub struct SyncServer {
    listener: TcpListener,
    root: SyncRoot,
    chunk_size: usize,
}

impl SyncServer {
    /// Create the root if needed and bind the listening socket
    ///
    /// # Errors
    /// Returns [`SyncError::Filesystem`] if the root cannot be created and
    /// [`SyncError::Network`] if the address cannot be bound
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let root = SyncRoot::create(&config.root)?;
        let listener = TcpListener::bind(config.bind)
            .await
            .map_err(|e| SyncError::net(format!("binding {}", config.bind), e))?;
        Ok(Self {
            listener,
            root,
            chunk_size: config.chunk_size,
        })
    }

    /// Address actually bound (useful with port 0)
    ///
    /// # Errors
    /// Returns [`SyncError::Network`] if the socket cannot report it
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| SyncError::net("reading listen address", e))
    }

    async fn serve_connection(&self, stream: TcpStream, peer: SocketAddr, mut shutdown: Shutdown) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("{peer}: cannot disable nagle: {e}");
        }
        let (read_half, write_half) = stream.into_split();
        let mut reader = ProtocolReader::new(BufReader::new(read_half));
        let mut writer = ProtocolWriter::new(BufWriter::new(write_half));

        loop {
            let request = tokio::select! {
                () = shutdown.wait() => break,
                request = reader.read_request() => request,
            };
            let request = match request {
                Ok(Some(request)) => request,
                Ok(None) => {
                    debug!("{peer}: closed by client");
                    break;
                }
                Err(e) => {
                    warn!("{peer}: dropping connection: {e}");
                    break;
                }
            };

            let kind = request.kind();
            debug!("{peer}: {request:?}");
            let response = tokio::select! {
                () = shutdown.wait() => {
                    info!("{peer}: abandoning {kind} on shutdown");
                    break;
                }
                response = self.dispatch(request, reader.get_mut()) => response,
            };
            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    warn!("{peer}: {kind} broke the stream: {e}");
                    break;
                }
            };

            if let Err(e) = writer.send_response(&response).await {
                warn!("{peer}: cannot reply to {kind}: {e}");
                break;
            }
        }
    }

    /// Apply one request. An `Err` means the stream can no longer be trusted;
    /// failures of the request itself become [`Response::Error`].
    async fn dispatch<R: AsyncRead + Unpin>(
        &self,
        request: Request,
        body: &mut R,
    ) -> Result<Response> {
        let response = match request {
            Request::ReadDirContent => match self.root.capture().await {
                Ok(snapshot) => Response::DirContent(snapshot),
                Err(e) => failed("read_dir_content", &e),
            },
            Request::UploadFile { path, size } => {
                let stored = self
                    .root
                    .receive_upload(&path, size, body, self.chunk_size)
                    .await?;
                acknowledge("upload", stored)
            }
            Request::CopyRename { src, dst } => {
                acknowledge("copy", self.root.copy_rename(&src, &dst).await)
            }
            Request::MoveRename { src, dst } => {
                acknowledge("move", self.root.move_rename(&src, &dst).await)
            }
            Request::DeleteFile { path } => acknowledge("delete", self.root.delete(&path).await),
        };
        Ok(response)
    }
}

fn acknowledge(what: &str, result: Result<()>) -> Response {
    match result {
        Ok(()) => Response::Ok,
        Err(e) => failed(what, &e),
    }
}

fn failed(what: &str, e: &SyncError) -> Response {
    warn!("{what} failed: {e}");
    Response::Error(e.to_string())
}

#[async_trait]
impl Service for SyncServer {
    fn name(&self) -> &'static str {
        "sync server"
    }

    async fn run(self: Arc<Self>, mut shutdown: Shutdown) -> Result<()> {
        info!(
            "serving {} on {}",
            self.root.path().display(),
            self.local_addr()?
        );
        let mut connections = JoinSet::new();
        let conn_shutdown = shutdown.clone();

        loop {
            tokio::select! {
                () = shutdown.wait() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!("{peer}: connected");
                        let server = Arc::clone(&self);
                        let shutdown = conn_shutdown.clone();
                        connections.spawn(async move {
                            server.serve_connection(stream, peer, shutdown).await;
                        });
                    }
                    Err(e) => warn!("accept failed: {e}"),
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        warn!("connection task ended abnormally: {e}");
                    }
                }
            }
        }

        info!("stopping, waiting for {} connections", connections.len());
        while let Some(joined) = connections.join_next().await {
            if let Err(e) = joined {
                warn!("connection task ended abnormally: {e}");
            }
        }
        Ok(())
    }
}
