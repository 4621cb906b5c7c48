//! Binary protocol between a sync client and a sync server
//!
//! Wire format (all integers are big-endian):
//!
//! ```text
//! +--------+---------+------------------+
//! | type   | length  | payload          |
//! | 1 byte | 4 bytes | `length` bytes   |
//! +--------+---------+------------------+
//! ```
//!
//! Paths inside a payload are `len:2` followed by UTF-8 bytes. Message types:
//! - 0x01: ReadDirContent request (no payload)
//! - 0x02: DirContent response (JSON object path -> hex fingerprint)
//! - 0x03: UploadFile request (path, size:8); `size` raw bytes follow the frame
//! - 0x04: CopyRename request (src path, dst path)
//! - 0x05: MoveRename request (src path, dst path)
//! - 0x06: DeleteFile request (path)
//! - 0x07: Ok response (no payload)
//! - 0x08: Error response (UTF-8 message)

use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, SyncError};
use crate::path::RelPath;
use crate::snapshot::Snapshot;

/// Message type identifiers
pub mod msg {
    pub const READ_DIR_CONTENT: u8 = 0x01;
    pub const DIR_CONTENT: u8 = 0x02;
    pub const UPLOAD_FILE: u8 = 0x03;
    pub const COPY_RENAME: u8 = 0x04;
    pub const MOVE_RENAME: u8 = 0x05;
    pub const DELETE_FILE: u8 = 0x06;
    pub const OK: u8 = 0x07;
    pub const ERROR: u8 = 0x08;
}

/// Size of the type + length header
pub const HEADER_LEN: usize = 5;

/// Largest payload accepted in a single frame. Upload bodies travel outside
/// the frame and are not bound by this.
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Request sent by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ReadDirContent,
    /// Followed on the stream by exactly `size` bytes of file content
    UploadFile { path: RelPath, size: u64 },
    CopyRename { src: RelPath, dst: RelPath },
    MoveRename { src: RelPath, dst: RelPath },
    DeleteFile { path: RelPath },
}

impl Request {
    /// Short name for log lines
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ReadDirContent => "read_dir_content",
            Self::UploadFile { .. } => "upload_file",
            Self::CopyRename { .. } => "copy_rename",
            Self::MoveRename { .. } => "move_rename",
            Self::DeleteFile { .. } => "delete_file",
        }
    }
}

/// Response sent by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    DirContent(Snapshot),
    Ok,
    Error(String),
}

fn put_path(buf: &mut BytesMut, path: &RelPath) -> Result<()> {
    let bytes = path.as_str().as_bytes();
    let len = u16::try_from(bytes.len())
        .map_err(|_| SyncError::protocol(format!("path too long to encode: {path}")))?;
    buf.put_u16(len);
    buf.put_slice(bytes);
    Ok(())
}

fn frame(msg_type: u8, payload: &[u8]) -> Result<Bytes> {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or_else(|| SyncError::protocol(format!("frame of {} bytes too large", payload.len())))?;
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u8(msg_type);
    buf.put_u32(len);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Encode a request into a complete frame
///
/// # Errors
/// Returns [`SyncError::Protocol`] if a path does not fit its length prefix
pub fn encode_request(request: &Request) -> Result<Bytes> {
    let mut payload = BytesMut::new();
    let msg_type = match request {
        Request::ReadDirContent => msg::READ_DIR_CONTENT,
        Request::UploadFile { path, size } => {
            put_path(&mut payload, path)?;
            payload.put_u64(*size);
            msg::UPLOAD_FILE
        }
        Request::CopyRename { src, dst } => {
            put_path(&mut payload, src)?;
            put_path(&mut payload, dst)?;
            msg::COPY_RENAME
        }
        Request::MoveRename { src, dst } => {
            put_path(&mut payload, src)?;
            put_path(&mut payload, dst)?;
            msg::MOVE_RENAME
        }
        Request::DeleteFile { path } => {
            put_path(&mut payload, path)?;
            msg::DELETE_FILE
        }
    };
    frame(msg_type, &payload)
}

/// Encode a response into a complete frame
///
/// # Errors
/// Returns [`SyncError::Protocol`] if the listing exceeds the frame limit
pub fn encode_response(response: &Response) -> Result<Bytes> {
    match response {
        Response::DirContent(snapshot) => {
            let json = serde_json::to_vec(snapshot)?;
            frame(msg::DIR_CONTENT, &json)
        }
        Response::Ok => frame(msg::OK, &[]),
        Response::Error(message) => frame(msg::ERROR, message.as_bytes()),
    }
}

/// Checked reads over a frame payload. Every request has a fixed grammar, so
/// a short read or leftover bytes both mean the frame is malformed.
struct PayloadCursor<'a> {
    msg_type: u8,
    buf: &'a [u8],
}

impl<'a> PayloadCursor<'a> {
    fn new(msg_type: u8, buf: &'a [u8]) -> Self {
        Self { msg_type, buf }
    }

    fn short(&self) -> SyncError {
        SyncError::protocol(format!("message 0x{:02x} payload too short", self.msg_type))
    }

    fn u16(&mut self) -> Result<u16> {
        if self.buf.remaining() < 2 {
            return Err(self.short());
        }
        Ok(self.buf.get_u16())
    }

    fn u64(&mut self) -> Result<u64> {
        if self.buf.remaining() < 8 {
            return Err(self.short());
        }
        Ok(self.buf.get_u64())
    }

    fn path(&mut self) -> Result<RelPath> {
        let len = usize::from(self.u16()?);
        if self.buf.remaining() < len {
            return Err(self.short());
        }
        let (raw, rest) = self.buf.split_at(len);
        self.buf = rest;
        let text = std::str::from_utf8(raw)
            .map_err(|_| SyncError::protocol("path is not valid UTF-8"))?;
        RelPath::new(text)
    }

    fn finish(self) -> Result<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(SyncError::protocol(format!(
                "message 0x{:02x} has {} trailing bytes",
                self.msg_type,
                self.buf.len()
            )))
        }
    }
}

fn parse_request(msg_type: u8, payload: &[u8]) -> Result<Request> {
    let mut cur = PayloadCursor::new(msg_type, payload);
    let request = match msg_type {
        msg::READ_DIR_CONTENT => Request::ReadDirContent,
        msg::UPLOAD_FILE => Request::UploadFile {
            path: cur.path()?,
            size: cur.u64()?,
        },
        msg::COPY_RENAME => Request::CopyRename {
            src: cur.path()?,
            dst: cur.path()?,
        },
        msg::MOVE_RENAME => Request::MoveRename {
            src: cur.path()?,
            dst: cur.path()?,
        },
        msg::DELETE_FILE => Request::DeleteFile { path: cur.path()? },
        other => return Err(SyncError::protocol(format!("unknown request type 0x{other:02x}"))),
    };
    cur.finish()?;
    Ok(request)
}

fn parse_response(msg_type: u8, payload: &[u8]) -> Result<Response> {
    match msg_type {
        msg::DIR_CONTENT => Ok(Response::DirContent(serde_json::from_slice(payload)?)),
        msg::OK => PayloadCursor::new(msg_type, payload).finish().map(|()| Response::Ok),
        msg::ERROR => String::from_utf8(payload.to_vec())
            .map(Response::Error)
            .map_err(|_| SyncError::protocol("error message is not valid UTF-8")),
        other => Err(SyncError::protocol(format!("unknown response type 0x{other:02x}"))),
    }
}

/// Split a complete frame into its type and payload
fn split_frame(frame: &[u8]) -> Result<(u8, &[u8])> {
    let Some((header, payload)) = frame.split_first_chunk::<HEADER_LEN>() else {
        return Err(SyncError::protocol("frame shorter than its header"));
    };
    let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if payload.len() != len as usize {
        return Err(SyncError::protocol(format!(
            "frame declares {len} payload bytes but carries {}",
            payload.len()
        )));
    }
    Ok((header[0], payload))
}

/// Decode a complete request frame
///
/// # Errors
/// Returns [`SyncError::Protocol`] for an unknown type or a payload that does
/// not match the request's argument grammar exactly
pub fn decode_request(frame: &[u8]) -> Result<Request> {
    let (msg_type, payload) = split_frame(frame)?;
    parse_request(msg_type, payload)
}

/// Decode a complete response frame
///
/// # Errors
/// Returns [`SyncError::Protocol`] for an unknown type or malformed payload
pub fn decode_response(frame: &[u8]) -> Result<Response> {
    let (msg_type, payload) = split_frame(frame)?;
    parse_response(msg_type, payload)
}

/// Protocol reader for receiving messages
pub struct ProtocolReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> ProtocolReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read one frame. `Ok(None)` means the peer closed the stream cleanly
    /// between frames.
    async fn read_frame(&mut self) -> Result<Option<(u8, Vec<u8>)>> {
        let mut header = [0u8; HEADER_LEN];
        let n = self
            .inner
            .read(&mut header[..1])
            .await
            .map_err(|e| SyncError::net("reading frame header", e))?;
        if n == 0 {
            return Ok(None);
        }
        self.inner
            .read_exact(&mut header[1..])
            .await
            .map_err(|e| truncated_or_net(e, "frame header"))?;

        let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
        if len > MAX_FRAME_LEN {
            return Err(SyncError::protocol(format!(
                "frame of {len} bytes exceeds limit of {MAX_FRAME_LEN}"
            )));
        }

        let mut payload = vec![0u8; len as usize];
        self.inner
            .read_exact(&mut payload)
            .await
            .map_err(|e| truncated_or_net(e, "frame payload"))?;
        Ok(Some((header[0], payload)))
    }

    /// Read the next request, or `None` once the client hung up
    ///
    /// # Errors
    /// [`SyncError::Network`] on socket failure, [`SyncError::Protocol`] on a
    /// malformed frame
    pub async fn read_request(&mut self) -> Result<Option<Request>> {
        match self.read_frame().await? {
            Some((msg_type, payload)) => parse_request(msg_type, &payload).map(Some),
            None => Ok(None),
        }
    }

    /// Read the reply to a request
    ///
    /// # Errors
    /// As [`Self::read_request`]; a closed stream is a network error here
    pub async fn read_response(&mut self) -> Result<Response> {
        match self.read_frame().await? {
            Some((msg_type, payload)) => parse_response(msg_type, &payload),
            None => Err(SyncError::net(
                "awaiting response",
                io::Error::from(io::ErrorKind::UnexpectedEof),
            )),
        }
    }

    /// Stream the raw bytes that follow an upload frame
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}

fn truncated_or_net(e: io::Error, what: &str) -> SyncError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        SyncError::protocol(format!("truncated {what}"))
    } else {
        SyncError::net(format!("reading {what}"), e)
    }
}

/// Protocol writer for sending messages
pub struct ProtocolWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> ProtocolWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    async fn send_frame(&mut self, frame: &[u8], flush: bool) -> Result<()> {
        self.inner
            .write_all(frame)
            .await
            .map_err(|e| SyncError::net("sending frame", e))?;
        if flush {
            self.flush().await?;
        }
        Ok(())
    }

    /// Send a request. Upload frames are not flushed since their body follows.
    ///
    /// # Errors
    /// [`SyncError::Network`] on socket failure
    pub async fn send_request(&mut self, request: &Request) -> Result<()> {
        let frame = encode_request(request)?;
        let flush = !matches!(request, Request::UploadFile { .. });
        self.send_frame(&frame, flush).await
    }

    /// Send a response
    ///
    /// # Errors
    /// [`SyncError::Network`] on socket failure
    pub async fn send_response(&mut self, response: &Response) -> Result<()> {
        let frame = encode_response(response)?;
        self.send_frame(&frame, true).await
    }

    /// Flush the underlying writer
    ///
    /// # Errors
    /// [`SyncError::Network`] on socket failure
    pub async fn flush(&mut self) -> Result<()> {
        self.inner
            .flush()
            .await
            .map_err(|e| SyncError::net("flushing stream", e))
    }

    /// Stream an upload body after its frame
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}

/// Stream exactly `len` bytes from `reader` to `writer`, `chunk_size` at a time.
///
/// The outer result reports failures of the source stream: an I/O error, or
/// the stream ending early ([`SyncError::Protocol`], truncated payload). After
/// such an error the stream position is unknown.
///
/// The inner result reports a failing sink. Once the sink fails the rest of
/// the payload is still read and discarded, so the source stays positioned at
/// the next frame.
///
/// # Errors
/// See above
pub async fn copy_payload<R, W>(
    reader: &mut R,
    writer: &mut W,
    len: u64,
    chunk_size: usize,
) -> Result<io::Result<()>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut remaining = len;
    let mut sink_error: Option<io::Error> = None;

    while remaining > 0 {
        let want = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let n = reader
            .read(&mut buf[..want])
            .await
            .map_err(|e| SyncError::net("reading payload", e))?;
        if n == 0 {
            return Err(SyncError::protocol(format!(
                "truncated payload: expected {len} bytes, got {}",
                len - remaining
            )));
        }
        remaining -= n as u64;

        if sink_error.is_none()
            && let Err(e) = writer.write_all(&buf[..n]).await
        {
            sink_error = Some(e);
        }
    }

    if let Some(e) = sink_error {
        return Ok(Err(e));
    }
    Ok(writer.flush().await)
}
