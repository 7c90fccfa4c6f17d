//! Fetching side of the peer transfer protocol.
//!
//! Used by workers pulling an item from a peer's cache, and by the
//! `transfer-cli` tool.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};

use crate::archive;
use crate::net::connection::{read_line_until, write_line_until, LineError};
use crate::protocol::{DirectoryRecord, ProtocolError, Request, ResponseHeader, DIR_CHUNK_MAX};
use crate::security::auth::{self, AuthError};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connect failed: {0}")]
    Connect(std::io::Error),

    #[error("operation timed out")]
    Timeout,

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("protocol line failed: {0}")]
    Line(#[from] LineError),

    #[error("peer closed the connection without sending '{0}'")]
    NotAvailable(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("short transfer: got {got} of {expected} bytes")]
    Truncated { got: u64, expected: u64 },

    #[error("directory '{0}' ended before the archive was complete")]
    Incomplete(String),
}

/// Client-side knobs.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Shared password, if the peer requires one.
    pub password: Option<Vec<u8>>,
    pub connect_timeout: Duration,
    /// Deadline for the whole exchange.
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            password: None,
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(3600),
        }
    }
}

/// Content received in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    File { name: String, bytes: Vec<u8>, mode: u32 },
    /// Raw tar archive of a directory.
    Directory { name: String, archive: Vec<u8> },
}

async fn open(
    addr: SocketAddr,
    filename: &str,
    opts: &FetchOptions,
) -> Result<(BufReader<TcpStream>, ResponseHeader, Instant), ClientError> {
    let deadline = Instant::now() + opts.timeout;
    let stream = timeout(opts.connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| ClientError::Timeout)?
        .map_err(ClientError::Connect)?;
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(peer = %addr, error = %e, "Failed to set TCP_NODELAY");
    }
    let mut stream = BufReader::new(stream);

    if let Some(password) = &opts.password {
        auth::authenticate_to_server(&mut stream, password, deadline).await?;
    }

    let request = Request::Get {
        filename: filename.to_string(),
    };
    write_line_until(&mut stream, &request.to_line(), deadline).await?;

    let header = match read_line_until(&mut stream, deadline).await {
        Err(LineError::Closed) => return Err(ClientError::NotAvailable(filename.to_string())),
        line => ResponseHeader::parse(&line?)?,
    };
    tracing::debug!(peer = %addr, header = ?header, "Response header received");
    Ok((stream, header, deadline))
}

/// Fetch `filename` from the peer at `addr` into memory.
pub async fn fetch(addr: SocketAddr, filename: &str, opts: &FetchOptions) -> Result<Fetched, ClientError> {
    let (mut stream, header, deadline) = open(addr, filename, opts).await?;
    timeout_at(deadline, read_body(&mut stream, header, deadline))
        .await
        .map_err(|_| ClientError::Timeout)?
}

/// Fetch `filename` and materialize it at `dest`.
///
/// Files are written with the mode the peer reported; directories are
/// unpacked with `dest` as their root. Returns payload bytes received.
/// A directory stream that stops before its end marker fails with
/// [`ClientError::Incomplete`]; entries unpacked so far are left in place.
pub async fn fetch_to_path(
    addr: SocketAddr,
    filename: &str,
    dest: &Path,
    opts: &FetchOptions,
) -> Result<u64, ClientError> {
    let (mut stream, header, deadline) = open(addr, filename, opts).await?;
    timeout_at(deadline, write_body(&mut stream, header, dest, deadline))
        .await
        .map_err(|_| ClientError::Timeout)?
}

/// Next framing record of a directory transfer; EOF before `end` is an error.
async fn next_record(
    stream: &mut BufReader<TcpStream>,
    name: &str,
    deadline: Instant,
) -> Result<DirectoryRecord, ClientError> {
    match read_line_until(stream, deadline).await {
        Err(LineError::Closed) => Err(ClientError::Incomplete(name.to_string())),
        line => Ok(DirectoryRecord::parse(&line?)?),
    }
}

/// Read exactly `length` bytes of one record.
async fn read_chunk(stream: &mut BufReader<TcpStream>, length: u64) -> Result<Vec<u8>, ClientError> {
    let mut chunk = Vec::with_capacity(length.min(DIR_CHUNK_MAX) as usize);
    stream.take(length).read_to_end(&mut chunk).await?;
    if chunk.len() as u64 != length {
        return Err(ClientError::Truncated {
            got: chunk.len() as u64,
            expected: length,
        });
    }
    Ok(chunk)
}

async fn read_body(
    stream: &mut BufReader<TcpStream>,
    header: ResponseHeader,
    deadline: Instant,
) -> Result<Fetched, ClientError> {
    match header {
        ResponseHeader::File { name, length, mode } => {
            let bytes = read_chunk(stream, length).await?;
            Ok(Fetched::File { name, bytes, mode })
        }
        ResponseHeader::Directory { name } => {
            let mut archive = Vec::new();
            while let DirectoryRecord::Chunk(length) = next_record(stream, &name, deadline).await? {
                archive.extend_from_slice(&read_chunk(stream, length).await?);
            }
            Ok(Fetched::Directory { name, archive })
        }
    }
}

async fn write_body(
    stream: &mut BufReader<TcpStream>,
    header: ResponseHeader,
    dest: &Path,
    deadline: Instant,
) -> Result<u64, ClientError> {
    match header {
        ResponseHeader::File { length, mode, .. } => {
            let mut file = tokio::fs::File::create(dest).await?;
            let got = tokio::io::copy(&mut stream.take(length), &mut file).await?;
            file.flush().await?;
            if got != length {
                return Err(ClientError::Truncated {
                    got,
                    expected: length,
                });
            }
            set_mode(dest, mode).await?;
            Ok(got)
        }
        ResponseHeader::Directory { name } => {
            let (sink, unpacker) = archive::spawn_unpacker(dest);
            let received = forward_chunks(stream, &name, &sink, deadline).await;
            drop(sink);
            let unpacked = unpacker.await.map_err(std::io::Error::other);
            // stream errors take precedence over unpack errors
            let received = received?;
            unpacked??;
            Ok(received)
        }
    }
}

async fn forward_chunks(
    stream: &mut BufReader<TcpStream>,
    name: &str,
    sink: &tokio::sync::mpsc::Sender<Vec<u8>>,
    deadline: Instant,
) -> Result<u64, ClientError> {
    let mut received = 0u64;
    let mut unpacking = true;
    while let DirectoryRecord::Chunk(length) = next_record(stream, name, deadline).await? {
        let chunk = read_chunk(stream, length).await?;
        received += length;
        // keep reading to `end` even if the unpacker stopped; its error wins later
        if unpacking && sink.send(chunk).await.is_err() {
            unpacking = false;
        }
    }
    Ok(received)
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}
