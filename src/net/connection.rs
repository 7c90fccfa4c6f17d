//! Accepted peer connections and deadline-bounded line I/O.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Own the accepted stream for exactly one handler
//! - Read and write protocol lines against an absolute deadline

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};

/// Longest accepted protocol line, newline included.
pub const LINE_MAX: usize = 4096;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Failure to obtain one protocol line.
#[derive(Debug, thiserror::Error)]
pub enum LineError {
    #[error("deadline passed before a full line arrived")]
    Timeout,

    #[error("peer closed the connection")]
    Closed,

    #[error("line exceeds {} bytes", LINE_MAX)]
    TooLong,

    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One accepted peer connection.
///
/// Not `Clone`: whoever holds it owns the socket, and dropping it closes it.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    peer_addr: SocketAddr,
    stream: BufReader<TcpStream>,
}

impl Connection {
    pub fn new(stream: TcpStream, peer_addr: SocketAddr) -> Self {
        Self {
            id: ConnectionId::new(),
            peer_addr,
            stream: BufReader::new(stream),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Read one line, stripped of its terminator.
    pub async fn read_line(&mut self, deadline: Instant) -> Result<String, LineError> {
        read_line_until(&mut self.stream, deadline).await
    }

    /// Write `line` followed by a newline.
    pub async fn write_line(&mut self, line: &str, deadline: Instant) -> Result<(), LineError> {
        write_line_until(&mut self.stream, line, deadline).await
    }

    /// The underlying buffered stream, for bulk transfers.
    pub fn stream_mut(&mut self) -> &mut BufReader<TcpStream> {
        &mut self.stream
    }
}

/// Read one `\n`-terminated line from `reader` before `deadline`.
///
/// A trailing `\r` is dropped as well. Bytes without a terminator at EOF
/// count as a closed connection, not a line.
pub async fn read_line_until<R>(reader: &mut R, deadline: Instant) -> Result<String, LineError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(128);
    let mut limited = reader.take(LINE_MAX as u64);

    let read = match timeout_at(deadline, limited.read_until(b'\n', &mut buf)).await {
        Err(_) => return Err(LineError::Timeout),
        Ok(result) => result?,
    };

    if read == 0 {
        return Err(LineError::Closed);
    }
    if buf.last() != Some(&b'\n') {
        return Err(if buf.len() >= LINE_MAX {
            LineError::TooLong
        } else {
            LineError::Closed
        });
    }

    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    String::from_utf8(buf).map_err(|_| LineError::InvalidUtf8)
}

/// Write `line` and a newline to `writer` before `deadline`.
pub async fn write_line_until<W>(writer: &mut W, line: &str, deadline: Instant) -> Result<(), LineError>
where
    W: AsyncWrite + Unpin,
{
    let mut framed = Vec::with_capacity(line.len() + 1);
    framed.extend_from_slice(line.as_bytes());
    framed.push(b'\n');

    let write = async {
        writer.write_all(&framed).await?;
        writer.flush().await
    };
    match timeout_at(deadline, write).await {
        Err(_) => Err(LineError::Timeout),
        Ok(result) => result.map_err(LineError::from),
    }
}
