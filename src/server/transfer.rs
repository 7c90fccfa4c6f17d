//! Streaming a resolved artifact to the requesting peer.

use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};

use crate::archive;
use crate::cache::Artifact;
use crate::net::connection::{Connection, LineError};
use crate::protocol::{DirectoryRecord, ResponseHeader};

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("transfer deadline passed")]
    Timeout,

    #[error("header write failed: {0}")]
    Header(#[from] LineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file changed size during transfer ({sent} of {expected} bytes)")]
    Truncated { sent: u64, expected: u64 },
}

/// Send `artifact` as `name`, finishing before `deadline`.
///
/// Returns the number of payload bytes written (header excluded).
pub async fn send_artifact(
    conn: &mut Connection,
    name: &str,
    artifact: Artifact,
    deadline: Instant,
) -> Result<u64, TransferError> {
    match artifact {
        Artifact::File { path, size, mode } => send_file(conn, name, path, size, mode, deadline).await,
        Artifact::Buffer { bytes, mode } => {
            let header = ResponseHeader::File {
                name: name.to_string(),
                length: bytes.len() as u64,
                mode,
            };
            conn.write_line(&header.to_line(), deadline).await?;
            within(deadline, async {
                let stream = conn.stream_mut();
                stream.write_all(&bytes).await?;
                stream.flush().await
            })
            .await?;
            Ok(bytes.len() as u64)
        }
        Artifact::Directory { path } => send_directory(conn, name, path, deadline).await,
    }
}

async fn within<F, T>(deadline: Instant, fut: F) -> Result<T, TransferError>
where
    F: std::future::Future<Output = std::io::Result<T>>,
{
    match timeout_at(deadline, fut).await {
        Err(_) => Err(TransferError::Timeout),
        Ok(result) => result.map_err(TransferError::from),
    }
}

async fn send_file(
    conn: &mut Connection,
    name: &str,
    path: PathBuf,
    size: u64,
    mode: u32,
    deadline: Instant,
) -> Result<u64, TransferError> {
    // open before announcing, so an unreadable file sends nothing
    let file = within(deadline, tokio::fs::File::open(&path)).await?;

    let header = ResponseHeader::File {
        name: name.to_string(),
        length: size,
        mode,
    };
    conn.write_line(&header.to_line(), deadline).await?;

    let sent = within(deadline, async {
        let stream = conn.stream_mut();
        let copied = tokio::io::copy(&mut file.take(size), stream).await?;
        stream.flush().await?;
        Ok::<_, std::io::Error>(copied)
    })
    .await?;

    if sent != size {
        return Err(TransferError::Truncated {
            sent,
            expected: size,
        });
    }
    Ok(sent)
}

async fn send_directory(
    conn: &mut Connection,
    name: &str,
    path: PathBuf,
    deadline: Instant,
) -> Result<u64, TransferError> {
    let header = ResponseHeader::Directory {
        name: name.to_string(),
    };
    conn.write_line(&header.to_line(), deadline).await?;

    let (mut chunks, archiver) = archive::spawn_archiver(path);
    let streamed = within(deadline, async {
        let stream = conn.stream_mut();
        let mut sent = 0u64;
        while let Some(chunk) = chunks.recv().await {
            let record = DirectoryRecord::Chunk(chunk.len() as u64).to_line();
            stream.write_all(record.as_bytes()).await?;
            stream.write_all(b"\n").await?;
            stream.write_all(&chunk).await?;
            sent += chunk.len() as u64;
        }
        Ok::<_, std::io::Error>(sent)
    })
    .await;
    // closing the receiver unblocks the archiver if we stopped early
    drop(chunks);

    let sent = streamed?;
    match archiver.await {
        Ok(result) => result?,
        Err(join_error) => return Err(std::io::Error::other(join_error).into()),
    }
    // only a complete archive is terminated; on failure the peer sees EOF
    conn.write_line(&DirectoryRecord::End.to_line(), deadline).await?;
    Ok(sent)
}
