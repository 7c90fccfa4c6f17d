//! Per-connection request handling.
//!
//! # Responsibilities
//! - Authenticate the peer when a password is configured
//! - Read and parse exactly one request line
//! - Resolve the name in the cache and stream the artifact back
//!
//! # Design Decisions
//! - Every failure ends the connection silently; there is no error reply
//! - Nothing escapes `handle_connection`: the task ending is the only signal
//!   the controller sees
//! - The transfer deadline is a fixed point in time computed at handler
//!   start, not a per-read timeout
//! - Cache lookups run on the blocking pool, like tar archiving

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::cache::{Artifact, Cache, CacheError};
use crate::net::connection::{Connection, LineError};
use crate::observability::metrics;
use crate::protocol::{ProtocolError, Request};
use crate::security::auth::{self, AuthError};
use crate::server::transfer::{self, TransferError};

/// Everything a handler needs besides its connection. Shared by all handlers.
pub struct HandlerContext {
    pub cache: Arc<dyn Cache>,
    pub password: Option<Vec<u8>>,
    pub command_timeout: Duration,
    pub transfer_timeout: Duration,
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("auth", &self.password.is_some())
            .field("command_timeout", &self.command_timeout)
            .field("transfer_timeout", &self.transfer_timeout)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("no request: {0}")]
    Read(#[from] LineError),

    #[error("invalid request: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("lookup failed: {0}")]
    Cache(#[from] CacheError),

    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),
}

impl HandlerError {
    /// Metric label for this outcome.
    pub fn outcome(&self) -> &'static str {
        match self {
            HandlerError::Auth(_) => "auth_failed",
            HandlerError::Read(_) => "no_request",
            HandlerError::Protocol(_) => "bad_request",
            HandlerError::Cache(CacheError::NotFound(_)) => "not_found",
            HandlerError::Cache(_) => "cache_error",
            HandlerError::Transfer(TransferError::Timeout) => "timeout",
            HandlerError::Transfer(_) => "transfer_failed",
        }
    }

    /// Whether the failure is ordinary peer behaviour rather than a local fault.
    fn is_peer_fault(&self) -> bool {
        !matches!(
            self,
            HandlerError::Cache(CacheError::Io(_)) | HandlerError::Transfer(_)
        )
    }
}

/// Serve one connection to completion. Never fails outward.
pub async fn handle_connection(mut conn: Connection, ctx: Arc<HandlerContext>) {
    let started = Instant::now();

    match serve_request(&mut conn, &ctx, started).await {
        Ok((filename, bytes)) => {
            tracing::info!(
                filename = %filename,
                bytes,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Transfer complete"
            );
            metrics::record_request("sent");
            metrics::record_bytes_sent(bytes);
        }
        Err(e) if e.is_peer_fault() => {
            tracing::debug!(error = %e, "Dropping peer connection");
            metrics::record_request(e.outcome());
        }
        Err(e) => {
            tracing::warn!(error = %e, "Transfer aborted");
            metrics::record_request(e.outcome());
        }
    }
    // conn dropped here: the socket closes on every path
}

async fn serve_request(
    conn: &mut Connection,
    ctx: &HandlerContext,
    started: Instant,
) -> Result<(String, u64), HandlerError> {
    if let Some(password) = &ctx.password {
        auth::authenticate_peer(conn.stream_mut(), password, started + ctx.command_timeout)
            .await?;
    }

    let line = conn.read_line(Instant::now() + ctx.command_timeout).await?;
    let Request::Get { filename } = Request::parse(&line)?;

    let artifact = resolve_blocking(&ctx.cache, &filename).await?;
    tracing::debug!(filename = %filename, artifact = ?artifact, "Sending artifact");

    let deadline = started + ctx.command_timeout + ctx.transfer_timeout;
    let bytes = transfer::send_artifact(conn, &filename, artifact, deadline).await?;
    Ok((filename, bytes))
}

/// Run the lookup on the blocking pool; a directory cache touches the disk.
///
/// A panicking lookup is re-raised so it still ends this handler's task.
async fn resolve_blocking(cache: &Arc<dyn Cache>, filename: &str) -> Result<Artifact, CacheError> {
    let cache = Arc::clone(cache);
    let name = filename.to_string();
    match tokio::task::spawn_blocking(move || cache.resolve(&name)).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(CacheError::Io(std::io::Error::other(e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_labels() {
        let missing = HandlerError::Cache(CacheError::NotFound("x".into()));
        assert_eq!(missing.outcome(), "not_found");
        assert!(missing.is_peer_fault());

        let stalled = HandlerError::Read(LineError::Timeout);
        assert_eq!(stalled.outcome(), "no_request");
        assert!(stalled.is_peer_fault());

        let slow = HandlerError::Transfer(TransferError::Timeout);
        assert_eq!(slow.outcome(), "timeout");
        assert!(!slow.is_peer_fault());
    }

    struct SlowCache;

    impl Cache for SlowCache {
        fn resolve(&self, filename: &str) -> Result<Artifact, CacheError> {
            std::thread::sleep(Duration::from_millis(200));
            Err(CacheError::NotFound(filename.to_string()))
        }
    }

    #[tokio::test]
    async fn slow_lookup_does_not_block_the_runtime() {
        // single-threaded runtime: a blocking lookup here would freeze the ticker
        let ticks = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let ticker = {
            let ticks = ticks.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    ticks.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                }
            })
        };

        let cache: Arc<dyn Cache> = Arc::new(SlowCache);
        let result = resolve_blocking(&cache, "slow").await;
        assert!(matches!(result, Err(CacheError::NotFound(name)) if name == "slow"));
        assert!(ticks.load(std::sync::atomic::Ordering::SeqCst) >= 5);
        ticker.abort();
    }
}
