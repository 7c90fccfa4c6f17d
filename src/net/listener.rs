//! TCP listener bound within a port range.
//!
//! # Responsibilities
//! - Bind the first free port of a configured range
//! - Accept incoming TCP connections with a bounded wait
//! - Report the bound address for discovery by peers
//!
//! Admission control is not done here: the controller decides when to call
//! `accept` at all.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::net::connection::Connection;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// No port in the range could be bound.
    Bind {
        host: String,
        port_min: u16,
        port_max: u16,
        source: std::io::Error,
    },
    /// Failed to accept connection.
    Accept(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind {
                host,
                port_min,
                port_max,
                source,
            } => write!(
                f,
                "Failed to bind {} in port range {}-{}: {}",
                host, port_min, port_max, source
            ),
            ListenerError::Accept(e) => write!(f, "Failed to accept: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind { source, .. } => Some(source),
            ListenerError::Accept(e) => Some(e),
        }
    }
}

/// The transfer server's listening endpoint.
///
/// Dropping the listener closes the port.
#[derive(Debug)]
pub struct TransferListener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl TransferListener {
    /// Bind the first available port in `port_min..=port_max`.
    ///
    /// A range of `0..=0` lets the OS choose any free port.
    pub async fn serve_range(
        host: &str,
        port_min: u16,
        port_max: u16,
    ) -> Result<Self, ListenerError> {
        let mut last_error = std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "empty port range",
        );

        for port in port_min..=port_max {
            match TcpListener::bind((host, port)).await {
                Ok(inner) => {
                    let local_addr = inner.local_addr().map_err(|source| ListenerError::Bind {
                        host: host.to_string(),
                        port_min,
                        port_max,
                        source,
                    })?;

                    tracing::info!(
                        address = %local_addr,
                        port_min,
                        port_max,
                        "Listener bound"
                    );

                    return Ok(Self { inner, local_addr });
                }
                Err(e) => {
                    tracing::trace!(host, port, error = %e, "Port unavailable");
                    last_error = e;
                }
            }
        }

        Err(ListenerError::Bind {
            host: host.to_string(),
            port_min,
            port_max,
            source: last_error,
        })
    }

    /// Accept the next connection, waiting at most `wait`.
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    pub async fn accept(&self, wait: Duration) -> Result<Option<Connection>, ListenerError> {
        let (stream, peer_addr) = match tokio::time::timeout(wait, self.inner.accept()).await {
            Err(_) => return Ok(None),
            Ok(accepted) => accepted.map_err(ListenerError::Accept)?,
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(peer_addr = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
        }
        let conn = Connection::new(stream, peer_addr);

        tracing::debug!(
            connection_id = %conn.id(),
            peer_addr = %peer_addr,
            "Connection accepted"
        );

        Ok(Some(conn))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_any_port_for_empty_range() {
        let listener = TransferListener::serve_range("127.0.0.1", 0, 0).await.unwrap();
        assert_ne!(listener.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn skips_ports_in_use() {
        let taken = TransferListener::serve_range("127.0.0.1", 0, 0).await.unwrap();
        let port = taken.local_addr().port();
        if port == u16::MAX {
            return;
        }

        match TransferListener::serve_range("127.0.0.1", port, port + 1).await {
            Ok(listener) => assert_eq!(listener.local_addr().port(), port + 1),
            // the neighbouring port may itself be taken on a busy host
            Err(ListenerError::Bind { .. }) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    #[tokio::test]
    async fn exhausted_range_is_a_bind_error() {
        let taken = TransferListener::serve_range("127.0.0.1", 0, 0).await.unwrap();
        let port = taken.local_addr().port();

        let err = TransferListener::serve_range("127.0.0.1", port, port)
            .await
            .unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
    }

    #[tokio::test]
    async fn accept_times_out_without_traffic() {
        let listener = TransferListener::serve_range("127.0.0.1", 0, 0).await.unwrap();
        let accepted = listener.accept(Duration::from_millis(20)).await.unwrap();
        assert!(accepted.is_none());
    }
}
