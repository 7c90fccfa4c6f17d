//! Process-level transfer service holding at most one running server.
//!
//! A worker runs a single transfer server. This wrapper gives the owning
//! process the `start` / `stop` / `address` surface and refuses a second
//! start while one server is still up.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::cache::Cache;
use crate::config::ServerSettings;
use crate::lifecycle::server::{ServerError, TransferServer};

#[derive(Debug, Default)]
pub struct TransferService {
    slot: Mutex<Option<TransferServer>>,
}

impl TransferService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start serving `cache` on the first free port in `port_min..=port_max`.
    pub async fn start(
        &self,
        cache: Arc<dyn Cache>,
        port_min: u16,
        port_max: u16,
    ) -> Result<SocketAddr, ServerError> {
        self.start_with(cache, ServerSettings::with_port_range(port_min, port_max))
            .await
    }

    pub async fn start_with(
        &self,
        cache: Arc<dyn Cache>,
        settings: ServerSettings,
    ) -> Result<SocketAddr, ServerError> {
        let mut slot = self.slot.lock().await;
        if let Some(running) = slot.as_ref() {
            return Err(ServerError::AlreadyRunning(running.address()));
        }

        let server = TransferServer::start(cache, settings).await?;
        let addr = server.address();
        *slot = Some(server);
        Ok(addr)
    }

    /// Stop the running server and wait for its accept loop to exit.
    pub async fn stop(&self) -> Result<(), ServerError> {
        let server = self.slot.lock().await.take().ok_or(ServerError::NotRunning)?;
        server.stop().await;
        Ok(())
    }

    /// Address of the running server.
    pub async fn address(&self) -> Result<SocketAddr, ServerError> {
        self.slot
            .lock()
            .await
            .as_ref()
            .map(TransferServer::address)
            .ok_or(ServerError::NotRunning)
    }

    pub async fn is_running(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}
