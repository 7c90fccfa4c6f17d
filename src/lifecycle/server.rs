//! Owned transfer server handle: start, address, stop.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::cache::Cache;
use crate::config::ServerSettings;
use crate::lifecycle::shutdown::Shutdown;
use crate::net::{ListenerError, TransferListener};
use crate::server::{Controller, HandlerContext};

/// Identity of one started server, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerId(Uuid);

impl ServerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ServerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("unable to find a port to start a transfer server: {0}")]
    Bind(#[from] ListenerError),

    #[error("invalid server settings: {0}")]
    InvalidSettings(&'static str),

    #[error("transfer server is already running on {0}")]
    AlreadyRunning(SocketAddr),

    #[error("transfer server is not running")]
    NotRunning,
}

/// A running transfer server.
///
/// The accept loop runs in a background task that owns the listening socket.
/// Dropping the handle without calling [`stop`](Self::stop) still signals the
/// loop to exit, but does not wait for it.
#[derive(Debug)]
pub struct TransferServer {
    id: ServerId,
    local_addr: SocketAddr,
    shutdown: Shutdown,
    controller: Option<JoinHandle<()>>,
    active: watch::Receiver<usize>,
}

impl TransferServer {
    /// Bind within the configured port range and start accepting.
    ///
    /// Failing to bind is fatal: no task is started.
    pub async fn start(cache: Arc<dyn Cache>, settings: ServerSettings) -> Result<Self, ServerError> {
        if settings.max_concurrent_handlers == 0 {
            return Err(ServerError::InvalidSettings(
                "max_concurrent_handlers must be at least 1",
            ));
        }

        let listener =
            TransferListener::serve_range(&settings.host, settings.port_min, settings.port_max)
                .await?;
        let local_addr = listener.local_addr();

        let ctx = Arc::new(HandlerContext {
            cache,
            password: settings.password,
            command_timeout: settings.command_timeout,
            transfer_timeout: settings.transfer_timeout,
        });

        let (active_tx, active) = watch::channel(0);
        let shutdown = Shutdown::new();
        let id = ServerId::new();

        let controller = Controller::new(
            listener,
            ctx,
            settings.max_concurrent_handlers,
            settings.accept_timeout,
            active_tx,
        );
        let span = tracing::info_span!("transfer_server", server_id = %id);
        let signal = shutdown.subscribe();
        let task = tokio::spawn(tracing::Instrument::instrument(controller.run(signal), span));

        tracing::info!(
            server_id = %id,
            address = %local_addr,
            max_concurrent_handlers = settings.max_concurrent_handlers,
            "Started transfer server"
        );

        Ok(Self {
            id,
            local_addr,
            shutdown,
            controller: Some(task),
            active,
        })
    }

    /// Start with default settings on the given port range.
    pub async fn start_range(
        cache: Arc<dyn Cache>,
        port_min: u16,
        port_max: u16,
    ) -> Result<Self, ServerError> {
        Self::start(cache, ServerSettings::with_port_range(port_min, port_max)).await
    }

    pub fn id(&self) -> ServerId {
        self.id
    }

    /// The bound address peers connect to.
    pub fn address(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handlers running as of the controller's last reap or dispatch.
    pub fn active_handlers(&self) -> usize {
        *self.active.borrow()
    }

    /// Observe the active handler count as the controller updates it.
    pub fn watch_active_handlers(&self) -> watch::Receiver<usize> {
        self.active.clone()
    }

    /// Close the listener and end the accept loop, waiting until it is gone.
    ///
    /// Connections already being served are left to finish on their own.
    pub async fn stop(mut self) {
        tracing::info!(server_id = %self.id, address = %self.local_addr, "Stopping transfer server");

        self.shutdown.trigger();
        if let Some(task) = self.controller.take() {
            if let Err(e) = task.await {
                tracing::warn!(server_id = %self.id, error = %e, "Accept loop ended abnormally");
            }
        }
    }
}

impl Drop for TransferServer {
    fn drop(&mut self) {
        if self.controller.is_some() {
            self.shutdown.trigger();
        }
    }
}
