//! The accept loop: reaping, backpressure, accepting, dispatching.
//!
//! # Responsibilities
//! - Keep the number of running handlers at or below the ceiling
//! - Reap finished handlers on every iteration, without waiting
//! - Stop accepting (rather than queue or reject) while saturated
//! - Hand each accepted connection to its own task and keep no copy
//!
//! # Design Decisions
//! - A `JoinSet` is the active handler set: `len()` is the count,
//!   `try_join_next` the non-blocking reap, `join_next` the blocking one
//! - Only this loop touches the set, so the count needs no locking
//! - Accept waits are bounded so the loop revisits reaping with no traffic
//! - A panicking handler is contained by its task and only logged here

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tracing::Instrument;

use crate::lifecycle::shutdown::ShutdownSignal;
use crate::net::{Connection, TransferListener};
use crate::observability::metrics;
use crate::server::handler::{self, HandlerContext};

/// Pause after a failed accept (e.g. out of descriptors) before retrying.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub struct Controller {
    listener: TransferListener,
    handlers: JoinSet<()>,
    ctx: Arc<HandlerContext>,
    max_concurrent_handlers: usize,
    accept_timeout: Duration,
    active_tx: watch::Sender<usize>,
}

impl Controller {
    pub fn new(
        listener: TransferListener,
        ctx: Arc<HandlerContext>,
        max_concurrent_handlers: usize,
        accept_timeout: Duration,
        active_tx: watch::Sender<usize>,
    ) -> Self {
        Self {
            listener,
            handlers: JoinSet::new(),
            ctx,
            max_concurrent_handlers,
            accept_timeout,
            active_tx,
        }
    }

    /// Run until `shutdown` fires, then release the listener.
    ///
    /// Handlers still running at that point are detached, not cancelled:
    /// each finishes on its own deadlines.
    pub async fn run(mut self, mut shutdown: ShutdownSignal) {
        tokio::select! {
            biased;
            _ = shutdown.recv() => {}
            _ = self.accept_loop() => {}
        }

        let detached = self.handlers.len();
        self.handlers.detach_all();
        tracing::info!(
            address = %self.listener.local_addr(),
            detached_handlers = detached,
            "Accept loop stopped"
        );
    }

    async fn accept_loop(&mut self) {
        loop {
            self.reap();

            while self.handlers.len() >= self.max_concurrent_handlers {
                tracing::debug!(
                    active_handlers = self.handlers.len(),
                    "Handler limit reached, waiting for one to exit"
                );
                self.reap_blocking().await;
            }

            match self.listener.accept(self.accept_timeout).await {
                Ok(Some(conn)) => self.dispatch(conn),
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }

    /// Drain every handler that has already finished.
    fn reap(&mut self) {
        let mut reaped = 0;
        while let Some(result) = self.handlers.try_join_next() {
            note_finished(result);
            reaped += 1;
        }
        if reaped > 0 {
            self.publish_active();
        }
    }

    /// Wait for at least one handler to finish.
    async fn reap_blocking(&mut self) {
        if let Some(result) = self.handlers.join_next().await {
            note_finished(result);
            self.publish_active();
        }
    }

    fn dispatch(&mut self, conn: Connection) {
        let span = tracing::info_span!(
            "transfer",
            connection_id = %conn.id(),
            peer_addr = %conn.peer_addr()
        );
        // the connection moves into the task; nothing here keeps it open
        self.handlers.spawn(
            handler::handle_connection(conn, Arc::clone(&self.ctx)).instrument(span),
        );
        metrics::record_connection_accepted();
        self.publish_active();
    }

    fn publish_active(&self) {
        let active = self.handlers.len();
        self.active_tx.send_replace(active);
        metrics::record_active_handlers(active);
    }
}

fn note_finished(result: Result<(), JoinError>) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_panic() => {
            tracing::warn!(error = %e, "Handler panicked");
            metrics::record_handler_panic();
        }
        Err(e) => tracing::debug!(error = %e, "Handler cancelled"),
    }
}
