//! Startup orchestration for the daemon.
//!
//! # Responsibilities
//! - Resolve runtime settings (password file) from the validated config
//! - Open the cache directory
//! - Start the metrics endpoint if enabled, then the transfer server
//! - Hold the server until a termination signal, then stop it
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener starts last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;

use crate::cache::{CacheError, DirectoryCache};
use crate::config::{ConfigError, TransferConfig};
use crate::lifecycle::server::ServerError;
use crate::lifecycle::service::TransferService;
use crate::lifecycle::signals;
use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("cache directory: {0}")]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Serve the configured cache directory until SIGINT/SIGTERM.
pub async fn run(config: TransferConfig) -> Result<(), StartupError> {
    let settings = config.settings()?;

    std::fs::create_dir_all(&config.cache.root).map_err(CacheError::from)?;
    let cache = DirectoryCache::open(&config.cache.root)?;
    tracing::info!(root = %cache.root().display(), "Cache directory opened");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let service = TransferService::new();
    let addr = service.start_with(Arc::new(cache), settings).await?;
    tracing::info!(address = %addr, "Serving peer transfers");

    let signal = signals::wait_for_termination().await;
    tracing::info!(signal, "Shutdown signal received");

    service.stop().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
