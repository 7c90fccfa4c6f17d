//! Peer transfer server daemon.
//!
//! Serves a worker's cache directory to other workers.
//!
//! # Architecture Overview
//!
//! ```text
//!     Peer worker                 ┌───────────────────────────────────────────────┐
//!     ────────────────────────────┼─▶ net::listener (first free port in range)    │
//!                                 │        │                                      │
//!                                 │        ▼                                      │
//!                                 │   server::controller ── admission ceiling     │
//!                                 │        │  one task per connection             │
//!                                 │        ▼                                      │
//!                                 │   server::handler                             │
//!                                 │     auth → get <name> → cache → transfer      │
//!     ◀───────────────────────────┼── file bytes | tar stream | close             │
//!                                 │                                               │
//!                                 │   config · observability · lifecycle          │
//!                                 └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use peer_transfer::config::{self, TransferConfig};
use peer_transfer::lifecycle::startup;
use peer_transfer::observability::logging;

#[derive(Parser)]
#[command(name = "transfer-server")]
#[command(about = "Serve a cache directory to peer workers", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cache directory to serve (overrides the config file)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    #[arg(long)]
    port_min: Option<u16>,

    #[arg(long)]
    port_max: Option<u16>,

    /// File holding the shared password
    #[arg(long)]
    password_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => TransferConfig::default(),
    };
    if let Some(root) = args.cache_dir {
        config.cache.root = root;
    }
    if let Some(port) = args.port_min {
        config.server.port_min = port;
    }
    if let Some(port) = args.port_max {
        config.server.port_max = port;
    }
    if let Some(path) = args.password_file {
        config.auth.password_file = Some(path);
    }
    if let Err(errors) = config::validation::validate_config(&config) {
        return Err(config::ConfigError::Validation(errors).into());
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "transfer-server starting");
    tracing::info!(
        host = %config.server.host,
        port_min = config.server.port_min,
        port_max = config.server.port_max,
        max_concurrent_handlers = config.server.max_concurrent_handlers,
        cache_root = %config.cache.root.display(),
        auth = config.auth.password_file.is_some(),
        "Configuration loaded"
    );

    startup::run(config).await?;
    Ok(())
}
