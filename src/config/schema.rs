//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the transfer
//! server. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Fixed ceiling on concurrently running connection handlers.
pub const DEFAULT_MAX_CONCURRENT_HANDLERS: usize = 128;

/// Root configuration for the transfer server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TransferConfig {
    /// Listener and admission settings.
    pub server: ServerConfig,

    /// Per-connection deadlines.
    pub timeouts: TimeoutConfig,

    /// Shared-secret authentication.
    pub auth: AuthConfig,

    /// Local content cache served to peers.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Lowest acceptable port. Zero with `port_max` zero means any port.
    pub port_min: u16,

    /// Highest acceptable port (inclusive).
    pub port_max: u16,

    /// Maximum concurrent handlers (backpressure).
    pub max_concurrent_handlers: usize,

    /// How long a single accept waits before the loop revisits reaping.
    pub accept_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port_min: 0,
            port_max: 0,
            max_concurrent_handlers: DEFAULT_MAX_CONCURRENT_HANDLERS,
            accept_timeout_secs: 10,
        }
    }
}

/// Timeout configuration for a peer connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for authentication and for the request line, in seconds.
    pub command_secs: u64,

    /// Deadline for a complete transfer, in seconds.
    pub transfer_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            command_secs: 5,
            transfer_secs: 3600,
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// File holding the shared password. No file means no authentication.
    pub password_file: Option<PathBuf>,
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory whose entries are served by name.
    pub root: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./cache"),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Runtime settings handed to the server at start.
///
/// Built from [`TransferConfig`] by the loader, or directly in tests.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port_min: u16,
    pub port_max: u16,
    pub max_concurrent_handlers: usize,
    pub accept_timeout: Duration,
    pub command_timeout: Duration,
    pub transfer_timeout: Duration,
    pub password: Option<Vec<u8>>,
}

impl ServerSettings {
    /// Settings for the given port range with all other values defaulted.
    pub fn with_port_range(port_min: u16, port_max: u16) -> Self {
        Self {
            port_min,
            port_max,
            ..Self::default()
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        let server = ServerConfig::default();
        let timeouts = TimeoutConfig::default();
        Self {
            host: server.host,
            port_min: server.port_min,
            port_max: server.port_max,
            max_concurrent_handlers: server.max_concurrent_handlers,
            accept_timeout: Duration::from_secs(server.accept_timeout_secs),
            command_timeout: Duration::from_secs(timeouts.command_secs),
            transfer_timeout: Duration::from_secs(timeouts.transfer_secs),
            password: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: TransferConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.max_concurrent_handlers, DEFAULT_MAX_CONCURRENT_HANDLERS);
        assert_eq!(config.server.accept_timeout_secs, 10);
        assert_eq!(config.timeouts.command_secs, 5);
        assert_eq!(config.timeouts.transfer_secs, 3600);
        assert!(config.auth.password_file.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: TransferConfig = toml::from_str(
            r#"
            [server]
            port_min = 9000
            port_max = 9010

            [auth]
            password_file = "/etc/worker/secret"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port_min, 9000);
        assert_eq!(config.server.port_max, 9010);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(
            config.auth.password_file.as_deref(),
            Some(std::path::Path::new("/etc/worker/secret"))
        );
    }
}
