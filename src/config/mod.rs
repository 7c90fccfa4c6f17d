//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → TransferConfig (validated, immutable)
//!     → ServerSettings (durations, password bytes) handed to start()
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the admission ceiling is fixed at start
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_password, ConfigError};
pub use schema::{
    AuthConfig, CacheConfig, ObservabilityConfig, ServerConfig, ServerSettings, TimeoutConfig,
    TransferConfig, DEFAULT_MAX_CONCURRENT_HANDLERS,
};
