//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::config::schema::{ServerSettings, TransferConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
    Password(std::io::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
            ConfigError::Password(e) => write!(f, "Unable to read password file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<TransferConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: TransferConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Read a shared password, dropping one trailing line ending.
pub fn load_password(path: &Path) -> Result<Vec<u8>, ConfigError> {
    let mut bytes = fs::read(path).map_err(ConfigError::Password)?;
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
    }
    Ok(bytes)
}

impl TransferConfig {
    /// Resolve the runtime settings, reading the password file if one is set.
    pub fn settings(&self) -> Result<ServerSettings, ConfigError> {
        let password = match &self.auth.password_file {
            Some(path) => Some(load_password(path)?),
            None => None,
        };
        Ok(ServerSettings {
            host: self.server.host.clone(),
            port_min: self.server.port_min,
            port_max: self.server.port_max,
            max_concurrent_handlers: self.server.max_concurrent_handlers,
            accept_timeout: Duration::from_secs(self.server.accept_timeout_secs),
            command_timeout: Duration::from_secs(self.timeouts.command_secs),
            transfer_timeout: Duration::from_secs(self.timeouts.transfer_secs),
            password,
        })
    }
}
