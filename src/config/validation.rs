//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, port range ordered, ceiling > 0)
//! - Check that referenced files and addresses are well formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TransferConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::TransferConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `server.port_max`.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration for values the server cannot run with.
pub fn validate_config(config: &TransferConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let server = &config.server;
    if server.host.trim().is_empty() {
        errors.push(ValidationError::new("server.host", "must not be empty"));
    }
    if server.port_min > server.port_max {
        errors.push(ValidationError::new(
            "server.port_max",
            format!(
                "port range is inverted ({} > {})",
                server.port_min, server.port_max
            ),
        ));
    }
    if server.max_concurrent_handlers == 0 {
        errors.push(ValidationError::new(
            "server.max_concurrent_handlers",
            "must be at least 1",
        ));
    }
    if server.accept_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "server.accept_timeout_secs",
            "must be greater than zero",
        ));
    }

    if config.timeouts.command_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.command_secs",
            "must be greater than zero",
        ));
    }
    if config.timeouts.transfer_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.transfer_secs",
            "must be greater than zero",
        ));
    }

    if let Some(path) = &config.auth.password_file {
        if path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "auth.password_file",
                "must not be an empty path",
            ));
        }
    }

    let obs = &config.observability;
    if !matches!(obs.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("unknown format '{}' (expected pretty or json)", obs.log_format),
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&TransferConfig::default()).is_ok());
    }

    #[test]
    fn reports_every_problem() {
        let mut config = TransferConfig::default();
        config.server.port_min = 9100;
        config.server.port_max = 9000;
        config.server.max_concurrent_handlers = 0;
        config.timeouts.command_secs = 0;
        config.timeouts.transfer_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "server.port_max",
                "server.max_concurrent_handlers",
                "timeouts.command_secs",
                "timeouts.transfer_secs",
            ]
        );
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = TransferConfig::default();
        config.observability.metrics_address = "not-an-address".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "observability.metrics_address");
    }
}
