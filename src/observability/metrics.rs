//! Metrics collection and exposition.
//!
//! # Metrics
//! - `transfer_connections_total` (counter): accepted peer connections
//! - `transfer_handlers_active` (gauge): handlers currently running
//! - `transfer_requests_total` (counter): finished handlers by outcome
//! - `transfer_bytes_sent_total` (counter): payload bytes written to peers
//! - `transfer_handler_panics_total` (counter): handlers that panicked
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus endpoint is optional and off by default

use std::net::SocketAddr;

/// Install the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection_accepted() {
    metrics::counter!("transfer_connections_total").increment(1);
}

pub fn record_active_handlers(count: usize) {
    metrics::gauge!("transfer_handlers_active").set(count as f64);
}

/// Record how a handler finished (`sent`, `not_found`, `auth_failed`, ...).
pub fn record_request(outcome: &'static str) {
    metrics::counter!("transfer_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_bytes_sent(bytes: u64) {
    metrics::counter!("transfer_bytes_sent_total").increment(bytes);
}

pub fn record_handler_panic() {
    metrics::counter!("transfer_handler_panics_total").increment(1);
}
