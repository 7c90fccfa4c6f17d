//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Controller and handlers produce:
//!     → logging.rs (structured log events, connection_id on every line)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
