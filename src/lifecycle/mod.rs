//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → settings → cache → TransferService::start → wait for signal
//!
//! Server handle (server.rs):
//!     start: bind port range → spawn accept loop task → record id + address
//!     stop:  trigger shutdown → loop drops listener → await loop task
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → stop the service
//! ```
//!
//! # Design Decisions
//! - The server is an owned handle, so tests can run several side by side
//! - TransferService enforces one server per process
//! - Stop is synchronous for the accept loop and abrupt for it: in-flight
//!   handlers are detached, not drained

pub mod server;
pub mod service;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use server::{ServerError, ServerId, TransferServer};
pub use service::TransferService;
pub use shutdown::{Shutdown, ShutdownSignal};
