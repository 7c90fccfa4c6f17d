//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Port range from config
//!     → listener.rs (bind first free port, accept with bounded wait)
//!     → connection.rs (connection ID, owned stream, deadline line I/O)
//!     → Hand off to a handler task
//! ```
//!
//! # Design Decisions
//! - Accept never blocks forever so the controller can revisit reaping
//! - Every read and write carries an absolute deadline
//! - A connection has exactly one owner; dropping it closes the socket

pub mod connection;
pub mod listener;

pub use connection::{Connection, ConnectionId, LineError, LINE_MAX};
pub use listener::{ListenerError, TransferListener};
