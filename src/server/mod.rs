//! Transfer server core.
//!
//! # Data Flow
//! ```text
//! controller.rs (accept loop, owns listener and handler set)
//!     → one task per connection: handler.rs
//!         → security::auth (optional)
//!         → protocol::Request
//!         → cache::Cache::resolve
//!         → transfer.rs (file bytes, buffer, or tar stream)
//!     → task ends → controller reaps it
//! ```

pub mod controller;
pub mod handler;
pub mod transfer;

pub use controller::Controller;
pub use handler::{handle_connection, HandlerContext, HandlerError};
pub use transfer::TransferError;
