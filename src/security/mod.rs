//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection:
//!     → auth.rs (shared-secret handshake, when a password is configured)
//!     → request parsing
//! ```
//!
//! # Design Decisions
//! - Fail closed: a failed handshake drops the connection without a reply
//! - No trust in client input; every handshake line has a deadline
//! - Transport encryption is out of scope

pub mod auth;

pub use auth::{authenticate_peer, authenticate_to_server, AuthError};
