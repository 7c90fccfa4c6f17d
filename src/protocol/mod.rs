//! Peer transfer wire protocol.
//!
//! # Data Flow
//! ```text
//! [optional auth handshake, see security::auth]
//! client → server:  get <encoded-filename>\n
//! server → client:  file <name> <len> <mode>\n <bytes>
//!                 | dir <name>\n (chunk <len>\n <tar bytes>)* end\n
//!                 | (connection closed, nothing sent)
//! ```
//!
//! # Design Decisions
//! - Line oriented; one request per connection
//! - The server picks the transfer mode from the artifact, never the client
//! - There is no error response: failures close the connection

pub mod encoding;
pub mod request;
pub mod response;

pub use request::{ProtocolError, Request};
pub use response::{DirectoryRecord, ResponseHeader, DIR_CHUNK_MAX};
