//! Peer-to-peer transfer server for worker caches.

pub mod archive;
pub mod cache;
pub mod client;
pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocol;
pub mod security;
pub mod server;

pub use cache::{Artifact, Cache, CacheError, DirectoryCache, MemoryCache};
pub use config::schema::{ServerSettings, TransferConfig};
pub use lifecycle::{ServerError, Shutdown, TransferServer, TransferService};
