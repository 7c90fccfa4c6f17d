//! Content cache collaborator.
//!
//! # Data Flow
//! ```text
//! decoded filename
//!     → Cache::resolve
//!     → Artifact (File | Directory | Buffer)
//!     → server::transfer picks the transfer mode from the variant
//! ```
//!
//! # Design Decisions
//! - Read-only from the server's point of view
//! - Shared by every handler task through `Arc<dyn Cache>`, so lookups must
//!   be safe under concurrent reads
//! - The cache decides what an item is; the client never asks for a mode

pub mod directory;
pub mod memory;

use std::path::PathBuf;
use std::sync::Arc;

pub use directory::DirectoryCache;
pub use memory::MemoryCache;

/// A cached item ready to be streamed to a peer.
#[derive(Debug, Clone)]
pub enum Artifact {
    /// A regular file on disk.
    File { path: PathBuf, size: u64, mode: u32 },
    /// A directory, sent as a tar archive.
    Directory { path: PathBuf },
    /// Content already held in memory.
    Buffer { bytes: Arc<[u8]>, mode: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("'{0}' is not in the cache")]
    NotFound(String),

    #[error("'{0}' is not a valid cache name")]
    InvalidName(String),

    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolves cache names to transferable content.
pub trait Cache: Send + Sync + 'static {
    fn resolve(&self, filename: &str) -> Result<Artifact, CacheError>;
}
