//! In-memory cache for staged buffers.

use dashmap::DashMap;
use std::sync::Arc;

use crate::cache::{Artifact, Cache, CacheError};

const DEFAULT_MODE: u32 = 0o644;

/// A thread-safe name → bytes cache.
#[derive(Clone, Default)]
pub struct MemoryCache {
    inner: Arc<DashMap<String, Arc<[u8]>>>,
}

impl MemoryCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` under `name`, replacing any previous entry.
    pub fn insert(&self, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.inner.insert(name.into(), bytes.into());
    }

    pub fn remove(&self, name: &str) -> bool {
        self.inner.remove(name).is_some()
    }

    /// Count cached entries.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Cache for MemoryCache {
    fn resolve(&self, filename: &str) -> Result<Artifact, CacheError> {
        self.inner
            .get(filename)
            .map(|entry| Artifact::Buffer {
                bytes: Arc::clone(entry.value()),
                mode: DEFAULT_MODE,
            })
            .ok_or_else(|| CacheError::NotFound(filename.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_resolve_remove() {
        let cache = MemoryCache::new();
        assert!(cache.is_empty());

        cache.insert("blob", b"abc".to_vec());
        match cache.resolve("blob").unwrap() {
            Artifact::Buffer { bytes, mode } => {
                assert_eq!(&bytes[..], b"abc");
                assert_eq!(mode, DEFAULT_MODE);
            }
            other => panic!("expected buffer, got {:?}", other),
        }

        assert!(cache.remove("blob"));
        assert!(matches!(cache.resolve("blob"), Err(CacheError::NotFound(_))));
    }

    #[test]
    fn clones_share_entries() {
        let cache = MemoryCache::new();
        let view = cache.clone();
        cache.insert("k", &b"v"[..]);
        assert_eq!(view.len(), 1);
    }
}
