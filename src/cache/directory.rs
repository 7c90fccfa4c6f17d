//! Cache backed by a worker's local cache directory.

use std::path::{Component, Path, PathBuf};

use crate::cache::{Artifact, Cache, CacheError};

/// Serves entries found directly under `root` (and below, by relative path).
#[derive(Debug, Clone)]
pub struct DirectoryCache {
    root: PathBuf,
}

impl DirectoryCache {
    /// Open a cache rooted at `root`, which must be an existing directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, CacheError> {
        let root = std::fs::canonicalize(root.as_ref())?;
        if !root.is_dir() {
            return Err(CacheError::InvalidName(root.display().to_string()));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a cache name onto a path that cannot leave the root.
    fn locate(&self, filename: &str) -> Result<PathBuf, CacheError> {
        let invalid = || CacheError::InvalidName(filename.to_string());

        let mut joined = self.root.clone();
        for comp in Path::new(filename).components() {
            match comp {
                Component::Normal(part) => joined.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid())
                }
            }
        }
        if joined == self.root {
            return Err(invalid());
        }

        let canon = match std::fs::canonicalize(&joined) {
            Ok(canon) => canon,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheError::NotFound(filename.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        // symlinks pointing outside the cache are not served
        if !canon.starts_with(&self.root) {
            return Err(invalid());
        }
        Ok(canon)
    }
}

#[cfg(unix)]
fn file_mode(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(meta: &std::fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

impl Cache for DirectoryCache {
    fn resolve(&self, filename: &str) -> Result<Artifact, CacheError> {
        let path = self.locate(filename)?;
        let meta = std::fs::metadata(&path)?;

        if meta.is_dir() {
            Ok(Artifact::Directory { path })
        } else if meta.is_file() {
            Ok(Artifact::File {
                size: meta.len(),
                mode: file_mode(&meta),
                path,
            })
        } else {
            Err(CacheError::NotFound(filename.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_entries() -> (tempfile::TempDir, DirectoryCache) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("input.dat"), b"hello").unwrap();
        std::fs::create_dir(dir.path().join("results")).unwrap();
        std::fs::write(dir.path().join("results").join("part-0"), b"x").unwrap();
        let cache = DirectoryCache::open(dir.path()).unwrap();
        (dir, cache)
    }

    #[test]
    fn resolves_files_and_directories() {
        let (_dir, cache) = cache_with_entries();

        match cache.resolve("input.dat").unwrap() {
            Artifact::File { size, .. } => assert_eq!(size, 5),
            other => panic!("expected file, got {:?}", other),
        }
        assert!(matches!(
            cache.resolve("results").unwrap(),
            Artifact::Directory { .. }
        ));
        assert!(matches!(
            cache.resolve("results/part-0").unwrap(),
            Artifact::File { size: 1, .. }
        ));
    }

    #[test]
    fn missing_entry_is_not_found() {
        let (_dir, cache) = cache_with_entries();
        assert!(matches!(
            cache.resolve("absent"),
            Err(CacheError::NotFound(_))
        ));
    }

    #[test]
    fn names_cannot_escape_root() {
        let (_dir, cache) = cache_with_entries();
        for name in ["../etc/passwd", "/etc/passwd", "results/../../x", ".", ""] {
            assert!(
                matches!(cache.resolve(name), Err(CacheError::InvalidName(_))),
                "{name} should be rejected"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn symlink_out_of_root_rejected() {
        let (dir, cache) = cache_with_entries();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret"), b"s").unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret"), dir.path().join("link"))
            .unwrap();

        assert!(matches!(
            cache.resolve("link"),
            Err(CacheError::InvalidName(_))
        ));
    }
}
