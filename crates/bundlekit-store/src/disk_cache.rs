//! Versioned disk cache adapters.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bundlekit_core::{CacheError, DiskCachePort};
use bytes::Bytes;
use tracing::{debug, warn};

use crate::encode::{file_component, ignore_not_found, write_atomic};

/// Stores `(key, version)` as the file `<root>/<key>/<version>`.
///
/// Each key directory holds at most one version; storing a new one removes
/// the rest.
#[derive(Debug, Clone)]
pub struct FsDiskCache {
    root: PathBuf,
}

impl FsDiskCache {
    /// Cache under `root`. Directories are created on first store.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn key_dir(&self, key: &str) -> PathBuf {
        self.root.join(file_component(key))
    }

    fn version_path(&self, key: &str, version: &str) -> PathBuf {
        self.key_dir(key).join(file_component(version))
    }
}

fn io_error(err: &std::io::Error) -> CacheError {
    CacheError::from_io_error(err)
}

#[async_trait]
impl DiskCachePort for FsDiskCache {
    async fn is_version_cached(&self, key: &str, version: &str) -> bool {
        tokio::fs::try_exists(self.version_path(key, version))
            .await
            .unwrap_or(false)
    }

    async fn read(&self, key: &str, version: &str) -> Result<Option<Bytes>, CacheError> {
        match tokio::fs::read(self.version_path(key, version)).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&e)),
        }
    }

    async fn store(&self, key: &str, version: &str, bytes: Bytes) -> Result<(), CacheError> {
        let dir = self.key_dir(key);
        let name = file_component(version);
        write_atomic(&dir, &name, &bytes)
            .await
            .map_err(|e| io_error(&e))?;

        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| io_error(&e))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&e))? {
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if file_name == name || file_name.starts_with('.') {
                continue;
            }
            if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                warn!(target: "bundlekit.store", key, stale = %file_name, error = %e, "Failed to remove stale version");
            }
        }

        debug!(target: "bundlekit.store", key, version, size = bytes.len(), "Stored package");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        ignore_not_found(tokio::fs::remove_dir_all(self.key_dir(key)).await)
            .map_err(|e| io_error(&e))
    }

    async fn clear(&self) -> Result<(), CacheError> {
        ignore_not_found(tokio::fs::remove_dir_all(&self.root).await).map_err(|e| io_error(&e))?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| io_error(&e))
    }
}

/// Keeps one version per key in memory and counts traffic.
#[derive(Debug, Default)]
pub struct MemoryDiskCache {
    entries: Mutex<HashMap<String, (String, Bytes)>>,
    stores: AtomicUsize,
    reads: AtomicUsize,
}

impl MemoryDiskCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, (String, Bytes)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Version currently stored for `key`.
    pub fn cached_version(&self, key: &str) -> Option<String> {
        self.entries().get(key).map(|(version, _)| version.clone())
    }

    /// Number of successful stores.
    pub fn store_count(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    /// Number of reads that found an entry.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiskCachePort for MemoryDiskCache {
    async fn is_version_cached(&self, key: &str, version: &str) -> bool {
        self.entries()
            .get(key)
            .is_some_and(|(stored, _)| stored == version)
    }

    async fn read(&self, key: &str, version: &str) -> Result<Option<Bytes>, CacheError> {
        let found = self
            .entries()
            .get(key)
            .filter(|(stored, _)| stored == version)
            .map(|(_, bytes)| bytes.clone());
        if found.is_some() {
            self.reads.fetch_add(1, Ordering::SeqCst);
        }
        Ok(found)
    }

    async fn store(&self, key: &str, version: &str, bytes: Bytes) -> Result<(), CacheError> {
        self.entries()
            .insert(key.to_string(), (version.to_string(), bytes));
        self.stores.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.entries().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_store_and_read_version() {
        let temp = tempdir().unwrap();
        let cache = FsDiskCache::new(temp.path());

        assert!(!cache.is_version_cached("base", "v1").await);
        cache
            .store("base", "v1", Bytes::from_static(b"one"))
            .await
            .unwrap();
        assert!(cache.is_version_cached("base", "v1").await);
        assert_eq!(
            cache.read("base", "v1").await.unwrap(),
            Some(Bytes::from_static(b"one"))
        );
        assert_eq!(cache.read("base", "v2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_new_version_invalidates_old() {
        let temp = tempdir().unwrap();
        let cache = FsDiskCache::new(temp.path());

        cache.store("base", "v1", Bytes::from_static(b"one")).await.unwrap();
        cache.store("base", "v2", Bytes::from_static(b"two")).await.unwrap();

        assert!(!cache.is_version_cached("base", "v1").await);
        assert!(cache.is_version_cached("base", "v2").await);
        let files: Vec<_> = std::fs::read_dir(temp.path().join("base"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let temp = tempdir().unwrap();
        let cache = FsDiskCache::new(temp.path().join("cache"));

        cache.store("a", "1", Bytes::from_static(b"a")).await.unwrap();
        cache.store("b", "1", Bytes::from_static(b"b")).await.unwrap();
        cache.remove("a").await.unwrap();
        cache.remove("a").await.unwrap();
        assert!(!cache.is_version_cached("a", "1").await);
        assert!(cache.is_version_cached("b", "1").await);

        cache.clear().await.unwrap();
        assert!(!cache.is_version_cached("b", "1").await);
        assert!(temp.path().join("cache").is_dir());
    }

    #[tokio::test]
    async fn test_keys_with_separators_stay_inside_root() {
        let temp = tempdir().unwrap();
        let cache = FsDiskCache::new(temp.path().join("cache"));
        cache
            .store("../escape", "1", Bytes::from_static(b"x"))
            .await
            .unwrap();
        assert!(!temp.path().join("escape").exists());
        assert!(cache.is_version_cached("../escape", "1").await);
    }

    #[tokio::test]
    async fn test_memory_cache_counts() {
        let cache = MemoryDiskCache::new();
        cache.store("a", "1", Bytes::from_static(b"a")).await.unwrap();
        assert_eq!(cache.read("a", "2").await.unwrap(), None);
        assert!(cache.read("a", "1").await.unwrap().is_some());
        assert_eq!(cache.store_count(), 1);
        assert_eq!(cache.read_count(), 1);
        assert_eq!(cache.cached_version("a").as_deref(), Some("1"));
    }
}
