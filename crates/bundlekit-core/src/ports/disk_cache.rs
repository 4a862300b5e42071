//! Versioned disk cache port.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Disk cache failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// Underlying I/O failed.
    #[error("cache I/O error ({kind}): {message}")]
    Io {
        /// `std::io::ErrorKind` rendered as text.
        kind: String,
        /// I/O message.
        message: String,
    },

    /// A stored entry is unusable.
    #[error("cache entry '{key}' is corrupt: {message}")]
    Corrupt {
        /// Storage key.
        key: String,
        /// Description.
        message: String,
    },
}

impl CacheError {
    /// Convert an I/O error.
    pub fn from_io_error(err: &std::io::Error) -> Self {
        Self::Io {
            kind: format!("{:?}", err.kind()),
            message: err.to_string(),
        }
    }
}

/// Persists package bytes under `(key, version)`.
///
/// Storing a version replaces every other version of the same key.
#[async_trait]
pub trait DiskCachePort: Send + Sync {
    /// Whether `key` is durably stored at exactly `version`.
    async fn is_version_cached(&self, key: &str, version: &str) -> bool;

    /// Read `key` at `version`, `None` when absent.
    async fn read(&self, key: &str, version: &str) -> Result<Option<Bytes>, CacheError>;

    /// Store `bytes` as `key` at `version`, dropping older versions.
    async fn store(&self, key: &str, version: &str, bytes: Bytes) -> Result<(), CacheError>;

    /// Remove every version of `key`. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// Remove everything.
    async fn clear(&self) -> Result<(), CacheError>;
}
