//! Resource manifest port.
//!
//! The resource manifest is the bookkeeping record of which catalog
//! identities the host knows about and which version of each is stored.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One catalog identity and its stored version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    /// Catalog identity.
    pub identity: String,
    /// Stored catalog version, `None` until one is downloaded.
    #[serde(default)]
    pub version: Option<String>,
}

impl ResourceInfo {
    /// An identity with no stored version.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            version: None,
        }
    }
}

/// Reads and updates the resource manifest.
#[async_trait]
pub trait ResourceManifestPort: Send + Sync {
    /// Every known identity.
    async fn resources(&self) -> Vec<ResourceInfo>;

    /// Make `identity` known without a version. Known identities are left as is.
    async fn register(&self, identity: &str) -> bool;

    /// Record the stored version for `identity`, adding it if unknown.
    async fn record_version(&self, identity: &str, version: &str) -> bool;

    /// Clear the stored version for `identity`, keeping the identity known.
    async fn reset(&self, identity: &str) -> bool;
}
