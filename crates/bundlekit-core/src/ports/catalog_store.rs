//! Catalog persistence port.

use async_trait::async_trait;

use crate::catalog::Catalog;

/// Persists catalogs, one record per identity.
///
/// Every method fails soft: storage faults are logged by the adapter and
/// reported as an empty result or `false`.
#[async_trait]
pub trait CatalogStorePort: Send + Sync {
    /// Every stored catalog. Missing or corrupt records are skipped.
    async fn load(&self) -> Vec<Catalog>;

    /// Persist one catalog atomically, replacing any with the same identity.
    async fn save(&self, catalog: &Catalog) -> bool;

    /// Delete the stored catalog for `identity`. Absent records count as deleted.
    async fn discard(&self, identity: &str) -> bool;
}
