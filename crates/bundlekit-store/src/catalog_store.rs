//! Catalog store adapters.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bundlekit_core::{Catalog, CatalogStorePort};
use tracing::{debug, warn};

use crate::encode::{file_component, ignore_not_found, write_atomic};

/// Stores each catalog as `<dir>/<encoded identity>.json`.
///
/// Identities map to disjoint files, so saving one identity can never
/// clobber another.
#[derive(Debug, Clone)]
pub struct FsCatalogStore {
    dir: PathBuf,
}

impl FsCatalogStore {
    /// Store catalogs under `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_name(identity: &str) -> String {
        format!("{}.json", file_component(identity))
    }
}

#[async_trait]
impl CatalogStorePort for FsCatalogStore {
    async fn load(&self) -> Vec<Catalog> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(target: "bundlekit.store", dir = %self.dir.display(), error = %e, "No catalog directory");
                return Vec::new();
            }
        };

        let mut catalogs = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(target: "bundlekit.store", error = %e, "Failed to list catalogs");
                    break;
                }
            };
            let path = entry.path();
            let is_catalog = path.extension().is_some_and(|ext| ext == "json")
                && !entry.file_name().to_string_lossy().starts_with('.');
            if !is_catalog {
                continue;
            }

            match tokio::fs::read(&path).await {
                Ok(bytes) => match Catalog::from_json(&bytes) {
                    Ok(catalog) => catalogs.push(catalog),
                    Err(e) => {
                        warn!(target: "bundlekit.store", path = %path.display(), error = %e, "Skipping corrupt catalog");
                    }
                },
                Err(e) => {
                    warn!(target: "bundlekit.store", path = %path.display(), error = %e, "Skipping unreadable catalog");
                }
            }
        }

        catalogs.sort_by(|a, b| a.identity().cmp(b.identity()));
        catalogs
    }

    async fn save(&self, catalog: &Catalog) -> bool {
        let bytes = match catalog.to_json_vec() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(target: "bundlekit.store", identity = catalog.identity(), error = %e, "Failed to encode catalog");
                return false;
            }
        };
        let name = Self::file_name(catalog.identity());
        match write_atomic(&self.dir, &name, &bytes).await {
            Ok(()) => {
                debug!(target: "bundlekit.store", identity = catalog.identity(), version = catalog.version(), "Saved catalog");
                true
            }
            Err(e) => {
                warn!(target: "bundlekit.store", identity = catalog.identity(), error = %e, "Failed to save catalog");
                false
            }
        }
    }

    async fn discard(&self, identity: &str) -> bool {
        let path = self.dir.join(Self::file_name(identity));
        match ignore_not_found(tokio::fs::remove_file(&path).await) {
            Ok(()) => true,
            Err(e) => {
                warn!(target: "bundlekit.store", identity, error = %e, "Failed to discard catalog");
                false
            }
        }
    }
}

/// Keeps catalogs in memory, keyed by identity.
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    catalogs: Mutex<BTreeMap<String, Catalog>>,
}

impl MemoryCatalogStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn catalogs(&self) -> MutexGuard<'_, BTreeMap<String, Catalog>> {
        self.catalogs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stored version for `identity`.
    pub fn version_of(&self, identity: &str) -> Option<String> {
        self.catalogs()
            .get(identity)
            .map(|catalog| catalog.version().to_string())
    }
}

#[async_trait]
impl CatalogStorePort for MemoryCatalogStore {
    async fn load(&self) -> Vec<Catalog> {
        self.catalogs().values().cloned().collect()
    }

    async fn save(&self, catalog: &Catalog) -> bool {
        self.catalogs()
            .insert(catalog.identity().to_string(), catalog.clone());
        true
    }

    async fn discard(&self, identity: &str) -> bool {
        self.catalogs().remove(identity);
        true
    }
}
