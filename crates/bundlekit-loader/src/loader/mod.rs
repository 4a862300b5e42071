//! Package loader: the dependency resolver and in-memory residency map.
//!
//! # Concurrency Model
//!
//! - Resolution is async; dependency fan-out is a joined set of futures, and
//!   a package shared by several dependents settles once per request
//! - The [`LoadLedger`] serializes loads per package name
//! - The residency map and catalog set sit behind `std::sync::RwLock`s that
//!   are never held across an `.await`
//! - Deadlines are absolute and passed unchanged through the whole
//!   dependency recursion

mod resolve;

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError};
use std::time::Duration;

use bundlekit_core::{
    Asset, Catalog, DiskCachePort, ExtractionError, FetchError, FromAsset, LoadError, LoadResult,
    PackageArchive, PackageEntry, PackageFormat,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::catalog_set::CatalogSet;
use crate::ledger::{LedgerSlot, LoadLedger};
use crate::pipeline::DownloadPipeline;

/// A package decoded into memory.
///
/// Shared by every request that resolved to it until it is unloaded.
pub struct LoadedPackage {
    entry: PackageEntry,
    archive: Box<dyn PackageArchive>,
}

impl std::fmt::Debug for LoadedPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedPackage")
            .field("name", &self.entry.name)
            .field("checksum", &self.entry.checksum)
            .finish_non_exhaustive()
    }
}

impl LoadedPackage {
    /// Package name.
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    /// Checksum of the content that was loaded.
    pub fn checksum(&self) -> &str {
        &self.entry.checksum
    }

    /// Catalog entry the package was loaded from.
    pub const fn entry(&self) -> &PackageEntry {
        &self.entry
    }

    /// Assets present in the decoded content.
    pub fn asset_names(&self) -> Vec<String> {
        self.archive.asset_names()
    }

    /// Extract one asset.
    pub fn extract(&self, asset: &str) -> Result<Asset, ExtractionError> {
        self.archive.extract(asset)
    }
}

/// Where [`PackageLoader::fetch_to_disk`] found the package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskFetch {
    /// Already cached at the current version.
    AlreadyCached,
    /// Downloaded now.
    Downloaded,
}

/// Resolves assets to packages and keeps loaded packages in memory.
pub struct PackageLoader {
    catalogs: RwLock<CatalogSet>,
    resident: RwLock<HashMap<String, Arc<LoadedPackage>>>,
    ledger: LoadLedger,
    pipeline: DownloadPipeline,
    format: Arc<dyn PackageFormat>,
}

impl std::fmt::Debug for PackageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageLoader")
            .field("catalogs", &self.catalogs().identities())
            .field("resident", &self.resident().len())
            .field("in_flight", &self.ledger.in_flight())
            .finish_non_exhaustive()
    }
}

impl PackageLoader {
    /// Create a loader with no catalogs.
    pub fn new(pipeline: DownloadPipeline, format: Arc<dyn PackageFormat>) -> Self {
        Self {
            catalogs: RwLock::new(CatalogSet::new()),
            resident: RwLock::new(HashMap::new()),
            ledger: LoadLedger::new(),
            pipeline,
            format,
        }
    }

    fn catalogs(&self) -> RwLockReadGuard<'_, CatalogSet> {
        self.catalogs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn catalogs_mut(&self) -> RwLockWriteGuard<'_, CatalogSet> {
        self.catalogs.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn resident(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<LoadedPackage>>> {
        self.resident.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn resident_mut(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<LoadedPackage>>> {
        self.resident.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// The download pipeline.
    pub const fn pipeline(&self) -> &DownloadPipeline {
        &self.pipeline
    }

    fn cache(&self) -> &Arc<dyn DiskCachePort> {
        self.pipeline.cache()
    }

    // ------------------------------------------------------------------
    // Catalogs
    // ------------------------------------------------------------------

    /// Install `catalog`, replacing the active one with the same identity.
    ///
    /// Resident packages are kept even if their checksum changed.
    pub fn install_catalog(&self, catalog: Arc<Catalog>) -> Option<Arc<Catalog>> {
        tracing::info!(
            target: "bundlekit.catalog",
            identity = catalog.identity(),
            version = catalog.version(),
            "Installing catalog"
        );
        self.catalogs_mut().install(catalog)
    }

    /// Remove the catalog for `identity` and unload the packages it supplied.
    ///
    /// A package name shadowed by an earlier catalog stays resident.
    pub fn remove_catalog(&self, identity: &str) -> Option<Arc<Catalog>> {
        let mut catalogs = self.catalogs_mut();
        let owned: Vec<String> = catalogs
            .get(identity)?
            .package_names()
            .filter(|name| catalogs.owner_of(name) == Some(identity))
            .map(str::to_string)
            .collect();
        let removed = catalogs.remove(identity)?;
        drop(catalogs);

        let mut resident = self.resident_mut();
        for name in &owned {
            resident.remove(name);
        }
        drop(resident);
        tracing::info!(target: "bundlekit.catalog", identity, "Removed catalog");
        Some(removed)
    }

    /// A snapshot of the active catalogs.
    pub fn catalog_snapshot(&self) -> CatalogSet {
        self.catalogs().clone()
    }

    /// Active catalog for `identity`.
    pub fn catalog(&self, identity: &str) -> Option<Arc<Catalog>> {
        self.catalogs().get(identity).cloned()
    }

    /// Entry of the package owning `asset`.
    pub fn package_for_asset(&self, asset: &str) -> Option<PackageEntry> {
        self.catalogs().package_for_asset(asset).cloned()
    }

    /// Entry of package `name`.
    pub fn package(&self, name: &str) -> Option<PackageEntry> {
        self.catalogs().package(name).cloned()
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Load `asset`, with `timeout` bounding the whole dependency tree.
    pub async fn load_asset(&self, asset: &str, timeout: Option<Duration>) -> LoadResult<Asset> {
        let deadline = timeout.map(|t| Instant::now() + t);
        self.load_asset_until(asset, deadline).await
    }

    /// Load `asset` and convert it to `T`.
    ///
    /// A kind mismatch is reported as [`LoadError::NullAssetFound`].
    pub async fn load_asset_as<T: FromAsset>(
        &self,
        asset: &str,
        timeout: Option<Duration>,
    ) -> LoadResult<T> {
        let loaded = self.load_asset(asset, timeout).await?;
        T::from_asset(loaded).map_err(|found| {
            let package = self
                .package_for_asset(asset)
                .map(|entry| entry.name)
                .unwrap_or_default();
            let mismatch = ExtractionError::TypeMismatch {
                asset: asset.to_string(),
                expected: T::KIND.unwrap_or_else(|| found.kind()),
                found: found.kind(),
            };
            LoadError::NullAssetFound {
                asset: asset.to_string(),
                package,
                reason: mismatch.to_string(),
            }
        })
    }

    /// Load `asset` before the absolute `deadline`.
    pub async fn load_asset_until(
        &self,
        asset: &str,
        deadline: Option<Instant>,
    ) -> LoadResult<Asset> {
        let Some(entry) = self.package_for_asset(asset) else {
            tracing::debug!(target: "bundlekit.loader", asset, "Asset not contained in any catalog");
            return Err(LoadError::not_contained(asset));
        };

        let package = self.resolve(entry, deadline).await?;

        package.extract(asset).map_err(|e| {
            let (asset, package, reason) =
                (asset.to_string(), package.name().to_string(), e.to_string());
            if e.is_null() {
                LoadError::NullAssetFound {
                    asset,
                    package,
                    reason,
                }
            } else {
                LoadError::AssetLoadFailed {
                    asset,
                    package,
                    reason,
                }
            }
        })
    }

    /// Load package `name` and its dependencies into memory.
    pub async fn load_package(
        &self,
        name: &str,
        timeout: Option<Duration>,
    ) -> LoadResult<Arc<LoadedPackage>> {
        let entry = self
            .package(name)
            .ok_or_else(|| LoadError::not_contained(name))?;
        let deadline = timeout.map(|t| Instant::now() + t);
        self.resolve(entry, deadline).await
    }

    /// Make sure `entry` is on disk at its current version without loading it.
    ///
    /// Guarded by the ledger, so it never races an in-memory load of the
    /// same package.
    pub async fn fetch_to_disk(
        &self,
        entry: &PackageEntry,
        deadline: Option<Instant>,
        cancel: Option<&CancellationToken>,
    ) -> Result<DiskFetch, FetchError> {
        loop {
            if self.is_version_on_disk(entry).await {
                return Ok(DiskFetch::AlreadyCached);
            }
            match self.ledger.acquire(&entry.name) {
                LedgerSlot::Busy(wait) => wait.released_by(deadline).await?,
                LedgerSlot::Acquired(_guard) => {
                    if self.is_version_on_disk(entry).await {
                        return Ok(DiskFetch::AlreadyCached);
                    }
                    self.pipeline.fetch(entry, deadline, cancel).await?;
                    return Ok(DiskFetch::Downloaded);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Residency
    // ------------------------------------------------------------------

    /// Whether package `name` is in memory.
    pub fn is_resident_in_memory(&self, name: &str) -> bool {
        self.resident().contains_key(name)
    }

    /// The resident package `name`.
    pub fn resident_package(&self, name: &str) -> Option<Arc<LoadedPackage>> {
        self.resident().get(name).cloned()
    }

    /// Checksum of the resident content of `name`.
    pub fn resident_checksum(&self, name: &str) -> Option<String> {
        self.resident()
            .get(name)
            .map(|package| package.checksum().to_string())
    }

    /// Names of resident packages.
    pub fn resident_package_names(&self) -> BTreeSet<String> {
        self.resident().keys().cloned().collect()
    }

    /// Names of the assets held by resident packages.
    pub fn resident_asset_names(&self) -> BTreeSet<String> {
        self.resident()
            .values()
            .flat_map(|package| package.entry().assets.iter().cloned())
            .collect()
    }

    /// Whether package `name` is on disk at the version the catalog expects.
    pub async fn is_resident_on_disk(&self, name: &str) -> bool {
        match self.package(name) {
            Some(entry) => self.is_version_on_disk(&entry).await,
            None => false,
        }
    }

    async fn is_version_on_disk(&self, entry: &PackageEntry) -> bool {
        self.cache()
            .is_version_cached(&entry.name, entry.cache_version())
            .await
    }

    /// Release the in-memory handle for `name`. Absent names are ignored.
    pub fn unload(&self, name: &str) -> bool {
        let removed = self.resident_mut().remove(name).is_some();
        if removed {
            tracing::debug!(target: "bundlekit.loader", package = name, "Unloaded package");
        }
        removed
    }

    /// Release the package holding `asset`. Returns whether one was resident.
    ///
    /// Other assets of the same package become unavailable as well.
    pub fn unload_asset(&self, asset: &str) -> bool {
        self.package_for_asset(asset)
            .is_some_and(|entry| self.unload(&entry.name))
    }

    /// Release every in-memory handle.
    pub fn unload_all(&self) {
        let mut resident = self.resident_mut();
        let count = resident.len();
        resident.clear();
        drop(resident);
        tracing::debug!(target: "bundlekit.loader", count, "Unloaded all packages");
    }

    /// Unload everything and clear the disk cache.
    pub async fn clean_cached_packages(&self) -> Result<(), FetchError> {
        self.unload_all();
        self.cache()
            .clear()
            .await
            .map_err(|e| FetchError::cache(e.to_string()))
    }
}
