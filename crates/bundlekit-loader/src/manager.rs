//! `BundleManager`: the handle a host application owns.
//!
//! Wires the loader, preloader and update evaluator to the catalog store and
//! resource manifest, and tracks whether any catalog is ready:
//!
//! ```text
//! None ──download_catalogs_if_needed──► CatalogLoading ──► Ready
//!  ▲                                         │               │
//!  └──────────── failure / discard ◄─────────┴───────────────┘
//! ```
//!
//! Loads and preloads are rejected unless the state is `Ready`.
//!
//! Catalog updates arrive either explicitly through
//! [`BundleManager::fetch_catalog`] or as `resversion` announcements on any
//! HTTP response; see [`BundleManager::apply_version_signals`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use bundlekit_core::{
    Asset, Catalog, CatalogError, CatalogStorePort, ChecksumPort, DefaultResponseClassifier,
    DiskCachePort, FetchError, FromAsset, HeaderList, JsonPackageFormat, LoadError, LoadResult, NoAuth,
    PackageFormat, RequestAuthPort, ResourceManifestPort, ResponseClassifier, Settings,
    SettingsError, Sha256Checksum, TransportPort, validate_settings,
};
use thiserror::Error;
use tokio::time::Instant;
use url::Url;

use crate::loader::PackageLoader;
use crate::pipeline::{DownloadPipeline, PipelineDeps};
use crate::preload::{PreloadError, PreloadObserver, PreloadReport, PreloadRequest, PreloadSource, Preloader};
use crate::signal::{
    CatalogRequest, CatalogRequestPolicy, DefaultCatalogRequest, VersionSignals, catalog_url,
};
use crate::update::{CommitAll, UpdateClassification, UpdateCondition, UpdatePolicy, classify_update};

/// Whether the manager has a usable catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureState {
    /// No catalog installed.
    None,
    /// Catalogs are being downloaded.
    CatalogLoading,
    /// At least one catalog is installed.
    Ready,
}

impl fmt::Display for FeatureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::CatalogLoading => "catalog loading",
            Self::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// Invalid manager configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No package base URL was configured.
    #[error("package_base_url is not configured")]
    MissingPackageBaseUrl,

    /// Settings failed validation.
    #[error(transparent)]
    Invalid(#[from] SettingsError),
}

/// Catalog download or update failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogSyncError {
    /// No catalog base URL was configured.
    #[error("catalog_base_url is not configured")]
    NoCatalogBaseUrl,

    /// The resource manifest lists no identities.
    #[error("no catalog identities are registered")]
    NoIdentities,

    /// A catalog URL could not be built.
    #[error("invalid catalog url: {0}")]
    InvalidUrl(String),

    /// The catalog could not be fetched.
    #[error("failed to fetch catalog '{identity}': {source}")]
    Fetch {
        /// Identity or URL being fetched.
        identity: String,
        /// Transfer failure.
        source: FetchError,
    },

    /// The catalog could not be parsed or validated.
    #[error("catalog '{identity}' is malformed: {source}")]
    Malformed {
        /// Identity or URL being fetched.
        identity: String,
        /// Parse failure.
        source: CatalogError,
    },

    /// The fetched catalog declares a different identity.
    #[error("expected catalog '{expected}', got '{found}'")]
    IdentityMismatch {
        /// Requested identity.
        expected: String,
        /// Identity in the manifest.
        found: String,
    },

    /// The catalog store refused the catalog.
    #[error("failed to save catalog '{0}'")]
    SaveFailed(String),
}

/// Outcome of [`BundleManager::download_catalogs_if_needed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogDownload {
    /// Catalogs were downloaded for these identities.
    Downloaded(Vec<String>),
    /// A catalog is already installed.
    AlreadyDownloaded,
    /// Another call is downloading.
    AlreadyDownloading,
}

/// Outcome of receiving a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No catalog with this identity was active; it was installed.
    Installed {
        /// Catalog identity.
        identity: String,
        /// Catalog version.
        version: String,
    },
    /// Same version as the active catalog.
    AlreadyUpdated(UpdateClassification),
    /// The policy accepted the update and it is now active.
    Committed(UpdateClassification),
    /// The policy declined the update.
    Declined(UpdateClassification),
}

/// Manager configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Base URL packages are fetched from.
    pub package_base_url: Url,
    /// Base URL catalog manifests are fetched from.
    pub catalog_base_url: Option<Url>,
    /// Base URL preload lists are fetched from.
    pub preload_list_base_url: Option<Url>,
    /// Identities registered in the resource manifest on initialize.
    pub catalog_identities: Vec<String>,
    /// Default timeout for loads, preload transfers and catalog fetches.
    pub timeout: Option<Duration>,
    /// Default preload concurrency.
    pub max_parallel_preloads: usize,
    /// Durable-cache poll interval.
    pub cache_poll_interval: Duration,
}

fn parse_base(value: Option<&String>) -> Result<Option<Url>, ConfigError> {
    value
        .map(|raw| {
            Url::parse(raw).map_err(|e| {
                ConfigError::Invalid(SettingsError::InvalidUrl {
                    field: "base_url",
                    value: raw.clone(),
                    reason: e.to_string(),
                })
            })
        })
        .transpose()
}

impl ManagerConfig {
    /// Defaults with `package_base_url`.
    pub fn new(package_base_url: Url) -> Self {
        let defaults = Settings::with_defaults();
        Self {
            package_base_url,
            catalog_base_url: None,
            preload_list_base_url: None,
            catalog_identities: Vec::new(),
            timeout: defaults.effective_timeout(),
            max_parallel_preloads: defaults.effective_max_parallel_preloads(),
            cache_poll_interval: defaults.effective_cache_poll_interval(),
        }
    }

    /// Build from validated settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        validate_settings(settings)?;
        let package_base_url = parse_base(settings.package_base_url.as_ref())?
            .ok_or(ConfigError::MissingPackageBaseUrl)?;
        Ok(Self {
            package_base_url,
            catalog_base_url: parse_base(settings.catalog_base_url.as_ref())?,
            preload_list_base_url: parse_base(settings.preload_list_base_url.as_ref())?,
            catalog_identities: settings.effective_catalog_identities(),
            timeout: settings.effective_timeout(),
            max_parallel_preloads: settings.effective_max_parallel_preloads(),
            cache_poll_interval: settings.effective_cache_poll_interval(),
        })
    }

    /// Set the catalog base URL.
    #[must_use]
    pub fn with_catalog_base_url(mut self, url: Url) -> Self {
        self.catalog_base_url = Some(url);
        self
    }

    /// Set the preload list base URL.
    #[must_use]
    pub fn with_preload_list_base_url(mut self, url: Url) -> Self {
        self.preload_list_base_url = Some(url);
        self
    }

    /// Set the identities registered on initialize.
    #[must_use]
    pub fn with_catalog_identities<I, S>(mut self, identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.catalog_identities = identities.into_iter().map(Into::into).collect();
        self
    }

    /// Set the default timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the default preload concurrency.
    #[must_use]
    pub fn with_max_parallel_preloads(mut self, max: usize) -> Self {
        self.max_parallel_preloads = max.max(1);
        self
    }

    /// Set the durable-cache poll interval.
    #[must_use]
    pub const fn with_cache_poll_interval(mut self, interval: Duration) -> Self {
        self.cache_poll_interval = interval;
        self
    }
}

/// Collaborators of the manager.
///
/// The four storage and network ports are required; the rest default to
/// no auth, the 2xx classifier, SHA-256, the JSON package format and a
/// commit-everything update policy.
#[derive(Clone)]
pub struct BundleDeps {
    /// Network transport.
    pub transport: Arc<dyn TransportPort>,
    /// Versioned disk cache.
    pub cache: Arc<dyn DiskCachePort>,
    /// Catalog persistence.
    pub catalog_store: Arc<dyn CatalogStorePort>,
    /// Resource manifest.
    pub manifest: Arc<dyn ResourceManifestPort>,
    /// Auth hooks.
    pub auth: Arc<dyn RequestAuthPort>,
    /// Response classifier.
    pub classifier: Arc<dyn ResponseClassifier>,
    /// Checksum algorithm.
    pub checksum: Arc<dyn ChecksumPort>,
    /// Package format.
    pub format: Arc<dyn PackageFormat>,
    /// Update policy.
    pub policy: Arc<dyn UpdatePolicy>,
    /// Decides whether announced catalog versions are fetched.
    pub request_policy: Arc<dyn CatalogRequestPolicy>,
}

impl BundleDeps {
    /// Required ports plus defaults.
    pub fn new(
        transport: Arc<dyn TransportPort>,
        cache: Arc<dyn DiskCachePort>,
        catalog_store: Arc<dyn CatalogStorePort>,
        manifest: Arc<dyn ResourceManifestPort>,
    ) -> Self {
        Self {
            transport,
            cache,
            catalog_store,
            manifest,
            auth: Arc::new(NoAuth),
            classifier: Arc::new(DefaultResponseClassifier),
            checksum: Arc::new(Sha256Checksum),
            format: Arc::new(JsonPackageFormat),
            policy: Arc::new(CommitAll),
            request_policy: Arc::new(DefaultCatalogRequest),
        }
    }

    /// Replace the auth hooks.
    #[must_use]
    pub fn with_auth(mut self, auth: Arc<dyn RequestAuthPort>) -> Self {
        self.auth = auth;
        self
    }

    /// Replace the response classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn ResponseClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replace the checksum algorithm.
    #[must_use]
    pub fn with_checksum(mut self, checksum: Arc<dyn ChecksumPort>) -> Self {
        self.checksum = checksum;
        self
    }

    /// Replace the package format.
    #[must_use]
    pub fn with_format(mut self, format: Arc<dyn PackageFormat>) -> Self {
        self.format = format;
        self
    }

    /// Replace the update policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn UpdatePolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the policy for announced catalog versions.
    #[must_use]
    pub fn with_request_policy(mut self, request_policy: Arc<dyn CatalogRequestPolicy>) -> Self {
        self.request_policy = request_policy;
        self
    }
}

/// Owns the catalogs, the loader and the feature state.
pub struct BundleManager {
    config: ManagerConfig,
    loader: Arc<PackageLoader>,
    preloader: Preloader,
    catalog_store: Arc<dyn CatalogStorePort>,
    manifest: Arc<dyn ResourceManifestPort>,
    policy: Arc<dyn UpdatePolicy>,
    request_policy: Arc<dyn CatalogRequestPolicy>,
    signals: Arc<VersionSignals>,
    state: RwLock<FeatureState>,
}

impl fmt::Debug for BundleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleManager")
            .field("state", &self.state())
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}

/// Settles the feature state when a catalog download ends, however it ends.
struct LoadingGuard<'a> {
    manager: &'a BundleManager,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.manager.settle_state();
    }
}

impl BundleManager {
    /// Create a manager with no catalogs.
    pub fn new(config: ManagerConfig, deps: BundleDeps) -> Self {
        let signals = Arc::new(VersionSignals::new());
        let pipeline = DownloadPipeline::new(
            PipelineDeps {
                transport: deps.transport,
                cache: deps.cache,
                auth: deps.auth,
                classifier: deps.classifier,
                checksum: deps.checksum,
            },
            config.package_base_url.clone(),
            config.cache_poll_interval,
        )
        .with_version_signals(Arc::clone(&signals));
        let loader = Arc::new(PackageLoader::new(pipeline, deps.format));
        Self {
            config,
            preloader: Preloader::new(Arc::clone(&loader)),
            loader,
            catalog_store: deps.catalog_store,
            manifest: deps.manifest,
            policy: deps.policy,
            request_policy: deps.request_policy,
            signals,
            state: RwLock::new(FeatureState::None),
        }
    }

    /// Current feature state.
    pub fn state(&self) -> FeatureState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: FeatureState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn settle_state(&self) {
        let settled = if self.loader.catalog_snapshot().is_empty() {
            FeatureState::None
        } else {
            FeatureState::Ready
        };
        self.set_state(settled);
    }

    /// The underlying loader.
    pub const fn loader(&self) -> &Arc<PackageLoader> {
        &self.loader
    }

    /// The configuration.
    pub const fn config(&self) -> &ManagerConfig {
        &self.config
    }

    fn deadline(&self) -> Option<Instant> {
        self.config.timeout.map(|t| Instant::now() + t)
    }

    fn ensure_ready(&self) -> Result<(), String> {
        match self.state() {
            FeatureState::Ready => Ok(()),
            other => Err(format!("feature state is {other}")),
        }
    }

    // ------------------------------------------------------------------
    // Catalog lifecycle
    // ------------------------------------------------------------------

    /// Register configured identities and restore stored catalogs.
    pub async fn initialize(&self) -> FeatureState {
        for identity in &self.config.catalog_identities {
            self.manifest.register(identity).await;
        }
        let stored = self.catalog_store.load().await;
        tracing::info!(target: "bundlekit.catalog", count = stored.len(), "Restoring stored catalogs");
        for catalog in stored {
            self.loader.install_catalog(Arc::new(catalog));
        }
        self.settle_state();
        self.state()
    }

    /// Download the catalog of every registered identity unless one is installed.
    pub async fn download_catalogs_if_needed(&self) -> Result<CatalogDownload, CatalogSyncError> {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            match *state {
                FeatureState::CatalogLoading => return Ok(CatalogDownload::AlreadyDownloading),
                FeatureState::Ready => return Ok(CatalogDownload::AlreadyDownloaded),
                FeatureState::None => *state = FeatureState::CatalogLoading,
            }
        }
        let _guard = LoadingGuard { manager: self };

        let base = self
            .config
            .catalog_base_url
            .as_ref()
            .ok_or(CatalogSyncError::NoCatalogBaseUrl)?;
        let resources = self.manifest.resources().await;
        if resources.is_empty() {
            return Err(CatalogSyncError::NoIdentities);
        }

        let mut downloaded = Vec::with_capacity(resources.len());
        for resource in resources {
            let url = catalog_url(base, &resource.identity)
                .map_err(|e| CatalogSyncError::InvalidUrl(e.to_string()))?;
            let catalog = self.fetch_catalog_document(&resource.identity, url).await?;
            if catalog.identity() != resource.identity {
                return Err(CatalogSyncError::IdentityMismatch {
                    expected: resource.identity,
                    found: catalog.identity().to_string(),
                });
            }
            self.commit(Arc::new(catalog)).await?;
            downloaded.push(resource.identity);
        }
        Ok(CatalogDownload::Downloaded(downloaded))
    }

    async fn fetch_catalog_document(
        &self,
        label: &str,
        url: Url,
    ) -> Result<Catalog, CatalogSyncError> {
        let bytes = self
            .loader
            .pipeline()
            .fetch_document(url, self.deadline(), None)
            .await
            .map_err(|source| CatalogSyncError::Fetch {
                identity: label.to_string(),
                source,
            })?;
        Catalog::from_json(&bytes).map_err(|source| CatalogSyncError::Malformed {
            identity: label.to_string(),
            source,
        })
    }

    /// Fetch a catalog from `url` and run it through [`receive_catalog`](Self::receive_catalog).
    pub async fn fetch_catalog(&self, url: Url) -> Result<UpdateOutcome, CatalogSyncError> {
        let catalog = self.fetch_catalog_document(url.as_str(), url.clone()).await?;
        self.receive_catalog(catalog).await
    }

    /// Classify `catalog` against the active one and commit it if the policy agrees.
    ///
    /// A catalog with an identity that is not active is installed directly.
    pub async fn receive_catalog(&self, catalog: Catalog) -> Result<UpdateOutcome, CatalogSyncError> {
        let Some(current) = self.loader.catalog(catalog.identity()) else {
            let outcome = UpdateOutcome::Installed {
                identity: catalog.identity().to_string(),
                version: catalog.version().to_string(),
            };
            self.commit(Arc::new(catalog)).await?;
            return Ok(outcome);
        };

        let classification = classify_update(&current, &catalog, |name| {
            self.loader.is_resident_in_memory(name)
        });
        tracing::info!(
            target: "bundlekit.catalog",
            identity = %classification.identity,
            from = %classification.current_version,
            to = %classification.incoming_version,
            condition = ?classification.condition,
            "Classified catalog update"
        );

        if classification.condition == UpdateCondition::AlreadyUpdated {
            return Ok(UpdateOutcome::AlreadyUpdated(classification));
        }
        if !self.policy.should_commit(&classification) {
            return Ok(UpdateOutcome::Declined(classification));
        }
        self.commit(Arc::new(catalog)).await?;
        Ok(UpdateOutcome::Committed(classification))
    }

    /// Record catalog version announcements from a response the host received.
    ///
    /// Package and document responses fetched by the manager are recorded
    /// automatically. Returns how many announcements `headers` carried.
    pub fn observe_response_headers(&self, headers: &HeaderList) -> usize {
        self.signals.record(headers)
    }

    /// Number of identities with an unhandled announcement.
    pub fn pending_version_signals(&self) -> usize {
        self.signals.len()
    }

    /// Handle pending announcements.
    ///
    /// Announcements are kept until the state is `Ready`. Each one naming an
    /// active catalog at a different version is offered to the request
    /// policy, and accepted ones go through [`fetch_catalog`](Self::fetch_catalog).
    /// Announcements for unknown identities or the active version are
    /// dropped. Returns one result per catalog fetched.
    pub async fn apply_version_signals(&self) -> Vec<Result<UpdateOutcome, CatalogSyncError>> {
        if self.state() != FeatureState::Ready {
            return Vec::new();
        }

        let mut results = Vec::new();
        for signal in self.signals.drain() {
            let Some(current) = self.loader.catalog(&signal.identity) else {
                tracing::debug!(target: "bundlekit.catalog", identity = %signal.identity, "Ignoring announcement for inactive catalog");
                continue;
            };
            if current.version() == signal.version {
                continue;
            }

            let request = self.request_policy.should_request(
                self.config.catalog_base_url.as_ref(),
                &signal.identity,
                &signal.version,
            );
            let CatalogRequest::Fetch(url) = request else {
                tracing::info!(
                    target: "bundlekit.catalog",
                    identity = %signal.identity,
                    version = %signal.version,
                    "Announced catalog not requested"
                );
                continue;
            };
            tracing::info!(
                target: "bundlekit.catalog",
                identity = %signal.identity,
                from = current.version(),
                to = %signal.version,
                %url,
                "Fetching announced catalog"
            );
            results.push(self.fetch_catalog(url).await);
        }
        results
    }

    /// [`observe_response_headers`](Self::observe_response_headers) followed by
    /// [`apply_version_signals`](Self::apply_version_signals).
    pub async fn handle_response_headers(
        &self,
        headers: &HeaderList,
    ) -> Vec<Result<UpdateOutcome, CatalogSyncError>> {
        self.observe_response_headers(headers);
        self.apply_version_signals().await
    }

    async fn commit(&self, catalog: Arc<Catalog>) -> Result<(), CatalogSyncError> {
        if !self.catalog_store.save(&catalog).await {
            return Err(CatalogSyncError::SaveFailed(catalog.identity().to_string()));
        }
        self.manifest
            .record_version(catalog.identity(), catalog.version())
            .await;
        self.loader.install_catalog(catalog);
        if self.state() != FeatureState::CatalogLoading {
            self.settle_state();
        }
        Ok(())
    }

    /// Delete the catalog for `identity` and release its resident packages.
    pub async fn discard_catalog(&self, identity: &str) -> bool {
        let discarded = self.catalog_store.discard(identity).await;
        self.manifest.reset(identity).await;
        self.loader.remove_catalog(identity);
        self.settle_state();
        tracing::info!(target: "bundlekit.catalog", identity, discarded, "Discarded catalog");
        discarded
    }

    /// Discard every catalog and clear the disk cache.
    pub async fn factory_reset(&self) -> Result<(), FetchError> {
        for identity in self.loader.catalog_snapshot().identities() {
            self.discard_catalog(&identity).await;
        }
        self.loader.clean_cached_packages().await
    }

    /// Active catalogs.
    pub fn catalogs(&self) -> Vec<Arc<Catalog>> {
        self.loader.catalog_snapshot().iter().cloned().collect()
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Load `asset` with the configured timeout.
    pub async fn load_asset(&self, asset: &str) -> LoadResult<Asset> {
        self.load_asset_with_timeout(asset, self.config.timeout).await
    }

    /// Load `asset` with an explicit timeout.
    pub async fn load_asset_with_timeout(
        &self,
        asset: &str,
        timeout: Option<Duration>,
    ) -> LoadResult<Asset> {
        self.ensure_ready()
            .map_err(|reason| LoadError::CatalogNotReady { reason })?;
        self.loader.load_asset(asset, timeout).await
    }

    /// Load `asset` as `T` with the configured timeout.
    pub async fn load_asset_as<T: FromAsset>(&self, asset: &str) -> LoadResult<T> {
        self.ensure_ready()
            .map_err(|reason| LoadError::CatalogNotReady { reason })?;
        self.loader.load_asset_as(asset, self.config.timeout).await
    }

    /// URL of the preload list called `name`.
    pub fn preload_list_url(&self, name: &str) -> Option<Url> {
        self.config
            .preload_list_base_url
            .as_ref()
            .and_then(|base| base.join(name).ok())
    }

    /// Preload with the configured concurrency and timeout.
    pub async fn preload(
        &self,
        source: PreloadSource,
        observer: &dyn PreloadObserver,
    ) -> Result<PreloadReport, PreloadError> {
        let request = match source {
            PreloadSource::Names(names) => PreloadRequest::names(names),
            PreloadSource::List(url) => PreloadRequest::list(url),
        }
        .with_max_parallel(self.config.max_parallel_preloads)
        .with_timeout(self.config.timeout);
        self.preload_with(request, observer).await
    }

    /// Preload with explicit settings.
    pub async fn preload_with(
        &self,
        request: PreloadRequest,
        observer: &dyn PreloadObserver,
    ) -> Result<PreloadReport, PreloadError> {
        self.ensure_ready().map_err(PreloadError::NotReady)?;
        self.preloader.run(request, observer).await
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Whether any active catalog lists `asset`.
    pub fn is_asset_exist(&self, asset: &str) -> bool {
        self.loader.catalog_snapshot().contains_asset(asset)
    }

    /// Whether any active catalog lists package `name`.
    pub fn is_package_exist(&self, name: &str) -> bool {
        self.loader.catalog_snapshot().contains_package(name)
    }

    /// Name of the package owning `asset`.
    pub fn package_for_asset(&self, asset: &str) -> Option<String> {
        self.loader.package_for_asset(asset).map(|entry| entry.name)
    }

    /// Sum of the declared sizes of `names`.
    pub fn packages_weight<S: AsRef<str>>(&self, names: &[S]) -> u64 {
        self.loader.catalog_snapshot().total_size(names)
    }

    /// Packages not on disk at the version their catalog expects.
    pub async fn not_cached_package_names(&self) -> Vec<String> {
        let catalogs = self.loader.catalog_snapshot();
        let cache = self.loader.pipeline().cache();
        let mut missing = Vec::new();
        for entry in catalogs.visible_packages() {
            if !cache
                .is_version_cached(&entry.name, entry.cache_version())
                .await
            {
                missing.push(entry.name.clone());
            }
        }
        missing
    }

    /// Whether package `name` is in memory.
    pub fn is_resident_in_memory(&self, name: &str) -> bool {
        self.loader.is_resident_in_memory(name)
    }

    /// Whether package `name` is on disk at its current version.
    pub async fn is_resident_on_disk(&self, name: &str) -> bool {
        self.loader.is_resident_on_disk(name).await
    }

    /// Names of the assets held by resident packages.
    pub fn resident_asset_names(&self) -> BTreeSet<String> {
        self.loader.resident_asset_names()
    }

    /// Release package `name` from memory.
    pub fn unload(&self, name: &str) -> bool {
        self.loader.unload(name)
    }

    /// Release the package holding `asset`.
    pub fn unload_asset(&self, asset: &str) -> bool {
        self.loader.unload_asset(asset)
    }

    /// Release every package from memory.
    pub fn unload_all(&self) {
        self.loader.unload_all();
    }

    /// Unload everything and clear the disk cache.
    pub async fn clean_cached_packages(&self) -> Result<(), FetchError> {
        self.loader.clean_cached_packages().await
    }
}
