//! CLI bootstrap: the composition root.
//!
//! The only place concrete adapters are wired together:
//! - filesystem catalog store, disk cache and resource manifest (`bundlekit-store`)
//! - `reqwest` transport (`bundlekit-http`)
//! - the `BundleManager` (`bundlekit-loader`)

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bundlekit_core::{
    Settings, cache_dir, catalogs_dir, data_root, env_file_path, manifest_path, settings_path,
};
use bundlekit_http::ReqwestTransport;
use bundlekit_loader::{BundleDeps, BundleManager, FeatureState, ManagerConfig};
use bundlekit_store::{FsCatalogStore, FsDiskCache, FsResourceManifest};

use crate::error::CliError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable overriding `catalog_base_url`.
pub const CATALOG_BASE_URL_ENV: &str = "BUNDLEKIT_CATALOG_BASE_URL";

/// Environment variable overriding `preload_list_base_url`.
pub const PRELOAD_LIST_BASE_URL_ENV: &str = "BUNDLEKIT_PRELOAD_LIST_BASE_URL";

/// Bootstrap options taken from global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Data directory override.
    pub data_dir: Option<PathBuf>,
    /// Package base URL override.
    pub base_url: Option<String>,
}

/// Fully composed context for command handlers.
pub struct CliContext {
    /// The manager every handler delegates to.
    pub manager: BundleManager,
    /// Resolved data directory.
    pub data_root: PathBuf,
    /// Effective settings after file, defaults and flags.
    pub settings: Settings,
    /// Feature state right after startup restore.
    pub initial_state: FeatureState,
}

impl CliContext {
    /// Access the manager.
    pub const fn manager(&self) -> &BundleManager {
        &self.manager
    }
}

/// Read `settings.json` under `root`. A missing file yields empty settings.
pub fn load_settings(root: &Path) -> Result<Settings, CliError> {
    let path = settings_path(root);
    match std::fs::read(&path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| CliError::Config(format!("{}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
        Err(e) => Err(e.into()),
    }
}

/// Resolve settings: defaults, then the settings file, then the environment, then flags.
pub fn resolve_settings(root: &Path, config: &CliConfig) -> Result<Settings, CliError> {
    let mut settings = Settings::with_defaults();
    settings.merge(&load_settings(root)?);
    settings.merge(&Settings {
        catalog_base_url: std::env::var(CATALOG_BASE_URL_ENV).ok(),
        preload_list_base_url: std::env::var(PRELOAD_LIST_BASE_URL_ENV).ok(),
        ..Settings::default()
    });
    if let Some(base_url) = &config.base_url {
        settings.package_base_url = Some(base_url.clone());
    }
    Ok(settings)
}

/// Compose the adapters and restore stored catalogs.
pub async fn bootstrap(config: CliConfig) -> Result<CliContext, CliError> {
    let data_root = match &config.data_dir {
        Some(dir) => dir.clone(),
        None => data_root()?,
    };
    dotenvy::from_path(env_file_path(&data_root)).ok();

    let settings = resolve_settings(&data_root, &config)?;
    let manager_config = ManagerConfig::from_settings(&settings)?;

    let transport = ReqwestTransport::new(CONNECT_TIMEOUT)
        .map_err(|e| CliError::Network(e.to_string()))?;
    let deps = BundleDeps::new(
        Arc::new(transport),
        Arc::new(FsDiskCache::new(cache_dir(&data_root)?)),
        Arc::new(FsCatalogStore::new(catalogs_dir(&data_root)?)),
        Arc::new(FsResourceManifest::new(manifest_path(&data_root))),
    );

    let manager = BundleManager::new(manager_config, deps);
    let initial_state = manager.initialize().await;
    tracing::debug!(root = %data_root.display(), state = %initial_state, "CLI context ready");

    Ok(CliContext {
        manager,
        data_root,
        settings,
        initial_state,
    })
}
