//! Settings domain types and validation.
//!
//! Pure data; the CLI decides where settings are read from.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Default per-operation timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of concurrent preload transfers.
pub const DEFAULT_MAX_PARALLEL_PRELOADS: usize = 4;

/// Default interval between durable-cache checks after a download.
pub const DEFAULT_CACHE_POLL_INTERVAL_MS: u64 = 10;

/// Application settings.
///
/// All fields are optional to support partial files and graceful defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Base URL packages are fetched from (`<base><package>`).
    pub package_base_url: Option<String>,

    /// Base URL catalog manifests are fetched from (`<base><identity>.json`).
    pub catalog_base_url: Option<String>,

    /// Base URL preload lists are fetched from.
    pub preload_list_base_url: Option<String>,

    /// Catalog identities seeded into the resource manifest on first start.
    pub catalog_identities: Option<Vec<String>>,

    /// Per-operation timeout in seconds. 0 disables the timeout.
    pub default_timeout_secs: Option<u64>,

    /// Maximum concurrent preload transfers (at least 1).
    pub max_parallel_preloads: Option<usize>,

    /// Interval between durable-cache checks, in milliseconds.
    pub cache_poll_interval_ms: Option<u64>,
}

impl Settings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub const fn with_defaults() -> Self {
        Self {
            package_base_url: None,
            catalog_base_url: None,
            preload_list_base_url: None,
            catalog_identities: None,
            default_timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            max_parallel_preloads: Some(DEFAULT_MAX_PARALLEL_PRELOADS),
            cache_poll_interval_ms: Some(DEFAULT_CACHE_POLL_INTERVAL_MS),
        }
    }

    /// Effective timeout, `None` when disabled.
    #[must_use]
    pub fn effective_timeout(&self) -> Option<Duration> {
        match self.default_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Effective preload parallelism, never below 1.
    #[must_use]
    pub fn effective_max_parallel_preloads(&self) -> usize {
        self.max_parallel_preloads
            .unwrap_or(DEFAULT_MAX_PARALLEL_PRELOADS)
            .max(1)
    }

    /// Effective durable-cache poll interval.
    #[must_use]
    pub fn effective_cache_poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.cache_poll_interval_ms
                .unwrap_or(DEFAULT_CACHE_POLL_INTERVAL_MS)
                .max(1),
        )
    }

    /// Catalog identities to seed, empty when unset.
    #[must_use]
    pub fn effective_catalog_identities(&self) -> Vec<String> {
        self.catalog_identities.clone().unwrap_or_default()
    }

    /// Overlay every field that is set in `other`.
    pub fn merge(&mut self, other: &Self) {
        if other.package_base_url.is_some() {
            self.package_base_url.clone_from(&other.package_base_url);
        }
        if other.catalog_base_url.is_some() {
            self.catalog_base_url.clone_from(&other.catalog_base_url);
        }
        if other.preload_list_base_url.is_some() {
            self.preload_list_base_url
                .clone_from(&other.preload_list_base_url);
        }
        if other.catalog_identities.is_some() {
            self.catalog_identities
                .clone_from(&other.catalog_identities);
        }
        if other.default_timeout_secs.is_some() {
            self.default_timeout_secs = other.default_timeout_secs;
        }
        if other.max_parallel_preloads.is_some() {
            self.max_parallel_preloads = other.max_parallel_preloads;
        }
        if other.cache_poll_interval_ms.is_some() {
            self.cache_poll_interval_ms = other.cache_poll_interval_ms;
        }
    }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Max parallel preloads must be at least 1, got {0}")]
    InvalidParallelism(usize),

    #[error("{field} is not a valid URL ({value}): {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must end with '/'")]
    MissingTrailingSlash(&'static str),

    #[error("Catalog identity cannot be empty")]
    EmptyIdentity,
}

fn validate_base_url(field: &'static str, value: Option<&String>) -> Result<(), SettingsError> {
    let Some(value) = value else {
        return Ok(());
    };
    Url::parse(value).map_err(|e| SettingsError::InvalidUrl {
        field,
        value: value.clone(),
        reason: e.to_string(),
    })?;
    if !value.ends_with('/') {
        return Err(SettingsError::MissingTrailingSlash(field));
    }
    Ok(())
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if let Some(parallel) = settings.max_parallel_preloads {
        if parallel == 0 {
            return Err(SettingsError::InvalidParallelism(parallel));
        }
    }

    validate_base_url("package_base_url", settings.package_base_url.as_ref())?;
    validate_base_url("catalog_base_url", settings.catalog_base_url.as_ref())?;
    validate_base_url(
        "preload_list_base_url",
        settings.preload_list_base_url.as_ref(),
    )?;

    if settings
        .catalog_identities
        .as_ref()
        .is_some_and(|ids| ids.iter().any(|id| id.trim().is_empty()))
    {
        return Err(SettingsError::EmptyIdentity);
    }

    Ok(())
}
