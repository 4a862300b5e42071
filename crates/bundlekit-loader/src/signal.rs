//! Catalog version signals carried on HTTP responses.
//!
//! Any response, from a package server or from the host's own API, may carry
//! a `resversion` header announcing the current catalog versions as
//! comma-separated `identity:version` pairs:
//!
//! ```text
//! resversion: main:1.0.1, dlc:3
//! ```
//!
//! Announcements land in a [`VersionSignals`] inbox, latest version per
//! identity. The manager drains the inbox and asks a [`CatalogRequestPolicy`]
//! whether, and from where, to fetch each announced catalog.

use std::sync::{Mutex, MutexGuard, PoisonError};

use bundlekit_core::HeaderList;
use indexmap::IndexMap;
use url::Url;

/// Response header announcing catalog versions.
pub const RESOURCE_VERSION_HEADER: &str = "resversion";

/// One announced catalog version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogVersionSignal {
    /// Catalog identity.
    pub identity: String,
    /// Announced version.
    pub version: String,
}

impl CatalogVersionSignal {
    /// Create a signal.
    pub fn new(identity: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            version: version.into(),
        }
    }

    /// Parse a header value. Malformed pairs are skipped.
    pub fn parse_header(value: &str) -> Vec<Self> {
        value
            .split(',')
            .filter_map(|pair| {
                let (identity, version) = pair.trim().split_once(':')?;
                let (identity, version) = (identity.trim(), version.trim());
                (!identity.is_empty() && !version.is_empty())
                    .then(|| Self::new(identity, version))
            })
            .collect()
    }

    /// Every signal in `headers`, in header order.
    pub fn from_headers(headers: &HeaderList) -> Vec<Self> {
        headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(RESOURCE_VERSION_HEADER))
            .flat_map(|(_, value)| Self::parse_header(value))
            .collect()
    }
}

/// Inbox of announced versions waiting to be handled.
#[derive(Debug, Default)]
pub struct VersionSignals {
    pending: Mutex<IndexMap<String, String>>,
}

impl VersionSignals {
    /// An empty inbox.
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> MutexGuard<'_, IndexMap<String, String>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the signals carried by `headers`. Returns how many were found.
    pub fn record(&self, headers: &HeaderList) -> usize {
        let signals = CatalogVersionSignal::from_headers(headers);
        if signals.is_empty() {
            return 0;
        }
        let count = signals.len();
        let mut pending = self.pending();
        for signal in signals {
            tracing::debug!(
                target: "bundlekit.catalog",
                identity = %signal.identity,
                version = %signal.version,
                "Catalog version announced"
            );
            pending.insert(signal.identity, signal.version);
        }
        count
    }

    /// Take every pending signal, oldest identity first.
    pub fn drain(&self) -> Vec<CatalogVersionSignal> {
        self.pending()
            .drain(..)
            .map(|(identity, version)| CatalogVersionSignal { identity, version })
            .collect()
    }

    /// Number of identities with a pending announcement.
    pub fn len(&self) -> usize {
        self.pending().len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending().is_empty()
    }
}

/// Whether to fetch an announced catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogRequest {
    /// Fetch the catalog from this URL.
    Fetch(Url),
    /// Ignore the announcement.
    Skip,
}

/// Decides whether and where to fetch an announced catalog.
///
/// Called with the configured catalog base URL, the identity and the
/// announced version. Implemented for closures.
pub trait CatalogRequestPolicy: Send + Sync {
    /// Decide for one announcement.
    fn should_request(&self, base_url: Option<&Url>, identity: &str, version: &str)
    -> CatalogRequest;
}

impl<F> CatalogRequestPolicy for F
where
    F: Fn(Option<&Url>, &str, &str) -> CatalogRequest + Send + Sync,
{
    fn should_request(
        &self,
        base_url: Option<&Url>,
        identity: &str,
        version: &str,
    ) -> CatalogRequest {
        self(base_url, identity, version)
    }
}

/// Fetches `<catalog base><identity>.json`, where catalogs are first downloaded from.
///
/// Skips when no catalog base URL is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCatalogRequest;

impl CatalogRequestPolicy for DefaultCatalogRequest {
    fn should_request(
        &self,
        base_url: Option<&Url>,
        identity: &str,
        _version: &str,
    ) -> CatalogRequest {
        base_url
            .and_then(|base| catalog_url(base, identity).ok())
            .map_or(CatalogRequest::Skip, CatalogRequest::Fetch)
    }
}

/// `<base><urlencoded identity>.json`.
pub(crate) fn catalog_url(base: &Url, identity: &str) -> Result<Url, url::ParseError> {
    base.join(&format!("{}.json", urlencoding::encode(identity)))
}
