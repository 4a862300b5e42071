//! Bounded-parallelism preloader.
//!
//! Downloads packages into the disk cache ahead of use, without decoding
//! them into memory. A preload never replaces content that is resident in
//! memory: resident packages whose catalog checksum has since changed are
//! reported as stale and left alone until the caller unloads them.

use std::sync::Arc;
use std::time::Duration;

use bundlekit_core::{FetchError, PackageEntry, PreloadList};
use futures_util::StreamExt;
use futures_util::stream;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::loader::{DiskFetch, PackageLoader};

/// Where the package names come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreloadSource {
    /// Caller-supplied names.
    Names(Vec<String>),
    /// A preload list fetched from this URL.
    List(Url),
}

/// One preload batch.
#[derive(Debug, Clone)]
pub struct PreloadRequest {
    source: PreloadSource,
    max_parallel: usize,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl PreloadRequest {
    /// Preload `names` one at a time with no timeout.
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(PreloadSource::Names(
            names.into_iter().map(Into::into).collect(),
        ))
    }

    /// Preload the list at `url`.
    pub const fn list(url: Url) -> Self {
        Self::new(PreloadSource::List(url))
    }

    const fn new(source: PreloadSource) -> Self {
        Self {
            source,
            max_parallel: 1,
            timeout: None,
            cancel: None,
        }
    }

    /// Allow up to `max_parallel` concurrent transfers. Values below 1 become 1.
    #[must_use]
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Bound each transfer, including the list fetch, by `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Abort outstanding transfers when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Effective concurrency bound.
    pub const fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    fn deadline(&self) -> Option<Instant> {
        self.timeout.map(|t| Instant::now() + t)
    }
}

/// What a preload would do, shown to the caller before it starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadPlan {
    /// Packages that will be downloaded, dependencies first.
    pub downloads: Vec<String>,
    /// Resident packages whose catalog content changed. Not downloaded.
    pub stale_resident: Vec<String>,
    /// Declared size of `downloads`, in bytes.
    pub total_bytes: u64,
}

impl PreloadPlan {
    /// Whether there is nothing to download or report.
    pub fn is_empty(&self) -> bool {
        self.downloads.is_empty() && self.stale_resident.is_empty()
    }
}

/// The caller's answer to a [`PreloadPlan`].
///
/// Exactly one of [`proceed`](Self::proceed) or [`cancel`](Self::cancel)
/// must be called. Both consume the decision; dropping it unanswered fails
/// the preload with [`PreloadError::NoDecision`].
#[derive(Debug)]
pub struct PreloadDecision {
    answer: oneshot::Sender<bool>,
}

impl PreloadDecision {
    /// Start downloading.
    pub fn proceed(self) {
        let _ = self.answer.send(true);
    }

    /// Abandon the preload.
    pub fn cancel(self) {
        let _ = self.answer.send(false);
    }
}

/// Preload callbacks.
pub trait PreloadObserver: Send + Sync {
    /// Called once with the plan before any download starts.
    ///
    /// The decision may be answered now or later from another task.
    fn before_start(&self, plan: &PreloadPlan, decision: PreloadDecision) {
        let _ = plan;
        decision.proceed();
    }

    /// Called after each package finishes, with completed / total in `0.0..=1.0`.
    fn on_progress(&self, progress: f64) {
        let _ = progress;
    }

    /// Called once after every package finished, failures included.
    fn on_done(&self) {}

    /// Called when the preload list could not be fetched or parsed.
    fn on_list_failed(&self, code: i32, reason: &str) {
        let _ = (code, reason);
    }

    /// Called for each package that failed.
    fn on_package_failed(&self, name: &str, code: i32, reason: &str) {
        let _ = (name, code, reason);
    }
}

/// Observer that proceeds and ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProceedAll;

impl PreloadObserver for ProceedAll {}

/// A package that failed to preload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadFailure {
    /// Package name.
    pub package: String,
    /// Failure code, see [`FetchError::code`].
    pub code: i32,
    /// Failure reason.
    pub reason: String,
}

/// Outcome of a preload that ran or was declined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadReport {
    /// Packages now in the disk cache.
    pub downloaded: Vec<String>,
    /// Packages that failed.
    pub failed: Vec<PreloadFailure>,
    /// Resident packages left untouched because their content changed.
    pub stale_resident: Vec<String>,
    /// Requested names unknown to every catalog.
    pub unknown: Vec<String>,
    /// Whether the caller cancelled at the decision point.
    pub cancelled: bool,
}

impl PreloadReport {
    /// Whether every planned package was downloaded.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failed.is_empty()
    }
}

/// A preload that did not reach the download phase.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PreloadError {
    /// The preload list could not be fetched.
    #[error("failed to fetch preload list: {0}")]
    ListFailed(FetchError),

    /// The preload list could not be parsed.
    #[error("malformed preload list: {0}")]
    MalformedList(String),

    /// The observer dropped the decision without answering.
    #[error("before_start returned without calling proceed or cancel")]
    NoDecision,

    /// No catalog is ready.
    #[error("catalog not ready: {0}")]
    NotReady(String),
}

/// Runs preload batches against a loader.
#[derive(Debug, Clone)]
pub struct Preloader {
    loader: Arc<PackageLoader>,
}

impl Preloader {
    /// Preload through `loader`.
    pub const fn new(loader: Arc<PackageLoader>) -> Self {
        Self { loader }
    }

    /// Run one preload batch.
    pub async fn run(
        &self,
        request: PreloadRequest,
        observer: &dyn PreloadObserver,
    ) -> Result<PreloadReport, PreloadError> {
        let names = match &request.source {
            PreloadSource::Names(names) => names.clone(),
            PreloadSource::List(url) => self.fetch_list(url, &request, observer).await?,
        };

        let (plan, entries, unknown) = self.plan(&names).await;
        let mut report = PreloadReport {
            stale_resident: plan.stale_resident.clone(),
            unknown,
            ..PreloadReport::default()
        };

        if plan.is_empty() {
            tracing::debug!(target: "bundlekit.preload", requested = names.len(), "Nothing to preload");
            observer.on_done();
            return Ok(report);
        }

        let (answer, decided) = oneshot::channel();
        observer.before_start(&plan, PreloadDecision { answer });
        match decided.await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(target: "bundlekit.preload", "Preload cancelled by caller");
                report.cancelled = true;
                return Ok(report);
            }
            Err(_) => return Err(PreloadError::NoDecision),
        }

        if entries.is_empty() {
            observer.on_done();
            return Ok(report);
        }

        let total = entries.len();
        let limit = request.max_parallel();
        tracing::info!(target: "bundlekit.preload", total, limit, bytes = plan.total_bytes, "Preload started");

        let loader = &self.loader;
        let request = &request;
        let mut transfers = stream::iter(entries)
            .map(|entry| async move {
                let result = loader
                    .fetch_to_disk(&entry, request.deadline(), request.cancel.as_ref())
                    .await;
                (entry.name, result)
            })
            .buffer_unordered(limit);

        let mut completed = 0usize;
        while let Some((name, result)) = transfers.next().await {
            completed += 1;
            match result {
                Ok(DiskFetch::Downloaded | DiskFetch::AlreadyCached) => report.downloaded.push(name),
                Err(e) => {
                    tracing::warn!(target: "bundlekit.preload", package = %name, error = %e, "Preload failed");
                    observer.on_package_failed(&name, e.code(), &e.reason());
                    report.failed.push(PreloadFailure {
                        package: name,
                        code: e.code(),
                        reason: e.reason(),
                    });
                }
            }
            observer.on_progress(progress(completed, total));
        }

        tracing::info!(
            target: "bundlekit.preload",
            downloaded = report.downloaded.len(),
            failed = report.failed.len(),
            "Preload finished"
        );
        observer.on_done();
        Ok(report)
    }

    async fn fetch_list(
        &self,
        url: &Url,
        request: &PreloadRequest,
        observer: &dyn PreloadObserver,
    ) -> Result<Vec<String>, PreloadError> {
        let bytes = match self
            .loader
            .pipeline()
            .fetch_document(url.clone(), request.deadline(), request.cancel.as_ref())
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                observer.on_list_failed(e.code(), &e.reason());
                return Err(PreloadError::ListFailed(e));
            }
        };
        match PreloadList::from_json(&bytes) {
            Ok(list) => {
                tracing::debug!(target: "bundlekit.preload", list = %list.name, count = list.packages.len(), "Fetched preload list");
                Ok(list.packages)
            }
            Err(e) => {
                observer.on_list_failed(0, &e.to_string());
                Err(PreloadError::MalformedList(e.to_string()))
            }
        }
    }

    /// Split the dependency closure of `names` into downloads, stale residents and unknowns.
    async fn plan(&self, names: &[String]) -> (PreloadPlan, Vec<PackageEntry>, Vec<String>) {
        let catalogs = self.loader.catalog_snapshot();
        let mut plan = PreloadPlan::default();
        let mut entries = Vec::new();
        let mut unknown = Vec::new();

        for name in catalogs.dependency_closure(names) {
            let Some(entry) = catalogs.package(&name) else {
                unknown.push(name);
                continue;
            };
            if let Some(resident) = self.loader.resident_checksum(&name) {
                if resident != entry.checksum {
                    plan.stale_resident.push(name);
                }
                continue;
            }
            if self
                .loader
                .pipeline()
                .cache()
                .is_version_cached(&entry.name, entry.cache_version())
                .await
            {
                continue;
            }
            plan.total_bytes += entry.size;
            plan.downloads.push(name);
            entries.push(entry.clone());
        }

        (plan, entries, unknown)
    }
}

#[allow(clippy::cast_precision_loss)]
fn progress(completed: usize, total: usize) -> f64 {
    completed as f64 / total as f64
}
