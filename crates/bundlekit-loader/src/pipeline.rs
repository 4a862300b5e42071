//! Download pipeline: network fetch, verification and durable caching.
//!
//! A package fetch goes through these steps:
//!
//! 1. Build `<base><name>?version=..&checksum=..` and ask the auth port for headers
//! 2. Race the transfer against the deadline and the cancellation token;
//!    losing the race drops the transfer, which aborts it
//! 3. Record any `resversion` announcement, then classify the response;
//!    a 401 is reported to the auth port
//! 4. Reject empty payloads even when the status was 2xx
//! 5. Verify the checksum
//! 6. Store in the disk cache and wait until the cache reports the version
//!    as durably stored
//!
//! Nothing here retries. Retry is a caller decision.

use std::sync::Arc;
use std::time::Duration;

use bundlekit_core::{
    ChecksumPort, DiskCachePort, FetchError, HttpRequest, PackageEntry, RequestAuthPort,
    ResponseClassifier, ResponseContext, ResponseVerdict, TransportPort,
};
use bytes::Bytes;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::signal::VersionSignals;

const UNAUTHORIZED: u16 = 401;

/// Collaborators of the pipeline.
#[derive(Clone)]
pub struct PipelineDeps {
    /// Network transport.
    pub transport: Arc<dyn TransportPort>,
    /// Versioned disk cache.
    pub cache: Arc<dyn DiskCachePort>,
    /// Auth hooks.
    pub auth: Arc<dyn RequestAuthPort>,
    /// Response classifier.
    pub classifier: Arc<dyn ResponseClassifier>,
    /// Checksum algorithm.
    pub checksum: Arc<dyn ChecksumPort>,
}

/// Fetches packages and documents.
pub struct DownloadPipeline {
    deps: PipelineDeps,
    base_url: Url,
    poll_interval: Duration,
    signals: Option<Arc<VersionSignals>>,
}

impl std::fmt::Debug for DownloadPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadPipeline")
            .field("base_url", &self.base_url.as_str())
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

fn deadline_passed(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

impl DownloadPipeline {
    /// Fetch packages from `base_url`, which must end with `/`.
    pub fn new(deps: PipelineDeps, base_url: Url, poll_interval: Duration) -> Self {
        Self {
            deps,
            base_url,
            poll_interval,
            signals: None,
        }
    }

    /// Record catalog version announcements found on responses in `signals`.
    #[must_use]
    pub fn with_version_signals(mut self, signals: Arc<VersionSignals>) -> Self {
        self.signals = Some(signals);
        self
    }

    /// The disk cache packages are stored in.
    pub fn cache(&self) -> &Arc<dyn DiskCachePort> {
        &self.deps.cache
    }

    /// URL a package is fetched from.
    pub fn package_url(&self, entry: &PackageEntry) -> Result<Url, FetchError> {
        let mut url = self
            .base_url
            .join(&urlencoding::encode(&entry.name))
            .map_err(|e| FetchError::InvalidUrl {
                message: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("version", entry.cache_version())
            .append_pair("checksum", &entry.checksum);
        Ok(url)
    }

    /// Download `entry`, verify it and store it durably in the disk cache.
    pub async fn fetch(
        &self,
        entry: &PackageEntry,
        deadline: Option<Instant>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Bytes, FetchError> {
        let url = self.package_url(entry)?;
        tracing::debug!(target: "bundlekit.pipeline", package = %entry.name, %url, "Fetching package");

        let bytes = self.request(url, deadline, cancel).await?;

        if !self.deps.checksum.matches(&bytes, &entry.checksum) {
            return Err(FetchError::ChecksumMismatch {
                expected: entry.checksum.clone(),
                actual: self.deps.checksum.checksum(&bytes),
            });
        }

        let version = entry.cache_version();
        self.deps
            .cache
            .store(&entry.name, version, bytes.clone())
            .await
            .map_err(|e| FetchError::cache(e.to_string()))?;
        self.wait_until_cached(&entry.name, version, deadline, cancel)
            .await?;

        tracing::info!(
            target: "bundlekit.pipeline",
            package = %entry.name,
            version,
            size = bytes.len(),
            "Package downloaded"
        );
        Ok(bytes)
    }

    /// Download a document such as a catalog manifest or a preload list.
    ///
    /// Documents are neither verified nor cached.
    pub async fn fetch_document(
        &self,
        url: Url,
        deadline: Option<Instant>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Bytes, FetchError> {
        tracing::debug!(target: "bundlekit.pipeline", %url, "Fetching document");
        self.request(url, deadline, cancel).await
    }

    async fn request(
        &self,
        url: Url,
        deadline: Option<Instant>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Bytes, FetchError> {
        if deadline_passed(deadline) {
            return Err(FetchError::Timeout);
        }
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(FetchError::Cancelled);
        }

        let headers = self.deps.auth.request_headers(&url);
        let request = HttpRequest::get(url.clone()).with_headers(headers);
        let transfer = self.deps.transport.get(request);
        let bounded = async move {
            match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, transfer)
                    .await
                    .map_err(|_| FetchError::Timeout),
                None => Ok(transfer.await),
            }
        };
        let outcome = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => Err(FetchError::Cancelled),
                    outcome = bounded => outcome,
                }
            }
            None => bounded.await,
        };

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(target: "bundlekit.pipeline", %url, error = %e, "Transfer aborted");
                return Err(e);
            }
        };

        if let (Some(signals), Ok(response)) = (&self.signals, &response) {
            signals.record(&response.headers);
        }

        let verdict = match &response {
            Ok(response) => self.deps.classifier.classify(&ResponseContext::response(
                response.status,
                &response.headers,
                response.body.as_ref(),
            )),
            Err(e) => self
                .deps
                .classifier
                .classify(&ResponseContext::transport_failure(&e.message)),
        };

        if let ResponseVerdict::Failure { code, reason } = verdict {
            if code == i32::from(UNAUTHORIZED) {
                self.deps.auth.on_unauthorized(&url, &reason);
            }
            tracing::warn!(target: "bundlekit.pipeline", %url, code, reason = %reason, "Request rejected");
            return Err(FetchError::Rejected { code, reason });
        }

        match response {
            Ok(response) => match response.body {
                Some(body) if !body.is_empty() => Ok(body),
                _ => Err(FetchError::EmptyBody {
                    status: i32::from(response.status),
                }),
            },
            // A classifier that accepts a transport failure still has no payload
            Err(_) => Err(FetchError::EmptyBody { status: 0 }),
        }
    }

    async fn wait_until_cached(
        &self,
        name: &str,
        version: &str,
        deadline: Option<Instant>,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), FetchError> {
        loop {
            if self.deps.cache.is_version_cached(name, version).await {
                return Ok(());
            }
            if deadline_passed(deadline) {
                return Err(FetchError::Timeout);
            }
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(FetchError::Cancelled);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
