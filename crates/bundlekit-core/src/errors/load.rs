//! Loader errors.

use std::fmt;

use thiserror::Error;

use super::fetch::{FetchError, HTTP_TIMEOUT_CODE};

/// Result alias for loader operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Stable classification of a [`LoadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadErrorKind {
    /// The asset or package is unknown to every active catalog.
    NotContained,
    /// The package could not be downloaded or read from disk.
    DownloadFailed,
    /// The package loaded but the asset could not be decoded.
    AssetLoadFailed,
    /// The package loaded but does not hold the asset with the requested kind.
    NullAssetFound,
    /// One or more dependencies failed.
    FailedToLoadDependentBundles,
    /// The dependency graph loops back on itself.
    DependencyCycle,
    /// No catalog is ready.
    CatalogNotReady,
}

impl fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotContained => "NotContained",
            Self::DownloadFailed => "DownloadFailed",
            Self::AssetLoadFailed => "AssetLoadFailed",
            Self::NullAssetFound => "NullAssetFound",
            Self::FailedToLoadDependentBundles => "FailedToLoadDependentBundles",
            Self::DependencyCycle => "DependencyCycle",
            Self::CatalogNotReady => "CatalogNotReady",
        };
        f.write_str(name)
    }
}

/// One failed dependency inside an aggregated error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyFailure {
    /// Dependency package name.
    pub package: String,
    /// Classification of its failure.
    pub kind: LoadErrorKind,
    /// Code of its failure, see [`LoadError::code`].
    pub code: i32,
    /// Rendered reason.
    pub reason: String,
}

impl DependencyFailure {
    /// Record a dependency's failure.
    pub fn new(package: impl Into<String>, error: &LoadError) -> Self {
        Self {
            package: package.into(),
            kind: error.kind(),
            code: error.code(),
            reason: error.to_string(),
        }
    }
}

impl fmt::Display for DependencyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "package:{} error:{} reason:{}",
            self.package, self.kind, self.reason
        )
    }
}

/// Failure of a load request.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    /// The name is unknown to every active catalog.
    #[error("'{name}' is not contained in any catalog")]
    NotContained {
        /// Asset or package name.
        name: String,
    },

    /// Downloading or reading the package failed.
    #[error("failed to download package '{package}': {source}")]
    DownloadFailed {
        /// Package name.
        package: String,
        /// Transfer failure.
        source: FetchError,
    },

    /// Extraction hit a decoding fault.
    #[error("failed to load asset '{asset}' from package '{package}': {reason}")]
    AssetLoadFailed {
        /// Asset name.
        asset: String,
        /// Package name.
        package: String,
        /// Extraction message.
        reason: String,
    },

    /// Extraction found no asset of the requested kind.
    #[error("null asset '{asset}' in package '{package}': {reason}")]
    NullAssetFound {
        /// Asset name.
        asset: String,
        /// Package name.
        package: String,
        /// Extraction message.
        reason: String,
    },

    /// Dependencies failed; every failure is listed.
    #[error("failed to load dependent packages of '{package}': {}", render_failures(.failures))]
    FailedToLoadDependentBundles {
        /// Package whose dependencies failed.
        package: String,
        /// Each failed dependency.
        failures: Vec<DependencyFailure>,
    },

    /// Resolution revisited a package already on the current chain.
    #[error("dependency cycle: {}", .chain.join(" -> "))]
    DependencyCycle {
        /// Package names from the root to the repeated package.
        chain: Vec<String>,
    },

    /// The manager has no ready catalog.
    #[error("catalog not ready: {reason}")]
    CatalogNotReady {
        /// Current state description.
        reason: String,
    },
}

fn render_failures(failures: &[DependencyFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("[{f}]"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl LoadError {
    /// Create a not-contained error.
    pub fn not_contained(name: impl Into<String>) -> Self {
        Self::NotContained { name: name.into() }
    }

    /// Create a download failure.
    pub fn download(package: impl Into<String>, source: FetchError) -> Self {
        Self::DownloadFailed {
            package: package.into(),
            source,
        }
    }

    /// Classification of this error.
    pub const fn kind(&self) -> LoadErrorKind {
        match self {
            Self::NotContained { .. } => LoadErrorKind::NotContained,
            Self::DownloadFailed { .. } => LoadErrorKind::DownloadFailed,
            Self::AssetLoadFailed { .. } => LoadErrorKind::AssetLoadFailed,
            Self::NullAssetFound { .. } => LoadErrorKind::NullAssetFound,
            Self::FailedToLoadDependentBundles { .. } => {
                LoadErrorKind::FailedToLoadDependentBundles
            }
            Self::DependencyCycle { .. } => LoadErrorKind::DependencyCycle,
            Self::CatalogNotReady { .. } => LoadErrorKind::CatalogNotReady,
        }
    }

    /// Whether the failure was a deadline expiry, directly or in a dependency.
    pub fn is_timeout(&self) -> bool {
        self.code() == HTTP_TIMEOUT_CODE
    }

    /// Integer code for callbacks.
    ///
    /// The transfer code for download failures, [`HTTP_TIMEOUT_CODE`] for an
    /// aggregate containing a timeout, else 0.
    pub fn code(&self) -> i32 {
        match self {
            Self::DownloadFailed { source, .. } => source.code(),
            Self::FailedToLoadDependentBundles { failures, .. }
                if failures.iter().any(|f| f.code == HTTP_TIMEOUT_CODE) =>
            {
                HTTP_TIMEOUT_CODE
            }
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_names_every_dependency() {
        let a = LoadError::download("a", FetchError::rejected(404, "gone"));
        let b = LoadError::not_contained("b");
        let err = LoadError::FailedToLoadDependentBundles {
            package: "root".to_string(),
            failures: vec![DependencyFailure::new("a", &a), DependencyFailure::new("b", &b)],
        };
        let message = err.to_string();
        assert!(message.contains("package:a error:DownloadFailed"));
        assert!(message.contains("gone"));
        assert!(message.contains("package:b error:NotContained"));
        assert_eq!(err.kind(), LoadErrorKind::FailedToLoadDependentBundles);
    }

    #[test]
    fn test_timeout_detection() {
        let direct = LoadError::download("p", FetchError::Timeout);
        assert!(direct.is_timeout());
        assert_eq!(direct.code(), -1);

        let nested = LoadError::FailedToLoadDependentBundles {
            package: "root".to_string(),
            failures: vec![DependencyFailure::new("p", &direct)],
        };
        assert!(nested.is_timeout());
        assert!(!LoadError::not_contained("x").is_timeout());
    }

    #[test]
    fn test_cycle_message() {
        let err = LoadError::DependencyCycle {
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "dependency cycle: a -> b -> a");
    }
}
