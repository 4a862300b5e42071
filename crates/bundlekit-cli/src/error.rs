//! CLI error type and exit codes.

use bundlekit_core::{FetchError, LoadError, PathError, SettingsError};
use bundlekit_loader::{CatalogSyncError, ConfigError, PreloadError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid arguments.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// Settings or data directory problem.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Catalog download or update failure.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Asset load failure.
    #[error("Load error: {0}")]
    Load(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),
}

impl CliError {
    /// Map error to an exit code.
    ///
    /// Exit codes follow sysexits.h where one fits:
    /// - 1: General error
    /// - 2: Invalid arguments
    /// - 65: Data error (bad catalog, missing asset)
    /// - 69: Service unavailable (network)
    /// - 74: IO error
    /// - 78: Configuration error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Arguments(_) => 2,
            Self::Catalog(_) | Self::Load(_) => 65,
            Self::Network(_) => 69,
            Self::Io(_) => 74,
            Self::Config(_) => 78,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<PathError> for CliError {
    fn from(err: PathError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<FetchError> for CliError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Cache { .. } => Self::Io(err.to_string()),
            other => Self::Network(other.to_string()),
        }
    }
}

impl From<CatalogSyncError> for CliError {
    fn from(err: CatalogSyncError) -> Self {
        match err {
            CatalogSyncError::NoCatalogBaseUrl | CatalogSyncError::NoIdentities => {
                Self::Config(err.to_string())
            }
            CatalogSyncError::Fetch { .. } => Self::Network(err.to_string()),
            _ => Self::Catalog(err.to_string()),
        }
    }
}

impl From<LoadError> for CliError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::DownloadFailed { .. } => Self::Network(err.to_string()),
            LoadError::CatalogNotReady { .. } => Self::Config(err.to_string()),
            other => Self::Load(other.to_string()),
        }
    }
}

impl From<PreloadError> for CliError {
    fn from(err: PreloadError) -> Self {
        match err {
            PreloadError::ListFailed(_) => Self::Network(err.to_string()),
            PreloadError::NotReady(_) => Self::Config(err.to_string()),
            other => Self::Catalog(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Arguments("x".into()).exit_code(), 2);
        assert_eq!(CliError::Config("x".into()).exit_code(), 78);
    }

    #[test]
    fn test_load_errors_map_by_kind() {
        let not_found: CliError = LoadError::not_contained("a.txt").into();
        assert!(matches!(not_found, CliError::Load(_)));

        let download: CliError = LoadError::download("ui", FetchError::Timeout).into();
        assert_eq!(download.exit_code(), 69);
    }

    #[test]
    fn test_missing_catalog_base_is_config() {
        let err: CliError = CatalogSyncError::NoCatalogBaseUrl.into();
        assert!(matches!(err, CliError::Config(_)));
    }
}
