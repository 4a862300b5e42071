//! Catalog error types.

use thiserror::Error;

/// Error raised while constructing or parsing a catalog.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// The catalog has no identity.
    #[error("catalog identity must not be empty")]
    EmptyIdentity,

    /// Two entries share a package name.
    #[error("catalog '{identity}' lists package '{package}' more than once")]
    DuplicatePackage {
        /// Identity of the offending catalog.
        identity: String,
        /// The duplicated package name.
        package: String,
    },

    /// An asset is claimed by two packages.
    #[error("asset '{asset}' is contained in both '{first}' and '{second}'")]
    DuplicateAsset {
        /// The asset name.
        asset: String,
        /// First package claiming the asset.
        first: String,
        /// Second package claiming the asset.
        second: String,
    },

    /// A package lists itself as a dependency.
    #[error("package '{package}' depends on itself")]
    SelfDependency {
        /// The package name.
        package: String,
    },

    /// The manifest could not be parsed.
    #[error("malformed catalog manifest: {message}")]
    Malformed {
        /// Parser message.
        message: String,
    },

    /// The catalog could not be serialized.
    #[error("failed to serialize catalog: {message}")]
    Serialize {
        /// Serializer message.
        message: String,
    },
}

impl CatalogError {
    /// Create a malformed manifest error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(err.to_string())
    }
}
