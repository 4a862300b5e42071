//! Asset values and typed extraction.

use std::fmt;

use bytes::Bytes;
use thiserror::Error;

/// A single asset extracted from a loaded package.
#[derive(Debug, Clone, PartialEq)]
pub enum Asset {
    /// UTF-8 text.
    Text(String),
    /// Opaque bytes.
    Binary(Bytes),
    /// Structured JSON document.
    Json(serde_json::Value),
}

impl Asset {
    /// The kind of content held.
    pub const fn kind(&self) -> AssetKind {
        match self {
            Self::Text(_) => AssetKind::Text,
            Self::Binary(_) => AssetKind::Binary,
            Self::Json(_) => AssetKind::Json,
        }
    }
}

/// Kinds of content a package can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// UTF-8 text.
    Text,
    /// Opaque bytes.
    Binary,
    /// Structured JSON document.
    Json,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Binary => "binary",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

/// Conversion from an extracted [`Asset`] into a concrete Rust type.
///
/// On mismatch the original asset is handed back so the caller can report
/// what was actually found.
pub trait FromAsset: Sized {
    /// The kind this type accepts, or `None` when any kind is accepted.
    const KIND: Option<AssetKind>;

    /// Convert, or return the asset unchanged on kind mismatch.
    fn from_asset(asset: Asset) -> Result<Self, Asset>;
}

impl FromAsset for Asset {
    const KIND: Option<AssetKind> = None;

    fn from_asset(asset: Asset) -> Result<Self, Asset> {
        Ok(asset)
    }
}

impl FromAsset for String {
    const KIND: Option<AssetKind> = Some(AssetKind::Text);

    fn from_asset(asset: Asset) -> Result<Self, Asset> {
        match asset {
            Asset::Text(text) => Ok(text),
            other => Err(other),
        }
    }
}

impl FromAsset for Bytes {
    const KIND: Option<AssetKind> = Some(AssetKind::Binary);

    fn from_asset(asset: Asset) -> Result<Self, Asset> {
        match asset {
            Asset::Binary(bytes) => Ok(bytes),
            other => Err(other),
        }
    }
}

impl FromAsset for serde_json::Value {
    const KIND: Option<AssetKind> = Some(AssetKind::Json);

    fn from_asset(asset: Asset) -> Result<Self, Asset> {
        match asset {
            Asset::Json(value) => Ok(value),
            other => Err(other),
        }
    }
}

/// Failure to pull a named asset out of a loaded package.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// The package does not contain the asset.
    #[error("asset '{asset}' not found in package '{package}'")]
    Missing {
        /// Requested asset name.
        asset: String,
        /// Package that was searched.
        package: String,
    },

    /// The asset exists but holds a different kind of content.
    #[error("asset '{asset}' is {found}, expected {expected}")]
    TypeMismatch {
        /// Requested asset name.
        asset: String,
        /// Kind the caller asked for.
        expected: AssetKind,
        /// Kind actually stored.
        found: AssetKind,
    },

    /// The asset entry could not be decoded.
    #[error("asset '{asset}' is corrupt: {reason}")]
    Corrupt {
        /// Requested asset name.
        asset: String,
        /// Decoder message.
        reason: String,
    },
}

impl ExtractionError {
    /// Whether this is a missing or mistyped asset rather than a decode fault.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Missing { .. } | Self::TypeMismatch { .. })
    }
}
