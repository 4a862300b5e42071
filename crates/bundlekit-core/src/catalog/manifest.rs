//! Serialized manifest forms.

use serde::{Deserialize, Serialize};

use super::errors::CatalogError;
use super::types::PackageEntry;

/// Wire form of a catalog, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogManifest {
    /// Identity grouping the catalog.
    pub identity: String,
    /// Opaque version string.
    pub version: String,
    /// Ordered package entries.
    #[serde(default)]
    pub packages: Vec<PackageEntry>,
}

/// Server-supplied list of packages to preload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreloadList {
    /// Name of the list.
    pub name: String,
    /// Package names to preload.
    #[serde(default)]
    pub packages: Vec<String>,
}

impl PreloadList {
    /// Parse a preload list from JSON.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CatalogError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
