//! Catalog and package entry types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::errors::CatalogError;
use super::manifest::CatalogManifest;

/// Metadata for one package listed in a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageEntry {
    /// Package name. Also the storage key of the package.
    pub name: String,
    /// Names of the assets contained in this package.
    #[serde(default)]
    pub assets: Vec<String>,
    /// Names of the packages this package depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Integrity token checked against downloaded bytes.
    pub checksum: String,
    /// Content hash used to version the storage cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Declared payload size in bytes.
    #[serde(default)]
    pub size: u64,
}

impl PackageEntry {
    /// Create an entry with no assets and no dependencies.
    pub fn new(name: impl Into<String>, checksum: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            assets: Vec::new(),
            dependencies: Vec::new(),
            checksum: checksum.into(),
            hash: None,
            size: 0,
        }
    }

    /// Set the contained asset names.
    #[must_use]
    pub fn with_assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assets = assets.into_iter().map(Into::into).collect();
        self
    }

    /// Set the dependency package names.
    #[must_use]
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Set the content hash used for cache versioning.
    #[must_use]
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// Set the declared payload size.
    #[must_use]
    pub const fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Version under which this package is stored in the disk cache.
    ///
    /// The content hash when present, otherwise the checksum.
    pub fn cache_version(&self) -> &str {
        self.hash.as_deref().unwrap_or(&self.checksum)
    }

    /// Whether this package lists `name` as a direct dependency.
    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.iter().any(|dep| dep == name)
    }
}

/// An immutable, validated catalog.
///
/// Invariants enforced at construction:
/// - the identity is not empty
/// - package names are unique
/// - each asset belongs to exactly one package
/// - no package depends on itself
///
/// Longer dependency cycles are legal here; the resolver rejects them when
/// it walks the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CatalogManifest", into = "CatalogManifest")]
pub struct Catalog {
    identity: String,
    version: String,
    packages: Vec<PackageEntry>,
    package_index: HashMap<String, usize>,
    asset_index: HashMap<String, usize>,
}

impl Catalog {
    /// Validate and build a catalog.
    pub fn new(
        identity: impl Into<String>,
        version: impl Into<String>,
        packages: Vec<PackageEntry>,
    ) -> Result<Self, CatalogError> {
        let identity = identity.into();
        if identity.trim().is_empty() {
            return Err(CatalogError::EmptyIdentity);
        }

        let mut package_index = HashMap::with_capacity(packages.len());
        let mut asset_index = HashMap::new();

        for (position, entry) in packages.iter().enumerate() {
            if package_index.insert(entry.name.clone(), position).is_some() {
                return Err(CatalogError::DuplicatePackage {
                    identity,
                    package: entry.name.clone(),
                });
            }
            if entry.depends_on(&entry.name) {
                return Err(CatalogError::SelfDependency {
                    package: entry.name.clone(),
                });
            }
            for asset in &entry.assets {
                if let Some(previous) = asset_index.insert(asset.clone(), position) {
                    return Err(CatalogError::DuplicateAsset {
                        asset: asset.clone(),
                        first: packages[previous].name.clone(),
                        second: entry.name.clone(),
                    });
                }
            }
        }

        Ok(Self {
            identity,
            version: version.into(),
            packages,
            package_index,
            asset_index,
        })
    }

    /// Parse a catalog from its JSON manifest.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CatalogError> {
        let manifest: CatalogManifest = serde_json::from_slice(bytes)?;
        Self::try_from(manifest)
    }

    /// Serialize the catalog to its JSON manifest.
    pub fn to_json_vec(&self) -> Result<Vec<u8>, CatalogError> {
        serde_json::to_vec_pretty(self).map_err(|e| CatalogError::Serialize {
            message: e.to_string(),
        })
    }

    /// Identity grouping this catalog.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Opaque version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Package entries in manifest order.
    pub fn packages(&self) -> &[PackageEntry] {
        &self.packages
    }

    /// Look up a package by name.
    pub fn package(&self, name: &str) -> Option<&PackageEntry> {
        self.package_index.get(name).map(|&i| &self.packages[i])
    }

    /// Look up the package that contains `asset`.
    pub fn package_for_asset(&self, asset: &str) -> Option<&PackageEntry> {
        self.asset_index.get(asset).map(|&i| &self.packages[i])
    }

    /// Whether any package contains `asset`.
    pub fn contains_asset(&self, asset: &str) -> bool {
        self.asset_index.contains_key(asset)
    }

    /// Whether a package named `name` exists.
    pub fn contains_package(&self, name: &str) -> bool {
        self.package_index.contains_key(name)
    }

    /// Iterate over package names in manifest order.
    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(|p| p.name.as_str())
    }

    /// Sum of the declared sizes of the named packages. Unknown names count as zero.
    pub fn total_size<S: AsRef<str>>(&self, names: &[S]) -> u64 {
        names
            .iter()
            .filter_map(|name| self.package(name.as_ref()))
            .map(|entry| entry.size)
            .sum()
    }
}

impl TryFrom<CatalogManifest> for Catalog {
    type Error = CatalogError;

    fn try_from(manifest: CatalogManifest) -> Result<Self, Self::Error> {
        Self::new(manifest.identity, manifest.version, manifest.packages)
    }
}

impl From<Catalog> for CatalogManifest {
    fn from(catalog: Catalog) -> Self {
        Self {
            identity: catalog.identity,
            version: catalog.version,
            packages: catalog.packages,
        }
    }
}
