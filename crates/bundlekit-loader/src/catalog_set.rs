//! The set of active catalogs.

use std::collections::HashSet;
use std::sync::Arc;

use bundlekit_core::{Catalog, PackageEntry};
use indexmap::IndexMap;

/// Active catalogs keyed by identity, in installation order.
///
/// Lookups search every catalog and the first match wins, so an earlier
/// identity shadows a later one that reuses a package or asset name.
#[derive(Debug, Clone, Default)]
pub struct CatalogSet {
    catalogs: IndexMap<String, Arc<Catalog>>,
}

impl CatalogSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `catalog`, replacing the one with the same identity in place.
    ///
    /// Returns the replaced catalog.
    pub fn install(&mut self, catalog: Arc<Catalog>) -> Option<Arc<Catalog>> {
        self.catalogs
            .insert(catalog.identity().to_string(), catalog)
    }

    /// Remove the catalog for `identity`.
    pub fn remove(&mut self, identity: &str) -> Option<Arc<Catalog>> {
        self.catalogs.shift_remove(identity)
    }

    /// Catalog for `identity`.
    pub fn get(&self, identity: &str) -> Option<&Arc<Catalog>> {
        self.catalogs.get(identity)
    }

    /// Whether no catalog is installed.
    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }

    /// Number of installed catalogs.
    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    /// Installed catalogs in installation order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Catalog>> {
        self.catalogs.values()
    }

    /// Installed identities in installation order.
    pub fn identities(&self) -> Vec<String> {
        self.catalogs.keys().cloned().collect()
    }

    /// Look up a package by name.
    pub fn package(&self, name: &str) -> Option<&PackageEntry> {
        self.iter().find_map(|catalog| catalog.package(name))
    }

    /// Identity of the catalog that lookups of package `name` resolve to.
    pub fn owner_of(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|catalog| catalog.contains_package(name))
            .map(|catalog| catalog.identity())
    }

    /// Look up the package owning `asset`.
    pub fn package_for_asset(&self, asset: &str) -> Option<&PackageEntry> {
        self.iter().find_map(|catalog| catalog.package_for_asset(asset))
    }

    /// Whether any catalog lists `asset`.
    pub fn contains_asset(&self, asset: &str) -> bool {
        self.iter().any(|catalog| catalog.contains_asset(asset))
    }

    /// Whether any catalog lists package `name`.
    pub fn contains_package(&self, name: &str) -> bool {
        self.iter().any(|catalog| catalog.contains_package(name))
    }

    /// Every package entry visible through lookups, first match wins.
    pub fn visible_packages(&self) -> Vec<&PackageEntry> {
        let mut seen = HashSet::new();
        self.iter()
            .flat_map(|catalog| catalog.packages())
            .filter(|entry| seen.insert(entry.name.as_str()))
            .collect()
    }

    /// Sum of declared sizes. Unknown names count as zero.
    pub fn total_size<S: AsRef<str>>(&self, names: &[S]) -> u64 {
        names
            .iter()
            .filter_map(|name| self.package(name.as_ref()))
            .map(|entry| entry.size)
            .sum()
    }

    /// The named packages plus their transitive dependencies across all catalogs.
    ///
    /// Dependencies come first and each name appears once. Unknown names are
    /// kept so callers can report them; cycles are cut.
    pub fn dependency_closure<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        let mut visiting = HashSet::new();
        let mut done = HashSet::new();
        let mut out = Vec::new();
        for name in names {
            self.visit(name.as_ref(), &mut visiting, &mut done, &mut out);
        }
        out
    }

    fn visit(
        &self,
        name: &str,
        visiting: &mut HashSet<String>,
        done: &mut HashSet<String>,
        out: &mut Vec<String>,
    ) {
        if done.contains(name) || !visiting.insert(name.to_string()) {
            return;
        }
        if let Some(entry) = self.package(name) {
            for dep in &entry.dependencies {
                self.visit(dep, visiting, done, out);
            }
        }
        visiting.remove(name);
        done.insert(name.to_string());
        out.push(name.to_string());
    }
}
