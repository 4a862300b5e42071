//! Shared fixtures for the loader integration tests.
//!
//! Packages are served by a `ScriptedTransport` under `http://cdn.test/p/`
//! and cached in a `MemoryDiskCache`. Every package holds text assets whose
//! value is `"<package>:<asset>"` unless stated otherwise.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use bundlekit_core::testing::ScriptedTransport;
use bundlekit_core::{
    Asset, Catalog, ChecksumPort, DefaultResponseClassifier, JsonPackageFormat, NoAuth,
    PackageEntry, Sha256Checksum, build_json_package,
};
use bundlekit_loader::{DownloadPipeline, PackageLoader, PipelineDeps};
use bundlekit_store::MemoryDiskCache;
use bytes::Bytes;
use url::Url;

pub const PACKAGE_BASE: &str = "http://cdn.test/p/";

/// Route path a package is served from.
pub fn package_path(name: &str) -> String {
    format!("/p/{name}")
}

/// Encode text assets into a package body.
pub fn package_body(assets: &[(&str, &str)]) -> Bytes {
    build_json_package(
        assets
            .iter()
            .map(|(name, value)| (*name, Asset::Text((*value).to_string()))),
    )
}

/// A catalog entry matching `body`.
pub fn entry_for(name: &str, body: &Bytes, assets: &[&str], deps: &[&str]) -> PackageEntry {
    PackageEntry::new(name, Sha256Checksum.checksum(body))
        .with_assets(assets.iter().copied())
        .with_dependencies(deps.iter().copied())
        .with_size(body.len() as u64)
}

/// Serve a package on `transport` and return its entry.
pub fn serve(
    transport: &ScriptedTransport,
    name: &str,
    assets: &[&str],
    deps: &[&str],
) -> PackageEntry {
    let values: Vec<String> = assets.iter().map(|a| format!("{name}:{a}")).collect();
    let pairs: Vec<(&str, &str)> = assets
        .iter()
        .copied()
        .zip(values.iter().map(String::as_str))
        .collect();
    serve_body(transport, name, &package_body(&pairs), assets, deps)
}

/// Serve `body` for package `name` and return its entry.
pub fn serve_body(
    transport: &ScriptedTransport,
    name: &str,
    body: &Bytes,
    assets: &[&str],
    deps: &[&str],
) -> PackageEntry {
    transport.route(&package_path(name), 200, body.clone());
    entry_for(name, body, assets, deps)
}

pub fn catalog(version: &str, packages: Vec<PackageEntry>) -> Arc<Catalog> {
    Arc::new(Catalog::new("main", version, packages).unwrap())
}

pub fn text(value: &str) -> Asset {
    Asset::Text(value.to_string())
}

/// A loader wired to scripted collaborators.
pub struct LoaderFixture {
    pub transport: Arc<ScriptedTransport>,
    pub cache: Arc<MemoryDiskCache>,
    pub loader: Arc<PackageLoader>,
}

impl LoaderFixture {
    pub fn new() -> Self {
        let transport = Arc::new(ScriptedTransport::new());
        let cache = Arc::new(MemoryDiskCache::new());
        let pipeline = DownloadPipeline::new(
            PipelineDeps {
                transport: transport.clone(),
                cache: cache.clone(),
                auth: Arc::new(NoAuth),
                classifier: Arc::new(DefaultResponseClassifier),
                checksum: Arc::new(Sha256Checksum),
            },
            Url::parse(PACKAGE_BASE).unwrap(),
            Duration::from_millis(1),
        );
        let loader = Arc::new(PackageLoader::new(pipeline, Arc::new(JsonPackageFormat)));
        Self {
            transport,
            cache,
            loader,
        }
    }

    pub fn install(&self, catalog: Arc<Catalog>) {
        self.loader.install_catalog(catalog);
    }
}
