//! Dependency resolution.
//!
//! Resolution runs in two passes. Planning walks the catalogs synchronously
//! from the requested package, recording for every reachable package which
//! dependencies to wait on and which fail up front (missing from every
//! catalog, or closing a cycle back onto the current chain). Edges that
//! close a cycle are never followed, so the remaining graph is acyclic.
//!
//! Settling then walks that graph. Each package settles exactly once per
//! request: whoever reaches it first drives its dependencies and its own
//! load, and every other dependent joins that outcome. A graph with shared
//! sub-graphs therefore costs one future per package, not one per path.

use std::collections::HashMap;
use std::sync::Arc;

use bundlekit_core::{DependencyFailure, FetchError, LoadError, LoadResult, PackageEntry};
use bytes::Bytes;
use futures_util::future::{BoxFuture, join_all};
use tokio::sync::OnceCell;
use tokio::time::Instant;

use super::{LoadedPackage, PackageLoader};
use crate::ledger::LedgerSlot;

/// One dependency edge of a planned package.
enum Edge {
    /// Wait for the dependency to settle.
    Await(String),
    /// Known to fail before anything is loaded.
    Fail(DependencyFailure),
}

struct PlannedPackage {
    entry: PackageEntry,
    edges: Vec<Edge>,
}

/// A single resolution request: the plan and one outcome slot per package.
struct Resolution<'a> {
    loader: &'a PackageLoader,
    deadline: Option<Instant>,
    plan: HashMap<String, PlannedPackage>,
    outcomes: HashMap<String, OnceCell<LoadResult<Arc<LoadedPackage>>>>,
}

impl PackageLoader {
    /// Resolve `entry` and its dependencies, leaving all of them resident.
    ///
    /// Every direct dependency starts at once; failures are collected and
    /// only reported after all of them settle and the package itself has
    /// been loaded. Dependencies already in memory are not revisited.
    pub(super) async fn resolve(
        &self,
        entry: PackageEntry,
        deadline: Option<Instant>,
    ) -> LoadResult<Arc<LoadedPackage>> {
        let root = entry.name.clone();
        let mut plan = HashMap::new();
        self.plan(entry, &mut Vec::new(), &mut plan);

        let outcomes = plan.keys().map(|name| (name.clone(), OnceCell::new())).collect();
        let resolution = Resolution {
            loader: self,
            deadline,
            plan,
            outcomes,
        };
        resolution.settle(&root).await
    }

    /// Depth-first planning pass. `chain` is the path from the root.
    ///
    /// A package is added to `plan` once all of its dependencies are, so an
    /// `Edge::Await` always points at a package that finished planning first.
    fn plan(
        &self,
        entry: PackageEntry,
        chain: &mut Vec<String>,
        plan: &mut HashMap<String, PlannedPackage>,
    ) {
        chain.push(entry.name.clone());
        let mut edges = Vec::with_capacity(entry.dependencies.len());

        for dep in &entry.dependencies {
            if self.is_resident_in_memory(dep) {
                continue;
            }
            if chain.iter().any(|visited| visited == dep) {
                let mut cycle = chain.clone();
                cycle.push(dep.clone());
                let error = LoadError::DependencyCycle { chain: cycle };
                edges.push(Edge::Fail(DependencyFailure::new(dep.as_str(), &error)));
                continue;
            }
            if !plan.contains_key(dep) {
                let Some(dep_entry) = self.package(dep) else {
                    let error = LoadError::not_contained(dep);
                    edges.push(Edge::Fail(DependencyFailure::new(dep.as_str(), &error)));
                    continue;
                };
                self.plan(dep_entry, chain, plan);
            }
            edges.push(Edge::Await(dep.clone()));
        }

        chain.pop();
        plan.insert(entry.name.clone(), PlannedPackage { entry, edges });
    }

    /// Make `entry` resident, loading it from disk or the network.
    ///
    /// Waiters on the ledger re-check residency after every release, so a
    /// completed load is never followed by a second download.
    async fn ensure_resident(
        &self,
        entry: &PackageEntry,
        deadline: Option<Instant>,
    ) -> LoadResult<Arc<LoadedPackage>> {
        loop {
            if let Some(package) = self.resident_package(&entry.name) {
                return Ok(package);
            }

            let guard = match self.ledger.acquire(&entry.name) {
                LedgerSlot::Acquired(guard) => guard,
                LedgerSlot::Busy(wait) => {
                    tracing::debug!(target: "bundlekit.loader", package = %entry.name, "Waiting for in-flight load");
                    wait.released_by(deadline)
                        .await
                        .map_err(|e| LoadError::download(&entry.name, e))?;
                    continue;
                }
            };

            if let Some(package) = self.resident_package(&entry.name) {
                return Ok(package);
            }

            let bytes = self
                .read_or_fetch(entry, deadline)
                .await
                .map_err(|e| LoadError::download(&entry.name, e))?;
            let archive = self.format.open(&entry.name, bytes).map_err(|e| {
                LoadError::download(
                    &entry.name,
                    FetchError::Unreadable {
                        reason: e.to_string(),
                    },
                )
            })?;

            let package = Arc::new(LoadedPackage {
                entry: entry.clone(),
                archive,
            });
            self.resident_mut()
                .insert(entry.name.clone(), Arc::clone(&package));
            drop(guard);

            tracing::debug!(target: "bundlekit.loader", package = %entry.name, "Package resident");
            return Ok(package);
        }
    }

    async fn read_or_fetch(
        &self,
        entry: &PackageEntry,
        deadline: Option<Instant>,
    ) -> Result<Bytes, FetchError> {
        match self
            .cache()
            .read(&entry.name, entry.cache_version())
            .await
        {
            Ok(Some(bytes)) => {
                tracing::debug!(target: "bundlekit.loader", package = %entry.name, "Loading from disk cache");
                return Ok(bytes);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(target: "bundlekit.loader", package = %entry.name, error = %e, "Disk cache read failed, downloading");
            }
        }
        self.pipeline.fetch(entry, deadline, None).await
    }
}

impl Resolution<'_> {
    /// Outcome of package `name`, settling it if nobody has yet.
    fn settle<'s>(&'s self, name: &'s str) -> BoxFuture<'s, LoadResult<Arc<LoadedPackage>>> {
        Box::pin(async move {
            let (Some(planned), Some(outcome)) = (self.plan.get(name), self.outcomes.get(name))
            else {
                return Err(LoadError::not_contained(name));
            };
            outcome
                .get_or_init(|| self.load_planned(planned))
                .await
                .clone()
        })
    }

    async fn load_planned(&self, planned: &PlannedPackage) -> LoadResult<Arc<LoadedPackage>> {
        let pending = planned.edges.iter().map(|edge| async move {
            match edge {
                Edge::Fail(failure) => Some(failure.clone()),
                Edge::Await(dep) => self
                    .settle(dep)
                    .await
                    .err()
                    .map(|e| DependencyFailure::new(dep.as_str(), &e)),
            }
        });
        let failures: Vec<DependencyFailure> =
            join_all(pending).await.into_iter().flatten().collect();

        let loaded = self
            .loader
            .ensure_resident(&planned.entry, self.deadline)
            .await;

        if !failures.is_empty() {
            tracing::warn!(
                target: "bundlekit.loader",
                package = %planned.entry.name,
                failed = failures.len(),
                "Dependencies failed to load"
            );
            return Err(LoadError::FailedToLoadDependentBundles {
                package: planned.entry.name.clone(),
                failures,
            });
        }
        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{DownloadPipeline, PipelineDeps};
    use bundlekit_core::testing::ScriptedTransport;
    use bundlekit_core::{
        Asset, Catalog, ChecksumPort, DefaultResponseClassifier, JsonPackageFormat, LoadErrorKind,
        NoAuth, Sha256Checksum, build_json_package,
    };
    use bundlekit_store::MemoryDiskCache;
    use std::time::Duration;
    use url::Url;

    struct Fixture {
        transport: Arc<ScriptedTransport>,
        loader: PackageLoader,
    }

    fn package(name: &str, deps: &[&str], transport: &ScriptedTransport) -> PackageEntry {
        let asset = format!("{name}.txt");
        let body = build_json_package([(asset.clone(), Asset::Text(name.to_string()))]);
        let entry = PackageEntry::new(name, Sha256Checksum.checksum(&body))
            .with_assets([asset])
            .with_dependencies(deps.iter().copied());
        transport.route(&format!("/p/{name}"), 200, body);
        entry
    }

    fn fixture(specs: &[(&str, &[&str])]) -> Fixture {
        let transport = Arc::new(ScriptedTransport::new());
        let entries = specs
            .iter()
            .map(|(name, deps)| package(name, deps, &transport))
            .collect();
        let pipeline = DownloadPipeline::new(
            PipelineDeps {
                transport: transport.clone(),
                cache: Arc::new(MemoryDiskCache::new()),
                auth: Arc::new(NoAuth),
                classifier: Arc::new(DefaultResponseClassifier),
                checksum: Arc::new(Sha256Checksum),
            },
            Url::parse("http://cdn.test/p/").unwrap(),
            Duration::from_millis(1),
        );
        let loader = PackageLoader::new(pipeline, Arc::new(JsonPackageFormat));
        loader.install_catalog(Arc::new(Catalog::new("main", "1", entries).unwrap()));
        Fixture { transport, loader }
    }

    #[tokio::test]
    async fn test_missing_dependency_is_aggregated() {
        let f = fixture(&[("root", &["ghost"])]);
        let err = f.loader.load_asset("root.txt", None).await.unwrap_err();
        match err {
            LoadError::FailedToLoadDependentBundles { package, failures } => {
                assert_eq!(package, "root");
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].package, "ghost");
                assert_eq!(failures[0].kind, LoadErrorKind::NotContained);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_siblings_finish_when_one_fails() {
        let f = fixture(&[("root", &["bad", "good"]), ("bad", &[]), ("good", &[])]);
        f.transport.route("/p/bad", 500, &b"boom"[..]);

        let err = f.loader.load_asset("root.txt", None).await.unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::FailedToLoadDependentBundles);
        assert!(err.to_string().contains("package:bad"));
        assert!(f.loader.is_resident_in_memory("good"));
        assert!(!f.loader.is_resident_in_memory("bad"));
    }

    #[tokio::test]
    async fn test_cycle_reports_chain() {
        let f = fixture(&[("a", &["b"]), ("b", &["a"])]);
        let err = tokio::time::timeout(Duration::from_secs(5), f.loader.load_asset("a.txt", None))
            .await
            .expect("cycle must not hang")
            .unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::FailedToLoadDependentBundles);
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[tokio::test]
    async fn test_diamond_downloads_shared_dependency_once() {
        let f = fixture(&[
            ("top", &["left", "right"]),
            ("left", &["shared"]),
            ("right", &["shared"]),
            ("shared", &[]),
        ]);
        f.transport.set_latency(Duration::from_millis(10));

        f.loader.load_asset("top.txt", None).await.unwrap();
        assert_eq!(f.transport.hits("/p/shared"), 1);
        assert_eq!(f.loader.resident_package_names().len(), 4);
    }

    #[tokio::test]
    async fn test_diamond_ladder_settles_each_package_once() {
        // l_i -> [a_{i+1}, b_{i+1}] and a_i, b_i -> l_i: 2^n paths reach l_n.
        const DEPTH: usize = 20;
        let names: Vec<(String, Vec<String>)> = (0..=DEPTH)
            .flat_map(|i| {
                let ladder = if i < DEPTH {
                    vec![format!("a{}", i + 1), format!("b{}", i + 1)]
                } else {
                    Vec::new()
                };
                let mut level = vec![(format!("l{i}"), ladder)];
                if i > 0 {
                    level.push((format!("a{i}"), vec![format!("l{i}")]));
                    level.push((format!("b{i}"), vec![format!("l{i}")]));
                }
                level
            })
            .collect();
        let specs: Vec<(&str, Vec<&str>)> = names
            .iter()
            .map(|(name, deps)| (name.as_str(), deps.iter().map(String::as_str).collect()))
            .collect();
        let specs: Vec<(&str, &[&str])> = specs
            .iter()
            .map(|(name, deps)| (*name, deps.as_slice()))
            .collect();
        let f = fixture(&specs);
        f.transport.set_latency(Duration::from_millis(5));

        tokio::time::timeout(Duration::from_secs(10), f.loader.load_asset("l0.txt", None))
            .await
            .expect("shared sub-graphs must not multiply work")
            .unwrap();

        assert_eq!(f.loader.resident_package_names().len(), 3 * DEPTH + 1);
        assert_eq!(f.transport.hits(&format!("/p/l{DEPTH}")), 1);
    }

    #[tokio::test]
    async fn test_cycle_reached_from_two_paths_fails() {
        let f = fixture(&[("root", &["x", "y"]), ("x", &["y"]), ("y", &["x"])]);
        f.transport.set_latency(Duration::from_millis(5));

        let err = tokio::time::timeout(Duration::from_secs(5), f.loader.load_asset("root.txt", None))
            .await
            .expect("cycle must not hang")
            .unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::FailedToLoadDependentBundles);
        assert!(err.to_string().contains("root -> x -> y -> x"));
        for name in ["root", "x", "y"] {
            assert!(f.loader.is_resident_in_memory(name), "{name} not resident");
        }
    }

    #[tokio::test]
    async fn test_unreadable_package_is_download_failure() {
        let f = fixture(&[("broken", &[])]);
        let body = Bytes::from_static(b"[1, 2, 3]");
        let entry = PackageEntry::new("broken", Sha256Checksum.checksum(&body))
            .with_assets(["broken.txt"]);
        f.transport.route("/p/broken", 200, body);
        f.loader
            .install_catalog(Arc::new(Catalog::new("main", "2", vec![entry]).unwrap()));

        let err = f.loader.load_asset("broken.txt", None).await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::DownloadFailed {
                source: FetchError::Unreadable { .. },
                ..
            }
        ));
        assert!(!f.loader.ledger.is_in_flight("broken"));
    }
}
