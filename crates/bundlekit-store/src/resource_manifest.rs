//! Resource manifest adapters.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bundlekit_core::{ResourceInfo, ResourceManifestPort};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::encode::write_atomic;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    resources: Vec<ResourceInfo>,
}

impl ManifestFile {
    fn register(&mut self, identity: &str) {
        if !self.resources.iter().any(|r| r.identity == identity) {
            self.resources.push(ResourceInfo::new(identity));
        }
    }

    fn record(&mut self, identity: &str, version: &str) {
        self.register(identity);
        if let Some(info) = self.resources.iter_mut().find(|r| r.identity == identity) {
            info.version = Some(version.to_string());
        }
    }

    fn reset(&mut self, identity: &str) {
        if let Some(info) = self.resources.iter_mut().find(|r| r.identity == identity) {
            info.version = None;
        }
    }
}

/// Resource manifest kept in a single JSON file.
///
/// Updates are read-modify-write under an async lock.
#[derive(Debug)]
pub struct FsResourceManifest {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl FsResourceManifest {
    /// Manifest stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn read_file(&self) -> ManifestFile {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(target: "bundlekit.store", path = %self.path.display(), error = %e, "Ignoring corrupt resource manifest");
                ManifestFile::default()
            }),
            Err(_) => ManifestFile::default(),
        }
    }

    async fn write_file(&self, file: &ManifestFile) -> bool {
        let (Some(dir), Some(name)) = (self.path.parent(), self.path.file_name()) else {
            return false;
        };
        let bytes = match serde_json::to_vec_pretty(file) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(target: "bundlekit.store", error = %e, "Failed to encode resource manifest");
                return false;
            }
        };
        match write_atomic(dir, &name.to_string_lossy(), &bytes).await {
            Ok(()) => true,
            Err(e) => {
                warn!(target: "bundlekit.store", path = %self.path.display(), error = %e, "Failed to write resource manifest");
                false
            }
        }
    }

    async fn update(&self, apply: impl FnOnce(&mut ManifestFile) + Send) -> bool {
        let _guard = self.lock.lock().await;
        let mut file = self.read_file().await;
        apply(&mut file);
        self.write_file(&file).await
    }
}

#[async_trait]
impl ResourceManifestPort for FsResourceManifest {
    async fn resources(&self) -> Vec<ResourceInfo> {
        let _guard = self.lock.lock().await;
        self.read_file().await.resources
    }

    async fn register(&self, identity: &str) -> bool {
        self.update(|file| file.register(identity)).await
    }

    async fn record_version(&self, identity: &str, version: &str) -> bool {
        self.update(|file| file.record(identity, version)).await
    }

    async fn reset(&self, identity: &str) -> bool {
        self.update(|file| file.reset(identity)).await
    }
}

/// Resource manifest held in memory.
#[derive(Debug, Default)]
pub struct MemoryResourceManifest {
    file: Mutex<ManifestFile>,
}

impl MemoryResourceManifest {
    /// Manifest knowing `identities`, none with a version.
    pub fn with_identities<I, S>(identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut file = ManifestFile::default();
        for identity in identities {
            file.register(identity.as_ref());
        }
        Self {
            file: Mutex::new(file),
        }
    }

    fn file(&self) -> MutexGuard<'_, ManifestFile> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ResourceManifestPort for MemoryResourceManifest {
    async fn resources(&self) -> Vec<ResourceInfo> {
        self.file().resources.clone()
    }

    async fn register(&self, identity: &str) -> bool {
        self.file().register(identity);
        true
    }

    async fn record_version(&self, identity: &str, version: &str) -> bool {
        self.file().record(identity, version);
        true
    }

    async fn reset(&self, identity: &str) -> bool {
        self.file().reset(identity);
        true
    }
}
