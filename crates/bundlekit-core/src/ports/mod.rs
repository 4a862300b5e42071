//! Port definitions (trait abstractions) for external collaborators.
//!
//! The loader treats the network, persistent storage, hashing and
//! authentication as opaque services. Each one is a trait here; adapters
//! live in `bundlekit-store` and `bundlekit-http`.
//!
//! # Design Rules
//!
//! - No `reqwest` or filesystem types in any signature
//! - Storage ports fail soft where callers need a boolean answer
//! - Auth is reduced to "headers for this request" and "a 401 happened"

pub mod auth;
pub mod catalog_store;
pub mod checksum;
pub mod classifier;
pub mod disk_cache;
pub mod resource_manifest;
pub mod transport;

pub use auth::{NoAuth, RequestAuthPort, StaticHeaders};
pub use catalog_store::CatalogStorePort;
pub use checksum::{ChecksumPort, Sha256Checksum};
pub use classifier::{DefaultResponseClassifier, ResponseClassifier, ResponseContext, ResponseVerdict};
pub use disk_cache::{CacheError, DiskCachePort};
pub use resource_manifest::{ResourceInfo, ResourceManifestPort};
pub use transport::{HeaderList, HttpRequest, HttpResponse, TransportError, TransportPort};
