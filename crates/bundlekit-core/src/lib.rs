#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

pub mod catalog;
pub mod errors;
pub mod package;
pub mod paths;
pub mod ports;
pub mod settings;

#[cfg(feature = "test-utils")]
pub mod testing;

// Re-export commonly used types for convenience
pub use catalog::{Catalog, CatalogError, CatalogManifest, PackageEntry, PreloadList};
pub use errors::{
    DependencyFailure, FetchError, HTTP_CANCELLED_CODE, HTTP_TIMEOUT_CODE, LoadError,
    LoadErrorKind, LoadResult,
};
pub use package::{
    Asset, AssetKind, ExtractionError, FormatError, FromAsset, JsonPackageFormat, PackageArchive,
    PackageFormat, build_json_package,
};
pub use paths::{
    PathError, cache_dir, catalogs_dir, data_root, env_file_path, manifest_path, settings_path,
};
pub use ports::{
    CacheError, CatalogStorePort, ChecksumPort, DefaultResponseClassifier, DiskCachePort,
    HeaderList, HttpRequest, HttpResponse, NoAuth, RequestAuthPort, ResourceInfo,
    ResourceManifestPort, ResponseClassifier, ResponseContext, ResponseVerdict, Sha256Checksum,
    StaticHeaders, TransportError, TransportPort,
};
pub use settings::{
    DEFAULT_CACHE_POLL_INTERVAL_MS, DEFAULT_MAX_PARALLEL_PRELOADS, DEFAULT_TIMEOUT_SECS, Settings,
    SettingsError, validate_settings,
};
