#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

mod catalog_store;
mod disk_cache;
mod encode;
mod resource_manifest;

pub use catalog_store::{FsCatalogStore, MemoryCatalogStore};
pub use disk_cache::{FsDiskCache, MemoryDiskCache};
pub use resource_manifest::{FsResourceManifest, MemoryResourceManifest};
