//! Catalog domain types.
//!
//! A catalog is the versioned, identity-scoped manifest that lists every
//! package a server offers, the assets inside each package and the
//! dependencies between packages. Catalogs are immutable once constructed;
//! a newer version replaces the active one, it never mutates in place.
//!
//! # Structure
//!
//! - `types` - `Catalog` and `PackageEntry`
//! - `manifest` - serialized forms (`CatalogManifest`, `PreloadList`)
//! - `errors` - validation and parse errors

mod errors;
mod manifest;
mod types;

pub use errors::CatalogError;
pub use manifest::{CatalogManifest, PreloadList};
pub use types::{Catalog, PackageEntry};
