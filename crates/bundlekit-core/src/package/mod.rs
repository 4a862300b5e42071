//! Package content: assets, extraction and the package format port.
//!
//! The binary layout of a package belongs to whoever produces packages. The
//! loader only needs to open downloaded bytes into a [`PackageArchive`] and
//! pull named assets out of it; [`PackageFormat`] is that seam.

mod asset;
mod format;

pub use asset::{Asset, AssetKind, ExtractionError, FromAsset};
pub use format::{
    FormatError, JsonPackageFormat, PackageArchive, PackageFormat, build_json_package,
};
