//! Data directory resolution.
//!
//! Resolution order for the data root:
//! 1. `BUNDLEKIT_DATA_DIR` environment variable
//! 2. Platform data directory (e.g. `~/.local/share/bundlekit`)

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "BUNDLEKIT_DATA_DIR";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    /// Could not determine the system data directory.
    #[error("Cannot determine system data directory")]
    NoDataDir,

    /// Failed to create a directory.
    #[error("Failed to create directory {path}: {reason}")]
    CreateFailed { path: PathBuf, reason: String },
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, PathError> {
    if !path.exists() {
        fs::create_dir_all(&path).map_err(|e| PathError::CreateFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(path)
}

/// Root directory for settings, catalogs and cached packages.
pub fn data_root() -> Result<PathBuf, PathError> {
    if let Ok(path) = env::var(DATA_DIR_ENV) {
        return Ok(PathBuf::from(path));
    }
    let data_dir = dirs::data_local_dir().ok_or(PathError::NoDataDir)?;
    ensure_dir(data_dir.join("bundlekit"))
}

/// Location of `settings.json`.
pub fn settings_path(root: &Path) -> PathBuf {
    root.join("settings.json")
}

/// Location of the `.env` file holding user overrides.
pub fn env_file_path(root: &Path) -> PathBuf {
    root.join(".env")
}

/// Location of the resource manifest.
pub fn manifest_path(root: &Path) -> PathBuf {
    root.join("resources.json")
}

/// Directory holding one file per stored catalog. Created if missing.
pub fn catalogs_dir(root: &Path) -> Result<PathBuf, PathError> {
    ensure_dir(root.join("catalogs"))
}

/// Directory holding versioned package blobs. Created if missing.
pub fn cache_dir(root: &Path) -> Result<PathBuf, PathError> {
    ensure_dir(root.join("cache"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_derived_paths_live_under_root() {
        let temp = tempdir().unwrap();
        let root = temp.path();

        let catalogs = catalogs_dir(root).unwrap();
        let cache = cache_dir(root).unwrap();
        assert!(catalogs.is_dir());
        assert!(cache.is_dir());
        assert_eq!(settings_path(root), root.join("settings.json"));
        assert_eq!(manifest_path(root), root.join("resources.json"));
        assert_eq!(env_file_path(root), root.join(".env"));
    }
}
