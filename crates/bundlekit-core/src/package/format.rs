//! Package format port and the default JSON format.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::asset::{Asset, ExtractionError};

/// Failure to open downloaded bytes as a package.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// The payload was empty.
    #[error("package '{package}' is empty")]
    Empty {
        /// Package name.
        package: String,
    },

    /// The payload is not a valid package.
    #[error("package '{package}' is invalid: {reason}")]
    Invalid {
        /// Package name.
        package: String,
        /// Decoder message.
        reason: String,
    },
}

/// An opened package whose assets can be extracted by name.
pub trait PackageArchive: Send + Sync {
    /// Names of the assets present in the archive.
    fn asset_names(&self) -> Vec<String>;

    /// Extract one asset.
    fn extract(&self, asset: &str) -> Result<Asset, ExtractionError>;
}

/// Opens downloaded bytes into an archive.
pub trait PackageFormat: Send + Sync {
    /// Open `bytes` as the package named `package`.
    fn open(&self, package: &str, bytes: Bytes) -> Result<Box<dyn PackageArchive>, FormatError>;
}

/// Stored representation of one asset in a JSON package.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum StoredAsset {
    Text { value: String },
    Binary { base64: String },
    Json { value: serde_json::Value },
}

/// Default package format: a JSON object mapping asset names to tagged values.
///
/// ```json
/// {
///   "title.txt": {"kind": "text", "value": "hello"},
///   "icon.png": {"kind": "binary", "base64": "iVBORw0..."},
///   "level.json": {"kind": "json", "value": {"width": 12}}
/// }
/// ```
///
/// Asset entries are decoded lazily, so a single malformed entry fails only
/// the extraction that touches it.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPackageFormat;

impl PackageFormat for JsonPackageFormat {
    fn open(&self, package: &str, bytes: Bytes) -> Result<Box<dyn PackageArchive>, FormatError> {
        if bytes.is_empty() {
            return Err(FormatError::Empty {
                package: package.to_string(),
            });
        }
        let entries: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(&bytes)
            .map_err(|e| FormatError::Invalid {
                package: package.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Box::new(JsonArchive {
            package: package.to_string(),
            entries,
        }))
    }
}

struct JsonArchive {
    package: String,
    entries: serde_json::Map<String, serde_json::Value>,
}

impl PackageArchive for JsonArchive {
    fn asset_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn extract(&self, asset: &str) -> Result<Asset, ExtractionError> {
        let raw = self
            .entries
            .get(asset)
            .ok_or_else(|| ExtractionError::Missing {
                asset: asset.to_string(),
                package: self.package.clone(),
            })?;

        let corrupt = |reason: String| ExtractionError::Corrupt {
            asset: asset.to_string(),
            reason,
        };

        match StoredAsset::deserialize(raw).map_err(|e| corrupt(e.to_string()))? {
            StoredAsset::Text { value } => Ok(Asset::Text(value)),
            StoredAsset::Json { value } => Ok(Asset::Json(value)),
            StoredAsset::Binary { base64 } => STANDARD
                .decode(base64.as_bytes())
                .map(|decoded| Asset::Binary(Bytes::from(decoded)))
                .map_err(|e| corrupt(e.to_string())),
        }
    }
}

/// Encode assets into the default JSON package format.
pub fn build_json_package<I, S>(assets: I) -> Bytes
where
    I: IntoIterator<Item = (S, Asset)>,
    S: Into<String>,
{
    let mut entries = serde_json::Map::new();
    for (name, asset) in assets {
        let stored = match asset {
            Asset::Text(value) => StoredAsset::Text { value },
            Asset::Json(value) => StoredAsset::Json { value },
            Asset::Binary(bytes) => StoredAsset::Binary {
                base64: STANDARD.encode(&bytes),
            },
        };
        // Serializing a tagged enum of strings and JSON values cannot fail
        let value = serde_json::to_value(stored).unwrap_or(serde_json::Value::Null);
        entries.insert(name.into(), value);
    }
    Bytes::from(serde_json::Value::Object(entries).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_extract_each_kind() {
        let bytes = build_json_package([
            ("a.txt", Asset::Text("hi".to_string())),
            ("b.bin", Asset::Binary(Bytes::from_static(&[1, 2, 3]))),
            ("c.json", Asset::Json(serde_json::json!({"k": 1}))),
        ]);
        let archive = JsonPackageFormat.open("p", bytes).unwrap();

        assert_eq!(archive.extract("a.txt").unwrap(), Asset::Text("hi".to_string()));
        assert_eq!(
            archive.extract("b.bin").unwrap(),
            Asset::Binary(Bytes::from_static(&[1, 2, 3]))
        );
        assert_eq!(
            archive.extract("c.json").unwrap(),
            Asset::Json(serde_json::json!({"k": 1}))
        );
        let mut names = archive.asset_names();
        names.sort();
        assert_eq!(names, vec!["a.txt", "b.bin", "c.json"]);
    }

    #[test]
    fn test_missing_asset() {
        let archive = JsonPackageFormat
            .open("p", build_json_package(Vec::<(String, Asset)>::new()))
            .unwrap();
        assert!(matches!(
            archive.extract("nope"),
            Err(ExtractionError::Missing { .. })
        ));
    }

    #[test]
    fn test_malformed_entry_is_corrupt() {
        let bytes = Bytes::from_static(br#"{"x": {"kind": "binary", "base64": "***"}}"#);
        let archive = JsonPackageFormat.open("p", bytes).unwrap();
        assert!(matches!(
            archive.extract("x"),
            Err(ExtractionError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_open_rejects_empty_and_non_object() {
        assert!(matches!(
            JsonPackageFormat.open("p", Bytes::new()),
            Err(FormatError::Empty { .. })
        ));
        assert!(matches!(
            JsonPackageFormat.open("p", Bytes::from_static(b"[1,2]")),
            Err(FormatError::Invalid { .. })
        ));
    }
}
