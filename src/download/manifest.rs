//! Manifest file format for batched downloads.
//!
//! A manifest is a JSON object with an `items` array; each entry carries a
//! source URL and a destination path relative to the Drive root, plus an
//! optional expected checksum and header overrides.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reading or parsing a manifest file.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Filesystem failure reading the manifest.
    #[error("IO error reading manifest {path}: {source}")]
    Io {
        /// The manifest path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid JSON of the expected shape.
    #[error("invalid manifest {path}: {source}")]
    Parse {
        /// The manifest path.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// A single download described by a manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadItem {
    /// Source URL.
    pub url: String,
    /// Destination path relative to the Drive root.
    pub destination: String,
    /// Expected SHA-256 of the final file, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// Request header overrides (e.g. auth tokens for gated models).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

impl DownloadItem {
    /// Creates an item with just the required fields.
    #[must_use]
    pub fn new(url: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            sha256: None,
            headers: None,
        }
    }
}

/// An ordered list of downloads fetched as a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Items in run order.
    #[serde(default)]
    pub items: Vec<DownloadItem>,
}

impl Manifest {
    /// Reads a manifest from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] if the file cannot be read and
    /// [`ManifestError::Parse`] if it does not match the manifest shape.
    pub async fn from_json(path: &Path) -> Result<Self, ManifestError> {
        let raw = tokio::fs::read(path).await.map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&raw).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns the indices of `items` entries missing a required key.
    ///
    /// Operates on raw JSON so malformed entries are reported by position
    /// instead of failing the whole document.
    #[must_use]
    pub fn missing_required(value: &serde_json::Value) -> Vec<usize> {
        let Some(items) = value.get("items").and_then(serde_json::Value::as_array) else {
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                item.get("url").and_then(serde_json::Value::as_str).is_none()
                    || item
                        .get("destination")
                        .and_then(serde_json::Value::as_str)
                        .is_none()
            })
            .map(|(index, _)| index)
            .collect()
    }
}
