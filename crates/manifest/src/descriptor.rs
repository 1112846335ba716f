//! The manifest wire format.
//!
//! Clients key their comparisons off these field names, so they must not
//! change. Deserialization also accepts the camelCase spellings some older
//! tooling wrote for the size fields.

use crate::error::{ErrorKind, Result, map_io_error};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Identity of one published snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestDescriptor {
    /// Opaque version tag. Compared by equality only.
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: String,
    pub database: DatabaseInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ManifestMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_info: Option<UpdateInfo>,
}

/// The `database` block: where the artifact lives and what its bytes are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub filename: String,
    /// Empty until the artifact has a hosting location.
    #[serde(default)]
    pub url: String,
    #[serde(alias = "sizeBytes")]
    pub size_bytes: u64,
    /// Size in MiB, rounded to two decimals. Informational only.
    #[serde(default, alias = "sizeMb")]
    pub size_mb: f64,
    /// Lowercase hex SHA-256 of the exact artifact bytes.
    pub hash: String,
    #[serde(default, alias = "modifiedTime")]
    pub modified_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub total_entries: usize,
    /// Record count per main-category.
    #[serde(default)]
    pub categories: BTreeMap<String, usize>,
    /// BLAKE3 of the logical record content, independent of file layout.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content_fingerprint: String,
    #[serde(default)]
    pub last_updated: String,
}

/// Hints for the client about how urgently to apply this snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateInfo {
    pub force_update: bool,
    pub min_app_version: String,
    pub recommended_update: bool,
}
impl Default for UpdateInfo {
    fn default() -> Self {
        Self {
            force_update: false,
            min_app_version: "1.0.0".to_string(),
            recommended_update: true,
        }
    }
}

impl ManifestDescriptor {
    pub fn from_slice(bytes: impl AsRef<[u8]>) -> Result<Self> {
        serde_json::from_slice(bytes.as_ref()).or_raise(|| ErrorKind::InvalidManifest)
    }

    /// Pretty-printed JSON, as published.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).or_raise(|| ErrorKind::InvalidManifest)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| map_io_error(e, path))?;
        Self::from_slice(bytes)
    }

    /// Write next to `path`, then rename over it, so readers only ever see a
    /// complete document.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        let mut partial = OsString::from(path.as_os_str());
        partial.push(".partial");
        let partial = PathBuf::from(partial);
        tokio::fs::write(&partial, json).await.map_err(|e| map_io_error(e, &partial))?;
        tokio::fs::rename(&partial, path).await.map_err(|e| map_io_error(e, path))
    }
}
