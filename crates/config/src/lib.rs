//! Layered configuration.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults.
//! 2. A config file: the path given on the command line, otherwise
//!    `<config_dir>/marquee/config.toml` if it exists. YAML and JSON files
//!    are read by extension.
//! 3. Environment variables `MARQUEE_<SECTION>__<KEY>`, e.g.
//!    `MARQUEE_VERIFY__MODE=tolerant`.

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "MARQUEE_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub snapshot: SnapshotConfig,
    pub manifest: ManifestConfig,
    pub verify: VerifyConfig,
    pub source: SourceConfig,
}

/// How mis-filed episodes are recognised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub series_category: String,
    pub episode_delimiter: String,
    pub series_description_prefix: String,
}
impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            series_category: "TV Series".to_string(),
            episode_delimiter: " S".to_string(),
            series_description_prefix: "TV Series: ".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub filename: String,
    pub compact: bool,
}
impl Default for SnapshotConfig {
    fn default() -> Self {
        Self { filename: "playlist.db".to_string(), compact: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    pub filename: String,
    pub base_url: String,
    pub chunk_size: usize,
    pub force_update: bool,
    pub min_app_version: String,
    pub recommended_update: bool,
}
impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            filename: "manifest.json".to_string(),
            base_url: String::new(),
            chunk_size: 8192,
            force_update: false,
            min_app_version: "1.0.0".to_string(),
            recommended_update: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    #[default]
    Strict,
    Tolerant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub mode: VerifyMode,
    /// Relative size difference accepted by tolerant verification.
    pub tolerance: f64,
}
impl Default for VerifyConfig {
    fn default() -> Self {
        Self { mode: VerifyMode::Strict, tolerance: 0.10 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Catalog location used by `build` when no input is given.
    pub url: String,
}

impl Config {
    /// `<config_dir>/marquee/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("marquee").join("config.toml"))
    }

    /// All sources merged, not yet extracted.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn figment(path: Option<&Path>) -> Figment {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let figment = match path {
            Some(path) => match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
                Some("json") => figment.merge(Json::file_exact(path)),
                _ => figment.merge(Toml::file_exact(path)),
            },
            None => match Self::default_path() {
                Some(path) => figment.merge(Toml::file(path)),
                None => figment,
            },
        };
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate the configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(path))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            (&self.catalog.series_category, "catalog.series_category"),
            (&self.catalog.episode_delimiter, "catalog.episode_delimiter"),
            (&self.snapshot.filename, "snapshot.filename"),
            (&self.manifest.filename, "manifest.filename"),
        ];
        for (value, field) in required {
            if value.is_empty() {
                exn::bail!(ErrorKind::Invalid(field));
            }
        }
        if self.manifest.chunk_size == 0 {
            exn::bail!(ErrorKind::Invalid("manifest.chunk_size"));
        }
        if !(self.verify.tolerance.is_finite() && self.verify.tolerance > 0.0) {
            exn::bail!(ErrorKind::Invalid("verify.tolerance"));
        }
        Ok(())
    }
}
