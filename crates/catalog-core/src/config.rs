//! Configuration types for catalog search.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{CatalogError, Result};

/// Main configuration for catalog search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Embedding configuration.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Search configuration.
    #[serde(default)]
    pub search: SearchConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Name of the product collection.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            collection: default_collection(),
            busy_timeout_ms: 30000,
        }
    }
}

/// Which embedding implementation to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Deterministic hash-based vectors, no model files needed.
    #[default]
    Mock,
    /// ONNX Runtime sentence embedding model.
    Onnx,
}

/// Embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Backend to use.
    #[serde(default)]
    pub backend: EmbeddingBackend,

    /// Path to the ONNX model file.
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Path to the tokenizer.json file.
    #[serde(default = "default_tokenizer_path")]
    pub tokenizer_path: PathBuf,

    /// Embedding dimension.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Maximum tokens fed to the model per text.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Number of threads for CPU inference.
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Mock,
            model_path: default_model_path(),
            tokenizer_path: default_tokenizer_path(),
            dimension: 768,
            max_tokens: 512,
            num_threads: 4,
        }
    }
}

/// Upper bound on the number of products a search returns.
pub const MAX_RESULTS_LIMIT: usize = 10;

/// Search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Nearest-neighbor candidates requested from the store.
    #[serde(default = "default_embedding_candidates")]
    pub embedding_candidates: usize,

    /// Maximum number of results returned, at most [`MAX_RESULTS_LIMIT`].
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            embedding_candidates: 100,
            max_results: MAX_RESULTS_LIMIT,
        }
    }
}

impl SearchConfig {
    /// Check the limits are usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_results == 0 || self.max_results > MAX_RESULTS_LIMIT {
            return Err(CatalogError::Config {
                message: format!(
                    "search.max_results must be between 1 and {}, got {}",
                    MAX_RESULTS_LIMIT, self.max_results
                ),
            });
        }
        Ok(())
    }
}

// Default value functions

fn default_collection() -> String {
    "products".to_string()
}

fn default_busy_timeout() -> u32 {
    30000
}

fn default_dimension() -> usize {
    768
}

fn default_max_tokens() -> usize {
    512
}

fn default_num_threads() -> usize {
    4
}

fn default_embedding_candidates() -> usize {
    100
}

fn default_max_results() -> usize {
    MAX_RESULTS_LIMIT
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("catalog")
}

fn default_database_path() -> PathBuf {
    data_dir().join("catalog.db")
}

fn default_model_path() -> PathBuf {
    data_dir().join("models").join("model.onnx")
}

fn default_tokenizer_path() -> PathBuf {
    data_dir().join("models").join("tokenizer.json")
}

impl CatalogConfig {
    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| CatalogError::Config {
            message: format!("Failed to parse config: {}", e),
        })?;
        config.search.validate()?;
        Ok(config)
    }

    /// Load configuration from default paths.
    pub fn load_default() -> Result<Self> {
        // Try user config first
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("catalog").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        // Try local config
        let local_config = PathBuf::from("catalog.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }
}

/// Preferences the search client keeps between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Restrict results to direct matches (no recommendations).
    #[serde(rename = "exactOnly", default)]
    pub exact_only: bool,
}

/// Client settings bound to the JSON file they persist in.
///
/// Only written back when something changed, or when the file was missing
/// or unreadable and had to be reset.
#[derive(Debug)]
pub struct SettingsFile {
    path: PathBuf,
    settings: ClientSettings,
    dirty: bool,
}

impl SettingsFile {
    /// Load settings, falling back to defaults for a missing or malformed file.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.is_file() {
            debug!("No settings at {:?}, using defaults", path);
            return Ok(Self {
                path,
                settings: ClientSettings::default(),
                dirty: true,
            });
        }

        let content = std::fs::read_to_string(&path)?;
        match serde_json::from_str::<ClientSettings>(&content) {
            Ok(settings) => Ok(Self {
                path,
                settings,
                dirty: false,
            }),
            Err(e) => {
                warn!("Malformed settings data in {:?}, resetting: {}", path, e);
                Ok(Self {
                    path,
                    settings: ClientSettings::default(),
                    dirty: true,
                })
            }
        }
    }

    /// Default settings location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("catalog")
            .join("settings.json")
    }

    /// Current settings.
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// File the settings persist in.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Change the exact-only preference.
    pub fn set_exact_only(&mut self, exact_only: bool) {
        self.settings.exact_only = exact_only;
        self.dirty = true;
    }

    /// Write the settings if they changed. Returns whether a write happened.
    pub fn save_if_dirty(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string(&self.settings)?)?;
        self.dirty = false;

        debug!("Saved settings to {:?}", self.path);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CatalogConfig::default();
        assert_eq!(config.search.max_results, 10);
        assert_eq!(config.search.embedding_candidates, 100);
        assert_eq!(config.database.collection, "products");
        assert_eq!(config.embedding.backend, EmbeddingBackend::Mock);
    }

    #[test]
    fn test_partial_toml() {
        let config: CatalogConfig = toml::from_str(
            r#"
            [embedding]
            backend = "onnx"
            dimension = 384

            [search]
            max_results = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.embedding.backend, EmbeddingBackend::Onnx);
        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(config.embedding.num_threads, 4);
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.search.embedding_candidates, 100);
        assert_eq!(config.database.collection, "products");
    }

    #[test]
    fn test_load_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "search = 12").unwrap();

        let err = CatalogConfig::load(&path).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_load_rejects_oversized_result_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "[search]\nmax_results = 25\n").unwrap();
        let err = CatalogConfig::load(&path).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
        assert!(err.to_string().contains("max_results"));

        std::fs::write(&path, "[search]\nmax_results = 0\n").unwrap();
        assert!(CatalogConfig::load(&path).is_err());

        std::fs::write(&path, "[search]\nmax_results = 10\n").unwrap();
        assert_eq!(CatalogConfig::load(&path).unwrap().search.max_results, 10);
    }

    #[test]
    fn test_settings_missing_file_is_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = SettingsFile::load(dir.path().join("settings.json")).unwrap();

        assert!(!file.settings().exact_only);
        assert!(file.is_dirty());
        assert!(file.save_if_dirty().unwrap());
        assert!(!file.save_if_dirty().unwrap());
    }

    #[test]
    fn test_settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut file = SettingsFile::load(&path).unwrap();
        file.set_exact_only(true);
        file.save_if_dirty().unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            r#"{"exactOnly":true}"#
        );

        let reloaded = SettingsFile::load(&path).unwrap();
        assert!(reloaded.settings().exact_only);
        assert!(!reloaded.is_dirty());
    }

    #[test]
    fn test_settings_malformed_resets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"exactOnly": "yes"}"#).unwrap();

        let file = SettingsFile::load(&path).unwrap();
        assert_eq!(file.settings(), &ClientSettings::default());
        assert!(file.is_dirty());
    }
}
