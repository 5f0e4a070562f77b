//! CLI configuration
//!
//! This module handles hierarchical configuration loading from multiple sources:
//! - Default configuration file
//! - Environment-specific configuration file
//! - Environment variables
//! - Command-line arguments (applied by `main`)

use config::{Config, ConfigError, Environment, File};
use lod_registry_service::RegistryConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// lodctl configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Registry tunables
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Chain storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Collection catalog settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where chains are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Chains and events live only for the duration of one invocation; for
    /// dry runs and tests
    Memory,
    /// One JSON document per collection under `storage.path`, plus a
    /// JSON-lines event log in the same directory
    JsonFile,
}

/// Chain storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,

    /// Directory for the `json_file` backend
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

fn default_backend() -> StorageBackend {
    StorageBackend::JsonFile
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("data/chains")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_storage_path(),
        }
    }
}

/// Collection catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON manifest of collections and their assets; absent means open
    #[serde(default)]
    pub manifest: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON formatting
    #[serde(default)]
    pub json_format: bool,

    /// Include timestamps
    #[serde(default = "default_true")]
    pub include_timestamps: bool,

    /// Include thread IDs
    #[serde(default)]
    pub include_thread_ids: bool,

    /// Include target module
    #[serde(default = "default_true")]
    pub include_target: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            include_timestamps: true,
            include_thread_ids: false,
            include_target: true,
        }
    }
}

impl CliConfig {
    /// Load configuration from files and environment
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default configuration file (config/default.toml)
    /// 2. Environment-specific file (config/{env}.toml)
    /// 3. Environment variables (LOD_REGISTRY_*)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or parsed
    pub fn load(config_dir: impl Into<PathBuf>, environment: &str) -> Result<Self, ConfigError> {
        let config_dir = config_dir.into();

        let config = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", environment))).required(false),
            )
            // e.g., LOD_REGISTRY_REGISTRY__LOCK_TIMEOUT_MS=250
            .add_source(
                Environment::with_prefix("LOD_REGISTRY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.storage.backend, StorageBackend::JsonFile);
        assert_eq!(config.storage.path, PathBuf::from("data/chains"));
        assert!(config.catalog.manifest.is_none());
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.registry.lock_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_load_layers_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            "[storage]\nbackend = \"json_file\"\npath = \"/tmp/chains\"\n\n[registry]\nlock_timeout_ms = 900\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("test.toml"),
            "[storage]\nbackend = \"memory\"\n\n[catalog]\nmanifest = \"catalog.json\"\n",
        )
        .unwrap();

        let config = CliConfig::load(dir.path(), "test").unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.path, PathBuf::from("/tmp/chains"));
        assert_eq!(config.catalog.manifest, Some(PathBuf::from("catalog.json")));
        assert_eq!(config.registry.lock_timeout_ms, 900);
        assert_eq!(config.registry.event_capacity, 10_000);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            "[storage]\nbackend = \"json_flie\"\n",
        )
        .unwrap();
        assert!(CliConfig::load(dir.path(), "test").is_err());

        std::fs::write(dir.path().join("default.toml"), "[storage\npath = ").unwrap();
        assert!(CliConfig::load(dir.path(), "test").is_err());
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load(dir.path(), "nowhere").unwrap();
        assert_eq!(config.storage.backend, StorageBackend::JsonFile);
    }
}
