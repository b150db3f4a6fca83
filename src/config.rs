//! Configuration management for the URL cache
//!
//! This module loads the optional TOML configuration file and converts it
//! into the runtime configuration of the cache and the retriever. Every
//! setting has a default, so a missing file or a partial one is fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{CacheConfig, CachePolicy, RetrieverConfig};
use crate::constants::app::{APP_NAME, CONFIG_FILE, LOCAL_CONFIG_FILE};
use crate::errors::{ConfigError, Result};

/// Log levels accepted in the `[logging]` section
const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Cache storage settings
    pub cache: CacheConfigToml,
    /// Retrieval settings
    pub retrieval: RetrievalConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfigToml {
    /// Cache directory path (system cache directory if unset)
    pub cache_root: Option<PathBuf>,
    /// Make cache files readable and writable by every user
    pub shared_permissions: bool,
}

impl Default for CacheConfigToml {
    fn default() -> Self {
        Self {
            cache_root: None,
            shared_permissions: true,
        }
    }
}

/// TOML-friendly retrieval configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfigToml {
    /// `prefer-cache`, `revalidate` or `no-store`
    pub policy: CachePolicy,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl AppConfig {
    /// Convert to runtime configuration structs
    pub fn to_runtime_config(&self) -> (CacheConfig, RetrieverConfig) {
        (
            self.cache.to_runtime_config(),
            self.retrieval.to_runtime_config(),
        )
    }

    /// Load configuration from file or use defaults
    ///
    /// An explicit path must exist. Without one the standard locations are
    /// searched and defaults are used when none holds a file.
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path }.into());
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but make no sense
    pub fn validate(&self) -> Result<()> {
        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: self.logging.level.clone(),
                reason: format!("Expected one of: {}", LOG_LEVELS.join(", ")),
            }
            .into());
        }
        Ok(())
    }

    /// Find the first existing config file in the standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(".").join(LOCAL_CONFIG_FILE)];
        if let Some(path) = Self::get_default_config_path() {
            search_paths.push(path);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        if let Some(path) = &found {
            debug!("Found config file: {}", path.display());
        }
        found
    }

    /// User config path, e.g. ~/.config/url-cache/config.toml on Linux
    pub fn get_default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }

    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::from)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }
}

impl CacheConfigToml {
    pub fn to_runtime_config(&self) -> CacheConfig {
        CacheConfig {
            cache_root: self.cache_root.clone(),
            shared_permissions: self.shared_permissions,
        }
    }
}

impl RetrievalConfigToml {
    pub fn to_runtime_config(&self) -> RetrieverConfig {
        RetrieverConfig::with_policy(self.policy)
    }
}
