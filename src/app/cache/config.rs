//! Cache configuration types and defaults
//!
//! This module contains the configuration structure for the URL cache,
//! including default values and builder methods.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the URL cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root directory for cache storage (OS-specific if None)
    pub cache_root: Option<PathBuf>,
    /// Make cache files readable and writable by every user
    ///
    /// Lets several accounts share one cache directory.
    pub shared_permissions: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_root: None, // Will use OS-specific cache directory
            shared_permissions: true,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with custom cache root
    pub fn with_cache_root(cache_root: PathBuf) -> Self {
        Self {
            cache_root: Some(cache_root),
            ..Default::default()
        }
    }

    /// Enable or disable broad file permissions
    pub fn with_shared_permissions(mut self, enabled: bool) -> Self {
        self.shared_permissions = enabled;
        self
    }
}
