//! Retriever configuration types and defaults

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How the retriever treats an existing complete cache entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    /// Serve a complete entry without contacting the source
    PreferCache,
    /// Always ask the source, passing the cached modification time as a hint
    #[default]
    Revalidate,
    /// Fetch into memory and leave the cache untouched
    NoStore,
}

/// Configuration for the retriever
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrieverConfig {
    /// Cache policy applied to every retrieval
    pub policy: CachePolicy,
}

impl RetrieverConfig {
    /// Create a configuration with the given policy
    pub fn with_policy(policy: CachePolicy) -> Self {
        Self { policy }
    }
}
