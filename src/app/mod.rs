//! Core application logic for the URL cache
//!
//! This module contains the on-disk cache, the digest type used for change
//! detection and the retrieval layer that fills the cache from byte sources.

pub mod cache;
pub mod hash;
pub mod retrieval;

// Re-export main public API
pub use cache::{CacheConfig, CacheReader, CacheStats, PartialWriter, ResourcePaths, UrlCache};
pub use hash::Md5Hash;
pub use retrieval::{
    CachePolicy, FileSource, ResourceSource, RetrievalData, RetrievalResult, Retriever,
    RetrieverConfig,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        // Ensure public API is accessible
        let config = CacheConfig::default();
        assert!(config.shared_permissions);
        assert_eq!(RetrieverConfig::default().policy, CachePolicy::Revalidate);
    }
}
