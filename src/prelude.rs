//! Prelude module for the URL cache library
//!
//! This module re-exports the most commonly used items from the library,
//! so a typical integration needs a single `use url_cache::prelude::*;`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use url_cache::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let cache = Arc::new(UrlCache::new(CacheConfig::default()).await?);
//!     let retriever = Retriever::new(cache, RetrieverConfig::default());
//!
//!     let url = Url::parse("https://example.org/tile.png")
//!         .map_err(|e| AppError::generic(e.to_string()))?;
//!     let result = retriever.retrieve(&url, &FileSource::new("tile.png")).await;
//!     println!("from cache: {}", result.is_from_cache());
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, CacheError, RetrievalError, Result};

// Essential app components that are used in most integrations
pub use crate::app::{
    CacheConfig, CachePolicy, CacheStats, FileSource, Md5Hash, ResourceSource, RetrievalData,
    RetrievalResult, Retriever, RetrieverConfig, UrlCache,
};
pub use crate::app::retrieval::{SourceBody, SourceRequest, SourceResponse};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

// Common external crate re-exports for convenience
pub use tokio;
pub use url::Url;
