//! Retrieval of URLs through the cache
//!
//! This module sits between callers and the network layer: callers hand the
//! [`Retriever`] a URL and a [`ResourceSource`], and get back a
//! [`RetrievalResult`] describing where the bytes came from.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use url::Url;
//! use url_cache::app::cache::{CacheConfig, UrlCache};
//! use url_cache::app::retrieval::{FileSource, Retriever, RetrieverConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(UrlCache::new(CacheConfig::default()).await?);
//! let retriever = Retriever::new(cache, RetrieverConfig::default());
//!
//! let url = Url::parse("https://example.org/elevation.tif")?;
//! let source = FileSource::new("/data/elevation.tif");
//!
//! let result = retriever.retrieve(&url, &source).await;
//! if result.is_from_cache() {
//!     println!("unchanged");
//! }
//! let path = result.into_data()?.file_path().await?;
//! println!("{}", path.display());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod result;
pub mod retriever;
pub mod source;

// Re-export main public API
pub use config::{CachePolicy, RetrieverConfig};
pub use data::{DataStream, RetrievalData};
pub use result::RetrievalResult;
pub use retriever::Retriever;
pub use source::{FileSource, ResourceSource, SourceBody, SourceRequest, SourceResponse};
