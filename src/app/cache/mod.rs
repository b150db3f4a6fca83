//! Disk-backed URL resource cache with per-file locking
//!
//! Every URL maps to a stable trio of files inside a hash bucket directory:
//! the complete resource, an in-progress `.partial` download and an optional
//! `.contenttype` sidecar. File names are handed out by a per-bucket
//! `urls.properties` registry so distinct URLs never share a name.
//!
//! # Key Features
//!
//! - **Resumable downloads**: partial files reopen at any offset
//! - **Per-file reader/writer locks**: streams hold their lock until closed
//! - **Change detection**: commits compare MD5 digests and report whether the
//!   cached copy actually changed
//! - **Content type tracking**: sidecars only when the file name is not enough
//!
//! # Module Organization
//!
//! - [`config`] - Configuration types and defaults
//! - [`path`] - Bucket layout and URL hashing
//! - [`registry`] - Per-bucket URL to file name registry
//! - [`locks`] - Per-path reader/writer lock table
//! - [`writer`] / [`reader`] - Lock-scoped streams
//! - [`commit`] - Promotion of partial downloads
//! - [`content_type`] - Extension based type inference
//! - [`stats`] - Cache statistics and disk usage monitoring
//! - [`manager`] - The [`UrlCache`] facade
//!
//! # Examples
//!
//! ```rust,no_run
//! use tokio::io::AsyncWriteExt;
//! use url::Url;
//! use url_cache::app::cache::{CacheConfig, UrlCache};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = UrlCache::new(CacheConfig::default()).await?;
//! let url = Url::parse("https://tiles.example.org/3/4/5.png")?;
//!
//! let offset = cache.partial_length(&url).await?.unwrap_or(0);
//! let mut writer = cache.open_partial_write(&url, offset as i64).await?;
//! writer.write_all(b"...").await?;
//! writer.close().await?;
//!
//! if cache.commit(&url, None, Some("image/png")).await? {
//!     println!("cached copy updated");
//! }
//! # Ok(())
//! # }
//! ```

pub mod commit;
pub mod config;
pub mod content_type;
pub mod locks;
pub mod manager;
pub mod path;
pub mod reader;
pub mod registry;
pub mod stats;
pub mod writer;

#[cfg(test)]
mod tests;

// Re-export main public API
pub use config::CacheConfig;
pub use locks::LockTable;
pub use manager::UrlCache;
pub use path::{PathGenerator, ResourcePaths};
pub use reader::CacheReader;
pub use registry::DirectoryRegistry;
pub use stats::CacheStats;
pub use writer::PartialWriter;
