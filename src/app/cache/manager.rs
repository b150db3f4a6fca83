//! Core URL cache with lock-scoped file operations
//!
//! This module contains the [`UrlCache`] facade: path resolution, partial
//! writes, reads and metadata queries. Committing a download lives in
//! [`super::commit`].

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, error, info};
use url::Url;

use crate::constants::app::APP_NAME;
use crate::errors::{CacheError, CacheResult};

use super::config::CacheConfig;
use super::content_type;
use super::locks::LockTable;
use super::path::{PathGenerator, ResourcePaths};
use super::reader::CacheReader;
use super::registry::DirectoryRegistry;
use super::stats::{CacheStats, DirectoryScanner};
use super::writer::PartialWriter;

/// Disk-backed cache of URL resources
///
/// One instance owns the lock table for its root directory. Share it between
/// tasks with an `Arc`; two instances over the same root do not coordinate.
#[derive(Debug)]
pub struct UrlCache {
    /// Configuration
    config: CacheConfig,
    /// Absolute cache root directory
    cache_root: PathBuf,
    /// Per-path reader/writer locks
    pub(super) locks: LockTable,
}

impl UrlCache {
    /// Create a new URL cache
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the cache directory cannot be created or the
    /// current directory is needed to absolutise a relative root and is unavailable.
    pub async fn new(config: CacheConfig) -> CacheResult<Self> {
        let cache_root = match &config.cache_root {
            Some(path) => Self::absolutize(path)?,
            None => Self::get_default_cache_dir()?,
        };

        Self::ensure_directory_exists(&cache_root).await?;

        info!("Initialized URL cache with root: {}", cache_root.display());

        Ok(Self {
            config,
            cache_root,
            locks: LockTable::new(),
        })
    }

    /// Get the cache root directory
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get the default cache directory for the current OS
    ///
    /// - macOS: ~/Library/Caches/url-cache
    /// - Linux: ~/.cache/url-cache
    /// - Windows: %LOCALAPPDATA%/url-cache
    fn get_default_cache_dir() -> CacheResult<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| CacheError::DirectoryNotAccessible {
                path: PathBuf::from("system cache directory"),
            })?
            .join(APP_NAME);

        Self::absolutize(&cache_dir)
    }

    /// Lock keys are absolute paths, so the root must be absolute too
    fn absolutize(path: &Path) -> CacheResult<PathBuf> {
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        let cwd = std::env::current_dir().map_err(|e| CacheError::io(path, e))?;
        Ok(cwd.join(path))
    }

    /// Ensure a directory exists, creating it if necessary
    async fn ensure_directory_exists(path: &Path) -> CacheResult<()> {
        if !path.exists() {
            fs::create_dir_all(path).await.map_err(|e| {
                error!("Failed to create cache directory: {}", e);
                CacheError::DirectoryNotAccessible {
                    path: path.to_path_buf(),
                }
            })?;
            debug!("Created cache directory: {}", path.display());
        }
        Ok(())
    }

    /// Resolve the on-disk identity of a URL
    ///
    /// Assigns and persists a file name in the bucket's registry the first
    /// time a URL is seen. The registry update runs under the registry's
    /// write lock, so concurrent first-time resolutions in one bucket get
    /// distinct names.
    pub async fn resolve(&self, url: &Url) -> CacheResult<ResourcePaths> {
        let bucket = PathGenerator::bucket_dir(&self.cache_root, url);
        fs::create_dir_all(&bucket)
            .await
            .map_err(|e| CacheError::io(&bucket, e))?;

        let registry_path = PathGenerator::registry_path(&self.cache_root, url);
        let name = {
            let _registry_guard = self.locks.write(&registry_path).await;
            let mut registry = DirectoryRegistry::load(&registry_path).await?;
            let extension = PathGenerator::file_extension(url);
            registry
                .get_or_assign(url.as_str(), extension.as_deref())
                .await?
        };

        Ok(ResourcePaths::from_complete(bucket.join(name)))
    }

    /// Open the partial download of `url` for writing from `offset`
    ///
    /// The returned writer holds the partial file's write lock until it is
    /// closed, so a second writer for the same URL waits. See
    /// [`PartialWriter::open`] for the offset contract.
    pub async fn open_partial_write(&self, url: &Url, offset: i64) -> CacheResult<PartialWriter> {
        let paths = self.resolve(url).await?;
        let guard = self.locks.write(&paths.partial).await;
        PartialWriter::open(paths.partial, guard, offset, self.config.shared_permissions).await
    }

    /// Open the complete resource of `url` for reading
    ///
    /// The returned stream holds the complete file's read lock until closed.
    ///
    /// # Errors
    ///
    /// `CacheError::NotFound` when nothing has been committed for the URL.
    pub async fn open_read(&self, url: &Url) -> CacheResult<CacheReader> {
        let paths = self.resolve(url).await?;
        let guard = self.locks.read(&paths.complete).await;

        let file = match fs::File::open(&paths.complete).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheError::NotFound {
                    url: url.to_string(),
                })
            }
            Err(e) => return Err(CacheError::io(&paths.complete, e)),
        };
        let length = file
            .metadata()
            .await
            .map_err(|e| CacheError::io(&paths.complete, e))?
            .len();

        Ok(CacheReader::new(paths.complete, length, file, guard))
    }

    /// Whether a complete resource is cached for `url`
    pub async fn is_complete(&self, url: &Url) -> CacheResult<bool> {
        let paths = self.resolve(url).await?;
        Ok(self.stat(&paths.complete).await?.is_some())
    }

    /// Whether a partial download exists for `url`
    pub async fn is_partial(&self, url: &Url) -> CacheResult<bool> {
        let paths = self.resolve(url).await?;
        Ok(self.stat(&paths.partial).await?.is_some())
    }

    /// Length of the complete resource, if cached
    pub async fn length(&self, url: &Url) -> CacheResult<Option<u64>> {
        let paths = self.resolve(url).await?;
        Ok(self.stat(&paths.complete).await?.map(|meta| meta.len()))
    }

    /// Length of the partial download, the offset to resume from
    pub async fn partial_length(&self, url: &Url) -> CacheResult<Option<u64>> {
        let paths = self.resolve(url).await?;
        Ok(self.stat(&paths.partial).await?.map(|meta| meta.len()))
    }

    /// Modification time of the complete resource, if cached
    pub async fn last_modified(&self, url: &Url) -> CacheResult<Option<DateTime<Utc>>> {
        let paths = self.resolve(url).await?;
        let Some(meta) = self.stat(&paths.complete).await? else {
            return Ok(None);
        };
        let modified = meta
            .modified()
            .map_err(|e| CacheError::io(&paths.complete, e))?;
        Ok(Some(DateTime::<Utc>::from(modified)))
    }

    /// Content type of the cached resource
    ///
    /// Reads the sidecar when present, otherwise infers the type from the
    /// complete file's name.
    pub async fn content_type(&self, url: &Url) -> CacheResult<Option<String>> {
        let paths = self.resolve(url).await?;

        let sidecar = {
            let _guard = self.locks.read(&paths.content_type).await;
            fs::read_to_string(&paths.content_type).await
        };

        match sidecar {
            Ok(content) => Ok(Some(content.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(content_type::infer_from_path(&paths.complete).map(str::to_string))
            }
            Err(e) => Err(CacheError::io(&paths.content_type, e)),
        }
    }

    /// Path of the complete resource
    ///
    /// No lock is held once this returns; a later commit may replace the file.
    ///
    /// # Errors
    ///
    /// `CacheError::NotFound` when nothing has been committed for the URL.
    pub async fn file_path(&self, url: &Url) -> CacheResult<PathBuf> {
        let paths = self.resolve(url).await?;
        match self.stat(&paths.complete).await? {
            Some(_) => Ok(paths.complete),
            None => Err(CacheError::NotFound {
                url: url.to_string(),
            }),
        }
    }

    /// Delete an abandoned partial download
    ///
    /// Waits for any open writer on the partial to close first. Returns
    /// whether a partial file existed.
    pub async fn discard_partial(&self, url: &Url) -> CacheResult<bool> {
        let paths = self.resolve(url).await?;
        let _guard = self.locks.write(&paths.partial).await;
        let removed = remove_if_exists(&paths.partial).await?;
        if removed {
            debug!("Discarded partial download of {}", url);
        }
        Ok(removed)
    }

    /// Delete every file cached for `url`
    ///
    /// The registry entry stays so the file name is never handed to another
    /// URL. Returns whether anything was deleted.
    pub async fn remove(&self, url: &Url) -> CacheResult<bool> {
        let paths = self.resolve(url).await?;

        let _partial_guard = self.locks.write(&paths.partial).await;
        let _complete_guard = self.locks.write(&paths.complete).await;
        let _sidecar_guard = self.locks.write(&paths.content_type).await;

        let mut removed = remove_if_exists(&paths.partial).await?;
        removed |= remove_if_exists(&paths.complete).await?;
        removed |= remove_if_exists(&paths.content_type).await?;

        if removed {
            info!("Removed cache entry for {}", url);
        }
        Ok(removed)
    }

    /// Get cache statistics by scanning the cache directory
    pub async fn stats(&self) -> CacheStats {
        DirectoryScanner::scan_cache_directory(&self.cache_root).await
    }

    /// Stat a file under its read lock; `None` if it does not exist
    async fn stat(&self, path: &Path) -> CacheResult<Option<std::fs::Metadata>> {
        let _guard = self.locks.read(path).await;
        match fs::metadata(path).await {
            Ok(meta) if meta.is_file() => Ok(Some(meta)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }
}

/// Remove a file, treating "already gone" as success
pub(super) async fn remove_if_exists(path: &Path) -> CacheResult<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CacheError::io(path, e)),
    }
}
