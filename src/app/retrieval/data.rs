//! Retrieved resource bytes in whatever representation is at hand
//!
//! A [`RetrievalData`] wraps a cache entry, an in-memory buffer or a local
//! file and converts between stream, buffer and path on demand.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tempfile::TempPath;
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::OnceCell;
use url::Url;

use crate::app::cache::{content_type, UrlCache};
use crate::errors::{CacheError, Result};

/// Byte stream over retrieved data
pub type DataStream = Box<dyn AsyncRead + Send + Unpin>;

/// Resource bytes plus their metadata
#[derive(Debug, Clone)]
pub enum RetrievalData {
    /// Complete entry in the on-disk cache
    Cached(CachedData),
    /// Bytes held in memory
    Buffer(BufferData),
    /// A file outside the cache
    Local(LocalData),
}

impl RetrievalData {
    /// Data read through the complete cache entry of `url`
    pub fn cached(cache: Arc<UrlCache>, url: Url) -> Self {
        Self::Cached(CachedData { cache, url })
    }

    /// Data held in memory
    pub fn buffer(bytes: impl Into<Bytes>, content_type: Option<String>) -> Self {
        Self::Buffer(BufferData {
            bytes: bytes.into(),
            content_type,
            materialized: Arc::new(OnceCell::new()),
        })
    }

    /// Data in a file outside the cache
    pub fn local(path: PathBuf, content_type: Option<String>) -> Self {
        Self::Local(LocalData { path, content_type })
    }

    /// Length of the resource in bytes, if known
    pub async fn content_length(&self) -> Result<Option<u64>> {
        match self {
            Self::Cached(data) => Ok(data.cache.length(&data.url).await?),
            Self::Buffer(data) => Ok(Some(data.bytes.len() as u64)),
            Self::Local(data) => {
                let metadata = fs::metadata(&data.path)
                    .await
                    .map_err(|e| CacheError::io(&data.path, e))?;
                Ok(Some(metadata.len()))
            }
        }
    }

    /// MIME type of the resource, if known
    pub async fn content_type(&self) -> Result<Option<String>> {
        match self {
            Self::Cached(data) => Ok(data.cache.content_type(&data.url).await?),
            Self::Buffer(data) => Ok(data.content_type.clone()),
            Self::Local(data) => Ok(data
                .content_type
                .clone()
                .or_else(|| content_type::infer_from_path(&data.path).map(str::to_string))),
        }
    }

    /// Open a fresh stream over the resource
    ///
    /// A stream over a cache entry holds the entry's read lock until dropped.
    pub async fn open_stream(&self) -> Result<DataStream> {
        match self {
            Self::Cached(data) => Ok(Box::new(data.cache.open_read(&data.url).await?)),
            Self::Buffer(data) => Ok(Box::new(std::io::Cursor::new(data.bytes.clone()))),
            Self::Local(data) => {
                let file = File::open(&data.path)
                    .await
                    .map_err(|e| CacheError::io(&data.path, e))?;
                Ok(Box::new(file))
            }
        }
    }

    /// The whole resource in memory
    pub async fn bytes(&self) -> Result<Bytes> {
        match self {
            Self::Buffer(data) => Ok(data.bytes.clone()),
            Self::Local(data) => {
                let content = fs::read(&data.path)
                    .await
                    .map_err(|e| CacheError::io(&data.path, e))?;
                Ok(Bytes::from(content))
            }
            Self::Cached(_) => {
                let mut stream = self.open_stream().await?;
                let mut content = Vec::new();
                stream.read_to_end(&mut content).await?;
                Ok(Bytes::from(content))
            }
        }
    }

    /// A filesystem path holding the resource
    ///
    /// In-memory data is written to a temporary file the first time this is
    /// called; the file is deleted once the last clone of the data is dropped.
    /// Cache entry paths are not locked and may be replaced by a later commit.
    pub async fn file_path(&self) -> Result<PathBuf> {
        match self {
            Self::Cached(data) => Ok(data.cache.file_path(&data.url).await?),
            Self::Local(data) => Ok(data.path.clone()),
            Self::Buffer(data) => data.materialize().await,
        }
    }
}

/// Complete cache entry of a URL
#[derive(Debug, Clone)]
pub struct CachedData {
    cache: Arc<UrlCache>,
    url: Url,
}

impl CachedData {
    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// In-memory resource
#[derive(Debug, Clone)]
pub struct BufferData {
    bytes: Bytes,
    content_type: Option<String>,
    materialized: Arc<OnceCell<TempPath>>,
}

impl BufferData {
    async fn materialize(&self) -> Result<PathBuf> {
        let path = self
            .materialized
            .get_or_try_init(|| {
                let bytes = self.bytes.clone();
                async move {
                    tokio::task::spawn_blocking(move || -> std::io::Result<TempPath> {
                        use std::io::Write;

                        let mut file = tempfile::NamedTempFile::new()?;
                        file.write_all(&bytes)?;
                        file.flush()?;
                        Ok(file.into_temp_path())
                    })
                    .await
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
                }
            })
            .await?;

        Ok(path.to_path_buf())
    }
}

/// Resource read straight from the local filesystem
#[derive(Debug, Clone)]
pub struct LocalData {
    path: PathBuf,
    content_type: Option<String>,
}

impl LocalData {
    pub fn path(&self) -> &Path {
        &self.path
    }
}
