//! Byte source boundary consumed by the retriever
//!
//! A [`ResourceSource`] is whatever actually fetches bytes for a URL: an HTTP
//! client, an object store, a local file. The retriever only needs a stream
//! plus the resource's metadata, so the network layer stays outside the crate.

use std::fmt;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeekExt};
use tracing::debug;
use url::Url;

use crate::app::cache::content_type;
use crate::errors::{RetrievalError, SourceResult};

/// A fetch request for one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    /// Resource to fetch
    pub url: Url,
    /// Byte offset to resume from; 0 for a full fetch
    pub offset: u64,
    /// Modification time of the cached copy, if any
    pub if_modified_since: Option<DateTime<Utc>>,
}

impl SourceRequest {
    /// Full, unconditional fetch
    pub fn new(url: Url) -> Self {
        Self {
            url,
            offset: 0,
            if_modified_since: None,
        }
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_if_modified_since(mut self, modified: Option<DateTime<Utc>>) -> Self {
        self.if_modified_since = modified;
        self
    }
}

/// Response body of a successful fetch
pub struct SourceBody {
    /// Resource bytes, starting at the request offset when `resumed` is set
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    /// Whether the source honoured the request offset
    ///
    /// When `false` the reader delivers the whole resource from byte 0.
    pub resumed: bool,
    /// Modification time reported by the source
    pub last_modified: Option<DateTime<Utc>>,
    /// Content type reported by the source
    pub content_type: Option<String>,
}

impl SourceBody {
    /// Body that delivers the whole resource
    pub fn full(reader: Box<dyn AsyncRead + Send + Unpin>) -> Self {
        Self {
            reader,
            resumed: false,
            last_modified: None,
            content_type: None,
        }
    }
}

impl fmt::Debug for SourceBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceBody")
            .field("resumed", &self.resumed)
            .field("last_modified", &self.last_modified)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Outcome of a fetch
#[derive(Debug)]
pub enum SourceResponse {
    /// The resource has not changed since `if_modified_since`
    NotModified,
    /// The resource bytes
    Body(SourceBody),
}

/// Something that can deliver the bytes of a URL
#[async_trait]
pub trait ResourceSource: Send + Sync {
    /// Fetch a resource, honouring the offset and conditional hint where possible
    async fn fetch(&self, request: SourceRequest) -> SourceResult<SourceResponse>;
}

/// Serves every request from one local file
///
/// Offsets are honoured by seeking. The file's modification time drives the
/// conditional hint unless an explicit time is set.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    content_type: Option<String>,
    last_modified: Option<DateTime<Utc>>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content_type: None,
            last_modified: None,
        }
    }

    /// Report this content type instead of inferring one from the file name
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Report this modification time instead of the file's own
    pub fn with_last_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(modified);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn source_error(&self, url: &Url, e: impl fmt::Display) -> RetrievalError {
        RetrievalError::Source {
            url: url.to_string(),
            reason: format!("{}: {}", self.path.display(), e),
        }
    }
}

#[async_trait]
impl ResourceSource for FileSource {
    async fn fetch(&self, request: SourceRequest) -> SourceResult<SourceResponse> {
        let mut file = File::open(&self.path)
            .await
            .map_err(|e| self.source_error(&request.url, e))?;
        let metadata = file
            .metadata()
            .await
            .map_err(|e| self.source_error(&request.url, e))?;

        let last_modified = match self.last_modified {
            Some(modified) => Some(modified),
            None => metadata.modified().ok().map(DateTime::<Utc>::from),
        };

        // Whole seconds only, like HTTP dates
        if let (Some(since), Some(modified)) = (request.if_modified_since, last_modified) {
            if modified.timestamp() <= since.timestamp() {
                debug!("{} not modified since {}", self.path.display(), since);
                return Ok(SourceResponse::NotModified);
            }
        }

        let resumed = request.offset > 0 && request.offset <= metadata.len();
        if resumed {
            file.seek(SeekFrom::Start(request.offset)).await?;
        }

        let content_type = self
            .content_type
            .clone()
            .or_else(|| content_type::infer_from_path(&self.path).map(str::to_string));

        Ok(SourceResponse::Body(SourceBody {
            reader: Box::new(file),
            resumed,
            last_modified,
            content_type,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    async fn body_of(response: SourceResponse) -> (SourceBody, Vec<u8>) {
        let SourceResponse::Body(mut body) = response else {
            panic!("expected a body");
        };
        let mut content = Vec::new();
        body.reader.read_to_end(&mut content).await.unwrap();
        (body, content)
    }

    #[tokio::test]
    async fn test_full_fetch() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tile.png");
        tokio::fs::write(&path, b"0123456789").await.unwrap();

        let source = FileSource::new(&path);
        let url = Url::parse("http://example.org/tile.png").unwrap();
        let (body, content) = body_of(source.fetch(SourceRequest::new(url)).await.unwrap()).await;

        assert_eq!(content, b"0123456789");
        assert!(!body.resumed);
        assert_eq!(body.content_type.as_deref(), Some("image/png"));
        assert!(body.last_modified.is_some());
    }

    #[tokio::test]
    async fn test_offset_seeks() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data");
        tokio::fs::write(&path, b"0123456789").await.unwrap();

        let source = FileSource::new(&path).with_content_type("text/plain");
        let url = Url::parse("http://example.org/data").unwrap();
        let request = SourceRequest::new(url).with_offset(4);
        let (body, content) = body_of(source.fetch(request).await.unwrap()).await;

        assert!(body.resumed);
        assert_eq!(content, b"456789");
        assert_eq!(body.content_type.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_offset_beyond_end_restarts() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data");
        tokio::fs::write(&path, b"abc").await.unwrap();

        let source = FileSource::new(&path);
        let url = Url::parse("http://example.org/data").unwrap();
        let (body, content) =
            body_of(source.fetch(SourceRequest::new(url).with_offset(10)).await.unwrap()).await;

        assert!(!body.resumed);
        assert_eq!(content, b"abc");
    }

    #[tokio::test]
    async fn test_not_modified() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data");
        tokio::fs::write(&path, b"abc").await.unwrap();

        let modified = Utc.with_ymd_and_hms(2022, 5, 1, 12, 0, 0).unwrap();
        let source = FileSource::new(&path).with_last_modified(modified);
        let url = Url::parse("http://example.org/data").unwrap();

        let request = SourceRequest::new(url.clone()).with_if_modified_since(Some(modified));
        assert!(matches!(
            source.fetch(request).await.unwrap(),
            SourceResponse::NotModified
        ));

        let older = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let request = SourceRequest::new(url).with_if_modified_since(Some(older));
        assert!(matches!(
            source.fetch(request).await.unwrap(),
            SourceResponse::Body(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_file_is_source_error() {
        let source = FileSource::new("/definitely/not/here");
        let url = Url::parse("http://example.org/data").unwrap();
        assert!(matches!(
            source.fetch(SourceRequest::new(url)).await,
            Err(RetrievalError::Source { .. })
        ));
    }
}
