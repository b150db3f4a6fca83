//! Fetch-and-cache orchestration
//!
//! The [`Retriever`] decides whether a URL can be answered from the cache,
//! asks a [`ResourceSource`] for the bytes otherwise and streams them through
//! a partial download into the cache.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::cache::UrlCache;
use crate::errors::{AppError, CacheError, Result, RetrievalError};

use super::config::{CachePolicy, RetrieverConfig};
use super::data::RetrievalData;
use super::result::RetrievalResult;
use super::source::{ResourceSource, SourceRequest, SourceResponse};

/// Retrieves URLs through a cache
///
/// Cache-filling retrievals of the same URL through one retriever (or any of
/// its clones) run one after another, so a download's partial file is never
/// truncated between its close and its commit.
#[derive(Debug, Clone)]
pub struct Retriever {
    cache: Arc<UrlCache>,
    config: RetrieverConfig,
    in_flight: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl Retriever {
    /// Create a retriever filling `cache` according to `config`
    pub fn new(cache: Arc<UrlCache>, config: RetrieverConfig) -> Self {
        Self {
            cache,
            config,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Cache the retriever fills
    pub fn cache(&self) -> &Arc<UrlCache> {
        &self.cache
    }

    /// Retrieval configuration
    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Retrieve `url`, consulting `source` unless the cache can answer alone
    ///
    /// `file:` URLs are read in place and never cached. Failures are returned
    /// as [`RetrievalResult::Error`]; an interrupted download leaves its
    /// partial file behind so the next call resumes it.
    pub async fn retrieve(&self, url: &Url, source: &dyn ResourceSource) -> RetrievalResult {
        if url.scheme() == "file" {
            return Self::retrieve_local(url).await;
        }

        let outcome = match self.config.policy {
            CachePolicy::NoStore => self.retrieve_uncached(url, source).await,
            CachePolicy::PreferCache | CachePolicy::Revalidate => {
                self.retrieve_exclusive(url, source).await
            }
        };

        outcome.unwrap_or_else(|cause| {
            warn!("Retrieval of {} failed ({}): {}", url, cause.category(), cause);
            RetrievalResult::Error { cause }
        })
    }

    /// Answer from the cache only
    pub async fn retrieve_cached(&self, url: &Url) -> RetrievalResult {
        match self.cache.is_complete(url).await {
            Ok(true) => RetrievalResult::CachedSuccess {
                data: self.cached_data(url),
                not_modified: false,
            },
            Ok(false) => RetrievalResult::error(CacheError::NotFound {
                url: url.to_string(),
            }),
            Err(e) => RetrievalResult::error(e),
        }
    }

    async fn retrieve_local(url: &Url) -> RetrievalResult {
        let path = match url.to_file_path() {
            Ok(path) => path,
            Err(()) => {
                return RetrievalResult::error(CacheError::InvalidUrl {
                    url: url.to_string(),
                    reason: "not an absolute local path".to_string(),
                })
            }
        };

        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {
                debug!("Serving {} from {}", url, path.display());
                RetrievalResult::LocalSuccess {
                    data: RetrievalData::local(path, None),
                }
            }
            _ => RetrievalResult::error(RetrievalError::LocalNotFound { path }),
        }
    }

    /// Run a cache-filling retrieval while no other one for `url` is running
    async fn retrieve_exclusive(
        &self,
        url: &Url,
        source: &dyn ResourceSource,
    ) -> Result<RetrievalResult> {
        let slot = FlightSlot::enter(&self.in_flight, url);
        let _turn = slot.marker().lock().await;
        self.retrieve_remote(url, source).await
    }

    async fn retrieve_remote(
        &self,
        url: &Url,
        source: &dyn ResourceSource,
    ) -> Result<RetrievalResult> {
        let complete = self.cache.is_complete(url).await?;

        if complete && self.config.policy == CachePolicy::PreferCache {
            debug!("Serving {} from cache without revalidation", url);
            return Ok(RetrievalResult::CachedSuccess {
                data: self.cached_data(url),
                not_modified: false,
            });
        }

        let offset = self.cache.partial_length(url).await?.unwrap_or(0);
        let if_modified_since = if complete {
            self.cache.last_modified(url).await?
        } else {
            None
        };

        let request = SourceRequest::new(url.clone())
            .with_offset(offset)
            .with_if_modified_since(if_modified_since);

        let mut body = match source.fetch(request).await? {
            SourceResponse::NotModified if complete => {
                debug!("{} not modified, using cached copy", url);
                return Ok(RetrievalResult::CachedSuccess {
                    data: self.cached_data(url),
                    not_modified: true,
                });
            }
            SourceResponse::NotModified => {
                return Err(RetrievalError::UnexpectedNotModified {
                    url: url.to_string(),
                }
                .into())
            }
            SourceResponse::Body(body) => body,
        };

        let start = if body.resumed { offset } else { 0 };
        if offset > 0 {
            if body.resumed {
                info!("Resuming download of {} at byte {}", url, offset);
            } else {
                debug!("Source ignored resume offset for {}, restarting", url);
            }
        }

        let mut writer = self.cache.open_partial_write(url, start as i64).await?;
        let copied = tokio::io::copy(&mut body.reader, &mut writer).await;
        let closed = writer.close().await;

        let written = copied.map_err(RetrievalError::from)?;
        closed?;
        debug!("Downloaded {} bytes of {}", written, url);

        let changed = self
            .cache
            .commit(url, body.last_modified, body.content_type.as_deref())
            .await?;

        Ok(RetrievalResult::Success {
            data: self.cached_data(url),
            from_cache: !changed,
        })
    }

    async fn retrieve_uncached(
        &self,
        url: &Url,
        source: &dyn ResourceSource,
    ) -> Result<RetrievalResult> {
        let mut body = match source.fetch(SourceRequest::new(url.clone())).await? {
            SourceResponse::Body(body) => body,
            SourceResponse::NotModified => {
                return Err(AppError::from(RetrievalError::UnexpectedNotModified {
                    url: url.to_string(),
                }))
            }
        };

        let mut content = Vec::new();
        body.reader
            .read_to_end(&mut content)
            .await
            .map_err(RetrievalError::from)?;

        Ok(RetrievalResult::Success {
            data: RetrievalData::buffer(content, body.content_type),
            from_cache: false,
        })
    }

    fn cached_data(&self, url: &Url) -> RetrievalData {
        RetrievalData::cached(Arc::clone(&self.cache), url.clone())
    }
}

/// A retrieval's claim on the single-flight marker of its URL
///
/// Dropping the slot, including when the retrieval future is cancelled,
/// removes the marker once no other retrieval of the URL holds it.
struct FlightSlot<'a> {
    in_flight: &'a DashMap<String, Arc<Mutex<()>>>,
    key: String,
    marker: Arc<Mutex<()>>,
}

impl<'a> FlightSlot<'a> {
    fn enter(in_flight: &'a DashMap<String, Arc<Mutex<()>>>, url: &Url) -> Self {
        let key = url.to_string();
        let marker = Arc::clone(in_flight.entry(key.clone()).or_default().value());
        Self {
            in_flight,
            key,
            marker,
        }
    }

    fn marker(&self) -> &Mutex<()> {
        &self.marker
    }
}

impl Drop for FlightSlot<'_> {
    fn drop(&mut self) {
        // The map and this slot hold the last two references
        self.in_flight
            .remove_if(&self.key, |_, marker| Arc::strong_count(marker) == 2);
    }
}
