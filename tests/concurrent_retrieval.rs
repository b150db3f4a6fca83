//! Integration tests for concurrent use of the cache
//!
//! These tests drive the public API the way a tile server would: many tasks
//! retrieving and reading the same URLs at once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use url::Url;
use url_cache::app::retrieval::{SourceBody, SourceRequest, SourceResponse};
use url_cache::errors::SourceResult;
use url_cache::prelude::*;

/// Source serving fixed bytes and counting fetches
struct CountingSource {
    content: Bytes,
    fetches: AtomicUsize,
}

impl CountingSource {
    fn new(content: &'static [u8]) -> Self {
        Self {
            content: Bytes::from_static(content),
            fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ResourceSource for CountingSource {
    async fn fetch(&self, _request: SourceRequest) -> SourceResult<SourceResponse> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(SourceResponse::Body(SourceBody::full(Box::new(
            std::io::Cursor::new(self.content.clone()),
        ))))
    }
}

async fn create_test_cache(temp_dir: &TempDir) -> Arc<UrlCache> {
    let config = CacheConfig::with_cache_root(temp_dir.path().to_path_buf());
    Arc::new(UrlCache::new(config).await.unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_retrievals_of_one_url() {
    let temp_dir = TempDir::new().unwrap();
    let cache = create_test_cache(&temp_dir).await;
    let retriever = Retriever::new(Arc::clone(&cache), RetrieverConfig::default());
    let source = Arc::new(CountingSource::new(b"shared tile content"));
    let url = Url::parse("http://tiles.example.org/5/10/12.png").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let retriever = retriever.clone();
            let source = Arc::clone(&source);
            let url = url.clone();
            tokio::spawn(async move { retriever.retrieve(&url, source.as_ref()).await })
        })
        .collect();

    let mut changed = 0;
    for handle in handles {
        let result = handle.await.unwrap();
        assert!(result.is_success(), "{:?}", result.cause());
        if !result.is_from_cache() {
            changed += 1;
        }
        let bytes = result.data().unwrap().bytes().await.unwrap();
        assert_eq!(bytes, Bytes::from_static(b"shared tile content"));
    }

    // Only the first commit changes the entry; the rest match it
    assert_eq!(changed, 1);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 8);

    let stats = cache.stats().await;
    assert_eq!(stats.complete_files, 1);
    assert_eq!(stats.partial_files, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_mixed_commits() {
    let temp_dir = TempDir::new().unwrap();
    let cache = create_test_cache(&temp_dir).await;
    let url = Url::parse("http://example.org/coverage.tif").unwrap();

    let versions: [Vec<u8>; 2] = [vec![b'a'; 64 * 1024], vec![b'b'; 64 * 1024]];

    let mut writer = cache.open_partial_write(&url, 0).await.unwrap();
    writer.write_all(&versions[0]).await.unwrap();
    writer.close().await.unwrap();
    cache.commit(&url, None, None).await.unwrap();

    let committer = {
        let cache = Arc::clone(&cache);
        let url = url.clone();
        let versions = versions.clone();
        tokio::spawn(async move {
            for round in 1..=20 {
                let mut writer = cache.open_partial_write(&url, 0).await.unwrap();
                writer.write_all(&versions[round % 2]).await.unwrap();
                writer.close().await.unwrap();
                assert!(cache.commit(&url, None, None).await.unwrap());
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let url = url.clone();
            tokio::spawn(async move {
                for _ in 0..20 {
                    let mut reader = cache.open_read(&url).await.unwrap();
                    let mut content = Vec::new();
                    reader.read_to_end(&mut content).await.unwrap();
                    reader.close();

                    assert_eq!(content.len(), 64 * 1024);
                    let first = content[0];
                    assert!(content.iter().all(|b| *b == first));
                }
            })
        })
        .collect();

    committer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}

#[tokio::test]
async fn test_local_urls_never_touch_cache() {
    let temp_dir = TempDir::new().unwrap();
    let cache = create_test_cache(&temp_dir).await;
    let retriever = Retriever::new(Arc::clone(&cache), RetrieverConfig::default());
    let source = CountingSource::new(b"unused");

    let local_dir = TempDir::new().unwrap();
    let path = local_dir.path().join("style.json");
    tokio::fs::write(&path, b"{\"version\":8}").await.unwrap();
    let url = Url::from_file_path(&path).unwrap();

    let result = retriever.retrieve(&url, &source).await;
    assert!(matches!(result, RetrievalResult::LocalSuccess { .. }));
    assert_eq!(source.fetches.load(Ordering::SeqCst), 0);

    let stats = cache.stats().await;
    assert_eq!(stats.registries, 0);
}
