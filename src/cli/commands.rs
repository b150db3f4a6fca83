//! Command handlers for the CLI
//!
//! This module implements the handlers for each CLI subcommand. Handlers
//! print human-readable output and propagate failures as [`AppError`].

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::app::cache::UrlCache;
use crate::app::hash::Md5Hash;
use crate::app::retrieval::{FileSource, RetrievalResult, Retriever, RetrieverConfig};
use crate::cli::args::{GlobalArgs, ImportArgs};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Open the cache described by the configuration and the global flags
///
/// `--cache-dir` takes precedence over the configured cache root.
pub async fn open_cache(global: &GlobalArgs, config: &AppConfig) -> Result<Arc<UrlCache>> {
    let (mut cache_config, _) = config.to_runtime_config();
    if let Some(dir) = &global.cache_dir {
        cache_config.cache_root = Some(dir.clone());
    }

    let cache = UrlCache::new(cache_config).await?;
    debug!("Using cache root {}", cache.cache_root().display());
    Ok(Arc::new(cache))
}

/// Handle the resolve command
pub async fn handle_resolve(cache: &UrlCache, url: &Url) -> Result<()> {
    let paths = cache.resolve(url).await?;

    println!("Complete:     {}", paths.complete.display());
    println!("Partial:      {}", paths.partial.display());
    println!("Content type: {}", paths.content_type.display());
    Ok(())
}

/// Handle the status command
pub async fn handle_status(cache: &UrlCache, url: &Url) -> Result<()> {
    let complete = cache.is_complete(url).await?;
    let partial_length = cache.partial_length(url).await?;

    println!("📦 {}", url);
    println!("Complete: {}", if complete { "yes" } else { "no" });
    match partial_length {
        Some(length) => println!("Partial: {} bytes", length),
        None => println!("Partial: none"),
    }

    if !complete {
        return Ok(());
    }

    if let Some(length) = cache.length(url).await? {
        println!("Length: {} bytes", length);
    }
    if let Some(modified) = cache.last_modified(url).await? {
        println!("Last modified: {}", modified.to_rfc3339());
    }
    if let Some(content_type) = cache.content_type(url).await? {
        println!("Content type: {}", content_type);
    }

    let mut reader = cache.open_read(url).await?;
    let digest = Md5Hash::of_reader(&mut reader).await?;
    reader.close();
    println!("MD5: {}", digest);

    Ok(())
}

/// Handle the cat command
pub async fn handle_cat(cache: &UrlCache, url: &Url) -> Result<()> {
    let mut reader = cache.open_read(url).await?;
    let mut stdout = tokio::io::stdout();

    let copied = tokio::io::copy(&mut reader, &mut stdout).await?;
    stdout.flush().await?;
    reader.close();

    debug!("Wrote {} bytes of {}", copied, url);
    Ok(())
}

/// Handle the import command
pub async fn handle_import(
    cache: Arc<UrlCache>,
    config: RetrieverConfig,
    args: ImportArgs,
) -> Result<()> {
    let config = match args.policy {
        Some(policy) => RetrieverConfig::with_policy(policy),
        None => config,
    };

    let mut source = FileSource::new(&args.file);
    if let Some(content_type) = args.content_type {
        source = source.with_content_type(content_type);
    }
    if let Some(modified) = args.last_modified {
        source = source.with_last_modified(modified);
    }

    info!("Importing {} as {}", args.file.display(), args.url);
    let retriever = Retriever::new(cache, config);

    match retriever.retrieve(&args.url, &source).await {
        RetrievalResult::Success { data, from_cache } => {
            let length = data.content_length().await?.unwrap_or(0);
            if from_cache {
                println!("✅ Unchanged: cached copy already matches ({} bytes)", length);
            } else {
                println!("✅ Stored {} bytes", length);
            }
            Ok(())
        }
        RetrievalResult::CachedSuccess { not_modified, .. } => {
            if not_modified {
                println!("✅ Not modified since the cached copy");
            } else {
                println!("✅ Already cached");
            }
            Ok(())
        }
        RetrievalResult::LocalSuccess { data } => {
            println!("ℹ️  Local resource, nothing cached: {}", data.file_path().await?.display());
            Ok(())
        }
        RetrievalResult::Error { cause } => Err(cause),
    }
}

/// Handle the stats command
pub async fn handle_stats(cache: &UrlCache, json: bool) -> Result<()> {
    let stats = cache.stats().await;

    if json {
        let rendered = serde_json::to_string_pretty(&stats)
            .map_err(|e| AppError::generic(format!("Failed to render statistics: {}", e)))?;
        println!("{}", rendered);
        return Ok(());
    }

    println!("💾 Cache Information");
    println!("===================");
    println!("Location: {}", stats.cache_root.display());
    println!("Cached resources: {}", stats.complete_files);
    println!("Cache size: {}", stats.format_cache_size());
    println!(
        "Partial downloads: {} ({})",
        stats.partial_files,
        stats.format_partial_size()
    );
    println!("Content type sidecars: {}", stats.sidecar_files);
    println!("URL registries: {}", stats.registries);

    Ok(())
}

/// Handle the discard command
pub async fn handle_discard(cache: &UrlCache, url: &Url) -> Result<()> {
    if cache.discard_partial(url).await? {
        println!("🗑️  Discarded partial download of {}", url);
    } else {
        println!("ℹ️  No partial download for {}", url);
    }
    Ok(())
}

/// Handle the remove command
pub async fn handle_remove(cache: &UrlCache, url: &Url) -> Result<()> {
    if cache.remove(url).await? {
        println!("🗑️  Removed {}", url);
        Ok(())
    } else {
        Err(AppError::generic(format!("Nothing cached for {}", url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::cache::CacheConfig;
    use crate::app::CachePolicy;
    use tempfile::TempDir;

    async fn create_test_cache(temp_dir: &TempDir) -> Arc<UrlCache> {
        let config = CacheConfig::with_cache_root(temp_dir.path().join("cache"));
        Arc::new(UrlCache::new(config).await.unwrap())
    }

    fn import_args(url: &Url, file: std::path::PathBuf) -> ImportArgs {
        ImportArgs {
            url: url.clone(),
            file,
            content_type: None,
            last_modified: None,
            policy: None,
        }
    }

    #[tokio::test]
    async fn test_open_cache_prefers_flag() {
        let temp_dir = TempDir::new().unwrap();
        let global = GlobalArgs {
            verbose: false,
            very_verbose: false,
            quiet: false,
            config: None,
            cache_dir: Some(temp_dir.path().join("flag")),
        };
        let mut config = AppConfig::default();
        config.cache.cache_root = Some(temp_dir.path().join("configured"));

        let cache = open_cache(&global, &config).await.unwrap();
        assert_eq!(cache.cache_root(), temp_dir.path().join("flag"));
    }

    #[tokio::test]
    async fn test_import_then_remove() {
        let temp_dir = TempDir::new().unwrap();
        let cache = create_test_cache(&temp_dir).await;
        let url = Url::parse("http://example.org/layer.xml").unwrap();

        let file = temp_dir.path().join("layer.xml");
        tokio::fs::write(&file, b"<layer/>").await.unwrap();

        handle_import(
            Arc::clone(&cache),
            RetrieverConfig::default(),
            import_args(&url, file.clone()),
        )
        .await
        .unwrap();
        assert!(cache.is_complete(&url).await.unwrap());

        // A second import of the same file is answered from the cache
        let mut args = import_args(&url, file);
        args.policy = Some(CachePolicy::PreferCache);
        handle_import(Arc::clone(&cache), RetrieverConfig::default(), args)
            .await
            .unwrap();

        handle_status(&cache, &url).await.unwrap();
        handle_remove(&cache, &url).await.unwrap();
        assert!(!cache.is_complete(&url).await.unwrap());
        assert!(handle_remove(&cache, &url).await.is_err());
    }

    #[tokio::test]
    async fn test_import_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let cache = create_test_cache(&temp_dir).await;
        let url = Url::parse("http://example.org/layer.xml").unwrap();

        let result = handle_import(
            cache,
            RetrieverConfig::default(),
            import_args(&url, temp_dir.path().join("missing.xml")),
        )
        .await;
        assert!(matches!(result, Err(AppError::Retrieval(_))));
    }

    #[tokio::test]
    async fn test_cat_missing_resource() {
        let temp_dir = TempDir::new().unwrap();
        let cache = create_test_cache(&temp_dir).await;
        let url = Url::parse("http://example.org/none.png").unwrap();

        assert!(handle_cat(&cache, &url).await.is_err());
        handle_discard(&cache, &url).await.unwrap();
        handle_stats(&cache, true).await.unwrap();
    }
}
