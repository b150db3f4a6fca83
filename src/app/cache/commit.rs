//! Promotion of a finished partial download to a complete cache entry
//!
//! Lock order is partial (write) → complete (read, then write) → sidecar
//! (write). Every other multi-lock path in the cache follows the same order.

use std::path::Path;

use chrono::{DateTime, Utc};
use filetime::FileTime;
use tokio::fs;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::hash::Md5Hash;
use crate::errors::{CacheError, CacheResult};

use super::content_type;
use super::manager::{remove_if_exists, UrlCache};
use super::path::ResourcePaths;
use super::writer::apply_shared_permissions;

impl UrlCache {
    /// Commit the partial download of `url`
    ///
    /// Returns `true` when the complete entry changed and `false` when the
    /// download was byte-identical to what was already cached. In the
    /// unchanged case the partial file is deleted and neither the
    /// modification time nor the content type is touched.
    ///
    /// `last_modified` is applied only when it is after the Unix epoch.
    ///
    /// # Errors
    ///
    /// `CacheError::Io` when the partial file is missing or the rename fails.
    /// A failed commit leaves the partial file in place for a retry and the
    /// previous complete file untouched.
    pub async fn commit(
        &self,
        url: &Url,
        last_modified: Option<DateTime<Utc>>,
        content_type: Option<&str>,
    ) -> CacheResult<bool> {
        let paths = self.resolve(url).await?;

        let partial_guard = self.locks.write(&paths.partial).await;
        fs::metadata(&paths.partial)
            .await
            .map_err(|e| CacheError::io(&paths.partial, e))?;

        {
            let _complete_read = self.locks.read(&paths.complete).await;
            if files_identical(&paths.partial, &paths.complete).await {
                remove_if_exists(&paths.partial).await?;
                info!("Download of {} unchanged, keeping cached copy", url);
                return Ok(false);
            }
        }

        let complete_guard = self.locks.write(&paths.complete).await;
        fs::rename(&paths.partial, &paths.complete)
            .await
            .map_err(|e| CacheError::io(&paths.complete, e))?;

        if let Some(modified) = last_modified.filter(|t| t.timestamp_millis() > 0) {
            set_modified_time(&paths.complete, modified).await;
        }

        self.update_content_type(&paths, content_type).await;

        drop(complete_guard);
        drop(partial_guard);

        info!("Committed {} to {}", url, paths.complete.display());
        Ok(true)
    }

    /// Keep the sidecar in line with the supplied content type
    ///
    /// The sidecar is written only when the supplied type differs from what
    /// the file name implies; otherwise any stale sidecar is removed so the
    /// inferred type applies again. Failures are logged, never returned.
    async fn update_content_type(&self, paths: &ResourcePaths, supplied: Option<&str>) {
        let inferred = content_type::infer_from_path(&paths.complete);
        let _guard = self.locks.write(&paths.content_type).await;

        match supplied {
            Some(supplied) if !content_type::matches_inferred(Some(supplied), inferred) => {
                if let Err(e) = fs::write(&paths.content_type, supplied).await {
                    warn!(
                        "Failed to write content type sidecar {}: {}",
                        paths.content_type.display(),
                        e
                    );
                    return;
                }
                if self.config().shared_permissions {
                    apply_shared_permissions(&paths.content_type).await;
                }
                debug!(
                    "Recorded content type {} in {}",
                    supplied,
                    paths.content_type.display()
                );
            }
            _ => {
                if let Err(e) = remove_if_exists(&paths.content_type).await {
                    warn!("Failed to remove stale content type sidecar: {}", e);
                }
            }
        }
    }
}

/// Identity check between a fresh download and the cached copy
///
/// A missing complete file or a digest failure counts as "not identical",
/// which forces a real commit.
async fn files_identical(partial: &Path, complete: &Path) -> bool {
    let (partial_meta, complete_meta) =
        match (fs::metadata(partial).await, fs::metadata(complete).await) {
            (Ok(p), Ok(c)) => (p, c),
            _ => return false,
        };

    if partial_meta.len() != complete_meta.len() {
        return false;
    }

    match (Md5Hash::of_file(partial).await, Md5Hash::of_file(complete).await) {
        (Ok(a), Ok(b)) => a == b,
        (Err(e), _) | (_, Err(e)) => {
            warn!("Digest failed, treating download as changed: {}", e);
            false
        }
    }
}

async fn set_modified_time(path: &Path, modified: DateTime<Utc>) {
    let mtime = FileTime::from_unix_time(modified.timestamp(), modified.timestamp_subsec_nanos());
    let target = path.to_path_buf();

    match tokio::task::spawn_blocking(move || filetime::set_file_mtime(&target, mtime)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Failed to set modification time on {}: {}", path.display(), e),
        Err(e) => warn!("Modification time task failed: {}", e),
    }
}
