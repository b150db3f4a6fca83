//! Resumable, lock-scoped writer for in-progress downloads
//!
//! A [`PartialWriter`] owns the write lock on a resource's partial file for
//! as long as it is open. The lock is released exactly once: by the first
//! [`PartialWriter::close`] call or, failing that, when the writer is dropped.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::errors::{CacheError, CacheResult};

use super::locks::WriteGuard;

/// Output stream for a partial download, positioned at the resume offset
#[derive(Debug)]
pub struct PartialWriter {
    path: PathBuf,
    file: Option<File>,
    guard: Option<WriteGuard>,
    position: u64,
}

impl PartialWriter {
    /// Open the partial file at `path` for writing from `offset`
    ///
    /// Negative offsets are clamped to zero. The file is truncated (or
    /// extended with zeros) to exactly `offset` bytes, so anything previously
    /// written beyond the resume point is discarded. An offset beyond the
    /// current length is honoured as given and leaves a zero-filled gap.
    ///
    /// `guard` must be the write lock for `path`. On failure it is dropped
    /// before the error is returned.
    pub(super) async fn open(
        path: PathBuf,
        guard: WriteGuard,
        offset: i64,
        shared_permissions: bool,
    ) -> CacheResult<Self> {
        let offset = offset.max(0) as u64;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::io(parent, e))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await
            .map_err(|e| CacheError::io(&path, e))?;

        file.set_len(offset)
            .await
            .map_err(|e| CacheError::io(&path, e))?;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| CacheError::io(&path, e))?;

        if shared_permissions {
            apply_shared_permissions(&path).await;
        }

        debug!("Opened partial {} at offset {}", path.display(), offset);

        Ok(Self {
            path,
            file: Some(file),
            guard: Some(guard),
            position: offset,
        })
    }

    /// Path of the partial file being written
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset the next write lands at
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether the writer has been closed
    pub fn is_closed(&self) -> bool {
        self.guard.is_none()
    }

    /// Flush and sync outstanding bytes, then release the partial write lock
    ///
    /// Calling `close` again is a no-op. The lock is released even when the
    /// final flush or sync fails.
    pub async fn close(&mut self) -> CacheResult<()> {
        let flushed = match self.file.take() {
            Some(mut file) => match file.flush().await {
                Ok(()) => file.sync_all().await,
                Err(e) => Err(e),
            },
            None => Ok(()),
        };

        if self.guard.take().is_some() {
            debug!(
                "Closed partial {} at {} bytes",
                self.path.display(),
                self.position
            );
        }

        flushed.map_err(|e| CacheError::io(&self.path, e))
    }
}

fn closed_error() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::BrokenPipe, "partial writer is closed")
}

impl AsyncWrite for PartialWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        let this = &mut *self;
        let Some(file) = this.file.as_mut() else {
            return Poll::Ready(Err(closed_error()));
        };

        let poll = Pin::new(file).poll_write(cx, buf);
        if let Poll::Ready(Ok(written)) = &poll {
            this.position += *written as u64;
        }
        poll
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.file.as_mut() {
            Some(file) => Pin::new(file).poll_flush(cx),
            None => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.file.as_mut() {
            Some(file) => Pin::new(file).poll_shutdown(cx),
            None => Poll::Ready(Ok(())),
        }
    }
}

/// Make a cache file readable and writable by every user
#[cfg(unix)]
pub(super) async fn apply_shared_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    use crate::constants::files::SHARED_FILE_MODE;

    let permissions = std::fs::Permissions::from_mode(SHARED_FILE_MODE);
    if let Err(e) = fs::set_permissions(path, permissions).await {
        warn!("Failed to share permissions on {}: {}", path.display(), e);
    }
}

#[cfg(not(unix))]
pub(super) async fn apply_shared_permissions(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::cache::locks::LockTable;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_from_zero() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("0.png.partial");
        let locks = LockTable::new();

        let guard = locks.write(&path).await;
        let mut writer = PartialWriter::open(path.clone(), guard, 0, false)
            .await
            .unwrap();
        writer.write_all(b"hello").await.unwrap();
        assert_eq!(writer.position(), 5);
        writer.close().await.unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_resume_truncates_beyond_offset() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.partial");
        tokio::fs::write(&path, b"0123456789").await.unwrap();
        let locks = LockTable::new();

        let guard = locks.write(&path).await;
        let mut writer = PartialWriter::open(path.clone(), guard, 4, false)
            .await
            .unwrap();
        writer.write_all(b"ab").await.unwrap();
        writer.close().await.unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"0123ab");
    }

    #[tokio::test]
    async fn test_negative_offset_clamps_to_zero() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.partial");
        tokio::fs::write(&path, b"stale").await.unwrap();
        let locks = LockTable::new();

        let guard = locks.write(&path).await;
        let mut writer = PartialWriter::open(path.clone(), guard, -42, false)
            .await
            .unwrap();
        assert_eq!(writer.position(), 0);
        writer.write_all(b"new").await.unwrap();
        writer.close().await.unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_offset_beyond_length_leaves_zero_gap() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.partial");
        tokio::fs::write(&path, vec![7u8; 50]).await.unwrap();
        let locks = LockTable::new();

        let guard = locks.write(&path).await;
        let mut writer = PartialWriter::open(path.clone(), guard, 100, false)
            .await
            .unwrap();
        writer.write_all(b"xyz").await.unwrap();
        writer.close().await.unwrap();

        let content = tokio::fs::read(&path).await.unwrap();
        assert_eq!(content.len(), 103);
        assert!(content[..50].iter().all(|b| *b == 7));
        assert!(content[50..100].iter().all(|b| *b == 0));
        assert_eq!(&content[100..], b"xyz");
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_releases_lock() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.partial");
        let locks = LockTable::new();

        let guard = locks.write(&path).await;
        let mut writer = PartialWriter::open(path.clone(), guard, 0, false)
            .await
            .unwrap();
        writer.write_all(b"synced").await.unwrap();

        writer.close().await.unwrap();
        writer.close().await.unwrap();
        assert!(writer.is_closed());

        // Bytes are on disk once close returns
        assert_eq!(std::fs::read(&path).unwrap(), b"synced");

        // Writes after close fail instead of touching the file
        assert!(writer.write_all(b"late").await.is_err());

        let relock = tokio::time::timeout(Duration::from_millis(100), locks.write(&path)).await;
        assert!(relock.is_ok());
    }

    #[tokio::test]
    async fn test_failed_open_releases_lock() {
        let temp_dir = TempDir::new().unwrap();
        // A directory where the file should be makes the open fail
        let path = temp_dir.path().join("0.partial");
        tokio::fs::create_dir(&path).await.unwrap();
        let locks = LockTable::new();

        let guard = locks.write(&path).await;
        let result = PartialWriter::open(path.clone(), guard, 0, false).await;
        assert!(matches!(result, Err(CacheError::Io { .. })));

        let relock = tokio::time::timeout(Duration::from_millis(100), locks.write(&path)).await;
        assert!(relock.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shared_permissions_applied() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.partial");
        let locks = LockTable::new();

        let guard = locks.write(&path).await;
        let mut writer = PartialWriter::open(path.clone(), guard, 0, true)
            .await
            .unwrap();
        writer.close().await.unwrap();

        let mode = tokio::fs::metadata(&path).await.unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o666);
    }
}
