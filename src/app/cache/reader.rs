//! Lock-scoped input stream over a complete cache entry

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};

use super::locks::ReadGuard;

/// Input stream for a complete resource
///
/// Holds the read lock on the complete file until closed or dropped, so a
/// concurrent commit cannot replace the file mid-read. `close` is idempotent.
#[derive(Debug)]
pub struct CacheReader {
    path: PathBuf,
    length: u64,
    file: Option<File>,
    guard: Option<ReadGuard>,
}

impl CacheReader {
    pub(super) fn new(path: PathBuf, length: u64, file: File, guard: ReadGuard) -> Self {
        Self {
            path,
            length,
            file: Some(file),
            guard: Some(guard),
        }
    }

    /// Path of the complete file being read
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Length of the complete file when it was opened
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Whether the stream has been closed
    pub fn is_closed(&self) -> bool {
        self.guard.is_none()
    }

    /// Release the file and its read lock
    pub fn close(&mut self) {
        self.file = None;
        self.guard = None;
    }
}

impl AsyncRead for CacheReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.file.as_mut() {
            Some(file) => Pin::new(file).poll_read(cx, buf),
            // Closed streams read as end-of-file
            None => Poll::Ready(Ok(())),
        }
    }
}
