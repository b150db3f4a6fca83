//! Per-path reader/writer lock table
//!
//! Every file the cache touches (complete file, partial file, content-type
//! sidecar, URL registry) is guarded by its own lock, keyed by absolute
//! path. Any number of readers or exactly one writer may hold a path at a
//! time; distinct paths never contend.
//!
//! Locks are created lazily and never removed. The table is bounded by the
//! number of distinct files in the cache, which is bounded by disk contents.
//!
//! The locks are not reentrant: a task holding a write guard must not ask for
//! the same path again. Multi-lock sequences always run partial → complete →
//! sidecar, never the reverse.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tracing::trace;

/// Shared access to one cached path, released on drop
pub type ReadGuard = OwnedRwLockReadGuard<()>;

/// Exclusive access to one cached path, released on drop
pub type WriteGuard = OwnedRwLockWriteGuard<()>;

/// Registry of per-path reader/writer locks
#[derive(Debug, Default)]
pub struct LockTable {
    locks: DashMap<PathBuf, Arc<RwLock<()>>>,
}

impl LockTable {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, path: &Path) -> Arc<RwLock<()>> {
        if let Some(lock) = self.locks.get(path) {
            return Arc::clone(lock.value());
        }
        Arc::clone(self.locks.entry(path.to_path_buf()).or_default().value())
    }

    /// Wait for shared access to `path`
    ///
    /// Never times out. Callers that need a bounded wait must wrap the call.
    pub async fn read(&self, path: &Path) -> ReadGuard {
        trace!("Acquiring read lock: {}", path.display());
        self.lock_for(path).read_owned().await
    }

    /// Wait for exclusive access to `path`
    ///
    /// Never times out. Callers that need a bounded wait must wrap the call.
    pub async fn write(&self, path: &Path) -> WriteGuard {
        trace!("Acquiring write lock: {}", path.display());
        self.lock_for(path).write_owned().await
    }

    /// Number of distinct paths that have been locked so far
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no path has been locked yet
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
