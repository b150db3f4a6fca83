//! Cache statistics and disk usage monitoring
//!
//! This module scans a cache root and classifies every file by its role:
//! complete resource, partial download, content-type sidecar or URL registry.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

use crate::constants::files;

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Cache root directory
    pub cache_root: PathBuf,
    /// Number of committed resources
    pub complete_files: usize,
    /// Number of in-progress downloads
    pub partial_files: usize,
    /// Number of content-type sidecars
    pub sidecar_files: usize,
    /// Number of bucket registries
    pub registries: usize,
    /// Total size of committed resources in bytes
    pub complete_bytes: u64,
    /// Total size of in-progress downloads in bytes
    pub partial_bytes: u64,
}

/// Role of a file inside the cache tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileRole {
    Complete,
    Partial,
    Sidecar,
    Registry,
    Other,
}

impl CacheStats {
    /// Create empty statistics for a cache root
    pub fn new(cache_root: PathBuf) -> Self {
        Self {
            cache_root,
            ..Default::default()
        }
    }

    /// Total bytes on disk across complete and partial files
    pub fn total_bytes(&self) -> u64 {
        self.complete_bytes + self.partial_bytes
    }

    /// Format committed size in human-readable format
    pub fn format_cache_size(&self) -> String {
        format_bytes(self.complete_bytes)
    }

    /// Format in-progress size in human-readable format
    pub fn format_partial_size(&self) -> String {
        format_bytes(self.partial_bytes)
    }

    fn record(&mut self, role: FileRole, size: u64) {
        match role {
            FileRole::Complete => {
                self.complete_files += 1;
                self.complete_bytes += size;
            }
            FileRole::Partial => {
                self.partial_files += 1;
                self.partial_bytes += size;
            }
            FileRole::Sidecar => self.sidecar_files += 1,
            FileRole::Registry => self.registries += 1,
            FileRole::Other => {}
        }
    }
}

/// Directory scanner for cache statistics
pub struct DirectoryScanner;

impl DirectoryScanner {
    /// Scan cache directory and classify its files
    pub async fn scan_cache_directory(cache_root: &Path) -> CacheStats {
        // Run the directory scanning in a blocking task to avoid blocking the async runtime
        let root = cache_root.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let mut stats = CacheStats::new(root.clone());
            Self::scan_directory_recursive(&root, &mut stats);
            stats
        })
        .await
        .unwrap_or_else(|e| {
            warn!("Failed to scan cache directory: {}", e);
            CacheStats::new(cache_root.to_path_buf())
        })
    }

    /// Recursively scan a directory for cache files
    fn scan_directory_recursive(dir: &Path, stats: &mut CacheStats) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read cache directory {}: {}", dir.display(), e);
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();

            if path.is_dir() {
                Self::scan_directory_recursive(&path, stats);
            } else if path.is_file() {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                stats.record(Self::classify(&path), size);
            }
        }
    }

    /// Classify a file by name
    fn classify(path: &Path) -> FileRole {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return FileRole::Other;
        };

        if name == files::REGISTRY_FILE_NAME {
            FileRole::Registry
        } else if name.ends_with(files::PARTIAL_SUFFIX) {
            FileRole::Partial
        } else if name.ends_with(files::CONTENT_TYPE_SUFFIX) {
            FileRole::Sidecar
        } else if name.starts_with(|c: char| c.is_ascii_digit()) {
            // Registry-assigned names always start with the sequence number
            FileRole::Complete
        } else {
            FileRole::Other
        }
    }
}

/// Format bytes in human-readable format
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: u64 = 1024;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD as f64 && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD as f64;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}
