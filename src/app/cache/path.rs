//! Cache path derivation for URLs
//!
//! A URL never becomes a file name directly. Its string form is hashed into a
//! fan-out of bucket directories, optionally below a directory named after
//! the URL's host, and the file name inside the bucket is assigned by the
//! bucket's URL registry (see [`super::registry`]).
//!
//! Layout:
//! - `{cache_root}/[{host}/][-/]{h0-2}/{h3-5}/{h6..}/urls.properties`
//! - `{cache_root}/[{host}/][-/]{h0-2}/{h3-5}/{h6..}/{n}[.{ext}]` (complete)
//! - `... /{n}[.{ext}].partial` (in progress)
//! - `... /{n}[.{ext}].contenttype` (sidecar)

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use url::Url;

use crate::constants::{files, paths};

/// On-disk identity of one cached URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePaths {
    /// Committed resource, the only file readers ever see
    pub complete: PathBuf,
    /// In-progress download
    pub partial: PathBuf,
    /// Content type sidecar, present only when the name does not imply the type
    pub content_type: PathBuf,
}

impl ResourcePaths {
    /// Derive the partial and sidecar paths from the complete path
    pub fn from_complete(complete: PathBuf) -> Self {
        Self {
            partial: append_suffix(&complete, files::PARTIAL_SUFFIX),
            content_type: append_suffix(&complete, files::CONTENT_TYPE_SUFFIX),
            complete,
        }
    }
}

/// Path generation utility for cache files
pub struct PathGenerator;

impl PathGenerator {
    /// Get the bucket directory holding the given URL
    pub fn bucket_dir(cache_root: &Path, url: &Url) -> PathBuf {
        let mut path = cache_root.to_path_buf();

        // Keep resources from the same server together
        if let Some(host) = Self::host_dir(url) {
            path.push(host);
        }

        for segment in Self::hash_segments(Self::url_hash(url.as_str())) {
            path.push(segment);
        }

        path
    }

    /// Get the registry file of the bucket holding the given URL
    pub fn registry_path(cache_root: &Path, url: &Url) -> PathBuf {
        Self::bucket_dir(cache_root, url).join(files::REGISTRY_FILE_NAME)
    }

    /// Deterministic 32-bit hash of a URL string
    ///
    /// Polynomial hash over UTF-16 code units with multiplier 31 and wrapping
    /// arithmetic. The value must never change between releases: it decides
    /// where every existing cache entry lives on disk.
    pub fn url_hash(url: &str) -> i32 {
        url.encode_utf16()
            .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
    }

    /// Split a hash into bucket directory names
    ///
    /// The magnitude is zero-padded to at least ten digits and split into
    /// groups of 3, 3 and the remainder. A negative hash gets an extra leading
    /// `-` directory.
    pub fn hash_segments(hash: i32) -> Vec<String> {
        let digits = format!(
            "{:0width$}",
            i64::from(hash).unsigned_abs(),
            width = paths::HASH_DIGITS
        );

        let mut segments = Vec::with_capacity(paths::HASH_SEGMENT_LENGTHS.len() + 2);
        if hash < 0 {
            segments.push(paths::NEGATIVE_HASH_DIR.to_string());
        }

        let mut rest = digits.as_str();
        for length in paths::HASH_SEGMENT_LENGTHS {
            let (head, tail) = rest.split_at(length);
            segments.push(head.to_string());
            rest = tail;
        }
        segments.push(rest.to_string());

        segments
    }

    /// Directory name for the URL's host, if it has a non-empty one
    pub fn host_dir(url: &Url) -> Option<String> {
        let host = url.host_str()?;
        if host.is_empty() {
            return None;
        }

        // IPv6 literals carry brackets and colons
        Some(
            host.chars()
                .map(|c| match c {
                    'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
                    _ => '_',
                })
                .collect(),
        )
    }

    /// File extension (with leading dot) taken from the URL path's last segment
    ///
    /// Anything longer than the extension limit is assumed to be part of a
    /// name rather than an extension and yields `None`.
    pub fn file_extension(url: &Url) -> Option<String> {
        let last_segment = url.path_segments()?.last()?;
        let dot = last_segment.rfind('.')?;
        let extension = &last_segment[dot + 1..];

        if extension.is_empty() || extension.chars().count() > paths::MAX_EXTENSION_LENGTH {
            return None;
        }

        Some(format!(".{}", extension))
    }
}

/// Append a suffix to the final component of a path
pub fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
