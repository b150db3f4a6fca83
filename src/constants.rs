//! Application constants for the URL cache
//!
//! This module centralizes the constants used throughout the crate,
//! organized by functional domain.

/// Application identity
pub mod app {
    /// Name used for the default cache and config directories
    pub const APP_NAME: &str = "url-cache";

    /// Project-local configuration file name
    pub const LOCAL_CONFIG_FILE: &str = "url-cache.toml";

    /// Configuration file name inside the user config directory
    pub const CONFIG_FILE: &str = "config.toml";
}

/// On-disk layout of the cache
pub mod files {
    /// Per-bucket registry mapping full URL strings to assigned file names
    pub const REGISTRY_FILE_NAME: &str = "urls.properties";

    /// Suffix of an in-progress download
    pub const PARTIAL_SUFFIX: &str = ".partial";

    /// Suffix of the content-type sidecar file
    pub const CONTENT_TYPE_SUFFIX: &str = ".contenttype";

    /// Header comment written at the top of every registry file
    pub const REGISTRY_HEADER: &str = "URL to cache file name registry";

    /// Permission bits applied to cache files when shared permissions are enabled
    #[cfg(unix)]
    pub const SHARED_FILE_MODE: u32 = 0o666;
}

/// Path derivation limits
pub mod paths {
    /// Longest trailing path "extension" still treated as a file extension
    pub const MAX_EXTENSION_LENGTH: usize = 30;

    /// Minimum number of digits in the rendered URL hash
    pub const HASH_DIGITS: usize = 10;

    /// Lengths of the leading hash directory segments; the remainder forms the last one
    pub const HASH_SEGMENT_LENGTHS: [usize; 2] = [3, 3];

    /// Directory level used for URLs hashing to a negative value
    pub const NEGATIVE_HASH_DIR: &str = "-";
}

/// I/O tuning
pub mod io {
    /// Chunk size used when streaming files through the digest
    pub const DIGEST_BUFFER_SIZE: usize = 64 * 1024;
}
