//! Error types for the URL cache
//!
//! This module defines the error types for every component of the crate.
//! Errors carry the path or URL involved so that failures in a busy cache
//! can be traced back to the resource that caused them.

use std::path::PathBuf;
use thiserror::Error;

/// Cache storage errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// File system operation failed (create, read, write, rename, truncate)
    #[error("Cache I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No complete resource is cached for the URL
    #[error("No complete cache entry for {url}")]
    NotFound { url: String },

    /// Cache directory not found or inaccessible
    #[error("Cache directory not accessible: {path}")]
    DirectoryNotAccessible { path: PathBuf },

    /// A line of a URL registry could not be parsed
    #[error("URL registry corrupted: {path} line {line}")]
    RegistryCorrupted { path: PathBuf, line: usize },

    /// URL cannot be mapped onto the cache
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl CacheError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check whether this error means "nothing there" rather than a failure
    pub fn is_not_found(&self) -> bool {
        match self {
            CacheError::NotFound { .. } => true,
            CacheError::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Errors raised while retrieving a resource through a byte source
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// The byte source could not deliver the resource
    #[error("Source failed for {url}: {reason}")]
    Source { url: String, reason: String },

    /// The source reported "not modified" but nothing is cached
    #[error("Source reported {url} as not modified but no cached copy exists")]
    UnexpectedNotModified { url: String },

    /// A local (file:) resource does not exist
    #[error("Local resource not found: {path}")]
    LocalNotFound { path: PathBuf },

    /// The URL scheme or form is not supported by the retriever
    #[error("Unsupported URL: {url}")]
    UnsupportedUrl { url: String },

    /// I/O error while streaming source bytes
    #[error("Retrieval I/O error")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Cache error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Retrieval error
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (a retry may succeed)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Retrieval(RetrievalError::Source { .. })
            | AppError::Retrieval(RetrievalError::Io(_))
            | AppError::Cache(CacheError::Io { .. }) => true,

            AppError::Cache(CacheError::InvalidUrl { .. })
            | AppError::Cache(CacheError::RegistryCorrupted { .. })
            | AppError::Retrieval(RetrievalError::UnsupportedUrl { .. })
            | AppError::Config(_) => false,

            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Cache(_) => "cache",
            AppError::Retrieval(_) => "retrieval",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Byte source result type alias
pub type SourceResult<T> = std::result::Result<T, RetrievalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_error_not_found_detection() {
        let missing = CacheError::NotFound {
            url: "http://example.org/a.png".to_string(),
        };
        assert!(missing.is_not_found());

        let io_missing = CacheError::io(
            "/tmp/a",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(io_missing.is_not_found());

        let denied = CacheError::io(
            "/tmp/a",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no"),
        );
        assert!(!denied.is_not_found());
    }

    #[test]
    fn test_error_categories() {
        let err = AppError::from(CacheError::DirectoryNotAccessible {
            path: PathBuf::from("/nope"),
        });
        assert_eq!(err.category(), "cache");

        let err = AppError::from(RetrievalError::UnsupportedUrl {
            url: "gopher://x".to_string(),
        });
        assert_eq!(err.category(), "retrieval");
        assert!(!err.is_recoverable());

        let err = AppError::from(RetrievalError::Source {
            url: "http://x".to_string(),
            reason: "reset".to_string(),
        });
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = CacheError::RegistryCorrupted {
            path: PathBuf::from("/cache/000/000/0097/urls.properties"),
            line: 3,
        };
        let message = err.to_string();
        assert!(message.contains("urls.properties"));
        assert!(message.contains("line 3"));
    }
}
