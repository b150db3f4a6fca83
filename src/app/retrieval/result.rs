//! Terminal outcome of one retrieval

use crate::errors::AppError;

use super::data::RetrievalData;

/// How a retrieval ended
///
/// Each value is final; there are no transitions between variants.
#[derive(Debug)]
pub enum RetrievalResult {
    /// The source delivered the resource
    Success {
        data: RetrievalData,
        /// The delivered bytes matched the cached copy
        from_cache: bool,
    },
    /// Served from the cache, either without asking the source or because
    /// the source reported no change
    CachedSuccess {
        data: RetrievalData,
        not_modified: bool,
    },
    /// The resource was already local and the cache was never touched
    LocalSuccess { data: RetrievalData },
    /// The retrieval failed
    Error { cause: AppError },
}

impl RetrievalResult {
    pub fn error(cause: impl Into<AppError>) -> Self {
        Self::Error {
            cause: cause.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Error { .. })
    }

    /// Whether the bytes came from the cache rather than a fresh download
    pub fn is_from_cache(&self) -> bool {
        match self {
            Self::Success { from_cache, .. } => *from_cache,
            Self::CachedSuccess { .. } => true,
            Self::LocalSuccess { .. } | Self::Error { .. } => false,
        }
    }

    pub fn is_not_modified(&self) -> bool {
        matches!(
            self,
            Self::CachedSuccess {
                not_modified: true,
                ..
            }
        )
    }

    pub fn data(&self) -> Option<&RetrievalData> {
        match self {
            Self::Success { data, .. }
            | Self::CachedSuccess { data, .. }
            | Self::LocalSuccess { data } => Some(data),
            Self::Error { .. } => None,
        }
    }

    pub fn cause(&self) -> Option<&AppError> {
        match self {
            Self::Error { cause } => Some(cause),
            _ => None,
        }
    }

    /// Convert into the data, or the error that prevented it
    pub fn into_data(self) -> Result<RetrievalData, AppError> {
        match self {
            Self::Success { data, .. }
            | Self::CachedSuccess { data, .. }
            | Self::LocalSuccess { data } => Ok(data),
            Self::Error { cause } => Err(cause),
        }
    }
}
