//! URL Cache Library
//!
//! A disk-backed cache for resources fetched by URL. Each URL maps to a
//! stable location in a hashed directory tree; downloads are written to
//! resumable partial files under per-file reader/writer locks and promoted
//! to complete entries only when their bytes actually changed.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
