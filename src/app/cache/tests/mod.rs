//! Cross-component tests for the cache module
