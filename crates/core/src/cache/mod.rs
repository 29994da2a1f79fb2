//! Persistent search cache.
//!
//! Maps a normalized `(artist, title)` query to the source locator found for it,
//! so repeated runs do not search again. The cache is best-effort: a missing or
//! unreadable file starts an empty cache and a failed write is only logged by
//! the caller.

mod json_file;
mod key;

pub use json_file::JsonFileCache;
pub use key::{CacheKey, QUERY_MARKER};

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when persisting the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Serializing the entries failed.
    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Writing the cache file failed.
    #[error("Failed to write cache file {path}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Key/value store for resolved source locators.
#[async_trait]
pub trait LookupCache: Send + Sync {
    /// Returns the cached locator for `key`, if any.
    async fn get(&self, key: &CacheKey) -> Option<String>;

    /// Stores `locator` under `key`.
    ///
    /// Writing the same value for an existing key is a no-op.
    async fn put(&self, key: &CacheKey, locator: &str) -> Result<(), CacheError>;

    /// Number of cached entries.
    async fn len(&self) -> usize;

    /// Whether the cache has no entries.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
