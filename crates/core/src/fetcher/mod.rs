//! Retrieval of raw audio for a source locator.

mod ytdlp;

pub use ytdlp::{FetcherConfig, YtDlpFetcher};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while fetching audio.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Fetch failed: {reason}")]
    BackendFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// The backend reported success but the expected file is not there.
    #[error("Fetched file not found: {path}")]
    MissingOutput { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    pub fn backend_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::BackendFailed {
            reason: reason.into(),
            stderr,
        }
    }
}

/// Downloads audio for a locator.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Name of this fetcher, for logs.
    fn name(&self) -> &str;

    /// Fetches `locator` to `stem` plus a backend-chosen extension and returns
    /// the path of the produced file.
    async fn fetch(&self, locator: &str, stem: &Path) -> Result<PathBuf, FetchError>;

    /// Checks that the backend is usable.
    async fn validate(&self) -> Result<(), FetchError> {
        Ok(())
    }
}
