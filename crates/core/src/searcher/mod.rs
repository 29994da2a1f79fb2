//! Source search abstraction.
//!
//! A `SourceSearch` turns a free-text query into candidate source locators.
//! The resolver only ever uses the first candidate.

mod ytdlp;

pub(crate) use ytdlp::default_ytdlp_path;
pub use ytdlp::{SearchConfig, YtDlpSearch};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCandidate {
    /// Opaque reference the fetcher understands (usually a URL).
    pub locator: String,
    /// Title as reported by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Duration in seconds, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

impl SourceCandidate {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            title: None,
            duration_secs: None,
        }
    }
}

/// Errors that can occur during search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Search backend failed: {reason}")]
    BackendFailed {
        reason: String,
        stderr: Option<String>,
    },

    #[error("Failed to parse search output: {0}")]
    ParseError(String),
}

impl SearchError {
    pub fn backend_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::BackendFailed {
            reason: reason.into(),
            stderr,
        }
    }
}

/// Trait for source search backends.
#[async_trait]
pub trait SourceSearch: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Runs one search. An empty result is not an error.
    async fn search(&self, query: &str) -> Result<Vec<SourceCandidate>, SearchError>;

    /// Checks that the backend is usable.
    async fn validate(&self) -> Result<(), SearchError> {
        Ok(())
    }
}
