//! Writing title/artist/album metadata into finished files.

mod lofty_writer;

pub use lofty_writer::LoftyTagWriter;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::track::{OutputFormat, TrackTags};

/// Errors that can occur while writing tags.
#[derive(Debug, Error)]
pub enum TagError {
    #[error("File to tag not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to write tags: {0}")]
    Lofty(#[from] lofty::error::LoftyError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tag writer task failed: {0}")]
    Task(String),
}

/// Writes descriptive tags into an audio file in place.
#[async_trait]
pub trait TagWriter: Send + Sync {
    /// Writes `tags` into `path` using the scheme for `format`.
    async fn write_tags(
        &self,
        path: &Path,
        tags: &TrackTags,
        format: OutputFormat,
    ) -> Result<(), TagError>;
}
