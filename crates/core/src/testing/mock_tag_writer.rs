//! Mock tag writer for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::tagger::{TagError, TagWriter};
use crate::track::{OutputFormat, TrackTags};

/// A recorded tag write for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedTagWrite {
    pub path: PathBuf,
    pub tags: TrackTags,
    pub format: OutputFormat,
}

/// Mock implementation of the TagWriter trait. Records writes, touches no
/// files.
#[derive(Debug, Default)]
pub struct MockTagWriter {
    /// If set, the next write will fail with this error.
    next_error: Arc<RwLock<Option<TagError>>>,
    /// Titles whose writes always fail.
    failing_titles: Arc<RwLock<Vec<String>>>,
    writes: Arc<RwLock<Vec<RecordedTagWrite>>>,
}

impl MockTagWriter {
    /// Create a new mock tag writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write fail.
    pub async fn set_next_error(&self, error: TagError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every write for a track with this title fail.
    pub async fn fail_title(&self, title: &str) {
        self.failing_titles.write().await.push(title.to_string());
    }

    /// Successful writes so far.
    pub async fn written(&self) -> Vec<RecordedTagWrite> {
        self.writes.read().await.clone()
    }
}

#[async_trait]
impl TagWriter for MockTagWriter {
    async fn write_tags(
        &self,
        path: &Path,
        tags: &TrackTags,
        format: OutputFormat,
    ) -> Result<(), TagError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        if self.failing_titles.read().await.contains(&tags.title) {
            return Err(TagError::Task(format!("mock failure for {}", tags.title)));
        }
        if !path.exists() {
            return Err(TagError::NotFound {
                path: path.to_path_buf(),
            });
        }

        self.writes.write().await.push(RecordedTagWrite {
            path: path.to_path_buf(),
            tags: tags.clone(),
            format,
        });
        Ok(())
    }
}
