use async_trait::async_trait;
use lofty::config::WriteOptions;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{Tag, TagType};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{TagError, TagWriter};
use crate::track::{OutputFormat, TrackTags};

/// Tag writer backed by `lofty`.
///
/// mp3 files get an ID3v2 tag (created when absent), flac files get Vorbis
/// comments. Other existing tags are left alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagWriter;

impl LoftyTagWriter {
    pub fn new() -> Self {
        Self
    }

    fn tag_type(format: OutputFormat) -> TagType {
        match format {
            OutputFormat::Mp3 => TagType::Id3v2,
            OutputFormat::Flac => TagType::VorbisComments,
        }
    }

    fn write_blocking(path: &Path, tags: &TrackTags, format: OutputFormat) -> Result<(), TagError> {
        if !path.is_file() {
            return Err(TagError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let tag_type = Self::tag_type(format);
        let mut tagged = Probe::open(path)?.guess_file_type()?.read()?;

        if tagged.tag(tag_type).is_none() {
            tagged.insert_tag(Tag::new(tag_type));
        }
        if let Some(tag) = tagged.tag_mut(tag_type) {
            tag.set_title(tags.title.clone());
            tag.set_artist(tags.artist.clone());
            if !tags.album.is_empty() {
                tag.set_album(tags.album.clone());
            }
        }

        tagged.save_to_path(path, WriteOptions::default())?;
        Ok(())
    }
}

#[async_trait]
impl TagWriter for LoftyTagWriter {
    async fn write_tags(
        &self,
        path: &Path,
        tags: &TrackTags,
        format: OutputFormat,
    ) -> Result<(), TagError> {
        let owned_path: PathBuf = path.to_path_buf();
        let owned_tags = tags.clone();

        tokio::task::spawn_blocking(move || {
            Self::write_blocking(&owned_path, &owned_tags, format)
        })
        .await
        .map_err(|e| TagError::Task(e.to_string()))??;

        debug!(path = %path.display(), ?format, "Wrote tags");
        Ok(())
    }
}
