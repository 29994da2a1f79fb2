//! Types describing a playlist entry and the output it should become.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One playlist entry as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// Track title.
    pub title: String,
    /// Primary artist name.
    pub artist: String,
    /// Album name.
    pub album: String,
    /// Album artwork URL, when the catalog has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_ref: Option<String>,
}

impl TrackDescriptor {
    /// Creates a descriptor without artwork.
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            artwork_ref: None,
        }
    }

    /// Sets the artwork reference.
    pub fn with_artwork(mut self, artwork_ref: impl Into<String>) -> Self {
        self.artwork_ref = Some(artwork_ref.into());
        self
    }

    /// Query sent to the source search backend.
    pub fn search_query(&self) -> String {
        format!("{} {} audio", self.artist, self.title)
    }

    /// Human readable label used in logs and summaries.
    pub fn label(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }

    /// The descriptive fields written into the audio file.
    pub fn tags(&self) -> TrackTags {
        TrackTags {
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
        }
    }
}

/// Metadata written by the tagger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album: String,
}

/// Error returned when parsing a closed-set option from text.
#[derive(Debug, Error)]
#[error("unsupported {kind}: {value} (expected one of: {expected})")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

/// Final audio format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// MPEG Audio Layer III
    #[default]
    Mp3,
    /// Free Lossless Audio Codec
    Flac,
}

impl OutputFormat {
    /// File extension, also used as the muxer name.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
        }
    }

    /// The ffmpeg encoder for this format.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            Self::Mp3 => "libmp3lame",
            Self::Flac => "flac",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "flac" => Ok(Self::Flac),
            _ => Err(ParseEnumError {
                kind: "format",
                value: s.to_string(),
                expected: "mp3, flac",
            }),
        }
    }
}

/// How finished files are grouped into folders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// One folder per artist name.
    #[default]
    Artist,
    /// One folder per first genre of the artist.
    Genre,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Artist => f.write_str("artist"),
            Self::Genre => f.write_str("genre"),
        }
    }
}

impl FromStr for SortKey {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "artist" => Ok(Self::Artist),
            "genre" => Ok(Self::Genre),
            _ => Err(ParseEnumError {
                kind: "sort key",
                value: s.to_string(),
                expected: "artist, genre",
            }),
        }
    }
}
