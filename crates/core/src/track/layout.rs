//! Deterministic on-disk naming for tracks.

use std::path::{Path, PathBuf};

use super::types::{OutputFormat, TrackDescriptor};

/// Folder used when no artist or genre name is usable.
pub const UNKNOWN_FOLDER: &str = "Unknown";

/// File title used when the sanitized title is empty.
pub const UNTITLED: &str = "untitled";

/// Hidden directory under the output root holding raw fetch artifacts.
pub const WORK_DIR_NAME: &str = ".steep-work";

/// Keeps alphanumerics, space, `-` and `_` from a title.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect()
}

/// Makes a name safe to use as a single path component.
///
/// Path separators and control characters become `_`; leading and trailing
/// dots and whitespace are trimmed so the result is never `.`/`..` or hidden.
pub fn sanitize_component(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if matches!(c, '/' | '\\') || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        UNKNOWN_FOLDER.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Where a batch writes its files.
///
/// ```text
/// <root>/<artist> - <title>.<ext>            staging path (normalizer target)
/// <root>/<folder>/<artist> - <title>.<ext>   organized path
/// <root>/.steep-work/<artist> - <title>.*    raw fetch artifacts
/// ```
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    format: OutputFormat,
}

impl OutputLayout {
    /// Creates a layout rooted at `root` producing `format` files.
    pub fn new(root: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    /// The output root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Directory holding intermediate fetch artifacts.
    pub fn work_dir(&self) -> PathBuf {
        self.root.join(WORK_DIR_NAME)
    }

    /// File name without extension: `<artist> - <sanitized title>`.
    pub fn file_stem(&self, track: &TrackDescriptor) -> String {
        let title = sanitize_title(&track.title);
        let title = title.trim();
        let title = if title.is_empty() { UNTITLED } else { title };
        format!("{} - {}", sanitize_component(&track.artist), title)
    }

    /// Final file name including extension.
    pub fn file_name(&self, track: &TrackDescriptor) -> String {
        format!("{}.{}", self.file_stem(track), self.format.extension())
    }

    /// Path the normalizer writes to.
    pub fn staging_path(&self, track: &TrackDescriptor) -> PathBuf {
        self.root.join(self.file_name(track))
    }

    /// Stem handed to the fetcher; the fetcher appends its own extension.
    pub fn fetch_stem(&self, track: &TrackDescriptor) -> PathBuf {
        self.work_dir().join(self.file_stem(track))
    }

    /// Directory for a sort folder name.
    pub fn folder_dir(&self, folder: &str) -> PathBuf {
        self.root.join(sanitize_component(folder))
    }

    /// Path of the track once organized into `folder`.
    pub fn organized_path(&self, track: &TrackDescriptor, folder: &str) -> PathBuf {
        self.folder_dir(folder).join(self.file_name(track))
    }

    /// Looks for an already finished file for this track.
    ///
    /// Checks the staging path and every non-hidden immediate subdirectory of the
    /// root. Only touches the local filesystem.
    pub async fn find_existing(&self, track: &TrackDescriptor) -> Option<PathBuf> {
        let file_name = self.file_name(track);

        let staging = self.root.join(&file_name);
        if is_file(&staging).await {
            return Some(staging);
        }

        let mut entries = tokio::fs::read_dir(&self.root).await.ok()?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if !is_dir {
                continue;
            }
            let candidate = entry.path().join(&file_name);
            if is_file(&candidate).await {
                return Some(candidate);
            }
        }

        None
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
