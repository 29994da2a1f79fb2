//! Moving finished files into per-artist or per-genre folders.

mod error;
mod mover;

pub use error::OrganizeError;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::catalog::GenreLookup;
use crate::track::{OutputLayout, SortKey, TrackDescriptor, UNKNOWN_FOLDER};

/// Organizer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizerConfig {
    /// Verify SHA-256 when a move falls back to copying across filesystems.
    #[serde(default = "default_verify_copies")]
    pub verify_copies: bool,
}

fn default_verify_copies() -> bool {
    true
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            verify_copies: default_verify_copies(),
        }
    }
}

/// Where a file ended up.
#[derive(Debug)]
pub enum OrganizeOutcome {
    /// The file is at its organized path.
    Moved(PathBuf),
    /// The move failed; the file is still at `path`.
    LeftInPlace { path: PathBuf, error: OrganizeError },
}

impl OrganizeOutcome {
    /// The file's current location.
    pub fn path(&self) -> &Path {
        match self {
            Self::Moved(path) => path,
            Self::LeftInPlace { path, .. } => path,
        }
    }
}

/// Chooses a destination folder for a track and moves the file there.
pub struct Organizer {
    genre_lookup: Option<Arc<dyn GenreLookup>>,
    genre_timeout: Duration,
    config: OrganizerConfig,
}

impl Organizer {
    pub fn new(
        genre_lookup: Option<Arc<dyn GenreLookup>>,
        genre_timeout: Duration,
        config: OrganizerConfig,
    ) -> Self {
        Self {
            genre_lookup,
            genre_timeout,
            config,
        }
    }

    /// Folder name for `track` under `sort_key`.
    ///
    /// Genre sorting uses the first non-empty genre of the track's artist.
    /// No genres, a failed lookup, a timeout or a missing lookup service all
    /// give `Unknown`.
    pub async fn choose_folder(&self, track: &TrackDescriptor, sort_key: SortKey) -> String {
        match sort_key {
            SortKey::Artist => track.artist.clone(),
            SortKey::Genre => self.first_genre(&track.artist).await,
        }
    }

    async fn first_genre(&self, artist: &str) -> String {
        let Some(lookup) = &self.genre_lookup else {
            return UNKNOWN_FOLDER.to_string();
        };

        match tokio::time::timeout(self.genre_timeout, lookup.genres_of(artist)).await {
            Ok(Ok(genres)) => genres
                .into_iter()
                .map(|g| g.trim().to_string())
                .find(|g| !g.is_empty())
                .unwrap_or_else(|| UNKNOWN_FOLDER.to_string()),
            Ok(Err(e)) => {
                warn!(artist, error = %e, "Genre lookup failed");
                UNKNOWN_FOLDER.to_string()
            }
            Err(_) => {
                warn!(
                    artist,
                    timeout_secs = self.genre_timeout.as_secs(),
                    "Genre lookup timed out"
                );
                UNKNOWN_FOLDER.to_string()
            }
        }
    }

    /// Moves `path` into the folder chosen for `track`.
    ///
    /// Creates the folder if needed and replaces an existing file of the same
    /// name. On failure the file stays where it was and that path is returned.
    pub async fn organize(
        &self,
        path: &Path,
        track: &TrackDescriptor,
        sort_key: SortKey,
        layout: &OutputLayout,
    ) -> OrganizeOutcome {
        let folder = self.choose_folder(track, sort_key).await;
        let destination = layout.organized_path(track, &folder);

        if destination == path {
            return OrganizeOutcome::Moved(destination);
        }

        if let Some(parent) = destination.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return OrganizeOutcome::LeftInPlace {
                    path: path.to_path_buf(),
                    error: OrganizeError::DirectoryCreationFailed {
                        path: parent.to_path_buf(),
                        source: e,
                    },
                };
            }
        }

        match mover::move_file(path, &destination, self.config.verify_copies).await {
            Ok(()) => {
                debug!(track = %track.label(), %folder, "Organized");
                OrganizeOutcome::Moved(destination)
            }
            Err(error) => OrganizeOutcome::LeftInPlace {
                path: path.to_path_buf(),
                error,
            },
        }
    }
}
