//! Playlist catalog and artist metadata lookup.
//!
//! The catalog turns a playlist reference into the ordered list of tracks a
//! batch will process. The genre lookup is used by the organizer when sorting
//! by genre.

mod spotify;

pub use spotify::{parse_playlist_id, SpotifyClient, SpotifyConfig};

use async_trait::async_trait;
use thiserror::Error;

use crate::track::TrackDescriptor;

/// Errors that can occur when talking to the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The playlist reference is not in a recognized form.
    #[error("Invalid playlist reference: {0}")]
    InvalidReference(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Obtaining an access token failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// Resource not found (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing credentials, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

/// Resolves a playlist reference to its tracks.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Name of this catalog, for logs.
    fn name(&self) -> &str;

    /// Returns the playlist's tracks in playlist order.
    async fn playlist_tracks(&self, reference: &str)
        -> Result<Vec<TrackDescriptor>, CatalogError>;
}

/// Looks up the genres associated with an artist.
#[async_trait]
pub trait GenreLookup: Send + Sync {
    /// Genres for `artist`, most relevant first. May be empty.
    async fn genres_of(&self, artist: &str) -> Result<Vec<String>, CatalogError>;
}
