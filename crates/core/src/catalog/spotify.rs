//! Spotify Web API client.
//!
//! Uses the client-credentials flow, so only public playlists and artist
//! metadata are reachable. Tokens are cached until shortly before they expire.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex_lite::Regex;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{Catalog, CatalogError, GenreLookup};
use crate::track::TrackDescriptor;

static PLAYLIST_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://open\.spotify\.com/(?:intl-[a-zA-Z-]+/)?playlist/|spotify:playlist:)?([A-Za-z0-9]{22})(?:[?#/].*)?$",
    )
    .expect("playlist reference pattern is valid")
});

/// Refresh the token this long before Spotify says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Extracts the playlist id from a reference.
///
/// Accepts `https://open.spotify.com/playlist/<id>` (with optional locale
/// segment and query string), `spotify:playlist:<id>`, or a bare id.
pub fn parse_playlist_id(reference: &str) -> Result<String, CatalogError> {
    PLAYLIST_REF
        .captures(reference.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| CatalogError::InvalidReference(reference.to_string()))
}

/// Spotify client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    /// Application client id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Application client secret.
    #[serde(default, skip_serializing)]
    pub client_secret: Option<String>,
    /// Web API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Token endpoint.
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Playlist items requested per page (max 100).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_api_base_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_auth_url() -> String {
    "https://accounts.spotify.com/api/token".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> u32 {
    100
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_base_url: default_api_base_url(),
            auth_url: default_auth_url(),
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

impl SpotifyConfig {
    /// Whether both credentials are present and non-empty.
    pub fn has_credentials(&self) -> bool {
        matches!(
            (&self.client_id, &self.client_secret),
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty()
        )
    }
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Spotify Web API client.
pub struct SpotifyClient {
    client: Client,
    client_id: String,
    client_secret: String,
    api_base_url: String,
    auth_url: String,
    page_size: u32,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    /// Create a new Spotify client.
    pub fn new(config: SpotifyConfig) -> Result<Self, CatalogError> {
        if !config.has_credentials() {
            return Err(CatalogError::NotConfigured(
                "Spotify client id and secret are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            client_id: config.client_id.unwrap_or_default(),
            client_secret: config.client_secret.unwrap_or_default(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_url: config.auth_url,
            page_size: config.page_size.clamp(1, 100),
            token: Mutex::new(None),
        })
    }

    /// Returns a valid access token, fetching a new one if needed.
    async fn access_token(&self) -> Result<String, CatalogError> {
        let mut token = self.token.lock().await;
        if let Some(cached) = token.as_ref() {
            if Instant::now() + TOKEN_EXPIRY_MARGIN < cached.expires_at {
                return Ok(cached.value.clone());
            }
        }

        debug!("Requesting Spotify access token");
        let response = self
            .client
            .post(&self.auth_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Auth(format!("{} - {}", status.as_u16(), body)));
        }

        let granted: TokenResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Auth(format!("Failed to parse token response: {}", e)))?;

        let value = granted.access_token.clone();
        *token = Some(CachedToken {
            value: granted.access_token,
            expires_at: Instant::now() + Duration::from_secs(granted.expires_in),
        });
        Ok(value)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T, CatalogError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let response = check_status(response, what).await?;
        response
            .json()
            .await
            .map_err(|e| CatalogError::ParseError(format!("Failed to parse {}: {}", what, e)))
    }

    /// Fetches every item of a playlist, following pagination.
    pub async fn playlist_items(
        &self,
        playlist_id: &str,
    ) -> Result<Vec<TrackDescriptor>, CatalogError> {
        let mut tracks = Vec::new();
        let mut skipped = 0usize;

        let first_url = format!("{}/playlists/{}/tracks", self.api_base_url, playlist_id);
        let mut page: PlaylistPage = self
            .get_json(
                &first_url,
                &[
                    ("limit", self.page_size.to_string()),
                    ("additional_types", "track".to_string()),
                ],
                "playlist page",
            )
            .await?;

        loop {
            for item in page.items {
                match item.track.and_then(SpTrack::into_descriptor) {
                    Some(track) => tracks.push(track),
                    None => skipped += 1,
                }
            }

            let Some(next) = page.next else { break };
            debug!(url = %next, "Fetching next playlist page");
            page = self.get_json(&next, &[], "playlist page").await?;
        }

        if skipped > 0 {
            debug!(skipped, "Skipped playlist items without track data");
        }
        debug!(playlist_id, tracks = tracks.len(), "Fetched playlist");
        Ok(tracks)
    }

    /// Searches for an artist by name and returns its genres.
    pub async fn artist_genres(&self, artist: &str) -> Result<Vec<String>, CatalogError> {
        let url = format!("{}/search", self.api_base_url);
        let result: ArtistSearchResponse = self
            .get_json(
                &url,
                &[
                    ("q", format!("artist:{}", artist)),
                    ("type", "artist".to_string()),
                    ("limit", "1".to_string()),
                ],
                "artist search",
            )
            .await?;

        Ok(result
            .artists
            .items
            .into_iter()
            .next()
            .map(|a| a.genres)
            .unwrap_or_default())
    }
}

async fn check_status(response: Response, what: &str) -> Result<Response, CatalogError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        warn!("Spotify rate limit exceeded");
        return Err(CatalogError::RateLimitExceeded);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(CatalogError::NotFound(what.to_string()));
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(CatalogError::Auth("access token rejected".to_string()));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CatalogError::ApiError {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(response)
}

#[async_trait]
impl Catalog for SpotifyClient {
    fn name(&self) -> &str {
        "spotify"
    }

    async fn playlist_tracks(
        &self,
        reference: &str,
    ) -> Result<Vec<TrackDescriptor>, CatalogError> {
        let playlist_id = parse_playlist_id(reference)?;
        self.playlist_items(&playlist_id).await
    }
}

#[async_trait]
impl GenreLookup for SpotifyClient {
    async fn genres_of(&self, artist: &str) -> Result<Vec<String>, CatalogError> {
        self.artist_genres(artist).await
    }
}

// ============================================================================
// Spotify API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_lifetime")]
    expires_in: u64,
}

fn default_token_lifetime() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct PlaylistPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(default)]
    track: Option<SpTrack>,
}

#[derive(Debug, Deserialize)]
struct SpTrack {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    artists: Vec<SpArtist>,
    #[serde(default)]
    album: Option<SpAlbum>,
}

#[derive(Debug, Deserialize)]
struct SpArtist {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpAlbum {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    images: Vec<SpImage>,
}

#[derive(Debug, Deserialize)]
struct SpImage {
    url: String,
}

impl SpTrack {
    /// Episodes and removed tracks come back without a name or artist.
    fn into_descriptor(self) -> Option<TrackDescriptor> {
        let title = self.name.filter(|n| !n.is_empty())?;
        let artist = self.artists.into_iter().find_map(|a| a.name)?;
        let (album, artwork) = match self.album {
            Some(album) => (
                album.name.unwrap_or_default(),
                album.images.into_iter().next().map(|i| i.url),
            ),
            None => (String::new(), None),
        };

        let track = TrackDescriptor::new(title, artist, album);
        Some(match artwork {
            Some(url) => track.with_artwork(url),
            None => track,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ArtistSearchResponse {
    artists: ArtistPage,
}

#[derive(Debug, Deserialize)]
struct ArtistPage {
    #[serde(default)]
    items: Vec<SpArtistFull>,
}

#[derive(Debug, Deserialize)]
struct SpArtistFull {
    #[serde(default)]
    genres: Vec<String>,
}
