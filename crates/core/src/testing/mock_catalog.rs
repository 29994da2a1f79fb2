//! Mock catalog and genre lookup for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::catalog::{Catalog, CatalogError, GenreLookup};
use crate::track::TrackDescriptor;

/// Mock implementation of the Catalog trait.
///
/// Returns the configured tracks for any reference.
#[derive(Debug, Default)]
pub struct MockCatalog {
    tracks: Arc<RwLock<Vec<TrackDescriptor>>>,
    /// If set, the next query will fail with this error.
    next_error: Arc<RwLock<Option<CatalogError>>>,
    /// Simulated latency.
    delay: Arc<RwLock<Option<Duration>>>,
    /// References queried.
    requests: Arc<RwLock<Vec<String>>>,
}

impl MockCatalog {
    /// Create a new mock catalog with an empty playlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the playlist contents.
    pub async fn set_tracks(&self, tracks: Vec<TrackDescriptor>) {
        *self.tracks.write().await = tracks;
    }

    /// Make the next query fail.
    pub async fn set_next_error(&self, error: CatalogError) {
        *self.next_error.write().await = Some(error);
    }

    /// Delay every query.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// References queried so far.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    fn name(&self) -> &str {
        "mock"
    }

    async fn playlist_tracks(
        &self,
        reference: &str,
    ) -> Result<Vec<TrackDescriptor>, CatalogError> {
        self.requests.write().await.push(reference.to_string());

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(self.tracks.read().await.clone())
    }
}

/// Mock implementation of the GenreLookup trait.
///
/// Artists without configured genres get an empty list.
#[derive(Debug, Default)]
pub struct MockGenreLookup {
    genres: Arc<RwLock<HashMap<String, Vec<String>>>>,
    /// If set, the next lookup will fail with this error.
    next_error: Arc<RwLock<Option<CatalogError>>>,
    calls: AtomicUsize,
}

impl MockGenreLookup {
    /// Create a new mock lookup with no genres.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the genres for an artist.
    pub async fn set_genres(&self, artist: &str, genres: Vec<String>) {
        self.genres.write().await.insert(artist.to_string(), genres);
    }

    /// Make the next lookup fail.
    pub async fn set_next_error(&self, error: CatalogError) {
        *self.next_error.write().await = Some(error);
    }

    /// Number of lookups issued.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenreLookup for MockGenreLookup {
    async fn genres_of(&self, artist: &str) -> Result<Vec<String>, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(self
            .genres
            .read()
            .await
            .get(artist)
            .cloned()
            .unwrap_or_default())
    }
}
