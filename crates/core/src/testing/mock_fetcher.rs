//! Mock audio fetcher for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::fetcher::{AudioFetcher, FetchError};

/// Decrements the in-flight counter even when the fetch future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock implementation of the AudioFetcher trait.
///
/// Writes `<stem>.mp3` containing the locator, so different sources give
/// different bytes. Tracks peak concurrency for pool tests.
#[derive(Debug, Default)]
pub struct MockFetcher {
    /// Locators that always fail.
    failing: Arc<RwLock<HashSet<String>>>,
    /// If set, the next fetch will fail with this error.
    next_error: Arc<RwLock<Option<FetchError>>>,
    /// Simulated download time.
    delay: Arc<RwLock<Option<Duration>>>,
    /// Locators fetched successfully, in completion order.
    fetched: Arc<RwLock<Vec<String>>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockFetcher {
    /// Create a new mock fetcher that succeeds for every locator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every fetch of `locator` fail.
    pub async fn fail_locator(&self, locator: &str) {
        self.failing.write().await.insert(locator.to_string());
    }

    /// Make the next fetch fail.
    pub async fn set_next_error(&self, error: FetchError) {
        *self.next_error.write().await = Some(error);
    }

    /// Delay every fetch.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Number of fetches attempted.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent fetches seen.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Locators fetched successfully.
    pub async fn fetched(&self) -> Vec<String> {
        self.fetched.read().await.clone()
    }

    /// Content written for `locator`.
    pub fn content_for(locator: &str) -> Vec<u8> {
        format!("mock-audio:{}", locator).into_bytes()
    }
}

#[async_trait]
impl AudioFetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, locator: &str, stem: &Path) -> Result<PathBuf, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        if self.failing.read().await.contains(locator) {
            return Err(FetchError::backend_failed(
                format!("mock failure for {}", locator),
                None,
            ));
        }

        if let Some(parent) = stem.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut name = stem.as_os_str().to_os_string();
        name.push(".mp3");
        let path = PathBuf::from(name);
        tokio::fs::write(&path, Self::content_for(locator)).await?;

        self.fetched.write().await.push(locator.to_string());
        Ok(path)
    }
}
