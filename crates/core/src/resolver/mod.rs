//! Source resolution: track → source locator, through the lookup cache.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::{CacheKey, LookupCache};
use crate::searcher::{SearchError, SourceSearch};
use crate::track::TrackDescriptor;

/// Errors that can occur while resolving a source.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The search ran but returned nothing.
    #[error("No source found for query: {query}")]
    NotFound { query: String },

    /// The search backend failed.
    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    /// The search did not finish in time.
    #[error("Search timed out after {secs} seconds")]
    Timeout { secs: u64 },
}

/// Resolves tracks to source locators, consulting the cache first.
pub struct SourceResolver {
    search: Arc<dyn SourceSearch>,
    cache: Arc<dyn LookupCache>,
    timeout: Duration,
}

impl SourceResolver {
    pub fn new(
        search: Arc<dyn SourceSearch>,
        cache: Arc<dyn LookupCache>,
        timeout: Duration,
    ) -> Self {
        Self {
            search,
            cache,
            timeout,
        }
    }

    /// Returns the locator for `track`.
    ///
    /// A cache hit returns without searching. A miss issues exactly one search,
    /// takes the first candidate and stores it. A failed cache write is logged
    /// and does not fail the resolution.
    pub async fn resolve(&self, track: &TrackDescriptor) -> Result<String, ResolveError> {
        let key = CacheKey::for_track(track);
        if let Some(locator) = self.cache.get(&key).await {
            debug!(track = %track.label(), %key, "Cache hit");
            return Ok(locator);
        }

        let query = track.search_query();
        debug!(track = %track.label(), %query, backend = self.search.name(), "Cache miss, searching");

        let candidates = tokio::time::timeout(self.timeout, self.search.search(&query))
            .await
            .map_err(|_| ResolveError::Timeout {
                secs: self.timeout.as_secs(),
            })??;

        let locator = candidates
            .into_iter()
            .next()
            .map(|c| c.locator)
            .ok_or_else(|| ResolveError::NotFound {
                query: query.clone(),
            })?;

        if let Err(e) = self.cache.put(&key, &locator).await {
            warn!(track = %track.label(), error = %e, "Failed to persist search cache");
        }

        Ok(locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::JsonFileCache;
    use crate::searcher::SourceCandidate;
    use crate::testing::MockSearch;
    use tempfile::TempDir;

    fn track() -> TrackDescriptor {
        TrackDescriptor::new("Digital Love", "Daft Punk", "Discovery")
    }

    async fn setup(search: Arc<MockSearch>) -> (TempDir, Arc<JsonFileCache>, SourceResolver) {
        let temp = TempDir::new().unwrap();
        let cache = Arc::new(JsonFileCache::load(temp.path().join("cache.json")).await);
        let resolver = SourceResolver::new(search, cache.clone(), Duration::from_secs(5));
        (temp, cache, resolver)
    }

    #[tokio::test]
    async fn test_miss_searches_once_and_caches() {
        let search = Arc::new(MockSearch::new());
        search
            .set_results(
                "Daft Punk Digital Love audio",
                vec![SourceCandidate::new("loc-1"), SourceCandidate::new("loc-2")],
            )
            .await;
        let (_temp, cache, resolver) = setup(search.clone()).await;

        assert_eq!(resolver.resolve(&track()).await.unwrap(), "loc-1");
        assert_eq!(search.call_count(), 1);
        assert_eq!(
            cache.get(&CacheKey::for_track(&track())).await.as_deref(),
            Some("loc-1")
        );
    }

    #[tokio::test]
    async fn test_hit_never_searches() {
        let search = Arc::new(MockSearch::new());
        let (_temp, cache, resolver) = setup(search.clone()).await;
        cache
            .put(&CacheKey::for_track(&track()), "cached")
            .await
            .unwrap();

        assert_eq!(resolver.resolve(&track()).await.unwrap(), "cached");
        assert_eq!(search.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_results_is_not_found() {
        let search = Arc::new(MockSearch::new());
        let (_temp, cache, resolver) = setup(search.clone()).await;

        let err = resolver.resolve(&track()).await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_backend_error_is_reported() {
        let search = Arc::new(MockSearch::new());
        search
            .set_next_error(SearchError::backend_failed("boom", None))
            .await;
        let (_temp, _cache, resolver) = setup(search.clone()).await;

        let err = resolver.resolve(&track()).await.unwrap_err();
        assert!(matches!(err, ResolveError::Search(_)));
    }

    #[tokio::test]
    async fn test_slow_search_times_out() {
        let search = Arc::new(MockSearch::new());
        search.set_delay(Duration::from_millis(500)).await;
        let temp = TempDir::new().unwrap();
        let cache = Arc::new(JsonFileCache::load(temp.path().join("cache.json")).await);
        let resolver = SourceResolver::new(search, cache, Duration::from_millis(20));

        let err = resolver.resolve(&track()).await.unwrap_err();
        assert!(matches!(err, ResolveError::Timeout { .. }));
    }
}
