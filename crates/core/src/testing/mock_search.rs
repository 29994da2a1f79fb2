//! Mock source search for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::searcher::{SearchError, SourceCandidate, SourceSearch};

/// Mock implementation of the SourceSearch trait.
///
/// Results are looked up by exact query string, falling back to the default
/// result list. Every call is counted and recorded.
#[derive(Debug, Default)]
pub struct MockSearch {
    /// Results per query.
    results: Arc<RwLock<HashMap<String, Vec<SourceCandidate>>>>,
    /// Results for queries without an entry.
    default_results: Arc<RwLock<Vec<SourceCandidate>>>,
    /// Recorded queries.
    queries: Arc<RwLock<Vec<String>>>,
    /// If set, the next search will fail with this error.
    next_error: Arc<RwLock<Option<SearchError>>>,
    /// Simulated latency.
    delay: Arc<RwLock<Option<Duration>>>,
    calls: AtomicUsize,
}

impl MockSearch {
    /// Create a new mock search returning no results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the results for one query.
    pub async fn set_results(&self, query: &str, results: Vec<SourceCandidate>) {
        self.results.write().await.insert(query.to_string(), results);
    }

    /// Set the results for queries without their own entry.
    pub async fn set_default_results(&self, results: Vec<SourceCandidate>) {
        *self.default_results.write().await = results;
    }

    /// Make the next search fail.
    pub async fn set_next_error(&self, error: SearchError) {
        *self.next_error.write().await = Some(error);
    }

    /// Delay every search.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Number of searches issued.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Queries searched so far, in call order.
    pub async fn recorded_queries(&self) -> Vec<String> {
        self.queries.read().await.clone()
    }
}

#[async_trait]
impl SourceSearch for MockSearch {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, query: &str) -> Result<Vec<SourceCandidate>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.write().await.push(query.to_string());

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        if let Some(results) = self.results.read().await.get(query) {
            return Ok(results.clone());
        }
        Ok(self.default_results.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_per_query_and_default_results() {
        let search = MockSearch::new();
        search
            .set_results("a", vec![SourceCandidate::new("loc-a")])
            .await;
        search
            .set_default_results(vec![SourceCandidate::new("loc-default")])
            .await;

        assert_eq!(search.search("a").await.unwrap()[0].locator, "loc-a");
        assert_eq!(search.search("b").await.unwrap()[0].locator, "loc-default");
        assert_eq!(search.call_count(), 2);
        assert_eq!(search.recorded_queries().await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_next_error_is_one_shot() {
        let search = MockSearch::new();
        search
            .set_next_error(SearchError::ParseError("bad".to_string()))
            .await;

        assert!(search.search("q").await.is_err());
        assert!(search.search("q").await.unwrap().is_empty());
    }
}
