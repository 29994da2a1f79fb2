//! Shared harness for batch integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use steep_core::{
    testing::{
        fixtures, MockCatalog, MockFetcher, MockGenreLookup, MockNormalizer, MockSearch,
        MockTagWriter,
    },
    BatchConfig, BatchCoordinator, BatchReport, BatchRequest, JsonFileCache, OutputFormat,
    PipelineServices, SortKey, StopHandle, TrackDescriptor,
};

/// A coordinator wired to mocks over a temporary output directory.
pub struct TestHarness {
    pub temp_dir: TempDir,
    pub catalog: Arc<MockCatalog>,
    pub search: Arc<MockSearch>,
    pub cache: Arc<JsonFileCache>,
    pub fetcher: Arc<MockFetcher>,
    pub normalizer: Arc<MockNormalizer>,
    pub tagger: Arc<MockTagWriter>,
    pub genres: Arc<MockGenreLookup>,
    pub sort_key: SortKey,
}

impl TestHarness {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cache = Arc::new(JsonFileCache::load(temp_dir.path().join("cache.json")).await);

        Self {
            temp_dir,
            catalog: Arc::new(MockCatalog::new()),
            search: Arc::new(MockSearch::new()),
            cache,
            fetcher: Arc::new(MockFetcher::new()),
            normalizer: Arc::new(MockNormalizer::new()),
            tagger: Arc::new(MockTagWriter::new()),
            genres: Arc::new(MockGenreLookup::new()),
            sort_key: SortKey::Artist,
        }
    }

    /// Sets the playlist and gives every track its own search result.
    pub async fn with_tracks(self, tracks: Vec<TrackDescriptor>) -> Self {
        for track in &tracks {
            self.search
                .set_results(&track.search_query(), fixtures::candidate_for(track))
                .await;
        }
        self.catalog.set_tracks(tracks).await;
        self
    }

    pub fn with_sort_key(mut self, sort_key: SortKey) -> Self {
        self.sort_key = sort_key;
        self
    }

    pub fn output_dir(&self) -> PathBuf {
        self.temp_dir.path().join("library")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.temp_dir.path().join("cache.json")
    }

    pub fn services(&self) -> PipelineServices {
        PipelineServices {
            search: self.search.clone(),
            cache: self.cache.clone(),
            fetcher: self.fetcher.clone(),
            normalizer: self.normalizer.clone(),
            tagger: self.tagger.clone(),
            genre_lookup: Some(self.genres.clone()),
        }
    }

    pub fn coordinator(&self, workers: usize) -> BatchCoordinator {
        BatchCoordinator::new(
            self.catalog.clone(),
            self.services(),
            BatchConfig::default().with_max_concurrent(workers),
        )
    }

    pub fn request(&self) -> BatchRequest {
        BatchRequest {
            playlist: fixtures::PLAYLIST_REF.to_string(),
            format: OutputFormat::Mp3,
            sort_key: self.sort_key,
            output_dir: self.output_dir(),
        }
    }

    /// Runs one batch to completion.
    pub async fn run(&self, workers: usize) -> BatchReport {
        self.coordinator(workers)
            .run(self.request(), None, StopHandle::new())
            .await
            .expect("batch should not fail")
    }
}

/// Every regular file under `root`, relative to it, sorted.
pub fn files_under(root: &Path) -> Vec<PathBuf> {
    fn walk(dir: &Path, root: &Path, out: &mut Vec<PathBuf>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(&path, root, out);
            } else {
                out.push(path.strip_prefix(root).unwrap().to_path_buf());
            }
        }
    }

    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}
