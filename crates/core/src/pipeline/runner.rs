//! Drives one track through resolve, fetch, normalize, tag and organize.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use crate::cache::LookupCache;
use crate::catalog::GenreLookup;
use crate::fetcher::AudioFetcher;
use crate::normalizer::{partial_path, NormalizeJob, Normalizer};
use crate::organizer::{OrganizeOutcome, Organizer};
use crate::resolver::SourceResolver;
use crate::searcher::SourceSearch;
use crate::tagger::TagWriter;
use crate::track::{OutputLayout, TrackDescriptor};

use super::config::PipelineConfig;
use super::types::{PipelineResult, SkipReason, Stage, StageWarning, TrackState};

/// The collaborators a pipeline calls.
#[derive(Clone)]
pub struct PipelineServices {
    pub search: Arc<dyn SourceSearch>,
    pub cache: Arc<dyn LookupCache>,
    pub fetcher: Arc<dyn AudioFetcher>,
    pub normalizer: Arc<dyn Normalizer>,
    pub tagger: Arc<dyn TagWriter>,
    pub genre_lookup: Option<Arc<dyn GenreLookup>>,
}

/// Per-track state machine.
///
/// Each call to [`TrackPipeline::process`] owns the intermediate files of its
/// track and removes them on every exit path. Calls for tracks that map to the
/// same file name run one after the other, so a repeated playlist entry ends
/// up `Skipped` instead of sharing work paths with the first one.
pub struct TrackPipeline {
    config: PipelineConfig,
    file_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    layout: OutputLayout,
    resolver: SourceResolver,
    organizer: Organizer,
    fetcher: Arc<dyn AudioFetcher>,
    normalizer: Arc<dyn Normalizer>,
    tagger: Arc<dyn TagWriter>,
}

impl TrackPipeline {
    pub fn new(config: PipelineConfig, services: PipelineServices) -> Self {
        let layout = OutputLayout::new(config.output_dir.clone(), config.format);
        let resolver = SourceResolver::new(
            services.search,
            services.cache,
            config.timeouts.search(),
        );
        let organizer = Organizer::new(
            services.genre_lookup,
            config.timeouts.genre(),
            config.organizer.clone(),
        );

        Self {
            config,
            file_locks: Mutex::new(HashMap::new()),
            layout,
            resolver,
            organizer,
            fetcher: services.fetcher,
            normalizer: services.normalizer,
            tagger: services.tagger,
        }
    }

    /// The naming used by this pipeline.
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Runs `track` to a terminal state.
    pub async fn process(&self, track: &TrackDescriptor) -> PipelineResult {
        let file_lock = self.file_lock(track).await;
        let _guard = file_lock.lock().await;
        self.run_stages(track).await
    }

    /// The lock for the file name `track` is written under.
    async fn file_lock(&self, track: &TrackDescriptor) -> Arc<Mutex<()>> {
        let mut locks = self.file_locks.lock().await;
        Arc::clone(locks.entry(self.layout.file_name(track)).or_default())
    }

    async fn run_stages(&self, track: &TrackDescriptor) -> PipelineResult {
        let label = track.label();
        transition(&label, TrackState::Start);

        if let Some(path) = self.layout.find_existing(track).await {
            transition(&label, TrackState::Skipped);
            info!(track = %label, path = %path.display(), "Already exists, skipping");
            return PipelineResult::Skipped {
                reason: SkipReason::AlreadyExists,
                path,
            };
        }

        transition(&label, TrackState::Resolving);
        let locator = match self.resolver.resolve(track).await {
            Ok(locator) => locator,
            Err(e) => return failed(&label, Stage::Resolve, e.to_string()),
        };
        debug!(track = %label, %locator, "Resolved source");

        transition(&label, TrackState::Fetching);
        let stem = self.layout.fetch_stem(track);
        let fetched = bounded(
            self.config.timeouts.fetch(),
            self.fetcher.fetch(&locator, &stem),
        )
        .await;
        let raw = match fetched {
            Ok(path) => path,
            Err(cause) => {
                remove_fetch_leftovers(&stem).await;
                return failed(&label, Stage::Fetch, cause);
            }
        };

        transition(&label, TrackState::Normalizing);
        let staging = self.layout.staging_path(track);
        let job = NormalizeJob {
            input_path: raw.clone(),
            output_path: staging.clone(),
            format: self.config.format,
            target: self.config.target,
        };
        let normalized = bounded(
            self.config.timeouts.normalize(),
            self.normalizer.normalize(&job),
        )
        .await;

        // The raw artifact is no longer needed either way.
        if normalized.as_ref().map_or(true, |out| *out != raw) {
            remove_quietly(&raw).await;
        }

        let normalized = match normalized {
            Ok(path) => path,
            Err(cause) => {
                remove_quietly(&partial_path(&staging)).await;
                return failed(&label, Stage::Normalize, cause);
            }
        };

        transition(&label, TrackState::Tagging);
        let tagged = bounded(
            self.config.timeouts.tag(),
            self.tagger
                .write_tags(&normalized, &track.tags(), self.config.format),
        )
        .await;
        if let Err(cause) = tagged {
            // An untagged file would be skipped on the next run, so drop it.
            remove_quietly(&normalized).await;
            return failed(&label, Stage::Tag, cause);
        }

        transition(&label, TrackState::Organizing);
        let mut warnings = Vec::new();
        let path = match self
            .organizer
            .organize(&normalized, track, self.config.sort_key, &self.layout)
            .await
        {
            OrganizeOutcome::Moved(path) => path,
            OrganizeOutcome::LeftInPlace { path, error } => {
                warn!(
                    track = %label,
                    stage = %Stage::Organize,
                    path = %path.display(),
                    error = %error,
                    "Could not organize, leaving file in place"
                );
                warnings.push(StageWarning {
                    stage: Stage::Organize,
                    message: error.to_string(),
                });
                path
            }
        };

        transition(&label, TrackState::Done);
        info!(track = %label, path = %path.display(), "Track finished");
        PipelineResult::Succeeded { path, warnings }
    }
}

fn transition(label: &str, state: TrackState) {
    trace!(track = %label, ?state, "State");
}

fn failed(label: &str, stage: Stage, cause: String) -> PipelineResult {
    transition(label, TrackState::Failed(stage));
    warn!(track = %label, %stage, %cause, "Track failed");
    PipelineResult::FailedAtStage { stage, cause }
}

/// Awaits `fut` for at most `limit`, flattening both failure kinds into a
/// cause string.
async fn bounded<T, E, F>(limit: Duration, fut: F) -> Result<T, String>
where
    F: Future<Output = Result<T, E>>,
    E: std::error::Error,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {} seconds", limit.as_secs())),
    }
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => trace!(path = %path.display(), "Removed intermediate file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove intermediate file"),
    }
}

/// Removes whatever a failed or cancelled fetch left next to `stem`.
async fn remove_fetch_leftovers(stem: &Path) {
    let (Some(dir), Some(name)) = (stem.parent(), stem.file_name()) else {
        return;
    };
    let prefix = format!("{}.", name.to_string_lossy());

    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return;
    };
    let mut leftovers: Vec<PathBuf> = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            leftovers.push(entry.path());
        }
    }
    for path in leftovers {
        remove_quietly(&path).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheKey, JsonFileCache};
    use crate::catalog::CatalogError;
    use crate::fetcher::FetchError;
    use crate::normalizer::NormalizeError;
    use crate::searcher::SourceCandidate;
    use crate::tagger::TagError;
    use crate::testing::{
        MockFetcher, MockGenreLookup, MockNormalizer, MockSearch, MockTagWriter,
    };
    use crate::track::{OutputFormat, SortKey};
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        search: Arc<MockSearch>,
        cache: Arc<JsonFileCache>,
        fetcher: Arc<MockFetcher>,
        normalizer: Arc<MockNormalizer>,
        tagger: Arc<MockTagWriter>,
        genres: Arc<MockGenreLookup>,
    }

    impl Fixture {
        async fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let cache = Arc::new(JsonFileCache::load(temp.path().join("cache.json")).await);
            let search = Arc::new(MockSearch::new());
            search
                .set_default_results(vec![SourceCandidate::new("https://src/1")])
                .await;
            Self {
                temp,
                search,
                cache,
                fetcher: Arc::new(MockFetcher::new()),
                normalizer: Arc::new(MockNormalizer::new()),
                tagger: Arc::new(MockTagWriter::new()),
                genres: Arc::new(MockGenreLookup::new()),
            }
        }

        fn output_dir(&self) -> PathBuf {
            self.temp.path().join("music")
        }

        fn pipeline(&self, sort_key: SortKey) -> TrackPipeline {
            let services = PipelineServices {
                search: self.search.clone(),
                cache: self.cache.clone(),
                fetcher: self.fetcher.clone(),
                normalizer: self.normalizer.clone(),
                tagger: self.tagger.clone(),
                genre_lookup: Some(self.genres.clone()),
            };
            TrackPipeline::new(
                PipelineConfig::new(self.output_dir(), OutputFormat::Mp3, sort_key),
                services,
            )
        }
    }

    fn track() -> TrackDescriptor {
        TrackDescriptor::new("Song: Remastered!", "Band", "Album")
    }

    fn work_dir_is_empty(pipeline: &TrackPipeline) -> bool {
        match std::fs::read_dir(pipeline.layout().work_dir()) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }

    #[tokio::test]
    async fn test_success_path() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline(SortKey::Artist);

        let result = pipeline.process(&track()).await;

        let expected = fx.output_dir().join("Band").join("Band - Song Remastered.mp3");
        assert_eq!(
            result,
            PipelineResult::Succeeded {
                path: expected.clone(),
                warnings: vec![]
            }
        );
        assert!(expected.exists());
        assert!(!pipeline.layout().staging_path(&track()).exists());
        assert!(work_dir_is_empty(&pipeline));
        assert_eq!(fx.tagger.written().await.len(), 1);
    }

    #[tokio::test]
    async fn test_existing_output_skips_before_network() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline(SortKey::Artist);
        let staging = pipeline.layout().staging_path(&track());
        std::fs::create_dir_all(staging.parent().unwrap()).unwrap();
        std::fs::write(&staging, b"done").unwrap();

        let result = pipeline.process(&track()).await;

        assert!(result.is_skipped());
        assert_eq!(result.path(), Some(staging.as_path()));
        assert_eq!(fx.search.call_count(), 0);
        assert_eq!(fx.fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_search() {
        let fx = Fixture::new().await;
        fx.cache
            .put(&CacheKey::for_track(&track()), "https://cached")
            .await
            .unwrap();
        let pipeline = fx.pipeline(SortKey::Artist);

        assert!(pipeline.process(&track()).await.is_succeeded());
        assert_eq!(fx.search.call_count(), 0);
        assert_eq!(fx.fetcher.fetched().await, vec!["https://cached".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_search_fails_at_resolve() {
        let fx = Fixture::new().await;
        fx.search.set_default_results(vec![]).await;
        let pipeline = fx.pipeline(SortKey::Artist);

        let result = pipeline.process(&track()).await;
        assert_eq!(result.failed_stage(), Some(Stage::Resolve));
        assert_eq!(fx.fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_cleans_up() {
        let fx = Fixture::new().await;
        fx.fetcher
            .set_next_error(FetchError::backend_failed("403", None))
            .await;
        let pipeline = fx.pipeline(SortKey::Artist);

        let result = pipeline.process(&track()).await;
        assert_eq!(result.failed_stage(), Some(Stage::Fetch));
        assert!(work_dir_is_empty(&pipeline));
        assert_eq!(fx.normalizer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_normalize_failure_removes_raw() {
        let fx = Fixture::new().await;
        fx.normalizer
            .set_next_error(NormalizeError::normalization_failed("bad input", None))
            .await;
        let pipeline = fx.pipeline(SortKey::Artist);

        let result = pipeline.process(&track()).await;
        assert_eq!(result.failed_stage(), Some(Stage::Normalize));
        assert!(work_dir_is_empty(&pipeline));
        assert!(!pipeline.layout().staging_path(&track()).exists());
    }

    #[tokio::test]
    async fn test_tag_failure_fails_and_removes_output() {
        let fx = Fixture::new().await;
        fx.tagger
            .set_next_error(TagError::Task("tag writer crashed".to_string()))
            .await;
        let pipeline = fx.pipeline(SortKey::Artist);

        let result = pipeline.process(&track()).await;
        assert_eq!(result.failed_stage(), Some(Stage::Tag));
        assert!(pipeline.layout().find_existing(&track()).await.is_none());
    }

    #[tokio::test]
    async fn test_organize_failure_is_warning() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline(SortKey::Artist);
        std::fs::create_dir_all(fx.output_dir()).unwrap();
        std::fs::write(fx.output_dir().join("Band"), b"blocks the folder").unwrap();

        let result = pipeline.process(&track()).await;

        let staging = pipeline.layout().staging_path(&track());
        assert!(result.is_succeeded());
        assert_eq!(result.path(), Some(staging.as_path()));
        assert_eq!(result.warnings().len(), 1);
        assert_eq!(result.warnings()[0].stage, Stage::Organize);
        assert!(staging.exists());
    }

    #[tokio::test]
    async fn test_genre_sorting_falls_back_to_unknown() {
        let fx = Fixture::new().await;
        fx.genres.set_next_error(CatalogError::RateLimitExceeded).await;
        let pipeline = fx.pipeline(SortKey::Genre);

        let result = pipeline.process(&track()).await;
        assert_eq!(
            result.path(),
            Some(
                fx.output_dir()
                    .join("Unknown")
                    .join("Band - Song Remastered.mp3")
                    .as_path()
            )
        );
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let fx = Fixture::new().await;
        fx.fetcher.set_delay(Duration::from_secs(5)).await;
        let mut config = PipelineConfig::new(fx.output_dir(), OutputFormat::Mp3, SortKey::Artist);
        config.timeouts.fetch_secs = 1;
        let pipeline = TrackPipeline::new(
            config,
            PipelineServices {
                search: fx.search.clone(),
                cache: fx.cache.clone(),
                fetcher: fx.fetcher.clone(),
                normalizer: fx.normalizer.clone(),
                tagger: fx.tagger.clone(),
                genre_lookup: None,
            },
        );

        let result = pipeline.process(&track()).await;
        match result {
            PipelineResult::FailedAtStage { stage, cause } => {
                assert_eq!(stage, Stage::Fetch);
                assert!(cause.contains("timed out"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_normalize_timeout_leaves_no_partial() {
        let fx = Fixture::new().await;
        fx.normalizer.set_delay(Duration::from_secs(5)).await;
        let mut config = PipelineConfig::new(fx.output_dir(), OutputFormat::Mp3, SortKey::Artist);
        config.timeouts.normalize_secs = 1;
        let pipeline = TrackPipeline::new(
            config,
            PipelineServices {
                search: fx.search.clone(),
                cache: fx.cache.clone(),
                fetcher: fx.fetcher.clone(),
                normalizer: fx.normalizer.clone(),
                tagger: fx.tagger.clone(),
                genre_lookup: None,
            },
        );

        let result = pipeline.process(&track()).await;

        match result {
            PipelineResult::FailedAtStage { stage, cause } => {
                assert_eq!(stage, Stage::Normalize);
                assert!(cause.contains("timed out"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        let staging = pipeline.layout().staging_path(&track());
        assert!(!partial_path(&staging).exists());
        assert!(!staging.exists());
        assert!(work_dir_is_empty(&pipeline));
        assert!(fx.tagger.written().await.is_empty());
    }

    #[tokio::test]
    async fn test_same_file_name_runs_once_then_skips() {
        let fx = Fixture::new().await;
        fx.fetcher.set_delay(Duration::from_millis(30)).await;
        let pipeline = fx.pipeline(SortKey::Artist);
        // Sanitizes to the same file name as track().
        let twin = TrackDescriptor::new("Song Remastered", "Band", "Other Album");

        let original = track();
        let (first, second) = tokio::join!(pipeline.process(&original), pipeline.process(&twin));

        let mut results = [first, second];
        results.sort_by_key(|r| r.is_skipped());
        assert!(results[0].is_succeeded(), "{:?}", results[0]);
        assert!(results[1].is_skipped(), "{:?}", results[1]);
        assert_eq!(results[0].path(), results[1].path());
        assert_eq!(fx.fetcher.call_count(), 1);
        assert_eq!(fx.normalizer.call_count(), 1);
        assert!(work_dir_is_empty(&pipeline));
    }

    #[tokio::test]
    async fn test_remove_fetch_leftovers_only_matches_stem() {
        let temp = TempDir::new().unwrap();
        let stem = temp.path().join("Band - Song");
        std::fs::write(temp.path().join("Band - Song.webm.part"), b"x").unwrap();
        std::fs::write(temp.path().join("Band - Song.mp3"), b"x").unwrap();
        std::fs::write(temp.path().join("Band - Song 2.mp3"), b"x").unwrap();

        remove_fetch_leftovers(&stem).await;

        let remaining: Vec<String> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(remaining, vec!["Band - Song 2.mp3".to_string()]);
    }
}
