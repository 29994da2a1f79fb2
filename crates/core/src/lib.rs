pub mod batch;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod fetcher;
pub mod normalizer;
pub mod organizer;
pub mod pipeline;
pub mod resolver;
pub mod searcher;
pub mod tagger;
pub mod testing;
pub mod track;

mod tool;

pub use batch::{
    BatchConfig, BatchCoordinator, BatchError, BatchProgress, BatchReport, BatchRequest,
    BatchSummary, ProgressCallback, StopHandle, TrackOutcome,
};
pub use cache::{CacheError, CacheKey, JsonFileCache, LookupCache};
pub use catalog::{Catalog, CatalogError, GenreLookup, SpotifyClient, SpotifyConfig};
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use fetcher::{AudioFetcher, FetchError, FetcherConfig, YtDlpFetcher};
pub use normalizer::{
    FfmpegNormalizer, LoudnessTarget, NormalizeError, Normalizer, NormalizerConfig,
};
pub use organizer::{OrganizeError, Organizer, OrganizerConfig};
pub use pipeline::{
    PipelineConfig, PipelineResult, PipelineServices, Stage, TimeoutConfig, TrackPipeline,
};
pub use resolver::{ResolveError, SourceResolver};
pub use searcher::{SearchConfig, SearchError, SourceCandidate, SourceSearch, YtDlpSearch};
pub use tagger::{LoftyTagWriter, TagError, TagWriter};
pub use track::{OutputFormat, SortKey, TrackDescriptor, TrackTags};
