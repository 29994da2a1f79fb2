//! Configuration for the track pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::normalizer::LoudnessTarget;
use crate::organizer::OrganizerConfig;
use crate::track::{OutputFormat, SortKey};

/// Per-call timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Playlist query (batch-fatal when exceeded).
    #[serde(default = "default_catalog_secs")]
    pub catalog_secs: u64,
    /// One source search.
    #[serde(default = "default_search_secs")]
    pub search_secs: u64,
    /// One fetch.
    #[serde(default = "default_fetch_secs")]
    pub fetch_secs: u64,
    /// One normalization.
    #[serde(default = "default_normalize_secs")]
    pub normalize_secs: u64,
    /// Writing tags.
    #[serde(default = "default_tag_secs")]
    pub tag_secs: u64,
    /// One artist genre lookup.
    #[serde(default = "default_genre_secs")]
    pub genre_secs: u64,
}

fn default_catalog_secs() -> u64 {
    120
}

fn default_search_secs() -> u64 {
    60
}

fn default_fetch_secs() -> u64 {
    600
}

fn default_normalize_secs() -> u64 {
    600
}

fn default_tag_secs() -> u64 {
    30
}

fn default_genre_secs() -> u64 {
    20
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            catalog_secs: default_catalog_secs(),
            search_secs: default_search_secs(),
            fetch_secs: default_fetch_secs(),
            normalize_secs: default_normalize_secs(),
            tag_secs: default_tag_secs(),
            genre_secs: default_genre_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn catalog(&self) -> Duration {
        Duration::from_secs(self.catalog_secs)
    }

    pub fn search(&self) -> Duration {
        Duration::from_secs(self.search_secs)
    }

    pub fn fetch(&self) -> Duration {
        Duration::from_secs(self.fetch_secs)
    }

    pub fn normalize(&self) -> Duration {
        Duration::from_secs(self.normalize_secs)
    }

    pub fn tag(&self) -> Duration {
        Duration::from_secs(self.tag_secs)
    }

    pub fn genre(&self) -> Duration {
        Duration::from_secs(self.genre_secs)
    }

    /// Names of fields set to zero.
    pub fn zero_fields(&self) -> Vec<&'static str> {
        [
            ("catalog_secs", self.catalog_secs),
            ("search_secs", self.search_secs),
            ("fetch_secs", self.fetch_secs),
            ("normalize_secs", self.normalize_secs),
            ("tag_secs", self.tag_secs),
            ("genre_secs", self.genre_secs),
        ]
        .into_iter()
        .filter(|(_, v)| *v == 0)
        .map(|(name, _)| name)
        .collect()
    }
}

/// Settings for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub sort_key: SortKey,
    pub target: LoudnessTarget,
    pub timeouts: TimeoutConfig,
    pub organizer: OrganizerConfig,
}

impl PipelineConfig {
    /// Config with default target, timeouts and organizer settings.
    pub fn new(output_dir: impl Into<PathBuf>, format: OutputFormat, sort_key: SortKey) -> Self {
        Self {
            output_dir: output_dir.into(),
            format,
            sort_key,
            target: LoudnessTarget::default(),
            timeouts: TimeoutConfig::default(),
            organizer: OrganizerConfig::default(),
        }
    }

    /// Sets the timeouts.
    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Sets the loudness target.
    pub fn with_target(mut self, target: LoudnessTarget) -> Self {
        self.target = target;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = TimeoutConfig::default();
        assert_eq!(timeouts.fetch(), Duration::from_secs(600));
        assert!(timeouts.zero_fields().is_empty());
    }

    #[test]
    fn test_zero_fields() {
        let timeouts = TimeoutConfig {
            search_secs: 0,
            tag_secs: 0,
            ..Default::default()
        };
        assert_eq!(timeouts.zero_fields(), vec!["search_secs", "tag_secs"]);
    }
}
