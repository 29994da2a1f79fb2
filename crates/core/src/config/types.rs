use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::batch::BatchConfig;
use crate::catalog::SpotifyConfig;
use crate::fetcher::FetcherConfig;
use crate::normalizer::{LoudnessTarget, NormalizerConfig};
use crate::organizer::OrganizerConfig;
use crate::pipeline::TimeoutConfig;
use crate::searcher::SearchConfig;
use crate::track::{OutputFormat, SortKey};

/// Root configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub loudness: LoudnessTarget,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub organizer: OrganizerConfig,
}

impl Config {
    /// Replaces a leading `~` in every configured path with the home directory.
    pub fn expand_paths(&mut self) {
        expand_in_place(&mut self.output.dir);
        expand_in_place(&mut self.cache.path);
        expand_in_place(&mut self.search.ytdlp_path);
        expand_in_place(&mut self.fetcher.ytdlp_path);
        expand_in_place(&mut self.normalizer.ffmpeg_path);
    }
}

/// Where and how finished files are written.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Library root.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub sort_key: SortKey,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            format: OutputFormat::default(),
            sort_key: SortKey::default(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    dirs::audio_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Music")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("steep")
}

/// Lookup cache location.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
        }
    }
}

fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("steep")
        .join("search_cache.json")
}

/// Expands a leading `~` component.
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

fn expand_in_place(path: &mut PathBuf) {
    *path = expand_tilde(path);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.output.format, OutputFormat::Mp3);
        assert_eq!(config.output.sort_key, SortKey::Artist);
        assert!(config.output.dir.ends_with("steep"));
        assert!(config.cache.path.ends_with("search_cache.json"));
        assert_eq!(config.batch.max_concurrent_tracks, 0);
        assert_eq!(config.loudness, LoudnessTarget::default());
        assert_eq!(config.timeouts, TimeoutConfig::default());
        assert!(!config.spotify.has_credentials());
    }

    #[test]
    fn test_deserialize_sections() {
        let toml = r#"
[output]
dir = "/music"
format = "flac"
sort_key = "genre"

[batch]
max_concurrent_tracks = 3

[cache]
path = "/tmp/cache.json"

[spotify]
client_id = "id"
client_secret = "secret"

[normalizer]
mp3_bitrate_kbps = 256

[loudness]
integrated_lufs = -16.0

[timeouts]
fetch_secs = 900
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.output.dir, PathBuf::from("/music"));
        assert_eq!(config.output.format, OutputFormat::Flac);
        assert_eq!(config.output.sort_key, SortKey::Genre);
        assert_eq!(config.batch.max_concurrent_tracks, 3);
        assert_eq!(config.cache.path, PathBuf::from("/tmp/cache.json"));
        assert!(config.spotify.has_credentials());
        assert_eq!(config.normalizer.mp3_bitrate_kbps, 256);
        assert_eq!(config.loudness.integrated_lufs, -16.0);
        assert_eq!(config.loudness.true_peak_db, -1.5);
        assert_eq!(config.timeouts.fetch_secs, 900);
        assert_eq!(config.timeouts.search_secs, TimeoutConfig::default().search_secs);
    }

    #[test]
    fn test_unknown_format_fails() {
        let result: Result<Config, _> = toml::from_str("[output]\nformat = \"ogg\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_serialized_config_hides_secret() {
        let mut config = Config::default();
        config.spotify.client_id = Some("id".to_string());
        config.spotify.client_secret = Some("hunter2".to_string());

        let rendered = toml::to_string(&config).unwrap();
        assert!(rendered.contains("client_id"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_tilde(Path::new("~/Music")), home.join("Music"));
        assert_eq!(expand_tilde(Path::new("/abs/~/x")), PathBuf::from("/abs/~/x"));
        assert_eq!(expand_tilde(Path::new("rel")), PathBuf::from("rel"));
    }
}
