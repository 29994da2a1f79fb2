//! yt-dlp based fetcher.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{AudioFetcher, FetchError};
use crate::searcher::default_ytdlp_path;
use crate::tool::{probe_tool, run_tool};

/// Configuration for the yt-dlp fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Path to the yt-dlp binary.
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: PathBuf,

    /// Format selector passed to `-f`.
    #[serde(default = "default_format_selector")]
    pub format_selector: String,

    /// Codec the audio is extracted to (lossy staging before normalization).
    #[serde(default = "default_staging_codec")]
    pub staging_codec: String,

    /// yt-dlp `--audio-quality` (0 is best VBR).
    #[serde(default = "default_audio_quality")]
    pub audio_quality: String,

    /// Additional yt-dlp arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_format_selector() -> String {
    "bestaudio/best".to_string()
}

fn default_staging_codec() -> String {
    "mp3".to_string()
}

fn default_audio_quality() -> String {
    "0".to_string()
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            format_selector: default_format_selector(),
            staging_codec: default_staging_codec(),
            audio_quality: default_audio_quality(),
            extra_args: Vec::new(),
        }
    }
}

/// Fetches audio with yt-dlp and extracts it to the staging codec.
pub struct YtDlpFetcher {
    config: FetcherConfig,
}

impl YtDlpFetcher {
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }

    /// Path yt-dlp produces for `stem` after extraction.
    pub fn output_path(&self, stem: &Path) -> PathBuf {
        let mut name = stem.as_os_str().to_os_string();
        name.push(".");
        name.push(&self.config.staging_codec);
        PathBuf::from(name)
    }

    fn build_args(&self, locator: &str, stem: &Path) -> Vec<String> {
        let template = format!("{}.%(ext)s", stem.display());
        let mut args = vec![
            "-f".to_string(),
            self.config.format_selector.clone(),
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            "--quiet".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            self.config.staging_codec.clone(),
            "--audio-quality".to_string(),
            self.config.audio_quality.clone(),
            "--force-overwrites".to_string(),
            "-o".to_string(),
            template,
        ];
        args.extend(self.config.extra_args.iter().cloned());
        // Locators starting with '-' must not be read as options.
        args.push("--".to_string());
        args.push(locator.to_string());
        args
    }
}

#[async_trait]
impl AudioFetcher for YtDlpFetcher {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn fetch(&self, locator: &str, stem: &Path) -> Result<PathBuf, FetchError> {
        if let Some(parent) = stem.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = self.build_args(locator, stem);
        let output = run_tool(&self.config.ytdlp_path, &args)
            .await
            .map_err(|source| FetchError::Launch {
                program: self.config.ytdlp_path.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(FetchError::backend_failed(
                format!("yt-dlp exited with code {:?}", output.status.code()),
                output.stderr_tail(5),
            ));
        }

        let path = self.output_path(stem);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(FetchError::MissingOutput { path });
        }

        debug!(locator, path = %path.display(), "Fetched audio");
        Ok(path)
    }

    async fn validate(&self) -> Result<(), FetchError> {
        probe_tool(&self.config.ytdlp_path, "--version")
            .await
            .map_err(|source| FetchError::Launch {
                program: self.config.ytdlp_path.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_build_args() {
        let fetcher = YtDlpFetcher::new(FetcherConfig::default());
        let stem = PathBuf::from("/music/.steep-work/Band - Song");
        let args = fetcher.build_args("https://www.youtube.com/watch?v=abc", &stem);

        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("-f") + 1], "bestaudio/best");
        assert_eq!(args[pos("--audio-format") + 1], "mp3");
        assert_eq!(args[pos("-o") + 1], "/music/.steep-work/Band - Song.%(ext)s");
        assert!(args.contains(&"--no-playlist".to_string()));
        assert_eq!(args[args.len() - 2], "--");
        assert_eq!(args.last().unwrap(), "https://www.youtube.com/watch?v=abc");
    }

    #[test]
    fn test_output_path_keeps_dots_in_stem() {
        let fetcher = YtDlpFetcher::new(FetcherConfig::default());
        assert_eq!(
            fetcher.output_path(Path::new("/w/Mr. Band - Song")),
            PathBuf::from("/w/Mr. Band - Song.mp3")
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_launch_error() {
        let temp = TempDir::new().unwrap();
        let fetcher = YtDlpFetcher::new(FetcherConfig {
            ytdlp_path: PathBuf::from("/nonexistent/yt-dlp"),
            ..Default::default()
        });

        let result = fetcher
            .fetch("https://example.com", &temp.path().join("work").join("stem"))
            .await;
        assert!(matches!(result, Err(FetchError::Launch { .. })));
        assert!(temp.path().join("work").is_dir());
    }
}
