//! Search backed by yt-dlp's `ytsearch` extractor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use super::{SearchError, SourceCandidate, SourceSearch};
use crate::tool::{probe_tool, run_tool};

/// Configuration for the yt-dlp search backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Path to the yt-dlp binary.
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: PathBuf,

    /// Number of results to request per query.
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Additional yt-dlp arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

pub(crate) fn default_ytdlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_max_results() -> u32 {
    1
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            max_results: default_max_results(),
            extra_args: Vec::new(),
        }
    }
}

/// yt-dlp search backend.
pub struct YtDlpSearch {
    config: SearchConfig,
}

impl YtDlpSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    fn build_args(&self, query: &str) -> Vec<String> {
        let mut args = vec![
            "--flat-playlist".to_string(),
            "--dump-single-json".to_string(),
            "--no-warnings".to_string(),
            "--quiet".to_string(),
        ];
        args.extend(self.config.extra_args.iter().cloned());
        args.push(format!("ytsearch{}:{}", self.config.max_results.max(1), query));
        args
    }
}

#[async_trait]
impl SourceSearch for YtDlpSearch {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn search(&self, query: &str) -> Result<Vec<SourceCandidate>, SearchError> {
        let args = self.build_args(query);
        let output = run_tool(&self.config.ytdlp_path, &args)
            .await
            .map_err(|source| SearchError::Launch {
                program: self.config.ytdlp_path.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SearchError::backend_failed(
                format!("yt-dlp exited with code {:?}", output.status.code()),
                output.stderr_tail(5),
            ));
        }

        let candidates = parse_search_output(&output.stdout)?;
        debug!(query, results = candidates.len(), "yt-dlp search finished");
        Ok(candidates)
    }

    async fn validate(&self) -> Result<(), SearchError> {
        probe_tool(&self.config.ytdlp_path, "--version")
            .await
            .map_err(|source| SearchError::Launch {
                program: self.config.ytdlp_path.clone(),
                source,
            })
    }
}

#[derive(Debug, Deserialize)]
struct SearchDump {
    #[serde(default)]
    entries: Vec<SearchEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

impl SearchEntry {
    fn into_candidate(self) -> Option<SourceCandidate> {
        let locator = match (self.url, self.id) {
            (Some(url), _) if !url.is_empty() => url,
            (_, Some(id)) if !id.is_empty() => format!("https://www.youtube.com/watch?v={}", id),
            _ => return None,
        };
        Some(SourceCandidate {
            locator,
            title: self.title,
            duration_secs: self.duration,
        })
    }
}

fn parse_search_output(stdout: &str) -> Result<Vec<SourceCandidate>, SearchError> {
    let dump: SearchDump = serde_json::from_str(stdout.trim())
        .map_err(|e| SearchError::ParseError(e.to_string()))?;
    Ok(dump
        .entries
        .into_iter()
        .filter_map(SearchEntry::into_candidate)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args() {
        let search = YtDlpSearch::new(SearchConfig {
            max_results: 3,
            extra_args: vec!["--proxy".to_string(), "socks5://localhost".to_string()],
            ..Default::default()
        });
        let args = search.build_args("Daft Punk Digital Love audio");
        assert_eq!(args[0], "--flat-playlist");
        assert!(args.contains(&"--proxy".to_string()));
        assert_eq!(
            args.last().map(String::as_str),
            Some("ytsearch3:Daft Punk Digital Love audio")
        );
    }

    #[test]
    fn test_parse_search_output() {
        let json = r#"{
            "_type": "playlist",
            "entries": [
                {"id": "abc", "url": "https://www.youtube.com/watch?v=abc", "title": "Digital Love", "duration": 301.0},
                {"id": "def", "title": "No URL"},
                {"title": "Nothing usable"}
            ]
        }"#;

        let candidates = parse_search_output(json).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].locator, "https://www.youtube.com/watch?v=abc");
        assert_eq!(candidates[0].duration_secs, Some(301.0));
        assert_eq!(candidates[1].locator, "https://www.youtube.com/watch?v=def");
    }

    #[test]
    fn test_parse_empty_and_invalid() {
        assert!(parse_search_output(r#"{"entries": []}"#).unwrap().is_empty());
        assert!(parse_search_output(r#"{"_type": "playlist"}"#).unwrap().is_empty());
        assert!(matches!(
            parse_search_output("ERROR: something"),
            Err(SearchError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_is_launch_error() {
        let search = YtDlpSearch::new(SearchConfig {
            ytdlp_path: PathBuf::from("/nonexistent/yt-dlp"),
            ..Default::default()
        });
        assert!(matches!(
            search.search("anything").await,
            Err(SearchError::Launch { .. })
        ));
        assert!(search.validate().await.is_err());
    }
}
