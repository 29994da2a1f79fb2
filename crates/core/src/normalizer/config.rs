//! Configuration for the normalizer module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the FFmpeg-based normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,

    /// Bitrate for mp3 output.
    #[serde(default = "default_mp3_bitrate")]
    pub mp3_bitrate_kbps: u32,

    /// FLAC compression level (0-12).
    #[serde(default = "default_flac_compression")]
    pub flac_compression_level: u8,

    /// Additional global ffmpeg arguments.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_log_level() -> String {
    "error".to_string()
}

fn default_mp3_bitrate() -> u32 {
    320
}

fn default_flac_compression() -> u8 {
    5
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffmpeg_log_level: default_log_level(),
            mp3_bitrate_kbps: default_mp3_bitrate(),
            flac_compression_level: default_flac_compression(),
            extra_ffmpeg_args: Vec::new(),
        }
    }
}

impl NormalizerConfig {
    /// Creates a new config with a custom ffmpeg path.
    pub fn with_ffmpeg_path(ffmpeg_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ..Default::default()
        }
    }

    /// Sets the mp3 bitrate.
    pub fn with_mp3_bitrate(mut self, kbps: u32) -> Self {
        self.mp3_bitrate_kbps = kbps;
        self
    }
}
