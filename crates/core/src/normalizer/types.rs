//! Types for the normalizer module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::NormalizeError;
use crate::track::OutputFormat;

/// Loudness and resampling target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoudnessTarget {
    /// Integrated loudness in LUFS.
    #[serde(default = "default_integrated")]
    pub integrated_lufs: f64,
    /// True-peak ceiling in dBTP.
    #[serde(default = "default_true_peak")]
    pub true_peak_db: f64,
    /// Loudness range in LU.
    #[serde(default = "default_range")]
    pub loudness_range_lu: f64,
    /// Output sample rate.
    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: u32,
    /// Output channel count.
    #[serde(default = "default_channels")]
    pub channels: u32,
}

fn default_integrated() -> f64 {
    -14.0
}

fn default_true_peak() -> f64 {
    -1.5
}

fn default_range() -> f64 {
    11.0
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_channels() -> u32 {
    2
}

impl Default for LoudnessTarget {
    fn default() -> Self {
        Self {
            integrated_lufs: default_integrated(),
            true_peak_db: default_true_peak(),
            loudness_range_lu: default_range(),
            sample_rate_hz: default_sample_rate(),
            channels: default_channels(),
        }
    }
}

impl LoudnessTarget {
    /// Checks the values against the ranges ffmpeg's loudnorm filter accepts.
    pub fn validate(&self) -> Result<(), NormalizeError> {
        if !(-70.0..=-5.0).contains(&self.integrated_lufs) {
            return Err(NormalizeError::invalid_target(format!(
                "integrated loudness {} LUFS not in [-70, -5]",
                self.integrated_lufs
            )));
        }
        if !(-9.0..=0.0).contains(&self.true_peak_db) {
            return Err(NormalizeError::invalid_target(format!(
                "true peak {} dBTP not in [-9, 0]",
                self.true_peak_db
            )));
        }
        if !(1.0..=50.0).contains(&self.loudness_range_lu) {
            return Err(NormalizeError::invalid_target(format!(
                "loudness range {} LU not in [1, 50]",
                self.loudness_range_lu
            )));
        }
        if self.sample_rate_hz == 0 || self.channels == 0 {
            return Err(NormalizeError::invalid_target(
                "sample rate and channels must be non-zero",
            ));
        }
        Ok(())
    }

    /// The `loudnorm` filter expression.
    pub fn filter(&self) -> String {
        format!(
            "loudnorm=I={}:TP={}:LRA={}",
            self.integrated_lufs, self.true_peak_db, self.loudness_range_lu
        )
    }
}

/// A single normalization request.
#[derive(Debug, Clone)]
pub struct NormalizeJob {
    /// Raw artifact produced by the fetcher.
    pub input_path: PathBuf,
    /// Final path; overwritten if it exists.
    pub output_path: PathBuf,
    /// Output container and codec.
    pub format: OutputFormat,
    /// Loudness target.
    pub target: LoudnessTarget,
}

/// Path the backend writes to before the output is renamed into place.
pub fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}
