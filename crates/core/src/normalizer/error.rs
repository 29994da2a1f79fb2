//! Error types for the normalizer module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during normalization.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// The backend process failed.
    #[error("Normalization failed: {reason}")]
    NormalizationFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Loudness target outside what the backend accepts.
    #[error("Invalid loudness target: {reason}")]
    InvalidTarget { reason: String },

    /// I/O error around the conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NormalizeError {
    /// Creates a normalization failed error with stderr output.
    pub fn normalization_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::NormalizationFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates an invalid target error.
    pub fn invalid_target(reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            reason: reason.into(),
        }
    }
}
