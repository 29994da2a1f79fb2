//! Error types for the organizer module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while moving a file into its folder.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// Source file not found.
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// Failed to create destination directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to move/rename file.
    #[error("Failed to move file from {from} to {to}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to copy file (cross-device fallback).
    #[error("Failed to copy file from {from} to {to}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Checksum verification of a copy failed.
    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrganizeError {
    pub(crate) fn copy_failed(from: &std::path::Path, to: &std::path::Path, error: std::io::Error) -> Self {
        Self::CopyFailed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            error,
        }
    }
}
