//! Trait definitions for the normalizer module.

use async_trait::async_trait;
use std::path::PathBuf;

use super::error::NormalizeError;
use super::types::NormalizeJob;

/// Produces a loudness-normalized file in the requested format.
#[async_trait]
pub trait Normalizer: Send + Sync {
    /// Returns the name of this normalizer implementation.
    fn name(&self) -> &str;

    /// Runs the job and returns the output path.
    ///
    /// On failure no file is left at `job.output_path` that was not there
    /// before.
    async fn normalize(&self, job: &NormalizeJob) -> Result<PathBuf, NormalizeError>;

    /// Validates that the normalizer is properly configured and ready.
    async fn validate(&self) -> Result<(), NormalizeError>;
}
