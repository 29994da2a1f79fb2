//! Mock normalizer for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::normalizer::{partial_path, NormalizeError, NormalizeJob, Normalizer};

/// Mock implementation of the Normalizer trait.
///
/// Copies the input to `<output>.part`, waits for the configured delay, then
/// renames it onto the output path. A job cancelled during the delay leaves
/// the partial file behind, like a killed encoder would.
#[derive(Debug, Default)]
pub struct MockNormalizer {
    /// If set, the next job will fail with this error.
    next_error: Arc<RwLock<Option<NormalizeError>>>,
    /// Completed jobs.
    jobs: Arc<RwLock<Vec<NormalizeJob>>>,
    /// Simulated encoding time.
    delay: Arc<RwLock<Option<Duration>>>,
    calls: AtomicUsize,
}

impl MockNormalizer {
    /// Create a new mock normalizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next job fail.
    pub async fn set_next_error(&self, error: NormalizeError) {
        *self.next_error.write().await = Some(error);
    }

    /// Delay every job after the partial output is written.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Number of jobs attempted.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Jobs completed so far.
    pub async fn completed_jobs(&self) -> Vec<NormalizeJob> {
        self.jobs.read().await.clone()
    }
}

#[async_trait]
impl Normalizer for MockNormalizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn normalize(&self, job: &NormalizeJob) -> Result<PathBuf, NormalizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        if !job.input_path.exists() {
            return Err(NormalizeError::InputNotFound {
                path: job.input_path.clone(),
            });
        }

        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let partial = partial_path(&job.output_path);
        tokio::fs::copy(&job.input_path, &partial).await?;

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        tokio::fs::rename(&partial, &job.output_path).await?;

        self.jobs.write().await.push(job.clone());
        Ok(job.output_path.clone())
    }

    async fn validate(&self) -> Result<(), NormalizeError> {
        Ok(())
    }
}
