//! Types for the batch coordinator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::CatalogError;
use crate::pipeline::PipelineResult;
use crate::track::{OutputFormat, SortKey, TrackDescriptor};

/// Errors that abort a whole batch.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The playlist reference was rejected or the query failed.
    #[error("Playlist query failed: {0}")]
    Catalog(#[from] CatalogError),

    /// The playlist query did not finish in time.
    #[error("Playlist query timed out after {secs} seconds")]
    CatalogTimeout { secs: u64 },

    /// The output directory could not be created.
    #[error("Failed to create output directory {path}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What to process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Playlist reference understood by the catalog.
    pub playlist: String,
    pub format: OutputFormat,
    pub sort_key: SortKey,
    pub output_dir: PathBuf,
}

/// Outcome of one track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackOutcome {
    /// Position in the playlist (0-based).
    pub index: usize,
    pub track: TrackDescriptor,
    pub result: PipelineResult,
    /// Wall time spent in the pipeline.
    pub duration_ms: u64,
}

/// Progress notification, sent once per finished unit in completion order.
#[derive(Debug)]
pub struct BatchProgress<'a> {
    /// Units finished so far, including the one reported.
    pub completed: usize,
    /// Tracks in the playlist.
    pub total: usize,
    /// The finished track, or `None` when its worker aborted.
    pub outcome: Option<&'a TrackOutcome>,
}

/// Receives progress notifications.
pub type ProgressCallback = Arc<dyn Fn(&BatchProgress<'_>) + Send + Sync>;

/// Cooperative stop signal.
///
/// Tracks that already hold a worker slot finish; the rest are not started.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the batch to stop starting new tracks.
    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Counts per result kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Succeeded tracks that carry at least one warning.
    pub with_warnings: usize,
    pub not_started: usize,
    pub aborted: usize,
}

/// Result of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub playlist: String,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub sort_key: SortKey,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Tracks the catalog returned.
    pub total_tracks: usize,
    /// One entry per finished track, in playlist order.
    pub outcomes: Vec<TrackOutcome>,
    /// Tracks not started because a stop was requested.
    pub not_started: usize,
    /// Workers that ended without producing an outcome.
    pub aborted: usize,
}

impl BatchReport {
    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            not_started: self.not_started,
            aborted: self.aborted,
            ..Default::default()
        };
        for outcome in &self.outcomes {
            match &outcome.result {
                PipelineResult::Succeeded { warnings, .. } => {
                    summary.succeeded += 1;
                    if !warnings.is_empty() {
                        summary.with_warnings += 1;
                    }
                }
                PipelineResult::Skipped { .. } => summary.skipped += 1,
                PipelineResult::FailedAtStage { .. } => summary.failed += 1,
            }
        }
        summary
    }

    /// Outcomes of failed tracks.
    pub fn failures(&self) -> impl Iterator<Item = &TrackOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_failed())
    }

    /// Whether every track either succeeded or was skipped.
    pub fn is_complete(&self) -> bool {
        let summary = self.summary();
        summary.failed == 0 && summary.not_started == 0 && summary.aborted == 0
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
