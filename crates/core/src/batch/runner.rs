//! Batch coordinator implementation.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::normalizer::LoudnessTarget;
use crate::organizer::OrganizerConfig;
use crate::pipeline::{PipelineConfig, PipelineServices, TimeoutConfig, TrackPipeline};

use super::config::BatchConfig;
use super::types::{
    BatchError, BatchProgress, BatchReport, BatchRequest, ProgressCallback, StopHandle,
    TrackOutcome,
};

/// Runs whole playlists through the track pipeline.
pub struct BatchCoordinator {
    catalog: Arc<dyn Catalog>,
    services: PipelineServices,
    config: BatchConfig,
    timeouts: TimeoutConfig,
    target: LoudnessTarget,
    organizer: OrganizerConfig,
}

impl BatchCoordinator {
    /// Create a new coordinator with default timeouts and loudness target.
    pub fn new(catalog: Arc<dyn Catalog>, services: PipelineServices, config: BatchConfig) -> Self {
        Self {
            catalog,
            services,
            config,
            timeouts: TimeoutConfig::default(),
            target: LoudnessTarget::default(),
            organizer: OrganizerConfig::default(),
        }
    }

    /// Sets the per-call timeouts.
    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Sets the loudness target.
    pub fn with_target(mut self, target: LoudnessTarget) -> Self {
        self.target = target;
        self
    }

    /// Sets the organizer settings.
    pub fn with_organizer(mut self, organizer: OrganizerConfig) -> Self {
        self.organizer = organizer;
        self
    }

    /// Processes every track of `request.playlist`.
    ///
    /// Returns `Err` only when the playlist cannot be listed or the output
    /// directory cannot be created; in that case no track is attempted.
    pub async fn run(
        &self,
        request: BatchRequest,
        progress: Option<ProgressCallback>,
        stop: StopHandle,
    ) -> Result<BatchReport, BatchError> {
        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            %batch_id,
            playlist = %request.playlist,
            catalog = self.catalog.name(),
            "Starting batch"
        );

        let tracks = tokio::time::timeout(
            self.timeouts.catalog(),
            self.catalog.playlist_tracks(&request.playlist),
        )
        .await
        .map_err(|_| BatchError::CatalogTimeout {
            secs: self.timeouts.catalog_secs,
        })??;

        tokio::fs::create_dir_all(&request.output_dir)
            .await
            .map_err(|source| BatchError::OutputDir {
                path: request.output_dir.clone(),
                source,
            })?;

        let total = tracks.len();
        let workers = self.config.effective_workers();
        info!(%batch_id, tracks = total, workers, "Fetched playlist");

        let pipeline_config = PipelineConfig {
            output_dir: request.output_dir.clone(),
            format: request.format,
            sort_key: request.sort_key,
            target: self.target,
            timeouts: self.timeouts.clone(),
            organizer: self.organizer.clone(),
        };
        let pipeline = Arc::new(TrackPipeline::new(pipeline_config, self.services.clone()));
        let work_dir = pipeline.layout().work_dir();

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();

        for (index, track) in tracks.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let pipeline = Arc::clone(&pipeline);
            let stop = stop.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                if stop.is_stop_requested() {
                    return None;
                }

                let start = Instant::now();
                let result = pipeline.process(&track).await;
                Some(TrackOutcome {
                    index,
                    track,
                    result,
                    duration_ms: start.elapsed().as_millis() as u64,
                })
            });
        }

        let mut outcomes = Vec::with_capacity(total);
        let mut completed = 0usize;
        let mut not_started = 0usize;
        let mut aborted = 0usize;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(outcome)) => {
                    completed += 1;
                    if let Some(ref callback) = progress {
                        callback(&BatchProgress {
                            completed,
                            total,
                            outcome: Some(&outcome),
                        });
                    }
                    outcomes.push(outcome);
                }
                Ok(None) => not_started += 1,
                Err(e) => {
                    completed += 1;
                    aborted += 1;
                    error!(%batch_id, error = %e, "Track worker aborted");
                    if let Some(ref callback) = progress {
                        callback(&BatchProgress {
                            completed,
                            total,
                            outcome: None,
                        });
                    }
                }
            }
        }

        // Only succeeds once every worker has cleaned up after itself.
        let _ = tokio::fs::remove_dir(&work_dir).await;

        outcomes.sort_by_key(|o| o.index);
        let report = BatchReport {
            batch_id,
            playlist: request.playlist,
            output_dir: request.output_dir,
            format: request.format,
            sort_key: request.sort_key,
            started_at,
            finished_at: Utc::now(),
            total_tracks: total,
            outcomes,
            not_started,
            aborted,
        };

        let summary = report.summary();
        if not_started > 0 {
            warn!(%batch_id, not_started, "Stop requested, remaining tracks not started");
        }
        info!(
            %batch_id,
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            warnings = summary.with_warnings,
            aborted = summary.aborted,
            duration_ms = report.duration_ms(),
            "Batch finished"
        );

        Ok(report)
    }
}
