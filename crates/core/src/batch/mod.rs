//! Batch coordinator.
//!
//! Fetches a playlist once, then runs every track through a
//! [`TrackPipeline`](crate::pipeline::TrackPipeline) on a bounded worker pool.
//! Single-track failures are collected in the report; only a failed playlist
//! query or an unusable output directory fails the batch.

mod config;
mod runner;
mod types;

pub use config::BatchConfig;
pub use runner::BatchCoordinator;
pub use types::{
    BatchError, BatchProgress, BatchReport, BatchRequest, BatchSummary, ProgressCallback,
    StopHandle, TrackOutcome,
};
