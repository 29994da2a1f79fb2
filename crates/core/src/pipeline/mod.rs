//! Per-track pipeline: the state machine taking one track from descriptor to
//! organized, tagged file.

mod config;
mod runner;
mod types;

pub use config::{PipelineConfig, TimeoutConfig};
pub use runner::{PipelineServices, TrackPipeline};
pub use types::{PipelineResult, SkipReason, Stage, StageWarning, TrackState};
