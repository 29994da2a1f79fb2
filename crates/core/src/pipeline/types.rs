//! Types for the track pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One step of the per-track pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Resolve,
    Fetch,
    Normalize,
    Tag,
    Organize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Resolve => "resolve",
            Stage::Fetch => "fetch",
            Stage::Normalize => "normalize",
            Stage::Tag => "tag",
            Stage::Organize => "organize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a track is in its pipeline run.
///
/// `Done`, `Skipped` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Start,
    Resolving,
    Fetching,
    Normalizing,
    Tagging,
    Organizing,
    Done,
    Skipped,
    Failed(Stage),
}

impl TrackState {
    /// The stage this state is running, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            TrackState::Resolving => Some(Stage::Resolve),
            TrackState::Fetching => Some(Stage::Fetch),
            TrackState::Normalizing => Some(Stage::Normalize),
            TrackState::Tagging => Some(Stage::Tag),
            TrackState::Organizing => Some(Stage::Organize),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TrackState::Done | TrackState::Skipped | TrackState::Failed(_)
        )
    }
}

/// Why a track was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A finished file for the track is already on disk.
    AlreadyExists,
}

/// A non-fatal problem recorded on a successful track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageWarning {
    pub stage: Stage,
    pub message: String,
}

/// Terminal outcome of one track's pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineResult {
    Skipped {
        reason: SkipReason,
        path: PathBuf,
    },
    Succeeded {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<StageWarning>,
    },
    FailedAtStage {
        stage: Stage,
        cause: String,
    },
}

impl PipelineResult {
    /// Path of the finished file, for skipped and succeeded tracks.
    pub fn path(&self) -> Option<&Path> {
        match self {
            PipelineResult::Skipped { path, .. } | PipelineResult::Succeeded { path, .. } => {
                Some(path)
            }
            PipelineResult::FailedAtStage { .. } => None,
        }
    }

    /// Stage at which the track failed.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            PipelineResult::FailedAtStage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, PipelineResult::Skipped { .. })
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, PipelineResult::Succeeded { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PipelineResult::FailedAtStage { .. })
    }

    /// Warnings recorded on a successful track.
    pub fn warnings(&self) -> &[StageWarning] {
        match self {
            PipelineResult::Succeeded { warnings, .. } => warnings,
            _ => &[],
        }
    }
}
