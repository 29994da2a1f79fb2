//! Batch configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the batch coordinator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum tracks processed at once (0 = available parallelism).
    #[serde(default)]
    pub max_concurrent_tracks: usize,
}

impl BatchConfig {
    /// Sets the worker count.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_tracks = max;
        self
    }

    /// The worker count actually used, always at least one.
    pub fn effective_workers(&self) -> usize {
        if self.max_concurrent_tracks > 0 {
            self.max_concurrent_tracks
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        }
    }
}
