//! Terminal progress for a running batch.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use steep_core::{BatchProgress, PipelineResult, ProgressCallback};

/// A progress bar driven by the batch progress callback.
///
/// The length is set on the first notification, since the track count is only
/// known once the playlist has been listed.
pub struct BatchProgressBar {
    bar: ProgressBar,
}

impl BatchProgressBar {
    pub fn new(hidden: bool) -> Self {
        let bar = ProgressBar::new(0);
        if hidden {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} (ETA: {eta})")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message("Downloading");
        Self { bar }
    }

    pub fn callback(&self) -> ProgressCallback {
        let bar = self.bar.clone();
        Arc::new(move |progress: &BatchProgress<'_>| {
            bar.set_length(progress.total as u64);
            bar.set_position(progress.completed as u64);
            if let Some(outcome) = progress.outcome {
                let status = match &outcome.result {
                    PipelineResult::Succeeded { .. } => "done",
                    PipelineResult::Skipped { .. } => "skipped",
                    PipelineResult::FailedAtStage { .. } => "failed",
                };
                bar.set_message(format!("{} {}", status, outcome.track.label()));
            }
        })
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Format a duration in milliseconds for humans.
pub fn format_duration(ms: i64) -> String {
    let secs = ms as f64 / 1000.0;
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}
