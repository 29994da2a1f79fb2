//! Loudness normalization and transcoding to the output format.
//!
//! Output is written to a `.part` sibling of the target and renamed into
//! place only after the backend succeeds, so a file at the target path is
//! always complete.

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::NormalizerConfig;
pub use error::NormalizeError;
pub use ffmpeg::FfmpegNormalizer;
pub use traits::Normalizer;
pub use types::{partial_path, LoudnessTarget, NormalizeJob};
