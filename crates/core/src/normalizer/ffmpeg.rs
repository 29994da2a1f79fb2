//! FFmpeg-based normalizer implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

use super::config::NormalizerConfig;
use super::error::NormalizeError;
use super::traits::Normalizer;
use super::types::{partial_path, NormalizeJob};
use crate::tool::{probe_tool, run_tool};
use crate::track::OutputFormat;

/// FFmpeg-based normalizer implementation.
pub struct FfmpegNormalizer {
    config: NormalizerConfig,
}

impl FfmpegNormalizer {
    /// Creates a new FFmpeg normalizer with the given configuration.
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Creates a normalizer with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(NormalizerConfig::default())
    }

    /// Builds ffmpeg arguments for a job, writing to `output_path`.
    fn build_args(&self, job: &NormalizeJob, output_path: &Path) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-nostdin".to_string(),
            "-i".to_string(),
            job.input_path.to_string_lossy().to_string(),
            // Audio only; drop embedded cover streams from the source.
            "-vn".to_string(),
            "-af".to_string(),
            job.target.filter(),
            "-ar".to_string(),
            job.target.sample_rate_hz.to_string(),
            "-ac".to_string(),
            job.target.channels.to_string(),
            "-c:a".to_string(),
            job.format.ffmpeg_codec().to_string(),
        ];

        match job.format {
            OutputFormat::Mp3 => {
                args.extend([
                    "-b:a".to_string(),
                    format!("{}k", self.config.mp3_bitrate_kbps),
                ]);
            }
            OutputFormat::Flac => {
                args.extend([
                    "-compression_level".to_string(),
                    self.config.flac_compression_level.to_string(),
                ]);
            }
        }

        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ]);

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        // The .part extension hides the container, so name the muxer.
        args.extend(["-f".to_string(), job.format.extension().to_string()]);
        args.push(output_path.to_string_lossy().to_string());
        args
    }

    fn launch_error(&self, e: std::io::Error) -> NormalizeError {
        if e.kind() == std::io::ErrorKind::NotFound {
            NormalizeError::FfmpegNotFound {
                path: self.config.ffmpeg_path.clone(),
            }
        } else {
            NormalizeError::Io(e)
        }
    }

    async fn run_to_partial(&self, job: &NormalizeJob, partial: &Path) -> Result<(), NormalizeError> {
        let args = self.build_args(job, partial);
        let output = run_tool(&self.config.ffmpeg_path, &args)
            .await
            .map_err(|e| self.launch_error(e))?;

        if !output.status.success() {
            return Err(NormalizeError::normalization_failed(
                format!("FFmpeg exited with code: {:?}", output.status.code()),
                output.stderr_tail(10),
            ));
        }

        let written = tokio::fs::metadata(partial)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if written == 0 {
            return Err(NormalizeError::normalization_failed(
                "Output file not created",
                output.stderr_tail(10),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl Normalizer for FfmpegNormalizer {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn normalize(&self, job: &NormalizeJob) -> Result<PathBuf, NormalizeError> {
        if !tokio::fs::try_exists(&job.input_path).await.unwrap_or(false) {
            return Err(NormalizeError::InputNotFound {
                path: job.input_path.clone(),
            });
        }
        job.target.validate()?;

        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let start = Instant::now();
        let partial = partial_path(&job.output_path);

        if let Err(e) = self.run_to_partial(job, &partial).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&partial, &job.output_path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(NormalizeError::Io(e));
        }

        debug!(
            output = %job.output_path.display(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Normalized"
        );
        Ok(job.output_path.clone())
    }

    async fn validate(&self) -> Result<(), NormalizeError> {
        probe_tool(&self.config.ffmpeg_path, "-version")
            .await
            .map_err(|e| self.launch_error(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::LoudnessTarget;
    use tempfile::TempDir;

    fn job(format: OutputFormat) -> NormalizeJob {
        NormalizeJob {
            input_path: PathBuf::from("/work/Band - Song.mp3"),
            output_path: PathBuf::from("/music/Band - Song.flac"),
            format,
            target: LoudnessTarget::default(),
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> &'a str {
        let pos = args.iter().position(|a| a == flag).unwrap();
        &args[pos + 1]
    }

    #[test]
    fn test_build_args_mp3() {
        let normalizer = FfmpegNormalizer::with_defaults();
        let job = job(OutputFormat::Mp3);
        let args = normalizer.build_args(&job, Path::new("/music/out.mp3.part"));

        assert_eq!(value_after(&args, "-af"), "loudnorm=I=-14:TP=-1.5:LRA=11");
        assert_eq!(value_after(&args, "-ar"), "44100");
        assert_eq!(value_after(&args, "-ac"), "2");
        assert_eq!(value_after(&args, "-c:a"), "libmp3lame");
        assert_eq!(value_after(&args, "-b:a"), "320k");
        assert_eq!(value_after(&args, "-f"), "mp3");
        assert!(!args.contains(&"-compression_level".to_string()));
        assert_eq!(args.last().unwrap(), "/music/out.mp3.part");
    }

    #[test]
    fn test_build_args_flac() {
        let normalizer = FfmpegNormalizer::new(NormalizerConfig {
            flac_compression_level: 8,
            ..Default::default()
        });
        let job = job(OutputFormat::Flac);
        let args = normalizer.build_args(&job, Path::new("/music/out.flac.part"));

        assert_eq!(value_after(&args, "-c:a"), "flac");
        assert_eq!(value_after(&args, "-compression_level"), "8");
        assert_eq!(value_after(&args, "-f"), "flac");
        assert!(!args.contains(&"-b:a".to_string()));
    }

    #[tokio::test]
    async fn test_missing_input() {
        let normalizer = FfmpegNormalizer::with_defaults();
        let err = normalizer
            .normalize(&job(OutputFormat::Mp3))
            .await
            .unwrap_err();
        assert!(matches!(err, NormalizeError::InputNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_leaves_no_output() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("raw.mp3");
        tokio::fs::write(&input, b"raw").await.unwrap();

        let normalizer = FfmpegNormalizer::new(NormalizerConfig::with_ffmpeg_path(
            PathBuf::from("/nonexistent/ffmpeg"),
        ));
        let job = NormalizeJob {
            input_path: input,
            output_path: temp.path().join("out.mp3"),
            format: OutputFormat::Mp3,
            target: LoudnessTarget::default(),
        };

        let err = normalizer.normalize(&job).await.unwrap_err();
        assert!(matches!(err, NormalizeError::FfmpegNotFound { .. }));
        assert!(!job.output_path.exists());
        assert!(!partial_path(&job.output_path).exists());
        assert!(normalizer.validate().await.is_err());
    }
}
