mod progress;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use steep_core::{
    load_config, validate_config, AudioFetcher, BatchCoordinator, BatchReport, BatchRequest,
    Catalog, Config, FfmpegNormalizer, GenreLookup, JsonFileCache, LoftyTagWriter, Normalizer,
    OutputFormat, PipelineResult, PipelineServices, SortKey, SourceSearch, SpotifyClient,
    StopHandle, YtDlpFetcher, YtDlpSearch,
};

/// Download a playlist into a tagged, loudness-normalized local library.
#[derive(Debug, Parser)]
#[command(name = "steep", version, about)]
struct Args {
    /// Playlist URL, URI or id.
    playlist: Option<String>,

    /// Library root (overrides output.dir).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format: mp3 or flac.
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Folder grouping: artist or genre.
    #[arg(short, long)]
    sort_by: Option<SortKey>,

    /// Tracks processed at once (0 = available parallelism).
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Config file (default: <config_dir>/steep/config.toml).
    #[arg(short, long, env = "STEEP_CONFIG")]
    config: Option<PathBuf>,

    /// Lookup cache file (overrides cache.path).
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Write the batch report as JSON to this file.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Debug logging.
    #[arg(short, long)]
    verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Hide the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Print the effective configuration and exit.
    #[arg(long)]
    print_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args);

    if let Err(e) = run(args).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(args: &Args) {
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_level.into());
    let registry = tracing_subscriber::registry().with(filter);

    match args.log_format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

/// Loads the config file and applies command-line overrides.
fn effective_config(args: &Args) -> Result<Config> {
    let mut config = load_config(args.config.as_deref()).context("Failed to load config")?;

    if let Some(dir) = &args.output_dir {
        config.output.dir = dir.clone();
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if let Some(sort_key) = args.sort_by {
        config.output.sort_key = sort_key;
    }
    if let Some(jobs) = args.jobs {
        config.batch.max_concurrent_tracks = jobs;
    }
    if let Some(cache) = &args.cache {
        config.cache.path = cache.clone();
    }
    config.expand_paths();

    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

async fn run(args: Args) -> Result<()> {
    let config = effective_config(&args)?;

    if args.print_config {
        print!(
            "{}",
            toml::to_string_pretty(&config).context("Failed to render config")?
        );
        return Ok(());
    }

    let playlist = args
        .playlist
        .clone()
        .context("A playlist reference is required")?;

    info!(
        output_dir = %config.output.dir.display(),
        format = %config.output.format,
        sort_key = %config.output.sort_key,
        cache = %config.cache.path.display(),
        "Configuration loaded"
    );

    let spotify = Arc::new(
        SpotifyClient::new(config.spotify.clone()).context("Failed to create Spotify client")?,
    );
    let catalog: Arc<dyn Catalog> = spotify.clone();
    let genre_lookup: Arc<dyn GenreLookup> = spotify;

    let search: Arc<dyn SourceSearch> = Arc::new(YtDlpSearch::new(config.search.clone()));
    let fetcher: Arc<dyn AudioFetcher> = Arc::new(YtDlpFetcher::new(config.fetcher.clone()));
    let normalizer: Arc<dyn Normalizer> =
        Arc::new(FfmpegNormalizer::new(config.normalizer.clone()));

    search.validate().await.context("yt-dlp is not usable")?;
    fetcher.validate().await.context("yt-dlp is not usable")?;
    normalizer.validate().await.context("ffmpeg is not usable")?;

    let cache = Arc::new(JsonFileCache::load(config.cache.path.clone()).await);

    let services = PipelineServices {
        search,
        cache,
        fetcher,
        normalizer,
        tagger: Arc::new(LoftyTagWriter::new()),
        genre_lookup: Some(genre_lookup),
    };

    let coordinator = BatchCoordinator::new(catalog, services, config.batch.clone())
        .with_timeouts(config.timeouts.clone())
        .with_target(config.loudness)
        .with_organizer(config.organizer.clone());

    let stop = StopHandle::new();
    tokio::spawn(stop_on_signal(stop.clone()));

    let bar = progress::BatchProgressBar::new(args.no_progress);
    let request = BatchRequest {
        playlist,
        format: config.output.format,
        sort_key: config.output.sort_key,
        output_dir: config.output.dir.clone(),
    };

    let report = coordinator
        .run(request, Some(bar.callback()), stop)
        .await
        .context("Batch failed")?;
    bar.finish();

    print_summary(&report);

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report).context("Failed to encode report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Report written");
    }

    Ok(())
}

/// Exit status for a forced quit, as a shell reports SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    Drain,
    ForceQuit,
}

/// First interrupt drains the batch, any later one forces a quit.
fn on_interrupt(stop: &StopHandle) -> Interrupt {
    if stop.is_stop_requested() {
        Interrupt::ForceQuit
    } else {
        stop.request_stop();
        Interrupt::Drain
    }
}

/// Requests a graceful stop on Ctrl+C. In-flight tracks finish, queued ones
/// are not started. A second Ctrl+C exits immediately; backend processes are
/// killed with us.
async fn stop_on_signal(stop: StopHandle) {
    while signal::ctrl_c().await.is_ok() {
        match on_interrupt(&stop) {
            Interrupt::Drain => {
                warn!("Interrupt received, finishing in-flight tracks (Ctrl+C again to quit)")
            }
            Interrupt::ForceQuit => {
                warn!("Second interrupt, exiting");
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        }
    }
}

fn print_summary(report: &BatchReport) {
    let summary = report.summary();

    for outcome in &report.outcomes {
        match &outcome.result {
            PipelineResult::FailedAtStage { stage, cause } => {
                println!("FAILED  {} [{}]: {}", outcome.track.label(), stage, cause);
            }
            PipelineResult::Succeeded { warnings, .. } => {
                for warning in warnings {
                    println!(
                        "WARN    {} [{}]: {}",
                        outcome.track.label(),
                        warning.stage,
                        warning.message
                    );
                }
            }
            PipelineResult::Skipped { .. } => {}
        }
    }

    println!(
        "{} tracks: {} downloaded, {} skipped, {} failed ({})",
        report.total_tracks,
        summary.succeeded,
        summary.skipped,
        summary.failed,
        progress::format_duration(report.duration_ms())
    );
    if summary.not_started > 0 {
        println!("{} tracks not started (interrupted)", summary.not_started);
    }
    if summary.aborted > 0 {
        println!("{} tracks aborted", summary.aborted);
    }
}
