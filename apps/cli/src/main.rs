use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use syncsub_core::{
    CachedSegments, Controller, FileMedia, MediaEvent, Provider, SyncConfig, SyncRequest,
    Synchronizer, TranscriptSynchronizer, VideoHandle, format_segments_readable, format_timestamp,
    get_cache_dir, get_root_cache_dir, get_segments_path, load_failure_message, load_segments,
    save_segments,
};
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

mod preview;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Copy, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Gemini,
    Openai,
    Grok,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Gemini => Provider::Gemini,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Grok => Provider::Grok,
        }
    }
}

#[derive(Parser)]
#[command(name = "syncsub")]
#[command(about = "Time a transcript against a video with AI and preview the captions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Synchronize a transcript with a video
    Sync {
        /// Video file
        video: PathBuf,

        /// Transcript file, or "-" to read stdin
        #[arg(short, long)]
        transcript: PathBuf,

        /// AI provider used for segmentation
        #[arg(short, long, default_value = "gemini")]
        provider: CliProvider,

        /// Model name, overriding the provider default
        #[arg(short, long)]
        model: Option<String>,

        /// Endpoint URL, overriding the provider default
        #[arg(long)]
        api_url: Option<String>,

        /// Give up on the model after this many seconds
        #[arg(long, default_value_t = 120)]
        timeout_secs: u64,

        /// Force re-processing even if cached segments exist
        #[arg(short, long)]
        force: bool,

        /// Also write the segments to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Play the captions back after synchronizing
        #[arg(long)]
        preview: bool,

        /// Playback speed for the preview
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
    },
    /// Play back captions from a saved segments file
    Preview {
        /// Segments JSON written by `sync`
        segments: PathBuf,

        /// Video length in seconds; defaults to the last segment's end
        #[arg(short, long)]
        duration: Option<f64>,

        /// Playback speed
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
    },
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: &str) -> ExitCode {
    eprintln!("{} {}", style("Error:").red().bold(), message);
    ExitCode::FAILURE
}

async fn read_transcript(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read transcript from stdin")?;
        return Ok(text);
    }

    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read transcript {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    println!(
        "\n{}  {}\n",
        style("syncsub").cyan().bold(),
        style("Transcript Synchronizer").dim()
    );

    match cli.command {
        Command::Sync {
            video,
            transcript,
            provider,
            model,
            api_url,
            timeout_secs,
            force,
            output,
            preview,
            speed,
        } => {
            let config = SyncConfig {
                provider: provider.into(),
                model,
                api_url,
                timeout: Duration::from_secs(timeout_secs),
            };
            let options = SyncOptions {
                video,
                transcript,
                force,
                output,
                preview,
                speed,
            };
            run_sync(config, options).await
        }
        Command::Preview {
            segments,
            duration,
            speed,
        } => run_preview(&segments, duration, speed).await,
    }
}

struct SyncOptions {
    video: PathBuf,
    transcript: PathBuf,
    force: bool,
    output: Option<PathBuf>,
    preview: bool,
    speed: f64,
}

/// Duration from the first media event, or the load failure to report.
fn known_duration(event: &MediaEvent) -> std::result::Result<f64, String> {
    match event {
        MediaEvent::DurationKnown(duration) => Ok(*duration),
        MediaEvent::LoadFailed(reason) => Err(load_failure_message(reason)),
        MediaEvent::TimeChanged(_) => Ok(0.0),
    }
}

async fn run_sync(config: SyncConfig, opts: SyncOptions) -> Result<ExitCode> {
    let provider = config.provider;
    let total_start = Instant::now();
    let transcript = read_transcript(&opts.transcript).await?;

    // Step 1: load the video and learn its duration
    let step_start = Instant::now();
    let spinner = create_spinner("Loading video...");
    let media = match FileMedia::open(&opts.video) {
        Ok(media) => media,
        Err(e) => {
            spinner.finish_and_clear();
            return Ok(fail(&e.to_string()));
        }
    };
    let label = media.path().display().to_string();
    let metadata = media.load_metadata().await;
    // A broken video is reported before credentials are looked at.
    let duration = match known_duration(&metadata) {
        Ok(duration) => duration,
        Err(message) => {
            spinner.finish_and_clear();
            return Ok(fail(&message));
        }
    };

    // Step 2: reuse cached segments or talk to the model
    let cache_dir = get_cache_dir(&get_root_cache_dir(), &transcript, duration);
    let segments_path = get_segments_path(&cache_dir, &provider);
    let cached = !opts.force && segments_path.exists();
    let synchronizer: Arc<dyn Synchronizer> = if cached {
        tracing::info!(path = %segments_path.display(), "using cached segments");
        Arc::new(CachedSegments::new(load_segments(&segments_path).await?))
    } else {
        match TranscriptSynchronizer::from_config(&config) {
            Ok(sync) => Arc::new(sync),
            Err(e) => {
                spinner.finish_and_clear();
                return Ok(fail(&e.to_string()));
            }
        }
    };

    let mut controller = Controller::new(synchronizer);
    controller.upload_video(VideoHandle::new(media));
    controller.apply_media_event(metadata);
    controller.set_transcript(transcript);

    if let Some(error) = &controller.state().error {
        spinner.finish_and_clear();
        return Ok(fail(error));
    }

    spinner.finish_with_message(format!(
        "{} Loaded: {} {} {}",
        style("✓").green().bold(),
        style(&label).dim(),
        style(format!("({})", format_timestamp(duration))).yellow(),
        style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
    ));

    // Step 3: synchronize
    let step_start = Instant::now();
    let spinner = create_spinner(&format!("Synchronizing with {}...", provider.name()));
    match controller.request_sync() {
        SyncRequest::Started => {}
        SyncRequest::Rejected(message) => {
            spinner.finish_and_clear();
            return Ok(fail(message));
        }
        SyncRequest::AlreadyInFlight => {
            spinner.finish_and_clear();
            anyhow::bail!("a synchronization is already running");
        }
    }

    let state = controller
        .next_completion()
        .await
        .context("synchronization did not start")?;

    if let Some(error) = &state.error {
        spinner.finish_and_clear();
        return Ok(fail(error));
    }

    let suffix = if cached {
        style("(cached)".to_string()).dim()
    } else {
        style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
    };
    spinner.finish_with_message(format!(
        "{} Synchronized: {} segments ({}) {}",
        style("✓").green().bold(),
        state.segments.len(),
        provider.name(),
        suffix
    ));

    if !cached {
        save_segments(&state.segments, &segments_path).await?;
    }
    if let Some(output) = &opts.output {
        save_segments(&state.segments, output).await?;
    }

    println!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );
    println!(
        "{} {}\n",
        style("Saved:").dim(),
        style(opts.output.as_ref().unwrap_or(&segments_path).display()).cyan()
    );
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", format_segments_readable(&state.segments, state.current_time));

    if opts.preview {
        preview::play(&mut controller, opts.speed).await;
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_preview(path: &Path, duration: Option<f64>, speed: f64) -> Result<ExitCode> {
    let segments = load_segments(path)
        .await
        .with_context(|| format!("Failed to load segments from {}", path.display()))?;
    let cached = CachedSegments::new(segments);
    let duration = duration.unwrap_or_else(|| cached.end_time());
    let transcript = cached.transcript();

    let mut controller = Controller::new(Arc::new(cached));
    controller.on_metadata_loaded(duration);
    controller.set_transcript(transcript);

    if let SyncRequest::Rejected(message) = controller.request_sync() {
        return Ok(fail(message));
    }
    controller.next_completion().await;
    if let Some(error) = &controller.state().error {
        return Ok(fail(error));
    }

    println!("{}", format_segments_readable(&controller.state().segments, 0.0));
    preview::play(&mut controller, speed).await;

    Ok(ExitCode::SUCCESS)
}
