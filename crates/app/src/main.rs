use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use lava_icecream_core::{
    AppConfig, FramePose, LavaError, RenderSurface, SceneDescriptor, StartOutcome, Studio,
    TraceCapturePlatform,
};
use tracing_subscriber::EnvFilter;

fn main() -> lava_icecream_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Sample { time } => run_sample(time),
        Commands::Play { frame_rate } => {
            if let Some(rate) = frame_rate {
                config.playback.frame_rate = rate;
            }
            run_play(&config)
        }
        Commands::Record {
            duration_ms,
            output,
            width,
            height,
        } => {
            if let Some(ms) = duration_ms {
                config.playback.record_duration_ms = ms;
            }
            run_record(&config, &output, RenderSurface::new(width, height))
        }
        Commands::Describe => run_describe(),
    }
}

fn run_sample(time: f32) -> lava_icecream_core::Result<()> {
    let pose = FramePose::sample(time);
    println!("{}", serde_json::to_string_pretty(&pose)?);
    Ok(())
}

fn run_play(config: &AppConfig) -> lava_icecream_core::Result<()> {
    let delta = config.playback.frame_delta();
    tracing::info!(frame_rate = config.playback.frame_rate, "playing animation once");

    let mut studio = Studio::new(config)?;
    studio.play_once();

    let mut now = Duration::ZERO;
    let mut frames = 0_u32;
    while studio.timeline().is_playing() {
        now += Duration::from_secs_f32(delta);
        let pose = studio.frame(delta, now)?;
        frames += 1;
        tracing::trace!(t = pose.time_seconds, mouth = pose.mouth_scale_y, "frame");
    }

    let pose = studio.timeline().pose().unwrap_or_else(|| FramePose::sample(0.0));
    tracing::info!(frames, elapsed = studio.timeline().elapsed(), "playback finished");
    println!("{}", serde_json::to_string_pretty(&pose)?);
    Ok(())
}

fn run_record(config: &AppConfig, output: &Path, surface: RenderSurface) -> lava_icecream_core::Result<()> {
    let mut studio = Studio::new(config)?;
    let delta = config.playback.frame_delta();
    studio.attach_surface(surface);

    let mut platform = TraceCapturePlatform::new().with_frames_per_chunk(config.playback.frame_rate as usize);
    let mut now = Duration::ZERO;
    match studio.record(&mut platform, now)? {
        StartOutcome::Started => {}
        outcome => return Err(LavaError::msg(format!("recording did not start: {outcome:?}"))),
    }

    // Bounded so a platform that never reports `stopped` cannot hang the CLI.
    let limit = studio.record_duration() + Duration::from_secs(5);
    while studio.is_recording() {
        if now > limit {
            studio.teardown()?;
            return Err(LavaError::msg("capture platform never finished the recording"));
        }
        now += Duration::from_secs_f32(delta);
        studio.frame(delta, now)?;
    }

    let download = studio
        .download()
        .ok_or_else(|| LavaError::msg("recording finished without an artifact"))?;
    if download.is_empty() {
        tracing::warn!("recording produced no data");
    }

    std::fs::create_dir_all(output)?;
    let path = output.join(&download.file_name);
    std::fs::write(&path, &download.bytes)?;
    tracing::info!(path = %path.display(), bytes = download.bytes.len(), status = %studio.status_text(), "recording saved");
    Ok(())
}

fn run_describe() -> lava_icecream_core::Result<()> {
    println!("{}", serde_json::to_string_pretty(&SceneDescriptor::lava_icecream())?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "A lava ice-cream, eaten in six seconds", long_about = None)]
struct Cli {
    /// Optional JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the pose of every animated part at a point in time.
    Sample {
        /// Seconds since playback start.
        #[arg(short, long, default_value_t = 0.0)]
        time: f32,
    },
    /// Play the animation once, headlessly, and print the final pose.
    Play {
        /// Frames per second of the simulated render loop.
        #[arg(long)]
        frame_rate: Option<u32>,
    },
    /// Record the animation with the trace capture platform.
    Record {
        /// Recording length in milliseconds.
        #[arg(short, long)]
        duration_ms: Option<u64>,
        /// Directory the artifact is written to.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        #[arg(long, default_value_t = 1280)]
        width: u32,
        #[arg(long, default_value_t = 720)]
        height: u32,
    },
    /// Print the scene description as JSON.
    Describe,
}
