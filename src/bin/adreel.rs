use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "adreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the ad in real time (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Compose a single frame as a PNG.
    Frame(FrameArgs),
    /// Print the scene schedule as JSON.
    Plan(PlanArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input job manifest JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path; `.webm` prefers VP9/Opus, anything else MP4.
    #[arg(long)]
    out: PathBuf,

    /// Override the manifest's music volume (0.0 - 0.5).
    #[arg(long)]
    music_volume: Option<f32>,

    /// Override the manifest's frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Overwrite output if it already exists.
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input job manifest JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Time into the ad, in seconds.
    #[arg(long)]
    at: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Input job manifest JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Plan(args) => cmd_plan(args),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    if args.out.exists() && !args.overwrite {
        anyhow::bail!(
            "output '{}' exists (pass --overwrite to replace it)",
            args.out.display()
        );
    }
    let mut job = adreel::AdJob::from_path(&args.in_path)?;
    if let Some(v) = args.music_volume {
        job.settings.music_volume = v;
    }
    if let Some(fps) = args.fps {
        job.settings.fps = fps;
    }

    let session = adreel::AdSession::from_job(&job)?;
    let prefs = adreel::OutputFormat::prefer_for_extension(
        &adreel::OutputFormat::default_preference(),
        &args.out,
    );
    let mut sink = adreel::FfmpegSink::new(adreel::FfmpegSinkOpts::default());
    let cancel = adreel::CancelToken::new();
    let clock = adreel::SystemClock::new();

    let mut next_report = 0.0;
    let artifact = session.render(&mut sink, &clock, &cancel, &prefs, &mut |p| {
        if p >= next_report {
            tracing::info!(percent = (p * 100.0).round() as u32, "rendering");
            next_report = (p + 0.1).min(1.0);
        }
    })?;

    adreel::encode::ffmpeg::ensure_parent_dir(&args.out)?;
    std::fs::write(&args.out, &artifact.bytes)
        .with_context(|| format!("write output '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({}, {} frames, {:.2}s)",
        args.out.display(),
        artifact.mime,
        artifact.frames,
        artifact.duration_secs
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let job = adreel::AdJob::from_path(&args.in_path)?;
    let session = adreel::AdSession::from_job(&job)?;
    let frame = session.render_frame_at(args.at)?;

    adreel::encode::ffmpeg::ensure_parent_dir(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let job = adreel::AdJob::from_path(&args.in_path)?;
    let session = adreel::AdSession::from_job(&job)?;
    let json = serde_json::to_string_pretty(&session.plan()).context("serialize plan")?;
    println!("{json}");
    Ok(())
}
