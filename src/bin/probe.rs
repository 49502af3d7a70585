//! freshframe-probe - Capture from a stream for a while and report its health.
//!
//! Configuration comes from an optional YAML file, then `FRESHFRAME_*`
//! environment variables, then command-line flags. Frames are produced by the
//! bundled synthetic decoder, so endpoints must use the `stub://` scheme.
//! Logs go to stderr and, with `--log-file`, are appended to a file as well.

use anyhow::{Context, Result, bail};
use clap::Parser;
use futures::StreamExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

use freshframe::decoders::{SyntheticConfig, SyntheticDecoder};
use freshframe::{CaptureConfig, VideoCapture};

const DEFAULT_ENDPOINT: &str = "stub://probe";
const LOG_EVERY_FRAMES: u64 = 30;

#[derive(Parser, Debug)]
#[command(author, version, about = "Capture a video stream and report frame rate and liveness")]
struct Args {
    /// YAML capture configuration.
    #[arg(long, env = "FRESHFRAME_CONFIG")]
    config: Option<PathBuf>,

    /// Stream endpoint; overrides the config file and environment.
    #[arg(long)]
    endpoint: Option<String>,

    /// How long to capture, in seconds.
    #[arg(long, default_value = "10")]
    duration_secs: u64,

    /// Synthetic frame rate.
    #[arg(long, default_value = "25")]
    fps: f64,

    /// Synthetic frame width.
    #[arg(long, default_value = "640")]
    width: u32,

    /// Synthetic frame height.
    #[arg(long, default_value = "480")]
    height: u32,

    /// Stop producing frames after this many per connection, to exercise recovery.
    #[arg(long)]
    stall_after: Option<u64>,

    /// Also append logs to this file.
    #[arg(long, env = "FRESHFRAME_LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let config = build_config(&args)?;
    let mut synthetic = SyntheticConfig::default().with_size(args.width, args.height).with_fps(args.fps);
    if let Some(frames) = args.stall_after {
        synthetic = synthetic.with_stall_after(frames);
    }

    let capture = VideoCapture::connect(config, SyntheticDecoder::new(synthetic))
        .await
        .context("failed to start capture")?;
    info!(endpoint = %capture.endpoint(), "Probing for {}s", args.duration_secs);

    let started = Instant::now();
    let deadline = started + Duration::from_secs(args.duration_secs);
    let mut frames = Box::pin(capture.frames());
    let mut count: u64 = 0;
    let timer = tokio::time::sleep_until(deadline);
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(timer, interrupted);

    loop {
        tokio::select! {
            _ = &mut timer => break,
            _ = &mut interrupted => {
                warn!("Interrupted");
                break;
            }
            frame = frames.next() => {
                let Some(frame) = frame else { break };
                count += 1;
                if count % LOG_EVERY_FRAMES == 0 {
                    let fps = capture.info().map(|info| info.fps).unwrap_or(0.0);
                    info!(
                        sequence = frame.sequence,
                        width = frame.width,
                        height = frame.height,
                        fps,
                        age_ms = frame.age().as_millis() as u64,
                        "Received {} frames",
                        count
                    );
                }
            }
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    let active = capture.is_active();
    let stats = capture.buffer_stats();
    let reconnects = capture.health().reconnects;
    capture.release().await;

    println!("Frames received: {}", count);
    println!("Average fps:     {:.1}", if elapsed > 0.0 { count as f64 / elapsed } else { 0.0 });
    println!("Stream active:   {}", active);
    println!("Reconnects:      {}", reconnects);
    println!("Frames skipped:  {}", stats.discarded + stats.dropped);

    if count == 0 {
        bail!("no frames received");
    }
    Ok(())
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let writer = match log_file {
        Some(path) => BoxMakeWriter::new(std::io::stderr.and(Arc::new(open_log_file(path)?))),
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(log_file.is_none())
        .init();
    Ok(())
}

fn open_log_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

fn build_config(args: &Args) -> Result<CaptureConfig> {
    let mut config = match &args.config {
        Some(path) => CaptureConfig::from_yaml_file(path)?,
        None => CaptureConfig::default(),
    };
    config.apply_env()?;
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if config.endpoint.trim().is_empty() {
        config.endpoint = DEFAULT_ENDPOINT.to_string();
    }
    config.validate()?;
    Ok(config)
}
