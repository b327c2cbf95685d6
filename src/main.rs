// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use scene_tracker::pipeline::{EventLog, FrameSource, Session};
use scene_tracker::types::Config;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Replay a detections stream through the entity tracker and write the event log.
#[derive(Parser, Debug)]
#[command(name = "scene_tracker", version, about, long_about = None)]
struct Args {
    /// Detections stream: one JSON object per line, label → [[x, y, w, h], ...]
    #[arg(short, long, value_name = "FILE")]
    input_file: PathBuf,

    /// Optional event log file, written for the whole session
    #[arg(short, long, value_name = "FILE")]
    output_log: Option<PathBuf>,

    /// Session configuration
    #[arg(short, long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Abort on the first malformed detections entry instead of dropping it
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Diagnostic log level (trace, debug, info, warn, error); overrides the config
    #[arg(long)]
    log_level: Option<String>,
}

/// `--log-level` beats `RUST_LOG`, which beats the config file.
fn log_directives(cli_level: Option<&str>, env: Option<String>, config_level: &str) -> String {
    match (cli_level, env) {
        (Some(level), _) => format!("scene_tracker={level}"),
        (None, Some(env)) if !env.trim().is_empty() => env,
        _ => format!("scene_tracker={config_level}"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_directives(
            args.log_level.as_deref(),
            std::env::var("RUST_LOG").ok(),
            &config.logging.level,
        )))
        .with_writer(std::io::stderr)
        .init();

    info!("🎬 Scene tracker starting");
    info!(
        "Tracker thresholds: movement={:.1}px, confirm={} obs, stale={} frames, fast_prune={} frames",
        config.world_state.movement_threshold_px,
        config.world_state.confirmation_threshold,
        config.world_state.last_seen_threshold,
        config.world_state.fast_prune_window
    );

    let tracker = config.build_tracker()?;
    info!(
        "✓ Tracking {} new-instance label(s), {} interaction rule(s)",
        config.new_instances_to_track.len(),
        config.interactions_to_track.len()
    );

    let source = FrameSource::open(&args.input_file)
        .with_context(|| format!("failed to open {}", args.input_file.display()))?;
    let event_log = EventLog::open(args.output_log.as_deref())
        .context("failed to open event log")?;

    let mut session = Session::new(tracker, event_log, args.strict);
    let outcome = session.run(source);
    if let Err(e) = &outcome {
        error!("Frame loop stopped: {}", e);
    }

    // Close the log even when the loop failed, so totals are flushed.
    let summary = session.finish().context("failed to close event log")?;
    outcome.context("session aborted")?;

    info!("\n✓ Detections processed successfully!");
    summary.log();

    Ok(())
}
