//! refmark CLI: learn a reference marker and detect it in a frame.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{info, LevelFilter};
use refmark::aruco::DetectorParams;
use refmark::detect::{detect_image, detector_from_path, open_gray, DetectError};

#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "refmark")]
#[command(about = "Detect a square reference marker in an image")]
#[command(version)]
struct Cli {
    /// Reference marker image; the whole image is the marker.
    #[arg(long)]
    marker: PathBuf,

    /// Frame to search.
    #[arg(long)]
    frame: PathBuf,

    /// Cells sampled from the reference (must be a perfect square).
    #[arg(long, default_value_t = 36)]
    cells: usize,

    /// Differing cells tolerated per match.
    #[arg(long, default_value_t = 0)]
    misses: usize,

    /// JSON file with `DetectorParams` overrides.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Repeat for more log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> CliResult<()> {
    let params = match &cli.config {
        Some(path) => load_params(path)?,
        None => DetectorParams::default(),
    };

    let detector = detector_from_path(&cli.marker, cli.cells, params)
        .map_err(|e| with_path(&cli.marker, e))?;
    let frame = open_gray(&cli.frame).map_err(|e| with_path(&cli.frame, e))?;
    info!(
        "dictionary of {} entries, frame {}x{}",
        detector.dictionary().len(),
        frame.width(),
        frame.height()
    );

    let detections = detect_image(&detector, &frame, cli.misses)?;
    info!("{} markers detected", detections.len());

    let out = serde_json::json!({
        "marker": cli.marker.to_string_lossy(),
        "frame": cli.frame.to_string_lossy(),
        "cells": cli.cells,
        "misses": cli.misses,
        "detections": detections,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn with_path(path: &Path, err: DetectError) -> CliError {
    match err {
        DetectError::Image(e) => format!("failed to open {}: {e}", path.display()).into(),
        other => other.into(),
    }
}

fn load_params(path: &Path) -> CliResult<DetectorParams> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| -> CliError { format!("failed to read {}: {e}", path.display()).into() })?;
    Ok(serde_json::from_str(&raw)?)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // Ignore errors if a logger/subscriber was already installed.
    #[cfg(feature = "tracing")]
    {
        let _ = LogTracer::init();
        log::set_max_level(level);
        refmark::core::init_tracing(false);
    }
    #[cfg(not(feature = "tracing"))]
    {
        let _ = refmark::core::init_with_level(level);
    }
}
