use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use imu_trajectory::io::{read_samples, write_smoothed_csv, write_summary_json, write_trajectory_csv};
use imu_trajectory::pipeline::{self, PipelineConfig, SmootherTimeStep};

#[derive(Parser, Debug)]
#[command(name = "imu_trajectory")]
#[command(about = "Dead-reckon a planar trajectory from an IMU log and smooth it with a Kalman filter", long_about = None)]
struct Args {
    /// Sample log with Timestamp, accX, accY, GyrZ columns (CSV, .csv.gz, or .xlsx/.ods first sheet)
    #[arg(long)]
    input: PathBuf,

    /// Dead-reckoned trajectory table
    #[arg(long, default_value = "output.csv")]
    output: PathBuf,

    /// Smoothed trajectory table
    #[arg(long)]
    smoothed_output: Option<PathBuf>,

    /// JSON run summary
    #[arg(long)]
    summary: Option<PathBuf>,

    /// JSON pipeline configuration (filter model, time step mode, ...)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Process-noise variance applied to every state (overrides config)
    #[arg(long)]
    process_noise: Option<f64>,

    /// Observation-noise variance applied to x and y (overrides config)
    #[arg(long)]
    observation_noise: Option<f64>,

    /// Rebuild the transition from every sampling interval instead of the first
    #[arg(long, default_value_t = false)]
    per_sample_dt: bool,

    /// Wrap heading into (-pi, pi]
    #[arg(long, default_value_t = false)]
    wrap_heading: bool,

    /// Only process the first N samples
    #[arg(long)]
    max_samples: Option<usize>,
}

fn load_config(path: &Path) -> Result<PipelineConfig> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("invalid pipeline config {}", path.display()))
}

fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(q) = args.process_noise {
        config.model.process_noise = [q; 4];
    }
    if let Some(r) = args.observation_noise {
        config.model.observation_noise = [r; 2];
    }
    if args.per_sample_dt {
        config.time_step = SmootherTimeStep::PerSample;
    }
    if args.wrap_heading {
        config.wrap_heading = true;
    }
    if args.max_samples.is_some() {
        config.max_samples = args.max_samples;
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = build_config(&args)?;
    info!(
        "Q diag {:?}, R diag {:?}, time step {:?}",
        config.model.process_noise, config.model.observation_noise, config.time_step
    );

    let samples = read_samples(&args.input)?;
    let output = pipeline::run(&samples, &config)
        .with_context(|| format!("estimation failed for {}", args.input.display()))?;

    write_trajectory_csv(&args.output, &output)?;
    if let Some(path) = &args.smoothed_output {
        write_smoothed_csv(path, &output)?;
    }

    let summary = output.summary();
    if let Some(path) = &args.summary {
        write_summary_json(path, &summary)?;
    }
    info!(
        "{} samples over {:.2}s, path length {:.3} m, smoothing RMS {:.3} m",
        summary.sample_count, summary.duration_s, summary.path_length_m, summary.smoothing_rms_m
    );

    println!("{}", args.output.display());
    Ok(())
}
