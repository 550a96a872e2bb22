//! Runs the dead-reckoning integrator and the Kalman smoother over one sample
//! log and summarises the result.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::dead_reckoning::{integrate_with, path_length, sample_interval, IntegratorOptions};
use crate::error::Result;
use crate::filters::{smooth, smooth_with_timestamps, FilterModel};
use crate::types::{InertialSample, SmoothedState, TrajectoryPoint};

/// Relative interval deviation above which fixed-dt smoothing is flagged
const NON_UNIFORM_TOLERANCE: f64 = 0.05;

/// How the smoother derives its time step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmootherTimeStep {
    /// First sampling interval reused for every step
    #[default]
    Fixed,
    /// Transition rebuilt from each sampling interval
    PerSample,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub model: FilterModel,
    pub time_step: SmootherTimeStep,
    pub wrap_heading: bool,
    /// Only process the first N samples
    pub max_samples: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub timestamps: Vec<f64>,
    pub trajectory: Vec<TrajectoryPoint>,
    pub smoothed: Vec<SmoothedState>,
    /// Step used by fixed-dt smoothing, `None` when per-sample steps were used
    pub time_step: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub sample_count: usize,
    pub duration_s: f64,
    pub time_step_s: Option<f64>,
    pub final_position: Option<(f64, f64)>,
    pub final_smoothed_position: Option<(f64, f64)>,
    pub final_heading_rad: Option<f64>,
    pub path_length_m: f64,
    /// RMS distance between raw and smoothed positions
    pub smoothing_rms_m: f64,
}

/// Integrate `samples` and smooth the resulting position trace.
pub fn run(samples: &[InertialSample], config: &PipelineConfig) -> Result<PipelineOutput> {
    let samples = match config.max_samples {
        Some(limit) if limit < samples.len() => {
            info!("Truncating input to {} of {} samples", limit, samples.len());
            &samples[..limit]
        }
        _ => samples,
    };

    let trajectory = integrate_with(
        samples,
        IntegratorOptions {
            wrap_heading: config.wrap_heading,
        },
    )?;
    debug!("Integrated {} trajectory points", trajectory.len());

    let timestamps: Vec<f64> = samples.iter().map(|s| s.timestamp).collect();
    let observations: Vec<(f64, f64)> = trajectory.iter().map(TrajectoryPoint::position).collect();

    let (estimates, time_step) = match (config.time_step, samples) {
        (SmootherTimeStep::Fixed, [first, second, ..]) => {
            let dt = sample_interval(1, first, second)?;
            let deviation = max_interval_deviation(samples, dt);
            if deviation > NON_UNIFORM_TOLERANCE {
                warn!(
                    "Sampling is not uniform (max interval deviation {:.1}%), fixed dt={:.6}s may misfit",
                    deviation * 100.0,
                    dt
                );
            }
            info!("Smoothing {} positions with fixed dt={:.6}s", observations.len(), dt);
            (smooth(&observations, dt, &config.model)?, Some(dt))
        }
        (SmootherTimeStep::Fixed, [_]) => {
            warn!("Single sample: no interval for fixed dt, smoothing with update only");
            (smooth_with_timestamps(&observations, &timestamps, &config.model)?, None)
        }
        _ => {
            info!("Smoothing {} positions with per-sample dt", observations.len());
            (smooth_with_timestamps(&observations, &timestamps, &config.model)?, None)
        }
    };

    Ok(PipelineOutput {
        timestamps,
        trajectory,
        smoothed: estimates.into_iter().map(SmoothedState::from).collect(),
        time_step,
    })
}

/// Largest relative gap between any sampling interval and `dt`.
fn max_interval_deviation(samples: &[InertialSample], dt: f64) -> f64 {
    samples
        .windows(2)
        .map(|pair| ((pair[1].timestamp - pair[0].timestamp) - dt).abs() / dt)
        .fold(0.0, f64::max)
}

impl PipelineOutput {
    pub fn len(&self) -> usize {
        self.trajectory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectory.is_empty()
    }

    pub fn summary(&self) -> RunSummary {
        let duration_s = match (self.timestamps.first(), self.timestamps.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        };

        let smoothing_rms_m = if self.is_empty() {
            0.0
        } else {
            let sum_sq: f64 = self
                .trajectory
                .iter()
                .zip(self.smoothed.iter())
                .map(|(raw, s)| {
                    (raw.position_x - s.position_x).powi(2) + (raw.position_y - s.position_y).powi(2)
                })
                .sum();
            (sum_sq / self.len() as f64).sqrt()
        };

        RunSummary {
            sample_count: self.len(),
            duration_s,
            time_step_s: self.time_step,
            final_position: self.trajectory.last().map(TrajectoryPoint::position),
            final_smoothed_position: self.smoothed.last().map(SmoothedState::position),
            final_heading_rad: self.trajectory.last().map(|p| p.heading),
            path_length_m: path_length(&self.trajectory),
            smoothing_rms_m,
        }
    }
}
