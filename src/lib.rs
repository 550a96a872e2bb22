//! Planar trajectory estimation from inertial logs.
//!
//! `dead_reckoning` integrates yaw rate and body-frame acceleration into
//! heading, velocity and position; `filters` smooths the resulting position
//! trace with a constant-velocity Kalman filter. `pipeline` chains the two and
//! `io` moves sample logs and results to and from disk.

pub mod dead_reckoning;
pub mod error;
pub mod filters;
pub mod io;
pub mod pipeline;
pub mod types;

pub use dead_reckoning::{integrate, integrate_with, IntegratorOptions};
pub use error::{EstimationError, Result};
pub use filters::{smooth, smooth_with_timestamps, FilterModel, KalmanSmoother};
pub use pipeline::{PipelineConfig, PipelineOutput, RunSummary, SmootherTimeStep};
pub use types::{InertialSample, SmoothedState, TrajectoryPoint};
