/// State estimation filters
///
/// Linear constant-velocity Kalman filter used to smooth dead-reckoned
/// position traces.

pub mod constant_velocity;

pub use constant_velocity::{smooth, smooth_with_timestamps, FilterModel, KalmanSmoother};
