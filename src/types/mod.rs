pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};

/// One inertial reading: planar body-frame acceleration plus yaw rate.
///
/// Field names on the wire follow the sensor log headers
/// (`Timestamp, accX, accY, GyrZ`).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InertialSample {
    /// Seconds, non-decreasing across a log
    #[serde(rename = "Timestamp")]
    pub timestamp: f64,
    /// Body-frame acceleration along x [m/s²]
    #[serde(rename = "accX")]
    pub accel_x: f64,
    /// Body-frame acceleration along y [m/s²]
    #[serde(rename = "accY")]
    pub accel_y: f64,
    /// Angular rate about the vertical axis [rad/s]
    #[serde(rename = "GyrZ")]
    pub gyro_z: f64,
}

impl InertialSample {
    pub fn new(timestamp: f64, accel_x: f64, accel_y: f64, gyro_z: f64) -> Self {
        Self {
            timestamp,
            accel_x,
            accel_y,
            gyro_z,
        }
    }
}

/// Dead-reckoned state at one sample, expressed in the global frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    /// Radians, unbounded unless wrapping was requested
    pub heading: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
    pub position_x: f64,
    pub position_y: f64,
}

impl TrajectoryPoint {
    /// The integration seed: zero heading, velocity and position.
    pub const ZERO: TrajectoryPoint = TrajectoryPoint {
        heading: 0.0,
        velocity_x: 0.0,
        velocity_y: 0.0,
        position_x: 0.0,
        position_y: 0.0,
    };

    pub fn position(&self) -> (f64, f64) {
        (self.position_x, self.position_y)
    }
}

/// Smoothed position/velocity emitted by the Kalman smoother.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SmoothedState {
    pub position_x: f64,
    pub position_y: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
}

impl From<StateVector> for SmoothedState {
    fn from(state: StateVector) -> Self {
        Self {
            position_x: state[IDX_X],
            position_y: state[IDX_Y],
            velocity_x: state[IDX_VX],
            velocity_y: state[IDX_VY],
        }
    }
}

impl SmoothedState {
    pub fn position(&self) -> (f64, f64) {
        (self.position_x, self.position_y)
    }
}
