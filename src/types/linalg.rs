//! Linear algebra type system for the trajectory estimator
//!
//! Fixed-size, stack-allocated aliases so every filter operation is
//! dimension-checked at compile time.

use nalgebra::{SMatrix, SVector};

// ===== State Dimensions =====
pub const STATE_DIM: usize = 4; // [x, y, vx, vy]

// ===== Measurement Dimensions =====
pub const MEASURE_DIM_POS: usize = 2; // (x, y)

// ===== Constant-Velocity Filter Types =====
pub type StateVector = SVector<f64, STATE_DIM>;
pub type StateMatrix = SMatrix<f64, STATE_DIM, STATE_DIM>;

// Observation types
pub type Observation = SVector<f64, MEASURE_DIM_POS>;
pub type InnovationMatrix = SMatrix<f64, MEASURE_DIM_POS, MEASURE_DIM_POS>;
pub type ObservationMatrix = SMatrix<f64, MEASURE_DIM_POS, STATE_DIM>; // 2×4

// Kalman gain
pub type KalmanGain = SMatrix<f64, STATE_DIM, MEASURE_DIM_POS>; // 4×2

// State vector component indices
pub const IDX_X: usize = 0;
pub const IDX_Y: usize = 1;
pub const IDX_VX: usize = 2;
pub const IDX_VY: usize = 3;
