use thiserror::Error;

/// Estimation error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimationError {
    #[error("timestamp at sample {index} ({current}) does not strictly follow previous timestamp ({previous})")]
    InvalidTimestampOrder {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("observation {index} is not finite: ({x}, {y})")]
    InvalidObservation { index: usize, x: f64, y: f64 },

    #[error("innovation covariance at step {index} is singular (det = {determinant:e})")]
    SingularInnovationCovariance { index: usize, determinant: f64 },

    #[error("time step must be positive and finite, got {0}")]
    InvalidTimeStep(f64),

    #[error("invalid filter model: {0}")]
    InvalidModel(String),

    #[error("{observations} observations but {timestamps} timestamps")]
    LengthMismatch {
        observations: usize,
        timestamps: usize,
    },
}

/// Result type for the estimation core
pub type Result<T> = std::result::Result<T, EstimationError>;

impl EstimationError {
    /// Step index the failure is attached to, when there is one.
    pub fn index(&self) -> Option<usize> {
        match self {
            EstimationError::InvalidTimestampOrder { index, .. }
            | EstimationError::InvalidObservation { index, .. }
            | EstimationError::SingularInnovationCovariance { index, .. } => Some(*index),
            EstimationError::InvalidTimeStep(_)
            | EstimationError::InvalidModel(_)
            | EstimationError::LengthMismatch { .. } => None,
        }
    }
}
