//! Linear constant-velocity Kalman filter over a 2-D position trace.
//!
//! State is `[x, y, vx, vy]`; only position is observed. Velocity is latent
//! and inferred from the dynamics.

use serde::{Deserialize, Serialize};

use crate::error::{EstimationError, Result};
use crate::types::linalg::*;

/// Diagonal entries of `S` this many epsilons of the model scale or less are roundoff
const ROUNDOFF_EPSILONS: f64 = 1e3;

/// Fixed model parameters for one smoothing run.
///
/// `Q` and `R` are diagonal; `H` always selects `(x, y)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterModel {
    /// Diagonal of the process-noise covariance `Q` (x, y, vx, vy)
    pub process_noise: [f64; STATE_DIM],
    /// Diagonal of the observation-noise covariance `R` (x, y)
    pub observation_noise: [f64; MEASURE_DIM_POS],
    /// `det S <= tol · S₀₀ · S₁₁` is treated as singular (scale-free, `1 - ρ²` of S)
    pub singularity_tolerance: f64,
}

impl Default for FilterModel {
    fn default() -> Self {
        Self::new(0.01, 1.0)
    }
}

impl FilterModel {
    pub const DEFAULT_SINGULARITY_TOLERANCE: f64 = 1e-10;

    /// Uniform diagonals: `Q = q·I₄`, `R = r·I₂`.
    pub fn new(q: f64, r: f64) -> Self {
        Self::from_diagonals([q; STATE_DIM], [r; MEASURE_DIM_POS])
    }

    pub fn from_diagonals(q: [f64; STATE_DIM], r: [f64; MEASURE_DIM_POS]) -> Self {
        Self {
            process_noise: q,
            observation_noise: r,
            singularity_tolerance: Self::DEFAULT_SINGULARITY_TOLERANCE,
        }
    }

    pub fn with_singularity_tolerance(mut self, tolerance: f64) -> Self {
        self.singularity_tolerance = tolerance;
        self
    }

    /// Reject non-finite or negative variances and a bad tolerance.
    pub fn validate(&self) -> Result<()> {
        let variances = self.process_noise.iter().chain(self.observation_noise.iter());
        for &value in variances {
            if !value.is_finite() || value < 0.0 {
                return Err(EstimationError::InvalidModel(format!(
                    "noise variances must be finite and non-negative, got {value}"
                )));
            }
        }
        if !(0.0..1.0).contains(&self.singularity_tolerance) {
            return Err(EstimationError::InvalidModel(format!(
                "singularity tolerance must lie in [0, 1), got {}",
                self.singularity_tolerance
            )));
        }
        Ok(())
    }

    /// `F(dt)`: identity with `dt` coupling velocity into position.
    pub fn transition(&self, dt: f64) -> Result<StateMatrix> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(EstimationError::InvalidTimeStep(dt));
        }
        let mut f = StateMatrix::identity();
        f[(IDX_X, IDX_VX)] = dt;
        f[(IDX_Y, IDX_VY)] = dt;
        Ok(f)
    }

    pub fn process_noise_matrix(&self) -> StateMatrix {
        StateMatrix::from_diagonal(&StateVector::from(self.process_noise))
    }

    pub fn observation_noise_matrix(&self) -> InnovationMatrix {
        InnovationMatrix::from_diagonal(&Observation::from(self.observation_noise))
    }

    /// Largest variance in the model, never below the unit prior `P₀ = I₄`.
    fn scale(&self) -> f64 {
        self.process_noise
            .iter()
            .chain(self.observation_noise.iter())
            .fold(1.0, |acc, &v| acc.max(v))
    }

    pub fn observation_matrix(&self) -> ObservationMatrix {
        let mut h = ObservationMatrix::zeros();
        h[(0, IDX_X)] = 1.0;
        h[(1, IDX_Y)] = 1.0;
        h
    }
}

/// Recursive predict/update cycle carrying `(x, P)` between steps.
pub struct KalmanSmoother {
    state: StateVector,
    covariance: StateMatrix,
    q: StateMatrix,
    r: InnovationMatrix,
    h: ObservationMatrix,
    singularity_tolerance: f64,
    roundoff_floor: f64,
}

impl KalmanSmoother {
    /// Start from the weak prior `x₀ = 0`, `P₀ = I₄`.
    pub fn new(model: &FilterModel) -> Result<Self> {
        model.validate()?;
        Ok(Self {
            state: StateVector::zeros(),
            covariance: StateMatrix::identity(),
            q: model.process_noise_matrix(),
            r: model.observation_noise_matrix(),
            h: model.observation_matrix(),
            singularity_tolerance: model.singularity_tolerance,
            roundoff_floor: ROUNDOFF_EPSILONS * f64::EPSILON * model.scale(),
        })
    }

    pub fn state(&self) -> &StateVector {
        &self.state
    }

    pub fn covariance(&self) -> &StateMatrix {
        &self.covariance
    }

    /// Propagate the belief forward by `F`: `x⁻ = F·x`, `P⁻ = F·P·Fᵀ + Q`.
    pub fn predict_with(&mut self, f: &StateMatrix) {
        let (state, covariance) = self.predicted(f);
        self.state = state;
        self.covariance = covariance;
    }

    pub fn predict(&mut self, dt: f64, model: &FilterModel) -> Result<()> {
        let f = model.transition(dt)?;
        self.predict_with(&f);
        Ok(())
    }

    /// Fold one position observation into the current belief.
    ///
    /// On error the belief is left untouched.
    pub fn update(&mut self, index: usize, observation: (f64, f64)) -> Result<StateVector> {
        let (state, covariance) =
            self.corrected(index, observation, &self.state, &self.covariance)?;
        self.state = state;
        self.covariance = covariance;
        Ok(state)
    }

    /// Predict with `f` then update with `observation`, committing only if both succeed.
    pub fn step_with(
        &mut self,
        index: usize,
        observation: (f64, f64),
        f: &StateMatrix,
    ) -> Result<StateVector> {
        let (state_pred, covariance_pred) = self.predicted(f);
        let (state, covariance) =
            self.corrected(index, observation, &state_pred, &covariance_pred)?;
        self.state = state;
        self.covariance = covariance;
        Ok(state)
    }

    pub fn step(
        &mut self,
        index: usize,
        observation: (f64, f64),
        dt: f64,
        model: &FilterModel,
    ) -> Result<StateVector> {
        let f = model.transition(dt)?;
        self.step_with(index, observation, &f)
    }

    fn predicted(&self, f: &StateMatrix) -> (StateVector, StateMatrix) {
        let state = f * self.state;
        let covariance = f * self.covariance * f.transpose() + self.q;
        (state, covariance)
    }

    fn corrected(
        &self,
        index: usize,
        observation: (f64, f64),
        state: &StateVector,
        covariance: &StateMatrix,
    ) -> Result<(StateVector, StateMatrix)> {
        let (zx, zy) = observation;
        if !zx.is_finite() || !zy.is_finite() {
            return Err(EstimationError::InvalidObservation {
                index,
                x: zx,
                y: zy,
            });
        }
        let z = Observation::new(zx, zy);

        let h = &self.h;
        let h_t = h.transpose();
        let innovation = z - h * state;
        let s = h * covariance * h_t + self.r;
        let s_inv = self.invert_innovation(index, &s)?;

        let k: KalmanGain = covariance * h_t * s_inv;
        let new_state = state + k * innovation;

        // Joseph form keeps P symmetric positive semi-definite
        let i_kh = StateMatrix::identity() - k * h;
        let new_covariance = i_kh * covariance * i_kh.transpose() + k * self.r * k.transpose();

        Ok((new_state, new_covariance))
    }

    fn invert_innovation(&self, index: usize, s: &InnovationMatrix) -> Result<InnovationMatrix> {
        let (s_xx, s_yy) = (s[(0, 0)], s[(1, 1)]);
        let det = s_xx * s_yy - s[(0, 1)] * s[(1, 0)];
        // Either S has collapsed to roundoff, or its axes are nearly collinear
        let vanished = s_xx.abs().max(s_yy.abs()) <= self.roundoff_floor;
        let collinear = det <= self.singularity_tolerance * (s_xx * s_yy).abs();
        if !det.is_finite() || vanished || collinear {
            return Err(EstimationError::SingularInnovationCovariance {
                index,
                determinant: det,
            });
        }
        Ok(InnovationMatrix::new(s[(1, 1)], -s[(0, 1)], -s[(1, 0)], s[(0, 0)]) / det)
    }
}

/// Smooth a position trace sampled at a uniform `dt`.
///
/// Every step predicts with the same `F(dt)` and then updates. Output has
/// the same length as `observations`; an empty trace yields an empty result.
pub fn smooth(
    observations: &[(f64, f64)],
    dt: f64,
    model: &FilterModel,
) -> Result<Vec<StateVector>> {
    if observations.is_empty() {
        return Ok(Vec::new());
    }

    let f = model.transition(dt)?;
    let mut smoother = KalmanSmoother::new(model)?;
    observations
        .iter()
        .enumerate()
        .map(|(index, &z)| smoother.step_with(index, z, &f))
        .collect()
}

/// Smooth a position trace with `F` rebuilt from each sampling interval.
///
/// The prior describes the state at `timestamps[0]`, so the first
/// observation is an update only.
pub fn smooth_with_timestamps(
    observations: &[(f64, f64)],
    timestamps: &[f64],
    model: &FilterModel,
) -> Result<Vec<StateVector>> {
    if observations.len() != timestamps.len() {
        return Err(EstimationError::LengthMismatch {
            observations: observations.len(),
            timestamps: timestamps.len(),
        });
    }
    if observations.is_empty() {
        return Ok(Vec::new());
    }

    let mut smoother = KalmanSmoother::new(model)?;
    let mut estimates = Vec::with_capacity(observations.len());
    estimates.push(smoother.update(0, observations[0])?);

    for index in 1..observations.len() {
        let dt = timestamps[index] - timestamps[index - 1];
        estimates.push(smoother.step(index, observations[index], dt, model)?);
    }

    Ok(estimates)
}
