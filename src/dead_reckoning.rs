//! Planar dead reckoning from body-frame acceleration and yaw rate.
//!
//! Each step is first-order Euler:
//!   heading  += gyro_z · dt
//!   a_global  = R(heading) · a_body      (post-update heading)
//!   velocity += a_global · dt
//!   position += velocity · dt            (post-update velocity)
//!
//! Drift is not corrected here; the constant-velocity smoother consumes the
//! resulting position trace.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{EstimationError, Result};
use crate::types::{InertialSample, TrajectoryPoint};

/// Integration options. The default keeps heading unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegratorOptions {
    /// Keep heading inside (-π, π] after every step
    #[serde(default)]
    pub wrap_heading: bool,
}

impl TrajectoryPoint {
    /// Advance this state by one sample over `dt` seconds.
    ///
    /// `dt` is taken as already validated (positive, finite).
    pub fn advance(&self, sample: &InertialSample, dt: f64) -> TrajectoryPoint {
        let heading = self.heading + sample.gyro_z * dt;

        let (sin_h, cos_h) = heading.sin_cos();
        let global_ax = sample.accel_x * cos_h - sample.accel_y * sin_h;
        let global_ay = sample.accel_x * sin_h + sample.accel_y * cos_h;

        let velocity_x = self.velocity_x + global_ax * dt;
        let velocity_y = self.velocity_y + global_ay * dt;

        TrajectoryPoint {
            heading,
            velocity_x,
            velocity_y,
            position_x: self.position_x + velocity_x * dt,
            position_y: self.position_y + velocity_y * dt,
        }
    }
}

/// Interval between two consecutive samples.
///
/// Fails with `InvalidTimestampOrder` unless the interval is positive and
/// finite; `index` is the position of `current` in its sequence.
pub fn sample_interval(
    index: usize,
    previous: &InertialSample,
    current: &InertialSample,
) -> Result<f64> {
    let dt = current.timestamp - previous.timestamp;
    if dt > 0.0 && dt.is_finite() {
        Ok(dt)
    } else {
        Err(EstimationError::InvalidTimestampOrder {
            index,
            previous: previous.timestamp,
            current: current.timestamp,
        })
    }
}

/// Integrate a full sample sequence with default options.
pub fn integrate(samples: &[InertialSample]) -> Result<Vec<TrajectoryPoint>> {
    integrate_with(samples, IntegratorOptions::default())
}

/// Integrate a full sample sequence.
///
/// Output is index-aligned with `samples`; element 0 is always the zero
/// seed. Nothing is returned on failure.
pub fn integrate_with(
    samples: &[InertialSample],
    options: IntegratorOptions,
) -> Result<Vec<TrajectoryPoint>> {
    let mut trajectory = Vec::with_capacity(samples.len());
    if samples.is_empty() {
        return Ok(trajectory);
    }

    let mut state = TrajectoryPoint::ZERO;
    trajectory.push(state);

    for (offset, pair) in samples.windows(2).enumerate() {
        let dt = sample_interval(offset + 1, &pair[0], &pair[1])?;
        state = state.advance(&pair[1], dt);
        if options.wrap_heading {
            state.heading = wrap_angle(state.heading);
        }
        trajectory.push(state);
    }

    Ok(trajectory)
}

/// Wrap an angle into (-π, π].
pub fn wrap_angle(theta: f64) -> f64 {
    let wrapped = (theta + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}

/// Total distance travelled along a trajectory's position trace.
pub fn path_length(points: &[TrajectoryPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| {
            (pair[1].position_x - pair[0].position_x).hypot(pair[1].position_y - pair[0].position_y)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn uniform(n: usize, dt: f64, ax: f64, ay: f64, gz: f64) -> Vec<InertialSample> {
        (0..n)
            .map(|i| InertialSample::new(i as f64 * dt, ax, ay, gz))
            .collect()
    }

    #[test]
    fn test_single_sample_is_zero_seed() {
        let samples = [InertialSample::new(3.0, 4.0, -2.0, 1.0)];
        let trajectory = integrate(&samples).unwrap();
        assert_eq!(trajectory, vec![TrajectoryPoint::ZERO]);
    }

    #[test]
    fn test_empty_input() {
        assert!(integrate(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_zero_dynamics() {
        let trajectory = integrate(&uniform(50, 0.02, 0.0, 0.0, 0.0)).unwrap();
        assert_eq!(trajectory.len(), 50);
        assert!(trajectory.iter().all(|p| *p == TrajectoryPoint::ZERO));
    }

    #[test]
    fn test_pure_rotation() {
        let gz = 0.3;
        let timestamps = [0.0, 0.1, 0.25, 0.3, 0.7, 1.0];
        let samples: Vec<_> = timestamps
            .iter()
            .map(|&t| InertialSample::new(t, 0.0, 0.0, gz))
            .collect();

        let trajectory = integrate(&samples).unwrap();
        for (point, &t) in trajectory.iter().zip(timestamps.iter()) {
            assert_relative_eq!(point.heading, gz * t, epsilon = 1e-12);
            assert_eq!(point.velocity_x, 0.0);
            assert_eq!(point.velocity_y, 0.0);
            assert_eq!(point.position_x, 0.0);
            assert_eq!(point.position_y, 0.0);
        }
        assert!(trajectory.windows(2).all(|w| w[1].heading > w[0].heading));
    }

    #[test]
    fn test_constant_acceleration_matches_discrete_kinematics() {
        // Semi-implicit Euler: x_n = a·dt²·n(n+1)/2 = ½·a·t·(t + dt)
        let (a, dt, n) = (0.8, 0.01, 1000);
        let trajectory = integrate(&uniform(n, dt, a, 0.0, 0.0)).unwrap();

        for (i, point) in trajectory.iter().enumerate() {
            let t = i as f64 * dt;
            assert_relative_eq!(point.position_x, 0.5 * a * t * (t + dt), max_relative = 1e-9);
            assert_relative_eq!(point.velocity_x, a * t, max_relative = 1e-9);
            assert_eq!(point.position_y, 0.0);
        }
    }

    #[test]
    fn test_constant_acceleration_approaches_continuous_limit() {
        let (a, dt, n) = (2.0, 1e-4, 10_001);
        let trajectory = integrate(&uniform(n, dt, a, 0.0, 0.0)).unwrap();
        let t = (n - 1) as f64 * dt;
        let last = trajectory.last().unwrap();
        // Relative gap to ½·a·t² is dt / t
        assert_relative_eq!(last.position_x, 0.5 * a * t * t, max_relative = 2e-4);
    }

    #[test]
    fn test_accelerate_then_hold_thrust() {
        let samples = [
            InertialSample::new(0.0, 0.0, 0.0, 0.0),
            InertialSample::new(1.0, 1.0, 0.0, 0.0),
            InertialSample::new(2.0, 1.0, 0.0, 0.0),
        ];
        let trajectory = integrate(&samples).unwrap();

        let expected = [(0.0, 0.0, 0.0), (1.0, 1.0, 0.0), (2.0, 3.0, 0.0)];
        for (point, &(vx, x, y)) in trajectory.iter().zip(expected.iter()) {
            assert_eq!(point.heading, 0.0);
            assert_abs_diff_eq!(point.velocity_x, vx);
            assert_abs_diff_eq!(point.velocity_y, 0.0);
            assert_abs_diff_eq!(point.position_x, x);
            assert_abs_diff_eq!(point.position_y, y);
        }
    }

    #[test]
    fn test_rotation_uses_updated_heading() {
        // One step turns the body a quarter turn; body-x thrust must land on global y.
        let samples = [
            InertialSample::new(0.0, 0.0, 0.0, 0.0),
            InertialSample::new(1.0, 1.0, 0.0, PI / 2.0),
        ];
        let trajectory = integrate(&samples).unwrap();
        let p = trajectory[1];
        assert_relative_eq!(p.heading, PI / 2.0);
        assert_abs_diff_eq!(p.velocity_x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.velocity_y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.position_y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_body_y_acceleration_at_zero_heading() {
        let trajectory = integrate(&uniform(3, 1.0, 0.0, 2.0, 0.0)).unwrap();
        assert_abs_diff_eq!(trajectory[2].velocity_y, 4.0);
        assert_abs_diff_eq!(trajectory[2].position_y, 6.0);
        assert_abs_diff_eq!(trajectory[2].position_x, 0.0);
    }

    #[test]
    fn test_repeated_timestamp_rejected() {
        let samples = [
            InertialSample::new(0.0, 1.0, 0.0, 0.0),
            InertialSample::new(0.5, 1.0, 0.0, 0.0),
            InertialSample::new(0.5, 1.0, 0.0, 0.0),
        ];
        let err = integrate(&samples).unwrap_err();
        assert_eq!(
            err,
            EstimationError::InvalidTimestampOrder {
                index: 2,
                previous: 0.5,
                current: 0.5,
            }
        );
    }

    #[test]
    fn test_decreasing_timestamp_rejected() {
        let samples = [
            InertialSample::new(1.0, 0.0, 0.0, 0.0),
            InertialSample::new(0.9, 0.0, 0.0, 0.0),
        ];
        assert!(matches!(
            integrate(&samples),
            Err(EstimationError::InvalidTimestampOrder { index: 1, .. })
        ));
    }

    #[test]
    fn test_non_finite_timestamp_rejected() {
        let samples = [
            InertialSample::new(0.0, 0.0, 0.0, 0.0),
            InertialSample::new(f64::NAN, 0.0, 0.0, 0.0),
        ];
        assert!(matches!(
            integrate(&samples),
            Err(EstimationError::InvalidTimestampOrder { index: 1, .. })
        ));
    }

    #[test]
    fn test_tiny_positive_step_accepted() {
        let samples = [
            InertialSample::new(0.0, 1.0, 0.0, 0.0),
            InertialSample::new(1e-9, 1.0, 0.0, 0.0),
        ];
        let trajectory = integrate(&samples).unwrap();
        assert!(trajectory[1].velocity_x > 0.0);
    }

    #[test]
    fn test_wrap_angle() {
        assert_relative_eq!(wrap_angle(0.0), 0.0);
        assert_relative_eq!(wrap_angle(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-3.0 * PI / 2.0), PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(PI), PI);
        assert_relative_eq!(wrap_angle(-PI), PI);
    }

    #[test]
    fn test_wrapped_heading_keeps_positions() {
        let samples = uniform(200, 0.05, 1.0, 0.5, 2.0);
        let unbounded = integrate(&samples).unwrap();
        let wrapped = integrate_with(&samples, IntegratorOptions { wrap_heading: true }).unwrap();

        assert!(unbounded.last().unwrap().heading > PI);
        for (u, w) in unbounded.iter().zip(wrapped.iter()) {
            assert!(w.heading > -PI && w.heading <= PI);
            assert_relative_eq!(u.position_x, w.position_x, epsilon = 1e-9);
            assert_relative_eq!(u.position_y, w.position_y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_path_length() {
        let trajectory = integrate(&[
            InertialSample::new(0.0, 0.0, 0.0, 0.0),
            InertialSample::new(1.0, 1.0, 0.0, 0.0),
            InertialSample::new(2.0, 1.0, 0.0, 0.0),
        ])
        .unwrap();
        assert_abs_diff_eq!(path_length(&trajectory), 3.0);
        assert_eq!(path_length(&trajectory[..1]), 0.0);
    }
}
