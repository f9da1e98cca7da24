//! Per-Stroke Kinematics
//!
//! Velocity is average speed over the stroke (path length / duration).
//! Acceleration and jerk chain the gradient operator one and two levels
//! further and report the total variation of the derivative per unit time.

use glam::DVec3;

use crate::error::FeatureError;
use crate::numerics::{gradient, merge_repeated, path_length, span};

/// Chained finite-difference derivatives over stroke slices
pub struct KinematicDifferentiator;

impl KinematicDifferentiator {
    /// Stroke duration, rejecting strokes that cover no time
    fn duration(stroke: usize, positions: &[DVec3], t: &[f64]) -> Result<f64, FeatureError> {
        if positions.len() < 2 || t.len() != positions.len() {
            return Err(FeatureError::degenerate(stroke, "fewer than two samples"));
        }
        let duration = span(t);
        if duration <= 0.0 {
            return Err(FeatureError::degenerate(stroke, "zero duration"));
        }
        Ok(duration)
    }

    fn total_variation(values: &[DVec3]) -> f64 {
        values.windows(2).map(|w| (w[1] - w[0]).length()).sum()
    }

    fn derivative(stroke: usize, values: &[DVec3], t: &[f64]) -> Result<Vec<DVec3>, FeatureError> {
        gradient(values, t).ok_or_else(|| FeatureError::degenerate(stroke, "timestamps decrease"))
    }

    /// Path length over duration
    pub fn velocity(stroke: usize, positions: &[DVec3], t: &[f64]) -> Result<f64, FeatureError> {
        let duration = Self::duration(stroke, positions, t)?;
        Ok(path_length(positions) / duration)
    }

    /// Sum of velocity-vector changes over duration.
    ///
    /// Samples sharing a timestamp are merged before differentiating.
    pub fn acceleration(stroke: usize, positions: &[DVec3], t: &[f64]) -> Result<f64, FeatureError> {
        let duration = Self::duration(stroke, positions, t)?;
        let (positions, t) = merge_repeated(positions, t);
        let v = Self::derivative(stroke, &positions, &t)?;
        Ok(Self::total_variation(&v) / duration)
    }

    /// Sum of acceleration-vector changes over duration.
    ///
    /// Expects positions that were already smoothed.
    pub fn jerk(stroke: usize, positions: &[DVec3], t: &[f64]) -> Result<f64, FeatureError> {
        let duration = Self::duration(stroke, positions, t)?;
        let (positions, t) = merge_repeated(positions, t);
        let v = Self::derivative(stroke, &positions, &t)?;
        let a = Self::derivative(stroke, &v, &t)?;
        Ok(Self::total_variation(&a) / duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(n: usize, dt: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * dt).collect()
    }

    #[test]
    fn test_constant_velocity() {
        let t = axis(21, 0.05);
        let p: Vec<DVec3> = t.iter().map(|&s| DVec3::new(3.0 * s, -4.0 * s, 0.0)).collect();
        assert!((KinematicDifferentiator::velocity(0, &p, &t).unwrap() - 5.0).abs() < 1e-9);
        assert!(KinematicDifferentiator::acceleration(0, &p, &t).unwrap().abs() < 1e-9);
        assert!(KinematicDifferentiator::jerk(0, &p, &t).unwrap().abs() < 1e-6);
    }

    #[test]
    fn test_uniform_acceleration() {
        // x = t^2 / 2 on [0, 1]; interior gradient is exact, ends are one-sided
        let t = axis(11, 0.1);
        let p: Vec<DVec3> = t.iter().map(|&s| DVec3::new(0.5 * s * s, 0.0, 0.0)).collect();
        let a = KinematicDifferentiator::acceleration(0, &p, &t).unwrap();
        assert!((a - 0.9).abs() < 1e-9);
        let v = KinematicDifferentiator::velocity(0, &p, &t).unwrap();
        assert!((v - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_non_uniform_time_axis() {
        let t = [0.0, 0.1, 0.15, 0.4, 0.5];
        let p: Vec<DVec3> = t.iter().map(|&s| DVec3::new(0.0, 2.0 * s, 0.0)).collect();
        assert!((KinematicDifferentiator::velocity(3, &p, &t).unwrap() - 2.0).abs() < 1e-9);
        assert!(KinematicDifferentiator::acceleration(3, &p, &t).unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_strokes() {
        let single = [DVec3::ZERO];
        assert_eq!(
            KinematicDifferentiator::velocity(2, &single, &[0.0]),
            Err(FeatureError::DegenerateInterval {
                stroke: 2,
                reason: "fewer than two samples"
            })
        );

        let p = [DVec3::ZERO, DVec3::X, DVec3::Y];
        assert_eq!(
            KinematicDifferentiator::jerk(1, &p, &[0.5, 0.5, 0.5]),
            Err(FeatureError::DegenerateInterval {
                stroke: 1,
                reason: "zero duration"
            })
        );
    }

    #[test]
    fn test_two_samples() {
        let p = [DVec3::ZERO, DVec3::new(0.0, 0.0, 2.0)];
        let t = [1.0, 1.5];
        assert!((KinematicDifferentiator::velocity(0, &p, &t).unwrap() - 4.0).abs() < 1e-12);
        assert_eq!(KinematicDifferentiator::acceleration(0, &p, &t), Ok(0.0));
        assert_eq!(KinematicDifferentiator::jerk(0, &p, &t), Ok(0.0));
    }

    #[test]
    fn test_repeated_timestamp_keeps_stroke() {
        // Straight stroke at 1 unit/s with sample 10 logged at the time of sample 9
        let mut t = axis(20, 0.01);
        t[10] = t[9];
        let p: Vec<DVec3> = (0..20).map(|i| DVec3::new(i as f64 * 0.01, 0.0, 0.0)).collect();

        let v = KinematicDifferentiator::velocity(0, &p, &t).unwrap();
        assert!((v - 1.0).abs() < 1e-9);
        let a = KinematicDifferentiator::acceleration(0, &p, &t).unwrap();
        let j = KinematicDifferentiator::jerk(0, &p, &t).unwrap();
        assert!(a.is_finite() && a > 0.0);
        assert!(j.is_finite());
    }
}
