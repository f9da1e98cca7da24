//! Spatiotemporal Curvature
//!
//! `k = |v x a| / |v|^3` per sample, averaged over the stroke as the Simpson
//! integral of `k` divided by the time span.

use glam::DVec3;

use crate::error::FeatureError;
use crate::numerics::{gradient, merge_repeated, simpson, span};

/// Curvature of a sampled 3D trajectory
pub struct CurvatureEstimator;

impl CurvatureEstimator {
    /// Per-sample curvature paired with its timestamp.
    ///
    /// Samples with zero speed are dropped together with their timestamp.
    pub fn samples(positions: &[DVec3], t: &[f64]) -> Option<(Vec<f64>, Vec<f64>)> {
        let v = gradient(positions, t)?;
        let a = gradient(&v, t)?;

        let (kappa, times): (Vec<f64>, Vec<f64>) = v
            .iter()
            .zip(&a)
            .zip(t)
            .filter_map(|((v, a), &ts)| {
                let speed = v.length();
                (speed > 0.0).then(|| (v.cross(*a).length() / (speed * speed * speed), ts))
            })
            .unzip();
        Some((kappa, times))
    }

    /// Time-averaged curvature of one stroke of smoothed positions.
    ///
    /// Samples sharing a timestamp are merged into their mean position first.
    pub fn stroke_curvature(stroke: usize, positions: &[DVec3], t: &[f64]) -> Result<f64, FeatureError> {
        if positions.len() < 2 || positions.len() != t.len() {
            return Err(FeatureError::degenerate(stroke, "fewer than two samples"));
        }
        let (positions, t) = merge_repeated(positions, t);
        if positions.len() < 2 {
            return Err(FeatureError::degenerate(stroke, "zero duration"));
        }
        let (kappa, times) = Self::samples(&positions, &t)
            .ok_or_else(|| FeatureError::degenerate(stroke, "timestamps decrease"))?;

        let duration = span(&times);
        if kappa.len() < 2 || duration <= 0.0 {
            return Err(FeatureError::degenerate(stroke, "fewer than two moving samples"));
        }
        Ok(simpson(&kappa, &times) / duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_circle_radius() {
        let radius = 2.0;
        let n = 401;
        let t: Vec<f64> = (0..n).map(|i| i as f64 * 0.01).collect();
        // Half a revolution per second, constant speed
        let p: Vec<DVec3> = t
            .iter()
            .map(|&s| {
                let phase = PI * s;
                DVec3::new(radius * phase.cos(), radius * phase.sin(), 1.0)
            })
            .collect();
        let k = CurvatureEstimator::stroke_curvature(0, &p, &t).unwrap();
        assert!((k - 1.0 / radius).abs() < 0.02 / radius, "curvature {}", k);
    }

    #[test]
    fn test_straight_line_has_zero_curvature() {
        let t: Vec<f64> = (0..50).map(|i| i as f64 * 0.1).collect();
        let p: Vec<DVec3> = t.iter().map(|&s| DVec3::new(s, 2.0 * s, -s)).collect();
        let k = CurvatureEstimator::stroke_curvature(0, &p, &t).unwrap();
        assert!(k.abs() < 1e-9);
    }

    #[test]
    fn test_stationary_samples_dropped() {
        let t = [0.0, 1.0, 2.0, 3.0, 4.0];
        let p = [DVec3::ZERO; 5];
        let (kappa, times) = CurvatureEstimator::samples(&p, &t).unwrap();
        assert!(kappa.is_empty());
        assert!(times.is_empty());
        assert!(CurvatureEstimator::stroke_curvature(4, &p, &t).is_err());
    }

    #[test]
    fn test_repeated_timestamp_merged() {
        let mut t: Vec<f64> = (0..30).map(|i| i as f64 * 0.1).collect();
        t[15] = t[14];
        let p: Vec<DVec3> = (0..30).map(|i| DVec3::new(i as f64, -(i as f64), 0.5)).collect();
        let k = CurvatureEstimator::stroke_curvature(1, &p, &t).unwrap();
        assert!(k.abs() < 1e-6, "curvature {}", k);
    }

    #[test]
    fn test_single_instant_is_degenerate() {
        let p = [DVec3::ZERO, DVec3::X, DVec3::Y];
        assert_eq!(
            CurvatureEstimator::stroke_curvature(1, &p, &[0.5, 0.5, 0.5]),
            Err(FeatureError::DegenerateInterval {
                stroke: 1,
                reason: "zero duration"
            })
        );
    }
}
