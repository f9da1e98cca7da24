//! Tool Orientation Against the Contact Surface
//!
//! While the drill presses on the surface the force direction approximates the
//! surface normal. The tool axis is the fixed drill-axis vector rotated into
//! the world frame by the pose quaternion. The reported residual is
//! `90 - angle` between the two, after folding the angle into `[0, 90]`.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use session_data::{ForceSample, PoseStream, StreamAligner, Stroke};
use tracing::debug;

use crate::error::FeatureError;

/// Contact detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Drill axis in the tool frame
    pub drill_axis: [f64; 3],
    /// Maximum pose/force time gap accepted as the same instant
    pub match_tolerance: f64,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            drill_axis: [-1.0, 0.0, 0.0],
            match_tolerance: 1e-8,
        }
    }
}

/// One pose sample judged to be in contact
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ContactSample {
    /// Index of the matched pose sample
    pub pose_index: usize,
    /// Pose timestamp
    pub timestamp: f64,
    /// Unit surface normal taken from the force direction
    pub normal: DVec3,
    /// Unit drill axis in world coordinates
    pub tool_axis: DVec3,
    /// Degrees away from the reference contact angle
    pub residual_deg: f64,
}

/// Per-contact tool axis deviation from the surface normal
#[derive(Debug, Clone)]
pub struct OrientationEstimator {
    drill_axis: DVec3,
    tolerance: f64,
}

impl OrientationEstimator {
    /// Fails when the drill axis has zero length
    pub fn new(config: &OrientationConfig) -> Result<Self, FeatureError> {
        let axis = DVec3::from_array(config.drill_axis);
        if !axis.is_finite() || axis.length() == 0.0 {
            return Err(FeatureError::InvalidConfig(format!(
                "drill axis {:?} is not a usable direction",
                config.drill_axis
            )));
        }
        if config.match_tolerance.is_nan() || config.match_tolerance < 0.0 {
            return Err(FeatureError::InvalidConfig(format!(
                "match tolerance {} must be non-negative",
                config.match_tolerance
            )));
        }
        Ok(Self {
            drill_axis: axis.normalize(),
            tolerance: config.match_tolerance,
        })
    }

    /// Median magnitude of the non-zero force samples
    pub fn contact_threshold(force: &[ForceSample]) -> Option<f64> {
        let mut magnitudes: Vec<f64> = force
            .iter()
            .map(ForceSample::magnitude)
            .filter(|m| *m > 0.0)
            .collect();
        if magnitudes.is_empty() {
            return None;
        }
        magnitudes.sort_by(f64::total_cmp);
        let mid = magnitudes.len() / 2;
        Some(if magnitudes.len() % 2 == 0 {
            0.5 * (magnitudes[mid - 1] + magnitudes[mid])
        } else {
            magnitudes[mid]
        })
    }

    /// Folded angle residual between a unit normal and a unit tool axis
    pub fn residual(normal: DVec3, tool_axis: DVec3) -> f64 {
        let mut angle = normal.dot(tool_axis).clamp(-1.0, 1.0).acos().to_degrees();
        if angle > 90.0 {
            angle = 180.0 - angle;
        }
        90.0 - angle
    }

    /// Contact samples of a session, in pose order
    pub fn estimate(&self, poses: &PoseStream, force: &[ForceSample]) -> Vec<ContactSample> {
        let Some(threshold) = Self::contact_threshold(force) else {
            debug!("No non-zero force samples; no contact detected");
            return Vec::new();
        };

        let matches = StreamAligner::nearest_all(poses.timestamps(), force, self.tolerance);
        let contacts: Vec<ContactSample> = matches
            .into_iter()
            .enumerate()
            .filter_map(|(i, m)| {
                let sample = &force[m?];
                if sample.magnitude() <= threshold {
                    return None;
                }
                let pose = &poses.samples()[i];
                let normal = sample.wrench.normalize();
                let tool_axis = (pose.orientation * self.drill_axis).normalize();
                Some(ContactSample {
                    pose_index: i,
                    timestamp: poses.timestamps()[i],
                    normal,
                    tool_axis,
                    residual_deg: Self::residual(normal, tool_axis),
                })
            })
            .collect();

        debug!(
            "{} of {} pose samples in contact (threshold {:.4})",
            contacts.len(),
            poses.len(),
            threshold
        );
        contacts
    }

    /// Mean residual of the contact samples inside each stroke
    pub fn per_stroke(contacts: &[ContactSample], strokes: &[Stroke]) -> Vec<Option<f64>> {
        strokes
            .iter()
            .map(|stroke| {
                let residuals: Vec<f64> = contacts
                    .iter()
                    .filter(|c| stroke.contains_index(c.pose_index))
                    .map(|c| c.residual_deg)
                    .collect();
                (!residuals.is_empty()).then(|| residuals.iter().sum::<f64>() / residuals.len() as f64)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DQuat;
    use session_data::PoseSample;
    use std::f64::consts::FRAC_PI_2;

    fn estimator() -> OrientationEstimator {
        OrientationEstimator::new(&OrientationConfig::default()).unwrap()
    }

    fn stream(orientation: DQuat, n: usize) -> PoseStream {
        let samples = (0..n)
            .map(|i| PoseSample::new(DVec3::new(i as f64, 0.0, 0.0), orientation))
            .collect();
        PoseStream::new(samples, (0..n).map(|i| i as f64 * 0.1).collect()).unwrap()
    }

    #[test]
    fn test_residual_folding() {
        let axis = DVec3::NEG_X;
        assert!((OrientationEstimator::residual(DVec3::NEG_X, axis) - 90.0).abs() < 1e-9);
        assert!((OrientationEstimator::residual(DVec3::X, axis) - 90.0).abs() < 1e-9);
        assert!(OrientationEstimator::residual(DVec3::Y, axis).abs() < 1e-9);
        let diagonal = DVec3::new(-1.0, 1.0, 0.0).normalize();
        assert!((OrientationEstimator::residual(diagonal, axis) - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_contact_threshold_is_median_of_nonzero() {
        let force: Vec<ForceSample> = [0.0, 1.0, 2.0, 3.0]
            .iter()
            .enumerate()
            .map(|(i, &m)| ForceSample::new(DVec3::new(0.0, m, 0.0), i as f64))
            .collect();
        assert_eq!(OrientationEstimator::contact_threshold(&force), Some(2.0));
        assert_eq!(OrientationEstimator::contact_threshold(&force[..1]), None);
        assert_eq!(OrientationEstimator::contact_threshold(&force[1..3]), Some(1.5));
    }

    #[test]
    fn test_only_strong_matched_samples_count() {
        let poses = stream(DQuat::IDENTITY, 4);
        let force = vec![
            ForceSample::new(DVec3::new(0.0, 1.0, 0.0), 0.0),
            ForceSample::new(DVec3::new(0.0, 2.0, 0.0), 0.1),
            ForceSample::new(DVec3::new(0.0, 3.0, 0.0), 0.2),
            ForceSample::new(DVec3::new(0.0, 9.0, 0.0), 0.3 + 1e-6),
        ];
        let contacts = estimator().estimate(&poses, &force);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].pose_index, 2);
        // Force along +y, tool along -x: perpendicular contact
        assert!(contacts[0].residual_deg.abs() < 1e-9);
    }

    #[test]
    fn test_rotated_tool_axis() {
        let poses = stream(DQuat::from_rotation_z(FRAC_PI_2), 3);
        let force = vec![
            ForceSample::new(DVec3::new(0.0, 1.0, 0.0), 0.0),
            ForceSample::new(DVec3::new(0.0, 5.0, 0.0), 0.1),
            ForceSample::new(DVec3::new(0.0, 0.5, 0.0), 0.2),
        ];
        let contacts = estimator().estimate(&poses, &force);
        assert_eq!(contacts.len(), 1);
        assert!((contacts[0].tool_axis - DVec3::NEG_Y).length() < 1e-9);
        assert!((contacts[0].residual_deg - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_per_stroke_means() {
        let contact = |pose_index: usize, residual_deg: f64| ContactSample {
            pose_index,
            timestamp: 0.0,
            normal: DVec3::X,
            tool_axis: DVec3::X,
            residual_deg,
        };
        let contacts = vec![contact(0, 10.0), contact(1, 20.0), contact(5, 40.0)];
        let strokes = vec![
            Stroke { index: 0, start_idx: 0, end_idx: 3, start_time: 0.0, end_time: 0.3 },
            Stroke { index: 1, start_idx: 3, end_idx: 5, start_time: 0.3, end_time: 0.5 },
            Stroke { index: 2, start_idx: 5, end_idx: 8, start_time: 0.5, end_time: f64::INFINITY },
        ];
        assert_eq!(
            OrientationEstimator::per_stroke(&contacts, &strokes),
            vec![Some(15.0), None, Some(40.0)]
        );
    }

    #[test]
    fn test_zero_axis_rejected() {
        let config = OrientationConfig {
            drill_axis: [0.0; 3],
            ..Default::default()
        };
        assert!(OrientationEstimator::new(&config).is_err());
    }
}
