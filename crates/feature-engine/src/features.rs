//! Session Feature Assembly
//!
//! Runs segmentation once per session, then every per-stroke estimator over
//! the resulting strokes. Strokes an estimator cannot handle are excluded from
//! that feature only; the error is kept on the session for the ledger.

use glam::DVec3;
use serde::Serialize;
use session_data::{SessionStreams, Stroke};
use tracing::debug;

use crate::config::FeatureConfig;
use crate::curvature::CurvatureEstimator;
use crate::error::FeatureError;
use crate::fft::{SpectralAnalyzer, SpectralProfile};
use crate::filter::BandPassFilter;
use crate::force::{ForceAggregator, VoxelTally};
use crate::kinematics::KinematicDifferentiator;
use crate::orientation::OrientationEstimator;
use crate::segmentation::StrokeSegmenter;

/// Scalar features of one stroke
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrokeFeatureSet {
    /// Position of the stroke in the session
    pub index: usize,
    /// Timestamp of the first sample
    pub start_time: f64,
    /// `None` for the open-ended final stroke
    pub end_time: Option<f64>,
    /// Pose samples in the stroke
    pub samples: usize,
    /// Path length of the raw positions
    pub length: f64,
    /// Path length over duration
    pub velocity: Option<f64>,
    /// Total variation of velocity per unit time
    pub acceleration: Option<f64>,
    /// Total variation of acceleration per unit time, on smoothed positions
    pub jerk: Option<f64>,
    /// Time-averaged curvature of smoothed positions
    pub curvature: Option<f64>,
    /// Mean force magnitude, `None` without force samples
    pub force: Option<f64>,
    /// Removal events per unit length, `None` for zero length or no voxel stream
    pub removal_rate: Option<f64>,
    /// Mean orientation residual of the contact samples in the stroke
    pub orientation: Option<f64>,
}

impl StrokeFeatureSet {
    fn new(stroke: &Stroke, length: f64) -> Self {
        Self {
            index: stroke.index,
            start_time: stroke.start_time,
            end_time: (!stroke.is_final()).then_some(stroke.end_time),
            samples: stroke.len(),
            length,
            velocity: None,
            acceleration: None,
            jerk: None,
            curvature: None,
            force: None,
            removal_rate: None,
            orientation: None,
        }
    }
}

/// Everything extracted from one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionFeatures {
    /// Session name used in logs and the ledger
    pub session: String,
    /// Number of detected pivots
    pub stroke_count: usize,
    /// One entry per stroke, including the open-ended last one
    pub strokes: Vec<StrokeFeatureSet>,
    /// Last minus first pose timestamp
    pub duration: f64,
    /// `None` when the session has no voxel stream
    pub voxels: Option<VoxelTally>,
    /// Residual of every contact sample, in pose order
    pub orientation_residuals: Vec<f64>,
    /// Present when spectral inspection is enabled
    pub spectrum: Option<SpectralProfile>,
    /// Per-stroke exclusions
    #[serde(skip)]
    pub excluded: Vec<FeatureError>,
}

impl SessionFeatures {
    /// Values of one per-stroke feature, skipping excluded strokes
    pub fn collect(&self, feature: fn(&StrokeFeatureSet) -> Option<f64>) -> Vec<f64> {
        self.strokes.iter().filter_map(feature).collect()
    }
}

/// Per-session feature pipeline
pub struct FeatureExtractor {
    segmenter: StrokeSegmenter,
    filter: BandPassFilter,
    orientation: OrientationEstimator,
    spectral: Option<SpectralAnalyzer>,
}

impl FeatureExtractor {
    /// Build the estimators, rejecting unusable settings
    pub fn new(config: &FeatureConfig) -> Result<Self, FeatureError> {
        Ok(Self {
            segmenter: StrokeSegmenter::new(config.segmentation.clone())?,
            filter: BandPassFilter::new(&config.smoothing)?,
            orientation: OrientationEstimator::new(&config.orientation)?,
            spectral: config
                .spectral
                .enabled
                .then(|| SpectralAnalyzer::new(&config.spectral)),
        })
    }

    pub fn segmenter(&self) -> &StrokeSegmenter {
        &self.segmenter
    }

    /// Extract all features of a session
    pub fn extract(&mut self, streams: &SessionStreams) -> SessionFeatures {
        let poses = &streams.poses;
        let t = poses.timestamps();
        let raw = poses.positions();
        let smoothed = self.filter.smooth_positions(&raw);

        let segmentation = self.segmenter.segment_positions(&raw, t);
        let strokes = &segmentation.strokes;
        let lengths = ForceAggregator::stroke_lengths(&raw, strokes);

        let mut excluded = Vec::new();
        let mut features: Vec<StrokeFeatureSet> = strokes
            .iter()
            .zip(&lengths)
            .map(|(stroke, &length)| {
                let mut set = StrokeFeatureSet::new(stroke, length);
                let range = stroke.start_idx..stroke.end_idx;
                Self::fill_geometry(&mut set, &raw[range.clone()], &smoothed[range.clone()], &t[range], &mut excluded);
                set
            })
            .collect();

        if let Some(force) = &streams.force {
            let forces = ForceAggregator::stroke_forces(force, strokes);
            for (set, value) in features.iter_mut().zip(forces) {
                set.force = value;
            }
        }

        let voxels = streams.voxels.as_ref().map(|events| {
            let rates = ForceAggregator::removal_rates(events, strokes, &lengths);
            for (set, value) in features.iter_mut().zip(rates) {
                set.removal_rate = value;
            }
            let mut tally = VoxelTally::new();
            tally.check_voxels_removed(events);
            tally
        });

        let contacts = streams
            .force
            .as_ref()
            .map(|force| self.orientation.estimate(poses, force))
            .unwrap_or_default();
        let per_stroke = OrientationEstimator::per_stroke(&contacts, strokes);
        for (set, value) in features.iter_mut().zip(per_stroke) {
            set.orientation = value;
        }

        let spectrum = self
            .spectral
            .as_mut()
            .map(|analyzer| analyzer.profile(&smoothed));

        debug!(
            "Session {}: {} strokes, {} contact samples, {} exclusions",
            streams.name,
            segmentation.stroke_count(),
            contacts.len(),
            excluded.len()
        );

        SessionFeatures {
            session: streams.name.clone(),
            stroke_count: segmentation.stroke_count(),
            strokes: features,
            duration: poses.duration(),
            voxels,
            orientation_residuals: contacts.iter().map(|c| c.residual_deg).collect(),
            spectrum,
            excluded,
        }
    }

    fn fill_geometry(
        set: &mut StrokeFeatureSet,
        raw: &[DVec3],
        smoothed: &[DVec3],
        t: &[f64],
        excluded: &mut Vec<FeatureError>,
    ) {
        let stroke = set.index;
        let mut keep = |result: Result<f64, FeatureError>| match result {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("{}", e);
                if !excluded.contains(&e) {
                    excluded.push(e);
                }
                None
            }
        };

        set.velocity = keep(KinematicDifferentiator::velocity(stroke, raw, t));
        set.acceleration = keep(KinematicDifferentiator::acceleration(stroke, raw, t));
        set.jerk = keep(KinematicDifferentiator::jerk(stroke, smoothed, t));
        set.curvature = keep(CurvatureEstimator::stroke_curvature(stroke, smoothed, t));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::SmoothingConfig;
    use session_data::{ForceSample, PoseStream, VoxelColor, VoxelRemovalEvent};

    fn unsmoothed() -> FeatureConfig {
        FeatureConfig {
            smoothing: SmoothingConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Out and back along x, turning at sample 30, 10 ms apart
    fn reversal_session() -> SessionStreams {
        let positions: Vec<DVec3> = (0..61)
            .map(|i| {
                let x = if i <= 30 { i as f64 } else { (60 - i) as f64 };
                DVec3::new(x * 0.01, 0.0, 0.0)
            })
            .collect();
        let t: Vec<f64> = (0..61).map(|i| i as f64 * 0.01).collect();
        let force = t
            .iter()
            .map(|&ts| ForceSample::new(DVec3::new(0.0, if ts < 0.3 { 2.0 } else { 4.0 }, 0.0), ts))
            .collect();
        let voxels = vec![
            VoxelRemovalEvent {
                position: DVec3::ZERO,
                color: VoxelColor([0.0, 255.0, 0.0, 0.0]),
                timestamp: 0.1,
            },
            VoxelRemovalEvent {
                position: DVec3::ZERO,
                color: VoxelColor([1.0, 1.0, 1.0, 1.0]),
                timestamp: 0.4,
            },
        ];
        SessionStreams {
            name: "reversal".into(),
            poses: PoseStream::from_positions(&positions, t).unwrap(),
            force: Some(force),
            voxels: Some(voxels),
        }
    }

    #[test]
    fn test_extract_reversal_session() {
        let mut extractor = FeatureExtractor::new(&unsmoothed()).unwrap();
        let features = extractor.extract(&reversal_session());

        assert_eq!(features.stroke_count, 1);
        assert_eq!(features.strokes.len(), 2);
        assert!((features.duration - 0.6).abs() < 1e-9);

        let first = &features.strokes[0];
        assert_eq!(first.samples, 30);
        assert!((first.length - 0.29).abs() < 1e-9);
        assert!((first.velocity.unwrap() - 1.0).abs() < 1e-6);
        assert_eq!(first.force, Some(2.0));
        assert_eq!(features.strokes[1].force, Some(4.0));
        assert!(features.strokes[1].end_time.is_none());

        let tally = features.voxels.unwrap();
        assert_eq!(tally.bone, 1);
        assert_eq!(tally.sensitive, 1);
        assert!(features.excluded.is_empty());
        assert!(features.spectrum.is_none());
    }

    #[test]
    fn test_missing_optional_streams() {
        let mut session = reversal_session();
        session.force = None;
        session.voxels = None;
        let mut extractor = FeatureExtractor::new(&unsmoothed()).unwrap();
        let features = extractor.extract(&session);

        assert!(features.voxels.is_none());
        assert!(features.orientation_residuals.is_empty());
        assert!(features.collect(|s| s.force).is_empty());
        assert!(features.collect(|s| s.removal_rate).is_empty());
        assert_eq!(features.collect(|s| s.velocity).len(), 2);
    }

    #[test]
    fn test_single_sample_stroke_is_excluded() {
        let positions = vec![DVec3::ZERO];
        let session = SessionStreams {
            name: "tiny".into(),
            poses: PoseStream::from_positions(&positions, vec![0.0]).unwrap(),
            force: None,
            voxels: Some(Vec::new()),
        };
        let mut extractor = FeatureExtractor::new(&FeatureConfig::default()).unwrap();
        let features = extractor.extract(&session);

        assert_eq!(features.stroke_count, 0);
        assert_eq!(features.strokes.len(), 1);
        assert!(features.strokes[0].velocity.is_none());
        assert!(features.strokes[0].curvature.is_none());
        assert_eq!(features.strokes[0].removal_rate, None);
        assert_eq!(features.voxels, Some(VoxelTally::default()));
        assert_eq!(
            features.excluded,
            vec![FeatureError::DegenerateInterval {
                stroke: 0,
                reason: "fewer than two samples"
            }]
        );
    }

    #[test]
    fn test_repeated_pose_timestamp_keeps_features() {
        let positions: Vec<DVec3> = (0..20).map(|i| DVec3::new(i as f64 * 0.01, 0.0, 0.0)).collect();
        let mut t: Vec<f64> = (0..20).map(|i| i as f64 * 0.01).collect();
        t[10] = t[9];
        let session = SessionStreams {
            name: "repeated".into(),
            poses: PoseStream::from_positions(&positions, t).unwrap(),
            force: None,
            voxels: None,
        };
        let mut extractor = FeatureExtractor::new(&unsmoothed()).unwrap();
        let features = extractor.extract(&session);

        assert_eq!(features.strokes.len(), 1);
        let stroke = &features.strokes[0];
        assert!((stroke.length - 0.19).abs() < 1e-9);
        assert!((stroke.velocity.unwrap() - 1.0).abs() < 1e-9);
        assert!(stroke.acceleration.is_some());
        assert!(stroke.jerk.is_some());
        assert!(stroke.curvature.is_some());
        assert!(features.excluded.is_empty());
    }

    #[test]
    fn test_spectral_profile_attached_when_enabled() {
        let mut config = unsmoothed();
        config.spectral.enabled = true;
        let mut extractor = FeatureExtractor::new(&config).unwrap();
        let features = extractor.extract(&reversal_session());
        let spectrum = features.spectrum.unwrap();
        assert!(spectrum.x.total_power > 0.0);
        assert_eq!(spectrum.y.total_power, 0.0);
    }
}
