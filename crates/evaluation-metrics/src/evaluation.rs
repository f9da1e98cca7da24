//! Cross-Session Metrics Aggregation

use feature_engine::{SessionFeatures, StrokeFeatureSet, VoxelTally};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::report::Report;
use crate::stat::Stat;

/// Running statistics of the per-stroke kinematic measures
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicMetrics {
    /// Average stroke speed
    pub velocity: Stat,
    /// Velocity-change rate
    pub acceleration: Stat,
    /// Acceleration-change rate on smoothed positions
    pub jerk: Stat,
}

impl Default for KinematicMetrics {
    fn default() -> Self {
        Self {
            velocity: Stat::new("velocity"),
            acceleration: Stat::new("acceleration"),
            jerk: Stat::new("jerk"),
        }
    }
}

/// Stroke-level aggregates
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeMetrics {
    /// Detected pivots across all sessions
    pub count: usize,
    /// Path length of every stroke
    pub length: Stat,
    /// Time-averaged curvature
    pub curvature: Stat,
    /// Mean force magnitude during the stroke
    pub force: Stat,
}

impl Default for StrokeMetrics {
    fn default() -> Self {
        Self {
            count: 0,
            length: Stat::new("stroke length"),
            curvature: Stat::new("curvature"),
            force: Stat::new("force"),
        }
    }
}

/// A session or feature that contributed nothing, and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedEntry {
    /// Session the entry belongs to
    pub session: String,
    /// `None` when the whole session was skipped
    pub feature: Option<String>,
    /// Human-readable cause
    pub reason: String,
}

/// Aggregate over every processed session
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationMetrics {
    /// Velocity, acceleration and jerk
    pub kinematics: KinematicMetrics,
    /// Stroke count and geometry
    pub strokes: StrokeMetrics,
    /// Removal events per unit stroke length
    pub removal_rate: Stat,
    /// Residual of every contact sample in degrees
    pub orientation: Stat,
    /// Removed voxels by tissue kind
    pub voxels: VoxelTally,
    /// Sum of session durations
    pub duration: f64,
    /// Sessions that contributed features
    pub sessions_processed: usize,
    /// Sessions and features left out of the aggregate
    pub skipped: Vec<SkippedEntry>,
}

impl Default for EvaluationMetrics {
    fn default() -> Self {
        Self {
            kinematics: KinematicMetrics::default(),
            strokes: StrokeMetrics::default(),
            removal_rate: Stat::new("removal rate"),
            orientation: Stat::new("orientation"),
            voxels: VoxelTally::default(),
            duration: 0.0,
            sessions_processed: 0,
            skipped: Vec::new(),
        }
    }
}

impl EvaluationMetrics {
    /// Empty aggregate with named statistics
    pub fn new() -> Self {
        Self::default()
    }

    fn feed(stat: &mut Stat, strokes: &[StrokeFeatureSet], feature: fn(&StrokeFeatureSet) -> Option<f64>) {
        stat.extend(strokes.iter().filter_map(feature));
    }

    /// Add one session's features
    pub fn add_session(&mut self, features: &SessionFeatures) {
        let strokes = &features.strokes;
        Self::feed(&mut self.kinematics.velocity, strokes, |s| s.velocity);
        Self::feed(&mut self.kinematics.acceleration, strokes, |s| s.acceleration);
        Self::feed(&mut self.kinematics.jerk, strokes, |s| s.jerk);
        Self::feed(&mut self.strokes.length, strokes, |s| Some(s.length));
        Self::feed(&mut self.strokes.curvature, strokes, |s| s.curvature);
        Self::feed(&mut self.strokes.force, strokes, |s| s.force);
        Self::feed(&mut self.removal_rate, strokes, |s| s.removal_rate);
        self.orientation.extend(features.orientation_residuals.iter().copied());

        self.strokes.count += features.stroke_count;
        if let Some(tally) = &features.voxels {
            self.voxels.merge(tally);
        }
        self.duration += features.duration;
        self.sessions_processed += 1;

        for excluded in &features.excluded {
            self.record_skip(&features.session, Some("stroke geometry"), excluded.to_string());
        }

        debug!(
            "Merged session {}: {} strokes, running total {}",
            features.session, features.stroke_count, self.strokes.count
        );
    }

    /// Record a session or feature that could not contribute
    pub fn record_skip(&mut self, session: &str, feature: Option<&str>, reason: impl Into<String>) {
        self.skipped.push(SkippedEntry {
            session: session.to_string(),
            feature: feature.map(str::to_string),
            reason: reason.into(),
        });
    }

    /// Fold another aggregate into this one
    pub fn merge(&mut self, other: &EvaluationMetrics) {
        self.kinematics.velocity.merge(&other.kinematics.velocity);
        self.kinematics.acceleration.merge(&other.kinematics.acceleration);
        self.kinematics.jerk.merge(&other.kinematics.jerk);
        self.strokes.count += other.strokes.count;
        self.strokes.length.merge(&other.strokes.length);
        self.strokes.curvature.merge(&other.strokes.curvature);
        self.strokes.force.merge(&other.strokes.force);
        self.removal_rate.merge(&other.removal_rate);
        self.orientation.merge(&other.orientation);
        self.voxels.merge(&other.voxels);
        self.duration += other.duration;
        self.sessions_processed += other.sessions_processed;
        self.skipped.extend(other.skipped.iter().cloned());
    }

    /// Snapshot for reporting
    pub fn report(&self) -> Report {
        Report {
            sessions_processed: self.sessions_processed,
            stroke_count: self.strokes.count,
            length: self.strokes.length.summary(),
            curvature: self.strokes.curvature.summary(),
            force: self.strokes.force.summary(),
            removal_rate: self.removal_rate.summary(),
            velocity: self.kinematics.velocity.summary(),
            acceleration: self.kinematics.acceleration.summary(),
            jerk: self.kinematics.jerk.summary(),
            orientation: self.orientation.summary(),
            bone_voxels: self.voxels.bone,
            sensitive_voxels: self.voxels.sensitive,
            duration: self.duration,
            skipped: self.skipped.clone(),
        }
    }
}
