//! Contact Force and Material Removal
//!
//! Force and voxel-removal events are bucketed into strokes by half-open time
//! interval. A stroke without samples contributes nothing to the aggregate.

use glam::DVec3;
use serde::Serialize;
use session_data::{ForceSample, StreamAligner, Stroke, VoxelColor, VoxelRemovalEvent};
use tracing::debug;

use crate::numerics::path_length;

/// Tissue type encoded in a removed voxel's color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TissueKind {
    Bone,
    Sensitive,
}

impl TissueKind {
    /// Bone when channel 1 is 255, channel 2 is 249 or channel 3 is 219
    pub fn classify(color: &VoxelColor) -> Self {
        if color.channel(1) == 255.0 || color.channel(2) == 249.0 || color.channel(3) == 219.0 {
            TissueKind::Bone
        } else {
            TissueKind::Sensitive
        }
    }
}

/// Running bone / sensitive-tissue voxel counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoxelTally {
    /// Voxels classified as bone
    pub bone: u64,
    /// Voxels classified as sensitive tissue
    pub sensitive: u64,
}

impl VoxelTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a batch of removals; returns how many were sensitive tissue
    pub fn check_voxels_removed(&mut self, events: &[VoxelRemovalEvent]) -> u64 {
        let mut sensitive = 0;
        for event in events {
            match TissueKind::classify(&event.color) {
                TissueKind::Bone => self.bone += 1,
                TissueKind::Sensitive => sensitive += 1,
            }
        }
        self.sensitive += sensitive;
        sensitive
    }

    /// Add another tally's counts
    pub fn merge(&mut self, other: &VoxelTally) {
        self.bone += other.bone;
        self.sensitive += other.sensitive;
    }

    pub fn total(&self) -> u64 {
        self.bone + self.sensitive
    }
}

/// Per-stroke force and removal statistics
pub struct ForceAggregator;

impl ForceAggregator {
    /// Mean wrench magnitude of the samples inside each stroke
    pub fn stroke_forces(force: &[ForceSample], strokes: &[Stroke]) -> Vec<Option<f64>> {
        StreamAligner::per_stroke(force, strokes)
            .into_iter()
            .map(|samples| {
                if samples.is_empty() {
                    return None;
                }
                let total: f64 = samples.iter().map(ForceSample::magnitude).sum();
                Some(total / samples.len() as f64)
            })
            .collect()
    }

    /// Path length of every stroke
    pub fn stroke_lengths(positions: &[DVec3], strokes: &[Stroke]) -> Vec<f64> {
        strokes
            .iter()
            .map(|s| {
                let end = s.end_idx.min(positions.len());
                let start = s.start_idx.min(end);
                path_length(&positions[start..end])
            })
            .collect()
    }

    /// Removal events per unit path length inside each stroke.
    ///
    /// A stroke that did not move has no defined rate.
    pub fn removal_rates(
        voxels: &[VoxelRemovalEvent],
        strokes: &[Stroke],
        lengths: &[f64],
    ) -> Vec<Option<f64>> {
        StreamAligner::per_stroke(voxels, strokes)
            .into_iter()
            .zip(lengths)
            .enumerate()
            .map(|(i, (events, &length))| {
                if length > 0.0 {
                    Some(events.len() as f64 / length)
                } else {
                    debug!("Stroke {} has zero path length; removal rate undefined", i);
                    None
                }
            })
            .collect()
    }
}
