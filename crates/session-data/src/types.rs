//! Session Data Model

use glam::{DQuat, DVec3};

use crate::error::SessionError;
use crate::validator::Validator;

/// Anything carrying a timestamp in the session's time unit
pub trait Timestamped {
    fn timestamp(&self) -> f64;
}

impl Timestamped for f64 {
    fn timestamp(&self) -> f64 {
        *self
    }
}

/// Tool pose at one instant: position plus unit orientation quaternion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    /// Tool tip position
    pub position: DVec3,
    /// Tool orientation
    pub orientation: DQuat,
}

impl PoseSample {
    /// Columns in a recorded pose row: `[x, y, z, qx, qy, qz, qw]`
    pub const ROW_WIDTH: usize = 7;

    pub fn new(position: DVec3, orientation: DQuat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Build from a recorded row (quaternion is scalar-last)
    pub fn from_row(row: &[f64]) -> Option<Self> {
        if row.len() < Self::ROW_WIDTH {
            return None;
        }
        Some(Self {
            position: DVec3::new(row[0], row[1], row[2]),
            orientation: DQuat::from_xyzw(row[3], row[4], row[5], row[6]),
        })
    }

    /// Position-only sample with identity orientation
    pub fn at(position: DVec3) -> Self {
        Self::new(position, DQuat::IDENTITY)
    }
}

/// Ordered pose samples paired 1:1 with non-decreasing timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct PoseStream {
    samples: Vec<PoseSample>,
    timestamps: Vec<f64>,
}

impl PoseStream {
    /// Pair samples with timestamps, rejecting mismatched or unordered input
    pub fn new(samples: Vec<PoseSample>, timestamps: Vec<f64>) -> Result<Self, SessionError> {
        Validator::check_lengths(samples.len(), timestamps.len())?;
        if samples.is_empty() {
            return Err(SessionError::EmptyStream);
        }
        Validator::check_monotonic(&timestamps)?;
        Ok(Self {
            samples,
            timestamps,
        })
    }

    /// Convenience constructor for position-only traces
    pub fn from_positions(positions: &[DVec3], timestamps: Vec<f64>) -> Result<Self, SessionError> {
        let samples = positions.iter().copied().map(PoseSample::at).collect();
        Self::new(samples, timestamps)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[PoseSample] {
        &self.samples
    }

    /// Timestamps paired 1:1 with the samples
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    /// Positions in stream order
    pub fn positions(&self) -> Vec<DVec3> {
        self.samples.iter().map(|s| s.position).collect()
    }

    /// Time between the first and last sample
    pub fn duration(&self) -> f64 {
        match (self.timestamps.first(), self.timestamps.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}

/// Force feedback sample (force components of the wrench)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceSample {
    /// Force components
    pub wrench: DVec3,
    /// Sample time
    pub timestamp: f64,
}

impl ForceSample {
    pub fn new(wrench: DVec3, timestamp: f64) -> Self {
        Self { wrench, timestamp }
    }

    /// Euclidean norm of the force vector
    pub fn magnitude(&self) -> f64 {
        self.wrench.length()
    }
}

impl Timestamped for ForceSample {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

/// Four-channel color recorded with each removed voxel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelColor(pub [f64; 4]);

impl VoxelColor {
    /// Channel value, 0 when out of range
    pub fn channel(&self, index: usize) -> f64 {
        self.0.get(index).copied().unwrap_or(0.0)
    }

    /// RGBA from a 4-column row
    pub fn from_row(row: &[f64]) -> Option<Self> {
        if row.len() < 4 {
            return None;
        }
        Some(Self([row[0], row[1], row[2], row[3]]))
    }
}

/// One material-removal event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelRemovalEvent {
    /// Where the voxel was removed
    pub position: DVec3,
    /// Tissue color
    pub color: VoxelColor,
    /// Removal time
    pub timestamp: f64,
}

impl Timestamped for VoxelRemovalEvent {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

/// Contiguous span of the pose stream between two pivots.
///
/// Indices are half-open `[start_idx, end_idx)`; times are `[start_time, end_time)`
/// where the final stroke of a session is open-ended (`end_time` is infinite).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    /// Position in the session
    pub index: usize,
    /// First pose index
    pub start_idx: usize,
    /// One past the last pose index
    pub end_idx: usize,
    /// Time of the first pose
    pub start_time: f64,
    /// Start of the next stroke, infinite for the last
    pub end_time: f64,
}

impl Stroke {
    /// Number of pose samples in the stroke
    pub fn len(&self) -> usize {
        self.end_idx - self.start_idx
    }

    pub fn is_empty(&self) -> bool {
        self.end_idx <= self.start_idx
    }

    /// Whether this stroke runs to the end of the stream
    pub fn is_final(&self) -> bool {
        self.end_time.is_infinite()
    }

    /// Whether a pose index lies inside the stroke
    pub fn contains_index(&self, idx: usize) -> bool {
        idx >= self.start_idx && idx < self.end_idx
    }
}

/// All streams of one recorded session after schema resolution
#[derive(Debug, Clone)]
pub struct SessionStreams {
    /// Session name
    pub name: String,
    /// Validated pose stream
    pub poses: PoseStream,
    /// `None` when no force group was recorded
    pub force: Option<Vec<ForceSample>>,
    /// `None` when no voxel group was recorded; `Some(vec![])` means nothing was removed
    pub voxels: Option<Vec<VoxelRemovalEvent>>,
}
