//! Recorded Session Schema and Resolution
//!
//! A recording is a set of named groups, each holding named datasets. The
//! schema resolves the groups once per session into canonical streams: the
//! pose stream is mandatory, force and voxel groups are optional and their
//! absence only disables the features that depend on them.

use std::collections::BTreeMap;

use glam::DVec3;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::types::{
    ForceSample, PoseSample, PoseStream, SessionStreams, VoxelColor, VoxelRemovalEvent,
};
use crate::validator::Validator;

/// One dataset inside a recording group
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Dataset {
    /// One scalar per entry (timestamps)
    Scalars(Vec<f64>),
    /// One row per entry (poses, wrenches, positions, colors)
    Rows(Vec<Vec<f64>>),
    /// Anything else (metadata strings, attributes); never read
    Unsupported(IgnoredAny),
}

impl Dataset {
    pub fn len(&self) -> usize {
        match self {
            Dataset::Scalars(v) => v.len(),
            Dataset::Rows(v) => v.len(),
            Dataset::Unsupported(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn scalars(&self, name: &str) -> Result<Vec<f64>, SessionError> {
        match self {
            Dataset::Scalars(v) => Ok(v.clone()),
            // Single-column rows are accepted as scalars
            Dataset::Rows(rows) if rows.iter().all(|r| r.len() == 1) => {
                Ok(rows.iter().map(|r| r[0]).collect())
            }
            _ => Err(SessionError::InvalidFormat(format!(
                "{} must be a list of scalars",
                name
            ))),
        }
    }

    fn rows(&self, name: &str) -> Result<&[Vec<f64>], SessionError> {
        match self {
            Dataset::Rows(rows) => Ok(rows),
            Dataset::Scalars(v) if v.is_empty() => Ok(&[]),
            _ => Err(SessionError::InvalidFormat(format!(
                "{} must be a list of rows",
                name
            ))),
        }
    }
}

/// Datasets of one group, keyed by dataset name
pub type RecordingGroup = BTreeMap<String, Dataset>;

/// Raw recording of one session as handed over by the loader
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionRecording {
    /// Optional display name; the caller's name wins when both exist
    #[serde(default)]
    pub name: Option<String>,
    /// Groups keyed by name
    #[serde(flatten)]
    pub groups: BTreeMap<String, RecordingGroup>,
}

impl SessionRecording {
    /// Empty recording
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used by tests and synthetic producers
    pub fn with_dataset(mut self, group: &str, dataset: &str, data: Dataset) -> Self {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(dataset.to_string(), data);
        self
    }

    pub fn group(&self, name: &str) -> Option<&RecordingGroup> {
        self.groups.get(name)
    }
}

/// Names and unit conventions used to locate streams inside a recording
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSchema {
    /// Tool whose pose is analysed (`pose_<tool_name>` in the data group)
    pub tool_name: String,
    /// Group holding time and pose datasets
    pub data_group: String,
    /// Candidate force group names, in priority order
    pub force_groups: Vec<String>,
    /// Group holding voxel removal events
    pub voxel_group: String,
    /// Candidate voxel timestamp dataset names, in priority order
    pub voxel_time_keys: Vec<String>,
    /// Multiplier bringing force timestamps into the pose time unit
    pub force_time_scale: f64,
}

impl Default for StreamSchema {
    fn default() -> Self {
        Self {
            tool_name: "mastoidectomy_drill".to_string(),
            data_group: "data".to_string(),
            force_groups: vec!["force".to_string(), "drill_force_feedback".to_string()],
            voxel_group: "voxels_removed".to_string(),
            voxel_time_keys: vec!["voxel_time_stamp".to_string(), "time_stamp".to_string()],
            force_time_scale: 1.0,
        }
    }
}

/// Session streams plus the optional streams that could not be resolved
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    /// Streams that resolved
    pub streams: SessionStreams,
    /// Stream label (`"force"` or `"voxels"`) with the reason it is missing
    pub unavailable: Vec<(&'static str, SessionError)>,
}

impl StreamSchema {
    /// Resolve a recording into canonical streams.
    ///
    /// Fails only when the pose stream itself is unusable.
    pub fn resolve(
        &self,
        name: &str,
        recording: &SessionRecording,
    ) -> Result<ResolvedSession, SessionError> {
        let poses = self.resolve_poses(recording)?;
        let mut unavailable = Vec::new();

        let force = match self.resolve_force(recording) {
            Ok(samples) => Some(samples),
            Err(e) => {
                warn!("Session {}: force stream unavailable: {}", name, e);
                unavailable.push(("force", e));
                None
            }
        };

        let voxels = match self.resolve_voxels(recording) {
            Ok(events) => Some(events),
            Err(e) => {
                warn!("Session {}: voxel stream unavailable: {}", name, e);
                unavailable.push(("voxels", e));
                None
            }
        };

        debug!(
            "Resolved session {}: poses={}, force={:?}, voxels={:?}",
            name,
            poses.len(),
            force.as_ref().map(Vec::len),
            voxels.as_ref().map(Vec::len)
        );

        Ok(ResolvedSession {
            streams: SessionStreams {
                name: name.to_string(),
                poses,
                force,
                voxels,
            },
            unavailable,
        })
    }

    fn pose_key(&self) -> String {
        format!("pose_{}", self.tool_name)
    }

    fn resolve_poses(&self, recording: &SessionRecording) -> Result<PoseStream, SessionError> {
        let data = recording
            .group(&self.data_group)
            .ok_or_else(|| SessionError::missing(&self.data_group, "time"))?;

        let times = data
            .get("time")
            .filter(|d| !d.is_empty())
            .ok_or_else(|| SessionError::missing(&self.data_group, "time"))?
            .scalars("time")?;

        let wanted = self.pose_key();
        let (key, dataset) = match data.get_key_value(&wanted) {
            Some(found) => found,
            None => {
                // Fall back to the only pose dataset when the tool name differs
                let mut poses = data.iter().filter(|(k, _)| k.starts_with("pose_"));
                match (poses.next(), poses.next()) {
                    (Some(only), None) => {
                        debug!("Pose dataset {} not found, using {}", wanted, only.0);
                        only
                    }
                    _ => return Err(SessionError::missing(&self.data_group, &wanted)),
                }
            }
        };

        let rows = dataset.rows(key)?;
        Validator::check_rows(key, rows, PoseSample::ROW_WIDTH)?;
        let samples: Vec<PoseSample> = rows.iter().filter_map(|r| PoseSample::from_row(r)).collect();

        PoseStream::new(samples, times)
    }

    fn resolve_force(&self, recording: &SessionRecording) -> Result<Vec<ForceSample>, SessionError> {
        let fallback = self.force_groups.first().map(String::as_str).unwrap_or("force");
        let (group_name, group) = self
            .force_groups
            .iter()
            .find_map(|g| recording.group(g).map(|grp| (g.as_str(), grp)))
            .ok_or_else(|| SessionError::missing(fallback, "wrench"))?;

        let wrench = group
            .get("wrench")
            .filter(|d| !d.is_empty())
            .ok_or_else(|| SessionError::missing(group_name, "wrench"))?
            .rows("wrench")?;
        let times = group
            .get("time_stamp")
            .filter(|d| !d.is_empty())
            .ok_or_else(|| SessionError::missing(group_name, "time_stamp"))?
            .scalars("time_stamp")?;

        Validator::check_rows("wrench", wrench, 3)?;
        Validator::check_paired("wrench", wrench.len(), times.len())?;

        let mut samples: Vec<ForceSample> = wrench
            .iter()
            .zip(times)
            .map(|(w, t)| ForceSample::new(DVec3::new(w[0], w[1], w[2]), t * self.force_time_scale))
            .collect();
        samples.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Ok(samples)
    }

    fn resolve_voxels(
        &self,
        recording: &SessionRecording,
    ) -> Result<Vec<VoxelRemovalEvent>, SessionError> {
        let group = recording
            .group(&self.voxel_group)
            .ok_or_else(|| SessionError::missing(&self.voxel_group, "voxel_removed"))?;

        // Empty datasets are dropped by the recorder: nothing was removed
        let positions = match group.get("voxel_removed").filter(|d| !d.is_empty()) {
            Some(d) => d.rows("voxel_removed")?,
            None => return Ok(Vec::new()),
        };
        let colors = group
            .get("voxel_color")
            .ok_or_else(|| SessionError::missing(&self.voxel_group, "voxel_color"))?
            .rows("voxel_color")?;
        let fallback = self
            .voxel_time_keys
            .first()
            .map(String::as_str)
            .unwrap_or("voxel_time_stamp");
        let times = self
            .voxel_time_keys
            .iter()
            .find_map(|k| group.get(k))
            .ok_or_else(|| SessionError::missing(&self.voxel_group, fallback))?
            .scalars(fallback)?;

        Validator::check_rows("voxel_removed", positions, 3)?;
        Validator::check_rows("voxel_color", colors, 4)?;
        Validator::check_paired("voxel_color", colors.len(), positions.len())?;
        Validator::check_paired("voxel_removed", positions.len(), times.len())?;

        let mut events: Vec<VoxelRemovalEvent> = positions
            .iter()
            .zip(colors)
            .zip(times)
            .filter_map(|((p, c), t)| {
                // Four-column rows carry a leading index before x, y, z
                let xyz = if p.len() >= 4 { &p[1..4] } else { &p[0..3] };
                Some(VoxelRemovalEvent {
                    position: DVec3::new(xyz[0], xyz[1], xyz[2]),
                    color: VoxelColor::from_row(c)?,
                    timestamp: t,
                })
            })
            .collect();
        events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Ok(events)
    }
}
