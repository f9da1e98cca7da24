//! Session Data
//!
//! Data model for recorded drilling sessions: tool poses, force feedback and
//! voxel-removal events, schema resolution from raw recordings, validation,
//! and time alignment between independently sampled streams.

mod align;
mod error;
mod recording;
mod types;
mod validator;

pub use align::StreamAligner;
pub use error::SessionError;
pub use recording::{Dataset, RecordingGroup, ResolvedSession, SessionRecording, StreamSchema};
pub use types::{
    ForceSample, PoseSample, PoseStream, SessionStreams, Stroke, Timestamped, VoxelColor,
    VoxelRemovalEvent,
};
pub use validator::Validator;

pub use glam::{DQuat, DVec3};
