//! Feature Engine
//!
//! Segments a tool trajectory into strokes at sharp direction changes and
//! derives per-stroke kinematic, geometric, force and orientation features.

mod config;
mod curvature;
mod error;
mod features;
mod fft;
mod filter;
mod force;
mod kinematics;
pub mod numerics;
mod orientation;
mod segmentation;

pub use config::FeatureConfig;
pub use curvature::CurvatureEstimator;
pub use error::FeatureError;
pub use features::{FeatureExtractor, SessionFeatures, StrokeFeatureSet};
pub use fft::{ChannelSpectrum, FrequencyBands, SpectralAnalyzer, SpectralConfig, SpectralProfile};
pub use filter::{BandPassFilter, SmoothingConfig};
pub use force::{ForceAggregator, TissueKind, VoxelTally};
pub use kinematics::KinematicDifferentiator;
pub use orientation::{ContactSample, OrientationConfig, OrientationEstimator};
pub use segmentation::{RunMerger, RunState, Segmentation, SegmentationConfig, StrokeSegmenter};
