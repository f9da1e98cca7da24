//! Feature extraction tunables

use serde::{Deserialize, Serialize};

use crate::fft::SpectralConfig;
use crate::filter::SmoothingConfig;
use crate::orientation::OrientationConfig;
use crate::segmentation::SegmentationConfig;

/// Settings of every per-session estimator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Pivot detection
    pub segmentation: SegmentationConfig,
    /// Band-pass smoothing ahead of jerk and curvature
    pub smoothing: SmoothingConfig,
    /// Optional spectral inspection
    pub spectral: SpectralConfig,
    /// Contact detection and tool axis
    pub orientation: OrientationConfig,
}
