//! Feature Extraction Error Types

use session_data::SessionError;
use thiserror::Error;

/// Errors during feature extraction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// Stroke cannot support the requested feature (too short, zero span, zero length)
    #[error("Stroke {stroke} is degenerate: {reason}")]
    DegenerateInterval { stroke: usize, reason: &'static str },

    /// A tunable is out of its valid range
    #[error("Invalid feature configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl FeatureError {
    pub(crate) fn degenerate(stroke: usize, reason: &'static str) -> Self {
        FeatureError::DegenerateInterval { stroke, reason }
    }
}
