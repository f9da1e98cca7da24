//! Session Error Types

use thiserror::Error;

/// Errors raised while resolving or validating a recorded session
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// A group or dataset required by a feature is absent
    #[error("Missing stream: {group}/{dataset}")]
    MissingStream {
        group: String,
        dataset: String,
    },

    /// Pose and timestamp arrays differ in length
    #[error("Length mismatch: {poses} pose samples vs {timestamps} timestamps")]
    LengthMismatch { poses: usize, timestamps: usize },

    /// Pose timestamps go backwards
    #[error("Timestamps decrease at index {index}")]
    NonMonotonicTimestamps { index: usize },

    /// A row does not have the expected number of columns
    #[error("Malformed row {index} in {dataset}: expected at least {expected} columns, got {actual}")]
    MalformedRow {
        dataset: String,
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// Dataset has the wrong shape (scalars where rows are expected or vice versa)
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Pose stream has no samples
    #[error("Pose stream is empty")]
    EmptyStream,
}

impl SessionError {
    /// Shorthand for a missing `group/dataset` pair
    pub fn missing(group: &str, dataset: &str) -> Self {
        SessionError::MissingStream {
            group: group.to_string(),
            dataset: dataset.to_string(),
        }
    }

    /// Whether the condition only disables a dependent feature
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SessionError::MissingStream { .. })
    }
}
