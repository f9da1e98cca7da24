//! Metrics Error Types

use thiserror::Error;

/// Errors while summarising aggregates
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Batch statistic requested on an aggregate that holds no values
    #[error("No values recorded for {feature}")]
    EmptyAggregate { feature: &'static str },

    /// Report could not be serialised
    #[error("Failed to render report: {0}")]
    Render(#[from] serde_json::Error),
}
