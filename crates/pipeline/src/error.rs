//! Pipeline Error Types

use evaluation_metrics::MetricsError;
use feature_engine::FeatureError;
use session_data::SessionError;
use thiserror::Error;

/// Errors surfaced by a validation run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Session {session} timed out after {secs}s")]
    Timeout { session: String, secs: u64 },

    #[error("Worker task failed: {0}")]
    Join(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}
