//! Pipeline Settings
//!
//! An optional file (TOML, JSON or YAML, picked by extension) overlaid with
//! `FEATVAL__`-prefixed environment variables. Nested keys use `__` as the
//! separator, e.g. `FEATVAL__FEATURES__SEGMENTATION__WINDOW=8`.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use evaluation_metrics::ReportFormat;
use feature_engine::FeatureConfig;
use serde::{Deserialize, Serialize};
use session_data::StreamSchema;
use tracing::debug;

use crate::error::PipelineError;

/// Settings of a validation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Recording files to process
    pub sessions: Vec<String>,
    /// Sessions processed concurrently
    pub max_parallel_sessions: usize,
    /// Per-session time limit
    pub session_timeout_secs: u64,
    /// Maximum tracing level
    pub log_level: String,
    /// Output format of the final report
    pub report_format: ReportFormat,
    /// Estimator settings
    pub features: FeatureConfig,
    /// Dataset names to look up in each recording
    pub schema: StreamSchema,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sessions: Vec::new(),
            max_parallel_sessions: 4,
            session_timeout_secs: 120,
            log_level: "info".to_string(),
            report_format: ReportFormat::Text,
            features: FeatureConfig::default(),
            schema: StreamSchema::default(),
        }
    }
}

impl PipelineConfig {
    /// Prefix of environment overrides, e.g. `FEATVAL_MAX_PARALLEL_SESSIONS`
    pub const ENV_PREFIX: &'static str = "FEATVAL";

    /// Load from an optional file plus the environment
    pub fn load(path: Option<&str>) -> Result<Self, PipelineError> {
        Self::load_with_prefix(path, Self::ENV_PREFIX)
    }

    fn load_with_prefix(path: Option<&str>, prefix: &str) -> Result<Self, PipelineError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        let config: PipelineConfig = builder
            .add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("sessions"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        debug!(
            "Loaded configuration: {} sessions, parallel={}, timeout={}s",
            config.sessions.len(),
            config.max_parallel_sessions,
            config.session_timeout_secs
        );
        Ok(config)
    }

    /// Reject settings that cannot drive a run
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_parallel_sessions == 0 {
            return Err(ConfigError::Message("max_parallel_sessions must be at least 1".into()).into());
        }
        if self.session_timeout_secs == 0 {
            return Err(ConfigError::Message("session_timeout_secs must be at least 1".into()).into());
        }
        Ok(())
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}
