//! Single-Session Processing

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use evaluation_metrics::SkippedEntry;
use feature_engine::{FeatureConfig, FeatureExtractor, SessionFeatures};
use session_data::{SessionRecording, StreamSchema};
use tracing::{debug, info};

use crate::error::PipelineError;

/// Where a session's recording comes from
#[derive(Debug, Clone)]
pub enum SessionSource {
    /// JSON export of a recording
    Path(PathBuf),
    /// Recording already in memory
    Recording {
        name: String,
        recording: SessionRecording,
    },
}

impl SessionSource {
    /// Name used in logs and the ledger before the recording is read
    pub fn label(&self) -> String {
        match self {
            SessionSource::Path(path) => path.display().to_string(),
            SessionSource::Recording { name, .. } => name.clone(),
        }
    }
}

/// Read a JSON recording from disk
pub fn load_recording(path: &Path) -> Result<SessionRecording, PipelineError> {
    let file = File::open(path).map_err(|source| PipelineError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| PipelineError::Decode {
        path: path.display().to_string(),
        source,
    })
}

/// Features of one session plus the features it could not provide
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Extracted features
    pub features: SessionFeatures,
    /// Streams the session could not provide
    pub skipped: Vec<SkippedEntry>,
}

/// Resolves and extracts one session at a time
#[derive(Debug, Clone)]
pub struct SessionProcessor {
    schema: StreamSchema,
    features: FeatureConfig,
}

impl SessionProcessor {
    /// Fails early when the feature configuration is unusable
    pub fn new(schema: StreamSchema, features: FeatureConfig) -> Result<Self, PipelineError> {
        FeatureExtractor::new(&features)?;
        Ok(Self { schema, features })
    }

    /// Load if needed, then process
    pub fn process_source(&self, source: &SessionSource) -> Result<SessionOutcome, PipelineError> {
        match source {
            SessionSource::Path(path) => {
                let recording = load_recording(path)?;
                let name = recording.name.clone().unwrap_or_else(|| {
                    path.file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string())
                });
                self.process(&name, &recording)
            }
            SessionSource::Recording { name, recording } => self.process(name, recording),
        }
    }

    /// Resolve the recording's streams and extract features
    pub fn process(&self, name: &str, recording: &SessionRecording) -> Result<SessionOutcome, PipelineError> {
        let resolved = self.schema.resolve(name, recording)?;
        let skipped = resolved
            .unavailable
            .iter()
            .map(|(stream, e)| SkippedEntry {
                session: name.to_string(),
                feature: Some(stream.to_string()),
                reason: e.to_string(),
            })
            .collect();

        let mut extractor = FeatureExtractor::new(&self.features)?;
        let features = extractor.extract(&resolved.streams);
        debug!(
            "Session {} produced {} stroke feature sets",
            name,
            features.strokes.len()
        );
        info!(
            "Processed session {}: {} strokes over {:.2}",
            name, features.stroke_count, features.duration
        );

        Ok(SessionOutcome { features, skipped })
    }
}
