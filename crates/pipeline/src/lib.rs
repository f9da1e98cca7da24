//! Feature Validation Pipeline
//!
//! Loads recorded sessions, extracts stroke features from each in parallel and
//! merges them into one evaluation report.

mod error;
mod runner;
mod session;
mod settings;

pub use error::PipelineError;
pub use runner::ValidationRun;
pub use session::{load_recording, SessionOutcome, SessionProcessor, SessionSource};
pub use settings::PipelineConfig;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Install the global fmt subscriber at the given level
pub fn init_logging(level: &str) -> Result<(), PipelineError> {
    let level: Level = level
        .parse()
        .map_err(|_| PipelineError::Logging(format!("unknown log level '{}'", level)))?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| PipelineError::Logging(e.to_string()))
}
