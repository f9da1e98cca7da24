//! Feature Validation - Main Entry Point
//!
//! Configuration comes from the file named by `FEATVAL_CONFIG` (optional)
//! and `FEATVAL__*` environment overrides.

use std::path::PathBuf;

use pipeline::{init_logging, PipelineConfig, SessionSource, ValidationRun};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var("FEATVAL_CONFIG").ok();
    let config = PipelineConfig::load(config_path.as_deref())?;
    init_logging(&config.log_level)?;

    info!("=== Feature Validation v{} ===", env!("CARGO_PKG_VERSION"));
    if config.sessions.is_empty() {
        warn!("No sessions configured; the report will be empty");
    }

    let run = ValidationRun::from_config(&config)?;
    let sources = config
        .sessions
        .iter()
        .map(|path| SessionSource::Path(PathBuf::from(path)))
        .collect();

    let metrics = run.run(sources).await;
    println!("{}", metrics.report().render(config.report_format)?);

    Ok(())
}
