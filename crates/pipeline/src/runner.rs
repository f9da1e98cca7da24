//! Parallel Validation Run
//!
//! Each session is processed on a blocking worker, bounded by a semaphore and
//! wrapped in a timeout. Results flow over a channel to a single consumer,
//! which is the only place the aggregate is mutated.

use std::sync::Arc;
use std::time::Duration;

use evaluation_metrics::EvaluationMetrics;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::session::{SessionOutcome, SessionProcessor, SessionSource};
use crate::settings::PipelineConfig;

type SessionResult = (String, Result<SessionOutcome, PipelineError>);

/// Bounded parallel processing of many sessions into one aggregate
pub struct ValidationRun {
    processor: Arc<SessionProcessor>,
    max_parallel: usize,
    session_timeout: Duration,
}

impl ValidationRun {
    /// `max_parallel` is raised to at least one
    pub fn new(processor: SessionProcessor, max_parallel: usize, session_timeout: Duration) -> Self {
        Self {
            processor: Arc::new(processor),
            max_parallel: max_parallel.max(1),
            session_timeout,
        }
    }

    /// Validate the configuration and build the run it describes
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let processor = SessionProcessor::new(config.schema.clone(), config.features.clone())?;
        Ok(Self::new(
            processor,
            config.max_parallel_sessions,
            config.session_timeout(),
        ))
    }

    /// Process every session and merge the outcomes
    pub async fn run(&self, sources: Vec<SessionSource>) -> EvaluationMetrics {
        let processor = self.processor.clone();
        self.run_with(sources, move |source| processor.process_source(source))
            .await
    }

    /// Run with a custom per-session job
    pub async fn run_with<F>(&self, sources: Vec<SessionSource>, job: F) -> EvaluationMetrics
    where
        F: Fn(&SessionSource) -> Result<SessionOutcome, PipelineError> + Send + Sync + 'static,
    {
        info!(
            "Starting validation run: {} sessions, parallel={}, timeout={}s",
            sources.len(),
            self.max_parallel,
            self.session_timeout.as_secs()
        );

        let job = Arc::new(job);
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let (tx, mut rx) = mpsc::channel::<SessionResult>(self.max_parallel * 2);

        for source in sources {
            let job = job.clone();
            let semaphore = semaphore.clone();
            let tx = tx.clone();
            let limit = self.session_timeout;

            tokio::spawn(async move {
                let label = source.label();
                let result = match semaphore.acquire_owned().await {
                    Ok(permit) => {
                        // The permit is held by the worker, so a timed-out job keeps its slot until it returns
                        let worker = tokio::task::spawn_blocking(move || {
                            let _permit = permit;
                            job(&source)
                        });
                        match timeout(limit, worker).await {
                            Ok(Ok(result)) => result,
                            Ok(Err(e)) => Err(PipelineError::Join(e.to_string())),
                            Err(_) => Err(PipelineError::Timeout {
                                session: label.clone(),
                                secs: limit.as_secs(),
                            }),
                        }
                    }
                    Err(e) => Err(PipelineError::Join(e.to_string())),
                };

                if tx.send((label, result)).await.is_err() {
                    debug!("Merge consumer closed before session result was delivered");
                }
            });
        }
        drop(tx);

        let mut metrics = EvaluationMetrics::new();
        while let Some((label, result)) = rx.recv().await {
            match result {
                Ok(outcome) => {
                    metrics.skipped.extend(outcome.skipped);
                    metrics.add_session(&outcome.features);
                }
                Err(e) => {
                    warn!("Session {} skipped: {}", label, e);
                    metrics.record_skip(&label, None, e.to_string());
                }
            }
        }

        info!(
            "Validation run complete: {} sessions processed, {} skipped entries",
            metrics.sessions_processed,
            metrics.skipped.len()
        );
        metrics
    }
}
