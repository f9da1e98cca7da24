//! Evaluation Metrics
//!
//! NaN-safe per-feature statistics, cross-session aggregation and the final
//! validation report.

mod error;
mod evaluation;
mod report;
mod stat;

pub use error::MetricsError;
pub use evaluation::{EvaluationMetrics, KinematicMetrics, SkippedEntry, StrokeMetrics};
pub use report::{Report, ReportFormat};
pub use stat::{Stat, StatSummary};
