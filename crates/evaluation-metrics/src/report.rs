//! Report Rendering

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MetricsError;
use crate::evaluation::SkippedEntry;
use crate::stat::StatSummary;

/// Output format of a rendered report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Final snapshot of a validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Sessions that contributed features
    pub sessions_processed: usize,
    /// Total pivots across sessions
    pub stroke_count: usize,
    pub length: StatSummary,
    pub curvature: StatSummary,
    pub force: StatSummary,
    pub removal_rate: StatSummary,
    /// Average stroke speed
    pub velocity: StatSummary,
    pub acceleration: StatSummary,
    pub jerk: StatSummary,
    /// Contact-sample orientation residual in degrees
    pub orientation: StatSummary,
    /// Removed voxels classified as bone
    pub bone_voxels: u64,
    /// Removed voxels classified as sensitive tissue
    pub sensitive_voxels: u64,
    /// Summed procedure duration
    pub duration: f64,
    /// Everything left out, in arrival order
    pub skipped: Vec<SkippedEntry>,
}

impl Report {
    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String, MetricsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render in the requested format
    pub fn render(&self, format: ReportFormat) -> Result<String, MetricsError> {
        match format {
            ReportFormat::Text => Ok(self.to_string()),
            ReportFormat::Json => self.to_json(),
        }
    }
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.6}", v))
}

fn write_stat(f: &mut fmt::Formatter<'_>, label: &str, stat: &StatSummary) -> fmt::Result {
    writeln!(
        f,
        "    {:<22} mean {:.6}  median {}  max {}  (n={})",
        label,
        stat.mean,
        optional(stat.median),
        optional(stat.max),
        stat.count
    )
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Metrics ({} sessions)", self.sessions_processed)?;
        writeln!(f, "    Stroke Count           {}", self.stroke_count)?;
        write_stat(f, "Stroke Length", &self.length)?;
        write_stat(f, "Stroke Curvature", &self.curvature)?;
        write_stat(f, "Stroke Force", &self.force)?;
        write_stat(f, "Removal Rate", &self.removal_rate)?;
        write_stat(f, "Velocity", &self.velocity)?;
        write_stat(f, "Acceleration", &self.acceleration)?;
        write_stat(f, "Jerk", &self.jerk)?;
        write_stat(f, "Orientation Residual", &self.orientation)?;
        writeln!(f, "    Bone Voxels            {}", self.bone_voxels)?;
        writeln!(f, "    Sensitive Voxels       {}", self.sensitive_voxels)?;
        writeln!(f, "    Procedure Duration     {:.3}", self.duration)?;

        if !self.skipped.is_empty() {
            writeln!(f, "Skipped ({})", self.skipped.len())?;
            for entry in &self.skipped {
                match &entry.feature {
                    Some(feature) => writeln!(f, "    {} [{}]: {}", entry.session, feature, entry.reason)?,
                    None => writeln!(f, "    {}: {}", entry.session, entry.reason)?,
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::evaluation::EvaluationMetrics;

    use super::*;

    fn sample_report() -> Report {
        let mut metrics = EvaluationMetrics::new();
        metrics.strokes.count = 4;
        metrics.strokes.length.extend([1.0, 2.0, 3.0]);
        metrics.kinematics.velocity.add_mean(0.25);
        metrics.voxels.bone = 7;
        metrics.voxels.sensitive = 2;
        metrics.duration = 12.5;
        metrics.sessions_processed = 2;
        metrics.record_skip("s2", Some("force"), "group 'force' not recorded");
        metrics.report()
    }

    #[test]
    fn test_text_report() {
        let text = sample_report().render(ReportFormat::Text).unwrap();
        assert!(text.starts_with("Total Metrics (2 sessions)"));
        assert!(text.contains("Stroke Count           4"));
        assert!(text.contains("mean 2.000000  median 2.000000  max 3.000000  (n=3)"));
        assert!(text.contains("median n/a"));
        assert!(text.contains("Bone Voxels            7"));
        assert!(text.contains("s2 [force]: group 'force' not recorded"));
    }

    #[test]
    fn test_json_report() {
        let report = sample_report();
        let json = report.render(ReportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["stroke_count"], 4);
        assert_eq!(value["length"]["max"], 3.0);
        assert!(value["jerk"]["median"].is_null());
        assert_eq!(value["skipped"][0]["feature"], "force");

        let parsed: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.stroke_count, report.stroke_count);
        assert_eq!(parsed.skipped, report.skipped);
    }

    #[test]
    fn test_format_names() {
        let format: ReportFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, ReportFormat::Json);
        assert_eq!(ReportFormat::default(), ReportFormat::Text);
    }
}
