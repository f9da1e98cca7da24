//! NaN-Safe Feature Statistics

use serde::{Deserialize, Serialize};

use crate::error::MetricsError;

/// Running accumulator for one feature.
///
/// The mean is maintained incrementally. Median, max and standard deviation
/// are computed in one batch pass over the retained values when requested.
#[derive(Debug, Clone, PartialEq)]
pub struct Stat {
    name: &'static str,
    sum: f64,
    count: usize,
    values: Vec<f64>,
}

impl Stat {
    /// Empty statistic labelled `name`
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            sum: 0.0,
            count: 0,
            values: Vec::new(),
        }
    }

    /// Label used in errors and reports
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Record a value; NaN is ignored
    pub fn add_mean(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.sum += value;
        self.count += 1;
        self.values.push(value);
    }

    /// Add every value, skipping NaN
    pub fn extend<I: IntoIterator<Item = f64>>(&mut self, values: I) {
        for v in values {
            self.add_mean(v);
        }
    }

    /// Mean of the recorded values, `0` when nothing was recorded
    pub fn get_mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Number of accepted samples
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Accepted samples in insertion order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    fn require_values(&self) -> Result<(), MetricsError> {
        if self.values.is_empty() {
            Err(MetricsError::EmptyAggregate { feature: self.name })
        } else {
            Ok(())
        }
    }

    /// Middle value of the accepted samples
    pub fn median(&self) -> Result<f64, MetricsError> {
        self.require_values()?;
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        Ok(if sorted.len() % 2 == 0 {
            0.5 * (sorted[mid - 1] + sorted[mid])
        } else {
            sorted[mid]
        })
    }

    /// Largest accepted sample
    pub fn max(&self) -> Result<f64, MetricsError> {
        self.require_values()?;
        Ok(self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max))
    }

    /// Population standard deviation
    pub fn std_dev(&self) -> Result<f64, MetricsError> {
        self.require_values()?;
        let mean = self.get_mean();
        let variance = self
            .values
            .iter()
            .map(|v| (v - mean) * (v - mean))
            .sum::<f64>()
            / self.count as f64;
        Ok(variance.sqrt())
    }

    /// Fold another accumulator of the same feature into this one
    pub fn merge(&mut self, other: &Stat) {
        self.sum += other.sum;
        self.count += other.count;
        self.values.extend_from_slice(&other.values);
    }

    /// Snapshot for reporting; batch fields are `None` when empty
    pub fn summary(&self) -> StatSummary {
        StatSummary {
            count: self.count,
            mean: self.get_mean(),
            median: self.median().ok(),
            max: self.max().ok(),
            std_dev: self.std_dev().ok(),
        }
    }
}

/// Snapshot of a [`Stat`] for reporting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatSummary {
    /// Accepted samples
    pub count: usize,
    /// Running mean, 0 when empty
    pub mean: f64,
    /// `None` when empty
    pub median: Option<f64>,
    pub max: Option<f64>,
    /// Population standard deviation
    pub std_dev: Option<f64>,
}
