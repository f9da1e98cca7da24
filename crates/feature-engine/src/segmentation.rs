//! Stroke Segmentation by Pivot Detection
//!
//! A pivot is a sample where the tool trajectory changes direction sharply.
//! For every sample `j` far enough from the ends, the vectors to the samples
//! `k` steps before and after are compared (k-cosine): a straight pass gives a
//! turn angle near 0 degrees, a full reversal gives one near 180 degrees.
//! Samples whose turn angle exceeds `mean + std` of the session are flagged,
//! and each run of flags is collapsed to its midpoint so that a single
//! direction change yields exactly one pivot.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use session_data::{PoseStream, Stroke};
use tracing::debug;

use crate::error::FeatureError;

/// Segmentation tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Half-width `k` of the k-cosine window (samples)
    pub window: usize,
    /// Turn-angle spread (degrees) at or below which the trace is treated as
    /// having zero variance; absorbs rounding noise on straight traces
    pub min_angle_spread_deg: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            window: 6,
            min_angle_spread_deg: 1e-4,
        }
    }
}

/// State of the run-merge scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Not inside a run of flags
    Idle,
    /// Inside a run that began at `start`
    InRun { start: usize },
}

/// Collapses runs of pivot flags to their midpoint.
///
/// A run stays open while another flag appears within the next `window`
/// samples; once the lookahead is clear the whole run is cleared and only its
/// midpoint is kept.
#[derive(Debug, Clone, Copy)]
pub struct RunMerger {
    window: usize,
}

impl RunMerger {
    /// Merger closing runs after `window` clear samples
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    fn lookahead_clear(&self, flags: &[bool], i: usize) -> bool {
        let end = (i + self.window).min(flags.len());
        !flags[i..end].iter().any(|&f| f)
    }

    /// Advance the scan by one sample, mutating `flags` when a run closes
    pub fn step(&self, state: RunState, flags: &mut [bool], i: usize) -> RunState {
        match state {
            RunState::Idle => {
                if flags[i] && !flags[i - 1] {
                    RunState::InRun { start: i }
                } else {
                    RunState::Idle
                }
            }
            RunState::InRun { start } => {
                if self.lookahead_clear(flags, i) {
                    flags[start..i].iter_mut().for_each(|f| *f = false);
                    flags[start + (i - start) / 2] = true;
                    RunState::Idle
                } else {
                    state
                }
            }
        }
    }

    /// Run the scan over the whole flag array.
    ///
    /// Applying it to its own output changes nothing.
    pub fn merge(&self, flags: &mut [bool]) {
        let mut state = RunState::Idle;
        for i in 1..flags.len() {
            state = self.step(state, flags, i);
        }
        if let RunState::InRun { start } = state {
            debug!("Flag run starting at {} still open at end of stream", start);
        }
    }
}

/// Result of segmenting one pose stream
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    /// One flag per pose sample; `true` marks a pivot
    pub flags: Vec<bool>,
    /// Indices of pivots, ascending
    pub pivots: Vec<usize>,
    /// First timestamp followed by the timestamp of every pivot
    pub boundary_times: Vec<f64>,
    /// Strokes between consecutive boundaries; the last one runs to the end
    pub strokes: Vec<Stroke>,
    /// Turn angle per sample (edges padded with the mean); empty when the
    /// stream is too short to evaluate
    pub turn_angles: Vec<f64>,
}

impl Segmentation {
    /// Number of detected pivots
    pub fn stroke_count(&self) -> usize {
        self.pivots.len()
    }
}

/// Pivot-point stroke detector
#[derive(Debug, Clone)]
pub struct StrokeSegmenter {
    config: SegmentationConfig,
    merger: RunMerger,
}

impl StrokeSegmenter {
    /// Fails when the window is zero
    pub fn new(config: SegmentationConfig) -> Result<Self, FeatureError> {
        if config.window == 0 {
            return Err(FeatureError::InvalidConfig(
                "segmentation window must be at least 1".into(),
            ));
        }
        Ok(Self {
            merger: RunMerger::new(config.window),
            config,
        })
    }

    /// Half-width `k` of the turn-angle window
    pub fn window(&self) -> usize {
        self.config.window
    }

    /// Turn angle (degrees) of every sample with a full window on both sides
    pub fn turn_angles(&self, positions: &[DVec3]) -> Vec<f64> {
        let k = self.config.window;
        if positions.len() < 2 * k + 1 {
            return Vec::new();
        }
        (k..positions.len() - k)
            .map(|j| {
                let before = positions[j - k] - positions[j];
                let after = positions[j + k] - positions[j];
                let norms = before.length() * after.length();
                if norms == 0.0 {
                    // Stationary tool: no evidence of a turn
                    return 0.0;
                }
                let cos = (before.dot(after) / norms).clamp(-1.0, 1.0);
                180.0 - cos.acos().to_degrees()
            })
            .collect()
    }

    /// Segment a pose stream into strokes
    pub fn segment(&self, stream: &PoseStream) -> Segmentation {
        self.segment_positions(&stream.positions(), stream.timestamps())
    }

    /// Segment a position trace paired with its timestamps
    pub fn segment_positions(&self, positions: &[DVec3], timestamps: &[f64]) -> Segmentation {
        let n = positions.len().min(timestamps.len());
        let k = self.config.window;
        let angles = self.turn_angles(&positions[..n]);

        let mut flags = vec![false; n];
        let mut turn_angles = Vec::new();

        if !angles.is_empty() {
            let count = angles.len() as f64;
            let mean = angles.iter().sum::<f64>() / count;
            let variance = angles.iter().map(|a| (a - mean) * (a - mean)).sum::<f64>() / count;
            let std_dev = variance.sqrt();

            turn_angles = Vec::with_capacity(n);
            turn_angles.extend(std::iter::repeat(mean).take(k));
            turn_angles.extend_from_slice(&angles);
            turn_angles.extend(std::iter::repeat(mean).take(k));

            if std_dev > self.config.min_angle_spread_deg {
                let threshold = mean + std_dev;
                for (flag, angle) in flags.iter_mut().zip(&turn_angles) {
                    *flag = *angle > threshold;
                }
                self.merger.merge(&mut flags);
            }

            debug!(
                "Turn angles over {} samples: mean={:.3}, std={:.3}",
                angles.len(),
                mean,
                std_dev
            );
        } else {
            debug!("Stream of {} samples is shorter than 2k+1 (k={}); no pivots", n, k);
        }

        let pivots: Vec<usize> = flags
            .iter()
            .enumerate()
            .filter_map(|(i, &f)| f.then_some(i))
            .collect();

        let mut boundary_times = Vec::with_capacity(pivots.len() + 1);
        if n > 0 {
            boundary_times.push(timestamps[0]);
        }
        boundary_times.extend(pivots.iter().map(|&p| timestamps[p]));

        let strokes = Self::build_strokes(&pivots, &timestamps[..n]);
        debug!("Detected {} pivots, {} strokes", pivots.len(), strokes.len());

        Segmentation {
            flags,
            pivots,
            boundary_times,
            strokes,
            turn_angles,
        }
    }

    /// Strokes spanning `[0, p1), [p1, p2), ..., [pn, len)`
    pub fn build_strokes(pivots: &[usize], timestamps: &[f64]) -> Vec<Stroke> {
        let n = timestamps.len();
        if n == 0 {
            return Vec::new();
        }

        let mut bounds = Vec::with_capacity(pivots.len() + 2);
        bounds.push(0);
        bounds.extend(pivots.iter().copied().filter(|&p| p > 0 && p < n));
        bounds.push(n);

        bounds
            .windows(2)
            .enumerate()
            .map(|(index, w)| Stroke {
                index,
                start_idx: w[0],
                end_idx: w[1],
                start_time: timestamps[w[0]],
                end_time: if w[1] == n {
                    f64::INFINITY
                } else {
                    timestamps[w[1]]
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn times(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 * 0.01).collect()
    }

    fn segmenter() -> StrokeSegmenter {
        StrokeSegmenter::new(SegmentationConfig::default()).unwrap()
    }

    /// Out along x to sample `m`, then straight back
    fn reversal(n: usize, m: usize) -> Vec<DVec3> {
        (0..n)
            .map(|i| {
                let x = if i <= m { i as f64 } else { (2 * m - i) as f64 };
                DVec3::new(x, 0.0, 0.0)
            })
            .collect()
    }

    #[test]
    fn test_short_stream_has_no_strokes() {
        let positions = reversal(12, 6);
        let seg = segmenter().segment_positions(&positions, &times(12));
        assert_eq!(seg.stroke_count(), 0);
        assert_eq!(seg.strokes.len(), 1);
        assert_eq!(seg.strokes[0].start_idx, 0);
        assert_eq!(seg.strokes[0].end_idx, 12);
        assert!(seg.turn_angles.is_empty());
    }

    #[test]
    fn test_straight_line_has_no_strokes() {
        let origin = DVec3::new(1.0, 2.0, 3.0);
        let step = DVec3::new(0.1, 0.2, -0.05);
        let positions: Vec<DVec3> = (0..100).map(|i| origin + step * i as f64).collect();
        let seg = segmenter().segment_positions(&positions, &times(100));
        assert_eq!(seg.stroke_count(), 0);
        assert_eq!(seg.boundary_times, vec![0.0]);
    }

    #[test]
    fn test_single_reversal() {
        let positions = reversal(61, 30);
        let seg = segmenter().segment_positions(&positions, &times(61));
        assert_eq!(seg.stroke_count(), 1);
        assert_eq!(seg.pivots, vec![30]);
        assert_eq!(seg.strokes.len(), 2);
        assert_eq!(seg.boundary_times.len(), 2);
        assert!((seg.boundary_times[1] - 0.30).abs() < 1e-12);
    }

    #[test]
    fn test_right_angle_turn() {
        let positions: Vec<DVec3> = (0..61)
            .map(|i| {
                if i <= 30 {
                    DVec3::new(i as f64, 0.0, 0.0)
                } else {
                    DVec3::new(30.0, (i - 30) as f64, 0.0)
                }
            })
            .collect();
        let seg = segmenter().segment_positions(&positions, &times(61));
        assert_eq!(seg.stroke_count(), 1);
        let pivot = seg.pivots[0] as i64;
        assert!((pivot - 30).abs() <= 6);
    }

    #[test]
    fn test_zigzag_two_pivots() {
        let positions: Vec<DVec3> = (0..61)
            .map(|i| {
                let x = match i {
                    0..=20 => i as f64,
                    21..=40 => (40 - i) as f64,
                    _ => (i - 40) as f64,
                };
                DVec3::new(x, 0.0, 0.0)
            })
            .collect();
        let seg = segmenter().segment_positions(&positions, &times(61));
        assert_eq!(seg.pivots, vec![20, 40]);
        let bounds: Vec<(usize, usize)> = seg.strokes.iter().map(|s| (s.start_idx, s.end_idx)).collect();
        assert_eq!(bounds, vec![(0, 20), (20, 40), (40, 61)]);
        assert!(seg.strokes[2].is_final());
        assert!((seg.strokes[0].end_time - 0.20).abs() < 1e-12);
    }

    #[test]
    fn test_merge_collapses_run_to_midpoint() {
        let merger = RunMerger::new(3);
        let mut flags = vec![false, true, true, true, true, false, false, false, false];
        merger.merge(&mut flags);
        assert_eq!(
            flags,
            vec![false, false, false, true, false, false, false, false, false]
        );
    }

    #[test]
    fn test_merge_joins_flags_within_window() {
        let merger = RunMerger::new(3);
        let mut flags = vec![false, true, false, true, false, false, false, false];
        merger.merge(&mut flags);
        assert_eq!(flags.iter().filter(|&&f| f).count(), 1);
        assert!(flags[2]);
    }

    #[test]
    fn test_step_transitions() {
        let merger = RunMerger::new(2);
        let mut flags = vec![false, true, false, false];
        let state = merger.step(RunState::Idle, &mut flags, 1);
        assert_eq!(state, RunState::InRun { start: 1 });
        let state = merger.step(state, &mut flags, 2);
        assert_eq!(state, RunState::Idle);
        assert_eq!(flags, vec![false, true, false, false]);
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = SegmentationConfig {
            window: 0,
            ..Default::default()
        };
        assert!(StrokeSegmenter::new(config).is_err());
    }

    proptest! {
        #[test]
        fn prop_short_streams_have_zero_strokes(
            k in 1usize..8,
            raw in prop::collection::vec((-10.0f64..10.0, -10.0f64..10.0, -10.0f64..10.0), 1..16),
        ) {
            let n = raw.len().min(2 * k);
            let positions: Vec<DVec3> = raw[..n].iter().map(|&(x, y, z)| DVec3::new(x, y, z)).collect();
            let seg = StrokeSegmenter::new(SegmentationConfig { window: k, ..Default::default() })
                .unwrap()
                .segment_positions(&positions, &times(n));
            prop_assert_eq!(seg.stroke_count(), 0);
            prop_assert_eq!(seg.strokes.len(), 1);
        }

        #[test]
        fn prop_merge_is_idempotent(
            k in 1usize..8,
            flags in prop::collection::vec(any::<bool>(), 0..80),
        ) {
            let merger = RunMerger::new(k);
            let mut once = flags.clone();
            merger.merge(&mut once);
            let mut twice = once.clone();
            merger.merge(&mut twice);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_strokes_partition_stream(
            steps in prop::collection::vec((-1.0f64..1.0, -1.0f64..1.0, -1.0f64..1.0), 1..200),
        ) {
            let mut p = DVec3::ZERO;
            let positions: Vec<DVec3> = steps
                .iter()
                .map(|&(x, y, z)| {
                    p += DVec3::new(x, y, z);
                    p
                })
                .collect();
            let n = positions.len();
            let seg = segmenter().segment_positions(&positions, &times(n));

            prop_assert_eq!(seg.strokes.len(), seg.stroke_count() + 1);
            prop_assert_eq!(seg.strokes[0].start_idx, 0);
            prop_assert_eq!(seg.strokes.last().unwrap().end_idx, n);
            for w in seg.strokes.windows(2) {
                prop_assert_eq!(w[0].end_idx, w[1].start_idx);
                prop_assert!(w[0].start_idx < w[0].end_idx);
            }
            prop_assert_eq!(seg.boundary_times.len(), seg.stroke_count() + 1);
        }
    }
}
