//! Stream Alignment
//!
//! Correlates independently sampled streams by time. Queried streams must be
//! sorted by timestamp, which schema resolution guarantees.

use std::ops::Range;

use crate::types::{Stroke, Timestamped};

/// Pure time-based lookups between a reference stream and a queried stream
pub struct StreamAligner;

impl StreamAligner {
    /// Index range of `events` whose timestamp lies in `[start, end)`
    pub fn interval<T: Timestamped>(events: &[T], start: f64, end: f64) -> Range<usize> {
        let lo = events.partition_point(|e| e.timestamp() < start);
        let hi = events.partition_point(|e| e.timestamp() < end);
        lo..hi.max(lo)
    }

    /// Events falling inside each stroke's time interval, one slice per stroke.
    ///
    /// An empty `events` stream yields an empty slice for every stroke.
    pub fn per_stroke<'a, T: Timestamped>(events: &'a [T], strokes: &[Stroke]) -> Vec<&'a [T]> {
        strokes
            .iter()
            .map(|s| &events[Self::interval(events, s.start_time, s.end_time)])
            .collect()
    }

    /// Index of the event closest in time to `t`, if within `tolerance`.
    ///
    /// Ties resolve to the earlier event.
    pub fn nearest<T: Timestamped>(events: &[T], t: f64, tolerance: f64) -> Option<usize> {
        if events.is_empty() {
            return None;
        }
        let idx = events.partition_point(|e| e.timestamp() < t);
        let best = match (idx.checked_sub(1), idx < events.len()) {
            (Some(before), true) => {
                let d_before = (t - events[before].timestamp()).abs();
                let d_after = (events[idx].timestamp() - t).abs();
                if d_after < d_before {
                    idx
                } else {
                    before
                }
            }
            (Some(before), false) => before,
            (None, _) => idx,
        };

        if (events[best].timestamp() - t).abs() <= tolerance {
            Some(best)
        } else {
            None
        }
    }

    /// Nearest-timestamp match for every reference timestamp
    pub fn nearest_all<T: Timestamped>(
        reference: &[f64],
        events: &[T],
        tolerance: f64,
    ) -> Vec<Option<usize>> {
        reference
            .iter()
            .map(|&t| Self::nearest(events, t, tolerance))
            .collect()
    }
}
