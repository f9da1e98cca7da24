//! Zero-Phase Band-Pass Smoothing
//!
//! Second-order Butterworth high-pass and low-pass sections (bilinear
//! transform) applied forward and backward, so the smoothed trace has no phase
//! lag. Cutoffs are normalised to the Nyquist frequency.

use std::f64::consts::{PI, SQRT_2};

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::FeatureError;

/// Smoothing applied to position channels before curvature and jerk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Pass positions through unchanged when false
    pub enabled: bool,
    /// High-pass edge (fraction of Nyquist); `<= 0` disables it
    pub low_cutoff: f64,
    /// Low-pass edge (fraction of Nyquist); `>= 1` disables it
    pub high_cutoff: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            low_cutoff: 0.005,
            high_cutoff: 1.0,
        }
    }
}

/// Transposed direct form II biquad
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
}

impl Biquad {
    fn lowpass(cutoff: f64) -> Self {
        let wc = (PI * cutoff / 2.0).tan();
        let wc2 = wc * wc;
        let k = 1.0 + SQRT_2 * wc + wc2;
        Self {
            b: [wc2 / k, 2.0 * wc2 / k, wc2 / k],
            a: [2.0 * (wc2 - 1.0) / k, (1.0 - SQRT_2 * wc + wc2) / k],
        }
    }

    fn highpass(cutoff: f64) -> Self {
        let wc = (PI * cutoff / 2.0).tan();
        let wc2 = wc * wc;
        let k = 1.0 + SQRT_2 * wc + wc2;
        Self {
            b: [1.0 / k, -2.0 / k, 1.0 / k],
            a: [2.0 * (wc2 - 1.0) / k, (1.0 - SQRT_2 * wc + wc2) / k],
        }
    }

    /// Filter state for a constant unit input already at steady state
    fn steady_state(&self) -> [f64; 2] {
        let [b0, b1, b2] = self.b;
        let [a1, a2] = self.a;
        let gain = (b0 + b1 + b2) / (1.0 + a1 + a2);
        [b1 + b2 - (a1 + a2) * gain, b2 - a2 * gain]
    }

    fn run(&self, signal: &[f64], initial: f64) -> Vec<f64> {
        let [b0, b1, b2] = self.b;
        let [a1, a2] = self.a;
        let zi = self.steady_state();
        let mut z1 = zi[0] * initial;
        let mut z2 = zi[1] * initial;

        signal
            .iter()
            .map(|&x| {
                let y = b0 * x + z1;
                z1 = b1 * x - a1 * y + z2;
                z2 = b2 * x - a2 * y;
                y
            })
            .collect()
    }

    /// Forward-backward pass with odd extension at both ends
    fn filtfilt(&self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        if n < 2 {
            return signal.to_vec();
        }
        let pad = PAD_LEN.min(n - 1);
        let first = signal[0];
        let last = signal[n - 1];

        let mut ext = Vec::with_capacity(n + 2 * pad);
        ext.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
        ext.extend_from_slice(signal);
        ext.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i]));

        let forward = self.run(&ext, ext[0]);
        let reversed: Vec<f64> = forward.into_iter().rev().collect();
        let mut backward = self.run(&reversed, reversed[0]);
        backward.reverse();

        backward[pad..pad + n].to_vec()
    }
}

/// Edge padding per pass: three times the filter length
const PAD_LEN: usize = 9;

/// Zero-phase band-pass filter over one or three channels
#[derive(Debug, Clone)]
pub struct BandPassFilter {
    sections: Vec<Biquad>,
}

impl BandPassFilter {
    /// Build the filter; disabled or open-ended edges contribute no section
    pub fn new(config: &SmoothingConfig) -> Result<Self, FeatureError> {
        let mut sections = Vec::new();
        if !config.enabled {
            return Ok(Self { sections });
        }
        if config.low_cutoff.is_nan() || config.high_cutoff.is_nan() {
            return Err(FeatureError::InvalidConfig("smoothing cutoff is NaN".into()));
        }
        if config.low_cutoff > 0.0 && config.high_cutoff < 1.0 && config.low_cutoff >= config.high_cutoff {
            return Err(FeatureError::InvalidConfig(format!(
                "smoothing band is empty: low {} >= high {}",
                config.low_cutoff, config.high_cutoff
            )));
        }
        if config.low_cutoff >= 1.0 || config.high_cutoff <= 0.0 {
            return Err(FeatureError::InvalidConfig(format!(
                "smoothing cutoffs must lie inside (0, 1): low {}, high {}",
                config.low_cutoff, config.high_cutoff
            )));
        }

        if config.low_cutoff > 0.0 {
            sections.push(Biquad::highpass(config.low_cutoff));
        }
        if config.high_cutoff < 1.0 {
            sections.push(Biquad::lowpass(config.high_cutoff));
        }
        Ok(Self { sections })
    }

    /// Whether the filter leaves signals untouched
    pub fn is_passthrough(&self) -> bool {
        self.sections.is_empty()
    }

    /// Zero-phase filter a single channel
    pub fn apply(&self, signal: &[f64]) -> Vec<f64> {
        self.sections
            .iter()
            .fold(signal.to_vec(), |acc, section| section.filtfilt(&acc))
    }

    /// Filter x, y and z independently
    pub fn smooth_positions(&self, positions: &[DVec3]) -> Vec<DVec3> {
        if self.is_passthrough() {
            return positions.to_vec();
        }
        let x = self.apply(&positions.iter().map(|p| p.x).collect::<Vec<_>>());
        let y = self.apply(&positions.iter().map(|p| p.y).collect::<Vec<_>>());
        let z = self.apply(&positions.iter().map(|p| p.z).collect::<Vec<_>>());
        x.into_iter()
            .zip(y)
            .zip(z)
            .map(|((x, y), z)| DVec3::new(x, y, z))
            .collect()
    }
}
