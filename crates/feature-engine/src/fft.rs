//! Spectral Inspection of Position Channels
//!
//! Optional frequency-domain view of the smoothed x/y/z traces. Nothing in
//! the stroke features depends on it; it exists to inspect pattern-scale
//! repetition in a session.

use glam::DVec3;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

/// Frequency band edges (Hz)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrequencyBands {
    /// Low band in Hz
    pub low: (f64, f64),
    /// Medium band in Hz
    pub medium: (f64, f64),
    /// High band in Hz
    pub high: (f64, f64),
}

impl Default for FrequencyBands {
    fn default() -> Self {
        Self {
            low: (0.0, 0.5),
            medium: (0.5, 2.0),
            high: (2.0, 10.0),
        }
    }
}

/// Spectral inspection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralConfig {
    /// Compute a spectrum per axis during extraction
    pub enabled: bool,
    /// Pose sampling rate used to label frequency bins
    pub sample_rate_hz: f64,
    /// Band edges
    pub bands: FrequencyBands,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sample_rate_hz: 100.0,
            bands: FrequencyBands::default(),
        }
    }
}

/// Band powers of one channel
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelSpectrum {
    /// Power in the low band
    pub power_low: f64,
    /// Power in the medium band
    pub power_medium: f64,
    /// Power in the high band
    pub power_high: f64,
    /// Frequency of the strongest non-DC bin
    pub dominant_frequency: f64,
    /// Power over the one-sided spectrum
    pub total_power: f64,
}

/// Spectra of the three position channels
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpectralProfile {
    /// X axis
    pub x: ChannelSpectrum,
    /// Y axis
    pub y: ChannelSpectrum,
    /// Z axis
    pub z: ChannelSpectrum,
}

/// FFT front end over position traces
pub struct SpectralAnalyzer {
    planner: FftPlanner<f64>,
    bands: FrequencyBands,
    sample_rate: f64,
}

impl SpectralAnalyzer {
    /// Create an analyzer for the configured sample rate and bands
    pub fn new(config: &SpectralConfig) -> Self {
        Self {
            planner: FftPlanner::new(),
            bands: config.bands,
            sample_rate: config.sample_rate_hz,
        }
    }

    fn apply_hamming_window(signal: &mut [f64]) {
        let n = signal.len();
        if n < 2 {
            return;
        }
        for (i, v) in signal.iter_mut().enumerate() {
            let window = 0.54 - 0.46 * (2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64).cos();
            *v *= window;
        }
    }

    /// Band powers and dominant frequency of a single channel
    pub fn analyze(&mut self, signal: &[f64]) -> ChannelSpectrum {
        if signal.is_empty() {
            return ChannelSpectrum::default();
        }

        let n = signal.len();
        let mut windowed = signal.to_vec();
        Self::apply_hamming_window(&mut windowed);

        let mut buffer: Vec<Complex<f64>> = windowed.iter().map(|&v| Complex::new(v, 0.0)).collect();
        let fft = self.planner.plan_fft_forward(n);
        fft.process(&mut buffer);

        // One-sided power spectrum
        let power: Vec<f64> = buffer
            .iter()
            .take(n / 2 + 1)
            .map(|c| c.norm_sqr() / n as f64)
            .collect();

        let resolution = self.sample_rate / n as f64;
        let mut spectrum = ChannelSpectrum::default();
        let mut max_power = 0.0;

        for (i, &p) in power.iter().enumerate() {
            let freq = i as f64 * resolution;
            let in_band = |band: (f64, f64)| freq >= band.0 && freq < band.1;

            if in_band(self.bands.low) {
                spectrum.power_low += p;
            } else if in_band(self.bands.medium) {
                spectrum.power_medium += p;
            } else if in_band(self.bands.high) {
                spectrum.power_high += p;
            }

            // Skip the DC bin when picking the dominant component
            if i > 0 && p > max_power {
                max_power = p;
                spectrum.dominant_frequency = freq;
            }
            spectrum.total_power += p;
        }

        spectrum
    }

    /// Spectra of x, y and z
    pub fn profile(&mut self, positions: &[DVec3]) -> SpectralProfile {
        let channel = |f: fn(&DVec3) -> f64| positions.iter().map(f).collect::<Vec<f64>>();
        let (xs, ys, zs) = (channel(|p| p.x), channel(|p| p.y), channel(|p| p.z));
        SpectralProfile {
            x: self.analyze(&xs),
            y: self.analyze(&ys),
            z: self.analyze(&zs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominant_frequency_of_circle() {
        let mut analyzer = SpectralAnalyzer::new(&SpectralConfig {
            enabled: true,
            sample_rate_hz: 100.0,
            ..Default::default()
        });

        // 1 Hz circle in the xy-plane sampled at 100 Hz
        let positions: Vec<DVec3> = (0..512)
            .map(|i| {
                let phase = 2.0 * std::f64::consts::PI * i as f64 / 100.0;
                DVec3::new(phase.cos(), phase.sin(), 0.0)
            })
            .collect();

        let profile = analyzer.profile(&positions);
        assert!((profile.x.dominant_frequency - 1.0).abs() < 0.5);
        assert!((profile.y.dominant_frequency - 1.0).abs() < 0.5);
        assert!(profile.x.power_medium > profile.x.power_high);
        assert_eq!(profile.z.total_power, 0.0);
    }

    #[test]
    fn test_empty_signal() {
        let mut analyzer = SpectralAnalyzer::new(&SpectralConfig::default());
        let spectrum = analyzer.analyze(&[]);
        assert_eq!(spectrum.total_power, 0.0);
        assert_eq!(analyzer.analyze(&[3.0]).dominant_frequency, 0.0);
    }
}
