//! Byte-frequency spectrum analysis.
//!
//! Windowed FFT over the most recent samples, smoothed against the
//! previous spectrum and mapped from decibels onto 0-255.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use super::spectrum::{SpectrumBins, BIN_COUNT};
use crate::params::AnalyserConfig;

/// Streaming analyser holding the sample history and smoothed magnitudes
pub struct SpectrumAnalyser {
    config: AnalyserConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    /// Most recent `fft_size` mono samples, oldest first
    history: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    /// Smoothed linear magnitudes from the previous analysis
    smoothed: Vec<f32>,
}

impl SpectrumAnalyser {
    /// Create an analyser; the config must produce exactly `BIN_COUNT` bins
    pub fn new(config: AnalyserConfig) -> Result<Self, String> {
        config.validate()?;
        if config.bin_count() != BIN_COUNT {
            return Err(format!(
                "Analyser must produce {} bins, config gives {}",
                BIN_COUNT,
                config.bin_count()
            ));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.fft_size);
        let window = (0..config.fft_size)
            .map(|i| blackman_window(i, config.fft_size))
            .collect();

        Ok(Self {
            fft,
            window,
            history: vec![0.0; config.fft_size],
            scratch: vec![Complex::new(0.0, 0.0); config.fft_size],
            smoothed: vec![0.0; config.bin_count()],
            config,
        })
    }

    /// Append mono samples, keeping only the latest FFT window
    pub fn push_samples(&mut self, samples: &[f32]) {
        let size = self.config.fft_size;
        if samples.len() >= size {
            self.history.copy_from_slice(&samples[samples.len() - size..]);
            return;
        }
        self.history.drain(..samples.len());
        self.history.extend_from_slice(samples);
    }

    /// Analyse the current history into byte magnitudes
    pub fn analyse(&mut self, out: &mut SpectrumBins) {
        let size = self.config.fft_size;
        for (i, slot) in self.scratch.iter_mut().enumerate() {
            *slot = Complex::new(self.history[i] * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let tau = self.config.smoothing_time_constant;
        let min_db = self.config.min_decibels;
        let range_db = self.config.max_decibels - min_db;

        for (k, byte) in out.iter_mut().enumerate() {
            let magnitude = self.scratch[k].norm() / size as f32;
            let smoothed = tau * self.smoothed[k] + (1.0 - tau) * magnitude;
            // A NaN here would poison every later frame
            self.smoothed[k] = if smoothed.is_finite() { smoothed } else { 0.0 };
            *byte = decibels_to_byte(linear_to_decibels(self.smoothed[k]), min_db, range_db);
        }
    }
}

/// Blackman window (alpha = 0.16) over a window of `size` samples
fn blackman_window(index: usize, size: usize) -> f32 {
    let a0 = 0.42;
    let a1 = 0.5;
    let a2 = 0.08;
    let x = index as f32 / size as f32;
    a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
}

fn linear_to_decibels(magnitude: f32) -> f32 {
    if magnitude <= 0.0 {
        return f32::NEG_INFINITY;
    }
    20.0 * magnitude.log10()
}

/// Map dB onto 0-255, clamping below `min_db` and above `min_db + range_db`
fn decibels_to_byte(db: f32, min_db: f32, range_db: f32) -> u8 {
    let scaled = (255.0 / range_db) * (db - min_db);
    if !scaled.is_finite() || scaled <= 0.0 {
        return 0;
    }
    scaled.floor().min(255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_bin: usize, amplitude: f32, size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| amplitude * (2.0 * PI * freq_bin as f32 * i as f32 / size as f32).sin())
            .collect()
    }

    #[test]
    fn test_blackman_window_shape() {
        let size = 1024;
        assert!(blackman_window(0, size).abs() < 1e-6);
        assert!((blackman_window(size / 2, size) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_decibel_mapping_clamps() {
        assert_eq!(decibels_to_byte(-120.0, -100.0, 70.0), 0);
        assert_eq!(decibels_to_byte(f32::NEG_INFINITY, -100.0, 70.0), 0);
        assert_eq!(decibels_to_byte(0.0, -100.0, 70.0), 255);
        // Halfway through the range
        assert_eq!(decibels_to_byte(-65.0, -100.0, 70.0), 127);
    }

    #[test]
    fn test_silence_analyses_to_zero() {
        let mut analyser = SpectrumAnalyser::new(AnalyserConfig::default()).unwrap();
        let mut bins = [1u8; BIN_COUNT];
        analyser.analyse(&mut bins);
        assert!(bins.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let mut analyser = SpectrumAnalyser::new(AnalyserConfig::default()).unwrap();
        let mut bins = [0u8; BIN_COUNT];

        // Let smoothing settle
        for _ in 0..64 {
            analyser.push_samples(&sine(40, 0.5, 1024));
            analyser.analyse(&mut bins);
        }

        assert_eq!(bins[40], 255);
        // A periodic Blackman window leaks into at most two neighbours per side
        assert!(bins[37] < bins[40] / 2);
        assert!(bins[300] < 50);
    }

    #[test]
    fn test_smoothing_decays_gradually() {
        let mut analyser = SpectrumAnalyser::new(AnalyserConfig::default()).unwrap();
        let mut bins = [0u8; BIN_COUNT];
        for _ in 0..64 {
            analyser.push_samples(&sine(40, 0.005, 1024));
            analyser.analyse(&mut bins);
        }
        let loud = bins[40];
        assert!(loud > 0 && loud < 255);

        analyser.push_samples(&vec![0.0; 1024]);
        analyser.analyse(&mut bins);
        assert!(bins[40] > 0, "one silent window should not zero a smoothed peak");
        assert!(bins[40] < loud);
    }

    #[test]
    fn test_short_pushes_keep_window_length() {
        let mut analyser = SpectrumAnalyser::new(AnalyserConfig::default()).unwrap();
        analyser.push_samples(&[0.25; 100]);
        assert_eq!(analyser.history.len(), 1024);
        assert_eq!(analyser.history[1023], 0.25);
        assert_eq!(analyser.history[0], 0.0);
    }

    #[test]
    fn test_rejects_wrong_bin_count() {
        let config = AnalyserConfig {
            fft_size: 2048,
            ..Default::default()
        };
        assert!(SpectrumAnalyser::new(config).is_err());
    }
}
