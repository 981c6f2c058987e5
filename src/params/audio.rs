//! Spectrum analysis configuration.
//!
//! These values are fixed for the lifetime of the program: the visual
//! mappings in `modes` are tuned against them, so they are deliberately
//! not exposed through the CLI or the config file.

/// Analyser settings for byte-frequency spectrum extraction
#[derive(Debug, Clone)]
pub struct AnalyserConfig {
    /// FFT window size (samples, must be power of 2)
    /// 1024 samples => 512 frequency bins
    pub fft_size: usize,

    /// Exponential smoothing between consecutive spectra (0.0-1.0)
    /// Applied once per spectrum read, i.e. once per rendered frame
    /// Higher = slower decay of peaks
    pub smoothing_time_constant: f32,

    /// Magnitude mapped to byte value 0 (dBFS)
    pub min_decibels: f32,

    /// Magnitude mapped to byte value 255 (dBFS)
    pub max_decibels: f32,

    /// Capture thread poll interval (milliseconds)
    /// Bounds how long stopping the capture takes
    pub poll_interval_ms: u64,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            smoothing_time_constant: 0.85,
            min_decibels: -100.0,
            max_decibels: -30.0,
            poll_interval_ms: 10,
        }
    }
}

impl AnalyserConfig {
    /// Number of frequency bins produced per analysis (half the FFT size)
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<(), String> {
        if !self.fft_size.is_power_of_two() {
            return Err(format!(
                "FFT size must be power of 2, got {}",
                self.fft_size
            ));
        }
        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(format!(
                "Smoothing time constant must be within 0..=1, got {}",
                self.smoothing_time_constant
            ));
        }
        if self.max_decibels <= self.min_decibels {
            return Err(format!(
                "max_decibels ({}) must exceed min_decibels ({})",
                self.max_decibels, self.min_decibels
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_produces_512_bins() {
        let config = AnalyserConfig::default();
        assert_eq!(config.bin_count(), 512);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = AnalyserConfig {
            fft_size: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AnalyserConfig {
            min_decibels: -30.0,
            max_decibels: -100.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
