//! Per-frame spectrum snapshot with bass/mid aggregates.

use std::ops::Range;

/// Bins per spectrum frame (half of a 1024-sample FFT)
pub const BIN_COUNT: usize = 512;

/// Bins averaged into `bass`
/// Fixed bin indices, not derived from the sample rate
pub const BASS_BINS: Range<usize> = 0..10;

/// Bins averaged into `mids`
pub const MID_BINS: Range<usize> = 20..100;

/// Byte magnitudes for one frame, low to high frequency
pub type SpectrumBins = [u8; BIN_COUNT];

/// Read-only spectrum snapshot handed to the active mode each frame
#[derive(Clone, Debug, PartialEq)]
pub struct SpectrumFrame {
    bins: SpectrumBins,

    /// Mean of the bass bins, normalized (0.0-1.0)
    pub bass: f32,

    /// Mean of the mid bins, normalized (0.0-1.0)
    pub mids: f32,
}

impl SpectrumFrame {
    /// Build a frame and derive its band aggregates
    pub fn from_bins(bins: SpectrumBins) -> Self {
        let bass = band_level(&bins, BASS_BINS);
        let mids = band_level(&bins, MID_BINS);
        Self { bins, bass, mids }
    }

    /// All-zero frame used while no audio source is available
    pub fn silent() -> Self {
        Self::from_bins([0; BIN_COUNT])
    }

    pub fn bins(&self) -> &SpectrumBins {
        &self.bins
    }

    /// Magnitude of bin `index`; indices past the end read as silence
    pub fn bin(&self, index: usize) -> u8 {
        self.bins.get(index).copied().unwrap_or(0)
    }

    /// Magnitude of bin `index` scaled to 0.0-1.0
    pub fn normalized(&self, index: usize) -> f32 {
        self.bin(index) as f32 / 255.0
    }

    pub fn is_silent(&self) -> bool {
        self.bins.iter().all(|&b| b == 0)
    }
}

impl Default for SpectrumFrame {
    fn default() -> Self {
        Self::silent()
    }
}

/// Mean of `range` divided by 255
fn band_level(bins: &SpectrumBins, range: Range<usize>) -> f32 {
    let len = range.len();
    if len == 0 {
        return 0.0;
    }
    let sum: u32 = bins[range].iter().map(|&b| b as u32).sum();
    (sum as f32 / len as f32) / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_silent_frame_has_zero_bands() {
        let frame = SpectrumFrame::silent();
        assert_eq!(frame.bass, 0.0);
        assert_eq!(frame.mids, 0.0);
        assert!(frame.is_silent());
    }

    #[test]
    fn test_full_frame_has_unit_bands() {
        let frame = SpectrumFrame::from_bins([255; BIN_COUNT]);
        assert_eq!(frame.bass, 1.0);
        assert_eq!(frame.mids, 1.0);
    }

    #[test]
    fn test_bands_only_read_their_bins() {
        let mut bins = [0u8; BIN_COUNT];
        // Bins between the two bands and above the mids
        let (lo, hi) = bins.split_at_mut(100);
        for b in lo[10..20].iter_mut().chain(hi.iter_mut()) {
            *b = 255;
        }
        let frame = SpectrumFrame::from_bins(bins);
        assert_eq!(frame.bass, 0.0);
        assert_eq!(frame.mids, 0.0);

        let mut bins = [0u8; BIN_COUNT];
        bins[0] = 255;
        bins[20] = 80;
        let frame = SpectrumFrame::from_bins(bins);
        assert!((frame.bass - 0.1).abs() < 1e-6);
        assert!((frame.mids - 1.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_out_of_range_bin_reads_zero() {
        let frame = SpectrumFrame::from_bins([200; BIN_COUNT]);
        assert_eq!(frame.bin(BIN_COUNT), 0);
        assert_eq!(frame.normalized(BIN_COUNT + 10), 0.0);
    }

    proptest! {
        #[test]
        fn bands_stay_in_unit_range(bins in proptest::collection::vec(any::<u8>(), BIN_COUNT)) {
            let mut array = [0u8; BIN_COUNT];
            array.copy_from_slice(&bins);
            let frame = SpectrumFrame::from_bins(array);
            prop_assert!((0.0..=1.0).contains(&frame.bass));
            prop_assert!((0.0..=1.0).contains(&frame.mids));
        }
    }
}
