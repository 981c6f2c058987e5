//! Per-frame spectrum sampling that never fails.

use super::spectrum::{SpectrumBins, SpectrumFrame, BIN_COUNT};
use crate::acquisition::{Acquisition, AcquisitionState};
use crate::error::AudioError;

/// Anything that can publish a byte spectrum
pub trait SpectrumSource: Send {
    /// Copy the most recent spectrum into `out`
    fn read_bins(&mut self, out: &mut SpectrumBins);
}

/// Fixed spectrum, for tests and headless runs
#[derive(Clone, Debug)]
pub struct StaticSpectrum(pub SpectrumBins);

impl SpectrumSource for StaticSpectrum {
    fn read_bins(&mut self, out: &mut SpectrumBins) {
        *out = self.0;
    }
}

/// Samples the audio source once per frame
///
/// While the source is pending, failed or absent every sample is silent, so
/// the rest of the pipeline keeps running on zeroed input.
pub struct SpectrumSampler {
    source: Acquisition<Box<dyn SpectrumSource>, AudioError>,
    bins: SpectrumBins,
}

impl SpectrumSampler {
    pub fn new(source: Acquisition<Box<dyn SpectrumSource>, AudioError>) -> Self {
        Self {
            source,
            bins: [0; BIN_COUNT],
        }
    }

    /// Sampler backed by an already-available source
    pub fn with_source(source: impl SpectrumSource + 'static) -> Self {
        let source: Box<dyn SpectrumSource> = Box::new(source);
        Self::new(Acquisition::ready("spectrum", source))
    }

    /// Sampler with no audio input; always silent
    pub fn detached() -> Self {
        Self::new(Acquisition::unavailable("spectrum"))
    }

    /// Take a fresh snapshot of the spectrum
    pub fn sample(&mut self) -> SpectrumFrame {
        match self.source.get_mut() {
            Some(source) => source.read_bins(&mut self.bins),
            None => self.bins = [0; BIN_COUNT],
        }
        SpectrumFrame::from_bins(self.bins)
    }

    pub fn source_state(&self) -> AcquisitionState {
        self.source.state()
    }
}
