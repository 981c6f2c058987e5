//! Audio capture and spectrum analysis.
//!
//! Captures the default (or a named) input device on a background thread and
//! runs a windowed FFT each frame, exposing a byte spectrum with bass/mid
//! aggregates for audio-reactive visuals.

mod analyser;
mod capture;
mod sampler;
mod spectrum;

// Re-export public types
pub use analyser::SpectrumAnalyser;
pub use capture::{list_input_devices, AudioCapture};
pub use sampler::{SpectrumSampler, SpectrumSource, StaticSpectrum};
pub use spectrum::{SpectrumBins, SpectrumFrame, BASS_BINS, BIN_COUNT, MID_BINS};
