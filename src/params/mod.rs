//! Parameter definitions with units and documented semantics.
//!
//! All magic numbers are extracted here with:
//! - Units (scene units, radians per frame, dB, etc.)
//! - Documented formulas where a value feeds a visual mapping
//! - Defaults matching the tuned look of each mode

mod audio;
mod modes;
mod render;

// Re-export all types
pub use audio::AnalyserConfig;
pub use modes::{
    ChaoticParams, ModeParams, ParticleParams, SimpleParams, WaveformParams, WebcamParams,
};
pub use render::{RecordingConfig, RenderConfig};
