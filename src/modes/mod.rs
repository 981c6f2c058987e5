//! Visualization modes.
//!
//! Each mode owns the scene nodes it creates and maps one spectrum frame to
//! geometry, transform and material changes on those nodes. The lifecycle is
//! the same for all of them:
//!
//! - `build` adds the mode's nodes (tearing down a previous build first)
//! - `update` runs once per frame and only touches nodes the mode owns
//! - `teardown` removes every node and light the mode added
//!
//! `update` on an unbuilt mode is a no-op.

mod chaotic;
mod geometry;
mod particles;
mod simple;
mod waveform;
mod webcam;

use serde::Deserialize;
use std::fmt;

use crate::audio::SpectrumFrame;
use crate::params::ModeParams;
use crate::scene::{NodeId, Scene, SceneNode};
use crate::video::VideoFrame;

// Re-export public types
pub use chaotic::ChaoticMode;
pub use geometry::{icosahedron, particle_cloud, point_grid, polyline, uv_sphere};
pub use particles::ParticlesMode;
pub use simple::SimpleMode;
pub use waveform::WaveformMode;
pub use webcam::WebcamMode;

/// Selectable visualization styles
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModeId {
    #[default]
    Simple,
    Chaotic,
    Particles,
    Webcam,
    Waveform,
}

impl ModeId {
    /// In keyboard order (keys 1-5)
    pub const ALL: [ModeId; 5] = [
        ModeId::Simple,
        ModeId::Chaotic,
        ModeId::Particles,
        ModeId::Webcam,
        ModeId::Waveform,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModeId::Simple => "simple",
            ModeId::Chaotic => "chaotic",
            ModeId::Particles => "particles",
            ModeId::Webcam => "webcam",
            ModeId::Waveform => "waveform",
        }
    }

    /// Mode bound to number key `digit` (1-based)
    pub fn from_digit(digit: u32) -> Option<ModeId> {
        let index = digit.checked_sub(1)? as usize;
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModeState {
    #[default]
    Uninitialized,
    Active,
}

/// Everything a mode may read during one frame
#[derive(Clone, Copy, Debug)]
pub struct FrameInput<'a> {
    pub spectrum: &'a SpectrumFrame,
    /// Latest video frame, if the video source has delivered one
    pub video: Option<&'a VideoFrame>,
    /// Seconds since the previous frame
    pub dt: f32,
}

/// Build/update/teardown contract shared by every mode
pub trait VisualizationMode {
    fn id(&self) -> ModeId;

    fn state(&self) -> ModeState;

    /// Add this mode's nodes to `scene`; rebuilding tears down first
    fn build(&mut self, scene: &mut Scene);

    /// Advance one frame; does nothing unless built
    fn update(&mut self, scene: &mut Scene, input: &FrameInput<'_>);

    /// Remove every node this mode added
    fn teardown(&mut self, scene: &mut Scene);
}

/// Ids of the nodes a mode created, plus its lifecycle state
#[derive(Debug, Default)]
struct OwnedNodes {
    state: ModeState,
    ids: Vec<NodeId>,
}

impl OwnedNodes {
    /// Enter `Active`, removing anything left from a previous build
    fn activate(&mut self, scene: &mut Scene) {
        self.release(scene);
        self.state = ModeState::Active;
    }

    fn add(&mut self, scene: &mut Scene, node: SceneNode) -> NodeId {
        let id = scene.add(node);
        self.ids.push(id);
        id
    }

    fn release(&mut self, scene: &mut Scene) {
        for id in self.ids.drain(..) {
            scene.remove(id);
        }
        self.state = ModeState::Uninitialized;
    }

    fn is_active(&self) -> bool {
        self.state == ModeState::Active
    }
}

/// Closed set of modes, dispatched by match
pub enum Visualizer {
    Simple(SimpleMode),
    Chaotic(ChaoticMode),
    Particles(ParticlesMode),
    Webcam(WebcamMode),
    Waveform(WaveformMode),
}

impl Visualizer {
    /// Unbuilt mode for `id`
    pub fn new(id: ModeId, params: &ModeParams) -> Self {
        match id {
            ModeId::Simple => Visualizer::Simple(SimpleMode::new(params.simple.clone())),
            ModeId::Chaotic => Visualizer::Chaotic(ChaoticMode::new(params.chaotic.clone())),
            ModeId::Particles => {
                Visualizer::Particles(ParticlesMode::new(params.particles.clone()))
            }
            ModeId::Webcam => Visualizer::Webcam(WebcamMode::new(params.webcam.clone())),
            ModeId::Waveform => Visualizer::Waveform(WaveformMode::new(params.waveform.clone())),
        }
    }

    fn as_mode(&self) -> &dyn VisualizationMode {
        match self {
            Visualizer::Simple(mode) => mode,
            Visualizer::Chaotic(mode) => mode,
            Visualizer::Particles(mode) => mode,
            Visualizer::Webcam(mode) => mode,
            Visualizer::Waveform(mode) => mode,
        }
    }

    fn as_mode_mut(&mut self) -> &mut dyn VisualizationMode {
        match self {
            Visualizer::Simple(mode) => mode,
            Visualizer::Chaotic(mode) => mode,
            Visualizer::Particles(mode) => mode,
            Visualizer::Webcam(mode) => mode,
            Visualizer::Waveform(mode) => mode,
        }
    }
}

impl VisualizationMode for Visualizer {
    fn id(&self) -> ModeId {
        self.as_mode().id()
    }

    fn state(&self) -> ModeState {
        self.as_mode().state()
    }

    fn build(&mut self, scene: &mut Scene) {
        self.as_mode_mut().build(scene)
    }

    fn update(&mut self, scene: &mut Scene, input: &FrameInput<'_>) {
        self.as_mode_mut().update(scene, input)
    }

    fn teardown(&mut self, scene: &mut Scene) {
        self.as_mode_mut().teardown(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::BIN_COUNT;

    #[test]
    fn test_digit_mapping() {
        assert_eq!(ModeId::from_digit(1), Some(ModeId::Simple));
        assert_eq!(ModeId::from_digit(5), Some(ModeId::Waveform));
        assert_eq!(ModeId::from_digit(0), None);
        assert_eq!(ModeId::from_digit(6), None);
    }

    #[test]
    fn test_every_mode_tears_down_cleanly() {
        let params = ModeParams::default();
        let spectrum = SpectrumFrame::from_bins([128; BIN_COUNT]);
        let video = VideoFrame::solid(8, 6, [200, 100, 50]).unwrap();
        let input = FrameInput {
            spectrum: &spectrum,
            video: Some(&video),
            dt: 1.0 / 60.0,
        };

        for id in ModeId::ALL {
            let mut scene = Scene::new();
            let mut mode = Visualizer::new(id, &params);
            assert_eq!(mode.id(), id);

            mode.build(&mut scene);
            mode.update(&mut scene, &input);
            assert_eq!(mode.state(), ModeState::Active);
            assert!(!scene.is_empty(), "{} built nothing", id);

            mode.teardown(&mut scene);
            assert_eq!(mode.state(), ModeState::Uninitialized);
            assert!(scene.is_empty(), "{} left nodes behind", id);
        }
    }

    #[test]
    fn test_rebuild_does_not_duplicate_nodes() {
        let params = ModeParams::default();
        for id in ModeId::ALL {
            let mut scene = Scene::new();
            let mut mode = Visualizer::new(id, &params);
            mode.build(&mut scene);
            let once = scene.node_count();
            mode.build(&mut scene);
            assert_eq!(scene.node_count(), once, "{} duplicated on rebuild", id);
        }
    }
}
