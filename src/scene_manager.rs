//! Owner of the scene, the camera and the active visualization mode.

use crate::audio::{SpectrumFrame, SpectrumSampler};
use crate::camera::Camera;
use crate::modes::{FrameInput, ModeId, VisualizationMode, Visualizer};
use crate::params::ModeParams;
use crate::scene::Scene;
use crate::video::VideoFeed;

/// Runs exactly one visualization mode against the shared scene
pub struct SceneManager {
    scene: Scene,
    camera: Camera,
    sampler: SpectrumSampler,
    video: VideoFeed,
    params: ModeParams,
    current: Visualizer,
    last_spectrum: SpectrumFrame,
    frames: u64,
}

impl SceneManager {
    /// Create the manager and build `initial`
    pub fn new(
        initial: ModeId,
        params: ModeParams,
        camera: Camera,
        sampler: SpectrumSampler,
        video: VideoFeed,
    ) -> Self {
        let mut scene = Scene::new();
        let mut current = Visualizer::new(initial, &params);
        current.build(&mut scene);
        log::info!("Mode: {}", initial);

        Self {
            scene,
            camera,
            sampler,
            video,
            params,
            current,
            last_spectrum: SpectrumFrame::silent(),
            frames: 0,
        }
    }

    /// Tear down the active mode and build `id`
    ///
    /// Returns `false` (and changes nothing) when `id` is already active.
    pub fn switch_mode(&mut self, id: ModeId) -> bool {
        if id == self.current.id() {
            return false;
        }
        self.current.teardown(&mut self.scene);
        debug_assert!(self.scene.is_empty(), "mode teardown left nodes behind");

        let mut next = Visualizer::new(id, &self.params);
        next.build(&mut self.scene);
        log::info!("Mode: {} -> {}", self.current.id(), id);
        self.current = next;
        true
    }

    /// Sample the spectrum (and video) and advance the active mode one frame
    pub fn on_frame(&mut self, dt: f32) {
        self.last_spectrum = self.sampler.sample();
        self.video.poll();

        let input = FrameInput {
            spectrum: &self.last_spectrum,
            video: self.video.latest(),
            dt,
        };
        self.current.update(&mut self.scene, &input);
        self.frames += 1;

        log::trace!(
            "frame {} bass={:.3} mids={:.3}",
            self.frames,
            self.last_spectrum.bass,
            self.last_spectrum.mids
        );
    }

    pub fn current_mode(&self) -> ModeId {
        self.current.id()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Spectrum used by the most recent frame
    pub fn last_spectrum(&self) -> &SpectrumFrame {
        &self.last_spectrum
    }

    /// Frames advanced so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{StaticSpectrum, BIN_COUNT};
    use crate::params::RenderConfig;

    fn manager(initial: ModeId) -> SceneManager {
        SceneManager::new(
            initial,
            ModeParams::default(),
            Camera::new(&RenderConfig::default()),
            SpectrumSampler::with_source(StaticSpectrum([90; BIN_COUNT])),
            VideoFeed::unavailable(),
        )
    }

    #[test]
    fn test_switch_to_same_mode_is_noop() {
        let mut manager = manager(ModeId::Chaotic);
        manager.on_frame(0.016);
        let before = manager.scene().object_count();
        let positions: Vec<_> = manager
            .scene()
            .objects()
            .map(|(id, o)| (id, o.geometry.positions.clone()))
            .collect();

        assert!(!manager.switch_mode(ModeId::Chaotic));
        assert_eq!(manager.scene().object_count(), before);
        let after: Vec<_> = manager
            .scene()
            .objects()
            .map(|(id, o)| (id, o.geometry.positions.clone()))
            .collect();
        assert_eq!(positions, after);
    }

    #[test]
    fn test_switch_replaces_every_node() {
        let mut manager = manager(ModeId::Chaotic);
        let old: Vec<_> = manager.scene().objects().map(|(id, _)| id).collect();
        assert!(manager.switch_mode(ModeId::Waveform));
        assert_eq!(manager.current_mode(), ModeId::Waveform);
        assert_eq!(manager.scene().light_count(), 0);
        assert!(old.iter().all(|id| !manager.scene().contains(*id)));
    }

    #[test]
    fn test_on_frame_samples_spectrum() {
        let mut manager = manager(ModeId::Simple);
        assert_eq!(manager.frames(), 0);
        manager.on_frame(0.016);
        assert_eq!(manager.frames(), 1);
        assert!((manager.last_spectrum().bass - 90.0 / 255.0).abs() < 1e-6);
    }
}
