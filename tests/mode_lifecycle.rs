//! Mode lifecycle and per-frame mapping through the public API.

use vibescope::audio::{SpectrumFrame, SpectrumSampler, StaticSpectrum, BIN_COUNT};
use vibescope::camera::Camera;
use vibescope::modes::{FrameInput, ModeId, ModeState, VisualizationMode, Visualizer};
use vibescope::params::{ModeParams, RenderConfig};
use vibescope::scene::{Primitive, Scene};
use vibescope::scene_manager::SceneManager;
use vibescope::video::{StillImageSource, VideoFeed, VideoFrame};

fn manager_with(initial: ModeId, bins: [u8; BIN_COUNT]) -> SceneManager {
    SceneManager::new(
        initial,
        ModeParams::default(),
        Camera::new(&RenderConfig::default()),
        SpectrumSampler::with_source(StaticSpectrum(bins)),
        VideoFeed::unavailable(),
    )
}

fn counts(manager: &SceneManager) -> (usize, usize, usize) {
    let scene = manager.scene();
    (
        scene.node_count(),
        scene.light_count(),
        scene.vertex_count(),
    )
}

#[test]
fn round_trip_between_modes_restores_counts() {
    for a in ModeId::ALL {
        let fresh = manager_with(a, [0; BIN_COUNT]);
        let expected = counts(&fresh);

        for b in ModeId::ALL.into_iter().filter(|b| *b != a) {
            let mut manager = manager_with(a, [0; BIN_COUNT]);
            manager.on_frame(0.016);
            assert!(manager.switch_mode(b));
            manager.on_frame(0.016);
            assert!(manager.switch_mode(a));
            assert_eq!(counts(&manager), expected, "{} -> {} -> {}", a, b, a);
        }
    }
}

#[test]
fn waveform_heights_track_spectrum() {
    let mut bins = [0u8; BIN_COUNT];
    for (i, bin) in bins.iter_mut().enumerate() {
        *bin = (i * 7 % 256) as u8;
    }
    let mut manager = manager_with(ModeId::Waveform, bins);
    manager.on_frame(0.016);

    let (_, line) = manager.scene().objects().next().unwrap();
    assert_eq!(line.primitive, Primitive::LineStrip);
    assert_eq!(line.geometry.vertex_count(), 512);
    for (i, p) in line.geometry.positions.iter().enumerate() {
        assert_eq!(p[1], bins[i] as f32 / 255.0 * 10.0);
    }
}

#[test]
fn particle_count_is_constant() {
    let mut manager = manager_with(ModeId::Particles, [180; BIN_COUNT]);
    for _ in 0..250 {
        manager.on_frame(0.016);
        assert_eq!(manager.scene().vertex_count(), 5000);
    }
}

#[test]
fn update_before_build_leaves_scene_untouched() {
    let params = ModeParams::default();
    let spectrum = SpectrumFrame::from_bins([255; BIN_COUNT]);
    let video = VideoFrame::solid(4, 4, [255, 255, 255]).unwrap();
    let input = FrameInput {
        spectrum: &spectrum,
        video: Some(&video),
        dt: 0.016,
    };

    for id in ModeId::ALL {
        let mut scene = Scene::new();
        let mut mode = Visualizer::new(id, &params);
        mode.update(&mut scene, &input);
        assert!(scene.is_empty(), "{} mutated the scene before build", id);
        assert_eq!(mode.state(), ModeState::Uninitialized);
    }
}

#[test]
fn webcam_grid_appears_once_video_arrives() {
    let frame = VideoFrame::solid(32, 24, [128, 128, 128]).unwrap();
    let mut manager = SceneManager::new(
        ModeId::Webcam,
        ModeParams::default(),
        Camera::new(&RenderConfig::default()),
        SpectrumSampler::detached(),
        VideoFeed::with_source(StillImageSource::new(frame)),
    );
    assert!(manager.scene().is_empty());

    manager.on_frame(0.016);
    assert_eq!(manager.scene().vertex_count(), 160 * 120);

    // The still image is delivered once but the grid keeps using it
    manager.on_frame(0.016);
    assert_eq!(manager.scene().object_count(), 1);
}

#[test]
fn webcam_without_video_stays_empty() {
    let mut manager = manager_with(ModeId::Webcam, [255; BIN_COUNT]);
    for _ in 0..10 {
        manager.on_frame(0.016);
    }
    assert!(manager.scene().is_empty());
    assert!(manager.switch_mode(ModeId::Simple));
    assert_eq!(manager.scene().object_count(), 1);
}
