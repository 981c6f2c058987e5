//! Video as a point grid, lifted towards the camera by brightness.
//!
//! The grid only exists once the video source has delivered a frame. Until
//! then the mode is built but empty and `update` has nothing to touch.

use super::geometry::point_grid;
use super::{FrameInput, ModeId, ModeState, OwnedNodes, VisualizationMode};
use crate::params::WebcamParams;
use crate::scene::{Material, NodeId, Object3d, PointSizing, Primitive, Scene, SceneNode};
use crate::video::{luminance, VideoFrame};

pub struct WebcamMode {
    params: WebcamParams,
    nodes: OwnedNodes,
    points: Option<NodeId>,
    /// Flat grid positions and their texture coordinates
    baseline: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    time: f32,
}

impl WebcamMode {
    pub fn new(params: WebcamParams) -> Self {
        Self {
            params,
            nodes: OwnedNodes::default(),
            points: None,
            baseline: Vec::new(),
            uvs: Vec::new(),
            time: 0.0,
        }
    }

    pub fn points(&self) -> Option<NodeId> {
        self.points
    }

    /// Seconds-like clock advanced by a fixed step each frame with video
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Sprite size before depth attenuation
    ///
    /// Formula: base_point_size + bass * bass_point_scale
    pub fn point_size(&self, bass: f32) -> f32 {
        self.params.base_point_size + bass * self.params.bass_point_scale
    }

    fn create_grid(&mut self, scene: &mut Scene) -> NodeId {
        let p = &self.params;
        let geometry = point_grid(p.columns, p.rows, p.extent);
        self.baseline = geometry.positions.clone();
        self.uvs = geometry.uvs.clone().unwrap_or_default();

        let material = Material::Points {
            color: None,
            size: p.base_point_size,
            sizing: PointSizing::Attenuated(p.size_attenuation),
            opacity: 1.0,
            round: true,
            additive: true,
        };
        let grid = Object3d::new(Primitive::Points, geometry, material);
        let id = self.nodes.add(scene, SceneNode::Object(grid));
        log::debug!("Webcam grid ready ({} points)", self.baseline.len());
        self.points = Some(id);
        id
    }

    /// Recolour and displace every grid point from `video`
    fn apply_frame(&self, scene: &mut Scene, id: NodeId, video: &VideoFrame, bass: f32) {
        let Some(grid) = scene.object_mut(id) else {
            return;
        };
        let lift = self.params.displacement_scale * (bass + self.params.bass_offset);

        let mut colors = Vec::with_capacity(self.uvs.len());
        for ((slot, base), uv) in grid
            .geometry
            .positions
            .iter_mut()
            .zip(&self.baseline)
            .zip(&self.uvs)
        {
            let rgb = video.sample(uv[0], uv[1]);
            *slot = [base[0], base[1], base[2] + luminance(rgb) * lift];
            colors.push(rgb);
        }
        grid.geometry.colors = Some(colors);

        if let Material::Points { size, .. } = &mut grid.material {
            *size = self.point_size(bass);
        }
    }
}

impl VisualizationMode for WebcamMode {
    fn id(&self) -> ModeId {
        ModeId::Webcam
    }

    fn state(&self) -> ModeState {
        self.nodes.state
    }

    fn build(&mut self, scene: &mut Scene) {
        self.nodes.activate(scene);
        self.points = None;
        self.time = 0.0;
    }

    fn update(&mut self, scene: &mut Scene, input: &FrameInput<'_>) {
        if !self.nodes.is_active() {
            return;
        }
        let Some(video) = input.video else {
            log::trace!("Webcam mode waiting for video");
            return;
        };
        let id = match self.points {
            Some(id) => id,
            None => self.create_grid(scene),
        };

        self.time += self.params.time_step;
        self.apply_frame(scene, id, video, input.spectrum.bass);
    }

    fn teardown(&mut self, scene: &mut Scene) {
        self.nodes.release(scene);
        self.points = None;
        self.baseline.clear();
        self.uvs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{SpectrumFrame, BIN_COUNT};

    fn input<'a>(spectrum: &'a SpectrumFrame, video: Option<&'a VideoFrame>) -> FrameInput<'a> {
        FrameInput {
            spectrum,
            video,
            dt: 0.016,
        }
    }

    #[test]
    fn test_stays_empty_without_video() {
        let mut scene = Scene::new();
        let mut mode = WebcamMode::new(WebcamParams::default());
        mode.build(&mut scene);
        let spectrum = SpectrumFrame::silent();
        for _ in 0..5 {
            mode.update(&mut scene, &input(&spectrum, None));
        }
        assert_eq!(mode.state(), ModeState::Active);
        assert!(scene.is_empty());
        assert_eq!(mode.time(), 0.0);
    }

    #[test]
    fn test_white_frame_lifts_every_point() {
        let mut scene = Scene::new();
        let mut mode = WebcamMode::new(WebcamParams::default());
        mode.build(&mut scene);

        let mut bins = [0u8; BIN_COUNT];
        bins[..10].fill(255);
        let spectrum = SpectrumFrame::from_bins(bins);
        let video = VideoFrame::solid(64, 48, [255, 255, 255]).unwrap();
        mode.update(&mut scene, &input(&spectrum, Some(&video)));

        let grid = scene.object(mode.points().unwrap()).unwrap();
        assert_eq!(grid.geometry.vertex_count(), 160 * 120);
        // luminance 1 * 10 * (1 + 0.2)
        for p in &grid.geometry.positions {
            assert!((p[2] - 12.0).abs() < 1e-4);
        }
        match &grid.material {
            Material::Points {
                size,
                round,
                additive,
                ..
            } => {
                assert_eq!(*size, 7.0);
                assert!(*round && *additive);
            }
            other => panic!("unexpected material {:?}", other),
        }
        assert_eq!(grid.geometry.colors.as_ref().unwrap().len(), 160 * 120);
    }

    #[test]
    fn test_black_frame_stays_flat() {
        let mut scene = Scene::new();
        let mut mode = WebcamMode::new(WebcamParams::default());
        mode.build(&mut scene);
        let spectrum = SpectrumFrame::from_bins([255; BIN_COUNT]);
        let video = VideoFrame::solid(16, 12, [0, 0, 0]).unwrap();
        mode.update(&mut scene, &input(&spectrum, Some(&video)));
        mode.update(&mut scene, &input(&spectrum, Some(&video)));

        let grid = scene.object(mode.points().unwrap()).unwrap();
        assert!(grid.geometry.positions.iter().all(|p| p[2] == 0.0));
        assert!((mode.time() - 0.1).abs() < 1e-6);
        assert_eq!(scene.object_count(), 1);
    }
}
