//! Spectrum drawn as a green polyline.
//!
//! Despite the name this plots frequency magnitudes, one vertex per bin,
//! not the time-domain signal.

use super::geometry::polyline;
use super::{FrameInput, ModeId, ModeState, OwnedNodes, VisualizationMode};
use crate::params::WaveformParams;
use crate::scene::{Color, Geometry, Material, NodeId, Object3d, Primitive, Scene, SceneNode};

pub struct WaveformMode {
    params: WaveformParams,
    nodes: OwnedNodes,
    line: Option<NodeId>,
}

impl WaveformMode {
    pub fn new(params: WaveformParams) -> Self {
        Self {
            params,
            nodes: OwnedNodes::default(),
            line: None,
        }
    }

    pub fn line(&self) -> Option<NodeId> {
        self.line
    }
}

impl VisualizationMode for WaveformMode {
    fn id(&self) -> ModeId {
        ModeId::Waveform
    }

    fn state(&self) -> ModeState {
        self.nodes.state
    }

    fn build(&mut self, scene: &mut Scene) {
        self.nodes.activate(scene);
        let geometry = Geometry::from_positions(polyline(self.params.segments, self.params.span));
        let material = Material::Line {
            color: Color::from_hex(self.params.color),
        };
        let line = Object3d::new(Primitive::LineStrip, geometry, material);
        self.line = Some(self.nodes.add(scene, SceneNode::Object(line)));
    }

    fn update(&mut self, scene: &mut Scene, input: &FrameInput<'_>) {
        if !self.nodes.is_active() {
            return;
        }
        let Some(line) = self.line.and_then(|id| scene.object_mut(id)) else {
            return;
        };
        for (i, vertex) in line.geometry.positions.iter_mut().enumerate() {
            vertex[1] = input.spectrum.normalized(i) * self.params.height_scale;
        }
    }

    fn teardown(&mut self, scene: &mut Scene) {
        self.nodes.release(scene);
        self.line = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{SpectrumFrame, BIN_COUNT};

    #[test]
    fn test_heights_follow_bins() {
        let mut scene = Scene::new();
        let mut mode = WaveformMode::new(WaveformParams::default());
        mode.build(&mut scene);

        let mut bins = [0u8; BIN_COUNT];
        for (i, bin) in bins.iter_mut().enumerate() {
            *bin = (i % 256) as u8;
        }
        let spectrum = SpectrumFrame::from_bins(bins);
        mode.update(
            &mut scene,
            &FrameInput {
                spectrum: &spectrum,
                video: None,
                dt: 0.016,
            },
        );

        let line = scene.object(mode.line().unwrap()).unwrap();
        assert_eq!(line.primitive, Primitive::LineStrip);
        for (i, p) in line.geometry.positions.iter().enumerate() {
            assert_eq!(p[1], bins[i] as f32 / 255.0 * 10.0);
            assert_eq!(p[2], 0.0);
        }
    }
}
