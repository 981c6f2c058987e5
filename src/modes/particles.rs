//! Static particle cloud that slowly turns and breathes with the bass.

use super::geometry::particle_cloud;
use super::{FrameInput, ModeId, ModeState, OwnedNodes, VisualizationMode};
use crate::params::ParticleParams;
use crate::scene::{
    Color, Geometry, Material, NodeId, Object3d, PointSizing, Primitive, Scene, SceneNode,
};

pub struct ParticlesMode {
    params: ParticleParams,
    nodes: OwnedNodes,
    points: Option<NodeId>,
}

impl ParticlesMode {
    pub fn new(params: ParticleParams) -> Self {
        Self {
            params,
            nodes: OwnedNodes::default(),
            points: None,
        }
    }

    pub fn points(&self) -> Option<NodeId> {
        self.points
    }
}

impl VisualizationMode for ParticlesMode {
    fn id(&self) -> ModeId {
        ModeId::Particles
    }

    fn state(&self) -> ModeState {
        self.nodes.state
    }

    fn build(&mut self, scene: &mut Scene) {
        self.nodes.activate(scene);
        let p = &self.params;
        let geometry = Geometry::from_positions(particle_cloud(p.count, p.extent, p.seed));
        let material = Material::Points {
            color: Some(Color::from_hex(p.color)),
            size: p.point_size,
            sizing: PointSizing::Perspective,
            opacity: p.opacity,
            round: false,
            additive: false,
        };
        let cloud = Object3d::new(Primitive::Points, geometry, material);
        self.points = Some(self.nodes.add(scene, SceneNode::Object(cloud)));
    }

    fn update(&mut self, scene: &mut Scene, input: &FrameInput<'_>) {
        if !self.nodes.is_active() {
            return;
        }
        let Some(cloud) = self.points.and_then(|id| scene.object_mut(id)) else {
            return;
        };
        // Points themselves never move; the whole cloud turns and scales
        cloud.transform.rotation.y += self.params.rotation_step_rad;
        cloud.transform.scale = 1.0 + input.spectrum.bass * self.params.bass_scale;
    }

    fn teardown(&mut self, scene: &mut Scene) {
        self.nodes.release(scene);
        self.points = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{SpectrumFrame, BIN_COUNT};

    #[test]
    fn test_point_count_is_stable() {
        let mut scene = Scene::new();
        let mut mode = ParticlesMode::new(ParticleParams {
            seed: Some(3),
            ..ParticleParams::default()
        });
        mode.build(&mut scene);
        let before = scene.object(mode.points().unwrap()).unwrap().clone();

        let spectrum = SpectrumFrame::from_bins([200; BIN_COUNT]);
        let input = FrameInput {
            spectrum: &spectrum,
            video: None,
            dt: 0.016,
        };
        for _ in 0..100 {
            mode.update(&mut scene, &input);
        }

        let after = scene.object(mode.points().unwrap()).unwrap();
        assert_eq!(after.geometry.vertex_count(), 5000);
        assert_eq!(after.geometry, before.geometry);
        assert!((after.transform.rotation.y - 0.2).abs() < 1e-4);
        assert!((after.transform.scale - (1.0 + 200.0 / 255.0 * 0.5)).abs() < 1e-6);
    }
}
