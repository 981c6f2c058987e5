//! Wireframe icosahedron that spins and swells with the bass.

use super::geometry::icosahedron;
use super::{FrameInput, ModeId, ModeState, OwnedNodes, VisualizationMode};
use crate::params::SimpleParams;
use crate::scene::{Geometry, Material, NodeId, Object3d, Primitive, Scene, SceneNode};

pub struct SimpleMode {
    params: SimpleParams,
    nodes: OwnedNodes,
    mesh: Option<NodeId>,
}

impl SimpleMode {
    pub fn new(params: SimpleParams) -> Self {
        Self {
            params,
            nodes: OwnedNodes::default(),
            mesh: None,
        }
    }

    pub fn mesh(&self) -> Option<NodeId> {
        self.mesh
    }
}

impl VisualizationMode for SimpleMode {
    fn id(&self) -> ModeId {
        ModeId::Simple
    }

    fn state(&self) -> ModeState {
        self.nodes.state
    }

    fn build(&mut self, scene: &mut Scene) {
        self.nodes.activate(scene);
        let positions = icosahedron(self.params.radius, self.params.detail);
        let geometry = Geometry::from_positions(positions);
        let mesh = Object3d::new(Primitive::Wireframe, geometry, Material::Normal);
        self.mesh = Some(self.nodes.add(scene, SceneNode::Object(mesh)));
    }

    fn update(&mut self, scene: &mut Scene, input: &FrameInput<'_>) {
        if !self.nodes.is_active() {
            return;
        }
        let Some(mesh) = self.mesh.and_then(|id| scene.object_mut(id)) else {
            return;
        };

        let step = self.params.rotation_step_rad;
        mesh.transform.rotation.x += step;
        mesh.transform.rotation.y += step;
        mesh.transform.scale = 1.0 + input.spectrum.bass;
    }

    fn teardown(&mut self, scene: &mut Scene) {
        self.nodes.release(scene);
        self.mesh = None;
    }
}
