//! Lit wireframe sphere whose vertices are pushed outward by spectrum bins.

use glam::Vec3;

use super::geometry::uv_sphere;
use super::{FrameInput, ModeId, ModeState, OwnedNodes, VisualizationMode};
use crate::params::ChaoticParams;
use crate::scene::{Color, Light, Material, NodeId, Object3d, Primitive, Scene, SceneNode};

pub struct ChaoticMode {
    params: ChaoticParams,
    nodes: OwnedNodes,
    mesh: Option<NodeId>,
    /// Undisplaced vertex positions, fixed at build
    baseline: Vec<Vec3>,
}

impl ChaoticMode {
    pub fn new(params: ChaoticParams) -> Self {
        Self {
            params,
            nodes: OwnedNodes::default(),
            mesh: None,
            baseline: Vec::new(),
        }
    }

    pub fn mesh(&self) -> Option<NodeId> {
        self.mesh
    }

    /// Outward offset of vertex `index` for the given spectrum
    ///
    /// Formula: bins[index % bin_wrap] / 255 * displacement_scale * (bass + bass_offset)
    pub fn displacement(&self, index: usize, bins: &[u8], bass: f32) -> f32 {
        let wrap = self.params.bin_wrap.clamp(1, bins.len().max(1));
        let level = bins.get(index % wrap).copied().unwrap_or(0) as f32 / 255.0;
        level * self.params.displacement_scale * (bass + self.params.bass_offset)
    }
}

impl VisualizationMode for ChaoticMode {
    fn id(&self) -> ModeId {
        ModeId::Chaotic
    }

    fn state(&self) -> ModeState {
        self.nodes.state
    }

    fn build(&mut self, scene: &mut Scene) {
        self.nodes.activate(scene);
        let p = &self.params;

        let geometry = uv_sphere(p.radius, p.width_segments, p.height_segments);
        self.baseline = geometry
            .positions
            .iter()
            .map(|&v| Vec3::from_array(v))
            .collect();

        let material = Material::Standard {
            color: Color::from_hex(p.base_color),
            roughness: p.roughness,
            metalness: p.metalness,
        };
        let mesh = Object3d::new(Primitive::Wireframe, geometry, material);

        let lights = [
            Light::Ambient {
                color: Color::from_hex(p.ambient_color),
            },
            Light::Directional {
                color: Color::WHITE,
                intensity: p.directional_intensity,
                position: Vec3::from_array(p.directional_position),
            },
            Light::Point {
                color: Color::from_hex(p.point_color),
                intensity: p.point_intensity,
                distance: p.point_distance,
                position: Vec3::ZERO,
            },
        ];
        for light in lights {
            self.nodes.add(scene, SceneNode::Light(light));
        }
        self.mesh = Some(self.nodes.add(scene, SceneNode::Object(mesh)));
    }

    fn update(&mut self, scene: &mut Scene, input: &FrameInput<'_>) {
        if !self.nodes.is_active() {
            return;
        }
        let Some(id) = self.mesh else {
            return;
        };
        let bins = input.spectrum.bins();
        let bass = input.spectrum.bass;
        let offsets: Vec<f32> = (0..self.baseline.len())
            .map(|i| self.displacement(i, bins, bass))
            .collect();

        let Some(mesh) = scene.object_mut(id) else {
            return;
        };
        let p = &self.params;
        mesh.transform.rotation.z += p.rotation_step_rad;
        mesh.transform.rotation.x += p.rotation_step_rad;

        for ((slot, base), offset) in mesh
            .geometry
            .positions
            .iter_mut()
            .zip(&self.baseline)
            .zip(offsets)
        {
            // A vertex at the centre has no outward direction and stays put
            let direction = base.normalize_or_zero();
            *slot = (*base + direction * offset).to_array();
        }

        if let Material::Standard { color, .. } = &mut mesh.material {
            *color = Color::from_hsl(bass * p.hue_scale, p.saturation, p.lightness);
        }
    }

    fn teardown(&mut self, scene: &mut Scene) {
        self.nodes.release(scene);
        self.mesh = None;
        self.baseline.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{SpectrumFrame, BIN_COUNT};

    fn run_frame(bins: [u8; BIN_COUNT]) -> (Scene, ChaoticMode) {
        run_frame_with(ChaoticParams::default(), bins)
    }

    fn run_frame_with(params: ChaoticParams, bins: [u8; BIN_COUNT]) -> (Scene, ChaoticMode) {
        let mut scene = Scene::new();
        let mut mode = ChaoticMode::new(params);
        mode.build(&mut scene);
        let spectrum = SpectrumFrame::from_bins(bins);
        mode.update(
            &mut scene,
            &FrameInput {
                spectrum: &spectrum,
                video: None,
                dt: 0.016,
            },
        );
        (scene, mode)
    }

    fn offset_of(scene: &Scene, mode: &ChaoticMode, i: usize) -> f32 {
        let mesh = scene.object(mode.mesh().unwrap()).unwrap();
        (Vec3::from_array(mesh.geometry.positions[i]) - mode.baseline[i]).length()
    }

    #[test]
    fn test_adds_three_lights() {
        let (scene, _) = run_frame([0; BIN_COUNT]);
        assert_eq!(scene.light_count(), 3);
        assert_eq!(scene.object_count(), 1);
    }

    #[test]
    fn test_silent_bins_leave_vertices_in_place() {
        // Only bins 1 and 3 are loud; every other wrapped bin is silent
        let mut bins = [0u8; BIN_COUNT];
        bins[1] = 255;
        bins[3] = 255;
        let (scene, mode) = run_frame(bins);
        for i in 0..mode.baseline.len() {
            let offset = offset_of(&scene, &mode, i);
            match i % 256 {
                1 | 3 => assert!(offset > 0.0),
                _ => assert!(offset < 1e-5, "vertex {} moved by {}", i, offset),
            }
        }
    }

    #[test]
    fn test_full_spectrum_displaces_by_seven_and_a_half() {
        let (scene, mode) = run_frame([255; BIN_COUNT]);
        for i in 0..mode.baseline.len() {
            let offset = offset_of(&scene, &mode, i);
            assert!((offset - 7.5).abs() < 1e-3, "vertex {} moved by {}", i, offset);
        }
    }

    #[test]
    fn test_vertex_at_centre_is_not_displaced() {
        let params = ChaoticParams {
            radius: 0.0,
            ..Default::default()
        };
        let (scene, mode) = run_frame_with(params, [255; BIN_COUNT]);
        let mesh = scene.object(mode.mesh().unwrap()).unwrap();
        assert!(!mesh.geometry.positions.is_empty());
        for p in &mesh.geometry.positions {
            assert!(p.iter().all(|c| c.is_finite()));
            assert_eq!(*p, [0.0; 3]);
        }
    }

    #[test]
    fn test_hue_follows_bass() {
        let (scene, mode) = run_frame([0; BIN_COUNT]);
        let mesh = scene.object(mode.mesh().unwrap()).unwrap();
        // bass 0 gives hue 0: pure red
        assert_eq!(
            mesh.material,
            Material::Standard {
                color: Color::from_hsl(0.0, 1.0, 0.5),
                roughness: 0.4,
                metalness: 0.8,
            }
        );
    }

    #[test]
    fn test_bin_index_wraps_at_256() {
        let mode = ChaoticMode::new(ChaoticParams::default());
        let mut bins = [0u8; BIN_COUNT];
        bins[5] = 255;
        assert_eq!(mode.displacement(5, &bins, 0.0), 2.5);
        assert_eq!(mode.displacement(261, &bins, 0.0), 2.5);
        assert_eq!(mode.displacement(6, &bins, 0.0), 0.0);
    }
}
