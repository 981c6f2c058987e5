//! Scene graph handed to the renderer.
//!
//! A flat set of objects and lights keyed by [`NodeId`]. Ids are never
//! reused, so a stale id held after teardown can only miss, never alias a
//! newer node.

use glam::{EulerRot, Mat4, Quat, Vec3};
use std::collections::BTreeMap;

/// Linear-ish RGB colour, components 0.0-1.0
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// From 0xRRGGBB
    pub fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    /// From hue, saturation, lightness (all 0.0-1.0, hue wraps)
    pub fn from_hsl(h: f32, s: f32, l: f32) -> Self {
        let h = h.rem_euclid(1.0);
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);
        if s == 0.0 {
            return Self::rgb(l, l, l);
        }
        let q = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        Self {
            r: hue_to_rgb(p, q, h + 1.0 / 3.0),
            g: hue_to_rgb(p, q, h),
            b: hue_to_rgb(p, q, h - 1.0 / 3.0),
        }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

fn hue_to_rgb(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}

/// Euler XYZ rotation (radians) and uniform scale
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub rotation: Vec3,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            rotation: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), rotation, Vec3::ZERO)
    }
}

/// How an object's vertices are assembled
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    /// Non-indexed triangle list drawn as edges
    Wireframe,
    /// Open polyline through consecutive vertices
    LineStrip,
    /// One sprite per vertex
    Points,
}

/// Vertex attributes; `colors` and `uvs` match `positions` in length when present
///
/// Normals are not stored: every shaded surface here is star-shaped around
/// its origin, so the renderer takes the normalised object-space position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub colors: Option<Vec<[f32; 3]>>,
    pub uvs: Option<Vec<[f32; 2]>>,
    /// Triangle indices for [`Primitive::Wireframe`]; `None` means consecutive triples
    pub indices: Option<Vec<u32>>,
}

impl Geometry {
    pub fn from_positions(positions: Vec<[f32; 3]>) -> Self {
        Self {
            positions,
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Vertex index triples, whether indexed or not
    pub fn triangles(&self) -> Vec<[u32; 3]> {
        match &self.indices {
            Some(indices) => indices
                .chunks_exact(3)
                .map(|t| [t[0], t[1], t[2]])
                .collect(),
            None => (0..self.positions.len() as u32 / 3)
                .map(|t| [t * 3, t * 3 + 1, t * 3 + 2])
                .collect(),
        }
    }
}

/// Point sprite size rule
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointSizing {
    /// `size * (viewport_height / 2) / -depth` pixels
    Perspective,
    /// `size * (constant / -depth)` pixels
    Attenuated(f32),
}

/// Surface appearance
#[derive(Clone, Debug, PartialEq)]
pub enum Material {
    /// Colour from the surface normal
    Normal,
    /// Lit by the scene lights
    Standard {
        color: Color,
        roughness: f32,
        metalness: f32,
    },
    /// Flat line colour
    Line { color: Color },
    /// Point sprites; `color: None` uses per-vertex colours
    Points {
        color: Option<Color>,
        size: f32,
        sizing: PointSizing,
        opacity: f32,
        /// Discard fragments outside a circle of radius 0.5 in sprite space
        round: bool,
        additive: bool,
    },
}

/// A drawable object
#[derive(Clone, Debug, PartialEq)]
pub struct Object3d {
    pub primitive: Primitive,
    pub geometry: Geometry,
    pub material: Material,
    pub transform: Transform,
}

impl Object3d {
    pub fn new(primitive: Primitive, geometry: Geometry, material: Material) -> Self {
        Self {
            primitive,
            geometry,
            material,
            transform: Transform::default(),
        }
    }
}

/// Scene lights
#[derive(Clone, Debug, PartialEq)]
pub enum Light {
    Ambient {
        color: Color,
    },
    /// Shines from `position` towards the origin
    Directional {
        color: Color,
        intensity: f32,
        position: Vec3,
    },
    Point {
        color: Color,
        intensity: f32,
        /// Cutoff distance; 0 means unbounded
        distance: f32,
        position: Vec3,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum SceneNode {
    Object(Object3d),
    Light(Light),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

/// Owner of every object and light the modes create
#[derive(Debug, Default)]
pub struct Scene {
    nodes: BTreeMap<NodeId, SceneNode>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: SceneNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    pub fn add_object(&mut self, object: Object3d) -> NodeId {
        self.add(SceneNode::Object(object))
    }

    pub fn add_light(&mut self, light: Light) -> NodeId {
        self.add(SceneNode::Light(light))
    }

    pub fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        self.nodes.remove(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn object(&self, id: NodeId) -> Option<&Object3d> {
        match self.nodes.get(&id) {
            Some(SceneNode::Object(object)) => Some(object),
            _ => None,
        }
    }

    pub fn object_mut(&mut self, id: NodeId) -> Option<&mut Object3d> {
        match self.nodes.get_mut(&id) {
            Some(SceneNode::Object(object)) => Some(object),
            _ => None,
        }
    }

    pub fn objects(&self) -> impl Iterator<Item = (NodeId, &Object3d)> {
        self.nodes.iter().filter_map(|(id, node)| match node {
            SceneNode::Object(object) => Some((*id, object)),
            SceneNode::Light(_) => None,
        })
    }

    pub fn lights(&self) -> impl Iterator<Item = &Light> {
        self.nodes.values().filter_map(|node| match node {
            SceneNode::Light(light) => Some(light),
            SceneNode::Object(_) => None,
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn object_count(&self) -> usize {
        self.objects().count()
    }

    pub fn light_count(&self) -> usize {
        self.lights().count()
    }

    /// Total vertices across all objects
    pub fn vertex_count(&self) -> usize {
        self.objects()
            .map(|(_, object)| object.geometry.vertex_count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_color(c: Color, r: f32, g: f32, b: f32) {
        assert!((c.r - r).abs() < 1e-5, "r {} != {}", c.r, r);
        assert!((c.g - g).abs() < 1e-5, "g {} != {}", c.g, g);
        assert!((c.b - b).abs() < 1e-5, "b {} != {}", c.b, b);
    }

    #[test]
    fn test_hex_colors() {
        assert_color(Color::from_hex(0xff0055), 1.0, 0.0, 85.0 / 255.0);
        assert_color(Color::from_hex(0x00ffcc), 0.0, 1.0, 0.8);
    }

    #[test]
    fn test_hsl_primaries() {
        assert_color(Color::from_hsl(0.0, 1.0, 0.5), 1.0, 0.0, 0.0);
        assert_color(Color::from_hsl(1.0 / 3.0, 1.0, 0.5), 0.0, 1.0, 0.0);
        assert_color(Color::from_hsl(0.5, 1.0, 0.5), 0.0, 1.0, 1.0);
        assert_color(Color::from_hsl(0.25, 0.0, 0.3), 0.3, 0.3, 0.3);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut scene = Scene::new();
        let a = scene.add_light(Light::Ambient {
            color: Color::WHITE,
        });
        scene.remove(a);
        let b = scene.add_light(Light::Ambient {
            color: Color::WHITE,
        });
        assert_ne!(a, b);
        assert!(!scene.contains(a));
        assert!(scene.contains(b));
    }

    #[test]
    fn test_counts_split_objects_and_lights() {
        let mut scene = Scene::new();
        scene.add_object(Object3d::new(
            Primitive::Points,
            Geometry::from_positions(vec![[0.0; 3]; 4]),
            Material::Normal,
        ));
        scene.add_light(Light::Ambient {
            color: Color::WHITE,
        });
        assert_eq!(scene.node_count(), 2);
        assert_eq!(scene.object_count(), 1);
        assert_eq!(scene.light_count(), 1);
        assert_eq!(scene.vertex_count(), 4);
    }

    #[test]
    fn test_triangles_indexed_and_flat() {
        let flat = Geometry::from_positions(vec![[0.0; 3]; 6]);
        assert_eq!(flat.triangles(), vec![[0, 1, 2], [3, 4, 5]]);

        let indexed = Geometry {
            indices: Some(vec![0, 1, 2, 2, 1, 3]),
            ..Geometry::from_positions(vec![[0.0; 3]; 4])
        };
        assert_eq!(indexed.triangles(), vec![[0, 1, 2], [2, 1, 3]]);
    }

    #[test]
    fn test_transform_matrix_scales_and_rotates() {
        let transform = Transform {
            rotation: Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0),
            scale: 2.0,
        };
        let p = transform.matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-5);
    }
}
