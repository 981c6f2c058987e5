//! CPU-side packing of scene nodes into GPU vertex and uniform data.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use std::collections::HashSet;

use crate::camera::Camera;
use crate::scene::{Color, Geometry, Light, Material, Object3d, PointSizing, Primitive};

/// Vertex for wireframes and polylines
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
}

/// Per-instance data for one point sprite
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PointInstance {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

/// Fragment shading selector (`material.x` in the shaders)
pub const SHADING_FLAT: f32 = 0.0;
pub const SHADING_NORMAL: f32 = 1.0;
pub const SHADING_STANDARD: f32 = 2.0;

/// Uniform block shared by the line and point shaders
///
/// Every field is a vec4 or mat4 so the layout matches WGSL uniform rules
/// without manual padding.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct NodeUniforms {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    /// xyz = world position
    pub camera_position: [f32; 4],
    /// rgb + opacity
    pub color: [f32; 4],
    /// x = shading, y = roughness, z = metalness
    pub material: [f32; 4],
    /// x = size, y = sizing (0 perspective, 1 attenuated), z = attenuation, w = round
    pub point: [f32; 4],
    /// xy = viewport size in pixels
    pub viewport: [f32; 4],
    pub ambient: [f32; 4],
    /// rgb * intensity
    pub dir_color: [f32; 4],
    /// xyz = unit vector towards the light
    pub dir_direction: [f32; 4],
    /// rgb * intensity, w = cutoff distance (0 unbounded)
    pub point_color: [f32; 4],
    /// xyz = position, w = 1 when a point light exists
    pub point_position: [f32; 4],
}

/// Lights reduced to what the shaders consume
///
/// Ambient lights add up; only the first directional and the first point
/// light are used.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LightRig {
    pub ambient: [f32; 3],
    pub directional: Option<([f32; 3], Vec3)>,
    pub point: Option<([f32; 3], f32, Vec3)>,
}

impl LightRig {
    pub fn collect<'a>(lights: impl IntoIterator<Item = &'a Light>) -> Self {
        let mut rig = LightRig::default();
        for light in lights {
            match light {
                Light::Ambient { color } => {
                    rig.ambient[0] += color.r;
                    rig.ambient[1] += color.g;
                    rig.ambient[2] += color.b;
                }
                Light::Directional {
                    color,
                    intensity,
                    position,
                } if rig.directional.is_none() => {
                    rig.directional =
                        Some((scaled(*color, *intensity), position.normalize_or_zero()));
                }
                Light::Point {
                    color,
                    intensity,
                    distance,
                    position,
                } if rig.point.is_none() => {
                    rig.point = Some((scaled(*color, *intensity), *distance, *position));
                }
                _ => {}
            }
        }
        rig
    }
}

fn scaled(color: Color, intensity: f32) -> [f32; 3] {
    [color.r * intensity, color.g * intensity, color.b * intensity]
}

impl NodeUniforms {
    pub fn new(
        object: &Object3d,
        camera: &Camera,
        viewport: (u32, u32),
        lights: &LightRig,
    ) -> Self {
        let mut uniforms = NodeUniforms {
            view: camera.view().to_cols_array_2d(),
            proj: camera.projection().to_cols_array_2d(),
            model: object.transform.matrix().to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).to_array(),
            color: [1.0; 4],
            material: [SHADING_FLAT, 0.0, 0.0, 0.0],
            point: [0.0; 4],
            viewport: [viewport.0 as f32, viewport.1 as f32, 0.0, 0.0],
            ambient: [0.0; 4],
            dir_color: [0.0; 4],
            dir_direction: [0.0; 4],
            point_color: [0.0; 4],
            point_position: [0.0; 4],
        };

        match &object.material {
            Material::Normal => uniforms.material[0] = SHADING_NORMAL,
            Material::Standard {
                color,
                roughness,
                metalness,
            } => {
                uniforms.color = rgba(*color, 1.0);
                uniforms.material = [SHADING_STANDARD, *roughness, *metalness, 0.0];
                uniforms.ambient = pad(lights.ambient);
                if let Some((color, direction)) = lights.directional {
                    uniforms.dir_color = pad(color);
                    uniforms.dir_direction = direction.extend(0.0).to_array();
                }
                if let Some((color, distance, position)) = lights.point {
                    uniforms.point_color = [color[0], color[1], color[2], distance];
                    uniforms.point_position = position.extend(1.0).to_array();
                }
            }
            Material::Line { color } => uniforms.color = rgba(*color, 1.0),
            Material::Points {
                color,
                size,
                sizing,
                opacity,
                round,
                ..
            } => {
                uniforms.color = rgba(color.unwrap_or(Color::WHITE), *opacity);
                let (kind, attenuation) = match sizing {
                    PointSizing::Perspective => (0.0, 0.0),
                    PointSizing::Attenuated(k) => (1.0, *k),
                };
                uniforms.point = [*size, kind, attenuation, if *round { 1.0 } else { 0.0 }];
            }
        }
        uniforms
    }
}

fn rgba(color: Color, alpha: f32) -> [f32; 4] {
    [color.r, color.g, color.b, alpha]
}

fn pad(rgb: [f32; 3]) -> [f32; 4] {
    [rgb[0], rgb[1], rgb[2], 0.0]
}

/// Line-list indices for a wireframe or polyline; empty for points
///
/// Wireframe edges shared by two triangles are emitted once.
pub fn line_indices(primitive: Primitive, geometry: &Geometry) -> Vec<u32> {
    match primitive {
        Primitive::Wireframe => {
            let mut seen = HashSet::new();
            let mut indices = Vec::new();
            for [a, b, c] in geometry.triangles() {
                for (from, to) in [(a, b), (b, c), (c, a)] {
                    if seen.insert((from.min(to), from.max(to))) {
                        indices.extend_from_slice(&[from, to]);
                    }
                }
            }
            indices
        }
        Primitive::LineStrip => (1..geometry.vertex_count() as u32)
            .flat_map(|i| [i - 1, i])
            .collect(),
        Primitive::Points => Vec::new(),
    }
}

pub fn line_vertices(geometry: &Geometry) -> Vec<LineVertex> {
    geometry
        .positions
        .iter()
        .map(|&position| LineVertex { position })
        .collect()
}

/// Point sprites with per-vertex colours, or the material colour when absent
pub fn point_instances(object: &Object3d) -> Vec<PointInstance> {
    let fallback = match &object.material {
        Material::Points { color: Some(c), .. } => c.to_array(),
        _ => Color::WHITE.to_array(),
    };
    let colors = object.geometry.colors.as_deref().unwrap_or(&[]);
    object
        .geometry
        .positions
        .iter()
        .enumerate()
        .map(|(i, &position)| PointInstance {
            position,
            color: colors.get(i).copied().unwrap_or(fallback),
        })
        .collect()
}

/// Whether the object is drawn with additive blending
pub fn is_additive(material: &Material) -> bool {
    matches!(material, Material::Points { additive: true, .. })
}
