//! Baseline vertex generators for the visualization modes.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;

use crate::scene::Geometry;

/// Unit icosahedron corners (before normalisation)
fn icosahedron_corners() -> [Vec3; 12] {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    [
        Vec3::new(-1.0, t, 0.0),
        Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0),
        Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t),
        Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t),
        Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0),
        Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0),
        Vec3::new(-t, 0.0, 1.0),
    ]
}

const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// Geodesic sphere as a non-indexed triangle list
///
/// Each of the 20 faces is split into `(detail + 1)^2` triangles and every
/// vertex is pushed onto the sphere, giving `20 * (detail + 1)^2 * 3` vertices.
pub fn icosahedron(radius: f32, detail: u32) -> Vec<[f32; 3]> {
    let corners = icosahedron_corners();
    let cols = detail as usize + 1;
    let mut positions = Vec::with_capacity(20 * cols * cols * 3);

    for face in ICOSAHEDRON_FACES {
        let (a, b, c) = (corners[face[0]], corners[face[1]], corners[face[2]]);

        // Row i runs from the a-c edge to the b-c edge with cols - i + 1 points
        let rows: Vec<Vec<Vec3>> = (0..=cols)
            .map(|i| {
                let t = i as f32 / cols as f32;
                let left = a.lerp(c, t);
                let right = b.lerp(c, t);
                let steps = cols - i;
                (0..=steps)
                    .map(|j| {
                        if steps == 0 {
                            left
                        } else {
                            left.lerp(right, j as f32 / steps as f32)
                        }
                    })
                    .collect()
            })
            .collect();

        for i in 0..cols {
            for j in 0..2 * (cols - i) - 1 {
                let k = j / 2;
                let tri = if j % 2 == 0 {
                    [rows[i][k + 1], rows[i + 1][k], rows[i][k]]
                } else {
                    [rows[i][k + 1], rows[i + 1][k + 1], rows[i + 1][k]]
                };
                for v in tri {
                    positions.push((v.normalize() * radius).to_array());
                }
            }
        }
    }

    positions
}

/// Latitude/longitude sphere with shared vertices
///
/// Vertices run pole to pole, `width_segments + 1` per ring (the seam is
/// duplicated), so there are `(w + 1) * (h + 1)` of them. Degenerate pole
/// triangles are skipped.
pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> Geometry {
    let w = width_segments.max(3);
    let h = height_segments.max(2);
    let mut positions = Vec::with_capacity(((w + 1) * (h + 1)) as usize);

    for iy in 0..=h {
        let v = iy as f32 / h as f32;
        for ix in 0..=w {
            let u = ix as f32 / w as f32;
            positions.push([
                -radius * (u * 2.0 * PI).cos() * (v * PI).sin(),
                radius * (v * PI).cos(),
                radius * (u * 2.0 * PI).sin() * (v * PI).sin(),
            ]);
        }
    }

    let ring = w + 1;
    let mut indices = Vec::with_capacity((w * h * 6) as usize);
    for iy in 0..h {
        for ix in 0..w {
            let a = iy * ring + ix + 1;
            let b = iy * ring + ix;
            let c = (iy + 1) * ring + ix;
            let d = (iy + 1) * ring + ix + 1;
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != h - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    Geometry {
        indices: Some(indices),
        ..Geometry::from_positions(positions)
    }
}

/// `count` points uniform in an axis-aligned cube of side `extent` centred at the origin
pub fn particle_cloud(count: usize, extent: f32, seed: Option<u64>) -> Vec<[f32; 3]> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    (0..count)
        .map(|_| {
            [
                (rng.gen::<f32>() - 0.5) * extent,
                (rng.gen::<f32>() - 0.5) * extent,
                (rng.gen::<f32>() - 0.5) * extent,
            ]
        })
        .collect()
}

/// Flat point grid in the z = 0 plane, row-major from the bottom row
///
/// Width is `extent`; height keeps the `rows / columns` aspect. UVs are
/// `(col / columns, row / rows)`.
pub fn point_grid(columns: usize, rows: usize, extent: f32) -> Geometry {
    let aspect = rows as f32 / columns as f32;
    let mut positions = Vec::with_capacity(columns * rows);
    let mut uvs = Vec::with_capacity(columns * rows);

    for row in 0..rows {
        for col in 0..columns {
            let u = col as f32 / columns as f32;
            let v = row as f32 / rows as f32;
            positions.push([(u - 0.5) * extent, (v - 0.5) * extent * aspect, 0.0]);
            uvs.push([u, v]);
        }
    }

    Geometry {
        uvs: Some(uvs),
        ..Geometry::from_positions(positions)
    }
}

/// Flat polyline of `segments` points spanning `span` along x
pub fn polyline(segments: usize, span: f32) -> Vec<[f32; 3]> {
    let last = segments.saturating_sub(1).max(1) as f32;
    (0..segments)
        .map(|i| [(i as f32 / last - 0.5) * span, 0.0, 0.0])
        .collect()
}
