//! Per-mode geometry, motion and material constants.
//!
//! Lengths are in scene units (the camera sits 30 units from the origin),
//! rotations in radians per frame.

/// Rotating icosahedron scaled by bass
#[derive(Debug, Clone)]
pub struct SimpleParams {
    /// Icosahedron radius
    pub radius: f32,

    /// Subdivision level (each face split into (detail+1)^2 triangles)
    pub detail: u32,

    /// Rotation added to the x and y axes every frame (radians)
    pub rotation_step_rad: f32,
}

impl Default for SimpleParams {
    fn default() -> Self {
        Self {
            radius: 10.0,
            detail: 4,
            rotation_step_rad: 0.005,
        }
    }
}

/// Sphere whose vertices are pushed outward by spectrum bins
#[derive(Debug, Clone)]
pub struct ChaoticParams {
    /// Sphere radius
    pub radius: f32,

    /// Longitude segments
    pub width_segments: u32,

    /// Latitude segments
    pub height_segments: u32,

    /// Vertex index wraps onto the lowest `bin_wrap` spectrum bins
    pub bin_wrap: usize,

    /// Formula: displacement = bin * displacement_scale * (bass + bass_offset)
    pub displacement_scale: f32,

    /// Keeps the surface moving when there is no bass
    pub bass_offset: f32,

    /// Rotation added to the z and x axes every frame (radians)
    pub rotation_step_rad: f32,

    /// Formula: hue = bass * hue_scale
    pub hue_scale: f32,

    pub saturation: f32,
    pub lightness: f32,

    /// Material colour before the first update (0xRRGGBB)
    pub base_color: u32,
    pub roughness: f32,
    pub metalness: f32,

    /// Ambient light colour (0xRRGGBB)
    pub ambient_color: u32,

    /// Directional light position (direction towards origin)
    pub directional_position: [f32; 3],
    pub directional_intensity: f32,

    /// Point light colour (0xRRGGBB), placed at the origin
    pub point_color: u32,
    pub point_intensity: f32,

    /// Point light cutoff distance
    pub point_distance: f32,
}

impl Default for ChaoticParams {
    fn default() -> Self {
        Self {
            radius: 10.0,
            width_segments: 64,
            height_segments: 64,
            bin_wrap: 256,
            displacement_scale: 5.0,
            bass_offset: 0.5,
            rotation_step_rad: 0.002,
            hue_scale: 0.5,
            saturation: 1.0,
            lightness: 0.5,
            base_color: 0xff0055,
            roughness: 0.4,
            metalness: 0.8,
            ambient_color: 0x404040,
            directional_position: [1.0, 1.0, 1.0],
            directional_intensity: 1.0,
            point_color: 0x00ffcc,
            point_intensity: 2.0,
            point_distance: 50.0,
        }
    }
}

/// Static particle cloud that breathes with the bass
#[derive(Debug, Clone)]
pub struct ParticleParams {
    /// Number of points (constant for the mode's lifetime)
    pub count: usize,

    /// Side length of the cube the points are sampled in
    pub extent: f32,

    /// Formula: scale = 1 + bass * bass_scale
    pub bass_scale: f32,

    /// Rotation added to the y axis every frame (radians)
    pub rotation_step_rad: f32,

    /// Point size before perspective attenuation
    pub point_size: f32,
    pub opacity: f32,

    /// Point colour (0xRRGGBB)
    pub color: u32,

    /// RNG seed; `None` samples a fresh cloud on every build
    pub seed: Option<u64>,
}

impl Default for ParticleParams {
    fn default() -> Self {
        Self {
            count: 5000,
            extent: 100.0,
            bass_scale: 0.5,
            rotation_step_rad: 0.002,
            point_size: 0.5,
            opacity: 0.8,
            color: 0x00ffff,
            seed: None,
        }
    }
}

/// Point grid displaced by video luminance
#[derive(Debug, Clone)]
pub struct WebcamParams {
    /// Grid columns (lower than the video width to keep the point count sane)
    pub columns: usize,

    /// Grid rows
    pub rows: usize,

    /// Grid width in scene units (height keeps the grid aspect)
    pub extent: f32,

    /// Formula: z = luminance * displacement_scale * (bass + bass_offset)
    pub displacement_scale: f32,
    pub bass_offset: f32,

    /// Formula: size = (base_point_size + bass * bass_point_scale) * (attenuation / -depth)
    pub base_point_size: f32,
    pub bass_point_scale: f32,
    pub size_attenuation: f32,

    /// Time uniform advance per frame
    pub time_step: f32,
}

impl Default for WebcamParams {
    fn default() -> Self {
        Self {
            columns: 160,
            rows: 120,
            extent: 50.0,
            displacement_scale: 10.0,
            bass_offset: 0.2,
            base_point_size: 2.0,
            bass_point_scale: 5.0,
            size_attenuation: 30.0,
            time_step: 0.05,
        }
    }
}

/// Spectrum drawn as an open polyline
#[derive(Debug, Clone)]
pub struct WaveformParams {
    /// Polyline vertices (one per spectrum bin)
    pub segments: usize,

    /// Total x span, centred on the origin
    pub span: f32,

    /// Formula: y = bin / 255 * height_scale
    pub height_scale: f32,

    /// Line colour (0xRRGGBB)
    pub color: u32,
}

impl Default for WaveformParams {
    fn default() -> Self {
        Self {
            segments: 512,
            span: 40.0,
            height_scale: 10.0,
            color: 0x00ff00,
        }
    }
}

/// Parameters for every visualization mode
#[derive(Debug, Clone, Default)]
pub struct ModeParams {
    pub simple: SimpleParams,
    pub chaotic: ChaoticParams,
    pub particles: ParticleParams,
    pub webcam: WebcamParams,
    pub waveform: WaveformParams,
}
