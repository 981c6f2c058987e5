//! Fixed perspective camera looking at the origin.

use glam::{Mat4, Vec3};

use crate::params::RenderConfig;

/// Perspective camera; only the aspect ratio changes after creation
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    fov_degrees: f32,
    aspect: f32,
    near: f32,
    far: f32,
}

impl Camera {
    /// Camera on the +Z axis at `camera_distance`, facing the origin
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, config.camera_distance),
            target: Vec3::ZERO,
            fov_degrees: config.fov_degrees,
            aspect: config.aspect_ratio(),
            near: config.near_plane,
            far: config.far_plane,
        }
    }

    /// Follow a window resize; zero sizes (minimised windows) are ignored
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn view(&self) -> Mat4 {
        // Always keep Y as up vector (camera never rolls)
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_camera_placement() {
        let camera = Camera::new(&RenderConfig::default());
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 30.0));
        assert!((camera.aspect() - 1280.0 / 720.0).abs() < 1e-6);
    }

    #[test]
    fn test_origin_projects_to_screen_centre() {
        let camera = Camera::new(&RenderConfig::default());
        let clip = camera.projection() * camera.view() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-6);
        assert!(ndc.y.abs() < 1e-6);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn test_view_space_depth_is_negative_in_front() {
        let camera = Camera::new(&RenderConfig::default());
        let p = camera.view().transform_point3(Vec3::ZERO);
        assert!((p.z + 30.0).abs() < 1e-5);
    }

    #[test]
    fn test_resize_updates_aspect_but_ignores_zero() {
        let mut camera = Camera::new(&RenderConfig::default());
        camera.set_viewport(800, 800);
        assert_eq!(camera.aspect(), 1.0);
        camera.set_viewport(0, 600);
        assert_eq!(camera.aspect(), 1.0);
    }
}
