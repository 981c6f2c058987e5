//! vibescope library - audio-reactive 3D visualizer

pub mod acquisition;
pub mod audio;
pub mod camera;
pub mod config;
pub mod error;
pub mod modes;
pub mod params;
pub mod render_loop;
pub mod rendering;
pub mod scene;
pub mod scene_manager;
pub mod video;
