//! Error types for device acquisition, rendering and configuration.
//!
//! None of these reach the frame loop: audio and video failures degrade to
//! zeroed input, and render errors are logged per frame.

use std::path::PathBuf;
use thiserror::Error;

/// Audio capture failures (device handshake and recording)
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Invalid analyser config: {0}")]
    InvalidConfig(String),

    #[error("No input device matching '{0}'")]
    DeviceNotFound(String),

    #[error("No default input device found")]
    NoDefaultDevice,

    #[error("Failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("Failed to get input config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to start input stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to create WAV writer: {0}")]
    Wav(#[from] hound::Error),
}

/// Video source failures
#[derive(Debug, Error)]
pub enum VideoError {
    #[error("Failed to load video frame from {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Video frame buffer does not match {width}x{height} RGB")]
    Empty { width: u32, height: u32 },
}

/// GPU and surface failures
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("Failed to find suitable GPU adapter")]
    NoAdapter,

    #[error("Failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("Surface error: {0}")]
    Frame(#[from] wgpu::SurfaceError),

    #[error("Failed to save frame {path}: {source}")]
    Capture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Config file failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
