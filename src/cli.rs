//! Command-line argument parsing.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use vibescope::config::Overrides;
use vibescope::modes::ModeId;
use vibescope::params::RecordingConfig;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "vibescope")]
#[command(about = "Audio-reactive 3D visualizer", long_about = None)]
pub struct Args {
    /// Visualization mode to start in
    #[arg(long, value_enum)]
    pub mode: Option<ModeId>,

    /// Settings file (default: ./vibescope.toml, then the user config dir)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Input device name (case-insensitive substring)
    #[arg(long, value_name = "NAME")]
    pub device: Option<String>,

    /// Image used as the video feed for webcam mode
    #[arg(long, value_name = "FILE")]
    pub video_image: Option<PathBuf>,

    /// Print available input devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Record frames and input audio (duration in seconds)
    #[arg(long, value_name = "SECONDS")]
    pub record: Option<f32>,

    /// Window width (pixels)
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height (pixels)
    #[arg(long)]
    pub height: Option<u32>,
}

impl Args {
    /// Command-line values that take precedence over the settings file
    pub fn overrides(&self) -> Overrides {
        Overrides {
            mode: self.mode,
            device: self.device.clone(),
            video_image: self.video_image.clone(),
            width: self.width,
            height: self.height,
        }
    }

    /// Create recording configuration if recording mode is enabled
    pub fn create_recording_config(&self) -> Result<Option<RecordingConfig>> {
        let Some(duration) = self.record else {
            return Ok(None);
        };
        anyhow::ensure!(
            duration > 0.0,
            "Recording duration must be positive, got {}",
            duration
        );
        let config = RecordingConfig::new(duration);

        // Create output directories
        std::fs::create_dir_all(config.frames_dir()).with_context(|| {
            format!(
                "Failed to create frames directory {}",
                config.frames_dir().display()
            )
        })?;

        Ok(Some(config))
    }
}
