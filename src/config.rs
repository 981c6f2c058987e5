//! Optional TOML settings file, merged with command-line overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::modes::ModeId;
use crate::params::RenderConfig;

const FILE_NAME: &str = "vibescope.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub window: WindowConfig,
    /// Mode shown at start-up
    #[serde(default)]
    pub mode: Option<ModeId>,
    #[serde(default)]
    pub audio: AudioInputConfig,
    #[serde(default)]
    pub video: VideoConfig,
}

#[derive(Debug, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct AudioInputConfig {
    /// Case-insensitive substring of the input device name
    #[serde(default)]
    pub device: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VideoConfig {
    /// Still image used as the video feed
    #[serde(default)]
    pub image: Option<PathBuf>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

fn default_width() -> u32 {
    RenderConfig::default().window_width
}

fn default_height() -> u32 {
    RenderConfig::default().window_height
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Explicit path, else `./vibescope.toml`, else the platform config dir
pub fn find_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }
    let local = PathBuf::from(FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("vibescope").join("config.toml"))
        .filter(|path| path.exists())
}

/// Values given on the command line; `None` defers to the file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub mode: Option<ModeId>,
    pub device: Option<String>,
    pub video_image: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Fully resolved start-up settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub render: RenderConfig,
    pub mode: ModeId,
    pub device: Option<String>,
    pub video_image: Option<PathBuf>,
}

impl Config {
    /// Merge with command-line values; the command line wins when given
    pub fn resolve(self, overrides: Overrides) -> Settings {
        let render = RenderConfig {
            window_width: overrides.width.unwrap_or(self.window.width),
            window_height: overrides.height.unwrap_or(self.window.height),
            ..RenderConfig::default()
        };
        Settings {
            render,
            mode: overrides.mode.or(self.mode).unwrap_or_default(),
            device: overrides.device.or(self.audio.device),
            video_image: overrides.video_image.or(self.video.image),
        }
    }
}
