//! vibescope - audio-reactive 3D visualizer
//!
//! Listens to an input device and turns its spectrum into one of five
//! animated scenes. Keys 1-5 switch modes, F11 toggles fullscreen, Esc quits.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

use cli::Args;
use vibescope::audio::{list_input_devices, AudioCapture, SpectrumSampler};
use vibescope::camera::Camera;
use vibescope::config::{find_config_path, load_config, Config, Settings};
use vibescope::modes::ModeId;
use vibescope::params::{ModeParams, RecordingConfig};
use vibescope::render_loop::{RenderLoop, StopToken};
use vibescope::rendering::RenderSystem;
use vibescope::scene_manager::SceneManager;
use vibescope::video::VideoFeed;

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Visualization
    manager: SceneManager,
    render_loop: RenderLoop,

    // Configuration
    settings: Settings,
    recording: Option<RecordingConfig>,

    /// Set when window or GPU setup fails; reported after the loop exits
    startup_error: Option<anyhow::Error>,
}

impl App {
    fn new(settings: Settings, recording: Option<RecordingConfig>) -> Self {
        let sampler = SpectrumSampler::new(AudioCapture::start(
            settings.device.clone(),
            recording.clone(),
        ));
        let video = VideoFeed::open_image(settings.video_image.clone());
        let manager = SceneManager::new(
            settings.mode,
            ModeParams::default(),
            Camera::new(&settings.render),
            sampler,
            video,
        );

        let render_loop = match &recording {
            Some(config) => RenderLoop::new(StopToken::new())
                .with_frame_limit(config.total_frames() as u64, config.fps),
            None => RenderLoop::new(StopToken::new()),
        };

        Self {
            window: None,
            render_system: None,
            manager,
            render_loop,
            settings,
            recording,
            startup_error: None,
        }
    }

    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        // Create window
        let window_attributes = Window::default_attributes()
            .with_title("vibescope")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.settings.render.window_width,
                self.settings.render.window_height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create window")?,
        );

        // Initialize rendering system
        let render_system = pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            self.recording.clone(),
        ))
        .context("Failed to initialise GPU")?;

        let (width, height) = render_system.size();
        self.manager.camera_mut().set_viewport(width, height);

        log::info!("vibescope is running: 1-5 switch modes, F11 fullscreen, Esc quits");

        self.window = Some(window);
        self.render_system = Some(render_system);
        Ok(())
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: KeyCode) {
        match key {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::F11 => self.toggle_fullscreen(),
            KeyCode::Digit1 => self.switch_mode(1),
            KeyCode::Digit2 => self.switch_mode(2),
            KeyCode::Digit3 => self.switch_mode(3),
            KeyCode::Digit4 => self.switch_mode(4),
            KeyCode::Digit5 => self.switch_mode(5),
            _ => {}
        }
    }

    fn switch_mode(&mut self, digit: u32) {
        if let Some(id) = ModeId::from_digit(digit) {
            self.manager.switch_mode(id);
        }
    }

    fn toggle_fullscreen(&self) {
        let Some(window) = &self.window else {
            return;
        };
        if window.fullscreen().is_some() {
            window.set_fullscreen(None);
        } else {
            window.set_fullscreen(Some(Fullscreen::Borderless(None)));
        }
    }

    /// Advance and draw a single frame
    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        let Some(render_system) = self.render_system.as_mut() else {
            return;
        };

        match self.render_loop.tick(&mut self.manager, render_system) {
            Ok(_) => {}
            Err(e) => log::error!("Render error: {}", e),
        }

        if self.render_loop.stop_token().is_stopped() {
            if let Some(config) = &self.recording {
                log::info!(
                    "Recording complete: {} frames in {}",
                    render_system.frames_captured(),
                    config.output_dir.display()
                );
            }
            event_loop.exit();
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }
        if let Err(e) = self.init_graphics(event_loop) {
            self.startup_error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(render_system) = self.render_system.as_mut() {
                    render_system.resize(size.width, size.height);
                }
                self.manager
                    .camera_mut()
                    .set_viewport(size.width, size.height);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(key),
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, key),
            WindowEvent::RedrawRequested => self.render_frame(event_loop),
            _ => {}
        }
    }
}

/// Settings file (if any) merged with the command line
fn load_settings(args: &Args) -> Settings {
    let config = match find_config_path(args.config.clone()) {
        Some(path) => match load_config(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{}; using defaults", e);
                Config::default()
            }
        },
        None => Config::default(),
    };
    config.resolve(args.overrides())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    if args.list_devices {
        println!("Input devices:");
        for name in list_input_devices().context("Failed to list input devices")? {
            println!("  {}", name);
        }
        return Ok(());
    }

    let settings = load_settings(&args);
    let recording = args.create_recording_config()?;
    if let Some(config) = &recording {
        log::info!(
            "Recording {:.1}s ({} frames at {} fps) to {}",
            config.duration_secs,
            config.total_frames(),
            config.fps,
            config.output_dir.display()
        );
    }

    let mut app = App::new(settings, recording);
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop
        .run_app(&mut app)
        .context("Event loop terminated abnormally")?;

    match app.startup_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
