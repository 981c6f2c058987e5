//! Per-refresh driver: advance the scene one frame, then draw it once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::camera::Camera;
use crate::scene::Scene;
use crate::scene_manager::SceneManager;

/// Anything that can present the scene from a camera
pub trait DrawTarget {
    type Error;

    /// Returns `Ok(false)` when the frame was skipped without being presented
    fn draw(&mut self, scene: &Scene, camera: &Camera) -> Result<bool, Self::Error>;
}

/// Shared stop flag; once stopped, every clone reports stopped
#[derive(Clone, Debug, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Drives [`SceneManager::on_frame`] and one draw per display refresh
pub struct RenderLoop {
    stop: StopToken,
    last_tick: Option<Instant>,
    /// Presented frames
    frames: u64,
    /// Stop on its own after this many presented frames
    frame_limit: Option<u64>,
    /// Use a constant frame time instead of the wall clock
    fixed_dt: Option<f32>,
}

impl RenderLoop {
    pub fn new(stop: StopToken) -> Self {
        Self {
            stop,
            last_tick: None,
            frames: 0,
            frame_limit: None,
            fixed_dt: None,
        }
    }

    /// Offline pacing: `frames` ticks at a constant `1 / fps` each
    pub fn with_frame_limit(mut self, frames: u64, fps: u32) -> Self {
        self.frame_limit = Some(frames);
        self.fixed_dt = Some(1.0 / fps.max(1) as f32);
        self
    }

    pub fn stop_token(&self) -> &StopToken {
        &self.stop
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Advance and draw one frame
    ///
    /// Returns `Ok(false)` without touching the scene once stopped. A draw
    /// error is returned after the frame has already advanced. Skipped draws
    /// do not count towards the frame limit.
    pub fn tick<D: DrawTarget>(
        &mut self,
        manager: &mut SceneManager,
        target: &mut D,
    ) -> Result<bool, D::Error> {
        if self.stop.is_stopped() {
            return Ok(false);
        }

        let now = Instant::now();
        let dt = match (self.fixed_dt, self.last_tick) {
            (Some(dt), _) => dt,
            (None, Some(last)) => now.duration_since(last).as_secs_f32(),
            (None, None) => 0.0,
        };
        self.last_tick = Some(now);

        manager.on_frame(dt);
        if !target.draw(manager.scene(), manager.camera())? {
            return Ok(true);
        }

        self.frames += 1;
        if self.frame_limit.is_some_and(|limit| self.frames >= limit) {
            log::info!("Frame limit reached after {} frames", self.frames);
            self.stop.stop();
        }
        Ok(true)
    }
}
