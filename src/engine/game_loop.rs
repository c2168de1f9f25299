//! Main loop timing and control
//!
//! Implements a fixed timestep loop with variable rendering. The physics
//! world always advances by the same `dt`, while rendering happens once per
//! iteration at whatever rate the display allows.

use glam::DVec2;
use log::{debug, info, warn};
use std::time::Instant;

use crate::engine::camera::{Camera, SharedCamera};
use crate::engine::config::EngineConfig;
use crate::engine::console::{Command, Console};
use crate::engine::physics::Simulation;
use crate::engine::scene::{Scene, SceneError};

/// Rounding slack, in seconds, when comparing accumulated time against a step
const ACCUMULATOR_EPSILON: f64 = 1e-9;

/// Length of the statistics window in seconds
const STATS_WINDOW: f64 = 1.0;

/// Source of monotonic time in seconds
pub trait Clock {
    fn now(&mut self) -> f64;
}

/// Wall clock backed by `Instant`
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&mut self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Input reported by the frontend after presenting a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrontendEvent {
    /// Viewport resized, in pixels
    Resized { width: f64, height: f64 },
    TogglePause,
    SingleStep,
    Quit,
    /// Pan the camera by a screen-space offset in pixels
    PanCamera(DVec2),
    /// Multiply the camera scale
    ZoomCamera(f64),
    /// Rotate the world clockwise, in degrees
    RotateCamera(f64),
}

/// Window, renderer and input, as seen by the loop
pub trait Frontend<W> {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether the presentation surface is still open
    fn is_open(&self) -> bool;

    /// Render callback: draw the scene through `camera`. Must not mutate simulation state.
    fn draw(&mut self, scene: &Scene<W>, camera: &Camera);

    /// Present the frame and collect pending input
    fn present(&mut self) -> Result<Vec<FrontendEvent>, Self::Error>;
}

/// Errors that stop the main loop
#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("Frontend failure: {0}")]
    Frontend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Flags flipped by input handling and console commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopFlags {
    pub running: bool,
    pub paused: bool,
    /// Run exactly one update while paused
    pub single_step: bool,
    pub print_fps: bool,
}

/// Statistics sampled over the last complete one-second window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    /// Frames rendered in the window
    pub fps: u32,
    /// Fixed steps drained in the window
    pub update_fps: u32,
    /// Average seconds per frame in the window
    pub avg_frame_time: f64,
}

/// Main loop scheduler state
pub struct GameLoop<C: Clock = SystemClock> {
    clock: C,

    /// Simulated seconds per update
    fixed_step: f64,

    /// Catch-up cap per iteration; `None` never drops time
    max_steps_per_frame: Option<u32>,

    /// Clock reading at the start of the previous iteration
    last_time: f64,

    /// Unconsumed real time for fixed updates
    accumulator: f64,

    /// Time accumulated in the current statistics window
    stats_accumulator: f64,

    /// Frames in the current statistics window
    frame_count: u32,

    /// Fixed steps in the current statistics window
    update_frame_count: u32,

    stats: FrameStats,
    flags: LoopFlags,

    /// Totals since creation
    total_frames: u64,
    total_updates: u64,
    simulated_time: f64,

    /// Camera restored by `camera reset`
    home_camera: Option<Camera>,
}

impl GameLoop<SystemClock> {
    /// Create a loop driven by the wall clock
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: Clock> GameLoop<C> {
    /// Create a loop driven by `clock`
    pub fn with_clock(config: &EngineConfig, mut clock: C) -> Self {
        let last_time = clock.now();
        Self {
            clock,
            fixed_step: config.fixed_step,
            max_steps_per_frame: config.max_steps_per_frame,
            last_time,
            accumulator: 0.0,
            stats_accumulator: 0.0,
            frame_count: 0,
            update_frame_count: 0,
            stats: FrameStats::default(),
            flags: LoopFlags {
                running: true,
                paused: config.start_paused,
                single_step: false,
                print_fps: config.print_fps,
            },
            total_frames: 0,
            total_updates: 0,
            simulated_time: 0.0,
            home_camera: None,
        }
    }

    /// Run until the running flag clears or the frontend closes
    pub fn run<W, F>(
        &mut self,
        scene: &mut Scene<W>,
        mut console: Option<&mut Console>,
        frontend: &mut F,
    ) -> Result<(), LoopError>
    where
        W: Simulation,
        F: Frontend<W>,
    {
        info!(
            "Entering main loop at {:.1} updates per second",
            1.0 / self.fixed_step
        );
        self.last_time = self.clock.now();

        while self.flags.running && frontend.is_open() {
            self.tick(scene, console.as_deref_mut(), frontend)?;
        }

        info!(
            "Main loop exited after {} frames and {} updates ({:.2}s simulated)",
            self.total_frames, self.total_updates, self.simulated_time
        );
        Ok(())
    }

    /// Sample the clock and run one iteration
    pub fn tick<W, F>(
        &mut self,
        scene: &mut Scene<W>,
        console: Option<&mut Console>,
        frontend: &mut F,
    ) -> Result<(), LoopError>
    where
        W: Simulation,
        F: Frontend<W>,
    {
        let now = self.clock.now();
        let dt = now - self.last_time;
        self.last_time = now;
        self.tick_with_delta(dt, scene, console, frontend)
    }

    /// Run one iteration as if `dt` seconds had elapsed since the previous one
    pub fn tick_with_delta<W, F>(
        &mut self,
        dt: f64,
        scene: &mut Scene<W>,
        console: Option<&mut Console>,
        frontend: &mut F,
    ) -> Result<(), LoopError>
    where
        W: Simulation,
        F: Frontend<W>,
    {
        let dt = dt.max(0.0);
        self.frame_count += 1;
        self.total_frames += 1;
        self.stats_accumulator += dt;
        self.accumulator += dt;

        let camera_handle = scene.camera().clone();
        self.home_camera.get_or_insert(*camera_handle.borrow());

        if let Some(line) = console.and_then(Console::poll) {
            self.execute_line(&line, &camera_handle);
        }
        if !self.flags.running {
            return Ok(());
        }

        self.drain(scene)?;

        let camera = *camera_handle.borrow();
        frontend.draw(scene, &camera);

        let events = frontend
            .present()
            .map_err(|err| LoopError::Frontend(Box::new(err)))?;
        for event in events {
            self.apply_event(event, &camera_handle);
        }

        self.sample_stats();
        Ok(())
    }

    /// Run every fixed step the accumulator holds, up to the catch-up cap
    fn drain<W: Simulation>(&mut self, scene: &mut Scene<W>) -> Result<(), SceneError> {
        let mut steps = 0u32;
        while self.accumulator + ACCUMULATOR_EPSILON >= self.fixed_step {
            if self.max_steps_per_frame.is_some_and(|max| steps >= max) {
                self.drop_backlog();
                break;
            }

            self.update_frame_count += 1;
            if !self.flags.paused || self.flags.single_step {
                scene.update(self.fixed_step)?;
                self.total_updates += 1;
                self.simulated_time += self.fixed_step;
                self.flags.single_step = false;
            }

            self.accumulator -= self.fixed_step;
            steps += 1;
        }
        Ok(())
    }

    /// Discard whole steps the cap prevented, keeping the sub-step remainder
    fn drop_backlog(&mut self) {
        let pending = ((self.accumulator + ACCUMULATOR_EPSILON) / self.fixed_step).floor();
        let dropped = pending * self.fixed_step;
        self.accumulator = (self.accumulator - dropped).max(0.0);
        warn!(
            "Simulation fell behind, dropped {:.3}s ({} steps)",
            dropped, pending
        );
    }

    fn sample_stats(&mut self) {
        if self.stats_accumulator + ACCUMULATOR_EPSILON < STATS_WINDOW {
            return;
        }

        self.stats = FrameStats {
            fps: self.frame_count,
            update_fps: self.update_frame_count,
            avg_frame_time: self.stats_accumulator / self.frame_count.max(1) as f64,
        };
        self.frame_count = 0;
        self.update_frame_count = 0;

        if self.flags.print_fps && !self.flags.paused {
            info!("---");
            info!("FPS: {}", self.stats.fps);
            info!("Update FPS: {}", self.stats.update_fps);
            info!("Average frametime: {:.4}s", self.stats.avg_frame_time);
            info!("---");
        }

        self.stats_accumulator -= STATS_WINDOW;
    }

    fn execute_line(&mut self, line: &str, camera: &SharedCamera) {
        match Command::parse(line) {
            Ok(command) => {
                debug!("Console command: {:?}", command);
                self.execute(command, camera);
            }
            Err(err) => warn!("Console: {}", err),
        }
    }

    /// Apply a console command
    pub fn execute(&mut self, command: Command, camera: &SharedCamera) {
        match command {
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::Step => self.request_step(),
            Command::Quit => self.quit(),
            Command::ToggleFps => self.flags.print_fps = !self.flags.print_fps,
            Command::Stats => info!(
                "FPS: {}, update FPS: {}, frames: {}, updates: {}, simulated: {:.2}s",
                self.stats.fps,
                self.stats.update_fps,
                self.total_frames,
                self.total_updates,
                self.simulated_time
            ),
            Command::CameraMove(delta) => camera.borrow_mut().move_by(delta),
            Command::CameraPosition(position) => camera.borrow_mut().position = position,
            Command::CameraScale(scale) => {
                let mut candidate = *camera.borrow();
                candidate.scale = scale;
                match candidate.validate() {
                    Ok(()) => *camera.borrow_mut() = candidate,
                    Err(err) => warn!("Rejected camera scale: {}", err),
                }
            }
            Command::CameraRotate(degrees) => camera.borrow_mut().rotate(degrees),
            Command::CameraReset => {
                if let Some(home) = self.home_camera {
                    let mut active = camera.borrow_mut();
                    let screen_size = active.screen_size();
                    *active = home;
                    active.resize(screen_size.x, screen_size.y);
                }
            }
        }
    }

    /// Apply an input event reported by the frontend
    pub fn apply_event(&mut self, event: FrontendEvent, camera: &SharedCamera) {
        match event {
            FrontendEvent::Resized { width, height } => camera.borrow_mut().resize(width, height),
            FrontendEvent::TogglePause => self.toggle_pause(),
            FrontendEvent::SingleStep => self.request_step(),
            FrontendEvent::Quit => self.quit(),
            FrontendEvent::PanCamera(pixels) => {
                let mut camera = camera.borrow_mut();
                let origin = camera.screen_to_world(DVec2::ZERO);
                let target = camera.screen_to_world(pixels);
                match (origin, target) {
                    (Ok(origin), Ok(target)) => camera.move_by(target - origin),
                    (Err(err), _) | (_, Err(err)) => warn!("Cannot pan: {}", err),
                }
            }
            FrontendEvent::ZoomCamera(factor) => camera.borrow_mut().zoom(factor),
            FrontendEvent::RotateCamera(degrees) => camera.borrow_mut().rotate(degrees),
        }
    }

    /// Unconsumed time in the fixed-step accumulator
    #[allow(dead_code)]
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Time accumulated in the current statistics window
    #[allow(dead_code)]
    pub fn stats_accumulator(&self) -> f64 {
        self.stats_accumulator
    }

    /// Statistics from the last complete window
    #[allow(dead_code)]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Current flags
    #[allow(dead_code)]
    pub fn flags(&self) -> LoopFlags {
        self.flags
    }

    /// Total frames since creation
    #[allow(dead_code)]
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Total simulated seconds since creation
    #[allow(dead_code)]
    pub fn simulated_time(&self) -> f64 {
        self.simulated_time
    }

    /// Check if the simulation is paused
    pub fn is_paused(&self) -> bool {
        self.flags.paused
    }

    /// Pause the simulation
    pub fn pause(&mut self) {
        if !self.flags.paused {
            self.flags.paused = true;
            info!("Simulation paused");
        }
    }

    /// Resume the simulation
    pub fn resume(&mut self) {
        if self.flags.paused {
            self.flags.paused = false;
            info!("Simulation resumed");
        }
    }

    /// Toggle pause state
    pub fn toggle_pause(&mut self) {
        if self.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Run exactly one update on the next due fixed step, even while paused
    pub fn request_step(&mut self) {
        self.flags.single_step = true;
    }

    /// Stop the loop before the next simulation step
    pub fn quit(&mut self) {
        if self.flags.running {
            self.flags.running = false;
            info!("Quit requested");
        }
    }
}
