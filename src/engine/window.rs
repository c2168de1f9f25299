// Desktop frontend: winit window, wgpu renderer and keyboard input

use anyhow::Result;
use glam::DVec2;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowBuilder};

use crate::engine::camera::Camera;
use crate::engine::config::EngineConfig;
use crate::engine::game_loop::{Frontend, FrontendEvent};
use crate::engine::physics::PhysicsWorld;
use crate::engine::renderer::{draw_world, Canvas, Renderer};
use crate::engine::scene::Scene;

/// Screen pixels panned per arrow key press
const PAN_PIXELS: f64 = 32.0;

/// Scale factor applied per zoom key press
const ZOOM_STEP: f64 = 1.1;

/// Degrees rotated per rotate key press
const ROTATE_STEP: f64 = 15.0;

/// Errors raised while presenting a frame
#[derive(Debug, thiserror::Error)]
pub enum FrontendError {
    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

/// Window plus renderer, driven one frame at a time by the main loop
pub struct GameWindow {
    event_loop: EventLoop<()>,
    window: Arc<Window>,
    renderer: Renderer,
    canvas: Canvas,
    open: bool,
}

impl GameWindow {
    /// Create the window and initialize the GPU. Failure here is fatal.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let event_loop = EventLoop::new()?;
        let window = Arc::new(
            WindowBuilder::new()
                .with_title(config.window_title.as_str())
                .with_inner_size(winit::dpi::LogicalSize::new(
                    config.window_width,
                    config.window_height,
                ))
                .with_resizable(true)
                .build(&event_loop)?,
        );

        info!("Window created successfully");

        let renderer = pollster::block_on(Renderer::new(window.clone()))?;

        Ok(Self {
            event_loop,
            window,
            renderer,
            canvas: Canvas::new(),
            open: true,
        })
    }

    /// Surface size in physical pixels
    pub fn size(&self) -> DVec2 {
        let size = self.renderer.size();
        DVec2::new(size.width as f64, size.height as f64)
    }

    fn pump(&mut self) -> Vec<FrontendEvent> {
        let mut events = Vec::new();
        let mut resized = None;
        let mut close_requested = false;

        let status = self
            .event_loop
            .pump_events(Some(Duration::ZERO), |event, _elwt| {
                if let Event::WindowEvent { event, .. } = event {
                    match event {
                        WindowEvent::CloseRequested => close_requested = true,
                        WindowEvent::Resized(size) => {
                            resized = Some(size);
                            events.push(FrontendEvent::Resized {
                                width: size.width as f64,
                                height: size.height as f64,
                            });
                        }
                        WindowEvent::KeyboardInput { event, .. } => {
                            if let Some(action) = process_keyboard_event(&event) {
                                events.push(action);
                            }
                        }
                        _ => {}
                    }
                }
            });

        if let PumpStatus::Exit(code) = status {
            info!("Event loop exited with code {}", code);
            self.open = false;
        }
        if close_requested {
            info!("Close requested, shutting down...");
            self.open = false;
        }
        if let Some(size) = resized {
            self.renderer.resize(size);
        }

        events
    }
}

impl Frontend<PhysicsWorld> for GameWindow {
    type Error = FrontendError;

    fn is_open(&self) -> bool {
        self.open
    }

    fn draw(&mut self, scene: &Scene<PhysicsWorld>, camera: &Camera) {
        self.canvas.clear();
        if let Some(world) = scene.world() {
            let mut scope = camera.pre_draw(&mut self.canvas);
            draw_world(&mut scope, world);
            camera.post_draw(scope);
        }
        self.renderer.upload(&self.canvas);
    }

    fn present(&mut self) -> Result<Vec<FrontendEvent>, FrontendError> {
        match self.renderer.render() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("Surface lost, reconfiguring");
                self.renderer.reconfigure();
            }
            Err(wgpu::SurfaceError::Timeout) => warn!("Surface timed out, skipping frame"),
            Err(err) => return Err(err.into()),
        }
        self.window.request_redraw();

        Ok(self.pump())
    }
}

/// Translate a keyboard event into a loop event
fn process_keyboard_event(event: &KeyEvent) -> Option<FrontendEvent> {
    if event.state != ElementState::Pressed {
        return None;
    }
    let PhysicalKey::Code(code) = event.physical_key else {
        return None;
    };
    let action = action_for_key(code)?;
    // Toggles fire once per press; camera controls repeat while held
    let repeatable = matches!(
        action,
        FrontendEvent::PanCamera(_) | FrontendEvent::ZoomCamera(_) | FrontendEvent::RotateCamera(_)
    );
    if event.repeat && !repeatable {
        return None;
    }
    Some(action)
}

/// Default key bindings
fn action_for_key(code: KeyCode) -> Option<FrontendEvent> {
    let action = match code {
        KeyCode::KeyP => FrontendEvent::TogglePause,
        KeyCode::Space | KeyCode::KeyN => FrontendEvent::SingleStep,
        KeyCode::Escape => FrontendEvent::Quit,
        KeyCode::ArrowLeft => FrontendEvent::PanCamera(DVec2::new(-PAN_PIXELS, 0.0)),
        KeyCode::ArrowRight => FrontendEvent::PanCamera(DVec2::new(PAN_PIXELS, 0.0)),
        KeyCode::ArrowUp => FrontendEvent::PanCamera(DVec2::new(0.0, PAN_PIXELS)),
        KeyCode::ArrowDown => FrontendEvent::PanCamera(DVec2::new(0.0, -PAN_PIXELS)),
        KeyCode::Equal | KeyCode::NumpadAdd => FrontendEvent::ZoomCamera(ZOOM_STEP),
        KeyCode::Minus | KeyCode::NumpadSubtract => FrontendEvent::ZoomCamera(1.0 / ZOOM_STEP),
        KeyCode::KeyQ => FrontendEvent::RotateCamera(-ROTATE_STEP),
        KeyCode::KeyE => FrontendEvent::RotateCamera(ROTATE_STEP),
        _ => return None,
    };
    Some(action)
}
