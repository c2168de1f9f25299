// Engine configuration with environment overrides

use glam::DVec2;
use log::info;
use std::str::FromStr;

use crate::engine::camera::{Camera, CameraError};

const ENV_FIXED_HZ: &str = "STEADYFRAME_FIXED_HZ";
const ENV_MAX_CATCH_UP: &str = "STEADYFRAME_MAX_CATCH_UP";
const ENV_START_PAUSED: &str = "STEADYFRAME_START_PAUSED";
const ENV_PRINT_FPS: &str = "STEADYFRAME_PRINT_FPS";
const ENV_WINDOW_SIZE: &str = "STEADYFRAME_WINDOW_SIZE";

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("Fixed step must be positive and finite, got {0}")]
    InvalidStep(f64),

    #[error(transparent)]
    Camera(#[from] CameraError),
}

/// Startup configuration for the engine
///
/// The default caps catch-up at 10 updates per frame, so a single frame that
/// takes longer than `10 * fixed_step` drops the excess time instead of
/// replaying it. Set `max_steps_per_frame` to `None` (or
/// `STEADYFRAME_MAX_CATCH_UP=off`) to keep every step.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Window title
    pub window_title: String,
    /// Initial window width in pixels
    pub window_width: u32,
    /// Initial window height in pixels
    pub window_height: u32,
    /// Simulated seconds per physics update
    pub fixed_step: f64,
    /// Maximum physics updates per frame; `None` never drops time
    pub max_steps_per_frame: Option<u32>,
    /// Start with the simulation paused
    pub start_paused: bool,
    /// Log frame statistics once per second
    pub print_fps: bool,
    /// Initial camera position in world units
    pub camera_position: DVec2,
    /// Initial camera scale in pixels per world unit
    pub camera_scale: DVec2,
    /// Initial camera rotation in degrees
    pub camera_rotation: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_title: "steadyframe".to_string(),
            window_width: 800,
            window_height: 600,
            fixed_step: 1.0 / 30.0,
            max_steps_per_frame: Some(10),
            start_paused: false,
            print_fps: false,
            camera_position: DVec2::ZERO,
            camera_scale: DVec2::new(32.0, 32.0),
            camera_rotation: 0.0,
        }
    }
}

impl EngineConfig {
    /// Load the defaults, then apply `STEADYFRAME_*` environment overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_FIXED_HZ) {
            let hz: f64 = parse_value(ENV_FIXED_HZ, &value)?;
            config.fixed_step = 1.0 / hz;
        }
        if let Some(value) = lookup(ENV_MAX_CATCH_UP) {
            config.max_steps_per_frame = match value.trim() {
                "0" | "none" | "off" => None,
                other => Some(parse_value(ENV_MAX_CATCH_UP, other)?),
            };
        }
        if let Some(value) = lookup(ENV_START_PAUSED) {
            config.start_paused = parse_flag(ENV_START_PAUSED, &value)?;
        }
        if let Some(value) = lookup(ENV_PRINT_FPS) {
            config.print_fps = parse_flag(ENV_PRINT_FPS, &value)?;
        }
        if let Some(value) = lookup(ENV_WINDOW_SIZE) {
            let (width, height) = value
                .trim()
                .split_once(['x', 'X'])
                .ok_or_else(|| invalid(ENV_WINDOW_SIZE, &value))?;
            config.window_width = parse_value(ENV_WINDOW_SIZE, width)?;
            config.window_height = parse_value(ENV_WINDOW_SIZE, height)?;
        }

        config.validate()?;
        info!(
            "Config: {}x{} window, {:.1} Hz fixed step, catch-up cap {:?}",
            config.window_width,
            config.window_height,
            1.0 / config.fixed_step,
            config.max_steps_per_frame
        );
        Ok(config)
    }

    /// Reject configurations the loop or camera cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fixed_step > 0.0 && self.fixed_step.is_finite()) {
            return Err(ConfigError::InvalidStep(self.fixed_step));
        }
        self.initial_camera().validate()?;
        Ok(())
    }

    /// Camera described by this configuration, sized to the window
    pub fn initial_camera(&self) -> Camera {
        Camera::new(
            DVec2::new(self.window_width as f64, self.window_height as f64),
            self.camera_position,
            self.camera_scale,
            self.camera_rotation,
        )
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}
