// Camera and world/screen coordinate mapping for 2D rendering

use glam::{DAffine2, DVec2};
use log::warn;
use std::cell::RefCell;
use std::rc::Rc;

use crate::common::math::{clamp_scale_component, deg_to_rad, rotate, MIN_SCALE};
use crate::engine::renderer::{TransformScope, TransformStack};

/// Camera shared between the scene and whoever drives it (input, console)
pub type SharedCamera = Rc<RefCell<Camera>>;

/// Camera configuration errors
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum CameraError {
    #[error("Camera scale ({x}, {y}) has a zero component")]
    DegenerateScale { x: f64, y: f64 },
}

/// 2D camera mapping world coordinates to screen pixels
///
/// The camera is `Copy` so a frame can take a consistent snapshot of
/// position, scale and rotation in one read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World-space point mapped to the screen center
    pub position: DVec2,
    /// Per-axis world-to-pixel scale factor
    pub scale: DVec2,
    /// Clockwise rotation of the world relative to the screen, in degrees
    pub rotation: f64,
    /// Viewport size in pixels
    screen_size: DVec2,
}

impl Camera {
    /// Create a new camera
    pub fn new(screen_size: DVec2, position: DVec2, scale: DVec2, rotation: f64) -> Self {
        Self {
            position,
            scale,
            rotation,
            screen_size,
        }
    }

    /// Viewport size in pixels
    pub fn screen_size(&self) -> DVec2 {
        self.screen_size
    }

    /// Resize the viewport
    pub fn resize(&mut self, width: f64, height: f64) {
        self.screen_size = DVec2::new(width, height);
    }

    /// Move the camera by `delta` world units. No bounds are enforced.
    pub fn move_by(&mut self, delta: DVec2) {
        self.position += delta;
    }

    /// Multiply the scale by `factor` on both axes, clamping if it collapses
    /// or overflows
    pub fn zoom(&mut self, factor: f64) {
        self.scale *= factor;
        self.clamp_scale();
    }

    /// Rotate the world clockwise by `degrees`
    pub fn rotate(&mut self, degrees: f64) {
        self.rotation = (self.rotation + degrees) % 360.0;
    }

    /// Check that the scale can be inverted
    pub fn validate(&self) -> Result<(), CameraError> {
        if self.scale.x.abs() < MIN_SCALE
            || self.scale.y.abs() < MIN_SCALE
            || !self.scale.is_finite()
        {
            return Err(CameraError::DegenerateScale {
                x: self.scale.x,
                y: self.scale.y,
            });
        }
        Ok(())
    }

    /// Bound every scale component to `MIN_SCALE..=MAX_SCALE` in magnitude,
    /// keeping its sign. Returns true if the scale was changed.
    pub fn clamp_scale(&mut self) -> bool {
        let clamped = DVec2::new(
            clamp_scale_component(self.scale.x),
            clamp_scale_component(self.scale.y),
        );
        if clamped == self.scale {
            return false;
        }
        warn!("Clamping camera scale {:?} to {:?}", self.scale, clamped);
        self.scale = clamped;
        true
    }

    /// Convert world coordinates to screen coordinates
    ///
    /// The half-screen offset is multiplied by the scale before the rotation,
    /// so the resulting screen offset depends on the scale.
    #[allow(dead_code)]
    pub fn world_to_screen(&self, world_pos: DVec2) -> DVec2 {
        let translated = world_pos - self.position + self.half_screen() * self.scale;
        let rotated = rotate(translated, -deg_to_rad(self.rotation));
        rotated * self.scale
    }

    /// Convert screen coordinates to world coordinates
    ///
    /// Exact inverse of [`Camera::world_to_screen`]. Fails instead of
    /// producing infinities when a scale component is zero.
    pub fn screen_to_world(&self, screen_pos: DVec2) -> Result<DVec2, CameraError> {
        self.validate()?;

        let unscaled = screen_pos / self.scale;
        let rotated = rotate(unscaled, deg_to_rad(self.rotation));
        Ok(rotated + self.position - self.half_screen() * self.scale)
    }

    /// Affine transform the renderer applies to world-space draw calls:
    /// translate to screen center, rotate, scale, translate by -position
    pub fn transform(&self) -> DAffine2 {
        DAffine2::from_translation(self.half_screen())
            * DAffine2::from_angle(-deg_to_rad(self.rotation))
            * DAffine2::from_scale(self.scale)
            * DAffine2::from_translation(-self.position)
    }

    /// Establish the camera transform for subsequent draw calls on `stack`.
    /// The transform stays active until the returned scope is dropped.
    pub fn pre_draw<'a, S: TransformStack + ?Sized>(&self, stack: &'a mut S) -> TransformScope<'a, S> {
        TransformScope::push(stack, self.transform())
    }

    /// End a scope opened by [`Camera::pre_draw`]
    pub fn post_draw<S: TransformStack + ?Sized>(&self, scope: TransformScope<'_, S>) {
        drop(scope);
    }

    fn half_screen(&self) -> DVec2 {
        self.screen_size / 2.0
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(DVec2::ZERO, DVec2::ZERO, DVec2::ONE, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::math::MAX_SCALE;
    use approx::assert_relative_eq;

    fn assert_vec_eq(a: DVec2, b: DVec2) {
        assert_relative_eq!(a.x, b.x, epsilon = 1e-9, max_relative = 1e-9);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-9, max_relative = 1e-9);
    }

    #[test]
    fn test_identity_camera() {
        let camera = Camera::default();
        let p = DVec2::new(12.5, -3.25);
        assert_eq!(camera.world_to_screen(p), p);
        assert_eq!(camera.screen_to_world(p).unwrap(), p);
    }

    #[test]
    fn test_round_trip() {
        let cameras = [
            Camera::new(DVec2::new(800.0, 600.0), DVec2::new(3.0, -7.0), DVec2::new(32.0, 32.0), 30.0),
            Camera::new(DVec2::new(1280.0, 720.0), DVec2::ZERO, DVec2::new(0.5, -2.0), 270.0),
            Camera::new(DVec2::new(640.0, 480.0), DVec2::new(-100.0, 4.0), DVec2::new(1.0, 1.0), -45.0),
        ];
        let points = [
            DVec2::ZERO,
            DVec2::new(1.0, 1.0),
            DVec2::new(-250.0, 1e3),
            DVec2::new(0.125, -9.5),
        ];

        for camera in &cameras {
            for &p in &points {
                let screen = camera.world_to_screen(p);
                assert_vec_eq(camera.screen_to_world(screen).unwrap(), p);
                assert_vec_eq(camera.world_to_screen(camera.screen_to_world(p).unwrap()), p);
            }
        }
    }

    #[test]
    fn test_offset_scales_with_camera_scale() {
        let camera = Camera::new(DVec2::new(800.0, 600.0), DVec2::ZERO, DVec2::new(2.0, 2.0), 0.0);
        // (0 + 400 * 2) * 2, (0 + 300 * 2) * 2
        assert_vec_eq(camera.world_to_screen(DVec2::ZERO), DVec2::new(1600.0, 1200.0));
    }

    #[test]
    fn test_rotation_is_clockwise_in_degrees() {
        let camera = Camera::new(DVec2::ZERO, DVec2::ZERO, DVec2::ONE, 90.0);
        assert_vec_eq(camera.world_to_screen(DVec2::new(1.0, 0.0)), DVec2::new(0.0, -1.0));
    }

    #[test]
    fn test_move() {
        let mut camera = Camera::new(DVec2::ZERO, DVec2::new(1.0, 1.0), DVec2::ONE, 0.0);
        camera.move_by(DVec2::new(3.0, -2.0));
        assert_eq!(camera.position, DVec2::new(4.0, -1.0));
    }

    #[test]
    fn test_zero_scale_is_rejected() {
        let camera = Camera::new(DVec2::new(800.0, 600.0), DVec2::ZERO, DVec2::new(0.0, 5.0), 0.0);
        assert_eq!(
            camera.screen_to_world(DVec2::new(10.0, 10.0)),
            Err(CameraError::DegenerateScale { x: 0.0, y: 5.0 })
        );
    }

    #[test]
    fn test_clamp_scale() {
        let mut camera = Camera::new(DVec2::ZERO, DVec2::ZERO, DVec2::new(0.0, -0.0), 0.0);
        assert!(camera.clamp_scale());
        assert!(camera.validate().is_ok());
        let world = camera.screen_to_world(DVec2::new(1.0, 1.0)).unwrap();
        assert!(world.is_finite());
        assert!(!camera.clamp_scale());
    }

    #[test]
    fn test_zoom_never_collapses_scale() {
        let mut camera = Camera::new(DVec2::ZERO, DVec2::ZERO, DVec2::new(2.0, -2.0), 0.0);
        camera.zoom(0.0);
        assert_eq!(camera.scale, DVec2::new(MIN_SCALE, -MIN_SCALE));
        assert!(camera.validate().is_ok());
    }

    #[test]
    fn test_zoom_never_overflows_scale() {
        let mut camera = Camera::new(DVec2::new(800.0, 600.0), DVec2::ZERO, DVec2::new(1.0, -1.0), 0.0);
        for _ in 0..10_000 {
            camera.zoom(1.1);
        }
        assert_eq!(camera.scale, DVec2::new(MAX_SCALE, -MAX_SCALE));
        assert!(camera.screen_to_world(DVec2::new(5.0, 5.0)).is_ok());
        assert!(camera.world_to_screen(DVec2::new(5.0, 5.0)).is_finite());
    }

    #[test]
    fn test_screen_to_world_known_values() {
        // (100, 50) / 2 + (1, 2) - (400, 300) * 2
        let camera = Camera::new(DVec2::new(800.0, 600.0), DVec2::new(1.0, 2.0), DVec2::new(2.0, 2.0), 0.0);
        assert_vec_eq(
            camera.screen_to_world(DVec2::new(100.0, 50.0)).unwrap(),
            DVec2::new(-749.0, -573.0),
        );

        // (100, 50) / 2 turned 90 degrees counter-clockwise is (-25, 50)
        let rotated = Camera { rotation: 90.0, ..camera };
        assert_vec_eq(
            rotated.screen_to_world(DVec2::new(100.0, 50.0)).unwrap(),
            DVec2::new(-824.0, -548.0),
        );

        // Anisotropic scale: (30 / 3, 20 / -4) + 0 - (50 * 3, 25 * -4)
        let stretched = Camera::new(DVec2::new(100.0, 50.0), DVec2::ZERO, DVec2::new(3.0, -4.0), 0.0);
        assert_vec_eq(
            stretched.screen_to_world(DVec2::new(30.0, 20.0)).unwrap(),
            DVec2::new(-140.0, 95.0),
        );
    }

    #[test]
    fn test_transform_maps_position_to_screen_center() {
        let camera = Camera::new(DVec2::new(800.0, 600.0), DVec2::new(5.0, 5.0), DVec2::new(32.0, 32.0), 15.0);
        assert_vec_eq(camera.transform().transform_point2(camera.position), DVec2::new(400.0, 300.0));
    }

    #[test]
    fn test_transform_applies_scale_after_rotation() {
        let camera = Camera::new(DVec2::ZERO, DVec2::ZERO, DVec2::new(2.0, 3.0), 0.0);
        assert_vec_eq(camera.transform().transform_point2(DVec2::new(1.0, 1.0)), DVec2::new(2.0, 3.0));
    }
}
