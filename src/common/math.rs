// Math utilities and helper functions

use glam::DVec2;

/// Smallest scale magnitude the camera accepts before a transform is considered degenerate
pub const MIN_SCALE: f64 = 1e-9;

/// Largest scale magnitude the camera keeps after zooming
pub const MAX_SCALE: f64 = 1e9;

/// Convert degrees to radians
pub fn deg_to_rad(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

/// Rotate a vector counter-clockwise by `radians`
pub fn rotate(v: DVec2, radians: f64) -> DVec2 {
    let (s, c) = radians.sin_cos();
    DVec2::new(c * v.x - s * v.y, s * v.x + c * v.y)
}

/// Bound a scale component's magnitude to `MIN_SCALE..=MAX_SCALE`, keeping its sign.
/// NaN becomes `MIN_SCALE`.
pub fn clamp_scale_component(value: f64) -> f64 {
    if value.is_nan() {
        return MIN_SCALE;
    }
    value.abs().clamp(MIN_SCALE, MAX_SCALE).copysign(value)
}
