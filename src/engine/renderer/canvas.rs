// Immediate-mode canvas collecting screen-space geometry for the GPU

use bytemuck::{Pod, Zeroable};
use glam::{DAffine2, DVec2};

use super::transform::TransformStack;

/// Angle between circle outline vertices, in degrees
const CIRCLE_STEP_DEGREES: f64 = 45.0;

/// Colored vertex, already in screen pixels
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    /// Get the vertex buffer layout descriptor
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // Position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                // Color
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Collects outlines as a line list and filled shapes as a triangle list,
/// both transformed by the active transform stack
#[derive(Debug)]
pub struct Canvas {
    /// Composed transforms; the last entry is applied to new geometry
    stack: Vec<DAffine2>,
    lines: Vec<Vertex>,
    triangles: Vec<Vertex>,
    color: [f32; 4],
}

impl Canvas {
    /// Create an empty canvas drawing in white
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            lines: Vec::new(),
            triangles: Vec::new(),
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }

    /// Discard all recorded geometry and transforms
    pub fn clear(&mut self) {
        self.stack.clear();
        self.lines.clear();
        self.triangles.clear();
    }

    /// Set the color used by subsequent draw calls
    pub fn set_color(&mut self, color: [f32; 4]) {
        self.color = color;
    }

    /// Recorded line-list vertices
    pub fn lines(&self) -> &[Vertex] {
        &self.lines
    }

    /// Recorded triangle-list vertices
    pub fn triangles(&self) -> &[Vertex] {
        &self.triangles
    }

    /// Draw an axis-aligned rectangle
    #[allow(dead_code)]
    pub fn draw_quad(&mut self, upper_left: DVec2, lower_right: DVec2, filled: bool) {
        self.draw_poly(
            &[
                upper_left,
                DVec2::new(upper_left.x, lower_right.y),
                lower_right,
                DVec2::new(lower_right.x, upper_left.y),
            ],
            filled,
        );
    }

    /// Draw a circle
    pub fn draw_circle(&mut self, center: DVec2, radius: f64, filled: bool) {
        let steps = (360.0 / CIRCLE_STEP_DEGREES) as usize;
        let rim: Vec<DVec2> = (0..steps)
            .map(|i| {
                let angle = (i as f64 * CIRCLE_STEP_DEGREES).to_radians();
                center + DVec2::new(angle.cos(), angle.sin()) * radius
            })
            .collect();

        if !filled {
            self.draw_poly(&rim, false);
            return;
        }
        let center = self.project(center);
        for (i, &start) in rim.iter().enumerate() {
            let end = rim[(i + 1) % rim.len()];
            let (start, end) = (self.project(start), self.project(end));
            self.push_triangle([center, start, end]);
        }
    }

    /// Draw a single line segment
    pub fn draw_line(&mut self, start: DVec2, end: DVec2) {
        let start = self.project(start);
        let end = self.project(end);
        self.push_line(start);
        self.push_line(end);
    }

    /// Draw a closed polygon. Filled polygons are fanned from the first
    /// vertex, so they must be convex.
    pub fn draw_poly(&mut self, vertices: &[DVec2], filled: bool) {
        if filled {
            if vertices.len() < 3 {
                return;
            }
            let first = self.project(vertices[0]);
            for pair in vertices[1..].windows(2) {
                let (b, c) = (self.project(pair[0]), self.project(pair[1]));
                self.push_triangle([first, b, c]);
            }
            return;
        }

        if vertices.len() < 2 {
            return;
        }
        for (i, &start) in vertices.iter().enumerate() {
            let end = vertices[(i + 1) % vertices.len()];
            self.draw_line(start, end);
        }
    }

    fn project(&self, point: DVec2) -> DVec2 {
        match self.stack.last() {
            Some(transform) => transform.transform_point2(point),
            None => point,
        }
    }

    fn vertex(&self, position: DVec2) -> Vertex {
        Vertex {
            position: position.as_vec2().to_array(),
            color: self.color,
        }
    }

    fn push_line(&mut self, position: DVec2) {
        let vertex = self.vertex(position);
        self.lines.push(vertex);
    }

    fn push_triangle(&mut self, corners: [DVec2; 3]) {
        for corner in corners {
            let vertex = self.vertex(corner);
            self.triangles.push(vertex);
        }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformStack for Canvas {
    fn push_transform(&mut self, transform: DAffine2) {
        let composed = match self.stack.last() {
            Some(top) => *top * transform,
            None => transform,
        };
        self.stack.push(composed);
    }

    fn pop_transform(&mut self) {
        self.stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_without_transform() {
        let mut canvas = Canvas::new();
        canvas.draw_line(DVec2::new(1.0, 2.0), DVec2::new(3.0, 4.0));
        assert_eq!(canvas.lines().len(), 2);
        assert_eq!(canvas.lines()[0].position, [1.0, 2.0]);
        assert_eq!(canvas.lines()[1].position, [3.0, 4.0]);
        assert!(canvas.triangles().is_empty());
    }

    #[test]
    fn test_nested_transforms_compose() {
        let mut canvas = Canvas::new();
        canvas.push_transform(DAffine2::from_translation(DVec2::new(10.0, 0.0)));
        canvas.push_transform(DAffine2::from_scale(DVec2::splat(2.0)));
        canvas.draw_line(DVec2::ZERO, DVec2::new(1.0, 1.0));
        canvas.pop_transform();
        canvas.draw_line(DVec2::ZERO, DVec2::new(1.0, 1.0));
        canvas.pop_transform();
        canvas.draw_line(DVec2::ZERO, DVec2::new(1.0, 1.0));

        let positions: Vec<[f32; 2]> = canvas.lines().iter().map(|v| v.position).collect();
        assert_eq!(
            positions,
            vec![
                [10.0, 0.0],
                [12.0, 2.0],
                [10.0, 0.0],
                [11.0, 1.0],
                [0.0, 0.0],
                [1.0, 1.0]
            ]
        );
    }

    #[test]
    fn test_circle_outline_is_closed() {
        let mut canvas = Canvas::new();
        canvas.draw_circle(DVec2::ZERO, 1.0, false);
        let lines = canvas.lines();
        // 8 segments at 45 degree steps
        assert_eq!(lines.len(), 16);
        assert_eq!(lines[0].position, lines[15].position);
    }

    #[test]
    fn test_filled_circle_fans_from_center() {
        let mut canvas = Canvas::new();
        canvas.draw_circle(DVec2::new(5.0, 5.0), 2.0, true);
        let triangles = canvas.triangles();
        assert_eq!(triangles.len(), 24);
        assert!(triangles.chunks(3).all(|t| t[0].position == [5.0, 5.0]));
        assert!(canvas.lines().is_empty());
    }

    #[test]
    fn test_quad_uses_current_color() {
        let mut canvas = Canvas::new();
        canvas.set_color([1.0, 0.0, 0.0, 1.0]);
        canvas.draw_quad(DVec2::ZERO, DVec2::new(2.0, 2.0), false);
        assert_eq!(canvas.lines().len(), 8);
        assert!(canvas.lines().iter().all(|v| v.color == [1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_filled_quad_is_two_triangles() {
        let mut canvas = Canvas::new();
        canvas.draw_quad(DVec2::ZERO, DVec2::new(2.0, 2.0), true);
        let positions: Vec<[f32; 2]> = canvas.triangles().iter().map(|v| v.position).collect();
        assert_eq!(
            positions,
            vec![
                [0.0, 0.0],
                [0.0, 2.0],
                [2.0, 2.0],
                [0.0, 0.0],
                [2.0, 2.0],
                [2.0, 0.0]
            ]
        );
    }

    #[test]
    fn test_degenerate_poly_is_skipped() {
        let mut canvas = Canvas::new();
        canvas.draw_poly(&[DVec2::ONE], false);
        canvas.draw_poly(&[DVec2::ONE, DVec2::ZERO], true);
        assert!(canvas.lines().is_empty());
        assert!(canvas.triangles().is_empty());
    }
}
