// Rendering system using wgpu

mod canvas;
mod transform;

pub use canvas::{Canvas, Vertex};
pub use transform::{TransformScope, TransformStack};

use anyhow::Result;
use glam::DVec2;
use log::info;
use rapier2d::parry::shape::TypedShape;
use rapier2d::prelude::*;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::engine::physics::PhysicsWorld;

const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.08,
    a: 1.0,
};

/// Initial vertex buffer capacity in bytes
const INITIAL_VERTEX_BUFFER_SIZE: u64 = 64 * 1024;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ScreenUniform {
    size: [f32; 2],
    _padding: [f32; 2],
}

/// Alpha of the solid fill drawn under each collider outline
const FILL_ALPHA: f32 = 0.25;

/// Draw every collider of `world` onto `canvas`, colored by body type
pub fn draw_world(canvas: &mut Canvas, world: &PhysicsWorld) {
    for (collider, parent) in world.colliders() {
        let color = match parent.map(|body| body.body_type()) {
            Some(RigidBodyType::Dynamic) => [0.0, 1.0, 0.0, 0.9],
            Some(RigidBodyType::Fixed) => [0.6, 0.6, 0.6, 0.9],
            Some(RigidBodyType::KinematicPositionBased)
            | Some(RigidBodyType::KinematicVelocityBased) => [0.0, 0.5, 1.0, 0.9],
            None => [1.0, 1.0, 1.0, 0.9],
        };
        canvas.set_color([color[0], color[1], color[2], FILL_ALPHA]);
        draw_collider(canvas, collider, true);
        canvas.set_color(color);
        draw_collider(canvas, collider, false);
    }
}

fn draw_collider(canvas: &mut Canvas, collider: &Collider, filled: bool) {
    let iso = collider.position();
    let to_world = |x: Real, y: Real| {
        let p = iso.transform_point(&point![x, y]);
        DVec2::new(p.x as f64, p.y as f64)
    };

    match collider.shape().as_typed_shape() {
        TypedShape::Ball(ball) => {
            canvas.draw_circle(to_world(0.0, 0.0), ball.radius as f64, filled)
        }
        TypedShape::Cuboid(cuboid) => {
            let h = cuboid.half_extents;
            canvas.draw_poly(
                &[
                    to_world(-h.x, -h.y),
                    to_world(h.x, -h.y),
                    to_world(h.x, h.y),
                    to_world(-h.x, h.y),
                ],
                filled,
            );
        }
        TypedShape::ConvexPolygon(polygon) => {
            let points: Vec<DVec2> = polygon.points().iter().map(|p| to_world(p.x, p.y)).collect();
            canvas.draw_poly(&points, filled);
        }
        TypedShape::Segment(segment) if !filled => canvas.draw_line(
            to_world(segment.a.x, segment.a.y),
            to_world(segment.b.x, segment.b.y),
        ),
        TypedShape::Capsule(capsule) => {
            let a = capsule.segment.a;
            let b = capsule.segment.b;
            let radius = capsule.radius as f64;
            canvas.draw_circle(to_world(a.x, a.y), radius, filled);
            canvas.draw_circle(to_world(b.x, b.y), radius, filled);

            let dir = b - a;
            let len = dir.norm();
            if len <= 0.0 {
                return;
            }
            let perp = vector![-dir.y, dir.x] / len * capsule.radius;
            let left = (to_world(a.x + perp.x, a.y + perp.y), to_world(b.x + perp.x, b.y + perp.y));
            let right = (to_world(a.x - perp.x, a.y - perp.y), to_world(b.x - perp.x, b.y - perp.y));
            if filled {
                canvas.draw_poly(&[left.0, right.0, right.1, left.1], true);
            } else {
                canvas.draw_line(left.0, left.1);
                canvas.draw_line(right.0, right.1);
            }
        }
        _ if filled => {}
        _ => {
            // Unsupported shapes get a cross at their origin
            canvas.draw_line(to_world(-0.5, 0.0), to_world(0.5, 0.0));
            canvas.draw_line(to_world(0.0, -0.5), to_world(0.0, 0.5));
        }
    }
}

/// Main renderer responsible for initializing wgpu and drawing canvas geometry
pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    line_pipeline: wgpu::RenderPipeline,
    fill_pipeline: wgpu::RenderPipeline,
    lines: GeometryBuffer,
    triangles: GeometryBuffer,
    screen_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Growable GPU vertex buffer and the number of vertices last written to it
struct GeometryBuffer {
    label: &'static str,
    buffer: wgpu::Buffer,
    count: u32,
}

impl GeometryBuffer {
    fn new(device: &wgpu::Device, label: &'static str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: INITIAL_VERTEX_BUFFER_SIZE,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            label,
            buffer,
            count: 0,
        }
    }

    fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, vertices: &[Vertex]) {
        self.count = vertices.len() as u32;
        if vertices.is_empty() {
            return;
        }

        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        if bytes.len() as u64 > self.buffer.size() {
            self.buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(self.label),
                contents: bytes,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
        } else {
            queue.write_buffer(&self.buffer, 0, bytes);
        }
    }

    fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>, pipeline: &'a wgpu::RenderPipeline) {
        if self.count == 0 {
            return;
        }
        render_pass.set_pipeline(pipeline);
        render_pass.set_vertex_buffer(0, self.buffer.slice(..));
        render_pass.draw(0..self.count, 0..1);
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    topology: wgpu::PrimitiveTopology,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: "vs_main",
            buffers: &[Vertex::desc()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

impl Renderer {
    /// Create a new renderer for the given window
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        // Create wgpu instance
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Create surface
        let surface = instance.create_surface(window.clone())?;

        // Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("Failed to find suitable GPU adapter"))?;

        info!("Using GPU: {}", adapter.get_info().name);

        // Request device and queue
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        // Configure surface
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("Surface reports no supported formats"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Canvas Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/canvas.wgsl").into()),
        });

        let screen_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Screen Uniform Buffer"),
            contents: bytemuck::cast_slice(&[ScreenUniform {
                size: [config.width as f32, config.height as f32],
                _padding: [0.0; 2],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Screen Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Screen Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: screen_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Canvas Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let line_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            surface_format,
            wgpu::PrimitiveTopology::LineList,
            "Line Pipeline",
        );
        let fill_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            surface_format,
            wgpu::PrimitiveTopology::TriangleList,
            "Fill Pipeline",
        );

        let lines = GeometryBuffer::new(&device, "Line Vertex Buffer");
        let triangles = GeometryBuffer::new(&device, "Fill Vertex Buffer");

        info!(
            "Renderer initialized with {}x{} resolution",
            config.width, config.height
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            line_pipeline,
            fill_pipeline,
            lines,
            triangles,
            screen_buffer,
            bind_group,
        })
    }

    /// Resize the renderer
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.queue.write_buffer(
                &self.screen_buffer,
                0,
                bytemuck::cast_slice(&[ScreenUniform {
                    size: [new_size.width as f32, new_size.height as f32],
                    _padding: [0.0; 2],
                }]),
            );
            info!("Renderer resized to {}x{}", new_size.width, new_size.height);
        }
    }

    /// Current surface size
    pub fn size(&self) -> winit::dpi::PhysicalSize<u32> {
        self.size
    }

    /// Copy the canvas geometry into the vertex buffers
    pub fn upload(&mut self, canvas: &Canvas) {
        self.lines.write(&self.device, &self.queue, canvas.lines());
        self.triangles.write(&self.device, &self.queue, canvas.triangles());
    }

    /// Render the uploaded geometry and present it
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(BACKGROUND),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            // Fills first so outlines stay visible on top
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            self.triangles.draw(&mut render_pass, &self.fill_pipeline);
            self.lines.draw(&mut render_pass, &self.line_pipeline);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// Reconfigure the surface after it was lost or became outdated
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::camera::Camera;

    #[test]
    fn test_draw_world_fills_and_outlines_every_collider() {
        let mut world = PhysicsWorld::new();
        world.add_body(
            RigidBodyBuilder::dynamic().translation(vector![0.0, 5.0]).build(),
            ColliderBuilder::ball(1.0).build(),
        );
        world.add_body(
            RigidBodyBuilder::fixed().build(),
            ColliderBuilder::cuboid(4.0, 0.5).build(),
        );

        let mut canvas = Canvas::new();
        draw_world(&mut canvas, &world);

        // 8 circle segments plus 4 box edges, two vertices each
        assert_eq!(canvas.lines().len(), 24);
        assert!(canvas.lines().iter().any(|v| v.color == [0.0, 1.0, 0.0, 0.9]));
        assert!(canvas.lines().iter().any(|v| v.color == [0.6, 0.6, 0.6, 0.9]));

        // 8 circle wedges plus the box as two triangles
        assert_eq!(canvas.triangles().len(), 30);
        assert!(canvas.triangles().iter().all(|v| v.color[3] == FILL_ALPHA));
    }

    #[test]
    fn test_draw_world_through_camera_scope() {
        let mut world = PhysicsWorld::new();
        world.add_body(
            RigidBodyBuilder::fixed().build(),
            ColliderBuilder::segment(point![-1.0, 0.0], point![1.0, 0.0]).build(),
        );
        let camera = Camera::new(DVec2::new(800.0, 600.0), DVec2::ZERO, DVec2::new(32.0, 32.0), 0.0);

        let mut canvas = Canvas::new();
        {
            let mut scope = camera.pre_draw(&mut canvas);
            draw_world(&mut scope, &world);
        }

        // Scope dropped, so later geometry is untransformed
        canvas.draw_line(DVec2::ZERO, DVec2::ONE);

        let positions: Vec<[f32; 2]> = canvas.lines().iter().map(|v| v.position).collect();
        assert_eq!(
            positions,
            vec![[368.0, 300.0], [432.0, 300.0], [0.0, 0.0], [1.0, 1.0]]
        );
        assert!(canvas.triangles().is_empty());
    }
}
