//! Immediate-mode 2D drawing.
//!
//! Drawing is split in two halves. [`Canvas`] is a plain CPU-side batch of
//! alpha-blended triangles in reference-resolution coordinates; the engine
//! draws into it every frame and it can be inspected in tests without a GPU.
//! [`Draw2d`] owns the wgpu pipelines and uploads a canvas to the surface,
//! mapping reference coordinates through the current [`Presentation`].

use std::f32::consts::TAU;

use glam::Vec2;

use crate::assets::{FontAtlas, GlyphSource};
use crate::gpu::GpuContext;
use crate::presentation::Presentation;

/// Primitives whose alpha falls below one 8-bit step are never emitted.
pub const MIN_ALPHA: f32 = 1.0 / 255.0;

/// RGBA color with components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Opaque color from 8-bit channels.
    pub const fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Opaque color from channels on a 0–255 scale, clamped into range.
    ///
    /// Effect formulas are written on the 8-bit scale and may overshoot or go
    /// negative; this folds them back into a valid color.
    pub fn from_255(r: f32, g: f32, b: f32) -> Self {
        Self::rgb(
            (r / 255.0).clamp(0.0, 1.0),
            (g / 255.0).clamp(0.0, 1.0),
            (b / 255.0).clamp(0.0, 1.0),
        )
    }

    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    /// Same color with a different alpha.
    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Multiply the RGB channels by `factor`, keeping alpha.
    pub fn scaled(self, factor: f32) -> Self {
        Self {
            r: (self.r * factor).clamp(0.0, 1.0),
            g: (self.g * factor).clamp(0.0, 1.0),
            b: (self.b * factor).clamp(0.0, 1.0),
            a: self.a,
        }
    }

    /// Add per-channel offsets (0–255 scale), saturating at white.
    pub fn brightened(self, r: f32, g: f32, b: f32) -> Self {
        Self {
            r: (self.r + r / 255.0).clamp(0.0, 1.0),
            g: (self.g + g / 255.0).clamp(0.0, 1.0),
            b: (self.b + b / 255.0).clamp(0.0, 1.0),
            a: self.a,
        }
    }

    /// Returns true if drawing with this color would change any pixel.
    pub fn is_visible(&self) -> bool {
        self.a >= MIN_ALPHA
    }

    fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Vertex for 2D shape/text rendering.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex2d {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex2d {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex2d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
            // color
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };

    fn colored(position: Vec2, color: [f32; 4]) -> Self {
        Self {
            position: position.to_array(),
            uv: [0.0, 0.0],
            color,
        }
    }
}

/// CPU-side batch of 2D geometry for one frame.
///
/// Every primitive validates its geometry first: non-positive radius, width
/// or size, zero-length lines and invisible colors are dropped silently.
#[derive(Default)]
pub struct Canvas {
    colored: Vec<Vertex2d>,
    glyphs: Vec<Vertex2d>,
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            colored: Vec::with_capacity(4096),
            glyphs: Vec::new(),
        }
    }

    /// Clear all draw calls for the new frame.
    pub fn clear(&mut self) {
        self.colored.clear();
        self.glyphs.clear();
    }

    /// Untextured triangles recorded this frame.
    pub fn colored(&self) -> &[Vertex2d] {
        &self.colored
    }

    /// Glyph quads recorded this frame.
    pub fn glyphs(&self) -> &[Vertex2d] {
        &self.glyphs
    }

    pub fn vertex_count(&self) -> usize {
        self.colored.len() + self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colored.is_empty() && self.glyphs.is_empty()
    }

    /// Draw a colored rectangle.
    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        if w <= 0.0 || h <= 0.0 || !color.is_visible() {
            return;
        }
        let c = color.to_array();
        let (a, b) = (Vec2::new(x, y), Vec2::new(x + w, y));
        let (d, e) = (Vec2::new(x, y + h), Vec2::new(x + w, y + h));
        self.push_quad(a, b, e, d, c);
    }

    /// Draw a filled disk.
    pub fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        if radius <= 0.0 || !color.is_visible() {
            return;
        }
        let c = color.to_array();
        let segments = circle_segments(radius);
        let step = TAU / segments as f32;
        for i in 0..segments {
            let a0 = i as f32 * step;
            let a1 = a0 + step;
            self.colored.extend_from_slice(&[
                Vertex2d::colored(center, c),
                Vertex2d::colored(center + Vec2::from_angle(a0) * radius, c),
                Vertex2d::colored(center + Vec2::from_angle(a1) * radius, c),
            ]);
        }
    }

    /// Draw a ring whose outer edge sits at `radius`, `width` pixels thick.
    pub fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: Color) {
        if radius <= 0.0 || width <= 0.0 || !color.is_visible() {
            return;
        }
        if width >= radius {
            self.fill_circle(center, radius, color);
            return;
        }
        let c = color.to_array();
        let inner = radius - width;
        let segments = circle_segments(radius);
        let step = TAU / segments as f32;
        for i in 0..segments {
            let d0 = Vec2::from_angle(i as f32 * step);
            let d1 = Vec2::from_angle((i + 1) as f32 * step);
            self.push_quad(
                center + d0 * inner,
                center + d0 * radius,
                center + d1 * radius,
                center + d1 * inner,
                c,
            );
        }
    }

    /// Draw a straight segment `width` pixels thick.
    pub fn line(&mut self, from: Vec2, to: Vec2, width: f32, color: Color) {
        if width <= 0.0 || !color.is_visible() {
            return;
        }
        let Some(dir) = (to - from).try_normalize() else {
            return;
        };
        let normal = dir.perp() * (width * 0.5);
        self.push_quad(
            from + normal,
            to + normal,
            to - normal,
            from - normal,
            color.to_array(),
        );
    }

    /// Record geometry as a separate layer composited at `opacity`.
    ///
    /// Everything `draw` emits has its alpha multiplied by `opacity`, which is
    /// the same as rendering to a transparent intermediate surface and
    /// blending that surface over the frame.
    pub fn layer(&mut self, opacity: f32, draw: impl FnOnce(&mut Canvas)) {
        if opacity < MIN_ALPHA {
            return;
        }
        let start = self.colored.len();
        draw(self);
        let opacity = opacity.min(1.0);
        for vertex in &mut self.colored[start..] {
            vertex.color[3] *= opacity;
        }
    }

    /// Draw text with its top-left corner at `position`.
    pub fn text(&mut self, font: &impl GlyphSource, position: Vec2, text: &str, color: Color) {
        self.text_scaled(font, position, text, 1.0, color);
    }

    /// Draw text at `scale` times the font's rasterized size.
    pub fn text_scaled(
        &mut self,
        font: &impl GlyphSource,
        position: Vec2,
        text: &str,
        scale: f32,
        color: Color,
    ) {
        if scale <= 0.0 || !color.is_visible() {
            return;
        }
        let c = color.to_array();
        let mut cursor_x = position.x;
        let baseline_y = position.y + font.size() * scale;

        for ch in text.chars() {
            let Some(glyph) = font.glyph(ch) else {
                cursor_x += font.size() * scale * 0.5;
                continue;
            };

            if glyph.width > 0 && glyph.height > 0 {
                // fontdue's ymin is measured upward from the baseline
                let gw = glyph.width as f32 * scale;
                let gh = glyph.height as f32 * scale;
                let gx = cursor_x + glyph.offset_x * scale;
                let gy = baseline_y - glyph.offset_y * scale - gh;

                let [u0, v0, du, dv] = glyph.uv;
                let (u1, v1) = (u0 + du, v0 + dv);

                let vertex = |x: f32, y: f32, u: f32, v: f32| Vertex2d {
                    position: [x, y],
                    uv: [u, v],
                    color: c,
                };
                self.glyphs.extend_from_slice(&[
                    vertex(gx, gy, u0, v0),
                    vertex(gx + gw, gy, u1, v0),
                    vertex(gx, gy + gh, u0, v1),
                    vertex(gx + gw, gy, u1, v0),
                    vertex(gx + gw, gy + gh, u1, v1),
                    vertex(gx, gy + gh, u0, v1),
                ]);
            }

            cursor_x += glyph.advance * scale;
        }
    }

    fn push_quad(&mut self, a: Vec2, b: Vec2, c: Vec2, d: Vec2, color: [f32; 4]) {
        self.colored.extend_from_slice(&[
            Vertex2d::colored(a, color),
            Vertex2d::colored(b, color),
            Vertex2d::colored(c, color),
            Vertex2d::colored(a, color),
            Vertex2d::colored(c, color),
            Vertex2d::colored(d, color),
        ]);
    }
}

fn circle_segments(radius: f32) -> usize {
    ((radius * 0.75) as usize).clamp(8, 64)
}

/// Uniforms mapping reference coordinates onto the surface.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CanvasUniforms {
    resolution: [f32; 2],
    offset: [f32; 2],
    // x = scale, yzw unused
    params: [f32; 4],
}

const INITIAL_VERTICES: usize = 65536;

/// GPU renderer for a [`Canvas`].
///
/// The vertex buffer grows to the next power of two whenever a frame
/// outgrows it; it never shrinks.
pub struct Draw2d {
    colored_pipeline: wgpu::RenderPipeline,
    textured_pipeline: wgpu::RenderPipeline,

    vertex_buffer: wgpu::Buffer,
    vertex_capacity: usize,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_bind_group_layout: wgpu::BindGroupLayout,

    font_bind_group: Option<wgpu::BindGroup>,
}

impl Draw2d {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Canvas Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/canvas.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Canvas Uniforms"),
            size: std::mem::size_of::<CanvasUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Uniform bind group layout (group 0)
        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Canvas Uniform Layout"),
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

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Canvas Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        // Glyph atlas bind group layout (group 1)
        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Canvas Glyph Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let colored_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Canvas Colored Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let textured_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Canvas Textured Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
                push_constant_ranges: &[],
            });

        let blend_state = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
        };

        let pipeline = |label: &str, layout: &wgpu::PipelineLayout, fragment: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[Vertex2d::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fragment),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: gpu.config.format,
                        blend: Some(blend_state),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let colored_pipeline = pipeline(
            "Canvas Colored Pipeline",
            &colored_pipeline_layout,
            "fs_colored",
        );
        let textured_pipeline = pipeline(
            "Canvas Textured Pipeline",
            &textured_pipeline_layout,
            "fs_textured",
        );

        let vertex_buffer = create_vertex_buffer(gpu, INITIAL_VERTICES);

        Self {
            colored_pipeline,
            textured_pipeline,
            vertex_buffer,
            vertex_capacity: INITIAL_VERTICES,
            uniform_buffer,
            uniform_bind_group,
            texture_bind_group_layout,
            font_bind_group: None,
        }
    }

    /// Bind the glyph atlas used for [`Canvas::text`] quads.
    pub fn set_font(&mut self, gpu: &GpuContext, font: &FontAtlas) {
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Glyph Atlas Bind Group"),
            layout: &self.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&font.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&font.sampler),
                },
            ],
        });
        self.font_bind_group = Some(bind_group);
    }

    /// Upload and draw everything recorded in `canvas`.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        render_pass: &mut wgpu::RenderPass,
        canvas: &Canvas,
        presentation: &Presentation,
    ) {
        let uniforms = CanvasUniforms {
            resolution: presentation.surface_size().as_vec2().to_array(),
            offset: presentation.offset().to_array(),
            params: [presentation.scale(), 0.0, 0.0, 0.0],
        };
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let colored = canvas.colored();
        let glyphs = canvas.glyphs();
        let total = colored.len() + glyphs.len();
        if total == 0 {
            return;
        }

        if total > self.vertex_capacity {
            self.vertex_capacity = total.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(gpu, self.vertex_capacity);
        }

        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));

        if !colored.is_empty() {
            gpu.queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(colored));
            render_pass.set_pipeline(&self.colored_pipeline);
            render_pass.draw(0..colored.len() as u32, 0..1);
        }

        if let (false, Some(bind_group)) = (glyphs.is_empty(), &self.font_bind_group) {
            let offset = colored.len();
            gpu.queue.write_buffer(
                &self.vertex_buffer,
                (offset * std::mem::size_of::<Vertex2d>()) as u64,
                bytemuck::cast_slice(glyphs),
            );
            render_pass.set_pipeline(&self.textured_pipeline);
            render_pass.set_bind_group(1, bind_group, &[]);
            render_pass.draw(offset as u32..(offset + glyphs.len()) as u32, 0..1);
        }
    }
}

fn create_vertex_buffer(gpu: &GpuContext, vertices: usize) -> wgpu::Buffer {
    gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Canvas Vertex Buffer"),
        size: (vertices * std::mem::size_of::<Vertex2d>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::BlockFont;

    #[test]
    fn degenerate_primitives_are_skipped() {
        let mut canvas = Canvas::new();
        canvas.fill_circle(Vec2::ZERO, 0.0, Color::WHITE);
        canvas.fill_circle(Vec2::ZERO, -3.0, Color::WHITE);
        canvas.stroke_circle(Vec2::ZERO, 10.0, 0.0, Color::WHITE);
        canvas.line(Vec2::ONE, Vec2::ONE, 2.0, Color::WHITE);
        canvas.line(Vec2::ZERO, Vec2::ONE, 2.0, Color::WHITE.with_alpha(0.001));
        canvas.rect(0.0, 0.0, 0.0, 5.0, Color::WHITE);
        assert!(canvas.is_empty());
    }

    #[test]
    fn circle_emits_whole_triangles() {
        let mut canvas = Canvas::new();
        canvas.fill_circle(Vec2::new(50.0, 50.0), 4.0, Color::WHITE);
        assert_eq!(canvas.colored().len(), circle_segments(4.0) * 3);
        for vertex in canvas.colored() {
            let p = Vec2::from(vertex.position);
            assert!(p.distance(Vec2::new(50.0, 50.0)) <= 4.0 + 1e-4);
        }
    }

    #[test]
    fn thin_ring_falls_back_to_disk_when_width_exceeds_radius() {
        let mut ring = Canvas::new();
        ring.stroke_circle(Vec2::ZERO, 2.0, 3.0, Color::WHITE);
        let mut disk = Canvas::new();
        disk.fill_circle(Vec2::ZERO, 2.0, Color::WHITE);
        assert_eq!(ring.colored(), disk.colored());
    }

    #[test]
    fn layer_scales_alpha_of_its_geometry_only() {
        let mut canvas = Canvas::new();
        canvas.rect(0.0, 0.0, 1.0, 1.0, Color::WHITE);
        canvas.layer(0.25, |c| c.rect(0.0, 0.0, 1.0, 1.0, Color::WHITE.with_alpha(0.8)));

        let (outside, inside) = canvas.colored().split_at(6);
        assert!(outside.iter().all(|v| v.color[3] == 1.0));
        assert!(inside.iter().all(|v| (v.color[3] - 0.2).abs() < 1e-6));
    }

    #[test]
    fn invisible_layer_draws_nothing() {
        let mut canvas = Canvas::new();
        canvas.layer(0.0, |c| c.rect(0.0, 0.0, 1.0, 1.0, Color::WHITE));
        assert!(canvas.is_empty());
    }

    #[test]
    fn text_emits_a_quad_per_visible_glyph() {
        let font = BlockFont::new(10.0);
        let mut canvas = Canvas::new();
        canvas.text(&font, Vec2::new(5.0, 5.0), "ab c", Color::WHITE);
        assert_eq!(canvas.glyphs().len(), 3 * 6);
        assert!(canvas.colored().is_empty());

        let first = &canvas.glyphs()[..6];
        assert_eq!(first[0].position, [5.0, 5.0]);
        assert_eq!(first[4].position, [15.0, 15.0]);
    }

    #[test]
    fn scaled_text_grows_glyphs_and_advance() {
        let font = BlockFont::new(10.0);
        let mut canvas = Canvas::new();
        canvas.text_scaled(&font, Vec2::ZERO, "ab", 2.0, Color::WHITE);
        let glyphs = canvas.glyphs();
        assert_eq!(glyphs[4].position, [20.0, 20.0]);
        // second glyph starts one scaled advance along
        assert!((glyphs[6].position[0] - 12.0).abs() < 1e-5);

        canvas.clear();
        canvas.text_scaled(&font, Vec2::ZERO, "ab", 0.0, Color::WHITE);
        assert!(canvas.is_empty());
    }

    #[test]
    fn from_255_clamps_out_of_range_channels() {
        let c = Color::from_255(300.0, -20.0, 127.5);
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 0.0);
        assert!((c.b - 0.5).abs() < 1e-6);
    }
}
