//! Rendering system with wgpu pipelines for the scene graph.
//!
//! Wireframes and polylines go through one line-list pipeline; point
//! clouds are instanced quads with either alpha or additive blending.
//! Every scene object gets its own vertex, index and uniform buffers,
//! cached by [`NodeId`] and dropped once the node leaves the scene.

mod batch;

use std::collections::HashMap;
use std::sync::Arc;
use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::error::RenderError;
use crate::params::RecordingConfig;
use crate::render_loop::DrawTarget;
use crate::scene::{NodeId, Object3d, Primitive, Scene};

pub use batch::{
    is_additive, line_indices, line_vertices, point_instances, LightRig, LineVertex,
    NodeUniforms, PointInstance,
};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Which pipeline draws a node
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PipelineKind {
    Lines,
    Points,
    AdditivePoints,
}

/// GPU resources for one scene object
struct GpuNode {
    kind: PipelineKind,
    vertex_count: usize,
    vertex_buffer: wgpu::Buffer,
    index_buffer: Option<wgpu::Buffer>,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Rendering system managing wgpu device, pipelines, and buffers
pub struct RenderSystem {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    node_layout: wgpu::BindGroupLayout,
    line_pipeline: wgpu::RenderPipeline,
    point_pipeline: wgpu::RenderPipeline,
    additive_pipeline: wgpu::RenderPipeline,
    nodes: HashMap<NodeId, GpuNode>,
    recording_config: Option<RecordingConfig>,
    frames_captured: usize,
}

impl RenderSystem {
    /// Create new rendering system
    pub async fn new(
        window: Arc<winit::window::Window>,
        recording_config: Option<RecordingConfig>,
    ) -> Result<Self, RenderError> {
        let size = window.inner_size();

        // Create wgpu instance
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Create surface (window must have 'static lifetime via Arc)
        let surface = instance.create_surface(window)?;

        // Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        log::info!("GPU: {}", adapter.get_info().name);

        // Request device
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
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
            .ok_or(RenderError::NoAdapter)?;

        let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT;

        // Add COPY_SRC if recording (needed for frame capture)
        if recording_config.is_some() {
            usage |= wgpu::TextureUsages::COPY_SRC;
        }

        let config = wgpu::SurfaceConfiguration {
            usage,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, config.width, config.height);

        // Load shaders
        let line_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Line Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("lines.wgsl").into()),
        });

        let point_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Point Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("points.wgsl").into()),
        });

        let node_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Node Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Node Pipeline Layout"),
            bind_group_layouts: &[&node_layout],
            push_constant_ranges: &[],
        });

        let line_buffers = [wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            }],
        }];

        let point_buffers = [wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }];

        let additive = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        };

        let line_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            PipelineSpec {
                label: "Line Pipeline",
                shader: &line_shader,
                buffers: &line_buffers,
                topology: wgpu::PrimitiveTopology::LineList,
                format: config.format,
                blend: wgpu::BlendState::ALPHA_BLENDING,
                depth_write: true,
            },
        );

        let point_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            PipelineSpec {
                label: "Point Pipeline",
                shader: &point_shader,
                buffers: &point_buffers,
                topology: wgpu::PrimitiveTopology::TriangleList,
                format: config.format,
                blend: wgpu::BlendState::ALPHA_BLENDING,
                depth_write: true,
            },
        );

        // Additive sprites still test depth but never occlude each other
        let additive_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            PipelineSpec {
                label: "Additive Point Pipeline",
                shader: &point_shader,
                buffers: &point_buffers,
                topology: wgpu::PrimitiveTopology::TriangleList,
                format: config.format,
                blend: additive,
                depth_write: false,
            },
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_view,
            node_layout,
            line_pipeline,
            point_pipeline,
            additive_pipeline,
            nodes: HashMap::new(),
            recording_config,
            frames_captured: 0,
        })
    }

    /// Reconfigure the surface for a new window size
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, width, height);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Frames written to disk so far (recording mode only)
    pub fn frames_captured(&self) -> usize {
        self.frames_captured
    }

    /// Bring the per-node GPU cache in line with the scene
    fn sync_nodes(&mut self, scene: &Scene, camera: &Camera) {
        self.nodes.retain(|id, _| scene.contains(*id));

        let lights = LightRig::collect(scene.lights());
        let viewport = self.size();

        for (id, object) in scene.objects() {
            let kind = pipeline_kind(object);
            let stale = self.nodes.get(&id).map_or(true, |node| {
                node.kind != kind || node.vertex_count != object.geometry.vertex_count()
            });
            if stale {
                let node = self.create_node(object, kind);
                self.nodes.insert(id, node);
            }

            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            match kind {
                PipelineKind::Lines => self.queue.write_buffer(
                    &node.vertex_buffer,
                    0,
                    bytemuck::cast_slice(&line_vertices(&object.geometry)),
                ),
                PipelineKind::Points | PipelineKind::AdditivePoints => self.queue.write_buffer(
                    &node.vertex_buffer,
                    0,
                    bytemuck::cast_slice(&point_instances(object)),
                ),
            }
            let uniforms = NodeUniforms::new(object, camera, viewport, &lights);
            self.queue
                .write_buffer(&node.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
        }
    }

    fn create_node(&self, object: &Object3d, kind: PipelineKind) -> GpuNode {
        let (vertex_bytes, index_buffer, index_count) = match kind {
            PipelineKind::Lines => {
                let indices = line_indices(object.primitive, &object.geometry);
                let buffer = self
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Node Index Buffer"),
                        contents: bytemuck::cast_slice(&indices),
                        usage: wgpu::BufferUsages::INDEX,
                    });
                (
                    std::mem::size_of::<LineVertex>() * object.geometry.vertex_count(),
                    Some(buffer),
                    indices.len() as u32,
                )
            }
            PipelineKind::Points | PipelineKind::AdditivePoints => (
                std::mem::size_of::<PointInstance>() * object.geometry.vertex_count(),
                None,
                0,
            ),
        };

        let vertex_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Node Vertex Buffer"),
            size: vertex_bytes.max(16) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Node Uniform Buffer"),
            size: std::mem::size_of::<NodeUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Node Bind Group"),
            layout: &self.node_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        GpuNode {
            kind,
            vertex_count: object.geometry.vertex_count(),
            vertex_buffer,
            index_buffer,
            index_count,
            uniform_buffer,
            bind_group,
        }
    }

    /// Render a frame (and capture it if recording)
    ///
    /// Returns `Ok(false)` when the surface was unavailable and nothing was
    /// presented or captured.
    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<bool, RenderError> {
        self.sync_nodes(scene, camera);

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost; reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(false);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timed out; skipping frame");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };
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
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            // Opaque-ish nodes first, additive sprites last
            let mut order: Vec<(NodeId, &GpuNode)> = self
                .nodes
                .iter()
                .filter(|(_, node)| node.vertex_count > 0)
                .map(|(id, node)| (*id, node))
                .collect();
            order.sort_by_key(|(id, node)| (node.kind == PipelineKind::AdditivePoints, *id));

            for (_, node) in order {
                render_pass.set_bind_group(0, &node.bind_group, &[]);
                render_pass.set_vertex_buffer(0, node.vertex_buffer.slice(..));
                match (node.kind, &node.index_buffer) {
                    (PipelineKind::Lines, Some(indices)) => {
                        render_pass.set_pipeline(&self.line_pipeline);
                        render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..node.index_count, 0, 0..1);
                    }
                    (PipelineKind::Lines, None) => {}
                    (PipelineKind::Points, _) => {
                        render_pass.set_pipeline(&self.point_pipeline);
                        render_pass.draw(0..6, 0..node.vertex_count as u32);
                    }
                    (PipelineKind::AdditivePoints, _) => {
                        render_pass.set_pipeline(&self.additive_pipeline);
                        render_pass.draw(0..6, 0..node.vertex_count as u32);
                    }
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));

        // Capture frame if recording
        if let Some(ref config) = self.recording_config {
            let path = config.frame_path(self.frames_captured);
            self.capture_frame(&output, &path)?;
            self.frames_captured += 1;
            if self.frames_captured % config.fps.max(1) as usize == 0 {
                log::info!(
                    "Recorded {}/{} frames",
                    self.frames_captured,
                    config.total_frames()
                );
            }
        }

        output.present();

        Ok(true)
    }

    /// Copy the presented texture to a PNG (recording mode only)
    fn capture_frame(
        &self,
        texture: &wgpu::SurfaceTexture,
        path: &std::path::Path,
    ) -> Result<(), RenderError> {
        let (width, height) = self.size();
        let bytes_per_pixel = 4; // RGBA8 or BGRA8
        let unpadded_bytes_per_row = width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        // Create buffer to read texture data
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Capture Buffer"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        // Copy texture to buffer
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Capture Encoder"),
            });

        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        self.queue.submit(std::iter::once(encoder.finish()));

        // Map buffer and save to PNG
        let buffer_slice = buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, |_| {});
        self.device.poll(wgpu::Maintain::Wait);

        let data = buffer_slice.get_mapped_range();
        let bgra = matches!(
            self.config.format,
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
        );
        let image_data = unpad_rows(
            &data,
            unpadded_bytes_per_row as usize,
            padded_bytes_per_row as usize,
            height as usize,
            bgra,
        );

        drop(data);
        buffer.unmap();

        image::save_buffer(path, &image_data, width, height, image::ColorType::Rgba8).map_err(
            |source| RenderError::Capture {
                path: path.to_path_buf(),
                source,
            },
        )
    }
}

impl DrawTarget for RenderSystem {
    type Error = RenderError;

    fn draw(&mut self, scene: &Scene, camera: &Camera) -> Result<bool, RenderError> {
        self.render(scene, camera)
    }
}

fn pipeline_kind(object: &Object3d) -> PipelineKind {
    match object.primitive {
        Primitive::Wireframe | Primitive::LineStrip => PipelineKind::Lines,
        Primitive::Points if is_additive(&object.material) => PipelineKind::AdditivePoints,
        Primitive::Points => PipelineKind::Points,
    }
}

/// Strip row padding from a mapped texture copy, converting BGRA to RGBA
fn unpad_rows(
    data: &[u8],
    row_bytes: usize,
    padded_row_bytes: usize,
    rows: usize,
    bgra: bool,
) -> Vec<u8> {
    let mut image_data = Vec::with_capacity(row_bytes * rows);
    for y in 0..rows {
        let start = y * padded_row_bytes;
        image_data.extend_from_slice(&data[start..start + row_bytes]);
    }
    if bgra {
        for pixel in image_data.chunks_exact_mut(4) {
            pixel.swap(0, 2);
        }
    }
    image_data
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

struct PipelineSpec<'a> {
    label: &'a str,
    shader: &'a wgpu::ShaderModule,
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    topology: wgpu::PrimitiveTopology,
    format: wgpu::TextureFormat,
    blend: wgpu::BlendState,
    depth_write: bool,
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    spec: PipelineSpec<'_>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(spec.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: spec.shader,
            entry_point: Some("vs_main"),
            buffers: spec.buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: spec.shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: spec.format,
                blend: Some(spec.blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: spec.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: spec.depth_write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
