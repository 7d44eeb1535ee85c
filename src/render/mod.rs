//! wgpu renderer drawing gallery frames into a winit window.
//!
//! The same code drives native windows and the WebGL canvas on `wasm32`.

mod shader;
mod texture;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytemuck::bytes_of;
use log::{debug, warn};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use crate::device::PlaneSegments;
use crate::gallery::{Frame, PlaneMesh, PlaneVertex, TextureKey, TextureUpload};

use shader::{GlobalUniform, PlaneUniform, SHADER};
use texture::{DepthBuffer, GpuTexture, MeshBuffers};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.03,
    g: 0.03,
    b: 0.05,
    a: 1.0,
};

/// GPU renderer backed by wgpu that draws the planes of a [`Frame`].
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth: DepthBuffer,
    image_pipeline: wgpu::RenderPipeline,
    title_pipeline: wgpu::RenderPipeline,
    global_buffer: wgpu::Buffer,
    global_bind_group: wgpu::BindGroup,
    plane_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    plane_mesh: MeshBuffers,
    title_mesh: MeshBuffers,
    textures: HashMap<TextureKey, GpuTexture>,
    blank: GpuTexture,
}

impl Renderer {
    /// Initializes the GPU renderer for `window` with image planes of the
    /// given subdivision.
    pub async fn new(window: Arc<Window>, segments: PlaneSegments) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(Arc::clone(&window))
            .context("failed to create drawing surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;

        let required_limits = if cfg!(target_arch = "wasm32") {
            wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits())
        } else {
            wgpu::Limits::default()
        };
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("gallery-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits,
                },
                None,
            )
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no supported formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, config.width, config.height);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("gallery-shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let global_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("global-bind-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<GlobalUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

        // Per-plane uniform, bitmap and sampler
        let plane_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("plane-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<PlaneUniform>() as u64,
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("gallery-pipeline-layout"),
            bind_group_layouts: &[&global_layout, &plane_layout],
            push_constant_ranges: &[],
        });

        let global_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("global-uniform"),
            size: std::mem::size_of::<GlobalUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let global_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("global-bind-group"),
            layout: &global_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: global_buffer.as_entire_binding(),
            }],
        });

        let image_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            surface_format,
            PipelineKind::Image,
        );
        let title_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            surface_format,
            PipelineKind::Title,
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("plane-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let plane_mesh = MeshBuffers::from_mesh(&device, &PlaneMesh::new(segments), "image-plane");
        let title_mesh = MeshBuffers::from_mesh(&device, &PlaneMesh::quad(), "title-plane");
        let blank = GpuTexture::blank(&device, &queue);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            depth,
            image_pipeline,
            title_pipeline,
            global_buffer,
            global_bind_group,
            plane_layout,
            sampler,
            plane_mesh,
            title_mesh,
            textures: HashMap::new(),
            blank,
        })
    }

    /// Returns the identifier of the window owned by the renderer.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    /// Exposes the inner window for event handling.
    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Resizes the swap chain to match the new dimensions.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, new_size.width, new_size.height);
    }

    /// Reconfigures the surface at its current size after it was lost.
    pub fn reconfigure(&mut self) {
        self.resize(self.size);
    }

    /// Rebuilds the image plane mesh with a new subdivision.
    pub fn set_segments(&mut self, segments: PlaneSegments) {
        self.plane_mesh =
            MeshBuffers::from_mesh(&self.device, &PlaneMesh::new(segments), "image-plane");
    }

    /// Uploads queued bitmaps, replacing textures with the same key.
    pub fn apply_uploads(&mut self, uploads: Vec<TextureUpload>) {
        for upload in uploads {
            match GpuTexture::from_upload(&self.device, &self.queue, &upload) {
                Ok(texture) => {
                    debug!(
                        "uploaded {:?} ({}x{})",
                        upload.key, upload.width, upload.height
                    );
                    self.textures.insert(upload.key, texture);
                }
                Err(reason) => warn!("skipping texture {:?}: {reason}", upload.key),
            }
        }
    }

    /// Drops every texture of the previous mount.
    pub fn reset_textures(&mut self) {
        self.textures.clear();
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    fn texture_view(&self, key: &TextureKey) -> &wgpu::TextureView {
        self.textures
            .get(key)
            .map(|texture| &texture.view)
            .unwrap_or(&self.blank.view)
    }

    fn plane_bind_group(
        &self,
        uniform: &PlaneUniform,
        key: &TextureKey,
        label: &str,
    ) -> wgpu::BindGroup {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytes_of(uniform),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.plane_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(self.texture_view(key)),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    /// Draws `frame`, or just clears the surface when there is none.
    pub fn render(&mut self, frame: Option<&Frame>) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("gallery-encoder"),
            });

        let mut images = Vec::new();
        let mut titles = Vec::new();
        if let Some(frame) = frame {
            let globals = GlobalUniform {
                view_proj: frame.view_proj.to_cols_array_2d(),
            };
            self.queue
                .write_buffer(&self.global_buffer, 0, bytes_of(&globals));
            for plane in &frame.planes {
                images.push(self.plane_bind_group(
                    &PlaneUniform::image(plane),
                    &plane.texture,
                    "image-bind-group",
                ));
                if let Some(title) = &plane.title {
                    titles.push(self.plane_bind_group(
                        &PlaneUniform::title(title),
                        &title.texture,
                        "title-bind-group",
                    ));
                }
            }
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("gallery-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_bind_group(0, &self.global_bind_group, &[]);

        pass.set_pipeline(&self.image_pipeline);
        pass.set_vertex_buffer(0, self.plane_mesh.vertex.slice(..));
        pass.set_index_buffer(self.plane_mesh.index.slice(..), wgpu::IndexFormat::Uint32);
        for bind_group in &images {
            pass.set_bind_group(1, bind_group, &[]);
            pass.draw_indexed(0..self.plane_mesh.index_count, 0, 0..1);
        }

        pass.set_pipeline(&self.title_pipeline);
        pass.set_vertex_buffer(0, self.title_mesh.vertex.slice(..));
        pass.set_index_buffer(self.title_mesh.index.slice(..), wgpu::IndexFormat::Uint32);
        for bind_group in &titles {
            pass.set_bind_group(1, bind_group, &[]);
            pass.draw_indexed(0..self.title_mesh.index_count, 0, 0..1);
        }

        drop(pass);
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum PipelineKind {
    Image,
    Title,
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    kind: PipelineKind,
) -> wgpu::RenderPipeline {
    let (label, vertex_entry, fragment_entry, blend) = match kind {
        PipelineKind::Image => (
            "image-pipeline",
            "vs_image",
            "fs_image",
            wgpu::BlendState::REPLACE,
        ),
        PipelineKind::Title => (
            "title-pipeline",
            "vs_title",
            "fs_title",
            wgpu::BlendState::ALPHA_BLENDING,
        ),
    };
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: vertex_entry,
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<PlaneVertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[
                    wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x3,
                        offset: 0,
                        shader_location: 0,
                    },
                    wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x2,
                        offset: (3 * std::mem::size_of::<f32>()) as u64,
                        shader_location: 1,
                    },
                ],
            }],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DepthBuffer::FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: fragment_entry,
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
    })
}
