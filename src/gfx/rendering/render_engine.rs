//! WGPU-based rendering engine for the snapforge viewer
//!
//! [`WgpuEngine`] owns the instance, adapter and device acquired by a toolkit
//! source. Every `display` asks it for a fresh [`WgpuContext`], which owns the
//! window surface, depth buffer, global uniforms and the uploaded meshes of
//! the current scene.

use std::{iter, sync::Arc};

use cgmath::Matrix4;
use wgpu::{DepthStencilState, TextureFormat};
use winit::window::Window;

use crate::{
    error::{Error, Result},
    gfx::{
        camera::camera_utils::CameraUniform,
        engine::{Engine, EngineContext, Light, SurfaceSize},
        resources::{
            global_bindings::{update_global_ubo, GlobalBindings, GlobalUBO},
            texture_resource::TextureResource,
        },
        scene::{SceneGraph, Vertex3D},
    },
};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.08,
    g: 0.09,
    b: 0.11,
    a: 1.0,
};

/// How a toolkit source asks for an adapter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdapterRequest {
    pub backends: wgpu::Backends,
    pub force_fallback_adapter: bool,
    pub power_preference: wgpu::PowerPreference,
}

impl Default for AdapterRequest {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            force_fallback_adapter: false,
            power_preference: wgpu::PowerPreference::HighPerformance,
        }
    }
}

/// GPU device shared by every context of one toolkit
pub struct WgpuEngine {
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl WgpuEngine {
    /// Requests an adapter and device. Any failure is reported as
    /// `LibraryUnavailable` so the toolkit loader can move on to its next
    /// source.
    pub async fn acquire(request: AdapterRequest) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: request.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: request.power_preference,
                compatible_surface: None,
                force_fallback_adapter: request.force_fallback_adapter,
            })
            .await
            .map_err(|e| Error::LibraryUnavailable(format!("no adapter: {e}")))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| Error::LibraryUnavailable(format!("no device: {e}")))?;

        let info = adapter.get_info();
        log::info!("Acquired {:?} adapter {} ({:?})", info.backend, info.name, info.device_type);

        Ok(Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }
}

impl Engine for WgpuEngine {
    fn name(&self) -> String {
        let info = self.adapter.get_info();
        format!("{} ({:?})", info.name, info.backend)
    }

    fn create_context(
        &self,
        window: Option<Arc<Window>>,
        size: SurfaceSize,
    ) -> Result<Box<dyn EngineContext>> {
        let window =
            window.ok_or_else(|| Error::Surface("container has no window to draw into".into()))?;
        let surface = self
            .instance
            .create_surface(window)
            .map_err(|e| Error::Surface(e.to_string()))?;

        if !self.adapter.is_surface_supported(&surface) {
            return Err(Error::Surface(format!(
                "adapter {} cannot present to this window",
                self.adapter.get_info().name
            )));
        }

        let context = WgpuContext::new(
            surface,
            &self.adapter,
            self.device.clone(),
            self.queue.clone(),
            size,
        )?;
        Ok(Box::new(context))
    }
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

/// Per-container drawing state
pub struct WgpuContext {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    pipeline: wgpu::RenderPipeline,
    global_ubo: GlobalUBO,
    global_bindings: GlobalBindings,
    lights: Vec<Light>,
    meshes: Vec<GpuMesh>,
    model: Option<Matrix4<f32>>,
}

impl WgpuContext {
    fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        size: SurfaceSize,
    ) -> Result<Self> {
        let surface_capabilities = surface.get_capabilities(adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| Error::Surface("surface reports no formats".into()))?;
        let alpha_mode = surface_capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture =
            TextureResource::create_depth_texture(&device, &config, "depth_texture");

        let global_ubo = GlobalUBO::new(&device);
        let global_bindings = GlobalBindings::new(&device, &global_ubo);
        let pipeline = create_pipeline(&device, format, global_bindings.bind_group_layout());

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_texture,
            pipeline,
            global_ubo,
            global_bindings,
            lights: Vec::new(),
            meshes: Vec::new(),
            model: None,
        })
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "depth_texture");
    }
}

impl EngineContext for WgpuContext {
    fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    fn lights(&self) -> &[Light] {
        &self.lights
    }

    fn set_scene(&mut self, scene: &SceneGraph) -> Result<()> {
        self.meshes = scene
            .root()
            .meshes
            .iter()
            .filter(|mesh| !mesh.is_empty())
            .map(|mesh| {
                let vertices = mesh.vertices();
                let vertex_buffer = wgpu::util::DeviceExt::create_buffer_init(
                    self.device.as_ref(),
                    &wgpu::util::BufferInitDescriptor {
                        label: Some("Vertex Buffer"),
                        contents: bytemuck::cast_slice(&vertices),
                        usage: wgpu::BufferUsages::VERTEX,
                    },
                );
                let index_buffer = wgpu::util::DeviceExt::create_buffer_init(
                    self.device.as_ref(),
                    &wgpu::util::BufferInitDescriptor {
                        label: Some("Index Buffer"),
                        contents: bytemuck::cast_slice(&mesh.indices),
                        usage: wgpu::BufferUsages::INDEX,
                    },
                );
                GpuMesh {
                    vertex_buffer,
                    index_buffer,
                    index_count: mesh.indices.len() as u32,
                }
            })
            .collect();
        self.model = Some(scene.model_matrix());

        log::debug!("Uploaded {} meshes", self.meshes.len());
        Ok(())
    }

    fn has_scene(&self) -> bool {
        self.model.is_some()
    }

    fn resize(&mut self, size: SurfaceSize) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.reconfigure();
    }

    fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.config.width, self.config.height)
    }

    fn render(&mut self, camera: &CameraUniform) -> Result<()> {
        update_global_ubo(
            &mut self.global_ubo,
            &self.queue,
            camera,
            self.model,
            &self.lights,
        );

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::debug!("Surface timeout, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(Error::Surface(e.to_string())),
        };

        let surface_texture_view = surface_texture
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
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, self.global_bindings.bind_group(), &[]);

            for mesh in &self.meshes {
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        self.queue.submit(iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    format: TextureFormat,
    globals_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Viewer Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Viewer Pipeline Layout"),
        bind_group_layouts: &[globals_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Viewer Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex3D::desc()],
            compilation_options: Default::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // generated meshes are not reliably closed or consistently wound
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
            unclipped_depth: false,
        },
        depth_stencil: Some(DepthStencilState {
            format: TextureResource::DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        multiview: None,
        cache: None,
    })
}
