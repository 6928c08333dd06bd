use std::sync::Arc;

use anyhow::{anyhow, Context};
use bytemuck::bytes_of;
use log::{debug, warn};
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::shared::{srgb_to_linear, GlobalUniform, ObjectConstants, SHADER};
use super::{FrameGlobals, RenderBackend};
use crate::error::{BackdropError, Result};
use crate::geometry::{Geometry, Mesh};
use crate::population::Transform;
use crate::viewport::Viewport;

/// Wireframe renderer backed by wgpu, drawing into a winit window.
pub struct WgpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    global_buffer: wgpu::Buffer,
    global_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    srgb_target: bool,
    /// One uniform block per submission index, reused every frame.
    uniforms: Vec<ObjectUniform>,
    /// Edge buffers of the mesh submitted at each index.
    meshes: SlotPool<Mesh, MeshBuffers>,
    pending: Option<PendingFrame>,
}

struct PendingFrame {
    output: wgpu::SurfaceTexture,
    draws: usize,
}

struct ObjectUniform {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl WgpuRenderer {
    /// Initializes the GPU renderer for the provided window.
    pub async fn new(window: Arc<Window>, viewport: Viewport) -> anyhow::Result<Self> {
        let (width, height) = viewport.physical_size();
        if width == 0 || height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;

        let device_descriptor = wgpu::DeviceDescriptor {
            label: Some("backdrop-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: Default::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
        };
        let (device, queue) = adapter
            .request_device(&device_descriptor)
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no texture formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("backdrop-shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let global_layout = uniform_layout::<GlobalUniform>(&device, "global-bind-layout");
        let object_layout = uniform_layout::<ObjectConstants>(&device, "object-bind-layout");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("backdrop-pipeline-layout"),
            bind_group_layouts: &[&global_layout, &object_layout],
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

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("backdrop-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: (3 * std::mem::size_of::<f32>()) as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x3,
                        offset: 0,
                        shader_location: 0,
                    }],
                }],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
            cache: None,
        });

        debug!("wgpu surface configured: {width}x{height} {surface_format:?}");

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            global_buffer,
            global_bind_group,
            object_layout,
            srgb_target: surface_format.is_srgb(),
            uniforms: Vec::new(),
            meshes: SlotPool::default(),
            pending: None,
        })
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    fn ensure_object_uniform(&mut self, index: usize) {
        while self.uniforms.len() <= index {
            let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("object-uniform"),
                size: std::mem::size_of::<ObjectConstants>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("object-bind-group"),
                layout: &self.object_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            self.uniforms.push(ObjectUniform { buffer, bind_group });
        }
    }
}

impl RenderBackend for WgpuRenderer {
    fn begin_frame(&mut self, globals: &FrameGlobals) -> Result<()> {
        let uniform = GlobalUniform {
            view_proj: globals.view_proj.to_cols_array_2d(),
        };
        self.queue
            .write_buffer(&self.global_buffer, 0, bytes_of(&uniform));

        match self.surface.get_current_texture() {
            Ok(output) => {
                self.pending = Some(PendingFrame {
                    output,
                    draws: 0,
                });
                Ok(())
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.reconfigure();
                Ok(())
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                Err(BackdropError::Render("GPU is out of memory".to_string()))
            }
            Err(err) => {
                warn!("surface unavailable ({err}); skipping frame");
                Ok(())
            }
        }
    }

    fn submit(&mut self, transform: &Transform, geometry: &Geometry) -> Result<()> {
        let Some(index) = self.pending.as_ref().map(|frame| frame.draws) else {
            return Ok(());
        };

        let device = &self.device;
        let label = geometry.archetype.label();
        self.meshes.get_or_build(index, &geometry.mesh, || {
            MeshBuffers::from_mesh(device, &geometry.mesh, label)
        });

        let material = &geometry.material;
        let color = if self.srgb_target {
            srgb_to_linear(material.color)
        } else {
            material.color
        };
        let constants = ObjectConstants {
            model: transform.model_matrix().to_cols_array_2d(),
            color: color.extend(material.opacity).into(),
        };
        self.ensure_object_uniform(index);
        self.queue
            .write_buffer(&self.uniforms[index].buffer, 0, bytes_of(&constants));

        if let Some(frame) = self.pending.as_mut() {
            frame.draws += 1;
        }
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        let Some(frame) = self.pending.take() else {
            return Ok(());
        };
        let view = frame
            .output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("backdrop-encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("backdrop-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.03,
                            g: 0.03,
                            b: 0.05,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.global_bind_group, &[]);
            for index in 0..frame.draws {
                let (Some(mesh), Some(uniform)) = (self.meshes.get(index), self.uniforms.get(index))
                else {
                    continue;
                };
                pass.set_vertex_buffer(0, mesh.vertex.slice(..));
                pass.set_index_buffer(mesh.index.slice(..), wgpu::IndexFormat::Uint32);
                pass.set_bind_group(1, &uniform.bind_group, &[]);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.output.present();
        Ok(())
    }

    fn resize(&mut self, viewport: &Viewport) -> Result<()> {
        let (width, height) = viewport.physical_size();
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.config.width = width;
        self.config.height = height;
        self.reconfigure();
        Ok(())
    }

    fn release(&mut self) {
        self.pending = None;
        self.uniforms.clear();
        self.meshes.clear();
    }
}

fn uniform_layout<T>(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
            },
            count: None,
        }],
    })
}

/// Resources indexed by submission order, rebuilt only when the source they
/// were built from changes.
struct SlotPool<K, T> {
    slots: Vec<Option<(K, T)>>,
}

impl<K, T> Default for SlotPool<K, T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<K: PartialEq + Clone, T> SlotPool<K, T> {
    fn get_or_build(&mut self, index: usize, key: &K, build: impl FnOnce() -> T) -> Option<&T> {
        if self.slots.len() <= index {
            self.slots.resize_with(index + 1, || None);
        }
        let slot = &mut self.slots[index];
        if !matches!(slot, Some((cached, _)) if cached == key) {
            *slot = Some((key.clone(), build()));
        }
        slot.as_ref().map(|(_, value)| value)
    }

    fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index)?.as_ref().map(|(_, value)| value)
    }

    fn clear(&mut self) {
        self.slots.clear();
    }
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    fn from_mesh(device: &wgpu::Device, mesh: &Mesh, label: &str) -> Self {
        let indices = mesh.line_indices();
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&mesh.vertex_data()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-edges")),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: indices.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Archetype, GeometryFactory};

    #[test]
    fn slots_rebuild_only_when_their_mesh_changes() {
        let factory = GeometryFactory::default();
        let ico = factory.create_archetype(Archetype::Icosahedron).mesh;
        let mut edited = ico.clone();
        edited.positions[0] *= 2.0;

        let mut pool: SlotPool<Mesh, usize> = SlotPool::default();
        let mut builds = 0;
        let mut build = || {
            builds += 1;
            builds
        };

        assert_eq!(pool.get_or_build(0, &ico, &mut build), Some(&1));
        assert_eq!(pool.get_or_build(1, &ico, &mut build), Some(&2));
        assert_eq!(pool.get_or_build(0, &ico, &mut build), Some(&1));
        assert_eq!(pool.get_or_build(1, &edited, &mut build), Some(&3));
        assert_eq!(pool.get(0), Some(&1));
        assert_eq!(builds, 3);

        pool.clear();
        assert_eq!(pool.get(0), None);
    }
}
