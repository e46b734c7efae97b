//! The wgpu implementation of [`Backend`].

use super::layout::UniformLayout;
use super::pipeline::{
    color_target, depth_stencil_state, stencil_reference, vertex_buffers, COLOR_FORMAT,
    DEPTH_STENCIL_FORMAT,
};
use super::readback::read_texture;
use super::{
    physical_size, Backend, ClearOps, DrawCall, DrawGeometry, ImageLevel, MeshData, MeshPart,
    ProgramDescriptor, RasterState, TargetId, VertexFormat,
};
use crate::error::{RenderError, Result};
use crate::id::{FramebufferId, IdAllocator, MeshId, ProgramId, TextureId};
use crate::shader::AttributeDecl;
use ahash::{HashMap, HashMapExt};
use smallvec::SmallVec;
use tracing::{debug, error, warn};
use wgpu::util::DeviceExt;
use wgpu::InstanceDescriptor;

struct Program {
    module: wgpu::ShaderModule,
    vertex_format: VertexFormat,
    layout: UniformLayout,
    textures: Vec<String>,
    attributes: Vec<AttributeDecl>,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    label: String,
}

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

struct GpuMesh {
    fill_vertices: Option<wgpu::Buffer>,
    fill_indices: Option<(wgpu::Buffer, u32)>,
    stroke_vertices: Option<wgpu::Buffer>,
    stroke_indices: Option<(wgpu::Buffer, u32)>,
}

struct RenderTarget {
    color: TextureId,
    depth_view: wgpu::TextureView,
}

/// Renders into offscreen RGBA8 textures with a `Depth24PlusStencil8` attachment each.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    ids: IdAllocator,
    uniform_bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    white: TextureId,
    programs: HashMap<ProgramId, Program>,
    pipelines: HashMap<(ProgramId, RasterState), wgpu::RenderPipeline>,
    meshes: HashMap<MeshId, GpuMesh>,
    textures: HashMap<TextureId, GpuTexture>,
    framebuffers: HashMap<FramebufferId, RenderTarget>,
    main: RenderTarget,
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_stencil_texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_STENCIL_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_color_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    mip_level_count: u32,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: COLOR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn write_level(queue: &wgpu::Queue, texture: &wgpu::Texture, level: u32, width: u32, height: u32, pixels: &[u8]) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: level,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

fn uniform_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("uniform_bind_group_layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

fn texture_bind_group_layout(device: &wgpu::Device, count: usize) -> wgpu::BindGroupLayout {
    let entries: Vec<wgpu::BindGroupLayoutEntry> = (0..count as u32)
        .flat_map(|i| {
            [
                wgpu::BindGroupLayoutEntry {
                    binding: 2 * i,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2 * i + 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ]
        })
        .collect();
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("texture_bind_group_layout"),
        entries: &entries,
    })
}

impl WgpuBackend {
    /// Creates a backend with a `width` x `height` main target and no window surface.
    ///
    /// Returns [`RenderError::NoAdapter`] when no GPU adapter is available, so tests can skip.
    pub async fn new_headless(width: u32, height: u32) -> Result<Self> {
        let instance = wgpu::Instance::new(&InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|error| RenderError::Backend(error.to_string()))?;

        Ok(Self::from_device(device, queue, width, height))
    }

    /// Wraps an existing device. Validation errors are logged instead of panicking.
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue, width: u32, height: u32) -> Self {
        device.on_uncaptured_error(Box::new(|error| {
            error!("wgpu error: {}", error);
        }));

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let mut ids = IdAllocator::default();
        let mut textures = HashMap::new();

        let white = TextureId(ids.allocate());
        let white_texture = create_color_texture(&device, "default_white_texture", 1, 1, 1);
        write_level(&queue, &white_texture, 0, 1, 1, &[255, 255, 255, 255]);
        textures.insert(
            white,
            GpuTexture {
                view: white_texture.create_view(&wgpu::TextureViewDescriptor::default()),
                texture: white_texture,
                width: 1,
                height: 1,
            },
        );

        let width = width.max(1);
        let height = height.max(1);
        let main_color = TextureId(ids.allocate());
        let main_texture = create_color_texture(&device, "main_color_texture", width, height, 1);
        textures.insert(
            main_color,
            GpuTexture {
                view: main_texture.create_view(&wgpu::TextureViewDescriptor::default()),
                texture: main_texture,
                width,
                height,
            },
        );
        let main = RenderTarget {
            color: main_color,
            depth_view: create_depth_view(&device, width, height),
        };

        Self {
            uniform_bind_group_layout: uniform_bind_group_layout(&device),
            device,
            queue,
            ids,
            sampler,
            white,
            programs: HashMap::new(),
            pipelines: HashMap::new(),
            meshes: HashMap::new(),
            textures,
            framebuffers: HashMap::new(),
            main,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn target(&self, target: TargetId) -> Option<&RenderTarget> {
        match target {
            TargetId::Main => Some(&self.main),
            TargetId::Framebuffer(id) => self.framebuffers.get(&id),
        }
    }

    fn new_target(&mut self, label: &str, width: u32, height: u32) -> RenderTarget {
        let color = TextureId(self.ids.allocate());
        let texture = create_color_texture(&self.device, label, width, height, 1);
        self.textures.insert(
            color,
            GpuTexture {
                view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
                texture,
                width,
                height,
            },
        );
        RenderTarget {
            color,
            depth_view: create_depth_view(&self.device, width, height),
        }
    }

    fn pipeline(&mut self, program_id: ProgramId, raster: RasterState) -> Option<&wgpu::RenderPipeline> {
        let program = self.programs.get(&program_id)?;
        let device = &self.device;
        Some(
            self.pipelines
                .entry((program_id, raster))
                .or_insert_with(|| {
                    debug!("Creating pipeline for '{}' with {:?}", program.label, raster);
                    let buffers = vertex_buffers(program.vertex_format, &program.attributes);
                    let layouts: SmallVec<[wgpu::VertexBufferLayout; 2]> = buffers
                        .iter()
                        .map(|(attributes, stride)| wgpu::VertexBufferLayout {
                            array_stride: *stride,
                            step_mode: wgpu::VertexStepMode::Vertex,
                            attributes,
                        })
                        .collect();
                    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                        label: Some(program.label.as_str()),
                        layout: Some(&program.pipeline_layout),
                        vertex: wgpu::VertexState {
                            module: &program.module,
                            entry_point: Some("vs_main"),
                            buffers: &layouts,
                            compilation_options: Default::default(),
                        },
                        fragment: Some(wgpu::FragmentState {
                            module: &program.module,
                            entry_point: Some("fs_main"),
                            targets: &[Some(color_target(&raster))],
                            compilation_options: Default::default(),
                        }),
                        primitive: wgpu::PrimitiveState::default(),
                        depth_stencil: Some(depth_stencil_state(&raster)),
                        multisample: wgpu::MultisampleState::default(),
                        multiview: None,
                        cache: None,
                    })
                }),
        )
    }

    fn buffer(&self, label: &str, contents: &[u8], usage: wgpu::BufferUsages) -> Option<wgpu::Buffer> {
        if contents.is_empty() {
            return None;
        }
        Some(
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents,
                    usage,
                }),
        )
    }
}

/// Vertex input of one draw after upload.
enum Prepared<'m> {
    Indexed {
        vertices: &'m wgpu::Buffer,
        indices: &'m wgpu::Buffer,
        count: u32,
    },
    Owned {
        vertices: wgpu::Buffer,
        custom: Option<wgpu::Buffer>,
        indices: Option<(wgpu::Buffer, u32)>,
        count: u32,
    },
    Fullscreen,
}

impl Backend for WgpuBackend {
    fn create_program(&mut self, descriptor: &ProgramDescriptor<'_>) -> Result<ProgramId> {
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(descriptor.label),
                source: wgpu::ShaderSource::Wgsl(descriptor.source.into()),
            });
        let texture_bind_group_layout =
            texture_bind_group_layout(&self.device, descriptor.textures.len());
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(descriptor.label),
                bind_group_layouts: &[&self.uniform_bind_group_layout, &texture_bind_group_layout],
                push_constant_ranges: &[],
            });
        let layout = UniformLayout::new(descriptor.uniforms);
        let limit = self.device.limits().max_uniform_buffer_binding_size as usize;
        if layout.size() > limit {
            return Err(RenderError::InvalidShader(format!(
                "'{}' needs {} bytes of uniforms, the device allows {}",
                descriptor.label,
                layout.size(),
                limit
            )));
        }
        let id = ProgramId(self.ids.allocate());
        debug!(
            "Compiled program '{}' as {} ({} uniform bytes)",
            descriptor.label,
            id,
            layout.size()
        );
        self.programs.insert(
            id,
            Program {
                module,
                vertex_format: descriptor.vertex_format,
                layout,
                textures: descriptor.textures.to_vec(),
                attributes: descriptor.attributes.to_vec(),
                texture_bind_group_layout,
                pipeline_layout,
                label: descriptor.label.to_string(),
            },
        );
        Ok(id)
    }

    fn upload_mesh(&mut self, data: &MeshData<'_>) -> MeshId {
        let vertex = wgpu::BufferUsages::VERTEX;
        let index = wgpu::BufferUsages::INDEX;
        let mesh = GpuMesh {
            fill_vertices: self.buffer("fill_vertices", bytemuck::cast_slice(data.fill_vertices), vertex),
            fill_indices: self
                .buffer("fill_indices", bytemuck::cast_slice(data.fill_indices), index)
                .map(|buffer| (buffer, data.fill_indices.len() as u32)),
            stroke_vertices: self.buffer("stroke_vertices", bytemuck::cast_slice(data.stroke_vertices), vertex),
            stroke_indices: self
                .buffer("stroke_indices", bytemuck::cast_slice(data.stroke_indices), index)
                .map(|buffer| (buffer, data.stroke_indices.len() as u32)),
        };
        let id = MeshId(self.ids.allocate());
        self.meshes.insert(id, mesh);
        id
    }

    fn release_mesh(&mut self, mesh: MeshId) {
        self.meshes.remove(&mesh);
    }

    fn create_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> TextureId {
        self.create_mipmapped_texture(&[ImageLevel {
            width,
            height,
            pixels: pixels.to_vec(),
        }])
    }

    fn create_mipmapped_texture(&mut self, levels: &[ImageLevel]) -> TextureId {
        let Some(base) = levels.first() else {
            warn!("Texture without levels; using the default white texture");
            return self.white;
        };
        let (width, height) = (base.width.max(1), base.height.max(1));
        let texture = create_color_texture(&self.device, "image_texture", width, height, levels.len() as u32);
        for (level, image) in levels.iter().enumerate() {
            let expected = (image.width * image.height * 4) as usize;
            if image.pixels.len() != expected {
                warn!(
                    "Texture level {} has {} bytes, expected {}; skipped",
                    level,
                    image.pixels.len(),
                    expected
                );
                continue;
            }
            write_level(&self.queue, &texture, level as u32, image.width, image.height, &image.pixels);
        }
        let id = TextureId(self.ids.allocate());
        self.textures.insert(
            id,
            GpuTexture {
                view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
                texture,
                width,
                height,
            },
        );
        id
    }

    fn release_texture(&mut self, texture: TextureId) {
        if texture != self.white {
            self.textures.remove(&texture);
        }
    }

    fn create_framebuffer(&mut self, width: u32, height: u32, density: f32) -> FramebufferId {
        let (width, height) = physical_size(width, height, density);
        let target = self.new_target("framebuffer_color_texture", width, height);
        let id = FramebufferId(self.ids.allocate());
        self.framebuffers.insert(id, target);
        id
    }

    fn resize_framebuffer(&mut self, framebuffer: FramebufferId, width: u32, height: u32, density: f32) {
        let (width, height) = physical_size(width, height, density);
        let Some(old) = self.framebuffers.get(&framebuffer) else {
            warn!("Resizing unknown framebuffer {}", framebuffer);
            return;
        };
        let unchanged = self
            .textures
            .get(&old.color)
            .is_some_and(|texture| texture.width == width && texture.height == height);
        if unchanged {
            return;
        }
        let old_color = old.color;
        let target = self.new_target("framebuffer_color_texture", width, height);
        self.textures.remove(&old_color);
        self.framebuffers.insert(framebuffer, target);
    }

    fn release_framebuffer(&mut self, framebuffer: FramebufferId) {
        if let Some(target) = self.framebuffers.remove(&framebuffer) {
            self.textures.remove(&target.color);
        }
    }

    fn target_texture(&self, target: TargetId) -> Option<TextureId> {
        self.target(target).map(|target| target.color)
    }

    fn resize_main(&mut self, width: u32, height: u32) {
        let old_color = self.main.color;
        self.main = self.new_target("main_color_texture", width.max(1), height.max(1));
        self.textures.remove(&old_color);
    }

    fn clear(&mut self, target: TargetId, ops: &ClearOps) {
        let Some(render_target) = self.target(target) else {
            warn!("Clearing unknown target {:?}", target);
            return;
        };
        let Some(color) = self.textures.get(&render_target.color) else {
            return;
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear_encoder"),
            });
        {
            let color_load = match ops.color {
                Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                    r: f64::from(r),
                    g: f64::from(g),
                    b: f64::from(b),
                    a: f64::from(a),
                }),
                None => wgpu::LoadOp::Load,
            };
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &color.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &render_target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: ops.depth.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: ops.stencil.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn draw(&mut self, call: &DrawCall<'_>) {
        if self.pipeline(call.program, call.raster).is_none() {
            warn!("Drawing with unknown program {}", call.program);
            return;
        }
        let (Some(program), Some(pipeline), Some(render_target)) = (
            self.programs.get(&call.program),
            self.pipelines.get(&(call.program, call.raster)),
            self.target(call.target),
        ) else {
            warn!("Drawing into unknown target {:?}", call.target);
            return;
        };
        let Some(color) = self.textures.get(&render_target.color) else {
            return;
        };

        let vertex = wgpu::BufferUsages::VERTEX;
        let prepared = match call.geometry {
            DrawGeometry::Mesh { mesh, part } => {
                let Some(mesh) = self.meshes.get(&mesh) else {
                    warn!("Drawing unknown mesh {}", mesh);
                    return;
                };
                let (vertices, indices) = match part {
                    MeshPart::Fill => (&mesh.fill_vertices, &mesh.fill_indices),
                    MeshPart::Stroke => (&mesh.stroke_vertices, &mesh.stroke_indices),
                };
                let (Some(vertices), Some((indices, count))) = (vertices, indices) else {
                    return;
                };
                Prepared::Indexed {
                    vertices,
                    indices,
                    count: *count,
                }
            }
            DrawGeometry::Fill { vertices, custom } => {
                let Some(buffer) = self.buffer("fill_vertices", bytemuck::cast_slice(vertices), vertex) else {
                    return;
                };
                let custom = match (custom, program.attributes.is_empty()) {
                    (Some(custom), false) => self.buffer("custom_attributes", bytemuck::cast_slice(custom.values), vertex),
                    (None, false) => {
                        let stride: u32 = program.attributes.iter().map(|a| a.components).sum();
                        let zeros = vec![0f32; vertices.len() * stride as usize];
                        self.buffer("custom_attributes", bytemuck::cast_slice(&zeros), vertex)
                    }
                    _ => None,
                };
                Prepared::Owned {
                    vertices: buffer,
                    custom,
                    indices: None,
                    count: vertices.len() as u32,
                }
            }
            DrawGeometry::Stroke { vertices, indices } => {
                let (Some(vertex_buffer), Some(index_buffer)) = (
                    self.buffer("stroke_vertices", bytemuck::cast_slice(vertices), vertex),
                    self.buffer("stroke_indices", bytemuck::cast_slice(indices), wgpu::BufferUsages::INDEX),
                ) else {
                    return;
                };
                Prepared::Owned {
                    vertices: vertex_buffer,
                    custom: None,
                    indices: Some((index_buffer, indices.len() as u32)),
                    count: 0,
                }
            }
            DrawGeometry::Points { vertices } => {
                let Some(buffer) = self.buffer("point_vertices", bytemuck::cast_slice(vertices), vertex) else {
                    return;
                };
                Prepared::Owned {
                    vertices: buffer,
                    custom: None,
                    indices: None,
                    count: vertices.len() as u32,
                }
            }
            DrawGeometry::Fullscreen => Prepared::Fullscreen,
        };

        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("uniform_buffer"),
                contents: &program.layout.pack(call.uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let uniform_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &self.uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let mut texture_entries: SmallVec<[wgpu::BindGroupEntry; 6]> = SmallVec::new();
        for (i, name) in program.textures.iter().enumerate() {
            let texture = call
                .uniforms
                .texture(name)
                .and_then(|id| self.textures.get(&id))
                .or_else(|| self.textures.get(&self.white));
            let Some(texture) = texture else {
                return;
            };
            texture_entries.push(wgpu::BindGroupEntry {
                binding: 2 * i as u32,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
            texture_entries.push(wgpu::BindGroupEntry {
                binding: 2 * i as u32 + 1,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            });
        }
        let texture_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("texture_bind_group"),
            layout: &program.texture_bind_group_layout,
            entries: &texture_entries,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("draw_encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("draw_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &color.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &render_target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(pipeline);
            render_pass.set_stencil_reference(stencil_reference(call.raster.stencil));
            render_pass.set_bind_group(0, &uniform_bind_group, &[]);
            render_pass.set_bind_group(1, &texture_bind_group, &[]);

            match &prepared {
                Prepared::Indexed {
                    vertices,
                    indices,
                    count,
                } => {
                    render_pass.set_vertex_buffer(0, vertices.slice(..));
                    render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..*count, 0, 0..1);
                }
                Prepared::Owned {
                    vertices,
                    custom,
                    indices,
                    count,
                } => {
                    render_pass.set_vertex_buffer(0, vertices.slice(..));
                    if let Some(custom) = custom {
                        render_pass.set_vertex_buffer(1, custom.slice(..));
                    }
                    match indices {
                        Some((indices, index_count)) => {
                            render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                            render_pass.draw_indexed(0..*index_count, 0, 0..1);
                        }
                        None => render_pass.draw(0..*count, 0..1),
                    }
                }
                Prepared::Fullscreen => render_pass.draw(0..3, 0..1),
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn read_pixels(&mut self, target: TargetId) -> Vec<u8> {
        let Some(texture) = self
            .target(target)
            .and_then(|target| self.textures.get(&target.color))
        else {
            warn!("Reading unknown target {:?}", target);
            return Vec::new();
        };
        read_texture(
            &self.device,
            &self.queue,
            &texture.texture,
            texture.width,
            texture.height,
        )
    }

    fn max_texture_size(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}
