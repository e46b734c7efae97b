//! A backend that records every call instead of rendering.
//!
//! Used by the test suite to assert on resource lifetimes, uniforms and fixed-function state
//! without a GPU adapter.

use super::{
    physical_size, Backend, ClearOps, DrawCall, DrawGeometry, ImageLevel, MeshData, MeshPart,
    ProgramDescriptor, RasterState, TargetId,
};
use crate::error::Result;
use crate::geometry::{FillVertex, PointVertex, StrokeVertex};
use crate::id::{FramebufferId, IdAllocator, MeshId, ProgramId, TextureId};
use crate::shader::UniformSet;
use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedGeometry {
    Mesh { mesh: MeshId, part: MeshPart },
    Fill {
        vertices: Vec<FillVertex>,
        custom: Option<Vec<f32>>,
    },
    Stroke {
        vertices: Vec<StrokeVertex>,
        indices: Vec<u32>,
    },
    Points { vertices: Vec<PointVertex> },
    Fullscreen,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub target: TargetId,
    pub program: ProgramId,
    pub program_label: String,
    pub uniforms: UniformSet,
    pub geometry: RecordedGeometry,
    pub raster: RasterState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateProgram {
        program: ProgramId,
        label: String,
    },
    UploadMesh {
        mesh: MeshId,
        fill_indices: usize,
        stroke_indices: usize,
    },
    ReleaseMesh(MeshId),
    CreateTexture {
        texture: TextureId,
        width: u32,
        height: u32,
        levels: usize,
    },
    ReleaseTexture(TextureId),
    CreateFramebuffer {
        framebuffer: FramebufferId,
        width: u32,
        height: u32,
        density: f32,
    },
    ResizeFramebuffer {
        framebuffer: FramebufferId,
        width: u32,
        height: u32,
        density: f32,
    },
    ReleaseFramebuffer(FramebufferId),
    ResizeMain {
        width: u32,
        height: u32,
    },
    Clear {
        target: TargetId,
        ops: ClearOps,
    },
    Draw(RecordedDraw),
    ReadPixels(TargetId),
}

#[derive(Debug, Clone, Copy)]
struct Surface {
    color: TextureId,
    width: u32,
    height: u32,
}

#[derive(Debug)]
pub struct RecordingBackend {
    ids: IdAllocator,
    commands: Vec<Command>,
    programs: HashMap<ProgramId, String>,
    meshes: HashSet<MeshId>,
    textures: HashMap<TextureId, (u32, u32)>,
    framebuffers: HashMap<FramebufferId, Surface>,
    main: Surface,
    uploaded_meshes: usize,
    pixels: HashMap<TargetId, Vec<u8>>,
    max_texture_size: u32,
}

impl RecordingBackend {
    /// A recorder whose main target is `width` x `height` physical pixels.
    pub fn new(width: u32, height: u32) -> Self {
        let mut ids = IdAllocator::default();
        let color = TextureId(ids.allocate());
        let mut textures = HashMap::new();
        textures.insert(color, (width, height));
        Self {
            ids,
            commands: Vec::new(),
            programs: HashMap::new(),
            meshes: HashSet::new(),
            textures,
            framebuffers: HashMap::new(),
            main: Surface {
                color,
                width,
                height,
            },
            uploaded_meshes: 0,
            pixels: HashMap::new(),
            max_texture_size: 8192,
        }
    }

    pub fn with_max_texture_size(mut self, size: u32) -> Self {
        self.max_texture_size = size;
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn draws(&self) -> impl Iterator<Item = &RecordedDraw> {
        self.commands.iter().filter_map(|command| match command {
            Command::Draw(draw) => Some(draw),
            _ => None,
        })
    }

    /// Every mesh upload so far, including released ones.
    pub fn uploaded_meshes(&self) -> usize {
        self.uploaded_meshes
    }

    pub fn live_meshes(&self) -> usize {
        self.meshes.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn program_label(&self, program: ProgramId) -> Option<&str> {
        self.programs.get(&program).map(String::as_str)
    }

    /// Physical size of a target.
    pub fn target_size(&self, target: TargetId) -> Option<(u32, u32)> {
        self.surface(target).map(|surface| (surface.width, surface.height))
    }

    /// Pixels returned by the next reads of `target`.
    pub fn set_pixels(&mut self, target: TargetId, pixels: Vec<u8>) {
        self.pixels.insert(target, pixels);
    }

    fn surface(&self, target: TargetId) -> Option<&Surface> {
        match target {
            TargetId::Main => Some(&self.main),
            TargetId::Framebuffer(id) => self.framebuffers.get(&id),
        }
    }

    fn new_surface(&mut self, width: u32, height: u32) -> Surface {
        let color = TextureId(self.ids.allocate());
        self.textures.insert(color, (width, height));
        Surface {
            color,
            width,
            height,
        }
    }
}

impl Backend for RecordingBackend {
    fn create_program(&mut self, descriptor: &ProgramDescriptor<'_>) -> Result<ProgramId> {
        let program = ProgramId(self.ids.allocate());
        self.programs.insert(program, descriptor.label.to_string());
        self.commands.push(Command::CreateProgram {
            program,
            label: descriptor.label.to_string(),
        });
        Ok(program)
    }

    fn upload_mesh(&mut self, data: &MeshData<'_>) -> MeshId {
        let mesh = MeshId(self.ids.allocate());
        self.meshes.insert(mesh);
        self.uploaded_meshes += 1;
        self.commands.push(Command::UploadMesh {
            mesh,
            fill_indices: data.fill_indices.len(),
            stroke_indices: data.stroke_indices.len(),
        });
        mesh
    }

    fn release_mesh(&mut self, mesh: MeshId) {
        self.meshes.remove(&mesh);
        self.commands.push(Command::ReleaseMesh(mesh));
    }

    fn create_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> TextureId {
        self.create_mipmapped_texture(&[ImageLevel {
            width,
            height,
            pixels: pixels.to_vec(),
        }])
    }

    fn create_mipmapped_texture(&mut self, levels: &[ImageLevel]) -> TextureId {
        let texture = TextureId(self.ids.allocate());
        let (width, height) = levels
            .first()
            .map_or((1, 1), |level| (level.width, level.height));
        self.textures.insert(texture, (width, height));
        self.commands.push(Command::CreateTexture {
            texture,
            width,
            height,
            levels: levels.len(),
        });
        texture
    }

    fn release_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        self.commands.push(Command::ReleaseTexture(texture));
    }

    fn create_framebuffer(&mut self, width: u32, height: u32, density: f32) -> FramebufferId {
        let framebuffer = FramebufferId(self.ids.allocate());
        let (physical_width, physical_height) = physical_size(width, height, density);
        let surface = self.new_surface(physical_width, physical_height);
        self.framebuffers.insert(framebuffer, surface);
        self.commands.push(Command::CreateFramebuffer {
            framebuffer,
            width,
            height,
            density,
        });
        framebuffer
    }

    fn resize_framebuffer(&mut self, framebuffer: FramebufferId, width: u32, height: u32, density: f32) {
        let (physical_width, physical_height) = physical_size(width, height, density);
        match self.framebuffers.get_mut(&framebuffer) {
            Some(surface) => {
                surface.width = physical_width;
                surface.height = physical_height;
                self.textures
                    .insert(surface.color, (physical_width, physical_height));
            }
            None => warn!("Resizing unknown framebuffer {}", framebuffer),
        }
        self.commands.push(Command::ResizeFramebuffer {
            framebuffer,
            width,
            height,
            density,
        });
    }

    fn release_framebuffer(&mut self, framebuffer: FramebufferId) {
        if let Some(surface) = self.framebuffers.remove(&framebuffer) {
            self.textures.remove(&surface.color);
        }
        self.commands.push(Command::ReleaseFramebuffer(framebuffer));
    }

    fn target_texture(&self, target: TargetId) -> Option<TextureId> {
        self.surface(target).map(|surface| surface.color)
    }

    fn resize_main(&mut self, width: u32, height: u32) {
        self.main.width = width;
        self.main.height = height;
        self.textures.insert(self.main.color, (width, height));
        self.commands.push(Command::ResizeMain { width, height });
    }

    fn clear(&mut self, target: TargetId, ops: &ClearOps) {
        self.commands.push(Command::Clear {
            target,
            ops: *ops,
        });
    }

    fn draw(&mut self, call: &DrawCall<'_>) {
        let geometry = match call.geometry {
            DrawGeometry::Mesh { mesh, part } => RecordedGeometry::Mesh { mesh, part },
            DrawGeometry::Fill { vertices, custom } => RecordedGeometry::Fill {
                vertices: vertices.to_vec(),
                custom: custom.map(|custom| custom.values.to_vec()),
            },
            DrawGeometry::Stroke { vertices, indices } => RecordedGeometry::Stroke {
                vertices: vertices.to_vec(),
                indices: indices.to_vec(),
            },
            DrawGeometry::Points { vertices } => RecordedGeometry::Points {
                vertices: vertices.to_vec(),
            },
            DrawGeometry::Fullscreen => RecordedGeometry::Fullscreen,
        };
        self.commands.push(Command::Draw(RecordedDraw {
            target: call.target,
            program: call.program,
            program_label: self.programs.get(&call.program).cloned().unwrap_or_default(),
            uniforms: call.uniforms.clone(),
            geometry,
            raster: call.raster,
        }));
    }

    fn read_pixels(&mut self, target: TargetId) -> Vec<u8> {
        self.commands.push(Command::ReadPixels(target));
        if let Some(pixels) = self.pixels.get(&target) {
            return pixels.clone();
        }
        let (width, height) = self.target_size(target).unwrap_or((0, 0));
        vec![0; (width * height * 4) as usize]
    }

    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }
}
