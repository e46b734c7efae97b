//! The seam between the drawing engine and a GPU API.
//!
//! A [`Backend`] owns every GPU object (programs, buffers, textures, framebuffers) and exposes them
//! through plain ids. Draw calls carry everything needed to configure the pipeline, so backends
//! keep no notion of "current" state beyond what they cache for speed.

pub(crate) mod layout;
mod gpu;
mod pipeline;
mod readback;
mod recording;

pub use gpu::WgpuBackend;
pub use recording::{Command, RecordedDraw, RecordedGeometry, RecordingBackend};

use crate::error::Result;
use crate::geometry::{FillVertex, PointVertex, StrokeVertex};
use crate::id::{FramebufferId, MeshId, ProgramId, TextureId};
use crate::shader::{AttributeDecl, UniformDecl, UniformSet};
use crate::state::BlendMode;

/// A surface draw calls can render into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TargetId {
    #[default]
    Main,
    Framebuffer(FramebufferId),
}

/// Which vertex stream a program consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Fill,
    Stroke,
    Point,
    /// No vertex buffer; three vertices cover the target.
    Fullscreen,
}

/// Everything needed to compile a program.
#[derive(Debug, Clone, Copy)]
pub struct ProgramDescriptor<'a> {
    pub label: &'a str,
    /// A complete WGSL module with `vs_main` and `fs_main` entry points.
    pub source: &'a str,
    pub vertex_format: VertexFormat,
    /// Members of the `Uniforms` struct bound at `@group(0) @binding(0)`, in declaration order.
    pub uniforms: &'a [UniformDecl],
    /// Texture uniforms; texture `i` is bound at `@group(1) @binding(2 * i)` with its sampler at
    /// `2 * i + 1`.
    pub textures: &'a [String],
    /// Custom per-vertex attributes, bound after the built-in fill attributes.
    pub attributes: &'a [AttributeDecl],
}

/// Mesh data uploaded once and drawn by reference.
#[derive(Debug, Clone, Copy)]
pub struct MeshData<'a> {
    pub fill_vertices: &'a [FillVertex],
    pub fill_indices: &'a [u32],
    pub stroke_vertices: &'a [StrokeVertex],
    pub stroke_indices: &'a [u32],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshPart {
    Fill,
    Stroke,
}

/// Values for custom attributes, interleaved per vertex in program declaration order.
#[derive(Debug, Clone, Copy)]
pub struct CustomData<'a> {
    pub components: &'a [u32],
    pub values: &'a [f32],
}

/// Vertex input of one draw.
#[derive(Debug, Clone, Copy)]
pub enum DrawGeometry<'a> {
    Mesh { mesh: MeshId, part: MeshPart },
    /// Non-indexed triangle list.
    Fill {
        vertices: &'a [FillVertex],
        custom: Option<CustomData<'a>>,
    },
    Stroke {
        vertices: &'a [StrokeVertex],
        indices: &'a [u32],
    },
    Points { vertices: &'a [PointVertex] },
    Fullscreen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilCompare {
    Equal,
    NotEqual,
}

/// Stencil configuration of one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilMode {
    #[default]
    Disabled,
    /// Always passes and writes `reference` wherever geometry is drawn.
    Write { reference: u32 },
    /// Passes where the stored value compares to `reference`; never writes.
    Test {
        compare: StencilCompare,
        reference: u32,
    },
}

/// Fixed-function state of one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterState {
    pub blend: BlendMode,
    pub depth_test: bool,
    pub depth_write: bool,
    pub stencil: StencilMode,
    pub color_write: bool,
}

impl Default for RasterState {
    fn default() -> Self {
        Self {
            blend: BlendMode::Blend,
            depth_test: true,
            depth_write: true,
            stencil: StencilMode::Disabled,
            color_write: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub target: TargetId,
    pub program: ProgramId,
    pub uniforms: &'a UniformSet,
    pub geometry: DrawGeometry<'a>,
    pub raster: RasterState,
}

/// Which buffers of a target to clear and to what.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClearOps {
    pub color: Option<[f32; 4]>,
    pub depth: Option<f32>,
    pub stencil: Option<u32>,
}

impl ClearOps {
    pub fn color(color: [f32; 4]) -> Self {
        Self {
            color: Some(color),
            ..Default::default()
        }
    }

    pub fn depth() -> Self {
        Self {
            depth: Some(1.0),
            ..Default::default()
        }
    }

    pub fn stencil(value: u32) -> Self {
        Self {
            stencil: Some(value),
            ..Default::default()
        }
    }

    pub fn all(color: [f32; 4]) -> Self {
        Self {
            color: Some(color),
            depth: Some(1.0),
            stencil: Some(0),
        }
    }
}

/// One level of a mipmapped texture, RGBA8.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLevel {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Physical size of a `width` x `height` surface at `density`.
pub fn physical_size(width: u32, height: u32, density: f32) -> (u32, u32) {
    let scale = |v: u32| ((v as f32 * density).ceil() as u32).max(1);
    (scale(width), scale(height))
}

/// GPU resources and command submission for one renderer context.
pub trait Backend {
    fn create_program(&mut self, descriptor: &ProgramDescriptor<'_>) -> Result<ProgramId>;

    fn upload_mesh(&mut self, data: &MeshData<'_>) -> MeshId;
    fn release_mesh(&mut self, mesh: MeshId);

    /// Uploads tightly packed RGBA8 pixels.
    fn create_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> TextureId;
    fn create_mipmapped_texture(&mut self, levels: &[ImageLevel]) -> TextureId;
    fn release_texture(&mut self, texture: TextureId);

    /// Sizes are logical; the backend allocates `physical_size(width, height, density)`.
    fn create_framebuffer(&mut self, width: u32, height: u32, density: f32) -> FramebufferId;
    fn resize_framebuffer(&mut self, framebuffer: FramebufferId, width: u32, height: u32, density: f32);
    fn release_framebuffer(&mut self, framebuffer: FramebufferId);

    /// The color texture of a target, for sampling it in a later draw.
    fn target_texture(&self, target: TargetId) -> Option<TextureId>;
    /// Resizes the main surface to a physical size.
    fn resize_main(&mut self, width: u32, height: u32);

    fn clear(&mut self, target: TargetId, ops: &ClearOps);
    fn draw(&mut self, call: &DrawCall<'_>);

    /// RGBA8 rows of a target's color buffer at its physical size.
    fn read_pixels(&mut self, target: TargetId) -> Vec<u8>;

    fn max_texture_size(&self) -> u32;
}
