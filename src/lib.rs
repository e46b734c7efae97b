//! A GPU drawing engine with a creative-coding sketch API: a transform and style state stack,
//! retained primitives cached on the GPU, an immediate `begin_shape`/`end_shape` path, lights and
//! materials, stencil clipping, and post-processing filters.
//!
//! Rendering goes through a [`Backend`]. [`WgpuBackend`] draws with wgpu;
//! [`RecordingBackend`] records every call and is what the tests draw into.

pub use wgpu;

pub mod backend;
pub mod curve;
pub mod filter;
pub mod geometry;
pub mod ibl;
pub mod immediate;
pub mod math;
pub mod shader;
pub mod tessellate;

mod cache;
mod clip;
mod color;
mod config;
mod error;
mod id;
mod image;
mod renderer;
mod state;

pub use backend::{Backend, RecordingBackend, TargetId, WgpuBackend};
pub use clip::ClipOptions;
pub use color::Color;
pub use config::{
    RendererConfig, ARC_STROKE_DETAIL_LIMIT, DEFAULT_ELLIPSE_DETAIL, DEFAULT_POINT_SIZE,
    DEFAULT_STROKE_WEIGHT, DIFFUSE_WIDTH, MAX_LIGHTS, SPECULAR_SIZE,
};
pub use error::{RenderError, Result};
pub use filter::{FilterKind, FilterSource};
pub use geometry::primitives::ArcMode;
pub use geometry::{Geometry, Mesh, ShapeKey};
pub use id::{FramebufferId, ImageId, MeshId, ProgramId, ShaderId, TextureId};
pub use image::Image;
pub use immediate::{EndShape, ShapeMode};
pub use math::Camera;
pub use renderer::Renderer;
pub use shader::{
    AttributeDecl, HookPoint, HookTable, Shader, ShaderClass, UniformDecl, UniformKind,
    UniformValue,
};
pub use state::{
    Attenuation, BlendMode, DirectionalLight, EraseRestore, Lights, PointLight, RenderState,
    SpotLight, StrokeCap, StrokeJoin,
};
pub use tessellate::PolygonTessellator;
