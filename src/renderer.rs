//! The drawing context.
//!
//! A [`Renderer`] owns one [`Backend`] plus every cache tied to it (programs, retained meshes,
//! textures, image lights, filter layers) and turns drawing calls into backend draw calls in
//! call order.

use ahash::{HashMap, HashMapExt};
use tracing::{debug, warn};

use crate::backend::{
    physical_size, Backend, ClearOps, CustomData, DrawCall, DrawGeometry, MeshPart, RasterState,
    TargetId, WgpuBackend,
};
use crate::clip::{ClipOptions, ClipPhase, ClipState};
use crate::color::Color;
use crate::config::{RendererConfig, ARC_STROKE_DETAIL_LIMIT, DEFAULT_ELLIPSE_DETAIL, MAX_LIGHTS};
use crate::curve::{
    bezier_coefficients, quadratic_coefficients, sample_bezier, sample_catmull, sample_quadratic,
    CoefficientTable, CurvePoint,
};
use crate::error::{RenderError, Result};
use crate::filter::{FilterKind, FilterPipeline, FilterSource, FilterTarget};
use crate::geometry::primitives::{self as shapes, ArcMode};
use crate::geometry::{
    point_quads, stroke_segments, FillVertex, Geometry, GeometryBuilder, GeometryCache, Mesh,
    PointVertex, ShapeKey,
};
use crate::ibl::ImageLightCache;
use crate::id::{FramebufferId, ImageId, TextureId};
use crate::image::Image;
use crate::immediate::{
    assign_face_normals, EndShape, ImmediateBuffer, ShapeData, ShapeMode, VertexInputs, FILL,
    NORMAL, STROKE, UV,
};
use crate::math::{self, Camera, Mat4, Vec3};
use crate::shader::policy::{resolve_fill, resolve_point, resolve_stroke};
use crate::shader::{
    DefaultProgram, DefaultShaders, DrawMode, FillRequest, ProgramCache, Shader, ShaderClass,
    UniformDecl, UniformSet, UniformValue,
};
use crate::state::{
    Attenuation, BlendMode, DirectionalLight, EraseRestore, Lights, PointLight, RenderState, SpotLight,
    StateStack, StrokeCap, StrokeJoin,
};
use crate::tessellate::PolygonTessellator;

mod clipping;
mod construction;
mod dispatch;
mod effects;
mod framebuffers;
mod geometry;
mod immediate;
mod lights;
mod materials;
mod primitives;
mod shaders;
mod surface;
mod transforms;

/// Logical size and pixel density of a draw target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Surface {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) density: f32,
}

impl Surface {
    pub(crate) fn physical(&self) -> (u32, u32) {
        physical_size(self.width, self.height, self.density)
    }
}

pub struct Renderer<B: Backend> {
    backend: B,
    config: RendererConfig,

    main: Surface,
    framebuffers: HashMap<FramebufferId, Surface>,
    /// Where draws currently go.
    target: TargetId,

    states: StateStack,
    clip: ClipState,

    defaults: DefaultShaders,
    programs: ProgramCache,

    geometry: GeometryCache,
    building: Option<(GeometryBuilder, Mat4)>,

    immediate: ImmediateBuffer,
    /// Normal given to immediate vertices added after `normal()`.
    current_normal: [f32; 3],
    tessellator: PolygonTessellator,
    bezier_table: CoefficientTable<4>,
    quadratic_table: CoefficientTable<3>,
    curve_detail: u32,
    curve_tightness: f32,

    textures: HashMap<ImageId, TextureId>,
    image_lights: ImageLightCache,
    filters: FilterPipeline,

}
