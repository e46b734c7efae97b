//! Post-process filters.
//!
//! A filter renders the current target into a persistent layer framebuffer, either in one
//! fullscreen pass or, for blur, as a horizontal pass into a temp framebuffer followed by a
//! vertical pass into the layer. The caller composites the layer back onto the target.

use crate::backend::{Backend, ClearOps, DrawCall, DrawGeometry, RasterState, TargetId};
use crate::error::{RenderError, Result};
use crate::id::{FramebufferId, ProgramId, TextureId};
use crate::shader::{
    sources, ProgramCache, Shader, UniformDecl, UniformKind, UniformSet, UniformValue,
};
use crate::state::BlendMode;
use ahash::{HashMap, HashMapExt};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Gray,
    Erode,
    Dilate,
    Blur,
    Posterize,
    Opaque,
    Invert,
    Threshold,
}

impl FilterKind {
    /// Parameter used when the caller gives none.
    pub fn default_parameter(self) -> f32 {
        match self {
            FilterKind::Blur => 3.0,
            FilterKind::Posterize => 4.0,
            FilterKind::Threshold => 0.5,
            _ => 0.0,
        }
    }

    fn label(self) -> &'static str {
        match self {
            FilterKind::Gray => "filter_gray",
            FilterKind::Erode => "filter_erode",
            FilterKind::Dilate => "filter_dilate",
            FilterKind::Blur => "filter_blur",
            FilterKind::Posterize => "filter_posterize",
            FilterKind::Opaque => "filter_opaque",
            FilterKind::Invert => "filter_invert",
            FilterKind::Threshold => "filter_threshold",
        }
    }

    fn fragment(self) -> &'static str {
        match self {
            FilterKind::Gray => sources::GRAY_FS,
            FilterKind::Erode => sources::ERODE_FS,
            FilterKind::Dilate => sources::DILATE_FS,
            FilterKind::Blur => sources::BLUR_FS,
            FilterKind::Posterize => sources::POSTERIZE_FS,
            FilterKind::Opaque => sources::OPAQUE_FS,
            FilterKind::Invert => sources::INVERT_FS,
            FilterKind::Threshold => sources::THRESHOLD_FS,
        }
    }

    fn is_separable(self) -> bool {
        self == FilterKind::Blur
    }

    pub const ALL: [FilterKind; 8] = [
        FilterKind::Gray,
        FilterKind::Erode,
        FilterKind::Dilate,
        FilterKind::Blur,
        FilterKind::Posterize,
        FilterKind::Opaque,
        FilterKind::Invert,
        FilterKind::Threshold,
    ];
}

/// What a filter call runs.
#[derive(Debug, Clone)]
pub enum FilterSource {
    Builtin { kind: FilterKind, parameter: Option<f32> },
    /// A user program from [`Shader::filter`]; always a single pass.
    Custom(Shader),
    /// Replaces the target with the view of an equirectangular `panorama` seen through the
    /// current camera.
    SphereMap {
        panorama: TextureId,
        fov_y: f32,
        aspect: f32,
        /// Column-major rotation from view space back to world space.
        view_rotation: [f32; 9],
    },
}

impl From<FilterKind> for FilterSource {
    fn from(kind: FilterKind) -> Self {
        FilterSource::Builtin {
            kind,
            parameter: None,
        }
    }
}

impl From<Shader> for FilterSource {
    fn from(shader: Shader) -> Self {
        FilterSource::Custom(shader)
    }
}

/// Logical size and density of the target being filtered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterTarget {
    pub target: TargetId,
    pub width: u32,
    pub height: u32,
    pub density: f32,
}

impl FilterTarget {
    /// Size of one physical texel in uv units.
    pub fn texel_size(&self) -> [f32; 2] {
        [
            1.0 / (self.width as f32 * self.density),
            1.0 / (self.height as f32 * self.density),
        ]
    }
}

#[derive(Debug, Clone, Copy)]
struct Layer {
    framebuffer: FramebufferId,
    size: (u32, u32, f32),
}

#[derive(Debug, Default)]
pub struct FilterPipeline {
    layer: Option<Layer>,
    temp: Option<Layer>,
    shaders: HashMap<FilterKind, Shader>,
    sphere_map: Option<Shader>,
}

fn pass_raster() -> RasterState {
    RasterState {
        blend: BlendMode::Replace,
        depth_test: false,
        depth_write: false,
        ..Default::default()
    }
}

/// Creates `slot` or matches it to `target`, then clears it.
fn prepare_layer<B: Backend + ?Sized>(
    backend: &mut B,
    slot: &mut Option<Layer>,
    target: &FilterTarget,
) -> FramebufferId {
    let size = (target.width, target.height, target.density);
    let framebuffer = match slot {
        Some(layer) if layer.size == size => layer.framebuffer,
        Some(layer) => {
            backend.resize_framebuffer(layer.framebuffer, size.0, size.1, size.2);
            layer.size = size;
            layer.framebuffer
        }
        None => {
            let framebuffer = backend.create_framebuffer(size.0, size.1, size.2);
            *slot = Some(Layer { framebuffer, size });
            framebuffer
        }
    };
    backend.clear(TargetId::Framebuffer(framebuffer), &ClearOps::all([0.0; 4]));
    framebuffer
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self {
            layer: None,
            temp: None,
            shaders: HashMap::new(),
            sphere_map: None,
        }
    }

    /// The panorama program, created on first use.
    pub fn sphere_map_shader(&mut self) -> Shader {
        self.sphere_map
            .get_or_insert_with(|| {
                debug!("Creating filter_sphere_map program");
                Shader::filter(
                    "filter_sphere_map",
                    sources::SPHERE_MAP_FS,
                    &[
                        UniformDecl::new("fov_y", UniformKind::Float),
                        UniformDecl::new("aspect", UniformKind::Float),
                        UniformDecl::new("view_rotation", UniformKind::Mat3),
                    ],
                )
            })
            .clone()
    }

    /// The built-in program of `kind`, created on first use.
    pub fn shader(&mut self, kind: FilterKind) -> Shader {
        self.shaders
            .entry(kind)
            .or_insert_with(|| {
                debug!("Creating {} program", kind.label());
                Shader::filter(kind.label(), kind.fragment(), &[])
            })
            .clone()
    }

    /// Renders `source` applied to `target` into the filter layer and returns the layer's texture.
    pub fn run<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        programs: &mut ProgramCache,
        target: &FilterTarget,
        source: &FilterSource,
    ) -> Result<TextureId> {
        let input = backend.target_texture(target.target).ok_or_else(|| {
            RenderError::Backend("filter target has no readable texture".into())
        })?;
        let mut sampled = input;
        let mut extra = UniformSet::new();
        let (shader, parameter, separable) = match source {
            FilterSource::Builtin { kind, parameter } => (
                self.shader(*kind),
                parameter.unwrap_or(kind.default_parameter()),
                kind.is_separable(),
            ),
            FilterSource::Custom(shader) => {
                if !shader.is_filter_shader() {
                    warn!(label = shader.label(), "filter() given a non-filter shader");
                }
                (shader.clone(), 0.0, false)
            }
            FilterSource::SphereMap {
                panorama,
                fov_y,
                aspect,
                view_rotation,
            } => {
                sampled = *panorama;
                extra.set("fov_y", *fov_y);
                extra.set("aspect", *aspect);
                extra.set("view_rotation", UniformValue::Mat3(*view_rotation));
                (self.sphere_map_shader(), 0.0, false)
            }
        };
        let program = programs.program(backend, &shader)?;
        let layer = prepare_layer(backend, &mut self.layer, target);

        let mut uniforms = extra;
        uniforms.fill_missing(&shader.user_uniforms());
        uniforms.set("texel_size", target.texel_size());
        uniforms.set("canvas_size", [target.width as f32, target.height as f32]);
        uniforms.set("filter_parameter", parameter);
        uniforms.set("radius", parameter.max(1.0));

        if separable {
            let temp = prepare_layer(backend, &mut self.temp, target);
            uniforms.set("direction", [1.0, 0.0]);
            uniforms.set("tex0", input);
            Self::pass(backend, program, TargetId::Framebuffer(temp), &uniforms);

            let temp_texture = backend
                .target_texture(TargetId::Framebuffer(temp))
                .ok_or_else(|| RenderError::Backend("filter temp layer lost".into()))?;
            uniforms.set("direction", [0.0, 1.0]);
            uniforms.set("tex0", temp_texture);
            Self::pass(backend, program, TargetId::Framebuffer(layer), &uniforms);
        } else {
            uniforms.set("direction", [0.0, 0.0]);
            uniforms.set("tex0", sampled);
            Self::pass(backend, program, TargetId::Framebuffer(layer), &uniforms);
        }

        backend
            .target_texture(TargetId::Framebuffer(layer))
            .ok_or_else(|| RenderError::Backend("filter layer lost".into()))
    }

    fn pass<B: Backend + ?Sized>(
        backend: &mut B,
        program: ProgramId,
        target: TargetId,
        uniforms: &UniformSet,
    ) {
        backend.draw(&DrawCall {
            target,
            program,
            uniforms,
            geometry: DrawGeometry::Fullscreen,
            raster: pass_raster(),
        });
    }

    /// Releases the layer framebuffers; built-in programs stay cached.
    pub fn release<B: Backend + ?Sized>(&mut self, backend: &mut B) {
        for layer in [self.layer.take(), self.temp.take()].into_iter().flatten() {
            backend.release_framebuffer(layer.framebuffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::shader::UniformValue;

    fn target(width: u32, height: u32, density: f32) -> FilterTarget {
        FilterTarget {
            target: TargetId::Main,
            width,
            height,
            density,
        }
    }

    #[test]
    fn blur_runs_horizontal_then_vertical() {
        let mut backend = RecordingBackend::new(100, 50);
        let mut programs = ProgramCache::new();
        let mut pipeline = FilterPipeline::new();
        let source = FilterSource::Builtin {
            kind: FilterKind::Blur,
            parameter: Some(3.0),
        };
        pipeline
            .run(&mut backend, &mut programs, &target(100, 50, 1.0), &source)
            .unwrap();

        let draws: Vec<_> = backend.draws().collect();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].uniforms.get("direction"), Some(&UniformValue::Vec2([1.0, 0.0])));
        assert_eq!(draws[1].uniforms.get("direction"), Some(&UniformValue::Vec2([0.0, 1.0])));
        for draw in &draws {
            assert_eq!(
                draw.uniforms.get("texel_size"),
                Some(&UniformValue::Vec2([1.0 / 100.0, 1.0 / 50.0]))
            );
            assert_eq!(draw.uniforms.get("radius"), Some(&UniformValue::Float(3.0)));
        }
        assert_ne!(draws[0].target, draws[1].target);
    }

    #[test]
    fn other_filters_run_a_single_pass() {
        let mut backend = RecordingBackend::new(10, 10);
        let mut programs = ProgramCache::new();
        let mut pipeline = FilterPipeline::new();
        pipeline
            .run(&mut backend, &mut programs, &target(10, 10, 1.0), &FilterKind::Threshold.into())
            .unwrap();
        let draws: Vec<_> = backend.draws().collect();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].uniforms.get("filter_parameter"), Some(&UniformValue::Float(0.5)));
        assert_eq!(backend.live_framebuffers(), 1);
    }

    #[test]
    fn layers_follow_the_target_size_and_density() {
        let mut backend = RecordingBackend::new(10, 10);
        let mut programs = ProgramCache::new();
        let mut pipeline = FilterPipeline::new();
        let gray = FilterSource::from(FilterKind::Gray);
        pipeline
            .run(&mut backend, &mut programs, &target(10, 10, 1.0), &gray)
            .unwrap();
        let texture = pipeline
            .run(&mut backend, &mut programs, &target(20, 10, 2.0), &gray)
            .unwrap();
        assert_eq!(backend.live_framebuffers(), 1);
        let layer = pipeline.layer.map(|layer| layer.framebuffer).unwrap();
        assert_eq!(backend.target_size(TargetId::Framebuffer(layer)), Some((40, 20)));
        assert_eq!(backend.target_texture(TargetId::Framebuffer(layer)), Some(texture));
    }

    #[test]
    fn built_in_programs_are_created_once_per_kind() {
        let mut pipeline = FilterPipeline::new();
        let first = pipeline.shader(FilterKind::Invert);
        assert_eq!(first, pipeline.shader(FilterKind::Invert));
        assert_ne!(first, pipeline.shader(FilterKind::Opaque));
    }
}
