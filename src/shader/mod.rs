//! Programs, their uniform contract, and the policy choosing one per draw.
//!
//! A [`Shader`] is a cheap handle: clones share one identity, which the renderer uses to compile
//! each program at most once per backend. Built-in programs are assembled from WGSL chunks plus
//! generated `hook_*` functions, so [`Shader::modify`] can swap individual hook bodies and yield a
//! new program.

mod contract;
mod hooks;
pub(crate) mod policy;
pub(crate) mod sources;
pub(crate) mod uniforms;

pub use hooks::{HookPoint, HookTable};
pub use policy::{DefaultProgram, DefaultShaders, DrawMode, FillRequest};
pub use uniforms::{AttributeDecl, UniformDecl, UniformKind, UniformSet, UniformValue};
use uniforms::filter_uniforms;

use crate::backend::layout::{texture_bindings, uniforms_struct};
use crate::backend::{Backend, ProgramDescriptor, VertexFormat};
use crate::error::{RenderError, Result};
use crate::id::{ProgramId, ShaderId};
use ahash::{HashMap, HashMapExt};
use tracing::debug;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// What a program can render; the resolution policy matches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderClass {
    /// Lit fills; also handles textured fills.
    Light,
    /// Unlit textured fills.
    Texture,
    Normal,
    /// Flat or vertex-colored fills.
    Color,
    Stroke,
    Point,
    /// Fullscreen passes over a texture.
    Filter,
    /// User programs with no declared capability.
    Custom,
}

impl ShaderClass {
    fn vertex_format(self) -> VertexFormat {
        match self {
            ShaderClass::Stroke => VertexFormat::Stroke,
            ShaderClass::Point => VertexFormat::Point,
            ShaderClass::Filter => VertexFormat::Fullscreen,
            _ => VertexFormat::Fill,
        }
    }
}

#[derive(Debug)]
enum Body {
    Template {
        chunks: Vec<&'static str>,
        hook_points: Option<&'static [HookPoint]>,
        hooks: HookTable,
    },
    Source(String),
}

#[derive(Debug)]
struct ShaderInner {
    id: ShaderId,
    class: ShaderClass,
    label: String,
    body: Body,
    uniforms: Vec<UniformDecl>,
    textures: Vec<String>,
    attributes: Vec<AttributeDecl>,
    user_values: RefCell<UniformSet>,
}

#[derive(Clone)]
pub struct Shader {
    inner: Rc<ShaderInner>,
}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("id", &self.inner.id)
            .field("class", &self.inner.class)
            .field("label", &self.inner.label)
            .finish()
    }
}

impl PartialEq for Shader {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Shader {
    fn from_inner(inner: ShaderInner) -> Self {
        Self {
            inner: Rc::new(inner),
        }
    }

    pub(crate) fn template(
        class: ShaderClass,
        label: &str,
        chunks: Vec<&'static str>,
        hook_points: Option<&'static [HookPoint]>,
        uniforms: Vec<UniformDecl>,
        textures: &[&str],
    ) -> Self {
        Self::from_inner(ShaderInner {
            id: ShaderId::next(),
            class,
            label: label.to_string(),
            body: Body::Template {
                chunks,
                hook_points,
                hooks: HookTable::new(),
            },
            uniforms,
            textures: textures.iter().map(|name| name.to_string()).collect(),
            attributes: Vec::new(),
            user_values: RefCell::new(UniformSet::new()),
        })
    }

    /// A program from a complete WGSL module with `vs_main` and `fs_main` entry points.
    ///
    /// The module's `struct Uniforms` (bound at `@group(0) @binding(0)`) and its `texture_2d<f32>`
    /// variables form the program's contract. Texture `i` must be bound at
    /// `@group(1) @binding(2 * i)` and its sampler at `2 * i + 1`.
    pub fn from_wgsl(class: ShaderClass, label: &str, source: &str) -> Result<Self> {
        Self::from_wgsl_with_attributes(class, label, source, Vec::new())
    }

    /// Like [`Shader::from_wgsl`], with custom per-vertex attributes read at locations 4 and up,
    /// in the given order.
    pub fn from_wgsl_with_attributes(
        class: ShaderClass,
        label: &str,
        source: &str,
        attributes: Vec<AttributeDecl>,
    ) -> Result<Self> {
        if !source.contains("vs_main") || !source.contains("fs_main") {
            return Err(RenderError::InvalidShader(format!(
                "'{label}' must define vs_main and fs_main"
            )));
        }
        Ok(Self::from_inner(ShaderInner {
            id: ShaderId::next(),
            class,
            label: label.to_string(),
            body: Body::Source(source.to_string()),
            uniforms: contract::parse_uniforms(source)?,
            textures: contract::parse_textures(source),
            attributes,
            user_values: RefCell::new(UniformSet::new()),
        }))
    }

    /// A filter program from a fragment stage alone.
    ///
    /// The fragment receives `in: QuadOutput` with `in.uv` and may read `tex0`, `tex0_sampler` and
    /// the standard filter uniforms (`u.texel_size`, `u.canvas_size`, `u.direction`, `u.radius`,
    /// `u.filter_parameter`) plus `extra_uniforms`.
    pub fn filter(label: &str, fragment: &str, extra_uniforms: &[UniformDecl]) -> Self {
        let mut uniforms = filter_uniforms();
        uniforms.extend(extra_uniforms.iter().cloned());
        Self::fullscreen(label, &[sources::FILTER_HELPERS, fragment], uniforms, &["tex0"])
    }

    /// A fullscreen-triangle program; `chunks` must define `fs_main(in: QuadOutput)`.
    pub(crate) fn fullscreen(
        label: &str,
        chunks: &[&str],
        uniforms: Vec<UniformDecl>,
        textures: &[&str],
    ) -> Self {
        let textures: Vec<String> = textures.iter().map(|name| name.to_string()).collect();
        let mut source = uniforms_struct(&uniforms);
        source.push_str(&texture_bindings(&textures));
        source.push_str(sources::COMMON);
        source.push_str(sources::FULLSCREEN_VS);
        for chunk in chunks {
            source.push_str(chunk);
        }
        Self::from_inner(ShaderInner {
            id: ShaderId::next(),
            class: ShaderClass::Filter,
            label: label.to_string(),
            body: Body::Source(source),
            uniforms,
            textures,
            attributes: Vec::new(),
            user_values: RefCell::new(UniformSet::new()),
        })
    }

    /// A new program with some hook bodies replaced.
    ///
    /// Fails with [`RenderError::HooksUnsupported`] for programs without hooks (user WGSL and
    /// the per-vertex lighting program) and with [`RenderError::InvalidShader`] for a hook the
    /// program does not call.
    pub fn modify(&self, overrides: &HookTable) -> Result<Shader> {
        let Body::Template {
            chunks,
            hook_points: Some(points),
            hooks,
        } = &self.inner.body
        else {
            return Err(RenderError::HooksUnsupported);
        };
        if let Some(hook) = overrides.hooks().find(|hook| !points.contains(hook)) {
            return Err(RenderError::InvalidShader(format!(
                "'{}' has no {:?} hook",
                self.inner.label, hook
            )));
        }
        Ok(Self::from_inner(ShaderInner {
            id: ShaderId::next(),
            class: self.inner.class,
            label: self.inner.label.clone(),
            body: Body::Template {
                chunks: chunks.clone(),
                hook_points: Some(*points),
                hooks: hooks.merged(overrides),
            },
            uniforms: self.inner.uniforms.clone(),
            textures: self.inner.textures.clone(),
            attributes: self.inner.attributes.clone(),
            user_values: RefCell::new(UniformSet::new()),
        }))
    }

    /// Hooks [`Shader::modify`] accepts.
    pub fn hook_points(&self) -> &'static [HookPoint] {
        match &self.inner.body {
            Body::Template {
                hook_points: Some(points),
                ..
            } => *points,
            _ => &[],
        }
    }

    /// Complete WGSL module.
    pub fn source(&self) -> String {
        match &self.inner.body {
            Body::Source(source) => source.clone(),
            Body::Template {
                chunks,
                hook_points,
                hooks,
            } => {
                let mut source = uniforms_struct(&self.inner.uniforms);
                source.push_str(&texture_bindings(&self.inner.textures));
                for chunk in chunks {
                    source.push_str(chunk);
                }
                if let Some(points) = hook_points {
                    source.push('\n');
                    source.push_str(&hooks.emit_all(points));
                }
                source
            }
        }
    }

    pub fn id(&self) -> ShaderId {
        self.inner.id
    }

    pub fn class(&self) -> ShaderClass {
        self.inner.class
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn uniforms(&self) -> &[UniformDecl] {
        &self.inner.uniforms
    }

    pub fn textures(&self) -> &[String] {
        &self.inner.textures
    }

    pub fn attributes(&self) -> &[AttributeDecl] {
        &self.inner.attributes
    }

    pub fn vertex_format(&self) -> VertexFormat {
        self.inner.class.vertex_format()
    }

    pub fn is_light_shader(&self) -> bool {
        self.inner.class == ShaderClass::Light
    }

    pub fn is_normal_shader(&self) -> bool {
        self.inner.class == ShaderClass::Normal
    }

    /// Light programs sample textures too.
    pub fn is_texture_shader(&self) -> bool {
        matches!(self.inner.class, ShaderClass::Light | ShaderClass::Texture)
    }

    pub fn is_color_shader(&self) -> bool {
        self.inner.class == ShaderClass::Color
    }

    pub fn is_stroke_shader(&self) -> bool {
        self.inner.class == ShaderClass::Stroke
    }

    pub fn is_point_shader(&self) -> bool {
        self.inner.class == ShaderClass::Point
    }

    pub fn is_filter_shader(&self) -> bool {
        self.inner.class == ShaderClass::Filter
    }

    /// Sets a value sent with every draw using this program. Values the renderer sets for the
    /// same name take precedence.
    pub fn set_uniform(&self, name: &str, value: impl Into<UniformValue>) {
        self.inner.user_values.borrow_mut().set(name, value);
    }

    pub fn user_uniforms(&self) -> UniformSet {
        self.inner.user_values.borrow().clone()
    }
}

/// Compiled programs of one backend, keyed by shader identity.
#[derive(Debug, Default)]
pub struct ProgramCache {
    programs: HashMap<ShaderId, ProgramId>,
}

impl ProgramCache {
    pub fn new() -> Self {
        Self {
            programs: HashMap::new(),
        }
    }

    /// Compiles `shader` on first use.
    pub fn program<B: Backend + ?Sized>(&mut self, backend: &mut B, shader: &Shader) -> Result<ProgramId> {
        if let Some(program) = self.programs.get(&shader.id()) {
            return Ok(*program);
        }
        let source = shader.source();
        let program = backend.create_program(&ProgramDescriptor {
            label: shader.label(),
            source: &source,
            vertex_format: shader.vertex_format(),
            uniforms: shader.uniforms(),
            textures: shader.textures(),
            attributes: shader.attributes(),
        })?;
        debug!("Program {} compiled for shader {}", program, shader.id());
        self.programs.insert(shader.id(), program);
        Ok(program)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn clear(&mut self) {
        self.programs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::uniforms::color_uniforms;
    use super::*;

    fn color_program() -> Shader {
        Shader::template(
            ShaderClass::Color,
            "color",
            vec![sources::COMMON, sources::FILL_INPUT, sources::SURFACE_VS, sources::COLOR_FS],
            Some(HookPoint::FILL),
            color_uniforms(),
            &[],
        )
    }

    #[test]
    fn clones_share_identity_and_user_uniforms() {
        let shader = color_program();
        let clone = shader.clone();
        clone.set_uniform("time", 1.5);
        assert_eq!(shader, clone);
        assert_eq!(shader.user_uniforms().get("time"), Some(&UniformValue::Float(1.5)));
    }

    #[test]
    fn modify_yields_a_new_program_with_the_override() {
        let shader = color_program();
        let red = shader
            .modify(&HookTable::new().with(
                HookPoint::GetFinalColor,
                "return vec4<f32>(1.0, 0.0, 0.0, 1.0);",
            ))
            .unwrap();

        assert_ne!(red.id(), shader.id());
        assert_eq!(red.class(), ShaderClass::Color);
        assert!(red.source().contains("return vec4<f32>(1.0, 0.0, 0.0, 1.0);"));
        assert!(shader.source().contains("fn hook_get_final_color(color: vec4<f32>) -> vec4<f32> {\n    return color;"));
    }

    #[test]
    fn modify_rejects_hooks_the_program_lacks() {
        let result = color_program().modify(&HookTable::new().with(HookPoint::GetPointSize, "return 1.0;"));
        assert!(matches!(result, Err(RenderError::InvalidShader(_))));
    }

    #[test]
    fn user_modules_have_no_hooks() {
        let source = "struct Uniforms { tint: vec4<f32>, };\nfn vs_main() {}\nfn fs_main() {}";
        let shader = Shader::from_wgsl(ShaderClass::Custom, "user", source).unwrap();
        assert_eq!(shader.uniforms().len(), 1);
        assert_eq!(
            shader.modify(&HookTable::new()),
            Err(RenderError::HooksUnsupported)
        );
    }

    #[test]
    fn programs_compile_once_per_shader() {
        let mut backend = crate::backend::RecordingBackend::new(10, 10);
        let mut cache = ProgramCache::new();
        let shader = color_program();
        let first = cache.program(&mut backend, &shader).unwrap();
        let second = cache.program(&mut backend, &shader.clone()).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn user_modules_need_both_entry_points() {
        assert!(Shader::from_wgsl(ShaderClass::Custom, "broken", "fn vs_main() {}").is_err());
    }

    #[test]
    fn filter_programs_get_the_fullscreen_prelude() {
        let shader = Shader::filter(
            "custom",
            "@fragment\nfn fs_main(in: QuadOutput) -> @location(0) vec4<f32> { return textureSample(tex0, tex0_sampler, in.uv) * u.amount; }",
            &[UniformDecl::new("amount", UniformKind::Float)],
        );
        let source = shader.source();
        assert!(source.contains("fn vs_main(@builtin(vertex_index) vi: u32)"));
        assert!(source.contains("    amount: f32,\n"));
        assert_eq!(shader.textures(), &["tex0".to_string()]);
        assert_eq!(shader.vertex_format(), VertexFormat::Fullscreen);
    }
}
