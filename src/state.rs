//! The push/pop render-state stack.

use crate::color::Color;
use crate::config::{DEFAULT_POINT_SIZE, DEFAULT_STROKE_WEIGHT, MAX_LIGHTS};
use crate::error::{RenderError, Result};
use crate::id::TextureId;
use crate::image::Image;
use crate::math::{Camera, Mat4};
use crate::shader::Shader;

/// How overlapping colors are combined when drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Blend,
    Add,
    Darkest,
    Lightest,
    Subtract,
    Multiply,
    Screen,
    Exclusion,
    Replace,
    /// Erases destination coverage; used by `erase()`.
    Remove,
    // Modes below only exist for 2D canvases and fall back to `Blend`.
    Burn,
    Overlay,
    HardLight,
    SoftLight,
    Dodge,
}

impl BlendMode {
    pub fn is_supported(self) -> bool {
        !matches!(
            self,
            BlendMode::Burn
                | BlendMode::Overlay
                | BlendMode::HardLight
                | BlendMode::SoftLight
                | BlendMode::Dodge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrokeCap {
    #[default]
    Round,
    Project,
    Square,
}

impl StrokeCap {
    /// Code understood by the line program.
    pub fn code(self) -> i32 {
        match self {
            StrokeCap::Round => 0,
            StrokeCap::Project => 1,
            StrokeCap::Square => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrokeJoin {
    #[default]
    Round,
    Miter,
    Bevel,
}

impl StrokeJoin {
    pub fn code(self) -> i32 {
        match self {
            StrokeJoin::Round => 0,
            StrokeJoin::Miter => 1,
            StrokeJoin::Bevel => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// View-space direction the light travels in.
    pub direction: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// View-space position.
    pub position: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    pub position: [f32; 3],
    pub direction: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    /// Cosine of the cone half-angle.
    pub angle_cos: f32,
    pub concentration: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        }
    }
}

/// Lights set since the frame began. Owned by the state, so `push` snapshots them.
#[derive(Debug, Clone, PartialEq)]
pub struct Lights {
    pub ambient: Vec<[f32; 3]>,
    pub directional: Vec<DirectionalLight>,
    pub point: Vec<PointLight>,
    pub spot: Vec<SpotLight>,
    /// Specular color given to lights created after `specular_color()`.
    pub specular_color: [f32; 3],
}

impl Default for Lights {
    fn default() -> Self {
        Self {
            ambient: Vec::new(),
            directional: Vec::new(),
            point: Vec::new(),
            spot: Vec::new(),
            specular_color: [1.0, 1.0, 1.0],
        }
    }
}

impl Lights {
    pub fn is_empty(&self) -> bool {
        self.ambient.is_empty()
            && self.directional.is_empty()
            && self.point.is_empty()
            && self.spot.is_empty()
    }

    pub(crate) fn push_limited<T>(list: &mut Vec<T>, light: T, kind: &'static str) {
        if list.len() >= MAX_LIGHTS {
            tracing::warn!(
                kind,
                limit = MAX_LIGHTS,
                "too many lights of one kind; ignoring the extra light"
            );
            return;
        }
        list.push(light);
    }
}

/// Colors and blend mode saved by `erase()`, restored by `no_erase()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EraseRestore {
    pub fill: Color,
    pub stroke: Color,
    pub blend_mode: BlendMode,
}

/// Everything a drawing call reads. Cloning it is a full snapshot.
#[derive(Debug, Clone)]
pub struct RenderState {
    pub model: Mat4,
    pub camera: Camera,

    pub fill: Color,
    pub stroke: Color,
    pub do_fill: bool,
    pub do_stroke: bool,
    pub stroke_weight: f32,
    pub stroke_cap: StrokeCap,
    pub stroke_join: StrokeJoin,
    pub point_size: f32,

    pub ambient_material: Color,
    pub specular_material: Color,
    pub emissive_material: Color,
    pub has_set_ambient: bool,
    pub use_specular_material: bool,
    pub use_emissive_material: bool,
    pub use_normal_material: bool,
    pub shininess: f32,
    pub metalness: f32,

    pub lights: Lights,
    pub enable_lighting: bool,
    pub attenuation: Attenuation,
    pub image_light: Option<Image>,

    pub texture: Option<TextureId>,
    pub tint: Color,
    pub blend_mode: BlendMode,

    pub user_fill_shader: Option<Shader>,
    pub user_stroke_shader: Option<Shader>,
    pub user_point_shader: Option<Shader>,

    /// Set while erasing.
    pub erase_restore: Option<EraseRestore>,
}

impl RenderState {
    pub fn new(camera: Camera) -> Self {
        Self {
            model: Mat4::identity(),
            camera,
            fill: Color::WHITE,
            stroke: Color::BLACK,
            do_fill: true,
            do_stroke: true,
            stroke_weight: DEFAULT_STROKE_WEIGHT,
            stroke_cap: StrokeCap::Round,
            stroke_join: StrokeJoin::Round,
            point_size: DEFAULT_POINT_SIZE,
            ambient_material: Color::WHITE,
            specular_material: Color::TRANSPARENT,
            emissive_material: Color::TRANSPARENT,
            has_set_ambient: false,
            use_specular_material: false,
            use_emissive_material: false,
            use_normal_material: false,
            shininess: 1.0,
            metalness: 0.0,
            lights: Lights::default(),
            enable_lighting: false,
            attenuation: Attenuation::default(),
            image_light: None,
            texture: None,
            tint: Color::WHITE,
            blend_mode: BlendMode::Blend,
            user_fill_shader: None,
            user_stroke_shader: None,
            user_point_shader: None,
            erase_restore: None,
        }
    }

    pub fn model_view(&self) -> Mat4 {
        self.model.then(&self.camera.view)
    }

    /// Per-frame reset: lights and tint go back to defaults and the model matrix to identity.
    pub(crate) fn reset_for_frame(&mut self) {
        self.lights = Lights::default();
        self.enable_lighting = false;
        self.image_light = None;
        self.tint = Color::WHITE;
        self.model = Mat4::identity();
    }
}

/// Saved states plus the current one.
#[derive(Debug)]
pub struct StateStack {
    current: RenderState,
    saved: Vec<RenderState>,
}

impl StateStack {
    pub fn new(initial: RenderState) -> Self {
        Self {
            current: initial,
            saved: Vec::new(),
        }
    }

    pub fn current(&self) -> &RenderState {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut RenderState {
        &mut self.current
    }

    /// Number of unmatched pushes.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn push(&mut self) {
        self.saved.push(self.current.clone());
    }

    /// Restores the last pushed state and returns the depth that was left.
    pub fn pop(&mut self) -> Result<usize> {
        let left = self.saved.len();
        let restored = self.saved.pop().ok_or(RenderError::UnbalancedPop)?;
        self.current = restored;
        Ok(left)
    }

    /// Drops every saved state, keeping the current one.
    pub(crate) fn reset_depth(&mut self) {
        self.saved.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    fn stack() -> StateStack {
        StateStack::new(RenderState::new(Camera::default_for(100.0, 100.0)))
    }

    #[test]
    fn push_pop_restores_by_value() {
        let mut stack = stack();
        stack.current_mut().lights.point.push(PointLight {
            position: [1.0, 2.0, 3.0],
            diffuse: [1.0; 3],
            specular: [0.0; 3],
        });
        let before = stack.current().clone();

        stack.push();
        let state = stack.current_mut();
        state.model = state.model.pre_translate(Vec3::new(10.0, 0.0, 0.0));
        state.fill = Color::rgb(255, 0, 0);
        state.lights.point.clear();
        state.lights.ambient.push([0.5; 3]);
        assert_eq!(stack.pop(), Ok(1));

        let after = stack.current();
        assert_eq!(after.model, before.model);
        assert_eq!(after.fill, before.fill);
        assert_eq!(after.lights, before.lights);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn pop_without_push_is_an_error() {
        let mut stack = stack();
        stack.push();
        assert!(stack.pop().is_ok());
        assert_eq!(stack.pop(), Err(RenderError::UnbalancedPop));
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn light_lists_are_capped() {
        let mut lights = Lights::default();
        for _ in 0..MAX_LIGHTS + 2 {
            Lights::push_limited(&mut lights.ambient, [1.0; 3], "ambient");
        }
        assert_eq!(lights.ambient.len(), MAX_LIGHTS);
    }

    #[test]
    fn stroke_codes() {
        assert_eq!(StrokeCap::Project.code(), 1);
        assert_eq!(StrokeJoin::Bevel.code(), 2);
    }
}
