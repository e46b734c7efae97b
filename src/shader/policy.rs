//! Choosing the program for a draw.

use super::hooks::HookPoint;
use super::sources;
use super::uniforms::{
    color_uniforms, light_uniforms, point_uniforms, stroke_uniforms, texture_uniforms,
};
use super::{Shader, ShaderClass};
use ahash::{HashMap, HashMapExt};
use tracing::debug;

/// Whether a draw comes from the retained shape cache or from an immediate-mode shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    Immediate,
    Retained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefaultProgram {
    /// Per-pixel or per-vertex depending on configuration.
    Light,
    ImmediateTexture,
    Normal,
    Color,
    ImmediateColor,
    Line,
    Point,
}

pub const LIGHT_TEXTURES: &[&str] = &["tex", "environment_map_diffused", "environment_map_specular"];

/// Built-in programs, constructed on first use.
#[derive(Debug)]
pub struct DefaultShaders {
    per_pixel_lighting: bool,
    max_lights: usize,
    shaders: HashMap<DefaultProgram, Shader>,
}

impl DefaultShaders {
    pub fn new(per_pixel_lighting: bool, max_lights: usize) -> Self {
        Self {
            per_pixel_lighting,
            max_lights,
            shaders: HashMap::new(),
        }
    }

    pub fn get(&mut self, program: DefaultProgram) -> Shader {
        let per_pixel_lighting = self.per_pixel_lighting;
        let max_lights = self.max_lights;
        self.shaders
            .entry(program)
            .or_insert_with(|| {
                debug!("Building default {:?} program", program);
                build(program, per_pixel_lighting, max_lights)
            })
            .clone()
    }

    /// Number of programs built so far.
    pub fn built(&self) -> usize {
        self.shaders.len()
    }
}

fn build(program: DefaultProgram, per_pixel_lighting: bool, max_lights: usize) -> Shader {
    use sources::*;
    match program {
        DefaultProgram::Light if per_pixel_lighting => Shader::template(
            ShaderClass::Light,
            "light",
            vec![COMMON, FILL_INPUT, EQUIRECT, LIGHTING, MATERIAL_TYPES, PHONG],
            Some(HookPoint::MATERIAL),
            light_uniforms(max_lights),
            LIGHT_TEXTURES,
        ),
        DefaultProgram::Light => Shader::template(
            ShaderClass::Light,
            "light_per_vertex",
            vec![COMMON, FILL_INPUT, EQUIRECT, LIGHTING, GOURAUD],
            None,
            light_uniforms(max_lights),
            LIGHT_TEXTURES,
        ),
        DefaultProgram::ImmediateTexture => Shader::template(
            ShaderClass::Texture,
            "immediate_texture",
            vec![COMMON, FILL_INPUT, SURFACE_VS, TEXTURE_FS],
            Some(HookPoint::FILL),
            texture_uniforms(),
            &["tex"],
        ),
        DefaultProgram::Normal => Shader::template(
            ShaderClass::Normal,
            "normal",
            vec![COMMON, FILL_INPUT, SURFACE_VS, NORMAL_FS],
            Some(HookPoint::FILL),
            color_uniforms(),
            &[],
        ),
        DefaultProgram::Color => Shader::template(
            ShaderClass::Color,
            "color",
            vec![COMMON, FILL_INPUT, SURFACE_VS, COLOR_FS],
            Some(HookPoint::FILL),
            color_uniforms(),
            &[],
        ),
        DefaultProgram::ImmediateColor => Shader::template(
            ShaderClass::Color,
            "immediate_color",
            vec![COMMON, FILL_INPUT, SURFACE_VS, COLOR_FS],
            Some(HookPoint::FILL),
            color_uniforms(),
            &[],
        ),
        DefaultProgram::Line => Shader::template(
            ShaderClass::Stroke,
            "line",
            vec![COMMON, LINE],
            Some(HookPoint::STROKE),
            stroke_uniforms(),
            &[],
        ),
        DefaultProgram::Point => Shader::template(
            ShaderClass::Point,
            "point",
            vec![COMMON, POINT],
            Some(HookPoint::POINT),
            point_uniforms(),
            &[],
        ),
    }
}

/// The parts of render state that decide the fill program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillRequest {
    pub mode: DrawMode,
    pub normal_material: bool,
    pub lighting: bool,
    pub textured: bool,
}

impl FillRequest {
    /// Whether a user fill program can serve this request.
    fn accepts(&self, shader: &Shader) -> bool {
        if self.normal_material {
            shader.is_normal_shader()
        } else if self.lighting {
            shader.is_light_shader()
        } else if self.textured {
            shader.is_texture_shader()
        } else {
            !matches!(
                shader.class(),
                ShaderClass::Stroke | ShaderClass::Point | ShaderClass::Filter
            )
        }
    }
}

/// First match wins: a capable user program, the normal program, the light program, a textured
/// program, then a flat color program.
pub fn resolve_fill(
    defaults: &mut DefaultShaders,
    user: Option<&Shader>,
    request: FillRequest,
) -> Shader {
    if let Some(shader) = user.filter(|shader| request.accepts(shader)) {
        return shader.clone();
    }
    let program = if request.normal_material {
        DefaultProgram::Normal
    } else if request.lighting {
        DefaultProgram::Light
    } else if request.textured {
        match request.mode {
            DrawMode::Retained => DefaultProgram::Light,
            DrawMode::Immediate => DefaultProgram::ImmediateTexture,
        }
    } else {
        match request.mode {
            DrawMode::Retained => DefaultProgram::Color,
            DrawMode::Immediate => DefaultProgram::ImmediateColor,
        }
    };
    defaults.get(program)
}

pub fn resolve_stroke(defaults: &mut DefaultShaders, user: Option<&Shader>) -> Shader {
    match user.filter(|shader| shader.is_stroke_shader()) {
        Some(shader) => shader.clone(),
        None => defaults.get(DefaultProgram::Line),
    }
}

pub fn resolve_point(defaults: &mut DefaultShaders, user: Option<&Shader>) -> Shader {
    match user.filter(|shader| shader.is_point_shader()) {
        Some(shader) => shader.clone(),
        None => defaults.get(DefaultProgram::Point),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mode: DrawMode) -> FillRequest {
        FillRequest {
            mode,
            normal_material: false,
            lighting: false,
            textured: false,
        }
    }

    #[test]
    fn untextured_unlit_fill_uses_color_programs() {
        let mut defaults = DefaultShaders::new(true, 5);
        let retained = resolve_fill(&mut defaults, None, request(DrawMode::Retained));
        let immediate = resolve_fill(&mut defaults, None, request(DrawMode::Immediate));
        assert_eq!(retained.label(), "color");
        assert_eq!(immediate.label(), "immediate_color");
    }

    #[test]
    fn textures_use_light_when_retained_and_texture_when_immediate() {
        let mut defaults = DefaultShaders::new(true, 5);
        let retained = resolve_fill(
            &mut defaults,
            None,
            FillRequest {
                textured: true,
                ..request(DrawMode::Retained)
            },
        );
        let immediate = resolve_fill(
            &mut defaults,
            None,
            FillRequest {
                textured: true,
                ..request(DrawMode::Immediate)
            },
        );
        assert_eq!(retained.class(), ShaderClass::Light);
        assert_eq!(immediate.class(), ShaderClass::Texture);
    }

    #[test]
    fn normal_material_beats_lighting() {
        let mut defaults = DefaultShaders::new(true, 5);
        let shader = resolve_fill(
            &mut defaults,
            None,
            FillRequest {
                normal_material: true,
                lighting: true,
                ..request(DrawMode::Retained)
            },
        );
        assert!(shader.is_normal_shader());
    }

    #[test]
    fn user_program_is_used_only_when_capable() {
        let mut defaults = DefaultShaders::new(true, 5);
        let user = defaults.get(DefaultProgram::Color);
        let lit = FillRequest {
            lighting: true,
            ..request(DrawMode::Retained)
        };
        assert!(resolve_fill(&mut defaults, Some(&user), lit).is_light_shader());
        assert_eq!(
            resolve_fill(&mut defaults, Some(&user), request(DrawMode::Retained)),
            user
        );
    }

    #[test]
    fn defaults_are_built_once() {
        let mut defaults = DefaultShaders::new(true, 5);
        let first = defaults.get(DefaultProgram::Line);
        let second = defaults.get(DefaultProgram::Line);
        assert_eq!(first.id(), second.id());
        assert_eq!(defaults.built(), 1);
    }

    #[test]
    fn per_vertex_lighting_program_has_no_hooks() {
        let mut defaults = DefaultShaders::new(false, 5);
        let light = defaults.get(DefaultProgram::Light);
        assert_eq!(light.label(), "light_per_vertex");
        assert!(light.hook_points().is_empty());
    }

    #[test]
    fn stroke_and_point_fall_back_to_defaults() {
        let mut defaults = DefaultShaders::new(true, 5);
        let fill = defaults.get(DefaultProgram::Color);
        assert!(resolve_stroke(&mut defaults, Some(&fill)).is_stroke_shader());
        assert!(resolve_point(&mut defaults, None).is_point_shader());
    }
}
