//! Uniform declarations, values and the renderer's standard uniform contract.

use crate::id::TextureId;
use ahash::{HashMap, HashMapExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Bool,
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
    /// `n` scalars, one per 16-byte slot.
    FloatArray(usize),
    /// `n` vectors, one per 16-byte slot.
    Vec3Array(usize),
}

impl UniformKind {
    pub fn wgsl_type(self) -> String {
        match self {
            UniformKind::Bool => "u32".to_string(),
            UniformKind::Int => "i32".to_string(),
            UniformKind::Float => "f32".to_string(),
            UniformKind::Vec2 => "vec2<f32>".to_string(),
            UniformKind::Vec3 => "vec3<f32>".to_string(),
            UniformKind::Vec4 => "vec4<f32>".to_string(),
            UniformKind::Mat3 => "mat3x3<f32>".to_string(),
            UniformKind::Mat4 => "mat4x4<f32>".to_string(),
            UniformKind::FloatArray(n) | UniformKind::Vec3Array(n) => {
                format!("array<vec4<f32>, {n}>")
            }
        }
    }

    pub fn accepts(self, value: &UniformValue) -> bool {
        matches!(
            (self, value),
            (UniformKind::Bool | UniformKind::Int, UniformValue::Bool(_) | UniformValue::Int(_))
                | (UniformKind::Float, UniformValue::Float(_))
                | (UniformKind::Vec2, UniformValue::Vec2(_))
                | (UniformKind::Vec3, UniformValue::Vec3(_))
                | (UniformKind::Vec4, UniformValue::Vec4(_))
                | (UniformKind::Mat3, UniformValue::Mat3(_))
                | (UniformKind::Mat4, UniformValue::Mat4(_))
                | (
                    UniformKind::FloatArray(_) | UniformKind::Vec3Array(_),
                    UniformValue::FloatArray(_) | UniformValue::Vec3Array(_)
                )
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDecl {
    pub name: String,
    pub kind: UniformKind,
}

impl UniformDecl {
    pub fn new(name: impl Into<String>, kind: UniformKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A custom per-vertex attribute consumed by a program, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDecl {
    pub name: String,
    pub components: u32,
}

impl AttributeDecl {
    pub fn new(name: impl Into<String>, components: u32) -> Self {
        Self {
            name: name.into(),
            components,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// Column-major.
    Mat3([f32; 9]),
    /// Column-major.
    Mat4([f32; 16]),
    FloatArray(Vec<f32>),
    Vec3Array(Vec<[f32; 3]>),
    Texture(TextureId),
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        UniformValue::Bool(value)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        UniformValue::Int(value)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        UniformValue::Float(value)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(value: [f32; 2]) -> Self {
        UniformValue::Vec2(value)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(value: [f32; 3]) -> Self {
        UniformValue::Vec3(value)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(value: [f32; 4]) -> Self {
        UniformValue::Vec4(value)
    }
}

impl From<TextureId> for UniformValue {
    fn from(value: TextureId) -> Self {
        UniformValue::Texture(value)
    }
}

/// Named uniform values for one draw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformSet {
    values: HashMap<String, UniformValue>,
}

impl UniformSet {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    pub fn texture(&self, name: &str) -> Option<TextureId> {
        match self.values.get(name) {
            Some(UniformValue::Texture(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Copies every value of `other` that is not already set here.
    pub fn fill_missing(&mut self, other: &UniformSet) {
        for (name, value) in &other.values {
            self.values
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

fn decls(list: &[(&str, UniformKind)]) -> Vec<UniformDecl> {
    list.iter()
        .map(|(name, kind)| UniformDecl::new(*name, *kind))
        .collect()
}

/// Matrix uniforms shared by every scene program.
pub fn matrix_uniforms() -> Vec<UniformDecl> {
    decls(&[
        ("model_matrix", UniformKind::Mat4),
        ("view_matrix", UniformKind::Mat4),
        ("projection_matrix", UniformKind::Mat4),
        ("model_view_matrix", UniformKind::Mat4),
        ("normal_matrix", UniformKind::Mat3),
        ("viewport", UniformKind::Vec2),
    ])
}

pub fn color_uniforms() -> Vec<UniformDecl> {
    let mut list = matrix_uniforms();
    list.extend(decls(&[
        ("material_color", UniformKind::Vec4),
        ("use_vertex_color", UniformKind::Bool),
    ]));
    list
}

pub fn texture_uniforms() -> Vec<UniformDecl> {
    let mut list = color_uniforms();
    list.extend(decls(&[
        ("tint", UniformKind::Vec4),
        ("is_texture", UniformKind::Bool),
    ]));
    list
}

pub fn light_uniforms(max_lights: usize) -> Vec<UniformDecl> {
    let mut list = texture_uniforms();
    list.extend(decls(&[
        ("has_set_ambient", UniformKind::Bool),
        ("ambient_mat_color", UniformKind::Vec4),
        ("specular_mat_color", UniformKind::Vec4),
        ("emissive_mat_color", UniformKind::Vec4),
        ("use_specular", UniformKind::Bool),
        ("use_emissive", UniformKind::Bool),
        ("shininess", UniformKind::Float),
        ("metallic", UniformKind::Float),
        ("use_image_light", UniformKind::Bool),
        ("use_lighting", UniformKind::Bool),
        ("ambient_light_count", UniformKind::Int),
        ("ambient_color", UniformKind::Vec3Array(max_lights)),
        ("directional_light_count", UniformKind::Int),
        ("lighting_direction", UniformKind::Vec3Array(max_lights)),
        ("directional_diffuse_colors", UniformKind::Vec3Array(max_lights)),
        ("directional_specular_colors", UniformKind::Vec3Array(max_lights)),
        ("point_light_count", UniformKind::Int),
        ("point_light_location", UniformKind::Vec3Array(max_lights)),
        ("point_light_diffuse_colors", UniformKind::Vec3Array(max_lights)),
        ("point_light_specular_colors", UniformKind::Vec3Array(max_lights)),
        ("spot_light_count", UniformKind::Int),
        ("spot_light_angle", UniformKind::FloatArray(max_lights)),
        ("spot_light_conc", UniformKind::FloatArray(max_lights)),
        ("spot_light_diffuse_colors", UniformKind::Vec3Array(max_lights)),
        ("spot_light_specular_colors", UniformKind::Vec3Array(max_lights)),
        ("spot_light_location", UniformKind::Vec3Array(max_lights)),
        ("spot_light_direction", UniformKind::Vec3Array(max_lights)),
        ("constant_attenuation", UniformKind::Float),
        ("linear_attenuation", UniformKind::Float),
        ("quadratic_attenuation", UniformKind::Float),
    ]));
    list
}

pub fn stroke_uniforms() -> Vec<UniformDecl> {
    let mut list = matrix_uniforms();
    list.extend(decls(&[
        ("material_color", UniformKind::Vec4),
        ("use_line_color", UniformKind::Bool),
        ("stroke_weight", UniformKind::Float),
        ("stroke_cap", UniformKind::Int),
        ("stroke_join", UniformKind::Int),
    ]));
    list
}

pub fn point_uniforms() -> Vec<UniformDecl> {
    let mut list = matrix_uniforms();
    list.extend(decls(&[
        ("material_color", UniformKind::Vec4),
        ("point_size", UniformKind::Float),
    ]));
    list
}

/// Uniforms of every fullscreen pass.
pub fn filter_uniforms() -> Vec<UniformDecl> {
    decls(&[
        ("texel_size", UniformKind::Vec2),
        ("canvas_size", UniformKind::Vec2),
        ("direction", UniformKind::Vec2),
        ("radius", UniformKind::Float),
        ("filter_parameter", UniformKind::Float),
        ("roughness", UniformKind::Float),
    ])
}
