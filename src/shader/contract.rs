//! Reads the uniform and texture declarations of user WGSL.

use super::uniforms::{UniformDecl, UniformKind};
use crate::error::{RenderError, Result};
use regex::Regex;
use std::sync::OnceLock;

fn struct_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)struct\s+Uniforms\s*\{(.*?)\}").expect("valid uniforms struct pattern")
    })
}

fn field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\w+)\s*:\s*([\w<>,\s]+?)\s*(?:,\s*(?:$|\n)|$)")
            .expect("valid field pattern")
    })
}

fn texture_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"var\s+(\w+)\s*:\s*texture_2d\s*<\s*f32\s*>").expect("valid texture pattern")
    })
}

fn array_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^array<\s*vec4<f32>\s*,\s*(\d+)u?\s*>$").expect("valid array pattern")
    })
}

fn kind_of(wgsl_type: &str) -> Option<UniformKind> {
    let compact: String = wgsl_type.split_whitespace().collect();
    let kind = match compact.as_str() {
        "u32" | "bool" => UniformKind::Bool,
        "i32" => UniformKind::Int,
        "f32" => UniformKind::Float,
        "vec2<f32>" | "vec2f" => UniformKind::Vec2,
        "vec3<f32>" | "vec3f" => UniformKind::Vec3,
        "vec4<f32>" | "vec4f" => UniformKind::Vec4,
        "mat3x3<f32>" | "mat3x3f" => UniformKind::Mat3,
        "mat4x4<f32>" | "mat4x4f" => UniformKind::Mat4,
        other => {
            let count = array_pattern().captures(other)?.get(1)?.as_str().parse().ok()?;
            UniformKind::Vec3Array(count)
        }
    };
    Some(kind)
}

/// Members of the `Uniforms` struct, in declaration order. A module without one declares none.
pub fn parse_uniforms(source: &str) -> Result<Vec<UniformDecl>> {
    let Some(captures) = struct_pattern().captures(source) else {
        return Ok(Vec::new());
    };
    let body = captures.get(1).map_or("", |m| m.as_str());
    let body: String = body
        .lines()
        .map(|line| line.split("//").next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n");

    field_pattern()
        .captures_iter(&body)
        .map(|field| {
            let name = &field[1];
            let wgsl_type = field[2].trim();
            kind_of(wgsl_type)
                .map(|kind| UniformDecl::new(name, kind))
                .ok_or_else(|| {
                    RenderError::InvalidShader(format!(
                        "uniform '{name}' has unsupported type '{wgsl_type}'"
                    ))
                })
        })
        .collect()
}

/// Names of the `texture_2d<f32>` variables, in declaration order.
pub fn parse_textures(source: &str) -> Vec<String> {
    texture_pattern()
        .captures_iter(source)
        .map(|captures| captures[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
struct Uniforms {
    model_matrix: mat4x4<f32>,
    // time in seconds
    time: f32,
    lights: array<vec4<f32>, 5>,
    flags: u32,
};

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(1) @binding(0) var tex: texture_2d<f32>;
@group(1) @binding(1) var tex_sampler: sampler;
@group(1) @binding(2) var noise: texture_2d<f32>;
"#;

    #[test]
    fn reads_uniform_members_in_order() {
        let decls = parse_uniforms(SOURCE).unwrap();
        let summary: Vec<_> = decls
            .iter()
            .map(|decl| (decl.name.as_str(), decl.kind))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("model_matrix", UniformKind::Mat4),
                ("time", UniformKind::Float),
                ("lights", UniformKind::Vec3Array(5)),
                ("flags", UniformKind::Bool),
            ]
        );
    }

    #[test]
    fn reads_textures_in_order() {
        assert_eq!(parse_textures(SOURCE), vec!["tex", "noise"]);
    }

    #[test]
    fn rejects_unsupported_member_types() {
        let source = "struct Uniforms {\n    weird: vec2<i32>,\n};";
        assert!(matches!(
            parse_uniforms(source),
            Err(RenderError::InvalidShader(_))
        ));
    }

    #[test]
    fn module_without_uniforms_declares_none() {
        assert!(parse_uniforms("fn main() {}").unwrap().is_empty());
    }
}
