//! Packing of uniform values into a WGSL uniform-address-space struct.

use crate::shader::{UniformDecl, UniformKind, UniformSet, UniformValue};
use tracing::warn;

fn round_up(alignment: usize, value: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

fn align_and_size(kind: UniformKind) -> (usize, usize) {
    match kind {
        UniformKind::Bool | UniformKind::Int | UniformKind::Float => (4, 4),
        UniformKind::Vec2 => (8, 8),
        UniformKind::Vec3 => (16, 12),
        UniformKind::Vec4 => (16, 16),
        UniformKind::Mat3 => (16, 48),
        UniformKind::Mat4 => (16, 64),
        UniformKind::FloatArray(n) | UniformKind::Vec3Array(n) => (16, 16 * n.max(1)),
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Field {
    name: String,
    kind: UniformKind,
    offset: usize,
}

/// Byte offsets of every member of a `Uniforms` struct.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformLayout {
    fields: Vec<Field>,
    size: usize,
}

impl UniformLayout {
    pub fn new(decls: &[UniformDecl]) -> Self {
        let mut cursor = 0;
        let mut fields = Vec::with_capacity(decls.len());
        for decl in decls {
            let (alignment, size) = align_and_size(decl.kind);
            let offset = round_up(alignment, cursor);
            fields.push(Field {
                name: decl.name.clone(),
                kind: decl.kind,
                offset,
            });
            cursor = offset + size;
        }
        Self {
            fields,
            size: round_up(16, cursor.max(16)),
        }
    }

    /// Buffer size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    #[cfg(test)]
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.offset)
    }

    /// Writes every declared value found in `values`; missing ones stay zero.
    pub fn pack(&self, values: &UniformSet) -> Vec<u8> {
        let mut bytes = vec![0u8; self.size];
        for field in &self.fields {
            let Some(value) = values.get(&field.name) else {
                continue;
            };
            if !field.kind.accepts(value) {
                warn!(
                    "Uniform '{}' expects {:?}, got {:?}; skipped",
                    field.name, field.kind, value
                );
                continue;
            }
            write_value(&mut bytes, field, value);
        }
        bytes
    }
}

fn put(bytes: &mut [u8], offset: usize, floats: &[f32]) {
    for (i, value) in floats.iter().enumerate() {
        let at = offset + i * 4;
        bytes[at..at + 4].copy_from_slice(&value.to_ne_bytes());
    }
}

fn write_value(bytes: &mut [u8], field: &Field, value: &UniformValue) {
    let offset = field.offset;
    match value {
        UniformValue::Bool(flag) => {
            bytes[offset..offset + 4].copy_from_slice(&(*flag as u32).to_ne_bytes());
        }
        UniformValue::Int(int) => match field.kind {
            UniformKind::Bool => {
                bytes[offset..offset + 4].copy_from_slice(&((*int != 0) as u32).to_ne_bytes());
            }
            _ => bytes[offset..offset + 4].copy_from_slice(&int.to_ne_bytes()),
        },
        UniformValue::Float(float) => put(bytes, offset, &[*float]),
        UniformValue::Vec2(v) => put(bytes, offset, v),
        UniformValue::Vec3(v) => put(bytes, offset, v),
        UniformValue::Vec4(v) => put(bytes, offset, v),
        UniformValue::Mat3(m) => {
            for column in 0..3 {
                put(bytes, offset + column * 16, &m[column * 3..column * 3 + 3]);
            }
        }
        UniformValue::Mat4(m) => put(bytes, offset, m),
        UniformValue::FloatArray(values) => {
            for (i, v) in values.iter().take(slot_count(field.kind)).enumerate() {
                put(bytes, offset + i * 16, &[*v]);
            }
        }
        UniformValue::Vec3Array(values) => {
            for (i, v) in values.iter().take(slot_count(field.kind)).enumerate() {
                put(bytes, offset + i * 16, v);
            }
        }
        UniformValue::Texture(_) => {}
    }
}

fn slot_count(kind: UniformKind) -> usize {
    match kind {
        UniformKind::FloatArray(n) | UniformKind::Vec3Array(n) => n,
        _ => 0,
    }
}

/// The WGSL declaration matching [`UniformLayout::new`] for the same decls.
pub fn uniforms_struct(decls: &[UniformDecl]) -> String {
    let mut source = String::from("struct Uniforms {\n");
    for decl in decls {
        source.push_str(&format!("    {}: {},\n", decl.name, decl.kind.wgsl_type()));
    }
    if decls.is_empty() {
        source.push_str("    unused: vec4<f32>,\n");
    }
    source.push_str("};\n\n@group(0) @binding(0) var<uniform> u: Uniforms;\n");
    source
}

/// Texture and sampler declarations, texture `i` at binding `2i`.
pub fn texture_bindings(textures: &[String]) -> String {
    textures
        .iter()
        .enumerate()
        .map(|(i, name)| {
            format!(
                "@group(1) @binding({}) var {name}: texture_2d<f32>;\n@group(1) @binding({}) var {name}_sampler: sampler;\n",
                2 * i,
                2 * i + 1
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(name: &str, kind: UniformKind) -> UniformDecl {
        UniformDecl::new(name, kind)
    }

    fn floats(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_ne_bytes(chunk.try_into().unwrap()))
            .collect()
    }

    #[test]
    fn follows_uniform_address_space_alignment() {
        let layout = UniformLayout::new(&[
            decl("flag", UniformKind::Bool),
            decl("position", UniformKind::Vec3),
            decl("weight", UniformKind::Float),
            decl("size", UniformKind::Vec2),
            decl("normal_matrix", UniformKind::Mat3),
            decl("angles", UniformKind::FloatArray(5)),
        ]);

        assert_eq!(layout.offset_of("flag"), Some(0));
        assert_eq!(layout.offset_of("position"), Some(16));
        // A scalar packs into the tail of a vec3.
        assert_eq!(layout.offset_of("weight"), Some(28));
        assert_eq!(layout.offset_of("size"), Some(32));
        assert_eq!(layout.offset_of("normal_matrix"), Some(48));
        assert_eq!(layout.offset_of("angles"), Some(96));
        assert_eq!(layout.size(), 176);
    }

    #[test]
    fn packs_matrices_by_padded_columns() {
        let layout = UniformLayout::new(&[decl("normal_matrix", UniformKind::Mat3)]);
        let mut values = UniformSet::new();
        values.set(
            "normal_matrix",
            UniformValue::Mat3([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]),
        );
        assert_eq!(
            floats(&layout.pack(&values)),
            vec![1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0, 7.0, 8.0, 9.0, 0.0]
        );
    }

    #[test]
    fn arrays_use_one_slot_per_element_and_truncate() {
        let layout = UniformLayout::new(&[decl("angles", UniformKind::FloatArray(2))]);
        let mut values = UniformSet::new();
        values.set("angles", UniformValue::FloatArray(vec![0.5, 0.25, 9.0]));
        assert_eq!(floats(&layout.pack(&values)), vec![0.5, 0.0, 0.0, 0.0, 0.25, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn mismatched_and_missing_values_stay_zero() {
        let layout = UniformLayout::new(&[
            decl("weight", UniformKind::Float),
            decl("count", UniformKind::Int),
        ]);
        let mut values = UniformSet::new();
        values.set("weight", UniformValue::Vec2([1.0, 1.0]));
        assert!(layout.pack(&values).iter().all(|byte| *byte == 0));
    }

    #[test]
    fn generated_struct_lists_members_in_order() {
        let source = uniforms_struct(&[
            decl("tint", UniformKind::Vec4),
            decl("lights", UniformKind::Vec3Array(5)),
        ]);
        assert!(source.contains("    tint: vec4<f32>,\n    lights: array<vec4<f32>, 5>,\n"));
        assert!(source.contains("var<uniform> u: Uniforms;"));
    }

    #[test]
    fn textures_pair_with_samplers() {
        let source = texture_bindings(&["tex".to_string(), "environment".to_string()]);
        assert!(source.contains("@binding(0) var tex: texture_2d<f32>;"));
        assert!(source.contains("@binding(3) var environment_sampler: sampler;"));
    }
}
