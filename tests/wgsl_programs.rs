//! Every built-in program must be a parseable WGSL module with both entry points.

use easel::filter::FilterPipeline;
use easel::shader::{DefaultProgram, DefaultShaders};
use easel::{ibl, FilterKind, HookPoint, HookTable, Shader, MAX_LIGHTS};

const DEFAULT_PROGRAMS: [DefaultProgram; 7] = [
    DefaultProgram::Light,
    DefaultProgram::ImmediateTexture,
    DefaultProgram::Normal,
    DefaultProgram::Color,
    DefaultProgram::ImmediateColor,
    DefaultProgram::Line,
    DefaultProgram::Point,
];

fn assert_parses(shader: &Shader) {
    let source = shader.source();
    let module = match naga::front::wgsl::parse_str(&source) {
        Ok(module) => module,
        Err(error) => panic!(
            "program `{}` failed to parse:\n{}",
            shader.label(),
            error.emit_to_string(&source)
        ),
    };
    for (stage, name) in [
        (naga::ShaderStage::Vertex, "vs_main"),
        (naga::ShaderStage::Fragment, "fs_main"),
    ] {
        assert!(
            module
                .entry_points
                .iter()
                .any(|entry| entry.stage == stage && entry.name == name),
            "program `{}` has no {stage:?} entry point `{name}`",
            shader.label()
        );
    }
}

#[test]
fn per_pixel_defaults_parse() {
    let mut defaults = DefaultShaders::new(true, MAX_LIGHTS);
    for program in DEFAULT_PROGRAMS {
        assert_parses(&defaults.get(program));
    }
}

#[test]
fn per_vertex_defaults_parse() {
    let mut defaults = DefaultShaders::new(false, MAX_LIGHTS);
    for program in DEFAULT_PROGRAMS {
        assert_parses(&defaults.get(program));
    }
}

#[test]
fn builtin_filters_parse() {
    let mut filters = FilterPipeline::new();
    for kind in FilterKind::ALL {
        assert_parses(&filters.shader(kind));
    }
}

#[test]
fn image_light_programs_parse() {
    assert_parses(&ibl::diffuse_program());
    assert_parses(&ibl::specular_program());
}

#[test]
fn hooked_material_parses() {
    let mut defaults = DefaultShaders::new(true, MAX_LIGHTS);
    let hooks = HookTable::new().with(
        HookPoint::GetFinalColor,
        "return vec4<f32>(color.rgb * 0.5, color.a);",
    );
    let hooked = defaults.get(DefaultProgram::Light).modify(&hooks).unwrap();
    assert_parses(&hooked);
}

#[test]
fn line_program_reads_join_neighbors() {
    let mut defaults = DefaultShaders::new(true, MAX_LIGHTS);
    let line = defaults.get(DefaultProgram::Line);
    let source = line.source();
    let module = naga::front::wgsl::parse_str(&source).unwrap();
    let vertex = module
        .entry_points
        .iter()
        .find(|entry| entry.name == "vs_main")
        .unwrap();
    let input = vertex.function.arguments[0].ty;
    match &module.types[input].inner {
        naga::TypeInner::Struct { members, .. } => {
            let names: Vec<_> = members.iter().filter_map(|m| m.name.as_deref()).collect();
            assert!(names.contains(&"start_neighbor"));
            assert!(names.contains(&"end_neighbor"));
            assert_eq!(members.len(), 7);
        }
        other => panic!("vertex input is not a struct: {other:?}"),
    }
    assert!(source.contains("u.stroke_join"));
}

#[test]
fn panorama_program_parses() {
    assert_parses(&FilterPipeline::new().sphere_map_shader());
}
