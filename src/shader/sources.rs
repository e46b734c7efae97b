//! WGSL bodies of the built-in programs.
//!
//! The `Uniforms` struct and the texture bindings are generated from each program's declarations,
//! so these chunks only reference `u.<name>` and `<texture>` / `<texture>_sampler`. Module-scope
//! declarations in WGSL are order independent, which lets chunks be concatenated freely.

pub const COMMON: &str = r#"
const PI: f32 = 3.141592653589793;
"#;

pub const FILL_INPUT: &str = r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) color: vec4<f32>,
};

fn pick_vertex_color(vertex_color: vec4<f32>) -> vec4<f32> {
    let use_vertex = u.use_vertex_color != 0u && vertex_color.r >= 0.0;
    return select(u.material_color, vertex_color, use_vertex);
}
"#;

/// Vertex stage shared by the unlit fill programs.
pub const SURFACE_VS: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) normal: vec3<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    hook_before_vertex();
    let local = hook_get_local_position(in.position);
    let world = hook_get_world_position((u.model_matrix * vec4<f32>(local, 1.0)).xyz);
    let local_normal = hook_get_local_normal(in.normal);
    let world_normal = hook_get_world_normal((u.model_matrix * vec4<f32>(local_normal, 0.0)).xyz);

    var out: VertexOutput;
    out.clip_position = u.projection_matrix * u.view_matrix * vec4<f32>(world, 1.0);
    out.color = hook_get_vertex_color(pick_vertex_color(in.color));
    out.uv = hook_get_uv(in.uv);
    out.normal = (u.view_matrix * vec4<f32>(world_normal, 0.0)).xyz;
    hook_after_vertex();
    return out;
}
"#;

pub const COLOR_FS: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    hook_before_fragment();
    let color = hook_get_final_color(in.color);
    hook_after_fragment();
    return vec4<f32>(color.rgb * color.a, color.a);
}
"#;

pub const NORMAL_FS: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    hook_before_fragment();
    let color = hook_get_final_color(vec4<f32>(normalize(in.normal), 1.0));
    hook_after_fragment();
    return vec4<f32>(color.rgb * color.a, color.a);
}
"#;

pub const TEXTURE_FS: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    hook_before_fragment();
    let sampled = textureSample(tex, tex_sampler, in.uv) * u.tint;
    let base = select(in.color, sampled, u.is_texture != 0u);
    let color = hook_get_final_color(base);
    hook_after_fragment();
    return vec4<f32>(color.rgb * color.a, color.a);
}
"#;

pub const EQUIRECT: &str = r#"
fn map_to_equirect(v: vec3<f32>) -> vec2<f32> {
    let n = normalize(v);
    let x = atan2(n.z, n.x) / (2.0 * PI) + 0.5;
    let y = acos(clamp(n.y, -1.0, 1.0)) / PI;
    return vec2<f32>(x, y);
}

fn equirect_to_direction(uv: vec2<f32>) -> vec3<f32> {
    let phi = (uv.x - 0.5) * 2.0 * PI;
    let theta = uv.y * PI;
    return vec3<f32>(sin(theta) * cos(phi), cos(theta), sin(theta) * sin(phi));
}
"#;

pub const LIGHTING: &str = r#"
struct LightResult {
    diffuse: vec3<f32>,
    specular: vec3<f32>,
};

fn lambert_diffuse(light_direction: vec3<f32>, normal: vec3<f32>) -> f32 {
    return max(0.0, dot(-light_direction, normal));
}

fn phong_specular(light_direction: vec3<f32>, view_direction: vec3<f32>, normal: vec3<f32>, shininess: f32) -> f32 {
    let reflected = reflect(light_direction, normal);
    return pow(max(dot(reflected, view_direction), 0.0), shininess);
}

fn attenuation(dist: f32) -> f32 {
    return 1.0 / (u.constant_attenuation + u.linear_attenuation * dist + u.quadratic_attenuation * dist * dist);
}

fn total_ambient() -> vec3<f32> {
    var ambient = vec3<f32>(0.0);
    for (var i: i32 = 0; i < u.ambient_light_count; i = i + 1) {
        ambient = ambient + u.ambient_color[i].xyz;
    }
    return ambient;
}

fn total_light(view_position: vec3<f32>, normal: vec3<f32>, shininess: f32) -> LightResult {
    var result: LightResult;
    result.diffuse = vec3<f32>(0.0);
    result.specular = vec3<f32>(0.0);
    let view_direction = normalize(-view_position);

    for (var i: i32 = 0; i < u.directional_light_count; i = i + 1) {
        let light_direction = normalize(u.lighting_direction[i].xyz);
        result.diffuse = result.diffuse
            + lambert_diffuse(light_direction, normal) * u.directional_diffuse_colors[i].xyz;
        result.specular = result.specular
            + phong_specular(light_direction, view_direction, normal, shininess) * u.directional_specular_colors[i].xyz;
    }

    for (var i: i32 = 0; i < u.point_light_count; i = i + 1) {
        let offset = view_position - u.point_light_location[i].xyz;
        let dist = length(offset);
        let light_direction = offset / max(dist, 0.0001);
        let falloff = attenuation(dist);
        result.diffuse = result.diffuse
            + lambert_diffuse(light_direction, normal) * u.point_light_diffuse_colors[i].xyz * falloff;
        result.specular = result.specular
            + phong_specular(light_direction, view_direction, normal, shininess) * u.point_light_specular_colors[i].xyz * falloff;
    }

    for (var i: i32 = 0; i < u.spot_light_count; i = i + 1) {
        let offset = view_position - u.spot_light_location[i].xyz;
        let dist = length(offset);
        let light_direction = offset / max(dist, 0.0001);
        let spot_cos = dot(light_direction, normalize(u.spot_light_direction[i].xyz));
        var cone = 0.0;
        if (spot_cos >= u.spot_light_angle[i].x) {
            cone = pow(max(spot_cos, 0.0), u.spot_light_conc[i].x);
        }
        let falloff = attenuation(dist) * cone;
        result.diffuse = result.diffuse
            + lambert_diffuse(light_direction, normal) * u.spot_light_diffuse_colors[i].xyz * falloff;
        result.specular = result.specular
            + phong_specular(light_direction, view_direction, normal, shininess) * u.spot_light_specular_colors[i].xyz * falloff;
    }

    return result;
}

fn image_light(view_position: vec3<f32>, normal: vec3<f32>, shininess: f32, metalness: f32) -> LightResult {
    let view_rotation = mat3x3<f32>(u.view_matrix[0].xyz, u.view_matrix[1].xyz, u.view_matrix[2].xyz);
    let to_world = transpose(view_rotation);
    let world_normal = to_world * normal;
    let view_direction = normalize(-view_position);
    let reflected = to_world * reflect(-view_direction, normal);

    let levels = f32(textureNumLevels(environment_map_specular));
    let roughness = 1.0 - clamp(shininess / 100.0, 0.0, 1.0);

    var result: LightResult;
    result.diffuse = textureSampleLevel(environment_map_diffused, environment_map_diffused_sampler, map_to_equirect(world_normal), 0.0).rgb
        * (1.0 - metalness);
    result.specular = textureSampleLevel(environment_map_specular, environment_map_specular_sampler, map_to_equirect(reflected), roughness * (levels - 1.0)).rgb
        * mix(0.04, 1.0, metalness);
    return result;
}
"#;

pub const MATERIAL_TYPES: &str = r#"
struct Inputs {
    normal: vec3<f32>,
    tex_coord: vec2<f32>,
    ambient_light: vec3<f32>,
    ambient_material: vec3<f32>,
    specular_material: vec3<f32>,
    emissive_material: vec3<f32>,
    color: vec4<f32>,
    shininess: f32,
    metalness: f32,
};

struct ColorComponents {
    base_color: vec3<f32>,
    opacity: f32,
    ambient_color: vec3<f32>,
    specular_color: vec3<f32>,
    diffuse: vec3<f32>,
    ambient: vec3<f32>,
    specular: vec3<f32>,
    emissive: vec3<f32>,
};
"#;

/// Per-pixel Phong lighting with hooks.
pub const PHONG: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) normal: vec3<f32>,
    @location(3) view_position: vec3<f32>,
    @location(4) ambient: vec3<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    hook_before_vertex();
    let local = hook_get_local_position(in.position);
    let world = hook_get_world_position((u.model_matrix * vec4<f32>(local, 1.0)).xyz);
    let view_position = u.view_matrix * vec4<f32>(world, 1.0);
    let local_normal = hook_get_local_normal(in.normal);
    let world_normal = hook_get_world_normal((u.model_matrix * vec4<f32>(local_normal, 0.0)).xyz);

    var out: VertexOutput;
    out.clip_position = u.projection_matrix * view_position;
    out.view_position = view_position.xyz;
    out.normal = (u.view_matrix * vec4<f32>(world_normal, 0.0)).xyz;
    out.uv = hook_get_uv(in.uv);
    out.color = hook_get_vertex_color(pick_vertex_color(in.color));
    out.ambient = total_ambient();
    hook_after_vertex();
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    hook_before_fragment();
    let sampled = textureSample(tex, tex_sampler, in.uv) * u.tint;
    let base = select(in.color, sampled, u.is_texture != 0u);

    var inputs: Inputs;
    inputs.normal = normalize(in.normal);
    inputs.tex_coord = in.uv;
    inputs.ambient_light = in.ambient;
    inputs.ambient_material = select(base.rgb, u.ambient_mat_color.rgb, u.has_set_ambient != 0u);
    inputs.specular_material = u.specular_mat_color.rgb;
    inputs.emissive_material = u.emissive_mat_color.rgb;
    inputs.color = base;
    inputs.shininess = u.shininess;
    inputs.metalness = u.metallic;
    inputs = hook_get_pixel_inputs(inputs);

    var components: ColorComponents;
    components.base_color = inputs.color.rgb;
    components.opacity = inputs.color.a;
    components.ambient_color = inputs.ambient_material;
    components.specular_color = inputs.specular_material;
    components.emissive = select(vec3<f32>(0.0), inputs.emissive_material, u.use_emissive != 0u);
    if (u.use_lighting != 0u) {
        let lit = total_light(in.view_position, inputs.normal, inputs.shininess);
        components.diffuse = lit.diffuse;
        components.specular = select(vec3<f32>(0.0), lit.specular, u.use_specular != 0u);
        components.ambient = inputs.ambient_light;
        if (u.use_image_light != 0u) {
            let ibl = image_light(in.view_position, inputs.normal, inputs.shininess, inputs.metalness);
            components.diffuse = components.diffuse + ibl.diffuse;
            components.specular = components.specular + ibl.specular;
        }
    } else {
        components.diffuse = vec3<f32>(1.0);
        components.specular = vec3<f32>(0.0);
        components.ambient = vec3<f32>(0.0);
    }

    let color = hook_get_final_color(hook_combine_colors(components));
    hook_after_fragment();
    return vec4<f32>(color.rgb * color.a, color.a);
}
"#;

/// Per-vertex lighting. No hooks.
pub const GOURAUD: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) diffuse: vec3<f32>,
    @location(3) specular: vec3<f32>,
    @location(4) ambient: vec3<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    let view_position = u.model_view_matrix * vec4<f32>(in.position, 1.0);
    let normal = normalize(u.normal_matrix * in.normal);

    var out: VertexOutput;
    out.clip_position = u.projection_matrix * view_position;
    out.uv = in.uv;
    out.color = pick_vertex_color(in.color);
    if (u.use_lighting != 0u) {
        let lit = total_light(view_position.xyz, normal, u.shininess);
        out.diffuse = lit.diffuse;
        out.specular = select(vec3<f32>(0.0), lit.specular, u.use_specular != 0u);
        out.ambient = total_ambient();
    } else {
        out.diffuse = vec3<f32>(1.0);
        out.specular = vec3<f32>(0.0);
        out.ambient = vec3<f32>(0.0);
    }
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let sampled = textureSample(tex, tex_sampler, in.uv) * u.tint;
    let base = select(in.color, sampled, u.is_texture != 0u);
    let ambient_material = select(base.rgb, u.ambient_mat_color.rgb, u.has_set_ambient != 0u);
    let emissive = select(vec3<f32>(0.0), u.emissive_mat_color.rgb, u.use_emissive != 0u);
    let rgb = base.rgb * in.diffuse
        + in.ambient * ambient_material
        + in.specular * u.specular_mat_color.rgb
        + emissive;
    return vec4<f32>(rgb * base.a, base.a);
}
"#;

/// Screen-space expanded line segments. Free ends get round, square or projecting caps; ends
/// shared with another segment get round, miter or bevel joins.
pub const LINE: &str = r#"
const MITER_LIMIT: f32 = 4.0;

struct StrokeInput {
    @location(0) position: vec3<f32>,
    @location(1) tangent: vec3<f32>,
    @location(2) color: vec4<f32>,
    @location(3) side: f32,
    @location(4) end: f32,
    @location(5) start_neighbor: vec3<f32>,
    @location(6) end_neighbor: vec3<f32>,
};

struct LineOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) @interpolate(linear) pixel: vec2<f32>,
    @location(2) @interpolate(flat) segment_start: vec2<f32>,
    @location(3) @interpolate(flat) segment_end: vec2<f32>,
    @location(4) @interpolate(flat) weight: f32,
    // Unit pixel direction towards the joined segment; zero at a free end.
    @location(5) @interpolate(flat) start_join: vec2<f32>,
    @location(6) @interpolate(flat) end_join: vec2<f32>,
};

fn to_pixels(clip: vec4<f32>) -> vec2<f32> {
    return clip.xy / clip.w * u.viewport * 0.5;
}

fn to_clip(world: vec3<f32>) -> vec4<f32> {
    return u.projection_matrix * u.view_matrix * vec4<f32>(world, 1.0);
}

fn project_local(local: vec3<f32>) -> vec4<f32> {
    return to_clip(hook_get_world_position((u.model_matrix * vec4<f32>(hook_get_local_position(local), 1.0)).xyz));
}

fn join_direction(corner_px: vec2<f32>, corner: vec3<f32>, neighbor: vec3<f32>) -> vec2<f32> {
    if (dot(neighbor, neighbor) == 0.0) {
        return vec2<f32>(0.0);
    }
    let toward = hook_get_line_center(to_pixels(project_local(corner + neighbor))) - corner_px;
    if (length(toward) < 0.0001) {
        return vec2<f32>(0.0);
    }
    return normalize(toward);
}

// How far the quad reaches past an end heading `outward`.
fn end_extension(outward: vec2<f32>, join: vec2<f32>, weight: f32) -> f32 {
    if (dot(join, join) == 0.0) {
        return select(weight * 0.5, 0.0, u.stroke_cap == 2);
    }
    let c = clamp(dot(outward, join), -1.0, 1.0);
    let miter_tip = sqrt(max(1.0 - c, 0.0) / max(1.0 + c, 0.0001));
    return weight * 0.5 * max(1.0, min(miter_tip, MITER_LIMIT));
}

// Whether `pixel`, past the end at `corner`, is covered by this segment's half of the join.
fn inside_join(pixel: vec2<f32>, corner: vec2<f32>, outward: vec2<f32>, join: vec2<f32>, weight: f32) -> bool {
    let rel = pixel - corner;
    let half_width = weight * 0.5;
    var outer = vec2<f32>(-outward.y, outward.x);
    if (dot(outer, join) > 0.0) {
        outer = -outer;
    }
    // Outer wedge between both end edges, split along the bisector.
    if (dot(rel, outer) < 0.0 || dot(rel, join) > 0.0 || dot(rel, outward + join) > 0.0) {
        return false;
    }
    if (u.stroke_join == 0) {
        return length(rel) <= half_width;
    }
    var neighbor_outer = vec2<f32>(-join.y, join.x);
    if (dot(neighbor_outer, outward) < 0.0) {
        neighbor_outer = -neighbor_outer;
    }
    let half_turn = sqrt(max((1.0 + clamp(dot(outward, join), -1.0, 1.0)) * 0.5, 0.0));
    if (u.stroke_join == 1 && half_turn * MITER_LIMIT >= 1.0) {
        return dot(rel, neighbor_outer) <= half_width;
    }
    let bevel = outer + neighbor_outer;
    if (length(bevel) < 0.0001) {
        return false;
    }
    let bevel_normal = normalize(bevel);
    return dot(rel, bevel_normal) <= half_width * dot(outer, bevel_normal);
}

@vertex
fn vs_main(in: StrokeInput) -> LineOutput {
    hook_before_vertex();
    let at_end = in.end > 0.5;
    let local_start = select(in.position, in.position - in.tangent, at_end);
    let local_end = local_start + in.tangent;
    let start_clip = project_local(local_start);
    let end_clip = project_local(local_end);
    let start_px = hook_get_line_center(to_pixels(start_clip));
    let end_px = hook_get_line_center(to_pixels(end_clip));
    let weight = hook_get_stroke_weight(u.stroke_weight);
    let start_join = join_direction(start_px, local_start, in.start_neighbor);
    let end_join = join_direction(end_px, local_end, in.end_neighbor);

    var along = end_px - start_px;
    if (length(along) < 0.0001) {
        along = vec2<f32>(1.0, 0.0);
    }
    let dir = normalize(along);
    let perpendicular = vec2<f32>(-dir.y, dir.x);
    let own_clip = select(start_clip, end_clip, at_end);
    let own_px = select(start_px, end_px, at_end);
    let outward = select(-dir, dir, at_end);
    let extension = end_extension(outward, select(start_join, end_join, at_end), weight);
    let pixel = hook_get_line_position(own_px + perpendicular * in.side * weight * 0.5 + outward * extension);

    var out: LineOutput;
    out.clip_position = vec4<f32>(
        pixel / (u.viewport * 0.5) * own_clip.w,
        own_clip.z - 0.00005 * own_clip.w,
        own_clip.w,
    );
    let use_line = u.use_line_color != 0u && in.color.r >= 0.0;
    out.color = hook_get_vertex_color(select(u.material_color, in.color, use_line));
    out.pixel = pixel;
    out.segment_start = start_px;
    out.segment_end = end_px;
    out.weight = weight;
    out.start_join = start_join;
    out.end_join = end_join;
    hook_after_vertex();
    return out;
}

@fragment
fn fs_main(in: LineOutput) -> @location(0) vec4<f32> {
    hook_before_fragment();
    let segment = in.segment_end - in.segment_start;
    let length_sq = max(dot(segment, segment), 0.0001);
    let t = dot(in.pixel - in.segment_start, segment) / length_sq;
    let dir = segment * inverseSqrt(length_sq);
    var outside = false;
    if (t < 0.0 && dot(in.start_join, in.start_join) > 0.0) {
        outside = !inside_join(in.pixel, in.segment_start, -dir, in.start_join, in.weight);
    } else if (t > 1.0 && dot(in.end_join, in.end_join) > 0.0) {
        outside = !inside_join(in.pixel, in.segment_end, dir, in.end_join, in.weight);
    } else {
        let nearest = in.segment_start + segment * clamp(t, 0.0, 1.0);
        outside = u.stroke_cap == 0 && length(in.pixel - nearest) > in.weight * 0.5;
    }
    if (hook_should_discard(outside)) {
        discard;
    }
    let color = hook_get_final_color(in.color);
    hook_after_fragment();
    return vec4<f32>(color.rgb * color.a, color.a);
}
"#;

/// Round points drawn as screen-aligned quads.
pub const POINT: &str = r#"
struct PointInput {
    @location(0) position: vec3<f32>,
    @location(1) corner: vec2<f32>,
};

struct PointOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) corner: vec2<f32>,
    @location(1) color: vec4<f32>,
};

@vertex
fn vs_main(in: PointInput) -> PointOutput {
    hook_before_vertex();
    let world = hook_get_world_position((u.model_matrix * vec4<f32>(hook_get_local_position(in.position), 1.0)).xyz);
    let clip = u.projection_matrix * u.view_matrix * vec4<f32>(world, 1.0);
    let size = hook_get_point_size(u.point_size);

    var out: PointOutput;
    let offset = in.corner * size * 0.5 / (u.viewport * 0.5) * clip.w;
    out.clip_position = clip + vec4<f32>(offset, 0.0, 0.0);
    out.corner = in.corner;
    out.color = u.material_color;
    hook_after_vertex();
    return out;
}

@fragment
fn fs_main(in: PointOutput) -> @location(0) vec4<f32> {
    hook_before_fragment();
    if (hook_should_discard(length(in.corner) > 1.0)) {
        discard;
    }
    let color = hook_get_final_color(in.color);
    hook_after_fragment();
    return vec4<f32>(color.rgb * color.a, color.a);
}
"#;

/// Fullscreen triangle from the vertex index; `uv` has its origin at the top left.
pub const FULLSCREEN_VS: &str = r#"
struct QuadOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> QuadOutput {
    let uv = vec2<f32>(f32((vi << 1u) & 2u), f32(vi & 2u));
    var out: QuadOutput;
    out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}
"#;

pub const FILTER_HELPERS: &str = r#"
fn luma(rgb: vec3<f32>) -> f32 {
    return dot(rgb, vec3<f32>(0.2126, 0.7152, 0.0722));
}

fn unpremultiply(color: vec4<f32>) -> vec4<f32> {
    if (color.a <= 0.0) {
        return vec4<f32>(0.0);
    }
    return vec4<f32>(color.rgb / color.a, color.a);
}

fn premultiply(color: vec4<f32>) -> vec4<f32> {
    return vec4<f32>(color.rgb * color.a, color.a);
}
"#;

pub const GRAY_FS: &str = r#"
@fragment
fn fs_main(in: QuadOutput) -> @location(0) vec4<f32> {
    let color = unpremultiply(textureSample(tex0, tex0_sampler, in.uv));
    return premultiply(vec4<f32>(vec3<f32>(luma(color.rgb)), color.a));
}
"#;

pub const INVERT_FS: &str = r#"
@fragment
fn fs_main(in: QuadOutput) -> @location(0) vec4<f32> {
    let color = unpremultiply(textureSample(tex0, tex0_sampler, in.uv));
    return premultiply(vec4<f32>(vec3<f32>(1.0) - color.rgb, color.a));
}
"#;

pub const THRESHOLD_FS: &str = r#"
@fragment
fn fs_main(in: QuadOutput) -> @location(0) vec4<f32> {
    let color = unpremultiply(textureSample(tex0, tex0_sampler, in.uv));
    let level = step(u.filter_parameter, luma(color.rgb));
    return premultiply(vec4<f32>(vec3<f32>(level), color.a));
}
"#;

pub const POSTERIZE_FS: &str = r#"
@fragment
fn fs_main(in: QuadOutput) -> @location(0) vec4<f32> {
    let color = unpremultiply(textureSample(tex0, tex0_sampler, in.uv));
    let levels = max(u.filter_parameter, 2.0);
    let quantized = min(floor(color.rgb * levels) / (levels - 1.0), vec3<f32>(1.0));
    return premultiply(vec4<f32>(quantized, color.a));
}
"#;

pub const OPAQUE_FS: &str = r#"
@fragment
fn fs_main(in: QuadOutput) -> @location(0) vec4<f32> {
    let color = unpremultiply(textureSample(tex0, tex0_sampler, in.uv));
    return vec4<f32>(color.rgb, 1.0);
}
"#;

/// Keeps the darkest of the pixel and its four neighbours.
pub const ERODE_FS: &str = r#"
@fragment
fn fs_main(in: QuadOutput) -> @location(0) vec4<f32> {
    var offsets = array<vec2<f32>, 4>(
        vec2<f32>(0.0, -1.0),
        vec2<f32>(-1.0, 0.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(0.0, 1.0),
    );
    var best = textureSampleLevel(tex0, tex0_sampler, in.uv, 0.0);
    var best_luma = luma(best.rgb);
    for (var i: i32 = 0; i < 4; i = i + 1) {
        let neighbor = textureSampleLevel(tex0, tex0_sampler, in.uv + offsets[i] * u.texel_size, 0.0);
        let level = luma(neighbor.rgb);
        if (level < best_luma) {
            best = neighbor;
            best_luma = level;
        }
    }
    return best;
}
"#;

/// Keeps the brightest of the pixel and its four neighbours.
pub const DILATE_FS: &str = r#"
@fragment
fn fs_main(in: QuadOutput) -> @location(0) vec4<f32> {
    var offsets = array<vec2<f32>, 4>(
        vec2<f32>(0.0, -1.0),
        vec2<f32>(-1.0, 0.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(0.0, 1.0),
    );
    var best = textureSampleLevel(tex0, tex0_sampler, in.uv, 0.0);
    var best_luma = luma(best.rgb);
    for (var i: i32 = 0; i < 4; i = i + 1) {
        let neighbor = textureSampleLevel(tex0, tex0_sampler, in.uv + offsets[i] * u.texel_size, 0.0);
        let level = luma(neighbor.rgb);
        if (level > best_luma) {
            best = neighbor;
            best_luma = level;
        }
    }
    return best;
}
"#;

/// One direction of a separable gaussian; `u.direction` selects the axis.
pub const BLUR_FS: &str = r#"
@fragment
fn fs_main(in: QuadOutput) -> @location(0) vec4<f32> {
    let radius = max(u.radius, 1.0);
    let sigma = max(radius * 0.5, 0.5);
    let steps = min(i32(ceil(radius)), 64);
    var total = vec4<f32>(0.0);
    var weight_sum = 0.0;
    for (var i: i32 = -steps; i <= steps; i = i + 1) {
        let x = f32(i);
        let weight = exp(-(x * x) / (2.0 * sigma * sigma));
        let offset = u.direction * u.texel_size * x;
        total = total + textureSampleLevel(tex0, tex0_sampler, in.uv + offset, 0.0) * weight;
        weight_sum = weight_sum + weight;
    }
    return total / weight_sum;
}
"#;

/// Samples the equirectangular `tex0` along the camera ray of each pixel. World -y is up.
pub const SPHERE_MAP_FS: &str = r#"
@fragment
fn fs_main(in: QuadOutput) -> @location(0) vec4<f32> {
    let half_height = tan(u.fov_y * 0.5);
    let ray = vec3<f32>(
        (in.uv.x * 2.0 - 1.0) * half_height * u.aspect,
        (in.uv.y * 2.0 - 1.0) * half_height,
        -1.0,
    );
    let n = normalize(u.view_rotation * ray);
    let uv = vec2<f32>(atan2(n.z, n.x) / (2.0 * PI) + 0.5, 0.5 + 0.5 * n.y);
    return premultiply(textureSample(tex0, tex0_sampler, uv));
}
"#;

/// Cosine-weighted hemisphere convolution of an equirectangular map.
pub const IBL_DIFFUSE_FS: &str = r#"
@fragment
fn fs_main(in: QuadOutput) -> @location(0) vec4<f32> {
    let normal = equirect_to_direction(in.uv);
    var up = vec3<f32>(0.0, 1.0, 0.0);
    if (abs(normal.y) > 0.999) {
        up = vec3<f32>(1.0, 0.0, 0.0);
    }
    let right = normalize(cross(up, normal));
    let tangent_up = cross(normal, right);

    var irradiance = vec3<f32>(0.0);
    var count = 0.0;
    for (var phi: f32 = 0.0; phi < 2.0 * PI; phi = phi + 0.15) {
        for (var theta: f32 = 0.0; theta < 0.5 * PI; theta = theta + 0.15) {
            let local_dir = vec3<f32>(sin(theta) * cos(phi), sin(theta) * sin(phi), cos(theta));
            let sample_dir = local_dir.x * right + local_dir.y * tangent_up + local_dir.z * normal;
            irradiance = irradiance
                + textureSampleLevel(environment_map, environment_map_sampler, map_to_equirect(sample_dir), 0.0).rgb
                * cos(theta) * sin(theta);
            count = count + 1.0;
        }
    }
    return vec4<f32>(PI * irradiance / max(count, 1.0), 1.0);
}
"#;

/// GGX prefiltered environment at `u.roughness`.
pub const IBL_SPECULAR_FS: &str = r#"
const SAMPLE_COUNT: u32 = 64u;

fn radical_inverse(bits: u32) -> f32 {
    return f32(reverseBits(bits)) * 2.3283064365386963e-10;
}

fn importance_sample_ggx(xi: vec2<f32>, normal: vec3<f32>, roughness: f32) -> vec3<f32> {
    let a = roughness * roughness;
    let phi = 2.0 * PI * xi.x;
    let cos_theta = sqrt((1.0 - xi.y) / (1.0 + (a * a - 1.0) * xi.y));
    let sin_theta = sqrt(1.0 - cos_theta * cos_theta);
    let half_vector = vec3<f32>(cos(phi) * sin_theta, sin(phi) * sin_theta, cos_theta);
    var up = vec3<f32>(0.0, 0.0, 1.0);
    if (abs(normal.z) > 0.999) {
        up = vec3<f32>(1.0, 0.0, 0.0);
    }
    let tangent = normalize(cross(up, normal));
    let bitangent = cross(normal, tangent);
    return normalize(tangent * half_vector.x + bitangent * half_vector.y + normal * half_vector.z);
}

@fragment
fn fs_main(in: QuadOutput) -> @location(0) vec4<f32> {
    let normal = equirect_to_direction(in.uv);
    var color = vec3<f32>(0.0);
    var total_weight = 0.0;
    for (var i: u32 = 0u; i < SAMPLE_COUNT; i = i + 1u) {
        let xi = vec2<f32>(f32(i) / f32(SAMPLE_COUNT), radical_inverse(i));
        let half_vector = importance_sample_ggx(xi, normal, u.roughness);
        let light_dir = normalize(2.0 * dot(normal, half_vector) * half_vector - normal);
        let n_dot_l = max(dot(normal, light_dir), 0.0);
        if (n_dot_l > 0.0) {
            color = color
                + textureSampleLevel(environment_map, environment_map_sampler, map_to_equirect(light_dir), 0.0).rgb
                * n_dot_l;
            total_weight = total_weight + n_dot_l;
        }
    }
    return vec4<f32>(color / max(total_weight, 0.0001), 1.0);
}
"#;
