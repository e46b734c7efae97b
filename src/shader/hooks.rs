//! Named override points of the built-in programs.
//!
//! Each hook is emitted as a WGSL function `hook_<name>` with a fixed signature. A program's
//! main functions call the hooks; a [`HookTable`] replaces the default body of any of them.

use ahash::{HashMap, HashMapExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookPoint {
    BeforeVertex,
    GetLocalPosition,
    GetWorldPosition,
    GetLocalNormal,
    GetWorldNormal,
    GetUv,
    GetVertexColor,
    GetPointSize,
    GetStrokeWeight,
    GetLineCenter,
    GetLinePosition,
    AfterVertex,
    BeforeFragment,
    GetPixelInputs,
    CombineColors,
    GetFinalColor,
    ShouldDiscard,
    AfterFragment,
}

impl HookPoint {
    /// Hooks available in fill programs without lighting.
    pub const FILL: &'static [HookPoint] = &[
        HookPoint::BeforeVertex,
        HookPoint::GetLocalPosition,
        HookPoint::GetWorldPosition,
        HookPoint::GetLocalNormal,
        HookPoint::GetWorldNormal,
        HookPoint::GetUv,
        HookPoint::GetVertexColor,
        HookPoint::AfterVertex,
        HookPoint::BeforeFragment,
        HookPoint::GetFinalColor,
        HookPoint::AfterFragment,
    ];

    /// Hooks available in the per-pixel light program.
    pub const MATERIAL: &'static [HookPoint] = &[
        HookPoint::BeforeVertex,
        HookPoint::GetLocalPosition,
        HookPoint::GetWorldPosition,
        HookPoint::GetLocalNormal,
        HookPoint::GetWorldNormal,
        HookPoint::GetUv,
        HookPoint::GetVertexColor,
        HookPoint::AfterVertex,
        HookPoint::BeforeFragment,
        HookPoint::GetPixelInputs,
        HookPoint::CombineColors,
        HookPoint::GetFinalColor,
        HookPoint::AfterFragment,
    ];

    pub const STROKE: &'static [HookPoint] = &[
        HookPoint::BeforeVertex,
        HookPoint::GetLocalPosition,
        HookPoint::GetWorldPosition,
        HookPoint::GetStrokeWeight,
        HookPoint::GetLineCenter,
        HookPoint::GetLinePosition,
        HookPoint::GetVertexColor,
        HookPoint::AfterVertex,
        HookPoint::BeforeFragment,
        HookPoint::ShouldDiscard,
        HookPoint::GetFinalColor,
        HookPoint::AfterFragment,
    ];

    pub const POINT: &'static [HookPoint] = &[
        HookPoint::BeforeVertex,
        HookPoint::GetLocalPosition,
        HookPoint::GetWorldPosition,
        HookPoint::GetPointSize,
        HookPoint::AfterVertex,
        HookPoint::BeforeFragment,
        HookPoint::ShouldDiscard,
        HookPoint::GetFinalColor,
        HookPoint::AfterFragment,
    ];

    pub fn function_name(self) -> &'static str {
        match self {
            HookPoint::BeforeVertex => "hook_before_vertex",
            HookPoint::GetLocalPosition => "hook_get_local_position",
            HookPoint::GetWorldPosition => "hook_get_world_position",
            HookPoint::GetLocalNormal => "hook_get_local_normal",
            HookPoint::GetWorldNormal => "hook_get_world_normal",
            HookPoint::GetUv => "hook_get_uv",
            HookPoint::GetVertexColor => "hook_get_vertex_color",
            HookPoint::GetPointSize => "hook_get_point_size",
            HookPoint::GetStrokeWeight => "hook_get_stroke_weight",
            HookPoint::GetLineCenter => "hook_get_line_center",
            HookPoint::GetLinePosition => "hook_get_line_position",
            HookPoint::AfterVertex => "hook_after_vertex",
            HookPoint::BeforeFragment => "hook_before_fragment",
            HookPoint::GetPixelInputs => "hook_get_pixel_inputs",
            HookPoint::CombineColors => "hook_combine_colors",
            HookPoint::GetFinalColor => "hook_get_final_color",
            HookPoint::ShouldDiscard => "hook_should_discard",
            HookPoint::AfterFragment => "hook_after_fragment",
        }
    }

    /// Parameter list and return type, as WGSL.
    pub fn signature(self) -> (&'static str, Option<&'static str>) {
        match self {
            HookPoint::BeforeVertex
            | HookPoint::AfterVertex
            | HookPoint::BeforeFragment
            | HookPoint::AfterFragment => ("", None),
            HookPoint::GetLocalPosition | HookPoint::GetWorldPosition => {
                ("position: vec3<f32>", Some("vec3<f32>"))
            }
            HookPoint::GetLocalNormal | HookPoint::GetWorldNormal => {
                ("normal: vec3<f32>", Some("vec3<f32>"))
            }
            HookPoint::GetUv => ("uv: vec2<f32>", Some("vec2<f32>")),
            HookPoint::GetVertexColor | HookPoint::GetFinalColor => {
                ("color: vec4<f32>", Some("vec4<f32>"))
            }
            HookPoint::GetPointSize => ("size: f32", Some("f32")),
            HookPoint::GetStrokeWeight => ("weight: f32", Some("f32")),
            HookPoint::GetLineCenter => ("center: vec2<f32>", Some("vec2<f32>")),
            HookPoint::GetLinePosition => ("position: vec2<f32>", Some("vec2<f32>")),
            HookPoint::GetPixelInputs => ("inputs: Inputs", Some("Inputs")),
            HookPoint::CombineColors => ("components: ColorComponents", Some("vec4<f32>")),
            HookPoint::ShouldDiscard => ("outside: bool", Some("bool")),
        }
    }

    /// Body used when no override is given.
    pub fn default_body(self) -> &'static str {
        match self {
            HookPoint::BeforeVertex
            | HookPoint::AfterVertex
            | HookPoint::BeforeFragment
            | HookPoint::AfterFragment => "",
            HookPoint::GetLocalPosition | HookPoint::GetWorldPosition => "return position;",
            HookPoint::GetLocalNormal | HookPoint::GetWorldNormal => "return normal;",
            HookPoint::GetUv => "return uv;",
            HookPoint::GetVertexColor | HookPoint::GetFinalColor => "return color;",
            HookPoint::GetPointSize => "return size;",
            HookPoint::GetStrokeWeight => "return weight;",
            HookPoint::GetLineCenter => "return center;",
            HookPoint::GetLinePosition => "return position;",
            HookPoint::GetPixelInputs => "return inputs;",
            HookPoint::CombineColors => {
                "return vec4<f32>(components.base_color * components.diffuse \
                 + components.ambient * components.ambient_color \
                 + components.specular * components.specular_color \
                 + components.emissive, components.opacity);"
            }
            HookPoint::ShouldDiscard => "return outside;",
        }
    }

    /// The WGSL function for this hook with the given body.
    pub fn emit(self, body: &str) -> String {
        let (parameters, output) = self.signature();
        match output {
            Some(output) => format!(
                "fn {}({parameters}) -> {output} {{\n    {body}\n}}\n",
                self.function_name()
            ),
            None => format!("fn {}({parameters}) {{\n    {body}\n}}\n", self.function_name()),
        }
    }
}

/// Override bodies keyed by hook point.
///
/// ```
/// use easel::{HookPoint, HookTable};
///
/// let hooks = HookTable::new()
///     .with(HookPoint::GetFinalColor, "return vec4<f32>(1.0, 0.0, 0.0, color.a);");
/// assert!(hooks.get(HookPoint::GetFinalColor).is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookTable {
    overrides: HashMap<HookPoint, String>,
}

impl HookTable {
    pub fn new() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }

    pub fn with(mut self, hook: HookPoint, body: impl Into<String>) -> Self {
        self.overrides.insert(hook, body.into());
        self
    }

    pub fn get(&self, hook: HookPoint) -> Option<&str> {
        self.overrides.get(&hook).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    pub fn hooks(&self) -> impl Iterator<Item = HookPoint> + '_ {
        self.overrides.keys().copied()
    }

    /// `other`'s overrides take precedence.
    pub fn merged(&self, other: &HookTable) -> HookTable {
        let mut merged = self.clone();
        for (hook, body) in &other.overrides {
            merged.overrides.insert(*hook, body.clone());
        }
        merged
    }

    /// Emits every hook of `points`, using overrides where present.
    pub fn emit_all(&self, points: &[HookPoint]) -> String {
        points
            .iter()
            .map(|&hook| hook.emit(self.get(hook).unwrap_or(hook.default_body())))
            .collect()
    }
}
