use std::num::NonZeroUsize;

/// Upper bound on lights of each kind (ambient, directional, point, spot) bound per draw.
pub const MAX_LIGHTS: usize = 5;
/// Width of the diffuse image-light convolution; the height preserves the source aspect.
pub const DIFFUSE_WIDTH: u32 = 200;
/// Size of the top level of the specular image-light pyramid.
pub const SPECULAR_SIZE: u32 = 512;
/// Arcs with more segments than this are drawn without stroke.
pub const ARC_STROKE_DETAIL_LIMIT: u32 = 50;
pub const DEFAULT_POINT_SIZE: f32 = 5.0;
pub const DEFAULT_STROKE_WEIGHT: f32 = 1.0;
pub const DEFAULT_ELLIPSE_DETAIL: u32 = 25;

/// Renderer-wide settings, fixed at construction time.
///
/// ```
/// use easel::RendererConfig;
///
/// let config = RendererConfig::default()
///     .with_per_pixel_lighting(false)
///     .with_curve_detail(40);
/// assert_eq!(config.curve_detail, 40);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Selects the per-pixel (Phong) light program over the per-vertex one. Shader hooks are
    /// only available with per-pixel lighting.
    pub per_pixel_lighting: bool,
    /// Initial number of segments sampled per curve span.
    pub curve_detail: u32,
    /// Number of immediate-mode polygon tessellations kept around.
    pub tessellation_cache_size: NonZeroUsize,
    /// Ratio between physical pixels and logical units of the main surface.
    pub pixel_density: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            per_pixel_lighting: true,
            curve_detail: 20,
            tessellation_cache_size: NonZeroUsize::new(256).unwrap_or(NonZeroUsize::MIN),
            pixel_density: 1.0,
        }
    }
}

impl RendererConfig {
    pub fn with_per_pixel_lighting(mut self, enabled: bool) -> Self {
        self.per_pixel_lighting = enabled;
        self
    }

    pub fn with_curve_detail(mut self, detail: u32) -> Self {
        self.curve_detail = detail.max(1);
        self
    }

    pub fn with_tessellation_cache_size(mut self, size: NonZeroUsize) -> Self {
        self.tessellation_cache_size = size;
        self
    }

    pub fn with_pixel_density(mut self, density: f32) -> Self {
        self.pixel_density = density;
        self
    }
}
