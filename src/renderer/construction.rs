use super::*;

impl Renderer<WgpuBackend> {
    /// A renderer drawing into an offscreen `width` x `height` surface on the first available
    /// adapter.
    pub async fn new_headless(width: u32, height: u32, config: RendererConfig) -> Result<Self> {
        let (physical_width, physical_height) =
            physical_size(width, height, config.pixel_density);
        let backend = WgpuBackend::new_headless(physical_width, physical_height).await?;
        Ok(Self::with_backend(backend, width, height, config))
    }
}

impl<B: Backend> Renderer<B> {
    /// Wraps a backend whose main surface already has the physical size of `width` x `height`
    /// at the configured pixel density.
    pub fn with_backend(backend: B, width: u32, height: u32, config: RendererConfig) -> Self {
        let main = Surface {
            width,
            height,
            density: config.pixel_density,
        };
        let camera = Camera::default_for(width as f32, height as f32);
        debug!(
            width,
            height,
            density = config.pixel_density,
            per_pixel_lighting = config.per_pixel_lighting,
            "Creating renderer"
        );

        Self {
            backend,
            main,
            framebuffers: HashMap::new(),
            target: TargetId::Main,
            states: StateStack::new(RenderState::new(camera)),
            clip: ClipState::new(),
            defaults: DefaultShaders::new(config.per_pixel_lighting, MAX_LIGHTS),
            programs: ProgramCache::new(),
            geometry: GeometryCache::new(),
            building: None,
            immediate: ImmediateBuffer::new(),
            current_normal: [0.0, 0.0, 1.0],
            tessellator: PolygonTessellator::new(config.tessellation_cache_size),
            bezier_table: CoefficientTable::new(bezier_coefficients),
            quadratic_table: CoefficientTable::new(quadratic_coefficients),
            curve_detail: config.curve_detail.max(1),
            curve_tightness: 0.0,
            textures: HashMap::new(),
            image_lights: ImageLightCache::new(),
            filters: FilterPipeline::new(),
            config,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// The state drawing calls currently read.
    pub fn state(&self) -> &RenderState {
        self.states.current()
    }

    /// Number of unmatched `push()` calls.
    pub fn stack_depth(&self) -> usize {
        self.states.depth()
    }

    pub fn geometry_cache(&self) -> &GeometryCache {
        &self.geometry
    }

    /// Number of programs compiled on the backend so far.
    pub fn compiled_programs(&self) -> usize {
        self.programs.len()
    }

    /// Number of cached image-light maps (diffuse and specular counted separately).
    pub fn cached_image_lights(&self) -> usize {
        self.image_lights.len()
    }

    pub fn current_target(&self) -> TargetId {
        self.target
    }

    /// Logical size of the main surface.
    pub fn size(&self) -> (u32, u32) {
        (self.main.width, self.main.height)
    }

    pub fn pixel_density(&self) -> f32 {
        self.main.density
    }

    /// Segments sampled per curve span.
    pub fn set_curve_detail(&mut self, detail: u32) {
        self.curve_detail = detail.max(1);
    }

    pub fn curve_detail(&self) -> u32 {
        self.curve_detail
    }

    /// Tightness of Catmull-Rom curves; 0 is the standard spline, 1 connects points straight.
    pub fn curve_tightness(&mut self, tightness: f32) {
        self.curve_tightness = tightness;
    }
}
