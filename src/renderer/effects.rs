use super::*;

impl<B: Backend> Renderer<B> {
    /// Applies a filter to everything drawn so far on the current target.
    ///
    /// Accepts a [`FilterKind`] with its default parameter, or a filter [`Shader`].
    pub fn filter(&mut self, source: impl Into<FilterSource>) -> Result<()> {
        let source = source.into();
        let surface = self.target_surface();
        let target = FilterTarget {
            target: self.target,
            width: surface.width,
            height: surface.height,
            density: surface.density,
        };
        let layer = self
            .filters
            .run(&mut self.backend, &mut self.programs, &target, &source)?;
        debug!(?target, "Filter rendered, compositing");
        self.composite(layer, surface)
    }

    /// Applies a built-in filter with an explicit parameter.
    pub fn filter_with(&mut self, kind: FilterKind, parameter: f32) -> Result<()> {
        self.filter(FilterSource::Builtin {
            kind,
            parameter: Some(parameter),
        })
    }

    /// Fills the current target with the equirectangular `panorama` as seen through the current
    /// camera, like a skybox behind everything drawn afterwards.
    pub fn panorama(&mut self, panorama: &Image) -> Result<()> {
        let texture = self.texture_for(panorama);
        let camera = self.states.current().camera;
        let (fov_y, aspect) = camera.field_of_view();
        self.filter(FilterSource::SphereMap {
            panorama: texture,
            fov_y,
            aspect,
            view_rotation: math::inverse_rotation(&camera.view),
        })
    }

    /// Writes `pixels` back to the current target, stretched over it, and clears depth.
    /// The inverse of [`Renderer::load_pixels`].
    pub fn update_pixels(&mut self, pixels: &Image) -> Result<()> {
        let (width, height, data) = pixels.fit_within(self.backend.max_texture_size());
        let texture = self.backend.create_texture(width, height, &data);
        debug!(width, height, %texture, "Updating pixels");
        let surface = self.target_surface();
        let drawn = self.composite(texture, surface);
        self.backend.release_texture(texture);
        drawn
    }

    /// Replaces the target's contents with `layer`, drawn edge to edge.
    fn composite(&mut self, layer: TextureId, surface: Surface) -> Result<()> {
        self.backend.clear(
            self.target,
            &ClearOps {
                color: Some(Color::TRANSPARENT.0),
                depth: Some(1.0),
                stencil: None,
            },
        );
        self.push();
        {
            let state = self.states.current_mut();
            state.camera = Camera::ortho_for(surface.width as f32, surface.height as f32);
            state.model = Mat4::identity();
            state.blend_mode = BlendMode::Blend;
            state.tint = Color::WHITE;
            state.user_fill_shader = None;
            state.user_stroke_shader = None;
            state.user_point_shader = None;
        }
        let (width, height) = (surface.width as f32, surface.height as f32);
        let drawn = self.image_texture(layer, -width / 2.0, -height / 2.0, width, height);
        self.pop()?;
        self.clear_depth();
        drawn
    }

    /// Diffuse and specular maps of an environment image, computed on first use.
    pub(super) fn image_light_textures(&mut self, image: &Image) -> Result<(TextureId, TextureId)> {
        let source = self.texture_for(image);
        let diffuse = self
            .image_lights
            .diffuse(&mut self.backend, &mut self.programs, image, source)?;
        let diffuse = self
            .backend
            .target_texture(TargetId::Framebuffer(diffuse))
            .ok_or_else(|| RenderError::Backend("diffuse image light lost".into()))?;
        let specular = self
            .image_lights
            .specular(&mut self.backend, &mut self.programs, image, source)?;
        Ok((diffuse, specular))
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::{Command, RecordedGeometry, RecordingBackend, TargetId};
    use crate::config::RendererConfig;
    use crate::filter::FilterKind;
    use crate::image::Image;
    use crate::renderer::Renderer;
    use crate::shader::UniformValue;

    fn renderer() -> Renderer<RecordingBackend> {
        Renderer::with_backend(
            RecordingBackend::new(100, 50),
            100,
            50,
            RendererConfig::default(),
        )
    }

    #[test]
    fn blur_runs_two_passes_then_composites() {
        let mut renderer = renderer();
        renderer.filter_with(FilterKind::Blur, 3.0).unwrap();

        let draws: Vec<_> = renderer.backend().draws().collect();
        let passes: Vec<_> = draws
            .iter()
            .filter(|draw| draw.geometry == RecordedGeometry::Fullscreen)
            .collect();
        assert_eq!(passes.len(), 2);
        for pass in &passes {
            assert_eq!(
                pass.uniforms.get("texel_size"),
                Some(&UniformValue::Vec2([1.0 / 100.0, 1.0 / 50.0]))
            );
        }
        assert_eq!(
            passes[0].uniforms.get("direction"),
            Some(&UniformValue::Vec2([1.0, 0.0]))
        );
        assert_eq!(
            passes[1].uniforms.get("direction"),
            Some(&UniformValue::Vec2([0.0, 1.0]))
        );

        let composite = draws.last().unwrap();
        assert_eq!(composite.target, TargetId::Main);
        assert!(matches!(composite.geometry, RecordedGeometry::Mesh { .. }));
        assert_eq!(composite.uniforms.get("is_texture"), Some(&UniformValue::Bool(true)));
        assert_eq!(renderer.stack_depth(), 0);
    }

    #[test]
    fn panorama_samples_the_image_through_the_camera() {
        let mut renderer = renderer();
        let sky = Image::solid(8, 4, [10, 20, 200, 255]);
        renderer.panorama(&sky).unwrap();
        let sky_texture = renderer.texture_for(&sky);

        let draws: Vec<_> = renderer.backend().draws().collect();
        let pass = draws
            .iter()
            .find(|draw| draw.geometry == RecordedGeometry::Fullscreen)
            .unwrap();
        assert_eq!(pass.program_label, "filter_sphere_map");
        assert_eq!(pass.uniforms.get("tex0"), Some(&UniformValue::Texture(sky_texture)));
        let float = |name: &str| match pass.uniforms.get(name) {
            Some(UniformValue::Float(value)) => *value,
            other => panic!("unexpected {name} {other:?}"),
        };
        assert!((float("fov_y") - std::f32::consts::PI / 3.0).abs() < 1e-5);
        assert!((float("aspect") - 2.0).abs() < 1e-5);
        assert_eq!(draws.last().unwrap().target, TargetId::Main);
    }

    #[test]
    fn update_pixels_composites_a_temporary_texture() {
        let mut renderer = renderer();
        let frame = Image::solid(100, 50, [255, 0, 0, 255]);
        renderer.update_pixels(&frame).unwrap();

        let commands = renderer.backend().commands();
        let created = commands.iter().find_map(|command| match command {
            Command::CreateTexture { texture, width: 100, height: 50, .. } => Some(*texture),
            _ => None,
        });
        let created = created.unwrap();
        let draw = renderer.backend().draws().last().unwrap();
        assert_eq!(draw.target, TargetId::Main);
        assert_eq!(draw.uniforms.get("tex"), Some(&UniformValue::Texture(created)));
        assert!(commands
            .iter()
            .any(|command| matches!(command, Command::ReleaseTexture(texture) if *texture == created)));
        let last_draw = commands
            .iter()
            .rposition(|command| matches!(command, Command::Draw(_)))
            .unwrap();
        assert!(commands[last_draw..].iter().any(|command| matches!(
            command,
            Command::Clear { ops, .. } if ops.depth == Some(1.0) && ops.color.is_none()
        )));
        assert_eq!(renderer.stack_depth(), 0);
    }

    #[test]
    fn image_lights_are_computed_once() {
        let mut renderer = renderer();
        let environment = Image::solid(64, 32, [200, 180, 160, 255]);
        renderer.image_light(&environment);
        renderer.no_stroke();
        renderer.rect(0.0, 0.0, 10.0, 10.0).unwrap();
        renderer.rect(20.0, 0.0, 10.0, 10.0).unwrap();

        assert_eq!(renderer.cached_image_lights(), 2);
        let fullscreen = renderer
            .backend()
            .draws()
            .filter(|draw| draw.geometry == RecordedGeometry::Fullscreen)
            .count();
        // One diffuse pass plus one pass per specular level.
        assert_eq!(fullscreen, 1 + 10);

        let lit: Vec<_> = renderer
            .backend()
            .draws()
            .filter(|draw| draw.uniforms.get("use_image_light") == Some(&UniformValue::Bool(true)))
            .collect();
        assert_eq!(lit.len(), 2);
        assert_eq!(
            lit[0].uniforms.get("environment_map_specular"),
            lit[1].uniforms.get("environment_map_specular")
        );
    }
}
