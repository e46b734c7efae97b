use super::*;

impl<B: Backend> Renderer<B> {
    /// Fixed-function state for the next draw into the current target.
    pub(super) fn raster_state(&self) -> RasterState {
        let mut raster = RasterState {
            blend: self.states.current().blend_mode,
            stencil: self.clip.stencil_mode(self.target),
            ..Default::default()
        };
        if self.clip.phase(self.target) == ClipPhase::Clipping {
            raster.depth_test = false;
            raster.depth_write = false;
            raster.color_write = false;
        }
        raster
    }

    /// Mask geometry only writes stencil, so its color is made fully transparent.
    fn draw_color(&self, color: Color) -> [f32; 4] {
        if self.clip.phase(self.target) == ClipPhase::Clipping {
            let [r, g, b, _] = color.0;
            [r, g, b, 0.0]
        } else {
            color.0
        }
    }

    fn matrix_uniforms(&self, model: &Mat4) -> UniformSet {
        let camera = &self.states.current().camera;
        let model_view = model.then(&camera.view);
        let (width, height) = self.target_surface().physical();

        let mut uniforms = UniformSet::new();
        uniforms.set("model_matrix", UniformValue::Mat4(math::to_columns(model)));
        uniforms.set("view_matrix", UniformValue::Mat4(math::to_columns(&camera.view)));
        uniforms.set(
            "projection_matrix",
            UniformValue::Mat4(math::to_columns(&camera.projection)),
        );
        uniforms.set("model_view_matrix", UniformValue::Mat4(math::to_columns(&model_view)));
        uniforms.set("normal_matrix", UniformValue::Mat3(math::normal_matrix(&model_view)));
        uniforms.set("viewport", [width as f32, height as f32]);
        uniforms
    }

    /// The fill program for the current state.
    pub(super) fn fill_shader(&mut self, mode: DrawMode) -> Shader {
        let state = self.states.current();
        let request = FillRequest {
            mode,
            normal_material: state.use_normal_material,
            lighting: state.enable_lighting,
            textured: state.texture.is_some(),
        };
        resolve_fill(&mut self.defaults, state.user_fill_shader.as_ref(), request)
    }

    fn bind_fill_uniforms(
        &mut self,
        shader: &Shader,
        uniforms: &mut UniformSet,
        vertex_colors: bool,
    ) -> Result<()> {
        let image_light = match &self.states.current().image_light {
            Some(image) if shader.is_light_shader() && self.states.current().enable_lighting => {
                Some(image.clone())
            }
            _ => None,
        };
        let image_light = match image_light {
            Some(image) => Some(self.image_light_textures(&image)?),
            None => None,
        };

        let state = self.states.current();
        uniforms.set("material_color", self.draw_color(state.fill));
        uniforms.set("use_vertex_color", vertex_colors);
        uniforms.set("tint", state.tint.0);
        uniforms.set("is_texture", state.texture.is_some());
        if let Some(texture) = state.texture {
            uniforms.set("tex", texture);
        }
        if !shader.is_light_shader() {
            return Ok(());
        }

        let metalness = state.metalness;
        uniforms.set("use_lighting", state.enable_lighting);
        uniforms.set("has_set_ambient", state.has_set_ambient);
        uniforms.set("ambient_mat_color", state.ambient_material.0);
        uniforms.set(
            "specular_mat_color",
            state.specular_material.lerp(&state.fill, metalness.min(1.0)).0,
        );
        uniforms.set("emissive_mat_color", state.emissive_material.0);
        uniforms.set("use_specular", state.use_specular_material);
        uniforms.set("use_emissive", state.use_emissive_material);
        uniforms.set("shininess", state.shininess);
        uniforms.set("metallic", metalness);

        let lights = &state.lights;
        uniforms.set("ambient_light_count", lights.ambient.len() as i32);
        uniforms.set(
            "ambient_color",
            UniformValue::Vec3Array(
                lights
                    .ambient
                    .iter()
                    .map(|color| color.map(|channel| (channel - metalness).max(0.0)))
                    .collect(),
            ),
        );

        uniforms.set("directional_light_count", lights.directional.len() as i32);
        uniforms.set(
            "lighting_direction",
            UniformValue::Vec3Array(lights.directional.iter().map(|l| l.direction).collect()),
        );
        uniforms.set(
            "directional_diffuse_colors",
            UniformValue::Vec3Array(lights.directional.iter().map(|l| l.diffuse).collect()),
        );
        uniforms.set(
            "directional_specular_colors",
            UniformValue::Vec3Array(lights.directional.iter().map(|l| l.specular).collect()),
        );

        uniforms.set("point_light_count", lights.point.len() as i32);
        uniforms.set(
            "point_light_location",
            UniformValue::Vec3Array(lights.point.iter().map(|l| l.position).collect()),
        );
        uniforms.set(
            "point_light_diffuse_colors",
            UniformValue::Vec3Array(lights.point.iter().map(|l| l.diffuse).collect()),
        );
        uniforms.set(
            "point_light_specular_colors",
            UniformValue::Vec3Array(lights.point.iter().map(|l| l.specular).collect()),
        );

        uniforms.set("spot_light_count", lights.spot.len() as i32);
        uniforms.set(
            "spot_light_angle",
            UniformValue::FloatArray(lights.spot.iter().map(|l| l.angle_cos).collect()),
        );
        uniforms.set(
            "spot_light_conc",
            UniformValue::FloatArray(lights.spot.iter().map(|l| l.concentration).collect()),
        );
        uniforms.set(
            "spot_light_diffuse_colors",
            UniformValue::Vec3Array(lights.spot.iter().map(|l| l.diffuse).collect()),
        );
        uniforms.set(
            "spot_light_specular_colors",
            UniformValue::Vec3Array(lights.spot.iter().map(|l| l.specular).collect()),
        );
        uniforms.set(
            "spot_light_location",
            UniformValue::Vec3Array(lights.spot.iter().map(|l| l.position).collect()),
        );
        uniforms.set(
            "spot_light_direction",
            UniformValue::Vec3Array(lights.spot.iter().map(|l| l.direction).collect()),
        );

        uniforms.set("constant_attenuation", state.attenuation.constant);
        uniforms.set("linear_attenuation", state.attenuation.linear);
        uniforms.set("quadratic_attenuation", state.attenuation.quadratic);

        uniforms.set("use_image_light", image_light.is_some());
        if let Some((diffuse, specular)) = image_light {
            uniforms.set("environment_map_diffused", diffuse);
            uniforms.set("environment_map_specular", specular);
        }
        Ok(())
    }

    /// Issues a fill draw with `shader`, which must come from [`Self::fill_shader`].
    pub(super) fn submit_fill(
        &mut self,
        shader: &Shader,
        model: &Mat4,
        geometry: DrawGeometry<'_>,
        vertex_colors: bool,
    ) -> Result<()> {
        let program = self.programs.program(&mut self.backend, shader)?;
        let mut uniforms = self.matrix_uniforms(model);
        self.bind_fill_uniforms(shader, &mut uniforms, vertex_colors)?;
        uniforms.fill_missing(&shader.user_uniforms());
        let raster = self.raster_state();
        self.backend.draw(&DrawCall {
            target: self.target,
            program,
            uniforms: &uniforms,
            geometry,
            raster,
        });
        Ok(())
    }

    pub(super) fn submit_stroke(
        &mut self,
        model: &Mat4,
        geometry: DrawGeometry<'_>,
        line_colors: bool,
    ) -> Result<()> {
        let shader = resolve_stroke(
            &mut self.defaults,
            self.states.current().user_stroke_shader.as_ref(),
        );
        let program = self.programs.program(&mut self.backend, &shader)?;
        let density = self.target_surface().density;

        let mut uniforms = self.matrix_uniforms(model);
        let state = self.states.current();
        uniforms.set("material_color", self.draw_color(state.stroke));
        uniforms.set("use_line_color", line_colors);
        uniforms.set("stroke_weight", state.stroke_weight * density);
        uniforms.set("stroke_cap", state.stroke_cap.code());
        uniforms.set("stroke_join", state.stroke_join.code());
        uniforms.fill_missing(&shader.user_uniforms());

        let raster = self.raster_state();
        self.backend.draw(&DrawCall {
            target: self.target,
            program,
            uniforms: &uniforms,
            geometry,
            raster,
        });
        Ok(())
    }

    pub(super) fn submit_points(&mut self, model: &Mat4, vertices: &[PointVertex]) -> Result<()> {
        if vertices.is_empty() {
            return Ok(());
        }
        let shader = resolve_point(
            &mut self.defaults,
            self.states.current().user_point_shader.as_ref(),
        );
        let program = self.programs.program(&mut self.backend, &shader)?;
        let density = self.target_surface().density;

        let mut uniforms = self.matrix_uniforms(model);
        let state = self.states.current();
        uniforms.set("material_color", self.draw_color(state.stroke));
        uniforms.set("point_size", state.point_size * density);
        uniforms.fill_missing(&shader.user_uniforms());

        let raster = self.raster_state();
        self.backend.draw(&DrawCall {
            target: self.target,
            program,
            uniforms: &uniforms,
            geometry: DrawGeometry::Points { vertices },
            raster,
        });
        Ok(())
    }

    /// Draws the retained mesh under `key`, building it with `build` on first use. `local`
    /// places the unit-space mesh before the current model matrix.
    pub(super) fn draw_retained(
        &mut self,
        key: &ShapeKey,
        build: impl FnOnce() -> Mesh,
        local: &Mat4,
    ) -> Result<()> {
        let model = local.then(&self.states.current().model);
        if let Some((builder, _)) = self.building.as_mut() {
            let mut mesh = build();
            mesh.finish();
            builder.add_mesh(&mesh, &model, self.states.current().fill);
            return Ok(());
        }
        let cached = self.geometry.ensure(&mut self.backend, key, build);
        let (buffers, has_fill, has_stroke, vertex_colors) = (
            cached.buffers,
            cached.has_fill,
            cached.has_stroke,
            cached.has_vertex_colors,
        );
        self.draw_cached_parts(buffers, has_fill, has_stroke, vertex_colors, &model)
    }

    pub(super) fn draw_cached_parts(
        &mut self,
        mesh: crate::id::MeshId,
        has_fill: bool,
        has_stroke: bool,
        vertex_colors: bool,
        model: &Mat4,
    ) -> Result<()> {
        let (do_fill, do_stroke) = {
            let state = self.states.current();
            (state.do_fill, state.do_stroke)
        };
        if do_fill && has_fill {
            let shader = self.fill_shader(DrawMode::Retained);
            self.submit_fill(
                &shader,
                model,
                DrawGeometry::Mesh {
                    mesh,
                    part: MeshPart::Fill,
                },
                vertex_colors,
            )?;
        }
        if do_stroke && has_stroke {
            self.submit_stroke(
                model,
                DrawGeometry::Mesh {
                    mesh,
                    part: MeshPart::Stroke,
                },
                false,
            )?;
        }
        Ok(())
    }
}
