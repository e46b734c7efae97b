use super::*;

impl<B: Backend> Renderer<B> {
    /// Builds and uploads the mesh under `key` unless it is already cached.
    pub fn ensure_shape(&mut self, key: &ShapeKey, build: impl FnOnce() -> Mesh) {
        self.geometry.ensure(&mut self.backend, key, build);
    }

    /// Draws a previously cached mesh with the current model matrix.
    pub fn draw_shape(&mut self, key: &ShapeKey) -> Result<()> {
        let Some(cached) = self.geometry.get(key) else {
            return Err(RenderError::UnknownShape(key.to_string()));
        };
        if let Some((builder, _)) = self.building.as_mut() {
            let state = self.states.current();
            builder.add_mesh(&cached.mesh, &state.model, state.fill);
            return Ok(());
        }
        let (buffers, has_fill, has_stroke, vertex_colors) = (
            cached.buffers,
            cached.has_fill,
            cached.has_stroke,
            cached.has_vertex_colors,
        );
        let model = self.states.current().model;
        self.draw_cached_parts(buffers, has_fill, has_stroke, vertex_colors, &model)
    }

    /// Starts capturing drawn shapes into one [`Geometry`].
    ///
    /// Shapes are recorded in the geometry's own space: the model matrix starts at identity
    /// and only fill colors set after this call are stored as vertex colors.
    pub fn begin_geometry(&mut self) -> Result<()> {
        if self.building.is_some() {
            return Err(RenderError::GeometryAlreadyStarted);
        }
        let state = self.states.current_mut();
        let builder = GeometryBuilder::new(state.fill);
        let saved_model = state.model;
        state.model = Mat4::identity();
        state.fill = Color::UNSET;
        self.building = Some((builder, saved_model));
        Ok(())
    }

    pub fn end_geometry(&mut self) -> Result<Geometry> {
        let Some((builder, saved_model)) = self.building.take() else {
            return Err(RenderError::GeometryNotStarted);
        };
        let (geometry, saved_fill) = builder.finish();
        let state = self.states.current_mut();
        state.model = saved_model;
        state.fill = saved_fill;
        debug!(
            key = %geometry.key(),
            vertices = geometry.mesh().vertices.len(),
            "Finished geometry"
        );
        Ok(geometry)
    }

    /// Runs `draw` between `begin_geometry()` and `end_geometry()`.
    pub fn build_geometry(
        &mut self,
        draw: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<Geometry> {
        self.begin_geometry()?;
        let drawn = draw(self);
        let geometry = self.end_geometry()?;
        drawn.map(|()| geometry)
    }

    /// Draws a built geometry; it is uploaded the first time.
    pub fn model(&mut self, geometry: &Geometry) -> Result<()> {
        self.draw_retained(geometry.key(), || geometry.mesh().clone(), &Mat4::identity())
    }

    /// Releases the GPU buffers of `geometry`. Drawing it again uploads it anew.
    pub fn free_geometry(&mut self, geometry: &Geometry) {
        self.geometry.remove(&mut self.backend, geometry.key());
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::{RecordedGeometry, RecordingBackend};
    use crate::config::RendererConfig;
    use crate::error::RenderError;
    use crate::geometry::{primitives, ShapeKey};
    use crate::renderer::Renderer;

    fn renderer() -> Renderer<RecordingBackend> {
        Renderer::with_backend(
            RecordingBackend::new(100, 100),
            100,
            100,
            RendererConfig::default(),
        )
    }

    #[test]
    fn built_geometry_uploads_once() {
        let mut renderer = renderer();
        let geometry = renderer
            .build_geometry(|r| {
                r.fill([1.0, 0.0, 0.0, 1.0]);
                r.rect(0.0, 0.0, 10.0, 10.0)?;
                r.translate(20.0, 0.0, 0.0);
                r.rect(0.0, 0.0, 10.0, 10.0)
            })
            .unwrap();
        assert_eq!(geometry.mesh().vertices.len(), 8);
        assert!(geometry.mesh().has_vertex_colors());

        renderer.model(&geometry).unwrap();
        renderer.model(&geometry).unwrap();
        assert_eq!(renderer.backend().uploaded_meshes(), 1);
        assert!(renderer.backend().draws().count() >= 2);
    }

    #[test]
    fn building_restores_model_and_fill() {
        let mut renderer = renderer();
        renderer.translate(5.0, 0.0, 0.0);
        renderer.fill([0.0, 1.0, 0.0, 1.0]);
        let before = renderer.state().clone();
        renderer.build_geometry(|r| r.ellipse(0.0, 0.0, 4.0, 4.0)).unwrap();
        assert_eq!(renderer.state().model, before.model);
        assert_eq!(renderer.state().fill, before.fill);
        assert_eq!(renderer.backend().draws().count(), 0);
    }

    #[test]
    fn nested_begin_fails() {
        let mut renderer = renderer();
        renderer.begin_geometry().unwrap();
        assert_eq!(
            renderer.begin_geometry(),
            Err(RenderError::GeometryAlreadyStarted)
        );
        renderer.end_geometry().unwrap();
        assert_eq!(
            renderer.end_geometry().map(|_| ()),
            Err(RenderError::GeometryNotStarted)
        );
    }

    #[test]
    fn unknown_shape_is_an_error() {
        let mut renderer = renderer();
        let key = ShapeKey::new("missing");
        assert_eq!(
            renderer.draw_shape(&key),
            Err(RenderError::UnknownShape("missing".into()))
        );

        renderer.ensure_shape(&key, || primitives::rect(1, 1));
        renderer.draw_shape(&key).unwrap();
        assert!(renderer
            .backend()
            .draws()
            .any(|draw| matches!(draw.geometry, RecordedGeometry::Mesh { .. })));
    }

    #[test]
    fn freed_geometry_releases_buffers() {
        let mut renderer = renderer();
        let geometry = renderer
            .build_geometry(|r| r.rect(0.0, 0.0, 1.0, 1.0))
            .unwrap();
        renderer.model(&geometry).unwrap();
        assert_eq!(renderer.backend().live_meshes(), 1);
        renderer.free_geometry(&geometry);
        assert_eq!(renderer.backend().live_meshes(), 0);
    }
}
