use super::*;

fn placement(x: f32, y: f32, width: f32, height: f32) -> Mat4 {
    Mat4::identity()
        .pre_translate(Vec3::new(x, y, 0.0))
        .pre_scale(width, height, 1.0)
}

impl<B: Backend> Renderer<B> {
    /// Axis-aligned rectangle with its top-left corner at `(x, y)`.
    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) -> Result<()> {
        self.rect_with_detail(x, y, width, height, 1, 1)
    }

    /// Rectangle subdivided into a `detail_x` x `detail_y` grid, for per-vertex lighting or
    /// vertex displacement.
    pub fn rect_with_detail(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        detail_x: u32,
        detail_y: u32,
    ) -> Result<()> {
        let (detail_x, detail_y) = (detail_x.max(1), detail_y.max(1));
        let key = ShapeKey::new("rect").with(detail_x).with(detail_y);
        self.draw_retained(
            &key,
            || shapes::rect(detail_x, detail_y),
            &placement(x, y, width, height),
        )
    }

    /// Rectangle with corners rounded by `radius`, clamped to half the shorter side.
    pub fn rounded_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
    ) -> Result<()> {
        let radius = radius.min(width.abs() / 2.0).min(height.abs() / 2.0);
        if radius <= 0.0 {
            return self.rect(x, y, width, height);
        }
        let (right, bottom) = (x + width, y + height);
        self.begin_shape(ShapeMode::Tess)?;
        self.vertex([x + radius, y, 0.0])?;
        self.vertex([right - radius, y, 0.0])?;
        self.quadratic_vertex([right, y, 0.0], [right, y + radius, 0.0])?;
        self.vertex([right, bottom - radius, 0.0])?;
        self.quadratic_vertex([right, bottom, 0.0], [right - radius, bottom, 0.0])?;
        self.vertex([x + radius, bottom, 0.0])?;
        self.quadratic_vertex([x, bottom, 0.0], [x, bottom - radius, 0.0])?;
        self.vertex([x, y + radius, 0.0])?;
        self.quadratic_vertex([x, y, 0.0], [x + radius, y, 0.0])?;
        self.end_shape(EndShape::Close)
    }

    /// Ellipse centered on `(x, y)`.
    pub fn ellipse(&mut self, x: f32, y: f32, width: f32, height: f32) -> Result<()> {
        self.ellipse_with_detail(x, y, width, height, DEFAULT_ELLIPSE_DETAIL)
    }

    pub fn ellipse_with_detail(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        detail: u32,
    ) -> Result<()> {
        let detail = detail.max(3);
        let key = ShapeKey::new("ellipse").with(detail);
        self.draw_retained(
            &key,
            || shapes::ellipse(detail),
            &placement(x - width / 2.0, y - height / 2.0, width, height),
        )
    }

    /// Arc of the ellipse centered on `(x, y)`, between `start` and `stop` radians.
    pub fn arc(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        start: f32,
        stop: f32,
        mode: ArcMode,
    ) -> Result<()> {
        self.arc_with_detail(x, y, width, height, start, stop, mode, DEFAULT_ELLIPSE_DETAIL)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn arc_with_detail(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        start: f32,
        stop: f32,
        mode: ArcMode,
        detail: u32,
    ) -> Result<()> {
        let detail = detail.max(1);
        if detail > ARC_STROKE_DETAIL_LIMIT && self.states.current().do_stroke {
            warn!(
                detail,
                limit = ARC_STROKE_DETAIL_LIMIT,
                "arc stroke is not drawn above the detail limit"
            );
        }
        let key = ShapeKey::new("arc")
            .with(start)
            .with(stop)
            .with(mode.key_name())
            .with(detail);
        self.draw_retained(
            &key,
            || shapes::arc(start, stop, mode, detail),
            &placement(x - width / 2.0, y - height / 2.0, width, height),
        )
    }

    pub fn triangle(&mut self, p1: [f32; 2], p2: [f32; 2], p3: [f32; 2]) -> Result<()> {
        // Maps the unit triangle's corners onto p1, p2 and p3.
        let local = Mat4::new(
            p2[0] - p1[0], p2[1] - p1[1], 0.0, 0.0, //
            p3[0] - p1[0], p3[1] - p1[1], 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            p1[0], p1[1], 0.0, 1.0,
        );
        self.draw_retained(&ShapeKey::new("tri"), shapes::triangle, &local)
    }

    /// Quadrilateral through four corners in drawing order.
    pub fn quad(
        &mut self,
        p1: [f32; 3],
        p2: [f32; 3],
        p3: [f32; 3],
        p4: [f32; 3],
    ) -> Result<()> {
        let key = [p1, p2, p3, p4]
            .iter()
            .flatten()
            .fold(ShapeKey::new("quad"), |key, coordinate| key.with(coordinate))
            .with(1)
            .with(1);
        self.draw_retained(
            &key,
            || shapes::quad([p1, p2, p3, p4], 1, 1),
            &Mat4::identity(),
        )
    }

    /// A point sprite sized by `stroke_weight`, drawn in the stroke color.
    pub fn point(&mut self, position: [f32; 3]) -> Result<()> {
        if !self.states.current().do_stroke || self.building.is_some() {
            return Ok(());
        }
        let model = self.states.current().model;
        self.submit_points(&model, &point_quads(&[position]))
    }

    pub fn line(&mut self, from: [f32; 3], to: [f32; 3]) -> Result<()> {
        if let Some((builder, _)) = self.building.as_mut() {
            let mut mesh = Mesh::new(0, 0);
            mesh.vertices = vec![from, to];
            mesh.edges = vec![[0, 1]];
            mesh.finish();
            let state = self.states.current();
            builder.add_mesh(&mesh, &state.model, state.fill);
            return Ok(());
        }
        if !self.states.current().do_stroke {
            return Ok(());
        }
        let (vertices, indices) = stroke_segments(&[from, to], &[], &[[0, 1]]);
        let model = self.states.current().model;
        self.submit_stroke(
            &model,
            DrawGeometry::Stroke {
                vertices: &vertices,
                indices: &indices,
            },
            false,
        )
    }

    /// Cubic Bézier from `p1` to `p2` with control points `c1` and `c2`.
    pub fn bezier(&mut self, p1: [f32; 3], c1: [f32; 3], c2: [f32; 3], p2: [f32; 3]) -> Result<()> {
        self.begin_shape(ShapeMode::Tess)?;
        self.vertex(p1)?;
        self.bezier_vertex(c1, c2, p2)?;
        self.end_shape(EndShape::Open)
    }

    /// Catmull-Rom span from `p1` to `p2`, shaped by the neighbours `p0` and `p3`.
    pub fn curve(&mut self, p0: [f32; 3], p1: [f32; 3], p2: [f32; 3], p3: [f32; 3]) -> Result<()> {
        self.begin_shape(ShapeMode::Tess)?;
        for point in [p0, p1, p2, p3] {
            self.curve_vertex(point)?;
        }
        self.end_shape(EndShape::Open)
    }

    /// Draws `image` stretched over the rectangle at `(x, y)`.
    pub fn image(&mut self, image: &Image, x: f32, y: f32, width: f32, height: f32) -> Result<()> {
        let texture = self.texture_for(image);
        self.image_texture(texture, x, y, width, height)
    }

    /// Draws an existing texture, such as a framebuffer's, over the rectangle at `(x, y)`.
    pub fn image_texture(
        &mut self,
        texture: TextureId,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<()> {
        self.push();
        self.texture_from(texture);
        self.no_stroke();
        {
            let state = self.states.current_mut();
            state.enable_lighting = false;
            state.image_light = None;
        }
        let drawn = self.rect(x, y, width, height);
        self.pop()?;
        drawn
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::{RecordedGeometry, RecordingBackend};
    use crate::config::RendererConfig;
    use crate::geometry::primitives::ArcMode;
    use crate::geometry::ShapeKey;
    use crate::math::{transform_point, Mat4};
    use crate::renderer::Renderer;

    fn renderer() -> Renderer<RecordingBackend> {
        Renderer::with_backend(
            RecordingBackend::new(100, 100),
            100,
            100,
            RendererConfig::default(),
        )
    }

    fn model_of(renderer: &Renderer<RecordingBackend>, index: usize) -> Mat4 {
        let draw = renderer.backend().draws().nth(index).unwrap();
        match draw.uniforms.get("model_matrix") {
            Some(crate::shader::UniformValue::Mat4(columns)) => Mat4::from_array(*columns),
            other => panic!("unexpected model matrix {other:?}"),
        }
    }

    #[test]
    fn rect_places_unit_square() {
        let mut renderer = renderer();
        renderer.no_stroke();
        renderer.rect(10.0, 20.0, 30.0, 40.0).unwrap();
        let model = model_of(&renderer, 0);
        assert_eq!(transform_point(&model, [0.0, 0.0, 0.0]), [10.0, 20.0, 0.0]);
        assert_eq!(transform_point(&model, [1.0, 1.0, 0.0]), [40.0, 60.0, 0.0]);
        assert!(renderer
            .geometry_cache()
            .contains(&ShapeKey::new("rect").with(1).with(1)));
    }

    #[test]
    fn triangle_maps_unit_corners() {
        let mut renderer = renderer();
        renderer.no_stroke();
        renderer
            .triangle([1.0, 2.0], [11.0, 2.0], [1.0, 7.0])
            .unwrap();
        let model = model_of(&renderer, 0);
        assert_eq!(transform_point(&model, [0.0, 0.0, 0.0]), [1.0, 2.0, 0.0]);
        assert_eq!(transform_point(&model, [1.0, 0.0, 0.0]), [11.0, 2.0, 0.0]);
        assert_eq!(transform_point(&model, [0.0, 1.0, 0.0]), [1.0, 7.0, 0.0]);
    }

    #[test]
    fn detailed_arc_draws_fill_only() {
        let mut renderer = renderer();
        renderer
            .arc_with_detail(0.0, 0.0, 10.0, 10.0, 0.0, 1.0, ArcMode::Pie, 80)
            .unwrap();
        let parts: Vec<_> = renderer
            .backend()
            .draws()
            .map(|draw| draw.geometry.clone())
            .collect();
        assert_eq!(parts.len(), 1);
        assert!(matches!(
            parts[0],
            RecordedGeometry::Mesh {
                part: crate::backend::MeshPart::Fill,
                ..
            }
        ));
    }

    #[test]
    fn points_need_stroke() {
        let mut renderer = renderer();
        renderer.no_stroke();
        renderer.point([0.0, 0.0, 0.0]).unwrap();
        assert_eq!(renderer.backend().draws().count(), 0);

        renderer.stroke([0.0, 0.0, 0.0, 1.0]);
        renderer.stroke_weight(4.0);
        renderer.point([0.0, 0.0, 0.0]).unwrap();
        let draw = renderer.backend().draws().next().unwrap();
        assert_eq!(
            draw.uniforms.get("point_size"),
            Some(&crate::shader::UniformValue::Float(4.0))
        );
    }

    #[test]
    fn rounded_rect_without_radius_is_a_rect() {
        let mut renderer = renderer();
        renderer.rounded_rect(0.0, 0.0, 10.0, 10.0, 0.0).unwrap();
        assert_eq!(renderer.geometry_cache().len(), 1);

        renderer.rounded_rect(0.0, 0.0, 10.0, 10.0, 3.0).unwrap();
        assert_eq!(renderer.geometry_cache().len(), 1);
        assert!(renderer
            .backend()
            .draws()
            .any(|draw| matches!(draw.geometry, RecordedGeometry::Fill { .. })));
    }

    #[test]
    fn image_leaves_state_untouched() {
        let mut renderer = renderer();
        let image = crate::image::Image::solid(4, 4, [255, 0, 0, 255]);
        renderer.image(&image, 0.0, 0.0, 4.0, 4.0).unwrap();
        renderer.image(&image, 5.0, 0.0, 4.0, 4.0).unwrap();
        let uploads = renderer
            .backend()
            .commands()
            .iter()
            .filter(|command| matches!(command, crate::backend::Command::CreateTexture { .. }))
            .count();
        assert_eq!(uploads, 1);
        assert!(renderer.state().texture.is_none());
        assert!(renderer.state().do_stroke);
        assert_eq!(renderer.stack_depth(), 0);
    }
}
