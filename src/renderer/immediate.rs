use super::*;
use crate::immediate::AttributeSlot;
use crate::shader::AttributeDecl;

fn read<const N: usize>(record: &[f32], offset: usize) -> [f32; N] {
    std::array::from_fn(|i| record[offset + i])
}

/// Interleaves the custom attributes a program declares, matched by name. Attributes the shape
/// never set read as zeros.
fn custom_values(
    triangles: &[f32],
    stride: usize,
    slots: &[AttributeSlot],
    declared: &[AttributeDecl],
) -> Vec<f32> {
    let mut values = Vec::new();
    for record in triangles.chunks_exact(stride) {
        for decl in declared {
            let components = decl.components as usize;
            match slots.iter().find(|slot| slot.name == decl.name) {
                Some(slot) => {
                    let available = slot.components.min(components);
                    values.extend_from_slice(&record[slot.offset..slot.offset + available]);
                    values.extend(std::iter::repeat(0.0).take(components - available));
                }
                None => values.extend(std::iter::repeat(0.0).take(components)),
            }
        }
    }
    values
}

/// Model-space mesh of a finished shape, for geometry building.
fn shape_mesh(shape: &ShapeData, triangles: &[f32]) -> Mesh {
    let mut mesh = Mesh::new(0, 0);
    let mut push = |record: &[f32]| {
        mesh.vertices.push(read(record, 0));
        mesh.uvs.push(read(record, UV));
        mesh.colors.push(read(record, FILL));
        if shape.explicit_normals {
            mesh.normals.push(read(record, NORMAL));
        }
    };
    for record in shape.records() {
        push(record);
    }
    let base = shape.records().count() as u32;
    for record in triangles.chunks_exact(shape.stride) {
        push(record);
    }
    let triangle_vertices = (mesh.vertices.len() as u32 - base) / 3;
    mesh.faces = (0..triangle_vertices)
        .map(|t| [base + t * 3, base + t * 3 + 1, base + t * 3 + 2])
        .collect();
    mesh.edges = shape.edges();
    mesh
}

impl<B: Backend> Renderer<B> {
    fn require_shape(&self, call: &'static str) -> Result<()> {
        if self.immediate.is_active() {
            Ok(())
        } else {
            Err(RenderError::NoShapeInProgress(call))
        }
    }

    fn vertex_inputs(&self, uv: [f32; 2]) -> VertexInputs {
        let state = self.states.current();
        VertexInputs {
            uv,
            fill: state.fill.0,
            stroke: state.stroke.0,
            normal: self.current_normal,
        }
    }

    /// A curve control point carrying the current colors and custom attributes.
    fn anchor(&self, position: [f32; 3]) -> CurvePoint {
        let state = self.states.current();
        CurvePoint {
            position,
            fill: state.fill.0,
            stroke: state.stroke.0,
            custom: self.immediate.current_custom().to_vec(),
        }
    }

    pub fn begin_shape(&mut self, mode: ShapeMode) -> Result<()> {
        if self.immediate.is_active() {
            return Err(RenderError::ShapeInProgress("begin_shape"));
        }
        self.immediate.begin(mode);
        self.current_normal = [0.0, 0.0, 1.0];
        Ok(())
    }

    pub fn vertex(&mut self, position: [f32; 3]) -> Result<()> {
        self.vertex_uv(position, [0.0, 0.0])
    }

    /// A vertex with texture coordinates in `[0, 1]`.
    pub fn vertex_uv(&mut self, position: [f32; 3], uv: [f32; 2]) -> Result<()> {
        self.require_shape("vertex")?;
        let inputs = self.vertex_inputs(uv);
        self.immediate.vertex(position, &inputs);
        Ok(())
    }

    /// Normal of subsequent vertices. Shapes with explicit normals skip face normals.
    pub fn normal(&mut self, normal: [f32; 3]) {
        self.current_normal = normal;
        if self.immediate.is_active() {
            self.immediate.mark_explicit_normal();
        }
    }

    /// Sets the value of a custom per-vertex attribute for subsequent vertices. The first call
    /// for a name fixes its number of components.
    pub fn vertex_property(&mut self, name: &str, values: &[f32]) -> Result<()> {
        self.require_shape("vertex_property")?;
        self.immediate.set_attribute(name, values);
        Ok(())
    }

    /// Cubic Bézier from the previous vertex to `end`.
    pub fn bezier_vertex(&mut self, c1: [f32; 3], c2: [f32; 3], end: [f32; 3]) -> Result<()> {
        self.require_shape("bezier_vertex")?;
        let start = self
            .immediate
            .last_point()
            .ok_or(RenderError::MissingAnchor {
                call: "bezier_vertex",
            })?;
        let end = self.anchor(end);
        let rows = self.bezier_table.rows(self.curve_detail);
        let samples = sample_bezier(rows, &start, c1, c2, &end);
        let inputs = self.vertex_inputs([0.0, 0.0]);
        for sample in samples.iter().skip(1) {
            self.immediate.curve_vertex(sample, &inputs);
        }
        Ok(())
    }

    /// Quadratic Bézier from the previous vertex to `end`.
    pub fn quadratic_vertex(&mut self, control: [f32; 3], end: [f32; 3]) -> Result<()> {
        self.require_shape("quadratic_vertex")?;
        let start = self
            .immediate
            .last_point()
            .ok_or(RenderError::MissingAnchor {
                call: "quadratic_vertex",
            })?;
        let end = self.anchor(end);
        let rows = self.quadratic_table.rows(self.curve_detail);
        let samples = sample_quadratic(rows, &start, control, &end);
        let inputs = self.vertex_inputs([0.0, 0.0]);
        for sample in samples.iter().skip(1) {
            self.immediate.curve_vertex(sample, &inputs);
        }
        Ok(())
    }

    /// Catmull-Rom point. Every four consecutive points draw the span between the middle two.
    pub fn curve_vertex(&mut self, position: [f32; 3]) -> Result<()> {
        self.require_shape("curve_vertex")?;
        let point = self.anchor(position);
        let Some((window, first)) = self.immediate.push_curve_point(point) else {
            return Ok(());
        };
        let rows = self.bezier_table.rows(self.curve_detail);
        let samples = sample_catmull(
            rows,
            [&window[0], &window[1], &window[2], &window[3]],
            self.curve_tightness,
        );
        let inputs = self.vertex_inputs([0.0, 0.0]);
        // Later spans start where the previous one ended.
        let skip = if first { 0 } else { 1 };
        for sample in samples.iter().skip(skip) {
            self.immediate.curve_vertex(sample, &inputs);
        }
        Ok(())
    }

    /// Starts a hole or a separate boundary of the current shape.
    pub fn begin_contour(&mut self) -> Result<()> {
        self.require_shape("begin_contour")?;
        self.immediate.begin_contour();
        Ok(())
    }

    pub fn end_contour(&mut self) -> Result<()> {
        self.require_shape("end_contour")?;
        self.immediate.begin_contour();
        Ok(())
    }

    /// Assembles the accumulated vertices according to the shape mode and draws them, or adds
    /// them to the geometry being built.
    pub fn end_shape(&mut self, end: EndShape) -> Result<()> {
        self.require_shape("end_shape")?;
        let shape = self.immediate.finish(end);
        if shape.contours.is_empty() {
            return Ok(());
        }
        let (model, do_fill, do_stroke) = {
            let state = self.states.current();
            (state.model, state.do_fill, state.do_stroke)
        };

        if self.building.is_some() {
            let triangles = self.shape_triangles(&shape);
            let mut mesh = shape_mesh(&shape, &triangles);
            mesh.finish();
            let fill = self.states.current().fill;
            if let Some((builder, _)) = self.building.as_mut() {
                builder.add_mesh(&mesh, &model, fill);
            }
            return Ok(());
        }

        if shape.mode == ShapeMode::Points {
            if do_stroke {
                let positions: Vec<[f32; 3]> = shape.records().map(|r| read(r, 0)).collect();
                self.submit_points(&model, &point_quads(&positions))?;
            }
            return Ok(());
        }
        if do_fill && shape.mode != ShapeMode::Lines {
            self.fill_shape(&shape, &model)?;
        }
        if do_stroke {
            self.stroke_shape(&shape, &model)?;
        }
        Ok(())
    }

    /// Flat triangle list of records for the filled part of `shape`.
    fn shape_triangles(&mut self, shape: &ShapeData) -> Vec<f32> {
        match shape.mode {
            ShapeMode::Points | ShapeMode::Lines => Vec::new(),
            ShapeMode::Tess => self.tessellator.triangulate(&shape.contours, shape.stride),
            _ => {
                let records: Vec<&[f32]> = shape.records().collect();
                shape
                    .triangle_indices()
                    .iter()
                    .flat_map(|&i| records[i as usize].iter().copied())
                    .collect()
            }
        }
    }

    fn fill_shape(&mut self, shape: &ShapeData, model: &Mat4) -> Result<()> {
        let stride = shape.stride;
        let mut triangles = self.shape_triangles(shape);
        if triangles.is_empty() {
            return Ok(());
        }
        if !shape.explicit_normals {
            assign_face_normals(&mut triangles, stride);
        }
        let vertices: Vec<FillVertex> = triangles
            .chunks_exact(stride)
            .map(|record| FillVertex {
                position: read(record, 0),
                normal: read(record, NORMAL),
                uv: read(record, UV),
                color: read(record, FILL),
            })
            .collect();

        let shader = self.fill_shader(DrawMode::Immediate);
        let declared = shader.attributes();
        let components: Vec<u32> = declared.iter().map(|decl| decl.components).collect();
        let values = if declared.is_empty() {
            Vec::new()
        } else {
            custom_values(&triangles, stride, &shape.attributes, declared)
        };
        let custom = (!declared.is_empty()).then_some(CustomData {
            components: &components,
            values: &values,
        });
        self.submit_fill(
            &shader,
            model,
            DrawGeometry::Fill {
                vertices: &vertices,
                custom,
            },
            true,
        )
    }

    fn stroke_shape(&mut self, shape: &ShapeData, model: &Mat4) -> Result<()> {
        let positions: Vec<[f32; 3]> = shape.records().map(|r| read(r, 0)).collect();
        let colors: Vec<[f32; 4]> = shape.records().map(|r| read(r, STROKE)).collect();
        let (vertices, indices) = stroke_segments(&positions, &colors, &shape.edges());
        if indices.is_empty() {
            return Ok(());
        }
        self.submit_stroke(
            model,
            DrawGeometry::Stroke {
                vertices: &vertices,
                indices: &indices,
            },
            true,
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::{RecordedGeometry, RecordingBackend};
    use crate::config::RendererConfig;
    use crate::error::RenderError;
    use crate::immediate::{EndShape, ShapeMode};
    use crate::renderer::Renderer;
    use crate::shader::{AttributeDecl, Shader, ShaderClass};

    fn renderer() -> Renderer<RecordingBackend> {
        Renderer::with_backend(
            RecordingBackend::new(100, 100),
            100,
            100,
            RendererConfig::default().with_curve_detail(4),
        )
    }

    fn fill_vertices(renderer: &Renderer<RecordingBackend>) -> Vec<crate::geometry::FillVertex> {
        renderer
            .backend()
            .draws()
            .find_map(|draw| match &draw.geometry {
                RecordedGeometry::Fill { vertices, .. } => Some(vertices.clone()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn anchorless_bezier_is_rejected() {
        let mut renderer = renderer();
        renderer.begin_shape(ShapeMode::Tess).unwrap();
        assert_eq!(
            renderer.bezier_vertex([0.0; 3], [1.0; 3], [2.0; 3]),
            Err(RenderError::MissingAnchor {
                call: "bezier_vertex"
            })
        );
        renderer.end_shape(EndShape::Open).unwrap();
    }

    #[test]
    fn shapes_do_not_nest() {
        let mut renderer = renderer();
        assert_eq!(
            renderer.vertex([0.0; 3]),
            Err(RenderError::NoShapeInProgress("vertex"))
        );
        renderer.begin_shape(ShapeMode::Triangles).unwrap();
        assert_eq!(
            renderer.begin_shape(ShapeMode::Triangles),
            Err(RenderError::ShapeInProgress("begin_shape"))
        );
    }

    #[test]
    fn bezier_colors_match_anchors() {
        let mut renderer = renderer();
        renderer.no_stroke();
        renderer.begin_shape(ShapeMode::Tess).unwrap();
        renderer.fill([1.0, 0.0, 0.0, 1.0]);
        renderer.vertex([0.0, 0.0, 0.0]).unwrap();
        renderer.fill([0.0, 0.0, 1.0, 1.0]);
        renderer
            .bezier_vertex([10.0, -10.0, 0.0], [20.0, -10.0, 0.0], [30.0, 0.0, 0.0])
            .unwrap();
        renderer.vertex([15.0, 20.0, 0.0]).unwrap();
        renderer.end_shape(EndShape::Close).unwrap();

        let vertices = fill_vertices(&renderer);
        let color_at = |position: [f32; 3]| {
            vertices
                .iter()
                .find(|v| v.position == position)
                .map(|v| v.color)
        };
        assert_eq!(color_at([0.0, 0.0, 0.0]), Some([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(color_at([30.0, 0.0, 0.0]), Some([0.0, 0.0, 1.0, 1.0]));
    }

    #[test]
    fn quads_fill_two_triangles_each() {
        let mut renderer = renderer();
        renderer.begin_shape(ShapeMode::Quads).unwrap();
        for position in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]] {
            renderer.vertex(position).unwrap();
        }
        renderer.end_shape(EndShape::Open).unwrap();
        assert_eq!(fill_vertices(&renderer).len(), 6);

        let stroke = renderer
            .backend()
            .draws()
            .find_map(|draw| match &draw.geometry {
                RecordedGeometry::Stroke { indices, .. } => Some(indices.len()),
                _ => None,
            })
            .unwrap();
        assert_eq!(stroke, 4 * 6);
    }

    #[test]
    fn curve_vertices_pass_through_inner_points() {
        let mut renderer = renderer();
        renderer.no_fill();
        renderer.begin_shape(ShapeMode::Tess).unwrap();
        for position in [
            [0.0, 0.0, 0.0],
            [10.0, 0.0, 0.0],
            [20.0, 10.0, 0.0],
            [30.0, 10.0, 0.0],
            [40.0, 0.0, 0.0],
        ] {
            renderer.curve_vertex(position).unwrap();
        }
        renderer.end_shape(EndShape::Open).unwrap();

        let vertices = renderer
            .backend()
            .draws()
            .find_map(|draw| match &draw.geometry {
                RecordedGeometry::Stroke { vertices, .. } => Some(vertices.clone()),
                _ => None,
            })
            .unwrap();
        // Two spans of four segments each.
        assert_eq!(vertices.len(), 8 * 4);
        assert_eq!(vertices[0].position, [10.0, 0.0, 0.0]);
        assert_eq!(vertices.last().unwrap().position, [30.0, 10.0, 0.0]);
    }

    #[test]
    fn custom_attributes_reach_declaring_programs() {
        let mut renderer = renderer();
        let shader = Shader::from_wgsl_with_attributes(
            ShaderClass::Color,
            "wobble",
            "struct Uniforms { material_color: vec4<f32>, };\nfn vs_main() {}\nfn fs_main() {}",
            vec![AttributeDecl {
                name: "wobble".into(),
                components: 2,
            }],
        )
        .unwrap();
        renderer.shader(&shader);
        renderer.no_stroke();
        renderer.begin_shape(ShapeMode::Triangles).unwrap();
        renderer.vertex_property("wobble", &[1.0, 2.0]).unwrap();
        renderer.vertex([0.0, 0.0, 0.0]).unwrap();
        renderer.vertex([1.0, 0.0, 0.0]).unwrap();
        renderer.vertex_property("wobble", &[3.0, 4.0]).unwrap();
        renderer.vertex([0.0, 1.0, 0.0]).unwrap();
        renderer.end_shape(EndShape::Open).unwrap();

        let custom = renderer
            .backend()
            .draws()
            .find_map(|draw| match &draw.geometry {
                RecordedGeometry::Fill { custom, .. } => custom.clone(),
                _ => None,
            })
            .unwrap();
        assert_eq!(custom, vec![1.0, 2.0, 1.0, 2.0, 3.0, 4.0]);
    }

    fn weighted_renderer() -> Renderer<RecordingBackend> {
        let mut renderer = renderer();
        let shader = Shader::from_wgsl_with_attributes(
            ShaderClass::Color,
            "weighted",
            "struct Uniforms { material_color: vec4<f32>, };\nfn vs_main() {}\nfn fs_main() {}",
            vec![AttributeDecl::new("weight", 1)],
        )
        .unwrap();
        renderer.shader(&shader);
        renderer.no_stroke();
        renderer
    }

    /// Custom value of the first filled vertex within 1e-3 of `position`.
    fn weight_at(renderer: &Renderer<RecordingBackend>, position: [f32; 2]) -> Option<f32> {
        renderer.backend().draws().find_map(|draw| match &draw.geometry {
            RecordedGeometry::Fill {
                vertices,
                custom: Some(custom),
            } => vertices
                .iter()
                .position(|v| {
                    (v.position[0] - position[0]).abs() < 1e-3
                        && (v.position[1] - position[1]).abs() < 1e-3
                })
                .map(|index| custom[index]),
            _ => None,
        })
    }

    #[test]
    fn quadratic_vertex_interpolates_custom_attributes() {
        let mut renderer = weighted_renderer();
        renderer.begin_shape(ShapeMode::Tess).unwrap();
        renderer.vertex_property("weight", &[0.0]).unwrap();
        renderer.vertex([0.0, 0.0, 0.0]).unwrap();
        renderer.vertex_property("weight", &[4.0]).unwrap();
        renderer
            .quadratic_vertex([5.0, 10.0, 0.0], [10.0, 0.0, 0.0])
            .unwrap();
        renderer.vertex([5.0, -10.0, 0.0]).unwrap();
        renderer.end_shape(EndShape::Close).unwrap();

        assert_eq!(weight_at(&renderer, [0.0, 0.0]), Some(0.0));
        assert_eq!(weight_at(&renderer, [10.0, 0.0]), Some(4.0));
        // Symmetric control: the curve midpoint carries the midpoint value.
        let middle = weight_at(&renderer, [5.0, 5.0]).unwrap();
        assert!((middle - 2.0).abs() < 1e-5);
    }

    #[test]
    fn curve_vertex_interpolates_custom_attributes_with_tightness() {
        let mut renderer = weighted_renderer();
        renderer.curve_tightness(1.0);
        // Five span samples plus one vertex make two triangles, kept as drawn.
        renderer.begin_shape(ShapeMode::Triangles).unwrap();
        for (position, weight) in [
            ([0.0, 40.0, 0.0], 9.0),
            ([0.0, 0.0, 0.0], 1.0),
            ([20.0, 0.0, 0.0], 3.0),
            ([20.0, 40.0, 0.0], -5.0),
        ] {
            renderer.vertex_property("weight", &[weight]).unwrap();
            renderer.curve_vertex(position).unwrap();
        }
        renderer.vertex_property("weight", &[0.0]).unwrap();
        renderer.vertex([10.0, -20.0, 0.0]).unwrap();
        renderer.end_shape(EndShape::Open).unwrap();

        // Full tightness draws the middle span as a straight line with linear attributes.
        assert_eq!(weight_at(&renderer, [0.0, 0.0]), Some(1.0));
        assert_eq!(weight_at(&renderer, [20.0, 0.0]), Some(3.0));
        let middle = weight_at(&renderer, [10.0, 0.0]).unwrap();
        assert!((middle - 2.0).abs() < 1e-5);
    }

    #[test]
    fn self_intersections_blend_custom_attributes() {
        let mut renderer = weighted_renderer();
        renderer.begin_shape(ShapeMode::Tess).unwrap();
        for (position, weight) in [
            ([0.0, 0.0, 0.0], 0.0),
            ([10.0, 10.0, 0.0], 4.0),
            ([10.0, 0.0, 0.0], 0.0),
            ([0.0, 10.0, 0.0], 4.0),
        ] {
            renderer.vertex_property("weight", &[weight]).unwrap();
            renderer.vertex(position).unwrap();
        }
        renderer.end_shape(EndShape::Close).unwrap();

        // Both crossing edges are halfway between 0 and 4 at the crossing point.
        let crossing = weight_at(&renderer, [5.0, 5.0]).unwrap();
        assert!((crossing - 2.0).abs() < 1e-4);
    }
}
