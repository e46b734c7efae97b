//! Per-shape vertex accumulation for `begin_shape` / `end_shape`.
//!
//! Every vertex is stored as one flat record so contours can go straight into the polygon
//! tessellator, whose synthesized vertices then carry every attribute:
//!
//! | offset | values |
//! |---|---|
//! | 0 | position xyz |
//! | 3 | uv |
//! | 5 | fill rgba |
//! | 9 | stroke rgba |
//! | 13 | normal xyz |
//! | 16 | custom attributes, declaration order |

use crate::curve::CurvePoint;
use crate::geometry::face_normal;

pub const POSITION: usize = 0;
pub const UV: usize = 3;
pub const FILL: usize = 5;
pub const STROKE: usize = 9;
pub const NORMAL: usize = 13;
pub const BASE_STRIDE: usize = 16;

/// How `end_shape` assembles the accumulated vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeMode {
    Points,
    Lines,
    Triangles,
    TriangleFan,
    TriangleStrip,
    Quads,
    QuadStrip,
    /// Arbitrary polygon with optional holes, triangulated by the polygon tessellator.
    #[default]
    Tess,
}

/// Whether `end_shape` joins the last vertex back to the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndShape {
    #[default]
    Open,
    Close,
}

/// A custom per-vertex attribute and its component count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSlot {
    pub name: String,
    pub components: usize,
    pub offset: usize,
}

/// Attribute values current when a vertex is added.
#[derive(Debug, Clone, Copy)]
pub struct VertexInputs {
    pub uv: [f32; 2],
    pub fill: [f32; 4],
    pub stroke: [f32; 4],
    pub normal: [f32; 3],
}

/// The accumulator itself. Lives for the whole context and is reset by `begin`.
#[derive(Debug, Default)]
pub struct ImmediateBuffer {
    mode: ShapeMode,
    active: bool,
    contours: Vec<Vec<f32>>,
    attributes: Vec<AttributeSlot>,
    custom: Vec<f32>,
    explicit_normals: bool,
    /// Catmull-Rom points awaiting a full window of four.
    curve_window: Vec<CurvePoint>,
    curve_spans: usize,
}

/// What `end_shape` hands to the renderer.
#[derive(Debug, Clone)]
pub struct ShapeData {
    pub mode: ShapeMode,
    pub close: bool,
    pub contours: Vec<Vec<f32>>,
    pub stride: usize,
    pub attributes: Vec<AttributeSlot>,
    pub explicit_normals: bool,
}

impl ImmediateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn mode(&self) -> ShapeMode {
        self.mode
    }

    pub fn stride(&self) -> usize {
        BASE_STRIDE + self.custom.len()
    }

    pub fn begin(&mut self, mode: ShapeMode) {
        self.mode = mode;
        self.active = true;
        self.contours.clear();
        self.contours.push(Vec::new());
        self.attributes.clear();
        self.custom.clear();
        self.explicit_normals = false;
        self.curve_window.clear();
        self.curve_spans = 0;
    }

    /// Starts a new boundary (a hole, or a separate piece) of the current polygon.
    pub fn begin_contour(&mut self) {
        self.curve_window.clear();
        self.curve_spans = 0;
        if self.contours.last().is_some_and(|c| !c.is_empty()) {
            self.contours.push(Vec::new());
        }
    }

    pub fn mark_explicit_normal(&mut self) {
        self.explicit_normals = true;
    }

    /// Sets the current value of a custom attribute, declaring it on first use.
    ///
    /// Vertices added before the declaration get zeros. Later values of a different length are
    /// truncated or zero-padded to the declared arity.
    pub fn set_attribute(&mut self, name: &str, values: &[f32]) {
        let slot = match self.attributes.iter().position(|slot| slot.name == name) {
            Some(index) => self.attributes[index].clone(),
            None => {
                let slot = AttributeSlot {
                    name: name.to_owned(),
                    components: values.len(),
                    offset: BASE_STRIDE + self.custom.len(),
                };
                let old_stride = self.stride();
                self.custom.extend(std::iter::repeat(0.0).take(values.len()));
                let new_stride = self.stride();
                for contour in &mut self.contours {
                    *contour = contour
                        .chunks_exact(old_stride)
                        .flat_map(|record| {
                            record
                                .iter()
                                .copied()
                                .chain(std::iter::repeat(0.0).take(new_stride - old_stride))
                        })
                        .collect();
                }
                for point in &mut self.curve_window {
                    point.custom.extend(std::iter::repeat(0.0).take(values.len()));
                }
                self.attributes.push(slot.clone());
                slot
            }
        };
        if values.len() != slot.components {
            tracing::warn!(
                name,
                expected = slot.components,
                got = values.len(),
                "custom attribute arity changed; adjusting to the declared size"
            );
        }
        let start = slot.offset - BASE_STRIDE;
        for i in 0..slot.components {
            self.custom[start + i] = values.get(i).copied().unwrap_or(0.0);
        }
    }

    pub fn current_custom(&self) -> &[f32] {
        &self.custom
    }

    pub fn vertex(&mut self, position: [f32; 3], inputs: &VertexInputs) {
        let mut record = Vec::with_capacity(self.stride());
        record.extend_from_slice(&position);
        record.extend_from_slice(&inputs.uv);
        record.extend_from_slice(&inputs.fill);
        record.extend_from_slice(&inputs.stroke);
        record.extend_from_slice(&inputs.normal);
        record.extend_from_slice(&self.custom);
        self.push_record(record);
    }

    /// Adds a curve sample; uv and normal come from `inputs`, everything else from `point`.
    pub fn curve_vertex(&mut self, point: &CurvePoint, inputs: &VertexInputs) {
        let mut record = Vec::with_capacity(self.stride());
        record.extend_from_slice(&point.position);
        record.extend_from_slice(&inputs.uv);
        record.extend_from_slice(&point.fill);
        record.extend_from_slice(&point.stroke);
        record.extend_from_slice(&inputs.normal);
        record.extend_from_slice(&point.custom);
        record.resize(self.stride(), 0.0);
        self.push_record(record);
    }

    fn push_record(&mut self, record: Vec<f32>) {
        match self.contours.last_mut() {
            Some(contour) => contour.extend_from_slice(&record),
            None => self.contours.push(record),
        }
    }

    /// The last vertex added to the current contour, as a curve anchor.
    pub fn last_point(&self) -> Option<CurvePoint> {
        let stride = self.stride();
        let contour = self.contours.last()?;
        let record = contour.chunks_exact(stride).last()?;
        Some(record_point(record))
    }

    /// Adds a Catmull-Rom point and returns the four-point window once one is available, along
    /// with whether it is the first span of the run.
    pub fn push_curve_point(&mut self, point: CurvePoint) -> Option<([CurvePoint; 4], bool)> {
        self.curve_window.push(point);
        if self.curve_window.len() < 4 {
            return None;
        }
        let window: [CurvePoint; 4] = std::array::from_fn(|i| self.curve_window[i].clone());
        self.curve_window.remove(0);
        self.curve_spans += 1;
        Some((window, self.curve_spans == 1))
    }

    pub fn vertex_count(&self) -> usize {
        let stride = self.stride();
        self.contours.iter().map(|c| c.len() / stride).sum()
    }

    /// Ends the shape and hands over its data; the buffer becomes inactive.
    pub fn finish(&mut self, end: EndShape) -> ShapeData {
        self.active = false;
        self.curve_window.clear();
        let mut contours = std::mem::take(&mut self.contours);
        contours.retain(|contour| !contour.is_empty());
        ShapeData {
            mode: self.mode,
            close: end == EndShape::Close,
            contours,
            stride: self.stride(),
            attributes: self.attributes.clone(),
            explicit_normals: self.explicit_normals,
        }
    }
}

/// Reads the curve-relevant part of a record.
pub fn record_point(record: &[f32]) -> CurvePoint {
    let mut fill = [0.0; 4];
    fill.copy_from_slice(&record[FILL..FILL + 4]);
    let mut stroke = [0.0; 4];
    stroke.copy_from_slice(&record[STROKE..STROKE + 4]);
    CurvePoint {
        position: [record[POSITION], record[POSITION + 1], record[POSITION + 2]],
        fill,
        stroke,
        custom: record[BASE_STRIDE..].to_vec(),
    }
}

impl ShapeData {
    /// Every record of every contour, in order.
    pub fn records(&self) -> impl Iterator<Item = &[f32]> {
        self.contours
            .iter()
            .flat_map(move |contour| contour.chunks_exact(self.stride))
    }

    /// Vertex indices of the filled triangles for every mode except `Tess` and `Points`.
    pub fn triangle_indices(&self) -> Vec<u32> {
        let n = self.records().count() as u32;
        let mut indices = Vec::new();
        match self.mode {
            ShapeMode::Triangles => {
                indices.extend(0..n - n % 3);
            }
            ShapeMode::TriangleFan => {
                for i in 1..n.saturating_sub(1) {
                    indices.extend_from_slice(&[0, i, i + 1]);
                }
            }
            ShapeMode::TriangleStrip => {
                for i in 0..n.saturating_sub(2) {
                    if i % 2 == 0 {
                        indices.extend_from_slice(&[i, i + 1, i + 2]);
                    } else {
                        indices.extend_from_slice(&[i + 1, i, i + 2]);
                    }
                }
            }
            ShapeMode::Quads => {
                for q in (0..n - n % 4).step_by(4) {
                    indices.extend_from_slice(&[q, q + 1, q + 2, q, q + 2, q + 3]);
                }
            }
            ShapeMode::QuadStrip => {
                let mut i = 0;
                while i + 3 < n {
                    indices.extend_from_slice(&[i, i + 1, i + 3, i, i + 3, i + 2]);
                    i += 2;
                }
            }
            ShapeMode::Points | ShapeMode::Lines | ShapeMode::Tess => {}
        }
        indices
    }

    /// Outline edges, as vertex index pairs, for the shape's mode.
    pub fn edges(&self) -> Vec<[u32; 2]> {
        let n = self.records().count() as u32;
        let mut edges = Vec::new();
        match self.mode {
            ShapeMode::Points => {}
            ShapeMode::Lines => {
                for i in (0..n - n % 2).step_by(2) {
                    edges.push([i, i + 1]);
                }
            }
            ShapeMode::Triangles => {
                for t in (0..n - n % 3).step_by(3) {
                    edges.extend_from_slice(&[[t, t + 1], [t + 1, t + 2], [t + 2, t]]);
                }
            }
            ShapeMode::TriangleFan => {
                for i in 1..n.saturating_sub(1) {
                    edges.push([0, i]);
                    edges.push([i, i + 1]);
                }
                if n > 2 {
                    edges.push([0, n - 1]);
                }
            }
            ShapeMode::TriangleStrip => {
                for i in 0..n.saturating_sub(2) {
                    edges.push([i, i + 1]);
                    edges.push([i, i + 2]);
                }
                if n >= 2 {
                    edges.push([n - 2, n - 1]);
                }
            }
            ShapeMode::Quads => {
                for q in (0..n - n % 4).step_by(4) {
                    edges.extend_from_slice(&[[q, q + 1], [q + 1, q + 2], [q + 2, q + 3], [q + 3, q]]);
                }
            }
            ShapeMode::QuadStrip => {
                let mut i = 0;
                while i + 3 < n {
                    edges.extend_from_slice(&[[i, i + 1], [i, i + 2], [i + 1, i + 3]]);
                    i += 2;
                }
                if n >= 4 {
                    edges.push([n - 2, n - 1]);
                }
            }
            ShapeMode::Tess => {
                let mut base = 0u32;
                for (index, contour) in self.contours.iter().enumerate() {
                    let count = (contour.len() / self.stride) as u32;
                    for i in 0..count.saturating_sub(1) {
                        edges.push([base + i, base + i + 1]);
                    }
                    if count > 2 && (self.close || index > 0) {
                        edges.push([base + count - 1, base]);
                    }
                    base += count;
                }
            }
        }
        edges
    }
}

/// Flat per-triangle normals for a triangle list of records, written into each record.
pub fn assign_face_normals(triangles: &mut [f32], stride: usize) {
    for triangle in triangles.chunks_exact_mut(stride * 3) {
        let position = |i: usize| {
            let r = &triangle[i * stride..i * stride + 3];
            [r[0], r[1], r[2]]
        };
        let normal = crate::geometry::normalize_or(
            face_normal(position(0), position(1), position(2)),
            [0.0, 0.0, 1.0],
        );
        for i in 0..3 {
            triangle[i * stride + NORMAL..i * stride + NORMAL + 3].copy_from_slice(&normal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> VertexInputs {
        VertexInputs {
            uv: [0.0, 0.0],
            fill: [1.0, 0.0, 0.0, 1.0],
            stroke: [0.0, 0.0, 0.0, 1.0],
            normal: [0.0, 0.0, 1.0],
        }
    }

    fn shape(mode: ShapeMode, count: usize, end: EndShape) -> ShapeData {
        let mut buffer = ImmediateBuffer::new();
        buffer.begin(mode);
        for i in 0..count {
            buffer.vertex([i as f32, (i * i) as f32, 0.0], &inputs());
        }
        buffer.finish(end)
    }

    #[test]
    fn records_inherit_current_colors() {
        let mut buffer = ImmediateBuffer::new();
        buffer.begin(ShapeMode::Tess);
        buffer.vertex([1.0, 2.0, 3.0], &inputs());
        let anchor = buffer.last_point().expect("anchor");
        assert_eq!(anchor.position, [1.0, 2.0, 3.0]);
        assert_eq!(anchor.fill, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn late_attribute_declaration_pads_earlier_vertices() {
        let mut buffer = ImmediateBuffer::new();
        buffer.begin(ShapeMode::Tess);
        buffer.vertex([0.0, 0.0, 0.0], &inputs());
        buffer.set_attribute("weight", &[0.5, 0.25]);
        buffer.vertex([1.0, 0.0, 0.0], &inputs());
        let data = buffer.finish(EndShape::Close);
        assert_eq!(data.stride, BASE_STRIDE + 2);
        let records: Vec<&[f32]> = data.records().collect();
        assert_eq!(&records[0][BASE_STRIDE..], &[0.0, 0.0]);
        assert_eq!(&records[1][BASE_STRIDE..], &[0.5, 0.25]);
    }

    #[test]
    fn closing_adds_an_edge_back_to_the_start() {
        assert_eq!(shape(ShapeMode::Tess, 4, EndShape::Open).edges().len(), 3);
        assert_eq!(
            shape(ShapeMode::Tess, 4, EndShape::Close).edges().last(),
            Some(&[3, 0])
        );
    }

    #[test]
    fn fan_and_quads_triangulate() {
        assert_eq!(
            shape(ShapeMode::TriangleFan, 5, EndShape::Open).triangle_indices(),
            vec![0, 1, 2, 0, 2, 3, 0, 3, 4]
        );
        assert_eq!(
            shape(ShapeMode::Quads, 8, EndShape::Open)
                .triangle_indices()
                .len(),
            12
        );
        assert_eq!(
            shape(ShapeMode::QuadStrip, 6, EndShape::Open)
                .triangle_indices()
                .len(),
            12
        );
    }

    #[test]
    fn catmull_window_slides() {
        let mut buffer = ImmediateBuffer::new();
        buffer.begin(ShapeMode::Tess);
        let point = |x: f32| CurvePoint {
            position: [x, 0.0, 0.0],
            fill: [1.0; 4],
            stroke: [0.0; 4],
            custom: Vec::new(),
        };
        assert!(buffer.push_curve_point(point(0.0)).is_none());
        assert!(buffer.push_curve_point(point(1.0)).is_none());
        assert!(buffer.push_curve_point(point(2.0)).is_none());
        let (window, first) = buffer.push_curve_point(point(3.0)).expect("window");
        assert_eq!(window[0].position[0], 0.0);
        assert!(first);
        let (window, first) = buffer.push_curve_point(point(4.0)).expect("window");
        assert_eq!(window[0].position[0], 1.0);
        assert!(!first);
    }

    #[test]
    fn holes_start_new_contours() {
        let mut buffer = ImmediateBuffer::new();
        buffer.begin(ShapeMode::Tess);
        for i in 0..3 {
            buffer.vertex([i as f32, 0.0, 0.0], &inputs());
        }
        buffer.begin_contour();
        for i in 0..3 {
            buffer.vertex([i as f32, 1.0, 0.0], &inputs());
        }
        let data = buffer.finish(EndShape::Open);
        assert_eq!(data.contours.len(), 2);
        // The hole is always closed.
        assert!(data.edges().contains(&[5, 3]));
        assert!(!data.edges().contains(&[2, 0]));
    }
}
