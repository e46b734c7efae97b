//! Meshes, GPU vertex formats and the retained-mode geometry cache.

mod builder;
mod cache;
pub mod primitives;

pub use builder::{Geometry, GeometryBuilder};
pub use cache::{CachedMesh, GeometryCache, ShapeKey};

use ahash::{HashMap, HashMapExt};
use smallvec::SmallVec;

use crate::color::Color;
use crate::math::{self, Mat4};

/// Vertex layout of filled geometry.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FillVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    /// Per-vertex color; a negative red channel selects the material color.
    pub color: [f32; 4],
}

/// One corner of a stroked segment, expanded to screen-space width by the line program.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StrokeVertex {
    pub position: [f32; 3],
    /// Segment vector from its start to its end.
    pub tangent: [f32; 3],
    pub color: [f32; 4],
    /// +1 or -1: which side of the segment this corner lies on.
    pub side: f32,
    /// 0 at the segment start, 1 at its end.
    pub end: f32,
    /// From the segment start to the far end of a segment joined there; zero at a free end.
    pub start_neighbor: [f32; 3],
    /// From the segment end to the far end of a segment joined there; zero at a free end.
    pub end_neighbor: [f32; 3],
}

/// One corner of a point sprite.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointVertex {
    pub position: [f32; 3],
    pub corner: [f32; 2],
}

/// Geometry in model space: positions with parallel attribute lists plus faces and edges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    /// Optional per-vertex fill colors; `Color::UNSET` entries use the material color.
    pub colors: Vec<[f32; 4]>,
    pub faces: Vec<[u32; 3]>,
    pub edges: Vec<[u32; 2]>,
    /// Grid resolution for meshes laid out as `(detail_x + 1) * (detail_y + 1)` vertices.
    pub detail_x: u32,
    pub detail_y: u32,
}

impl Mesh {
    pub fn new(detail_x: u32, detail_y: u32) -> Self {
        Self {
            detail_x,
            detail_y,
            ..Default::default()
        }
    }

    fn is_grid(&self) -> bool {
        self.detail_x > 0
            && self.detail_y > 0
            && self.vertices.len() == ((self.detail_x + 1) * (self.detail_y + 1)) as usize
    }

    /// Two triangles per grid cell.
    pub fn compute_faces(&mut self) {
        self.faces.clear();
        let slice = self.detail_x + 1;
        for i in 0..self.detail_y {
            for j in 0..self.detail_x {
                let a = i * slice + j;
                let b = i * slice + j + 1;
                let c = (i + 1) * slice + j + 1;
                let d = (i + 1) * slice + j;
                self.faces.push([a, b, d]);
                self.faces.push([d, b, c]);
            }
        }
    }

    /// Area-weighted vertex normals. Vertices not used by any face point towards +z.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![[0.0f32; 3]; self.vertices.len()];
        for face in &self.faces {
            let [a, b, c] = face.map(|i| self.vertices.get(i as usize).copied());
            let (Some(a), Some(b), Some(c)) = (a, b, c) else {
                tracing::warn!(?face, "face references a missing vertex");
                continue;
            };
            let n = face_normal(a, b, c);
            for &index in face {
                let acc = &mut normals[index as usize];
                acc[0] += n[0];
                acc[1] += n[1];
                acc[2] += n[2];
            }
        }
        self.normals = normals
            .into_iter()
            .map(|n| normalize_or(n, [0.0, 0.0, 1.0]))
            .collect();
    }

    /// Whether any vertex carries its own color.
    pub fn has_vertex_colors(&self) -> bool {
        self.colors.iter().any(|c| c[0] >= 0.0)
    }

    /// Vertices for indexed fill drawing.
    pub fn fill_vertices(&self) -> Vec<FillVertex> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, &position)| FillVertex {
                position,
                normal: self.normals.get(i).copied().unwrap_or([0.0, 0.0, 1.0]),
                uv: self.uvs.get(i).copied().unwrap_or([0.0, 0.0]),
                color: self.colors.get(i).copied().unwrap_or(Color::UNSET.0),
            })
            .collect()
    }

    pub fn fill_indices(&self) -> Vec<u32> {
        self.faces.iter().flatten().copied().collect()
    }

    /// Expands the edge list into stroke quads.
    pub fn stroke_geometry(&self) -> (Vec<StrokeVertex>, Vec<u32>) {
        stroke_segments(&self.vertices, &[], &self.edges)
    }

    /// Prepares a freshly built mesh for upload: grid faces when none were given, normals when
    /// they do not cover every vertex.
    pub(crate) fn finish(&mut self) {
        if self.faces.is_empty() && self.is_grid() {
            self.compute_faces();
        }
        if self.normals.len() != self.vertices.len() {
            self.compute_normals();
        }
    }

    /// Appends `other` transformed by `model`; faces and edges are re-indexed.
    pub(crate) fn append_transformed(&mut self, other: &Mesh, model: &Mat4, color: Color) {
        let base = self.vertices.len() as u32;
        let normal_matrix = math::normal_matrix(model);
        self.vertices.extend(
            other
                .vertices
                .iter()
                .map(|&v| math::transform_point(model, v)),
        );
        self.normals.extend(other.vertices.iter().enumerate().map(|(i, _)| {
            let n = other.normals.get(i).copied().unwrap_or([0.0, 0.0, 1.0]);
            normalize_or(apply_mat3(&normal_matrix, n), [0.0, 0.0, 1.0])
        }));
        self.uvs.extend(
            (0..other.vertices.len()).map(|i| other.uvs.get(i).copied().unwrap_or([0.0, 0.0])),
        );
        self.colors.extend((0..other.vertices.len()).map(|i| {
            other
                .colors
                .get(i)
                .copied()
                .filter(|c| c[0] >= 0.0)
                .unwrap_or(color.0)
        }));
        self.faces
            .extend(other.faces.iter().map(|f| f.map(|i| i + base)));
        self.edges
            .extend(other.edges.iter().map(|e| e.map(|i| i + base)));
    }
}

fn apply_mat3(m: &[f32; 9], v: [f32; 3]) -> [f32; 3] {
    [
        m[0] * v[0] + m[3] * v[1] + m[6] * v[2],
        m[1] * v[0] + m[4] * v[1] + m[7] * v[2],
        m[2] * v[0] + m[5] * v[1] + m[8] * v[2],
    ]
}

pub(crate) fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let ab = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let ac = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    [
        ab[1] * ac[2] - ab[2] * ac[1],
        ab[2] * ac[0] - ab[0] * ac[2],
        ab[0] * ac[1] - ab[1] * ac[0],
    ]
}

pub(crate) fn normalize_or(v: [f32; 3], fallback: [f32; 3]) -> [f32; 3] {
    let length = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if length <= f32::EPSILON || !length.is_finite() {
        return fallback;
    }
    [v[0] / length, v[1] / length, v[2] / length]
}

/// Four stroke corners and two triangles per edge. Zero-length edges are dropped.
///
/// `colors` is indexed like `positions`; when it is empty every corner uses the material color.
pub fn stroke_segments(
    positions: &[[f32; 3]],
    colors: &[[f32; 4]],
    edges: &[[u32; 2]],
) -> (Vec<StrokeVertex>, Vec<u32>) {
    let mut incident: HashMap<u32, SmallVec<[u32; 2]>> = HashMap::new();
    for &[a, b] in edges {
        incident.entry(a).or_default().push(b);
        incident.entry(b).or_default().push(a);
    }
    // Vector from `at` to the far end of another edge sharing it.
    let neighbor = |at: u32, excluded: u32| -> [f32; 3] {
        let Some(&origin) = positions.get(at as usize) else {
            return [0.0; 3];
        };
        incident
            .get(&at)
            .into_iter()
            .flatten()
            .filter(|&&far| far != excluded)
            .filter_map(|&far| positions.get(far as usize))
            .map(|far| [far[0] - origin[0], far[1] - origin[1], far[2] - origin[2]])
            .find(|offset| *offset != [0.0; 3])
            .unwrap_or([0.0; 3])
    };

    let mut vertices = Vec::with_capacity(edges.len() * 4);
    let mut indices = Vec::with_capacity(edges.len() * 6);
    for &[a, b] in edges {
        let (Some(&start), Some(&end)) = (positions.get(a as usize), positions.get(b as usize))
        else {
            tracing::warn!(a, b, "edge references a missing vertex");
            continue;
        };
        let tangent = [end[0] - start[0], end[1] - start[1], end[2] - start[2]];
        if tangent == [0.0; 3] {
            continue;
        }
        let start_neighbor = neighbor(a, b);
        let end_neighbor = neighbor(b, a);
        let color_of = |i: u32| colors.get(i as usize).copied().unwrap_or(Color::UNSET.0);
        let base = vertices.len() as u32;
        for (position, color, end_flag) in [(start, color_of(a), 0.0), (end, color_of(b), 1.0)] {
            for side in [1.0, -1.0] {
                vertices.push(StrokeVertex {
                    position,
                    tangent,
                    color,
                    side,
                    end: end_flag,
                    start_neighbor,
                    end_neighbor,
                });
            }
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 1, base + 3]);
    }
    (vertices, indices)
}

/// Six corners (two triangles) per point.
pub fn point_quads(positions: &[[f32; 3]]) -> Vec<PointVertex> {
    const CORNERS: [[f32; 2]; 6] = [
        [-1.0, -1.0],
        [1.0, -1.0],
        [1.0, 1.0],
        [-1.0, -1.0],
        [1.0, 1.0],
        [-1.0, 1.0],
    ];
    positions
        .iter()
        .flat_map(|&position| CORNERS.iter().map(move |&corner| PointVertex { position, corner }))
        .collect()
}
