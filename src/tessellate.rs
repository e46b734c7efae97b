//! Polygon tessellation of immediate-mode contours.
//!
//! Contours are flat `f32` records of `stride` values, the first three being the position. The
//! records go through lyon's sweep-line fill tessellator under the non-zero rule; vertices the
//! sweep creates at intersections get a payload combined from the records they lie between.

use crate::cache::{contours_key, Cache};
use ahash::{HashMap, HashMapExt};
use lyon::math::point;
use lyon::path::{EndpointId, Path};
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, FillVertexConstructor,
    VertexBuffers, VertexSource,
};
use smallvec::SmallVec;
use std::num::NonZeroUsize;

/// Number of leading payload values holding the position.
pub const POSITION_COMPONENTS: usize = 3;

/// Weighted sum of payloads.
///
/// Contributors with a weight of zero or without a payload are skipped. A single contributor
/// with weight one is copied unchanged.
pub fn combine(contributors: &[(Option<&[f32]>, f32)], stride: usize) -> Vec<f32> {
    let mut result = vec![0.0; stride];
    for (payload, weight) in contributors {
        let Some(payload) = payload else { continue };
        if *weight == 0.0 {
            continue;
        }
        for (out, value) in result.iter_mut().zip(payload.iter()) {
            *out += value * weight;
        }
    }
    result
}

/// Which two position components the sweep runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlaneAxes(usize, usize);

impl PlaneAxes {
    const SCREEN: PlaneAxes = PlaneAxes(0, 1);

    /// Screen plane when every record shares the first record's depth, otherwise the plane
    /// orthogonal to the dominant axis of the Newell normal.
    fn select(contours: &[Vec<f32>], stride: usize) -> PlaneAxes {
        let Some(first_z) = contours
            .iter()
            .find(|contour| contour.len() >= stride)
            .map(|contour| contour[2])
        else {
            return PlaneAxes::SCREEN;
        };
        let flat = contours
            .iter()
            .all(|contour| contour.chunks_exact(stride).all(|record| record[2] == first_z));
        if flat {
            return PlaneAxes::SCREEN;
        }

        let mut normal = [0.0f32; 3];
        for contour in contours {
            let records: Vec<&[f32]> = contour.chunks_exact(stride).collect();
            for (i, current) in records.iter().enumerate() {
                let next = records[(i + 1) % records.len()];
                normal[0] += (current[1] - next[1]) * (current[2] + next[2]);
                normal[1] += (current[2] - next[2]) * (current[0] + next[0]);
                normal[2] += (current[0] - next[0]) * (current[1] + next[1]);
            }
        }
        let [x, y, z] = normal.map(f32::abs);
        if z >= x && z >= y {
            PlaneAxes::SCREEN
        } else if y >= x {
            PlaneAxes(0, 2)
        } else {
            PlaneAxes(1, 2)
        }
    }
}

/// Builds output payloads from the sweep's vertex sources.
struct PayloadConstructor<'a> {
    records: &'a [&'a [f32]],
    endpoints: &'a HashMap<EndpointId, usize>,
    stride: usize,
}

impl FillVertexConstructor<Vec<f32>> for PayloadConstructor<'_> {
    fn new_vertex(&mut self, vertex: FillVertex) -> Vec<f32> {
        let mut contributors: SmallVec<[(Option<&[f32]>, f32); 4]> = SmallVec::new();
        let mut sources = 0usize;
        for source in vertex.sources() {
            sources += 1;
            match source {
                VertexSource::Endpoint { id } => {
                    contributors.push((self.record(id), 1.0));
                }
                VertexSource::Edge { from, to, t } => {
                    contributors.push((self.record(from), 1.0 - t));
                    contributors.push((self.record(to), t));
                }
            }
        }

        if let [(Some(record), weight)] = contributors.as_slice() {
            if *weight == 1.0 {
                return record.to_vec();
            }
        }
        if sources == 0 {
            tracing::warn!("tessellator produced a vertex without sources");
            return vec![0.0; self.stride];
        }
        // Each source describes the whole vertex; average them.
        let scale = 1.0 / sources as f32;
        for contributor in contributors.iter_mut() {
            contributor.1 *= scale;
        }
        combine(&contributors, self.stride)
    }
}

impl<'a> PayloadConstructor<'a> {
    fn record(&self, id: EndpointId) -> Option<&'a [f32]> {
        self.endpoints.get(&id).map(|&index| self.records[index])
    }
}

/// Triangulates contours into a flat triangle list, caching results by input.
pub struct PolygonTessellator {
    tessellator: FillTessellator,
    cache: Cache,
}

impl PolygonTessellator {
    pub fn new(cache_size: NonZeroUsize) -> Self {
        Self {
            tessellator: FillTessellator::new(),
            cache: Cache::new(cache_size),
        }
    }

    /// Number of cached triangulations.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Triangulates `contours` (each a closed boundary of `stride`-sized records) into
    /// consecutive triples of records.
    ///
    /// Failures are logged and yield whatever complete triangles were produced.
    pub fn triangulate(&mut self, contours: &[Vec<f32>], stride: usize) -> Vec<f32> {
        if stride < POSITION_COMPONENTS {
            tracing::warn!(stride, "tessellation records are too short to hold a position");
            return Vec::new();
        }
        let key = contours_key(contours, stride);
        if let Some(triangles) = self.cache.get_triangles(&key) {
            return triangles;
        }
        let triangles = self.tessellate(contours, stride);
        self.cache.insert_triangles(key, triangles.clone());
        triangles
    }

    fn tessellate(&mut self, contours: &[Vec<f32>], stride: usize) -> Vec<f32> {
        let axes = PlaneAxes::select(contours, stride);

        let mut records: Vec<&[f32]> = Vec::new();
        let mut endpoints: HashMap<EndpointId, usize> = HashMap::new();
        let mut builder = Path::builder();
        for contour in contours {
            let mut started = false;
            for record in contour.chunks_exact(stride) {
                let (a, b) = (record[axes.0], record[axes.1]);
                if !a.is_finite() || !b.is_finite() {
                    tracing::warn!("skipping a non-finite vertex during tessellation");
                    continue;
                }
                let id = if started {
                    builder.line_to(point(a, b))
                } else {
                    started = true;
                    builder.begin(point(a, b))
                };
                endpoints.insert(id, records.len());
                records.push(record);
            }
            if started {
                builder.end(true);
            }
        }
        let path = builder.build();

        let mut buffers: VertexBuffers<Vec<f32>, u32> = VertexBuffers::new();
        let options = FillOptions::default().with_fill_rule(FillRule::NonZero);
        let constructor = PayloadConstructor {
            records: &records,
            endpoints: &endpoints,
            stride,
        };
        let result = self.tessellator.tessellate_with_ids(
            path.id_iter(),
            &path,
            None,
            &options,
            &mut BuffersBuilder::new(&mut buffers, constructor),
        );
        if let Err(error) = result {
            tracing::warn!(?error, "polygon tessellation failed; output may be incomplete");
        }

        let complete = buffers.indices.len() - buffers.indices.len() % 3;
        if complete != buffers.indices.len() {
            tracing::warn!(
                indices = buffers.indices.len(),
                "tessellator emitted a partial triangle; dropping it"
            );
        }
        let mut triangles = Vec::with_capacity(complete * stride);
        for &index in &buffers.indices[..complete] {
            match buffers.vertices.get(index as usize) {
                Some(vertex) => triangles.extend_from_slice(vertex),
                None => tracing::warn!(index, "tessellator referenced a missing vertex"),
            }
        }
        triangles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRIDE: usize = 5;

    fn tessellator() -> PolygonTessellator {
        PolygonTessellator::new(NonZeroUsize::new(8).unwrap())
    }

    fn record(x: f32, y: f32, z: f32, u: f32, v: f32) -> [f32; STRIDE] {
        [x, y, z, u, v]
    }

    fn triangles(flat: &[f32]) -> Vec<&[f32]> {
        flat.chunks_exact(STRIDE).collect()
    }

    #[test]
    fn convex_quad_keeps_original_payloads() {
        let quad = [
            record(0.0, 0.0, 0.0, 0.1, 0.2),
            record(10.0, 0.0, 0.0, 0.3, 0.4),
            record(10.0, 10.0, 0.0, 0.5, 0.6),
            record(0.0, 10.0, 0.0, 0.7, 0.8),
        ];
        let contour: Vec<f32> = quad.concat();
        let output = tessellator().triangulate(&[contour], STRIDE);
        let records = triangles(&output);
        assert_eq!(records.len(), 6, "two triangles");
        for out in &records {
            assert!(quad.iter().any(|input| input.as_slice() == *out));
        }
        for input in &quad {
            assert!(records.iter().any(|out| *out == input.as_slice()));
        }
    }

    #[test]
    fn self_intersection_combines_payloads() {
        // Bow tie: edges (0,0)-(10,10) and (10,0)-(0,10) cross at (5,5).
        let bow_tie = [
            record(0.0, 0.0, 0.0, 0.0, 0.0),
            record(10.0, 10.0, 0.0, 1.0, 1.0),
            record(10.0, 0.0, 0.0, 1.0, 0.0),
            record(0.0, 10.0, 0.0, 0.0, 1.0),
        ];
        let output = tessellator().triangulate(&[bow_tie.concat()], STRIDE);
        let records = triangles(&output);
        assert_eq!(records.len(), 6);
        let center = records
            .iter()
            .find(|r| (r[0] - 5.0).abs() < 1e-3 && (r[1] - 5.0).abs() < 1e-3)
            .expect("intersection vertex");
        assert!((center[3] - 0.5).abs() < 1e-3);
        assert!((center[4] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn hole_is_left_unfilled() {
        let outer: Vec<f32> = [
            record(0.0, 0.0, 0.0, 0.0, 0.0),
            record(30.0, 0.0, 0.0, 0.0, 0.0),
            record(30.0, 30.0, 0.0, 0.0, 0.0),
            record(0.0, 30.0, 0.0, 0.0, 0.0),
        ]
        .concat();
        let inner: Vec<f32> = [
            record(10.0, 10.0, 0.0, 0.0, 0.0),
            record(10.0, 20.0, 0.0, 0.0, 0.0),
            record(20.0, 20.0, 0.0, 0.0, 0.0),
            record(20.0, 10.0, 0.0, 0.0, 0.0),
        ]
        .concat();
        let output = tessellator().triangulate(&[outer, inner], STRIDE);
        let area: f32 = triangles(&output)
            .chunks_exact(3)
            .map(|t| {
                ((t[1][0] - t[0][0]) * (t[2][1] - t[0][1]) - (t[2][0] - t[0][0]) * (t[1][1] - t[0][1]))
                    .abs()
                    / 2.0
            })
            .sum();
        assert!((area - 800.0).abs() < 1e-2);
    }

    #[test]
    fn vertical_polygon_is_tessellated_in_its_own_plane() {
        let wall: Vec<f32> = [
            record(0.0, 0.0, 0.0, 0.0, 0.0),
            record(0.0, 10.0, 0.0, 0.0, 0.0),
            record(0.0, 10.0, 10.0, 0.0, 0.0),
            record(0.0, 0.0, 10.0, 0.0, 0.0),
        ]
        .concat();
        let output = tessellator().triangulate(&[wall], STRIDE);
        assert_eq!(triangles(&output).len(), 6);
        assert!(triangles(&output).iter().all(|r| r[0] == 0.0));
    }

    #[test]
    fn repeated_input_hits_the_cache() {
        let mut tessellator = tessellator();
        let triangle: Vec<f32> = [
            record(0.0, 0.0, 0.0, 0.0, 0.0),
            record(5.0, 0.0, 0.0, 0.0, 0.0),
            record(0.0, 5.0, 0.0, 0.0, 0.0),
        ]
        .concat();
        let first = tessellator.triangulate(&[triangle.clone()], STRIDE);
        let second = tessellator.triangulate(&[triangle], STRIDE);
        assert_eq!(first, second);
        assert_eq!(tessellator.cached(), 1);
    }

    #[test]
    fn combine_skips_zero_weights_and_missing_payloads() {
        let a = [1.0, 2.0, 3.0];
        let b = [f32::NAN, f32::NAN, f32::NAN];
        let c = [3.0, 6.0, 9.0];
        let combined = combine(
            &[
                (Some(&a[..]), 0.5),
                (Some(&b[..]), 0.0),
                (None, 0.25),
                (Some(&c[..]), 0.5),
            ],
            3,
        );
        assert_eq!(combined, vec![2.0, 4.0, 6.0]);
    }
}
