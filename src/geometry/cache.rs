use super::Mesh;
use crate::backend::{Backend, MeshData};
use crate::id::MeshId;
use ahash::{HashMap, HashMapExt};
use std::collections::hash_map::Entry;
use std::fmt;

/// Structural identity of a retained shape: its class plus every parameter that changes its
/// unit-space mesh. Placement and size never go into the key; they are applied with the model
/// matrix.
///
/// ```
/// use easel::ShapeKey;
///
/// let key = ShapeKey::new("rect").with(1).with(1);
/// assert_eq!(key.as_str(), "rect|1|1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeKey(String);

impl ShapeKey {
    pub fn new(class: &str) -> Self {
        Self(class.to_owned())
    }

    /// Appends one parameter.
    pub fn with(mut self, parameter: impl fmt::Display) -> Self {
        use std::fmt::Write;
        // Writing into a String cannot fail.
        let _ = write!(self.0, "|{parameter}");
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A mesh with its uploaded buffers.
#[derive(Debug)]
pub struct CachedMesh {
    pub mesh: Mesh,
    pub buffers: MeshId,
    pub has_fill: bool,
    pub has_stroke: bool,
    pub has_vertex_colors: bool,
}

/// Retained geometry, built once per key and never mutated afterwards.
#[derive(Default)]
pub struct GeometryCache {
    entries: HashMap<ShapeKey, CachedMesh>,
    builds: usize,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            builds: 0,
        }
    }

    /// Returns the mesh stored under `key`, building and uploading it with `build` first if
    /// the key is new.
    pub fn ensure<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        key: &ShapeKey,
        build: impl FnOnce() -> Mesh,
    ) -> &CachedMesh {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                self.builds += 1;
                let mut mesh = build();
                mesh.finish();
                let fill_vertices = mesh.fill_vertices();
                let fill_indices = mesh.fill_indices();
                let (stroke_vertices, stroke_indices) = mesh.stroke_geometry();
                let buffers = backend.upload_mesh(&MeshData {
                    fill_vertices: &fill_vertices,
                    fill_indices: &fill_indices,
                    stroke_vertices: &stroke_vertices,
                    stroke_indices: &stroke_indices,
                });
                tracing::debug!(
                    key = %key,
                    vertices = mesh.vertices.len(),
                    faces = mesh.faces.len(),
                    edges = mesh.edges.len(),
                    "built retained geometry"
                );
                entry.insert(CachedMesh {
                    has_fill: !fill_indices.is_empty(),
                    has_stroke: !stroke_indices.is_empty(),
                    has_vertex_colors: mesh.has_vertex_colors(),
                    mesh,
                    buffers,
                })
            }
        }
    }

    pub fn get(&self, key: &ShapeKey) -> Option<&CachedMesh> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &ShapeKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many meshes have been built since creation.
    pub fn builds(&self) -> usize {
        self.builds
    }

    /// Drops one entry and its buffers.
    pub fn remove<B: Backend + ?Sized>(&mut self, backend: &mut B, key: &ShapeKey) {
        if let Some(entry) = self.entries.remove(key) {
            backend.release_mesh(entry.buffers);
        }
    }

    /// Drops every entry; used when the context goes away.
    pub fn clear<B: Backend + ?Sized>(&mut self, backend: &mut B) {
        for (_, entry) in self.entries.drain() {
            backend.release_mesh(entry.buffers);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::geometry::primitives;

    #[test]
    fn builder_runs_once_per_key() {
        let mut backend = RecordingBackend::new(100, 100);
        let mut cache = GeometryCache::new();
        let key = ShapeKey::new("rect").with(1).with(1);
        let mut calls = 0;
        for _ in 0..3 {
            cache.ensure(&mut backend, &key, || {
                calls += 1;
                primitives::rect(1, 1)
            });
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.builds(), 1);
        assert_eq!(backend.uploaded_meshes(), 1);

        let other = ShapeKey::new("rect").with(2).with(1);
        cache.ensure(&mut backend, &other, || primitives::rect(2, 1));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn keys_distinguish_parameters() {
        assert_ne!(
            ShapeKey::new("arc").with(0.5).with(1.0),
            ShapeKey::new("arc").with(0.5).with(1.5)
        );
        assert_eq!(ShapeKey::new("tri").as_str(), "tri");
    }

    #[test]
    fn cached_rect_has_fill_and_stroke() {
        let mut backend = RecordingBackend::new(100, 100);
        let mut cache = GeometryCache::new();
        let key = ShapeKey::new("rect").with(1).with(1);
        let entry = cache.ensure(&mut backend, &key, || primitives::rect(1, 1));
        assert!(entry.has_fill);
        assert!(entry.has_stroke);
        assert!(!entry.has_vertex_colors);
        assert_eq!(entry.mesh.faces.len(), 2);
    }
}
