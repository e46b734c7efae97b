use super::{Mesh, ShapeKey};
use crate::color::Color;
use crate::math::Mat4;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_GEOMETRY: AtomicU64 = AtomicU64::new(1);

/// Geometry captured between `begin_geometry()` and `end_geometry()`.
///
/// Draw it with `Renderer::model`; it is uploaded on first draw and cached under its own key.
#[derive(Debug, Clone)]
pub struct Geometry {
    key: ShapeKey,
    mesh: Arc<Mesh>,
}

impl Geometry {
    pub fn key(&self) -> &ShapeKey {
        &self.key
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }
}

/// Accumulates drawn shapes in model space while a geometry is being built.
#[derive(Debug)]
pub struct GeometryBuilder {
    mesh: Mesh,
    saved_fill: Color,
}

impl GeometryBuilder {
    /// `saved_fill` is restored when building ends; until then the fill is [`Color::UNSET`] so
    /// only colors set inside the build are recorded.
    pub(crate) fn new(saved_fill: Color) -> Self {
        Self {
            mesh: Mesh::default(),
            saved_fill,
        }
    }

    pub(crate) fn add_mesh(&mut self, mesh: &Mesh, model: &Mat4, fill: Color) {
        self.mesh.append_transformed(mesh, model, fill);
    }

    pub(crate) fn finish(self) -> (Geometry, Color) {
        let id = NEXT_GEOMETRY.fetch_add(1, Ordering::Relaxed);
        let mut mesh = self.mesh;
        if !mesh.has_vertex_colors() {
            mesh.colors.clear();
        }
        let geometry = Geometry {
            key: ShapeKey::new("model").with(id),
            mesh: Arc::new(mesh),
        };
        (geometry, self.saved_fill)
    }
}
