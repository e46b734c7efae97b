//! Thin helpers over `euclid` matrices.
//!
//! Matrices follow euclid's row-vector convention: `a.then(&b)` applies `a` first. A transform
//! issued by a drawing call (`translate`, `scale`, ...) is applied to geometry *before* the
//! current model matrix, so it is composed with the `pre_*` methods.

use euclid::default::{Point3D, Transform3D, Vector3D};
use euclid::Angle;

pub type Mat4 = Transform3D<f32>;
pub type Vec3 = Vector3D<f32>;
pub type Point3 = Point3D<f32>;

/// Column-major data for a WGSL `mat4x4<f32>` that transforms column vectors like `m` transforms
/// row vectors.
pub fn to_columns(m: &Mat4) -> [f32; 16] {
    m.to_array()
}

/// Inverse-transpose of the upper 3x3 of `model_view`, column-major. Falls back to identity for
/// singular matrices.
pub fn normal_matrix(model_view: &Mat4) -> [f32; 9] {
    match model_view.inverse() {
        Some(inv) => [
            inv.m11, inv.m21, inv.m31, //
            inv.m12, inv.m22, inv.m32, //
            inv.m13, inv.m23, inv.m33,
        ],
        None => [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    }
}

/// Upper 3x3 of the inverse of `view`, column-major: turns view-space directions into world-space
/// ones. Falls back to identity for singular matrices.
pub fn inverse_rotation(view: &Mat4) -> [f32; 9] {
    match view.inverse() {
        Some(inv) => [
            inv.m11, inv.m12, inv.m13, //
            inv.m21, inv.m22, inv.m23, //
            inv.m31, inv.m32, inv.m33,
        ],
        None => [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    }
}

pub fn rotation(axis: Vec3, radians: f32) -> Mat4 {
    Mat4::rotation(axis.x, axis.y, axis.z, Angle::radians(radians))
}

pub fn transform_point(m: &Mat4, p: [f32; 3]) -> [f32; 3] {
    let v = m.transform_vector3d(Vec3::new(p[0], p[1], p[2]));
    [v.x + m.m41, v.y + m.m42, v.z + m.m43]
}

pub fn transform_direction(m: &Mat4, d: [f32; 3]) -> [f32; 3] {
    let v = m.transform_vector3d(Vec3::new(d[0], d[1], d[2]));
    [v.x, v.y, v.z]
}

/// Right-handed perspective projection onto a y-down surface with depth in `[0, 1]`.
pub fn perspective(fovy: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let f = 1.0 / (fovy / 2.0).tan();
    let range = near - far;
    Mat4::new(
        f / aspect, 0.0, 0.0, 0.0, //
        0.0, -f, 0.0, 0.0, //
        0.0, 0.0, far / range, -1.0, //
        0.0, 0.0, near * far / range, 0.0,
    )
}

/// Orthographic projection of a `width` x `height` box centered on the origin, y-down.
pub fn ortho(width: f32, height: f32, near: f32, far: f32) -> Mat4 {
    let depth = far - near;
    Mat4::new(
        2.0 / width, 0.0, 0.0, 0.0, //
        0.0, -2.0 / height, 0.0, 0.0, //
        0.0, 0.0, -1.0 / depth, 0.0, //
        0.0, 0.0, -near / depth, 1.0,
    )
}

pub fn look_at(eye: Point3, center: Point3, up: Vec3) -> Mat4 {
    let forward = (center - eye).normalize();
    let side = forward.cross(up).normalize();
    let up = side.cross(forward);
    let eye = eye.to_vector();
    Mat4::new(
        side.x, up.x, -forward.x, 0.0, //
        side.y, up.y, -forward.y, 0.0, //
        side.z, up.z, -forward.z, 0.0, //
        -side.dot(eye), -up.dot(eye), forward.dot(eye), 1.0,
    )
}

/// A view and projection pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub view: Mat4,
    pub projection: Mat4,
    pub eye: Point3,
}

impl Camera {
    /// The default camera for a `width` x `height` surface: looks down -z from a distance at which
    /// one world unit at z = 0 covers one logical pixel.
    pub fn default_for(width: f32, height: f32) -> Self {
        let eye_z = (height / 2.0) / (std::f32::consts::PI / 6.0).tan();
        let eye = Point3::new(0.0, 0.0, eye_z);
        Self {
            view: look_at(eye, Point3::origin(), Vec3::new(0.0, 1.0, 0.0)),
            projection: perspective(
                std::f32::consts::PI / 3.0,
                width / height.max(f32::EPSILON),
                eye_z / 10.0,
                eye_z * 10.0,
            ),
            eye,
        }
    }

    /// Vertical field of view and aspect ratio of a perspective projection.
    pub fn field_of_view(&self) -> (f32, f32) {
        let focal_y = self.projection.m22.abs().max(f32::EPSILON);
        let focal_x = self.projection.m11.abs().max(f32::EPSILON);
        (2.0 * (1.0 / focal_y).atan(), focal_y / focal_x)
    }

    /// An orthographic camera mapping the `width` x `height` box centered on the origin onto the
    /// whole surface.
    pub fn ortho_for(width: f32, height: f32) -> Self {
        Self {
            view: Mat4::identity(),
            projection: ortho(width, height, -1000.0, 1000.0),
            eye: Point3::origin(),
        }
    }
}
