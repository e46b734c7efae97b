//! Unit-space meshes for the retained primitives.
//!
//! Each builder depends only on the parameters that end up in the shape's key; callers place the
//! result with the model matrix.

use super::Mesh;
use crate::config::ARC_STROKE_DETAIL_LIMIT;

/// How the open side of an arc is filled and outlined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArcMode {
    /// Filled from the center; outlined along the arc and both radii.
    Pie,
    /// Filled between the arc and its chord; outlined along both.
    Chord,
    /// Filled like `Chord`; outlined along the arc only.
    Open,
    /// Filled like `Pie`; outlined along the arc only.
    Fan,
}

impl ArcMode {
    pub fn key_name(self) -> &'static str {
        match self {
            ArcMode::Pie => "pie",
            ArcMode::Chord => "chord",
            ArcMode::Open => "open",
            ArcMode::Fan => "fan",
        }
    }
}

/// Unit square `[0, 1]²` as a `detail_x` x `detail_y` grid, outlined along its four sides.
pub fn rect(detail_x: u32, detail_y: u32) -> Mesh {
    let (detail_x, detail_y) = (detail_x.max(1), detail_y.max(1));
    let mut mesh = Mesh::new(detail_x, detail_y);
    for i in 0..=detail_y {
        let v = i as f32 / detail_y as f32;
        for j in 0..=detail_x {
            let u = j as f32 / detail_x as f32;
            mesh.vertices.push([u, v, 0.0]);
            mesh.uvs.push([u, v]);
        }
    }
    mesh.edges = grid_outline(detail_x, detail_y);
    mesh
}

/// Bilinear patch through four corners, given in drawing order.
pub fn quad(corners: [[f32; 3]; 4], detail_x: u32, detail_y: u32) -> Mesh {
    let (detail_x, detail_y) = (detail_x.max(1), detail_y.max(1));
    let [p1, p2, p3, p4] = corners;
    let mut mesh = Mesh::new(detail_x, detail_y);
    for i in 0..=detail_y {
        let v = i as f32 / detail_y as f32;
        for j in 0..=detail_x {
            let u = j as f32 / detail_x as f32;
            let point = std::array::from_fn(|k| {
                (p1[k] * (1.0 - u) + p2[k] * u) * (1.0 - v) + (p4[k] * (1.0 - u) + p3[k] * u) * v
            });
            mesh.vertices.push(point);
            mesh.uvs.push([u, v]);
        }
    }
    mesh.edges = grid_outline(detail_x, detail_y);
    mesh
}

fn grid_outline(detail_x: u32, detail_y: u32) -> Vec<[u32; 2]> {
    let last = (detail_x + 1) * (detail_y + 1) - 1;
    let bottom_left = (detail_x + 1) * detail_y;
    vec![
        [0, detail_x],
        [detail_x, last],
        [last, bottom_left],
        [bottom_left, 0],
    ]
}

/// The unit right triangle `(0,0) (1,0) (0,1)`.
pub fn triangle() -> Mesh {
    let mut mesh = Mesh::new(0, 0);
    mesh.vertices = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    mesh.uvs = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
    mesh.faces = vec![[0, 1, 2]];
    mesh.edges = vec![[0, 1], [1, 2], [2, 0]];
    mesh
}

/// Arc of the ellipse inscribed in the unit square, from `start` to `stop` radians.
///
/// Arcs with more than [`ARC_STROKE_DETAIL_LIMIT`] segments get no outline.
pub fn arc(start: f32, stop: f32, mode: ArcMode, detail: u32) -> Mesh {
    let detail = detail.max(1);
    let mut mesh = Mesh::new(0, 0);
    let centered = matches!(mode, ArcMode::Pie | ArcMode::Fan);
    if centered {
        mesh.vertices.push([0.5, 0.5, 0.0]);
        mesh.uvs.push([0.5, 0.5]);
    }
    let first = mesh.vertices.len() as u32;
    for i in 0..=detail {
        let theta = start + (stop - start) * (i as f32 / detail as f32);
        let (x, y) = (0.5 + theta.cos() / 2.0, 0.5 + theta.sin() / 2.0);
        mesh.vertices.push([x, y, 0.0]);
        mesh.uvs.push([x, y]);
    }
    let last = mesh.vertices.len() as u32 - 1;

    let apex = if centered { 0 } else { first };
    let fan_start = if centered { first } else { first + 1 };
    for k in fan_start..last {
        mesh.faces.push([apex, k, k + 1]);
    }

    if detail <= ARC_STROKE_DETAIL_LIMIT {
        mesh.edges.extend((first..last).map(|k| [k, k + 1]));
        match mode {
            ArcMode::Pie => {
                mesh.edges.push([0, first]);
                mesh.edges.push([0, last]);
            }
            ArcMode::Chord => mesh.edges.push([first, last]),
            ArcMode::Open | ArcMode::Fan => {}
        }
    }
    mesh
}

/// Full ellipse inscribed in the unit square.
pub fn ellipse(detail: u32) -> Mesh {
    arc(0.0, std::f32::consts::TAU, ArcMode::Open, detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_outline_follows_corners() {
        let mesh = rect(2, 3);
        assert_eq!(mesh.vertices.len(), 12);
        let corners: Vec<[f32; 3]> = mesh
            .edges
            .iter()
            .map(|edge| mesh.vertices[edge[0] as usize])
            .collect();
        assert_eq!(
            corners,
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]
        );
    }

    #[test]
    fn pie_fills_from_center() {
        let mesh = arc(0.0, std::f32::consts::FRAC_PI_2, ArcMode::Pie, 4);
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.faces.len(), 4);
        assert!(mesh.faces.iter().all(|face| face[0] == 0));
        assert_eq!(mesh.edges.len(), 6);
    }

    #[test]
    fn chord_fans_from_first_arc_point() {
        let mesh = arc(0.0, std::f32::consts::PI, ArcMode::Chord, 4);
        assert_eq!(mesh.vertices.len(), 5);
        assert_eq!(mesh.faces.len(), 3);
        assert_eq!(mesh.edges.last(), Some(&[0, 4]));
    }

    #[test]
    fn detailed_arcs_have_no_outline() {
        assert!(ellipse(ARC_STROKE_DETAIL_LIMIT + 1).edges.is_empty());
        assert_eq!(ellipse(25).edges.len(), 25);
    }

    #[test]
    fn quad_interpolates_corners() {
        let mesh = quad(
            [[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [4.0, 2.0, 0.0], [0.0, 2.0, 0.0]],
            2,
            2,
        );
        assert_eq!(mesh.vertices[4], [2.0, 1.0, 0.0]);
        assert_eq!(mesh.vertices[8], [4.0, 2.0, 0.0]);
    }
}
