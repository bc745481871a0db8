use tracing::{debug, warn};

use super::boundary::{find_boundary_loops, BoundaryLoop};
use crate::math::polygon_2d::{ear_clip, orient_2d};
use crate::math::polygon_3d::PlaneFrame;
use crate::math::triangulate::triangulate_loop;
use crate::math::{centroid, triangle_area, Point2, Point3, Vector2};
use crate::mesh::{FaceTable, TriMesh};

/// Fractions of an edge length tried when searching for an interior fan
/// point inward of an edge midpoint.
const INWARD_FRACTIONS: [f64; 4] = [0.5, 0.25, 0.1, 0.02];

/// Which naming family patch faces belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    /// Holes closed while assembling the tool ends (`_ENDCAP_i`).
    EndCap,
    /// Holes found by the repair scan (`_PATCH_i`).
    Repair,
}

impl PatchKind {
    #[must_use]
    pub fn face_name(self, base: &str, index: usize) -> String {
        match self {
            Self::EndCap => format!("{base}_ENDCAP_{index}"),
            Self::Repair => format!("{base}_PATCH_{index}"),
        }
    }
}

/// Triangulation of a hole loop, possibly with one interior point.
///
/// Triangle indices refer to the loop positions; index `loop.len()` refers
/// to `interior`.
#[derive(Debug, Clone)]
pub struct HolePatch {
    pub interior: Option<Point3>,
    pub triangles: Vec<[usize; 3]>,
}

/// Triangulates a hole loop, keeping the loop's winding.
///
/// 3 vertices give one triangle, 4 split along the shorter diagonal. Larger
/// loops get a fan from the centroid, or from a point found by stepping
/// inward from an edge midpoint, when every fan triangle is valid; otherwise
/// ear clipping in the loop plane, then the generic loop triangulator.
/// Triangles below `min_area` are never emitted.
#[must_use]
pub fn triangulate_hole(points: &[Point3], min_area: f64) -> Option<HolePatch> {
    let n = points.len();
    if n < 3 {
        return None;
    }
    let emit = |tris: Vec<[usize; 3]>, interior: Option<Point3>| {
        let all: Vec<Point3> = points.iter().copied().chain(interior).collect();
        let triangles: Vec<[usize; 3]> = tris
            .into_iter()
            .filter(|t| triangle_area(&all[t[0]], &all[t[1]], &all[t[2]]) >= min_area)
            .collect();
        (!triangles.is_empty()).then_some(HolePatch { interior, triangles })
    };

    if n == 3 {
        return emit(vec![[0, 1, 2]], None);
    }
    if n == 4 {
        let d02 = (points[2] - points[0]).norm();
        let d13 = (points[3] - points[1]).norm();
        let tris = if d02 <= d13 {
            vec![[0, 1, 2], [0, 2, 3]]
        } else {
            vec![[0, 1, 3], [1, 2, 3]]
        };
        return emit(tris, None);
    }

    let frame = PlaneFrame::fit(points)?;
    let flat: Vec<Point2> = points.iter().map(|p| frame.project(p)).collect();

    if let Some(c) = interior_fan_point(&flat, min_area) {
        let tris = (0..n).map(|i| [n, i, (i + 1) % n]).collect();
        return emit(tris, Some(frame.lift(&c)));
    }
    debug!(vertices = n, "no interior fan point, ear clipping hole");

    if let Some(tris) = ear_clip(&flat, min_area) {
        if !tris.is_empty() {
            return emit(tris, None);
        }
    }
    let fallback = triangulate_loop(points, min_area)?;
    emit(fallback.triangles, None)
}

/// Finds a point from which a fan to every loop edge is valid (all triangles
/// counter-clockwise with area above `min_area`).
fn interior_fan_point(flat: &[Point2], min_area: f64) -> Option<Point2> {
    let n = flat.len();
    let valid = |c: &Point2| {
        (0..n).all(|i| orient_2d(c, &flat[i], &flat[(i + 1) % n]) > 2.0 * min_area)
    };

    #[allow(clippy::cast_precision_loss)]
    let inv_n = 1.0 / n as f64;
    let mean = flat
        .iter()
        .fold(Point2::origin(), |acc, p| acc + p.coords * inv_n);
    if valid(&mean) {
        return Some(mean);
    }

    for i in 0..n {
        let a = flat[i];
        let b = flat[(i + 1) % n];
        let edge = b - a;
        let len = edge.norm();
        if len <= 0.0 {
            continue;
        }
        // Left normal points inward for a counter-clockwise loop.
        let inward = Vector2::new(-edge.y, edge.x) / len;
        let mid = a + edge * 0.5;
        for f in INWARD_FRACTIONS {
            let c = mid + inward * (f * len);
            if valid(&c) {
                return Some(c);
            }
        }
    }
    None
}

/// Patches every closed boundary loop of `mesh` with new faces named by
/// `kind`. Loops that cannot be triangulated are skipped.
///
/// Returns the number of loops patched.
pub fn patch_holes(
    mesh: &mut TriMesh,
    faces: &mut FaceTable,
    base: &str,
    kind: PatchKind,
    min_area: f64,
    max_trace: usize,
) -> usize {
    let loops = find_boundary_loops(mesh, max_trace);
    let mut patched = 0;
    for hole in loops {
        if !hole.is_patchable() {
            debug!(vertices = hole.len(), "skipping open boundary chain");
            continue;
        }
        if patch_loop(mesh, faces, &hole, &kind.face_name(base, patched), min_area) {
            patched += 1;
        } else {
            let centre = loop_centroid(mesh, &hole);
            warn!(vertices = hole.len(), ?centre, "could not triangulate boundary loop");
        }
    }
    patched
}

fn patch_loop(
    mesh: &mut TriMesh,
    faces: &mut FaceTable,
    hole: &BoundaryLoop,
    name: &str,
    min_area: f64,
) -> bool {
    let points: Vec<Point3> = hole
        .vertices
        .iter()
        .map(|&v| mesh.vertices[v as usize])
        .collect();
    let Some(patch) = triangulate_hole(&points, min_area) else {
        return false;
    };
    let id = faces.ensure(name);
    let mut index: Vec<u32> = hole.vertices.clone();
    if let Some(c) = patch.interior {
        index.push(mesh.push_vertex(c));
    }
    for t in patch.triangles {
        mesh.push_triangle([index[t[0]], index[t[1]], index[t[2]]], id);
    }
    true
}

/// Centroid of a hole loop.
#[must_use]
pub fn loop_centroid(mesh: &TriMesh, hole: &BoundaryLoop) -> Point3 {
    let points: Vec<Point3> = hole
        .vertices
        .iter()
        .map(|&v| mesh.vertices[v as usize])
        .collect();
    centroid(&points)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::test_meshes::cube;
    use crate::mesh::EdgeAdjacency;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn quad_uses_shorter_diagonal() {
        let pts = vec![p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(2.5, 1.0, 0.0), p(0.5, 1.0, 0.0)];
        let patch = triangulate_hole(&pts, 1e-12).unwrap();
        // |p1 - p3| < |p0 - p2|
        assert_eq!(patch.triangles, vec![[0, 1, 3], [1, 2, 3]]);
    }

    #[test]
    fn convex_loop_gets_centroid_fan() {
        let pts: Vec<Point3> = (0..6)
            .map(|i| {
                let a = f64::from(i) * std::f64::consts::PI / 3.0;
                p(a.cos(), a.sin(), 0.0)
            })
            .collect();
        let patch = triangulate_hole(&pts, 1e-12).unwrap();
        assert_eq!(patch.triangles.len(), 6);
        assert!(patch.interior.unwrap().coords.norm() < 1e-9);
    }

    #[test]
    fn c_shaped_loop_falls_back_to_ear_clip() {
        // A "C" shape has an empty kernel, so no fan point exists.
        let pts = vec![
            p(0.0, 0.0, 0.0),
            p(3.0, 0.0, 0.0),
            p(3.0, 0.4, 0.0),
            p(0.4, 0.4, 0.0),
            p(0.4, 2.6, 0.0),
            p(3.0, 2.6, 0.0),
            p(3.0, 3.0, 0.0),
            p(0.0, 3.0, 0.0),
        ];
        let patch = triangulate_hole(&pts, 1e-12).unwrap();
        assert!(patch.interior.is_none());
        let area: f64 = patch
            .triangles
            .iter()
            .map(|t| {
                let all: Vec<Point3> = pts.iter().copied().chain(patch.interior).collect();
                0.5 * crate::math::triangle_cross(&all[t[0]], &all[t[1]], &all[t[2]]).z
            })
            .sum();
        let expected = 9.0 - 2.6 * 2.2;
        assert!((area - expected).abs() < 1e-9);
    }

    #[test]
    fn patched_open_box_is_closed() {
        let mut mesh = cube(1.0);
        mesh.retain_triangles(|i| i / 2 != 1);
        let mut faces = FaceTable::new();
        let patched = patch_holes(&mut mesh, &mut faces, "T", PatchKind::Repair, 1e-12, 1000);
        assert_eq!(patched, 1);
        assert!(faces.id("T_PATCH_0").is_some());
        assert!(EdgeAdjacency::build(&mesh.triangles).is_closed_manifold());
        assert!((mesh.signed_volume() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn endcap_naming() {
        assert_eq!(PatchKind::EndCap.face_name("FILLET3", 1), "FILLET3_ENDCAP_1");
    }
}
