use std::collections::HashMap;

use spade::{ConstrainedDelaunayTriangulation, Point2 as SpadePoint2, Triangulation};
use tracing::debug;

use super::polygon_2d::{ear_clip, orient_2d, winding_number_2d};
use super::polygon_3d::PlaneFrame;
use super::{Point2, Point3};

/// Which strategy produced a polygon triangulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriangulationMethod {
    EarClip,
    ConstrainedDelaunay,
    Fan,
}

/// Triangles indexing into the input loop, oriented like the loop.
#[derive(Debug, Clone)]
pub struct PolygonTriangulation {
    pub triangles: Vec<[usize; 3]>,
    pub method: TriangulationMethod,
}

/// Triangulates a closed 3D loop in its best-fit (Newell) plane.
///
/// Tries ear clipping first, then a constrained Delaunay triangulation, and
/// finally a fan from the first vertex. Triangles with area below `min_area`
/// are never emitted. Returns `None` only for loops with no usable plane.
#[must_use]
pub fn triangulate_loop(points: &[Point3], min_area: f64) -> Option<PolygonTriangulation> {
    if points.len() < 3 {
        return None;
    }
    let frame = PlaneFrame::fit(points)?;
    let flat: Vec<Point2> = points.iter().map(|p| frame.project(p)).collect();

    if let Some(triangles) = ear_clip(&flat, min_area) {
        if !triangles.is_empty() {
            return Some(PolygonTriangulation {
                triangles,
                method: TriangulationMethod::EarClip,
            });
        }
    }
    debug!(vertices = points.len(), "ear clipping stuck, trying constrained Delaunay");

    if let Some(triangles) = constrained_delaunay(&flat, min_area) {
        if !triangles.is_empty() {
            return Some(PolygonTriangulation {
                triangles,
                method: TriangulationMethod::ConstrainedDelaunay,
            });
        }
    }
    debug!(vertices = points.len(), "constrained Delaunay failed, using fan");

    Some(PolygonTriangulation {
        triangles: fan(&flat, min_area),
        method: TriangulationMethod::Fan,
    })
}

/// Fan from vertex 0, skipping slivers.
#[must_use]
pub fn fan(flat: &[Point2], min_area: f64) -> Vec<[usize; 3]> {
    (1..flat.len().saturating_sub(1))
        .map(|i| [0, i, i + 1])
        .filter(|t| 0.5 * orient_2d(&flat[t[0]], &flat[t[1]], &flat[t[2]]).abs() >= min_area)
        .collect()
}

/// CDT of a counter-clockwise simple loop, keeping faces inside the loop.
fn constrained_delaunay(flat: &[Point2], min_area: f64) -> Option<Vec<[usize; 3]>> {
    let mut cdt = ConstrainedDelaunayTriangulation::<SpadePoint2<f64>>::new();
    let mut handles = Vec::with_capacity(flat.len());
    let mut by_handle: HashMap<usize, usize> = HashMap::new();

    for (i, p) in flat.iter().enumerate() {
        let h = cdt.insert(SpadePoint2::new(p.x, p.y)).ok()?;
        if by_handle.insert(h.index(), i).is_some() {
            // Duplicate positions would alias two loop vertices.
            return None;
        }
        handles.push(h);
    }

    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from == to {
            continue;
        }
        if !cdt.can_add_constraint(from, to) {
            return None;
        }
        cdt.add_constraint(from, to);
    }

    let mut triangles = Vec::new();
    for face in cdt.inner_faces() {
        let verts = face.vertices();
        let mut tri = [0usize; 3];
        for (slot, vh) in verts.iter().enumerate() {
            tri[slot] = *by_handle.get(&vh.fix().index())?;
        }
        let (a, b, c) = (&flat[tri[0]], &flat[tri[1]], &flat[tri[2]]);
        let centre = Point2::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0);
        if winding_number_2d(&centre, flat) == 0 {
            continue;
        }
        let doubled = orient_2d(a, b, c);
        if doubled.abs() * 0.5 < min_area {
            continue;
        }
        if doubled < 0.0 {
            tri.swap(1, 2);
        }
        triangles.push(tri);
    }
    Some(triangles)
}
