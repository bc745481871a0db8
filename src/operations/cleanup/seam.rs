use std::collections::BTreeSet;

use tracing::debug;

use super::SeamParams;
use crate::math::polyline::{closest_point, polyline_length};
use crate::math::Point3;
use crate::mesh::{AuxEdge, EdgeSource, Solid};
use crate::operations::repair::FaceRole;

/// Tangency overlays (`*_TANGENT_A`, `*_TANGENT_B`) carried by `solid`.
#[must_use]
pub fn tangent_curves(solid: &Solid) -> Vec<AuxEdge> {
    solid
        .aux_edges()
        .iter()
        .filter(|e| e.name.ends_with("_TANGENT_A") || e.name.ends_with("_TANGENT_B"))
        .filter(|e| e.points.len() >= 2)
        .cloned()
        .collect()
}

/// Moves vertices on the borders of round faces onto the nearest tangency
/// curve when they lie within `snap_scale * radius` of it.
///
/// On open curves, vertices projecting within `endpoint_guard * radius` of
/// either end are skipped so end caps keep their shape.
///
/// Returns the number of vertices moved.
pub fn snap_seams(solid: &mut Solid, curves: &[AuxEdge], radius: f64, params: &SeamParams) -> usize {
    if curves.is_empty() {
        return 0;
    }
    let reach = params.snap_scale * radius;
    let guard = params.endpoint_guard * radius;

    let candidates: BTreeSet<u32> = solid
        .boundary_edge_polylines()
        .into_iter()
        .filter(|pl| {
            FaceRole::from_name(&pl.face_a) == FaceRole::Arc || FaceRole::from_name(&pl.face_b) == FaceRole::Arc
        })
        .flat_map(|pl| pl.indices)
        .collect();

    let lengths: Vec<f64> = curves.iter().map(|c| polyline_length(&c.points, c.closed)).collect();
    let mut moves: Vec<(usize, Point3)> = Vec::new();
    for v in candidates {
        let p = solid.mesh().vertices[v as usize];
        let best = curves
            .iter()
            .zip(&lengths)
            .filter_map(|(curve, &length)| closest_point(&curve.points, curve.closed, &p).map(|hit| (curve, length, hit)))
            .min_by(|a, b| a.2.distance.total_cmp(&b.2.distance));
        let Some((curve, length, hit)) = best else {
            continue;
        };
        if hit.distance > reach || hit.distance <= 0.0 {
            continue;
        }
        if !curve.closed && (hit.arc_length < guard || hit.arc_length > length - guard) {
            continue;
        }
        moves.push((v as usize, hit.point));
    }

    if !moves.is_empty() {
        let mesh = solid.mesh_mut();
        for (v, p) in &moves {
            mesh.vertices[*v] = *p;
        }
    }
    debug!(snapped = moves.len(), curves = curves.len(), "seam snap finished");
    moves.len()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Unit cube whose top face is a fillet arc face.
    fn arc_topped_cube() -> Solid {
        let mut solid = Solid::new("cube");
        let p = |x: f64, y: f64, z: f64| Point3::new(x, y, z);
        let quads = [
            ("F_ARC", [p(0., 0., 1.), p(1., 0., 1.), p(1., 1., 1.), p(0., 1., 1.)]),
            ("BOTTOM", [p(0., 0., 0.), p(0., 1., 0.), p(1., 1., 0.), p(1., 0., 0.)]),
            ("FRONT", [p(0., 0., 0.), p(1., 0., 0.), p(1., 0., 1.), p(0., 0., 1.)]),
            ("BACK", [p(0., 1., 0.), p(0., 1., 1.), p(1., 1., 1.), p(1., 1., 0.)]),
            ("LEFT", [p(0., 0., 0.), p(0., 0., 1.), p(0., 1., 1.), p(0., 1., 0.)]),
            ("RIGHT", [p(1., 0., 0.), p(1., 1., 0.), p(1., 1., 1.), p(1., 0., 1.)]),
        ];
        for (name, [a, b, c, d]) in quads {
            solid.add_triangle(name, a, b, c);
            solid.add_triangle(name, a, c, d);
        }
        solid
    }

    fn curve(from: f64, to: f64, closed: bool) -> AuxEdge {
        AuxEdge {
            name: "F_TANGENT_A".into(),
            points: vec![Point3::new(from, 0.0, 1.001), Point3::new(to, 0.0, 1.001)],
            closed,
        }
    }

    #[test]
    fn snaps_interior_seam_vertices() {
        let mut solid = arc_topped_cube();
        let moved = snap_seams(&mut solid, &[curve(-1.0, 2.0, false)], 0.1, &SeamParams::default());
        assert_eq!(moved, 2);
        let lifted = solid
            .mesh()
            .vertices
            .iter()
            .filter(|v| (v.z - 1.001).abs() < 1e-12)
            .count();
        assert_eq!(lifted, 2);
    }

    #[test]
    fn open_curve_ends_are_guarded() {
        let mut solid = arc_topped_cube();
        let key = solid.cache_key();
        assert_eq!(snap_seams(&mut solid, &[curve(0.0, 1.0, false)], 0.1, &SeamParams::default()), 0);
        assert_eq!(solid.cache_key(), key);
    }

    #[test]
    fn far_vertices_stay() {
        let mut solid = arc_topped_cube();
        let params = SeamParams::default().with_snap_scale(0.001);
        assert_eq!(snap_seams(&mut solid, &[curve(-1.0, 2.0, false)], 0.1, &params), 0);
    }

    #[test]
    fn picks_tangent_overlays_only() {
        let mut solid = arc_topped_cube();
        solid.add_aux_edge("F_TANGENT_A", vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)], false);
        solid.add_aux_edge("F_CENTERLINE", vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)], false);
        let curves = tangent_curves(&solid);
        assert_eq!(curves.len(), 1);
        assert_relative_eq!(polyline_length(&curves[0].points, false), 1.0);
    }
}
