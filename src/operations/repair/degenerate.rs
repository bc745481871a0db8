use crate::mesh::TriMesh;

/// Minimum triangle area kept for a fillet of radius `radius`.
#[must_use]
pub fn degenerate_area_threshold(radius: f64) -> f64 {
    (1e-8 * radius * radius).max(1e-12)
}

/// Removes triangles with area below `min_area`, then compacts vertices.
///
/// Returns the number of triangles removed.
pub fn remove_degenerate_triangles(mesh: &mut TriMesh, min_area: f64) -> usize {
    let keep: Vec<bool> = (0..mesh.len())
        .map(|i| mesh.triangle_area(i) >= min_area)
        .collect();
    let removed = mesh.retain_triangles(|i| keep[i]);
    if removed > 0 {
        mesh.compact_vertices();
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::mesh::test_meshes::tetrahedron;

    #[test]
    fn threshold_scales_with_radius_and_has_floor() {
        assert!((degenerate_area_threshold(10.0) - 1e-6).abs() < 1e-18);
        assert!((degenerate_area_threshold(1e-4) - 1e-12).abs() < 1e-24);
    }

    #[test]
    fn removes_sliver_and_its_vertex() {
        let mut mesh = tetrahedron();
        let v = mesh.push_vertex(Point3::new(0.5, 0.0, 0.0));
        mesh.push_triangle([0, 1, v], 9);
        assert_eq!(remove_degenerate_triangles(&mut mesh, 1e-12), 1);
        assert_eq!(mesh.len(), 4);
        assert_eq!(mesh.vertices.len(), 4);
    }

    #[test]
    fn keeps_valid_triangles() {
        let mut mesh = tetrahedron();
        assert_eq!(remove_degenerate_triangles(&mut mesh, 1e-12), 0);
    }
}
