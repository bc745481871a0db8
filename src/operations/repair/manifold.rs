use std::collections::HashSet;

use tracing::debug;

use crate::mesh::{EdgeAdjacency, FaceTable, TriMesh};

/// Role of a face in a fillet tool, used to decide which triangles survive
/// on over-used edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FaceRole {
    Other,
    Side,
    Cap,
    Arc,
}

impl FaceRole {
    /// Classifies a face by its name suffix.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name.ends_with("_ARC") || name.ends_with("_TUBE_Outer") || name.ends_with("_TUBE_Inner") {
            Self::Arc
        } else if ["_CAP_", "_ENDCAP_", "_PATCH_", "_TUBE_Cap"]
            .iter()
            .any(|s| name.contains(s))
        {
            Self::Cap
        } else if name.contains("_SIDE_") {
            Self::Side
        } else {
            Self::Other
        }
    }

    /// Role of the face with ID `id` in `faces`.
    #[must_use]
    pub fn of(faces: &FaceTable, id: u32) -> Self {
        faces.name(id).map_or(Self::Other, Self::from_name)
    }
}

/// Drops surplus triangles until every edge is used at most twice.
///
/// On an edge with more than two triangles the survivors are the two with the
/// highest role, then the largest area. Runs up to `max_passes` passes.
///
/// Returns the number of triangles dropped.
pub fn enforce_manifold(mesh: &mut TriMesh, faces: &FaceTable, max_passes: usize) -> usize {
    let mut total = 0;
    for pass in 0..max_passes {
        let adjacency = EdgeAdjacency::build(&mesh.triangles);
        let mut drop: HashSet<usize> = HashSet::new();

        let mut edges: Vec<(u32, u32)> = adjacency.non_manifold_edges().collect();
        if edges.is_empty() {
            break;
        }
        edges.sort_unstable();

        for (a, b) in edges {
            let mut users: Vec<usize> = adjacency
                .uses(a, b)
                .iter()
                .map(|u| u.triangle)
                .filter(|t| !drop.contains(t))
                .collect();
            if users.len() <= 2 {
                continue;
            }
            users.sort_by(|&x, &y| {
                let rx = FaceRole::of(faces, mesh.face_ids[x]);
                let ry = FaceRole::of(faces, mesh.face_ids[y]);
                ry.cmp(&rx)
                    .then_with(|| mesh.triangle_area(y).total_cmp(&mesh.triangle_area(x)))
                    .then_with(|| x.cmp(&y))
            });
            drop.extend(users.into_iter().skip(2));
        }

        if drop.is_empty() {
            break;
        }
        debug!(pass, dropped = drop.len(), "dropping surplus triangles on non-manifold edges");
        total += mesh.retain_triangles(|t| !drop.contains(&t));
    }
    if total > 0 {
        mesh.compact_vertices();
    }
    total
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::mesh::test_meshes::cube;

    #[test]
    fn role_from_name() {
        assert_eq!(FaceRole::from_name("FILLET1_ARC"), FaceRole::Arc);
        assert_eq!(FaceRole::from_name("FILLET1_CAP_START"), FaceRole::Cap);
        assert_eq!(FaceRole::from_name("FILLET1_PATCH_2"), FaceRole::Cap);
        assert_eq!(FaceRole::from_name("FILLET1_SIDE_A"), FaceRole::Side);
        assert_eq!(FaceRole::from_name("TOP"), FaceRole::Other);
        assert!(FaceRole::Arc > FaceRole::Cap && FaceRole::Cap > FaceRole::Side);
    }

    #[test]
    fn drops_lowest_priority_fin() {
        let mut faces = FaceTable::new();
        let arc = faces.ensure("F_ARC");
        let side = faces.ensure("F_SIDE_A");
        let cap = faces.ensure("F_CAP_END");

        let mut mesh = TriMesh::new();
        mesh.vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
            Point3::new(0.5, 0.0, 5.0),
        ];
        mesh.push_triangle([0, 1, 2], arc);
        mesh.push_triangle([1, 0, 3], cap);
        mesh.push_triangle([0, 1, 4], side);

        assert_eq!(enforce_manifold(&mut mesh, &faces, 4), 1);
        assert_eq!(mesh.len(), 2);
        assert!(!mesh.face_ids.contains(&side));
        assert_eq!(mesh.vertices.len(), 4);
    }

    #[test]
    fn manifold_mesh_is_untouched() {
        let mut mesh = cube(1.0);
        assert_eq!(enforce_manifold(&mut mesh, &FaceTable::new(), 4), 0);
        assert_eq!(mesh.len(), 12);
    }
}
