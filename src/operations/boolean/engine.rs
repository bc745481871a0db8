use crate::error::{Result, TopologyError};
use crate::math::Point3;
use crate::mesh::{EdgeAdjacency, TriMesh};

/// Boolean operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    /// `a ∪ b`
    Union,
    /// `a \ b`
    Subtract,
    /// `a ∩ b`
    Intersect,
    /// Symmetric difference `(a \ b) ∪ (b \ a)`.
    Difference,
}

/// Indexed triangle mesh in the layout boolean engines consume: flat
/// coordinates, flat triangle indices and one integer tag per triangle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineMesh {
    pub positions: Vec<f64>,
    pub indices: Vec<u32>,
    pub tags: Vec<u32>,
}

impl EngineMesh {
    /// Flattens a [`TriMesh`]; face IDs become tags.
    #[must_use]
    pub fn from_tri_mesh(mesh: &TriMesh) -> Self {
        Self {
            positions: mesh
                .vertices
                .iter()
                .flat_map(|p| [p.x, p.y, p.z])
                .collect(),
            indices: mesh.triangles.iter().flatten().copied().collect(),
            tags: mesh.face_ids.clone(),
        }
    }

    /// Rebuilds a [`TriMesh`]; tags become face IDs.
    #[must_use]
    pub fn to_tri_mesh(&self) -> TriMesh {
        TriMesh {
            vertices: (0..self.vertex_count()).map(|i| self.vertex(i)).collect(),
            triangles: (0..self.triangle_count()).map(|t| self.triangle(t)).collect(),
            face_ids: self.tags.clone(),
        }
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[must_use]
    pub fn vertex(&self, i: usize) -> Point3 {
        Point3::new(
            self.positions[3 * i],
            self.positions[3 * i + 1],
            self.positions[3 * i + 2],
        )
    }

    #[must_use]
    pub fn triangle(&self, t: usize) -> [u32; 3] {
        [
            self.indices[3 * t],
            self.indices[3 * t + 1],
            self.indices[3 * t + 2],
        ]
    }

    /// Signed enclosed volume.
    #[must_use]
    pub fn signed_volume(&self) -> f64 {
        let mut six_v = 0.0;
        for t in 0..self.triangle_count() {
            let [a, b, c] = self.triangle(t).map(|i| self.vertex(i as usize));
            six_v += a.coords.dot(&b.coords.cross(&c.coords));
        }
        six_v / 6.0
    }

    /// Checks that the mesh is a closed, consistently wound 2-manifold.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::NotManifold`] with the offending edge counts.
    pub fn check_closed_manifold(&self) -> Result<()> {
        let triangles: Vec<[u32; 3]> = (0..self.triangle_count()).map(|t| self.triangle(t)).collect();
        let adjacency = EdgeAdjacency::build(&triangles);
        if adjacency.is_closed_manifold() {
            return Ok(());
        }
        Err(TopologyError::NotManifold {
            boundary: adjacency.boundary_edge_count(),
            non_manifold: adjacency.non_manifold_edge_count(),
            inconsistent: adjacency.inconsistent_edge_count(),
        }
        .into())
    }
}

/// Contract of the external boolean-mesh engine.
///
/// Implementations may renumber vertices and split triangles but must carry
/// each output triangle's tag from the input triangle it came from.
pub trait MeshEngine {
    /// Combines two tagged meshes.
    ///
    /// # Errors
    ///
    /// Returns a [`BooleanError`](crate::error::BooleanError) if an operand is
    /// rejected or the operation fails.
    fn boolean(&self, a: &EngineMesh, b: &EngineMesh, op: BooleanOp) -> Result<EngineMesh>;

    /// Convex hull of a point set; every triangle gets `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error for degenerate (e.g. coplanar) point sets.
    fn convex_hull(&self, points: &[Point3], tag: u32) -> Result<EngineMesh>;

    /// Simplifies a mesh, merging features below `tolerance`. Tags of
    /// surviving triangles are kept, but callers must not rely on that.
    ///
    /// # Errors
    ///
    /// Returns an error if simplification fails.
    fn simplify(&self, mesh: &EngineMesh, tolerance: f64) -> Result<EngineMesh>;

    /// Checks whether a mesh is acceptable as a boolean operand.
    ///
    /// # Errors
    ///
    /// Returns an error describing why the mesh is rejected.
    fn validate(&self, mesh: &EngineMesh) -> Result<()>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::test_meshes::{cube, tetrahedron};

    #[test]
    fn flat_layout_round_trips_counts() {
        let mesh = cube(1.0);
        let flat = EngineMesh::from_tri_mesh(&mesh);
        assert_eq!(flat.vertex_count(), 8);
        assert_eq!(flat.triangle_count(), 12);
        assert_eq!(flat.tags.len(), 12);
        assert!((flat.signed_volume() - 1.0).abs() < 1e-12);
        let back = flat.to_tri_mesh();
        assert_eq!(back.triangles, mesh.triangles);
    }

    #[test]
    fn closed_manifold_check() {
        let ok = EngineMesh::from_tri_mesh(&tetrahedron());
        assert!(ok.check_closed_manifold().is_ok());

        let mut open = tetrahedron();
        open.retain_triangles(|i| i != 0);
        let err = EngineMesh::from_tri_mesh(&open).check_closed_manifold().unwrap_err();
        assert!(err.to_string().contains("3 boundary"));
    }
}
