pub mod adjacency;
pub mod face_table;
pub mod solid;
pub mod source;

pub use adjacency::EdgeAdjacency;
pub use face_table::{allocate_face_id, FaceMetadata, FaceTable, MetaValue};
pub use solid::{AuxEdge, Solid};
pub use source::{BoundaryPolyline, EdgeSelection, EdgeSource, MeshSource};

use crate::math::{triangle_area, triangle_cross, Point3};

/// Indexed triangle buffers with a parallel per-triangle face ID.
///
/// This is the authoring representation every repair pass works on. Face IDs
/// are opaque here; their names live in a [`FaceTable`].
#[derive(Debug, Clone, Default)]
pub struct TriMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Triangle vertex indices.
    pub triangles: Vec<[u32; 3]>,
    /// Face ID of each triangle (same length as `triangles`).
    pub face_ids: Vec<u32>,
}

impl TriMesh {
    /// Creates a new, empty mesh.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of triangles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Returns `true` if the mesh has no triangles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Appends a vertex and returns its index.
    #[allow(clippy::cast_possible_truncation)]
    pub fn push_vertex(&mut self, p: Point3) -> u32 {
        self.vertices.push(p);
        (self.vertices.len() - 1) as u32
    }

    /// Appends a triangle with its face ID.
    pub fn push_triangle(&mut self, tri: [u32; 3], face_id: u32) {
        self.triangles.push(tri);
        self.face_ids.push(face_id);
    }

    /// Corner positions of triangle `i`.
    #[must_use]
    pub fn corners(&self, i: usize) -> [Point3; 3] {
        let [a, b, c] = self.triangles[i];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Area of triangle `i`.
    #[must_use]
    pub fn triangle_area(&self, i: usize) -> f64 {
        let [a, b, c] = self.corners(i);
        triangle_area(&a, &b, &c)
    }

    /// Signed enclosed volume (divergence theorem); positive for an outward
    /// oriented closed mesh.
    #[must_use]
    pub fn signed_volume(&self) -> f64 {
        let mut six_v = 0.0;
        for i in 0..self.triangles.len() {
            let [a, b, c] = self.corners(i);
            six_v += a.coords.dot(&b.coords.cross(&c.coords));
        }
        six_v / 6.0
    }

    /// Total surface area.
    #[must_use]
    pub fn surface_area(&self) -> f64 {
        (0..self.triangles.len()).map(|i| self.triangle_area(i)).sum()
    }

    /// Area-weighted unit normal of triangle `i`, or `None` if degenerate.
    #[must_use]
    pub fn triangle_normal(&self, i: usize) -> Option<nalgebra::Vector3<f64>> {
        let [a, b, c] = self.corners(i);
        triangle_cross(&a, &b, &c).try_normalize(1e-300)
    }

    /// Reverses the winding of triangle `i`.
    pub fn flip(&mut self, i: usize) {
        self.triangles[i].swap(1, 2);
    }

    /// Keeps only triangles for which `keep(index)` is true.
    pub fn retain_triangles<F: FnMut(usize) -> bool>(&mut self, mut keep: F) -> usize {
        let before = self.triangles.len();
        let mut tris = Vec::with_capacity(before);
        let mut ids = Vec::with_capacity(before);
        for i in 0..before {
            if keep(i) {
                tris.push(self.triangles[i]);
                ids.push(self.face_ids[i]);
            }
        }
        self.triangles = tris;
        self.face_ids = ids;
        before - self.triangles.len()
    }

    /// Removes unreferenced vertices and re-indexes triangles.
    ///
    /// Returns the number of vertices removed.
    #[allow(clippy::cast_possible_truncation)]
    pub fn compact_vertices(&mut self) -> usize {
        let mut remap = vec![u32::MAX; self.vertices.len()];
        let mut kept = Vec::with_capacity(self.vertices.len());
        for tri in &mut self.triangles {
            for v in tri.iter_mut() {
                let old = *v as usize;
                if remap[old] == u32::MAX {
                    remap[old] = kept.len() as u32;
                    kept.push(self.vertices[old]);
                }
                *v = remap[old];
            }
        }
        let removed = self.vertices.len() - kept.len();
        self.vertices = kept;
        removed
    }

    /// Appends another mesh, offsetting its indices.
    #[allow(clippy::cast_possible_truncation)]
    pub fn append(&mut self, other: &TriMesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        for (tri, &id) in other.triangles.iter().zip(&other.face_ids) {
            self.push_triangle([tri[0] + offset, tri[1] + offset, tri[2] + offset], id);
        }
    }
}

#[cfg(test)]
pub(crate) mod test_meshes {
    use super::TriMesh;
    use crate::math::Point3;

    /// Closed, outward-oriented unit tetrahedron (volume 1/6).
    pub fn tetrahedron() -> TriMesh {
        let mut mesh = TriMesh::new();
        mesh.vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        mesh.push_triangle([0, 2, 1], 1);
        mesh.push_triangle([0, 1, 3], 2);
        mesh.push_triangle([0, 3, 2], 3);
        mesh.push_triangle([1, 2, 3], 4);
        mesh
    }

    /// Closed, outward-oriented axis-aligned cube `[0, s]^3`, one face ID per side.
    pub fn cube(s: f64) -> TriMesh {
        let mut mesh = TriMesh::new();
        for &(x, y, z) in &[
            (0.0, 0.0, 0.0),
            (s, 0.0, 0.0),
            (s, s, 0.0),
            (0.0, s, 0.0),
            (0.0, 0.0, s),
            (s, 0.0, s),
            (s, s, s),
            (0.0, s, s),
        ] {
            mesh.vertices.push(Point3::new(x, y, z));
        }
        let quads: [([u32; 4], u32); 6] = [
            ([0, 3, 2, 1], 1), // bottom
            ([4, 5, 6, 7], 2), // top
            ([0, 1, 5, 4], 3), // front
            ([2, 3, 7, 6], 4), // back
            ([0, 4, 7, 3], 5), // left
            ([1, 2, 6, 5], 6), // right
        ];
        for (q, id) in quads {
            mesh.push_triangle([q[0], q[1], q[2]], id);
            mesh.push_triangle([q[0], q[2], q[3]], id);
        }
        mesh
    }
}
