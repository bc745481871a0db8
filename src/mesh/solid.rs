use std::cell::OnceCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::face_table::{FaceMetadata, FaceTable, MetaValue};
use super::TriMesh;
use crate::math::{triangle_area, Point3};
use crate::operations::boolean::EngineMesh;

static NEXT_SOLID_ID: AtomicU64 = AtomicU64::new(1);

/// A named auxiliary polyline carried alongside a solid for overlays
/// (tangency rails, centre lines).
#[derive(Debug, Clone, PartialEq)]
pub struct AuxEdge {
    pub name: String,
    pub points: Vec<Point3>,
    pub closed: bool,
}

/// A triangulated solid with named faces.
///
/// Owns its authoring buffers exclusively. The engine-side mesh is built
/// lazily on first demand, reset whenever the buffers are borrowed mutably,
/// and released when the solid is dropped. A clone is a new instance with
/// its own cache key.
#[derive(Debug)]
pub struct Solid {
    name: String,
    instance: u64,
    revision: u64,
    mesh: TriMesh,
    faces: FaceTable,
    metadata: HashMap<String, FaceMetadata>,
    aux_edges: Vec<AuxEdge>,
    vertex_lookup: Option<HashMap<[u64; 3], u32>>,
    engine_mesh: OnceCell<EngineMesh>,
}

impl Solid {
    /// Creates an empty solid.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self::from_parts(name, TriMesh::new(), FaceTable::new())
    }

    /// Creates a solid from existing buffers and a face table.
    #[must_use]
    pub fn from_parts(name: &str, mesh: TriMesh, faces: FaceTable) -> Self {
        Self {
            name: name.to_owned(),
            instance: NEXT_SOLID_ID.fetch_add(1, Ordering::Relaxed),
            revision: 0,
            mesh,
            faces,
            metadata: HashMap::new(),
            aux_edges: Vec::new(),
            vertex_lookup: None,
            engine_mesh: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity string used to key per-solid caches; changes whenever the
    /// authoring buffers change.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{}#{}r{}", self.name, self.instance, self.revision)
    }

    #[must_use]
    pub fn mesh(&self) -> &TriMesh {
        &self.mesh
    }

    /// Mutable access to the authoring buffers. Marks the engine mesh dirty.
    pub fn mesh_mut(&mut self) -> &mut TriMesh {
        self.touch();
        &mut self.mesh
    }

    #[must_use]
    pub fn faces(&self) -> &FaceTable {
        &self.faces
    }

    pub fn faces_mut(&mut self) -> &mut FaceTable {
        &mut self.faces
    }

    /// Mesh and face table borrowed together, for repair passes that add
    /// named faces. Marks the engine mesh dirty.
    pub fn buffers_mut(&mut self) -> (&mut TriMesh, &mut FaceTable) {
        self.touch();
        (&mut self.mesh, &mut self.faces)
    }

    /// Adds a triangle to the named face, creating the face if needed.
    /// Vertices at bit-identical positions are shared.
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_triangle(&mut self, face: &str, p1: Point3, p2: Point3, p3: Point3) {
        let id = self.faces.ensure(face);
        self.touch_engine_only();
        let lookup = self.vertex_lookup.get_or_insert_with(|| {
            let mut map = HashMap::with_capacity(self.mesh.vertices.len());
            for (i, v) in self.mesh.vertices.iter().enumerate() {
                map.entry(position_key(v)).or_insert(i as u32);
            }
            map
        });
        let mut tri = [0u32; 3];
        for (slot, p) in [p1, p2, p3].into_iter().enumerate() {
            let key = position_key(&p);
            tri[slot] = match lookup.get(&key) {
                Some(&i) => i,
                None => {
                    let i = self.mesh.push_vertex(p);
                    lookup.insert(key, i);
                    i
                }
            };
        }
        self.mesh.push_triangle(tri, id);
    }

    /// Sorted names of faces that own at least one triangle.
    #[must_use]
    pub fn face_names(&self) -> Vec<String> {
        let mut used: Vec<String> = self
            .used_face_ids()
            .into_iter()
            .filter_map(|id| self.faces.name(id).map(str::to_owned))
            .collect();
        used.sort();
        used
    }

    /// Triangle indices belonging to `face`.
    #[must_use]
    pub fn face_triangle_indices(&self, face: &str) -> Vec<usize> {
        let Some(id) = self.faces.id(face) else {
            return Vec::new();
        };
        self.mesh
            .face_ids
            .iter()
            .enumerate()
            .filter(|(_, &f)| f == id)
            .map(|(i, _)| i)
            .collect()
    }

    /// Corner positions of every triangle of `face`.
    #[must_use]
    pub fn face_triangles(&self, face: &str) -> Vec<[Point3; 3]> {
        self.face_triangle_indices(face)
            .into_iter()
            .map(|i| self.mesh.corners(i))
            .collect()
    }

    /// Total area of `face`; zero for unknown faces.
    #[must_use]
    pub fn face_area(&self, face: &str) -> f64 {
        self.face_triangles(face)
            .iter()
            .map(|[a, b, c]| triangle_area(a, b, c))
            .sum()
    }

    /// Signed enclosed volume.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.mesh.signed_volume()
    }

    #[must_use]
    pub fn face_metadata(&self, face: &str) -> Option<&FaceMetadata> {
        self.metadata.get(face)
    }

    pub fn set_face_metadata(&mut self, face: &str, key: &str, value: impl Into<MetaValue>) {
        self.metadata
            .entry(face.to_owned())
            .or_default()
            .insert(key.to_owned(), value.into());
    }

    #[must_use]
    pub fn metadata(&self) -> &HashMap<String, FaceMetadata> {
        &self.metadata
    }

    /// Merges face metadata from another map; incoming keys win.
    pub fn merge_metadata(&mut self, other: &HashMap<String, FaceMetadata>) {
        for (face, meta) in other {
            let entry = self.metadata.entry(face.clone()).or_default();
            for (k, v) in meta {
                entry.insert(k.clone(), v.clone());
            }
        }
    }

    #[must_use]
    pub fn aux_edges(&self) -> &[AuxEdge] {
        &self.aux_edges
    }

    pub fn add_aux_edge(&mut self, name: &str, points: Vec<Point3>, closed: bool) {
        self.aux_edges.push(AuxEdge {
            name: name.to_owned(),
            points,
            closed,
        });
    }

    pub fn extend_aux_edges(&mut self, edges: &[AuxEdge]) {
        self.aux_edges.extend_from_slice(edges);
    }

    /// Face IDs used by triangles but missing from the face table.
    #[must_use]
    pub fn unknown_face_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .used_face_ids()
            .into_iter()
            .filter(|id| !self.faces.contains_id(*id))
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Drops face table entries (and their metadata) that own no triangles.
    pub fn prune_faces(&mut self) -> usize {
        let used = self.used_face_ids();
        let unused: Vec<(u32, String)> = self
            .faces
            .iter()
            .filter(|(id, _)| !used.contains(id))
            .map(|(id, name)| (id, name.to_owned()))
            .collect();
        let mut kept = FaceTable::new();
        for (id, name) in self.faces.iter() {
            if used.contains(&id) {
                kept.bind(id, name);
            }
        }
        self.faces = kept;
        for (_, name) in &unused {
            self.metadata.remove(name);
        }
        unused.len()
    }

    /// Engine-side mesh, built on first demand from the authoring buffers.
    pub fn engine_mesh(&self) -> &EngineMesh {
        self.engine_mesh
            .get_or_init(|| EngineMesh::from_tri_mesh(&self.mesh))
    }

    /// `true` if an engine mesh is currently cached.
    #[must_use]
    pub fn has_engine_mesh(&self) -> bool {
        self.engine_mesh.get().is_some()
    }

    /// Drops the cached engine mesh; it is rebuilt on next demand.
    pub fn release_engine_mesh(&mut self) {
        self.engine_mesh.take();
    }

    fn used_face_ids(&self) -> Vec<u32> {
        let mut ids = self.mesh.face_ids.clone();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn touch(&mut self) {
        self.touch_engine_only();
        self.vertex_lookup = None;
    }

    fn touch_engine_only(&mut self) {
        self.revision += 1;
        self.engine_mesh.take();
    }
}

impl Clone for Solid {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            instance: NEXT_SOLID_ID.fetch_add(1, Ordering::Relaxed),
            revision: 0,
            mesh: self.mesh.clone(),
            faces: self.faces.clone(),
            metadata: self.metadata.clone(),
            aux_edges: self.aux_edges.clone(),
            vertex_lookup: self.vertex_lookup.clone(),
            engine_mesh: self.engine_mesh.clone(),
        }
    }
}

fn position_key(p: &Point3) -> [u64; 3] {
    // Adding 0.0 folds -0.0 into +0.0.
    [
        (p.x + 0.0).to_bits(),
        (p.y + 0.0).to_bits(),
        (p.z + 0.0).to_bits(),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn two_faced() -> Solid {
        let mut solid = Solid::new("quad");
        solid.add_triangle("A", p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0));
        solid.add_triangle("B", p(0.0, 0.0, 0.0), p(1.0, 1.0, 0.0), p(0.0, 1.0, 0.0));
        solid
    }

    #[test]
    fn add_triangle_shares_vertices() {
        let solid = two_faced();
        assert_eq!(solid.mesh().vertices.len(), 4);
        assert_eq!(solid.mesh().len(), 2);
        assert_eq!(solid.face_names(), vec!["A".to_owned(), "B".to_owned()]);
        assert!(solid.unknown_face_ids().is_empty());
    }

    #[test]
    fn face_queries() {
        let solid = two_faced();
        assert_eq!(solid.face_triangles("A").len(), 1);
        assert!((solid.face_area("B") - 0.5).abs() < 1e-12);
        assert!(solid.face_triangles("C").is_empty());
    }

    #[test]
    fn negative_zero_is_shared() {
        let mut solid = Solid::new("z");
        solid.add_triangle("A", p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0));
        solid.add_triangle("A", p(-0.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(-1.0, 0.0, 0.0));
        assert_eq!(solid.mesh().vertices.len(), 4);
    }

    #[test]
    fn engine_mesh_is_cached_and_invalidated() {
        let mut solid = two_faced();
        assert!(!solid.has_engine_mesh());
        assert_eq!(solid.engine_mesh().triangle_count(), 2);
        assert!(solid.has_engine_mesh());

        let before = solid.cache_key();
        solid.mesh_mut().flip(0);
        assert!(!solid.has_engine_mesh());
        assert_ne!(before, solid.cache_key());

        solid.engine_mesh();
        solid.release_engine_mesh();
        assert!(!solid.has_engine_mesh());
    }

    #[test]
    fn clones_get_their_own_cache_key() {
        let solid = two_faced();
        let copy = solid.clone();
        assert_ne!(solid.cache_key(), copy.cache_key());
        assert_eq!(copy.face_names(), solid.face_names());
    }

    #[test]
    fn add_after_mutation_rebuilds_lookup() {
        let mut solid = two_faced();
        solid.mesh_mut().vertices[3] = p(0.0, 2.0, 0.0);
        solid.add_triangle("A", p(0.0, 2.0, 0.0), p(1.0, 1.0, 0.0), p(1.0, 2.0, 0.0));
        assert_eq!(solid.mesh().vertices.len(), 5);
    }

    #[test]
    fn metadata_and_pruning() {
        let mut solid = two_faced();
        solid.set_face_metadata("A", "radius", 0.25);
        solid.set_face_metadata("GHOST", "radius", 1.0);
        solid.faces_mut().ensure("GHOST");
        assert_eq!(solid.prune_faces(), 1);
        assert!(solid.face_metadata("GHOST").is_none());
        let meta = solid.face_metadata("A").unwrap();
        assert_eq!(meta.get("radius").and_then(MetaValue::as_number), Some(0.25));
    }
}
