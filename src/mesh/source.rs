//! Narrow views of a solid consumed by the fillet kernel.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::adjacency::EdgeAdjacency;
use super::face_table::FaceMetadata;
use super::solid::Solid;
use crate::error::{Result, ValidationError};
use crate::math::polyline::{normalize_closed, polyline_length};
use crate::math::{Point3, TOLERANCE};

/// Face-level read access to a triangulated solid.
pub trait MeshSource {
    /// Identity string for caching; changes when the geometry changes.
    fn identity(&self) -> String;

    /// Names of faces that own triangles.
    fn face_names(&self) -> Vec<String>;

    /// Corner positions of every triangle of `face`.
    fn face_triangles(&self, face: &str) -> Vec<[Point3; 3]>;

    /// Metadata of `face`, if any.
    fn face_metadata(&self, face: &str) -> Option<&FaceMetadata>;
}

/// A chain of mesh edges separating two faces.
#[derive(Debug, Clone)]
pub struct BoundaryPolyline {
    pub positions: Vec<Point3>,
    pub indices: Vec<u32>,
    pub face_a: String,
    pub face_b: String,
    pub closed: bool,
}

/// Access to the edges between faces of a solid.
pub trait EdgeSource {
    fn boundary_edge_polylines(&self) -> Vec<BoundaryPolyline>;
}

impl MeshSource for Solid {
    fn identity(&self) -> String {
        self.cache_key()
    }

    fn face_names(&self) -> Vec<String> {
        Solid::face_names(self)
    }

    fn face_triangles(&self, face: &str) -> Vec<[Point3; 3]> {
        Solid::face_triangles(self, face)
    }

    fn face_metadata(&self, face: &str) -> Option<&FaceMetadata> {
        Solid::face_metadata(self, face)
    }
}

impl EdgeSource for Solid {
    fn boundary_edge_polylines(&self) -> Vec<BoundaryPolyline> {
        let mesh = self.mesh();
        let adjacency = EdgeAdjacency::build(&mesh.triangles);

        // Undirected edges grouped by the (sorted) pair of faces they separate.
        let mut by_pair: BTreeMap<(u32, u32), Vec<(u32, u32)>> = BTreeMap::new();
        for (edge, uses) in adjacency.iter() {
            if uses.len() != 2 {
                continue;
            }
            let fa = mesh.face_ids[uses[0].triangle];
            let fb = mesh.face_ids[uses[1].triangle];
            if fa == fb {
                continue;
            }
            by_pair.entry((fa.min(fb), fa.max(fb))).or_default().push(edge);
        }

        let mut out = Vec::new();
        for ((fa, fb), edges) in by_pair {
            let (Some(name_a), Some(name_b)) = (self.faces().name(fa), self.faces().name(fb)) else {
                continue;
            };
            for (indices, closed) in chain_edges(&edges) {
                out.push(BoundaryPolyline {
                    positions: indices.iter().map(|&i| mesh.vertices[i as usize]).collect(),
                    indices,
                    face_a: name_a.to_owned(),
                    face_b: name_b.to_owned(),
                    closed,
                });
            }
        }
        out
    }
}

/// Links undirected edges into maximal chains. Open chains start at vertices
/// of degree other than two; what remains are closed cycles.
fn chain_edges(edges: &[(u32, u32)]) -> Vec<(Vec<u32>, bool)> {
    let mut neighbours: HashMap<u32, Vec<u32>> = HashMap::new();
    for &(a, b) in edges {
        neighbours.entry(a).or_default().push(b);
        neighbours.entry(b).or_default().push(a);
    }
    let mut used: HashMap<(u32, u32), bool> = edges.iter().map(|&e| (e, false)).collect();
    let mut take = |a: u32, b: u32| -> bool {
        let key = (a.min(b), a.max(b));
        match used.get_mut(&key) {
            Some(flag) if !*flag => {
                *flag = true;
                true
            }
            _ => false,
        }
    };

    let mut starts: Vec<u32> = neighbours
        .iter()
        .filter(|(_, n)| n.len() != 2)
        .map(|(&v, _)| v)
        .collect();
    starts.sort_unstable();
    let mut rest: Vec<u32> = neighbours.keys().copied().collect();
    rest.sort_unstable();

    let mut chains = Vec::new();
    for (pass, seeds) in [starts, rest].into_iter().enumerate() {
        for seed in seeds {
            loop {
                let Some(&first) = neighbours[&seed].iter().find(|&&n| take(seed, n)) else {
                    break;
                };
                let mut chain = vec![seed, first];
                let mut current = first;
                // Open chains stop at junctions and ends.
                while pass == 1 || neighbours[&current].len() == 2 {
                    let Some(&next) = neighbours[&current].iter().find(|&&n| take(current, n)) else {
                        break;
                    };
                    chain.push(next);
                    current = next;
                }
                let closed = pass == 1 && chain.len() > 3 && chain.first() == chain.last();
                if closed {
                    chain.pop();
                }
                chains.push((chain, closed));
            }
        }
    }
    chains
}

/// The selected edge to fillet: a rail polyline between two named faces.
#[derive(Debug, Clone)]
pub struct EdgeSelection {
    pub points: Vec<Point3>,
    pub face_a: String,
    pub face_b: String,
    pub closed: bool,
}

impl EdgeSelection {
    /// Creates a selection; closed rails drop a repeated terminal point.
    #[must_use]
    pub fn new(points: Vec<Point3>, face_a: &str, face_b: &str, closed: bool) -> Self {
        let points = if closed {
            normalize_closed(&points, TOLERANCE)
        } else {
            points
        };
        Self {
            points,
            face_a: face_a.to_owned(),
            face_b: face_b.to_owned(),
            closed,
        }
    }

    /// Resolves the edge shared by `face_a` and `face_b`. When the faces meet
    /// along several chains, the longest one is used.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingEdge`] if the faces are not adjacent.
    pub fn between<S: EdgeSource + ?Sized>(source: &S, face_a: &str, face_b: &str) -> Result<Self> {
        let candidates: Vec<BoundaryPolyline> = source
            .boundary_edge_polylines()
            .into_iter()
            .filter(|pl| {
                (pl.face_a == face_a && pl.face_b == face_b)
                    || (pl.face_a == face_b && pl.face_b == face_a)
            })
            .collect();
        debug!(face_a, face_b, chains = candidates.len(), "resolving edge selection");

        let best = candidates
            .into_iter()
            .max_by(|x, y| {
                polyline_length(&x.positions, x.closed).total_cmp(&polyline_length(&y.positions, y.closed))
            })
            .ok_or_else(|| ValidationError::MissingEdge {
                face_a: face_a.to_owned(),
                face_b: face_b.to_owned(),
            })?;
        Ok(Self::new(best.positions, face_a, face_b, best.closed))
    }

    /// Checks that the rail has enough points for its topology.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PolylineTooShort`].
    pub fn validate(&self) -> Result<()> {
        let required = if self.closed { 3 } else { 2 };
        if self.points.len() < required {
            return Err(ValidationError::PolylineTooShort {
                required,
                actual: self.points.len(),
            }
            .into());
        }
        Ok(())
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        polyline_length(&self.points, self.closed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::test_meshes::cube;
    use crate::mesh::FaceTable;

    fn named_cube() -> Solid {
        let mesh = cube(1.0);
        let mut faces = FaceTable::new();
        for (id, name) in [(1, "BOTTOM"), (2, "TOP"), (3, "FRONT"), (4, "BACK"), (5, "LEFT"), (6, "RIGHT")] {
            faces.bind(id, name);
        }
        Solid::from_parts("cube", mesh, faces)
    }

    #[test]
    fn cube_has_twelve_face_edges() {
        let solid = named_cube();
        let polylines = solid.boundary_edge_polylines();
        assert_eq!(polylines.len(), 12);
        assert!(polylines.iter().all(|pl| pl.positions.len() == 2 && !pl.closed));
    }

    #[test]
    fn selection_between_top_and_front() {
        let solid = named_cube();
        let edge = EdgeSelection::between(&solid, "TOP", "FRONT").unwrap();
        assert_eq!(edge.face_a, "TOP");
        assert!(!edge.closed);
        assert!((edge.length() - 1.0).abs() < 1e-12);
        assert!(edge.points.iter().all(|p| p.y.abs() < 1e-12 && (p.z - 1.0).abs() < 1e-12));
    }

    #[test]
    fn opposite_faces_have_no_edge() {
        let solid = named_cube();
        let err = EdgeSelection::between(&solid, "TOP", "BOTTOM").unwrap_err();
        assert!(err.to_string().contains("TOP"));
    }

    #[test]
    fn square_cycle_chains_closed() {
        let edges = vec![(0, 1), (1, 2), (2, 3), (0, 3)];
        let chains = chain_edges(&edges);
        assert_eq!(chains.len(), 1);
        assert!(chains[0].1);
        assert_eq!(chains[0].0.len(), 4);
    }

    #[test]
    fn closed_selection_drops_repeated_point() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
        ];
        let edge = EdgeSelection::new(pts, "A", "B", true);
        assert_eq!(edge.points.len(), 3);
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn short_rail_is_rejected() {
        let edge = EdgeSelection::new(vec![Point3::origin()], "A", "B", false);
        assert!(edge.validate().is_err());
    }
}
