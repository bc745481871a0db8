//! Boundary loop detection.
//!
//! A boundary edge is used by exactly one triangle. Loops are traced over the
//! reversed boundary edges, so a loop's vertex order is the winding a patch
//! must use to stay consistent with the surrounding triangles.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::math::polygon_3d::newell_normal;
use crate::math::Vector3;
use crate::mesh::{EdgeAdjacency, TriMesh};

/// An ordered chain of boundary vertices.
#[derive(Debug, Clone)]
pub struct BoundaryLoop {
    /// Vertex indices in patch winding order.
    pub vertices: Vec<u32>,
    /// Newell normal of the loop, if it is not degenerate.
    pub normal: Option<Vector3>,
    /// `false` if tracing ended without returning to the start.
    pub closed: bool,
}

impl BoundaryLoop {
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// A loop can be patched when it is closed and has at least three vertices.
    #[must_use]
    pub fn is_patchable(&self) -> bool {
        self.closed && self.vertices.len() >= 3
    }
}

/// Traces every boundary of `mesh` into loops.
///
/// Tracing never steps straight back along the edge it arrived on when
/// another continuation exists, and gives up on a chain after `max_length`
/// steps.
#[must_use]
pub fn find_boundary_loops(mesh: &TriMesh, max_length: usize) -> Vec<BoundaryLoop> {
    let adjacency = EdgeAdjacency::build(&mesh.triangles);

    // Reversed boundary edges, keyed by start vertex.
    let mut outgoing: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    for (a, b) in adjacency.boundary_edges() {
        outgoing.entry(b).or_default().push(a);
    }
    if outgoing.is_empty() {
        return Vec::new();
    }
    for targets in outgoing.values_mut() {
        targets.sort_unstable();
    }
    debug!(
        boundary_edges = adjacency.boundary_edge_count(),
        "tracing boundary loops"
    );

    let mut used: HashSet<(u32, u32)> = HashSet::new();
    let mut loops = Vec::new();
    let starts: Vec<u32> = outgoing.keys().copied().collect();

    for start in starts {
        loop {
            let Some(&first) = outgoing[&start].iter().find(|&&v| !used.contains(&(start, v))) else {
                break;
            };
            used.insert((start, first));
            let mut chain = vec![start];
            let mut prev = start;
            let mut current = first;
            let mut closed = false;
            let mut aborted = false;

            loop {
                if current == start {
                    closed = true;
                    break;
                }
                if chain.len() >= max_length {
                    aborted = true;
                    break;
                }
                chain.push(current);
                let Some(candidates) = outgoing.get(&current) else {
                    break;
                };
                let free: Vec<u32> = candidates
                    .iter()
                    .copied()
                    .filter(|&v| !used.contains(&(current, v)))
                    .collect();
                let next = free
                    .iter()
                    .copied()
                    .find(|&v| v == start)
                    .or_else(|| free.iter().copied().find(|&v| v != prev))
                    .or_else(|| free.first().copied());
                let Some(next) = next else {
                    break;
                };
                used.insert((current, next));
                prev = current;
                current = next;
            }

            if aborted {
                warn!(start, max_length, "boundary trace exceeded its length bound");
                continue;
            }
            let points: Vec<_> = chain.iter().map(|&v| mesh.vertices[v as usize]).collect();
            loops.push(BoundaryLoop {
                normal: newell_normal(&points),
                vertices: chain,
                closed,
            });
        }
    }
    loops
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::test_meshes::cube;

    #[test]
    fn closed_mesh_has_no_loops() {
        assert!(find_boundary_loops(&cube(1.0), 1000).is_empty());
    }

    #[test]
    fn open_top_yields_one_square_loop() {
        let mut mesh = cube(1.0);
        // Face ID 2 is the top.
        mesh.retain_triangles(|i| i / 2 != 1);
        let loops = find_boundary_loops(&mesh, 1000);
        assert_eq!(loops.len(), 1);
        let hole = &loops[0];
        assert!(hole.is_patchable());
        assert_eq!(hole.len(), 4);
        // Patch winding faces out of the top.
        assert!((hole.normal.unwrap() - Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn single_triangle_loop_is_reversed() {
        let mut mesh = TriMesh::new();
        mesh.vertices = vec![
            crate::math::Point3::new(0.0, 0.0, 0.0),
            crate::math::Point3::new(1.0, 0.0, 0.0),
            crate::math::Point3::new(0.0, 1.0, 0.0),
        ];
        mesh.push_triangle([0, 1, 2], 1);
        let loops = find_boundary_loops(&mesh, 1000);
        assert_eq!(loops.len(), 1);
        assert!((loops[0].normal.unwrap() + Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn length_bound_aborts_trace() {
        let mut mesh = cube(1.0);
        mesh.retain_triangles(|i| i / 2 != 1);
        assert!(find_boundary_loops(&mesh, 2).is_empty());
    }
}
