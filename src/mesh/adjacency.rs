//! Edge adjacency of an indexed triangle mesh.

use std::collections::HashMap;

/// One use of an undirected edge by a triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeUse {
    /// Triangle index.
    pub triangle: usize,
    /// `true` if the triangle traverses the edge from the smaller to the
    /// larger vertex index.
    pub forward: bool,
}

/// Undirected edge to triangle map.
///
/// Provides lookups for:
/// - triangles incident to an edge, with the direction each one walks it
/// - boundary edges (used by one triangle)
/// - non-manifold edges (used by more than two triangles)
/// - inconsistently wound edges (two uses in the same direction)
#[derive(Debug, Clone, Default)]
pub struct EdgeAdjacency {
    edges: HashMap<(u32, u32), Vec<EdgeUse>>,
}

impl EdgeAdjacency {
    /// Builds the adjacency of a triangle list.
    #[must_use]
    pub fn build(triangles: &[[u32; 3]]) -> Self {
        let mut edges: HashMap<(u32, u32), Vec<EdgeUse>> = HashMap::with_capacity(triangles.len() * 2);
        for (t, tri) in triangles.iter().enumerate() {
            for k in 0..3 {
                let (a, b) = (tri[k], tri[(k + 1) % 3]);
                if a == b {
                    continue;
                }
                edges.entry(normalize_edge(a, b)).or_default().push(EdgeUse {
                    triangle: t,
                    forward: a < b,
                });
            }
        }
        Self { edges }
    }

    /// Triangles using edge `(a, b)` in either direction.
    #[must_use]
    pub fn uses(&self, a: u32, b: u32) -> &[EdgeUse] {
        self.edges
            .get(&normalize_edge(a, b))
            .map_or(&[], Vec::as_slice)
    }

    /// Iterates all undirected edges with their uses.
    pub fn iter(&self) -> impl Iterator<Item = ((u32, u32), &[EdgeUse])> {
        self.edges.iter().map(|(&e, uses)| (e, uses.as_slice()))
    }

    /// Triangles sharing an edge with triangle `t` (excluding `t`).
    #[must_use]
    pub fn neighbours(&self, triangles: &[[u32; 3]], t: usize) -> Vec<usize> {
        let tri = triangles[t];
        let mut out = Vec::with_capacity(3);
        for k in 0..3 {
            for u in self.uses(tri[k], tri[(k + 1) % 3]) {
                if u.triangle != t && !out.contains(&u.triangle) {
                    out.push(u.triangle);
                }
            }
        }
        out
    }

    /// Boundary edges as directed pairs in the winding of their only triangle.
    pub fn boundary_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edges.iter().filter(|(_, uses)| uses.len() == 1).map(|(&(lo, hi), uses)| {
            if uses[0].forward {
                (lo, hi)
            } else {
                (hi, lo)
            }
        })
    }

    #[must_use]
    pub fn boundary_edge_count(&self) -> usize {
        self.edges.values().filter(|uses| uses.len() == 1).count()
    }

    /// Edges used by more than two triangles.
    pub fn non_manifold_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edges
            .iter()
            .filter(|(_, uses)| uses.len() > 2)
            .map(|(&edge, _)| edge)
    }

    #[must_use]
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edges.values().filter(|uses| uses.len() > 2).count()
    }

    /// Manifold edges whose two triangles walk them in the same direction.
    #[must_use]
    pub fn inconsistent_edge_count(&self) -> usize {
        self.edges
            .values()
            .filter(|uses| uses.len() == 2 && uses[0].forward == uses[1].forward)
            .count()
    }

    /// `true` if every edge has exactly two oppositely directed uses.
    #[must_use]
    pub fn is_closed_manifold(&self) -> bool {
        !self.edges.is_empty()
            && self
                .edges
                .values()
                .all(|uses| uses.len() == 2 && uses[0].forward != uses[1].forward)
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Normalize edge direction so `v0 < v1`.
#[inline]
#[must_use]
pub fn normalize_edge(v0: u32, v1: u32) -> (u32, u32) {
    if v0 < v1 {
        (v0, v1)
    } else {
        (v1, v0)
    }
}
