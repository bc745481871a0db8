use std::collections::VecDeque;

use crate::mesh::{EdgeAdjacency, TriMesh};

/// Makes triangle winding consistent across shared edges.
///
/// Flood-fills every connected component from its first triangle. A
/// neighbour that walks a shared manifold edge in the same direction as the
/// current triangle is flipped. Edges used by more than two triangles carry
/// no orientation information and are not followed.
///
/// Returns the number of triangles flipped.
pub fn fix_winding(mesh: &mut TriMesh) -> usize {
    let n = mesh.len();
    if n == 0 {
        return 0;
    }
    let adjacency = EdgeAdjacency::build(&mesh.triangles);
    let mut flipped = vec![false; n];
    let mut visited = vec![false; n];
    let mut queue = VecDeque::new();

    for start in 0..n {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        queue.push_back(start);

        while let Some(t) = queue.pop_front() {
            let tri = mesh.triangles[t];
            for k in 0..3 {
                let uses = adjacency.uses(tri[k], tri[(k + 1) % 3]);
                if uses.len() != 2 {
                    continue;
                }
                let (mine, other) = if uses[0].triangle == t {
                    (uses[0], uses[1])
                } else {
                    (uses[1], uses[0])
                };
                if visited[other.triangle] || other.triangle == t {
                    continue;
                }
                let my_dir = mine.forward ^ flipped[t];
                let other_dir = other.forward;
                if my_dir == other_dir {
                    flipped[other.triangle] = true;
                }
                visited[other.triangle] = true;
                queue.push_back(other.triangle);
            }
        }
    }

    let mut count = 0;
    for (t, &f) in flipped.iter().enumerate() {
        if f {
            mesh.flip(t);
            count += 1;
        }
    }
    count
}

/// Flips every triangle if the enclosed signed volume is negative.
///
/// Returns `true` if the mesh was flipped.
pub fn orient_outward(mesh: &mut TriMesh) -> bool {
    if mesh.signed_volume() >= 0.0 {
        return false;
    }
    for t in 0..mesh.len() {
        mesh.flip(t);
    }
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::test_meshes::{cube, tetrahedron};

    #[test]
    fn consistent_mesh_needs_no_flips() {
        let mut mesh = cube(1.0);
        assert_eq!(fix_winding(&mut mesh), 0);
    }

    #[test]
    fn repairs_scattered_flips() {
        let mut mesh = cube(1.0);
        for t in [1, 4, 7, 10] {
            mesh.flip(t);
        }
        fix_winding(&mut mesh);
        let adj = EdgeAdjacency::build(&mesh.triangles);
        assert_eq!(adj.inconsistent_edge_count(), 0);
        orient_outward(&mut mesh);
        assert!((mesh.signed_volume() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inverted_mesh_is_reoriented() {
        let mut mesh = tetrahedron();
        for t in 0..mesh.len() {
            mesh.flip(t);
        }
        assert!(orient_outward(&mut mesh));
        assert!(mesh.signed_volume() > 0.0);
        assert!(!orient_outward(&mut mesh));
    }
}
