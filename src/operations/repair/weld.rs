use std::collections::HashMap;

use crate::math::{triangle_cross, Point3};
use crate::mesh::TriMesh;

/// Merges vertices closer than `epsilon`.
///
/// Vertices are hashed into a grid of `epsilon`-sized cells; the first vertex
/// seen in a neighbourhood becomes the representative of every later vertex
/// within `epsilon` of it. Triangles that collapse to repeated indices or to
/// zero area are dropped, and the vertex buffer is compacted.
///
/// Returns the number of vertices merged away.
#[allow(clippy::cast_possible_truncation)]
pub fn weld_vertices(mesh: &mut TriMesh, epsilon: f64) -> usize {
    if mesh.vertices.is_empty() || epsilon <= 0.0 {
        return 0;
    }

    let mut grid: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    let mut remap: Vec<u32> = (0..mesh.vertices.len() as u32).collect();
    let mut merged = 0;

    for (idx, p) in mesh.vertices.iter().enumerate() {
        let cell = cell_of(p, epsilon);
        let mut representative = None;
        'search: for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = grid.get(&(cell.0 + dx, cell.1 + dy, cell.2 + dz)) else {
                        continue;
                    };
                    for &c in candidates {
                        if (mesh.vertices[c as usize] - p).norm() < epsilon {
                            representative = Some(c);
                            break 'search;
                        }
                    }
                }
            }
        }
        match representative {
            Some(rep) => {
                remap[idx] = rep;
                merged += 1;
            }
            None => grid.entry(cell).or_default().push(idx as u32),
        }
    }

    if merged == 0 {
        return 0;
    }

    for tri in &mut mesh.triangles {
        for v in tri.iter_mut() {
            *v = remap[*v as usize];
        }
    }
    let keep: Vec<bool> = mesh
        .triangles
        .iter()
        .map(|&[a, b, c]| {
            if a == b || b == c || a == c {
                return false;
            }
            let cross = triangle_cross(
                &mesh.vertices[a as usize],
                &mesh.vertices[b as usize],
                &mesh.vertices[c as usize],
            );
            cross.norm_squared() > 0.0
        })
        .collect();
    mesh.retain_triangles(|i| keep[i]);
    mesh.compact_vertices();
    merged
}

#[allow(clippy::cast_possible_truncation)]
fn cell_of(p: &Point3, size: f64) -> (i64, i64, i64) {
    (
        (p.x / size).floor() as i64,
        (p.y / size).floor() as i64,
        (p.z / size).floor() as i64,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::test_meshes::cube;

    #[test]
    fn merges_near_duplicates() {
        let mut mesh = TriMesh::new();
        mesh.vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0 + 1e-9, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ];
        mesh.push_triangle([0, 1, 2], 1);
        mesh.push_triangle([3, 4, 2], 1);
        assert_eq!(weld_vertices(&mut mesh, 1e-6), 1);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.triangles[1][0], mesh.triangles[0][1]);
    }

    #[test]
    fn drops_collapsed_triangles() {
        let mut mesh = TriMesh::new();
        mesh.vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1e-9, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        mesh.push_triangle([0, 1, 2], 1);
        mesh.push_triangle([0, 1, 3], 2);
        weld_vertices(&mut mesh, 1e-6);
        assert_eq!(mesh.triangles.len(), 1);
        assert_eq!(mesh.face_ids, vec![2]);
        assert_eq!(mesh.vertices.len(), 3);
    }

    #[test]
    fn clean_mesh_is_untouched() {
        let mut mesh = cube(1.0);
        assert_eq!(weld_vertices(&mut mesh, 1e-6), 0);
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.triangles.len(), 12);
    }

    #[test]
    fn unshared_cube_welds_to_eight_vertices() {
        let source = cube(1.0);
        let mut soup = TriMesh::new();
        for i in 0..source.len() {
            let [a, b, c] = source.corners(i);
            let ia = soup.push_vertex(a);
            let ib = soup.push_vertex(b);
            let ic = soup.push_vertex(c);
            soup.push_triangle([ia, ib, ic], source.face_ids[i]);
        }
        assert_eq!(weld_vertices(&mut soup, 1e-6), 36 - 8);
        assert_eq!(soup.vertices.len(), 8);
        assert!((soup.signed_volume() - 1.0).abs() < 1e-12);
    }
}
