use chull::ConvexHullWrapper;
use tracing::{debug, trace};

use super::bsp::{BspTree, Polygon};
use super::engine::{BooleanOp, EngineMesh, MeshEngine};
use crate::error::{BooleanError, Result};
use crate::math::polygon_3d::newell_vector;
use crate::math::{centroid, closest_point_on_segment, Point3};
use crate::mesh::{EdgeAdjacency, TriMesh};
use crate::operations::repair::{find_boundary_loops, remove_degenerate_triangles, weld_vertices};

/// Edge parameters this close to an endpoint are not junctions.
const JUNCTION_T: f64 = 1e-9;

/// Reference [`MeshEngine`] built on BSP-tree CSG.
///
/// Results are fan-triangulated and welded. T-junctions along open edges are
/// split until shared edges line up again, and the thin cracks left where
/// planes meet at grazing angles are zipped shut.
#[derive(Debug, Clone)]
pub struct BspEngine {
    epsilon: f64,
    strict: bool,
    crack_width: f64,
}

impl Default for BspEngine {
    fn default() -> Self {
        Self {
            epsilon: 1e-5,
            strict: false,
            crack_width: 1e-3,
        }
    }
}

impl BspEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plane classification tolerance.
    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Rejects boolean operands that are not closed 2-manifolds.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Widest open boundary loop, as area over perimeter, that assembly
    /// closes as a crack.
    #[must_use]
    pub fn with_crack_width(mut self, width: f64) -> Self {
        self.crack_width = width;
        self
    }

    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    fn polygons(mesh: &EngineMesh) -> Vec<Polygon> {
        (0..mesh.triangle_count())
            .filter_map(|t| {
                let verts = mesh.triangle(t).map(|i| mesh.vertex(i as usize));
                Polygon::new(verts.to_vec(), mesh.tags[t])
            })
            .collect()
    }

    fn check_operand(&self, mesh: &EngineMesh, operand: &'static str) -> Result<()> {
        if !self.strict {
            return Ok(());
        }
        mesh.check_closed_manifold().map_err(|e| {
            BooleanError::InvalidOperand {
                operand,
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn run(&self, a: &EngineMesh, b: &EngineMesh, op: BooleanOp) -> Vec<Polygon> {
        let eps = self.epsilon;
        match op {
            BooleanOp::Union => {
                let mut ta = BspTree::new(Self::polygons(a), eps);
                let mut tb = BspTree::new(Self::polygons(b), eps);
                ta.clip_to(&tb);
                tb.clip_to(&ta);
                tb.invert();
                tb.clip_to(&ta);
                tb.invert();
                ta.build(tb.all_polygons());
                ta.all_polygons()
            }
            BooleanOp::Subtract => {
                let mut ta = BspTree::new(Self::polygons(a), eps);
                let mut tb = BspTree::new(Self::polygons(b), eps);
                ta.invert();
                ta.clip_to(&tb);
                tb.clip_to(&ta);
                tb.invert();
                tb.clip_to(&ta);
                tb.invert();
                ta.build(tb.all_polygons());
                ta.invert();
                ta.all_polygons()
            }
            BooleanOp::Intersect => {
                let mut ta = BspTree::new(Self::polygons(a), eps);
                let mut tb = BspTree::new(Self::polygons(b), eps);
                ta.invert();
                tb.clip_to(&ta);
                tb.invert();
                ta.clip_to(&tb);
                tb.clip_to(&ta);
                ta.build(tb.all_polygons());
                ta.invert();
                ta.all_polygons()
            }
            BooleanOp::Difference => {
                let mut out = self.run(a, b, BooleanOp::Subtract);
                out.extend(self.run(b, a, BooleanOp::Subtract));
                out
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn assemble(&self, polygons: &[Polygon]) -> TriMesh {
        let mut mesh = TriMesh::new();
        for poly in polygons {
            let base = mesh.vertices.len();
            mesh.vertices.extend_from_slice(&poly.vertices);
            for i in 1..poly.vertices.len() - 1 {
                mesh.push_triangle(
                    [base as u32, (base + i) as u32, (base + i + 1) as u32],
                    poly.tag,
                );
            }
        }
        weld_vertices(&mut mesh, self.epsilon);
        remove_degenerate_triangles(&mut mesh, self.epsilon * self.epsilon * 1e-3);
        // Welding moves vertices by up to epsilon, so junctions get twice that.
        let bound = junction_pass_bound(&mesh);
        let split = split_t_junctions(&mut mesh, 2.0 * self.epsilon, bound);
        let max_trace = mesh.vertices.len().max(3);
        let zipped = close_cracks(&mut mesh, self.crack_width, max_trace);
        debug!(
            polygons = polygons.len(),
            triangles = mesh.len(),
            junctions_split = split,
            cracks_closed = zipped,
            "assembled boolean result"
        );
        mesh
    }
}

impl MeshEngine for BspEngine {
    fn boolean(&self, a: &EngineMesh, b: &EngineMesh, op: BooleanOp) -> Result<EngineMesh> {
        self.check_operand(a, "a")?;
        self.check_operand(b, "b")?;
        let polygons = self.run(a, b, op);
        let mesh = self.assemble(&polygons);
        if mesh.is_empty() && op == BooleanOp::Union {
            return Err(BooleanError::EmptyResult.into());
        }
        Ok(EngineMesh::from_tri_mesh(&mesh))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn convex_hull(&self, points: &[Point3], tag: u32) -> Result<EngineMesh> {
        if is_flat(points, self.epsilon) {
            return Err(BooleanError::Hull("points do not span a volume".into()).into());
        }
        let input: Vec<Vec<f64>> = points.iter().map(|p| vec![p.x, p.y, p.z]).collect();
        let hull = ConvexHullWrapper::try_new(&input, None)
            .map_err(|e| BooleanError::Hull(format!("{e:?}")))?;
        let (verts, indices) = hull.vertices_indices();

        let mut mesh = TriMesh::new();
        mesh.vertices = verts.iter().map(|v| Point3::new(v[0], v[1], v[2])).collect();
        for tri in indices.chunks_exact(3) {
            mesh.push_triangle([tri[0] as u32, tri[1] as u32, tri[2] as u32], tag);
        }
        if mesh.signed_volume() < 0.0 {
            for t in 0..mesh.len() {
                mesh.flip(t);
            }
        }
        if mesh.is_empty() {
            return Err(BooleanError::Hull("empty hull".into()).into());
        }
        Ok(EngineMesh::from_tri_mesh(&mesh))
    }

    fn simplify(&self, mesh: &EngineMesh, tolerance: f64) -> Result<EngineMesh> {
        let mut tri = mesh.to_tri_mesh();
        let merged = weld_vertices(&mut tri, tolerance);
        let dropped = remove_degenerate_triangles(&mut tri, tolerance * tolerance * 1e-3);
        trace!(merged, dropped, "simplified mesh");
        Ok(EngineMesh::from_tri_mesh(&tri))
    }

    fn validate(&self, mesh: &EngineMesh) -> Result<()> {
        mesh.check_closed_manifold()
    }
}

/// `true` if all points lie within `epsilon` of one plane (or line).
fn is_flat(points: &[Point3], epsilon: f64) -> bool {
    let Some(&origin) = points.first() else {
        return true;
    };
    let Some(far) = points
        .iter()
        .max_by(|a, b| (*a - origin).norm_squared().total_cmp(&(*b - origin).norm_squared()))
    else {
        return true;
    };
    let axis = far - origin;
    let normal = points
        .iter()
        .map(|p| axis.cross(&(p - origin)))
        .max_by(|a, b| a.norm_squared().total_cmp(&b.norm_squared()))
        .and_then(|n| n.try_normalize(epsilon * epsilon));
    let Some(normal) = normal else {
        return true;
    };
    points.iter().all(|p| normal.dot(&(p - origin)).abs() <= epsilon)
}

/// Pass bound for [`split_t_junctions`].
///
/// Every pass that changes anything consumes at least one vertex lying on an
/// open edge, so one pass per vertex always reaches the fixpoint.
#[must_use]
pub fn junction_pass_bound(mesh: &TriMesh) -> usize {
    mesh.vertices.len() + 1
}

/// Splits triangles whose open edges pass through other boundary vertices.
///
/// A pass collects, for every boundary edge, all boundary vertices within
/// `epsilon` of its interior and replaces the owning triangle with a fan from
/// the opposite corner through them in edge order. A triangle is split along
/// one edge per pass; its other open edges are picked up by the next pass.
/// Passes repeat until one changes nothing or `max_passes` is reached.
///
/// Returns the number of vertices inserted into edges.
pub fn split_t_junctions(mesh: &mut TriMesh, epsilon: f64, max_passes: usize) -> usize {
    let mut total = 0;
    for pass in 0..max_passes {
        let adjacency = EdgeAdjacency::build(&mesh.triangles);
        let mut boundary: Vec<(u32, u32)> = adjacency.boundary_edges().collect();
        if boundary.is_empty() {
            break;
        }
        boundary.sort_unstable();
        let candidates: Vec<u32> = {
            let mut v: Vec<u32> = boundary.iter().flat_map(|&(a, b)| [a, b]).collect();
            v.sort_unstable();
            v.dedup();
            v
        };

        let mut touched = vec![false; mesh.len()];
        let mut splits: Vec<(usize, [u32; 3], Vec<u32>)> = Vec::new();
        for (a, b) in boundary {
            let Some(owner) = adjacency.uses(a, b).first().map(|u| u.triangle) else {
                continue;
            };
            if touched[owner] {
                continue;
            }
            let tri = mesh.triangles[owner];
            let Some(k) = (0..3).find(|&k| tri[k] == a && tri[(k + 1) % 3] == b) else {
                continue;
            };
            let c = tri[(k + 2) % 3];
            let inner = vertices_on_edge(mesh, [a, b, c], &candidates, epsilon);
            if inner.is_empty() {
                continue;
            }
            touched[owner] = true;
            splits.push((owner, [a, b, c], inner));
        }
        if splits.is_empty() {
            break;
        }

        let inserted: usize = splits.iter().map(|(_, _, inner)| inner.len()).sum();
        for (owner, [a, b, c], inner) in splits {
            let id = mesh.face_ids[owner];
            let chain: Vec<u32> = std::iter::once(a).chain(inner).chain(std::iter::once(b)).collect();
            mesh.triangles[owner] = [chain[0], chain[1], c];
            for pair in chain.windows(2).skip(1) {
                mesh.push_triangle([pair[0], pair[1], c], id);
            }
        }
        trace!(pass, inserted, "split t-junctions");
        total += inserted;
    }
    total
}

/// Candidates strictly inside edge `a -> b` of triangle `[a, b, c]`, sorted
/// from `a` to `b`.
fn vertices_on_edge(mesh: &TriMesh, [a, b, c]: [u32; 3], candidates: &[u32], epsilon: f64) -> Vec<u32> {
    let pa = mesh.vertices[a as usize];
    let pb = mesh.vertices[b as usize];
    let mut hits: Vec<(f64, u32)> = candidates
        .iter()
        .copied()
        .filter(|&v| v != a && v != b && v != c)
        .filter_map(|v| {
            let p = mesh.vertices[v as usize];
            let (q, t) = closest_point_on_segment(&p, &pa, &pb);
            (t > JUNCTION_T && t < 1.0 - JUNCTION_T && (q - p).norm() < epsilon).then_some((t, v))
        })
        .collect();
    hits.sort_by(|x, y| x.0.total_cmp(&y.0));
    hits.into_iter().map(|(_, v)| v).collect()
}

/// Zips shut closed boundary loops whose area is at most `max_width` times
/// their perimeter.
///
/// Each crack is triangulated from its vertex farthest from the loop centre,
/// walking both sides towards the opposite end and always taking the shorter
/// diagonal, so new edges only cross the crack. Wider loops are left open.
///
/// Returns the number of loops closed.
pub fn close_cracks(mesh: &mut TriMesh, max_width: f64, max_trace: usize) -> usize {
    let loops = find_boundary_loops(mesh, max_trace);
    let mut closed = 0;
    for hole in loops.iter().filter(|l| l.is_patchable()) {
        let points: Vec<Point3> = hole.vertices.iter().map(|&v| mesh.vertices[v as usize]).collect();
        let perimeter: f64 = (0..points.len())
            .map(|i| (points[(i + 1) % points.len()] - points[i]).norm())
            .sum();
        let area = 0.5 * newell_vector(&points).norm();
        if area > max_width * perimeter {
            trace!(vertices = hole.len(), area, perimeter, "boundary loop too wide to zip");
            continue;
        }
        let id = hole
            .vertices
            .iter()
            .find_map(|&v| {
                mesh.triangles
                    .iter()
                    .position(|tri| tri.contains(&v))
                    .map(|t| mesh.face_ids[t])
            })
            .unwrap_or(0);
        for [i, j, k] in zip_loop(&points) {
            mesh.push_triangle([hole.vertices[i], hole.vertices[j], hole.vertices[k]], id);
        }
        closed += 1;
    }
    closed
}

/// Zipper triangulation of a loop in patch winding. Returns `n - 2`
/// triangles of loop positions.
fn zip_loop(points: &[Point3]) -> Vec<[usize; 3]> {
    let n = points.len();
    let centre = centroid(points);
    let start = (0..n)
        .max_by(|&x, &y| {
            (points[x] - centre)
                .norm_squared()
                .total_cmp(&(points[y] - centre).norm_squared())
        })
        .unwrap_or(0);
    let at = |k: usize| (start + k) % n;

    // Front edge runs from loop position `back` to `front`.
    let mut front = 0;
    let mut back = n - 1;
    let mut triangles = Vec::with_capacity(n.saturating_sub(2));
    while back > front + 1 {
        let advance = (points[at(front + 1)] - points[at(back)]).norm_squared();
        let retreat = (points[at(back - 1)] - points[at(front)]).norm_squared();
        if advance <= retreat {
            triangles.push([at(back), at(front), at(front + 1)]);
            front += 1;
        } else {
            triangles.push([at(back - 1), at(back), at(front)]);
            back -= 1;
        }
    }
    triangles
}
