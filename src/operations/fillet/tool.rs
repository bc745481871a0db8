//! Ring-lofted fillet tools: rail preparation, station solving, section
//! building, wedge assembly and the shared finishing passes.

use tracing::{debug, warn};

use crate::error::Result;
use crate::math::polyline::{resample, tangents};
use crate::math::triangulate::triangulate_loop;
use crate::math::{triangle_area, Point3, Tolerance, Vector3};
use crate::mesh::{EdgeSelection, MeshSource, Solid, TriMesh};
use crate::operations::repair::{patch_holes, ConsistencyLayer, ConsistencyReport, PatchKind};

use super::context::FilletContext;
use super::naming::FaceNames;
use super::params::{FilletParams, SideMode};
use super::retry::Recipe;
use super::ring::{align_rings, build_ring, loft, Alignment};
use super::sampler::FaceSampler;
use super::station::{fill_skipped, SolverMode, Station, StationFaces, StationSolver};

/// Everything a strategy needs to build one tool.
pub struct ToolInput<'a> {
    pub source: &'a dyn MeshSource,
    pub edge: &'a EdgeSelection,
    pub radius: f64,
    pub side: SideMode,
    pub recipe: Recipe,
    pub params: &'a FilletParams,
    pub names: &'a FaceNames,
    pub tolerance: Tolerance,
}

impl ToolInput<'_> {
    /// Distance seam and strip vertices are pushed off the source faces.
    #[must_use]
    pub fn seam_offset(&self) -> f64 {
        (self.recipe.inset_scale * self.radius).max(self.tolerance.distance) + self.recipe.inflate
    }

    /// Distance the end sections of an open tool are pushed outward.
    #[must_use]
    pub fn bulge(&self) -> f64 {
        if self.params.bulge_scale > 0.0 {
            (self.params.bulge_scale * self.radius).max(self.tolerance.distance)
        } else {
            0.0
        }
    }
}

/// A finished, consistency-checked tool.
#[derive(Debug, Clone)]
pub struct ToolBuild {
    pub tool: Solid,
    pub stations: Vec<Station>,
    /// How the loft closes onto its first ring (closed rails only).
    pub seam: Option<SeamClosure>,
    pub consistency: ConsistencyReport,
    /// Boundary loops closed by repair capping.
    pub patched: usize,
}

/// How the last ring of a closed rail is matched onto the first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeamClosure {
    /// Reordering applied to the first ring for the closing band.
    pub alignment: Alignment,
    /// Summed squared point distance across the closing band.
    pub residual: f64,
    /// Mean of the same sum over every other band.
    pub band_mean: f64,
}

impl SeamClosure {
    /// Closing band cost over the cost of a typical band.
    #[must_use]
    pub fn relative_residual(&self) -> f64 {
        self.residual / self.band_mean.max(f64::MIN_POSITIVE)
    }
}

/// Resampled rail with per-sample tangents.
#[derive(Debug, Clone)]
pub struct Rail {
    pub points: Vec<Point3>,
    pub tangents: Vec<Vector3>,
    pub closed: bool,
}

impl Rail {
    /// Resamples the edge so no segment exceeds the station spacing.
    #[must_use]
    pub fn from_edge(edge: &EdgeSelection, radius: f64, params: &FilletParams) -> Self {
        let points = resample(
            &edge.points,
            edge.closed,
            params.max_station_spacing * radius,
            params.min_stations,
        );
        Self {
            tangents: tangents(&points, edge.closed),
            points,
            closed: edge.closed,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Solves every station of the rail; skipped stations are carried over
/// from their neighbours.
///
/// # Errors
///
/// Fails if either face is missing or fewer than two stations solve.
pub fn solve_stations(
    input: &ToolInput<'_>,
    ctx: &mut FilletContext,
    rail: &Rail,
    mode: SolverMode,
) -> Result<Vec<Station>> {
    let a = ctx.sampler(input.source, &input.edge.face_a)?;
    let b = ctx.sampler(input.source, &input.edge.face_b)?;
    let faces = StationFaces {
        source: input.source,
        a: &a,
        b: &b,
    };
    let solver = StationSolver::new(input.radius, input.side, input.tolerance).with_mode(mode);

    let mut solved = Vec::with_capacity(rail.len());
    for (i, (p, t)) in rail.points.iter().zip(&rail.tangents).enumerate() {
        match solver.solve(ctx, &faces, i, p, t) {
            Ok(station) => solved.push(Some(station)),
            Err(reason) => {
                debug!(station = i, ?reason, "station skipped");
                solved.push(None);
            }
        }
    }
    let skipped = solved.iter().filter(|s| s.is_none()).count();
    if skipped > 0 {
        warn!(skipped, total = solved.len(), "stations skipped");
    }
    let mismatched = solved
        .iter()
        .flatten()
        .filter(|s| s.is_convex() != (input.side == SideMode::Inset))
        .count();
    if 2 * mismatched > solved.len() {
        warn!(side = ?input.side, mismatched, "side mode does not match the edge convexity");
    }
    fill_skipped(solved, &rail.points, &rail.tangents, rail.closed)
}

/// Cross-section of the tool at one station.
#[derive(Debug, Clone)]
pub struct Section {
    /// Rail to seam A.
    pub row_a: Vec<Point3>,
    /// Seam B to rail.
    pub row_b: Vec<Point3>,
    /// Seam A to seam B along the arc.
    pub ring: Vec<Point3>,
}

impl Section {
    fn translate(&mut self, delta: &Vector3) {
        for p in self.row_a.iter_mut().chain(&mut self.row_b).chain(&mut self.ring) {
            *p += *delta;
        }
    }

    fn seams(&self) -> (Point3, Point3) {
        (self.row_a[self.row_a.len() - 1], self.row_b[0])
    }

    /// Reorders the ring and pins its ends back onto the seams, seam A going
    /// to whichever end the reordered ring starts from.
    fn realign(&mut self, alignment: &Alignment) {
        if alignment.is_identity() {
            return;
        }
        let (seam_a, seam_b) = self.seams();
        self.ring = alignment.apply(&self.ring);
        pin_ends(&mut self.ring, seam_a, seam_b, alignment.flip);
    }

    /// Closed outline: arc, seam B to rail, rail to seam A.
    #[must_use]
    pub fn outline(&self) -> Vec<Point3> {
        let mut out = self.ring.clone();
        out.extend_from_slice(&self.row_b[1..]);
        out.extend_from_slice(&self.row_a[1..self.row_a.len() - 1]);
        out
    }
}

/// Builds the biased, optionally face-projected section of every station.
///
/// # Errors
///
/// Fails if either face is missing.
pub fn build_sections(
    input: &ToolInput<'_>,
    ctx: &mut FilletContext,
    stations: &[Station],
    closed: bool,
) -> Result<Vec<Section>> {
    let a = ctx.sampler(input.source, &input.edge.face_a)?;
    let b = ctx.sampler(input.source, &input.edge.face_b)?;
    let tol = input.tolerance;
    let sub = input.params.strip_subdivisions;
    let segments = input.params.arc_segments;
    let bias = input.side.sign() * input.seam_offset();
    let project = input.recipe.project_strips;

    let mut sections = Vec::with_capacity(stations.len());
    for st in stations {
        let rail = st.rail - (st.normal_a + st.normal_b) * bias;
        #[allow(clippy::cast_precision_loss)]
        let mut row = |target: &Point3, normal: &Vector3, sampler: &FaceSampler| {
            (0..=sub)
                .map(|j| {
                    if j == 0 {
                        return rail;
                    }
                    let q = st.rail + (target - st.rail) * (j as f64 / sub as f64);
                    let q = if project {
                        ctx.project(input.source, sampler, &q, tol.distance).point
                    } else {
                        q
                    };
                    q - normal * bias
                })
                .collect::<Vec<Point3>>()
        };
        let row_a = row(&st.tangency_a, &st.normal_a, a.as_ref());
        let mut row_b = row(&st.tangency_b, &st.normal_b, b.as_ref());
        row_b.reverse();
        let ring = build_ring(st, segments, row_a[sub], row_b[0], &tol);
        sections.push(Section { row_a, row_b, ring });
    }

    for i in 1..sections.len() {
        let alignment = align_rings(&sections[i - 1].ring, &sections[i].ring);
        sections[i].realign(&alignment);
    }

    let bulge = input.bulge();
    if !closed && bulge > 0.0 && stations.len() >= 2 {
        let last = stations.len() - 1;
        sections[0].translate(&(-stations[0].tangent * bulge));
        sections[last].translate(&(stations[last].tangent * bulge));
    }
    Ok(sections)
}

fn pin_ends(ring: &mut [Point3], seam_a: Point3, seam_b: Point3, flipped: bool) {
    let last = ring.len() - 1;
    let (first, end) = if flipped { (seam_b, seam_a) } else { (seam_a, seam_b) };
    ring[0] = first;
    ring[last] = end;
}

fn band_cost(a: &[Point3], b: &[Point3]) -> f64 {
    a.iter().zip(b).map(|(p, q)| (p - q).norm_squared()).sum()
}

/// Lofts the sections into a wedge and caps open ends.
///
/// Returns the raw tool and, for closed rails, how the loft closes.
#[must_use]
pub fn assemble_wedge(input: &ToolInput<'_>, sections: &[Section], closed: bool) -> (Solid, Option<SeamClosure>) {
    let names = input.names;
    let min_area = input.tolerance.area;
    let mut solid = Solid::new(&names.base);
    let n = sections.len();
    if n < 2 {
        return (solid, None);
    }

    let mut closing = None;
    let mut seam = None;
    if closed {
        let first = &sections[0];
        let last = &sections[n - 1];
        let alignment = align_rings(&last.ring, &first.ring);
        let mut ring = alignment.apply(&first.ring);
        pin_ends(&mut ring, first.ring[0], first.ring[first.ring.len() - 1], alignment.flip);
        #[allow(clippy::cast_precision_loss)]
        let band_mean = (0..n - 1)
            .map(|i| band_cost(&sections[i].ring, &sections[i + 1].ring))
            .sum::<f64>()
            / (n - 1) as f64;
        let closure = SeamClosure {
            alignment,
            residual: band_cost(&last.ring, &ring),
            band_mean,
        };
        if !alignment.is_identity() {
            warn!(flip = alignment.flip, shift = alignment.shift, "closing ring needed reordering");
        }
        debug!(residual = closure.residual, band_mean, "closed the seam");
        seam = Some(closure);
        closing = Some(ring);
    }

    let bands = if closed { n } else { n - 1 };
    for i in 0..bands {
        let (s0, s1) = (&sections[i], &sections[(i + 1) % n]);
        let ring1 = match (&closing, i + 1 == n) {
            (Some(ring), true) => ring,
            _ => &s1.ring,
        };
        add_all(&mut solid, &names.arc, loft(&s0.ring, ring1, i, min_area));
        add_all(&mut solid, &names.side_a, loft(&s0.row_a, &s1.row_a, i, min_area));
        add_all(&mut solid, &names.side_b, loft(&s0.row_b, &s1.row_b, i, min_area));
    }

    if !closed {
        add_all(&mut solid, &names.cap_start, cap(&sections[0], min_area, false));
        add_all(&mut solid, &names.cap_end, cap(&sections[n - 1], min_area, true));
    }
    debug!(
        sections = n,
        triangles = solid.mesh().len(),
        closed,
        "assembled wedge"
    );
    (solid, seam)
}

pub(super) fn add_all(solid: &mut Solid, face: &str, triangles: Vec<[Point3; 3]>) {
    for [a, b, c] in triangles {
        solid.add_triangle(face, a, b, c);
    }
}

/// Triangulates a section outline; `reverse` flips the winding.
fn cap(section: &Section, min_area: f64, reverse: bool) -> Vec<[Point3; 3]> {
    let outline = section.outline();
    let triangles: Vec<[usize; 3]> = if let Some(t) = triangulate_loop(&outline, min_area) {
        t.triangles
    } else {
        warn!(vertices = outline.len(), "cap outline has no plane, using fan");
        (1..outline.len().saturating_sub(1))
            .map(|i| [0, i, i + 1])
            .filter(|t| triangle_area(&outline[t[0]], &outline[t[1]], &outline[t[2]]) >= min_area)
            .collect()
    };
    triangles
        .into_iter()
        .map(|[a, b, c]| {
            if reverse {
                [outline[a], outline[c], outline[b]]
            } else {
                [outline[a], outline[b], outline[c]]
            }
        })
        .collect()
}

/// Runs the consistency layer, patches leftover holes and re-runs the layer
/// if anything was patched.
pub fn finish_tool(input: &ToolInput<'_>, tool: &mut Solid) -> (ConsistencyReport, usize) {
    let layer = ConsistencyLayer::new(input.tolerance).with_params(input.params.consistency.clone());
    let (mesh, faces) = tool.buffers_mut();
    let mut report = layer.execute(mesh, faces);
    let patched = patch_holes(
        mesh,
        faces,
        &input.names.base,
        PatchKind::Repair,
        layer.min_area(),
        layer.max_trace_length(),
    );
    if patched > 0 {
        let again = layer.execute(mesh, faces);
        report.vertices_welded += again.vertices_welded;
        report.degenerates_removed += again.degenerates_removed;
        report.manifold_dropped += again.manifold_dropped;
        report.triangles_flipped += again.triangles_flipped;
        report.reoriented |= again.reoriented;
        debug!(patched, "repair capping closed tool holes");
    }
    (report, patched)
}

/// Writes the metadata of the rounded face `arc` and the tangency/centre
/// overlays.
pub fn decorate(input: &ToolInput<'_>, tool: &mut Solid, stations: &[Station], arc: &str) {
    let names = input.names;
    let area = tool.face_area(arc);
    tool.set_face_metadata(arc, "radius", input.radius);
    tool.set_face_metadata(arc, "sourceArea", area);
    tool.set_face_metadata(arc, "faceA", input.edge.face_a.as_str());
    tool.set_face_metadata(arc, "faceB", input.edge.face_b.as_str());

    let closed = input.edge.closed;
    tool.add_aux_edge(
        &format!("{}_TANGENT_A", names.base),
        stations.iter().map(|s| s.tangency_a).collect(),
        closed,
    );
    tool.add_aux_edge(
        &format!("{}_TANGENT_B", names.base),
        stations.iter().map(|s| s.tangency_b).collect(),
        closed,
    );
    tool.add_aux_edge(
        &format!("{}_CENTERLINE", names.base),
        stations.iter().map(|s| s.center).collect(),
        closed,
    );
}

/// Ring-lofted tool: stations, sections, wedge, finishing.
///
/// # Errors
///
/// Fails on missing faces or too few solvable stations.
pub fn build_wedge(input: &ToolInput<'_>, ctx: &mut FilletContext, mode: SolverMode) -> Result<ToolBuild> {
    let rail = Rail::from_edge(input.edge, input.radius, input.params);
    let stations = solve_stations(input, ctx, &rail, mode)?;
    let sections = build_sections(input, ctx, &stations, rail.closed)?;
    let (mut tool, seam) = assemble_wedge(input, &sections, rail.closed);
    let (consistency, patched) = finish_tool(input, &mut tool);
    decorate(input, &mut tool, &stations, &input.names.arc);
    Ok(ToolBuild {
        tool,
        stations,
        seam,
        consistency,
        patched,
    })
}

/// Triangles of one face as a standalone mesh.
#[must_use]
pub fn face_submesh(solid: &Solid, face: &str) -> TriMesh {
    let mut out = TriMesh::new();
    let Some(id) = solid.faces().id(face) else {
        return out;
    };
    out.vertices.clone_from(&solid.mesh().vertices);
    for (tri, &f) in solid.mesh().triangles.iter().zip(&solid.mesh().face_ids) {
        if f == id {
            out.push_triangle(*tri, id);
        }
    }
    out.compact_vertices();
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::EdgeAdjacency;
    use crate::operations::creation::MakeBox;
    use approx::assert_relative_eq;

    fn cube() -> Solid {
        MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)).execute().unwrap()
    }

    fn input<'a>(
        solid: &'a Solid,
        edge: &'a EdgeSelection,
        params: &'a FilletParams,
        names: &'a FaceNames,
    ) -> ToolInput<'a> {
        ToolInput {
            source: solid,
            edge,
            radius: 0.1,
            side: SideMode::Inset,
            recipe: Recipe::initial(params, 0.0),
            params,
            names,
            tolerance: Tolerance::for_radius(0.1),
        }
    }

    #[test]
    fn rail_respects_spacing_and_minimum() {
        let edge = EdgeSelection::new(vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)], "A", "B", false);
        let rail = Rail::from_edge(&edge, 0.1, &FilletParams::default());
        assert_eq!(rail.len(), 21);
        let short = EdgeSelection::new(vec![Point3::origin(), Point3::new(0.01, 0.0, 0.0)], "A", "B", false);
        assert_eq!(Rail::from_edge(&short, 0.1, &FilletParams::default()).len(), 4);
    }

    #[test]
    fn cube_edge_wedge_is_closed_and_sized() {
        let solid = cube();
        let edge = EdgeSelection::between(&solid, "TOP", "FRONT").unwrap();
        let params = FilletParams::default().with_bulge_scale(0.0).with_inset_scale(0.0);
        let names = FaceNames::new("F");
        let input = input(&solid, &edge, &params, &names);
        let build = build_wedge(&input, &mut FilletContext::default(), SolverMode::OffsetPlanes).unwrap();

        let mesh = build.tool.mesh();
        assert!(EdgeAdjacency::build(&mesh.triangles).is_closed_manifold());
        assert!(build.tool.volume() > 0.0);
        // Wedge cross-section is r^2 (1 - pi/4), up to the polygonal arc and
        // the distance-tolerance seam offset.
        let exact = 0.01 * (1.0 - std::f64::consts::FRAC_PI_4);
        assert_relative_eq!(build.tool.volume(), exact, max_relative = 0.05);
        assert_eq!(build.patched, 0);
        assert!(build.seam.is_none());
        assert!(build.stations.len() >= 4);
        for name in names.wedge_faces() {
            assert!(build.tool.faces().id(name).is_some(), "{name}");
        }
    }

    #[test]
    fn decorate_records_metadata_and_overlays() {
        let solid = cube();
        let edge = EdgeSelection::between(&solid, "TOP", "FRONT").unwrap();
        let params = FilletParams::default();
        let names = FaceNames::new("F");
        let input = input(&solid, &edge, &params, &names);
        let build = build_wedge(&input, &mut FilletContext::default(), SolverMode::OffsetPlanes).unwrap();
        let meta = build.tool.face_metadata("F_ARC").unwrap();
        assert_eq!(meta["radius"].as_number(), Some(0.1));
        assert_eq!(meta["faceA"].as_text(), Some("TOP"));
        assert!(meta["sourceArea"].as_number().unwrap() > 0.0);
        assert_eq!(build.tool.aux_edges().len(), 3);
    }

    #[test]
    fn submesh_extracts_one_face() {
        let solid = cube();
        let top = face_submesh(&solid, "TOP");
        assert_eq!(top.len(), 2);
        assert_eq!(top.vertices.len(), 4);
        assert!(face_submesh(&solid, "NOPE").is_empty());
    }

    #[test]
    fn flipped_ring_runs_from_seam_b_to_seam_a() {
        let seam_a = Point3::new(0.0, 1.0, 0.0);
        let seam_b = Point3::new(0.0, 0.0, -1.0);
        #[allow(clippy::cast_precision_loss)]
        let ring: Vec<Point3> = (0..=4)
            .map(|k| {
                let angle = std::f64::consts::FRAC_PI_2 * k as f64 / 4.0;
                Point3::new(0.0, angle.cos(), -angle.sin())
            })
            .collect();
        let mut section = Section {
            row_a: vec![Point3::origin(), seam_a],
            row_b: vec![seam_b, Point3::origin()],
            ring,
        };
        section.realign(&Alignment {
            flip: true,
            shift: 0,
            cost: 0.0,
        });

        assert_eq!(section.ring[0], seam_b);
        assert_eq!(section.ring[4], seam_a);
        let from_b: Vec<f64> = section.ring.iter().map(|p| (p - seam_b).norm()).collect();
        assert!(from_b.windows(2).all(|w| w[1] > w[0]), "{from_b:?}");

        let before = section.ring.clone();
        section.realign(&Alignment::IDENTITY);
        assert_eq!(section.ring, before);
    }

    #[test]
    fn outline_walks_arc_then_rows() {
        let section = Section {
            row_a: vec![Point3::origin(), Point3::new(0.0, 0.5, 0.0), Point3::new(0.0, 1.0, 0.0)],
            row_b: vec![Point3::new(0.0, 0.0, -1.0), Point3::new(0.0, 0.0, -0.5), Point3::origin()],
            ring: vec![Point3::new(0.0, 1.0, 0.0), Point3::new(0.0, 0.7, -0.7), Point3::new(0.0, 0.0, -1.0)],
        };
        let outline = section.outline();
        assert_eq!(outline.len(), 6);
        assert_eq!(outline[3], Point3::new(0.0, 0.0, -0.5));
        assert_eq!(outline[4], Point3::origin());
        assert_eq!(outline[5], Point3::new(0.0, 0.5, 0.0));
    }
}
