use tracing::debug;

use crate::error::{GeometryError, Result};
use crate::math::{centroid, Point3};
use crate::mesh::{allocate_face_id, Solid};
use crate::operations::boolean::{BooleanOp, EngineMesh, MeshEngine};

use super::context::FilletContext;
use super::params::StrategyKind;
use super::station::{SolverMode, Station};
use super::tool::{build_wedge, decorate, finish_tool, solve_stations, Rail, ToolBuild, ToolInput};
use super::tube::Tube;

/// Builds a fillet tool from one recipe.
pub trait FilletStrategy {
    fn kind(&self) -> StrategyKind;

    /// # Errors
    ///
    /// Fails on missing faces, too few solvable stations or engine errors.
    fn build(&self, input: &ToolInput<'_>, ctx: &mut FilletContext, engine: &dyn MeshEngine) -> Result<ToolBuild>;
}

/// Ring-lofted wedge with stations from offset-plane intersection.
pub struct TangentCircle;

impl FilletStrategy for TangentCircle {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TangentCircle
    }

    fn build(&self, input: &ToolInput<'_>, ctx: &mut FilletContext, _engine: &dyn MeshEngine) -> Result<ToolBuild> {
        build_wedge(input, ctx, SolverMode::OffsetPlanes)
    }
}

/// Ring-lofted wedge with stations from the cross-section bisector.
pub struct SectionSlice;

impl FilletStrategy for SectionSlice {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SectionSlice
    }

    fn build(&self, input: &ToolInput<'_>, ctx: &mut FilletContext, _engine: &dyn MeshEngine) -> Result<ToolBuild> {
        build_wedge(input, ctx, SolverMode::SectionBisector)
    }
}

/// Union of the convex hulls of consecutive station kites, with a tube
/// around the centre rail carved out.
pub struct HullChainTube;

impl HullChainTube {
    /// Rail, seam A, centre, seam B; seams biased like the wedge rows.
    fn kites(input: &ToolInput<'_>, stations: &[Station], closed: bool) -> Vec<[Point3; 4]> {
        let bias = input.side.sign() * input.seam_offset();
        let mut kites: Vec<[Point3; 4]> = stations
            .iter()
            .map(|st| {
                [
                    st.rail - (st.normal_a + st.normal_b) * bias,
                    st.tangency_a - st.normal_a * bias,
                    st.center,
                    st.tangency_b - st.normal_b * bias,
                ]
            })
            .collect();
        let bulge = input.bulge();
        if !closed && bulge > 0.0 && stations.len() >= 2 {
            let last = stations.len() - 1;
            let start = -stations[0].tangent * bulge;
            let end = stations[last].tangent * bulge;
            kites[0].iter_mut().for_each(|p| *p += start);
            kites[last].iter_mut().for_each(|p| *p += end);
        }
        kites
    }

    /// Centre rail, extended past open ends so the carve goes all the way
    /// through the hull chain.
    fn tube_path(input: &ToolInput<'_>, stations: &[Station], closed: bool) -> Vec<Point3> {
        let mut path: Vec<Point3> = stations.iter().map(|s| s.center).collect();
        if !closed {
            let reach = input.bulge() + input.radius;
            let (first, last) = (&stations[0], &stations[stations.len() - 1]);
            path.insert(0, first.center - first.tangent * reach);
            path.push(last.center + last.tangent * reach);
        }
        path
    }

    /// Names hull triangles by the source face they lie along.
    fn retag(input: &ToolInput<'_>, solid: &mut Solid, hull_tag: u32, stations: &[Station], closed: bool) {
        let names = input.names;
        let (mesh, faces) = solid.buffers_mut();
        let side_a = faces.ensure(&names.side_a);
        let side_b = faces.ensure(&names.side_b);
        let cap_start = faces.ensure(&names.cap_start);
        let cap_end = faces.ensure(&names.cap_end);

        for t in 0..mesh.len() {
            let tag = mesh.face_ids[t];
            if tag != hull_tag && faces.contains_id(tag) {
                continue;
            }
            let c = centroid(&mesh.corners(t));
            let Some((index, station)) = stations
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| (a.rail - c).norm_squared().total_cmp(&(b.rail - c).norm_squared()))
            else {
                continue;
            };
            let n = mesh.triangle_normal(t).unwrap_or(station.tangent);
            let (da, db) = (n.dot(&station.normal_a).abs(), n.dot(&station.normal_b).abs());
            mesh.face_ids[t] = if da > 0.9 && da >= db {
                side_a
            } else if db > 0.9 {
                side_b
            } else if closed {
                if da >= db {
                    side_a
                } else {
                    side_b
                }
            } else if 2 * index < stations.len() {
                cap_start
            } else {
                cap_end
            };
        }
    }
}

impl FilletStrategy for HullChainTube {
    fn kind(&self) -> StrategyKind {
        StrategyKind::HullChainTube
    }

    fn build(&self, input: &ToolInput<'_>, ctx: &mut FilletContext, engine: &dyn MeshEngine) -> Result<ToolBuild> {
        let rail = Rail::from_edge(input.edge, input.radius, input.params);
        let stations = solve_stations(input, ctx, &rail, SolverMode::OffsetPlanes)?;
        let n = stations.len();
        let closed = rail.closed;
        let kites = Self::kites(input, &stations, closed);

        let hull_tag = allocate_face_id();
        let bands = if closed { n } else { n - 1 };
        let mut chain: Option<EngineMesh> = None;
        for i in 0..bands {
            let mut points = kites[i].to_vec();
            points.extend_from_slice(&kites[(i + 1) % n]);
            let hull = engine.convex_hull(&points, hull_tag)?;
            chain = Some(match chain {
                Some(acc) => engine.boolean(&acc, &hull, BooleanOp::Union)?,
                None => hull,
            });
        }
        let chain = chain.ok_or(GeometryError::InsufficientSections { valid: n, required: 2 })?;

        let path = Self::tube_path(input, &stations, closed);
        let mut tube = Tube::new(&path, closed, input.radius, input.names)
            .with_inner_radius(input.params.tube_inner_radius)
            .with_segments(4 * input.params.arc_segments.max(2));
        if let Some(first) = stations.first() {
            tube = tube.with_reference(first.tangency_a - first.center);
        }
        let tube = tube.execute()?;
        let carved = engine.boolean(&chain, tube.engine_mesh(), BooleanOp::Subtract)?;
        debug!(
            hulls = bands,
            triangles = carved.triangle_count(),
            "hull chain carved"
        );

        let mut tool = Solid::from_parts(&input.names.base, carved.to_tri_mesh(), tube.faces().clone());
        Self::retag(input, &mut tool, hull_tag, &stations, closed);
        tool.prune_faces();
        let (consistency, patched) = finish_tool(input, &mut tool);
        decorate(input, &mut tool, &stations, &input.names.tube_outer);
        Ok(ToolBuild {
            tool,
            stations,
            seam: None,
            consistency,
            patched,
        })
    }
}

/// Strategy object for `kind`.
#[must_use]
pub fn strategy_for(kind: StrategyKind) -> Box<dyn FilletStrategy> {
    match kind {
        StrategyKind::TangentCircle => Box::new(TangentCircle),
        StrategyKind::SectionSlice => Box::new(SectionSlice),
        StrategyKind::HullChainTube => Box::new(HullChainTube),
    }
}
