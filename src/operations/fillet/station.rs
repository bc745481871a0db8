//! Tangent-circle solving at one rail sample.
//!
//! For a rail point `p` with tangent `t` between faces with outward normals
//! `nA`, `nB`, the circle centre `C` satisfies
//!
//! ```text
//! nA . C = nA . qA + s r
//! nB . C = nB . qB + s r
//! t  . C = t  . p
//! ```
//!
//! where `qA`, `qB` are the projections of `p` onto each face and `s` is
//! `+1` for outset and `-1` for inset fillets. The tangency points are
//! `C - s r nA` and `C - s r nB`.

use tracing::{debug, warn};

use crate::error::{GeometryError, Result};
use crate::math::linear::{intersect_three_planes, solve_three_planes_lu, PlaneEquation};
use crate::math::{Point3, Tolerance, Vector3};
use crate::mesh::MeshSource;

use super::context::FilletContext;
use super::params::SideMode;
use super::sampler::{FaceSample, FaceSampler};

/// Relative deviation from the expected centre distance that triggers a
/// refinement pass.
const REFINE_THRESHOLD: f64 = 0.1;

/// How a station's centre was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMethod {
    /// Vector-triple-product closed form.
    TripleProduct,
    /// LU with partial pivoting.
    Lu,
    /// Bisector of the face traces in the section plane.
    Bisector,
    /// Mean face normal offset.
    MeanNormal,
    /// Copied rigidly from a neighbouring station.
    Carried,
}

/// How centres are solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverMode {
    /// Offset planes first, then the bisector and mean-normal fallbacks.
    OffsetPlanes,
    /// Section bisector first, then the mean-normal fallback.
    SectionBisector,
}

/// Why a station was skipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SkipReason {
    ZeroTangent,
    NearlyCoplanar { half_angle: f64 },
    Unsolvable,
}

/// Full tangency state at one rail sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Station {
    pub index: usize,
    pub rail: Point3,
    pub tangent: Vector3,
    pub normal_a: Vector3,
    pub normal_b: Vector3,
    pub center: Point3,
    pub tangency_a: Point3,
    pub tangency_b: Point3,
    /// Half the angle between the face normals; negative on concave edges.
    pub half_angle: f64,
    pub method: SolveMethod,
}

impl Station {
    #[must_use]
    pub fn is_convex(&self) -> bool {
        self.half_angle >= 0.0
    }

    /// Distance from the rail point to the centre expected for `radius`.
    #[must_use]
    pub fn expected_distance(&self, radius: f64) -> f64 {
        radius / self.half_angle.abs().cos()
    }

    /// This station moved rigidly onto another rail sample.
    #[must_use]
    pub fn carried_to(&self, index: usize, rail: Point3, tangent: Vector3) -> Self {
        let delta = rail - self.rail;
        Self {
            index,
            rail,
            tangent,
            center: self.center + delta,
            tangency_a: self.tangency_a + delta,
            tangency_b: self.tangency_b + delta,
            method: SolveMethod::Carried,
            ..*self
        }
    }
}

/// Faces a station is solved against.
pub struct StationFaces<'a> {
    pub source: &'a dyn MeshSource,
    pub a: &'a FaceSampler,
    pub b: &'a FaceSampler,
}

/// Solves stations for one radius and side.
#[derive(Debug, Clone, Copy)]
pub struct StationSolver {
    radius: f64,
    side: SideMode,
    tolerance: Tolerance,
    mode: SolverMode,
}

impl StationSolver {
    #[must_use]
    pub fn new(radius: f64, side: SideMode, tolerance: Tolerance) -> Self {
        Self {
            radius,
            side,
            tolerance,
            mode: SolverMode::OffsetPlanes,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: SolverMode) -> Self {
        self.mode = mode;
        self
    }

    /// Solves the station at rail point `p` with tangent `t`.
    ///
    /// # Errors
    ///
    /// Returns the [`SkipReason`] when the station cannot be solved.
    pub fn solve(
        &self,
        ctx: &mut FilletContext,
        faces: &StationFaces<'_>,
        index: usize,
        p: &Point3,
        t: &Vector3,
    ) -> std::result::Result<Station, SkipReason> {
        let tol = &self.tolerance;
        let t = tol.normalize(t).ok_or(SkipReason::ZeroTangent)?;
        let sample_a = ctx.project(faces.source, faces.a, p, tol.distance);
        let sample_b = ctx.project(faces.source, faces.b, p, tol.distance);

        let first = self.solve_from(p, &t, &sample_a, &sample_b)?;
        let expected = first.expected_distance(self.radius);
        let deviation = ((first.center - p).norm() - expected).abs();
        if deviation <= REFINE_THRESHOLD * expected {
            return Ok(Station { index, ..first });
        }

        // Re-anchor on the faces at the first tangency points.
        let refined_a = ctx.project(faces.source, faces.a, &first.tangency_a, tol.distance);
        let refined_b = ctx.project(faces.source, faces.b, &first.tangency_b, tol.distance);
        let anchored_a = FaceSample {
            interior: sample_a.interior,
            ..refined_a
        };
        let anchored_b = FaceSample {
            interior: sample_b.interior,
            ..refined_b
        };
        match self.solve_from(p, &t, &anchored_a, &anchored_b) {
            Ok(second) => {
                debug!(index, deviation, method = ?second.method, "refined station");
                Ok(Station { index, ..second })
            }
            Err(_) => Ok(Station { index, ..first }),
        }
    }

    fn solve_from(
        &self,
        p: &Point3,
        t: &Vector3,
        sample_a: &FaceSample,
        sample_b: &FaceSample,
    ) -> std::result::Result<Station, SkipReason> {
        let tol = &self.tolerance;
        let (na, nb) = (sample_a.normal, sample_b.normal);
        let cos = na.dot(&nb).clamp(-1.0, 1.0);
        let half = 0.5 * cos.acos();
        if half < tol.angle || na.cross(&nb).norm() < tol.vector {
            return Err(SkipReason::NearlyCoplanar { half_angle: half });
        }

        let s = self.side.sign();
        let r = self.radius;
        let expected = r / half.cos();
        let planes = [
            PlaneEquation::new(na, na.dot(&sample_a.point.coords) + s * r),
            PlaneEquation::new(nb, nb.dot(&sample_b.point.coords) + s * r),
            PlaneEquation::through(p, *t),
        ];

        let mut solved = match self.mode {
            SolverMode::OffsetPlanes => intersect_three_planes(&planes[0], &planes[1], &planes[2], tol.vector)
                .map(|c| (c, SolveMethod::TripleProduct))
                .or_else(|| {
                    solve_three_planes_lu(&planes[0], &planes[1], &planes[2], tol.vector)
                        .map(|c| (c, SolveMethod::Lu))
                }),
            SolverMode::SectionBisector => None,
        };
        if solved.is_none() {
            solved = self.fallback(p, t, &na, &nb, expected);
        }
        let Some((mut center, mut method)) = solved else {
            return Err(SkipReason::Unsolvable);
        };

        let cap = (6.0 * r).max(3.0 * expected);
        if (center - p).norm() > cap {
            warn!(distance = (center - p).norm(), cap, "station centre past safety cap");
            let (c, m) = self.fallback(p, t, &na, &nb, expected).ok_or(SkipReason::Unsolvable)?;
            center = c;
            method = m;
        }

        // Convex when face B extends below face A's plane.
        let convex = (sample_b.interior - p).dot(&na) <= 0.0;
        Ok(Station {
            index: 0,
            rail: *p,
            tangent: *t,
            normal_a: na,
            normal_b: nb,
            center,
            tangency_a: center - na * (s * r),
            tangency_b: center - nb * (s * r),
            half_angle: if convex { half } else { -half },
            method,
        })
    }

    fn fallback(
        &self,
        p: &Point3,
        t: &Vector3,
        na: &Vector3,
        nb: &Vector3,
        expected: f64,
    ) -> Option<(Point3, SolveMethod)> {
        self.bisector(p, t, na, nb)
            .map(|c| (c, SolveMethod::Bisector))
            .or_else(|| {
                let s = self.side.sign();
                let dir = self.tolerance.normalize(&(na + nb))?;
                Some((p + dir * (s * expected), SolveMethod::MeanNormal))
            })
    }

    /// Centre on the bisector of the two face traces in the section plane.
    fn bisector(&self, p: &Point3, t: &Vector3, na: &Vector3, nb: &Vector3) -> Option<Point3> {
        let tol = &self.tolerance;
        let s = self.side.sign();
        let trace = |n: &Vector3, other: &Vector3| {
            let d = tol.normalize(&t.cross(n))?;
            Some(if d.dot(other) * s >= 0.0 { d } else { -d })
        };
        let da = trace(na, nb)?;
        let db = trace(nb, na)?;
        let psi = da.dot(&db).clamp(-1.0, 1.0).acos();
        let sin_half = (0.5 * psi).sin();
        if sin_half < tol.angle {
            return None;
        }
        let dir = tol.normalize(&(da + db))?;
        Some(p + dir * (self.radius / sin_half))
    }
}

/// Replaces skipped stations by rigidly carrying the previous valid station
/// (the next one for leading gaps; cyclically for closed rails).
///
/// # Errors
///
/// Returns [`GeometryError::InsufficientSections`] with fewer than two solved
/// stations.
pub fn fill_skipped(
    solved: Vec<Option<Station>>,
    rail: &[Point3],
    tangents: &[Vector3],
    closed: bool,
) -> Result<Vec<Station>> {
    let valid = solved.iter().flatten().count();
    if valid < 2 {
        return Err(GeometryError::InsufficientSections { valid, required: 2 }.into());
    }
    let n = solved.len();
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        if let Some(station) = solved[i] {
            out.push(station);
            continue;
        }
        let source = if closed {
            (1..n).map(|k| (i + n - k) % n).find_map(|j| solved[j])
        } else {
            (0..i)
                .rev()
                .find_map(|j| solved[j])
                .or_else(|| (i + 1..n).find_map(|j| solved[j]))
        };
        if let Some(source) = source {
            out.push(source.carried_to(i, rail[i], tangents[i]));
        }
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::creation::MakeBox;
    use approx::assert_relative_eq;

    fn cube_faces() -> (crate::mesh::Solid, FilletContext) {
        let solid = MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)).execute().unwrap();
        (solid, FilletContext::default())
    }

    fn solve_on_cube(mode: SolverMode, side: SideMode, r: f64) -> Station {
        let (solid, mut ctx) = cube_faces();
        let a = ctx.sampler(&solid, "TOP").unwrap();
        let b = ctx.sampler(&solid, "FRONT").unwrap();
        let faces = StationFaces {
            source: &solid,
            a: &a,
            b: &b,
        };
        StationSolver::new(r, side, Tolerance::for_radius(r))
            .with_mode(mode)
            .solve(&mut ctx, &faces, 3, &Point3::new(0.5, 0.0, 1.0), &Vector3::x())
            .unwrap()
    }

    #[test]
    fn inset_cube_edge_triple_product() {
        let st = solve_on_cube(SolverMode::OffsetPlanes, SideMode::Inset, 0.1);
        assert_eq!(st.method, SolveMethod::TripleProduct);
        assert_eq!(st.index, 3);
        assert_relative_eq!(st.center, Point3::new(0.5, 0.1, 0.9), epsilon = 1e-12);
        assert_relative_eq!(st.tangency_a, Point3::new(0.5, 0.1, 1.0), epsilon = 1e-12);
        assert_relative_eq!(st.tangency_b, Point3::new(0.5, 0.0, 0.9), epsilon = 1e-12);
        assert_relative_eq!((st.center - st.tangency_a).norm(), 0.1, epsilon = 1e-12);
        assert_relative_eq!((st.center - st.tangency_b).norm(), 0.1, epsilon = 1e-12);
        assert!(st.is_convex());
        assert_relative_eq!((st.center - st.rail).norm(), st.expected_distance(0.1), epsilon = 1e-12);
    }

    #[test]
    fn section_bisector_agrees_on_planar_faces() {
        let a = solve_on_cube(SolverMode::OffsetPlanes, SideMode::Inset, 0.2);
        let b = solve_on_cube(SolverMode::SectionBisector, SideMode::Inset, 0.2);
        assert_eq!(b.method, SolveMethod::Bisector);
        assert_relative_eq!(a.center, b.center, epsilon = 1e-12);
    }

    #[test]
    fn outset_centre_lies_outside() {
        let st = solve_on_cube(SolverMode::OffsetPlanes, SideMode::Outset, 0.1);
        assert_relative_eq!(st.center, Point3::new(0.5, -0.1, 1.1), epsilon = 1e-12);
        assert_relative_eq!(st.tangency_a, Point3::new(0.5, -0.1, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn coplanar_faces_skip() {
        let solid = MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)).execute().unwrap();
        let mut ctx = FilletContext::default();
        let a = ctx.sampler(&solid, "TOP").unwrap();
        let faces = StationFaces {
            source: &solid,
            a: &a,
            b: &a,
        };
        let err = StationSolver::new(0.1, SideMode::Inset, Tolerance::for_radius(0.1))
            .solve(&mut ctx, &faces, 0, &Point3::new(0.5, 0.5, 1.0), &Vector3::x())
            .unwrap_err();
        assert!(matches!(err, SkipReason::NearlyCoplanar { .. }));
    }

    #[test]
    fn zero_tangent_skips() {
        let (solid, mut ctx) = cube_faces();
        let a = ctx.sampler(&solid, "TOP").unwrap();
        let b = ctx.sampler(&solid, "FRONT").unwrap();
        let faces = StationFaces {
            source: &solid,
            a: &a,
            b: &b,
        };
        let err = StationSolver::new(0.1, SideMode::Inset, Tolerance::for_radius(0.1))
            .solve(&mut ctx, &faces, 0, &Point3::new(0.5, 0.0, 1.0), &Vector3::zeros())
            .unwrap_err();
        assert_eq!(err, SkipReason::ZeroTangent);
    }

    #[test]
    fn gaps_are_filled_rigidly() {
        let st = solve_on_cube(SolverMode::OffsetPlanes, SideMode::Inset, 0.1);
        let rail: Vec<Point3> = (0..4).map(|i| Point3::new(f64::from(i) * 0.25, 0.0, 1.0)).collect();
        let tangents = vec![Vector3::x(); 4];
        let solved = vec![
            None,
            Some(st.carried_to(1, rail[1], tangents[1])),
            None,
            Some(st.carried_to(3, rail[3], tangents[3])),
        ];
        let filled = fill_skipped(solved, &rail, &tangents, false).unwrap();
        assert_eq!(filled.len(), 4);
        assert_eq!(filled[0].method, SolveMethod::Carried);
        assert_relative_eq!(filled[0].center, Point3::new(0.0, 0.1, 0.9), epsilon = 1e-12);
        assert_relative_eq!(filled[2].center, Point3::new(0.5, 0.1, 0.9), epsilon = 1e-12);
        assert_eq!(filled[2].index, 2);
    }

    #[test]
    fn too_few_sections_is_an_error() {
        let rail = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        let tangents = vec![Vector3::x(); 2];
        let err = fill_skipped(vec![None, None], &rail, &tangents, false).unwrap_err();
        assert!(err.to_string().contains("insufficient valid sections"));
    }
}
