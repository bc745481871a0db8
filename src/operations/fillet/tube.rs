use std::f64::consts::TAU;

use crate::error::{Result, ValidationError};
use crate::math::polyline::tangents;
use crate::math::{any_perpendicular, Point3, Vector3};
use crate::mesh::Solid;
use crate::operations::repair::{fix_winding, orient_outward};

use super::naming::FaceNames;
use super::ring::{align_rings, loft};
use super::tool::add_all;

/// Swept circular tube around a polyline, optionally hollow.
///
/// Faces are the `_TUBE_Outer`/`_TUBE_Inner` walls and, for open paths, the
/// `_TUBE_CapStart`/`_TUBE_CapEnd` discs (annuli when hollow).
pub struct Tube<'a> {
    path: &'a [Point3],
    closed: bool,
    outer: f64,
    inner: f64,
    segments: usize,
    reference: Option<Vector3>,
    names: &'a FaceNames,
}

impl<'a> Tube<'a> {
    #[must_use]
    pub fn new(path: &'a [Point3], closed: bool, outer: f64, names: &'a FaceNames) -> Self {
        Self {
            path,
            closed,
            outer,
            inner: 0.0,
            segments: 16,
            reference: None,
            names,
        }
    }

    #[must_use]
    pub fn with_inner_radius(mut self, inner: f64) -> Self {
        self.inner = inner;
        self
    }

    #[must_use]
    pub fn with_segments(mut self, segments: usize) -> Self {
        self.segments = segments;
        self
    }

    /// Direction of the first vertex of the first cross-section.
    #[must_use]
    pub fn with_reference(mut self, reference: Vector3) -> Self {
        self.reference = Some(reference);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.outer <= 0.0 {
            return Err(ValidationError::NonPositiveRadius { radius: self.outer }.into());
        }
        if self.inner < 0.0 || self.inner >= self.outer {
            return Err(ValidationError::InvalidTubeRadii {
                inner: self.inner,
                outer: self.outer,
            }
            .into());
        }
        let required = if self.closed { 3 } else { 2 };
        if self.path.len() < required {
            return Err(ValidationError::PolylineTooShort {
                required,
                actual: self.path.len(),
            }
            .into());
        }
        if self.segments < 3 {
            return Err(ValidationError::InvalidParameter(format!(
                "tube needs at least 3 segments, got {}",
                self.segments
            ))
            .into());
        }
        Ok(())
    }

    /// Parallel-transported `(u, v)` frames along the path.
    fn frames(&self) -> Vec<(Vector3, Vector3)> {
        let ts = tangents(self.path, self.closed);
        let mut u = self
            .reference
            .and_then(|r| (r - ts[0] * r.dot(&ts[0])).try_normalize(1e-12))
            .unwrap_or_else(|| any_perpendicular(&ts[0]));
        ts.iter()
            .map(|t| {
                u = (u - t * u.dot(t))
                    .try_normalize(1e-12)
                    .unwrap_or_else(|| any_perpendicular(t));
                (u, t.cross(&u))
            })
            .collect()
    }

    #[allow(clippy::cast_precision_loss)]
    fn rings(&self, radius: f64, frames: &[(Vector3, Vector3)]) -> Vec<Vec<Point3>> {
        let n = self.segments;
        let mut rings: Vec<Vec<Point3>> = self
            .path
            .iter()
            .zip(frames)
            .map(|(c, (u, v))| {
                (0..n)
                    .map(|k| {
                        let theta = TAU * k as f64 / n as f64;
                        c + (u * theta.cos() + v * theta.sin()) * radius
                    })
                    .collect()
            })
            .collect();
        if self.closed {
            // Transport does not close the frame in general; realign the
            // closing ring cyclically against the last one.
            let last = rings.len() - 1;
            let alignment = align_rings(&rings[last], &rings[0]);
            let closing = alignment.apply(&rings[0]);
            rings.push(closing);
        }
        rings
    }

    /// Builds the tube solid, outward oriented.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for non-positive radii, an inner radius
    /// not below the outer one, or a too-short path.
    pub fn execute(&self) -> Result<Solid> {
        self.validate()?;
        let frames = self.frames();
        let outer = self.rings(self.outer, &frames);
        let inner = (self.inner > 0.0).then(|| self.rings(self.inner, &frames));
        let names = self.names;

        let wrap = |ring: &[Point3]| {
            let mut row = ring.to_vec();
            row.push(ring[0]);
            row
        };
        let mut solid = Solid::new(&format!("{}_TUBE", names.base));

        for i in 0..outer.len() - 1 {
            add_all(&mut solid, &names.tube_outer, loft(&wrap(&outer[i]), &wrap(&outer[i + 1]), i, 0.0));
            if let Some(inner) = &inner {
                add_all(&mut solid, &names.tube_inner, loft(&wrap(&inner[i + 1]), &wrap(&inner[i]), i, 0.0));
            }
        }

        if !self.closed {
            let last = outer.len() - 1;
            for (face, index, reverse) in [(&names.tube_cap_start, 0, false), (&names.tube_cap_end, last, true)] {
                let ring = wrap(&outer[index]);
                let tris = if let Some(inner) = &inner {
                    loft(&wrap(&inner[index]), &ring, 0, 0.0)
                } else {
                    let c = self.path[index];
                    ring.windows(2).map(|w| [c, w[0], w[1]]).collect()
                };
                let tris = if reverse {
                    tris.into_iter().map(|[a, b, c]| [a, c, b]).collect()
                } else {
                    tris
                };
                add_all(&mut solid, face, tris);
            }
        }

        let mesh = solid.mesh_mut();
        fix_winding(mesh);
        orient_outward(mesh);
        Ok(solid)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::EdgeAdjacency;
    use approx::assert_relative_eq;

    fn straight() -> Vec<Point3> {
        vec![Point3::origin(), Point3::new(0.0, 0.0, 1.0), Point3::new(0.0, 0.0, 2.0)]
    }

    #[test]
    fn solid_tube_is_closed() {
        let names = FaceNames::new("T");
        let path = straight();
        let tube = Tube::new(&path, false, 0.5, &names).with_segments(64).execute().unwrap();
        assert!(EdgeAdjacency::build(&tube.mesh().triangles).is_closed_manifold());
        let expected = std::f64::consts::PI * 0.25 * 2.0;
        assert_relative_eq!(tube.volume(), expected, max_relative = 5e-3);
        assert!(tube.face_names().contains(&"T_TUBE_CapStart".to_owned()));
    }

    #[test]
    fn hollow_tube_has_inner_wall() {
        let names = FaceNames::new("T");
        let path = straight();
        let tube = Tube::new(&path, false, 0.5, &names)
            .with_inner_radius(0.25)
            .with_segments(64)
            .execute()
            .unwrap();
        assert!(EdgeAdjacency::build(&tube.mesh().triangles).is_closed_manifold());
        let expected = std::f64::consts::PI * (0.25 - 0.0625) * 2.0;
        assert_relative_eq!(tube.volume(), expected, max_relative = 5e-3);
        assert!(tube.face_area("T_TUBE_Inner") > 0.0);
    }

    #[test]
    fn closed_ring_tube() {
        let names = FaceNames::new("T");
        let path: Vec<Point3> = (0..24)
            .map(|k| {
                let t = TAU * f64::from(k) / 24.0;
                Point3::new(2.0 * t.cos(), 2.0 * t.sin(), 0.0)
            })
            .collect();
        let tube = Tube::new(&path, true, 0.3, &names).execute().unwrap();
        assert!(EdgeAdjacency::build(&tube.mesh().triangles).is_closed_manifold());
        assert!(tube.volume() > 0.0);
        assert!(tube.faces().id("T_TUBE_CapStart").is_none());
    }

    #[test]
    fn reference_sets_first_vertex() {
        let names = FaceNames::new("T");
        let path = straight();
        let tube = Tube::new(&path, false, 1.0, &names)
            .with_reference(Vector3::y())
            .execute()
            .unwrap();
        assert!(tube
            .mesh()
            .vertices
            .iter()
            .any(|v| (v - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-12));
    }

    #[test]
    fn radii_are_validated() {
        let names = FaceNames::new("T");
        let path = straight();
        let err = Tube::new(&path, false, 0.5, &names)
            .with_inner_radius(0.5)
            .execute()
            .unwrap_err();
        assert!(err.to_string().contains("inner radius"));
        assert!(Tube::new(&path, false, 0.0, &names).execute().is_err());
        assert!(Tube::new(&path[..1], false, 1.0, &names).execute().is_err());
    }
}
