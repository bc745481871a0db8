use std::f64::consts::TAU;

use tracing::debug;

use crate::error::{Result, ValidationError};
use crate::math::Point3;
use crate::mesh::Solid;
use crate::operations::repair::{fix_winding, orient_outward};

/// Revolves a named `(radius, z)` profile a full turn around the +Z axis.
///
/// The profile is an open chain that starts and ends on the axis. Each
/// segment `i -> i+1` becomes the face named `faces[i]`; segments lying on
/// the axis produce nothing.
pub struct Revolve {
    profile: Vec<(f64, f64)>,
    faces: Vec<String>,
    segments: usize,
    name: String,
}

impl Revolve {
    /// Creates a new `Revolve` operation with 48 angular segments.
    #[must_use]
    pub fn new(profile: Vec<(f64, f64)>, faces: &[&str]) -> Self {
        Self {
            profile,
            faces: faces.iter().map(|&f| f.to_owned()).collect(),
            segments: 48,
            name: "revolve".to_owned(),
        }
    }

    #[must_use]
    pub fn with_segments(mut self, segments: usize) -> Self {
        self.segments = segments;
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        name.clone_into(&mut self.name);
        self
    }

    fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ValidationError::InvalidParameter(msg).into());
        if self.profile.len() < 3 {
            return Err(ValidationError::PolylineTooShort {
                required: 3,
                actual: self.profile.len(),
            }
            .into());
        }
        if self.faces.len() != self.profile.len() - 1 {
            return invalid(format!(
                "revolve needs one face name per profile segment: {} segments, {} names",
                self.profile.len() - 1,
                self.faces.len()
            ));
        }
        if self.segments < 3 {
            return invalid(format!("revolve needs at least 3 segments, got {}", self.segments));
        }
        if self.profile.iter().any(|&(r, _)| r < 0.0) {
            return invalid("revolve profile radii must be non-negative".to_owned());
        }
        let (first, last) = (self.profile[0], self.profile[self.profile.len() - 1]);
        if first.0 != 0.0 || last.0 != 0.0 {
            return invalid("revolve profile must start and end on the axis".to_owned());
        }
        Ok(())
    }

    /// Executes the revolution.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a malformed profile or segment count.
    #[allow(clippy::cast_precision_loss)]
    pub fn execute(&self) -> Result<Solid> {
        self.validate()?;
        let n = self.segments;
        let angles: Vec<(f64, f64)> = (0..n)
            .map(|k| {
                let theta = TAU * k as f64 / n as f64;
                (theta.cos(), theta.sin())
            })
            .collect();
        let at = |(r, z): (f64, f64), k: usize| {
            let (c, s) = angles[k % n];
            Point3::new(r * c, r * s, z)
        };

        let mut solid = Solid::new(&self.name);
        for (i, face) in self.faces.iter().enumerate() {
            let (a, b) = (self.profile[i], self.profile[i + 1]);
            if a.0 == 0.0 && b.0 == 0.0 {
                continue;
            }
            for k in 0..n {
                let (a0, a1, b0, b1) = (at(a, k), at(a, k + 1), at(b, k), at(b, k + 1));
                if a.0 == 0.0 {
                    solid.add_triangle(face, a0, b0, b1);
                } else if b.0 == 0.0 {
                    solid.add_triangle(face, a0, a1, b0);
                } else {
                    solid.add_triangle(face, a0, a1, b1);
                    solid.add_triangle(face, a0, b1, b0);
                }
            }
        }

        let mesh = solid.mesh_mut();
        let flipped = fix_winding(mesh);
        let reoriented = orient_outward(mesh);
        debug!(
            triangles = mesh.len(),
            flipped, reoriented, "revolved profile"
        );
        Ok(solid)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::EdgeAdjacency;
    use crate::mesh::{EdgeSelection, EdgeSource};

    fn stepped() -> Revolve {
        Revolve::new(
            vec![(0.0, 0.0), (2.0, 0.0), (2.0, 1.0), (1.0, 1.0), (1.0, 2.0), (0.0, 2.0)],
            &["BOTTOM", "PLATE_SIDE", "PLATE_TOP", "BOSS_SIDE", "BOSS_TOP"],
        )
        .with_segments(32)
    }

    #[test]
    fn stepped_profile_is_closed_and_positive() {
        let solid = stepped().execute().unwrap();
        assert!(EdgeAdjacency::build(&solid.mesh().triangles).is_closed_manifold());
        assert!(solid.volume() > 0.0);
        assert_eq!(solid.face_names().len(), 5);
    }

    #[test]
    fn rim_between_plate_and_boss_is_a_closed_loop() {
        let solid = stepped().execute().unwrap();
        assert!(!solid.boundary_edge_polylines().is_empty());
        let edge = EdgeSelection::between(&solid, "PLATE_TOP", "BOSS_SIDE").unwrap();
        assert!(edge.closed);
        assert_eq!(edge.points.len(), 32);
        assert!(edge.points.iter().all(|p| (p.z - 1.0).abs() < 1e-12));
    }

    #[test]
    fn profile_off_axis_rejected() {
        let err = Revolve::new(vec![(1.0, 0.0), (2.0, 0.0), (2.0, 1.0)], &["A", "B"])
            .execute()
            .unwrap_err();
        assert!(err.to_string().contains("on the axis"));
    }

    #[test]
    fn face_count_must_match_segments() {
        let err = Revolve::new(vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)], &["A"])
            .execute()
            .unwrap_err();
        assert!(err.to_string().contains("one face name per profile segment"));
    }
}
