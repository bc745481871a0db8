use crate::error::{GeometryError, Result, ValidationError};
use crate::math::polygon_3d::newell_normal;
use crate::math::triangulate::triangulate_loop;
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::mesh::Solid;

use super::make_box::add_quad;

/// Extrudes a closed planar polygon along a direction vector.
///
/// Side face `i` is swept from profile edge `i -> i+1` and named
/// `faces[i]`; the end faces are named `START`/`END` unless renamed.
pub struct Extrude {
    profile: Vec<Point3>,
    faces: Vec<String>,
    direction: Vector3,
    caps: (String, String),
    name: String,
}

impl Extrude {
    /// Creates a new `Extrude` operation.
    #[must_use]
    pub fn new(profile: Vec<Point3>, faces: &[&str], direction: Vector3) -> Self {
        Self {
            profile,
            faces: faces.iter().map(|&f| f.to_owned()).collect(),
            direction,
            caps: ("START".to_owned(), "END".to_owned()),
            name: "extrude".to_owned(),
        }
    }

    /// Names of the face at the profile and at its translated copy.
    #[must_use]
    pub fn with_cap_names(mut self, start: &str, end: &str) -> Self {
        self.caps = (start.to_owned(), end.to_owned());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        name.clone_into(&mut self.name);
        self
    }

    /// Executes the extrusion, returning an outward-oriented closed solid.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a zero direction, a short profile or
    /// a face-name count that does not match the profile, and
    /// [`GeometryError::Degenerate`] if the profile has no plane or the
    /// direction lies in it.
    pub fn execute(&self) -> Result<Solid> {
        if self.direction.norm() < TOLERANCE {
            return Err(ValidationError::InvalidParameter("extrude direction must be non-zero".into()).into());
        }
        let n = self.profile.len();
        if n < 3 {
            return Err(ValidationError::PolylineTooShort { required: 3, actual: n }.into());
        }
        if self.faces.len() != n {
            return Err(ValidationError::InvalidParameter(format!(
                "extrude needs one face name per profile edge: {n} edges, {} names",
                self.faces.len()
            ))
            .into());
        }
        let normal = newell_normal(&self.profile)
            .ok_or_else(|| GeometryError::Degenerate("extrude profile has no plane".into()))?;
        if normal.dot(&self.direction).abs() < TOLERANCE {
            return Err(GeometryError::Degenerate("extrude direction lies in the profile plane".into()).into());
        }

        // Order the profile so its normal follows the direction: the start
        // cap then faces backwards and side quads face outwards.
        let (base, faces): (Vec<Point3>, Vec<&str>) = if normal.dot(&self.direction) > 0.0 {
            (self.profile.clone(), self.faces.iter().map(String::as_str).collect())
        } else {
            let mut base = self.profile.clone();
            base.reverse();
            // Edge i of the reversed loop is edge n-2-i of the original.
            let faces = (0..n).map(|i| self.faces[(2 * n - 2 - i) % n].as_str()).collect();
            (base, faces)
        };
        let top: Vec<Point3> = base.iter().map(|p| p + self.direction).collect();

        let triangulation = triangulate_loop(&base, 0.0)
            .ok_or_else(|| GeometryError::TriangulationFailed("extrude profile".into()))?;

        let mut solid = Solid::new(&self.name);
        for &[a, b, c] in &triangulation.triangles {
            solid.add_triangle(&self.caps.0, base[a], base[c], base[b]);
            solid.add_triangle(&self.caps.1, top[a], top[b], top[c]);
        }
        for i in 0..n {
            let j = (i + 1) % n;
            let outward = (base[j] - base[i]).cross(&self.direction);
            add_quad(&mut solid, faces[i], outward, [base[i], base[j], top[j], top[i]]);
        }
        Ok(solid)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::EdgeAdjacency;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn square_prism() {
        let profile = vec![p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(2.0, 1.0, 0.0), p(0.0, 1.0, 0.0)];
        let solid = Extrude::new(profile, &["S0", "S1", "S2", "S3"], Vector3::z() * 3.0)
            .execute()
            .unwrap();
        assert_relative_eq!(solid.volume(), 6.0, epsilon = 1e-12);
        assert!(EdgeAdjacency::build(&solid.mesh().triangles).is_closed_manifold());
        // S0 is swept from the y = 0 edge.
        assert!(solid.face_triangles("S0").iter().flatten().all(|q| q.y.abs() < 1e-12));
    }

    #[test]
    fn reversed_profile_keeps_edge_names() {
        // Clockwise seen from +z, extruded upwards.
        let profile = vec![p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(2.0, 1.0, 0.0), p(2.0, 0.0, 0.0)];
        let solid = Extrude::new(profile, &["W", "N", "E", "S"], Vector3::z())
            .with_cap_names("FLOOR", "ROOF")
            .execute()
            .unwrap();
        assert_relative_eq!(solid.volume(), 2.0, epsilon = 1e-12);
        assert!(solid.face_triangles("W").iter().flatten().all(|q| q.x.abs() < 1e-12));
        assert!(solid.face_triangles("E").iter().flatten().all(|q| (q.x - 2.0).abs() < 1e-12));
        assert!(solid.face_triangles("ROOF").iter().flatten().all(|q| (q.z - 1.0).abs() < 1e-12));
    }

    #[test]
    fn rejects_bad_input() {
        let profile = vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)];
        assert!(Extrude::new(profile.clone(), &["A", "B", "C"], Vector3::zeros()).execute().is_err());
        assert!(Extrude::new(profile.clone(), &["A", "B"], Vector3::z()).execute().is_err());
        assert!(Extrude::new(profile, &["A", "B", "C"], Vector3::x()).execute().is_err());
    }
}
