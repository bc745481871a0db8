use crate::error::{Result, ValidationError};
use crate::math::{triangle_cross, Point3, Vector3};
use crate::mesh::Solid;

/// Creates an axis-aligned box solid from two corner points.
///
/// Faces are named `LEFT`/`RIGHT` (x), `FRONT`/`BACK` (y) and
/// `BOTTOM`/`TOP` (z), each with an optional prefix.
pub struct MakeBox {
    min: Point3,
    max: Point3,
    name: String,
    face_prefix: String,
}

impl MakeBox {
    /// Creates a new `MakeBox` operation.
    #[must_use]
    pub fn new(min: Point3, max: Point3) -> Self {
        Self {
            min,
            max,
            name: "box".to_owned(),
            face_prefix: String::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        name.clone_into(&mut self.name);
        self
    }

    /// Prefix prepended to every face name.
    #[must_use]
    pub fn with_face_prefix(mut self, prefix: &str) -> Self {
        prefix.clone_into(&mut self.face_prefix);
        self
    }

    /// Executes the operation, returning an outward-oriented closed solid.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidParameter`] if `min` is not strictly
    /// below `max` on every axis.
    pub fn execute(&self) -> Result<Solid> {
        let (lo, hi) = (self.min, self.max);
        if (0..3).any(|k| lo[k] >= hi[k]) {
            return Err(ValidationError::InvalidParameter(format!(
                "box corners must satisfy min < max, got {lo} and {hi}"
            ))
            .into());
        }

        let corner = |x: bool, y: bool, z: bool| {
            Point3::new(
                if x { hi.x } else { lo.x },
                if y { hi.y } else { lo.y },
                if z { hi.z } else { lo.z },
            )
        };
        let sides: [(&str, Vector3, [Point3; 4]); 6] = [
            (
                "LEFT",
                -Vector3::x(),
                [
                    corner(false, false, false),
                    corner(false, true, false),
                    corner(false, true, true),
                    corner(false, false, true),
                ],
            ),
            (
                "RIGHT",
                Vector3::x(),
                [
                    corner(true, false, false),
                    corner(true, true, false),
                    corner(true, true, true),
                    corner(true, false, true),
                ],
            ),
            (
                "FRONT",
                -Vector3::y(),
                [
                    corner(false, false, false),
                    corner(true, false, false),
                    corner(true, false, true),
                    corner(false, false, true),
                ],
            ),
            (
                "BACK",
                Vector3::y(),
                [
                    corner(false, true, false),
                    corner(true, true, false),
                    corner(true, true, true),
                    corner(false, true, true),
                ],
            ),
            (
                "BOTTOM",
                -Vector3::z(),
                [
                    corner(false, false, false),
                    corner(true, false, false),
                    corner(true, true, false),
                    corner(false, true, false),
                ],
            ),
            (
                "TOP",
                Vector3::z(),
                [
                    corner(false, false, true),
                    corner(true, false, true),
                    corner(true, true, true),
                    corner(false, true, true),
                ],
            ),
        ];

        let mut solid = Solid::new(&self.name);
        for (face, outward, quad) in sides {
            let name = format!("{}{face}", self.face_prefix);
            add_quad(&mut solid, &name, outward, quad);
        }
        Ok(solid)
    }
}

/// Adds a planar quad as two triangles wound so their normal follows `outward`.
pub(crate) fn add_quad(solid: &mut Solid, face: &str, outward: Vector3, quad: [Point3; 4]) {
    let [a, b, c, d] = if triangle_cross(&quad[0], &quad[1], &quad[2]).dot(&outward) < 0.0 {
        [quad[0], quad[3], quad[2], quad[1]]
    } else {
        quad
    };
    solid.add_triangle(face, a, b, c);
    solid.add_triangle(face, a, c, d);
}
