use crate::error::{Result, ValidationError};
use crate::mesh::Solid;

use super::Revolve;

/// Creates a cylinder standing on the XY plane around the +Z axis.
///
/// Internally revolves a rectangular profile; faces are `BOTTOM`, `SIDE`
/// and `TOP`, each with an optional prefix.
pub struct MakeCylinder {
    radius: f64,
    height: f64,
    segments: usize,
    name: String,
    face_prefix: String,
}

impl MakeCylinder {
    /// Creates a new `MakeCylinder` operation with 48 segments.
    #[must_use]
    pub fn new(radius: f64, height: f64) -> Self {
        Self {
            radius,
            height,
            segments: 48,
            name: "cylinder".to_owned(),
            face_prefix: String::new(),
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

    #[must_use]
    pub fn with_face_prefix(mut self, prefix: &str) -> Self {
        prefix.clone_into(&mut self.face_prefix);
        self
    }

    /// Executes the operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius or height is not positive.
    pub fn execute(&self) -> Result<Solid> {
        if self.radius <= 0.0 || self.height <= 0.0 {
            return Err(ValidationError::InvalidParameter(format!(
                "cylinder radius and height must be positive, got {} and {}",
                self.radius, self.height
            ))
            .into());
        }
        let (r, h) = (self.radius, self.height);
        let names = ["BOTTOM", "SIDE", "TOP"].map(|f| format!("{}{f}", self.face_prefix));
        let faces: Vec<&str> = names.iter().map(String::as_str).collect();
        Revolve::new(vec![(0.0, 0.0), (r, 0.0), (r, h), (0.0, h)], &faces)
            .with_segments(self.segments)
            .with_name(&self.name)
            .execute()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn volume_approaches_analytic() {
        let solid = MakeCylinder::new(1.0, 2.0).with_segments(256).execute().unwrap();
        assert_relative_eq!(solid.volume(), 2.0 * PI, max_relative = 1e-3);
        assert_eq!(solid.face_names(), vec!["BOTTOM", "SIDE", "TOP"]);
    }

    #[test]
    fn non_positive_radius_rejected() {
        assert!(MakeCylinder::new(0.0, 1.0).execute().is_err());
        assert!(MakeCylinder::new(1.0, -1.0).execute().is_err());
    }
}
