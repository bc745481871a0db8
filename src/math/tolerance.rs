use super::Vector3;

/// Scale-adaptive thresholds derived from the fillet radius.
///
/// Every stage of tool construction and repair compares against these values
/// instead of the global [`TOLERANCE`](super::TOLERANCE), so a 0.01 mm fillet and a
/// 50 mm fillet behave the same way relative to their size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Point coincidence distance.
    pub distance: f64,
    /// Minimum half-angle (radians) between two face normals for a station
    /// to be solvable.
    pub angle: f64,
    /// Minimum length for a vector to be considered non-zero.
    pub vector: f64,
    /// Minimum triangle area kept by repair and emission.
    pub area: f64,
    /// Cell size of the vertex welding grid.
    pub weld: f64,
    /// The radius these thresholds were derived from.
    pub radius: f64,
}

impl Tolerance {
    /// Derives the tolerance set for a fillet of the given radius.
    #[must_use]
    pub fn for_radius(radius: f64) -> Self {
        let scale = radius.abs().max(1e-9);
        Self {
            distance: (scale * 1e-6).max(1e-9),
            angle: 1e-3,
            vector: (scale * 1e-9).max(1e-12),
            area: (1e-8 * scale * scale).max(1e-12),
            weld: (scale * 1e-6).max(1e-9),
            radius: scale,
        }
    }

    /// Returns `true` if `v` is too short to define a direction.
    #[must_use]
    pub fn is_zero_length(&self, v: &Vector3) -> bool {
        v.norm() < self.vector
    }

    /// Normalizes `v`, or returns `None` if it is below the vector threshold.
    #[must_use]
    pub fn normalize(&self, v: &Vector3) -> Option<Vector3> {
        v.try_normalize(self.vector)
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::for_radius(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_scale_with_radius() {
        let small = Tolerance::for_radius(0.01);
        let large = Tolerance::for_radius(10.0);
        assert!(small.distance < large.distance);
        assert!(small.area < large.area);
        assert!((small.angle - large.angle).abs() < f64::EPSILON);
    }

    #[test]
    fn area_threshold_has_floor() {
        let tiny = Tolerance::for_radius(1e-6);
        assert!((tiny.area - 1e-12).abs() < 1e-24);
    }

    #[test]
    fn zero_length_detection() {
        let tol = Tolerance::for_radius(1.0);
        assert!(tol.is_zero_length(&Vector3::new(0.0, 0.0, 1e-13)));
        assert!(!tol.is_zero_length(&Vector3::new(0.0, 0.0, 1e-3)));
        assert!(tol.normalize(&Vector3::zeros()).is_none());
    }
}
