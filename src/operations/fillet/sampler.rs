use crate::error::{Result, ValidationError};
use crate::math::{closest_point_on_triangle, triangle_area, triangle_cross, Point3, Vector3};

/// Closest point on a face with the local face normal there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceSample {
    pub point: Point3,
    pub normal: Vector3,
    pub distance: f64,
    /// Centroid of the nearest triangle; tells which way the face extends.
    pub interior: Point3,
}

/// Nearest-point queries against the triangles of one named face.
#[derive(Debug, Clone)]
pub struct FaceSampler {
    name: String,
    triangles: Vec<[Point3; 3]>,
    normals: Vec<Vector3>,
    area: f64,
}

impl FaceSampler {
    /// Builds a sampler over the non-degenerate triangles of a face.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingFace`] if no usable triangle exists.
    pub fn new(name: &str, triangles: &[[Point3; 3]]) -> Result<Self> {
        let mut kept = Vec::with_capacity(triangles.len());
        let mut normals = Vec::with_capacity(triangles.len());
        let mut area = 0.0;
        for tri in triangles {
            if let Some(n) = triangle_cross(&tri[0], &tri[1], &tri[2]).try_normalize(1e-300) {
                kept.push(*tri);
                normals.push(n);
                area += triangle_area(&tri[0], &tri[1], &tri[2]);
            }
        }
        if kept.is_empty() {
            return Err(ValidationError::MissingFace(name.to_owned()).into());
        }
        Ok(Self {
            name: name.to_owned(),
            triangles: kept,
            normals,
            area,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        self.area
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Closest point on the face to `p`.
    ///
    /// The normal is the mean of the distinct normals of every triangle
    /// within `tolerance` of the closest distance, so points on creases of a
    /// faceted curved face get the smooth normal.
    #[must_use]
    pub fn closest(&self, p: &Point3, tolerance: f64) -> FaceSample {
        let hits: Vec<(Point3, f64)> = self
            .triangles
            .iter()
            .map(|[a, b, c]| {
                let q = closest_point_on_triangle(p, a, b, c);
                (q, (p - q).norm())
            })
            .collect();
        let (best, best_distance) = hits
            .iter()
            .enumerate()
            .min_by(|x, y| x.1 .1.total_cmp(&y.1 .1))
            .map_or((0, f64::INFINITY), |(i, h)| (i, h.1));

        let mut distinct: Vec<Vector3> = Vec::new();
        for (i, (_, d)) in hits.iter().enumerate() {
            if *d <= best_distance + tolerance {
                let n = self.normals[i];
                if !distinct.iter().any(|m| m.dot(&n) > 1.0 - 1e-9) {
                    distinct.push(n);
                }
            }
        }
        let normal = distinct
            .iter()
            .sum::<Vector3>()
            .try_normalize(1e-12)
            .unwrap_or(self.normals[best]);

        let [a, b, c] = self.triangles[best];
        FaceSample {
            point: hits[best].0,
            normal,
            distance: best_distance,
            interior: Point3::from((a.coords + b.coords + c.coords) / 3.0),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn projects_onto_plane() {
        let sampler = FaceSampler::new(
            "TOP",
            &[
                [p(0.0, 0.0, 1.0), p(1.0, 0.0, 1.0), p(1.0, 1.0, 1.0)],
                [p(0.0, 0.0, 1.0), p(1.0, 1.0, 1.0), p(0.0, 1.0, 1.0)],
            ],
        )
        .unwrap();
        let s = sampler.closest(&p(0.3, 0.6, 2.0), 1e-9);
        assert_relative_eq!(s.point, p(0.3, 0.6, 1.0), epsilon = 1e-12);
        assert_relative_eq!(s.normal, Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(s.distance, 1.0, epsilon = 1e-12);
        assert_relative_eq!(sampler.area(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn crease_normal_is_averaged() {
        // Two facets meeting at x = 0 with normals tilted +-45 degrees.
        let sampler = FaceSampler::new(
            "ROOF",
            &[
                [p(-1.0, 0.0, 0.0), p(0.0, 0.0, 1.0), p(-1.0, 1.0, 0.0)],
                [p(0.0, 0.0, 1.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 1.0)],
            ],
        )
        .unwrap();
        let s = sampler.closest(&p(0.0, 0.0, 1.0), 1e-9);
        assert!(s.normal.x.abs() < 1e-9);
    }

    #[test]
    fn degenerate_face_is_missing() {
        let err = FaceSampler::new("FLAT", &[[p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(2.0, 0.0, 0.0)]]).unwrap_err();
        assert!(err.to_string().contains("FLAT"));
    }
}
