pub mod linear;
pub mod polygon_2d;
pub mod polygon_3d;
pub mod polyline;
pub mod tolerance;
pub mod triangulate;

pub use tolerance::Tolerance;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// 3x3 matrix type.
pub type Matrix3 = nalgebra::Matrix3<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Unnormalized normal of triangle `(a, b, c)`; its length is twice the area.
#[inline]
#[must_use]
pub fn triangle_cross(a: &Point3, b: &Point3, c: &Point3) -> Vector3 {
    (b - a).cross(&(c - a))
}

/// Area of triangle `(a, b, c)`.
#[inline]
#[must_use]
pub fn triangle_area(a: &Point3, b: &Point3, c: &Point3) -> f64 {
    0.5 * triangle_cross(a, b, c).norm()
}

/// Arithmetic mean of a point set. Returns the origin for an empty slice.
#[must_use]
pub fn centroid(points: &[Point3]) -> Point3 {
    if points.is_empty() {
        return Point3::origin();
    }
    #[allow(clippy::cast_precision_loss)]
    let inv_n = 1.0 / points.len() as f64;
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum * inv_n)
}

/// Returns a unit vector perpendicular to `v`.
#[must_use]
pub fn any_perpendicular(v: &Vector3) -> Vector3 {
    let reference = if v.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    v.cross(&reference)
        .try_normalize(TOLERANCE)
        .unwrap_or_else(Vector3::z)
}

/// Closest point to `p` on triangle `(a, b, c)` (Ericson, Real-Time Collision
/// Detection, 5.1.5).
#[must_use]
pub fn closest_point_on_triangle(p: &Point3, a: &Point3, b: &Point3, c: &Point3) -> Point3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// Closest point to `p` on segment `[a, b]`, with its parameter in `[0, 1]`.
#[must_use]
pub fn closest_point_on_segment(p: &Point3, a: &Point3, b: &Point3) -> (Point3, f64) {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < TOLERANCE * TOLERANCE {
        return (*a, 0.0);
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (a + ab * t, t)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn triangle_area_right_triangle() {
        let area = triangle_area(&p(0.0, 0.0, 0.0), &p(4.0, 0.0, 0.0), &p(0.0, 3.0, 0.0));
        assert!((area - 6.0).abs() < TOLERANCE);
    }

    #[test]
    fn closest_point_inside_face() {
        let q = closest_point_on_triangle(
            &p(0.25, 0.25, 2.0),
            &p(0.0, 0.0, 0.0),
            &p(1.0, 0.0, 0.0),
            &p(0.0, 1.0, 0.0),
        );
        assert!((q - p(0.25, 0.25, 0.0)).norm() < TOLERANCE);
    }

    #[test]
    fn closest_point_clamps_to_edge() {
        let q = closest_point_on_triangle(
            &p(0.5, -1.0, 0.0),
            &p(0.0, 0.0, 0.0),
            &p(1.0, 0.0, 0.0),
            &p(0.0, 1.0, 0.0),
        );
        assert!((q - p(0.5, 0.0, 0.0)).norm() < TOLERANCE);
    }

    #[test]
    fn closest_point_clamps_to_vertex() {
        let q = closest_point_on_triangle(
            &p(3.0, 3.0, 0.0),
            &p(0.0, 0.0, 0.0),
            &p(1.0, 0.0, 0.0),
            &p(0.0, 1.0, 0.0),
        );
        assert!((q - p(0.5, 0.5, 0.0)).norm() < TOLERANCE);
    }

    #[test]
    fn perpendicular_is_unit_and_orthogonal() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        let n = any_perpendicular(&v);
        assert!((n.norm() - 1.0).abs() < 1e-12);
        assert!(n.dot(&v).abs() < 1e-12);
    }
}
