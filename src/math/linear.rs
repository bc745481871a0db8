use super::{Matrix3, Point3, Vector3};

/// A plane written as `normal . x = offset`.
#[derive(Debug, Clone, Copy)]
pub struct PlaneEquation {
    pub normal: Vector3,
    pub offset: f64,
}

impl PlaneEquation {
    #[must_use]
    pub fn new(normal: Vector3, offset: f64) -> Self {
        Self { normal, offset }
    }

    /// The plane through `point` with the given normal.
    #[must_use]
    pub fn through(point: &Point3, normal: Vector3) -> Self {
        Self {
            offset: normal.dot(&point.coords),
            normal,
        }
    }
}

/// Intersects three planes with the vector-triple-product closed form.
///
/// `x = (d1 (n2 x n3) + d2 (n3 x n1) + d3 (n1 x n2)) / (n1 . (n2 x n3))`
///
/// Returns `None` when the denominator is below `min_denominator`.
#[must_use]
pub fn intersect_three_planes(
    a: &PlaneEquation,
    b: &PlaneEquation,
    c: &PlaneEquation,
    min_denominator: f64,
) -> Option<Point3> {
    let n2xn3 = b.normal.cross(&c.normal);
    let denom = a.normal.dot(&n2xn3);
    if denom.abs() < min_denominator || !denom.is_finite() {
        return None;
    }
    let n3xn1 = c.normal.cross(&a.normal);
    let n1xn2 = a.normal.cross(&b.normal);
    let x = (n2xn3 * a.offset + n3xn1 * b.offset + n1xn2 * c.offset) / denom;
    Some(Point3::from(x))
}

/// Solves the same three-plane system by Gaussian elimination with partial
/// pivoting (nalgebra LU).
///
/// Returns `None` when the system is singular to within `min_pivot`.
#[must_use]
pub fn solve_three_planes_lu(
    a: &PlaneEquation,
    b: &PlaneEquation,
    c: &PlaneEquation,
    min_pivot: f64,
) -> Option<Point3> {
    let m = Matrix3::new(
        a.normal.x, a.normal.y, a.normal.z, //
        b.normal.x, b.normal.y, b.normal.z, //
        c.normal.x, c.normal.y, c.normal.z,
    );
    let rhs = Vector3::new(a.offset, b.offset, c.offset);
    let lu = m.lu();
    if lu.determinant().abs() < min_pivot {
        return None;
    }
    let x = lu.solve(&rhs)?;
    if x.iter().all(|v| v.is_finite()) {
        Some(Point3::from(x))
    } else {
        None
    }
}
