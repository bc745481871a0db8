use super::{any_perpendicular, Point2, Point3, Vector3, TOLERANCE};

/// Newell normal of a (possibly non-planar) polygon loop.
///
/// The result is unnormalized: its length is twice the projected area, and its
/// direction follows the loop orientation by the right-hand rule.
#[must_use]
pub fn newell_vector(points: &[Point3]) -> Vector3 {
    let n = points.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let a = &points[i];
        let b = &points[(i + 1) % n];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal
}

/// Unit Newell normal, or `None` for a degenerate loop.
#[must_use]
pub fn newell_normal(points: &[Point3]) -> Option<Vector3> {
    if points.len() < 3 {
        return None;
    }
    newell_vector(points).try_normalize(TOLERANCE)
}

/// An orthonormal frame used to flatten a nearly planar loop into 2D.
///
/// `u x v = normal`, so a loop whose Newell normal equals `normal` projects to a
/// counter-clockwise 2D polygon.
#[derive(Debug, Clone, Copy)]
pub struct PlaneFrame {
    origin: Point3,
    u_dir: Vector3,
    v_dir: Vector3,
    normal: Vector3,
}

impl PlaneFrame {
    /// Creates a frame from an origin and a normal. The normal is normalized;
    /// `None` if it is zero-length.
    #[must_use]
    pub fn from_normal(origin: Point3, normal: &Vector3) -> Option<Self> {
        let normal = normal.try_normalize(TOLERANCE)?;
        let u_dir = any_perpendicular(&normal);
        let v_dir = normal.cross(&u_dir);
        Some(Self {
            origin,
            u_dir,
            v_dir,
            normal,
        })
    }

    /// Best-fit frame of a loop: centroid origin and Newell normal.
    #[must_use]
    pub fn fit(points: &[Point3]) -> Option<Self> {
        let normal = newell_normal(points)?;
        Self::from_normal(super::centroid(points), &normal)
    }

    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    #[must_use]
    pub fn normal(&self) -> &Vector3 {
        &self.normal
    }

    /// Projects a 3D point to frame coordinates `(u, v)`.
    #[must_use]
    pub fn project(&self, p: &Point3) -> Point2 {
        let d = p - self.origin;
        Point2::new(d.dot(&self.u_dir), d.dot(&self.v_dir))
    }

    /// Lifts frame coordinates back onto the plane.
    #[must_use]
    pub fn lift(&self, p: &Point2) -> Point3 {
        self.origin + self.u_dir * p.x + self.v_dir * p.y
    }

    /// Signed distance of `p` from the plane along the normal.
    #[must_use]
    pub fn height(&self, p: &Point3) -> f64 {
        (p - self.origin).dot(&self.normal)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn unit_square() -> Vec<Point3> {
        vec![
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn newell_follows_loop_orientation() {
        let n = newell_normal(&unit_square()).unwrap();
        assert!((n - Vector3::z()).norm() < 1e-12);

        let mut rev = unit_square();
        rev.reverse();
        let n = newell_normal(&rev).unwrap();
        assert!((n + Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn newell_length_is_twice_area() {
        let v = newell_vector(&unit_square());
        assert!((v.norm() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn frame_projects_loop_counter_clockwise() {
        let square = unit_square();
        let frame = PlaneFrame::fit(&square).unwrap();
        let uv: Vec<Point2> = square.iter().map(|q| frame.project(q)).collect();
        assert!(super::super::polygon_2d::signed_area_2d(&uv) > 0.0);
    }

    #[test]
    fn frame_round_trip() {
        let frame = PlaneFrame::from_normal(p(1.0, 2.0, 3.0), &Vector3::new(1.0, 1.0, 0.0)).unwrap();
        let q = p(1.0, 2.0, 3.0) + Vector3::new(-1.0, 1.0, 0.0) * 0.3 + Vector3::z() * 0.7;
        let back = frame.lift(&frame.project(&q));
        assert!((back - q).norm() < 1e-12);
        assert!(frame.height(&q).abs() < 1e-12);
    }
}
