use super::{closest_point_on_segment, Point3, Vector3, TOLERANCE};

/// Drops a terminal point that repeats the first one, so closed loops carry
/// each vertex exactly once.
#[must_use]
pub fn normalize_closed(points: &[Point3], tolerance: f64) -> Vec<Point3> {
    let mut out: Vec<Point3> = Vec::with_capacity(points.len());
    for p in points {
        if out.last().is_some_and(|q| (q - p).norm() <= tolerance) {
            continue;
        }
        out.push(*p);
    }
    while out.len() > 1 {
        let (Some(first), Some(last)) = (out.first(), out.last()) else {
            break;
        };
        if (first - last).norm() <= tolerance {
            out.pop();
        } else {
            break;
        }
    }
    out
}

/// Total length of a polyline; includes the closing segment when `closed`.
#[must_use]
pub fn polyline_length(points: &[Point3], closed: bool) -> f64 {
    segments(points, closed).map(|(a, b)| (b - a).norm()).sum()
}

/// Iterates over the segments of a polyline.
pub fn segments(points: &[Point3], closed: bool) -> impl Iterator<Item = (&Point3, &Point3)> + '_ {
    let n = points.len();
    let count = if closed && n > 2 { n } else { n.saturating_sub(1) };
    (0..count).map(move |i| (&points[i], &points[(i + 1) % n]))
}

/// Unit tangent at every vertex by central differences.
///
/// Closed loops wrap around; open ends use one-sided differences. A vertex
/// whose neighbours coincide inherits the previous tangent.
#[must_use]
pub fn tangents(points: &[Point3], closed: bool) -> Vec<Vector3> {
    let n = points.len();
    let mut out = Vec::with_capacity(n);
    let mut last = Vector3::x();
    for i in 0..n {
        let (prev, next) = if closed {
            (points[(i + n - 1) % n], points[(i + 1) % n])
        } else {
            (points[i.saturating_sub(1)], points[(i + 1).min(n - 1)])
        };
        let t = (next - prev).try_normalize(TOLERANCE).unwrap_or(last);
        last = t;
        out.push(t);
    }
    out
}

/// Inserts evenly spaced points so no segment is longer than `max_step`, and
/// an open polyline has at least `min_points` points.
#[must_use]
pub fn resample(points: &[Point3], closed: bool, max_step: f64, min_points: usize) -> Vec<Point3> {
    if points.len() < 2 {
        return points.to_vec();
    }
    let total = polyline_length(points, closed);
    let mut step = max_step.max(TOLERANCE);
    if !closed && min_points > 1 {
        #[allow(clippy::cast_precision_loss)]
        let needed = total / (min_points - 1) as f64;
        step = step.min(needed.max(TOLERANCE));
    }

    let mut out = Vec::with_capacity(points.len());
    for (a, b) in segments(points, closed) {
        let len = (b - a).norm();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pieces = ((len / step - 1e-9).ceil() as usize).max(1);
        out.push(*a);
        for k in 1..pieces {
            #[allow(clippy::cast_precision_loss)]
            let t = k as f64 / pieces as f64;
            out.push(a + (b - a) * t);
        }
    }
    if !closed {
        if let Some(last) = points.last() {
            out.push(*last);
        }
    }
    out
}

/// Result of a closest-point query on a polyline.
#[derive(Debug, Clone, Copy)]
pub struct PolylineProjection {
    /// Closest point on the polyline.
    pub point: Point3,
    /// Distance from the query point.
    pub distance: f64,
    /// Arc length from the first vertex to `point`.
    pub arc_length: f64,
    /// Index of the segment containing `point`.
    pub segment: usize,
}

/// Closest point on a polyline, parameterized by arc length.
#[must_use]
pub fn closest_point(points: &[Point3], closed: bool, q: &Point3) -> Option<PolylineProjection> {
    if points.len() == 1 {
        return Some(PolylineProjection {
            point: points[0],
            distance: (q - points[0]).norm(),
            arc_length: 0.0,
            segment: 0,
        });
    }
    let mut best: Option<PolylineProjection> = None;
    let mut walked = 0.0;
    for (i, (a, b)) in segments(points, closed).enumerate() {
        let seg_len = (b - a).norm();
        let (c, t) = closest_point_on_segment(q, a, b);
        let d = (q - c).norm();
        if best.is_none_or(|bp| d < bp.distance) {
            best = Some(PolylineProjection {
                point: c,
                distance: d,
                arc_length: walked + t * seg_len,
                segment: i,
            });
        }
        walked += seg_len;
    }
    best
}
