use super::{Point2, TOLERANCE};

/// Computes the signed area of a 2D polygon (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
#[must_use]
pub fn signed_area_2d(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Twice the signed area of triangle `(a, b, c)`; positive when counter-clockwise.
#[inline]
#[must_use]
pub fn orient_2d(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Inclusive point-in-triangle test for a counter-clockwise triangle.
///
/// Points on an edge count as inside, so collinear boundary vertices block an
/// ear instead of being silently bridged.
#[must_use]
pub fn point_in_triangle_2d(p: &Point2, a: &Point2, b: &Point2, c: &Point2, eps: f64) -> bool {
    orient_2d(a, b, p) >= -eps && orient_2d(b, c, p) >= -eps && orient_2d(c, a, p) >= -eps
}

/// Winding number of `p` with respect to polygon `verts`.
///
/// Non-zero => inside, zero => outside.
#[must_use]
pub fn winding_number_2d(p: &Point2, verts: &[Point2]) -> i32 {
    let n = verts.len();
    let mut winding = 0i32;
    for i in 0..n {
        let v0 = &verts[i];
        let v1 = &verts[(i + 1) % n];
        if v0.y <= p.y {
            if v1.y > p.y && orient_2d(v0, v1, p) > 0.0 {
                winding += 1;
            }
        } else if v1.y <= p.y && orient_2d(v0, v1, p) < 0.0 {
            winding -= 1;
        }
    }
    winding
}

/// Triangulates a simple polygon by ear clipping.
///
/// Triangles keep the orientation of the input loop. Ears whose doubled area
/// is below `2 * min_area` are never emitted. Returns `None` if clipping gets
/// stuck (self-intersecting input, or a remainder that is all collinear).
#[must_use]
pub fn ear_clip(points: &[Point2], min_area: f64) -> Option<Vec<[usize; 3]>> {
    let n = points.len();
    if n < 3 {
        return None;
    }

    let area = signed_area_2d(points);
    if area.abs() < min_area {
        return None;
    }
    let reversed = area < 0.0;
    let mut remaining: Vec<usize> = if reversed {
        (0..n).rev().collect()
    } else {
        (0..n).collect()
    };

    let min_cross = 2.0 * min_area;
    let eps = TOLERANCE * bounding_extent(points).max(1.0);
    let mut triangles = Vec::with_capacity(n - 2);

    while remaining.len() > 3 {
        let m = remaining.len();
        let mut clipped = None;

        for i in 0..m {
            let ip = remaining[(i + m - 1) % m];
            let ic = remaining[i];
            let inx = remaining[(i + 1) % m];
            let (a, b, c) = (&points[ip], &points[ic], &points[inx]);

            if orient_2d(a, b, c) <= min_cross {
                continue;
            }

            let blocked = remaining.iter().any(|&k| {
                if k == ip || k == ic || k == inx {
                    return false;
                }
                let q = &points[k];
                if coincident(q, a) || coincident(q, b) || coincident(q, c) {
                    return false;
                }
                point_in_triangle_2d(q, a, b, c, eps)
            });
            if blocked {
                continue;
            }

            // Never leave a collinear final triangle behind.
            if m == 4 {
                let rest: Vec<usize> = remaining.iter().copied().filter(|&k| k != ic).collect();
                let last = orient_2d(&points[rest[0]], &points[rest[1]], &points[rest[2]]);
                if last <= min_cross {
                    continue;
                }
            }

            clipped = Some((i, [ip, ic, inx]));
            break;
        }

        let (i, tri) = clipped?;
        triangles.push(tri);
        remaining.remove(i);
    }

    let last = [remaining[0], remaining[1], remaining[2]];
    if orient_2d(&points[last[0]], &points[last[1]], &points[last[2]]) > min_cross {
        triangles.push(last);
    }

    if reversed {
        for tri in &mut triangles {
            tri.swap(1, 2);
        }
    }
    Some(triangles)
}

fn coincident(a: &Point2, b: &Point2) -> bool {
    (a - b).norm() < TOLERANCE
}

fn bounding_extent(points: &[Point2]) -> f64 {
    let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    (max - min).norm()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn total_area(points: &[Point2], tris: &[[usize; 3]]) -> f64 {
        tris.iter()
            .map(|t| 0.5 * orient_2d(&points[t[0]], &points[t[1]], &points[t[2]]))
            .sum()
    }

    #[test]
    fn signed_area_ccw_square() {
        let pts = vec![pt(0.0, 0.0), pt(1.0, 0.0), pt(1.0, 1.0), pt(0.0, 1.0)];
        assert!((signed_area_2d(&pts) - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn signed_area_cw_square() {
        let pts = vec![pt(0.0, 0.0), pt(0.0, 1.0), pt(1.0, 1.0), pt(1.0, 0.0)];
        assert!((signed_area_2d(&pts) + 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn signed_area_degenerate() {
        assert!(signed_area_2d(&[pt(0.0, 0.0)]).abs() < TOLERANCE);
        assert!(signed_area_2d(&[]).abs() < TOLERANCE);
    }

    #[test]
    fn winding_inside_and_outside() {
        let sq = vec![pt(0.0, 0.0), pt(1.0, 0.0), pt(1.0, 1.0), pt(0.0, 1.0)];
        assert_ne!(winding_number_2d(&pt(0.5, 0.5), &sq), 0);
        assert_eq!(winding_number_2d(&pt(1.5, 0.5), &sq), 0);
    }

    #[test]
    fn ear_clip_concave_polygon() {
        // L-shape
        let pts = vec![
            pt(0.0, 0.0),
            pt(2.0, 0.0),
            pt(2.0, 1.0),
            pt(1.0, 1.0),
            pt(1.0, 2.0),
            pt(0.0, 2.0),
        ];
        let tris = ear_clip(&pts, 1e-12).unwrap();
        assert_eq!(tris.len(), 4);
        assert!((total_area(&pts, &tris) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn ear_clip_keeps_clockwise_orientation() {
        let pts = vec![pt(0.0, 0.0), pt(0.0, 1.0), pt(1.0, 1.0), pt(1.0, 0.0)];
        let tris = ear_clip(&pts, 1e-12).unwrap();
        assert!((total_area(&pts, &tris) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn ear_clip_uses_collinear_boundary_vertex() {
        // Square with an extra vertex in the middle of the bottom edge.
        let pts = vec![
            pt(0.0, 0.0),
            pt(0.5, 0.0),
            pt(1.0, 0.0),
            pt(1.0, 1.0),
            pt(0.0, 1.0),
        ];
        let tris = ear_clip(&pts, 1e-12).unwrap();
        assert_eq!(tris.len(), 3);
        assert!(tris.iter().any(|t| t.contains(&1)));
        assert!((total_area(&pts, &tris) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ear_clip_rejects_degenerate_polygon() {
        let pts = vec![pt(0.0, 0.0), pt(1.0, 0.0), pt(2.0, 0.0)];
        assert!(ear_clip(&pts, 1e-12).is_none());
    }
}
