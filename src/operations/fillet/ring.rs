use nalgebra::{Rotation3, Unit};
use tracing::debug;

use crate::math::{triangle_area, Point3, Tolerance};

use super::station::Station;

/// Discretizes the arc of `station` from tangency A to tangency B into
/// `segments + 1` points; the endpoints are replaced by `seam_a`/`seam_b`.
#[must_use]
pub fn build_ring(
    station: &Station,
    segments: usize,
    seam_a: Point3,
    seam_b: Point3,
    tolerance: &Tolerance,
) -> Vec<Point3> {
    let c = station.center;
    let u0 = station.tangency_a - c;
    let u1 = station.tangency_b - c;
    let sweep = u0.angle(&u1);
    let axis = tolerance
        .normalize(&u0.cross(&u1))
        .unwrap_or(station.tangent);
    let axis = Unit::new_unchecked(axis);

    #[allow(clippy::cast_precision_loss)]
    let mut ring: Vec<Point3> = (0..=segments)
        .map(|k| {
            let angle = sweep * k as f64 / segments as f64;
            c + Rotation3::from_axis_angle(&axis, angle) * u0
        })
        .collect();
    ring[0] = seam_a;
    ring[segments] = seam_b;
    ring
}

/// Reordering that best matches one ring to another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alignment {
    pub flip: bool,
    pub shift: usize,
    pub cost: f64,
}

impl Alignment {
    pub const IDENTITY: Self = Self {
        flip: false,
        shift: 0,
        cost: 0.0,
    };

    /// `ring` reordered by this alignment.
    #[must_use]
    pub fn apply(&self, ring: &[Point3]) -> Vec<Point3> {
        let m = ring.len();
        (0..m).map(|k| ring[self.source_index(k, m)]).collect()
    }

    fn source_index(&self, k: usize, m: usize) -> usize {
        let j = (k + self.shift) % m;
        if self.flip {
            m - 1 - j
        } else {
            j
        }
    }

    /// `true` when the alignment keeps the ring as it is.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        !self.flip && self.shift == 0
    }
}

/// Finds the flip and cyclic shift of `next` minimizing the summed squared
/// distance to `prev`. Shifts are searched on a coarse grid and refined
/// around the best coarse candidate. Mismatched or empty rings get the
/// identity.
#[must_use]
pub fn align_rings(prev: &[Point3], next: &[Point3]) -> Alignment {
    let m = prev.len();
    if m == 0 || next.len() != m {
        debug!(prev = m, next = next.len(), "ring sizes differ, keeping default alignment");
        return Alignment::IDENTITY;
    }
    let cost = |flip: bool, shift: usize| {
        let a = Alignment { flip, shift, cost: 0.0 };
        (0..m)
            .map(|k| (prev[k] - next[a.source_index(k, m)]).norm_squared())
            .sum::<f64>()
    };

    let stride = (m / 8).max(1);
    let mut best = Alignment {
        cost: cost(false, 0),
        ..Alignment::IDENTITY
    };
    for flip in [false, true] {
        for shift in (0..m).step_by(stride) {
            let c = cost(flip, shift);
            if c < best.cost {
                best = Alignment { flip, shift, cost: c };
            }
        }
    }
    let coarse = best;
    for delta in 1..stride {
        for shift in [(coarse.shift + delta) % m, (coarse.shift + m - delta) % m] {
            let c = cost(coarse.flip, shift);
            if c < best.cost {
                best = Alignment {
                    flip: coarse.flip,
                    shift,
                    cost: c,
                };
            }
        }
    }
    if !best.is_identity() {
        debug!(flip = best.flip, shift = best.shift, "ring realigned");
    }
    best
}

/// Triangulates the band between two equally sized point rows, alternating
/// the quad diagonal (checkerboard). `parity` offsets the pattern so
/// consecutive bands interleave. Triangles below `min_area` are skipped.
#[must_use]
pub fn loft(a: &[Point3], b: &[Point3], parity: usize, min_area: f64) -> Vec<[Point3; 3]> {
    let m = a.len().min(b.len());
    let mut out = Vec::with_capacity(2 * m);
    for k in 0..m.saturating_sub(1) {
        let pair = if (k + parity) % 2 == 0 {
            [[a[k], b[k], b[k + 1]], [a[k], b[k + 1], a[k + 1]]]
        } else {
            [[a[k], b[k], a[k + 1]], [a[k + 1], b[k], b[k + 1]]]
        };
        out.extend(
            pair.into_iter()
                .filter(|[p, q, r]| triangle_area(p, q, r) >= min_area),
        );
    }
    out
}
