//! Orientation and in-circle predicates with extended-precision fallback.
//!
//! Each predicate computes the standard double determinant first. When the
//! magnitude falls below the matching threshold the result is recomputed
//! in double-double arithmetic, whose sign is taken as ground truth. A
//! disagreement between the two signs bumps a diagnostic counter; the
//! counters are per-instance so that TINs built side by side do not
//! contaminate each other's statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use super::dd::two_diff;
use super::thresholds::Thresholds;

/// Snapshot of the predicate diagnostic counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PredicateDiagnostics {
    /// Number of extended-precision recomputations.
    pub extended_count: u64,
    /// Number of times the extended sign disagreed with the fast sign.
    pub sign_flip_count: u64,
}

/// Deterministic geometric predicates bound to one thresholds record.
///
/// Counters use relaxed atomics so read-only queries (which also evaluate
/// predicates) can share the TIN across threads after construction.
#[derive(Debug)]
pub struct Predicates {
    thresholds: Thresholds,
    extended: AtomicU64,
    flips: AtomicU64,
}

impl Predicates {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            extended: AtomicU64::new(0),
            flips: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn diagnostics(&self) -> PredicateDiagnostics {
        PredicateDiagnostics {
            extended_count: self.extended.load(Ordering::Relaxed),
            sign_flip_count: self.flips.load(Ordering::Relaxed),
        }
    }

    pub fn reset_diagnostics(&self) {
        self.extended.store(0, Ordering::Relaxed);
        self.flips.store(0, Ordering::Relaxed);
    }

    /// Signed double area of the parallelogram spanned by (a→b, a→c):
    /// positive when `c` lies to the left of the directed line a→b.
    pub fn orientation(&self, ax: f64, ay: f64, bx: f64, by: f64, cx: f64, cy: f64) -> f64 {
        let fast = (bx - ax) * (cy - ay) - (by - ay) * (cx - ax);
        if fast.abs() >= self.thresholds.half_plane() {
            return fast;
        }
        let exact = orientation_dd(ax, ay, bx, by, cx, cy);
        self.note_fallback(fast, exact);
        exact
    }

    /// Signed area of triangle (a, b, c); positive for CCW order.
    #[inline]
    pub fn area(&self, ax: f64, ay: f64, bx: f64, by: f64, cx: f64, cy: f64) -> f64 {
        0.5 * self.orientation(ax, ay, bx, by, cx, cy)
    }

    /// In-circle determinant: positive when `d` lies strictly inside the
    /// circumcircle of the CCW triangle (a, b, c), zero on it, negative
    /// outside.
    #[allow(clippy::too_many_arguments)]
    pub fn in_circle(
        &self,
        ax: f64,
        ay: f64,
        bx: f64,
        by: f64,
        cx: f64,
        cy: f64,
        dx: f64,
        dy: f64,
    ) -> f64 {
        let adx = ax - dx;
        let ady = ay - dy;
        let bdx = bx - dx;
        let bdy = by - dy;
        let cdx = cx - dx;
        let cdy = cy - dy;

        let ad2 = adx * adx + ady * ady;
        let bd2 = bdx * bdx + bdy * bdy;
        let cd2 = cdx * cdx + cdy * cdy;

        let fast = adx * (bdy * cd2 - cdy * bd2) - ady * (bdx * cd2 - cdx * bd2)
            + ad2 * (bdx * cdy - cdx * bdy);
        if fast.abs() >= self.thresholds.in_circle() {
            return fast;
        }
        let exact = in_circle_dd(ax, ay, bx, by, cx, cy, dx, dy);
        self.note_fallback(fast, exact);
        exact
    }

    #[inline]
    fn note_fallback(&self, fast: f64, exact: f64) {
        self.extended.fetch_add(1, Ordering::Relaxed);
        if sign_of(fast) != sign_of(exact) {
            self.flips.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[inline]
fn sign_of(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Orientation determinant in double-double arithmetic. The coordinate
/// differences are error-free, so the result sign is exact for all inputs
/// whose true magnitude exceeds ~2^-106 of the operand scale.
fn orientation_dd(ax: f64, ay: f64, bx: f64, by: f64, cx: f64, cy: f64) -> f64 {
    let abx = two_diff(bx, ax);
    let aby = two_diff(by, ay);
    let acx = two_diff(cx, ax);
    let acy = two_diff(cy, ay);
    abx.mul(acy).sub(aby.mul(acx)).value()
}

/// In-circle determinant in double-double arithmetic.
#[allow(clippy::too_many_arguments)]
fn in_circle_dd(ax: f64, ay: f64, bx: f64, by: f64, cx: f64, cy: f64, dx: f64, dy: f64) -> f64 {
    let adx = two_diff(ax, dx);
    let ady = two_diff(ay, dy);
    let bdx = two_diff(bx, dx);
    let bdy = two_diff(by, dy);
    let cdx = two_diff(cx, dx);
    let cdy = two_diff(cy, dy);

    let ad2 = adx.mul(adx).add(ady.mul(ady));
    let bd2 = bdx.mul(bdx).add(bdy.mul(bdy));
    let cd2 = cdx.mul(cdx).add(cdy.mul(cdy));

    let t0 = bdy.mul(cd2).sub(cdy.mul(bd2));
    let t1 = bdx.mul(cd2).sub(cdx.mul(bd2));
    let t2 = bdx.mul(cdy).sub(cdx.mul(bdy));

    adx.mul(t0).sub(ady.mul(t1)).add(ad2.mul(t2)).value()
}

/// Squared planar distance between two points.
#[inline]
pub fn distance_sq(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let dx = bx - ax;
    let dy = by - ay;
    dx * dx + dy * dy
}
