//! Stochastic Lawson's walk for point location.
//!
//! Purpose
//! - Starting from a cached edge, cross triangle edges toward the query
//!   point until the containing triangle is reached; when the query is
//!   outside the convex hull, hand off to a perimeter sub-walk that slides
//!   along ghost triangles until it finds the hull edge subtending the
//!   point.
//! - The choice of which triangle edge to test first is randomized with a
//!   crawler-owned xorshift stream, which breaks the cycling that a fixed
//!   test order can fall into on near-degenerate meshes. The stream is
//!   seeded, so identical inputs walk identically.

use nalgebra::Vector2;

use crate::error::TinError;
use crate::geom::Predicates;
use crate::quadedge::{EdgeIndex, EdgePool};
use crate::vertex::VertexStore;

/// Default xorshift seed; `clear()` resets walkers to this value so that
/// rebuilding from identical input reproduces the mesh bit for bit.
pub(crate) const DEFAULT_WALK_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Xorshift generator with parameters (21, 35, 4).
#[derive(Clone, Copy, Debug)]
pub(crate) struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { DEFAULT_WALK_SEED } else { seed },
        }
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 21;
        x ^= x >> 35;
        x ^= x << 4;
        self.state = x;
        x
    }

    #[inline]
    pub fn next_bool(&mut self) -> bool {
        self.next_u64() & 1 == 1
    }
}

/// Value-type locator: a cached start edge plus a private random stream.
///
/// Navigators observe the TIN without mutating it, so read-only threads
/// can each own one. A navigator's cached edge may go stale across
/// mutations; the walk revalidates it and falls back to the pool's first
/// real edge.
#[derive(Clone, Debug)]
pub struct Navigator {
    pub(crate) edge: EdgeIndex,
    pub(crate) rng: XorShift64,
}

impl Navigator {
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_WALK_SEED)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            edge: EdgeIndex::NONE,
            rng: XorShift64::new(seed),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.edge = EdgeIndex::NONE;
        self.rng = XorShift64::new(DEFAULT_WALK_SEED);
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a walk ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WalkOutcome {
    /// An edge of the triangle containing the query point (the point lies
    /// on or to the left of all three edges).
    Interior(EdgeIndex),
    /// The query is outside the hull; this is the exterior-side perimeter
    /// edge that subtends it most closely.
    Exterior(EdgeIndex),
}

impl WalkOutcome {
    #[inline]
    pub fn edge(self) -> EdgeIndex {
        match self {
            WalkOutcome::Interior(e) | WalkOutcome::Exterior(e) => e,
        }
    }
}

/// Borrowed view of the structures a walk reads.
pub(crate) struct Walker<'a> {
    pub pool: &'a EdgePool,
    pub store: &'a VertexStore,
    pub predicates: &'a Predicates,
}

impl Walker<'_> {
    /// Locate `(x, y)` starting from the navigator's cached edge.
    pub fn locate(&self, nav: &mut Navigator, x: f64, y: f64) -> Result<WalkOutcome, TinError> {
        let mut e = nav.edge;
        if !self.pool.is_allocated(e) {
            e = self
                .pool
                .start_edge()
                .ok_or_else(|| TinError::internal("walk started on an empty mesh"))?;
        }
        // Normalize a ghost seed to the adjacent real perimeter edge.
        if self.pool.rec(e).vertex.is_none() {
            e = e.dual();
        }
        if self.pool.rec(e.dual()).vertex.is_none() {
            e = self.pool.rec(e).reverse;
        }

        let budget = 4 * self.pool.count() + 64;
        for _ in 0..budget {
            let a = self.vertex_xy(e);
            let b = self.vertex_xy(e.dual());
            let h = self.predicates.orientation(a.0, a.1, b.0, b.1, x, y);
            if h < 0.0 {
                e = e.dual();
                continue;
            }
            let f = self.pool.rec(e).forward;
            let c = self.pool.rec(f.dual()).vertex;
            if c.is_none() {
                // Walked into a ghost triangle: `e` is the exterior side of
                // a hull edge and the query lies on its outer half-plane.
                let out = self.perimeter_walk(e, x, y)?;
                nav.edge = out;
                return Ok(WalkOutcome::Exterior(out));
            }
            let g = self.pool.rec(f).forward;
            let c = self.vertex_xy(f.dual());
            // Randomize which of the two remaining edges gets tested first.
            let (first, second) = if nav.rng.next_bool() { (f, g) } else { (g, f) };
            let mut crossed = false;
            for edge in [first, second] {
                let h2 = if edge == f {
                    self.predicates.orientation(b.0, b.1, c.0, c.1, x, y)
                } else {
                    self.predicates.orientation(c.0, c.1, a.0, a.1, x, y)
                };
                if h2 < 0.0 {
                    e = edge.dual();
                    crossed = true;
                    break;
                }
            }
            if crossed {
                continue;
            }
            nav.edge = e;
            return Ok(WalkOutcome::Interior(e));
        }
        Err(TinError::internal("point-location walk failed to converge"))
    }

    /// Slide along the hull's ghost triangles until the exterior edge whose
    /// span subtends the query is found.
    fn perimeter_walk(&self, start: EdgeIndex, x: f64, y: f64) -> Result<EdgeIndex, TinError> {
        let q = Vector2::new(x, y);
        let mut o = start;
        let mut prev = start;
        // One full lap plus slack; more means the hull linkage is broken.
        let budget = self.pool.count() + 8;
        let mut last_dir: Option<bool> = None;
        for _ in 0..budget {
            let a = self.vertex_vec(o);
            let b = self.vertex_vec(o.dual());
            let h = self.predicates.orientation(a.x, a.y, b.x, b.y, x, y);
            let span = b - a;
            let t = (q - a).dot(&span);
            let len2 = span.norm_squared();
            if h >= 0.0 && t >= 0.0 && t <= len2 {
                return Ok(o);
            }
            // Step toward the end of the edge the projection points past;
            // inside the span but on the wrong side, keep the current
            // heading (the query is around a corner).
            let toward_b = if t > len2 {
                true
            } else if t < 0.0 {
                false
            } else {
                last_dir.unwrap_or(true)
            };
            if let Some(d) = last_dir {
                if d != toward_b {
                    // Oscillating across a corner vertex: the query sits in
                    // the wedge beyond it. Prefer the edge it is strictly
                    // exterior to; a grazed edge (h = 0) would hand the
                    // insertion a triangle the point only touches.
                    return Ok(if h > 0.0 { o } else { prev });
                }
            }
            last_dir = Some(toward_b);
            prev = o;
            o = if toward_b {
                // outer edge of the next hull edge B-ward
                let bn = self.pool.rec(o).forward; // (B -> null)
                self.pool.rec(bn.dual()).forward
            } else {
                // outer edge of the next hull edge A-ward
                let na = self.pool.rec(o).reverse; // (null -> A)
                self.pool.rec(na.dual()).reverse
            };
        }
        Err(TinError::internal("perimeter walk looped without resolution"))
    }

    #[inline]
    fn vertex_xy(&self, e: EdgeIndex) -> (f64, f64) {
        let id = self.pool.rec(e).vertex.expect("real vertex expected");
        self.store.xy(id)
    }

    #[inline]
    fn vertex_vec(&self, e: EdgeIndex) -> Vector2<f64> {
        let (x, y) = self.vertex_xy(e);
        Vector2::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xorshift_is_reproducible_and_nonzero() {
        let mut a = XorShift64::new(42);
        let mut b = XorShift64::new(42);
        for _ in 0..64 {
            let x = a.next_u64();
            assert_eq!(x, b.next_u64());
            assert_ne!(x, 0);
        }
        // A zero seed silently falls back to the default stream.
        let mut z = XorShift64::new(0);
        let mut d = XorShift64::new(DEFAULT_WALK_SEED);
        assert_eq!(z.next_u64(), d.next_u64());
    }

    #[test]
    fn navigator_resets_to_default_stream() {
        let mut nav = Navigator::with_seed(7);
        nav.rng.next_u64();
        nav.reset();
        let mut fresh = XorShift64::new(DEFAULT_WALK_SEED);
        assert_eq!(nav.rng.next_u64(), fresh.next_u64());
        assert!(nav.edge.is_none());
    }
}
