//! Bowyer–Watson insertion over the quad-edge structure.
//!
//! The cavity is carved and the fan built in a single pass around a
//! closed loop: spoke out from the new vertex, along the cavity boundary,
//! and back in through the first spoke's dual. Boundary edges whose
//! opposite triangle conflicts with the new point are unlinked and freed,
//! which splices the opposite triangle's far edges into the loop; boundary
//! edges that survive get a spoke and become a fan triangle.
//!
//! Ghost triangles take part uniformly: their conflict score is a
//! half-plane test against the two real vertices, which is exactly what
//! extends the hull when the new point lies outside it.

use crate::error::TinError;
use crate::geom::predicates::distance_sq;
use crate::quadedge::EdgeIndex;
use crate::vertex::{Vertex, VertexEntry, VertexId};
use crate::walk::Walker;

use super::IncrementalTin;

impl IncrementalTin {
    /// Insert a store-resident vertex into the bootstrapped mesh, merging
    /// it into an existing site when it lands within the coincidence
    /// tolerance. Returns the id of the site now representing the vertex.
    pub(super) fn insert_point(&mut self, vid: VertexId) -> Result<VertexId, TinError> {
        debug_assert!(self.bootstrapped, "insert_point requires a bootstrapped mesh");
        let (x, y) = self.store.xy(vid);
        let walker = Walker {
            pool: &self.pool,
            store: &self.store,
            predicates: &self.predicates,
        };
        let outcome = walker.locate(&mut self.nav, x, y)?;
        let e0 = outcome.edge();

        // Coincidence: fold into a corner of the containing triangle.
        let tol_sq = self.thresholds.vertex_tolerance_sq();
        let corners = [
            self.a_of(e0),
            self.b_of(e0),
            self.b_of(self.pool.rec(e0).forward),
        ];
        for corner in corners.into_iter().flatten() {
            let (cx, cy) = self.store.xy(corner);
            if distance_sq(cx, cy, x, y) < tol_sq {
                self.absorb(corner, vid);
                return Ok(corner);
            }
        }
        self.carve_and_fan(vid, e0)?;
        Ok(vid)
    }

    /// Merge every member of the entry at `vid` into `target` and retire
    /// the entry. Identical members are dropped silently.
    fn absorb(&mut self, target: VertexId, vid: VertexId) {
        if target == vid {
            return;
        }
        let members: Vec<Vertex> = match self.store.entry(vid) {
            VertexEntry::Single(v) => vec![*v],
            VertexEntry::Group(g) => g.members().to_vec(),
            VertexEntry::Removed => Vec::new(),
        };
        for m in members {
            self.store.merge(target, m, self.resolution);
        }
        self.store.remove(vid);
    }

    /// Carve the conflict cavity around `(x, y)` starting from the located
    /// edge and re-triangulate it as a fan around `v`.
    fn carve_and_fan(&mut self, v: VertexId, e0: EdgeIndex) -> Result<(), TinError> {
        let (x, y) = self.store.xy(v);
        let anchor = self
            .a_of(e0)
            .ok_or_else(|| TinError::internal("located edge has a null origin"))?;

        // First spoke; the boundary loop is closed from the start:
        // p_start -> e0 -> ... -> (old reverse of e0) -> p_start.dual.
        let mut p_start = self.pool.alloc(Some(v), Some(anchor));
        let old_rev = self.pool.rec(e0).reverse;
        self.pool.link(p_start, e0);
        self.pool.link(old_rev, p_start.dual());

        let mut c = p_start;
        let budget = 4 * self.pool.count() + 64;
        for _ in 0..budget {
            let e = self.pool.rec(c).forward;
            if self.cavity_conflict(e, x, y)? {
                // Splice the opposite triangle's far edges into the loop
                // and release the shared edge.
                let d = e.dual();
                let n1 = self.pool.rec(d).forward;
                let n2 = self.pool.rec(n1).forward;
                let after = self.pool.rec(e).forward;
                self.pool.link(c, n1);
                self.pool.link(n2, after);
                self.free_pair(e, &mut [&mut p_start, &mut c]);
            } else {
                let next = self.pool.rec(e).forward;
                if next == p_start.dual() {
                    // Closing triangle (c, e, p_start.dual).
                    self.pool.link(p_start.dual(), c);
                    self.nav.edge = p_start;
                    return Ok(());
                }
                let q = self.b_of(e);
                let s = self.pool.alloc(Some(v), q);
                self.pool.link(e, s.dual());
                self.pool.link(s.dual(), c);
                self.pool.link(s, next);
                c = s;
            }
        }
        Err(TinError::internal("insertion cavity failed to close"))
    }

    /// Conflict score for the triangle on the far side of boundary edge
    /// `e`: in-circle for real triangles, the ghost half-plane rule when
    /// one vertex is null. `h >= 0` means the triangle joins the cavity.
    fn cavity_conflict(&self, e: EdgeIndex, x: f64, y: f64) -> Result<bool, TinError> {
        let d = e.dual();
        let n1 = self.pool.rec(d).forward;
        let n2 = self.pool.rec(n1).forward;
        debug_assert_eq!(
            self.pool.rec(n2).forward,
            d,
            "opposite face must close in three steps"
        );
        let va = self.a_of(d);
        let vb = self.a_of(n1);
        let vc = self.a_of(n2);
        let h = match (va, vb, vc) {
            (Some(a), Some(b), Some(c)) => {
                let (ax, ay) = self.store.xy(a);
                let (bx, by) = self.store.xy(b);
                let (cx, cy) = self.store.xy(c);
                self.predicates.in_circle(ax, ay, bx, by, cx, cy, x, y)
            }
            // Exactly one null vertex: take the real pair in the cyclic
            // order it appears in the ghost triangle.
            (Some(r0), Some(r1), None) => self.ghost_half_plane(r0, r1, x, y),
            (None, Some(r0), Some(r1)) => self.ghost_half_plane(r0, r1, x, y),
            (Some(r1), None, Some(r0)) => self.ghost_half_plane(r0, r1, x, y),
            _ => {
                return Err(TinError::internal(
                    "ghost triangle with fewer than two real vertices",
                ))
            }
        };
        Ok(h >= 0.0)
    }

    /// Half-plane conflict score for a ghost triangle with real pair
    /// (r0, r1). Collinear ties: a point within the segment conflicts (it
    /// will be absorbed by splitting the hull edge); a point beyond it
    /// does not (a collinear hull extension must not eat this edge).
    fn ghost_half_plane(&self, r0: VertexId, r1: VertexId, x: f64, y: f64) -> f64 {
        let (ax, ay) = self.store.xy(r0);
        let (bx, by) = self.store.xy(r1);
        let h = self.predicates.orientation(ax, ay, bx, by, x, y);
        if h != 0.0 {
            return h;
        }
        let dx = bx - ax;
        let dy = by - ay;
        let t = (x - ax) * dx + (y - ay) * dy;
        if t >= 0.0 && t <= dx * dx + dy * dy {
            1.0
        } else {
            -1.0
        }
    }
}
