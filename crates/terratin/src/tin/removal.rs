//! Vertex removal: ring cavitation and Devillers ear re-triangulation.
//!
//! The ring of edges incident to the doomed vertex is unlinked, leaving a
//! closed cavity polygon. Ears (one per polygon vertex) are scored by the
//! in-circle predicate of their triangle against the removed vertex; the
//! minimum-score ear is always safe to close, which rebuilds a Delaunay
//! triangulation of the hole. The null vertex participates as an ordinary
//! polygon vertex when a hull vertex is removed: its ears score infinite,
//! and when no finite ear remains a ghost-abutting ear whose candidate
//! hull edge keeps every other cavity vertex on the interior side is
//! closed instead, rebuilding the hull edge by edge.

use tracing::debug;

use crate::error::TinError;
use crate::quadedge::EdgeIndex;
use crate::vertex::{Vertex, VertexEntry, VertexId};
use crate::walk::{WalkOutcome, Walker};

use super::IncrementalTin;

/// Cavity polygon node used by the ear queue.
struct EarNode {
    prev: usize,
    next: usize,
    vertex: Option<VertexId>,
    /// Boundary edge from this polygon vertex to the next.
    out_edge: EdgeIndex,
    score: f64,
    alive: bool,
}

impl IncrementalTin {
    /// Remove a vertex. Returns true when the vertex was present (by
    /// identity: index and coordinates) and removed. Removing one member
    /// of a merger group only shrinks the group.
    pub fn remove(&mut self, v: &Vertex) -> Result<bool, TinError> {
        if self.disposed {
            return Err(TinError::Disposed);
        }
        if self.locked {
            return Err(TinError::Locked);
        }
        if !self.bootstrapped {
            return Ok(self.remove_pending(v));
        }

        let walker = Walker {
            pool: &self.pool,
            store: &self.store,
            predicates: &self.predicates,
        };
        let outcome = walker.locate(&mut self.nav, v.x, v.y)?;
        // Candidate half-edges whose origins could be the doomed site; for
        // an exterior query the subtending hull edge's endpoints still
        // qualify (a merged group member may sit just outside the hull).
        let candidates = match outcome {
            WalkOutcome::Interior(e) => {
                let f = self.pool.rec(e).forward;
                [e, f, self.pool.rec(f).forward]
            }
            WalkOutcome::Exterior(outer) => {
                let inner = outer.dual();
                [outer, inner, self.pool.rec(inner).forward]
            }
        };
        let tol_sq = self.thresholds.vertex_tolerance_sq();
        let mut site = None;
        for cand in candidates {
            if let Some(id) = self.a_of(cand) {
                let (cx, cy) = self.store.xy(id);
                if v.distance_sq(cx, cy) < tol_sq && self.store.holds_identity(id, v) {
                    site = Some((id, cand));
                    break;
                }
            }
        }
        let Some((vid, spoke)) = site else {
            return Ok(false);
        };

        // Shrinking a group is not a structural change.
        if matches!(self.store.entry(vid), VertexEntry::Group(_)) {
            let left = self.store.shrink(vid, v);
            if left >= 1 {
                return Ok(true);
            }
        }

        if self.store.live_count() == 3 {
            // Removing from the minimal mesh dissolves it.
            self.store.remove(vid);
            self.dissolve_to_pending()?;
            return Ok(true);
        }

        self.remove_site(vid, spoke)?;
        self.store.remove(vid);
        self.nav.edge = self.pool.start_edge().unwrap_or(EdgeIndex::NONE);
        Ok(true)
    }

    /// Pre-bootstrap removal touches only the pending list.
    fn remove_pending(&mut self, v: &Vertex) -> bool {
        let Some(pos) = self
            .pending
            .iter()
            .position(|&id| self.store.holds_identity(id, v))
        else {
            return false;
        };
        let id = self.pending[pos];
        if matches!(self.store.entry(id), VertexEntry::Group(_)) {
            if self.store.shrink(id, v) >= 1 {
                return true;
            }
        }
        self.store.remove(id);
        self.pending.remove(pos);
        true
    }

    /// Tear the whole mesh down to the pre-bootstrap state, requeueing
    /// every surviving vertex, then retry the bootstrap.
    fn dissolve_to_pending(&mut self) -> Result<(), TinError> {
        debug!("dissolving mesh to pre-bootstrap state");
        self.pending = self.store.iter().map(|(id, _)| id).collect();
        self.pool.clear();
        self.bootstrapped = false;
        self.nav.reset();
        self.try_bootstrap()?;
        Ok(())
    }

    /// Structurally remove the site `vid`, whose ring is reachable from
    /// `spoke` (a half-edge with origin `vid`).
    fn remove_site(&mut self, vid: VertexId, spoke: EdgeIndex) -> Result<(), TinError> {
        debug_assert_eq!(self.a_of(spoke), Some(vid));
        let (vx, vy) = self.store.xy(vid);

        // Collect the ring: spokes out of `vid` and the opposite boundary
        // edge of each incident triangle.
        let mut spokes: Vec<EdgeIndex> = Vec::new();
        let mut boundary: Vec<EdgeIndex> = Vec::new();
        let mut s = spoke;
        loop {
            spokes.push(s);
            let b = self.pool.rec(s).forward;
            boundary.push(b);
            let s_next = self.pool.rec(b).forward.dual();
            if s_next == spoke {
                break;
            }
            s = s_next;
            if spokes.len() > self.pool.count() {
                return Err(TinError::internal("vertex ring traversal looped"));
            }
        }
        let n = boundary.len();
        if n < 3 {
            return Err(TinError::internal("vertex ring shorter than three edges"));
        }

        let poly: Vec<Option<VertexId>> = boundary.iter().map(|&b| self.a_of(b)).collect();

        // A hull-vertex removal that would leave every survivor collinear
        // cannot be re-triangulated; the mesh dissolves instead.
        if poly.iter().any(|v| v.is_none()) {
            let reals: Vec<VertexId> = poly.iter().flatten().copied().collect();
            if reals.len() + 1 == self.store.live_count() && self.all_collinear(&reals) {
                self.store.remove(vid);
                return self.dissolve_to_pending();
            }
        }

        // Close the cavity polygon first so no live edge still links to a
        // spoke, then free the spokes, keeping held indices fresh across
        // pool relocations.
        for i in 0..n {
            self.pool.link(boundary[i], boundary[(i + 1) % n]);
        }
        for i in 0..spokes.len() {
            let s = spokes[i];
            if let Some(relo) = self.pool.free(s) {
                self.nav.edge = relo.remap(self.nav.edge);
                for b in boundary.iter_mut() {
                    *b = relo.remap(*b);
                }
                for j in (i + 1)..spokes.len() {
                    spokes[j] = relo.remap(spokes[j]);
                }
            }
        }

        self.fill_ring_cavity(&boundary, &poly, vx, vy)
    }

    /// Devillers ear fill of the ring cavity left by the removed vertex at
    /// `(vx, vy)`.
    fn fill_ring_cavity(
        &mut self,
        boundary: &[EdgeIndex],
        poly: &[Option<VertexId>],
        vx: f64,
        vy: f64,
    ) -> Result<(), TinError> {
        let n = boundary.len();
        let mut nodes: Vec<EarNode> = (0..n)
            .map(|i| EarNode {
                prev: (i + n - 1) % n,
                next: (i + 1) % n,
                vertex: poly[i],
                out_edge: boundary[i],
                score: 0.0,
                alive: true,
            })
            .collect();
        for i in 0..n {
            nodes[i].score = self.ear_score(&nodes, i, vx, vy);
        }

        let mut live = n;
        while live > 3 {
            let pick = match self.min_finite_ear(&nodes) {
                Some(i) => i,
                None => self.pick_ghost_ear(&nodes)?,
            };
            let pi = nodes[pick].prev;
            let ni = nodes[pick].next;
            let closing = self
                .pool
                .alloc(nodes[pi].vertex, nodes[ni].vertex);
            // Triangle (prior, apex, next) out of the two boundary edges
            // plus the closing edge's inner side.
            self.pool.link(nodes[pi].out_edge, nodes[pick].out_edge);
            self.pool.link(nodes[pick].out_edge, closing.dual());
            self.pool.link(closing.dual(), nodes[pi].out_edge);

            nodes[pi].out_edge = closing;
            nodes[pick].alive = false;
            nodes[pi].next = ni;
            nodes[ni].prev = pi;
            live -= 1;
            nodes[pi].score = self.ear_score(&nodes, pi, vx, vy);
            nodes[ni].score = self.ear_score(&nodes, ni, vx, vy);
        }

        // The last three nodes close the final (real or ghost) triangle.
        let i = nodes
            .iter()
            .position(|nd| nd.alive)
            .ok_or_else(|| TinError::internal("ear list emptied prematurely"))?;
        let j = nodes[i].next;
        let k = nodes[j].next;
        debug_assert_eq!(nodes[k].next, i, "final ears must form a cycle");
        self.pool.link(nodes[i].out_edge, nodes[j].out_edge);
        self.pool.link(nodes[j].out_edge, nodes[k].out_edge);
        self.pool.link(nodes[k].out_edge, nodes[i].out_edge);
        Ok(())
    }

    /// Devillers score of the ear at node `i`: the in-circle predicate of
    /// (prior, apex, next) against the removed point. Non-convex and
    /// null-touching ears are not closable by score.
    fn ear_score(&self, nodes: &[EarNode], i: usize, vx: f64, vy: f64) -> f64 {
        let (p, a, nx) = (
            nodes[nodes[i].prev].vertex,
            nodes[i].vertex,
            nodes[nodes[i].next].vertex,
        );
        let (Some(p), Some(a), Some(nx)) = (p, a, nx) else {
            return f64::INFINITY;
        };
        let (px, py) = self.store.xy(p);
        let (ax, ay) = self.store.xy(a);
        let (nxx, nxy) = self.store.xy(nx);
        if self.predicates.orientation(px, py, ax, ay, nxx, nxy) <= 0.0 {
            return f64::INFINITY;
        }
        self.predicates
            .in_circle(px, py, ax, ay, nxx, nxy, vx, vy)
    }

    fn min_finite_ear(&self, nodes: &[EarNode]) -> Option<usize> {
        let mut best = None;
        let mut best_score = f64::INFINITY;
        for (i, nd) in nodes.iter().enumerate() {
            if nd.alive && nd.score < best_score {
                best_score = nd.score;
                best = Some(i);
            }
        }
        best
    }

    /// With no finite-score ear left, close a ghost-abutting ear (real
    /// apex, one null neighbour) whose candidate hull edge keeps every
    /// other real cavity vertex on the interior side.
    fn pick_ghost_ear(&self, nodes: &[EarNode]) -> Result<usize, TinError> {
        for (i, nd) in nodes.iter().enumerate() {
            if !nd.alive {
                continue;
            }
            let Some(apex) = nd.vertex else { continue };
            let p = nodes[nd.prev].vertex;
            let nx = nodes[nd.next].vertex;
            // The candidate hull edge runs opposite the polygon direction:
            // (apex -> prior) when the next vertex is the null, and
            // (next -> apex) when the prior is.
            let (h0, h1) = match (p, nx) {
                (Some(p), None) => (apex, p),
                (None, Some(q)) => (q, apex),
                _ => continue,
            };
            if self.hull_edge_admits(nodes, i, h0, h1) {
                return Ok(i);
            }
        }
        Err(TinError::internal(
            "removal cavity has no closable ear; ear list inconsistent",
        ))
    }

    /// Every live real cavity vertex other than the candidate endpoints
    /// must lie strictly left of the candidate hull edge, or collinear
    /// beyond its span.
    fn hull_edge_admits(
        &self,
        nodes: &[EarNode],
        _ear: usize,
        h0: VertexId,
        h1: VertexId,
    ) -> bool {
        let (ax, ay) = self.store.xy(h0);
        let (bx, by) = self.store.xy(h1);
        for nd in nodes.iter() {
            if !nd.alive {
                continue;
            }
            let Some(x) = nd.vertex else { continue };
            if x == h0 || x == h1 {
                continue;
            }
            let (px, py) = self.store.xy(x);
            let h = self.predicates.orientation(ax, ay, bx, by, px, py);
            if h > 0.0 {
                continue;
            }
            if h < 0.0 {
                return false;
            }
            // Collinear: acceptable only beyond the span.
            let dx = bx - ax;
            let dy = by - ay;
            let t = (px - ax) * dx + (py - ay) * dy;
            if t >= 0.0 && t <= dx * dx + dy * dy {
                return false;
            }
        }
        true
    }

    /// True when every vertex lies on one line within the half-plane
    /// threshold.
    fn all_collinear(&self, ids: &[VertexId]) -> bool {
        if ids.len() < 3 {
            return true;
        }
        let (ax, ay) = self.store.xy(ids[0]);
        // Find a second point far enough to anchor the line.
        let tol_sq = self.thresholds.vertex_tolerance_sq();
        let Some(&second) = ids[1..].iter().find(|&&id| {
            let (x, y) = self.store.xy(id);
            (x - ax) * (x - ax) + (y - ay) * (y - ay) > tol_sq
        }) else {
            return true;
        };
        let (bx, by) = self.store.xy(second);
        ids.iter().all(|&id| {
            let (x, y) = self.store.xy(id);
            self.predicates
                .orientation(ax, ay, bx, by, x, y)
                .abs() <= self.thresholds.half_plane()
        })
    }
}
