//! Ear fill for polygonal cavities left by constraint-segment carving.
//!
//! The cavity arrives as a closed CCW loop of real half-edges (interior
//! to the left). Ears are scored by the signed area of their triangle;
//! ears whose triangle contains another live cavity vertex are not
//! closable. Closing the minimum-area valid ear repeatedly triangulates
//! any simple polygon; the caller restores the Delaunay property on the
//! new edges afterward.

use crate::error::TinError;
use crate::quadedge::EdgeIndex;
use crate::vertex::VertexId;

use super::IncrementalTin;

struct LoopNode {
    prev: usize,
    next: usize,
    vertex: VertexId,
    out_edge: EdgeIndex,
    score: f64,
    alive: bool,
}

impl IncrementalTin {
    /// Triangulate the cavity bounded by `boundary`, a closed CCW loop of
    /// linked half-edges with real origins. Only allocates; never frees.
    pub(super) fn fill_cavity_by_area(&mut self, boundary: &[EdgeIndex]) -> Result<(), TinError> {
        let n = boundary.len();
        if n < 3 {
            return Err(TinError::internal("cavity loop shorter than three edges"));
        }
        let mut nodes: Vec<LoopNode> = Vec::with_capacity(n);
        for (i, &e) in boundary.iter().enumerate() {
            let vertex = self
                .a_of(e)
                .ok_or_else(|| TinError::internal("constraint cavity contains a ghost edge"))?;
            nodes.push(LoopNode {
                prev: (i + n - 1) % n,
                next: (i + 1) % n,
                vertex,
                out_edge: e,
                score: 0.0,
                alive: true,
            });
        }
        for i in 0..n {
            nodes[i].score = self.loop_ear_score(&nodes, i);
        }

        let mut live = n;
        while live > 3 {
            let mut pick = None;
            let mut best = f64::INFINITY;
            for (i, nd) in nodes.iter().enumerate() {
                if nd.alive && nd.score < best {
                    best = nd.score;
                    pick = Some(i);
                }
            }
            let pick = pick.ok_or_else(|| {
                TinError::internal("constraint cavity has no closable ear")
            })?;
            let pi = nodes[pick].prev;
            let ni = nodes[pick].next;
            let closing = self
                .pool
                .alloc(Some(nodes[pi].vertex), Some(nodes[ni].vertex));
            self.pool.link(nodes[pi].out_edge, nodes[pick].out_edge);
            self.pool.link(nodes[pick].out_edge, closing.dual());
            self.pool.link(closing.dual(), nodes[pi].out_edge);

            nodes[pi].out_edge = closing;
            nodes[pick].alive = false;
            nodes[pi].next = ni;
            nodes[ni].prev = pi;
            live -= 1;
            nodes[pi].score = self.loop_ear_score(&nodes, pi);
            nodes[ni].score = self.loop_ear_score(&nodes, ni);
        }

        let i = nodes
            .iter()
            .position(|nd| nd.alive)
            .ok_or_else(|| TinError::internal("cavity loop emptied prematurely"))?;
        let j = nodes[i].next;
        let k = nodes[j].next;
        debug_assert_eq!(nodes[k].next, i, "final cavity nodes must form a cycle");
        self.pool.link(nodes[i].out_edge, nodes[j].out_edge);
        self.pool.link(nodes[j].out_edge, nodes[k].out_edge);
        self.pool.link(nodes[k].out_edge, nodes[i].out_edge);
        Ok(())
    }

    /// Signed-area score of the ear at `i`; infinite when the ear is
    /// reflex, degenerate, or contains another live cavity vertex.
    fn loop_ear_score(&self, nodes: &[LoopNode], i: usize) -> f64 {
        let p = nodes[nodes[i].prev].vertex;
        let a = nodes[i].vertex;
        let nx = nodes[nodes[i].next].vertex;
        let (px, py) = self.store.xy(p);
        let (ax, ay) = self.store.xy(a);
        let (nxx, nxy) = self.store.xy(nx);
        let area = self.predicates.area(px, py, ax, ay, nxx, nxy);
        if area <= 0.0 {
            return f64::INFINITY;
        }
        for nd in nodes.iter() {
            if !nd.alive || nd.vertex == p || nd.vertex == a || nd.vertex == nx {
                continue;
            }
            let (x, y) = self.store.xy(nd.vertex);
            let inside = self.predicates.orientation(px, py, ax, ay, x, y) >= 0.0
                && self.predicates.orientation(ax, ay, nxx, nxy, x, y) >= 0.0
                && self.predicates.orientation(nxx, nxy, px, py, x, y) >= 0.0;
            if inside {
                return f64::INFINITY;
            }
        }
        area
    }
}
