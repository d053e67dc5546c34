//! Constraint edges and regions: segment insertion, Delaunay restoration,
//! and region flooding.
//!
//! Constraints integrate in phases. Their vertices are inserted as
//! ordinary vertices first (which may merge); then each segment is forced
//! into the mesh: either it already exists as an edge, or the edges
//! straddling it are removed and the two resulting cavities are filled.
//! A flip pass restores the Delaunay property on unconstrained edges;
//! with conformity restoration on, constrained edges that still violate
//! the criterion are subdivided with synthetic midpoints until none do.
//! Finally each polygon constraint floods its interior so region
//! membership becomes an O(1) flag query.

use tracing::debug;

use crate::error::TinError;
use crate::quadedge::{EdgeIndex, CONSTRAINT_INDEX_MAX};
use crate::vertex::{Vertex, VertexId};
use crate::walk::{WalkOutcome, Walker};

use super::{ConstraintRecord, IncrementalTin};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ConstraintKind {
    /// Closed region border; interior to the left of each directed
    /// segment (CCW winding, normalized at construction).
    Polygon,
    /// Open chain of forced edges.
    Linear,
}

/// A polygon or polyline constraint to force into the TIN.
#[derive(Clone, Debug)]
pub struct Constraint {
    kind: ConstraintKind,
    vertices: Vec<Vertex>,
}

impl Constraint {
    /// A polygon constraint defining a region. The polygon is implicitly
    /// closed; a repeated final vertex is stripped. Winding is normalized
    /// to CCW so the interior always lies left of each directed segment.
    pub fn polygon(mut vertices: Vec<Vertex>) -> Result<Self, TinError> {
        if vertices.len() >= 2 {
            let first = vertices[0];
            let last = vertices[vertices.len() - 1];
            if first.x == last.x && first.y == last.y {
                vertices.pop();
            }
        }
        if vertices.len() < 3 {
            return Err(TinError::invalid(
                "polygon constraint needs at least three distinct vertices",
            ));
        }
        let area = shoelace(&vertices);
        if area == 0.0 {
            return Err(TinError::invalid("polygon constraint is degenerate"));
        }
        if area < 0.0 {
            vertices.reverse();
        }
        Ok(Self {
            kind: ConstraintKind::Polygon,
            vertices,
        })
    }

    /// An open polyline constraint.
    pub fn polyline(vertices: Vec<Vertex>) -> Result<Self, TinError> {
        if vertices.len() < 2 {
            return Err(TinError::invalid(
                "polyline constraint needs at least two vertices",
            ));
        }
        Ok(Self {
            kind: ConstraintKind::Linear,
            vertices,
        })
    }

    #[inline]
    pub fn defines_region(&self) -> bool {
        self.kind == ConstraintKind::Polygon
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }
}

fn shoelace(vertices: &[Vertex]) -> f64 {
    let n = vertices.len();
    let mut sum = 0.0;
    for i in 0..n {
        let p = &vertices[i];
        let q = &vertices[(i + 1) % n];
        sum += p.x * q.y - q.x * p.y;
    }
    0.5 * sum
}

/// Result of searching v0's pinwheel for the segment toward v1.
enum SegmentProbe {
    /// The segment already exists as this half-edge (origin v0).
    Direct(EdgeIndex),
    /// An existing edge out of v0 runs along the ray within tolerance;
    /// the segment splits at its far endpoint, which becomes an
    /// intermediate constraint vertex.
    Collinear(EdgeIndex),
    /// The far edge of v0's wedge triangle straddles the segment
    /// (stored as right-vertex -> left-vertex).
    Straddle(EdgeIndex),
}

impl IncrementalTin {
    /// Force a list of constraints into the TIN. May be called once per
    /// build; the TIN is locked against free vertex mutation afterward.
    /// With `restore_conformity`, constrained edges are subdivided until
    /// every triangle satisfies the Delaunay criterion.
    pub fn add_constraints(
        &mut self,
        list: Vec<Constraint>,
        restore_conformity: bool,
    ) -> Result<(), TinError> {
        if self.disposed {
            return Err(TinError::Disposed);
        }
        if !self.constraints.is_empty() {
            return Err(TinError::illegal("constraints have already been added"));
        }
        if list.len() > CONSTRAINT_INDEX_MAX as usize + 1 {
            return Err(TinError::invalid(format!(
                "at most {} constraints are supported, got {}",
                CONSTRAINT_INDEX_MAX as usize + 1,
                list.len()
            )));
        }
        if list.is_empty() {
            return Ok(());
        }

        // Phase 1: constraint vertices enter as ordinary vertices (and may
        // merge with existing sites or each other).
        let mut staged: Vec<(Constraint, Vec<VertexId>)> = Vec::with_capacity(list.len());
        for constraint in list {
            let mut ids = Vec::with_capacity(constraint.vertices.len());
            for v in &constraint.vertices {
                let mut vv = *v;
                vv.mark_constraint_member();
                ids.push(self.add_returning_site(vv)?);
            }
            staged.push((constraint, ids));
        }
        if !self.bootstrapped {
            return Err(TinError::illegal(
                "constraint vertices are collinear or degenerate; cannot bootstrap",
            ));
        }
        self.locked = true;
        debug!(constraints = staged.len(), "constraint vertices inserted; TIN locked");

        // Phase 2: force each segment.
        for (ci, (constraint, ids)) in staged.iter().enumerate() {
            let ci = ci as u16;
            let closed = constraint.defines_region();
            let n = ids.len();
            let last = if closed { n } else { n - 1 };
            for i in 0..last {
                let v0 = ids[i];
                let v1 = ids[(i + 1) % n];
                if v0 == v1 {
                    continue;
                }
                self.insert_segment(v0, v1, ci, closed)?;
            }
        }
        debug!("constraint segments inserted");

        // Phase 3: re-establish the Delaunay criterion on ordinary edges;
        // optionally subdivide non-conformant constrained edges.
        self.restore_delaunay(restore_conformity)?;

        // Phase 4: anchors and region flooding.
        let mut records: Vec<ConstraintRecord> = Vec::with_capacity(staged.len());
        for (ci, (constraint, _ids)) in staged.into_iter().enumerate() {
            let ci_u16 = ci as u16;
            let anchor = if constraint.defines_region() {
                self.find_region_anchor(ci_u16)?
            } else {
                EdgeIndex::NONE
            };
            records.push(ConstraintRecord {
                constraint,
                index: ci_u16,
                anchor,
            });
        }
        for r in &records {
            if r.constraint.defines_region() {
                self.flood_region(r.index, r.anchor);
            }
        }
        self.constraints = records;
        self.nav.edge = self.pool.start_edge().unwrap_or(EdgeIndex::NONE);
        debug!("constraint regions flooded");
        Ok(())
    }

    /// Insert the constraint segment (v0 -> v1), splitting at collinear
    /// intermediate vertices as they are found.
    fn insert_segment(
        &mut self,
        mut v0: VertexId,
        v1: VertexId,
        ci: u16,
        region: bool,
    ) -> Result<(), TinError> {
        let budget = 4 * self.pool.count() + 64;
        for _ in 0..budget {
            if v0 == v1 {
                return Ok(());
            }
            match self.probe_segment(v0, v1)? {
                SegmentProbe::Direct(edge) => {
                    self.mark_constraint_edge(edge, ci, region);
                    return Ok(());
                }
                SegmentProbe::Collinear(edge) => {
                    // The intermediate vertex is the far end of an edge
                    // that already runs along the ray: mark the edge and
                    // continue with the next sub-segment.
                    let mid = self
                        .b_of(edge)
                        .ok_or_else(|| TinError::internal("collinear probe hit a ghost edge"))?;
                    self.mark_constraint_edge(edge, ci, region);
                    self.store.mark_constraint_member(mid);
                    v0 = mid;
                }
                SegmentProbe::Straddle(crossing) => {
                    let reached = self.carve_channel(v0, v1, ci, region, crossing)?;
                    v0 = reached;
                }
            }
        }
        Err(TinError::internal("constraint segment failed to terminate"))
    }

    /// Pinwheel around v0 looking for v1: an existing edge, a collinear
    /// intermediate vertex, or the straddling far edge of the wedge
    /// containing the ray v0 -> v1.
    fn probe_segment(&mut self, v0: VertexId, v1: VertexId) -> Result<SegmentProbe, TinError> {
        let spoke0 = self.spoke_of(v0)?;
        let (x0, y0) = self.store.xy(v0);
        let (x1, y1) = self.store.xy(v1);
        let seg_len = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        let collinear_tol = self.thresholds.vertex_tolerance() * seg_len;

        let mut s = spoke0;
        let budget = self.pool.count() + 8;
        for _ in 0..budget {
            let far = self.pool.rec(s).forward;
            if self.b_of(s) == Some(v1) {
                return Ok(SegmentProbe::Direct(s));
            }
            if let (Some(p), q) = (self.b_of(s), self.b_of(far)) {
                let (px, py) = self.store.xy(p);
                let hp = self.predicates.orientation(x0, y0, x1, y1, px, py);
                // Near-collinear outgoing edge ahead of v0 splits the
                // segment at its far endpoint.
                let ahead = (px - x0) * (x1 - x0) + (py - y0) * (y1 - y0) > 0.0;
                if hp.abs() < collinear_tol && ahead {
                    return Ok(SegmentProbe::Collinear(s));
                }
                if let Some(q) = q {
                    let (qx, qy) = self.store.xy(q);
                    let hq = self.predicates.orientation(x0, y0, x1, y1, qx, qy);
                    if hp < 0.0 && hq > 0.0 {
                        return Ok(SegmentProbe::Straddle(far));
                    }
                }
            }
            s = self.pool.rec(far).forward.dual();
            if s == spoke0 {
                break;
            }
        }
        Err(TinError::internal(
            "pinwheel found neither the constraint edge nor a straddling edge",
        ))
    }

    /// A half-edge with origin `v0`, found via the point-location walk.
    fn spoke_of(&mut self, v0: VertexId) -> Result<EdgeIndex, TinError> {
        let (x, y) = self.store.xy(v0);
        let walker = Walker {
            pool: &self.pool,
            store: &self.store,
            predicates: &self.predicates,
        };
        let outcome = walker.locate(&mut self.nav, x, y)?;
        let e0 = match outcome {
            WalkOutcome::Interior(e) => e,
            WalkOutcome::Exterior(outer) => outer.dual(),
        };
        let f = self.pool.rec(e0).forward;
        let g = self.pool.rec(f).forward;
        for cand in [e0, f, g] {
            if self.a_of(cand) == Some(v0) {
                return Ok(cand);
            }
        }
        Err(TinError::internal(
            "constraint vertex not found at its located triangle",
        ))
    }

    /// Walk the segment from v0 toward v1 starting at the straddling edge
    /// `crossing` (right-vertex -> left-vertex), removing straddling edges
    /// and filling the two side cavities. Returns the vertex actually
    /// reached: v1, or an intermediate vertex found on the segment.
    fn carve_channel(
        &mut self,
        v0: VertexId,
        v1: VertexId,
        ci: u16,
        region: bool,
        crossing: EdgeIndex,
    ) -> Result<VertexId, TinError> {
        let (x0, y0) = self.store.xy(v0);
        let (x1, y1) = self.store.xy(v1);
        let seg_len = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        let collinear_tol = self.thresholds.vertex_tolerance() * seg_len;

        let mut left: Vec<EdgeIndex> = Vec::new();
        let mut right: Vec<EdgeIndex> = Vec::new();
        // The wedge triangle behind the first crossing contributes its
        // flanking edges: (v0 -> p) on the right, (q -> v0) on the left.
        let mut e = crossing;
        right.push(self.pool.rec(e).reverse);
        left.push(self.pool.rec(e).forward);
        debug_assert_eq!(self.a_of(right[0]), Some(v0));
        debug_assert_eq!(self.b_of(left[0]), Some(v0));

        let reached;
        let budget = 4 * self.pool.count() + 64;
        let mut steps = 0;
        loop {
            steps += 1;
            if steps > budget {
                return Err(TinError::internal("segment walk failed to reach endpoint"));
            }
            if self.pool.rec(e).word.is_constrained()
                || self.pool.rec(e.dual()).word.is_constrained()
            {
                return Err(TinError::illegal(
                    "constraint segments intersect at a non-vertex point",
                ));
            }
            let d = e.dual();
            let n1 = self.pool.rec(d).forward;
            let n2 = self.pool.rec(n1).forward;
            let t = self
                .b_of(n1)
                .ok_or_else(|| TinError::internal("segment walk crossed into a ghost triangle"))?;
            if t == v1 {
                right.push(n1);
                left.push(n2);
                self.release_channel_edge(e, &mut left, &mut right);
                reached = v1;
                break;
            }
            let (tx, ty) = self.store.xy(t);
            let ht = self.predicates.orientation(x0, y0, x1, y1, tx, ty);
            if ht.abs() < collinear_tol {
                // The walk ran into a vertex on the segment; stop the
                // channel here and let the caller continue from it.
                right.push(n1);
                left.push(n2);
                self.release_channel_edge(e, &mut left, &mut right);
                self.store.mark_constraint_member(t);
                reached = t;
                break;
            }
            if ht < 0.0 {
                // Apex on the right: the channel exits through (t -> q).
                right.push(n1);
                let next = n2;
                self.release_channel_edge(e, &mut left, &mut right);
                e = next;
            } else {
                // Apex on the left: the channel exits through (p -> t).
                left.push(n2);
                let next = n1;
                self.release_channel_edge(e, &mut left, &mut right);
                e = next;
            }
        }

        // New constraint edge closing both cavities.
        let new_edge = self.pool.alloc(Some(v0), Some(reached));
        self.mark_constraint_edge(new_edge, ci, region);

        let mut left_loop = Vec::with_capacity(left.len() + 1);
        left_loop.push(new_edge);
        left_loop.extend(left.iter().rev().copied());
        let mut right_loop = Vec::with_capacity(right.len() + 1);
        right_loop.push(new_edge.dual());
        right_loop.extend(right.iter().copied());

        for loop_edges in [&left_loop, &right_loop] {
            let m = loop_edges.len();
            for i in 0..m {
                self.pool.link(loop_edges[i], loop_edges[(i + 1) % m]);
            }
        }
        self.fill_cavity_by_area(&left_loop)?;
        self.fill_cavity_by_area(&right_loop)?;
        Ok(reached)
    }

    /// Free a straddling edge, refreshing held cavity chains across pool
    /// relocations. Must be called after the neighbouring edges of the
    /// current step have been read, but it is safe for the chains.
    fn release_channel_edge(
        &mut self,
        e: EdgeIndex,
        left: &mut [EdgeIndex],
        right: &mut [EdgeIndex],
    ) {
        if let Some(relo) = self.pool.free(e) {
            self.nav.edge = relo.remap(self.nav.edge);
            for t in left.iter_mut() {
                *t = relo.remap(*t);
            }
            for t in right.iter_mut() {
                *t = relo.remap(*t);
            }
        }
    }

    /// Flag both halves of a constraint edge. `edge` must be the half
    /// directed along the constraint segment (origin at the segment
    /// start), so for region borders the interior lies on its left.
    fn mark_constraint_edge(&mut self, edge: EdgeIndex, ci: u16, region: bool) {
        debug_assert!(self.a_of(edge).is_some() && self.b_of(edge).is_some());
        // First index wins on a shared half; an edge two constraints both
        // use keeps one index per side.
        let w = &mut self.pool.rec_mut(edge).word;
        w.set_constrained();
        if w.constraint_index().is_none() {
            w.set_constraint_index(ci);
        }
        if region {
            w.set_region_border();
        } else {
            w.set_line_member();
        }
        let wd = &mut self.pool.rec_mut(edge.dual()).word;
        wd.set_constrained();
        if region {
            wd.set_region_border();
        } else {
            wd.set_line_member();
            if wd.constraint_index().is_none() {
                wd.set_constraint_index(ci);
            }
        }
    }

    // ------------------------------------------------------------------
    // Delaunay restoration

    /// Re-establish the Delaunay criterion after constraint surgery using
    /// an explicit work stack. Ordinary edges flip; constrained edges are
    /// left alone unless `subdivide` is set, in which case they split at
    /// synthetic midpoints until conformant.
    fn restore_delaunay(&mut self, subdivide: bool) -> Result<(), TinError> {
        let mut stack: Vec<EdgeIndex> = self.pool.base_edges().collect();
        let mut rounds: u64 = 0;
        let cap = 64 * (self.pool.count() as u64 + 16) * (self.pool.count() as u64 + 16);
        while let Some(e) = stack.pop() {
            rounds += 1;
            if rounds > cap {
                return Err(TinError::internal(
                    "Delaunay restoration failed to converge",
                ));
            }
            if !self.pool.is_allocated(e) {
                continue;
            }
            let (Some(a), Some(b)) = (self.a_of(e), self.b_of(e)) else {
                continue;
            };
            let f1 = self.pool.rec(e).forward;
            let g1 = self.pool.rec(e.dual()).forward;
            let (Some(c), Some(d)) = (self.b_of(f1), self.b_of(g1)) else {
                continue;
            };
            let (ax, ay) = self.store.xy(a);
            let (bx, by) = self.store.xy(b);
            let (cx, cy) = self.store.xy(c);
            let (dx, dy) = self.store.xy(d);
            let h = self
                .predicates
                .in_circle(ax, ay, bx, by, cx, cy, dx, dy);
            if h <= self.thresholds.in_circle() {
                continue;
            }
            let constrained = self.pool.rec(e).word.is_constrained()
                || self.pool.rec(e.dual()).word.is_constrained();
            if constrained {
                if subdivide {
                    self.subdivide_constrained_edge(e, &mut stack)?;
                }
                continue;
            }
            self.flip_edge(e, &mut stack);
        }
        Ok(())
    }

    /// Standard Delaunay edge flip, reusing the edge pair for the new
    /// diagonal. Pushes the four surrounding edges for re-examination.
    fn flip_edge(&mut self, e: EdgeIndex, stack: &mut Vec<EdgeIndex>) {
        let f1 = self.pool.rec(e).forward;
        let f2 = self.pool.rec(f1).forward;
        let g1 = self.pool.rec(e.dual()).forward;
        let g2 = self.pool.rec(g1).forward;
        let c = self.b_of(f1).expect("flip requires real apexes");
        let d = self.b_of(g1).expect("flip requires real apexes");

        self.pool.rec_mut(e).vertex = Some(c);
        self.pool.rec_mut(e.dual()).vertex = Some(d);
        self.pool.link(e, g2);
        self.pool.link(g2, f1);
        self.pool.link(f1, e);
        self.pool.link(e.dual(), f2);
        self.pool.link(f2, g1);
        self.pool.link(g1, e.dual());

        stack.push(f1.base());
        stack.push(f2.base());
        stack.push(g1.base());
        stack.push(g2.base());
    }

    /// Split a non-conformant constrained edge at a synthetic midpoint,
    /// rebuilding the four incident triangles. The two replacement edges
    /// inherit the original constraint words plus the synthetic flag.
    fn subdivide_constrained_edge(
        &mut self,
        e: EdgeIndex,
        stack: &mut Vec<EdgeIndex>,
    ) -> Result<(), TinError> {
        let a = self.a_of(e).ok_or_else(|| TinError::internal("ghost constraint edge"))?;
        let b = self.b_of(e).ok_or_else(|| TinError::internal("ghost constraint edge"))?;
        let mut f1 = self.pool.rec(e).forward;
        let mut f2 = self.pool.rec(f1).forward;
        let mut g1 = self.pool.rec(e.dual()).forward;
        let mut g2 = self.pool.rec(g1).forward;
        let c = self
            .b_of(f1)
            .ok_or_else(|| TinError::internal("constrained edge without a left apex"))?;
        let d = self
            .b_of(g1)
            .ok_or_else(|| TinError::internal("constrained edge without a right apex"))?;
        let word_fwd = self.pool.rec(e).word;
        let word_rev = self.pool.rec(e.dual()).word;

        let (ax, ay) = self.store.xy(a);
        let (bx, by) = self.store.xy(b);
        let mz = 0.5 * (self.store.z(a) + self.store.z(b));
        let mid = self.store.insert(Vertex::synthetic(
            0.5 * (ax + bx),
            0.5 * (ay + by),
            mz,
            self.synthetic_index,
        ));
        self.synthetic_index -= 1;

        // Free the old edge first; the relocation (if any) is applied to
        // the captured neighbours and the work stack.
        if let Some(relo) = self.pool.free(e) {
            self.nav.edge = relo.remap(self.nav.edge);
            for t in [&mut f1, &mut f2, &mut g1, &mut g2] {
                *t = relo.remap(*t);
            }
            for t in stack.iter_mut() {
                *t = relo.remap(*t);
            }
        }

        let am = self.pool.alloc(Some(a), Some(mid));
        let mb = self.pool.alloc(Some(mid), Some(b));
        let mc = self.pool.alloc(Some(mid), Some(c));
        let md = self.pool.alloc(Some(mid), Some(d));

        let mut w_am = word_fwd;
        w_am.set_synthetic();
        let mut w_am_rev = word_rev;
        w_am_rev.set_synthetic();
        self.pool.rec_mut(am).word = w_am;
        self.pool.rec_mut(am.dual()).word = w_am_rev;
        self.pool.rec_mut(mb).word = w_am;
        self.pool.rec_mut(mb.dual()).word = w_am_rev;

        // (a, m, c), (m, b, c), (m, a, d), (b, m, d)
        self.pool.link(am, mc);
        self.pool.link(mc, f2);
        self.pool.link(f2, am);

        self.pool.link(mb, f1);
        self.pool.link(f1, mc.dual());
        self.pool.link(mc.dual(), mb);

        self.pool.link(am.dual(), g1);
        self.pool.link(g1, md.dual());
        self.pool.link(md.dual(), am.dual());

        self.pool.link(mb.dual(), md);
        self.pool.link(md, g2);
        self.pool.link(g2, mb.dual());

        for t in [am, mb, mc, md] {
            stack.push(t.base());
        }
        for t in [f1, f2, g1, g2] {
            stack.push(t.base());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // region flooding

    /// The interior-side border half-edge for the region `ci`.
    fn find_region_anchor(&self, ci: u16) -> Result<EdgeIndex, TinError> {
        for base in self.pool.base_edges() {
            for h in [base, base.dual()] {
                let w = self.pool.rec(h).word;
                if w.is_region_border() && w.constraint_index() == Some(ci) {
                    return Ok(h);
                }
            }
        }
        Err(TinError::internal(format!(
            "no border edge recorded for region constraint {ci}"
        )))
    }

    /// Flood the interior of region `ci` from its anchor border edge,
    /// marking every traversed half-edge as region-interior. Halves that
    /// already carry a different constraint index keep it.
    fn flood_region(&mut self, ci: u16, anchor: EdgeIndex) {
        let Some(max) = self.pool.max_allocated_index() else {
            return;
        };
        let mut visited = vec![false; max as usize + 1];
        let mut stack = vec![anchor];
        while let Some(h) = stack.pop() {
            if visited[h.index() as usize] {
                continue;
            }
            let e1 = self.pool.rec(h).forward;
            let e2 = self.pool.rec(e1).forward;
            for t in [h, e1, e2] {
                visited[t.index() as usize] = true;
            }
            for t in [h, e1, e2] {
                let w = self.pool.rec(t).word;
                let blocking = w.is_region_border() && w.constraint_index() == Some(ci);
                if blocking {
                    continue;
                }
                if w.constraint_index().is_none() {
                    let wm = &mut self.pool.rec_mut(t).word;
                    wm.set_region_interior();
                    wm.set_constraint_index(ci);
                }
                let d = t.dual();
                if !visited[d.index() as usize] && self.a_of(d).is_some() && self.b_of(d).is_some()
                {
                    stack.push(d);
                }
            }
        }
    }
}
