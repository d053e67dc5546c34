//! Paged arena for quad-edge pairs.
//!
//! Purpose
//! - Constant-time allocate and free with stable indices while allocated,
//!   so traversal bitmaps can be keyed by edge index.
//! - Pages keep their allocated pairs packed: freeing swaps the freed pair
//!   with the page's last allocated pair and repairs the neighbours'
//!   links. The relocation (if any) is reported to the caller, which must
//!   refresh any raw indices it still holds for the moved pair.
//! - A page with free capacity is always at the head of the free-page
//!   list; a fresh page is appended the moment the last free slot is
//!   consumed, so the allocation hot path never branches on growth.

use crate::vertex::VertexId;

use super::types::{EdgeIndex, HalfEdgeRec};

pub(crate) const HALF_EDGES_PER_PAGE: usize = 1024;
const PAIRS_PER_PAGE: usize = HALF_EDGES_PER_PAGE / 2;

const NO_PAGE: usize = usize::MAX;

#[derive(Debug)]
struct Page {
    recs: Vec<HalfEdgeRec>,
    allocated_pairs: usize,
    next_free_page: usize,
    in_free_list: bool,
}

impl Page {
    fn new() -> Self {
        Self {
            recs: vec![HalfEdgeRec::default(); HALF_EDGES_PER_PAGE],
            allocated_pairs: 0,
            next_free_page: NO_PAGE,
            in_free_list: false,
        }
    }
}

/// A pair relocation performed by `free`: the pair formerly at `from` now
/// lives at `to` (both are base indices). Links inside the pool are
/// already repaired; only indices held outside the pool go stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Relocation {
    pub from: EdgeIndex,
    pub to: EdgeIndex,
}

impl Relocation {
    /// Refresh a held index against this relocation.
    #[inline]
    pub fn remap(self, e: EdgeIndex) -> EdgeIndex {
        if e.base() == self.from {
            EdgeIndex(self.to.0 | e.side())
        } else {
            e
        }
    }
}

#[derive(Debug)]
pub(crate) struct EdgePool {
    pages: Vec<Page>,
    free_head: usize,
    allocated_pairs: usize,
}

impl EdgePool {
    pub fn new() -> Self {
        let mut pool = Self {
            pages: Vec::new(),
            free_head: NO_PAGE,
            allocated_pairs: 0,
        };
        pool.append_page();
        pool
    }

    fn append_page(&mut self) {
        let idx = self.pages.len();
        let mut page = Page::new();
        page.next_free_page = self.free_head;
        page.in_free_list = true;
        self.pages.push(page);
        self.free_head = idx;
    }

    /// Reserve capacity for at least `pairs` edge pairs without touching
    /// allocated content.
    pub fn preallocate(&mut self, pairs: usize) {
        let mut capacity = self.pages.len() * PAIRS_PER_PAGE - self.allocated_pairs;
        while capacity < pairs {
            self.append_page();
            capacity += PAIRS_PER_PAGE;
        }
    }

    /// Allocate an edge pair with initial vertices `a` (side 0) and `b`
    /// (side 1). Links start unset; flags start cleared.
    pub fn alloc(&mut self, a: Option<VertexId>, b: Option<VertexId>) -> EdgeIndex {
        let page_idx = self.free_head;
        debug_assert!(page_idx != NO_PAGE, "free-page list must never be empty");
        let page = &mut self.pages[page_idx];
        let pair = page.allocated_pairs;
        page.allocated_pairs += 1;

        let off = pair * 2;
        page.recs[off] = HalfEdgeRec {
            vertex: a,
            ..HalfEdgeRec::default()
        };
        page.recs[off + 1] = HalfEdgeRec {
            vertex: b,
            ..HalfEdgeRec::default()
        };

        if page.allocated_pairs == PAIRS_PER_PAGE {
            page.in_free_list = false;
            self.free_head = page.next_free_page;
            self.pages[page_idx].next_free_page = NO_PAGE;
            if self.free_head == NO_PAGE {
                self.append_page();
            }
        }
        self.allocated_pairs += 1;
        EdgeIndex((page_idx * HALF_EDGES_PER_PAGE + off) as u32)
    }

    /// Allocate a pair with no vertices set.
    pub fn alloc_unset(&mut self) -> EdgeIndex {
        self.alloc(None, None)
    }

    /// Return a pair to the pool. The page's allocated pairs stay packed;
    /// when another pair is moved to fill the hole, the relocation is
    /// returned so the caller can refresh held indices.
    pub fn free(&mut self, e: EdgeIndex) -> Option<Relocation> {
        let base = e.base();
        let (page_idx, off) = locate(base);
        debug_assert!(
            off / 2 < self.pages[page_idx].allocated_pairs,
            "freeing an unallocated edge"
        );

        let page = &mut self.pages[page_idx];
        page.allocated_pairs -= 1;
        let last_pair = page.allocated_pairs;
        let last_off = last_pair * 2;

        let mut relocation = None;
        if off != last_off {
            let from = EdgeIndex((page_idx * HALF_EDGES_PER_PAGE + last_off) as u32);
            let to = EdgeIndex((page_idx * HALF_EDGES_PER_PAGE + off) as u32);
            self.move_pair(from, to);
            relocation = Some(Relocation { from, to });
        }
        // Scrub the vacated slot so cleared edges never leak stale links.
        let page = &mut self.pages[page_idx];
        page.recs[last_off] = HalfEdgeRec::default();
        page.recs[last_off + 1] = HalfEdgeRec::default();

        if !page.in_free_list {
            page.in_free_list = true;
            page.next_free_page = self.free_head;
            self.free_head = page_idx;
        }
        self.allocated_pairs -= 1;
        relocation
    }

    /// Move the pair at base `from` into base slot `to` (same page),
    /// remapping internal self-references and repairing the forward /
    /// reverse links of every neighbour.
    fn move_pair(&mut self, from: EdgeIndex, to: EdgeIndex) {
        let from_base = from.base();
        let to_base = to.base();
        for side in 0..2u32 {
            let src = EdgeIndex(from_base.0 + side);
            let dst = EdgeIndex(to_base.0 + side);
            let mut rec = *self.rec(src);
            let remap = |x: EdgeIndex| {
                if !x.is_none() && x.base() == from_base {
                    EdgeIndex(to_base.0 | x.side())
                } else {
                    x
                }
            };
            rec.forward = remap(rec.forward);
            rec.reverse = remap(rec.reverse);
            *self.rec_mut(dst) = rec;
        }
        // Repair only reciprocal links. Mid-surgery a moved pair may hold
        // stale link fields; following one would stomp an unrelated live
        // record, so a neighbour is updated only when it points back.
        let src_base = from_base;
        for side in 0..2u32 {
            let dst = EdgeIndex(to_base.0 + side);
            let src = EdgeIndex(src_base.0 + side);
            let rec = *self.rec(dst);
            if !rec.forward.is_none()
                && rec.forward.base() != to_base
                && self.rec(rec.forward).reverse == src
            {
                self.rec_mut(rec.forward).reverse = dst;
            }
            if !rec.reverse.is_none()
                && rec.reverse.base() != to_base
                && self.rec(rec.reverse).forward == src
            {
                self.rec_mut(rec.reverse).forward = dst;
            }
        }
    }

    #[inline]
    pub fn rec(&self, e: EdgeIndex) -> &HalfEdgeRec {
        let (page, off) = locate(e);
        &self.pages[page].recs[off]
    }

    #[inline]
    pub fn rec_mut(&mut self, e: EdgeIndex) -> &mut HalfEdgeRec {
        let (page, off) = locate(e);
        &mut self.pages[page].recs[off]
    }

    /// Set `a.forward = b` and `b.reverse = a` in one step; every link
    /// mutation in the crate goes through here so the two directions can
    /// never drift apart.
    #[inline]
    pub fn link(&mut self, a: EdgeIndex, b: EdgeIndex) {
        self.rec_mut(a).forward = b;
        self.rec_mut(b).reverse = a;
    }

    #[inline]
    pub fn is_allocated(&self, e: EdgeIndex) -> bool {
        if e.is_none() {
            return false;
        }
        let (page, off) = locate(e);
        page < self.pages.len() && off / 2 < self.pages[page].allocated_pairs
    }

    /// Number of allocated pairs.
    #[inline]
    pub fn count(&self) -> usize {
        self.allocated_pairs
    }

    /// Highest half-edge index currently allocated, if any.
    pub fn max_allocated_index(&self) -> Option<u32> {
        self.pages
            .iter()
            .enumerate()
            .filter(|(_, p)| p.allocated_pairs > 0)
            .map(|(i, p)| (i * HALF_EDGES_PER_PAGE + p.allocated_pairs * 2 - 1) as u32)
            .max()
    }

    /// Iterate allocated base edges (side 0), each pair exactly once.
    pub fn base_edges(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.pages.iter().enumerate().flat_map(|(pi, page)| {
            (0..page.allocated_pairs)
                .map(move |pair| EdgeIndex((pi * HALF_EDGES_PER_PAGE + pair * 2) as u32))
        })
    }

    /// First allocated edge with both endpoints real.
    pub fn start_edge(&self) -> Option<EdgeIndex> {
        self.base_edges().find(|&e| {
            self.rec(e).vertex.is_some() && self.rec(e.dual()).vertex.is_some()
        })
    }

    /// First allocated edge with a null endpoint.
    pub fn start_ghost_edge(&self) -> Option<EdgeIndex> {
        self.base_edges().find(|&e| {
            self.rec(e).vertex.is_none() || self.rec(e.dual()).vertex.is_none()
        })
    }

    /// Drop every allocated edge but keep the pages for reuse.
    pub fn clear(&mut self) {
        self.free_head = NO_PAGE;
        for idx in (0..self.pages.len()).rev() {
            let page = &mut self.pages[idx];
            for rec in page.recs.iter_mut().take(page.allocated_pairs * 2) {
                *rec = HalfEdgeRec::default();
            }
            page.allocated_pairs = 0;
            page.in_free_list = true;
            page.next_free_page = self.free_head;
            self.free_head = idx;
        }
        self.allocated_pairs = 0;
    }
}

#[inline]
fn locate(e: EdgeIndex) -> (usize, usize) {
    let i = e.0 as usize;
    (i / HALF_EDGES_PER_PAGE, i % HALF_EDGES_PER_PAGE)
}
