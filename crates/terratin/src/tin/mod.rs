//! The incremental TIN: state, bootstrap, public operations, lifecycle.
//!
//! Mutation is externally serialized (`&mut self`); after construction the
//! TIN may be traversed read-only from many threads, each owning its own
//! [`Navigator`]. The TIN keeps one internal navigator whose cached edge
//! doubles as the search edge that insertion re-anchors after every
//! structural change.

use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::TinError;
use crate::geom::{Predicates, Rect, Thresholds};
use crate::quadedge::{EdgeIndex, EdgePool};
use crate::vertex::{MergerGroup, Vertex, VertexEntry, VertexId, VertexStore, ZResolution};
use crate::walk::{Navigator, WalkOutcome, Walker};

mod cavity;
mod constraint;
mod insertion;
mod integrity;
mod removal;

pub use constraint::Constraint;
pub use integrity::IntegrityReport;

#[cfg(test)]
mod tests;

/// Seed for the deterministic bootstrap triple sampler.
const BOOTSTRAP_SEED: u64 = 0x5eed_0f_b007;

/// Aggregate triangle statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TriangleTally {
    pub count: usize,
    pub sum_area: f64,
    pub sum_area_sq: f64,
    pub min_area: f64,
    pub max_area: f64,
}

/// A live vertex site: either a single vertex or a coincidence group.
#[derive(Clone, Copy, Debug)]
pub enum TinVertex<'a> {
    Single(&'a Vertex),
    Group(&'a MergerGroup),
}

impl TinVertex<'_> {
    #[inline]
    pub fn x(&self) -> f64 {
        match self {
            TinVertex::Single(v) => v.x,
            TinVertex::Group(g) => g.x(),
        }
    }

    #[inline]
    pub fn y(&self) -> f64 {
        match self {
            TinVertex::Single(v) => v.y,
            TinVertex::Group(g) => g.y(),
        }
    }

    /// Elevation; group elevations resolve lazily under the group's rule.
    #[inline]
    pub fn z(&self) -> f64 {
        match self {
            TinVertex::Single(v) => v.z,
            TinVertex::Group(g) => g.z(),
        }
    }

    #[inline]
    pub fn is_group(&self) -> bool {
        matches!(self, TinVertex::Group(_))
    }
}

/// Observational handle on a half-edge. Invalidated by the next mutation;
/// holding one across an insert or remove is a caller error.
#[derive(Clone, Copy)]
pub struct EdgeRef<'t> {
    tin: &'t IncrementalTin,
    e: EdgeIndex,
}

impl<'t> EdgeRef<'t> {
    #[inline]
    pub fn index(&self) -> EdgeIndex {
        self.e
    }

    #[inline]
    pub fn a(&self) -> Option<TinVertex<'t>> {
        self.tin.vertex_view(self.tin.pool.rec(self.e).vertex?)
    }

    #[inline]
    pub fn b(&self) -> Option<TinVertex<'t>> {
        self.tin.vertex_view(self.tin.pool.rec(self.e.dual()).vertex?)
    }

    #[inline]
    pub fn dual(&self) -> EdgeRef<'t> {
        EdgeRef {
            tin: self.tin,
            e: self.e.dual(),
        }
    }

    #[inline]
    pub fn forward(&self) -> EdgeRef<'t> {
        EdgeRef {
            tin: self.tin,
            e: self.tin.pool.rec(self.e).forward,
        }
    }

    #[inline]
    pub fn reverse(&self) -> EdgeRef<'t> {
        EdgeRef {
            tin: self.tin,
            e: self.tin.pool.rec(self.e).reverse,
        }
    }

    /// True when either endpoint is the null vertex at infinity.
    #[inline]
    pub fn is_ghost(&self) -> bool {
        self.tin.pool.rec(self.e).vertex.is_none()
            || self.tin.pool.rec(self.e.dual()).vertex.is_none()
    }

    #[inline]
    pub fn is_constrained(&self) -> bool {
        self.tin.pool.rec(self.e).word.is_constrained()
            || self.tin.pool.rec(self.e.dual()).word.is_constrained()
    }

    #[inline]
    pub fn is_region_border(&self) -> bool {
        self.tin.pool.rec(self.e).word.is_region_border()
            || self.tin.pool.rec(self.e.dual()).word.is_region_border()
    }

    /// Constraint index on this side, if any.
    #[inline]
    pub fn constraint_index(&self) -> Option<u16> {
        self.tin.pool.rec(self.e).word.constraint_index()
    }

    /// Region membership of this side (border or flooded interior).
    #[inline]
    pub fn is_region_member(&self) -> bool {
        self.tin.pool.rec(self.e).word.is_region_member()
    }

    /// Euclidean length of the edge; `None` for ghost edges.
    pub fn length(&self) -> Option<f64> {
        let a = self.tin.pool.rec(self.e).vertex?;
        let b = self.tin.pool.rec(self.e.dual()).vertex?;
        let (ax, ay) = self.tin.store.xy(a);
        let (bx, by) = self.tin.store.xy(b);
        Some((Vector2::new(bx, by) - Vector2::new(ax, ay)).norm())
    }
}

impl std::fmt::Debug for EdgeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeRef")
            .field("index", &self.e.index())
            .field("ghost", &self.is_ghost())
            .finish()
    }
}

/// Internal record of an accepted constraint.
#[derive(Debug)]
pub(super) struct ConstraintRecord {
    pub constraint: Constraint,
    pub index: u16,
    /// Interior-side border edge used as the flood anchor (polygons only).
    pub anchor: EdgeIndex,
}

/// Incremental Delaunay triangulation with optional constraints.
pub struct IncrementalTin {
    pub(super) thresholds: Thresholds,
    pub(super) predicates: Predicates,
    pub(super) store: VertexStore,
    pub(super) pool: EdgePool,
    /// Vertices accepted before the mesh could be bootstrapped.
    pub(super) pending: Vec<VertexId>,
    pub(super) bootstrapped: bool,
    pub(super) bounds: Option<Rect>,
    /// Internal navigator; its cached edge is the insertion search edge.
    pub(super) nav: Navigator,
    pub(super) resolution: ZResolution,
    pub(super) constraints: Vec<ConstraintRecord>,
    pub(super) locked: bool,
    pub(super) disposed: bool,
    /// Application indices for synthetic (Steiner) vertices count down
    /// from -1 so they never collide with caller-supplied indices.
    pub(super) synthetic_index: i32,
}

impl IncrementalTin {
    /// Create an empty TIN. The nominal point spacing seeds every numeric
    /// tolerance and must be positive.
    pub fn new(nominal_point_spacing: f64) -> Result<Self, TinError> {
        if !(nominal_point_spacing > 0.0) || !nominal_point_spacing.is_finite() {
            return Err(TinError::invalid(format!(
                "nominal point spacing must be positive and finite, got {nominal_point_spacing}"
            )));
        }
        let thresholds = Thresholds::new(nominal_point_spacing);
        Ok(Self {
            thresholds,
            predicates: Predicates::new(thresholds),
            store: VertexStore::default(),
            pool: EdgePool::new(),
            pending: Vec::new(),
            bootstrapped: false,
            bounds: None,
            nav: Navigator::new(),
            resolution: ZResolution::default(),
            constraints: Vec::new(),
            locked: false,
            disposed: false,
            synthetic_index: -1,
        })
    }

    // ------------------------------------------------------------------
    // configuration

    /// Set the z-resolution rule applied when coincident vertices merge.
    /// Affects groups created after the call.
    pub fn set_resolution_rule(&mut self, rule: ZResolution) {
        self.resolution = rule;
    }

    /// Reseed the internal walk stream. Builds with the same inputs and
    /// the same seed produce identical meshes.
    pub fn set_walk_seed(&mut self, seed: u64) {
        self.nav = Navigator::with_seed(seed);
    }

    #[inline]
    pub fn nominal_point_spacing(&self) -> f64 {
        self.thresholds.nominal_point_spacing()
    }

    #[inline]
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Predicate fallback counters for this instance.
    pub fn diagnostics(&self) -> crate::geom::PredicateDiagnostics {
        self.predicates.diagnostics()
    }

    // ------------------------------------------------------------------
    // state queries

    #[inline]
    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Count of distinct vertex sites (groups count once).
    pub fn vertex_count(&self) -> usize {
        self.store.live_count()
    }

    /// Count of allocated edge pairs, ghost pairs included.
    pub fn edge_count(&self) -> usize {
        self.pool.count()
    }

    /// Bounding rectangle of the inserted vertices; `None` until the TIN
    /// is bootstrapped.
    pub fn bounds(&self) -> Option<Rect> {
        if self.bootstrapped {
            self.bounds
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // vertex mutation

    /// Add one vertex. Returns whether the TIN is bootstrapped afterward.
    pub fn add(&mut self, v: Vertex) -> Result<bool, TinError> {
        self.add_returning_site(v)?;
        Ok(self.bootstrapped)
    }

    /// Add a vertex and report the id of the site now holding it (the
    /// vertex's own entry, or the coincident site it merged into).
    pub(super) fn add_returning_site(&mut self, v: Vertex) -> Result<VertexId, TinError> {
        self.check_mutable()?;
        if !v.x.is_finite() || !v.y.is_finite() {
            return Err(TinError::invalid("vertex coordinates must be finite"));
        }
        match &mut self.bounds {
            Some(r) => r.extend(v.x, v.y),
            None => self.bounds = Some(Rect::point(v.x, v.y)),
        }
        if self.bootstrapped {
            let vid = self.store.insert(v);
            return self.insert_point(vid);
        }
        let id = self.add_pending(v);
        if self.try_bootstrap()? {
            debug!(vertices = self.store.live_count(), "TIN bootstrapped");
        }
        Ok(id)
    }

    /// Add a list of vertices. Returns whether the TIN is bootstrapped.
    pub fn add_bulk(&mut self, vertices: Vec<Vertex>) -> Result<bool, TinError> {
        self.add_bulk_monitored(vertices, |_| true)
    }

    /// Add a list of vertices, reporting progress as an integer percentage
    /// in 0..=100. The monitor returns `false` to cancel; cancellation
    /// stops cleanly between vertices and leaves a valid partial TIN.
    pub fn add_bulk_monitored<F>(
        &mut self,
        vertices: Vec<Vertex>,
        mut monitor: F,
    ) -> Result<bool, TinError>
    where
        F: FnMut(u8) -> bool,
    {
        self.check_mutable()?;
        let total = vertices.len();
        if total == 0 {
            return Ok(self.bootstrapped);
        }
        // Reserve in one step: a TIN over n vertices carries ~3n pairs.
        self.pool.preallocate(3 * total + 16);
        let stride = (total / 100).max(1);
        for (i, v) in vertices.into_iter().enumerate() {
            if i % stride == 0 {
                let pct = (i * 100 / total) as u8;
                if !monitor(pct) {
                    debug!(inserted = i, total, "bulk insertion cancelled");
                    return Ok(self.bootstrapped);
                }
            }
            self.add(v)?;
        }
        monitor(100);
        Ok(self.bootstrapped)
    }

    fn check_mutable(&self) -> Result<(), TinError> {
        if self.disposed {
            return Err(TinError::Disposed);
        }
        if self.locked {
            return Err(TinError::Locked);
        }
        Ok(())
    }

    /// Queue a vertex while fewer than three non-collinear sites exist,
    /// merging coincident arrivals the same way insertion would.
    fn add_pending(&mut self, v: Vertex) -> VertexId {
        let tol_sq = self.thresholds.vertex_tolerance_sq();
        for &id in &self.pending {
            let (x, y) = self.store.xy(id);
            if v.distance_sq(x, y) < tol_sq {
                self.store.merge(id, v, self.resolution);
                return id;
            }
        }
        let id = self.store.insert(v);
        self.pending.push(id);
        id
    }

    /// Try to seed the mesh from the pending list. On success the three
    /// seed vertices form the initial triangle and every other pending
    /// vertex is inserted through the normal path.
    fn try_bootstrap(&mut self) -> Result<bool, TinError> {
        if self.bootstrapped || self.pending.len() < 3 {
            return Ok(false);
        }
        let Some((ia, ib, ic)) = self.find_seed_triple() else {
            return Ok(false);
        };
        let (a, b, c) = (self.pending[ia], self.pending[ib], self.pending[ic]);
        // Orient CCW.
        let (ax, ay) = self.store.xy(a);
        let (bx, by) = self.store.xy(b);
        let (cx, cy) = self.store.xy(c);
        let (b, c) = if self.predicates.orientation(ax, ay, bx, by, cx, cy) > 0.0 {
            (b, c)
        } else {
            (c, b)
        };
        self.build_seed_triangle(a, b, c);
        self.bootstrapped = true;

        let rest: Vec<VertexId> = self
            .pending
            .drain(..)
            .filter(|id| *id != a && *id != b && *id != c)
            .collect();
        for vid in rest {
            self.insert_point(vid)?;
        }
        Ok(true)
    }

    /// Find indices into `pending` of a triple whose area clears the
    /// half-plane threshold. The newest vertex is scanned against the
    /// anchor pairs first; a seeded random sampler covers pathological
    /// near-degenerate pending sets.
    fn find_seed_triple(&self) -> Option<(usize, usize, usize)> {
        let n = self.pending.len();
        let min_det = self.thresholds.half_plane();
        let xy = |i: usize| self.store.xy(self.pending[i]);
        let det = |i: usize, j: usize, k: usize| {
            let (ax, ay) = xy(i);
            let (bx, by) = xy(j);
            let (cx, cy) = xy(k);
            self.predicates.orientation(ax, ay, bx, by, cx, cy)
        };
        let newest = n - 1;
        for j in 1..newest {
            if det(0, j, newest).abs() > min_det {
                return Some((0, j, newest));
            }
        }
        if n >= 16 {
            let mut rng = StdRng::seed_from_u64(BOOTSTRAP_SEED ^ n as u64);
            for _ in 0..32 {
                let i = rng.gen_range(0..n);
                let j = rng.gen_range(0..n);
                let k = rng.gen_range(0..n);
                if i == j || j == k || i == k {
                    continue;
                }
                if det(i, j, k).abs() > min_det {
                    return Some((i, j, k));
                }
            }
        }
        None
    }

    /// Materialize the CCW seed triangle (a, b, c) plus its three ghost
    /// pairs and the exterior triangles stitching them to the hull.
    fn build_seed_triangle(&mut self, a: VertexId, b: VertexId, c: VertexId) {
        let ab = self.pool.alloc(Some(a), Some(b));
        let bc = self.pool.alloc(Some(b), Some(c));
        let ca = self.pool.alloc(Some(c), Some(a));
        let ga = self.pool.alloc(Some(a), None);
        let gb = self.pool.alloc(Some(b), None);
        let gc = self.pool.alloc(Some(c), None);

        self.pool.link(ab, bc);
        self.pool.link(bc, ca);
        self.pool.link(ca, ab);

        self.pool.link(ab.dual(), ga);
        self.pool.link(ga, gb.dual());
        self.pool.link(gb.dual(), ab.dual());

        self.pool.link(bc.dual(), gb);
        self.pool.link(gb, gc.dual());
        self.pool.link(gc.dual(), bc.dual());

        self.pool.link(ca.dual(), gc);
        self.pool.link(gc, ga.dual());
        self.pool.link(ga.dual(), ca.dual());

        self.nav.edge = ab;
    }

    // ------------------------------------------------------------------
    // traversal and queries

    /// Iterator over allocated base half-edges (each pair once), ghost
    /// edges included; empty before bootstrap.
    pub fn edges(&self) -> impl Iterator<Item = EdgeRef<'_>> + '_ {
        self.pool.base_edges().map(move |e| EdgeRef { tin: self, e })
    }

    /// Live vertex sites, coincidence groups counted once.
    pub fn vertices(&self) -> Vec<TinVertex<'_>> {
        self.store
            .iter()
            .filter_map(|(_, entry)| match entry {
                VertexEntry::Single(v) => Some(TinVertex::Single(v)),
                VertexEntry::Group(g) => Some(TinVertex::Group(g)),
                VertexEntry::Removed => None,
            })
            .collect()
    }

    pub(super) fn vertex_view(&self, id: VertexId) -> Option<TinVertex<'_>> {
        match self.store.entry(id) {
            VertexEntry::Single(v) => Some(TinVertex::Single(v)),
            VertexEntry::Group(g) => Some(TinVertex::Group(g)),
            VertexEntry::Removed => None,
        }
    }

    /// Ordered CCW list of interior-side hull edges; empty pre-bootstrap.
    pub fn perimeter(&self) -> Vec<EdgeRef<'_>> {
        let mut out = Vec::new();
        let Some(ghost) = self.pool.start_ghost_edge() else {
            return out;
        };
        // Normalize to the half with the real origin, then to the outer
        // side of its exterior triangle.
        let g = if self.pool.rec(ghost).vertex.is_some() {
            ghost
        } else {
            ghost.dual()
        };
        let start_outer = self.pool.rec(g).reverse;
        let mut outer = start_outer;
        loop {
            out.push(EdgeRef {
                tin: self,
                e: outer.dual(),
            });
            // Step to the next exterior triangle in CCW hull order.
            let na = self.pool.rec(outer).reverse;
            outer = self.pool.rec(na.dual()).reverse;
            if outer == start_outer || out.len() > self.pool.count() {
                break;
            }
        }
        out
    }

    /// Enumerate each real triangle once via its lowest-index half-edge.
    pub(super) fn for_each_triangle(&self, mut f: impl FnMut(EdgeIndex, EdgeIndex, EdgeIndex)) {
        for base in self.pool.base_edges() {
            for e in [base, base.dual()] {
                let e1 = self.pool.rec(e).forward;
                let e2 = self.pool.rec(e1).forward;
                if e.index() < e1.index() && e.index() < e2.index() {
                    let real = self.pool.rec(e).vertex.is_some()
                        && self.pool.rec(e1).vertex.is_some()
                        && self.pool.rec(e2).vertex.is_some();
                    if real {
                        f(e, e1, e2);
                    }
                }
            }
        }
    }

    /// Triangle count plus area statistics.
    pub fn count_triangles(&self) -> TriangleTally {
        let mut tally = TriangleTally {
            min_area: f64::INFINITY,
            max_area: f64::NEG_INFINITY,
            ..TriangleTally::default()
        };
        self.for_each_triangle(|e0, e1, e2| {
            let a = self.pool.rec(e0).vertex.expect("real triangle");
            let b = self.pool.rec(e1).vertex.expect("real triangle");
            let c = self.pool.rec(e2).vertex.expect("real triangle");
            let (ax, ay) = self.store.xy(a);
            let (bx, by) = self.store.xy(b);
            let (cx, cy) = self.store.xy(c);
            let area = self.predicates.area(ax, ay, bx, by, cx, cy);
            tally.count += 1;
            tally.sum_area += area;
            tally.sum_area_sq += area * area;
            tally.min_area = tally.min_area.min(area);
            tally.max_area = tally.max_area.max(area);
        });
        if tally.count == 0 {
            tally.min_area = 0.0;
            tally.max_area = 0.0;
        }
        tally
    }

    /// Count of real triangles.
    pub fn triangle_count(&self) -> usize {
        let mut n = 0;
        self.for_each_triangle(|_, _, _| n += 1);
        n
    }

    /// A fresh locator for read-only traversal; give each thread its own.
    pub fn navigator(&self) -> Navigator {
        let mut nav = Navigator::new();
        if let Some(e) = self.pool.start_edge() {
            nav.edge = e;
        }
        nav
    }

    pub(super) fn walker(&self) -> Walker<'_> {
        Walker {
            pool: &self.pool,
            store: &self.store,
            predicates: &self.predicates,
        }
    }

    /// True when the point lies on or inside the hull.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.locate_containing_triangle(x, y).is_some()
    }

    /// An edge of the triangle containing the point, or `None` when the
    /// point is outside the hull (or the TIN is not bootstrapped).
    pub fn locate_containing_triangle(&self, x: f64, y: f64) -> Option<EdgeRef<'_>> {
        if !self.bootstrapped {
            return None;
        }
        let mut nav = self.nav.clone();
        match self.walker().locate(&mut nav, x, y).ok()? {
            WalkOutcome::Interior(e) => Some(EdgeRef { tin: self, e }),
            WalkOutcome::Exterior(_) => None,
        }
    }

    /// Locate the point with a caller-owned navigator (read-only path for
    /// per-thread locators).
    pub fn locate_containing_triangle_with(
        &self,
        nav: &mut Navigator,
        x: f64,
        y: f64,
    ) -> Option<EdgeRef<'_>> {
        if !self.bootstrapped {
            return None;
        }
        match self.walker().locate(nav, x, y).ok()? {
            WalkOutcome::Interior(e) => Some(EdgeRef { tin: self, e }),
            WalkOutcome::Exterior(_) => None,
        }
    }

    /// The mesh edge nearest the query point: for interior queries the
    /// closest edge of the containing triangle, for exterior queries the
    /// subtending hull edge (interior side).
    pub fn locate_nearest_edge(&self, x: f64, y: f64) -> Option<EdgeRef<'_>> {
        if !self.bootstrapped {
            return None;
        }
        let mut nav = self.nav.clone();
        match self.walker().locate(&mut nav, x, y).ok()? {
            WalkOutcome::Exterior(outer) => Some(EdgeRef {
                tin: self,
                e: outer.dual(),
            }),
            WalkOutcome::Interior(e) => {
                let e1 = self.pool.rec(e).forward;
                let e2 = self.pool.rec(e1).forward;
                let q = Vector2::new(x, y);
                let mut best = e;
                let mut best_d = f64::INFINITY;
                for cand in [e, e1, e2] {
                    let a = self.pool.rec(cand).vertex?;
                    let b = self.pool.rec(cand.dual()).vertex?;
                    let (ax, ay) = self.store.xy(a);
                    let (bx, by) = self.store.xy(b);
                    let d =
                        segment_distance_sq(Vector2::new(ax, ay), Vector2::new(bx, by), q);
                    if d < best_d {
                        best_d = d;
                        best = cand;
                    }
                }
                Some(EdgeRef { tin: self, e: best })
            }
        }
    }

    /// O(1) region-membership query after flooding: does this half-edge
    /// lie inside (or border) the region of the given constraint?
    pub fn is_edge_in_region(&self, edge: EdgeIndex, constraint_index: u16) -> bool {
        if !self.pool.is_allocated(edge) {
            return false;
        }
        let w = self.pool.rec(edge).word;
        w.is_region_member() && w.constraint_index() == Some(constraint_index)
    }

    /// Constraints accepted so far, in index order.
    pub fn constraints(&self) -> impl Iterator<Item = (u16, &Constraint)> {
        self.constraints.iter().map(|r| (r.index, &r.constraint))
    }

    // ------------------------------------------------------------------
    // lifecycle

    /// Return to the pre-bootstrap state. Pool pages are kept for cheap
    /// reuse across datasets; the walk stream resets to the default seed
    /// so identical re-insertion reproduces the mesh.
    pub fn clear(&mut self) {
        if self.disposed {
            return;
        }
        debug!("clearing TIN");
        self.pool.clear();
        self.store.clear();
        self.pending.clear();
        self.constraints.clear();
        self.bootstrapped = false;
        self.locked = false;
        self.bounds = None;
        self.nav.reset();
        self.synthetic_index = -1;
        self.predicates.reset_diagnostics();
    }

    /// Terminal teardown: drops the pool and store and locks the TIN
    /// permanently. Subsequent mutation fails with `Disposed`.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        debug!("disposing TIN");
        self.clear();
        self.pool = EdgePool::new();
        self.disposed = true;
    }

    // ------------------------------------------------------------------
    // shared internal helpers

    /// Origin vertex of a half-edge.
    #[inline]
    pub(super) fn a_of(&self, e: EdgeIndex) -> Option<VertexId> {
        self.pool.rec(e).vertex
    }

    /// Terminal vertex of a half-edge.
    #[inline]
    pub(super) fn b_of(&self, e: EdgeIndex) -> Option<VertexId> {
        self.pool.rec(e.dual()).vertex
    }

    /// Free an edge pair, keeping the internal search edge and any caller
    /// handles consistent with a possible pair relocation.
    pub(super) fn free_pair(&mut self, e: EdgeIndex, tracked: &mut [&mut EdgeIndex]) {
        if let Some(relo) = self.pool.free(e) {
            self.nav.edge = relo.remap(self.nav.edge);
            for t in tracked.iter_mut() {
                **t = relo.remap(**t);
            }
        }
    }
}

/// Squared distance from `q` to segment `ab`.
fn segment_distance_sq(a: Vector2<f64>, b: Vector2<f64>, q: Vector2<f64>) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 <= 0.0 {
        return (q - a).norm_squared();
    }
    let t = ((q - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (q - (a + ab * t)).norm_squared()
}
