//! Full structural and geometric audit of the mesh.
//!
//! Verifies the quad-edge invariants (three-step forward cycles,
//! reflective links), the ghost star around the hull, triangle areas,
//! hull closure, and the Delaunay criterion on unconstrained interior
//! edges. The first failure is described in the report message; Delaunay
//! violations are additionally tallied in full.

use crate::quadedge::EdgeIndex;

use super::IncrementalTin;

/// Outcome of [`IncrementalTin::integrity_check`].
#[derive(Clone, Debug)]
pub struct IntegrityReport {
    pub ok: bool,
    /// Description of the first failure, or "ok".
    pub message: String,
    pub delaunay_violation_count: usize,
    pub delaunay_violation_sum: f64,
    pub delaunay_violation_max: f64,
}

impl IntegrityReport {
    fn ok() -> Self {
        Self {
            ok: true,
            message: "ok".to_string(),
            delaunay_violation_count: 0,
            delaunay_violation_sum: 0.0,
            delaunay_violation_max: 0.0,
        }
    }

    fn fail(&mut self, message: String) {
        if self.ok {
            self.ok = false;
            self.message = message;
        }
    }
}

impl IncrementalTin {
    /// Audit the mesh. Cheap enough to run after every build step in
    /// tests; linear in the edge count.
    pub fn integrity_check(&self) -> IntegrityReport {
        let mut report = IntegrityReport::ok();
        if !self.bootstrapped {
            report.message = "not bootstrapped".to_string();
            return report;
        }

        self.check_links(&mut report);
        self.check_ghost_star(&mut report);
        self.check_triangles(&mut report);
        self.check_delaunay(&mut report);
        report
    }

    fn check_links(&self, report: &mut IntegrityReport) {
        for base in self.pool.base_edges() {
            for e in [base, base.dual()] {
                let f1 = self.pool.rec(e).forward;
                if f1.is_none() {
                    report.fail(format!("edge {} has no forward link", e.index()));
                    return;
                }
                if f1 == e || f1 == e.dual() {
                    report.fail(format!("edge {} links to its own pair", e.index()));
                    return;
                }
                let f2 = self.pool.rec(f1).forward;
                let f3 = self.pool.rec(f2).forward;
                if f3 != e {
                    report.fail(format!(
                        "forward cycle of edge {} does not close in three steps",
                        e.index()
                    ));
                    return;
                }
                if self.pool.rec(f1).reverse != e {
                    report.fail(format!(
                        "reverse link of edge {} disagrees with forward link of {}",
                        f1.index(),
                        e.index()
                    ));
                    return;
                }
            }
        }
    }

    /// The ghost edges must form one closed loop around the hull, and the
    /// hull polygon they bound must have positive area.
    fn check_ghost_star(&self, report: &mut IntegrityReport) {
        let ghost_pairs = self
            .pool
            .base_edges()
            .filter(|&e| {
                self.pool.rec(e).vertex.is_none() || self.pool.rec(e.dual()).vertex.is_none()
            })
            .count();
        let Some(ghost) = self.pool.start_ghost_edge() else {
            report.fail("bootstrapped mesh has no ghost edges".to_string());
            return;
        };
        let g = if self.pool.rec(ghost).vertex.is_some() {
            ghost
        } else {
            ghost.dual()
        };
        let start_outer = self.pool.rec(g).reverse;

        let mut outer = start_outer;
        let mut hull_edges = 0usize;
        let mut area2 = 0.0;
        loop {
            let (Some(a), Some(b)) = (self.a_of(outer), self.b_of(outer)) else {
                report.fail("perimeter edge with a null endpoint".to_string());
                return;
            };
            // The left face of an outer perimeter edge is a ghost triangle.
            let apex = self.b_of(self.pool.rec(outer).forward);
            if apex.is_some() {
                report.fail(format!(
                    "perimeter edge {} is not backed by a ghost triangle",
                    outer.index()
                ));
                return;
            }
            // Outer edges run clockwise (b -> a of each CCW hull edge), so
            // accumulate the shoelace sum with swapped operands.
            let (bx, by) = self.store.xy(a);
            let (ax, ay) = self.store.xy(b);
            area2 += ax * by - bx * ay;
            hull_edges += 1;
            if hull_edges > self.pool.count() + 1 {
                report.fail("perimeter traversal looped".to_string());
                return;
            }
            let na = self.pool.rec(outer).reverse;
            outer = self.pool.rec(na.dual()).reverse;
            if outer == start_outer {
                break;
            }
        }
        if hull_edges != ghost_pairs {
            report.fail(format!(
                "ghost star visits {hull_edges} hull edges but {ghost_pairs} ghost pairs exist"
            ));
        }
        if area2 <= 0.0 {
            report.fail(format!(
                "perimeter polygon area is not positive ({})",
                0.5 * area2
            ));
        }
        // Total triangle area must reproduce the hull area.
        let tally = self.count_triangles();
        let hull_area = 0.5 * area2;
        if hull_area > 0.0 && (tally.sum_area - hull_area).abs() > 1.0e-6 * hull_area {
            report.fail(format!(
                "triangle areas sum to {} but the hull encloses {}",
                tally.sum_area, hull_area
            ));
        }
    }

    fn check_triangles(&self, report: &mut IntegrityReport) {
        let mut worst = f64::INFINITY;
        let mut bad: Option<EdgeIndex> = None;
        self.for_each_triangle(|e0, e1, e2| {
            let (Some(a), Some(b), Some(c)) = (
                self.pool.rec(e0).vertex,
                self.pool.rec(e1).vertex,
                self.pool.rec(e2).vertex,
            ) else {
                return;
            };
            let (ax, ay) = self.store.xy(a);
            let (bx, by) = self.store.xy(b);
            let (cx, cy) = self.store.xy(c);
            let area = self.predicates.area(ax, ay, bx, by, cx, cy);
            if area < worst {
                worst = area;
                if area <= 0.0 {
                    bad = Some(e0);
                }
            }
        });
        if let Some(e) = bad {
            report.fail(format!(
                "triangle at edge {} has non-positive area {}",
                e.index(),
                worst
            ));
        }
    }

    /// Delaunay criterion on every unconstrained interior edge, within
    /// the uniform in-circle threshold.
    fn check_delaunay(&self, report: &mut IntegrityReport) {
        let threshold = self.thresholds.in_circle();
        for e in self.pool.base_edges() {
            let (Some(a), Some(b)) = (self.a_of(e), self.b_of(e)) else {
                continue;
            };
            if self.pool.rec(e).word.is_constrained()
                || self.pool.rec(e.dual()).word.is_constrained()
            {
                continue;
            }
            let (Some(c), Some(d)) = (
                self.b_of(self.pool.rec(e).forward),
                self.b_of(self.pool.rec(e.dual()).forward),
            ) else {
                continue;
            };
            let (ax, ay) = self.store.xy(a);
            let (bx, by) = self.store.xy(b);
            let (cx, cy) = self.store.xy(c);
            let (dx, dy) = self.store.xy(d);
            let h = self.predicates.in_circle(ax, ay, bx, by, cx, cy, dx, dy);
            if h > threshold {
                report.delaunay_violation_count += 1;
                report.delaunay_violation_sum += h;
                report.delaunay_violation_max = report.delaunay_violation_max.max(h);
            }
        }
        if report.delaunay_violation_count > 0 {
            report.fail(format!(
                "{} interior edges violate the Delaunay criterion (max {})",
                report.delaunay_violation_count, report.delaunay_violation_max
            ));
        }
    }
}
