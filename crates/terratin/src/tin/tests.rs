use super::*;
use crate::vertex::Vertex;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn tin() -> IncrementalTin {
    IncrementalTin::new(1.0).expect("valid spacing")
}

fn grid(n: usize) -> Vec<Vertex> {
    let mut out = Vec::new();
    for j in 0..n {
        for i in 0..n {
            out.push(Vertex::new(i as f64, j as f64, 0.0, (j * n + i) as i32));
        }
    }
    out
}

/// Normalized multiset of real edges by endpoint coordinates, for
/// structural comparison across rebuilds.
fn edge_signature(t: &IncrementalTin) -> Vec<((u64, u64), (u64, u64))> {
    let mut sig: Vec<((u64, u64), (u64, u64))> = t
        .edges()
        .filter(|e| !e.is_ghost())
        .map(|e| {
            let a = e.a().unwrap();
            let b = e.b().unwrap();
            let pa = (a.x().to_bits(), a.y().to_bits());
            let pb = (b.x().to_bits(), b.y().to_bits());
            if pa <= pb {
                (pa, pb)
            } else {
                (pb, pa)
            }
        })
        .collect();
    sig.sort_unstable();
    sig
}

#[test]
fn rejects_non_positive_spacing() {
    assert!(IncrementalTin::new(0.0).is_err());
    assert!(IncrementalTin::new(-1.0).is_err());
    assert!(IncrementalTin::new(f64::NAN).is_err());
    assert!(IncrementalTin::new(1.0e-3).is_ok());
}

#[test]
fn s1_single_triangle() {
    let mut t = tin();
    assert!(!t.add(Vertex::new(0.0, 0.0, 0.0, 0)).unwrap());
    assert!(!t.add(Vertex::new(1.0, 0.0, 0.0, 1)).unwrap());
    assert!(t.add(Vertex::new(0.0, 1.0, 0.0, 2)).unwrap());
    assert!(t.is_bootstrapped());

    let tally = t.count_triangles();
    assert_eq!(tally.count, 1);
    assert!((tally.sum_area - 0.5).abs() < 1e-12);

    let hull = t.perimeter();
    assert_eq!(hull.len(), 3);
    // Perimeter is a closed CCW chain.
    for (i, e) in hull.iter().enumerate() {
        let next = &hull[(i + 1) % hull.len()];
        assert_eq!(e.b().unwrap().x(), next.a().unwrap().x());
        assert_eq!(e.b().unwrap().y(), next.a().unwrap().y());
    }
    let ghosts = t.edges().filter(|e| e.is_ghost()).count();
    assert_eq!(ghosts, 3);

    let report = t.integrity_check();
    assert!(report.ok, "{}", report.message);
}

#[test]
fn s2_grid_3x3() {
    let mut t = tin();
    t.add_bulk(grid(3)).unwrap();
    let tally = t.count_triangles();
    assert_eq!(tally.count, 8);
    assert!((tally.sum_area - 4.0).abs() < 1e-9);

    let report = t.integrity_check();
    assert!(report.ok, "{}", report.message);
    assert_eq!(report.delaunay_violation_count, 0);
}

#[test]
fn s3_collinear_then_rescue() {
    let mut t = tin();
    assert!(!t.add(Vertex::new(0.0, 0.0, 0.0, 0)).unwrap());
    assert!(!t.add(Vertex::new(1.0, 0.0, 0.0, 1)).unwrap());
    assert!(!t.add(Vertex::new(2.0, 0.0, 0.0, 2)).unwrap());
    assert!(!t.is_bootstrapped());
    assert_eq!(t.edges().count(), 0);
    assert!(t.bounds().is_none());

    assert!(t.add(Vertex::new(1.0, 1.0, 0.0, 3)).unwrap());
    assert!(t.is_bootstrapped());
    let tally = t.count_triangles();
    assert_eq!(tally.count, 2);
    assert!((tally.sum_area - 1.0).abs() < 1e-12);
    let report = t.integrity_check();
    assert!(report.ok, "{}", report.message);
}

#[test]
fn s4_coincidence_merging() {
    let mut t = tin();
    t.set_resolution_rule(ZResolution::Mean);
    t.add(Vertex::new(0.0, 0.0, 10.0, 0)).unwrap();
    t.add(Vertex::new(1.0, 0.0, 20.0, 1)).unwrap();
    t.add(Vertex::new(0.0, 1.0, 30.0, 2)).unwrap();
    // Within the coincidence tolerance of (1, 0): merges, no new site.
    t.add(Vertex::new(1.0 + 1.0e-15, 0.0, 50.0, 3)).unwrap();

    assert_eq!(t.vertex_count(), 3);
    assert_eq!(t.count_triangles().count, 1);
    let sites = t.vertices();
    let merged = sites
        .iter()
        .find(|v| v.is_group())
        .expect("one site must be a merger group");
    assert_eq!(merged.x(), 1.0);
    assert_eq!(merged.y(), 0.0);
    assert!((merged.z() - 35.0).abs() < 1e-12);

    let report = t.integrity_check();
    assert!(report.ok, "{}", report.message);
}

#[test]
fn removing_one_group_member_keeps_the_site() {
    let mut t = tin();
    t.set_resolution_rule(ZResolution::Mean);
    t.add(Vertex::new(0.0, 0.0, 10.0, 0)).unwrap();
    t.add(Vertex::new(1.0, 0.0, 20.0, 1)).unwrap();
    t.add(Vertex::new(0.0, 1.0, 30.0, 2)).unwrap();
    let extra = Vertex::new(1.0 + 1.0e-15, 0.0, 50.0, 3);
    t.add(extra).unwrap();

    assert!(t.remove(&extra).unwrap());
    assert_eq!(t.vertex_count(), 3);
    let sites = t.vertices();
    assert!(sites.iter().all(|v| !v.is_group()));
    let site = sites
        .iter()
        .find(|v| v.x() == 1.0 && v.y() == 0.0)
        .unwrap();
    assert_eq!(site.z(), 20.0);
}

#[test]
fn add_is_idempotent_on_identical_vertices() {
    let mut t = tin();
    let v = Vertex::new(0.0, 0.0, 1.0, 0);
    t.add(v).unwrap();
    t.add(Vertex::new(1.0, 0.0, 0.0, 1)).unwrap();
    t.add(Vertex::new(0.0, 1.0, 0.0, 2)).unwrap();
    let before = edge_signature(&t);

    t.add(v).unwrap();
    assert_eq!(t.vertex_count(), 3);
    assert!(t.vertices().iter().all(|s| !s.is_group()));
    assert_eq!(edge_signature(&t), before);
}

#[test]
fn s6_remove_center_vertex() {
    let mut t = tin();
    t.add_bulk(grid(3)).unwrap();
    assert!(t.remove(&Vertex::new(1.0, 1.0, 0.0, 4)).unwrap());

    let tally = t.count_triangles();
    assert_eq!(tally.count, 6);
    assert!((tally.sum_area - 4.0).abs() < 1e-9);
    let report = t.integrity_check();
    assert!(report.ok, "{}", report.message);
    assert_eq!(t.vertex_count(), 8);
}

#[test]
fn remove_hull_corner() {
    let mut t = tin();
    t.add_bulk(grid(3)).unwrap();
    assert!(t.remove(&Vertex::new(0.0, 0.0, 0.0, 0)).unwrap());

    let tally = t.count_triangles();
    assert!((tally.sum_area - 3.5).abs() < 1e-9);
    let report = t.integrity_check();
    assert!(report.ok, "{}", report.message);
}

#[test]
fn remove_absent_vertex_returns_false() {
    let mut t = tin();
    t.add_bulk(grid(3)).unwrap();
    assert!(!t.remove(&Vertex::new(10.0, 10.0, 0.0, 99)).unwrap());
    assert!(!t.remove(&Vertex::new(0.25, 0.25, 0.0, 99)).unwrap());
    assert_eq!(t.vertex_count(), 9);
}

#[test]
fn removal_below_three_vertices_dissolves() {
    let mut t = tin();
    t.add(Vertex::new(0.0, 0.0, 0.0, 0)).unwrap();
    t.add(Vertex::new(1.0, 0.0, 0.0, 1)).unwrap();
    t.add(Vertex::new(0.0, 1.0, 0.0, 2)).unwrap();
    assert!(t.is_bootstrapped());

    assert!(t.remove(&Vertex::new(0.0, 1.0, 0.0, 2)).unwrap());
    assert!(!t.is_bootstrapped());
    assert_eq!(t.edges().count(), 0);
    assert_eq!(t.vertex_count(), 2);

    // The survivors are still queued: one more vertex re-bootstraps.
    assert!(t.add(Vertex::new(2.0, 3.0, 0.0, 7)).unwrap());
    assert_eq!(t.count_triangles().count, 1);
}

#[test]
fn insert_then_remove_restores_structure() {
    // Random sites: no cocircular quadruples, so the Delaunay mesh is
    // unique and removal must restore the exact edge set.
    let mut rng = StdRng::seed_from_u64(3);
    let mut t = tin();
    for i in 0..30 {
        t.add(Vertex::new(
            rng.gen_range(0.0..10.0),
            rng.gen_range(0.0..10.0),
            0.0,
            i,
        ))
        .unwrap();
    }
    let before = edge_signature(&t);

    let probe = Vertex::new(4.3, 5.7, 5.0, 100);
    t.add(probe).unwrap();
    assert_ne!(edge_signature(&t), before);
    assert!(t.remove(&probe).unwrap());
    assert_eq!(edge_signature(&t), before);

    let report = t.integrity_check();
    assert!(report.ok, "{}", report.message);
}

#[test]
fn clear_and_reinsert_is_deterministic() {
    let input = {
        let mut rng = StdRng::seed_from_u64(11);
        (0..60)
            .map(|i| {
                Vertex::new(
                    rng.gen_range(0.0..50.0),
                    rng.gen_range(0.0..50.0),
                    rng.gen_range(0.0..10.0),
                    i,
                )
            })
            .collect::<Vec<_>>()
    };
    let mut t = tin();
    t.add_bulk(input.clone()).unwrap();
    let first: Vec<u32> = t.edges().map(|e| e.index().index()).collect();
    let first_sig = edge_signature(&t);

    t.clear();
    assert!(!t.is_bootstrapped());
    t.add_bulk(input).unwrap();
    let second: Vec<u32> = t.edges().map(|e| e.index().index()).collect();
    assert_eq!(first, second, "edge allocation order must reproduce");
    assert_eq!(first_sig, edge_signature(&t));
}

#[test]
fn bounds_track_input() {
    let mut t = tin();
    t.add_bulk(grid(3)).unwrap();
    let r = t.bounds().unwrap();
    assert_eq!(r.min.x, 0.0);
    assert_eq!(r.min.y, 0.0);
    assert_eq!(r.max.x, 2.0);
    assert_eq!(r.max.y, 2.0);
}

#[test]
fn point_location_queries() {
    let mut t = tin();
    t.add_bulk(grid(3)).unwrap();

    assert!(t.contains_point(0.5, 0.5));
    assert!(t.contains_point(2.0, 2.0));
    assert!(!t.contains_point(2.5, 1.0));
    assert!(!t.contains_point(-0.1, -0.1));

    let inside = t.locate_containing_triangle(1.2, 0.7).unwrap();
    assert!(!inside.is_ghost());
    assert!(t.locate_containing_triangle(5.0, 5.0).is_none());

    let near = t.locate_nearest_edge(2.4, 1.0).unwrap();
    assert!(!near.is_ghost());
    // The subtending hull edge for this exterior query runs along x = 2.
    assert_eq!(near.a().unwrap().x(), 2.0);
    assert_eq!(near.b().unwrap().x(), 2.0);
}

#[test]
fn read_only_traversal_from_multiple_threads() {
    let mut t = tin();
    t.add_bulk(grid(8)).unwrap();
    let t = &t;
    std::thread::scope(|scope| {
        for k in 0..4u64 {
            scope.spawn(move || {
                let mut nav = Navigator::with_seed(0x1000 + k);
                let mut rng = StdRng::seed_from_u64(k);
                for _ in 0..200 {
                    let x = rng.gen_range(0.5..6.5);
                    let y = rng.gen_range(0.5..6.5);
                    let e = t
                        .locate_containing_triangle_with(&mut nav, x, y)
                        .expect("interior point");
                    assert!(!e.is_ghost());
                }
            });
        }
    });
}

#[test]
fn bulk_monitor_reports_progress_and_cancels() {
    let mut t = tin();
    let mut seen: Vec<u8> = Vec::new();
    t.add_bulk_monitored(grid(10), |pct| {
        seen.push(pct);
        true
    })
    .unwrap();
    assert_eq!(*seen.first().unwrap(), 0);
    assert_eq!(*seen.last().unwrap(), 100);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));

    let mut t2 = tin();
    t2.add_bulk_monitored(grid(10), |_| false).unwrap();
    assert_eq!(t2.vertex_count(), 0);
    // A cancelled bulk load leaves a consistent (here: empty) TIN.
    assert!(!t2.is_bootstrapped());
}

#[test]
fn lifecycle_lock_and_dispose() {
    let mut t = tin();
    t.add_bulk(grid(5)).unwrap();
    let constraint = Constraint::polygon(vec![
        Vertex::new(0.5, 0.5, 0.0, 200),
        Vertex::new(3.5, 0.5, 0.0, 201),
        Vertex::new(3.5, 3.5, 0.0, 202),
        Vertex::new(0.5, 3.5, 0.0, 203),
    ])
    .unwrap();
    t.add_constraints(vec![constraint], false).unwrap();
    assert!(t.is_locked());
    assert!(matches!(
        t.add(Vertex::new(9.0, 9.0, 0.0, 300)),
        Err(TinError::Locked)
    ));
    assert!(matches!(
        t.remove(&Vertex::new(1.0, 1.0, 0.0, 6)),
        Err(TinError::Locked)
    ));
    assert!(matches!(
        t.add_constraints(vec![], false),
        Err(TinError::IllegalState(_))
    ));

    // clear unlocks and empties.
    t.clear();
    assert!(!t.is_locked());
    assert!(!t.is_bootstrapped());
    t.add_bulk(grid(3)).unwrap();
    assert_eq!(t.count_triangles().count, 8);

    t.dispose();
    assert!(t.is_disposed());
    assert!(matches!(
        t.add(Vertex::new(0.0, 0.0, 0.0, 0)),
        Err(TinError::Disposed)
    ));
}

#[test]
fn s5_polygon_constraint_with_conformity() {
    let mut t = tin();
    t.add_bulk(grid(5)).unwrap();
    let polygon = vec![
        Vertex::new(0.5, 0.5, 0.0, 200),
        Vertex::new(3.5, 0.5, 0.0, 201),
        Vertex::new(3.5, 3.5, 0.0, 202),
        Vertex::new(0.5, 3.5, 0.0, 203),
    ];
    t.add_constraints(vec![Constraint::polygon(polygon).unwrap()], true)
        .unwrap();

    let report = t.integrity_check();
    assert!(report.ok, "{}", report.message);
    assert_eq!(t.constraints().count(), 1);

    // Every constrained edge lies on the polygon boundary, and each of
    // the four sides is represented.
    let mut sides = [false; 4];
    let on = |v: f64, w: f64| (v - w).abs() < 1e-9;
    let mut constrained = 0;
    for e in t.edges() {
        if !e.is_constrained() {
            continue;
        }
        constrained += 1;
        let (a, b) = (e.a().unwrap(), e.b().unwrap());
        let (ax, ay) = (a.x(), a.y());
        let (bx, by) = (b.x(), b.y());
        let side = if on(ay, 0.5) && on(by, 0.5) {
            0
        } else if on(ax, 3.5) && on(bx, 3.5) {
            1
        } else if on(ay, 3.5) && on(by, 3.5) {
            2
        } else if on(ax, 0.5) && on(bx, 0.5) {
            3
        } else {
            panic!("constrained edge off the polygon boundary: ({ax},{ay})-({bx},{by})");
        };
        assert!(e.is_region_border());
        sides[side] = true;
        // The interior side carries the region's constraint index.
        let ci = e
            .constraint_index()
            .or_else(|| e.dual().constraint_index());
        assert_eq!(ci, Some(0));
    }
    assert!(constrained >= 4);
    assert!(sides.iter().all(|&s| s), "all four sides constrained");

    // Region flooding marks exactly the triangles whose centroid lies
    // inside the polygon.
    let mut interior = 0;
    let mut exterior = 0;
    t.for_each_triangle(|e0, e1, e2| {
        let xs: Vec<(f64, f64)> = [e0, e1, e2]
            .iter()
            .map(|&e| t.store.xy(t.pool.rec(e).vertex.unwrap()))
            .collect();
        let cx = (xs[0].0 + xs[1].0 + xs[2].0) / 3.0;
        let cy = (xs[0].1 + xs[1].1 + xs[2].1) / 3.0;
        let inside = cx > 0.5 && cx < 3.5 && cy > 0.5 && cy < 3.5;
        let marked = [e0, e1, e2]
            .iter()
            .all(|&e| t.is_edge_in_region(e, 0));
        assert_eq!(
            inside, marked,
            "triangle centroid ({cx},{cy}) region marking mismatch"
        );
        if inside {
            interior += 1;
        } else {
            exterior += 1;
        }
    });
    assert!(interior > 0);
    assert!(exterior > 0);
}

#[test]
fn polyline_constraint_marks_line_members() {
    let mut t = tin();
    t.add_bulk(grid(5)).unwrap();
    let line = vec![
        Vertex::new(0.5, 2.2, 1.0, 300),
        Vertex::new(3.5, 2.2, 1.0, 301),
    ];
    t.add_constraints(vec![Constraint::polyline(line).unwrap()], false)
        .unwrap();

    let report = t.integrity_check();
    assert!(report.ok, "{}", report.message);
    let constrained: Vec<_> = t.edges().filter(|e| e.is_constrained()).collect();
    assert!(!constrained.is_empty());
    for e in &constrained {
        assert!(!e.is_region_border());
        let (a, b) = (e.a().unwrap(), e.b().unwrap());
        assert!((a.y() - 2.2).abs() < 1e-9);
        assert!((b.y() - 2.2).abs() < 1e-9);
    }
}

#[test]
fn constraint_objects_validate() {
    assert!(Constraint::polygon(vec![
        Vertex::new(0.0, 0.0, 0.0, 0),
        Vertex::new(1.0, 0.0, 0.0, 1),
    ])
    .is_err());
    assert!(Constraint::polyline(vec![Vertex::new(0.0, 0.0, 0.0, 0)]).is_err());
    // Degenerate (zero-area) polygon.
    assert!(Constraint::polygon(vec![
        Vertex::new(0.0, 0.0, 0.0, 0),
        Vertex::new(1.0, 1.0, 0.0, 1),
        Vertex::new(2.0, 2.0, 0.0, 2),
    ])
    .is_err());

    // A repeated closing vertex is stripped; CW winding is normalized.
    let cw = Constraint::polygon(vec![
        Vertex::new(0.0, 0.0, 0.0, 0),
        Vertex::new(0.0, 1.0, 0.0, 1),
        Vertex::new(1.0, 1.0, 0.0, 2),
        Vertex::new(1.0, 0.0, 0.0, 3),
        Vertex::new(0.0, 0.0, 0.0, 0),
    ])
    .unwrap();
    assert_eq!(cw.vertices().len(), 4);
    let mut area = 0.0;
    let vs = cw.vertices();
    for i in 0..vs.len() {
        let p = vs[i];
        let q = vs[(i + 1) % vs.len()];
        area += p.x * q.y - q.x * p.y;
    }
    assert!(area > 0.0, "normalized winding must be CCW");
}

#[test]
fn too_many_constraints_rejected() {
    let mut t = tin();
    t.add_bulk(grid(3)).unwrap();
    let c = Constraint::polyline(vec![
        Vertex::new(0.0, 0.0, 0.0, 0),
        Vertex::new(2.0, 2.0, 0.0, 8),
    ])
    .unwrap();
    let many: Vec<Constraint> = (0..8192).map(|_| c.clone()).collect();
    assert!(matches!(
        t.add_constraints(many, false),
        Err(TinError::InvalidArgument(_))
    ));
}

#[test]
fn vertex_on_existing_edge_inserts_cleanly() {
    let mut t = tin();
    t.add_bulk(grid(3)).unwrap();
    // Exactly on the edge between (0,0) and (1,0).
    t.add(Vertex::new(0.5, 0.0, 0.0, 50)).unwrap();
    let report = t.integrity_check();
    assert!(report.ok, "{}", report.message);
    assert_eq!(t.vertex_count(), 10);
}

#[test]
fn collinear_exterior_extension() {
    let mut t = tin();
    t.add(Vertex::new(0.0, 0.0, 0.0, 0)).unwrap();
    t.add(Vertex::new(1.0, 0.0, 0.0, 1)).unwrap();
    t.add(Vertex::new(0.0, 1.0, 0.0, 2)).unwrap();
    // Collinear with the hull edge y = 0, beyond its endpoint.
    t.add(Vertex::new(2.0, 0.0, 0.0, 3)).unwrap();
    let report = t.integrity_check();
    assert!(report.ok, "{}", report.message);
    assert_eq!(t.vertex_count(), 4);
    let tally = t.count_triangles();
    assert!(tally.min_area > 0.0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn random_builds_pass_integrity(seed in 0u64..500, n in 3usize..60) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut t = tin();
        for i in 0..n {
            let x = rng.gen_range(0.0..100.0);
            let y = rng.gen_range(0.0..100.0);
            t.add(Vertex::new(x, y, 0.0, i as i32)).unwrap();
        }
        if t.is_bootstrapped() {
            let report = t.integrity_check();
            prop_assert!(report.ok, "{}", report.message);
            prop_assert_eq!(report.delaunay_violation_count, 0);
        }
    }

    #[test]
    fn random_insert_remove_keeps_integrity(seed in 0u64..200) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut t = tin();
        t.add_bulk(grid(5)).unwrap();
        let mut extras = Vec::new();
        for i in 0..10 {
            let v = Vertex::new(
                rng.gen_range(0.2..3.8),
                rng.gen_range(0.2..3.8),
                0.0,
                1000 + i,
            );
            extras.push(v);
            t.add(v).unwrap();
        }
        for v in &extras {
            prop_assert!(t.remove(v).unwrap());
            let report = t.integrity_check();
            prop_assert!(report.ok, "{}", report.message);
        }
        prop_assert_eq!(t.vertex_count(), 25);
    }
}
