mod common;

use common::{engine, left_heavy, right_heavy, uniform};
use mratree::{ExecContext, NodePos, TreeConfig, TreeError};

#[test]
fn gaxpy_is_commutative_on_random_trees() {
    let engine = engine(9);
    let a = engine.refine(12345).expect("refine A");
    let b = engine.refine(54321).expect("refine B");

    let ab = engine.gaxpy(&a, &b).expect("gaxpy A+B");
    let ba = engine.gaxpy(&b, &a).expect("gaxpy B+A");
    assert_eq!(ab, ba);
    assert_eq!(ab.shape(), a.shape().union(&b.shape()));
    ab.validate().expect("gaxpy output is well formed");
}

#[test]
fn gaxpy_with_self_doubles_leaves() {
    let engine = engine(8);
    let a = engine.refine(777).expect("refine succeeds");
    let doubled = engine.gaxpy(&a, &a).expect("gaxpy succeeds");

    assert_eq!(doubled.shape(), a.shape());
    let expected: Vec<_> = a.leaves().map(|(pos, coef)| (pos, 2 * coef)).collect();
    let actual: Vec<_> = doubled.leaves().collect();
    assert_eq!(actual, expected);
}

#[test]
fn asymmetric_shapes_merge_pointwise() {
    let engine = engine(2);
    let a = left_heavy();
    let b = right_heavy();
    let c = engine.gaxpy(&a, &b).expect("gaxpy succeeds");

    assert_eq!(c.point_values(2).expect("scaling form"), vec![6, 7, 4, 5]);
    assert!(c.get(NodePos::new(1, 0)).is_some_and(|slot| slot.is_internal()));
    assert!(c.get(NodePos::new(1, 1)).is_some_and(|slot| slot.is_internal()));
    assert_eq!(c.leaf_count(), 4);
}

#[test]
fn coarse_leaf_value_reaches_every_finer_leaf() {
    let engine = engine(2);
    let c = engine.gaxpy(&left_heavy(), &right_heavy()).expect("gaxpy succeeds");
    let flat = uniform(2, 2, &[6, 7, 4, 5]);

    // same function, same shape: every leaf at depth 2, internal nodes empty
    assert_eq!(c, flat);
    assert_eq!(engine.norm(&c), Ok(36 + 49 + 16 + 25));
}

#[test]
fn gaxpy_output_feeds_compress_and_diff() {
    let engine = engine(2);
    let c = engine.gaxpy(&left_heavy(), &right_heavy()).expect("gaxpy succeeds");

    let mut round_trip = c.clone();
    engine.compress(&mut round_trip).expect("compress succeeds");
    assert_eq!(round_trip.coef_at(NodePos::root()), Some(6 + 7 + 4 + 5));
    engine.reconstruct(&mut round_trip, 0).expect("reconstruct succeeds");
    assert_eq!(round_trip.point_values(2).expect("scaling form"), vec![6, 7, 4, 5]);

    let diffed = engine.diff(&c).expect("diff succeeds");
    let expected = engine
        .diff(&uniform(2, 2, &[6, 7, 4, 5]))
        .expect("diff succeeds");
    assert_eq!(diffed, expected);
    assert_eq!(
        diffed.store.point_values(2).expect("scaling form"),
        vec![13, 17, 16, 9]
    );
}

#[test]
fn gaxpy_output_composes_on_random_trees() {
    let engine = engine(8);
    let a = engine.refine(12345).expect("refine A");
    let b = engine.refine(54321).expect("refine B");
    let c = engine.gaxpy(&a, &b).expect("gaxpy succeeds");

    let mut round_trip = c.clone();
    engine.compress(&mut round_trip).expect("compress succeeds");
    engine.reconstruct(&mut round_trip, 0).expect("reconstruct succeeds");
    assert_eq!(round_trip, c);

    assert!(c.nodes().all(|(_, _, slot)| !slot.is_internal() || slot.coef == 0));
    let squares: i64 = c.leaves().map(|(_, coef)| coef * coef).sum();
    assert_eq!(engine.norm(&c), Ok(squares));
}

#[test]
fn scaled_gaxpy_overflow_is_an_error() {
    let engine = engine(2);
    assert!(matches!(
        engine.gaxpy_scaled(i64::MAX, &left_heavy(), 1, &right_heavy()),
        Err(TreeError::Overflow { .. })
    ));
}

#[test]
fn scaled_gaxpy_is_linear_in_point_values() {
    let engine = engine(7);
    let a = engine.refine(1).expect("refine A");
    let b = engine.refine(2).expect("refine B");
    let c = engine.gaxpy_scaled(3, &a, -2, &b).expect("gaxpy succeeds");

    let pa = a.point_values(7).expect("scaling form");
    let pb = b.point_values(7).expect("scaling form");
    let pc = c.point_values(7).expect("scaling form");
    for i in 0..pc.len() {
        assert_eq!(pc[i], 3 * pa[i] - 2 * pb[i], "mismatch at label {}", i);
    }
}

#[test]
fn different_refine_depths_reach_deeper_side() {
    let shallow = TreeConfig::new(6)
        .and_then(|c| c.with_refine_depth(2))
        .expect("valid config")
        .full_refinement();
    let deep = TreeConfig::new(6)
        .and_then(|c| c.with_refine_depth(5))
        .expect("valid config")
        .full_refinement();
    let ctx = ExecContext::new();
    let a = mratree::ops::refine(&shallow, 10, &ctx).expect("refine A");
    let b = mratree::ops::refine(&deep, 20, &ctx).expect("refine B");

    let c = mratree::ops::gaxpy(&a, &b, &ctx).expect("gaxpy succeeds");
    assert_eq!(c.depth(), Some(5));
    assert_eq!(c.shape(), b.shape());
}

#[test]
fn gaxpy_rejects_mismatched_layouts() {
    let a = uniform(2, 1, &[1, 2]);
    let b = uniform(3, 1, &[1, 2]);
    let engine = engine(2);
    assert_eq!(
        engine.gaxpy(&a, &b),
        Err(TreeError::LayoutMismatch { left: 2, right: 3 })
    );
}

#[test]
fn gaxpy_rejects_unrefined_input() {
    let engine = engine(2);
    let empty = mratree::NodeStore::empty(engine.config().layout().expect("layout"));
    let a = left_heavy();
    assert_eq!(engine.gaxpy(&a, &empty), Err(TreeError::Unrefined));
}
