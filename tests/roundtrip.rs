mod common;

use common::{engine, full_engine, uniform};
use mratree::{Form, NodePos, Slot, TreeError};

#[test]
fn fully_refined_depth_two_scenario() {
    let engine = full_engine(2);
    let original = engine.refine(2024).expect("refine succeeds");

    let leaves: Vec<_> = original.leaves().collect();
    let positions: Vec<_> = leaves.iter().map(|(pos, _)| *pos).collect();
    assert_eq!(
        positions,
        (0..4).map(|l| NodePos::new(2, l)).collect::<Vec<_>>()
    );
    let v: Vec<i64> = leaves.iter().map(|(_, coef)| *coef).collect();

    let mut store = original.clone();
    engine.compress(&mut store).expect("compress succeeds");
    assert_eq!(store.form(), Form::Compressed);
    assert_eq!(store.coef_at(NodePos::new(1, 0)), Some(v[0] + v[1]));
    assert_eq!(store.coef_at(NodePos::new(1, 1)), Some(v[2] + v[3]));
    assert_eq!(store.coef_at(NodePos::root()), Some(v.iter().sum()));

    engine.reconstruct(&mut store, 0).expect("reconstruct succeeds");
    let restored: Vec<i64> = store.leaves().map(|(_, coef)| coef).collect();
    assert_eq!(restored, v);
    assert_eq!(store, original);
}

#[test]
fn compress_sums_every_internal_node() {
    let engine = engine(8);
    let mut store = engine.refine(31337).expect("refine succeeds");
    let shape = store.shape();
    engine.compress(&mut store).expect("compress succeeds");

    assert_eq!(store.shape(), shape, "compress must not change shape");
    for (pos, idx, slot) in store.nodes() {
        if !slot.is_internal() {
            continue;
        }
        let (left, right) = store.layout().children_of(idx, pos.depth);
        assert_eq!(
            slot.coef,
            store.slot(left).coef + store.slot(right).coef,
            "aggregate mismatch at {}",
            pos
        );
    }
}

#[test]
fn reconstruct_with_offset_distributes_excess() {
    let engine = engine(2);
    let mut store = uniform(2, 2, &[1, 2, 3, 4]);
    engine.compress(&mut store).expect("compress succeeds");
    engine.reconstruct(&mut store, 3).expect("reconstruct succeeds");

    // root total 13: (1,0) gets 3 + 1, (1,1) gets 7 + 2
    // (1,0): 4 -> 1, 3; (1,1): 9 -> 4, 5
    let leaves: Vec<i64> = store.leaves().map(|(_, coef)| coef).collect();
    assert_eq!(leaves, vec![1, 3, 4, 5]);
    assert_eq!(leaves.iter().sum::<i64>(), 10 + 3);
    assert_eq!(store.get(NodePos::new(1, 0)), Some(Slot::internal(0)));
}

#[test]
fn reconstruct_requires_compressed_form() {
    let engine = engine(3);
    let mut store = engine.refine(5).expect("refine succeeds");
    assert_eq!(
        engine.reconstruct(&mut store, 0),
        Err(TreeError::FormMismatch {
            expected: Form::Compressed,
            found: Form::Scaling,
        })
    );
}

#[test]
fn single_leaf_survives_round_trip() {
    let engine = engine(4);
    let mut store = uniform(4, 0, &[-9]);
    let original = store.clone();
    engine.compress(&mut store).expect("compress succeeds");
    assert_eq!(store.coef_at(NodePos::root()), Some(-9));
    engine.reconstruct(&mut store, 0).expect("reconstruct succeeds");
    assert_eq!(store, original);
}
