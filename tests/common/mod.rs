#![allow(dead_code)]

use mratree::{Engine, ExecContext, NodePos, NodeStore, TreeConfig};

pub fn engine(max_depth: u32) -> Engine {
    Engine::new(TreeConfig::new(max_depth).expect("valid depth"))
}

pub fn sequential_engine(max_depth: u32) -> Engine {
    Engine::with_context(
        TreeConfig::new(max_depth).expect("valid depth"),
        ExecContext::sequential(),
    )
}

pub fn full_engine(max_depth: u32) -> Engine {
    Engine::new(
        TreeConfig::new(max_depth)
            .expect("valid depth")
            .full_refinement(),
    )
}

/// Tree whose leaves all sit at `depth`, holding `values` left to right
pub fn uniform(max_depth: u32, depth: u32, values: &[i64]) -> NodeStore {
    let leaves: Vec<_> = values
        .iter()
        .enumerate()
        .map(|(label, &value)| (NodePos::new(depth, label as i64), value))
        .collect();
    NodeStore::from_leaves(max_depth, &leaves).expect("uniform leaves tile the domain")
}

/// D = 2 tree refined on the left only: (2,0)=1, (2,1)=2, (1,1)=3
pub fn left_heavy() -> NodeStore {
    NodeStore::from_leaves(
        2,
        &[
            (NodePos::new(2, 0), 1),
            (NodePos::new(2, 1), 2),
            (NodePos::new(1, 1), 3),
        ],
    )
    .expect("leaves tile the domain")
}

/// D = 2 tree refined on the right only: (1,0)=5, (2,2)=1, (2,3)=2
pub fn right_heavy() -> NodeStore {
    NodeStore::from_leaves(
        2,
        &[
            (NodePos::new(1, 0), 5),
            (NodePos::new(2, 2), 1),
            (NodePos::new(2, 3), 2),
        ],
    )
    .expect("leaves tile the domain")
}
