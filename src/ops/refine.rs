//! Refine: top-down construction of a scaling-form tree
//!
//! At each node draw v in 1..=draw_range. Stop with a leaf holding
//! `v % 3 + 1` if v <= leaf_threshold or the refinement depth is reached;
//! otherwise mark the node internal and recurse into both children.
//!
//! The random stream is split deterministically before forking: the left
//! child continues the parent stream, the right child gets a fresh stream
//! seeded from one draw of the parent. Results do not depend on scheduling.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::exec::ExecContext;
use crate::store::{NodeStore, Slot};
use crate::tree::SpanMut;
use crate::{TreeConfig, TreeError};

/// Leaf/internal decision rule taken from a [`TreeConfig`]
#[derive(Debug, Clone, Copy)]
struct RefineRule {
    refine_depth: u32,
    leaf_threshold: u32,
    draw_range: u32,
}

impl RefineRule {
    fn is_leaf(&self, draw: u32, depth: u32) -> bool {
        draw <= self.leaf_threshold || depth >= self.refine_depth
    }

    #[inline]
    fn leaf_value(draw: u32) -> i64 {
        i64::from(draw % 3 + 1)
    }
}

/// Build a tree from `seed`
pub fn refine(config: &TreeConfig, seed: u64, ctx: &ExecContext) -> Result<NodeStore, TreeError> {
    let _span = tracing::debug_span!(
        "refine",
        max_depth = config.max_depth,
        refine_depth = config.refine_depth,
        seed
    )
    .entered();

    let rule = RefineRule {
        refine_depth: config.refine_depth,
        leaf_threshold: config.leaf_threshold,
        draw_range: config.draw_range,
    };
    let mut store = NodeStore::empty(config.layout()?);
    let rng = ChaCha8Rng::seed_from_u64(seed);
    refine_span(store.root_span_mut(), rng, &rule, ctx)?;

    debug!(
        populated = store.populated_count(),
        leaves = store.leaf_count(),
        "refine complete"
    );
    Ok(store)
}

fn refine_span(
    mut span: SpanMut<'_>,
    mut rng: ChaCha8Rng,
    rule: &RefineRule,
    ctx: &ExecContext,
) -> Result<(), TreeError> {
    ctx.checkpoint()?;

    let depth = span.pos().depth;
    let draw = rng.gen_range(1..=rule.draw_range);
    if rule.is_leaf(draw, depth) || !span.has_children() {
        *span.slot_mut() = Slot::leaf(RefineRule::leaf_value(draw));
        return Ok(());
    }

    // Make sure the two subtrees use different streams
    let right_seed: u64 = rng.gen();
    let right_rng = ChaCha8Rng::seed_from_u64(right_seed);
    let left_rng = rng;

    let (node, left, right) = span.split();
    *node = Slot::internal(0);
    ctx.try_join(
        depth,
        move || refine_span(left, left_rng, rule, ctx),
        move || refine_span(right, right_rng, rule, ctx),
    )?;
    Ok(())
}
