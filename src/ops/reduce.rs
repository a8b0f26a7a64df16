//! Inner product and norm
//!
//! Same lockstep walk as Gaxpy. Recursion continues only while both trees
//! are internal; the first position where either side is a leaf contributes
//! a * b and ends that branch. Internal coefficients carry no value in
//! scaling form and are never accumulated.

use tracing::debug;

use crate::exec::ExecContext;
use crate::store::{Form, NodeStore};
use crate::TreeError;

/// Sum of `a * b` over the positions where the lockstep walk stops
pub fn inner_product(a: &NodeStore, b: &NodeStore, ctx: &ExecContext) -> Result<i64, TreeError> {
    let _span = tracing::debug_span!("inner_product", max_depth = a.max_depth()).entered();
    if a.layout() != b.layout() {
        return Err(TreeError::LayoutMismatch {
            left: a.max_depth(),
            right: b.max_depth(),
        });
    }
    for store in [a, b] {
        store.require_root()?;
        store.require_form(Form::Scaling)?;
    }

    let result = product_at(a, b, 0, 0, ctx)?;
    debug!(result, "inner product complete");
    Ok(result)
}

fn product_at(
    a: &NodeStore,
    b: &NodeStore,
    idx: usize,
    depth: u32,
    ctx: &ExecContext,
) -> Result<i64, TreeError> {
    ctx.checkpoint()?;

    let (slot_a, slot_b) = (a.slot(idx), b.slot(idx));
    if !(slot_a.is_populated() && slot_b.is_populated()) {
        return Ok(0);
    }
    if !(slot_a.is_internal() && slot_b.is_internal()) || !a.layout().has_children(depth) {
        return slot_a
            .coef
            .checked_mul(slot_b.coef)
            .ok_or(TreeError::Overflow { index: idx });
    }

    let (left, right) = a.layout().children_of(idx, depth);
    let (left_sum, right_sum) = ctx.try_join(
        depth,
        || product_at(a, b, left, depth + 1, ctx),
        || product_at(a, b, right, depth + 1, ctx),
    )?;
    left_sum
        .checked_add(right_sum)
        .ok_or(TreeError::Overflow { index: idx })
}

/// Squared norm: sum of squared leaf values
pub fn norm(store: &NodeStore, ctx: &ExecContext) -> Result<i64, TreeError> {
    let _span = tracing::debug_span!("norm", max_depth = store.max_depth()).entered();
    store.require_root()?;
    store.require_form(Form::Scaling)?;

    let result = square_sum_at(store, 0, 0, ctx)?;
    debug!(result, "norm complete");
    Ok(result)
}

fn square_sum_at(
    store: &NodeStore,
    idx: usize,
    depth: u32,
    ctx: &ExecContext,
) -> Result<i64, TreeError> {
    ctx.checkpoint()?;

    let slot = store.slot(idx);
    if !slot.is_populated() {
        return Ok(0);
    }
    if !slot.is_internal() || !store.layout().has_children(depth) {
        return slot
            .coef
            .checked_mul(slot.coef)
            .ok_or(TreeError::Overflow { index: idx });
    }

    let (left, right) = store.layout().children_of(idx, depth);
    let (left_sum, right_sum) = ctx.try_join(
        depth,
        || square_sum_at(store, left, depth + 1, ctx),
        || square_sum_at(store, right, depth + 1, ctx),
    )?;
    left_sum
        .checked_add(right_sum)
        .ok_or(TreeError::Overflow { index: idx })
}
