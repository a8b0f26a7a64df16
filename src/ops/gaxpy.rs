//! Gaxpy: alpha * A + beta * B over two differently refined trees
//!
//! Walks A, B and the output C in lockstep. Each input side is in one of two
//! states for the current position:
//!
//!   Present          the position exists in that tree; read its slot
//!   Carried(value)   that tree stopped at a leaf above; its scaled leaf
//!                    value covers every position below
//!
//! A leaf on one side never turns into zero for the other side's deeper
//! subtree: its value is handed down and added into every output leaf of
//! that subtree. C is internal wherever either side is still internal, its
//! internal coefficients are 0 like any scaling-form tree, and positions
//! absent from both inputs are never written.

use tracing::debug;

use crate::exec::ExecContext;
use crate::store::{Form, NodeStore, Slot};
use crate::tree::SpanMut;
use crate::TreeError;

/// Where one input's contribution to the current position comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    /// Read the slot at this index
    Present,

    /// Scaled value of a leaf above this position
    Carried(i64),
}

/// Per-side state threaded down one level at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Presence {
    a: Side,
    b: Side,
}

#[derive(Debug, Clone, Copy)]
struct Operands<'a> {
    a: &'a NodeStore,
    alpha: i64,
    b: &'a NodeStore,
    beta: i64,
}

/// What one side contributes at a position
#[derive(Debug, Clone, Copy)]
enum Contribution {
    /// Still internal here; keep reading below
    Continues,

    /// Leaf value, either found here or carried from above
    Value(i64),
}

/// A + B
pub fn gaxpy(a: &NodeStore, b: &NodeStore, ctx: &ExecContext) -> Result<NodeStore, TreeError> {
    gaxpy_scaled(1, a, 1, b, ctx)
}

/// alpha * A + beta * B
pub fn gaxpy_scaled(
    alpha: i64,
    a: &NodeStore,
    beta: i64,
    b: &NodeStore,
    ctx: &ExecContext,
) -> Result<NodeStore, TreeError> {
    let _span = tracing::debug_span!("gaxpy", max_depth = a.max_depth(), alpha, beta).entered();
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

    let operands = Operands { a, alpha, b, beta };
    let mut out = NodeStore::empty(a.layout());
    let root = Presence {
        a: Side::Present,
        b: Side::Present,
    };
    merge_span(operands, out.root_span_mut(), root, ctx)?;

    debug!(
        populated = out.populated_count(),
        leaves = out.leaf_count(),
        "gaxpy complete"
    );
    Ok(out)
}

fn merge_span(
    ops: Operands<'_>,
    mut span: SpanMut<'_>,
    presence: Presence,
    ctx: &ExecContext,
) -> Result<(), TreeError> {
    ctx.checkpoint()?;

    let idx = span.index();
    let from_a = contribution(ops.a, ops.alpha, idx, presence.a, &span)?;
    let from_b = contribution(ops.b, ops.beta, idx, presence.b, &span)?;

    let (a, b) = match (from_a, from_b) {
        (Contribution::Value(x), Contribution::Value(y)) => {
            let sum = x.checked_add(y).ok_or(TreeError::Overflow { index: idx })?;
            *span.slot_mut() = Slot::leaf(sum);
            return Ok(());
        }
        (a, b) => (a, b),
    };

    if !span.has_children() {
        return Err(TreeError::Malformed {
            index: idx,
            reason: format!("internal input node {} at max depth", span.pos()),
        });
    }

    let child = Presence {
        a: child_side(a),
        b: child_side(b),
    };
    let depth = span.pos().depth;
    let (node, left, right) = span.split();
    *node = Slot::internal(0);
    ctx.try_join(
        depth,
        move || merge_span(ops, left, child, ctx),
        move || merge_span(ops, right, child, ctx),
    )?;
    Ok(())
}

/// Resolve one side at the current position
fn contribution(
    store: &NodeStore,
    scale: i64,
    idx: usize,
    side: Side,
    span: &SpanMut<'_>,
) -> Result<Contribution, TreeError> {
    match side {
        Side::Carried(value) => Ok(Contribution::Value(value)),
        Side::Present => {
            let slot = store.slot(idx);
            if slot.is_internal() {
                Ok(Contribution::Continues)
            } else if slot.is_leaf() {
                let value = scale
                    .checked_mul(slot.coef)
                    .ok_or(TreeError::Overflow { index: idx })?;
                Ok(Contribution::Value(value))
            } else {
                Err(TreeError::Malformed {
                    index: idx,
                    reason: format!("position {} flagged present but unpopulated", span.pos()),
                })
            }
        }
    }
}

#[inline]
fn child_side(contribution: Contribution) -> Side {
    match contribution {
        Contribution::Continues => Side::Present,
        Contribution::Value(value) => Side::Carried(value),
    }
}
