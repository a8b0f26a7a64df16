//! Diff: three-point differencing stencil over an adaptive tree
//!
//! The output copies the source shape. At every source leaf (n, l) the
//! stencil reads s0 = own coefficient, sm = GetCoef(n, l-1), sp = GetCoef(n, l+1).
//! A neighbour resolves when it is a leaf at the same depth or lies outside
//! the domain (contributing 0). It does not resolve when GetCoef falls back to
//! a coarser ancestor, or when it hits an internal node: the neighbour is
//! finer than this leaf and its scaling-form coefficient carries no value.
//!
//! When both neighbours resolve, the output leaf is sm + sp + s0. Otherwise the
//! output node holds the provisional value ceil(s0 / 2) and is refined one
//! level deeper, where
//!
//!   even child (2l):   re-derives its left neighbour, inherits the right
//!   odd child (2l+1):  inherits the left neighbour, re-derives the right
//!
//! until every neighbour resolves or the layout depth is exhausted.

use bitvec::prelude::*;
use tracing::debug;

use super::coef::{get_coef, Coef};
use crate::exec::ExecContext;
use crate::store::{Form, NodeKind, NodeStore, Slot};
use crate::tree::{NodePos, SpanMut};
use crate::TreeError;

/// Output of [`diff`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    /// Differenced tree
    pub store: NodeStore,

    /// Flat indices holding provisional or best-effort values
    pub estimated: BitVec,
}

impl DiffResult {
    /// Drop the estimate ledger
    pub fn into_store(self) -> NodeStore {
        self.store
    }

    /// Whether the value at `idx` is provisional
    pub fn is_estimated(&self, idx: usize) -> bool {
        self.estimated.get(idx).map(|bit| *bit).unwrap_or(false)
    }

    /// Number of provisional slots
    pub fn estimated_count(&self) -> usize {
        self.estimated.count_ones()
    }
}

/// Neighbour value as seen by the stencil
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Neighbour {
    /// Leaf at the same depth, or outside the domain (contributes 0)
    Resolved(i64),

    /// Sibling sharing the parent's provisional value
    Inherited(i64),

    /// Ancestor fallback; needs a finer level
    Estimated(i64),

    /// Neighbour refines further than this node; needs a finer level
    Finer(i64),
}

impl Neighbour {
    fn lookup(source: &NodeStore, pos: NodePos) -> Self {
        match get_coef(source, pos) {
            Coef::Exact(value) if source.get(pos).is_some_and(|slot| slot.is_internal()) => {
                Neighbour::Finer(value)
            }
            Coef::Exact(value) => Neighbour::Resolved(value),
            Coef::NotApplicable => Neighbour::Resolved(0),
            Coef::Approximate { value, .. } => Neighbour::Estimated(value),
        }
    }

    fn value(self) -> i64 {
        match self {
            Neighbour::Resolved(v)
            | Neighbour::Inherited(v)
            | Neighbour::Estimated(v)
            | Neighbour::Finer(v) => v,
        }
    }

    fn is_settled(self) -> bool {
        matches!(self, Neighbour::Resolved(_) | Neighbour::Inherited(_))
    }
}

/// Stencil inputs for one output node
#[derive(Debug, Clone, Copy)]
struct Stencil {
    centre: i64,
    left: Neighbour,
    right: Neighbour,
    /// False once any value on the way down was provisional
    exact: bool,
}

/// Apply the differencing stencil to a scaling-form store
pub fn diff(source: &NodeStore, ctx: &ExecContext) -> Result<DiffResult, TreeError> {
    let _span = tracing::debug_span!("diff", max_depth = source.max_depth()).entered();
    source.require_root()?;
    source.require_form(Form::Scaling)?;

    let mut store = NodeStore::empty(source.layout());
    let estimated_indices = copy_span(source, store.root_span_mut(), ctx)?;

    let mut estimated = bitvec![0; store.slots().len()];
    for idx in estimated_indices {
        estimated.set(idx, true);
    }

    debug!(
        populated = store.populated_count(),
        estimated = estimated.count_ones(),
        "diff complete"
    );
    Ok(DiffResult { store, estimated })
}

/// Shape-copy pass down to the source leaves
fn copy_span(
    source: &NodeStore,
    span: SpanMut<'_>,
    ctx: &ExecContext,
) -> Result<Vec<usize>, TreeError> {
    ctx.checkpoint()?;

    let slot = source.slot(span.index());
    match slot.kind {
        NodeKind::Internal if span.has_children() => {
            let depth = span.pos().depth;
            let (node, left, right) = span.split();
            *node = Slot::internal(0);
            let (mut left_est, right_est) = ctx.try_join(
                depth,
                move || copy_span(source, left, ctx),
                move || copy_span(source, right, ctx),
            )?;
            left_est.extend(right_est);
            Ok(left_est)
        }
        NodeKind::Leaf => {
            let pos = span.pos();
            let stencil = Stencil {
                centre: slot.coef,
                left: Neighbour::lookup(source, pos.neighbor(-1)),
                right: Neighbour::lookup(source, pos.neighbor(1)),
                exact: true,
            };
            apply(source, span, stencil, ctx)
        }
        _ => Err(TreeError::Malformed {
            index: span.index(),
            reason: format!("{:?} source node {} cannot be differenced", slot.kind, span.pos()),
        }),
    }
}

/// Evaluate the stencil at `span`, refining while a neighbour is unresolved
fn apply(
    source: &NodeStore,
    mut span: SpanMut<'_>,
    stencil: Stencil,
    ctx: &ExecContext,
) -> Result<Vec<usize>, TreeError> {
    ctx.checkpoint()?;

    let settled = stencil.left.is_settled() && stencil.right.is_settled();
    if settled || !span.has_children() {
        let value = stencil.left.value() + stencil.right.value() + stencil.centre;
        *span.slot_mut() = Slot::leaf(value);
        return Ok(if settled && stencil.exact {
            Vec::new()
        } else {
            vec![span.index()]
        });
    }

    let provisional = ceil_half(stencil.centre);
    let pos = span.pos();
    let (left_pos, right_pos) = pos.children();
    let index = span.index();

    let even = Stencil {
        centre: provisional,
        left: Neighbour::lookup(source, left_pos.neighbor(-1)),
        right: Neighbour::Inherited(provisional),
        exact: false,
    };
    let odd = Stencil {
        centre: provisional,
        left: Neighbour::Inherited(provisional),
        right: Neighbour::lookup(source, right_pos.neighbor(1)),
        exact: false,
    };

    let (node, left, right) = span.split();
    *node = Slot::internal(provisional);
    let (mut left_est, right_est) = ctx.try_join(
        pos.depth,
        move || apply(source, left, even, ctx),
        move || apply(source, right, odd, ctx),
    )?;
    left_est.push(index);
    left_est.extend(right_est);
    Ok(left_est)
}

#[inline]
fn ceil_half(value: i64) -> i64 {
    -((-value).div_euclid(2))
}
