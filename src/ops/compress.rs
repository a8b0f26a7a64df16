//! Compress / Reconstruct
//!
//! Compress folds bottom-up: internal = left + right, leaves unchanged.
//! Reconstruct unfolds top-down: each node receives a total from its parent
//! (root: own aggregate + seed) and hands its children their compressed
//! aggregates plus half of any unexplained excess, floor half left.

use tracing::debug;

use crate::exec::ExecContext;
use crate::store::{Form, NodeKind, NodeStore};
use crate::tree::SpanMut;
use crate::TreeError;

/// Replace every internal coefficient with the sum of its subtree's leaves
///
/// Idempotent: leaves are never touched, so compressing twice is a no-op.
pub fn compress(store: &mut NodeStore, ctx: &ExecContext) -> Result<(), TreeError> {
    let _span = tracing::debug_span!("compress", max_depth = store.max_depth()).entered();
    store.require_root()?;

    let total = compress_span(store.root_span_mut(), ctx)?;
    store.set_form(Form::Compressed);

    debug!(total, "compress complete");
    Ok(())
}

/// Returns the new coefficient of the span's root
fn compress_span(span: SpanMut<'_>, ctx: &ExecContext) -> Result<i64, TreeError> {
    ctx.checkpoint()?;

    let kind = span.slot().kind;
    match kind {
        NodeKind::Leaf => Ok(span.slot().coef),
        NodeKind::Internal if span.has_children() => {
            let (depth, index) = (span.pos().depth, span.index());
            let (node, left, right) = span.split();
            // Join point: the parent needs both subtree sums
            let (left_sum, right_sum) = ctx.try_join(
                depth,
                move || compress_span(left, ctx),
                move || compress_span(right, ctx),
            )?;
            node.coef = left_sum
                .checked_add(right_sum)
                .ok_or(TreeError::Overflow { index })?;
            Ok(node.coef)
        }
        _ => Err(malformed(&span)),
    }
}

/// Restore pointwise leaf values from a compressed store
///
/// `seed` is the DC component contributed by an enclosing context; 0 for a
/// whole tree. Internal coefficients are zeroed, leaving scaling form.
pub fn reconstruct(store: &mut NodeStore, seed: i64, ctx: &ExecContext) -> Result<(), TreeError> {
    let _span =
        tracing::debug_span!("reconstruct", max_depth = store.max_depth(), seed).entered();
    store.require_root()?;
    store.require_form(Form::Compressed)?;

    let total = store.slot(0).coef + seed;
    reconstruct_span(store.root_span_mut(), total, ctx)?;
    store.set_form(Form::Scaling);

    debug!(total, "reconstruct complete");
    Ok(())
}

fn reconstruct_span(mut span: SpanMut<'_>, total: i64, ctx: &ExecContext) -> Result<(), TreeError> {
    ctx.checkpoint()?;

    let kind = span.slot().kind;
    match kind {
        NodeKind::Leaf => {
            span.slot_mut().coef = total;
            Ok(())
        }
        NodeKind::Internal if span.has_children() => {
            let depth = span.pos().depth;
            let (left_sum, right_sum) = {
                let (left, right) = span.child_slots();
                (left.coef, right.coef)
            };
            let (left_total, right_total) = split_total(total, left_sum, right_sum);

            let (node, left, right) = span.split();
            node.coef = 0;
            ctx.try_join(
                depth,
                move || reconstruct_span(left, left_total, ctx),
                move || reconstruct_span(right, right_total, ctx),
            )?;
            Ok(())
        }
        _ => Err(malformed(&span)),
    }
}

/// Share `total` between two children with aggregates `left` and `right`
#[inline]
fn split_total(total: i64, left: i64, right: i64) -> (i64, i64) {
    let excess = total - (left + right);
    let low = excess.div_euclid(2);
    (left + low, right + (excess - low))
}

fn malformed(span: &SpanMut<'_>) -> TreeError {
    TreeError::Malformed {
        index: span.index(),
        reason: format!(
            "{:?} node {} cannot be folded",
            span.slot().kind,
            span.pos()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodePos;

    fn full_depth_two(values: [i64; 4]) -> NodeStore {
        let leaves: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(l, &v)| (NodePos::new(2, l as i64), v))
            .collect();
        NodeStore::from_leaves(2, &leaves).unwrap()
    }

    #[test]
    fn test_compress_sums_children() {
        let mut store = full_depth_two([1, 2, 3, 1]);
        compress(&mut store, &ExecContext::sequential()).unwrap();
        assert_eq!(store.coef_at(NodePos::new(1, 0)), Some(3));
        assert_eq!(store.coef_at(NodePos::new(1, 1)), Some(4));
        assert_eq!(store.coef_at(NodePos::root()), Some(7));
        assert_eq!(store.form(), Form::Compressed);
    }

    #[test]
    fn test_compress_reports_overflow() {
        let mut store = full_depth_two([0, 0, i64::MAX, 1]);
        let result = compress(&mut store, &ExecContext::sequential());
        // (1,1) sits at flat index 4
        assert_eq!(result, Err(TreeError::Overflow { index: 4 }));
    }

    #[test]
    fn test_reconstruct_restores_leaves() {
        let original = full_depth_two([3, 1, 2, 2]);
        let mut store = original.clone();
        let ctx = ExecContext::new();
        compress(&mut store, &ctx).unwrap();
        reconstruct(&mut store, 0, &ctx).unwrap();
        assert_eq!(store, original);
    }

    #[test]
    fn test_reconstruct_requires_compressed_form() {
        let mut store = full_depth_two([1, 1, 1, 1]);
        let result = reconstruct(&mut store, 0, &ExecContext::new());
        assert_eq!(
            result,
            Err(TreeError::FormMismatch {
                expected: Form::Compressed,
                found: Form::Scaling,
            })
        );
    }

    #[test]
    fn test_seed_spreads_floor_left() {
        let mut store = full_depth_two([1, 1, 1, 1]);
        let ctx = ExecContext::sequential();
        compress(&mut store, &ctx).unwrap();
        reconstruct(&mut store, 3, &ctx).unwrap();
        // root total 7: excess 3 -> 1 left, 2 right; then 0/1 and 1/1
        assert_eq!(store.point_values(2).unwrap(), vec![1, 2, 2, 2]);
    }

    #[test]
    fn test_split_total_negative_excess() {
        assert_eq!(split_total(-1, 0, 0), (-1, 0));
        assert_eq!(split_total(5, 2, 2), (2, 3));
        assert_eq!(split_total(4, 2, 2), (2, 2));
    }

    #[test]
    fn test_compress_rejects_empty_store() {
        let mut store = NodeStore::empty(crate::tree::Layout::new(2).unwrap());
        assert_eq!(
            compress(&mut store, &ExecContext::new()),
            Err(TreeError::Unrefined)
        );
    }
}
