//! Disjoint mutable views over a node's slot span
//!
//! A span for (n, l) at flat index idx covers [idx, idx + 2^(D-n+1) - 1).
//! Splitting yields the node's own slot plus the two child spans, which are
//! non-overlapping slices and can be handed to concurrent subtree tasks.

use super::{Layout, NodePos};
use crate::store::Slot;

/// Exclusive view of the slots owned by one subtree
#[derive(Debug)]
pub struct SpanMut<'a> {
    pos: NodePos,
    index: usize,
    layout: Layout,
    slots: &'a mut [Slot],
}

impl<'a> SpanMut<'a> {
    /// Whole-tree span rooted at (0, 0)
    pub(crate) fn root(layout: Layout, slots: &'a mut [Slot]) -> Self {
        debug_assert_eq!(slots.len(), layout.slot_count());
        Self {
            pos: NodePos::root(),
            index: 0,
            layout,
            slots,
        }
    }

    /// Position of the span's root node
    #[inline]
    pub fn pos(&self) -> NodePos {
        self.pos
    }

    /// Flat index of the span's root node
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Layout the span belongs to
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Number of slots in the span
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false; every span owns at least its root slot
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether the root node owns child slots
    #[inline]
    pub fn has_children(&self) -> bool {
        self.layout.has_children(self.pos.depth)
    }

    /// Root slot
    #[inline]
    pub fn slot(&self) -> &Slot {
        &self.slots[0]
    }

    /// Mutable root slot
    #[inline]
    pub fn slot_mut(&mut self) -> &mut Slot {
        &mut self.slots[0]
    }

    /// Root slots of the two child spans, without splitting
    pub fn child_slots(&self) -> (&Slot, &Slot) {
        debug_assert!(self.has_children(), "span at max depth has no children");
        let half = (self.slots.len() - 1) / 2;
        (&self.slots[1], &self.slots[1 + half])
    }

    /// Split into (root slot, left child span, right child span)
    ///
    /// Must only be called when `has_children()`.
    pub fn split(self) -> (&'a mut Slot, SpanMut<'a>, SpanMut<'a>) {
        debug_assert!(self.has_children(), "span at max depth has no children");
        let SpanMut {
            pos,
            index,
            layout,
            slots,
        } = self;

        let (head, rest) = slots.split_at_mut(1);
        let half = rest.len() / 2;
        let (left_slots, right_slots) = rest.split_at_mut(half);
        let (left_pos, right_pos) = pos.children();
        let (left_index, right_index) = layout.children_of(index, pos.depth);
        debug_assert_eq!(left_index + half, right_index);

        let left = SpanMut {
            pos: left_pos,
            index: left_index,
            layout,
            slots: left_slots,
        };
        let right = SpanMut {
            pos: right_pos,
            index: right_index,
            layout,
            slots: right_slots,
        };

        (&mut head[0], left, right)
    }
}
