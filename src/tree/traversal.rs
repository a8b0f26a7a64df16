//! Pointerless preorder traversal
//!
//! No parent/child links are stored: the stack holds (position, index)
//! pairs and children are recomputed from the layout arithmetic.

use super::NodePos;
use crate::store::{NodeStore, Slot};

/// Preorder walk over the populated nodes of a store
///
/// Yields `(position, flat index, slot)`. Descends only through internal
/// nodes, so orphaned slots below a leaf or an unset node are never visited.
#[derive(Debug)]
pub struct Preorder<'a> {
    store: &'a NodeStore,

    /// Pending subtrees, right child pushed first so left pops first
    stack: Vec<(NodePos, usize)>,
}

impl<'a> Preorder<'a> {
    /// Start at the root of `store`
    pub fn new(store: &'a NodeStore) -> Self {
        let mut stack = Vec::with_capacity(store.max_depth() as usize + 1);
        stack.push((NodePos::root(), 0));
        Self { store, stack }
    }

    /// Current stack depth (pending subtrees)
    pub fn pending(&self) -> usize {
        self.stack.len()
    }
}

impl<'a> Iterator for Preorder<'a> {
    type Item = (NodePos, usize, Slot);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (pos, idx) = self.stack.pop()?;
            let slot = self.store.slot(idx);
            if !slot.is_populated() {
                continue;
            }

            let layout = self.store.layout();
            if slot.is_internal() && layout.has_children(pos.depth) {
                let (left_pos, right_pos) = pos.children();
                let (left_idx, right_idx) = layout.children_of(idx, pos.depth);
                self.stack.push((right_pos, right_idx));
                self.stack.push((left_pos, left_idx));
            }
            return Some((pos, idx, slot));
        }
    }
}
