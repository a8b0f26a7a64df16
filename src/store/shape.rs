//! Structural snapshot of a store
//!
//! Two bits per slot (populated, internal), independent of coefficients.
//! Passes that only rewrite coefficients must leave the shape untouched.

use bitvec::prelude::*;

use super::NodeStore;

/// Bit-packed record of which slots are populated and which are internal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    populated: BitVec,
    internal: BitVec,
}

impl Shape {
    /// Snapshot the shape of `store`
    pub fn of(store: &NodeStore) -> Self {
        let slots = store.slots();
        let mut populated = bitvec![0; slots.len()];
        let mut internal = bitvec![0; slots.len()];
        for (idx, slot) in slots.iter().enumerate() {
            populated.set(idx, slot.is_populated());
            internal.set(idx, slot.is_internal());
        }
        Self {
            populated,
            internal,
        }
    }

    /// Shape refined wherever either operand is refined
    ///
    /// A slot is internal if internal in either operand, and populated if
    /// populated in either. This is the shape Gaxpy produces.
    pub fn union(&self, other: &Shape) -> Shape {
        debug_assert_eq!(self.populated.len(), other.populated.len());
        let either = |a: &BitVec, b: &BitVec| -> BitVec {
            a.iter()
                .by_vals()
                .zip(b.iter().by_vals())
                .map(|(x, y)| x || y)
                .collect()
        };
        let populated = either(&self.populated, &other.populated);
        let internal = either(&self.internal, &other.internal);
        Shape {
            populated,
            internal,
        }
    }

    /// Number of slots covered
    pub fn len(&self) -> usize {
        self.populated.len()
    }

    /// Whether the snapshot covers no slots
    pub fn is_empty(&self) -> bool {
        self.populated.is_empty()
    }

    /// Whether `idx` is populated
    pub fn is_populated(&self, idx: usize) -> bool {
        self.populated.get(idx).map(|bit| *bit).unwrap_or(false)
    }

    /// Whether `idx` is internal
    pub fn is_internal(&self, idx: usize) -> bool {
        self.internal.get(idx).map(|bit| *bit).unwrap_or(false)
    }

    /// Whether `idx` is a leaf
    pub fn is_leaf(&self, idx: usize) -> bool {
        self.is_populated(idx) && !self.is_internal(idx)
    }

    /// Number of populated slots
    pub fn populated_count(&self) -> usize {
        self.populated.count_ones()
    }

    /// Number of internal slots
    pub fn internal_count(&self) -> usize {
        self.internal.count_ones()
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.populated_count() - self.internal_count()
    }

    /// Whether every slot refined here is also refined in `other`
    pub fn is_refined_by(&self, other: &Shape) -> bool {
        self.populated.len() == other.populated.len()
            && self
                .populated
                .iter_ones()
                .all(|idx| other.is_populated(idx))
            && self.internal.iter_ones().all(|idx| other.is_internal(idx))
    }
}
