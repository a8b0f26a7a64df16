//! Node store: one tree instance's coefficients and node kinds
//!
//! Dense arena of 2^(D+1)-1 slots addressed by the flat index scheme in
//! [`crate::tree`]. Only slots visited by a building pass are populated;
//! everything else stays `Unset` ("does not exist at this resolution").

mod shape;

pub use shape::Shape;

use std::fmt;

use crate::tree::{Layout, NodePos, Preorder, SpanMut};
use crate::TreeError;

/// Status of one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKind {
    /// Not visited by any building pass
    #[default]
    Unset,

    /// Refinement stopped here
    Leaf,

    /// Both children are populated
    Internal,
}

/// Coefficient plus status stored per flat index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize, serde::Deserialize))]
pub struct Slot {
    /// Scalar coefficient
    pub coef: i64,

    /// Leaf / internal / unset
    pub kind: NodeKind,
}

impl Slot {
    /// Leaf slot holding `coef`
    pub fn leaf(coef: i64) -> Self {
        Self {
            coef,
            kind: NodeKind::Leaf,
        }
    }

    /// Internal slot holding `coef`
    pub fn internal(coef: i64) -> Self {
        Self {
            coef,
            kind: NodeKind::Internal,
        }
    }

    /// Whether the slot was populated
    #[inline]
    pub fn is_populated(&self) -> bool {
        self.kind != NodeKind::Unset
    }

    /// Whether the slot is a leaf
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }

    /// Whether the slot is internal
    #[inline]
    pub fn is_internal(&self) -> bool {
        self.kind == NodeKind::Internal
    }
}

/// Which coefficients are meaningful
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize, serde::Deserialize))]
pub enum Form {
    /// Leaves hold pointwise values (after Refine or Reconstruct)
    Scaling,

    /// Internal nodes hold the sum of their subtree (after Compress)
    Compressed,
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Form::Scaling => write!(f, "scaling"),
            Form::Compressed => write!(f, "compressed"),
        }
    }
}

/// Sparse tree instance over a fixed layout
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeStore {
    layout: Layout,
    slots: Vec<Slot>,
    form: Form,
}

impl NodeStore {
    /// Create store with every slot unset
    pub fn empty(layout: Layout) -> Self {
        Self {
            layout,
            slots: vec![Slot::default(); layout.slot_count()],
            form: Form::Scaling,
        }
    }

    /// Build a scaling-form store from explicit leaves
    ///
    /// Every ancestor of a leaf becomes internal. The leaves must tile the
    /// tree: each internal node ends up with both children populated.
    pub fn from_leaves(max_depth: u32, leaves: &[(NodePos, i64)]) -> Result<Self, TreeError> {
        let layout = Layout::new(max_depth)?;
        let mut store = Self::empty(layout);

        for &(pos, coef) in leaves {
            let idx = layout
                .index_of(pos)
                .ok_or(TreeError::PositionOutOfRange(pos))?;
            if store.slots[idx].is_populated() {
                return Err(TreeError::Malformed {
                    index: idx,
                    reason: format!("leaf {} overlaps an existing node", pos),
                });
            }
            store.slots[idx] = Slot::leaf(coef);

            let mut ancestor = pos.parent();
            while let Some(up) = ancestor {
                // index_of cannot fail for an ancestor of a contained position
                let up_idx = layout
                    .index_of(up)
                    .ok_or(TreeError::PositionOutOfRange(up))?;
                match store.slots[up_idx].kind {
                    NodeKind::Leaf => {
                        return Err(TreeError::Malformed {
                            index: up_idx,
                            reason: format!("leaf {} lies below leaf {}", pos, up),
                        })
                    }
                    NodeKind::Internal => break,
                    NodeKind::Unset => store.slots[up_idx] = Slot::internal(0),
                }
                ancestor = up.parent();
            }
        }

        store.validate()?;
        Ok(store)
    }

    /// Layout the store was created with
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Configured maximum depth D
    #[inline]
    pub fn max_depth(&self) -> u32 {
        self.layout.max_depth()
    }

    /// Current coefficient form
    #[inline]
    pub fn form(&self) -> Form {
        self.form
    }

    pub(crate) fn set_form(&mut self, form: Form) {
        self.form = form;
    }

    /// Slot at a flat index (unset outside the layout)
    #[inline]
    pub fn slot(&self, idx: usize) -> Slot {
        self.slots.get(idx).copied().unwrap_or_default()
    }

    /// Slot at a position, `None` if the position is not addressable
    pub fn get(&self, pos: NodePos) -> Option<Slot> {
        self.layout.index_of(pos).map(|idx| self.slots[idx])
    }

    /// Coefficient at a populated position
    pub fn coef_at(&self, pos: NodePos) -> Option<i64> {
        self.get(pos)
            .filter(Slot::is_populated)
            .map(|slot| slot.coef)
    }

    /// All slots in flat-index order
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Whether the root was never populated
    pub fn is_empty(&self) -> bool {
        !self.slots[0].is_populated()
    }

    /// Number of populated slots
    pub fn populated_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_populated()).count()
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_leaf()).count()
    }

    /// Deepest populated level, `None` for an empty store
    pub fn depth(&self) -> Option<u32> {
        self.nodes().map(|(pos, _, _)| pos.depth).max()
    }

    /// Preorder walk over populated nodes: (position, flat index, slot)
    pub fn nodes(&self) -> Preorder<'_> {
        Preorder::new(self)
    }

    /// Leaves in left-to-right order
    pub fn leaves(&self) -> impl Iterator<Item = (NodePos, i64)> + '_ {
        self.nodes()
            .filter(|(_, _, slot)| slot.is_leaf())
            .map(|(pos, _, slot)| (pos, slot.coef))
    }

    /// Structural snapshot
    pub fn shape(&self) -> Shape {
        Shape::of(self)
    }

    /// Content hash over layout, form, kinds and coefficients
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.max_depth().to_le_bytes());
        hasher.update(&[self.form as u8]);
        for slot in &self.slots {
            hasher.update(&[slot.kind as u8]);
            hasher.update(&slot.coef.to_le_bytes());
        }
        hasher.finalize()
    }

    /// Function values at every label of `depth`
    ///
    /// In scaling form only leaves carry values: each point reads the leaf
    /// covering it. Labels whose node at `depth` is still internal report
    /// that node's own coefficient.
    pub fn point_values(&self, depth: u32) -> Result<Vec<i64>, TreeError> {
        self.require_form(Form::Scaling)?;
        if depth > self.max_depth() {
            return Err(TreeError::PositionOutOfRange(NodePos::new(depth, 0)));
        }
        self.require_root()?;

        let width = 1usize << depth;
        let values = (0..width)
            .map(|label| self.covering_value(NodePos::new(depth, label as i64)))
            .collect();
        Ok(values)
    }

    fn covering_value(&self, target: NodePos) -> i64 {
        let mut idx = 0;
        for depth in 0..=target.depth {
            let slot = self.slots[idx];
            if !slot.is_populated() {
                return 0;
            }
            if slot.is_leaf() || depth == target.depth {
                return slot.coef;
            }
            let next = target.ancestor_at(depth + 1);
            idx = match next.direction() {
                Some(direction) => self.layout.child_index(idx, depth, direction),
                None => return slot.coef,
            };
        }
        0
    }

    /// Check structural invariants
    ///
    /// - internal nodes have both children populated
    /// - leaves have no populated children
    /// - nothing is populated below an unset or leaf node
    pub fn validate(&self) -> Result<(), TreeError> {
        let reachable: usize = self.nodes().count();
        for (pos, idx, slot) in self.nodes() {
            if !self.layout.has_children(pos.depth) {
                if slot.is_internal() {
                    return Err(TreeError::Malformed {
                        index: idx,
                        reason: format!("internal node {} at max depth", pos),
                    });
                }
                continue;
            }
            let (left, right) = self.layout.children_of(idx, pos.depth);
            let children = (self.slots[left], self.slots[right]);
            match slot.kind {
                NodeKind::Internal if !(children.0.is_populated() && children.1.is_populated()) => {
                    return Err(TreeError::Malformed {
                        index: idx,
                        reason: format!("internal node {} is missing a child", pos),
                    });
                }
                NodeKind::Leaf if children.0.is_populated() || children.1.is_populated() => {
                    return Err(TreeError::Malformed {
                        index: idx,
                        reason: format!("leaf {} has populated children", pos),
                    });
                }
                _ => {}
            }
        }

        if reachable != self.populated_count() {
            return Err(TreeError::Malformed {
                index: 0,
                reason: format!(
                    "{} populated slots are not reachable from the root",
                    self.populated_count() - reachable
                ),
            });
        }
        Ok(())
    }

    /// Reject stores whose root was never populated
    pub(crate) fn require_root(&self) -> Result<(), TreeError> {
        if self.is_empty() {
            return Err(TreeError::Unrefined);
        }
        Ok(())
    }

    /// Reject stores not in `form`
    pub(crate) fn require_form(&self, form: Form) -> Result<(), TreeError> {
        if self.form != form {
            return Err(TreeError::FormMismatch {
                expected: form,
                found: self.form,
            });
        }
        Ok(())
    }

    /// Exclusive span over the whole tree
    pub(crate) fn root_span_mut(&mut self) -> SpanMut<'_> {
        SpanMut::root(self.layout, &mut self.slots)
    }
}
