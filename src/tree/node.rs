//! Node positions and flat-index arithmetic
//!
//! Node = (depth n, label l), 0 <= l < 2^n
//!   Left child:  (n+1, 2l)
//!   Right child: (n+1, 2l+1)
//!
//! A node at depth n owns a contiguous span of 2^(D-n+1)-1 slots:
//!   itself at idx, left span from idx+1, right span from idx+2^(D-n)

use std::fmt;

use crate::TreeError;

/// Largest layout depth a store may be created with (2^27 - 1 slots).
pub const MAX_SUPPORTED_DEPTH: u32 = 26;

/// Which child of its parent a node is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Even label
    Left,

    /// Odd label
    Right,
}

/// Tree position (implicit - just depth and label)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize, serde::Deserialize))]
pub struct NodePos {
    /// Depth below the root (root = 0)
    pub depth: u32,

    /// Label within the depth. Signed so that neighbour arithmetic can
    /// step outside `[0, 2^depth)`; such positions are never stored.
    pub label: i64,
}

impl NodePos {
    /// Create a position
    pub fn new(depth: u32, label: i64) -> Self {
        Self { depth, label }
    }

    /// Root position (0, 0)
    pub fn root() -> Self {
        Self { depth: 0, label: 0 }
    }

    /// Number of labels at this depth (2^depth)
    #[inline]
    pub fn width(&self) -> i64 {
        1i64 << self.depth
    }

    /// Whether the label lies in `[0, 2^depth)`
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.depth < 63 && self.label >= 0 && self.label < self.width()
    }

    /// Get children
    ///
    /// Returns: ((n+1, 2l), (n+1, 2l+1))
    pub fn children(&self) -> (NodePos, NodePos) {
        let left = NodePos::new(self.depth + 1, self.label * 2);
        let right = NodePos::new(self.depth + 1, self.label * 2 + 1);
        (left, right)
    }

    /// Parent position, `None` for the root
    pub fn parent(&self) -> Option<NodePos> {
        if self.depth == 0 {
            return None;
        }
        Some(NodePos::new(self.depth - 1, self.label >> 1))
    }

    /// Same-depth position `offset` labels away (may be invalid)
    pub fn neighbor(&self, offset: i64) -> NodePos {
        NodePos::new(self.depth, self.label + offset)
    }

    /// Side of the parent this node hangs from, `None` for the root
    pub fn direction(&self) -> Option<Direction> {
        if self.depth == 0 {
            return None;
        }
        if self.label & 1 == 0 {
            Some(Direction::Left)
        } else {
            Some(Direction::Right)
        }
    }

    /// Ancestor at a shallower (or equal) depth
    pub fn ancestor_at(&self, depth: u32) -> NodePos {
        debug_assert!(depth <= self.depth, "ancestor must not be deeper");
        NodePos::new(depth, self.label >> (self.depth - depth))
    }
}

impl fmt::Display for NodePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.depth, self.label)
    }
}

/// Index of the left child's span
#[inline]
pub fn left_child_index(idx: usize) -> usize {
    idx + 1
}

/// Index of the right child's span for a node at `depth` in a tree of `max_depth`
#[inline]
pub fn right_child_index(idx: usize, depth: u32, max_depth: u32) -> usize {
    debug_assert!(depth < max_depth, "nodes at max depth have no children");
    idx + (1usize << (max_depth - depth))
}

/// Index arithmetic for one configured maximum depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize, serde::Deserialize))]
pub struct Layout {
    max_depth: u32,
}

impl Layout {
    /// Create layout reserving `2^(max_depth+1) - 1` slots
    pub fn new(max_depth: u32) -> Result<Self, TreeError> {
        if max_depth > MAX_SUPPORTED_DEPTH {
            return Err(TreeError::DepthTooLarge {
                requested: max_depth,
                limit: MAX_SUPPORTED_DEPTH,
            });
        }
        Ok(Self { max_depth })
    }

    /// Configured maximum depth D
    #[inline]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Total slots: 2^(D+1) - 1
    #[inline]
    pub fn slot_count(&self) -> usize {
        (1usize << (self.max_depth + 1)) - 1
    }

    /// Slots owned by a node at `depth`: 2^(D-depth+1) - 1
    #[inline]
    pub fn span_len(&self, depth: u32) -> usize {
        debug_assert!(depth <= self.max_depth);
        (1usize << (self.max_depth - depth + 1)) - 1
    }

    /// Whether a node at `depth` owns child slots
    #[inline]
    pub fn has_children(&self, depth: u32) -> bool {
        depth < self.max_depth
    }

    /// Whether `pos` is addressable in this layout
    pub fn contains(&self, pos: NodePos) -> bool {
        pos.depth <= self.max_depth && pos.is_valid()
    }

    /// Index of the child on `direction` of the node at (`idx`, `depth`)
    #[inline]
    pub fn child_index(&self, idx: usize, depth: u32, direction: Direction) -> usize {
        match direction {
            Direction::Left => left_child_index(idx),
            Direction::Right => right_child_index(idx, depth, self.max_depth),
        }
    }

    /// Both child indices of the node at (`idx`, `depth`)
    #[inline]
    pub fn children_of(&self, idx: usize, depth: u32) -> (usize, usize) {
        (
            left_child_index(idx),
            right_child_index(idx, depth, self.max_depth),
        )
    }

    /// Flat index of `pos`, walking the label bits from the root
    pub fn index_of(&self, pos: NodePos) -> Option<usize> {
        if !self.contains(pos) {
            return None;
        }

        let mut idx = 0;
        for depth in 0..pos.depth {
            let bit = (pos.label >> (pos.depth - depth - 1)) & 1;
            let direction = if bit == 0 {
                Direction::Left
            } else {
                Direction::Right
            };
            idx = self.child_index(idx, depth, direction);
        }
        Some(idx)
    }
}
