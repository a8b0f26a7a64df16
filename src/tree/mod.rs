//! Addressing for adaptively refined binary trees
//!
//! Implicit representation: no parent/child pointers are stored.
//! Positions are (depth, label) pairs and every node's storage slot is
//! computed from a flat-index formula for a configured maximum depth.

mod node;
mod span;
mod traversal;

pub use node::{
    left_child_index, right_child_index, Direction, Layout, NodePos, MAX_SUPPORTED_DEPTH,
};
pub use span::SpanMut;
pub use traversal::Preorder;
