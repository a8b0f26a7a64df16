//! # Adaptive multiresolution trees
//!
//! This library represents a one-dimensional function as an adaptively
//! refined binary tree and implements the operators used by wavelet-style
//! numerical solvers over such trees.
//!
//! ## Core Algorithm
//!
//! 1. **Pointerless addressing**: node (n, l) lives at a flat index; children
//!    are found by arithmetic (`idx + 1`, `idx + 2^(D-n)`)
//! 2. **Refine**: top-down random build with deterministic stream splitting
//! 3. **Compress / Reconstruct**: bottom-up sum fold and its exact inverse
//! 4. **GetCoef / Diff**: neighbour lookups with ancestor fallback, feeding a
//!    differencing stencil that refines where neighbours are too coarse
//! 5. **Gaxpy / InnerProduct / Norm**: lockstep walks over two trees whose
//!    refinement patterns differ node by node
//!
//! Every pass is a fork-join recursion over disjoint index spans.
//!
//! ## Usage Example
//!
//! ```
//! use mratree::{Engine, TreeConfig};
//!
//! let engine = Engine::new(TreeConfig::new(6)?);
//! let a = engine.refine(12345)?;
//! let b = engine.refine(54321)?;
//!
//! let mut compressed = a.clone();
//! engine.compress(&mut compressed)?;
//! engine.reconstruct(&mut compressed, 0)?;
//! assert_eq!(compressed, a);
//!
//! let sum = engine.gaxpy(&a, &b)?;
//! assert_eq!(sum.shape(), a.shape().union(&b.shape()));
//! # Ok::<(), mratree::TreeError>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod exec; // Fork-join substrate and cancellation
pub mod ops; // Refine, Compress, GetCoef, Diff, Gaxpy, reductions
pub mod store; // Node store, shape snapshots
pub mod tree; // Positions and flat-index arithmetic

// Re-exports for convenience
pub use exec::{CancelToken, ExecContext};
pub use ops::{Coef, DiffResult};
pub use store::{Form, NodeKind, NodeStore, Shape, Slot};
pub use tree::{Layout, NodePos};

use thiserror::Error;

/// Errors that can occur while building or combining trees
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Layout depth beyond what a store can allocate
    #[error("max depth {requested} exceeds supported limit {limit}")]
    DepthTooLarge {
        /// Depth asked for
        requested: u32,
        /// Largest supported depth
        limit: u32,
    },

    /// Inconsistent configuration parameters
    #[error("invalid tree configuration: {0}")]
    InvalidConfiguration(String),

    /// Two trees (or a tree and the engine) disagree on max depth
    #[error("layout mismatch: max depth {left} vs {right}")]
    LayoutMismatch {
        /// Max depth of the first operand
        left: u32,
        /// Max depth of the second operand
        right: u32,
    },

    /// Store is in the wrong coefficient form for the operation
    #[error("operation requires {expected} form, found {found}")]
    FormMismatch {
        /// Form the operation needs
        expected: Form,
        /// Form the store is in
        found: Form,
    },

    /// Root slot was never populated
    #[error("tree has not been refined")]
    Unrefined,

    /// Structural invariant violated
    #[error("malformed tree at index {index}: {reason}")]
    Malformed {
        /// Flat index where the violation was found
        index: usize,
        /// Description
        reason: String,
    },

    /// Position not addressable in the layout
    #[error("position {0} is outside the tree")]
    PositionOutOfRange(NodePos),

    /// Coefficient arithmetic left the i64 range
    #[error("coefficient overflow at index {index}")]
    Overflow {
        /// Flat index being computed
        index: usize,
    },

    /// Cancellation token was triggered
    #[error("operation cancelled")]
    Cancelled,
}

/// Configuration parameters for building trees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeConfig {
    /// Layout depth D: slots are reserved for depths 0..=D
    pub max_depth: u32,

    /// Deepest level Refine may reach (forced leaves here)
    pub refine_depth: u32,

    /// Refine stops at a node when its draw is <= this value
    pub leaf_threshold: u32,

    /// Refine draws uniformly from 1..=draw_range
    pub draw_range: u32,
}

impl TreeConfig {
    /// Default stop threshold (draws 1..=3 of 10 make a leaf)
    pub const DEFAULT_LEAF_THRESHOLD: u32 = 3;

    /// Default draw range
    pub const DEFAULT_DRAW_RANGE: u32 = 10;

    /// Configuration refining at most to `max_depth`
    pub fn new(max_depth: u32) -> Result<Self, TreeError> {
        Layout::new(max_depth)?;
        Ok(Self {
            max_depth,
            refine_depth: max_depth,
            leaf_threshold: Self::DEFAULT_LEAF_THRESHOLD,
            draw_range: Self::DEFAULT_DRAW_RANGE,
        })
    }

    /// Stop refining at `refine_depth` (must not exceed `max_depth`)
    pub fn with_refine_depth(mut self, refine_depth: u32) -> Result<Self, TreeError> {
        if refine_depth > self.max_depth {
            return Err(TreeError::InvalidConfiguration(format!(
                "refine depth {} exceeds max depth {}",
                refine_depth, self.max_depth
            )));
        }
        self.refine_depth = refine_depth;
        Ok(self)
    }

    /// Set the stop threshold
    pub fn with_leaf_threshold(mut self, leaf_threshold: u32) -> Self {
        self.leaf_threshold = leaf_threshold;
        self
    }

    /// Set the draw range (must be > 0)
    pub fn with_draw_range(mut self, draw_range: u32) -> Result<Self, TreeError> {
        if draw_range == 0 {
            return Err(TreeError::InvalidConfiguration(
                "draw range must be > 0".to_string(),
            ));
        }
        self.draw_range = draw_range;
        Ok(self)
    }

    /// Never stop early: every branch refines down to `refine_depth`
    pub fn full_refinement(self) -> Self {
        self.with_leaf_threshold(0)
    }

    /// Index layout for `max_depth`
    pub fn layout(&self) -> Result<Layout, TreeError> {
        Layout::new(self.max_depth)
    }
}

/// Entry points bound to one configuration and execution context
///
/// Every store passed in must have been created with the engine's max depth.
#[derive(Debug, Clone)]
pub struct Engine {
    config: TreeConfig,
    ctx: ExecContext,
}

impl Engine {
    /// Create engine with the default execution context
    pub fn new(config: TreeConfig) -> Self {
        Self::with_context(config, ExecContext::default())
    }

    /// Create engine with an explicit execution context
    pub fn with_context(config: TreeConfig, ctx: ExecContext) -> Self {
        Self { config, ctx }
    }

    /// Access configuration
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Access execution context
    pub fn context(&self) -> &ExecContext {
        &self.ctx
    }

    /// Build a tree from `seed`
    pub fn refine(&self, seed: u64) -> Result<NodeStore, TreeError> {
        ops::refine(&self.config, seed, &self.ctx)
    }

    /// Sum-fold internal nodes in place
    pub fn compress(&self, store: &mut NodeStore) -> Result<(), TreeError> {
        self.check_layout(store)?;
        ops::compress(store, &self.ctx)
    }

    /// Restore leaf values in place from a compressed store
    pub fn reconstruct(&self, store: &mut NodeStore, seed: i64) -> Result<(), TreeError> {
        self.check_layout(store)?;
        ops::reconstruct(store, seed, &self.ctx)
    }

    /// Coefficient at (depth, label) with ancestor fallback
    pub fn get_coef(&self, store: &NodeStore, depth: u32, label: i64) -> Result<Coef, TreeError> {
        self.check_layout(store)?;
        Ok(ops::get_coef(store, NodePos::new(depth, label)))
    }

    /// Differencing stencil
    pub fn diff(&self, store: &NodeStore) -> Result<DiffResult, TreeError> {
        self.check_layout(store)?;
        ops::diff(store, &self.ctx)
    }

    /// A + B
    pub fn gaxpy(&self, a: &NodeStore, b: &NodeStore) -> Result<NodeStore, TreeError> {
        self.check_layout(a)?;
        self.check_layout(b)?;
        ops::gaxpy(a, b, &self.ctx)
    }

    /// alpha * A + beta * B
    pub fn gaxpy_scaled(
        &self,
        alpha: i64,
        a: &NodeStore,
        beta: i64,
        b: &NodeStore,
    ) -> Result<NodeStore, TreeError> {
        self.check_layout(a)?;
        self.check_layout(b)?;
        ops::gaxpy_scaled(alpha, a, beta, b, &self.ctx)
    }

    /// Sum of leaf-value products along the lockstep walk of both trees
    pub fn inner_product(&self, a: &NodeStore, b: &NodeStore) -> Result<i64, TreeError> {
        self.check_layout(a)?;
        self.check_layout(b)?;
        ops::inner_product(a, b, &self.ctx)
    }

    /// Sum of squared leaf values
    pub fn norm(&self, store: &NodeStore) -> Result<i64, TreeError> {
        self.check_layout(store)?;
        ops::norm(store, &self.ctx)
    }

    fn check_layout(&self, store: &NodeStore) -> Result<(), TreeError> {
        if store.max_depth() != self.config.max_depth {
            return Err(TreeError::LayoutMismatch {
                left: self.config.max_depth,
                right: store.max_depth(),
            });
        }
        Ok(())
    }
}
