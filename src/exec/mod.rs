//! Fork-join execution for subtree passes
//!
//! Every recursive pass splits a node's span into two disjoint child spans
//! and runs them through [`ExecContext::join`]. Subtrees rooted above the
//! parallel cutoff depth are forked onto the rayon pool; deeper subtrees run
//! inline. Cancellation is checked at each task boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::TreeError;

/// Default depth above which subtrees are forked
pub const DEFAULT_PARALLEL_DEPTH: u32 = 8;

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create an untriggered token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every pass holding a clone of this token
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Scheduling parameters shared by all subtree tasks of a pass
#[derive(Debug, Clone)]
pub struct ExecContext {
    parallel_depth: u32,
    cancel: CancelToken,
}

impl Default for ExecContext {
    fn default() -> Self {
        Self {
            parallel_depth: DEFAULT_PARALLEL_DEPTH,
            cancel: CancelToken::new(),
        }
    }
}

impl ExecContext {
    /// Context forking down to [`DEFAULT_PARALLEL_DEPTH`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context that never forks
    pub fn sequential() -> Self {
        Self::default().with_parallel_depth(0)
    }

    /// Fork subtrees rooted at depths `< depth`
    pub fn with_parallel_depth(mut self, depth: u32) -> Self {
        self.parallel_depth = depth;
        self
    }

    /// Attach a cancellation token
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Depth cutoff for forking
    pub fn parallel_depth(&self) -> u32 {
        self.parallel_depth
    }

    /// Token observed by this context
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Task-boundary check
    #[inline]
    pub fn checkpoint(&self) -> Result<(), TreeError> {
        if self.cancel.is_cancelled() {
            return Err(TreeError::Cancelled);
        }
        Ok(())
    }

    /// Run both subtree tasks of a node at `depth` and wait for both
    pub fn join<A, B, RA, RB>(&self, depth: u32, left: A, right: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        #[cfg(feature = "parallel")]
        {
            if depth < self.parallel_depth {
                return rayon::join(left, right);
            }
        }
        #[cfg(not(feature = "parallel"))]
        let _ = depth;

        (left(), right())
    }

    /// [`join`](Self::join) for fallible tasks, failing if either side fails
    pub fn try_join<A, B, RA, RB>(&self, depth: u32, left: A, right: B) -> Result<(RA, RB), TreeError>
    where
        A: FnOnce() -> Result<RA, TreeError> + Send,
        B: FnOnce() -> Result<RB, TreeError> + Send,
        RA: Send,
        RB: Send,
    {
        let (left, right) = self.join(depth, left, right);
        Ok((left?, right?))
    }
}
