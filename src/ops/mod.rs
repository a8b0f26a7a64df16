//! Operators over node stores
//!
//! Every pass is a recursive fork-join over subtrees: a call owns the span
//! of its node, splits it into the two child spans, and hands them to
//! [`ExecContext::join`](crate::exec::ExecContext::join). Cross-tree inputs
//! are shared read-only; only the output span is written.

mod coef;
mod compress;
mod diff;
mod gaxpy;
mod reduce;
mod refine;

pub use coef::{get_coef, lookup, Coef, CoefLookup, TrailStep, FALLBACK_STEP};
pub use compress::{compress, reconstruct};
pub use diff::{diff, DiffResult};
pub use gaxpy::{gaxpy, gaxpy_scaled};
pub use reduce::{inner_product, norm};
pub use refine::refine;
