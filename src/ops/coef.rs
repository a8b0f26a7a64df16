//! GetCoef: point query with ancestor fallback
//!
//! Walks down from the root along the binary expansion of the query label,
//! recording each visited node on a trail owned by the call. If refinement
//! stopped above the requested depth, the deepest node on the trail answers
//! with a depth-gap correction instead.

use std::fmt;

use crate::store::NodeStore;
use crate::tree::NodePos;

/// Correction added per level between an answering ancestor and the query
pub const FALLBACK_STEP: i64 = 2;

/// Outcome of a coefficient query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coef {
    /// Node exists at exactly the requested position
    Exact(i64),

    /// Tree stopped refining at `ancestor`; `value` is its corrected coefficient
    Approximate {
        /// Corrected value
        value: i64,
        /// Deepest populated node on the query path
        ancestor: NodePos,
    },

    /// Label outside `[0, 2^depth)`, depth beyond the layout, or empty tree
    NotApplicable,
}

impl Coef {
    /// Value if the query produced one
    pub fn value(&self) -> Option<i64> {
        match *self {
            Coef::Exact(value) | Coef::Approximate { value, .. } => Some(value),
            Coef::NotApplicable => None,
        }
    }

    /// Whether the node exists at the requested resolution
    pub fn is_exact(&self) -> bool {
        matches!(self, Coef::Exact(_))
    }

    /// Whether the answer came from an ancestor
    pub fn is_approximate(&self) -> bool {
        matches!(self, Coef::Approximate { .. })
    }
}

impl fmt::Display for Coef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coef::Exact(value) => write!(f, "{} (exact)", value),
            Coef::Approximate { value, ancestor } => {
                write!(f, "{} (approximate from {})", value, ancestor)
            }
            Coef::NotApplicable => write!(f, "n/a"),
        }
    }
}

/// One visited node on the query path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailStep {
    /// Visited position
    pub pos: NodePos,
    /// Its flat index
    pub index: usize,
    /// Its coefficient
    pub coef: i64,
}

/// Query result plus the path walked to get it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoefLookup {
    /// Tagged answer
    pub coef: Coef,
    /// Populated nodes visited, root first
    pub trail: Vec<TrailStep>,
}

/// Coefficient at `query`, falling back to the nearest ancestor
pub fn get_coef(store: &NodeStore, query: NodePos) -> Coef {
    lookup(store, query).coef
}

/// [`get_coef`] that also returns the visited trail
pub fn lookup(store: &NodeStore, query: NodePos) -> CoefLookup {
    if !store.layout().contains(query) {
        return CoefLookup {
            coef: Coef::NotApplicable,
            trail: Vec::new(),
        };
    }

    let trail = Vec::with_capacity(query.depth as usize + 1);
    descend(store, NodePos::root(), 0, query, trail)
}

fn descend(
    store: &NodeStore,
    pos: NodePos,
    index: usize,
    query: NodePos,
    mut trail: Vec<TrailStep>,
) -> CoefLookup {
    let slot = store.slot(index);
    if !slot.is_populated() {
        return fall_back(query, trail);
    }

    trail.push(TrailStep {
        pos,
        index,
        coef: slot.coef,
    });
    if pos.depth == query.depth {
        return CoefLookup {
            coef: Coef::Exact(slot.coef),
            trail,
        };
    }
    if !slot.is_internal() {
        // Adaptivity stopped above the requested depth
        return fall_back(query, trail);
    }

    let next = query.ancestor_at(pos.depth + 1);
    let next_index = match next.direction() {
        Some(direction) => store.layout().child_index(index, pos.depth, direction),
        None => return fall_back(query, trail),
    };
    descend(store, next, next_index, query, trail)
}

fn fall_back(query: NodePos, trail: Vec<TrailStep>) -> CoefLookup {
    let coef = match trail.last() {
        Some(step) => Coef::Approximate {
            value: step.coef + FALLBACK_STEP * i64::from(query.depth - step.pos.depth),
            ancestor: step.pos,
        },
        None => Coef::NotApplicable,
    };
    CoefLookup { coef, trail }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Layout;

    fn sample_tree() -> NodeStore {
        //            .
        //       .         7
        //     2   .
        //        1 3
        NodeStore::from_leaves(
            3,
            &[
                (NodePos::new(2, 0), 2),
                (NodePos::new(3, 2), 1),
                (NodePos::new(3, 3), 3),
                (NodePos::new(1, 1), 7),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_exact_leaf() {
        let store = sample_tree();
        assert_eq!(get_coef(&store, NodePos::new(3, 3)), Coef::Exact(3));
        assert_eq!(get_coef(&store, NodePos::new(1, 1)), Coef::Exact(7));
    }

    #[test]
    fn test_exact_internal() {
        let store = sample_tree();
        assert_eq!(get_coef(&store, NodePos::new(1, 0)), Coef::Exact(0));
    }

    #[test]
    fn test_fallback_to_ancestor() {
        let store = sample_tree();
        let result = lookup(&store, NodePos::new(3, 6));
        assert_eq!(
            result.coef,
            Coef::Approximate {
                value: 7 + 2 * 2,
                ancestor: NodePos::new(1, 1),
            }
        );
        let visited: Vec<_> = result.trail.iter().map(|step| step.pos).collect();
        assert_eq!(visited, vec![NodePos::root(), NodePos::new(1, 1)]);
    }

    #[test]
    fn test_out_of_range() {
        let store = sample_tree();
        assert_eq!(get_coef(&store, NodePos::new(2, -1)), Coef::NotApplicable);
        assert_eq!(get_coef(&store, NodePos::new(2, 4)), Coef::NotApplicable);
        assert_eq!(get_coef(&store, NodePos::new(4, 0)), Coef::NotApplicable);
    }

    #[test]
    fn test_empty_store_is_not_applicable() {
        let store = NodeStore::empty(Layout::new(2).unwrap());
        let result = lookup(&store, NodePos::new(1, 0));
        assert_eq!(result.coef, Coef::NotApplicable);
        assert!(result.trail.is_empty());
    }
}
