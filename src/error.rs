use thiserror::Error;

/// Errors reported by the fallible `RBTreeMap` operations.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum Error {
    /// A "must exist" operation such as [`try_remove`](crate::RBTreeMap::try_remove) was given a
    /// key that is not in the map. The map is left untouched.
    #[error("key not found")]
    KeyNotFound,
    /// The tree structure is corrupt. This indicates a bug in the map, never a caller error.
    #[error("tree invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

/// A broken structural rule, as reported by
/// [`RBTreeMap::check_invariants`](crate::RBTreeMap::check_invariants).
///
/// `depth` is the distance from the root (0) of the node where the violation was found.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("root is red")]
    RedRoot,
    #[error("red node at depth {depth} has a red parent")]
    RedChildOfRed { depth: usize },
    #[error("black height differs below depth {depth}: left {left}, right {right}")]
    BlackHeightMismatch { depth: usize, left: usize, right: usize },
    #[error("key at depth {depth} is out of order")]
    OutOfOrder { depth: usize },
    #[error("node at depth {depth} does not point back at its parent")]
    BrokenParentLink { depth: usize },
    #[error("node at depth {depth} has the wrong child-side flag")]
    WrongSide { depth: usize },
    #[error("len is {len} but {reachable} entries are reachable")]
    LenMismatch { len: usize, reachable: usize },
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn messages() {
        assert_eq!(Error::KeyNotFound.to_string(), "key not found");
        assert_eq!(
            Error::from(InvariantViolation::LenMismatch { len: 3, reachable: 2 }).to_string(),
            "tree invariant violated: len is 3 but 2 entries are reachable"
        );
        assert_eq!(
            InvariantViolation::BlackHeightMismatch { depth: 1, left: 2, right: 3 }.to_string(),
            "black height differs below depth 1: left 2, right 3"
        );
    }
}
