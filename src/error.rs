use crate::arena::NodeId;
use std::fmt;

/// A violation of one of the tree's structural invariants, surfaced only by
/// [`crate::Int32Tree::validate`] / [`crate::ByteTree::validate`]. Never
/// returned by the tree's operational surface (insert/lookup/delete/next/prev
/// are total and return no errors).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A branch's bit position did not strictly decrease from its branch-parent.
    PositionNotDecreasing { parent: NodeId, child: NodeId },
    /// A key reachable under a branch's child disagreed with the bit that
    /// child's side is supposed to fix.
    BranchBitMismatch { branch: NodeId, child: NodeId, expected_bit: bool },
    /// A duplicate list is not a well-formed circular list with exactly one head.
    DuplicateListMalformed { head: NodeId },
    /// A child's up-reference does not point back at its actual parent.
    ParentChildMismatch { parent: NodeId, child: NodeId },
    /// A non-root branch has a null child (only the root may have both children null).
    NonRootBothChildrenNull { node: NodeId },
    /// A duplicate-subtree anchor's descendants do not all carry the anchor's key.
    DuplicateSubtreeKeyMismatch { anchor: NodeId },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InvariantViolation {:?}", self)
    }
}

impl std::error::Error for InvariantViolation {}
