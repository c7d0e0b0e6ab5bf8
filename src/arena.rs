//! Shared index-tagging types for both tree variants.
//!
//! Neither variant materializes the root as an arena slot (see DESIGN.md);
//! each tree instead keeps an `entry: Ref` field standing in for "the root's
//! left child." `Ref`/`UpRef` carry everything a pointer would in a
//! pointer-based tree, just as indices into the tree's own `Vec<Node>`.

/// A down-reference: from a branch toward one of its children, or from the
/// tree's entry point toward the top of the tree. Tags leaf vs. branch
/// personality per spec 4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ref {
    Leaf(u32),
    Branch(u32),
    None,
}

impl Ref {
    pub(crate) fn is_none(self) -> bool {
        matches!(self, Ref::None)
    }

    pub(crate) fn index(self) -> Option<u32> {
        match self {
            Ref::Leaf(i) | Ref::Branch(i) => Some(i),
            Ref::None => None,
        }
    }
}

/// An up-reference: from a node toward its leaf-parent or branch-parent.
/// `Root` means the parent is the tree's sentinel (not an arena slot);
/// `None` means the personality using this slot is currently unused (branch
/// personality idle, or leaf personality held by a non-head duplicate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpRef {
    Root,
    Node(u32),
    None,
}

/// External handle to a node living in a tree's arena. Opaque to callers;
/// only meaningful when passed back to the tree that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> u32 {
        self.0
    }
}
