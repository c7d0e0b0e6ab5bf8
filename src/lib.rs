//! An elastic binary tree: an ordered associative container keyed by a
//! fixed-width `u32` ([`Int32Tree`]) or an arbitrary fixed-length byte string
//! ([`ByteTree`]). Both are radix trees in which every internal decision
//! node doubles as one of the tree's own leaves, so insertion never
//! allocates a separate routing node: one [`NodeId`] slot per stored element
//! serves as both a leaf and, when needed, a branch point above itself.
//!
//! Insertion and lookup are `O(log n)` (bounded by key width/length, not
//! tree size — this is a radix tree, not a balanced comparison tree).
//! Deletion of a known element is `O(1)` except when the deleted node was
//! also lending its branch role elsewhere, in which case it's bounded by
//! key width/length. Traversal to the next or previous element is amortized
//! `O(1)`.
//!
//! Both variants allow duplicate keys by default: [`Int32Tree`] threads them
//! into a circular doubly linked list off the first-inserted node;
//! [`ByteTree`] — which has nowhere to hang list pointers since its key
//! occupies the node inline — threads them as a degenerate subtree instead.
//! [`ByteTree::new_unique`] rejects duplicates, returning the pre-existing
//! node from `insert` instead.

mod arena;
mod bits;
mod bytes;
mod error;
mod int32;

pub use arena::NodeId;
pub use bytes::{ByteTree, InsertOutcome};
pub use error::InvariantViolation;
pub use int32::Int32Tree;
