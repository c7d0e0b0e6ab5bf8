//! Variable-length byte-string variant of the tree.
//!
//! Structurally the same dual-personality node as [`crate::int32::Int32Tree`],
//! but keyed by an inline byte array of a fixed per-tree length instead of a
//! `u32`, branching on leading-equal-bits rather than XOR. Duplicates can't
//! thread a cheap linked list into the node the way the integer variant does
//! (the key itself already occupies the slot a list pointer would), so they
//! become a degenerate subtree instead: a "duplicate subtree anchor"
//! (`position < 0`) whose leaves all share one key, nested to preserve
//! insertion order on a walk-down.

use crate::arena::{NodeId, Ref, UpRef};
use crate::bits::{bit_at, equal_bits};
use crate::error::InvariantViolation;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone)]
struct Node {
    key: Box<[u8]>,
    leaf_parent: UpRef,
    /// Parent under which this node is reached as a branch. `None` iff this
    /// node's branch personality is unused (it is a plain leaf or non-anchor
    /// duplicate). Unlike the integer variant, `position == 0` is a valid
    /// real branch (keys sharing zero leading bits), so this field — not
    /// `position` — is the "branch personality unused" sentinel here.
    branch_parent: UpRef,
    left: Ref,
    right: Ref,
    /// Leading bits the two subtrees share (descent tests bit `position`,
    /// MSB-first). Negative marks a duplicate-subtree anchor; meaningless
    /// (left at 0) when `branch_parent == UpRef::None`.
    position: i32,
}

impl Node {
    fn leaf(key: Box<[u8]>, leaf_parent: UpRef) -> Self {
        Node { key, leaf_parent, branch_parent: UpRef::None, left: Ref::None, right: Ref::None, position: 0 }
    }

    fn side(&self, r: Ref) -> Option<Side> {
        if self.left == r {
            Some(Side::Left)
        } else if self.right == r {
            Some(Side::Right)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ParentSlot {
    Entry,
    Node(u32, Side),
}

/// Outcome of [`ByteTree::insert`]: either the new node was threaded in, or
/// (unique trees only) the key already existed and the pre-existing node is
/// returned unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(NodeId),
    AlreadyPresent(NodeId),
}

impl InsertOutcome {
    pub fn node(self) -> NodeId {
        match self {
            InsertOutcome::Inserted(id) | InsertOutcome::AlreadyPresent(id) => id,
        }
    }

    pub fn was_inserted(self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}

/// An ordered associative container keyed by fixed-length byte strings (every
/// key inserted into one tree must share the tree's configured `key_len`),
/// compared lexicographically as unsigned bytes. Duplicate keys are
/// permitted unless the tree was constructed with [`ByteTree::new_unique`],
/// in which case a duplicate insert returns the existing node unchanged.
#[derive(Debug)]
pub struct ByteTree {
    nodes: Vec<Node>,
    free: SmallVec<[u32; 4]>,
    entry: Ref,
    key_len: usize,
    unique: bool,
    len: usize,
}

impl ByteTree {
    pub fn new(key_len: usize) -> Self {
        ByteTree { nodes: Vec::new(), free: SmallVec::new(), entry: Ref::None, key_len, unique: false, len: 0 }
    }

    pub fn new_unique(key_len: usize) -> Self {
        ByteTree { unique: true, ..Self::new(key_len) }
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn key_len(&self) -> usize {
        self.key_len
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn key(&self, id: NodeId) -> &[u8] {
        &self.nodes[id.index() as usize].key
    }

    fn alloc(&mut self, node: Node) -> u32 {
        if let Some(idx) = self.free.pop() {
            self.nodes[idx as usize] = node;
            idx
        } else {
            self.nodes.push(node);
            (self.nodes.len() - 1) as u32
        }
    }

    fn free_slot(&mut self, idx: u32) {
        self.free.push(idx);
    }

    fn key_bits(&self) -> i32 {
        (self.key_len * 8) as i32
    }

    fn walk_down(&self, mut r: Ref, side: Side) -> Option<u32> {
        loop {
            match r {
                Ref::None => return None,
                Ref::Leaf(i) => return Some(i),
                Ref::Branch(i) => {
                    let node = &self.nodes[i as usize];
                    r = match side {
                        Side::Left => node.left,
                        Side::Right => node.right,
                    };
                }
            }
        }
    }

    fn walk_up_right(&self, mut current: Ref, mut parent: UpRef) -> Option<u32> {
        loop {
            let p_idx = match parent {
                UpRef::Node(i) => i,
                UpRef::Root | UpRef::None => return None,
            };
            let pnode = &self.nodes[p_idx as usize];
            if pnode.left == current {
                return Some(p_idx);
            }
            current = Ref::Branch(p_idx);
            parent = pnode.branch_parent;
        }
    }

    fn walk_up_left(&self, mut current: Ref, mut parent: UpRef) -> Option<u32> {
        loop {
            let p_idx = match parent {
                UpRef::Node(i) => i,
                UpRef::Root | UpRef::None => return None,
            };
            let pnode = &self.nodes[p_idx as usize];
            if pnode.right == current {
                return Some(p_idx);
            }
            current = Ref::Branch(p_idx);
            parent = pnode.branch_parent;
        }
    }

    pub fn first(&self) -> Option<NodeId> {
        self.walk_down(self.entry, Side::Left).map(NodeId)
    }

    pub fn last(&self) -> Option<NodeId> {
        self.walk_down(self.entry, Side::Right).map(NodeId)
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        let idx = id.index();
        let leaf_parent = self.nodes[idx as usize].leaf_parent;
        let ancestor = self.walk_up_right(Ref::Leaf(idx), leaf_parent)?;
        let extreme = self.walk_down(self.nodes[ancestor as usize].right, Side::Left)?;
        Some(NodeId(extreme))
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        let idx = id.index();
        let leaf_parent = self.nodes[idx as usize].leaf_parent;
        let ancestor = self.walk_up_left(Ref::Leaf(idx), leaf_parent)?;
        let extreme = self.walk_down(self.nodes[ancestor as usize].left, Side::Right)?;
        Some(NodeId(extreme))
    }

    pub fn lookup(&self, key: &[u8]) -> Option<NodeId> {
        debug_assert_eq!(key.len(), self.key_len);
        let mut current = match self.entry {
            Ref::None => return None,
            Ref::Leaf(i) => return self.leaf_hit(i, key),
            Ref::Branch(i) => i,
        };
        let mut known = 0i32;
        loop {
            let node = &self.nodes[current as usize];
            if node.position < 0 {
                return if node.key.as_ref() == key {
                    self.walk_down(Ref::Branch(current), Side::Left).map(NodeId)
                } else {
                    None
                };
            }
            let eq = equal_bits(key, &node.key, known, node.position);
            if eq < node.position {
                return None;
            }
            known = node.position;
            let side = if bit_at(key, node.position) == 0 { Side::Left } else { Side::Right };
            let child = if side == Side::Left { node.left } else { node.right };
            match child {
                Ref::None => return None,
                Ref::Leaf(ci) => return self.leaf_hit(ci, key),
                Ref::Branch(ci) => current = ci,
            }
        }
    }

    fn leaf_hit(&self, idx: u32, key: &[u8]) -> Option<NodeId> {
        if self.nodes[idx as usize].key.as_ref() == key {
            Some(NodeId(idx))
        } else {
            None
        }
    }

    pub fn insert(&mut self, key: &[u8]) -> InsertOutcome {
        debug_assert_eq!(key.len(), self.key_len);
        let boxed: Box<[u8]> = key.into();

        if self.entry.is_none() {
            let idx = self.alloc(Node::leaf(boxed, UpRef::Root));
            self.entry = Ref::Leaf(idx);
            self.len += 1;
            return InsertOutcome::Inserted(NodeId(idx));
        }

        let bits = self.key_bits();
        let mut parent = ParentSlot::Entry;
        let mut cur = self.entry;
        let mut known = 0i32;
        let stopping = loop {
            match cur {
                Ref::Leaf(_) => break cur,
                Ref::None => unreachable!("non-root branch children are never null"),
                Ref::Branch(i) => {
                    let node = &self.nodes[i as usize];
                    if node.position < 0 {
                        break cur;
                    }
                    let eq = equal_bits(&boxed, &node.key, known, node.position);
                    if eq < node.position {
                        break cur;
                    }
                    known = node.position;
                    let side = if bit_at(&boxed, node.position) == 0 { Side::Left } else { Side::Right };
                    let child = if side == Side::Left { node.left } else { node.right };
                    parent = ParentSlot::Node(i, side);
                    cur = child;
                }
            }
        };

        let stopping_idx = stopping.index().expect("stopping reference is never None");
        let stopping_is_anchor = matches!(stopping, Ref::Branch(_)) && self.nodes[stopping_idx as usize].position < 0;
        let stopping_key_equal = self.nodes[stopping_idx as usize].key.as_ref() == boxed.as_ref();

        if stopping_key_equal && matches!(stopping, Ref::Leaf(_)) {
            // First duplicate of this key.
            if self.unique {
                return InsertOutcome::AlreadyPresent(NodeId(stopping_idx));
            }
            return InsertOutcome::Inserted(self.insert_duplicate(stopping_idx, boxed));
        }

        if stopping_key_equal && stopping_is_anchor {
            // Third-or-later duplicate: extend the chain under the rightmost
            // (most recently inserted) leaf so a walk-down still yields
            // insertion order.
            debug_assert!(!self.unique, "unique trees never grow a duplicate-subtree anchor");
            let rightmost = self.walk_down(stopping, Side::Right).expect("anchor subtree always has leaves");
            return InsertOutcome::Inserted(self.insert_duplicate(rightmost, boxed));
        }

        // Split case: `stopping` (a leaf or an anchor) has a key that
        // diverges from the new key; introduce a branch above it.
        let diff = equal_bits(&boxed, &self.nodes[stopping_idx as usize].key, known, bits);
        let position = diff;
        let new_idx = self.alloc(Node {
            key: boxed,
            leaf_parent: UpRef::None,
            branch_parent: UpRef::None,
            left: Ref::None,
            right: Ref::None,
            position,
        });
        self.nodes[new_idx as usize].leaf_parent = UpRef::Node(new_idx);

        let new_goes_right = bit_at(&self.nodes[new_idx as usize].key, position) == 1;
        let (new_side, stop_side) = if new_goes_right { (Side::Right, Side::Left) } else { (Side::Left, Side::Right) };

        match new_side {
            Side::Left => self.nodes[new_idx as usize].left = Ref::Leaf(new_idx),
            Side::Right => self.nodes[new_idx as usize].right = Ref::Leaf(new_idx),
        }
        match stop_side {
            Side::Left => self.nodes[new_idx as usize].left = stopping,
            Side::Right => self.nodes[new_idx as usize].right = stopping,
        }

        match stopping {
            Ref::Leaf(si) => self.nodes[si as usize].leaf_parent = UpRef::Node(new_idx),
            Ref::Branch(si) => self.nodes[si as usize].branch_parent = UpRef::Node(new_idx),
            Ref::None => unreachable!(),
        }

        match parent {
            ParentSlot::Entry => {
                self.nodes[new_idx as usize].branch_parent = UpRef::Root;
                self.entry = Ref::Branch(new_idx);
            }
            ParentSlot::Node(p_idx, side) => {
                self.nodes[new_idx as usize].branch_parent = UpRef::Node(p_idx);
                match side {
                    Side::Left => self.nodes[p_idx as usize].left = Ref::Branch(new_idx),
                    Side::Right => self.nodes[p_idx as usize].right = Ref::Branch(new_idx),
                }
            }
        }

        self.len += 1;
        InsertOutcome::Inserted(NodeId(new_idx))
    }

    /// Allocates a leaf for `key` and wraps `existing` (a live leaf, possibly
    /// itself hanging off an anchor) in a fresh duplicate-subtree anchor
    /// holding `existing` on the left and the new leaf on the right.
    fn insert_duplicate(&mut self, existing: u32, key: Box<[u8]>) -> NodeId {
        let new_idx = self.alloc(Node::leaf(key, UpRef::None));
        let parent = self.nodes[existing as usize].leaf_parent;
        let anchor_idx = self.alloc(Node {
            key: self.nodes[existing as usize].key.clone(),
            leaf_parent: UpRef::None,
            branch_parent: UpRef::None,
            left: Ref::Leaf(existing),
            right: Ref::Leaf(new_idx),
            position: -1,
        });
        self.nodes[anchor_idx as usize].branch_parent = parent;
        self.retarget(parent, Ref::Leaf(existing), Ref::Branch(anchor_idx));
        self.nodes[existing as usize].leaf_parent = UpRef::Node(anchor_idx);
        self.nodes[new_idx as usize].leaf_parent = UpRef::Node(anchor_idx);
        self.len += 1;
        NodeId(new_idx)
    }

    pub fn delete(&mut self, id: NodeId) -> bool {
        let idx = id.index();
        self.len -= 1;

        let leaf_parent = self.nodes[idx as usize].leaf_parent;
        let donor_branch_parent = self.nodes[idx as usize].branch_parent;
        let needs_donation = donor_branch_parent != UpRef::None;
        let donor_position = self.nodes[idx as usize].position;
        let donor_left = self.nodes[idx as usize].left;
        let donor_right = self.nodes[idx as usize].right;

        match leaf_parent {
            UpRef::Root => {
                self.entry = Ref::None;
                self.free_slot(idx);
                false
            }
            UpRef::Node(p_idx) => {
                let pnode_branch_parent = self.nodes[p_idx as usize].branch_parent;
                let my_side = self.nodes[p_idx as usize].side(Ref::Leaf(idx)).expect("parent must reference us");
                let sibling = match my_side {
                    Side::Left => self.nodes[p_idx as usize].right,
                    Side::Right => self.nodes[p_idx as usize].left,
                };
                self.retarget(pnode_branch_parent, Ref::Branch(p_idx), sibling);
                match sibling {
                    Ref::Leaf(si) => self.nodes[si as usize].leaf_parent = pnode_branch_parent,
                    Ref::Branch(si) => self.nodes[si as usize].branch_parent = pnode_branch_parent,
                    Ref::None => unreachable!("non-root branch children are never both null"),
                }

                // `p_idx == idx` is the common case: a node created by an
                // earlier split always has its own leaf reached through
                // itself (leaf_parent = Node(self)), so the sibling
                // promotion above already retired that same branch role in
                // full and no donor is needed. A distinct branch role can
                // only survive when `idx` inherited an external leaf-parent
                // from elsewhere, which this variant's deletion never does
                // (no duplicate-list head promotion to hand one off) —
                // donation is kept for structural symmetry with the integer
                // variant and to stay correct if that ever changes.
                if p_idx == idx {
                    self.free_slot(idx);
                } else if needs_donation {
                    self.donate_branch_role(idx, p_idx, donor_position, donor_left, donor_right, donor_branch_parent);
                    self.free_slot(idx);
                } else {
                    self.free_slot(p_idx);
                    self.free_slot(idx);
                }
                true
            }
            UpRef::None => unreachable!("a live leaf always has a leaf-parent"),
        }
    }

    fn retarget(&mut self, parent: UpRef, old: Ref, new: Ref) {
        match parent {
            UpRef::Root => {
                debug_assert_eq!(self.entry, old);
                self.entry = new;
            }
            UpRef::Node(p_idx) => {
                let node = &mut self.nodes[p_idx as usize];
                if node.left == old {
                    node.left = new;
                } else {
                    debug_assert_eq!(node.right, old);
                    node.right = new;
                }
            }
            UpRef::None => unreachable!("a branch's parent is never unset"),
        }
    }

    /// Copies the branch role previously owned by `old` (about to be freed)
    /// onto `donor`, which takes over routing for `left`/`right` at
    /// `position`, reparented under `branch_parent`.
    fn donate_branch_role(&mut self, old: u32, donor: u32, position: i32, left: Ref, right: Ref, branch_parent: UpRef) {
        self.nodes[donor as usize].position = position;
        self.nodes[donor as usize].left = left;
        self.nodes[donor as usize].right = right;
        self.nodes[donor as usize].branch_parent = branch_parent;
        self.retarget(branch_parent, Ref::Branch(old), Ref::Branch(donor));
        match left {
            Ref::Leaf(i) => self.nodes[i as usize].leaf_parent = UpRef::Node(donor),
            Ref::Branch(i) => self.nodes[i as usize].branch_parent = UpRef::Node(donor),
            Ref::None => {}
        }
        match right {
            Ref::Leaf(i) => self.nodes[i as usize].leaf_parent = UpRef::Node(donor),
            Ref::Branch(i) => self.nodes[i as usize].branch_parent = UpRef::Node(donor),
            Ref::None => {}
        }
    }

    /// Recursively walks the tree checking every invariant of the data model.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if let Ref::Branch(i) = self.entry {
            if self.nodes[i as usize].branch_parent != UpRef::Root {
                return Err(InvariantViolation::ParentChildMismatch { parent: NodeId(i), child: NodeId(i) });
            }
        }
        self.validate_subtree(self.entry, self.key_bits())
    }

    fn validate_subtree(&self, r: Ref, max_position: i32) -> Result<(), InvariantViolation> {
        let i = match r {
            Ref::None => return Ok(()),
            Ref::Leaf(i) => {
                if self.nodes[i as usize].leaf_parent == UpRef::None {
                    return Err(InvariantViolation::DuplicateListMalformed { head: NodeId(i) });
                }
                return Ok(());
            }
            Ref::Branch(i) => i,
        };
        let node = &self.nodes[i as usize];
        if node.position >= 0 {
            if node.position >= max_position {
                return Err(InvariantViolation::PositionNotDecreasing { parent: NodeId(i), child: NodeId(i) });
            }
            if node.left == node.right {
                return Err(InvariantViolation::NonRootBothChildrenNull { node: NodeId(i) });
            }
            self.check_side_bits(node.left, i, node.position, false)?;
            self.check_side_bits(node.right, i, node.position, true)?;
            self.validate_subtree(node.left, node.position)?;
            self.validate_subtree(node.right, node.position)?;
        } else {
            let mut keys = Vec::new();
            self.collect_keys(r, &mut keys);
            if keys.iter().any(|k| k.as_ref() != node.key.as_ref()) {
                return Err(InvariantViolation::DuplicateSubtreeKeyMismatch { anchor: NodeId(i) });
            }
            self.validate_subtree(node.left, i32::MAX)?;
            self.validate_subtree(node.right, i32::MAX)?;
        }
        Ok(())
    }

    fn check_side_bits(&self, r: Ref, branch: u32, pos: i32, expected: bool) -> Result<(), InvariantViolation> {
        let mut keys = Vec::new();
        self.collect_keys(r, &mut keys);
        for k in keys {
            let bit_is_set = bit_at(&k, pos) == 1;
            if bit_is_set != expected {
                return Err(InvariantViolation::BranchBitMismatch { branch: NodeId(branch), child: NodeId(branch), expected_bit: expected });
            }
        }
        Ok(())
    }

    fn collect_keys(&self, r: Ref, out: &mut Vec<Box<[u8]>>) {
        match r {
            Ref::None => {}
            Ref::Leaf(i) => out.push(self.nodes[i as usize].key.clone()),
            Ref::Branch(i) => {
                let node = &self.nodes[i as usize];
                self.collect_keys(node.left, out);
                self.collect_keys(node.right, out);
            }
        }
    }
}
