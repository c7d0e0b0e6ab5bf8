//! Fixed-width 32-bit unsigned integer variant of the tree.

use crate::arena::{NodeId, Ref, UpRef};
use crate::bits::fls;
use crate::error::InvariantViolation;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone)]
struct Node {
    value: u32,
    leaf_parent: UpRef,
    branch_parent: UpRef,
    left: Ref,
    right: Ref,
    /// 1-based index of the discriminating bit (descent tests `position - 1`).
    /// 0 means the branch personality is unused.
    position: i32,
    dup_next: u32,
    dup_prev: u32,
}

impl Node {
    fn leaf(value: u32, leaf_parent: UpRef) -> Self {
        Node {
            value,
            leaf_parent,
            branch_parent: UpRef::None,
            left: Ref::None,
            right: Ref::None,
            position: 0,
            dup_next: 0, // patched to self-index by caller
            dup_prev: 0,
        }
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

/// Where to patch a pointer once an insertion's split point has been found:
/// either the tree's entry slot, or a specific side of an existing branch.
#[derive(Debug, Clone, Copy)]
enum ParentSlot {
    Entry,
    Node(u32, Side),
}

/// An ordered associative container keyed by `u32`, with O(log n) insert and
/// lookup, O(1) deletion of a known element, and amortized O(1) in-order
/// traversal. Duplicate keys are permitted and enumerated in insertion order.
#[derive(Debug)]
pub struct Int32Tree {
    nodes: Vec<Node>,
    free: SmallVec<[u32; 4]>,
    entry: Ref,
    len: usize,
}

impl Int32Tree {
    pub fn new() -> Self {
        Int32Tree { nodes: Vec::new(), free: SmallVec::new(), entry: Ref::None, len: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn value(&self, id: NodeId) -> u32 {
        self.nodes[id.index() as usize].value
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

    /// Ascend while `current` sits on the right of its parent; stop and
    /// return the ancestor where `current` sits on the left (its right
    /// subtree is then the unexplored "opposite" side, used by `next`).
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

    /// Symmetric to [`Self::walk_up_right`], used by `prev`.
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
        let dn = self.nodes[idx as usize].dup_next;
        if dn != idx && self.nodes[dn as usize].leaf_parent == UpRef::None {
            return Some(NodeId(dn));
        }
        let head_idx = if self.nodes[idx as usize].leaf_parent != UpRef::None { idx } else { dn };
        let ancestor = self.walk_up_right(Ref::Leaf(head_idx), self.nodes[head_idx as usize].leaf_parent)?;
        let extreme = self.walk_down(self.nodes[ancestor as usize].right, Side::Left)?;
        Some(NodeId(extreme))
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        let idx = id.index();
        if self.nodes[idx as usize].leaf_parent == UpRef::None {
            // not head: always valid to step backward within the duplicate list
            return Some(NodeId(self.nodes[idx as usize].dup_prev));
        }
        let ancestor = self.walk_up_left(Ref::Leaf(idx), self.nodes[idx as usize].leaf_parent)?;
        let extreme = self.walk_down(self.nodes[ancestor as usize].left, Side::Right)?;
        Some(NodeId(extreme))
    }

    pub fn lookup(&self, x: u32) -> Option<NodeId> {
        let mut current = match self.entry {
            Ref::None => return None,
            Ref::Leaf(i) => return if self.nodes[i as usize].value == x { Some(NodeId(i)) } else { None },
            Ref::Branch(i) => i,
        };
        loop {
            let node = &self.nodes[current as usize];
            let bit = (node.position - 1) as u32;
            let child = if (x >> bit) & 1 == 0 { node.left } else { node.right };
            match child {
                Ref::None => return None,
                Ref::Leaf(ci) => {
                    return if self.nodes[ci as usize].value == x { Some(NodeId(ci)) } else { None };
                }
                Ref::Branch(ci) => {
                    let cnode = &self.nodes[ci as usize];
                    if x == cnode.value {
                        return Some(NodeId(ci));
                    }
                    if ((x ^ cnode.value) >> cnode.position as u32) != 0 {
                        return None;
                    }
                    current = ci;
                }
            }
        }
    }

    pub fn insert(&mut self, x: u32) -> NodeId {
        if self.entry.is_none() {
            let idx = self.alloc(Node::leaf(x, UpRef::Root));
            self.nodes[idx as usize].dup_next = idx;
            self.nodes[idx as usize].dup_prev = idx;
            self.entry = Ref::Leaf(idx);
            self.len += 1;
            return NodeId(idx);
        }

        let mut parent = ParentSlot::Entry;
        let mut cur = self.entry;
        let stopping = loop {
            match cur {
                Ref::Leaf(_) => break cur,
                Ref::None => unreachable!("non-root branch children are never null"),
                Ref::Branch(i) => {
                    let node = &self.nodes[i as usize];
                    if ((x ^ node.value) >> node.position as u32) != 0 {
                        break cur;
                    }
                    let bit = (node.position - 1) as u32;
                    let side = if (x >> bit) & 1 == 0 { Side::Left } else { Side::Right };
                    let child = if side == Side::Left { node.left } else { node.right };
                    parent = ParentSlot::Node(i, side);
                    cur = child;
                }
            }
        };

        let stopping_idx = stopping.index().expect("stopping reference is never None");
        let stopping_value = self.nodes[stopping_idx as usize].value;

        if matches!(stopping, Ref::Leaf(_)) && stopping_value == x {
            // Duplicate: splice at the tail of the circular list.
            let new_idx = self.alloc(Node {
                value: x,
                leaf_parent: UpRef::None,
                branch_parent: UpRef::None,
                left: Ref::None,
                right: Ref::None,
                position: 0,
                dup_next: stopping_idx,
                dup_prev: self.nodes[stopping_idx as usize].dup_prev,
            });
            let tail = self.nodes[stopping_idx as usize].dup_prev;
            self.nodes[tail as usize].dup_next = new_idx;
            self.nodes[stopping_idx as usize].dup_prev = new_idx;
            self.len += 1;
            return NodeId(new_idx);
        }

        // Split case: new_idx takes over the branch role at the computed position,
        // with the stopping node and the new node's own leaf personality as children.
        let position = fls(x ^ stopping_value);
        let new_idx = self.alloc(Node {
            value: x,
            leaf_parent: UpRef::None, // patched below to point at itself
            branch_parent: UpRef::None, // patched below
            left: Ref::None,
            right: Ref::None,
            position,
            dup_next: 0,
            dup_prev: 0,
        });
        self.nodes[new_idx as usize].dup_next = new_idx;
        self.nodes[new_idx as usize].dup_prev = new_idx;
        self.nodes[new_idx as usize].leaf_parent = UpRef::Node(new_idx);

        let new_goes_right = x > stopping_value;
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
        NodeId(new_idx)
    }

    pub fn delete(&mut self, id: NodeId) -> bool {
        let idx = id.index();
        self.len -= 1;

        if self.nodes[idx as usize].leaf_parent == UpRef::None {
            // Step 1: non-head duplicate.
            let prev = self.nodes[idx as usize].dup_prev;
            let next = self.nodes[idx as usize].dup_next;
            self.nodes[prev as usize].dup_next = next;
            self.nodes[next as usize].dup_prev = prev;
            self.free_slot(idx);
            return true;
        }

        let leaf_parent = self.nodes[idx as usize].leaf_parent;
        let dup_next = self.nodes[idx as usize].dup_next;
        let donor_position = self.nodes[idx as usize].position;
        let donor_left = self.nodes[idx as usize].left;
        let donor_right = self.nodes[idx as usize].right;
        let donor_branch_parent = self.nodes[idx as usize].branch_parent;

        if dup_next != idx {
            // Step 2: promote the next duplicate to be the list head.
            let new_head = dup_next;
            let prev = self.nodes[idx as usize].dup_prev;
            self.nodes[prev as usize].dup_next = new_head;
            self.nodes[new_head as usize].dup_prev = prev;

            // `idx` may be self-referencing as its own branch's leaf child
            // (every split-created node starts this way: leaf_parent ==
            // Node(idx), see `insert`'s split case). In that case the donor
            // slots captured above still point at `idx` itself, and
            // `new_head`'s leaf-parent after promotion is `new_head` itself,
            // not the stale `idx` held in `leaf_parent`.
            let self_referencing = leaf_parent == UpRef::Node(idx);
            let new_head_leaf_parent = if self_referencing { UpRef::Node(new_head) } else { leaf_parent };
            let donor_left = if self_referencing && donor_left == Ref::Leaf(idx) { Ref::Leaf(new_head) } else { donor_left };
            let donor_right = if self_referencing && donor_right == Ref::Leaf(idx) { Ref::Leaf(new_head) } else { donor_right };

            self.nodes[new_head as usize].leaf_parent = new_head_leaf_parent;
            self.retarget(leaf_parent, Ref::Leaf(idx), Ref::Leaf(new_head));

            if donor_position != 0 {
                self.donate_branch_role(idx, new_head, donor_position, donor_left, donor_right, donor_branch_parent);
            }
            self.free_slot(idx);
            return true;
        }

        match leaf_parent {
            UpRef::Root => {
                // Step 3: sole leaf directly under the root.
                self.entry = Ref::None;
                self.free_slot(idx);
                false
            }
            UpRef::Node(p_idx) => {
                // Step 4: sole leaf under a non-root parent; reparent the sibling.
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

                // Step 5: branch-role donation, if `idx` was ALSO serving as a
                // branch at a point in the tree distinct from the one just
                // resolved above. The common case is `p_idx == idx`: a node
                // created by an earlier split always has its own leaf
                // reached through itself (leaf_parent = Node(self)), so the
                // sibling-promotion above already retired that same branch
                // role in full and no donor is needed. A *different* branch
                // role can only survive past that promotion when `idx` is a
                // node that inherited an external leaf-parent from a
                // deletion elsewhere (a promoted duplicate whose donated
                // branch role points at a third node) — there, `p_idx != idx`
                // and donation must run.
                if p_idx == idx {
                    self.free_slot(idx);
                } else if donor_position != 0 {
                    self.donate_branch_role(idx, p_idx, donor_position, donor_left, donor_right, donor_branch_parent);
                    self.free_slot(idx);
                } else {
                    self.free_slot(p_idx);
                    self.free_slot(idx);
                }
                true
            }
            UpRef::None => unreachable!("head always has a leaf_parent"),
        }
    }

    /// Rewrites whichever slot currently holds `old` (the tree's entry, or a
    /// specific side of a branch node) to hold `new` instead.
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

    /// Recursively walks the tree checking every invariant of the data
    /// model. Diagnostic only; never called by the operational surface.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if let Ref::Branch(i) = self.entry {
            if self.nodes[i as usize].branch_parent != UpRef::Root {
                return Err(InvariantViolation::ParentChildMismatch {
                    parent: NodeId(i),
                    child: NodeId(i),
                });
            }
        }
        self.validate_subtree(self.entry, i32::MAX)?;
        Ok(())
    }

    fn validate_subtree(&self, r: Ref, max_position: i32) -> Result<(), InvariantViolation> {
        let i = match r {
            Ref::None => return Ok(()),
            Ref::Leaf(i) => {
                self.validate_dup_list(i)?;
                return Ok(());
            }
            Ref::Branch(i) => i,
        };
        let node = &self.nodes[i as usize];
        if node.position >= max_position || node.position <= 0 {
            return Err(InvariantViolation::PositionNotDecreasing { parent: NodeId(i), child: NodeId(i) });
        }
        if node.left == node.right {
            return Err(InvariantViolation::NonRootBothChildrenNull { node: NodeId(i) });
        }
        let bit = (node.position - 1) as u32;
        self.check_side_bits(node.left, i, bit, false)?;
        self.check_side_bits(node.right, i, bit, true)?;
        self.validate_subtree(node.left, node.position)?;
        self.validate_subtree(node.right, node.position)?;
        Ok(())
    }

    fn check_side_bits(&self, r: Ref, branch: u32, bit: u32, expected: bool) -> Result<(), InvariantViolation> {
        let mut values = Vec::new();
        self.collect_values(r, &mut values);
        for v in values {
            let got = (v >> bit) & 1 == 1;
            if got != expected {
                return Err(InvariantViolation::BranchBitMismatch {
                    branch: NodeId(branch),
                    child: NodeId(branch),
                    expected_bit: expected,
                });
            }
        }
        Ok(())
    }

    fn collect_values(&self, r: Ref, out: &mut Vec<u32>) {
        match r {
            Ref::None => {}
            Ref::Leaf(i) => {
                let mut cur = i;
                loop {
                    out.push(self.nodes[cur as usize].value);
                    cur = self.nodes[cur as usize].dup_next;
                    if cur == i {
                        break;
                    }
                }
            }
            Ref::Branch(i) => {
                let node = &self.nodes[i as usize];
                self.collect_values(node.left, out);
                self.collect_values(node.right, out);
            }
        }
    }

    fn validate_dup_list(&self, head: u32) -> Result<(), InvariantViolation> {
        if self.nodes[head as usize].leaf_parent == UpRef::None {
            return Err(InvariantViolation::DuplicateListMalformed { head: NodeId(head) });
        }
        let mut cur = self.nodes[head as usize].dup_next;
        while cur != head {
            if self.nodes[cur as usize].leaf_parent != UpRef::None {
                return Err(InvariantViolation::DuplicateListMalformed { head: NodeId(head) });
            }
            if self.nodes[cur as usize].value != self.nodes[head as usize].value {
                return Err(InvariantViolation::DuplicateListMalformed { head: NodeId(head) });
            }
            cur = self.nodes[cur as usize].dup_next;
        }
        Ok(())
    }
}
