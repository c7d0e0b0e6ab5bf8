//! Focused regression tests for the six concrete scenarios worked through in
//! the specification, alongside the randomized coverage in `fuzzer.rs`.

use ebtree::{ByteTree, Int32Tree};

fn collect_forward(tree: &Int32Tree) -> Vec<u32> {
    let mut out = Vec::new();
    let mut cur = tree.first();
    while let Some(id) = cur {
        out.push(tree.value(id));
        cur = tree.next(id);
    }
    out
}

#[test]
fn scenario_ascending_insert_and_teardown() {
    let mut tree = Int32Tree::new();
    let ids: Vec<_> = [8u32, 10, 12, 13, 14].iter().map(|&v| tree.insert(v)).collect();

    assert_eq!(tree.value(tree.first().unwrap()), 8);
    assert_eq!(collect_forward(&tree), vec![8, 10, 12, 13, 14]);

    let found = tree.lookup(12).expect("12 must be present");
    assert_eq!(tree.value(found), 12);

    for &id in ids.iter().rev() {
        tree.validate().unwrap();
        tree.delete(id);
    }
    assert!(tree.is_empty());
}

#[test]
fn scenario_duplicate_integers() {
    let mut tree = Int32Tree::new();
    let a = tree.insert(5);
    let b = tree.insert(5);
    let c = tree.insert(5);

    assert_eq!(tree.first(), Some(a));
    assert_eq!(tree.next(a), Some(b));
    assert_eq!(tree.next(b), Some(c));
    assert_eq!(tree.next(c), None);

    tree.delete(a);
    tree.validate().unwrap();
    assert_eq!(tree.lookup(5), Some(b));
    assert_eq!(tree.first(), Some(b));
    assert_eq!(tree.next(b), Some(c));
    assert_eq!(tree.next(c), None);
}

#[test]
fn scenario_root_adjacent_deletion() {
    let mut tree = Int32Tree::new();
    let id = tree.insert(42);
    let non_empty = tree.delete(id);
    assert!(!non_empty);
    assert!(tree.is_empty());

    let id2 = tree.insert(42);
    assert_eq!(tree.lookup(42), Some(id2));
}

#[test]
fn scenario_branch_donation() {
    let mut tree = Int32Tree::new();
    let ids: Vec<_> = [0u32, 1, 3, 7].iter().map(|&v| tree.insert(v)).collect();
    tree.validate().unwrap();

    // `1` also serves as the branch discriminating it from `0`.
    let one = ids[1];
    tree.delete(one);
    tree.validate().expect("invariants hold after branch-role self-resolution");
    assert_eq!(collect_forward(&tree), vec![0, 3, 7]);
}

fn padded(s: &str, len: usize) -> Box<[u8]> {
    let mut v = s.as_bytes().to_vec();
    v.resize(len, 0);
    v.into_boxed_slice()
}

fn collect_byte_forward(tree: &ByteTree) -> Vec<Box<[u8]>> {
    let mut out = Vec::new();
    let mut cur = tree.first();
    while let Some(id) = cur {
        out.push(tree.key(id).to_vec().into_boxed_slice());
        cur = tree.next(id);
    }
    out
}

#[test]
fn scenario_byte_string_keys() {
    let mut tree = ByteTree::new(6);
    for word in ["apple", "apply", "banana", "band"] {
        tree.insert(&padded(word, 6));
    }

    let first = tree.first().unwrap();
    assert_eq!(tree.key(first), padded("apple", 6).as_ref());
    assert_eq!(
        collect_byte_forward(&tree),
        vec![padded("apple", 6), padded("apply", 6), padded("banana", 6), padded("band", 6)]
    );

    let hit = tree.lookup(&padded("apply", 6)).expect("apply must be found");
    assert_eq!(tree.key(hit), padded("apply", 6).as_ref());
}

#[test]
fn scenario_byte_string_unique_rejects_duplicate() {
    let mut tree = ByteTree::new_unique(6);
    for word in ["apple", "apply", "banana", "band"] {
        tree.insert(&padded(word, 6));
    }
    let original = tree.lookup(&padded("apple", 6)).unwrap();

    let outcome = tree.insert(&padded("apple", 6));
    assert!(!outcome.was_inserted());
    assert_eq!(outcome.node(), original);
    assert_eq!(collect_byte_forward(&tree).len(), 4);
}

#[test]
fn scenario_byte_string_duplicate_subtree() {
    let mut tree = ByteTree::new(1);
    let key = b"x";
    let a = tree.insert(key).node();
    let b = tree.insert(key).node();
    let c = tree.insert(key).node();
    tree.validate().expect("duplicate-subtree anchor satisfies invariants");

    let found = tree.lookup(key).expect("lookup walks the anchor's left spine");
    assert_eq!(found, a);
    assert_eq!(tree.next(a), Some(b));
    assert_eq!(tree.next(b), Some(c));
    assert_eq!(tree.next(c), None);
}
