//! Seeded-RNG fuzz harness for both tree variants, checked against a naive
//! reference model after every mutation.

use ebtree::{ByteTree, Int32Tree, NodeId};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Reference model for [`Int32Tree`]: a plain `Vec` kept in insertion order
/// per key, compared against the tree's traversal order after every op.
#[derive(Default)]
struct IntModel {
    live: Vec<(u32, NodeId)>,
}

impl IntModel {
    fn insert(&mut self, tree: &mut Int32Tree, value: u32) {
        let id = tree.insert(value);
        self.live.push((value, id));
    }

    fn delete_random(&mut self, tree: &mut Int32Tree, rng: &mut SmallRng) -> bool {
        if self.live.is_empty() {
            return true;
        }
        let pick = rng.gen_range(0..self.live.len());
        let (_, id) = self.live.remove(pick);
        tree.delete(id)
    }

    /// Expected sorted (key, insertion-order) pairs.
    fn expected_order(&self) -> Vec<u32> {
        let mut pairs: Vec<(u32, usize)> = self
            .live
            .iter()
            .enumerate()
            .map(|(seq, (k, _))| (*k, seq))
            .collect();
        pairs.sort();
        pairs.into_iter().map(|(k, _)| k).collect()
    }
}

fn check_int_traversal(tree: &Int32Tree, model: &IntModel) {
    let mut got = Vec::new();
    let mut cur = tree.first();
    while let Some(id) = cur {
        got.push(tree.value(id));
        cur = tree.next(id);
    }
    assert_eq!(got, model.expected_order());

    // Reverse traversal must be the exact mirror.
    let mut rev = Vec::new();
    let mut cur = tree.last();
    while let Some(id) = cur {
        rev.push(tree.value(id));
        cur = tree.prev(id);
    }
    rev.reverse();
    assert_eq!(rev, got);
}

#[test]
fn fuzz_int32_insert_delete() {
    let mut rng = SmallRng::seed_from_u64(0xe6_7722);
    for _trial in 0..40 {
        let mut tree = Int32Tree::new();
        let mut model = IntModel::default();

        for _ in 0..400 {
            if model.live.is_empty() || rng.gen_bool(0.65) {
                let value = rng.gen_range(0..64u32); // narrow range to force duplicates
                model.insert(&mut tree, value);
            } else {
                let non_empty = model.delete_random(&mut tree, &mut rng);
                assert_eq!(non_empty, !tree.is_empty());
            }
            tree.validate().expect("invariants hold after every mutation");
            check_int_traversal(&tree, &model);

            for &(key, _) in &model.live {
                assert!(tree.lookup(key).is_some(), "lookup({key}) should hit while present");
            }
        }

        // Drain everything; tree must end up empty.
        while !model.live.is_empty() {
            let non_empty = model.delete_random(&mut tree, &mut rng);
            tree.validate().expect("invariants hold mid-drain");
            assert_eq!(non_empty, !model.live.is_empty());
        }
        assert!(tree.is_empty());
        assert!(tree.first().is_none());
    }
}

/// Encodes `n` as a big-endian byte string of exactly `len` bytes (`len` is
/// assumed `<= 4` for these tests), so numeric order matches lexicographic
/// byte order.
fn key_of(n: u32, len: usize) -> Box<[u8]> {
    let be = n.to_be_bytes();
    let mut k = vec![0u8; len];
    k.copy_from_slice(&be[4 - len..]);
    k.into_boxed_slice()
}

#[derive(Default)]
struct ByteModel {
    live: Vec<(Box<[u8]>, NodeId)>,
}

impl ByteModel {
    fn expected_order(&self) -> Vec<Box<[u8]>> {
        let mut pairs: Vec<(Box<[u8]>, usize)> =
            self.live.iter().enumerate().map(|(seq, (k, _))| (k.clone(), seq)).collect();
        pairs.sort();
        pairs.into_iter().map(|(k, _)| k).collect()
    }
}

fn check_byte_traversal(tree: &ByteTree, model: &ByteModel) {
    let mut got = Vec::new();
    let mut cur = tree.first();
    while let Some(id) = cur {
        got.push(tree.key(id).to_vec().into_boxed_slice());
        cur = tree.next(id);
    }
    assert_eq!(got, model.expected_order());
}

#[test]
fn fuzz_bytes_insert_delete_non_unique() {
    let mut rng = SmallRng::seed_from_u64(0x5ca1e);
    let key_len = 3;

    for _trial in 0..40 {
        let mut tree = ByteTree::new(key_len);
        let mut model = ByteModel::default();

        for _ in 0..300 {
            if model.live.is_empty() || rng.gen_bool(0.65) {
                let n = rng.gen_range(0..40u32);
                let key = key_of(n, key_len);
                let outcome = tree.insert(&key);
                model.live.push((key, outcome.node()));
            } else {
                let pick = rng.gen_range(0..model.live.len());
                let (_, id) = model.live.remove(pick);
                tree.delete(id);
            }
            tree.validate().expect("byte-tree invariants hold after every mutation");
            check_byte_traversal(&tree, &model);

            for (key, _) in &model.live {
                assert!(tree.lookup(key).is_some(), "lookup should hit while present");
            }
        }

        while !model.live.is_empty() {
            let pick = rng.gen_range(0..model.live.len());
            let (_, id) = model.live.remove(pick);
            tree.delete(id);
            tree.validate().expect("byte-tree invariants hold mid-drain");
        }
        assert!(tree.is_empty());
    }
}

#[test]
fn fuzz_bytes_unique_rejects_duplicates() {
    let mut rng = SmallRng::seed_from_u64(0xface_feed);
    let key_len = 2;
    let mut tree = ByteTree::new_unique(key_len);
    let mut seen = std::collections::HashSet::new();

    for _ in 0..200 {
        let n = rng.gen_range(0..20u32);
        let key = key_of(n, key_len);
        let outcome = tree.insert(&key);
        if seen.insert(key.clone()) {
            assert!(outcome.was_inserted());
        } else {
            assert!(!outcome.was_inserted());
        }
        tree.validate().expect("unique byte-tree invariants hold");
    }
    assert_eq!(tree.len(), seen.len());
}
