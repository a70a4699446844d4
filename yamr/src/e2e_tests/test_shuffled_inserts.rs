//! Test random insertion orders against a sorted reference.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::e2e_tests::helpers::*;

fn shuffled(count: u32, seed: u64) -> Vec<u32> {
    let mut ids: Vec<u32> = (0..count).collect();
    ids.shuffle(&mut StdRng::seed_from_u64(seed));
    ids
}

#[test]
fn test_shuffled_inserts_stay_ordered() {
    for (seed, max_size) in [(1, 3), (2, 4), (3, 7), (4, 32)] {
        let mut tree = memory_tree(max_size);
        let mut reference = BTreeMap::new();

        for (round, i) in shuffled(500, seed).into_iter().enumerate() {
            tree.set(key(i), value(i)).expect("set");
            reference.insert(key(i).into_bytes(), value(i).into_bytes());

            if round % 100 == 0 {
                tree.verify().expect("verify mid-insert");
            }
        }

        let expected: Vec<(Vec<u8>, Vec<u8>)> = reference.into_iter().collect();
        assert_eq!(entries(&mut tree), expected, "max_size {max_size}");
        assert_eq!(tree.verify().expect("verify").entries, 500);
    }
}

#[test]
fn test_shuffled_inserts_with_periodic_commits() {
    let mut tree = memory_tree(6);

    for (round, i) in shuffled(400, 42).into_iter().enumerate() {
        tree.set(key(i), value(i)).expect("set");
        if round % 37 == 0 {
            tree.commit().expect("commit");
            tree.evict();
        }
    }
    tree.commit().expect("commit");

    let mut reopened = reopen(tree);
    assert_eq!(keys(&mut reopened), (0..400).map(key).collect::<Vec<_>>());
    for i in [0, 199, 399] {
        assert_eq!(reopened.get(key(i).as_bytes()).expect("get"), value(i).as_bytes());
    }
}

#[test]
fn test_iter_from_random_bounds() {
    let mut tree = memory_tree(4);
    fill(&mut tree, shuffled(120, 7));

    for start in [0, 1, 59, 60, 119] {
        let from: Vec<Vec<u8>> = tree
            .iter_from(key(start).as_bytes())
            .map(|entry| entry.expect("iterate").0)
            .collect();
        let expected: Vec<Vec<u8>> = (start..120).map(|i| key(i).into_bytes()).collect();
        assert_eq!(from, expected, "start {start}");
    }

    assert_eq!(tree.iter_from(b"zzz").count(), 0);
}
