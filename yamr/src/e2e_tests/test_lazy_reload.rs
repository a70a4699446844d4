//! Test that evicted nodes load back transparently.

use crate::e2e_tests::helpers::*;

#[test]
fn test_evict_everything_then_enumerate() {
    let mut tree = memory_tree(5);
    fill(&mut tree, 0..200);
    let before = entries(&mut tree);

    tree.commit().expect("commit");

    // A clean, committed root is evicted as a whole
    assert_eq!(tree.evict(), 1);
    assert_eq!(tree.evict(), 0);

    assert_eq!(entries(&mut tree), before);
}

#[test]
fn test_dirty_path_stays_resident() {
    let mut tree = memory_tree(5);
    fill(&mut tree, 0..200);
    tree.commit().expect("commit");

    // Dirty the path to one leaf; everything hanging off it can still go
    tree.set(key(100), "changed").expect("set");
    let evicted = tree.evict();
    assert!(evicted > 1, "evicted {evicted}");

    assert_eq!(tree.get(key(100).as_bytes()).expect("get"), b"changed");
    assert_eq!(tree.get(key(7).as_bytes()).expect("get"), value(7).as_bytes());
    tree.verify().expect("verify");
}

#[test]
fn test_writes_after_eviction_commit_cleanly() {
    let mut tree = memory_tree(4);
    fill(&mut tree, 0..50);
    tree.commit().expect("commit");
    tree.evict();

    fill(&mut tree, 50..100);
    tree.commit().expect("commit");

    let mut reopened = reopen(tree);
    assert_eq!(reopened.len(), 100);
    assert_eq!(keys(&mut reopened), (0..100).map(key).collect::<Vec<_>>());
    reopened.verify().expect("verify");
}
