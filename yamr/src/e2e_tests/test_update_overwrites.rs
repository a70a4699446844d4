//! Test that updates replace values without adding entries.

use crate::e2e_tests::helpers::*;

#[test]
fn test_updates_across_splits() {
    let mut tree = memory_tree(4);
    fill(&mut tree, 0..64);

    for i in (0..64).step_by(3) {
        let previous = tree.set(key(i), format!("updated{i}")).expect("update");
        assert_eq!(previous, Some(value(i).into_bytes()));
    }

    assert_eq!(tree.len(), 64);
    for i in 0..64 {
        let expected = if i % 3 == 0 {
            format!("updated{i}")
        } else {
            value(i)
        };
        assert_eq!(tree.get(key(i).as_bytes()).expect("get"), expected.as_bytes());
    }
    tree.verify().expect("verify");
}

#[test]
fn test_update_after_reopen() {
    let mut tree = memory_tree(4);
    fill(&mut tree, 0..30);
    tree.commit().expect("commit");

    let mut reopened = reopen(tree);
    let previous = reopened.set(key(12), "fresh").expect("update");
    assert_eq!(previous, Some(value(12).into_bytes()));
    reopened.commit().expect("commit");

    let mut again = reopen(reopened);
    assert_eq!(again.len(), 30);
    assert_eq!(again.get(key(12).as_bytes()).expect("get"), b"fresh");
}
