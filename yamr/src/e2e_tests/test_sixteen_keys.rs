//! Test the sixteen-key scenario at a branching factor of four.

use crate::btree::TreeError;
use crate::e2e_tests::helpers::*;

#[test]
fn test_sixteen_keys() {
    let mut tree = memory_tree(4);

    for i in 1..=16 {
        tree.set(i.to_string(), format!("Value{i}")).expect("set");
    }

    // The root is no longer a single leaf
    assert!(tree.height().expect("height") > 1);

    assert_eq!(tree.get(b"1").expect("get"), b"Value1");
    assert!(matches!(
        tree.get(b"17"),
        Err(TreeError::KeyNotFound(key)) if key == b"17"
    ));

    // String order, not numeric order
    let keys = keys(&mut tree);
    assert_eq!(keys.len(), 16);
    assert_eq!(keys.first().map(String::as_str), Some("1"));
    assert_eq!(keys.get(1).map(String::as_str), Some("10"));
    assert_eq!(keys.last().map(String::as_str), Some("9"));

    tree.verify().expect("verify");
}

#[test]
fn test_sixteen_keys_survive_commit() {
    let mut tree = memory_tree(4);
    for i in 1..=16 {
        tree.set(i.to_string(), format!("Value{i}")).expect("set");
    }
    tree.commit().expect("commit");

    let mut reopened = reopen(tree);
    assert_eq!(reopened.len(), 16);
    for i in 1..=16 {
        assert_eq!(
            reopened.get(i.to_string().as_bytes()).expect("get"),
            format!("Value{i}").as_bytes()
        );
    }
}
