//! Test operations on a tree with no entries.

use crate::btree::TreeError;
use crate::e2e_tests::helpers::*;

#[test]
fn test_empty_tree_lookups() {
    let mut tree = memory_tree(4);

    assert!(tree.is_empty());
    assert!(matches!(tree.get(b"x"), Err(TreeError::KeyNotFound(_))));
    assert!(matches!(
        tree.delete(b"x"),
        Err(TreeError::NotImplemented(_))
    ));
    assert!(keys(&mut tree).is_empty());
}

#[test]
fn test_empty_tree_commit_and_reopen() {
    let mut tree = memory_tree(4);
    let root = tree.commit().expect("commit");
    assert_eq!(tree.root_offset(), Some(root));

    let mut reopened = reopen(tree);
    assert!(reopened.is_empty());
    assert_eq!(reopened.height().expect("height"), 1);
    assert!(entries(&mut reopened).is_empty());
}

#[test]
fn test_delete_after_inserts_is_rejected() {
    let mut tree = memory_tree(4);
    fill(&mut tree, 0..10);

    assert!(matches!(
        tree.delete(key(3).as_bytes()),
        Err(TreeError::NotImplemented("delete"))
    ));
    // Nothing was removed
    assert_eq!(tree.get(key(3).as_bytes()).expect("get"), value(3).as_bytes());
    assert_eq!(tree.len(), 10);
}
