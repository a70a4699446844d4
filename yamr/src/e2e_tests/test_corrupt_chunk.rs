//! Test that damaged records surface as corruption instead of bad data.

use crate::btree::TreeError;
use crate::e2e_tests::helpers::*;
use crate::storage::{ChunkStore, REGION_SIZE};

#[test]
fn test_flipped_root_byte() {
    let mut tree = memory_tree(4);
    fill(&mut tree, 0..16);
    let root = tree.commit().expect("commit");

    let mut image = tree.into_store().into_bytes();
    // First payload byte of the root record
    let at = usize::try_from(root).expect("fits") + 5;
    image[at] ^= 0xFF;

    // Opening is lazy, so the damage shows on first access
    let mut reopened = reopen_image(image);
    assert!(matches!(
        reopened.get(key(3).as_bytes()),
        Err(TreeError::CorruptChunk { offset, .. }) if offset == root
    ));
}

#[test]
fn test_flipped_leaf_byte_spares_other_leaves() {
    let mut tree = memory_tree(4);
    fill(&mut tree, 0..16);
    tree.commit().expect("commit");

    let mut image = tree.into_store().into_bytes();
    // The first record after the superblock region is the leftmost leaf
    let at = usize::try_from(REGION_SIZE).expect("fits") + 6;
    image[at] ^= 0x55;

    let mut reopened = reopen_image(image);
    assert!(matches!(
        reopened.get(key(0).as_bytes()),
        Err(TreeError::CorruptChunk { offset, .. }) if offset == REGION_SIZE
    ));
    assert_eq!(reopened.get(key(15).as_bytes()).expect("get"), value(15).as_bytes());
}

#[test]
fn test_iteration_stops_at_corruption() {
    let mut tree = memory_tree(4);
    fill(&mut tree, 0..16);
    tree.commit().expect("commit");

    let mut image = tree.into_store().into_bytes();
    let at = usize::try_from(REGION_SIZE).expect("fits") + 6;
    image[at] ^= 0x55;

    let mut reopened = reopen_image(image);
    let results: Vec<_> = reopened.iter().collect();
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(TreeError::CorruptChunk { .. })));
}

#[test]
fn test_truncated_image() {
    let mut tree = memory_tree(4);
    fill(&mut tree, 0..16);
    tree.commit().expect("commit");
    let root = tree.store().superblock().root_offset;

    let mut image = tree.into_store().into_bytes();
    // Cut the root record short while keeping its start in bounds
    image.truncate(usize::try_from(root).expect("fits") + 3);

    let mut reopened = reopen_image(image);
    assert!(matches!(
        reopened.height(),
        Err(TreeError::CorruptChunk { .. })
    ));
}
