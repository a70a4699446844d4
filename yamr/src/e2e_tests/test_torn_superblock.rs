//! Test that a damaged superblock slot falls back to the previous commit.

use crate::e2e_tests::helpers::*;
use crate::storage::{ChunkError, ChunkStore, MemoryChunkStore, SuperblockError};

#[test]
fn test_torn_newest_slot_falls_back() {
    let mut tree = memory_tree(4);
    fill(&mut tree, 0..10);
    tree.commit().expect("first commit");

    fill(&mut tree, 10..20);
    tree.commit().expect("second commit");
    let newest = *tree.store().superblock();

    let mut image = tree.into_store().into_bytes();
    // Damage the slot holding the second commit
    let at = usize::try_from(newest.slot_offset()).expect("fits") + 20;
    image[at] ^= 0xFF;

    let mut reopened = reopen_image(image);
    assert_eq!(reopened.store().superblock().generation, newest.generation - 1);
    assert_eq!(reopened.len(), 10);
    assert_eq!(keys(&mut reopened), (0..10).map(key).collect::<Vec<_>>());
    reopened.verify().expect("verify");
}

#[test]
fn test_both_slots_damaged() {
    let mut tree = memory_tree(4);
    fill(&mut tree, 0..10);
    tree.commit().expect("first commit");
    tree.set(key(99), value(99)).expect("set");
    tree.commit().expect("second commit");

    let mut image = tree.into_store().into_bytes();
    image[0] ^= 0xFF;
    image[64] ^= 0xFF;

    assert!(matches!(
        MemoryChunkStore::from_bytes(image),
        Err(ChunkError::Superblock(SuperblockError::InvalidMagic(_)))
    ));
}

#[test]
fn test_next_commit_overwrites_torn_slot() {
    let mut tree = memory_tree(4);
    fill(&mut tree, 0..10);
    tree.commit().expect("first commit");
    fill(&mut tree, 10..20);
    tree.commit().expect("second commit");
    let newest = *tree.store().superblock();

    let mut image = tree.into_store().into_bytes();
    let at = usize::try_from(newest.slot_offset()).expect("fits") + 20;
    image[at] ^= 0xFF;

    // Recommitting from the fallback reuses the torn slot's generation
    let mut reopened = reopen_image(image);
    fill(&mut reopened, 20..25);
    reopened.commit().expect("commit after fallback");
    assert_eq!(reopened.store().superblock().generation, newest.generation);

    let mut again = reopen(reopened);
    assert_eq!(again.len(), 15);
    assert!(again.contains_key(key(24).as_bytes()).expect("contains"));
    assert!(!again.contains_key(key(15).as_bytes()).expect("contains"));
}
