//! Test persistence through a real chunk file.

use crate::btree::Tree;
use crate::e2e_tests::helpers::*;
use crate::storage::{ChunkFile, ChunkStore};

#[test]
fn test_reopen_file() {
    let test = TestFile::new();

    let expected = {
        let file = ChunkFile::create(&test.path).expect("create file");
        let mut tree = Tree::create(file, 8).expect("create tree");
        fill(&mut tree, (0..300).rev());
        tree.commit().expect("commit");
        entries(&mut tree)
    };

    let file = ChunkFile::open(&test.path).expect("open file");
    let mut tree = Tree::open(file, 8).expect("open tree");

    assert_eq!(tree.len(), 300);
    assert_eq!(entries(&mut tree), expected);
    tree.verify().expect("verify");
}

#[test]
fn test_generations_accumulate() {
    let test = TestFile::new();

    for round in 0..3u32 {
        let file = ChunkFile::open_or_create(&test.path).expect("open file");
        let mut tree = Tree::open(file, 4).expect("open tree");
        fill(&mut tree, round * 10..(round + 1) * 10);
        tree.commit().expect("commit");
        assert_eq!(tree.store().superblock().generation, u64::from(round) + 1);
    }

    let file = ChunkFile::open(&test.path).expect("open file");
    let mut tree = Tree::open(file, 4).expect("open tree");
    assert_eq!(keys(&mut tree), (0..30).map(key).collect::<Vec<_>>());
}

#[test]
fn test_file_grows_append_only() {
    let test = TestFile::new();
    let file = ChunkFile::create(&test.path).expect("create file");
    let mut tree = Tree::create(file, 4).expect("create tree");

    fill(&mut tree, 0..20);
    tree.commit().expect("commit");
    let first_len = tree.store().len();

    tree.set(key(5), "again").expect("set");
    tree.commit().expect("commit");
    let second_len = tree.store().len();

    assert!(second_len > first_len);
    assert_eq!(
        std::fs::metadata(&test.path).expect("metadata").len(),
        second_len
    );
}
