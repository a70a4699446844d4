//! Common helpers for end-to-end tests.

use std::path::PathBuf;

use tempfile::TempDir;

use crate::btree::{DEFAULT_BRANCHING_FACTOR, Tree};
use crate::storage::{ChunkStore, MemoryChunkStore};

/// A scratch directory holding one chunk file, removed on drop.
pub struct TestFile {
    _dir: TempDir,
    pub path: PathBuf,
}

impl TestFile {
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("tree.db");
        Self { _dir: dir, path }
    }
}

/// Zero-padded key so that byte order matches numeric order.
#[must_use]
pub fn key(i: u32) -> String {
    format!("key{i:05}")
}

#[must_use]
pub fn value(i: u32) -> String {
    format!("value{i}")
}

/// An empty in-memory tree.
#[must_use]
pub fn memory_tree(max_size: usize) -> Tree<MemoryChunkStore> {
    Tree::create(MemoryChunkStore::new(), max_size).expect("create tree")
}

/// Insert `key(i) → value(i)` for every `i`.
pub fn fill<S: ChunkStore>(tree: &mut Tree<S>, ids: impl IntoIterator<Item = u32>) {
    for i in ids {
        tree.set(key(i), value(i)).expect("set");
    }
}

/// Every entry in iteration order.
pub fn entries<S: ChunkStore>(tree: &mut Tree<S>) -> Vec<(Vec<u8>, Vec<u8>)> {
    tree.iter()
        .collect::<Result<_, _>>()
        .expect("iterate")
}

/// Every key in iteration order, as strings.
pub fn keys<S: ChunkStore>(tree: &mut Tree<S>) -> Vec<String> {
    tree.keys()
        .map(|key| String::from_utf8(key.expect("iterate")).expect("utf-8 key"))
        .collect()
}

/// Simulate a restart: take the committed image and open a fresh tree on it.
pub fn reopen(tree: Tree<MemoryChunkStore>) -> Tree<MemoryChunkStore> {
    reopen_image(tree.into_store().into_bytes())
}

pub fn reopen_image(image: Vec<u8>) -> Tree<MemoryChunkStore> {
    let store = MemoryChunkStore::from_bytes(image).expect("reopen store");
    Tree::open(store, DEFAULT_BRANCHING_FACTOR).expect("open tree")
}
