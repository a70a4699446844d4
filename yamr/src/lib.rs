// Life of a write:
// 1. `Tree::set` descends from the root, loading absent nodes on the way
// 2. The leaf takes the entry; a full leaf splits and hands its upper half
//    back to the parent, which may split in turn
// 3. A split of the root grows the tree by one level
// 4. `Tree::commit` appends every changed node, children first, then
//    anchors the new root in the superblock
//
// System components:
//  - Chunk store (framed records + superblock)
//  - Copy-on-write B+-tree
//  - String-list database on top of the tree

pub mod btree;
pub mod config;
mod database;
pub mod storage;

#[cfg(test)]
mod e2e_tests;

pub use btree::{Tree, TreeError};
pub use database::{Database, DatabaseError};
pub use storage::{ChunkError, ChunkFile, ChunkId, ChunkStore, MemoryChunkStore};
