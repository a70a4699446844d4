//! Ordered iteration over a tree.
//!
//! Nodes keep no sibling links, so the cursor works one leaf at a time: it
//! copies out the entries of the leaf a bound routes to, together with the
//! fence key (the nearest separator above that leaf), and once the batch is
//! drained it descends again from the fence.

use std::collections::VecDeque;
use std::iter::FusedIterator;

use crate::btree::error::TreeError;
use crate::btree::tree::Tree;
use crate::storage::ChunkStore;

/// Entries copied out of one leaf.
#[derive(Debug, Default)]
pub struct LeafBatch {
    /// Entries at or above the requested bound, ascending.
    pub entries: Vec<(Vec<u8>, Vec<u8>)>,
    /// Smallest key of the next leaf's range; `None` for the last leaf.
    pub fence: Option<Vec<u8>>,
}

/// Ascending iterator over `(key, value)` pairs.
///
/// Yields an error at most once; iteration stops after it.
pub struct Iter<'a, S: ChunkStore> {
    tree: &'a mut Tree<S>,
    buffered: VecDeque<(Vec<u8>, Vec<u8>)>,
    resume: Option<Vec<u8>>,
}

impl<'a, S: ChunkStore> Iter<'a, S> {
    pub(crate) fn new(tree: &'a mut Tree<S>, start: Vec<u8>) -> Self {
        Self {
            tree,
            buffered: VecDeque::new(),
            resume: Some(start),
        }
    }
}

impl<S: ChunkStore> Iterator for Iter<'_, S> {
    type Item = Result<(Vec<u8>, Vec<u8>), TreeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.buffered.pop_front() {
                return Some(Ok(entry));
            }

            let bound = self.resume.take()?;
            match self.tree.leaf_batch(&bound) {
                Ok(batch) => {
                    self.buffered = batch.entries.into();
                    self.resume = batch.fence;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl<S: ChunkStore> FusedIterator for Iter<'_, S> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryChunkStore;

    fn tree_with(keys: &[&str], max_size: usize) -> Tree<MemoryChunkStore> {
        let mut tree = Tree::create(MemoryChunkStore::new(), max_size).expect("create");
        for key in keys {
            tree.set(key.as_bytes(), format!("v{key}").as_bytes())
                .expect("set");
        }
        tree
    }

    #[test]
    fn test_empty_tree_yields_nothing() {
        let mut tree = tree_with(&[], 4);
        assert_eq!(tree.iter().count(), 0);
    }

    #[test]
    fn test_walks_across_leaves() {
        let keys = ["d", "a", "f", "c", "b", "e", "h", "g"];
        let mut tree = tree_with(&keys, 3);
        assert!(tree.height().expect("height") > 2);

        let entries: Vec<(Vec<u8>, Vec<u8>)> = tree
            .iter()
            .collect::<Result<_, _>>()
            .expect("iterate");

        let mut expected: Vec<(Vec<u8>, Vec<u8>)> = keys
            .iter()
            .map(|k| (k.as_bytes().to_vec(), format!("v{k}").into_bytes()))
            .collect();
        expected.sort();
        assert_eq!(entries, expected);
    }

    #[test]
    fn test_iter_from_starts_mid_tree() {
        let mut tree = tree_with(&["a", "b", "c", "d", "e", "f"], 3);

        let keys: Vec<Vec<u8>> = tree
            .iter_from(b"cc")
            .map(|entry| entry.map(|(k, _)| k))
            .collect::<Result<_, _>>()
            .expect("iterate");
        assert_eq!(keys, vec![b"d".to_vec(), b"e".to_vec(), b"f".to_vec()]);
    }

    #[test]
    fn test_restartable() {
        let mut tree = tree_with(&["x", "y", "z"], 4);

        let first: Vec<_> = tree.keys().collect::<Result<_, _>>().expect("first");
        let second: Vec<_> = tree.keys().collect::<Result<_, _>>().expect("second");
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }
}
