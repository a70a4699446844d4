//! The copy-on-write B+-tree.
//!
//! Mutations happen in memory; `commit` appends every changed node to the
//! chunk store (children before parents) and then anchors the new root in
//! the superblock. Nothing is ever overwritten in place, so the previously
//! committed tree stays intact until the superblock points elsewhere.

use crate::btree::error::TreeError;
use crate::btree::iter::{Iter, LeafBatch};
use crate::btree::leaf::Leaf;
use crate::btree::node::Node;
use crate::btree::node_ref::{InsertResult, NodeRef, Split, TreeNode, Verified};
use crate::storage::ChunkStore;

/// Smallest branching factor that still leaves both halves of a split
/// non-empty.
pub const MIN_BRANCHING_FACTOR: usize = 3;

/// Branching factor used when none is configured.
pub const DEFAULT_BRANCHING_FACTOR: usize = 1024;

/// An ordered map from byte keys to byte values, persisted to a chunk store.
pub struct Tree<S: ChunkStore> {
    store: S,
    root: NodeRef,
    max_size: usize,
    len: u64,
}

impl<S: ChunkStore> Tree<S> {
    /// Create an empty tree on `store`.
    ///
    /// Any root already committed to `store` is superseded by the next
    /// `commit`.
    pub fn create(store: S, max_size: usize) -> Result<Self, TreeError> {
        check_branching_factor(max_size)?;
        tracing::info!("created tree with max_size {max_size}");

        Ok(Self {
            store,
            root: NodeRef::new(TreeNode::Leaf(Leaf::new())),
            max_size,
            len: 0,
        })
    }

    /// Open the tree last committed to `store`, or an empty one if nothing
    /// was ever committed.
    ///
    /// The branching factor recorded at commit time takes precedence over
    /// `max_size`.
    pub fn open(store: S, max_size: usize) -> Result<Self, TreeError> {
        check_branching_factor(max_size)?;

        let superblock = *store.superblock();
        if !superblock.has_root() {
            return Self::create(store, max_size);
        }

        let stored = usize::try_from(superblock.max_size).unwrap_or(usize::MAX);
        check_branching_factor(stored)?;
        if stored != max_size {
            tracing::warn!("requested max_size {max_size}, using committed max_size {stored}");
        }

        tracing::info!(
            "opened tree at generation {} with {} entries (root at offset {})",
            superblock.generation,
            superblock.entry_count,
            superblock.root_offset
        );

        Ok(Self {
            store,
            root: NodeRef::absent(superblock.root_offset),
            max_size: stored,
            len: superblock.entry_count,
        })
    }

    /// Look up a value by key.
    pub fn get(&mut self, key: &[u8]) -> Result<Vec<u8>, TreeError> {
        self.root
            .resolve(&mut self.store)?
            .get(key, &mut self.store)
            .map(<[u8]>::to_vec)
    }

    /// Whether `key` is present.
    pub fn contains_key(&mut self, key: &[u8]) -> Result<bool, TreeError> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(TreeError::KeyNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Insert or update a key-value pair.
    ///
    /// Returns the old value if updating, None if inserting.
    pub fn set(
        &mut self,
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Result<Option<Vec<u8>>, TreeError> {
        let InsertResult { previous, split } = self.root.resolve(&mut self.store)?.insert(
            key.into(),
            value.into(),
            self.max_size,
            &mut self.store,
        )?;

        if previous.is_none() {
            self.len += 1;
        }
        if let Some(split) = split {
            self.grow(split);
        }

        Ok(previous)
    }

    /// Replace the root with a node over the old root and its new sibling.
    fn grow(&mut self, split: Split) {
        tracing::debug!("root split at {:?}", String::from_utf8_lossy(&split.key));

        let old_root = std::mem::replace(&mut self.root, NodeRef::absent(0));
        self.root = NodeRef::new(TreeNode::Node(Node::with_root_split(old_root, split)));
    }

    /// Remove a key. Deletion is not supported.
    #[allow(clippy::unused_self, clippy::needless_pass_by_ref_mut)]
    pub fn delete(&mut self, key: &[u8]) -> Result<Vec<u8>, TreeError> {
        tracing::debug!("rejected delete of {:?}", String::from_utf8_lossy(key));
        Err(TreeError::NotImplemented("delete"))
    }

    /// Persist every change since the last commit and anchor the new root.
    ///
    /// Returns the offset of the committed root. A commit with nothing to
    /// write leaves the store untouched.
    pub fn commit(&mut self) -> Result<u64, TreeError> {
        let root_offset = self.root.commit(&mut self.store)?;

        let current = *self.store.superblock();
        let unchanged = current.has_root()
            && current.root_offset == root_offset
            && current.entry_count == self.len;
        if unchanged {
            tracing::debug!("nothing to commit");
            return Ok(root_offset);
        }

        let max_size = u32::try_from(self.max_size)
            .map_err(|_| TreeError::InvalidBranchingFactor(self.max_size))?;

        // Records must be durable before the superblock can point at them.
        self.store.sync()?;
        let next = current.advance(root_offset, self.len, max_size);
        self.store.write_superblock(next)?;
        self.store.sync()?;

        tracing::debug!(
            "committed generation {} with {} entries (root at offset {root_offset})",
            next.generation,
            self.len
        );
        Ok(root_offset)
    }

    /// Iterate over all entries in key order.
    pub fn iter(&mut self) -> Iter<'_, S> {
        Iter::new(self, Vec::new())
    }

    /// Iterate over entries with key `>= start` in key order.
    pub fn iter_from(&mut self, start: &[u8]) -> Iter<'_, S> {
        Iter::new(self, start.to_vec())
    }

    /// Iterate over all keys in order.
    pub fn keys(&mut self) -> impl Iterator<Item = Result<Vec<u8>, TreeError>> + '_ {
        self.iter().map(|entry| entry.map(|(key, _)| key))
    }

    pub(crate) fn leaf_batch(&mut self, bound: &[u8]) -> Result<LeafBatch, TreeError> {
        self.root
            .resolve(&mut self.store)?
            .leaf_batch(bound, &mut self.store)
    }

    /// Number of entries.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of levels, counting the leaves. A lone leaf root has height 1.
    pub fn height(&mut self) -> Result<usize, TreeError> {
        self.root.resolve(&mut self.store)?.height(&mut self.store)
    }

    /// Walk the whole tree, checking key order, node ranges, bucket sizes,
    /// balance and the entry count.
    pub fn verify(&mut self) -> Result<Verified, TreeError> {
        let max_size = self.max_size;
        let verified = self
            .root
            .resolve(&mut self.store)?
            .verify(&mut self.store, None, None, max_size)?;

        if verified.entries != self.len {
            return Err(TreeError::OverflowInvariantViolation(format!(
                "tree holds {} entries but counts {}",
                verified.entries, self.len
            )));
        }
        Ok(verified)
    }

    /// Drop clean, persisted nodes from memory. They are reloaded on demand.
    ///
    /// Returns the number of references evicted.
    pub fn evict(&mut self) -> usize {
        let evicted = self.root.evict();
        tracing::debug!("evicted {evicted} node references");
        evicted
    }

    /// Offset of the last committed root, if any.
    #[must_use]
    pub fn root_offset(&self) -> Option<u64> {
        let superblock = self.store.superblock();
        superblock.has_root().then_some(superblock.root_offset)
    }

    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Give up the tree, returning its store. Uncommitted changes are lost.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }
}

fn check_branching_factor(max_size: usize) -> Result<(), TreeError> {
    if max_size < MIN_BRANCHING_FACTOR || u32::try_from(max_size).is_err() {
        return Err(TreeError::InvalidBranchingFactor(max_size));
    }
    Ok(())
}
