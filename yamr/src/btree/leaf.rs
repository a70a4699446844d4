//! Leaf nodes: the key/value pairs themselves.

use prost::Message;

use crate::btree::bucket::{Bucket, check_split};
use crate::btree::error::TreeError;
use crate::btree::iter::LeafBatch;
use crate::btree::node_ref::{InsertResult, NodeRef, Split, TreeNode};
use crate::storage::record::{LeafEntry, LeafRecord};
use crate::storage::{ChunkId, ChunkStore};

/// A leaf B-tree node.
#[derive(Debug, Default)]
pub struct Leaf {
    bucket: Bucket<Vec<u8>>,
    changed: bool,
}

impl Leaf {
    /// Create a new empty, clean leaf.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bucket: Bucket::new(),
            changed: false,
        }
    }

    #[must_use]
    pub const fn is_changed(&self) -> bool {
        self.changed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bucket.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bucket.is_empty()
    }

    /// Get a value by key.
    pub fn get(&self, key: &[u8]) -> Result<&[u8], TreeError> {
        self.bucket
            .get(key)
            .map(Vec::as_slice)
            .ok_or_else(|| TreeError::KeyNotFound(key.to_vec()))
    }

    /// Insert or update an entry, splitting once the leaf fills up.
    pub fn insert(
        &mut self,
        key: Vec<u8>,
        value: Vec<u8>,
        max_size: usize,
    ) -> Result<InsertResult, TreeError> {
        let previous = self.bucket.upsert(key, value);
        self.changed = true;

        let split = if self.bucket.len() < max_size {
            None
        } else {
            Some(self.split(max_size)?)
        };

        Ok(InsertResult { previous, split })
    }

    /// Split the leaf, returning the split key and the new right sibling.
    ///
    /// The upper half moves to the sibling; the split key is its smallest key.
    pub fn split(&mut self, max_size: usize) -> Result<Split, TreeError> {
        let mid = self.bucket.len() / 2;
        let upper = self.bucket.split_off(mid);

        let key = upper
            .first_key()
            .ok_or_else(|| {
                TreeError::OverflowInvariantViolation("upper half of leaf split is empty".into())
            })?
            .to_vec();
        check_split(&self.bucket, &key, &upper, max_size)?;

        let sibling = Self {
            bucket: upper,
            changed: true,
        };

        Ok(Split {
            key,
            sibling: NodeRef::new(TreeNode::Leaf(sibling)),
        })
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.bucket.keys()
    }

    /// Copy out every entry with key `>= bound`.
    #[must_use]
    pub fn entries_from(&self, bound: &[u8]) -> LeafBatch {
        LeafBatch {
            entries: self
                .bucket
                .range_from(bound)
                .map(|(k, v)| (k.to_vec(), v.to_vec()))
                .collect(),
            fence: None,
        }
    }

    /// Append this leaf as a Leaf chunk and mark it clean.
    pub fn commit<S: ChunkStore>(&mut self, store: &mut S) -> Result<u64, TreeError> {
        let record = LeafRecord {
            entries: self
                .bucket
                .iter()
                .map(|(key, value)| LeafEntry {
                    key: key.to_vec(),
                    value: value.to_vec(),
                })
                .collect(),
        };

        let offset = store.append(ChunkId::Leaf, &record.encode_to_vec())?;
        self.changed = false;

        tracing::trace!("wrote leaf with {} entries at offset {offset}", self.len());
        Ok(offset)
    }

    /// Rebuild a clean leaf from its record.
    pub fn from_record(record: LeafRecord) -> Result<Self, &'static str> {
        let entries = record
            .entries
            .into_iter()
            .map(|entry| (entry.key, entry.value))
            .collect();
        let bucket = Bucket::from_sorted(entries).ok_or("leaf keys out of order")?;

        Ok(Self {
            bucket,
            changed: false,
        })
    }
}
