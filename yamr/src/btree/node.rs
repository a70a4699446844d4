//! Internal B-tree nodes.
//!
//! A node routes keys to its children:
//!
//! ```text
//!            rest        k1          k2
//!   keys:  [.., k1)   [k1, k2)    [k2, ..)
//! ```
//!
//! `rest` always exists; the bucket holds at least one separator.

use prost::Message;

use crate::btree::bucket::{Bucket, check_split};
use crate::btree::error::TreeError;
use crate::btree::iter::LeafBatch;
use crate::btree::node_ref::{InsertResult, NodeRef, Split, TreeNode, Verified, in_range};
use crate::storage::record::{NodeEntry, NodeRecord};
use crate::storage::{ChunkId, ChunkStore};

/// An internal B-tree node.
#[derive(Debug)]
pub struct Node {
    rest: NodeRef,
    bucket: Bucket<NodeRef>,
    changed: bool,
}

/// Which child a key routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Child {
    Rest,
    Entry(usize),
}

impl Node {
    /// Build the new root after the old root split.
    #[must_use]
    pub fn with_root_split(old_root: NodeRef, split: Split) -> Self {
        let mut bucket = Bucket::new();
        bucket.upsert(split.key, split.sibling);

        Self {
            rest: old_root,
            bucket,
            changed: true,
        }
    }

    #[must_use]
    pub const fn is_changed(&self) -> bool {
        self.changed
    }

    /// Number of separators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bucket.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bucket.is_empty()
    }

    /// Route `key` to the child whose range contains it.
    ///
    /// Keys below the first separator go to `rest`; otherwise the largest
    /// separator `<= key` wins, so an exact match routes to that separator's
    /// child.
    fn select(&self, key: &[u8]) -> Child {
        self.bucket.floor_index(key).map_or(Child::Rest, Child::Entry)
    }

    fn child_mut(&mut self, child: Child) -> Result<&mut NodeRef, TreeError> {
        match child {
            Child::Rest => Ok(&mut self.rest),
            Child::Entry(i) => self.bucket.value_at_mut(i).ok_or_else(|| {
                TreeError::OverflowInvariantViolation(format!("no child at bucket index {i}"))
            }),
        }
    }

    /// The separator bounding `child` from above, if any.
    fn separator_after(&self, child: Child) -> Option<&[u8]> {
        match child {
            Child::Rest => self.bucket.key_at(0),
            Child::Entry(i) => self.bucket.key_at(i + 1),
        }
    }

    /// Get a value by key.
    pub fn get<'a, S: ChunkStore>(
        &'a mut self,
        key: &[u8],
        store: &mut S,
    ) -> Result<&'a [u8], TreeError> {
        let child = self.select(key);
        self.child_mut(child)?.resolve(store)?.get(key, store)
    }

    /// Insert into the routed child, absorbing its split if it had one and
    /// splitting in turn once the bucket fills up.
    pub fn insert<S: ChunkStore>(
        &mut self,
        key: Vec<u8>,
        value: Vec<u8>,
        max_size: usize,
        store: &mut S,
    ) -> Result<InsertResult, TreeError> {
        let child = self.select(&key);
        let InsertResult { previous, split } = self
            .child_mut(child)?
            .resolve(store)?
            .insert(key, value, max_size, store)?;
        self.changed = true;

        let Some(child_split) = split else {
            return Ok(InsertResult {
                previous,
                split: None,
            });
        };

        if self.bucket.get(&child_split.key).is_some() {
            return Err(TreeError::OverflowInvariantViolation(format!(
                "separator {:?} already present in parent",
                String::from_utf8_lossy(&child_split.key)
            )));
        }
        self.bucket.upsert(child_split.key, child_split.sibling);

        let split = if self.bucket.len() < max_size {
            None
        } else {
            Some(self.split(max_size)?)
        };

        Ok(InsertResult { previous, split })
    }

    /// Split the node, returning the split key and the new right sibling.
    ///
    /// The first entry of the upper half is promoted: its key becomes the
    /// split key and its child becomes the sibling's `rest`.
    pub fn split(&mut self, max_size: usize) -> Result<Split, TreeError> {
        let mid = self.bucket.len() / 2;
        let mut upper = self.bucket.split_off(mid);

        let (key, rest) = upper.pop_first().ok_or_else(|| {
            TreeError::OverflowInvariantViolation("upper half of node split is empty".into())
        })?;
        check_split(&self.bucket, &key, &upper, max_size)?;

        let sibling = Self {
            rest,
            bucket: upper,
            changed: true,
        };

        Ok(Split {
            key,
            sibling: NodeRef::new(TreeNode::Node(sibling)),
        })
    }

    /// Persist dirty children, then this node as a Node chunk.
    ///
    /// Children are written before the record that points at them, so a
    /// record only ever references offsets below its own.
    pub fn commit<S: ChunkStore>(&mut self, store: &mut S) -> Result<u64, TreeError> {
        let rest = self.rest.commit(store)?;

        let mut entries = Vec::with_capacity(self.bucket.len());
        for (key, child) in self.bucket.iter_mut() {
            entries.push(NodeEntry {
                key: key.to_vec(),
                child: child.commit(store)?,
            });
        }

        let record = NodeRecord { rest, entries };
        let offset = store.append(ChunkId::Node, &record.encode_to_vec())?;
        self.changed = false;

        tracing::trace!(
            "wrote node with {} separators at offset {offset}",
            self.bucket.len()
        );
        Ok(offset)
    }

    /// Rebuild a clean node from its record. Every child starts out absent.
    pub fn from_record(record: NodeRecord) -> Result<Self, &'static str> {
        if record.rest == 0 {
            return Err("node has no rest child");
        }
        if record.entries.is_empty() {
            return Err("node has no separators");
        }

        let entries = record
            .entries
            .into_iter()
            .map(|entry| {
                if entry.child == 0 {
                    Err("node entry has no child")
                } else {
                    Ok((entry.key, NodeRef::absent(entry.child)))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        let bucket = Bucket::from_sorted(entries).ok_or("node separators out of order")?;

        Ok(Self {
            rest: NodeRef::absent(record.rest),
            bucket,
            changed: false,
        })
    }

    /// Evict every clean, persisted child subtree. Returns how many
    /// references were dropped.
    pub fn evict_children(&mut self) -> usize {
        let mut evicted = self.rest.evict();
        for (_, child) in self.bucket.iter_mut() {
            evicted += child.evict();
        }
        evicted
    }

    /// Levels from this node down to the leaves, following `rest`.
    pub fn height<S: ChunkStore>(&mut self, store: &mut S) -> Result<usize, TreeError> {
        Ok(1 + self.rest.resolve(store)?.height(store)?)
    }

    /// Entries of the leaf that `bound` routes to, from `bound` onwards,
    /// fenced by the nearest separator above that leaf.
    pub fn leaf_batch<S: ChunkStore>(
        &mut self,
        bound: &[u8],
        store: &mut S,
    ) -> Result<LeafBatch, TreeError> {
        let child = self.select(bound);
        let fence = self.separator_after(child).map(<[u8]>::to_vec);

        let mut batch = self
            .child_mut(child)?
            .resolve(store)?
            .leaf_batch(bound, store)?;
        if batch.fence.is_none() {
            batch.fence = fence;
        }
        Ok(batch)
    }

    /// Check this subtree; see `TreeNode::verify`.
    pub fn verify<S: ChunkStore>(
        &mut self,
        store: &mut S,
        low: Option<&[u8]>,
        high: Option<&[u8]>,
        max_size: usize,
    ) -> Result<Verified, TreeError> {
        let violation = |detail: String| Err(TreeError::OverflowInvariantViolation(detail));

        if self.bucket.len() >= max_size {
            return violation(format!(
                "node holds {} separators with max_size {max_size}",
                self.bucket.len()
            ));
        }

        let separators: Vec<Vec<u8>> = self.bucket.keys().map(<[u8]>::to_vec).collect();
        let Some(first) = separators.first() else {
            return violation("node has no separators".to_string());
        };
        if let Some(key) = separators.iter().find(|key| !in_range(key, low, high)) {
            return violation(format!(
                "separator {:?} outside its parent's range",
                String::from_utf8_lossy(key)
            ));
        }

        let below = self
            .rest
            .resolve(store)?
            .verify(store, low, Some(first.as_slice()), max_size)?;
        let mut entries = below.entries;

        for (i, (key, child)) in self.bucket.iter_mut().enumerate() {
            let upper = separators.get(i + 1).map(Vec::as_slice).or(high);
            let subtree = child
                .resolve(store)?
                .verify(store, Some(key), upper, max_size)?;
            if subtree.height != below.height {
                return violation(format!(
                    "child at separator {:?} has height {} but rest has height {}",
                    String::from_utf8_lossy(key),
                    subtree.height,
                    below.height
                ));
            }
            entries += subtree.entries;
        }

        Ok(Verified {
            entries,
            height: below.height + 1,
        })
    }
}
