//! Lazy node references.
//!
//! A `NodeRef` is either resident (the node is in memory, possibly with the
//! offset it was last persisted at) or absent (only the offset is known).
//! Every access goes through `resolve`, which loads absent nodes on demand.

use prost::Message;

use crate::btree::error::TreeError;
use crate::btree::iter::LeafBatch;
use crate::btree::leaf::Leaf;
use crate::btree::node::Node;
use crate::storage::record::{LeafRecord, NodeRecord};
use crate::storage::{ChunkId, ChunkStore};

/// A node or a leaf.
#[derive(Debug)]
pub enum TreeNode {
    Node(Node),
    Leaf(Leaf),
}

/// The outcome of an insert at some level of the tree.
#[derive(Debug)]
pub struct InsertResult {
    /// Value the key held before, if any.
    pub previous: Option<Vec<u8>>,
    /// Set when the node overflowed and split.
    pub split: Option<Split>,
}

/// Summary of a subtree that passed `verify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verified {
    /// Number of key/value pairs in the subtree.
    pub entries: u64,
    /// Levels from the subtree root down to its leaves, inclusive.
    pub height: usize,
}

/// A freshly split-off right sibling and the key that separates it.
#[derive(Debug)]
pub struct Split {
    /// Smallest key the sibling's subtree may hold.
    pub key: Vec<u8>,
    pub sibling: NodeRef,
}

impl TreeNode {
    #[must_use]
    pub const fn is_changed(&self) -> bool {
        match self {
            Self::Node(node) => node.is_changed(),
            Self::Leaf(leaf) => leaf.is_changed(),
        }
    }

    pub fn get<'a, S: ChunkStore>(
        &'a mut self,
        key: &[u8],
        store: &mut S,
    ) -> Result<&'a [u8], TreeError> {
        match self {
            Self::Node(node) => node.get(key, store),
            Self::Leaf(leaf) => leaf.get(key),
        }
    }

    pub fn insert<S: ChunkStore>(
        &mut self,
        key: Vec<u8>,
        value: Vec<u8>,
        max_size: usize,
        store: &mut S,
    ) -> Result<InsertResult, TreeError> {
        match self {
            Self::Node(node) => node.insert(key, value, max_size, store),
            Self::Leaf(leaf) => leaf.insert(key, value, max_size),
        }
    }

    pub fn commit<S: ChunkStore>(&mut self, store: &mut S) -> Result<u64, TreeError> {
        match self {
            Self::Node(node) => node.commit(store),
            Self::Leaf(leaf) => leaf.commit(store),
        }
    }

    /// Number of levels from this node down to the leaves, inclusive.
    pub fn height<S: ChunkStore>(&mut self, store: &mut S) -> Result<usize, TreeError> {
        match self {
            Self::Node(node) => node.height(store),
            Self::Leaf(_) => Ok(1),
        }
    }

    /// Entries of the leaf that `bound` routes to, from `bound` onwards.
    pub fn leaf_batch<S: ChunkStore>(
        &mut self,
        bound: &[u8],
        store: &mut S,
    ) -> Result<LeafBatch, TreeError> {
        match self {
            Self::Node(node) => node.leaf_batch(bound, store),
            Self::Leaf(leaf) => Ok(leaf.entries_from(bound)),
        }
    }

    /// Check ordering, size and balance invariants for this subtree, whose
    /// keys must all fall in `[low, high)`.
    pub fn verify<S: ChunkStore>(
        &mut self,
        store: &mut S,
        low: Option<&[u8]>,
        high: Option<&[u8]>,
        max_size: usize,
    ) -> Result<Verified, TreeError> {
        match self {
            Self::Node(node) => node.verify(store, low, high, max_size),
            Self::Leaf(leaf) => {
                if leaf.len() >= max_size {
                    return Err(TreeError::OverflowInvariantViolation(format!(
                        "leaf holds {} entries with max_size {max_size}",
                        leaf.len()
                    )));
                }
                if let Some(key) = leaf.keys().find(|key| !in_range(key, low, high)) {
                    return Err(TreeError::OverflowInvariantViolation(format!(
                        "leaf key {:?} outside its parent's range",
                        String::from_utf8_lossy(key)
                    )));
                }
                Ok(Verified {
                    entries: leaf.len() as u64,
                    height: 1,
                })
            }
        }
    }

    /// Load the node stored at `offset`.
    fn load<S: ChunkStore>(offset: u64, store: &mut S) -> Result<Self, TreeError> {
        let chunk = store
            .read_at(offset)
            .map_err(|e| TreeError::from_load(offset, e))?;

        let corrupt = |reason: String| TreeError::CorruptChunk { offset, reason };

        match ChunkId::try_from(chunk.tag) {
            Ok(ChunkId::Node) => {
                let record = NodeRecord::decode(chunk.payload.as_slice())
                    .map_err(|e| corrupt(format!("undecodable node: {e}")))?;
                let node = Node::from_record(record).map_err(|e| corrupt(e.to_string()))?;
                tracing::trace!("loaded node at offset {offset}");
                Ok(Self::Node(node))
            }
            Ok(ChunkId::Leaf) => {
                let record = LeafRecord::decode(chunk.payload.as_slice())
                    .map_err(|e| corrupt(format!("undecodable leaf: {e}")))?;
                let leaf = Leaf::from_record(record).map_err(|e| corrupt(e.to_string()))?;
                tracing::trace!("loaded leaf with {} entries at offset {offset}", leaf.len());
                Ok(Self::Leaf(leaf))
            }
            Err(tag) => Err(corrupt(format!("unknown chunk id {tag:#04x}"))),
        }
    }
}

/// Whether `key` falls in `[low, high)`; `None` means unbounded.
#[must_use]
pub fn in_range(key: &[u8], low: Option<&[u8]>, high: Option<&[u8]>) -> bool {
    low.is_none_or(|low| key >= low) && high.is_none_or(|high| key < high)
}

/// A handle to a node that may not be in memory yet.
#[derive(Debug)]
pub enum NodeRef {
    /// In memory. `offset` is where it was last persisted, if ever.
    Resident {
        node: Box<TreeNode>,
        offset: Option<u64>,
    },
    /// Only on disk.
    Absent(u64),
}

impl NodeRef {
    /// Wrap a node that has never been persisted.
    #[must_use]
    pub fn new(node: TreeNode) -> Self {
        Self::Resident {
            node: Box::new(node),
            offset: None,
        }
    }

    /// Reference a node persisted at `offset`.
    #[must_use]
    pub const fn absent(offset: u64) -> Self {
        Self::Absent(offset)
    }

    #[must_use]
    pub const fn is_resident(&self) -> bool {
        matches!(self, Self::Resident { .. })
    }

    /// Offset the node was last persisted at.
    #[must_use]
    pub const fn offset(&self) -> Option<u64> {
        match self {
            Self::Resident { offset, .. } => *offset,
            Self::Absent(offset) => Some(*offset),
        }
    }

    /// Get the node, loading it from `store` first if it is absent.
    pub fn resolve<S: ChunkStore>(&mut self, store: &mut S) -> Result<&mut TreeNode, TreeError> {
        if let Self::Absent(offset) = *self {
            let node = TreeNode::load(offset, store)?;
            *self = Self::Resident {
                node: Box::new(node),
                offset: Some(offset),
            };
        }

        match self {
            Self::Resident { node, .. } => Ok(node.as_mut()),
            Self::Absent(offset) => Err(TreeError::CorruptChunk {
                offset: *offset,
                reason: "reference still absent after load".to_string(),
            }),
        }
    }

    /// Persist the node if it changed since it was last written, returning
    /// its (possibly new) offset.
    pub fn commit<S: ChunkStore>(&mut self, store: &mut S) -> Result<u64, TreeError> {
        match self {
            Self::Absent(offset) => Ok(*offset),
            Self::Resident { node, offset } => {
                if let (false, Some(persisted)) = (node.is_changed(), *offset) {
                    return Ok(persisted);
                }
                let written = node.commit(store)?;
                *offset = Some(written);
                Ok(written)
            }
        }
    }

    /// Drop every clean, persisted node in this subtree back to `Absent`.
    ///
    /// Returns the number of references evicted.
    pub fn evict(&mut self) -> usize {
        let persisted = match self {
            Self::Resident {
                node,
                offset: Some(offset),
            } if !node.is_changed() => Some(*offset),
            _ => None,
        };

        if let Some(offset) = persisted {
            *self = Self::Absent(offset);
            return 1;
        }

        match self {
            Self::Resident { node, .. } => match node.as_mut() {
                TreeNode::Node(inner) => inner.evict_children(),
                TreeNode::Leaf(_) => 0,
            },
            Self::Absent(_) => 0,
        }
    }
}
