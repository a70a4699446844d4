//! Copy-on-write B+-tree over a chunk store.
//!
//! # Structure
//!
//! The tree consists of:
//! - Internal nodes: a `rest` child for keys below the first separator, plus
//!   separator → child pairs
//! - Leaves: key → value pairs
//!
//! Children are held through `NodeRef`s, which are either resident in memory
//! or just an offset into the chunk store. Loading happens on first access.
//! Nodes keep no parent or sibling links, so a commit only has to rewrite the
//! path from each changed leaf up to the root.
//!
//! # Usage
//!
//! ```
//! use yamr::{MemoryChunkStore, Tree, TreeError};
//!
//! # fn main() -> Result<(), TreeError> {
//! let mut tree = Tree::create(MemoryChunkStore::new(), 4)?;
//! for i in 1..=16 {
//!     tree.set(i.to_string(), format!("Value{i}"))?;
//! }
//! tree.commit()?;
//!
//! assert!(tree.height()? > 1);
//! assert_eq!(tree.get(b"1")?, b"Value1");
//! assert!(matches!(tree.get(b"17"), Err(TreeError::KeyNotFound(_))));
//! # Ok(())
//! # }
//! ```

mod bucket;
mod error;
mod iter;
mod leaf;
mod node;
mod node_ref;
mod tree;

pub use error::TreeError;
pub use iter::{Iter, LeafBatch};
pub use leaf::Leaf;
pub use node::Node;
pub use node_ref::{InsertResult, NodeRef, Split, TreeNode, Verified};
pub use tree::{DEFAULT_BRANCHING_FACTOR, MIN_BRANCHING_FACTOR, Tree};
