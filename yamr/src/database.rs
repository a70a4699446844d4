//! String-list store on top of the tree.
//!
//! Maps a string identifier to a list of strings, the shape an ingestion
//! pipeline produces when it parses a document into named records. Lists are
//! stored as protobuf `StringList` values.

use std::path::Path;

use prost::Message;

use crate::btree::{Tree, TreeError};
use crate::storage::record::StringList;
use crate::storage::{ChunkError, ChunkFile};

/// A file-backed map from identifiers to string lists.
pub struct Database {
    tree: Tree<ChunkFile>,
}

impl Database {
    /// Create a new database at the given path.
    ///
    /// The path must not already exist.
    pub fn create(path: &Path, max_size: usize) -> Result<Self, DatabaseError> {
        let file = ChunkFile::create(path)?;
        Ok(Self {
            tree: Tree::create(file, max_size)?,
        })
    }

    /// Open an existing database at the given path.
    pub fn open(path: &Path, max_size: usize) -> Result<Self, DatabaseError> {
        let file = ChunkFile::open(path)?;
        Ok(Self {
            tree: Tree::open(file, max_size)?,
        })
    }

    /// Open an existing database or create a new one if it doesn't exist.
    pub fn open_or_create(path: &Path, max_size: usize) -> Result<Self, DatabaseError> {
        if path.exists() {
            Self::open(path, max_size)
        } else {
            Self::create(path, max_size)
        }
    }

    /// Store `items` under `id`, replacing any previous list.
    ///
    /// Returns true if `id` was already present.
    pub fn put(&mut self, id: &str, items: &[String]) -> Result<bool, DatabaseError> {
        let value = StringList {
            items: items.to_vec(),
        };
        let previous = self.tree.set(id, value.encode_to_vec())?;
        Ok(previous.is_some())
    }

    /// Get the list stored under `id`.
    pub fn get(&mut self, id: &str) -> Result<Vec<String>, DatabaseError> {
        let bytes = self.tree.get(id.as_bytes())?;
        let list = StringList::decode(bytes.as_slice())?;
        Ok(list.items)
    }

    /// All identifiers in ascending order.
    pub fn ids(&mut self) -> Result<Vec<String>, DatabaseError> {
        let mut ids = Vec::new();
        for key in self.tree.keys() {
            ids.push(String::from_utf8_lossy(&key?).into_owned());
        }
        Ok(ids)
    }

    /// Number of stored lists.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.tree.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Persist every change since the last commit.
    pub fn commit(&mut self) -> Result<(), DatabaseError> {
        self.tree.commit()?;
        Ok(())
    }

    /// Commit and close the database.
    pub fn close(mut self) -> Result<(), DatabaseError> {
        self.commit()?;
        tracing::debug!("closed database with {} lists", self.len());
        Ok(())
    }
}

/// Errors that can occur during database operations.
#[derive(Debug)]
pub enum DatabaseError {
    /// Tree error.
    Tree(TreeError),
    /// Chunk store error.
    Chunk(ChunkError),
    /// A stored value is not a string list.
    Decode(prost::DecodeError),
}

impl std::fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tree(e) => write!(f, "tree error: {e}"),
            Self::Chunk(e) => write!(f, "chunk store error: {e}"),
            Self::Decode(e) => write!(f, "decode error: {e}"),
        }
    }
}

impl std::error::Error for DatabaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Tree(e) => Some(e),
            Self::Chunk(e) => Some(e),
            Self::Decode(e) => Some(e),
        }
    }
}

impl From<TreeError> for DatabaseError {
    fn from(e: TreeError) -> Self {
        Self::Tree(e)
    }
}

impl From<ChunkError> for DatabaseError {
    fn from(e: ChunkError) -> Self {
        Self::Chunk(e)
    }
}

impl From<prost::DecodeError> for DatabaseError {
    fn from(e: prost::DecodeError) -> Self {
        Self::Decode(e)
    }
}
