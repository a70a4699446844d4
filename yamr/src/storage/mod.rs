//! Chunk storage for the tree.
//!
//! A single append-only file:
//!
//! - Bytes 0-127: two superblock slots (the committed root anchor)
//! - Remaining bytes: tagged, checksummed chunk records, one per node or leaf
//!
//! # Usage
//!
//! ```ignore
//! use storage::{ChunkFile, ChunkId, ChunkStore};
//!
//! let mut file = ChunkFile::create(path)?;
//!
//! // Append a record and read it back
//! let offset = file.append(ChunkId::Leaf, b"payload")?;
//! let chunk = file.read_at(offset)?;
//!
//! // Make it durable
//! file.sync()?;
//! ```

mod chunk;
mod file;
mod memory;
pub mod record;
mod superblock;

pub use chunk::{ChunkError, ChunkId, ChunkStore, MAX_CHUNK_SIZE, RawChunk};
pub use file::ChunkFile;
pub use memory::MemoryChunkStore;
pub use superblock::{REGION_SIZE, Superblock, SuperblockError};
