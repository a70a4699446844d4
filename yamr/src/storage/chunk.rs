//! Tagged, length-prefixed chunk records and the `ChunkStore` abstraction.
//!
//! # Record Format
//!
//! ```text
//! +----------+------------------------------------------+
//! | 0-3      | payload_length (4 bytes)                 |
//! | 4        | chunk_id (1 byte)                        |
//! | 5-N      | payload (variable)                       |
//! | N-N+3    | CRC32 over chunk_id + payload (4 bytes)  |
//! +----------+------------------------------------------+
//! ```
//!
//! Records are appended after the superblock region, so offset 0 never
//! addresses a record.

// payload_length is bounded by MAX_CHUNK_SIZE, which fits in u32.
#![allow(clippy::cast_possible_truncation)]

use std::path::PathBuf;

use crate::storage::superblock::{Superblock, SuperblockError};

/// Length prefix + chunk id.
pub const FRAME_HEADER_SIZE: usize = 5;

/// CRC32 checksum size at the end of a record.
pub const CHECKSUM_SIZE: usize = 4;

/// Largest payload a single record may carry: 64MB.
pub const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Kind of record stored in a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChunkId {
    /// Internal B-tree node.
    Node = 0x01,
    /// B-tree leaf.
    Leaf = 0x02,
}

impl TryFrom<u8> for ChunkId {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Node),
            0x02 => Ok(Self::Leaf),
            _ => Err(value),
        }
    }
}

/// A record as read back from the store.
///
/// The tag is kept raw so callers decide what an unknown tag means.
#[derive(Debug, PartialEq, Eq)]
pub struct RawChunk {
    pub tag: u8,
    pub payload: Vec<u8>,
}

/// Append-only, offset-addressed record storage.
///
/// Implementations must ensure:
/// - `append` returns the offset at which the record begins and leaves the
///   position at the end of the store
/// - `read_chunk` returns exactly the tag and payload written at the current
///   position, then advances past the record
/// - `write_superblock` followed by `sync` makes the new root durable
pub trait ChunkStore {
    /// Append a record, returning its offset.
    fn append(&mut self, id: ChunkId, payload: &[u8]) -> Result<u64, ChunkError>;

    /// Move the read position to `offset`.
    fn seek(&mut self, offset: u64) -> Result<(), ChunkError>;

    /// Current read position.
    fn tell(&self) -> u64;

    /// Read the record at the current position and advance past it.
    fn read_chunk(&mut self) -> Result<RawChunk, ChunkError>;

    /// Read the record starting at `offset`.
    fn read_at(&mut self, offset: u64) -> Result<RawChunk, ChunkError> {
        self.seek(offset)?;
        self.read_chunk()
    }

    /// Make all previous writes durable.
    fn sync(&mut self) -> Result<(), ChunkError>;

    /// The most recently written (or loaded) superblock.
    fn superblock(&self) -> &Superblock;

    /// Write a superblock into its slot. Durable after the next `sync`.
    fn write_superblock(&mut self, superblock: Superblock) -> Result<(), ChunkError>;
}

/// Serialize a record frame.
pub fn encode_frame(id: ChunkId, payload: &[u8]) -> Result<Vec<u8>, ChunkError> {
    if payload.len() > MAX_CHUNK_SIZE {
        return Err(ChunkError::ChunkTooLarge { len: payload.len() });
    }

    let mut bytes = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
    bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    bytes.push(id as u8);
    bytes.extend_from_slice(payload);

    let checksum = crc32fast::hash(&bytes[4..]);
    bytes.extend_from_slice(&checksum.to_le_bytes());

    Ok(bytes)
}

/// Parse the fixed frame header, returning `(payload_length, tag)`.
pub fn decode_frame_header(
    offset: u64,
    header: [u8; FRAME_HEADER_SIZE],
) -> Result<(usize, u8), ChunkError> {
    let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    if len > MAX_CHUNK_SIZE {
        return Err(ChunkError::CorruptLength { offset, len });
    }
    Ok((len, header[4]))
}

/// Verify the checksum trailing a frame.
pub fn verify_frame(
    offset: u64,
    tag: u8,
    payload: &[u8],
    stored: [u8; CHECKSUM_SIZE],
) -> Result<(), ChunkError> {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&[tag]);
    hasher.update(payload);
    let actual = hasher.finalize();
    let expected = u32::from_le_bytes(stored);

    if actual != expected {
        return Err(ChunkError::ChecksumMismatch {
            offset,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Total on-disk size of a record with the given payload length.
#[must_use]
pub const fn frame_len(payload_len: usize) -> u64 {
    (FRAME_HEADER_SIZE + payload_len + CHECKSUM_SIZE) as u64
}

/// Errors that can occur in a chunk store.
#[derive(Debug)]
pub enum ChunkError {
    /// I/O error.
    Io(std::io::Error),
    /// The file already exists.
    AlreadyExists(PathBuf),
    /// A record runs past the end of the store.
    Truncated { offset: u64 },
    /// Payload too large to append.
    ChunkTooLarge { len: usize },
    /// A stored length prefix is larger than any record we would write.
    CorruptLength { offset: u64, len: usize },
    /// Stored checksum does not match the record contents.
    ChecksumMismatch {
        offset: u64,
        expected: u32,
        actual: u32,
    },
    /// Offset outside the record region.
    OutOfBounds { offset: u64, end: u64 },
    /// Superblock error.
    Superblock(SuperblockError),
}

impl ChunkError {
    /// Whether the error means the stored bytes cannot be trusted, as opposed
    /// to the operation failing for an environmental reason.
    #[must_use]
    pub const fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::Truncated { .. }
                | Self::CorruptLength { .. }
                | Self::ChecksumMismatch { .. }
                | Self::OutOfBounds { .. }
        )
    }
}

impl std::fmt::Display for ChunkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::AlreadyExists(path) => write!(f, "file already exists: {}", path.display()),
            Self::Truncated { offset } => write!(f, "truncated record at offset {offset}"),
            Self::ChunkTooLarge { len } => {
                write!(f, "chunk too large: {len} bytes (max {MAX_CHUNK_SIZE})")
            }
            Self::CorruptLength { offset, len } => {
                write!(f, "corrupt length {len} at offset {offset}")
            }
            Self::ChecksumMismatch {
                offset,
                expected,
                actual,
            } => write!(
                f,
                "checksum mismatch at offset {offset}: expected {expected:#010x}, got {actual:#010x}"
            ),
            Self::OutOfBounds { offset, end } => {
                write!(f, "offset {offset} out of bounds (end: {end})")
            }
            Self::Superblock(e) => write!(f, "superblock error: {e}"),
        }
    }
}

impl std::error::Error for ChunkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Superblock(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ChunkError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<SuperblockError> for ChunkError {
    fn from(e: SuperblockError) -> Self {
        Self::Superblock(e)
    }
}
