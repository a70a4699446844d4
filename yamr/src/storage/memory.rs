//! In-memory chunk store.
//!
//! Byte-for-byte the same layout as `ChunkFile`, held in a `Vec<u8>`. Useful
//! for tests and for trees that never need to outlive the process. The raw
//! image can be taken out and reopened to simulate a restart, including one
//! where the image was damaged.
//!
//! This implementation is not thread-safe.

// Offsets are bounded by the in-memory buffer length.
#![allow(clippy::cast_possible_truncation)]

use crate::storage::chunk::{
    CHECKSUM_SIZE, ChunkError, ChunkId, ChunkStore, FRAME_HEADER_SIZE, RawChunk,
    decode_frame_header, encode_frame, frame_len, verify_frame,
};
use crate::storage::superblock::{REGION_SIZE, SLOT_SIZE, Superblock};

/// A chunk store held entirely in memory.
pub struct MemoryChunkStore {
    bytes: Vec<u8>,
    superblock: Superblock,
    position: u64,
}

impl MemoryChunkStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let superblock = Superblock::new();
        let mut bytes = vec![0u8; REGION_SIZE as usize];
        bytes[..SLOT_SIZE].copy_from_slice(&superblock.to_bytes());

        Self {
            bytes,
            superblock,
            position: REGION_SIZE,
        }
    }

    /// Reopen a store from a raw image produced by `into_bytes`.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ChunkError> {
        if (bytes.len() as u64) < REGION_SIZE {
            return Err(ChunkError::Truncated { offset: 0 });
        }

        let superblock = Superblock::select(&bytes[..REGION_SIZE as usize])?;
        let end = bytes.len() as u64;
        if superblock.root_offset >= end {
            return Err(ChunkError::OutOfBounds {
                offset: superblock.root_offset,
                end,
            });
        }

        Ok(Self {
            bytes,
            superblock,
            position: REGION_SIZE,
        })
    }

    /// Take the raw image out of the store.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// The raw image.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable access to the raw image, for damaging it in tests.
    #[cfg(test)]
    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    fn end(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl Default for MemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkStore for MemoryChunkStore {
    fn append(&mut self, id: ChunkId, payload: &[u8]) -> Result<u64, ChunkError> {
        let frame = encode_frame(id, payload)?;
        let offset = self.end();
        self.bytes.extend_from_slice(&frame);
        self.position = self.end();
        Ok(offset)
    }

    fn seek(&mut self, offset: u64) -> Result<(), ChunkError> {
        let end = self.end();
        if offset < REGION_SIZE || offset > end {
            return Err(ChunkError::OutOfBounds { offset, end });
        }
        self.position = offset;
        Ok(())
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn read_chunk(&mut self) -> Result<RawChunk, ChunkError> {
        let offset = self.position;
        if offset + frame_len(0) > self.end() {
            return Err(ChunkError::Truncated { offset });
        }

        let start = offset as usize;
        let mut header = [0u8; FRAME_HEADER_SIZE];
        header.copy_from_slice(&self.bytes[start..start + FRAME_HEADER_SIZE]);
        let (len, tag) = decode_frame_header(offset, header)?;

        if offset + frame_len(len) > self.end() {
            return Err(ChunkError::Truncated { offset });
        }

        let payload_start = start + FRAME_HEADER_SIZE;
        let payload = self.bytes[payload_start..payload_start + len].to_vec();

        let checksum_start = payload_start + len;
        let mut stored = [0u8; CHECKSUM_SIZE];
        stored.copy_from_slice(&self.bytes[checksum_start..checksum_start + CHECKSUM_SIZE]);
        verify_frame(offset, tag, &payload, stored)?;

        self.position = offset + frame_len(len);
        Ok(RawChunk { tag, payload })
    }

    fn sync(&mut self) -> Result<(), ChunkError> {
        Ok(())
    }

    fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    fn write_superblock(&mut self, superblock: Superblock) -> Result<(), ChunkError> {
        let at = superblock.slot_offset() as usize;
        self.bytes[at..at + SLOT_SIZE].copy_from_slice(&superblock.to_bytes());
        self.superblock = superblock;
        Ok(())
    }
}
