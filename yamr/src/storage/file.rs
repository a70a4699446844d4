//! File-backed chunk store.
//!
//! The file starts with the superblock region followed by records appended
//! back to back. Nothing is ever rewritten in place except superblock slots.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::storage::chunk::{
    CHECKSUM_SIZE, ChunkError, ChunkId, ChunkStore, FRAME_HEADER_SIZE, RawChunk,
    decode_frame_header, encode_frame, frame_len, verify_frame,
};
use crate::storage::superblock::{REGION_SIZE, SLOT_SIZE, Superblock};

/// A chunk store backed by a single file.
pub struct ChunkFile {
    file: File,
    superblock: Superblock,
    /// Read position.
    position: u64,
    /// End of the last appended record (file length).
    end: u64,
}

impl ChunkFile {
    /// Create a new chunk file at the given path.
    ///
    /// Returns an error if the file already exists.
    pub fn create(path: &Path) -> Result<Self, ChunkError> {
        if path.exists() {
            return Err(ChunkError::AlreadyExists(path.to_path_buf()));
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        // Initialize with a fresh superblock in slot 0 and an empty slot 1
        let superblock = Superblock::new();
        let mut region = [0u8; SLOT_SIZE * 2];
        region[..SLOT_SIZE].copy_from_slice(&superblock.to_bytes());

        file.write_all(&region)?;
        file.sync_all()?;

        tracing::info!("created chunk file {}", path.display());

        Ok(Self {
            file,
            superblock,
            position: REGION_SIZE,
            end: REGION_SIZE,
        })
    }

    /// Open an existing chunk file.
    pub fn open(path: &Path) -> Result<Self, ChunkError> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        let end = file.metadata()?.len();
        if end < REGION_SIZE {
            return Err(ChunkError::Truncated { offset: 0 });
        }

        // Read and validate the superblock slots
        let mut region = [0u8; SLOT_SIZE * 2];
        file.read_exact(&mut region)?;
        let superblock = Superblock::select(&region)?;

        if superblock.root_offset >= end {
            return Err(ChunkError::OutOfBounds {
                offset: superblock.root_offset,
                end,
            });
        }

        tracing::info!(
            "opened chunk file {} (generation {}, {} bytes)",
            path.display(),
            superblock.generation,
            end
        );

        Ok(Self {
            file,
            superblock,
            position: REGION_SIZE,
            end,
        })
    }

    /// Open an existing chunk file or create a new one if it doesn't exist.
    pub fn open_or_create(path: &Path) -> Result<Self, ChunkError> {
        if path.exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Total size of the file in bytes.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end
    }

    /// Whether no record has been appended yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end == REGION_SIZE
    }
}

impl ChunkStore for ChunkFile {
    fn append(&mut self, id: ChunkId, payload: &[u8]) -> Result<u64, ChunkError> {
        let bytes = encode_frame(id, payload)?;
        let offset = self.end;

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&bytes)?;

        self.end += frame_len(payload.len());
        self.position = self.end;

        Ok(offset)
    }

    fn seek(&mut self, offset: u64) -> Result<(), ChunkError> {
        if offset < REGION_SIZE || offset > self.end {
            return Err(ChunkError::OutOfBounds {
                offset,
                end: self.end,
            });
        }
        self.position = offset;
        Ok(())
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn read_chunk(&mut self) -> Result<RawChunk, ChunkError> {
        let offset = self.position;
        if offset + frame_len(0) > self.end {
            return Err(ChunkError::Truncated { offset });
        }

        self.file.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; FRAME_HEADER_SIZE];
        self.file.read_exact(&mut header)?;
        let (len, tag) = decode_frame_header(offset, header)?;

        if offset + frame_len(len) > self.end {
            return Err(ChunkError::Truncated { offset });
        }

        let mut payload = vec![0u8; len];
        self.file.read_exact(&mut payload)?;

        let mut stored = [0u8; CHECKSUM_SIZE];
        self.file.read_exact(&mut stored)?;
        verify_frame(offset, tag, &payload, stored)?;

        self.position = offset + frame_len(len);
        Ok(RawChunk { tag, payload })
    }

    fn sync(&mut self) -> Result<(), ChunkError> {
        self.file.sync_data()?;
        Ok(())
    }

    fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    fn write_superblock(&mut self, superblock: Superblock) -> Result<(), ChunkError> {
        self.file.seek(SeekFrom::Start(superblock.slot_offset()))?;
        self.file.write_all(&superblock.to_bytes())?;
        self.superblock = superblock;
        Ok(())
    }
}
