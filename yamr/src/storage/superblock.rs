//! Superblock structure and serialization.
//!
//! The superblock anchors the current root of the tree. Two slots live at the
//! start of the store; commit generation `g` is written to slot `g % 2`, so a
//! torn superblock write leaves the previous generation intact.
//!
//! # Slot Layout
//!
//! ```text
//! +----------+-------------------------------------+
//! | 0-7      | magic "YAMRTREE"                    |
//! | 8-11     | format_version (u32)                |
//! | 12-15    | max_size (u32, 0 = not yet set)     |
//! | 16-23    | generation (u64)                    |
//! | 24-31    | root_offset (u64, 0 = no root)      |
//! | 32-39    | entry_count (u64)                   |
//! | 40-59    | reserved                            |
//! | 60-63    | CRC32 over bytes 0-59               |
//! +----------+-------------------------------------+
//! ```

// SLOT_SIZE is a compile-time constant that fits in u64.
#![allow(clippy::cast_possible_truncation)]

/// Magic number identifying a yamr chunk store: "YAMRTREE"
pub const MAGIC: [u8; 8] = *b"YAMRTREE";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Size of one superblock slot in bytes.
pub const SLOT_SIZE: usize = 64;

/// Number of superblock slots.
pub const SLOT_COUNT: usize = 2;

/// Size of the region reserved for superblock slots. Records start here.
pub const REGION_SIZE: u64 = (SLOT_SIZE * SLOT_COUNT) as u64;

/// Superblock field offsets.
mod offsets {
    pub const MAGIC: usize = 0;
    pub const FORMAT_VERSION: usize = 8;
    pub const MAX_SIZE: usize = 12;
    pub const GENERATION: usize = 16;
    pub const ROOT_OFFSET: usize = 24;
    pub const ENTRY_COUNT: usize = 32;
    // 40-59: reserved
    pub const CHECKSUM: usize = 60;
}

/// Root anchor and tree metadata.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Superblock {
    /// Format version number.
    pub format_version: u32,
    /// Branching factor the tree was committed with (0 until the first commit).
    pub max_size: u32,
    /// Commit generation; 0 for a store that has never been committed.
    pub generation: u64,
    /// Offset of the committed root record (0 if none).
    pub root_offset: u64,
    /// Number of keys in the committed tree.
    pub entry_count: u64,
}

impl Superblock {
    /// Superblock for a freshly created store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            max_size: 0,
            generation: 0,
            root_offset: 0,
            entry_count: 0,
        }
    }

    /// Whether a root has ever been committed.
    #[must_use]
    pub const fn has_root(&self) -> bool {
        self.root_offset != 0
    }

    /// Byte offset of the slot this superblock is written to.
    #[must_use]
    pub const fn slot_offset(&self) -> u64 {
        (self.generation % SLOT_COUNT as u64) * SLOT_SIZE as u64
    }

    /// The superblock for the next commit.
    #[must_use]
    pub const fn advance(&self, root_offset: u64, entry_count: u64, max_size: u32) -> Self {
        Self {
            format_version: self.format_version,
            max_size,
            generation: self.generation + 1,
            root_offset,
            entry_count,
        }
    }

    /// Serialize the superblock into one slot.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; SLOT_SIZE] {
        let mut bytes = [0u8; SLOT_SIZE];

        bytes[offsets::MAGIC..offsets::MAGIC + 8].copy_from_slice(&MAGIC);
        bytes[offsets::FORMAT_VERSION..offsets::FORMAT_VERSION + 4]
            .copy_from_slice(&self.format_version.to_le_bytes());
        bytes[offsets::MAX_SIZE..offsets::MAX_SIZE + 4].copy_from_slice(&self.max_size.to_le_bytes());
        bytes[offsets::GENERATION..offsets::GENERATION + 8]
            .copy_from_slice(&self.generation.to_le_bytes());
        bytes[offsets::ROOT_OFFSET..offsets::ROOT_OFFSET + 8]
            .copy_from_slice(&self.root_offset.to_le_bytes());
        bytes[offsets::ENTRY_COUNT..offsets::ENTRY_COUNT + 8]
            .copy_from_slice(&self.entry_count.to_le_bytes());

        let checksum = crc32fast::hash(&bytes[..offsets::CHECKSUM]);
        bytes[offsets::CHECKSUM..].copy_from_slice(&checksum.to_le_bytes());

        bytes
    }

    /// Deserialize a superblock from one slot.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SuperblockError> {
        if bytes.len() < SLOT_SIZE {
            return Err(SuperblockError::Truncated(bytes.len()));
        }

        // Validate magic number
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&bytes[offsets::MAGIC..offsets::MAGIC + 8]);
        if magic != MAGIC {
            return Err(SuperblockError::InvalidMagic(magic));
        }

        let stored = read_u32(bytes, offsets::CHECKSUM);
        let actual = crc32fast::hash(&bytes[..offsets::CHECKSUM]);
        if stored != actual {
            return Err(SuperblockError::ChecksumMismatch {
                expected: stored,
                actual,
            });
        }

        let format_version = read_u32(bytes, offsets::FORMAT_VERSION);
        if format_version != FORMAT_VERSION {
            return Err(SuperblockError::UnsupportedVersion(format_version));
        }

        Ok(Self {
            format_version,
            max_size: read_u32(bytes, offsets::MAX_SIZE),
            generation: read_u64(bytes, offsets::GENERATION),
            root_offset: read_u64(bytes, offsets::ROOT_OFFSET),
            entry_count: read_u64(bytes, offsets::ENTRY_COUNT),
        })
    }

    /// Pick the newest valid superblock out of the slot region.
    ///
    /// A slot that fails validation is skipped as long as the other one is
    /// valid. An all-zero slot has simply never been written.
    pub fn select(region: &[u8]) -> Result<Self, SuperblockError> {
        if region.len() < SLOT_SIZE * SLOT_COUNT {
            return Err(SuperblockError::Truncated(region.len()));
        }

        let mut newest: Option<Self> = None;
        let mut first_error = None;

        for slot in 0..SLOT_COUNT {
            let bytes = &region[slot * SLOT_SIZE..(slot + 1) * SLOT_SIZE];
            match Self::from_bytes(bytes) {
                Ok(superblock) => {
                    if newest.is_none_or(|current| superblock.generation > current.generation) {
                        newest = Some(superblock);
                    }
                }
                Err(e) => {
                    if bytes.iter().any(|&b| b != 0) {
                        tracing::warn!("superblock slot {slot} is invalid: {e}");
                    }
                    first_error.get_or_insert(e);
                }
            }
        }

        match (newest, first_error) {
            (Some(superblock), _) => Ok(superblock),
            (None, Some(e)) => Err(e),
            (None, None) => Err(SuperblockError::NoValidSlot),
        }
    }
}

impl Default for Superblock {
    fn default() -> Self {
        Self::new()
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

/// Errors that can occur when reading a superblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuperblockError {
    /// Not enough bytes for a slot.
    Truncated(usize),
    /// Invalid magic number.
    InvalidMagic([u8; 8]),
    /// Stored checksum does not match the slot contents.
    ChecksumMismatch { expected: u32, actual: u32 },
    /// Unsupported format version.
    UnsupportedVersion(u32),
    /// Neither slot holds a valid superblock.
    NoValidSlot,
}

impl std::fmt::Display for SuperblockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated(len) => write!(f, "superblock truncated: {len} bytes"),
            Self::InvalidMagic(magic) => {
                write!(
                    f,
                    "invalid magic number: {:?}",
                    String::from_utf8_lossy(magic)
                )
            }
            Self::ChecksumMismatch { expected, actual } => write!(
                f,
                "superblock checksum mismatch: expected {expected:#010x}, got {actual:#010x}"
            ),
            Self::UnsupportedVersion(v) => write!(f, "unsupported format version: {v}"),
            Self::NoValidSlot => write!(f, "no valid superblock slot"),
        }
    }
}

impl std::error::Error for SuperblockError {}
