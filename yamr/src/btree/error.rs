use crate::storage::ChunkError;

/// Errors that can occur during tree operations.
#[derive(Debug)]
pub enum TreeError {
    /// The key is not present in the tree.
    KeyNotFound(Vec<u8>),
    /// The operation is not supported.
    NotImplemented(&'static str),
    /// A record could not be turned back into a node. The tree cannot be
    /// trusted past this point.
    CorruptChunk { offset: u64, reason: String },
    /// A split produced halves that break the bucket invariant.
    OverflowInvariantViolation(String),
    /// Branching factor too small to split nodes.
    InvalidBranchingFactor(usize),
    /// Chunk store error.
    Chunk(ChunkError),
}

impl TreeError {
    /// Wrap a chunk store error raised while loading the record at `offset`.
    ///
    /// Anything that says the bytes are bad becomes `CorruptChunk`; I/O
    /// failures stay as they are.
    #[must_use]
    pub fn from_load(offset: u64, e: ChunkError) -> Self {
        if e.is_corruption() {
            Self::CorruptChunk {
                offset,
                reason: e.to_string(),
            }
        } else {
            Self::Chunk(e)
        }
    }
}

impl std::fmt::Display for TreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyNotFound(key) => {
                write!(f, "key not found: {:?}", String::from_utf8_lossy(key))
            }
            Self::NotImplemented(op) => write!(f, "{op} is not implemented"),
            Self::CorruptChunk { offset, reason } => {
                write!(f, "corrupt chunk at offset {offset}: {reason}")
            }
            Self::OverflowInvariantViolation(detail) => {
                write!(f, "overflow invariant violated: {detail}")
            }
            Self::InvalidBranchingFactor(n) => {
                write!(f, "invalid branching factor {n} (must be at least 3)")
            }
            Self::Chunk(e) => write!(f, "chunk store error: {e}"),
        }
    }
}

impl std::error::Error for TreeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Chunk(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ChunkError> for TreeError {
    fn from(e: ChunkError) -> Self {
        Self::Chunk(e)
    }
}
