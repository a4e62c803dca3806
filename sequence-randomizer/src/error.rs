use thiserror::Error;

use corpus_types::ChunkPosition;

pub type Result<T> = std::result::Result<T, RandomizerError>;

/// Rejected chunk-order input from the chunk-level randomizer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkOrderError {
    #[error("chunk at index {index} reports position {position}")]
    PositionMismatch {
        index: usize,
        position: ChunkPosition,
    },
    #[error("placement window [{low}, {high}) excludes its own chunk at {position}")]
    WindowExcludesOwner {
        position: ChunkPosition,
        low: ChunkPosition,
        high: ChunkPosition,
    },
    #[error("placement window bounds regress at position {position}")]
    WindowRegression { position: ChunkPosition },
    #[error(
        "cumulative offsets inconsistent at position {position}: \
         expected sample start {expected_samples}, sequence start {expected_sequences}"
    )]
    OffsetMismatch {
        position: ChunkPosition,
        expected_samples: usize,
        expected_sequences: usize,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RandomizerError {
    #[error("sample offset {offset} beyond sweep end ({total_samples} samples)")]
    SeekOutOfRange { offset: usize, total_samples: usize },
    #[error("chunk order rejected: {0}")]
    ChunkOrder(#[from] ChunkOrderError),
}
