// Copyright (c) James Kassemi, SC, US. All rights reserved.

use serde::{Deserialize, Serialize};

/// Identifier of an original (storage-order) chunk.
pub type ChunkId = u32;

/// Globally unique sequence identifier.
pub type SequenceId = u64;

/// Position in a sweep's randomized chunk order.
pub type ChunkPosition = usize;

/// Immutable description of a stored chunk as reported by the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDescriptor {
    pub id: ChunkId,
    pub num_sequences: u32,
    pub num_samples: usize,
}

/// One sequence's metadata within a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceMeta {
    pub id: SequenceId,
    pub num_samples: u32,
}

/// Half-open range `[low, high)` of randomized chunk positions a chunk's
/// sequences may occupy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementWindow {
    pub low: ChunkPosition,
    pub high: ChunkPosition,
}

impl PlacementWindow {
    pub fn new(low: ChunkPosition, high: ChunkPosition) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, position: ChunkPosition) -> bool {
        self.low <= position && position < self.high
    }
}

/// A chunk's sweep-specific placement, computed once per sweep by the
/// chunk-level randomizer. `sample_start` and `sequence_start` are cumulative
/// over the sweep order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomizedChunk {
    /// This chunk's own position in the sweep order.
    pub position: ChunkPosition,
    pub original: ChunkDescriptor,
    /// Samples preceding this chunk in the sweep order.
    pub sample_start: usize,
    /// Sequences preceding this chunk in the sweep order.
    pub sequence_start: usize,
    pub window: PlacementWindow,
}

impl RandomizedChunk {
    pub fn sample_end(&self) -> usize {
        self.sample_start + self.original.num_samples
    }

    pub fn sequence_end(&self) -> usize {
        self.sequence_start + self.original.num_sequences as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_window_bounds() {
        let window = PlacementWindow::new(2, 5);
        assert!(!window.contains(1));
        assert!(window.contains(2));
        assert!(window.contains(4));
        assert!(!window.contains(5));
    }

    #[test]
    fn randomized_chunk_ends() {
        let chunk = RandomizedChunk {
            position: 3,
            original: ChunkDescriptor {
                id: 7,
                num_sequences: 4,
                num_samples: 19,
            },
            sample_start: 100,
            sequence_start: 12,
            window: PlacementWindow::new(1, 6),
        };
        assert_eq!(chunk.sample_end(), 119);
        assert_eq!(chunk.sequence_end(), 16);
    }
}
