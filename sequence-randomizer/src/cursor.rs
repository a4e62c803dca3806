use serde::{Deserialize, Serialize};

use corpus_types::ChunkPosition;

/// Monotonic cursors over the rolling chunk window.
///
/// Window regions, left to right: `[begin, chunk_cursor)` delivered,
/// `[chunk_cursor, randomized_end)` finalized and readable,
/// `[randomized_end, randomization_cursor)` the shuffle's back window,
/// `[randomization_cursor, end)` admitted but not yet shuffled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorSet {
    /// Slot from which the next sequence is delivered.
    pub chunk_cursor: ChunkPosition,
    /// Index of the next sequence within the current slot.
    pub sequence_cursor: usize,
    /// Samples delivered so far this sweep.
    pub sample_cursor: usize,
    /// First slot that may still change under shuffling; everything below is
    /// at its final position for the sweep.
    pub randomized_end: ChunkPosition,
    /// Slot the shuffle engine processes next.
    pub randomization_cursor: ChunkPosition,
}

impl CursorSet {
    /// Enforces the window ordering invariant. A violation is an internal
    /// fault, never a recoverable condition.
    pub fn assert_ordered(&self, begin: ChunkPosition, end: ChunkPosition) {
        assert!(
            begin <= self.chunk_cursor
                && self.chunk_cursor <= self.randomized_end
                && self.randomized_end <= self.randomization_cursor
                && self.randomization_cursor <= end,
            "cursor ordering violated: begin={begin} chunk={chunk} randomized_end={randomized} \
             randomization={randomization} end={end}",
            chunk = self.chunk_cursor,
            randomized = self.randomized_end,
            randomization = self.randomization_cursor,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_cursors_pass() {
        let cursors = CursorSet {
            chunk_cursor: 2,
            sequence_cursor: 0,
            sample_cursor: 40,
            randomized_end: 3,
            randomization_cursor: 5,
        };
        cursors.assert_ordered(1, 6);
        cursors.assert_ordered(2, 5);
    }

    #[test]
    #[should_panic(expected = "cursor ordering violated")]
    fn regressed_randomized_end_aborts() {
        let cursors = CursorSet {
            chunk_cursor: 4,
            sequence_cursor: 0,
            sample_cursor: 0,
            randomized_end: 3,
            randomization_cursor: 5,
        };
        cursors.assert_ordered(0, 6);
    }
}
