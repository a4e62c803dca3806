use std::sync::Arc;

use log::debug;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use corpus_types::{ChunkOrder, ChunkPosition, RandomizedChunk, SequenceSource};

use crate::{
    cursor::CursorSet,
    error::{ChunkOrderError, RandomizerError, Result},
    window::{ChunkWindow, RandomizedSequence},
};

/// Attempts at drawing a legal swap target before a sequence is left in
/// place. The self-draw is always legal, so this bounds a degenerate RNG
/// stream rather than shaping the permutation.
const MAX_SWAP_DRAWS: usize = 1024;

/// Sequence-level randomizer over a chunk-randomized sweep.
///
/// Maintains a rolling window of loaded chunks, shuffles sequences within
/// each sequence's origin-chunk placement window, and serves cursor-based
/// reads of the resulting permutation. Single-threaded and synchronous:
/// every mutation happens inside a caller's method invocation, and `reset`
/// is the only way to abandon in-flight state.
pub struct SequenceRandomizer {
    order: Arc<dyn ChunkOrder>,
    source: Arc<dyn SequenceSource>,
    /// Sweep chunk-order snapshot, re-fetched on reset.
    chunks: Arc<Vec<RandomizedChunk>>,
    total_samples: usize,
    window: ChunkWindow,
    cursors: CursorSet,
    /// Samples held by slots below `randomized_end`; their infos are final.
    settled_samples: usize,
    rng: Pcg64,
    sweep: Option<u64>,
}

impl SequenceRandomizer {
    /// Construction touches neither collaborator; the randomizer behaves as
    /// an empty sweep until `reset` or `seek` starts one.
    pub fn new(order: Arc<dyn ChunkOrder>, source: Arc<dyn SequenceSource>) -> Self {
        Self {
            order,
            source,
            chunks: Arc::new(Vec::new()),
            total_samples: 0,
            window: ChunkWindow::new(),
            cursors: CursorSet::default(),
            settled_samples: 0,
            rng: Pcg64::seed_from_u64(0),
            sweep: None,
        }
    }

    /// Starts a sweep: discards every window slot and cursor, reseeds the
    /// shuffle, and takes a fresh, validated chunk-order snapshot. Callable
    /// at any time; no partial window survives.
    pub fn reset(&mut self, seed: u64) -> Result<()> {
        let chunks = self.order.randomized_chunks();
        validate_chunk_order(&chunks)?;
        self.total_samples = chunks.last().map(|chunk| chunk.sample_end()).unwrap_or(0);
        self.chunks = chunks;
        self.window.clear();
        self.cursors = CursorSet::default();
        self.settled_samples = 0;
        self.rng = Pcg64::seed_from_u64(seed);
        self.sweep = None;
        debug!(
            "reset: seed={seed} chunks={} samples={}",
            self.chunks.len(),
            self.total_samples
        );
        Ok(())
    }

    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    /// Cursor snapshot, checkpoint-friendly.
    pub fn cursors(&self) -> CursorSet {
        self.cursors
    }

    /// Positions of the currently loaded window slots.
    pub fn loaded_range(&self) -> std::ops::Range<ChunkPosition> {
        self.window.begin()..self.window.end()
    }

    /// Currently loaded chunk placements, in position order: the
    /// orchestrator's view of what must be physically fetched.
    pub fn chunk_window(&self) -> impl Iterator<Item = &RandomizedChunk> {
        self.window.chunks()
    }

    /// Resolves a delivered descriptor to the chunk it originated from.
    pub fn origin_chunk(&self, sequence: &RandomizedSequence) -> &RandomizedChunk {
        &self.chunks[sequence.origin_position]
    }

    /// Repositions the read cursors to `sweep_sample_offset` within `sweep`.
    ///
    /// Crossing into a different sweep (or seeking backward) resets with the
    /// sweep's seed first. An offset inside a sequence rounds up to that
    /// sequence's end; the adjusted offset is returned. Offsets beyond the
    /// sweep's total sample count fail with `SeekOutOfRange`.
    pub fn seek(&mut self, sweep_sample_offset: usize, sweep: u64) -> Result<usize> {
        if self.sweep != Some(sweep) || sweep_sample_offset < self.cursors.sample_cursor {
            self.reset(sweep)?;
            self.sweep = Some(sweep);
        }
        if sweep_sample_offset > self.total_samples {
            return Err(RandomizerError::SeekOutOfRange {
                offset: sweep_sample_offset,
                total_samples: self.total_samples,
            });
        }

        // Finalize slots until the target lands inside the settled region.
        while self.settled_samples <= sweep_sample_offset
            && self.cursors.randomization_cursor < self.chunks.len()
        {
            self.randomize_next_chunk();
        }

        // Chunk-level skip within the finalized region. An offset equal to
        // the sweep total keys the search by the last sample instead.
        let search_key = if sweep_sample_offset == self.total_samples {
            sweep_sample_offset.checked_sub(1)
        } else {
            Some(sweep_sample_offset)
        };
        if let Some(key) = search_key {
            if let Some(slot) = self
                .window
                .slot_for_sample_offset(key, self.cursors.randomized_end)
            {
                if slot > self.cursors.chunk_cursor {
                    let info = self.window.info(slot);
                    self.cursors.chunk_cursor = slot;
                    self.cursors.sequence_cursor = 0;
                    self.cursors.sample_cursor = info.sample_start;
                }
            }
        }

        // Sequence-level walk to the boundary; never stops mid-sequence.
        while self.cursors.sample_cursor < sweep_sample_offset {
            let sequence = self
                .position_at_next()
                .expect("seek offset within sweep bounds");
            self.consume(sequence);
        }

        self.cursors
            .assert_ordered(self.window.begin(), self.window.end());
        debug!(
            "seek: sweep={sweep} requested={sweep_sample_offset} adjusted={}",
            self.cursors.sample_cursor
        );
        Ok(self.cursors.sample_cursor)
    }

    /// Returns randomized sequence metadata whose summed sample counts do
    /// not exceed `sample_count`; sequences are never split to fit. A short
    /// or empty result means the budget (or the sweep) is exhausted.
    pub fn next_sequences(&mut self, sample_count: usize) -> Vec<RandomizedSequence> {
        let mut result = Vec::new();
        let mut remaining = sample_count;
        while let Some(sequence) = self.position_at_next() {
            let needed = sequence.num_samples as usize;
            if needed > remaining {
                break;
            }
            self.consume(sequence);
            remaining -= needed;
            result.push(sequence);
        }
        self.cursors
            .assert_ordered(self.window.begin(), self.window.end());
        result
    }

    /// Evicts window slots strictly below the dependency horizon: slots
    /// already delivered whose chunk can no longer hold an undelivered
    /// sequence nor serve as a shuffle target.
    pub fn release_chunks(&mut self) {
        let cursor = self.cursors.chunk_cursor;
        let horizon = if cursor < self.chunks.len() {
            self.chunks[cursor].window.low.min(cursor)
        } else {
            cursor
        };
        let released = self.window.release_before(horizon);
        if released > 0 {
            debug!("released {released} slots below position {horizon}");
        }
        self.cursors
            .assert_ordered(self.window.begin(), self.window.end());
    }

    /// Positions the cursors at the next undelivered sequence, extending
    /// randomization and skipping exhausted slots. `None` at end of sweep.
    fn position_at_next(&mut self) -> Option<RandomizedSequence> {
        while self.cursors.sample_cursor < self.total_samples {
            self.randomize_through(self.cursors.chunk_cursor);
            if self.cursors.sequence_cursor >= self.window.slot_len(self.cursors.chunk_cursor) {
                self.cursors.chunk_cursor += 1;
                self.cursors.sequence_cursor = 0;
                continue;
            }
            let sequence = self
                .window
                .sequence_at(self.cursors.chunk_cursor, self.cursors.sequence_cursor);
            assert!(
                self.is_valid_for_position(self.cursors.chunk_cursor, &sequence),
                "sequence {} escaped its placement window",
                sequence.id
            );
            return Some(sequence);
        }
        None
    }

    fn consume(&mut self, sequence: RandomizedSequence) {
        self.cursors.sequence_cursor += 1;
        self.cursors.sample_cursor += sequence.num_samples as usize;
    }

    /// Runs shuffle steps until slot `target` is finalized or the sweep's
    /// chunk order is exhausted.
    fn randomize_through(&mut self, target: ChunkPosition) {
        while self.cursors.randomized_end <= target
            && self.cursors.randomization_cursor < self.chunks.len()
        {
            self.randomize_next_chunk();
        }
    }

    /// Shuffles the chunk at the randomization cursor into the back window,
    /// then advances the finalized boundary as far as future chunks allow.
    fn randomize_next_chunk(&mut self) {
        let position = self.cursors.randomization_cursor;
        debug_assert!(position < self.chunks.len());
        let chunk = self.chunks[position];

        // Admit through the forward horizon so the prefetch view covers
        // every slot this chunk's sequences could legally reach.
        let horizon = chunk.window.high.max(position + 1).min(self.chunks.len());
        while self.window.end() < horizon {
            self.admit_next_chunk();
        }

        // Backward windowed shuffle: each cell may trade places with any
        // legal occupant of the back window, itself included.
        let back_low = self.chunks[self.cursors.randomized_end].sequence_start;
        for index in 0..self.window.slot_len(position) {
            let own_position = chunk.sequence_start + index;
            for _ in 0..MAX_SWAP_DRAWS {
                let drawn = self.rng.gen_range(back_low..=own_position);
                let (slot, slot_index) = self.locate_sequence_position(drawn);
                let current = self.window.sequence_at(position, index);
                let candidate = self.window.sequence_at(slot, slot_index);
                if self.is_valid_for_position(slot, &current)
                    && self.is_valid_for_position(position, &candidate)
                {
                    self.window
                        .swap_sequences((position, index), (slot, slot_index));
                    break;
                }
            }
        }

        self.cursors.randomization_cursor = position + 1;

        // Sample counts shifted wherever sequences traded places; rebuild
        // the back window's offsets from the settled prefix.
        self.window.recompute_info(
            self.cursors.randomized_end,
            self.cursors.randomization_cursor,
            self.settled_samples,
        );

        // Finalize slots no future chunk's window can reach.
        while self.cursors.randomized_end < self.cursors.randomization_cursor {
            let next = self.cursors.randomization_cursor;
            if next < self.chunks.len() && self.chunks[next].window.low <= self.cursors.randomized_end
            {
                break;
            }
            self.settled_samples += self.window.info(self.cursors.randomized_end).num_samples;
            self.cursors.randomized_end += 1;
        }

        self.cursors
            .assert_ordered(self.window.begin(), self.window.end());
    }

    /// Loads the next chunk's sequence metadata from the source, tagging
    /// each descriptor with its admission slot as origin.
    fn admit_next_chunk(&mut self) {
        let position = self.window.end();
        let chunk = self.chunks[position];
        let metas = self.source.sequences(chunk.original.id);
        assert_eq!(
            metas.len(),
            chunk.original.num_sequences as usize,
            "source sequence count for chunk {} disagrees with its descriptor",
            chunk.original.id
        );
        let samples: usize = metas.iter().map(|meta| meta.num_samples as usize).sum();
        assert_eq!(
            samples, chunk.original.num_samples,
            "source sample count for chunk {} disagrees with its descriptor",
            chunk.original.id
        );
        let sequences = metas
            .iter()
            .map(|meta| RandomizedSequence {
                id: meta.id,
                num_samples: meta.num_samples,
                origin_position: position,
            })
            .collect();
        self.window.admit(chunk, sequences);
    }

    /// Resolves a global sequence position to its (slot, index) cell. Slot
    /// sequence counts are fixed by the chunk order, so this mapping is
    /// independent of shuffling.
    fn locate_sequence_position(&self, sequence_position: usize) -> (ChunkPosition, usize) {
        let slot = self
            .chunks
            .partition_point(|chunk| chunk.sequence_end() <= sequence_position);
        debug_assert!(slot < self.chunks.len());
        (slot, sequence_position - self.chunks[slot].sequence_start)
    }

    /// The legality oracle: a descriptor may occupy `target` only if its
    /// origin chunk's placement window covers that slot.
    fn is_valid_for_position(&self, target: ChunkPosition, sequence: &RandomizedSequence) -> bool {
        self.chunks[sequence.origin_position].window.contains(target)
    }
}

fn validate_chunk_order(chunks: &[RandomizedChunk]) -> std::result::Result<(), ChunkOrderError> {
    let mut samples = 0usize;
    let mut sequences = 0usize;
    let mut previous: Option<&RandomizedChunk> = None;
    for (index, chunk) in chunks.iter().enumerate() {
        if chunk.position != index {
            return Err(ChunkOrderError::PositionMismatch {
                index,
                position: chunk.position,
            });
        }
        if !chunk.window.contains(chunk.position) {
            return Err(ChunkOrderError::WindowExcludesOwner {
                position: chunk.position,
                low: chunk.window.low,
                high: chunk.window.high,
            });
        }
        if let Some(previous) = previous {
            if chunk.window.low < previous.window.low || chunk.window.high < previous.window.high {
                return Err(ChunkOrderError::WindowRegression {
                    position: chunk.position,
                });
            }
        }
        if chunk.sample_start != samples || chunk.sequence_start != sequences {
            return Err(ChunkOrderError::OffsetMismatch {
                position: chunk.position,
                expected_samples: samples,
                expected_sequences: sequences,
            });
        }
        samples += chunk.original.num_samples;
        sequences += chunk.original.num_sequences as usize;
        previous = Some(chunk);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpus_types::{ChunkDescriptor, PlacementWindow};

    fn chunk(
        position: ChunkPosition,
        num_sequences: u32,
        num_samples: usize,
        low: ChunkPosition,
        high: ChunkPosition,
        sample_start: usize,
        sequence_start: usize,
    ) -> RandomizedChunk {
        RandomizedChunk {
            position,
            original: ChunkDescriptor {
                id: position as u32,
                num_sequences,
                num_samples,
            },
            sample_start,
            sequence_start,
            window: PlacementWindow::new(low, high),
        }
    }

    #[test]
    fn valid_order_passes() {
        let chunks = vec![
            chunk(0, 2, 10, 0, 2, 0, 0),
            chunk(1, 3, 9, 0, 3, 10, 2),
            chunk(2, 1, 4, 1, 3, 19, 5),
        ];
        assert_eq!(validate_chunk_order(&chunks), Ok(()));
    }

    #[test]
    fn position_gap_rejected() {
        let chunks = vec![chunk(1, 2, 10, 0, 2, 0, 0)];
        assert_eq!(
            validate_chunk_order(&chunks),
            Err(ChunkOrderError::PositionMismatch {
                index: 0,
                position: 1
            })
        );
    }

    #[test]
    fn window_excluding_owner_rejected() {
        let chunks = vec![
            chunk(0, 2, 10, 0, 2, 0, 0),
            chunk(1, 3, 9, 2, 4, 10, 2),
        ];
        assert_eq!(
            validate_chunk_order(&chunks),
            Err(ChunkOrderError::WindowExcludesOwner {
                position: 1,
                low: 2,
                high: 4
            })
        );
    }

    #[test]
    fn regressing_window_rejected() {
        let chunks = vec![
            chunk(0, 2, 10, 0, 3, 0, 0),
            chunk(1, 3, 9, 0, 2, 10, 2),
        ];
        assert_eq!(
            validate_chunk_order(&chunks),
            Err(ChunkOrderError::WindowRegression { position: 1 })
        );
    }

    #[test]
    fn inconsistent_offsets_rejected() {
        let chunks = vec![
            chunk(0, 2, 10, 0, 2, 0, 0),
            chunk(1, 3, 9, 0, 2, 11, 2),
        ];
        assert_eq!(
            validate_chunk_order(&chunks),
            Err(ChunkOrderError::OffsetMismatch {
                position: 1,
                expected_samples: 10,
                expected_sequences: 2
            })
        );
    }

    #[test]
    fn empty_order_is_a_valid_empty_sweep() {
        assert_eq!(validate_chunk_order(&[]), Ok(()));
    }
}
