use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use corpus_types::{ChunkPosition, RandomizedChunk, SequenceId};

/// Sequence metadata as placed by the sweep shuffle.
///
/// `origin_position` indexes the sweep's chunk order and names the chunk the
/// sequence was admitted with: legality is always evaluated against that
/// chunk's placement window, and the orchestrator resolves sample data
/// through it. The slot holding a descriptor changes as the shuffle relocates
/// it; the origin does not.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomizedSequence {
    pub id: SequenceId,
    pub num_samples: u32,
    pub origin_position: ChunkPosition,
}

/// Sample-offset metadata for one window slot, recomputed whenever shuffling
/// moves sequences into or out of the slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInfo {
    pub sample_start: usize,
    pub num_samples: usize,
}

impl SlotInfo {
    pub fn sample_end(&self) -> usize {
        self.sample_start + self.num_samples
    }
}

/// Rolling window over the sweep's chunk order.
///
/// Three parallel deques addressed by global chunk position: the loaded
/// chunk placements, the per-slot sequence lists the shuffle rewrites, and
/// the derived per-slot sample offsets. Logical position `p` maps to storage
/// offset `p - begin`; eviction pops fronts and advances `begin`, never
/// renumbering surviving slots.
#[derive(Debug, Default)]
pub struct ChunkWindow {
    begin: ChunkPosition,
    chunks: VecDeque<RandomizedChunk>,
    sequences: VecDeque<Vec<RandomizedSequence>>,
    info: VecDeque<SlotInfo>,
}

impl ChunkWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.begin = 0;
        self.chunks.clear();
        self.sequences.clear();
        self.info.clear();
    }

    pub fn begin(&self) -> ChunkPosition {
        self.begin
    }

    pub fn end(&self) -> ChunkPosition {
        self.begin + self.chunks.len()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn offset(&self, position: ChunkPosition) -> usize {
        debug_assert!(
            self.begin <= position && position < self.end(),
            "position {position} outside loaded window [{}, {})",
            self.begin,
            self.end()
        );
        position - self.begin
    }

    /// Appends the next slot. Slots are admitted in sweep order with no gaps.
    pub fn admit(&mut self, chunk: RandomizedChunk, sequences: Vec<RandomizedSequence>) {
        assert_eq!(
            chunk.position,
            self.end(),
            "chunk admitted out of sweep order"
        );
        self.info.push_back(SlotInfo {
            sample_start: chunk.sample_start,
            num_samples: chunk.original.num_samples,
        });
        self.sequences.push_back(sequences);
        self.chunks.push_back(chunk);
    }

    pub fn chunk(&self, position: ChunkPosition) -> &RandomizedChunk {
        &self.chunks[self.offset(position)]
    }

    /// Number of sequence cells in a slot; fixed at admission.
    pub fn slot_len(&self, position: ChunkPosition) -> usize {
        self.sequences[self.offset(position)].len()
    }

    pub fn sequence_at(&self, position: ChunkPosition, index: usize) -> RandomizedSequence {
        self.sequences[self.offset(position)][index]
    }

    pub fn swap_sequences(&mut self, a: (ChunkPosition, usize), b: (ChunkPosition, usize)) {
        let first = self.sequence_at(a.0, a.1);
        let second = self.sequence_at(b.0, b.1);
        let a_offset = self.offset(a.0);
        self.sequences[a_offset][a.1] = second;
        let b_offset = self.offset(b.0);
        self.sequences[b_offset][b.1] = first;
    }

    pub fn info(&self, position: ChunkPosition) -> SlotInfo {
        self.info[self.offset(position)]
    }

    /// Recomputes slot sample counts over `[from, to)`, cascading start
    /// offsets from `base_start`.
    pub fn recompute_info(&mut self, from: ChunkPosition, to: ChunkPosition, base_start: usize) {
        let mut start = base_start;
        for position in from..to {
            let offset = self.offset(position);
            let num_samples: usize = self.sequences[offset]
                .iter()
                .map(|sequence| sequence.num_samples as usize)
                .sum();
            self.info[offset] = SlotInfo {
                sample_start: start,
                num_samples,
            };
            start += num_samples;
        }
    }

    /// Drops slots strictly below `horizon`; returns how many were evicted.
    pub fn release_before(&mut self, horizon: ChunkPosition) -> usize {
        let mut released = 0;
        while self.begin < horizon && !self.chunks.is_empty() {
            self.chunks.pop_front();
            self.sequences.pop_front();
            self.info.pop_front();
            self.begin += 1;
            released += 1;
        }
        released
    }

    /// Maps a sweep sample offset to the slot containing it, searching slot
    /// infos over `[begin, within_end)`.
    pub fn slot_for_sample_offset(
        &self,
        offset: usize,
        within_end: ChunkPosition,
    ) -> Option<ChunkPosition> {
        let end = within_end.min(self.end());
        let mut low = self.begin;
        let mut high = end;
        while low < high {
            let mid = (low + high) / 2;
            let info = self.info[self.offset(mid)];
            if offset < info.sample_start {
                high = mid;
            } else if offset >= info.sample_end() {
                low = mid + 1;
            } else {
                return Some(mid);
            }
        }
        None
    }

    pub fn chunks(&self) -> impl Iterator<Item = &RandomizedChunk> {
        self.chunks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpus_types::{ChunkDescriptor, PlacementWindow};

    fn chunk(position: ChunkPosition, num_sequences: u32, num_samples: usize) -> RandomizedChunk {
        RandomizedChunk {
            position,
            original: ChunkDescriptor {
                id: position as u32,
                num_sequences,
                num_samples,
            },
            sample_start: 0,
            sequence_start: 0,
            window: PlacementWindow::new(position, position + 1),
        }
    }

    fn sequences(position: ChunkPosition, sizes: &[u32]) -> Vec<RandomizedSequence> {
        sizes
            .iter()
            .enumerate()
            .map(|(index, &num_samples)| RandomizedSequence {
                id: (position * 100 + index) as SequenceId,
                num_samples,
                origin_position: position,
            })
            .collect()
    }

    #[test]
    fn admit_and_release_shift_addressing() {
        let mut window = ChunkWindow::new();
        window.admit(chunk(0, 2, 5), sequences(0, &[2, 3]));
        window.admit(chunk(1, 1, 4), sequences(1, &[4]));
        window.admit(chunk(2, 2, 6), sequences(2, &[1, 5]));
        assert_eq!(window.begin(), 0);
        assert_eq!(window.end(), 3);

        assert_eq!(window.release_before(2), 2);
        assert_eq!(window.begin(), 2);
        assert_eq!(window.end(), 3);
        assert_eq!(window.chunk(2).original.id, 2);
        assert_eq!(window.slot_len(2), 2);

        // Releasing again below an already-passed horizon is a no-op.
        assert_eq!(window.release_before(2), 0);
    }

    #[test]
    fn swap_moves_descriptors_between_slots() {
        let mut window = ChunkWindow::new();
        window.admit(chunk(0, 2, 5), sequences(0, &[2, 3]));
        window.admit(chunk(1, 1, 4), sequences(1, &[4]));
        let before = window.sequence_at(0, 1);
        window.swap_sequences((0, 1), (1, 0));
        assert_eq!(window.sequence_at(1, 0), before);
        assert_eq!(window.sequence_at(0, 1).num_samples, 4);
    }

    #[test]
    fn recompute_info_cascades_offsets() {
        let mut window = ChunkWindow::new();
        window.admit(chunk(0, 2, 5), sequences(0, &[2, 3]));
        window.admit(chunk(1, 1, 4), sequences(1, &[4]));
        window.swap_sequences((0, 0), (1, 0));
        window.recompute_info(0, 2, 0);
        assert_eq!(
            window.info(0),
            SlotInfo {
                sample_start: 0,
                num_samples: 7
            }
        );
        assert_eq!(
            window.info(1),
            SlotInfo {
                sample_start: 7,
                num_samples: 2
            }
        );
    }

    #[test]
    fn sample_offset_search_finds_slot() {
        let mut window = ChunkWindow::new();
        window.admit(chunk(0, 2, 5), sequences(0, &[2, 3]));
        window.admit(chunk(1, 1, 4), sequences(1, &[4]));
        window.admit(chunk(2, 2, 6), sequences(2, &[1, 5]));
        window.recompute_info(0, 3, 0);

        assert_eq!(window.slot_for_sample_offset(0, 3), Some(0));
        assert_eq!(window.slot_for_sample_offset(4, 3), Some(0));
        assert_eq!(window.slot_for_sample_offset(5, 3), Some(1));
        assert_eq!(window.slot_for_sample_offset(14, 3), Some(2));
        assert_eq!(window.slot_for_sample_offset(15, 3), None);
        // Search is bounded by the finalized region.
        assert_eq!(window.slot_for_sample_offset(14, 2), None);
    }

    #[test]
    #[should_panic(expected = "out of sweep order")]
    fn gapped_admission_aborts() {
        let mut window = ChunkWindow::new();
        window.admit(chunk(1, 1, 4), sequences(1, &[4]));
    }
}
