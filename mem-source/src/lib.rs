// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! In-memory chunk/sequence collaborators for tests and diagnostics.
//!
//! Stands in for the deserializer and the chunk-level randomizer behind
//! their narrow interfaces: chunked sequence metadata with uniform or
//! seeded-synthetic sizes, and chunk orders (storage or shuffled) with a
//! configurable placement-window radius.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use corpus_types::{
    ChunkDescriptor, ChunkId, ChunkOrder, PlacementWindow, RandomizedChunk, SequenceId,
    SequenceMeta, SequenceSource,
};

/// Chunked sequence metadata held in memory. Chunk ids are the chunk's
/// storage index; sequence ids are globally unique and sequential.
pub struct MemSource {
    chunks: Vec<ChunkDescriptor>,
    sequences: Vec<Vec<SequenceMeta>>,
}

impl MemSource {
    /// Builds a corpus from explicit per-chunk sequence sample counts.
    pub fn from_sample_counts(counts: &[Vec<u32>]) -> Self {
        let mut chunks = Vec::with_capacity(counts.len());
        let mut sequences = Vec::with_capacity(counts.len());
        let mut next_id: SequenceId = 0;
        for (index, sizes) in counts.iter().enumerate() {
            let metas: Vec<SequenceMeta> = sizes
                .iter()
                .map(|&num_samples| {
                    let id = next_id;
                    next_id += 1;
                    SequenceMeta { id, num_samples }
                })
                .collect();
            chunks.push(ChunkDescriptor {
                id: index as ChunkId,
                num_sequences: metas.len() as u32,
                num_samples: sizes.iter().map(|&s| s as usize).sum(),
            });
            sequences.push(metas);
        }
        Self { chunks, sequences }
    }

    /// `num_chunks` chunks of `sequences_per_chunk` sequences, each
    /// `samples_per_sequence` samples long.
    pub fn uniform(num_chunks: usize, sequences_per_chunk: u32, samples_per_sequence: u32) -> Self {
        let counts: Vec<Vec<u32>> = (0..num_chunks)
            .map(|_| vec![samples_per_sequence; sequences_per_chunk as usize])
            .collect();
        Self::from_sample_counts(&counts)
    }

    /// Seeded corpus with sequence sizes drawn from `1..=max_samples`.
    pub fn synthetic(
        seed: u64,
        num_chunks: usize,
        sequences_per_chunk: u32,
        max_samples: u32,
    ) -> Self {
        let mut rng = Pcg64::seed_from_u64(seed);
        let counts: Vec<Vec<u32>> = (0..num_chunks)
            .map(|_| {
                (0..sequences_per_chunk)
                    .map(|_| rng.gen_range(1..=max_samples.max(1)))
                    .collect()
            })
            .collect();
        Self::from_sample_counts(&counts)
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn descriptors(&self) -> &[ChunkDescriptor] {
        &self.chunks
    }

    pub fn total_samples(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.num_samples).sum()
    }

    pub fn total_sequences(&self) -> usize {
        self.chunks
            .iter()
            .map(|chunk| chunk.num_sequences as usize)
            .sum()
    }

    /// Every sequence id in the corpus, in storage order.
    pub fn sequence_ids(&self) -> Vec<SequenceId> {
        self.sequences
            .iter()
            .flat_map(|metas| metas.iter().map(|meta| meta.id))
            .collect()
    }
}

impl SequenceSource for MemSource {
    fn sequences(&self, chunk: ChunkId) -> Vec<SequenceMeta> {
        self.sequences[chunk as usize].clone()
    }
}

/// A precomputed sweep chunk order with radius-derived placement windows:
/// chunk at position `p` may place sequences anywhere in
/// `[p - radius, p + radius + 1)` clamped to the sweep.
pub struct FixedChunkOrder {
    chunks: Arc<Vec<RandomizedChunk>>,
}

impl FixedChunkOrder {
    /// Storage order with symmetric windows of `radius` positions.
    pub fn storage_order(source: &MemSource, radius: usize) -> Self {
        Self::from_descriptor_order(source.descriptors().to_vec(), radius)
    }

    /// Seeded shuffle of the chunk order, windows and cumulative offsets
    /// recomputed in position space.
    pub fn shuffled(source: &MemSource, seed: u64, radius: usize) -> Self {
        let mut descriptors = source.descriptors().to_vec();
        let mut rng = Pcg64::seed_from_u64(seed);
        for index in (1..descriptors.len()).rev() {
            let other = rng.gen_range(0..=index);
            descriptors.swap(index, other);
        }
        Self::from_descriptor_order(descriptors, radius)
    }

    fn from_descriptor_order(descriptors: Vec<ChunkDescriptor>, radius: usize) -> Self {
        let len = descriptors.len();
        let mut chunks = Vec::with_capacity(len);
        let mut sample_start = 0;
        let mut sequence_start = 0;
        for (position, original) in descriptors.into_iter().enumerate() {
            chunks.push(RandomizedChunk {
                position,
                original,
                sample_start,
                sequence_start,
                window: PlacementWindow::new(
                    position.saturating_sub(radius),
                    (position + radius + 1).min(len),
                ),
            });
            sample_start += original.num_samples;
            sequence_start += original.num_sequences as usize;
        }
        Self {
            chunks: Arc::new(chunks),
        }
    }
}

impl ChunkOrder for FixedChunkOrder {
    fn randomized_chunks(&self) -> Arc<Vec<RandomizedChunk>> {
        Arc::clone(&self.chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_corpus_is_deterministic() {
        let a = MemSource::synthetic(7, 5, 4, 9);
        let b = MemSource::synthetic(7, 5, 4, 9);
        assert_eq!(a.descriptors(), b.descriptors());
        assert_eq!(a.sequences(3), b.sequences(3));
        assert_eq!(a.total_sequences(), 20);
    }

    #[test]
    fn sequence_ids_are_unique_and_sequential() {
        let source = MemSource::uniform(3, 4, 2);
        let ids = source.sequence_ids();
        assert_eq!(ids, (0..12).collect::<Vec<_>>());
        assert_eq!(source.total_samples(), 24);
    }

    #[test]
    fn shuffled_order_keeps_windows_legal_and_monotone() {
        let source = MemSource::uniform(10, 2, 3);
        let order = FixedChunkOrder::shuffled(&source, 11, 2);
        let chunks = order.randomized_chunks();
        let mut samples = 0;
        for (index, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.position, index);
            assert!(chunk.window.contains(chunk.position));
            assert_eq!(chunk.sample_start, samples);
            samples += chunk.original.num_samples;
            if index > 0 {
                assert!(chunk.window.low >= chunks[index - 1].window.low);
                assert!(chunk.window.high >= chunks[index - 1].window.high);
            }
        }
        // Same corpus, same seed: identical order.
        let again = FixedChunkOrder::shuffled(&source, 11, 2);
        assert_eq!(*again.randomized_chunks(), *chunks);
    }

    #[test]
    fn zero_radius_windows_cover_only_their_owner() {
        let source = MemSource::uniform(4, 1, 2);
        let order = FixedChunkOrder::storage_order(&source, 0);
        for chunk in order.randomized_chunks().iter() {
            assert_eq!(chunk.window.low, chunk.position);
            assert_eq!(chunk.window.high, chunk.position + 1);
        }
    }
}
