// Copyright (c) James Kassemi, SC, US. All rights reserved.

use std::sync::Arc;

use crate::types::{ChunkId, RandomizedChunk, SequenceMeta};

/// Chunk-level randomizer interface: the ordered, immutable-per-sweep chunk
/// placements. The sequence randomizer takes a fresh snapshot on every reset.
pub trait ChunkOrder: Send + Sync {
    fn randomized_chunks(&self) -> Arc<Vec<RandomizedChunk>>;
}

/// Deserializer interface: sequence metadata for one original chunk, in
/// stored order. Only metadata moves through here; sample data is loaded by
/// the orchestrator.
pub trait SequenceSource: Send + Sync {
    fn sequences(&self, chunk: ChunkId) -> Vec<SequenceMeta>;
}
