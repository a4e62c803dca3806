// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Shared chunk/sequence metadata types and collaborator interfaces for the
//! sweep randomization pipeline.

pub mod source;
pub mod types;

pub use source::{ChunkOrder, SequenceSource};
pub use types::{
    ChunkDescriptor, ChunkId, ChunkPosition, PlacementWindow, RandomizedChunk, SequenceId,
    SequenceMeta,
};
