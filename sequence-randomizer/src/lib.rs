//! Sequence-level randomizer for chunk-randomized training sweeps.
//!
//! Given the chunk-level randomizer's per-sweep chunk order and the
//! deserializer's per-chunk sequence metadata, [`SequenceRandomizer`]
//! maintains a rolling window of loaded chunks, shuffles sequences locally
//! within each sequence's origin-chunk placement window, and serves
//! cursor-based reads of the resulting permutation.
//!
//! The crate exposes:
//! - [`SequenceRandomizer`]: reset/seek/read/release navigation over a sweep.
//! - [`RandomizedSequence`]: the delivered per-sequence descriptor.
//! - [`CursorSet`]: the monotonic cursor snapshot, checkpoint-friendly.

pub mod cursor;
pub mod error;
pub mod randomizer;
pub mod window;

pub use cursor::CursorSet;
pub use error::{ChunkOrderError, RandomizerError, Result};
pub use randomizer::SequenceRandomizer;
pub use window::{ChunkWindow, RandomizedSequence, SlotInfo};
