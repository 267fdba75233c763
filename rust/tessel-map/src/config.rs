use serde::{Deserialize, Serialize};

/// The number of low bits of the rolling hash that must all be set for a
/// position to count as a chunk boundary, giving chunks of 64 items on
/// average.
pub const DEFAULT_PATTERN_BITS: u32 = 6;

/// Tunes the [`BoundaryChecker`] for one kind of tree level.
///
/// [`BoundaryChecker`]: crate::BoundaryChecker
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// How many items (each contributing one 32 byte digest) the rolling hash
    /// spans
    pub window_size: usize,
    /// A position is a boundary when `hash & pattern == pattern`
    pub pattern: u32,
}

impl BoundaryConfig {
    /// A single-item window with a pattern of `bits` low bits, so that chunks
    /// hold `2^bits` items on average.
    pub const fn with_average(bits: u32) -> Self {
        BoundaryConfig {
            window_size: 1,
            pattern: (1 << bits) - 1,
        }
    }

    /// The expected number of items per chunk.
    pub fn average_chunk_size(&self) -> u64 {
        self.pattern as u64 + 1
    }
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        BoundaryConfig::with_average(DEFAULT_PATTERN_BITS)
    }
}

/// Chunking parameters for an [`OrderedMap`]. Two maps only share chunks
/// (and only have equal hashes for equal contents) when they are built with
/// the same configuration.
///
/// [`OrderedMap`]: crate::OrderedMap
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Boundaries between leaf chunks
    pub leaf: BoundaryConfig,
    /// Boundaries between meta chunks at every level above the leaves
    pub meta: BoundaryConfig,
}

impl ChunkingConfig {
    /// Use the same average chunk size at every level.
    pub const fn with_average(bits: u32) -> Self {
        ChunkingConfig {
            leaf: BoundaryConfig::with_average(bits),
            meta: BoundaryConfig::with_average(bits),
        }
    }

    /// The boundary configuration for the given height above the leaves.
    pub fn boundary(&self, level: usize) -> &BoundaryConfig {
        if level == 0 { &self.leaf } else { &self.meta }
    }
}
