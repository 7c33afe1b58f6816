//! Default sizing constants
//!
//! Segment and room-factor defaults shared by the pool, buffers and
//! configuration validation.

/// Segment size exponent: segments are `2^12 = 4096` bytes
pub const SEGMENT_EXPONENT: u8 = 12;

/// Smallest accepted segment exponent (16-byte segments)
pub const MIN_SEGMENT_EXPONENT: u8 = 4;

/// Largest accepted segment exponent (16 MiB segments)
pub const MAX_SEGMENT_EXPONENT: u8 = 24;

/// Segments allocated together when a pool grows
pub const SEGMENTS_PER_CHUNK: usize = 64;

/// Chunk limit before acquisition reports starvation
pub const MAX_CHUNKS: usize = 1024;

/// Room factor bounds (spare segments = `2^level`)
pub mod room {
    pub const MIN_LEVEL: u8 = 0;
    pub const MAX_LEVEL: u8 = 4;
    pub const INITIAL_LEVEL: u8 = 1;

    /// Hard ceiling for any configured level
    pub const LEVEL_CEILING: u8 = 16;
}

/// Per-type slot map presizing for the binder
pub const INITIAL_TYPE_CAPACITY: usize = 64;
