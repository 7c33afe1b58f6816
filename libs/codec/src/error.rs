//! Codec errors for buffer access, wire encoding and message decoding
//!
//! Every failure falls into one of four kinds so callers can tell
//! "wait for more bytes" apart from "this stream is corrupt" and from
//! "cannot proceed at all":
//!
//! | Kind | Meaning | Caller reaction |
//! |------|---------|-----------------|
//! | [`ErrorKind::Bounds`] | Programming error (bad index, bad position, wrong type) | Fix the caller |
//! | [`ErrorKind::Encoding`] | Corrupt data (bad UTF-8, varint overflow, unknown type) | Reject the message |
//! | [`ErrorKind::Starvation`] | Pool exhausted | Back off and retry |
//! | [`ErrorKind::Underrun`] | Not enough bytes yet | Rewind and wait for more |

use thiserror::Error;
use types::{FingerprintError, TagError};

/// Coarse classification of a [`CodecError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Bounds,
    Encoding,
    Starvation,
    Underrun,
}

/// Errors raised by the buffer, serializer and deserializer
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// Buffer position outside `[front, back]`
    #[error("Position {position} out of range: window holds {len} bytes")]
    PositionOutOfRange { position: usize, len: usize },

    /// Fingerprint accessed past its length
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    /// Message viewed through a type outside its chain
    #[error(transparent)]
    Tag(#[from] TagError),

    /// Type id already registered for a different type
    #[error("Type id {type_id} already registered as {existing}, cannot register {requested}")]
    TypeConflict {
        type_id: u32,
        existing: &'static str,
        requested: &'static str,
    },

    /// Malformed UTF-8 in a string field
    #[error("Malformed UTF-8 sequence at byte {offset} of a {len}-byte string")]
    MalformedUtf8 { offset: usize, len: usize },

    /// Varint does not fit the target width
    #[error("Varint overflow decoding {target}")]
    VarintOverflow { target: &'static str },

    /// Type id on the wire has no registered constructor
    #[error("Unknown type id {type_id}: no constructor registered locally or globally")]
    UnknownType { type_id: u32 },

    /// Nested payload decoder ran past its length prefix
    #[error("Nested message overran its frame: declared {declared} bytes, consumed {consumed}")]
    NestedOverrun { declared: usize, consumed: usize },

    /// Segment pool cannot grow any further
    #[error("Segment pool exhausted: {chunks} chunks of {segments_per_chunk} segments in use")]
    PoolExhausted {
        chunks: usize,
        segments_per_chunk: usize,
    },

    /// Read requested more bytes than are available before the marker/back
    #[error("End of stream: need {needed} bytes, {available} available")]
    EndOfStream { needed: usize, available: usize },
}

impl CodecError {
    pub fn position_out_of_range(position: usize, len: usize) -> Self {
        Self::PositionOutOfRange { position, len }
    }

    pub fn end_of_stream(needed: usize, available: usize) -> Self {
        Self::EndOfStream { needed, available }
    }

    pub fn overflow(target: &'static str) -> Self {
        Self::VarintOverflow { target }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PositionOutOfRange { .. }
            | Self::Fingerprint(_)
            | Self::Tag(_)
            | Self::TypeConflict { .. } => ErrorKind::Bounds,
            Self::MalformedUtf8 { .. }
            | Self::VarintOverflow { .. }
            | Self::UnknownType { .. }
            | Self::NestedOverrun { .. } => ErrorKind::Encoding,
            Self::PoolExhausted { .. } => ErrorKind::Starvation,
            Self::EndOfStream { .. } => ErrorKind::Underrun,
        }
    }

    /// True only for underruns: the stream is fine, it is just incomplete
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::Underrun
    }

    /// True when the message must be rejected as corrupt
    pub fn is_corruption(&self) -> bool {
        self.kind() == ErrorKind::Encoding
    }
}

/// Result type for codec operations
pub type CodecResult<T> = std::result::Result<T, CodecError>;
