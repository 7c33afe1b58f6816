//! Error types for fingerprint access and type-chain checks
//!
//! Both are precondition failures: they indicate a programming error in the
//! caller rather than bad data, and nothing here attempts recovery.

use thiserror::Error;

/// Errors raised by bounds-checked [`Fingerprint`](crate::Fingerprint) access
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    /// Field index is not covered by the fingerprint
    #[error("Fingerprint index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

impl FingerprintError {
    pub fn out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }
}

/// Errors raised when walking or comparing [`TypeTag`](crate::TypeTag) chains
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TagError {
    /// A message was viewed through a type that is not one of its ancestors
    #[error("Type {actual} (id {actual_id}) does not derive from {target} (id {target_id})")]
    NotAnAncestor {
        actual: &'static str,
        actual_id: u32,
        target: &'static str,
        target_id: u32,
    },
}
