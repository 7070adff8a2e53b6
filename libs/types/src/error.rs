//! Decode errors for TLV and name processing
//!
//! Every parsing failure in the stack bottoms out in one of these variants.
//! Variants carry enough context (offset, sizes, type numbers) to diagnose a
//! malformed buffer without a hex dump.

use thiserror::Error;

/// Errors raised while decoding TLV structures, components and names
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer ends before the declared structure does
    #[error("buffer truncated at offset {offset}: need {need} bytes, have {have}")]
    Truncated {
        offset: usize,
        need: usize,
        have: usize,
    },

    /// Outer TLV type differs from what the caller required
    #[error("unexpected TLV type {actual:#04x}, expected {expected:#04x}")]
    TypeMismatch { expected: u64, actual: u64 },

    /// Unrecognized TLV type with the critical (odd) bit set
    #[error("unrecognized critical TLV type {typ:#04x} at offset {offset}")]
    CriticalUnknownType { typ: u64, offset: usize },

    /// Declared length disagrees with the bytes actually present
    #[error("TLV length mismatch: declared {declared}, actual {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// Component type number outside 1..=65535
    #[error("component type {typ} not in range 0 < T <= 65535")]
    ComponentTypeOutOfRange { typ: u64 },

    /// A URI string does not denote a legal component or name
    #[error("`{uri}` is not a legal name component: {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Structural rule violated (duplicate digest component, bad field order)
    #[error("malformed packet: {0}")]
    Malformed(String),
}

impl DecodeError {
    /// Truncation error for a read of `need` bytes at `offset` in a buffer of
    /// `have` bytes
    pub fn truncated(offset: usize, need: usize, have: usize) -> Self {
        Self::Truncated { offset, need, have }
    }

    pub fn invalid_uri(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for decode operations
pub type DecodeResult<T> = Result<T, DecodeError>;
