//! Codec-level errors for packet construction and parsing

use thiserror::Error;
use types::error::DecodeError;

/// Errors raised while building or parsing packets
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Malformed input buffer
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A ParametersSha256 digest component appears in a name that does not
    /// carry application parameters, or appears more than once
    #[error("unnecessary ParametersSha256 digest component in name")]
    UnexpectedDigestComponent,

    /// The signer produced more bytes than it reserved
    #[error("signature size {actual} incompatible with reserved {reserved} bytes")]
    SignatureOverflow { reserved: usize, actual: usize },
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;
