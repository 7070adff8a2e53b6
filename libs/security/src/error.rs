//! Errors for key handling, certificates and keychain lookups

use thiserror::Error;
use types::error::DecodeError;

#[derive(Debug, Error)]
pub enum SecurityError {
    /// A certificate or key structure failed to decode
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Packet construction failed while signing
    #[error(transparent)]
    Codec(#[from] codec::CodecError),

    /// Key material could not be imported
    #[error("cannot import key: {0}")]
    KeyImport(String),

    /// The keychain holds no key matching the request
    #[error("no matching key in keychain: {0}")]
    NoMatchingKey(String),
}

pub type SecurityResult<T> = Result<T, SecurityError>;
