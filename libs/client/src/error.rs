//! Client-side errors surfaced to applications

use bytes::Bytes;
use codec::{MetaInfo, ValidResult};
use thiserror::Error;
use types::Name;

/// Errors surfaced by expressed Interests, handlers and configuration
#[derive(Debug, Error)]
pub enum ClientError {
    /// The face is unusable (send before open, peer closed)
    #[error("network error: {0}")]
    Network(String),

    /// The pending Interest's deadline passed
    #[error("interest timed out")]
    Timeout,

    /// The face shut down or the caller canceled the request
    #[error("interest canceled")]
    Canceled,

    /// A network Nack answered the Interest
    #[error("interest nacked, reason {reason}")]
    Nack { reason: u64 },

    /// The retrieved Data failed validation
    #[error("validation of {name} failed: {result:?}")]
    Validation {
        name: Name,
        meta_info: Option<MetaInfo>,
        content: Option<Bytes>,
        result: ValidResult,
    },

    /// Packet construction or parsing failed
    #[error(transparent)]
    Codec(#[from] codec::CodecError),

    /// Application parameters require a signer
    #[error("an Interest with application parameters must be signed")]
    MissingSigner,

    /// A handler is already attached at the prefix
    #[error("duplicated handler attachment at {0}")]
    DuplicateHandler(Name),

    /// Reply attempted after the Interest deadline
    #[error("deadline passed, unable to reply to {0}")]
    DeadlinePassed(Name),

    /// Configuration file is malformed
    #[error("bad client configuration: {0}")]
    Config(String),
}

pub type ClientResult<T> = Result<T, ClientError>;
