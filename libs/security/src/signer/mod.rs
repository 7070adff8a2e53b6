//! Built-in signer implementations
//!
//! Each signer populates SignatureInfo with its algorithm type and key
//! locator, reports the size it needs for the signature value, and fills
//! the reserved span once the packet is laid out.

mod digest;
mod ecdsa;
mod ed25519;
mod hmac;
mod null;
mod rsa;

pub use digest::DigestSha256Signer;
pub use ecdsa::Sha256EcdsaSigner;
pub use ed25519::Ed25519Signer;
pub use hmac::HmacSha256Signer;
pub use null::NullSigner;
pub use rsa::Sha256RsaSigner;

/// Milliseconds since the Unix epoch
pub(crate) fn timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
