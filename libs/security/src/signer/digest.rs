//! SHA-256 digest signer

use codec::{signature_type, SignatureInfo, Signer};
use rand::Rng;
use sha2::{Digest, Sha256};

use super::timestamp_ms;

/// Integrity-only signer writing the SHA-256 of the covered spans
///
/// The Interest flavor additionally stamps SignatureInfo with the current
/// time and a fresh 64-bit nonce, as signed Interests require replay
/// protection material.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestSha256Signer {
    for_interest: bool,
}

impl DigestSha256Signer {
    pub fn new() -> Self {
        Self {
            for_interest: false,
        }
    }

    pub fn new_interest() -> Self {
        Self { for_interest: true }
    }
}

impl Signer for DigestSha256Signer {
    fn write_signature_info(&self, info: &mut SignatureInfo) {
        info.signature_type = signature_type::DIGEST_SHA256;
        info.key_locator = None;
        if self.for_interest {
            info.signature_time = Some(timestamp_ms());
            info.signature_nonce = Some(rand::thread_rng().gen_range(1..u64::MAX));
        }
    }

    fn signature_value_size(&self) -> usize {
        32
    }

    fn write_signature_value(&self, wire: &mut [u8], covered: &[&[u8]]) -> usize {
        let mut h = Sha256::new();
        for blk in covered {
            h.update(blk);
        }
        wire[..32].copy_from_slice(&h.finalize());
        32
    }
}
