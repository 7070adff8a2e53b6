//! HMAC-SHA-256 signer

use codec::{signature_type, KeyLocator, SignatureInfo, Signer};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use types::Name;

type HmacSha256 = Hmac<Sha256>;

/// Symmetric-key signer carrying the key locator name of the shared key
pub struct HmacSha256Signer {
    key_locator_name: Name,
    key_bytes: Vec<u8>,
}

impl HmacSha256Signer {
    pub fn new(key_locator_name: Name, key_bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            key_locator_name,
            key_bytes: key_bytes.into(),
        }
    }
}

impl Signer for HmacSha256Signer {
    fn write_signature_info(&self, info: &mut SignatureInfo) {
        info.signature_type = signature_type::HMAC_WITH_SHA256;
        info.key_locator = Some(KeyLocator::from_name(self.key_locator_name.clone()));
    }

    fn signature_value_size(&self) -> usize {
        32
    }

    fn write_signature_value(&self, wire: &mut [u8], covered: &[&[u8]]) -> usize {
        let mut mac = HmacSha256::new_from_slice(&self.key_bytes)
            .expect("HMAC accepts keys of any length");
        for blk in covered {
            mac.update(blk);
        }
        wire[..32].copy_from_slice(&mac.finalize().into_bytes());
        32
    }
}
