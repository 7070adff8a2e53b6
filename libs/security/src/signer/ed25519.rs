//! Ed25519 signer

use codec::{signature_type, KeyLocator, SignatureInfo, Signer};
use ed25519_dalek::{Signer as _, SigningKey, SECRET_KEY_LENGTH};
use types::Name;

use crate::error::{SecurityError, SecurityResult};

pub struct Ed25519Signer {
    key_locator_name: Name,
    key: SigningKey,
}

impl Ed25519Signer {
    /// Import a raw 32-byte private key
    pub fn new(key_locator_name: Name, key_bits: &[u8]) -> SecurityResult<Self> {
        let bits: [u8; SECRET_KEY_LENGTH] = key_bits
            .try_into()
            .map_err(|_| SecurityError::KeyImport("Ed25519 key must be 32 bytes".into()))?;
        Ok(Self {
            key_locator_name,
            key: SigningKey::from_bytes(&bits),
        })
    }

    pub fn from_key(key_locator_name: Name, key: SigningKey) -> Self {
        Self {
            key_locator_name,
            key,
        }
    }

    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }
}

impl Signer for Ed25519Signer {
    fn write_signature_info(&self, info: &mut SignatureInfo) {
        info.signature_type = signature_type::ED25519;
        info.key_locator = Some(KeyLocator::from_name(self.key_locator_name.clone()));
    }

    fn signature_value_size(&self) -> usize {
        64
    }

    fn write_signature_value(&self, wire: &mut [u8], covered: &[&[u8]]) -> usize {
        // Ed25519 signs the whole message; assemble the covered spans
        let message: Vec<u8> = covered.iter().flat_map(|blk| blk.iter().copied()).collect();
        let signature = self.key.sign(&message);
        wire[..64].copy_from_slice(&signature.to_bytes());
        64
    }
}
