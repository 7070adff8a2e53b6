//! SHA-256 with ECDSA signer (NIST P-256, DER-encoded signature)

use codec::{signature_type, KeyLocator, SignatureInfo, Signer};
use p256::ecdsa::signature::hazmat::PrehashSigner;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::DecodePrivateKey;
use sha2::{Digest, Sha256};
use types::Name;

use crate::error::{SecurityError, SecurityResult};

/// ECDSA signature sizes are variable; reserve the worst-case DER length
const P256_SIG_RESERVE: usize = 72;

pub struct Sha256EcdsaSigner {
    key_locator_name: Name,
    key: SigningKey,
}

impl Sha256EcdsaSigner {
    /// Import a PKCS#8 DER private key
    pub fn new(key_locator_name: Name, key_der: &[u8]) -> SecurityResult<Self> {
        let key = SigningKey::from_pkcs8_der(key_der)
            .map_err(|e| SecurityError::KeyImport(format!("ECDSA private key: {e}")))?;
        Ok(Self {
            key_locator_name,
            key,
        })
    }

    pub fn from_key(key_locator_name: Name, key: SigningKey) -> Self {
        Self {
            key_locator_name,
            key,
        }
    }

    pub fn verifying_key_der(&self) -> SecurityResult<Vec<u8>> {
        use p256::pkcs8::EncodePublicKey;
        self.key
            .verifying_key()
            .to_public_key_der()
            .map(|d| d.as_bytes().to_vec())
            .map_err(|e| SecurityError::KeyImport(format!("ECDSA public key: {e}")))
    }
}

impl Signer for Sha256EcdsaSigner {
    fn write_signature_info(&self, info: &mut SignatureInfo) {
        info.signature_type = signature_type::SHA256_WITH_ECDSA;
        info.key_locator = Some(KeyLocator::from_name(self.key_locator_name.clone()));
    }

    fn signature_value_size(&self) -> usize {
        P256_SIG_RESERVE
    }

    fn write_signature_value(&self, wire: &mut [u8], covered: &[&[u8]]) -> usize {
        let mut h = Sha256::new();
        for blk in covered {
            h.update(blk);
        }
        let digest = h.finalize();
        let sig: Signature = self
            .key
            .sign_prehash(&digest)
            .expect("P-256 signing of a 32-byte digest cannot fail");
        let der = sig.to_der();
        let der_bytes = der.as_bytes();
        wire[..der_bytes.len()].copy_from_slice(der_bytes);
        der_bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::signature::hazmat::PrehashVerifier;

    #[test]
    fn test_ecdsa_data_signature_verifies() {
        let key = SigningKey::random(&mut rand::thread_rng());
        let verifying_key = *key.verifying_key();
        let signer = Sha256EcdsaSigner::from_key(Name::from_str("/test/KEY/ec-1").unwrap(), key);

        let wire = codec::make_data(
            &Name::from_str("/a/b/c").unwrap(),
            &codec::MetaInfo::with_content_type(0),
            Some(b"content"),
            Some(&signer),
        )
        .unwrap();
        let parsed = codec::parse_data(wire).unwrap();
        let sig = parsed.sig_ptrs;

        let mut h = Sha256::new();
        for blk in sig.signature_covered_slices() {
            h.update(blk);
        }
        let digest = h.finalize();
        let signature = Signature::from_der(sig.signature_value_slice().unwrap()).unwrap();
        verifying_key.verify_prehash(&digest, &signature).unwrap();
    }
}
