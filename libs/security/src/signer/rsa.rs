//! SHA-256 with RSA signer (PKCS#1 v1.5)

use codec::{signature_type, KeyLocator, SignatureInfo, Signer};
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::hazmat::PrehashSigner;
use rsa::signature::SignatureEncoding;
use rsa::RsaPrivateKey;
use rsa::traits::PublicKeyParts;
use sha2::{Digest, Sha256};
use types::Name;

use crate::error::{SecurityError, SecurityResult};

pub struct Sha256RsaSigner {
    key_locator_name: Name,
    key: SigningKey<Sha256>,
    key_size: usize,
}

impl Sha256RsaSigner {
    /// Import a PKCS#8 DER private key
    pub fn new(key_locator_name: Name, key_der: &[u8]) -> SecurityResult<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_der(key_der)
            .map_err(|e| SecurityError::KeyImport(format!("RSA private key: {e}")))?;
        Ok(Self::from_key(key_locator_name, private_key))
    }

    pub fn from_key(key_locator_name: Name, private_key: RsaPrivateKey) -> Self {
        let key_size = private_key.size();
        Self {
            key_locator_name,
            key: SigningKey::<Sha256>::new(private_key),
            key_size,
        }
    }
}

impl Signer for Sha256RsaSigner {
    fn write_signature_info(&self, info: &mut SignatureInfo) {
        info.signature_type = signature_type::SHA256_WITH_RSA;
        info.key_locator = Some(KeyLocator::from_name(self.key_locator_name.clone()));
    }

    fn signature_value_size(&self) -> usize {
        self.key_size
    }

    fn write_signature_value(&self, wire: &mut [u8], covered: &[&[u8]]) -> usize {
        let mut h = Sha256::new();
        for blk in covered {
            h.update(blk);
        }
        let signature = self
            .key
            .sign_prehash(&h.finalize())
            .expect("PKCS#1 v1.5 signing of a SHA-256 digest cannot fail");
        let bytes = signature.to_bytes();
        wire[..bytes.len()].copy_from_slice(&bytes);
        bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::signature::hazmat::PrehashVerifier;

    #[test]
    fn test_rsa_data_signature_verifies() {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap();
        let verifying_key = VerifyingKey::<Sha256>::new(private_key.to_public_key());
        let signer = Sha256RsaSigner::from_key(Name::from_str("/test/KEY/rsa-1").unwrap(), private_key);

        let wire = codec::make_data(
            &Name::from_str("/a/b").unwrap(),
            &codec::MetaInfo::with_content_type(0),
            Some(b"content"),
            Some(&signer),
        )
        .unwrap();
        let parsed = codec::parse_data(wire).unwrap();
        let sig = parsed.sig_ptrs;
        assert_eq!(sig.signature_value_slice().unwrap().len(), 256);

        let mut h = Sha256::new();
        for blk in sig.signature_covered_slices() {
            h.update(blk);
        }
        let signature = Signature::try_from(sig.signature_value_slice().unwrap()).unwrap();
        verifying_key
            .verify_prehash(&h.finalize(), &signature)
            .unwrap();
    }
}
