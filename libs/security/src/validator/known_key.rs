//! Known-key signature checkers
//!
//! Each checker holds a key name and public key material. A packet passes
//! when its key locator names a key under the checker's key name and the
//! signature verifies with the held key. Checkers can also be built from a
//! certificate, taking the key name and bits from its envelope.

use async_trait::async_trait;
use codec::{signature_type, PktContext, SignaturePtrs, ValidResult};
use ed25519_dalek::Verifier as _;
use hmac::{Hmac, Mac};
use p256::ecdsa::signature::hazmat::PrehashVerifier as _;
use p256::pkcs8::DecodePublicKey as _;
use rsa::pkcs8::DecodePublicKey as _;
use rsa::signature::hazmat::PrehashVerifier as _;
use sha2::{Digest, Sha256};
use tracing::debug;
use types::Name;

use super::Validator;
use crate::cert::parse_certificate;
use crate::error::{SecurityError, SecurityResult};

fn sha256_over(spans: &[&[u8]]) -> [u8; 32] {
    let mut h = Sha256::new();
    for blk in spans {
        h.update(blk);
    }
    h.finalize().into()
}

fn concat(spans: &[&[u8]]) -> Vec<u8> {
    spans.iter().flat_map(|blk| blk.iter().copied()).collect()
}

/// The key locator must name a key under `key_name`
fn locator_matches(key_name: &Name, sig_ptrs: &SignaturePtrs) -> bool {
    let Some(info) = &sig_ptrs.signature_info else {
        return false;
    };
    let Some(locator) = &info.key_locator else {
        return false;
    };
    match &locator.name {
        Some(name) => key_name.is_prefix(name),
        None => false,
    }
}

macro_rules! known_key_validator {
    ($checker:ident, $sig_type:path, $verify:expr) => {
        #[async_trait]
        impl Validator for $checker {
            async fn validate(
                &self,
                name: &Name,
                sig_ptrs: &SignaturePtrs,
                _context: &PktContext,
            ) -> ValidResult {
                if !locator_matches(&self.key_name, sig_ptrs) {
                    return ValidResult::Fail;
                }
                let Some(info) = sig_ptrs.signature_info.as_ref() else {
                    return ValidResult::Fail;
                };
                if info.signature_type != $sig_type {
                    return ValidResult::Fail;
                }
                let covered = sig_ptrs.signature_covered_slices();
                let result = match sig_ptrs.signature_value_slice() {
                    Some(value) if !covered.is_empty() => ($verify)(self, &covered, value),
                    _ => false,
                };
                debug!(name = %name, passed = result, "known-key check");
                if result {
                    ValidResult::Pass
                } else {
                    ValidResult::Fail
                }
            }
        }
    };
}

/// ECDSA P-256 checker over a SubjectPublicKeyInfo DER key
pub struct EcdsaChecker {
    key_name: Name,
    key: p256::ecdsa::VerifyingKey,
}

impl EcdsaChecker {
    pub fn from_key(key_name: Name, pub_key_der: &[u8]) -> SecurityResult<Self> {
        let key = p256::ecdsa::VerifyingKey::from_public_key_der(pub_key_der)
            .map_err(|e| SecurityError::KeyImport(format!("ECDSA public key: {e}")))?;
        Ok(Self { key_name, key })
    }

    pub fn from_cert(certificate: &bytes::Bytes) -> SecurityResult<Self> {
        let cert = parse_certificate(certificate.clone())?;
        Self::from_key(cert.key_name(), &cert.content)
    }
}

known_key_validator!(
    EcdsaChecker,
    signature_type::SHA256_WITH_ECDSA,
    |me: &EcdsaChecker, covered: &[&[u8]], value: &[u8]| {
        let digest = sha256_over(covered);
        match p256::ecdsa::Signature::from_der(value) {
            Ok(sig) => me.key.verify_prehash(&digest, &sig).is_ok(),
            Err(_) => false,
        }
    }
);

/// RSA PKCS#1 v1.5 checker over a SubjectPublicKeyInfo DER key
pub struct RsaChecker {
    key_name: Name,
    key: rsa::pkcs1v15::VerifyingKey<Sha256>,
}

impl RsaChecker {
    pub fn from_key(key_name: Name, pub_key_der: &[u8]) -> SecurityResult<Self> {
        let key = rsa::RsaPublicKey::from_public_key_der(pub_key_der)
            .map_err(|e| SecurityError::KeyImport(format!("RSA public key: {e}")))?;
        Ok(Self {
            key_name,
            key: rsa::pkcs1v15::VerifyingKey::<Sha256>::new(key),
        })
    }

    pub fn from_cert(certificate: &bytes::Bytes) -> SecurityResult<Self> {
        let cert = parse_certificate(certificate.clone())?;
        Self::from_key(cert.key_name(), &cert.content)
    }
}

known_key_validator!(
    RsaChecker,
    signature_type::SHA256_WITH_RSA,
    |me: &RsaChecker, covered: &[&[u8]], value: &[u8]| {
        let digest = sha256_over(covered);
        match rsa::pkcs1v15::Signature::try_from(value) {
            Ok(sig) => me.key.verify_prehash(&digest, &sig).is_ok(),
            Err(_) => false,
        }
    }
);

/// HMAC-SHA-256 checker over a shared secret
pub struct HmacChecker {
    key_name: Name,
    key_bytes: Vec<u8>,
}

impl HmacChecker {
    pub fn from_key(key_name: Name, key_bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            key_name,
            key_bytes: key_bytes.into(),
        }
    }
}

known_key_validator!(
    HmacChecker,
    signature_type::HMAC_WITH_SHA256,
    |me: &HmacChecker, covered: &[&[u8]], value: &[u8]| {
        let mut mac = Hmac::<Sha256>::new_from_slice(&me.key_bytes)
            .expect("HMAC accepts keys of any length");
        for blk in covered {
            mac.update(blk);
        }
        mac.verify_slice(value).is_ok()
    }
);

/// Ed25519 checker over a SubjectPublicKeyInfo DER or raw 32-byte key
pub struct Ed25519Checker {
    key_name: Name,
    key: ed25519_dalek::VerifyingKey,
}

impl Ed25519Checker {
    pub fn from_key(key_name: Name, pub_key_bits: &[u8]) -> SecurityResult<Self> {
        use ed25519_dalek::pkcs8::DecodePublicKey as _;
        let key = if pub_key_bits.len() == 32 {
            let bits: [u8; 32] = pub_key_bits.try_into().expect("length checked");
            ed25519_dalek::VerifyingKey::from_bytes(&bits)
                .map_err(|e| SecurityError::KeyImport(format!("Ed25519 public key: {e}")))?
        } else {
            ed25519_dalek::VerifyingKey::from_public_key_der(pub_key_bits)
                .map_err(|e| SecurityError::KeyImport(format!("Ed25519 public key: {e}")))?
        };
        Ok(Self { key_name, key })
    }

    pub fn from_cert(certificate: &bytes::Bytes) -> SecurityResult<Self> {
        let cert = parse_certificate(certificate.clone())?;
        Self::from_key(cert.key_name(), &cert.content)
    }
}

known_key_validator!(
    Ed25519Checker,
    signature_type::ED25519,
    |me: &Ed25519Checker, covered: &[&[u8]], value: &[u8]| {
        let message = concat(covered);
        match ed25519_dalek::Signature::from_slice(value) {
            Ok(sig) => me.key.verify(&message, &sig).is_ok(),
            Err(_) => false,
        }
    }
);
