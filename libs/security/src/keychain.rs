//! Keychain contract and an in-memory implementation
//!
//! The keychain maps signer-selection parameters to a concrete signer. The
//! recognized parameters are checked in a fixed order: `no_signature`,
//! `digest_sha256`, `cert`, `key`, `identity`, `key_locator`; when none is
//! set, the default identity's default key signs.

use std::sync::Arc;

use codec::Signer;
use types::Name;

use crate::error::{SecurityError, SecurityResult};
use crate::signer::{DigestSha256Signer, NullSigner};

/// Signer selection parameters
#[derive(Debug, Clone, Default)]
pub struct SignerParams {
    pub no_signature: bool,
    pub digest_sha256: bool,
    pub identity: Option<Name>,
    pub key: Option<Name>,
    pub cert: Option<Name>,
    pub key_locator: Option<Name>,
}

/// Key store contract consumed by applications
pub trait Keychain: Send + Sync {
    fn default_identity(&self) -> Option<Name>;
    fn identities(&self) -> Vec<Name>;
    fn get_signer(&self, params: &SignerParams) -> SecurityResult<Arc<dyn Signer>>;
}

struct KeyEntry {
    identity: Name,
    key_name: Name,
    cert_name: Name,
    signer: Arc<dyn Signer>,
}

/// In-memory keychain for tests and embedded deployments
///
/// On-disk and OS-backed key stores live outside the core and implement the
/// same contract.
#[derive(Default)]
pub struct MemKeychain {
    entries: Vec<KeyEntry>,
}

impl MemKeychain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key; the first registered identity becomes the default
    pub fn add_key(
        &mut self,
        identity: Name,
        key_name: Name,
        cert_name: Name,
        signer: Arc<dyn Signer>,
    ) {
        self.entries.push(KeyEntry {
            identity,
            key_name,
            cert_name,
            signer,
        });
    }
}

impl Keychain for MemKeychain {
    fn default_identity(&self) -> Option<Name> {
        self.entries.first().map(|e| e.identity.clone())
    }

    fn identities(&self) -> Vec<Name> {
        let mut ret: Vec<Name> = Vec::new();
        for entry in &self.entries {
            if !ret.contains(&entry.identity) {
                ret.push(entry.identity.clone());
            }
        }
        ret
    }

    fn get_signer(&self, params: &SignerParams) -> SecurityResult<Arc<dyn Signer>> {
        if params.no_signature {
            return Ok(Arc::new(NullSigner));
        }
        if params.digest_sha256 {
            return Ok(Arc::new(DigestSha256Signer::new()));
        }
        if let Some(cert) = &params.cert {
            return self
                .entries
                .iter()
                .find(|e| cert.is_prefix(&e.cert_name))
                .map(|e| e.signer.clone())
                .ok_or_else(|| SecurityError::NoMatchingKey(cert.to_uri()));
        }
        if let Some(key) = &params.key {
            return self
                .entries
                .iter()
                .find(|e| key.is_prefix(&e.key_name))
                .map(|e| e.signer.clone())
                .ok_or_else(|| SecurityError::NoMatchingKey(key.to_uri()));
        }
        if let Some(identity) = &params.identity {
            return self
                .entries
                .iter()
                .find(|e| &e.identity == identity)
                .map(|e| e.signer.clone())
                .ok_or_else(|| SecurityError::NoMatchingKey(identity.to_uri()));
        }
        if let Some(locator) = &params.key_locator {
            return self
                .entries
                .iter()
                .find(|e| locator.is_prefix(&e.key_name) || locator.is_prefix(&e.cert_name))
                .map(|e| e.signer.clone())
                .ok_or_else(|| SecurityError::NoMatchingKey(locator.to_uri()));
        }
        self.entries
            .first()
            .map(|e| e.signer.clone())
            .ok_or_else(|| SecurityError::NoMatchingKey("keychain is empty".into()))
    }
}
