//! Digest validators

use async_trait::async_trait;
use codec::{signature_type, PktContext, SignaturePtrs, ValidResult};
use sha2::{Digest, Sha256};
use tracing::debug;
use types::Name;

use super::Validator;

fn sha256_over(spans: &[&[u8]]) -> [u8; 32] {
    let mut h = Sha256::new();
    for blk in spans {
        h.update(blk);
    }
    h.finalize().into()
}

/// Checks DigestSha256 signatures; passes packets of any other type through
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256DigestValidator;

#[async_trait]
impl Validator for Sha256DigestValidator {
    async fn validate(
        &self,
        name: &Name,
        sig_ptrs: &SignaturePtrs,
        _context: &PktContext,
    ) -> ValidResult {
        let Some(info) = &sig_ptrs.signature_info else {
            return ValidResult::Pass;
        };
        if info.signature_type != signature_type::DIGEST_SHA256 {
            return ValidResult::Pass;
        }
        let covered = sig_ptrs.signature_covered_slices();
        let result = match sig_ptrs.signature_value_slice() {
            Some(value) if !covered.is_empty() => sha256_over(&covered) == value,
            _ => false,
        };
        debug!(name = %name, passed = result, "digest check");
        if result {
            ValidResult::Pass
        } else {
            ValidResult::Fail
        }
    }
}

/// Verify the ParametersSha256 digest component of an Interest
///
/// The dispatcher calls this for every Interest carrying application
/// parameters or a SignatureInfo before any validator runs.
pub fn check_params_sha256(name: &Name, sig_ptrs: &SignaturePtrs) -> bool {
    let covered = sig_ptrs.digest_covered_slices();
    let result = match sig_ptrs.digest_value_slice() {
        Some(value) if !covered.is_empty() => sha256_over(&covered) == value,
        _ => false,
    };
    debug!(name = %name, passed = result, "interest params-sha256 check");
    result
}
