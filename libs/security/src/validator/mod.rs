//! Validators checking packet signatures against trust policy
//!
//! A validator is an async function of (name, signature pointers, packet
//! context). The dispatcher spawns validator runs as tasks, so completion
//! order across packets is not guaranteed; each pending entry still sees
//! exactly one outcome.

mod digest;
mod known_key;

use std::sync::Arc;

use async_trait::async_trait;
use codec::{PktContext, SignaturePtrs, ValidResult};
use types::Name;

pub use digest::{check_params_sha256, Sha256DigestValidator};
pub use known_key::{EcdsaChecker, Ed25519Checker, HmacChecker, RsaChecker};

/// Trust decision contract for received Interests and Data
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(
        &self,
        name: &Name,
        sig_ptrs: &SignaturePtrs,
        context: &PktContext,
    ) -> ValidResult;
}

/// Accepts every packet without looking at the signature
#[derive(Debug, Clone, Copy, Default)]
pub struct PassAllValidator;

#[async_trait]
impl Validator for PassAllValidator {
    async fn validate(
        &self,
        _name: &Name,
        _sig_ptrs: &SignaturePtrs,
        _context: &PktContext,
    ) -> ValidResult {
        ValidResult::Pass
    }
}

/// Shared pass-all validator instance
pub fn pass_all() -> Arc<dyn Validator> {
    Arc::new(PassAllValidator)
}

struct UnionValidator {
    checkers: Vec<Arc<dyn Validator>>,
}

#[async_trait]
impl Validator for UnionValidator {
    async fn validate(
        &self,
        name: &Name,
        sig_ptrs: &SignaturePtrs,
        context: &PktContext,
    ) -> ValidResult {
        for checker in &self.checkers {
            let result = checker.validate(name, sig_ptrs, context).await;
            if !result.is_acceptable() {
                return result;
            }
        }
        ValidResult::Pass
    }
}

/// Combine validators; every one must accept
pub fn union(checkers: Vec<Arc<dyn Validator>>) -> Arc<dyn Validator> {
    Arc::new(UnionValidator { checkers })
}
