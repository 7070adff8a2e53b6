//! # Hourglass Security - Signers, Validators and Certificates
//!
//! ## Purpose
//!
//! Concrete implementations of the algorithm-opaque contracts the codec and
//! dispatcher consume:
//! - Built-in signers: null, SHA-256 digest (Data and Interest flavors),
//!   HMAC-SHA-256, SHA-256 with ECDSA (DER), SHA-256 with RSA (PKCS#1 v1.5),
//!   Ed25519
//! - Validators: digest checks, ParametersSha256 check, known-key signature
//!   checkers parameterized by a public key or a certificate
//! - Certificate envelope (validity period, descriptions), self-signing,
//!   and the SafeBag export format
//! - The keychain contract selecting a signer from request parameters
//!
//! Signers are stateless and re-entrant; each call builds its own hasher or
//! signing context.

pub mod cert;
pub mod error;
pub mod keychain;
pub mod signer;
pub mod validator;

pub use cert::{parse_certificate, self_sign, Certificate, SafeBag};
pub use error::{SecurityError, SecurityResult};
pub use keychain::{Keychain, MemKeychain, SignerParams};
pub use signer::{
    DigestSha256Signer, Ed25519Signer, HmacSha256Signer, NullSigner, Sha256EcdsaSigner,
    Sha256RsaSigner,
};
pub use validator::{
    check_params_sha256, pass_all, union, Ed25519Checker, HmacChecker, PassAllValidator,
    RsaChecker, Sha256DigestValidator, EcdsaChecker, Validator,
};
