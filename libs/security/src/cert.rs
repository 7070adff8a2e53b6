//! # Certificates and the SafeBag Export Format
//!
//! A certificate is a Data packet whose content is a public key and whose
//! SignatureInfo carries a validity period and optional descriptions. The
//! key name equals the certificate name with the last two components
//! (issuer id and version) removed.

use bytes::Bytes;
use chrono::{Datelike, Duration, Timelike, Utc};
use codec::{content_type, type_number as tn, MetaInfo, SignatureInfo, Signer, ValidityPeriod};
use types::error::{DecodeError, DecodeResult};
use types::varnum::{parse_tl_num, tl_num_size, write_tl_num};
use types::{Component, Name};

use crate::error::SecurityResult;
use crate::signer::timestamp_ms;

/// SafeBag and key-bag TLV types
const TYPE_SAFE_BAG: u64 = 0x80;
const TYPE_ENCRYPTED_KEY_BAG: u64 = 0x81;

/// Certificates stay fresh for an hour
const CERT_FRESHNESS_MS: u64 = 3_600_000;

/// A parsed certificate
#[derive(Debug, Clone)]
pub struct Certificate {
    pub name: Name,
    pub meta_info: Option<MetaInfo>,
    /// Public key bits (SubjectPublicKeyInfo DER)
    pub content: Bytes,
    pub signature_info: SignatureInfo,
    /// The certificate exactly as received
    pub raw: Bytes,
}

impl Certificate {
    /// The name of the key this certificate speaks for
    pub fn key_name(&self) -> Name {
        self.name.prefix(self.name.len().saturating_sub(2))
    }

    pub fn validity_period(&self) -> Option<&ValidityPeriod> {
        self.signature_info.validity_period.as_ref()
    }
}

/// Parse a certificate from an encoded Data packet
pub fn parse_certificate(wire: Bytes) -> SecurityResult<Certificate> {
    let parsed = codec::parse_data(wire.clone())?;
    let signature_info = parsed
        .sig_ptrs
        .signature_info
        .clone()
        .ok_or_else(|| DecodeError::Malformed("certificate lacks SignatureInfo".into()))?;
    let content = parsed
        .content
        .ok_or_else(|| DecodeError::Malformed("certificate lacks a public key".into()))?;
    Ok(Certificate {
        name: parsed.name,
        meta_info: parsed.meta_info,
        content,
        signature_info,
        raw: wire,
    })
}

fn not_after_in_twenty_years() -> Bytes {
    let end = Utc::now() + Duration::days(20 * 365);
    let formatted = format!(
        "{:04}{:02}{:02}T{:02}{:02}{:02}",
        end.year(),
        end.month(),
        end.day(),
        end.hour(),
        end.minute(),
        end.second()
    );
    Bytes::from(formatted.into_bytes())
}

/// Produce a self-signed certificate for a key
///
/// The certificate name is the key name with `self` and a fresh version
/// component appended. Returns the certificate name and its encoding.
pub fn self_sign(
    key_name: &Name,
    pub_key: &[u8],
    signer: &dyn Signer,
) -> SecurityResult<(Name, Bytes)> {
    let cert_name = key_name
        .appending(Component::from_str("self").expect("literal component"))
        .appending(Component::from_version(timestamp_ms()));
    let meta_info = MetaInfo {
        content_type: Some(content_type::KEY),
        freshness_period: Some(CERT_FRESHNESS_MS),
        final_block_id: None,
    };
    let mut seed = SignatureInfo::new(0);
    seed.validity_period = Some(ValidityPeriod {
        not_before: Bytes::from_static(b"19700101T000000"),
        not_after: not_after_in_twenty_years(),
    });
    let wire = codec::make_data_with_sig_seed(&cert_name, &meta_info, Some(pub_key), Some(signer), seed)?;
    Ok((cert_name, wire))
}

/// Certificate plus encrypted private key, the portable key export format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeBag {
    /// Full encoded certificate (Data TLV)
    pub certificate: Bytes,
    /// Opaque encrypted private key material
    pub encrypted_key_bag: Bytes,
}

impl SafeBag {
    pub fn encode(&self) -> Bytes {
        let value_len = self.certificate.len()
            + tl_num_size(TYPE_ENCRYPTED_KEY_BAG)
            + tl_num_size(self.encrypted_key_bag.len() as u64)
            + self.encrypted_key_bag.len();
        let total = tl_num_size(TYPE_SAFE_BAG) + tl_num_size(value_len as u64) + value_len;
        let mut buf = vec![0u8; total];
        let mut pos = write_tl_num(TYPE_SAFE_BAG, &mut buf, 0);
        pos += write_tl_num(value_len as u64, &mut buf, pos);
        buf[pos..pos + self.certificate.len()].copy_from_slice(&self.certificate);
        pos += self.certificate.len();
        pos += write_tl_num(TYPE_ENCRYPTED_KEY_BAG, &mut buf, pos);
        pos += write_tl_num(self.encrypted_key_bag.len() as u64, &mut buf, pos);
        buf[pos..pos + self.encrypted_key_bag.len()].copy_from_slice(&self.encrypted_key_bag);
        Bytes::from(buf)
    }

    pub fn parse(wire: &Bytes) -> DecodeResult<Self> {
        let (typ, size_typ) = parse_tl_num(wire, 0)?;
        if typ != TYPE_SAFE_BAG {
            return Err(DecodeError::TypeMismatch {
                expected: TYPE_SAFE_BAG,
                actual: typ,
            });
        }
        let (length, size_len) = parse_tl_num(wire, size_typ)?;
        let mut offset = size_typ + size_len;
        let end = offset + length as usize;
        if end > wire.len() {
            return Err(DecodeError::truncated(offset, length as usize, wire.len() - offset));
        }
        let mut certificate = None;
        let mut encrypted_key_bag = None;
        while offset < end {
            let (typ, fsize_typ) = parse_tl_num(wire, offset)?;
            let (flen, fsize_len) = parse_tl_num(wire, offset + fsize_typ)?;
            let start = offset + fsize_typ + fsize_len;
            let fend = start + flen as usize;
            if fend > end {
                return Err(DecodeError::truncated(offset, fend - offset, end - offset));
            }
            match typ {
                tn::DATA => certificate = Some(wire.slice(offset..fend)),
                TYPE_ENCRYPTED_KEY_BAG => encrypted_key_bag = Some(wire.slice(start..fend)),
                _ => {}
            }
            offset = fend;
        }
        match (certificate, encrypted_key_bag) {
            (Some(certificate), Some(encrypted_key_bag)) => Ok(Self {
                certificate,
                encrypted_key_bag,
            }),
            _ => Err(DecodeError::Malformed(
                "SafeBag requires a certificate and a key bag".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::Ed25519Signer;

    fn test_cert() -> (Name, Bytes) {
        let key = ed25519_dalek::SigningKey::from_bytes(&[3u8; 32]);
        let pub_bits = key.verifying_key().to_bytes();
        let key_name = Name::from_str("/test/identity/KEY/%01").unwrap();
        let signer = Ed25519Signer::from_key(key_name.clone(), key);
        let (cert_name, wire) = self_sign(&key_name, &pub_bits, &signer).unwrap();
        assert_eq!(cert_name.prefix(4), key_name);
        (cert_name, wire)
    }

    #[test]
    fn test_self_sign_and_parse() {
        let (cert_name, wire) = test_cert();
        let cert = parse_certificate(wire).unwrap();
        assert_eq!(cert.name, cert_name);
        assert_eq!(cert.key_name(), Name::from_str("/test/identity/KEY/%01").unwrap());
        assert_eq!(
            cert.meta_info.as_ref().unwrap().content_type,
            Some(content_type::KEY)
        );
        let vp = cert.validity_period().unwrap();
        assert_eq!(vp.not_before.as_ref(), b"19700101T000000");
        assert_eq!(vp.not_after.len(), 15);
        assert_eq!(cert.content.len(), 32);
    }

    #[test]
    fn test_safe_bag_round_trip() {
        let (_, wire) = test_cert();
        let bag = SafeBag {
            certificate: wire,
            encrypted_key_bag: Bytes::from_static(b"\x01\x02\x03"),
        };
        let encoded = bag.encode();
        let parsed = SafeBag::parse(&encoded).unwrap();
        assert_eq!(parsed, bag);
        // The embedded certificate still parses as a certificate
        parse_certificate(parsed.certificate).unwrap();
    }
}
