//! # Signature Structures and the Signer Contract
//!
//! ## Purpose
//!
//! SignatureInfo and its nested structures (key locator, validity period,
//! additional descriptions), the signature pointers produced by the parsers,
//! and the algorithm-opaque [`Signer`] contract consumed by the packet
//! builders.
//!
//! Signature pointers reference byte spans of the raw packet rather than
//! copies, so a validator hashes exactly the octets that arrived on the wire.

use std::ops::Range;

use bytes::Bytes;
use types::error::{DecodeError, DecodeResult};
use types::varnum::{parse_tl_num, parse_uint, tl_num_size};
use types::Name;

use crate::consts::{is_critical, type_number as tn};
use crate::wire::{tlv_len, uint_tlv_len, write_tlv, write_uint_tlv};

/// Locates the key that produced a signature
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyLocator {
    pub name: Option<Name>,
    pub key_digest: Option<Bytes>,
}

impl KeyLocator {
    pub fn from_name(name: Name) -> Self {
        Self {
            name: Some(name),
            key_digest: None,
        }
    }

    fn value_length(&self) -> usize {
        let mut len = 0;
        if let Some(name) = &self.name {
            len += name.encoded_length();
        }
        if let Some(digest) = &self.key_digest {
            len += tlv_len(tn::KEY_DIGEST, digest.len());
        }
        len
    }

    fn encode_value(&self, buf: &mut [u8], offset: usize) -> usize {
        let mut pos = offset;
        if let Some(name) = &self.name {
            pos += name.encode_into(buf, pos);
        }
        if let Some(digest) = &self.key_digest {
            pos += write_tlv(buf, pos, tn::KEY_DIGEST, digest);
        }
        pos - offset
    }

    fn parse(buf: &Bytes) -> DecodeResult<Self> {
        let mut ret = Self::default();
        let mut offset = 0;
        while offset < buf.len() {
            let (typ, size_typ) = parse_tl_num(buf, offset)?;
            if typ == types::name::TYPE_NAME {
                let (name, consumed) = Name::decode(buf, offset)?;
                ret.name = Some(name);
                offset += consumed;
                continue;
            }
            let (length, size_len) = parse_tl_num(buf, offset + size_typ)?;
            let start = offset + size_typ + size_len;
            let end = start + length as usize;
            if end > buf.len() {
                return Err(DecodeError::truncated(offset, end - offset, buf.len() - offset));
            }
            match typ {
                tn::KEY_DIGEST => ret.key_digest = Some(buf.slice(start..end)),
                _ if is_critical(typ) => {
                    return Err(DecodeError::CriticalUnknownType { typ, offset })
                }
                _ => {}
            }
            offset = end;
        }
        Ok(ret)
    }
}

/// Certificate validity window, ISO-8601 compact timestamps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityPeriod {
    pub not_before: Bytes,
    pub not_after: Bytes,
}

impl ValidityPeriod {
    fn value_length(&self) -> usize {
        tlv_len(tn::NOT_BEFORE, self.not_before.len()) + tlv_len(tn::NOT_AFTER, self.not_after.len())
    }

    fn encode_value(&self, buf: &mut [u8], offset: usize) -> usize {
        let mut pos = offset;
        pos += write_tlv(buf, pos, tn::NOT_BEFORE, &self.not_before);
        pos += write_tlv(buf, pos, tn::NOT_AFTER, &self.not_after);
        pos - offset
    }

    fn parse(buf: &Bytes) -> DecodeResult<Self> {
        let mut not_before = None;
        let mut not_after = None;
        let mut offset = 0;
        while offset < buf.len() {
            let (typ, size_typ) = parse_tl_num(buf, offset)?;
            let (length, size_len) = parse_tl_num(buf, offset + size_typ)?;
            let start = offset + size_typ + size_len;
            let end = start + length as usize;
            if end > buf.len() {
                return Err(DecodeError::truncated(offset, end - offset, buf.len() - offset));
            }
            match typ {
                tn::NOT_BEFORE => not_before = Some(buf.slice(start..end)),
                tn::NOT_AFTER => not_after = Some(buf.slice(start..end)),
                _ if is_critical(typ) => {
                    return Err(DecodeError::CriticalUnknownType { typ, offset })
                }
                _ => {}
            }
            offset = end;
        }
        match (not_before, not_after) {
            (Some(not_before), Some(not_after)) => Ok(Self {
                not_before,
                not_after,
            }),
            _ => Err(DecodeError::Malformed(
                "ValidityPeriod requires NotBefore and NotAfter".into(),
            )),
        }
    }
}

/// Free-form key/value annotations carried by certificates
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AdditionalDescription {
    pub entries: Vec<(Bytes, Bytes)>,
}

impl AdditionalDescription {
    fn value_length(&self) -> usize {
        self.entries
            .iter()
            .map(|(k, v)| {
                let inner = tlv_len(tn::DESCRIPTION_KEY, k.len()) + tlv_len(tn::DESCRIPTION_VALUE, v.len());
                tlv_len(tn::DESCRIPTION_ENTRY, inner)
            })
            .sum()
    }

    fn encode_value(&self, buf: &mut [u8], offset: usize) -> usize {
        let mut pos = offset;
        for (k, v) in &self.entries {
            let inner =
                tlv_len(tn::DESCRIPTION_KEY, k.len()) + tlv_len(tn::DESCRIPTION_VALUE, v.len());
            pos += types::varnum::write_tl_num(tn::DESCRIPTION_ENTRY, buf, pos);
            pos += types::varnum::write_tl_num(inner as u64, buf, pos);
            pos += write_tlv(buf, pos, tn::DESCRIPTION_KEY, k);
            pos += write_tlv(buf, pos, tn::DESCRIPTION_VALUE, v);
        }
        pos - offset
    }

    fn parse(buf: &Bytes) -> DecodeResult<Self> {
        let mut entries = Vec::new();
        let mut offset = 0;
        while offset < buf.len() {
            let (typ, size_typ) = parse_tl_num(buf, offset)?;
            let (length, size_len) = parse_tl_num(buf, offset + size_typ)?;
            let start = offset + size_typ + size_len;
            let end = start + length as usize;
            if end > buf.len() {
                return Err(DecodeError::truncated(offset, end - offset, buf.len() - offset));
            }
            if typ == tn::DESCRIPTION_ENTRY {
                let entry = buf.slice(start..end);
                let mut key = Bytes::new();
                let mut value = Bytes::new();
                let mut pos = 0;
                while pos < entry.len() {
                    let (ityp, isize_typ) = parse_tl_num(&entry, pos)?;
                    let (ilen, isize_len) = parse_tl_num(&entry, pos + isize_typ)?;
                    let istart = pos + isize_typ + isize_len;
                    let iend = istart + ilen as usize;
                    match ityp {
                        tn::DESCRIPTION_KEY => key = entry.slice(istart..iend),
                        tn::DESCRIPTION_VALUE => value = entry.slice(istart..iend),
                        _ => {}
                    }
                    pos = iend;
                }
                entries.push((key, value));
            } else if is_critical(typ) {
                return Err(DecodeError::CriticalUnknownType { typ, offset });
            }
            offset = end;
        }
        Ok(Self { entries })
    }
}

/// SignatureInfo for both Data (0x16) and Interest (0x2C) packets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInfo {
    pub signature_type: u64,
    pub key_locator: Option<KeyLocator>,
    pub signature_nonce: Option<u64>,
    pub signature_time: Option<u64>,
    pub signature_seq_num: Option<u64>,
    pub validity_period: Option<ValidityPeriod>,
    pub additional_description: Option<AdditionalDescription>,
}

impl SignatureInfo {
    pub fn new(signature_type: u64) -> Self {
        Self {
            signature_type,
            key_locator: None,
            signature_nonce: None,
            signature_time: None,
            signature_seq_num: None,
            validity_period: None,
            additional_description: None,
        }
    }

    pub fn value_length(&self) -> usize {
        // SignatureType is always encoded in a single byte
        let mut len = tlv_len(tn::SIGNATURE_TYPE, 1);
        if let Some(kl) = &self.key_locator {
            len += tlv_len(tn::KEY_LOCATOR, kl.value_length());
        }
        if let Some(nonce) = self.signature_nonce {
            len += uint_tlv_len(tn::SIGNATURE_NONCE, nonce);
        }
        if let Some(time) = self.signature_time {
            len += uint_tlv_len(tn::SIGNATURE_TIME, time);
        }
        if let Some(seq) = self.signature_seq_num {
            len += uint_tlv_len(tn::SIGNATURE_SEQ_NUM, seq);
        }
        if let Some(vp) = &self.validity_period {
            len += tlv_len(tn::VALIDITY_PERIOD, vp.value_length());
        }
        if let Some(ad) = &self.additional_description {
            len += tlv_len(tn::ADDITIONAL_DESCRIPTION, ad.value_length());
        }
        len
    }

    /// Write the inner fields (no outer TL) at `buf[offset..]`
    pub fn encode_value(&self, buf: &mut [u8], offset: usize) -> usize {
        let mut pos = offset;
        pos += write_tlv(buf, pos, tn::SIGNATURE_TYPE, &[self.signature_type as u8]);
        if let Some(kl) = &self.key_locator {
            pos += types::varnum::write_tl_num(tn::KEY_LOCATOR, buf, pos);
            pos += types::varnum::write_tl_num(kl.value_length() as u64, buf, pos);
            pos += kl.encode_value(buf, pos);
        }
        if let Some(nonce) = self.signature_nonce {
            pos += write_uint_tlv(buf, pos, tn::SIGNATURE_NONCE, nonce);
        }
        if let Some(time) = self.signature_time {
            pos += write_uint_tlv(buf, pos, tn::SIGNATURE_TIME, time);
        }
        if let Some(seq) = self.signature_seq_num {
            pos += write_uint_tlv(buf, pos, tn::SIGNATURE_SEQ_NUM, seq);
        }
        if let Some(vp) = &self.validity_period {
            pos += types::varnum::write_tl_num(tn::VALIDITY_PERIOD, buf, pos);
            pos += types::varnum::write_tl_num(vp.value_length() as u64, buf, pos);
            pos += vp.encode_value(buf, pos);
        }
        if let Some(ad) = &self.additional_description {
            pos += types::varnum::write_tl_num(tn::ADDITIONAL_DESCRIPTION, buf, pos);
            pos += types::varnum::write_tl_num(ad.value_length() as u64, buf, pos);
            pos += ad.encode_value(buf, pos);
        }
        pos - offset
    }

    /// Parse from the value span of a SignatureInfo TLV
    pub fn parse_value(buf: &Bytes) -> DecodeResult<Self> {
        let mut ret = Self::new(0);
        let mut saw_type = false;
        let mut offset = 0;
        while offset < buf.len() {
            let (typ, size_typ) = parse_tl_num(buf, offset)?;
            let (length, size_len) = parse_tl_num(buf, offset + size_typ)?;
            let start = offset + size_typ + size_len;
            let end = start + length as usize;
            if end > buf.len() {
                return Err(DecodeError::truncated(offset, end - offset, buf.len() - offset));
            }
            let value = buf.slice(start..end);
            match typ {
                tn::SIGNATURE_TYPE => {
                    ret.signature_type = parse_uint(&value);
                    saw_type = true;
                }
                tn::KEY_LOCATOR => ret.key_locator = Some(KeyLocator::parse(&value)?),
                tn::SIGNATURE_NONCE => ret.signature_nonce = Some(parse_uint(&value)),
                tn::SIGNATURE_TIME => ret.signature_time = Some(parse_uint(&value)),
                tn::SIGNATURE_SEQ_NUM => ret.signature_seq_num = Some(parse_uint(&value)),
                tn::VALIDITY_PERIOD => ret.validity_period = Some(ValidityPeriod::parse(&value)?),
                tn::ADDITIONAL_DESCRIPTION => {
                    ret.additional_description = Some(AdditionalDescription::parse(&value)?)
                }
                _ if is_critical(typ) => {
                    return Err(DecodeError::CriticalUnknownType { typ, offset })
                }
                _ => {}
            }
            offset = end;
        }
        if !saw_type {
            return Err(DecodeError::Malformed(
                "SignatureInfo lacks SignatureType".into(),
            ));
        }
        Ok(ret)
    }

    /// Encode as a complete TLV with the given outer type
    pub fn encode(&self, outer_type: u64) -> Vec<u8> {
        let value_len = self.value_length();
        let total = tl_num_size(outer_type) + tl_num_size(value_len as u64) + value_len;
        let mut buf = vec![0u8; total];
        let mut pos = types::varnum::write_tl_num(outer_type, &mut buf, 0);
        pos += types::varnum::write_tl_num(value_len as u64, &mut buf, pos);
        self.encode_value(&mut buf, pos);
        buf
    }
}

/// Byte spans of a parsed packet relevant to signature checking
///
/// Spans index into `raw`, the packet exactly as received (outer TL
/// included). A packet without a signature has empty span lists.
#[derive(Debug, Clone, Default)]
pub struct SignaturePtrs {
    pub raw: Bytes,
    pub signature_info: Option<SignatureInfo>,
    pub signature_covered: Vec<Range<usize>>,
    pub signature_value: Option<Range<usize>>,
    pub digest_covered: Vec<Range<usize>>,
    pub digest_value: Option<Range<usize>>,
}

impl SignaturePtrs {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The signature-covered spans resolved to slices of the raw packet
    pub fn signature_covered_slices(&self) -> Vec<&[u8]> {
        self.signature_covered
            .iter()
            .map(|r| &self.raw[r.clone()])
            .collect()
    }

    pub fn signature_value_slice(&self) -> Option<&[u8]> {
        self.signature_value.clone().map(|r| &self.raw[r])
    }

    pub fn digest_covered_slices(&self) -> Vec<&[u8]> {
        self.digest_covered
            .iter()
            .map(|r| &self.raw[r.clone()])
            .collect()
    }

    pub fn digest_value_slice(&self) -> Option<&[u8]> {
        self.digest_value.clone().map(|r| &self.raw[r])
    }
}

/// Algorithm-opaque signing contract consumed by the packet builders
///
/// A builder first asks the signer to populate SignatureInfo and reserve a
/// value size, then, once the packet bytes are laid out, hands it the
/// covered spans and the reserved span to fill in place. `write_signature_value`
/// returns the bytes actually used, which may be less than reserved for
/// DER-encoded algorithms.
pub trait Signer: Send + Sync {
    fn write_signature_info(&self, info: &mut SignatureInfo);
    fn signature_value_size(&self) -> usize;
    fn write_signature_value(&self, wire: &mut [u8], covered: &[&[u8]]) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_info_round_trip() {
        let mut info = SignatureInfo::new(4);
        info.key_locator = Some(KeyLocator::from_name(
            Name::from_str("/test/KEY/key-1").unwrap(),
        ));
        info.signature_time = Some(1_570_430_517_101);
        info.signature_nonce = Some(0x1122_3344_5566_7788);
        let wire = info.encode(tn::INTEREST_SIGNATURE_INFO);

        let buf = Bytes::from(wire);
        let (typ, size_typ) = parse_tl_num(&buf, 0).unwrap();
        assert_eq!(typ, tn::INTEREST_SIGNATURE_INFO);
        let (len, size_len) = parse_tl_num(&buf, size_typ).unwrap();
        let value = buf.slice(size_typ + size_len..);
        assert_eq!(value.len(), len as usize);
        let parsed = SignatureInfo::parse_value(&value).unwrap();
        assert_eq!(parsed, info);
    }

    #[test]
    fn test_signature_info_minimal() {
        let info = SignatureInfo::new(0);
        let wire = info.encode(tn::SIGNATURE_INFO);
        assert_eq!(wire, b"\x16\x03\x1b\x01\x00");
    }

    #[test]
    fn test_validity_period_round_trip() {
        let mut info = SignatureInfo::new(3);
        info.validity_period = Some(ValidityPeriod {
            not_before: Bytes::from_static(b"19700101T000000"),
            not_after: Bytes::from_static(b"20421231T235959"),
        });
        let wire = Bytes::from(info.encode(tn::SIGNATURE_INFO));
        let (_, size_typ) = parse_tl_num(&wire, 0).unwrap();
        let (_, size_len) = parse_tl_num(&wire, size_typ).unwrap();
        let parsed = SignatureInfo::parse_value(&wire.slice(size_typ + size_len..)).unwrap();
        assert_eq!(parsed, info);
    }

    #[test]
    fn test_rejects_critical_unknown() {
        // Type 0x29 (odd) inside SignatureInfo is not recognized
        let buf = Bytes::from_static(b"\x1b\x01\x00\x29\x01\xff");
        assert!(matches!(
            SignatureInfo::parse_value(&buf),
            Err(DecodeError::CriticalUnknownType { .. })
        ));
    }
}
