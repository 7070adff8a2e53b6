//! # Interest Codec
//!
//! ## Purpose
//!
//! Builds and parses Interest packets with deferred signature computation.
//!
//! Building runs in two passes. Pass one computes every field length,
//! decides whether a ParametersSha256 digest component must be reserved in
//! the name (required exactly when application parameters are present), and
//! queries the signer for SignatureInfo and SignatureValue sizes. Pass two
//! writes all bytes into one allocation while recording marker offsets:
//! the signature-covered spans (name components minus the digest component,
//! then ApplicationParameters through SignatureInfo) and the digest-covered
//! span (ApplicationParameters through the end of the packet). The signer
//! then fills the signature bytes in place, and a SHA-256 pass fills the
//! digest component in place, covering the already-written signature.
//!
//! Parsing is single-pass and returns signature pointers alongside the
//! semantic fields so validators can hash the exact received octets.

use bytes::Bytes;
use sha2::{Digest, Sha256};
use types::component::{self, Component};
use types::error::{DecodeError, DecodeResult};
use types::varnum::{pack_uint, parse_tl_num, parse_uint, tl_num_size, write_tl_num};
use types::Name;

use crate::consts::{is_critical, type_number as tn};
use crate::error::{CodecError, CodecResult};
use crate::sig::{SignatureInfo, SignaturePtrs, Signer};
use crate::wire::{tlv_len, write_empty_tlv, write_tlv, write_uint_tlv};

/// Interest construction parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestParam {
    pub can_be_prefix: bool,
    pub must_be_fresh: bool,
    pub nonce: Option<u32>,
    pub lifetime: Option<u64>,
    pub hop_limit: Option<u8>,
    pub forwarding_hint: Vec<Name>,
}

impl Default for InterestParam {
    fn default() -> Self {
        Self {
            can_be_prefix: false,
            must_be_fresh: false,
            nonce: None,
            lifetime: Some(4000),
            hop_limit: None,
            forwarding_hint: Vec::new(),
        }
    }
}

/// A parsed Interest with its signature pointers
#[derive(Debug, Clone)]
pub struct ParsedInterest {
    pub name: Name,
    pub param: InterestParam,
    pub app_param: Option<Bytes>,
    pub sig_ptrs: SignaturePtrs,
}

const DIGEST_COMPONENT_SIZE: usize = 34;

/// Build an encoded Interest, returning the wire and the final name
///
/// The final name includes the filled ParametersSha256 digest component when
/// one was reserved, which is what the pending-Interest table keys on.
/// A signer without application parameters forces an empty
/// ApplicationParameters TLV so the digest component is always present on
/// signed Interests.
pub fn make_interest(
    name: &Name,
    param: &InterestParam,
    app_param: Option<&[u8]>,
    signer: Option<&dyn Signer>,
) -> CodecResult<(Bytes, Name)> {
    let empty_param: &[u8] = b"";
    let app_param = match (app_param, signer.is_some()) {
        (Some(p), _) => Some(p),
        (None, true) => Some(empty_param),
        (None, false) => None,
    };
    let need_digest = app_param.is_some();

    // Locate an existing digest component; reject one that is not wanted
    let mut digest_pos = None;
    for (i, comp) in name.iter().enumerate() {
        if comp.typ() == component::TYPE_PARAMETERS_SHA256 {
            if need_digest && digest_pos.is_none() {
                digest_pos = Some(i);
            } else {
                return Err(CodecError::UnexpectedDigestComponent);
            }
        }
    }

    // Signer decides the SignatureInfo contents up front
    let sig_info_wire = signer.map(|s| {
        let mut info = SignatureInfo::new(0);
        s.write_signature_info(&mut info);
        info.encode(tn::INTEREST_SIGNATURE_INFO)
    });
    let sig_value_len = signer.map(|s| s.signature_value_size()).unwrap_or(0);

    // Pass one: lengths
    let mut name_len: usize = name.value_length();
    if need_digest && digest_pos.is_none() {
        name_len += DIGEST_COMPONENT_SIZE;
    }
    let mut value_len = 1 + tl_num_size(name_len as u64) + name_len;
    if param.can_be_prefix {
        value_len += 2;
    }
    if param.must_be_fresh {
        value_len += 2;
    }
    if !param.forwarding_hint.is_empty() {
        let fh_len: usize = param
            .forwarding_hint
            .iter()
            .map(|n| n.encoded_length())
            .sum();
        value_len += 1 + tl_num_size(fh_len as u64) + fh_len;
    }
    if param.nonce.is_some() {
        value_len += 6;
    }
    if let Some(lifetime) = param.lifetime {
        value_len += tlv_len(tn::INTEREST_LIFETIME, pack_uint(lifetime).len());
    }
    if param.hop_limit.is_some() {
        value_len += 3;
    }
    if let Some(p) = app_param {
        value_len += tlv_len(tn::APP_PARAMETERS, p.len());
    }
    if let Some(info) = &sig_info_wire {
        value_len += info.len();
        value_len += tlv_len(tn::INTEREST_SIGNATURE_VALUE, sig_value_len);
    }
    let wire_len = 1 + tl_num_size(value_len as u64) + value_len;

    // Pass two: bytes and markers
    let mut buf = vec![0u8; wire_len];
    let mut sig_covered: Vec<std::ops::Range<usize>> = Vec::new();
    let mut digest_range = None;
    let mut final_name = Name::new();

    let mut offset = 0;
    offset += write_tl_num(tn::INTEREST, &mut buf, offset);
    offset += write_tl_num(value_len as u64, &mut buf, offset);

    offset += write_tl_num(tn::NAME, &mut buf, offset);
    offset += write_tl_num(name_len as u64, &mut buf, offset);
    let mut cover_start = offset;
    for (i, comp) in name.iter().enumerate() {
        buf[offset..offset + comp.len()].copy_from_slice(comp.wire());
        if digest_pos == Some(i) {
            if offset > cover_start {
                sig_covered.push(cover_start..offset);
            }
            digest_range = Some(offset + 2..offset + DIGEST_COMPONENT_SIZE);
            cover_start = offset + DIGEST_COMPONENT_SIZE;
        }
        offset += comp.len();
        final_name.push(comp.clone());
    }
    if offset > cover_start {
        sig_covered.push(cover_start..offset);
    }
    if need_digest && digest_pos.is_none() {
        offset += write_tl_num(component::TYPE_PARAMETERS_SHA256, &mut buf, offset);
        offset += write_tl_num(32, &mut buf, offset);
        digest_range = Some(offset..offset + 32);
        offset += 32;
    }

    if param.can_be_prefix {
        offset += write_empty_tlv(&mut buf, offset, tn::CAN_BE_PREFIX);
    }
    if param.must_be_fresh {
        offset += write_empty_tlv(&mut buf, offset, tn::MUST_BE_FRESH);
    }
    if !param.forwarding_hint.is_empty() {
        let fh_len: usize = param
            .forwarding_hint
            .iter()
            .map(|n| n.encoded_length())
            .sum();
        offset += write_tl_num(tn::FORWARDING_HINT, &mut buf, offset);
        offset += write_tl_num(fh_len as u64, &mut buf, offset);
        for hint in &param.forwarding_hint {
            offset += hint.encode_into(&mut buf, offset);
        }
    }
    if let Some(nonce) = param.nonce {
        offset += write_tlv(&mut buf, offset, tn::NONCE, &nonce.to_be_bytes());
    }
    if let Some(lifetime) = param.lifetime {
        offset += write_uint_tlv(&mut buf, offset, tn::INTEREST_LIFETIME, lifetime);
    }
    if let Some(hop_limit) = param.hop_limit {
        offset += write_tlv(&mut buf, offset, tn::HOP_LIMIT, &[hop_limit]);
    }

    // Signature covers ApplicationParameters through SignatureInfo; the
    // digest covers the same region plus the SignatureValue TLV
    let digest_cover_start = offset;
    if let Some(p) = app_param {
        offset += write_tlv(&mut buf, offset, tn::APP_PARAMETERS, p);
    }
    let mut sig_value_range = None;
    if let Some(info) = &sig_info_wire {
        buf[offset..offset + info.len()].copy_from_slice(info);
        offset += info.len();
        if offset > digest_cover_start {
            sig_covered.push(digest_cover_start..offset);
        }
        offset += write_tl_num(tn::INTEREST_SIGNATURE_VALUE, &mut buf, offset);
        offset += write_tl_num(sig_value_len as u64, &mut buf, offset);
        sig_value_range = Some(offset..offset + sig_value_len);
        offset += sig_value_len;
    }
    assert_eq!(offset, wire_len, "interest length pre-calculation mismatch");

    // Deferred signature fill, with in-place shrink for DER signatures
    if let (Some(signer), Some(range)) = (signer, sig_value_range) {
        let actual = {
            let (head, tail) = buf.split_at_mut(range.start);
            let covered: Vec<&[u8]> = sig_covered.iter().map(|r| &head[r.clone()] as &[u8]).collect();
            signer.write_signature_value(&mut tail[..range.len()], &covered)
        };
        if actual > range.len() {
            return Err(CodecError::SignatureOverflow {
                reserved: range.len(),
                actual,
            });
        }
        if actual < range.len() {
            shrink_trailing_signature(&mut buf, range.start, actual, range.len())?;
        }
    }

    // Deferred digest fill over everything from ApplicationParameters on
    if let Some(range) = digest_range.clone() {
        let digest = {
            let (_, tail) = buf.split_at(digest_cover_start);
            let mut h = Sha256::new();
            h.update(tail);
            h.finalize()
        };
        buf[range.clone()].copy_from_slice(&digest);
        let digest_comp =
            Component::from_bytes_typed(&buf[range], component::TYPE_PARAMETERS_SHA256)?;
        match digest_pos {
            Some(i) => {
                let mut comps: Vec<Component> = final_name.components().to_vec();
                comps[i] = digest_comp;
                final_name = Name::from_components(comps);
            }
            None => final_name.push(digest_comp),
        }
    }

    Ok((Bytes::from(buf), final_name))
}

/// Shrink a trailing SignatureValue TLV from `reserved` to `actual` bytes,
/// rewriting its length and the outer packet length in place
pub(crate) fn shrink_trailing_signature(
    buf: &mut Vec<u8>,
    value_start: usize,
    actual: usize,
    reserved: usize,
) -> CodecResult<()> {
    let delta = reserved - actual;
    if tl_num_size(actual as u64) != tl_num_size(reserved as u64) {
        // A one-byte difference in the length encoding would shift the value;
        // reserve sizes for DER signatures stay within one encoding class.
        return Err(CodecError::SignatureOverflow { reserved, actual });
    }
    let len_size = tl_num_size(reserved as u64);
    write_tl_num(actual as u64, buf, value_start - len_size);

    let (old_value_len, size_typ) = {
        let (_, size_typ) = parse_tl_num(buf, 0).expect("own buffer");
        let (len, _) = parse_tl_num(buf, size_typ).expect("own buffer");
        (len as usize, size_typ)
    };
    let new_value_len = old_value_len - delta;
    let old_len_size = tl_num_size(old_value_len as u64);
    let new_len_size = tl_num_size(new_value_len as u64);
    if old_len_size == new_len_size {
        write_tl_num(new_value_len as u64, buf, size_typ);
        buf.truncate(buf.len() - delta);
    } else {
        // The outer length dropped below an encoding boundary; close the gap
        let shift = old_len_size - new_len_size;
        write_tl_num(new_value_len as u64, buf, size_typ);
        let copy_end = buf.len() - delta;
        buf.copy_within(size_typ + old_len_size..copy_end, size_typ + new_len_size);
        buf.truncate(buf.len() - delta - shift);
    }
    Ok(())
}

/// Parse an Interest from its full wire form (outer TL included)
pub fn parse_interest(wire: Bytes) -> DecodeResult<ParsedInterest> {
    let (typ, size_typ) = parse_tl_num(&wire, 0)?;
    if typ != tn::INTEREST {
        return Err(DecodeError::TypeMismatch {
            expected: tn::INTEREST,
            actual: typ,
        });
    }
    let (length, size_len) = parse_tl_num(&wire, size_typ)?;
    let mut offset = size_typ + size_len;
    let end = offset + length as usize;
    if end > wire.len() {
        return Err(DecodeError::truncated(offset, length as usize, wire.len() - offset));
    }

    // Name with digest-component bookkeeping
    let name_start = offset;
    let (name, name_consumed) = Name::decode(&wire, offset)?;
    offset += name_consumed;
    let mut sig_covered = Vec::new();
    let mut digest_value = None;
    {
        let (_, nsize_typ) = parse_tl_num(&wire, name_start)?;
        let (_, nsize_len) = parse_tl_num(&wire, name_start + nsize_typ)?;
        let mut pos = name_start + nsize_typ + nsize_len;
        let mut cover_start = pos;
        for comp in name.iter() {
            if comp.typ() == component::TYPE_PARAMETERS_SHA256 {
                if pos > cover_start {
                    sig_covered.push(cover_start..pos);
                }
                let header = comp.len() - comp.value().len();
                digest_value = Some(pos + header..pos + comp.len());
                cover_start = pos + comp.len();
            }
            pos += comp.len();
        }
        if pos > cover_start {
            sig_covered.push(cover_start..pos);
        }
    }

    let mut param = InterestParam {
        lifetime: None,
        ..Default::default()
    };
    let mut app_param = None;
    let mut signature_info = None;
    let mut signature_value = None;
    let mut digest_cover_start = None;
    let mut sig_cover_tail: Option<std::ops::Range<usize>> = None;

    while offset < end {
        let (typ, fsize_typ) = parse_tl_num(&wire, offset)?;
        let (flen, fsize_len) = parse_tl_num(&wire, offset + fsize_typ)?;
        let start = offset + fsize_typ + fsize_len;
        let fend = start + flen as usize;
        if fend > end {
            return Err(DecodeError::truncated(offset, fend - offset, end - offset));
        }
        match typ {
            tn::CAN_BE_PREFIX => param.can_be_prefix = true,
            tn::MUST_BE_FRESH => param.must_be_fresh = true,
            tn::FORWARDING_HINT => {
                let mut pos = offset + fsize_typ + fsize_len;
                while pos < fend {
                    let (hint, consumed) = Name::decode(&wire, pos)?;
                    param.forwarding_hint.push(hint);
                    pos += consumed;
                }
            }
            tn::NONCE => param.nonce = Some(parse_uint(&wire[start..fend]) as u32),
            tn::INTEREST_LIFETIME => param.lifetime = Some(parse_uint(&wire[start..fend])),
            tn::HOP_LIMIT => {
                if flen >= 1 {
                    param.hop_limit = Some(wire[start]);
                }
            }
            tn::APP_PARAMETERS => {
                digest_cover_start.get_or_insert(offset);
                sig_cover_tail = Some(offset..fend);
                app_param = Some(wire.slice(start..fend));
            }
            tn::INTEREST_SIGNATURE_INFO => {
                digest_cover_start.get_or_insert(offset);
                sig_cover_tail = Some(match sig_cover_tail {
                    Some(r) => r.start..fend,
                    None => offset..fend,
                });
                signature_info = Some(SignatureInfo::parse_value(&wire.slice(start..fend))?);
            }
            tn::INTEREST_SIGNATURE_VALUE => {
                digest_cover_start.get_or_insert(offset);
                signature_value = Some(start..fend);
            }
            _ if is_critical(typ) => {
                return Err(DecodeError::CriticalUnknownType { typ, offset })
            }
            _ => {}
        }
        offset = fend;
    }

    if let Some(tail) = sig_cover_tail {
        sig_covered.push(tail);
    }
    let digest_covered = match digest_cover_start {
        Some(start) => vec![start..end],
        None => Vec::new(),
    };

    let sig_ptrs = SignaturePtrs {
        raw: wire.clone(),
        signature_info,
        signature_covered: if signature_value.is_some() {
            sig_covered
        } else {
            Vec::new()
        },
        signature_value,
        digest_covered,
        digest_value,
    };

    Ok(ParsedInterest {
        name,
        param,
        app_param,
        sig_ptrs,
    })
}
