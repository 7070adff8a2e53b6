//! # Data Codec
//!
//! Builds and parses Data packets. Construction mirrors the Interest
//! builder's two passes but has no digest component; the signature covers
//! one contiguous span from the Name through the SignatureInfo.

use bytes::Bytes;
use types::error::{DecodeError, DecodeResult};
use types::varnum::{parse_tl_num, parse_uint, tl_num_size, write_tl_num};
use types::Name;

use crate::consts::{is_critical, type_number as tn};
use crate::error::{CodecError, CodecResult};
use crate::sig::{SignatureInfo, SignaturePtrs, Signer};
use crate::wire::{tlv_len, uint_tlv_len, write_tlv, write_uint_tlv};

/// Data MetaInfo
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetaInfo {
    pub content_type: Option<u64>,
    pub freshness_period: Option<u64>,
    /// Encoded component naming the final segment
    pub final_block_id: Option<Bytes>,
}

impl MetaInfo {
    pub fn with_content_type(content_type: u64) -> Self {
        Self {
            content_type: Some(content_type),
            ..Default::default()
        }
    }

    fn value_length(&self) -> usize {
        let mut len = 0;
        if let Some(ct) = self.content_type {
            len += uint_tlv_len(tn::CONTENT_TYPE, ct);
        }
        if let Some(fp) = self.freshness_period {
            len += uint_tlv_len(tn::FRESHNESS_PERIOD, fp);
        }
        if let Some(fbi) = &self.final_block_id {
            len += tlv_len(tn::FINAL_BLOCK_ID, fbi.len());
        }
        len
    }

    fn encode_value(&self, buf: &mut [u8], offset: usize) -> usize {
        let mut pos = offset;
        if let Some(ct) = self.content_type {
            pos += write_uint_tlv(buf, pos, tn::CONTENT_TYPE, ct);
        }
        if let Some(fp) = self.freshness_period {
            pos += write_uint_tlv(buf, pos, tn::FRESHNESS_PERIOD, fp);
        }
        if let Some(fbi) = &self.final_block_id {
            pos += write_tlv(buf, pos, tn::FINAL_BLOCK_ID, fbi);
        }
        pos - offset
    }

    fn parse_value(buf: &Bytes) -> DecodeResult<Self> {
        let mut ret = Self::default();
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
                tn::CONTENT_TYPE => ret.content_type = Some(parse_uint(&buf[start..end])),
                tn::FRESHNESS_PERIOD => ret.freshness_period = Some(parse_uint(&buf[start..end])),
                tn::FINAL_BLOCK_ID => ret.final_block_id = Some(buf.slice(start..end)),
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

/// A parsed Data packet with its signature pointers
#[derive(Debug, Clone)]
pub struct ParsedData {
    pub name: Name,
    pub meta_info: Option<MetaInfo>,
    pub content: Option<Bytes>,
    pub sig_ptrs: SignaturePtrs,
}

/// Build an encoded Data packet
///
/// The signature covers the Name, MetaInfo, Content and SignatureInfo; the
/// signer fills the reserved SignatureValue span in place after the single
/// allocation is laid out.
pub fn make_data(
    name: &Name,
    meta_info: &MetaInfo,
    content: Option<&[u8]>,
    signer: Option<&dyn Signer>,
) -> CodecResult<Bytes> {
    make_data_with_sig_seed(name, meta_info, content, signer, SignatureInfo::new(0))
}

/// Build a Data packet starting from a caller-provided SignatureInfo seed
///
/// Certificates use this to attach a validity period and descriptions before
/// the signer fills in its algorithm fields.
pub fn make_data_with_sig_seed(
    name: &Name,
    meta_info: &MetaInfo,
    content: Option<&[u8]>,
    signer: Option<&dyn Signer>,
    mut sig_seed: SignatureInfo,
) -> CodecResult<Bytes> {
    let sig_info_wire = signer.map(|s| {
        s.write_signature_info(&mut sig_seed);
        sig_seed.encode(tn::SIGNATURE_INFO)
    });
    let sig_value_len = signer.map(|s| s.signature_value_size()).unwrap_or(0);

    let meta_value_len = meta_info.value_length();
    let mut value_len = name.encoded_length();
    value_len += tlv_len(tn::META_INFO, meta_value_len);
    if let Some(c) = content {
        value_len += tlv_len(tn::CONTENT, c.len());
    }
    if let Some(info) = &sig_info_wire {
        value_len += info.len();
        value_len += tlv_len(tn::SIGNATURE_VALUE, sig_value_len);
    }
    let wire_len = 1 + tl_num_size(value_len as u64) + value_len;

    let mut buf = vec![0u8; wire_len];
    let mut offset = 0;
    offset += write_tl_num(tn::DATA, &mut buf, offset);
    offset += write_tl_num(value_len as u64, &mut buf, offset);

    let cover_start = offset;
    offset += name.encode_into(&mut buf, offset);
    offset += write_tl_num(tn::META_INFO, &mut buf, offset);
    offset += write_tl_num(meta_value_len as u64, &mut buf, offset);
    offset += meta_info.encode_value(&mut buf, offset);
    if let Some(c) = content {
        offset += write_tlv(&mut buf, offset, tn::CONTENT, c);
    }
    let mut sig_value_range = None;
    if let Some(info) = &sig_info_wire {
        buf[offset..offset + info.len()].copy_from_slice(info);
        offset += info.len();
        let cover_end = offset;
        offset += write_tl_num(tn::SIGNATURE_VALUE, &mut buf, offset);
        offset += write_tl_num(sig_value_len as u64, &mut buf, offset);
        sig_value_range = Some((cover_start..cover_end, offset..offset + sig_value_len));
        offset += sig_value_len;
    }
    assert_eq!(offset, wire_len, "data length pre-calculation mismatch");

    if let (Some(signer), Some((cover, range))) = (signer, sig_value_range) {
        let actual = {
            let (head, tail) = buf.split_at_mut(range.start);
            let covered: Vec<&[u8]> = vec![&head[cover]];
            signer.write_signature_value(&mut tail[..range.len()], &covered)
        };
        if actual > range.len() {
            return Err(CodecError::SignatureOverflow {
                reserved: range.len(),
                actual,
            });
        }
        if actual < range.len() {
            crate::interest::shrink_trailing_signature(&mut buf, range.start, actual, range.len())?;
        }
    }

    Ok(Bytes::from(buf))
}

/// Parse a Data packet from its full wire form (outer TL included)
pub fn parse_data(wire: Bytes) -> DecodeResult<ParsedData> {
    let (typ, size_typ) = parse_tl_num(&wire, 0)?;
    if typ != tn::DATA {
        return Err(DecodeError::TypeMismatch {
            expected: tn::DATA,
            actual: typ,
        });
    }
    let (length, size_len) = parse_tl_num(&wire, size_typ)?;
    let mut offset = size_typ + size_len;
    let end = offset + length as usize;
    if end > wire.len() {
        return Err(DecodeError::truncated(offset, length as usize, wire.len() - offset));
    }

    let cover_start = offset;
    let (name, name_consumed) = Name::decode(&wire, offset)?;
    offset += name_consumed;

    let mut meta_info = None;
    let mut content = None;
    let mut signature_info = None;
    let mut signature_value = None;
    let mut cover_end = offset;

    while offset < end {
        let (typ, fsize_typ) = parse_tl_num(&wire, offset)?;
        let (flen, fsize_len) = parse_tl_num(&wire, offset + fsize_typ)?;
        let start = offset + fsize_typ + fsize_len;
        let fend = start + flen as usize;
        if fend > end {
            return Err(DecodeError::truncated(offset, fend - offset, end - offset));
        }
        match typ {
            tn::META_INFO => {
                meta_info = Some(MetaInfo::parse_value(&wire.slice(start..fend))?);
                cover_end = fend;
            }
            tn::CONTENT => {
                content = Some(wire.slice(start..fend));
                cover_end = fend;
            }
            tn::SIGNATURE_INFO => {
                signature_info = Some(SignatureInfo::parse_value(&wire.slice(start..fend))?);
                cover_end = fend;
            }
            tn::SIGNATURE_VALUE => signature_value = Some(start..fend),
            _ if is_critical(typ) => {
                return Err(DecodeError::CriticalUnknownType { typ, offset })
            }
            _ => {}
        }
        offset = fend;
    }

    let sig_ptrs = SignaturePtrs {
        raw: wire.clone(),
        signature_info,
        signature_covered: if signature_value.is_some() {
            vec![cover_start..cover_end]
        } else {
            Vec::new()
        },
        signature_value,
        digest_covered: Vec::new(),
        digest_value: None,
    };

    Ok(ParsedData {
        name,
        meta_info,
        content,
        sig_ptrs,
    })
}
