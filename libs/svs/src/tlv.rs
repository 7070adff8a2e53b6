//! State vector and mapping TLV encodings
//!
//! | Type | Element |
//! |---|---|
//! | 0xC9 | StateVecWrapper |
//! | 0xCA | StateVecEntry |
//! | 0xCC | SequenceNumber |
//! | 0xCD | MappingData |
//! | 0xCE | MappingEntry |
//!
//! Entry node identifiers are names. The wrapper's whole encoding travels
//! as one name component of the sync Interest.

use bytes::Bytes;
use types::error::{DecodeError, DecodeResult};
use types::varnum::{pack_uint, parse_tl_num, parse_uint, tl_num_size, write_tl_num};
use types::Name;

pub const TYPE_STATE_VEC_WRAPPER: u64 = 0xC9;
pub const TYPE_STATE_VEC_ENTRY: u64 = 0xCA;
pub const TYPE_SEQ_NO: u64 = 0xCC;
pub const TYPE_MAPPING_DATA: u64 = 0xCD;
pub const TYPE_MAPPING_ENTRY: u64 = 0xCE;

fn wrap(typ: u64, value: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; tl_num_size(typ) + tl_num_size(value.len() as u64) + value.len()];
    let mut pos = write_tl_num(typ, &mut buf, 0);
    pos += write_tl_num(value.len() as u64, &mut buf, pos);
    buf[pos..].copy_from_slice(value);
    buf
}

fn elements(buf: &Bytes) -> DecodeResult<Vec<(u64, Bytes)>> {
    let mut ret = Vec::new();
    let mut offset = 0;
    while offset < buf.len() {
        let (typ, size_typ) = parse_tl_num(buf, offset)?;
        let (length, size_len) = parse_tl_num(buf, offset + size_typ)?;
        let start = offset + size_typ + size_len;
        let end = start + length as usize;
        if end > buf.len() {
            return Err(DecodeError::truncated(offset, end - offset, buf.len() - offset));
        }
        ret.push((typ, buf.slice(start..end)));
        offset = end;
    }
    Ok(ret)
}

/// One node's highest published sequence number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateVecEntry {
    pub node_id: Name,
    pub seq_no: u64,
}

/// The vector exchanged by sync Interests
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateVec {
    pub entries: Vec<StateVecEntry>,
}

impl StateVec {
    fn encode_value(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            let mut inner = entry.node_id.encode().to_vec();
            inner.extend_from_slice(&wrap(TYPE_SEQ_NO, &pack_uint(entry.seq_no)));
            out.extend_from_slice(&wrap(TYPE_STATE_VEC_ENTRY, &inner));
        }
        out
    }

    fn parse_value(buf: &Bytes) -> DecodeResult<Self> {
        let mut entries = Vec::new();
        for (typ, value) in elements(buf)? {
            if typ != TYPE_STATE_VEC_ENTRY {
                continue;
            }
            let mut node_id = None;
            let mut seq_no = 0;
            let mut offset = 0;
            while offset < value.len() {
                let (ityp, _) = parse_tl_num(&value, offset)?;
                if ityp == types::name::TYPE_NAME {
                    let (name, consumed) = Name::decode(&value, offset)?;
                    node_id = Some(name);
                    offset += consumed;
                    continue;
                }
                let (_, isize_typ) = parse_tl_num(&value, offset)?;
                let (ilen, isize_len) = parse_tl_num(&value, offset + isize_typ)?;
                let istart = offset + isize_typ + isize_len;
                let iend = istart + ilen as usize;
                if iend > value.len() {
                    return Err(DecodeError::truncated(offset, iend - offset, value.len() - offset));
                }
                if ityp == TYPE_SEQ_NO {
                    seq_no = parse_uint(&value[istart..iend]);
                }
                offset = iend;
            }
            let node_id = node_id
                .ok_or_else(|| DecodeError::Malformed("state vector entry lacks a node id".into()))?;
            entries.push(StateVecEntry { node_id, seq_no });
        }
        Ok(Self { entries })
    }

    /// Encode wrapped in the outer TLV, ready to use as a name component
    pub fn encode_wrapped(&self) -> Bytes {
        Bytes::from(wrap(TYPE_STATE_VEC_WRAPPER, &self.encode_value()))
    }

    /// Parse from a wrapped encoding (for instance a sync-Interest component)
    pub fn parse_wrapped(wire: &Bytes) -> DecodeResult<Self> {
        let (typ, size_typ) = parse_tl_num(wire, 0)?;
        if typ != TYPE_STATE_VEC_WRAPPER {
            return Err(DecodeError::TypeMismatch {
                expected: TYPE_STATE_VEC_WRAPPER,
                actual: typ,
            });
        }
        let (length, size_len) = parse_tl_num(wire, size_typ)?;
        let start = size_typ + size_len;
        let end = start + length as usize;
        if end > wire.len() {
            return Err(DecodeError::truncated(start, length as usize, wire.len() - start));
        }
        Self::parse_value(&wire.slice(start..end))
    }
}

/// Application name published under one sequence number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub seq_no: u64,
    pub app_name: Name,
}

/// A node's mapping from sequence numbers to application names
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MappingData {
    pub node_id: Name,
    pub entries: Vec<MappingEntry>,
}

impl MappingData {
    pub fn encode(&self) -> Bytes {
        let mut inner = self.node_id.encode().to_vec();
        for entry in &self.entries {
            let mut e = wrap(TYPE_SEQ_NO, &pack_uint(entry.seq_no));
            e.extend_from_slice(&entry.app_name.encode());
            inner.extend_from_slice(&wrap(TYPE_MAPPING_ENTRY, &e));
        }
        Bytes::from(wrap(TYPE_MAPPING_DATA, &inner))
    }

    pub fn parse(wire: &Bytes) -> DecodeResult<Self> {
        let (typ, size_typ) = parse_tl_num(wire, 0)?;
        if typ != TYPE_MAPPING_DATA {
            return Err(DecodeError::TypeMismatch {
                expected: TYPE_MAPPING_DATA,
                actual: typ,
            });
        }
        let (length, size_len) = parse_tl_num(wire, size_typ)?;
        let start = size_typ + size_len;
        let end = start + length as usize;
        if end > wire.len() {
            return Err(DecodeError::truncated(start, length as usize, wire.len() - start));
        }
        let value = wire.slice(start..end);

        let mut ret = Self::default();
        let mut offset = 0;
        let mut saw_node = false;
        while offset < value.len() {
            let (ityp, _) = parse_tl_num(&value, offset)?;
            if ityp == types::name::TYPE_NAME && !saw_node {
                let (name, consumed) = Name::decode(&value, offset)?;
                ret.node_id = name;
                saw_node = true;
                offset += consumed;
                continue;
            }
            let (_, isize_typ) = parse_tl_num(&value, offset)?;
            let (ilen, isize_len) = parse_tl_num(&value, offset + isize_typ)?;
            let istart = offset + isize_typ + isize_len;
            let iend = istart + ilen as usize;
            if iend > value.len() {
                return Err(DecodeError::truncated(offset, iend - offset, value.len() - offset));
            }
            if ityp == TYPE_MAPPING_ENTRY {
                let entry = value.slice(istart..iend);
                let mut seq_no = 0;
                let mut app_name = None;
                let mut pos = 0;
                while pos < entry.len() {
                    let (etyp, _) = parse_tl_num(&entry, pos)?;
                    if etyp == types::name::TYPE_NAME {
                        let (name, consumed) = Name::decode(&entry, pos)?;
                        app_name = Some(name);
                        pos += consumed;
                        continue;
                    }
                    let (_, esize_typ) = parse_tl_num(&entry, pos)?;
                    let (elen, esize_len) = parse_tl_num(&entry, pos + esize_typ)?;
                    let estart = pos + esize_typ + esize_len;
                    let eend = estart + elen as usize;
                    if etyp == TYPE_SEQ_NO {
                        seq_no = parse_uint(&entry[estart..eend]);
                    }
                    pos = eend;
                }
                ret.entries.push(MappingEntry {
                    seq_no,
                    app_name: app_name.ok_or_else(|| {
                        DecodeError::Malformed("mapping entry lacks an application name".into())
                    })?,
                });
            }
            offset = iend;
        }
        Ok(ret)
    }
}
