//! Low-level helpers for writing TLV elements into pre-sized buffers

use types::varnum::{pack_uint, tl_num_size, write_tl_num};

/// Encoded length of a TLV holding `value_len` bytes
pub fn tlv_len(typ: u64, value_len: usize) -> usize {
    tl_num_size(typ) + tl_num_size(value_len as u64) + value_len
}

/// Encoded length of a TLV holding a minimally packed unsigned integer
pub fn uint_tlv_len(typ: u64, val: u64) -> usize {
    tlv_len(typ, pack_uint(val).len())
}

/// Write a TLV with the given raw value, returning bytes written
pub fn write_tlv(buf: &mut [u8], offset: usize, typ: u64, value: &[u8]) -> usize {
    let mut pos = offset;
    pos += write_tl_num(typ, buf, pos);
    pos += write_tl_num(value.len() as u64, buf, pos);
    buf[pos..pos + value.len()].copy_from_slice(value);
    pos + value.len() - offset
}

/// Write a TLV holding a minimally packed unsigned integer
pub fn write_uint_tlv(buf: &mut [u8], offset: usize, typ: u64, val: u64) -> usize {
    write_tlv(buf, offset, typ, &pack_uint(val))
}

/// Write an empty (zero-length) TLV
pub fn write_empty_tlv(buf: &mut [u8], offset: usize, typ: u64) -> usize {
    let mut pos = offset;
    pos += write_tl_num(typ, buf, pos);
    pos += write_tl_num(0, buf, pos);
    pos - offset
}
