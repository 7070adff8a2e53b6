//! Variable-length TLV numbers and minimal unsigned packing
//!
//! TLV type and length numbers use the NDN variable-size encoding: one byte
//! below 253, `0xFD` plus two big-endian bytes below 2^16, `0xFE` plus four
//! bytes below 2^32, `0xFF` plus eight bytes otherwise. Content integers
//! (nonces, sequence numbers, lifetimes) instead pack to the smallest of
//! 1, 2, 4 or 8 big-endian bytes.

use crate::error::{DecodeError, DecodeResult};

/// Number of bytes the TLV encoding of `val` occupies
pub fn tl_num_size(val: u64) -> usize {
    if val <= 0xFC {
        1
    } else if val <= 0xFFFF {
        3
    } else if val <= 0xFFFF_FFFF {
        5
    } else {
        9
    }
}

/// Write `val` in TLV number encoding at `buf[offset..]`, returning the
/// number of bytes written
///
/// Panics if the buffer is too short. Callers pre-compute sizes with
/// [`tl_num_size`]; a short buffer is a length-calculation bug, not an
/// input error.
pub fn write_tl_num(val: u64, buf: &mut [u8], offset: usize) -> usize {
    if val <= 0xFC {
        buf[offset] = val as u8;
        1
    } else if val <= 0xFFFF {
        buf[offset] = 0xFD;
        buf[offset + 1..offset + 3].copy_from_slice(&(val as u16).to_be_bytes());
        3
    } else if val <= 0xFFFF_FFFF {
        buf[offset] = 0xFE;
        buf[offset + 1..offset + 5].copy_from_slice(&(val as u32).to_be_bytes());
        5
    } else {
        buf[offset] = 0xFF;
        buf[offset + 1..offset + 9].copy_from_slice(&val.to_be_bytes());
        9
    }
}

/// Parse a TLV number at `buf[offset..]`, returning the value and the number
/// of bytes consumed
pub fn parse_tl_num(buf: &[u8], offset: usize) -> DecodeResult<(u64, usize)> {
    let first = *buf
        .get(offset)
        .ok_or_else(|| DecodeError::truncated(offset, 1, buf.len()))?;
    let (need, consumed) = match first {
        0..=0xFC => return Ok((u64::from(first), 1)),
        0xFD => (2, 3),
        0xFE => (4, 5),
        0xFF => (8, 9),
    };
    let rest = buf
        .get(offset + 1..offset + 1 + need)
        .ok_or_else(|| DecodeError::truncated(offset, consumed, buf.len()))?;
    let val = match need {
        2 => u64::from(u16::from_be_bytes([rest[0], rest[1]])),
        4 => u64::from(u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]])),
        _ => u64::from_be_bytes([
            rest[0], rest[1], rest[2], rest[3], rest[4], rest[5], rest[6], rest[7],
        ]),
    };
    Ok((val, consumed))
}

/// Minimally pack an unsigned integer to 1, 2, 4 or 8 big-endian bytes
pub fn pack_uint(val: u64) -> Vec<u8> {
    if val <= 0xFF {
        vec![val as u8]
    } else if val <= 0xFFFF {
        (val as u16).to_be_bytes().to_vec()
    } else if val <= 0xFFFF_FFFF {
        (val as u32).to_be_bytes().to_vec()
    } else {
        val.to_be_bytes().to_vec()
    }
}

/// Interpret `buf` as a big-endian unsigned integer
///
/// Buffers longer than 8 bytes keep only the low-order 8, matching the
/// behavior of a fixed-width accumulator.
pub fn parse_uint(buf: &[u8]) -> u64 {
    buf.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}
