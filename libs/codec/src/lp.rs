//! # NDNLPv2 Link-Layer Framing
//!
//! Unwraps inbound link packets (fragment, Nack reason, PIT token,
//! congestion mark) and wraps outbound Data in a link packet carrying the
//! PIT token it arrived with. Unrecognized link headers are skipped; NDNLPv2
//! headers are hop-by-hop and ignorable by endpoints.

use bytes::Bytes;
use types::error::{DecodeError, DecodeResult};
use types::varnum::{parse_tl_num, parse_uint, tl_num_size, write_tl_num};

use crate::consts::lp_type_number as lp;
use crate::wire::{tlv_len, write_tlv};

/// Semantic contents of a parsed link packet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LpPacket {
    pub fragment: Option<Bytes>,
    pub nack_reason: Option<u64>,
    pub pit_token: Option<Bytes>,
    pub congestion_mark: Option<u64>,
}

/// Parse a link packet from its full wire form (outer TL included)
pub fn parse_lp_packet(wire: &Bytes) -> DecodeResult<LpPacket> {
    let (typ, size_typ) = parse_tl_num(wire, 0)?;
    if typ != lp::LP_PACKET {
        return Err(DecodeError::TypeMismatch {
            expected: lp::LP_PACKET,
            actual: typ,
        });
    }
    let (length, size_len) = parse_tl_num(wire, size_typ)?;
    let mut offset = size_typ + size_len;
    let end = offset + length as usize;
    if end > wire.len() {
        return Err(DecodeError::truncated(offset, length as usize, wire.len() - offset));
    }

    let mut ret = LpPacket::default();
    while offset < end {
        let (typ, fsize_typ) = parse_tl_num(wire, offset)?;
        let (flen, fsize_len) = parse_tl_num(wire, offset + fsize_typ)?;
        let start = offset + fsize_typ + fsize_len;
        let fend = start + flen as usize;
        if fend > end {
            return Err(DecodeError::truncated(offset, fend - offset, end - offset));
        }
        match typ {
            lp::FRAGMENT => ret.fragment = Some(wire.slice(start..fend)),
            lp::PIT_TOKEN => ret.pit_token = Some(wire.slice(start..fend)),
            lp::CONGESTION_MARK => ret.congestion_mark = Some(parse_uint(&wire[start..fend])),
            lp::NACK => {
                // Nack with no reason TLV means reason "none"
                let mut reason = 0;
                let mut pos = start;
                while pos < fend {
                    let (ityp, isize_typ) = parse_tl_num(wire, pos)?;
                    let (ilen, isize_len) = parse_tl_num(wire, pos + isize_typ)?;
                    let istart = pos + isize_typ + isize_len;
                    let iend = istart + ilen as usize;
                    if iend > fend {
                        return Err(DecodeError::truncated(pos, iend - pos, fend - pos));
                    }
                    if ityp == lp::NACK_REASON {
                        reason = parse_uint(&wire[istart..iend]);
                    }
                    pos = iend;
                }
                ret.nack_reason = Some(reason);
            }
            _ => {}
        }
        offset = fend;
    }
    Ok(ret)
}

/// Wrap an encoded packet in a link packet bearing a PIT token
pub fn wrap_with_pit_token(packet: &[u8], pit_token: &[u8]) -> Bytes {
    let value_len = tlv_len(lp::PIT_TOKEN, pit_token.len()) + tlv_len(lp::FRAGMENT, packet.len());
    let total = tl_num_size(lp::LP_PACKET) + tl_num_size(value_len as u64) + value_len;
    let mut buf = vec![0u8; total];
    let mut pos = write_tl_num(lp::LP_PACKET, &mut buf, 0);
    pos += write_tl_num(value_len as u64, &mut buf, pos);
    pos += write_tlv(&mut buf, pos, lp::PIT_TOKEN, pit_token);
    write_tlv(&mut buf, pos, lp::FRAGMENT, packet);
    Bytes::from(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_parse_nack() {
        let wire = Bytes::copy_from_slice(&hex!(
            "6436 fd0320 05 fd0321 01 96"
            "502b 0529 071f 0809 6c6f63616c686f7374 0803 6e6664 0805 6661636573 0806 6576656e7473"
            "2100 1200 0c02 03e8"
        ));
        let lp_pkt = parse_lp_packet(&wire).unwrap();
        assert_eq!(lp_pkt.nack_reason, Some(150));
        let frag = lp_pkt.fragment.unwrap();
        assert_eq!(frag[0], 0x05);
        assert!(lp_pkt.pit_token.is_none());
    }

    #[test]
    fn test_parse_pit_token() {
        let wire = Bytes::copy_from_slice(&hex!(
            "641f 6204 01020304 5017 0515 0710 0803 6e6f74 0809 696d706f7274616e74 0c01 05"
        ));
        let lp_pkt = parse_lp_packet(&wire).unwrap();
        assert_eq!(lp_pkt.pit_token.as_deref(), Some(&[1u8, 2, 3, 4][..]));
        assert!(lp_pkt.nack_reason.is_none());
        assert!(lp_pkt.fragment.is_some());
    }

    #[test]
    fn test_parse_congestion_mark() {
        let wire = Bytes::copy_from_slice(&hex!(
            "641e fd0340 01 01 5017 0515 0710 0803 6e6f74 0809 696d706f7274616e74 0c01 05"
        ));
        let lp_pkt = parse_lp_packet(&wire).unwrap();
        assert_eq!(lp_pkt.congestion_mark, Some(1));
    }

    #[test]
    fn test_wrap_with_pit_token() {
        let data = hex!(
            "0624 0710 0803 6e6f74 0809 696d706f7274616e74 1403 180100 1504 74657374"
            "1603 1b01c8 1700"
        );
        let wire = wrap_with_pit_token(&data, &[0x01, 0x02, 0x03, 0x04]);
        let mut expected = hex!("642e 6204 01020304 5026").to_vec();
        expected.extend_from_slice(&data);
        assert_eq!(wire.as_ref(), &expected[..]);

        let lp_pkt = parse_lp_packet(&wire).unwrap();
        assert_eq!(lp_pkt.fragment.as_deref(), Some(&data[..]));
        assert_eq!(lp_pkt.pit_token.as_deref(), Some(&[1u8, 2, 3, 4][..]));
    }
}
