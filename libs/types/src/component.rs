//! # Name Components
//!
//! ## Purpose
//!
//! A name component is a single TLV with a small type vocabulary and an
//! arbitrary value. Components are kept in their encoded wire form so that
//! name encoding is a plain concatenation and equality is byte equality.
//!
//! Type numbers follow the NDN component assignment policy:
//!
//! | Type | Meaning |
//! |---|---|
//! | 0x01 | Implicit SHA-256 digest |
//! | 0x02 | SHA-256 digest of Interest parameters |
//! | 0x08 | Generic |
//! | 0x20 | Well-known keyword |
//! | 0x32 | Segment number |
//! | 0x34 | Byte offset |
//! | 0x36 | Version number |
//! | 0x38 | Unix timestamp in microseconds |
//! | 0x3A | Sequence number |

use std::cmp::Ordering;
use std::fmt;

use bytes::Bytes;

use crate::error::{DecodeError, DecodeResult};
use crate::varnum::{pack_uint, parse_tl_num, parse_uint, tl_num_size, write_tl_num};

pub const TYPE_INVALID: u64 = 0x00;
pub const TYPE_IMPLICIT_SHA256: u64 = 0x01;
pub const TYPE_PARAMETERS_SHA256: u64 = 0x02;
pub const TYPE_GENERIC: u64 = 0x08;
pub const TYPE_KEYWORD: u64 = 0x20;
pub const TYPE_SEGMENT: u64 = 0x32;
pub const TYPE_BYTE_OFFSET: u64 = 0x34;
pub const TYPE_VERSION: u64 = 0x36;
pub const TYPE_TIMESTAMP: u64 = 0x38;
pub const TYPE_SEQUENCE_NUM: u64 = 0x3A;

pub const MAX_COMPONENT_TYPE: u64 = 65535;

/// Unreserved URI characters plus `=` and `%`
fn in_charset(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~' | b'=' | b'%')
}

fn alternate_uri_prefix(typ: u64) -> Option<&'static str> {
    match typ {
        TYPE_SEGMENT => Some("seg"),
        TYPE_BYTE_OFFSET => Some("off"),
        TYPE_VERSION => Some("v"),
        TYPE_TIMESTAMP => Some("t"),
        TYPE_SEQUENCE_NUM => Some("seq"),
        _ => None,
    }
}

fn alternate_uri_type(prefix: &str) -> Option<u64> {
    match prefix {
        "seg" => Some(TYPE_SEGMENT),
        "off" => Some(TYPE_BYTE_OFFSET),
        "v" => Some(TYPE_VERSION),
        "t" => Some(TYPE_TIMESTAMP),
        "seq" => Some(TYPE_SEQUENCE_NUM),
        _ => None,
    }
}

/// A single name component in its encoded TLV form
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Component(Bytes);

impl Component {
    /// Construct from a value and an explicit type number
    pub fn from_bytes_typed(val: &[u8], typ: u64) -> DecodeResult<Self> {
        if typ == 0 || typ > MAX_COMPONENT_TYPE {
            return Err(DecodeError::ComponentTypeOutOfRange { typ });
        }
        let size_typ = tl_num_size(typ);
        let size_len = tl_num_size(val.len() as u64);
        let mut buf = vec![0u8; size_typ + size_len + val.len()];
        let mut pos = write_tl_num(typ, &mut buf, 0);
        pos += write_tl_num(val.len() as u64, &mut buf, pos);
        buf[pos..].copy_from_slice(val);
        Ok(Self(Bytes::from(buf)))
    }

    /// Construct a generic component from a value
    pub fn from_bytes(val: &[u8]) -> Self {
        Self::from_bytes_typed(val, TYPE_GENERIC).expect("generic type is always in range")
    }

    /// Construct from a hexadecimal string with an explicit type number
    pub fn from_hex(val: &str, typ: u64) -> DecodeResult<Self> {
        let bytes = hex::decode(val)
            .map_err(|e| DecodeError::invalid_uri(val, format!("bad hex digest: {e}")))?;
        Self::from_bytes_typed(&bytes, typ)
    }

    /// Construct from an integer with an explicit type number
    pub fn from_number(val: u64, typ: u64) -> Self {
        Self::from_bytes_typed(&pack_uint(val), typ).expect("numeric component types are in range")
    }

    pub fn from_segment(segment: u64) -> Self {
        Self::from_number(segment, TYPE_SEGMENT)
    }

    pub fn from_byte_offset(offset: u64) -> Self {
        Self::from_number(offset, TYPE_BYTE_OFFSET)
    }

    pub fn from_version(version: u64) -> Self {
        Self::from_number(version, TYPE_VERSION)
    }

    pub fn from_timestamp(timestamp: u64) -> Self {
        Self::from_number(timestamp, TYPE_TIMESTAMP)
    }

    pub fn from_sequence_num(seq_num: u64) -> Self {
        Self::from_number(seq_num, TYPE_SEQUENCE_NUM)
    }

    /// Construct from a URI string
    ///
    /// All characters must be unreserved, `%HH` escapes, or a single `=`
    /// separating an explicit type from the value. The alternate forms
    /// `sha256digest=`, `params-sha256=`, `seg=`, `off=`, `v=`, `t=` and
    /// `seq=` are recognized. An empty string denotes the zero-length
    /// generic component.
    pub fn from_str(val: &str) -> DecodeResult<Self> {
        if val.is_empty() {
            return Ok(Self(Bytes::from_static(b"\x08\x00")));
        }
        let raw = val.as_bytes();
        let mut type_offset = None;
        for (i, &b) in raw.iter().enumerate() {
            if !in_charset(b) {
                return Err(DecodeError::invalid_uri(
                    val,
                    format!("unrecognized character {:?}", b as char),
                ));
            }
            if b == b'=' {
                if type_offset.is_some() {
                    return Err(DecodeError::invalid_uri(val, "multiple TLV types present"));
                }
                type_offset = Some(i);
            }
        }
        let (typ, value_str) = match type_offset {
            Some(pos) => {
                let typ_str = &val[..pos];
                let rest = &val[pos + 1..];
                if typ_str == "sha256digest" {
                    return Self::from_hex(rest, TYPE_IMPLICIT_SHA256);
                } else if typ_str == "params-sha256" {
                    return Self::from_hex(rest, TYPE_PARAMETERS_SHA256);
                } else if let Some(typ) = alternate_uri_type(typ_str) {
                    let num = rest.parse::<u64>().map_err(|e| {
                        DecodeError::invalid_uri(val, format!("bad convention number: {e}"))
                    })?;
                    return Ok(Self::from_number(num, typ));
                }
                let typ = typ_str
                    .parse::<u64>()
                    .map_err(|e| DecodeError::invalid_uri(val, format!("bad type number: {e}")))?;
                if typ == 0 || typ > MAX_COMPONENT_TYPE {
                    return Err(DecodeError::ComponentTypeOutOfRange { typ });
                }
                (typ, rest)
            }
            None => (TYPE_GENERIC, val),
        };
        let value = unescape(value_str).map_err(|reason| DecodeError::invalid_uri(val, reason))?;
        Self::from_bytes_typed(&value, typ)
    }

    /// Wrap an already-encoded component without copying
    ///
    /// The buffer must hold exactly one well-formed component TLV.
    pub fn from_wire(wire: Bytes) -> DecodeResult<Self> {
        let (typ, size_typ) = parse_tl_num(&wire, 0)?;
        let (length, size_len) = parse_tl_num(&wire, size_typ)?;
        if wire.len() != size_typ + size_len + length as usize {
            return Err(DecodeError::LengthMismatch {
                declared: length as usize,
                actual: wire.len().saturating_sub(size_typ + size_len),
            });
        }
        if typ == 0 || typ > MAX_COMPONENT_TYPE {
            return Err(DecodeError::ComponentTypeOutOfRange { typ });
        }
        Ok(Self(wire))
    }

    /// The encoded TLV form
    pub fn wire(&self) -> &[u8] {
        &self.0
    }

    /// The encoded TLV form as shared bytes
    pub fn wire_bytes(&self) -> Bytes {
        self.0.clone()
    }

    /// The component type number
    pub fn typ(&self) -> u64 {
        parse_tl_num(&self.0, 0).expect("constructors validated the TL prefix").0
    }

    /// The component value
    pub fn value(&self) -> &[u8] {
        let (_, size_typ) = parse_tl_num(&self.0, 0).expect("validated");
        let (_, size_len) = parse_tl_num(&self.0, size_typ).expect("validated");
        &self.0[size_typ + size_len..]
    }

    /// The value interpreted as a big-endian unsigned integer
    pub fn to_number(&self) -> u64 {
        parse_uint(self.value())
    }

    /// Total encoded length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// URI form with naming conventions applied
    pub fn to_uri(&self) -> String {
        let typ = self.typ();
        let value = self.value();
        if typ == TYPE_IMPLICIT_SHA256 {
            return format!("sha256digest={}", hex::encode(value));
        }
        if typ == TYPE_PARAMETERS_SHA256 {
            return format!("params-sha256={}", hex::encode(value));
        }
        if let Some(prefix) = alternate_uri_prefix(typ) {
            return format!("{}={}", prefix, parse_uint(value));
        }
        self.plain_uri(typ, value)
    }

    /// Canonical URI form without naming conventions
    pub fn to_canonical_uri(&self) -> String {
        self.plain_uri(self.typ(), self.value())
    }

    fn plain_uri(&self, typ: u64, value: &[u8]) -> String {
        let mut ret = String::new();
        if typ != TYPE_GENERIC {
            ret.push_str(&typ.to_string());
            ret.push('=');
        }
        for &b in value {
            if in_charset(b) && b != b'%' && b != b'=' {
                ret.push(b as char);
            } else {
                ret.push_str(&format!("%{b:02X}"));
            }
        }
        ret
    }
}

/// Escape a string into a legal URI string
///
/// Characters outside the charset become percent-hexadecimal escapes of
/// their UTF-8 bytes. `%` itself passes through untouched.
pub fn escape_str(val: &str) -> String {
    let mut ret = String::new();
    for ch in val.chars() {
        let mut utf8 = [0u8; 4];
        let encoded = ch.encode_utf8(&mut utf8).as_bytes();
        if encoded.len() == 1 && in_charset(encoded[0]) {
            ret.push(ch);
        } else {
            for b in encoded {
                ret.push_str(&format!("%{b:02X}"));
            }
        }
    }
    ret
}

fn unescape(val: &str) -> Result<Vec<u8>, String> {
    let raw = val.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let digits = raw
                .get(i + 1..i + 3)
                .ok_or_else(|| "incomplete percent escape".to_string())?;
            let hex_str = std::str::from_utf8(digits).map_err(|_| "bad percent escape")?;
            let byte = u8::from_str_radix(hex_str, 16)
                .map_err(|_| format!("bad percent escape %{hex_str}"))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    Ok(out)
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Component {
    /// Canonical NDN ordering: type number, then value length, then
    /// lexicographic value bytes
    fn cmp(&self, other: &Self) -> Ordering {
        self.typ()
            .cmp(&other.typ())
            .then_with(|| self.value().len().cmp(&other.value().len()))
            .then_with(|| self.value().cmp(other.value()))
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.to_uri())
    }
}

impl AsRef<[u8]> for Component {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic() {
        let comp = Component::from_str("ndn-stack").unwrap();
        assert_eq!(comp.wire(), b"\x08\x09ndn-stack");
        assert_eq!(comp.typ(), TYPE_GENERIC);
        assert_eq!(comp.to_uri(), "ndn-stack");
        assert_eq!(Component::from_str("8=ndn-stack").unwrap(), comp);

        let comp = Component::from_wire(Bytes::from_static(b"\x08\x07foo%bar")).unwrap();
        assert_eq!(comp.to_uri(), "foo%25bar");
        assert_eq!(Component::from_str("foo%25bar").unwrap(), comp);

        let comp = Component::from_str("-._~").unwrap();
        assert_eq!(comp.wire(), b"\x08\x04-._~");
        assert_eq!(comp.to_uri(), "-._~");
    }

    #[test]
    fn test_empty_and_invalid() {
        assert_eq!(Component::from_str("").unwrap().wire(), b"\x08\x00");
        assert_eq!(Component::from_bytes(b"").wire(), b"\x08\x00");

        assert!(Component::from_str(":/?#[]@").is_err());
        assert!(Component::from_str("/").is_err());
        let comp = Component::from_bytes(b":/?#[]@");
        assert_eq!(comp.to_uri(), "%3A%2F%3F%23%5B%5D%40");
        assert_eq!(Component::from_str("%3A%2F%3F%23%5B%5D%40").unwrap(), comp);
    }

    #[test]
    fn test_sha256_forms() {
        let hex_lower = "28bad4b5275bd392dbb670c75cf0b66f13f7942b21e80f55c0e86b374753a548";
        for (typ, prefix) in [
            (TYPE_IMPLICIT_SHA256, "sha256digest="),
            (TYPE_PARAMETERS_SHA256, "params-sha256="),
        ] {
            let comp = Component::from_hex(hex_lower, typ).unwrap();
            assert_eq!(comp.typ(), typ);
            assert_eq!(comp.to_uri(), format!("{prefix}{hex_lower}"));
            assert_eq!(
                Component::from_str(&format!("{prefix}{hex_lower}")).unwrap(),
                comp
            );
            assert_eq!(
                Component::from_str(&format!("{prefix}{}", hex_lower.to_uppercase())).unwrap(),
                comp
            );
        }
    }

    #[test]
    fn test_explicit_types() {
        let comp = Component::from_wire(Bytes::from_static(b"\x09\x039=A")).unwrap();
        assert_eq!(comp.to_uri(), "9=9%3DA");
        assert_eq!(Component::from_str("9=9%3DA").unwrap(), comp);

        let comp = Component::from_wire(Bytes::from(hex::decode("FDFFFF00").unwrap())).unwrap();
        assert_eq!(comp.typ(), 0xFFFF);
        assert_eq!(comp.to_uri(), "65535=");

        let comp = Component::from_wire(Bytes::from(hex::decode("FD5765012E").unwrap())).unwrap();
        assert_eq!(comp.typ(), 0x5765);
        assert_eq!(comp.to_uri(), "22373=.");
    }

    #[test]
    fn test_bad_uris() {
        assert!(Component::from_str("0=A").is_err());
        assert!(Component::from_str("+=A").is_err());
        assert!(Component::from_str("1=2=A").is_err());
        assert!(Component::from_str("==A").is_err());
        assert!(Component::from_str("%%").is_err());
        assert!(Component::from_str("ABCD%EF%0").is_err());
        assert!(Component::from_str("ABCD%GH").is_err());
        assert!(Component::from_wire(Bytes::from_static(b"\x00\x01ABC")).is_err());
    }

    #[test]
    fn test_numbered_conventions() {
        assert_eq!(Component::from_segment(13).wire(), b"\x32\x01\x0d");
        assert_eq!(Component::from_byte_offset(13).wire(), b"\x34\x01\x0d");
        assert_eq!(Component::from_version(13).wire(), b"\x36\x01\x0d");
        assert_eq!(Component::from_sequence_num(13).wire(), b"\x3a\x01\x0d");

        let timeval = 15_686_790_223_318_112;
        let comp = Component::from_timestamp(timeval);
        assert_eq!(comp.typ(), TYPE_TIMESTAMP);
        assert_eq!(comp.value(), b"\x00\x37\xbb\x0d\x76\xed\x4c\x60");
        assert_eq!(comp.to_number(), timeval);
        assert_eq!(comp.to_uri(), format!("t={timeval}"));
        assert_eq!(Component::from_str(&format!("t={timeval}")).unwrap(), comp);
    }

    #[test]
    fn test_canonical_ordering() {
        let comps = vec![
            Component::from_hex(
                "0000000000000000000000000000000000000000000000000000000000000000",
                1,
            )
            .unwrap(),
            Component::from_hex(
                "0000000000000000000000000000000000000000000000000000000000000001",
                1,
            )
            .unwrap(),
            Component::from_hex(
                "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF",
                1,
            )
            .unwrap(),
            Component::from_bytes_typed(b"", 0x03).unwrap(),
            Component::from_bytes_typed(b"\x44", 0x03).unwrap(),
            Component::from_bytes_typed(b"\x46", 0x03).unwrap(),
            Component::from_bytes_typed(b"\x41\x41", 0x03).unwrap(),
            Component::from_str("").unwrap(),
            Component::from_str("D").unwrap(),
            Component::from_str("F").unwrap(),
            Component::from_str("AA").unwrap(),
            Component::from_str("21426=").unwrap(),
            Component::from_str("21426=%44").unwrap(),
            Component::from_str("21426=%46").unwrap(),
            Component::from_str("21426=%41%41").unwrap(),
        ];
        for (i, lhs) in comps.iter().enumerate() {
            for (j, rhs) in comps.iter().enumerate() {
                assert_eq!(lhs == rhs, i == j, "{lhs} vs {rhs}");
                assert_eq!(lhs < rhs, i < j, "{lhs} vs {rhs}");
                assert_eq!(lhs > rhs, i > j, "{lhs} vs {rhs}");
            }
        }
    }

    #[test]
    fn test_escape_str() {
        assert_eq!(escape_str("Kraus Bölter"), "Kraus%20B%C3%B6lter");
        assert_eq!(
            escape_str("all:%0a\tgcc -o a.out"),
            "all%3A%0a%09gcc%20-o%20a.out"
        );
    }

    #[test]
    fn test_round_trip() {
        for uri in ["hello", "seg=42", "v=7", "sha256digest=00ff", "257=abc"] {
            let comp = Component::from_str(uri).unwrap();
            assert_eq!(Component::from_str(&comp.to_uri()).unwrap(), comp);
            assert_eq!(
                Component::from_wire(comp.wire_bytes()).unwrap(),
                comp
            );
        }
    }
}
