//! # NDN Names
//!
//! A name is an ordered sequence of components. The wire form is TLV type
//! 0x07 wrapping the concatenated component encodings; the URI form joins
//! component URIs with `/`.

use std::fmt;
use std::ops::{Index, Range, RangeFrom, RangeTo};

use bytes::Bytes;

use crate::component::{self, Component};
use crate::error::{DecodeError, DecodeResult};
use crate::varnum::{parse_tl_num, tl_num_size, write_tl_num};

/// The TLV type of an NDN Name
pub const TYPE_NAME: u64 = 0x07;

/// An ordered sequence of name components
#[derive(Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Name(Vec<Component>);

impl Name {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_components(components: Vec<Component>) -> Self {
        Self(components)
    }

    /// Parse a name from a URI string
    ///
    /// Leading and trailing `/` are removed. Characters outside the component
    /// charset are escaped automatically. Two adjacent slashes denote a
    /// zero-length generic component.
    pub fn from_str(val: &str) -> DecodeResult<Self> {
        let mut val = val;
        let mut cnt_slash = 0;
        if let Some(stripped) = val.strip_prefix('/') {
            val = stripped;
            cnt_slash += 1;
        }
        if let Some(stripped) = val.strip_suffix('/') {
            val = stripped;
            cnt_slash += 1;
        }
        if val.is_empty() && cnt_slash <= 1 {
            return Ok(Self::new());
        }
        val.split('/')
            .map(|part| Component::from_str(&component::escape_str(part)))
            .collect::<DecodeResult<Vec<_>>>()
            .map(Self)
    }

    /// Decode a name from its wire form at `buf[offset..]`, returning the
    /// name and the number of bytes consumed
    pub fn decode(buf: &Bytes, offset: usize) -> DecodeResult<(Self, usize)> {
        let origin = offset;
        let (typ, size_typ) = parse_tl_num(buf, offset)?;
        let mut offset = offset + size_typ;
        if typ != TYPE_NAME {
            return Err(DecodeError::TypeMismatch {
                expected: TYPE_NAME,
                actual: typ,
            });
        }
        let (length, size_len) = parse_tl_num(buf, offset)?;
        offset += size_len;
        let length = length as usize;
        if length > buf.len() - offset {
            return Err(DecodeError::truncated(offset, length, buf.len() - offset));
        }
        let mut components = Vec::new();
        let end = offset + length;
        while offset < end {
            let start = offset;
            let (_, size_typ_comp) = parse_tl_num(buf, offset)?;
            offset += size_typ_comp;
            let (len_comp, size_len_comp) = parse_tl_num(buf, offset)?;
            offset += size_len_comp + len_comp as usize;
            if offset > end {
                return Err(DecodeError::truncated(start, offset - start, end - start));
            }
            components.push(Component::from_wire(buf.slice(start..offset))?);
        }
        Ok((Self(components), offset - origin))
    }

    /// Decode a name occupying the whole buffer
    pub fn from_wire(buf: &Bytes) -> DecodeResult<Self> {
        let (name, consumed) = Self::decode(buf, 0)?;
        if consumed != buf.len() {
            return Err(DecodeError::LengthMismatch {
                declared: consumed,
                actual: buf.len(),
            });
        }
        Ok(name)
    }

    /// Wire length, TL included
    pub fn encoded_length(&self) -> usize {
        let length = self.value_length();
        1 + tl_num_size(length as u64) + length
    }

    /// Summed component lengths, name TL excluded
    pub fn value_length(&self) -> usize {
        self.0.iter().map(|c| c.len()).sum()
    }

    /// Encode into `buf[offset..]`, returning bytes written
    ///
    /// Panics on short buffers; sizes come from [`Self::encoded_length`].
    pub fn encode_into(&self, buf: &mut [u8], offset: usize) -> usize {
        let origin = offset;
        let mut offset = offset + write_tl_num(TYPE_NAME, buf, offset);
        offset += write_tl_num(self.value_length() as u64, buf, offset);
        for comp in &self.0 {
            buf[offset..offset + comp.len()].copy_from_slice(comp.wire());
            offset += comp.len();
        }
        offset - origin
    }

    /// Encode to a fresh buffer
    pub fn encode(&self) -> Bytes {
        let mut buf = vec![0u8; self.encoded_length()];
        self.encode_into(&mut buf, 0);
        Bytes::from(buf)
    }

    /// URI form with naming conventions
    pub fn to_uri(&self) -> String {
        self.uri_with(Component::to_uri)
    }

    /// Canonical URI form without naming conventions
    pub fn to_canonical_uri(&self) -> String {
        self.uri_with(Component::to_canonical_uri)
    }

    fn uri_with(&self, f: impl Fn(&Component) -> String) -> String {
        let mut ret = String::from("/");
        ret.push_str(
            &self
                .0
                .iter()
                .map(|c| f(c))
                .collect::<Vec<_>>()
                .join("/"),
        );
        if let Some(last) = self.0.last() {
            if last.wire() == b"\x08\x00" {
                ret.push('/');
            }
        }
        ret
    }

    /// Test whether `self` is a prefix of `other`
    pub fn is_prefix(&self, other: &Name) -> bool {
        self.0.len() <= other.0.len() && self.0[..] == other.0[..self.0.len()]
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn components(&self) -> &[Component] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Component> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&Component> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&Component> {
        self.0.last()
    }

    pub fn get(&self, idx: usize) -> Option<&Component> {
        self.0.get(idx)
    }

    pub fn push(&mut self, comp: Component) {
        self.0.push(comp);
    }

    /// A new name holding the first `n` components
    pub fn prefix(&self, n: usize) -> Name {
        Self(self.0[..n.min(self.0.len())].to_vec())
    }

    /// A new name with `comp` appended
    pub fn appending(&self, comp: Component) -> Name {
        let mut components = self.0.clone();
        components.push(comp);
        Self(components)
    }

    /// A new name that is `self` followed by every component of `other`
    pub fn join(&self, other: &Name) -> Name {
        let mut components = self.0.clone();
        components.extend_from_slice(&other.0);
        Self(components)
    }

    pub fn pop(&mut self) -> Option<Component> {
        self.0.pop()
    }
}

impl Index<usize> for Name {
    type Output = Component;
    fn index(&self, idx: usize) -> &Component {
        &self.0[idx]
    }
}

impl Index<Range<usize>> for Name {
    type Output = [Component];
    fn index(&self, range: Range<usize>) -> &[Component] {
        &self.0[range]
    }
}

impl Index<RangeFrom<usize>> for Name {
    type Output = [Component];
    fn index(&self, range: RangeFrom<usize>) -> &[Component] {
        &self.0[range]
    }
}

impl Index<RangeTo<usize>> for Name {
    type Output = [Component];
    fn index(&self, range: RangeTo<usize>) -> &[Component] {
        &self.0[range]
    }
}

impl FromIterator<Component> for Name {
    fn from_iter<T: IntoIterator<Item = Component>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<Component>> for Name {
    fn from(components: Vec<Component>) -> Self {
        Self(components)
    }
}

impl<'a> IntoIterator for &'a Name {
    type Item = &'a Component;
    type IntoIter = std::slice::Iter<'a, Component>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.to_uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_from_str() {
        let name = Name::from_str("example/name").unwrap();
        assert_eq!(name.len(), 2);
        assert_eq!(name[0].wire(), b"\x08\x07example");
        assert_eq!(name[1].wire(), b"\x08\x04name");
        assert_eq!(Name::from_str("/example/name").unwrap(), name);

        let name = Name::from_str("/a//32=b/").unwrap();
        assert_eq!(name.len(), 3);
        assert_eq!(name[0].wire(), b"\x08\x01a");
        assert_eq!(name[1].wire(), b"\x08\x00");
        assert_eq!(name[2].wire(), b"\x20\x01b");

        let name = Name::from_str("/a/../b").unwrap();
        assert_eq!(name[1].wire(), b"\x08\x02..");

        assert!(Name::from_str("/").unwrap().is_empty());
        assert!(Name::from_str("").unwrap().is_empty());
    }

    #[test]
    fn test_escaping_on_input() {
        let name = Name::from_str("Σπυρίδων").unwrap();
        assert_eq!(
            name.to_uri(),
            "/%CE%A3%CF%80%CF%85%CF%81%CE%AF%CE%B4%CF%89%CE%BD"
        );
    }

    #[test]
    fn test_wire_round_trip() {
        let name = Name::from_str("/local/ndn/prefix").unwrap();
        let wire = name.encode();
        assert_eq!(
            wire.as_ref(),
            &hex!("0714 0805 6c6f63616c 0803 6e646e 0806 707265666978")
        );
        let decoded = Name::from_wire(&wire).unwrap();
        assert_eq!(decoded, name);
    }

    #[test]
    fn test_trailing_empty_component_uri() {
        let name = Name::from_str("/a//").unwrap();
        assert_eq!(name.len(), 2);
        assert_eq!(name.to_uri(), "/a//");
        assert_eq!(Name::from_str(&name.to_uri()).unwrap(), name);
    }

    #[test]
    fn test_is_prefix() {
        let a = Name::from_str("/a/b").unwrap();
        let b = Name::from_str("/a/b/c").unwrap();
        assert!(a.is_prefix(&b));
        assert!(!b.is_prefix(&a));
        assert!(a.is_prefix(&a));
        assert!(Name::new().is_prefix(&a));
    }

    #[test]
    fn test_decode_rejects_wrong_type() {
        let buf = Bytes::from_static(b"\x08\x03abc");
        assert!(matches!(
            Name::decode(&buf, 0),
            Err(DecodeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_truncated() {
        let buf = Bytes::from_static(b"\x07\x10\x08\x03abc");
        assert!(Name::decode(&buf, 0).is_err());
    }

    #[test]
    fn test_uri_round_trip() {
        for uri in [
            "/local/ndn/prefix",
            "/a/seg=1/v=2",
            "/a/sha256digest=28bad4b5275bd392dbb670c75cf0b66f13f7942b21e80f55c0e86b374753a548",
            "/%00%01/b",
        ] {
            let name = Name::from_str(uri).unwrap();
            assert_eq!(Name::from_str(&name.to_uri()).unwrap(), name);
        }
    }
}
