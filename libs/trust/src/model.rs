//! # Binary Schema Model
//!
//! ## Purpose
//!
//! The compiled trust schema: a finite-state automaton over name components
//! with typed edges, pattern constraints and signing relations, plus a
//! deterministic TLV encoding for interop. The automaton is a tree with
//! parent pointers; node identifiers index into the node list.
//!
//! | Type | Element |
//! |---|---|
//! | 0x61 | Version |
//! | 0x63 | Node |
//! | 0x25 | NodeId |
//! | 0x57 | ParentId |
//! | 0x29 | Identifier |
//! | 0x51 | ValueEdge |
//! | 0x53 | PatternEdge |
//! | 0x23 | PatternTag |
//! | 0x21 | ComponentValue |
//! | 0x43 | Constraint |
//! | 0x41 | ConstraintOption |
//! | 0x31 | UserFnCall |
//! | 0x27 | UserFnId |
//! | 0x33 | FnArgs |
//! | 0x55 | KeyNodeId |
//! | 0x67 | TagSymbol |
//! | 0x69 | NamedPatternNum |

use bytes::Bytes;
use types::error::{DecodeError, DecodeResult};
use types::varnum::{pack_uint, parse_tl_num, parse_uint, tl_num_size, write_tl_num};

/// Lowest model version this implementation accepts
pub const MIN_SUPPORTED_VERSION: u64 = 0x0001_1000;
/// Version written by this compiler
pub const VERSION: u64 = 0x0001_1000;

pub mod type_number {
    pub const COMPONENT_VALUE: u64 = 0x21;
    pub const PATTERN_TAG: u64 = 0x23;
    pub const NODE_ID: u64 = 0x25;
    pub const USER_FN_ID: u64 = 0x27;
    pub const IDENTIFIER: u64 = 0x29;
    pub const USER_FN_CALL: u64 = 0x31;
    pub const FN_ARGS: u64 = 0x33;
    pub const CONS_OPTION: u64 = 0x41;
    pub const CONSTRAINT: u64 = 0x43;
    pub const VALUE_EDGE: u64 = 0x51;
    pub const PATTERN_EDGE: u64 = 0x53;
    pub const KEY_NODE_ID: u64 = 0x55;
    pub const PARENT_ID: u64 = 0x57;
    pub const VERSION: u64 = 0x61;
    pub const NODE: u64 = 0x63;
    pub const TAG_SYMBOL: u64 = 0x67;
    pub const NAMED_PATTERN_NUM: u64 = 0x69;
}

use self::type_number as tn;

fn wrap(typ: u64, value: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; tl_num_size(typ) + tl_num_size(value.len() as u64) + value.len()];
    let mut pos = write_tl_num(typ, &mut buf, 0);
    pos += write_tl_num(value.len() as u64, &mut buf, pos);
    buf[pos..].copy_from_slice(value);
    buf
}

fn wrap_uint(typ: u64, val: u64) -> Vec<u8> {
    wrap(typ, &pack_uint(val))
}

/// Iterate the TLV elements of a value span
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

fn utf8(buf: &Bytes) -> DecodeResult<String> {
    String::from_utf8(buf.to_vec())
        .map_err(|_| DecodeError::Malformed("identifier is not UTF-8".into()))
}

/// Argument of a user-function call: a literal component or a pattern tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFnArg {
    Value(Bytes),
    Tag(u64),
}

impl UserFnArg {
    fn encode_value(&self) -> Vec<u8> {
        match self {
            UserFnArg::Value(v) => wrap(tn::COMPONENT_VALUE, v),
            UserFnArg::Tag(t) => wrap_uint(tn::PATTERN_TAG, *t),
        }
    }

    fn parse(buf: &Bytes) -> DecodeResult<Self> {
        for (typ, value) in elements(buf)? {
            match typ {
                tn::COMPONENT_VALUE => return Ok(UserFnArg::Value(value)),
                tn::PATTERN_TAG => return Ok(UserFnArg::Tag(parse_uint(&value))),
                _ => {}
            }
        }
        Err(DecodeError::Malformed("empty user function argument".into()))
    }
}

/// A user-function invocation with its argument list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFnCall {
    pub fn_id: String,
    pub args: Vec<UserFnArg>,
}

impl UserFnCall {
    fn encode_value(&self) -> Vec<u8> {
        let mut out = wrap(tn::USER_FN_ID, self.fn_id.as_bytes());
        for arg in &self.args {
            out.extend_from_slice(&wrap(tn::FN_ARGS, &arg.encode_value()));
        }
        out
    }

    fn parse(buf: &Bytes) -> DecodeResult<Self> {
        let mut fn_id = String::new();
        let mut args = Vec::new();
        for (typ, value) in elements(buf)? {
            match typ {
                tn::USER_FN_ID => fn_id = utf8(&value)?,
                tn::FN_ARGS => args.push(UserFnArg::parse(&value)?),
                _ => {}
            }
        }
        Ok(Self { fn_id, args })
    }
}

/// One alternative satisfying a constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintOption {
    /// Equal to a literal component
    Value(Bytes),
    /// Equal to the value bound to another pattern
    Tag(u64),
    /// Decided by a user function
    Fn(UserFnCall),
}

impl ConstraintOption {
    fn encode_value(&self) -> Vec<u8> {
        match self {
            ConstraintOption::Value(v) => wrap(tn::COMPONENT_VALUE, v),
            ConstraintOption::Tag(t) => wrap_uint(tn::PATTERN_TAG, *t),
            ConstraintOption::Fn(call) => wrap(tn::USER_FN_CALL, &call.encode_value()),
        }
    }

    fn parse(buf: &Bytes) -> DecodeResult<Self> {
        for (typ, value) in elements(buf)? {
            match typ {
                tn::COMPONENT_VALUE => return Ok(ConstraintOption::Value(value)),
                tn::PATTERN_TAG => return Ok(ConstraintOption::Tag(parse_uint(&value))),
                tn::USER_FN_CALL => return Ok(ConstraintOption::Fn(UserFnCall::parse(&value)?)),
                _ => {}
            }
        }
        Err(DecodeError::Malformed("empty constraint option".into()))
    }
}

/// A disjunction of options; one must match
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PatternConstraint {
    pub options: Vec<ConstraintOption>,
}

impl PatternConstraint {
    fn encode_value(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for opt in &self.options {
            out.extend_from_slice(&wrap(tn::CONS_OPTION, &opt.encode_value()));
        }
        out
    }

    fn parse(buf: &Bytes) -> DecodeResult<Self> {
        let mut options = Vec::new();
        for (typ, value) in elements(buf)? {
            if typ == tn::CONS_OPTION {
                options.push(ConstraintOption::parse(&value)?);
            }
        }
        Ok(Self { options })
    }
}

/// Edge matched by binding or re-checking a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternEdge {
    pub dest: u64,
    pub tag: u64,
    /// Conjunction of constraints that must all hold to take the edge
    pub cons_sets: Vec<PatternConstraint>,
}

impl PatternEdge {
    fn encode_value(&self) -> Vec<u8> {
        let mut out = wrap_uint(tn::NODE_ID, self.dest);
        out.extend_from_slice(&wrap_uint(tn::PATTERN_TAG, self.tag));
        for cons in &self.cons_sets {
            out.extend_from_slice(&wrap(tn::CONSTRAINT, &cons.encode_value()));
        }
        out
    }

    fn parse(buf: &Bytes) -> DecodeResult<Self> {
        let mut dest = 0;
        let mut tag = 0;
        let mut cons_sets = Vec::new();
        for (typ, value) in elements(buf)? {
            match typ {
                tn::NODE_ID => dest = parse_uint(&value),
                tn::PATTERN_TAG => tag = parse_uint(&value),
                tn::CONSTRAINT => cons_sets.push(PatternConstraint::parse(&value)?),
                _ => {}
            }
        }
        Ok(Self {
            dest,
            tag,
            cons_sets,
        })
    }
}

/// Edge matched by exact component bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueEdge {
    pub dest: u64,
    pub value: Bytes,
}

impl ValueEdge {
    fn encode_value(&self) -> Vec<u8> {
        let mut out = wrap_uint(tn::NODE_ID, self.dest);
        out.extend_from_slice(&wrap(tn::COMPONENT_VALUE, &self.value));
        out
    }

    fn parse(buf: &Bytes) -> DecodeResult<Self> {
        let mut dest = 0;
        let mut value = Bytes::new();
        for (typ, v) in elements(buf)? {
            match typ {
                tn::NODE_ID => dest = parse_uint(&v),
                tn::COMPONENT_VALUE => value = v,
                _ => {}
            }
        }
        Ok(Self { dest, value })
    }
}

/// One automaton state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    pub id: u64,
    pub parent: Option<u64>,
    /// Rules whose chains terminate at this node
    pub rule_names: Vec<String>,
    pub v_edges: Vec<ValueEdge>,
    pub p_edges: Vec<PatternEdge>,
    /// Terminal node ids of rules accepted to sign packets ending here
    pub sign_cons: Vec<u64>,
}

impl Node {
    fn encode_value(&self) -> Vec<u8> {
        let mut out = wrap_uint(tn::NODE_ID, self.id);
        if let Some(parent) = self.parent {
            out.extend_from_slice(&wrap_uint(tn::PARENT_ID, parent));
        }
        for rule in &self.rule_names {
            out.extend_from_slice(&wrap(tn::IDENTIFIER, rule.as_bytes()));
        }
        for edge in &self.v_edges {
            out.extend_from_slice(&wrap(tn::VALUE_EDGE, &edge.encode_value()));
        }
        for edge in &self.p_edges {
            out.extend_from_slice(&wrap(tn::PATTERN_EDGE, &edge.encode_value()));
        }
        for key in &self.sign_cons {
            out.extend_from_slice(&wrap_uint(tn::KEY_NODE_ID, *key));
        }
        out
    }

    fn parse(buf: &Bytes) -> DecodeResult<Self> {
        let mut ret = Self::default();
        for (typ, value) in elements(buf)? {
            match typ {
                tn::NODE_ID => ret.id = parse_uint(&value),
                tn::PARENT_ID => ret.parent = Some(parse_uint(&value)),
                tn::IDENTIFIER => ret.rule_names.push(utf8(&value)?),
                tn::VALUE_EDGE => ret.v_edges.push(ValueEdge::parse(&value)?),
                tn::PATTERN_EDGE => ret.p_edges.push(PatternEdge::parse(&value)?),
                tn::KEY_NODE_ID => ret.sign_cons.push(parse_uint(&value)),
                _ => {}
            }
        }
        Ok(ret)
    }
}

/// Maps a named pattern tag back to its textual identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSymbol {
    pub tag: u64,
    pub ident: String,
}

/// The complete compiled schema
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LvsModel {
    pub version: u64,
    pub start_id: u64,
    pub named_pattern_cnt: u64,
    pub nodes: Vec<Node>,
    pub symbols: Vec<TagSymbol>,
}

impl LvsModel {
    /// Deterministic TLV encoding; identical models produce identical bytes
    pub fn encode(&self) -> Bytes {
        let mut out = wrap_uint(tn::VERSION, self.version);
        out.extend_from_slice(&wrap_uint(tn::NODE_ID, self.start_id));
        out.extend_from_slice(&wrap_uint(tn::NAMED_PATTERN_NUM, self.named_pattern_cnt));
        for node in &self.nodes {
            out.extend_from_slice(&wrap(tn::NODE, &node.encode_value()));
        }
        for symbol in &self.symbols {
            let mut sym = wrap_uint(tn::PATTERN_TAG, symbol.tag);
            sym.extend_from_slice(&wrap(tn::IDENTIFIER, symbol.ident.as_bytes()));
            out.extend_from_slice(&wrap(tn::TAG_SYMBOL, &sym));
        }
        Bytes::from(out)
    }

    /// Decode a model; rejects unsupported versions
    pub fn decode(wire: &Bytes) -> DecodeResult<Self> {
        let mut ret = Self::default();
        for (typ, value) in elements(wire)? {
            match typ {
                tn::VERSION => ret.version = parse_uint(&value),
                tn::NODE_ID => ret.start_id = parse_uint(&value),
                tn::NAMED_PATTERN_NUM => ret.named_pattern_cnt = parse_uint(&value),
                tn::NODE => ret.nodes.push(Node::parse(&value)?),
                tn::TAG_SYMBOL => {
                    let mut tag = 0;
                    let mut ident = String::new();
                    for (styp, svalue) in elements(&value)? {
                        match styp {
                            tn::PATTERN_TAG => tag = parse_uint(&svalue),
                            tn::IDENTIFIER => ident = utf8(&svalue)?,
                            _ => {}
                        }
                    }
                    ret.symbols.push(TagSymbol { tag, ident });
                }
                _ => {}
            }
        }
        if ret.version < MIN_SUPPORTED_VERSION {
            return Err(DecodeError::Malformed(format!(
                "unsupported schema model version {:#x}",
                ret.version
            )));
        }
        // Node ids must index the node list for the checker's tree walk
        for (idx, node) in ret.nodes.iter().enumerate() {
            if node.id != idx as u64 {
                return Err(DecodeError::Malformed(format!(
                    "node id {} out of order at position {idx}",
                    node.id
                )));
            }
        }
        Ok(ret)
    }
}
