//! # Hourglass Codec - NDN Packet Format 0.3
//!
//! ## Purpose
//!
//! The wire layer of the Hourglass NDN stack:
//! - Interest and Data construction with two-pass length pre-calculation,
//!   deferred signature fill-in and ParametersSha256 digest computation
//! - Single-pass parsers producing signature pointers (covered byte spans
//!   plus the signature value span) for downstream validators
//! - NDNLPv2 link-packet framing (fragment, Nack, PIT token, congestion mark)
//! - The algorithm-opaque `Signer` contract and signature structures
//! - Packet context shared by handlers and validators
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → security / client / svs
//!     ↑           ↓             ↓
//! Names      Wire rules    Trust + dispatch
//! ```
//!
//! ## What This Crate Does NOT Contain
//! - Concrete signing algorithms (belongs in `security`)
//! - Tables, dispatch or transport (belongs in `client`)

pub mod consts;
pub mod context;
pub mod data;
pub mod error;
pub mod interest;
pub mod io;
pub mod lp;
pub mod sig;
pub mod wire;

pub use consts::{content_type, is_critical, lp_type_number, nack_reason, signature_type, type_number};
pub use context::{PktContext, ValidResult};
pub use data::{make_data, make_data_with_sig_seed, parse_data, MetaInfo, ParsedData};
pub use error::{CodecError, CodecResult};
pub use interest::{make_interest, parse_interest, InterestParam, ParsedInterest};
pub use io::read_tl_num_from_stream;
pub use lp::{parse_lp_packet, wrap_with_pit_token, LpPacket};
pub use sig::{
    AdditionalDescription, KeyLocator, SignatureInfo, SignaturePtrs, Signer, ValidityPeriod,
};
