//! # Hourglass Types - Names and TLV Primitives
//!
//! ## Purpose
//!
//! Foundation crate for the Hourglass NDN stack. Contains the pure data
//! layer shared by every other crate:
//! - Variable-length TLV type/length numbers and minimal unsigned packing
//! - Name components with the full NDN type vocabulary
//! - Names with wire and URI conversions and prefix tests
//! - Decode errors with diagnostic context
//!
//! ## What This Crate Does NOT Contain
//! - Packet construction or parsing (belongs in `codec`)
//! - Signing or verification (belongs in `security`)
//! - Any I/O or async machinery

pub mod component;
pub mod error;
pub mod name;
pub mod varnum;

pub use component::Component;
pub use error::{DecodeError, DecodeResult};
pub use name::Name;
pub use varnum::{pack_uint, parse_tl_num, tl_num_size, write_tl_num};
