//! Packet handling context shared between the dispatcher, handlers and
//! validators

use std::time::Instant;

use bytes::Bytes;

use crate::data::MetaInfo;
use crate::interest::InterestParam;
use crate::sig::SignaturePtrs;

/// Outcome of a validator run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidResult {
    /// Signature checked out against trust policy
    Pass,
    /// Policy explicitly waives the check for this packet
    AllowBypass,
    /// Signature or policy check failed
    Fail,
    /// The validator could not finish in time
    Timeout,
}

impl ValidResult {
    /// True when the packet may proceed to the application
    pub fn is_acceptable(self) -> bool {
        matches!(self, ValidResult::Pass | ValidResult::AllowBypass)
    }
}

/// Context attached to every delivered Interest or Data
///
/// Interest contexts carry the Interest parameters and any PIT token;
/// Data contexts carry the MetaInfo. Both expose the raw packet and the
/// signature pointers for validators.
#[derive(Debug, Clone)]
pub struct PktContext {
    pub meta_info: Option<MetaInfo>,
    pub int_param: Option<InterestParam>,
    pub sig_ptrs: SignaturePtrs,
    pub raw_packet: Bytes,
    pub pit_token: Option<Bytes>,
    pub congestion_mark: Option<u64>,
    pub deadline: Instant,
}

impl PktContext {
    pub fn new(deadline: Instant) -> Self {
        Self {
            meta_info: None,
            int_param: None,
            sig_ptrs: SignaturePtrs::empty(),
            raw_packet: Bytes::new(),
            pit_token: None,
            congestion_mark: None,
            deadline,
        }
    }
}
