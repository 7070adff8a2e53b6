//! TLV type numbers for the NDN packet format, NDNLPv2 and related registries

/// Packet-level TLV types (NDN packet format 0.3)
pub mod type_number {
    pub const INTEREST: u64 = 0x05;
    pub const DATA: u64 = 0x06;
    pub const NAME: u64 = 0x07;

    pub const CAN_BE_PREFIX: u64 = 0x21;
    pub const MUST_BE_FRESH: u64 = 0x12;
    pub const FORWARDING_HINT: u64 = 0x1E;
    pub const NONCE: u64 = 0x0A;
    pub const INTEREST_LIFETIME: u64 = 0x0C;
    pub const HOP_LIMIT: u64 = 0x22;
    pub const APP_PARAMETERS: u64 = 0x24;
    pub const INTEREST_SIGNATURE_INFO: u64 = 0x2C;
    pub const INTEREST_SIGNATURE_VALUE: u64 = 0x2E;

    pub const META_INFO: u64 = 0x14;
    pub const CONTENT: u64 = 0x15;
    pub const SIGNATURE_INFO: u64 = 0x16;
    pub const SIGNATURE_VALUE: u64 = 0x17;
    pub const CONTENT_TYPE: u64 = 0x18;
    pub const FRESHNESS_PERIOD: u64 = 0x19;
    pub const FINAL_BLOCK_ID: u64 = 0x1A;

    pub const SIGNATURE_TYPE: u64 = 0x1B;
    pub const KEY_LOCATOR: u64 = 0x1C;
    pub const KEY_DIGEST: u64 = 0x1D;
    pub const SIGNATURE_NONCE: u64 = 0x26;
    pub const SIGNATURE_TIME: u64 = 0x28;
    pub const SIGNATURE_SEQ_NUM: u64 = 0x2A;

    pub const VALIDITY_PERIOD: u64 = 0xFD;
    pub const NOT_BEFORE: u64 = 0xFE;
    pub const NOT_AFTER: u64 = 0xFF;
    pub const ADDITIONAL_DESCRIPTION: u64 = 0x0102;
    pub const DESCRIPTION_ENTRY: u64 = 0x0200;
    pub const DESCRIPTION_KEY: u64 = 0x0201;
    pub const DESCRIPTION_VALUE: u64 = 0x0202;
}

/// NDNLPv2 link-layer TLV types
pub mod lp_type_number {
    pub const FRAGMENT: u64 = 0x50;
    pub const SEQUENCE: u64 = 0x51;
    pub const FRAG_INDEX: u64 = 0x52;
    pub const FRAG_COUNT: u64 = 0x53;
    pub const HOP_COUNT: u64 = 0x54;
    pub const PIT_TOKEN: u64 = 0x62;
    pub const LP_PACKET: u64 = 0x64;
    pub const NACK: u64 = 0x0320;
    pub const NACK_REASON: u64 = 0x0321;
    pub const NEXT_HOP_FACE_ID: u64 = 0x0330;
    pub const INCOMING_FACE_ID: u64 = 0x0331;
    pub const CONGESTION_MARK: u64 = 0x0340;
}

/// Signature algorithm type numbers carried in SignatureType
pub mod signature_type {
    pub const DIGEST_SHA256: u64 = 0;
    pub const SHA256_WITH_RSA: u64 = 1;
    pub const SHA256_WITH_ECDSA: u64 = 3;
    pub const HMAC_WITH_SHA256: u64 = 4;
    pub const ED25519: u64 = 5;
    pub const NULL: u64 = 200;
}

/// MetaInfo ContentType values
pub mod content_type {
    pub const BLOB: u64 = 0;
    pub const LINK: u64 = 1;
    pub const KEY: u64 = 2;
    pub const NACK: u64 = 3;
}

/// Network Nack reason codes
pub mod nack_reason {
    pub const NONE: u64 = 0;
    pub const CONGESTION: u64 = 50;
    pub const DUPLICATE: u64 = 100;
    pub const NO_ROUTE: u64 = 150;
}

/// True when an unrecognized TLV type must abort decoding
///
/// Odd type numbers are critical; even ones are skipped.
pub fn is_critical(typ: u64) -> bool {
    typ % 2 == 1
}
