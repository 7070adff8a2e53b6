//! Small helpers shared across the client

use rand::Rng;

/// Milliseconds since the Unix epoch
pub fn timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A fresh nonzero 32-bit Interest nonce
pub fn gen_nonce() -> u32 {
    rand::thread_rng().gen_range(1..u32::MAX)
}

/// A fresh nonzero 64-bit signature nonce
pub fn gen_nonce_64() -> u64 {
    rand::thread_rng().gen_range(1..u64::MAX)
}
