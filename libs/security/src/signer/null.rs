//! Null signer producing an empty signature

use codec::{signature_type, SignatureInfo, Signer};

/// Marks a packet as intentionally unsigned (signature type 200)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSigner;

impl Signer for NullSigner {
    fn write_signature_info(&self, info: &mut SignatureInfo) {
        info.signature_type = signature_type::NULL;
        info.key_locator = None;
    }

    fn signature_value_size(&self) -> usize {
        0
    }

    fn write_signature_value(&self, _wire: &mut [u8], _covered: &[&[u8]]) -> usize {
        0
    }
}
