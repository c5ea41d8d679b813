//! Remote configuration override payload (CONFIG_OVERRIDE).

use bytes::Buf;

use super::{expect_len, padded_str, put_padded, strip_padding};
use crate::errors::Result;

/// Signed request to overwrite one configuration key (port 4).
///
/// Only honored when the signature over `key ‖ value` (both zero-padded to
/// their slot widths) verifies against the event's public key; unsigned
/// overrides from the mesh are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOverride {
    /// Detached signature over the padded key and value slots.
    pub signature: [u8; Self::SIGNATURE_LEN],
    /// Configuration key, at most [`ConfigOverride::KEY_LEN`] bytes.
    pub key: String,
    /// New value, at most [`ConfigOverride::VALUE_LEN`] bytes.
    pub value: Vec<u8>,
}

impl ConfigOverride {
    /// Fixed width of the signature slot.
    pub const SIGNATURE_LEN: usize = 128;

    /// Fixed width of the key slot.
    pub const KEY_LEN: usize = 20;

    /// Fixed width of the value slot.
    pub const VALUE_LEN: usize = 80;

    /// Serialized length: `signature + key + value`.
    pub const WIRE_LEN: usize = Self::SIGNATURE_LEN + Self::KEY_LEN + Self::VALUE_LEN;

    /// The exact bytes the signature covers: key and value zero-padded to
    /// their slot widths, concatenated, as they appear on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProtocolError::FieldTooLong`] when a field exceeds
    /// its slot.
    pub fn signed_bytes(key: &str, value: &[u8]) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(Self::KEY_LEN + Self::VALUE_LEN);
        put_padded(&mut buf, "key", key.as_bytes(), Self::KEY_LEN)?;
        put_padded(&mut buf, "value", value, Self::VALUE_LEN)?;
        Ok(buf)
    }

    pub(crate) fn encode_into(&self, dst: &mut Vec<u8>) -> Result<()> {
        dst.extend_from_slice(&self.signature);
        put_padded(dst, "key", self.key.as_bytes(), Self::KEY_LEN)?;
        put_padded(dst, "value", &self.value, Self::VALUE_LEN)?;
        Ok(())
    }

    pub(crate) fn decode(mut bytes: &[u8]) -> Result<Self> {
        expect_len(bytes, Self::WIRE_LEN)?;
        let mut signature = [0u8; Self::SIGNATURE_LEN];
        signature.copy_from_slice(&bytes[..Self::SIGNATURE_LEN]);
        bytes.advance(Self::SIGNATURE_LEN);
        let key = padded_str(&bytes[..Self::KEY_LEN]);
        let value = strip_padding(&bytes[Self::KEY_LEN..]).to_vec();
        Ok(Self { signature, key, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Payload;

    #[test]
    fn config_override_round_trip() {
        let msg = ConfigOverride {
            signature: [0x11; ConfigOverride::SIGNATURE_LEN],
            key: "chat_ttl".into(),
            value: b"5".to_vec(),
        };
        let bytes = Payload::ConfigOverride(msg.clone()).encode().expect("fields fit");
        assert_eq!(bytes.len(), ConfigOverride::WIRE_LEN);
        assert_eq!(Payload::decode(4, &bytes), Payload::ConfigOverride(msg));
    }

    #[test]
    fn signed_bytes_are_padded_key_then_value() {
        let signed = ConfigOverride::signed_bytes("alias", b"alice").expect("fits");
        assert_eq!(signed.len(), ConfigOverride::KEY_LEN + ConfigOverride::VALUE_LEN);
        assert_eq!(&signed[..5], b"alias");
        assert!(signed[5..ConfigOverride::KEY_LEN].iter().all(|&b| b == 0));
        assert_eq!(&signed[ConfigOverride::KEY_LEN..ConfigOverride::KEY_LEN + 5], b"alice");
    }

    #[test]
    fn overlong_key_fails() {
        let msg = ConfigOverride {
            signature: [0; ConfigOverride::SIGNATURE_LEN],
            key: "k".repeat(21),
            value: Vec::new(),
        };
        assert!(Payload::ConfigOverride(msg).encode().is_err());
    }
}
