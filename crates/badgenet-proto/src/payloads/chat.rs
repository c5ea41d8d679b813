//! Chat payloads (TEXT_CHAT / SIGNED_TEXT_CHAT).

use bytes::{Buf, BufMut};

use super::{expect_len, padded_str, put_padded};
use crate::errors::Result;

/// Text message to a chat channel (port 6).
///
/// Channels are numbered `frequency_slot * 100 + topic`; the channel number
/// travels in the payload so a node parked on one frequency can still sort
/// messages into topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChat {
    /// Chat channel number.
    pub channel: u16,
    /// Sender's display alias, at most [`TextChat::ALIAS_LEN`] bytes.
    pub alias: String,
    /// Message text, at most [`TextChat::TEXT_LEN`] bytes.
    pub text: String,
}

impl TextChat {
    /// Fixed width of the alias slot.
    pub const ALIAS_LEN: usize = 10;

    /// Fixed width of the text slot.
    pub const TEXT_LEN: usize = 100;

    /// Serialized length: `u16 + alias + text`.
    pub const WIRE_LEN: usize = 2 + Self::ALIAS_LEN + Self::TEXT_LEN;

    pub(crate) fn encode_into(&self, dst: &mut Vec<u8>) -> Result<()> {
        dst.put_u16(self.channel);
        put_padded(dst, "alias", self.alias.as_bytes(), Self::ALIAS_LEN)?;
        put_padded(dst, "text", self.text.as_bytes(), Self::TEXT_LEN)?;
        Ok(())
    }

    pub(crate) fn decode(mut bytes: &[u8]) -> Result<Self> {
        expect_len(bytes, Self::WIRE_LEN)?;
        let channel = bytes.get_u16();
        let alias = padded_str(&bytes[..Self::ALIAS_LEN]);
        let text = padded_str(&bytes[Self::ALIAS_LEN..]);
        Ok(Self { channel, alias, text })
    }
}

/// Text message with an authenticity signature (port 7).
///
/// The signature covers the padded text slot only, not the frame headers;
/// receivers drop messages whose signature the configured verifier rejects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTextChat {
    /// Chat channel number.
    pub channel: u16,
    /// Sender's display alias, at most [`TextChat::ALIAS_LEN`] bytes.
    pub alias: String,
    /// Detached signature over the zero-padded text slot.
    pub signature: [u8; Self::SIGNATURE_LEN],
    /// Message text, at most [`SignedTextChat::TEXT_LEN`] bytes.
    pub text: String,
}

impl SignedTextChat {
    /// Fixed width of the signature slot.
    pub const SIGNATURE_LEN: usize = 128;

    /// Fixed width of the text slot (shorter than unsigned chat; the
    /// signature eats the difference).
    pub const TEXT_LEN: usize = 90;

    /// Serialized length: `u16 + alias + signature + text`.
    pub const WIRE_LEN: usize =
        2 + TextChat::ALIAS_LEN + Self::SIGNATURE_LEN + Self::TEXT_LEN;

    /// The exact bytes the signature covers: the text zero-padded to its
    /// full slot width, as it appears on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProtocolError::FieldTooLong`] when the text exceeds
    /// its slot.
    pub fn signed_bytes(text: &str) -> Result<[u8; Self::TEXT_LEN]> {
        let mut slot = Vec::with_capacity(Self::TEXT_LEN);
        put_padded(&mut slot, "text", text.as_bytes(), Self::TEXT_LEN)?;
        let mut arr = [0u8; Self::TEXT_LEN];
        arr.copy_from_slice(&slot);
        Ok(arr)
    }

    pub(crate) fn encode_into(&self, dst: &mut Vec<u8>) -> Result<()> {
        dst.put_u16(self.channel);
        put_padded(dst, "alias", self.alias.as_bytes(), TextChat::ALIAS_LEN)?;
        dst.put_slice(&self.signature);
        put_padded(dst, "text", self.text.as_bytes(), Self::TEXT_LEN)?;
        Ok(())
    }

    pub(crate) fn decode(mut bytes: &[u8]) -> Result<Self> {
        expect_len(bytes, Self::WIRE_LEN)?;
        let channel = bytes.get_u16();
        let alias = padded_str(&bytes[..TextChat::ALIAS_LEN]);
        bytes.advance(TextChat::ALIAS_LEN);
        let mut signature = [0u8; Self::SIGNATURE_LEN];
        signature.copy_from_slice(&bytes[..Self::SIGNATURE_LEN]);
        bytes.advance(Self::SIGNATURE_LEN);
        let text = padded_str(bytes);
        Ok(Self { channel, alias, signature, text })
    }
}
