//! Fixed-layout typed payloads.
//!
//! Frame headers select a payload layout by port. Layouts are fixed-length
//! records of big-endian scalars and fixed-width byte arrays - short fields
//! are zero-padded on encode and zero-stripped on decode, so `"hi"` in a
//! 100-byte text slot costs nothing to type but always serializes to 100
//! bytes on the wire.
//!
//! The [`Payload`] enum covers the reserved ports this crate owns; anything
//! else decodes to [`Payload::Unknown`], which preserves the raw bytes so
//! the frame can still be flood-forwarded.
//!
//! # Invariants
//!
//! - Each typed variant maps to exactly one reserved port.
//! - Encoding a typed payload always yields exactly its layout's length.
//! - Decoding requires exactly the layout's length; any other length falls
//!   back to `Unknown`.

mod chat;
mod config;
mod net_tools;

use bytes::{BufMut, Bytes};
pub use chat::{SignedTextChat, TextChat};
pub use config::ConfigOverride;
pub use net_tools::{Ping, Pong};

use crate::errors::{ProtocolError, Result};

/// All payloads with a reserved port, plus the raw catch-all.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Connectivity probe (port 1).
    Ping(Ping),
    /// Probe response (port 2).
    Pong(Pong),
    /// Signed configuration override (port 4).
    ConfigOverride(ConfigOverride),
    /// Channelized text chat (port 6).
    TextChat(TextChat),
    /// Text chat with authenticity signature (port 7).
    SignedTextChat(SignedTextChat),
    /// Raw bytes of a payload no layout here explains.
    Unknown(Bytes),
}

impl Payload {
    /// Decode payload bytes according to the frame's port.
    ///
    /// Falls back to [`Payload::Unknown`] when the port is not reserved or
    /// the byte length does not match the port's layout; the frame stays
    /// usable for forwarding either way.
    #[must_use]
    pub fn decode(port: u8, bytes: &[u8]) -> Self {
        let parsed = match port {
            1 => Ping::decode(bytes).map(Self::Ping),
            2 => Pong::decode(bytes).map(Self::Pong),
            4 => ConfigOverride::decode(bytes).map(Self::ConfigOverride),
            6 => TextChat::decode(bytes).map(Self::TextChat),
            7 => SignedTextChat::decode(bytes).map(Self::SignedTextChat),
            _ => return Self::Unknown(Bytes::copy_from_slice(bytes)),
        };
        parsed.unwrap_or_else(|_| Self::Unknown(Bytes::copy_from_slice(bytes)))
    }

    /// Serialize to exactly the layout's wire length.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FieldTooLong`] when a variable field
    /// exceeds its fixed-width slot.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.wire_len());
        match self {
            Self::Ping(p) => p.encode_into(&mut buf),
            Self::Pong(p) => p.encode_into(&mut buf),
            Self::ConfigOverride(p) => p.encode_into(&mut buf)?,
            Self::TextChat(p) => p.encode_into(&mut buf)?,
            Self::SignedTextChat(p) => p.encode_into(&mut buf)?,
            Self::Unknown(bytes) => buf.put_slice(bytes),
        }
        debug_assert_eq!(buf.len(), self.wire_len());
        Ok(buf)
    }

    /// Serialized length in bytes.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        match self {
            Self::Ping(_) => Ping::WIRE_LEN,
            Self::Pong(_) => Pong::WIRE_LEN,
            Self::ConfigOverride(_) => ConfigOverride::WIRE_LEN,
            Self::TextChat(_) => TextChat::WIRE_LEN,
            Self::SignedTextChat(_) => SignedTextChat::WIRE_LEN,
            Self::Unknown(bytes) => bytes.len(),
        }
    }

    /// Reserved port for typed variants; `None` for [`Payload::Unknown`].
    #[must_use]
    pub fn port(&self) -> Option<u8> {
        match self {
            Self::Ping(_) => Some(1),
            Self::Pong(_) => Some(2),
            Self::ConfigOverride(_) => Some(4),
            Self::TextChat(_) => Some(6),
            Self::SignedTextChat(_) => Some(7),
            Self::Unknown(_) => None,
        }
    }
}

/// Write `bytes` into a fixed-width slot, right-padding with zeros.
fn put_padded(
    dst: &mut Vec<u8>,
    field: &'static str,
    bytes: &[u8],
    width: usize,
) -> Result<()> {
    if bytes.len() > width {
        return Err(ProtocolError::FieldTooLong { field, len: bytes.len(), max: width });
    }
    dst.put_slice(bytes);
    dst.put_bytes(0, width - bytes.len());
    Ok(())
}

/// Strip the zero padding from a fixed-width slot.
fn strip_padding(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &bytes[..end]
}

/// Decode a padded fixed-width slot as text, replacing invalid UTF-8.
fn padded_str(bytes: &[u8]) -> String {
    String::from_utf8_lossy(strip_padding(bytes)).into_owned()
}

/// Check that a typed payload's bytes are exactly its layout length.
fn expect_len(bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() == expected {
        Ok(())
    } else {
        Err(ProtocolError::PayloadLengthMismatch { expected, actual: bytes.len() })
    }
}
