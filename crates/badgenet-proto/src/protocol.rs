//! Protocol descriptors and the port registry.
//!
//! A protocol is an agreement on what lives in the payload of frames
//! carrying a given 8-bit port: a human-readable name plus a fixed
//! serialized payload length. Nodes register descriptors at application
//! start; the registry rejects conflicting redefinitions so two apps cannot
//! silently disagree about a port.

use std::{borrow::Cow, collections::HashMap, fmt};

use crate::{
    FrameHeader,
    errors::{ProtocolError, Result},
    payloads,
};

/// Descriptor for one payload layout, keyed by port.
///
/// Port 0 is reserved for [`Protocol::UNKNOWN`], the catch-all descriptor
/// that matches any payload a node cannot decode. Its declared length is
/// the maximum payload a frame can carry, so unknown frames always pass the
/// registry's length gate for forwarding purposes.
#[derive(Clone, PartialEq, Eq)]
pub struct Protocol {
    /// 8-bit protocol selector carried in the frame header.
    pub port: u8,
    /// Human-readable name, used in logs and conflict errors.
    pub name: Cow<'static, str>,
    /// Fixed serialized payload length in bytes.
    pub payload_len: usize,
}

impl Protocol {
    /// Catch-all descriptor for payloads no registered protocol explains.
    pub const UNKNOWN: Self = Self {
        port: 0,
        name: Cow::Borrowed("UNKNOWN_PROTOCOL"),
        payload_len: FrameHeader::MAX_PAYLOAD_LEN,
    };

    /// Connectivity probe: `(target, sender_seq)`.
    pub const PING: Self = Self {
        port: 1,
        name: Cow::Borrowed("PING"),
        payload_len: payloads::Ping::WIRE_LEN,
    };

    /// Probe response: `(responder, ttl_at_ping, seq, rssi, snr)`.
    pub const PONG: Self = Self {
        port: 2,
        name: Cow::Borrowed("PONG"),
        payload_len: payloads::Pong::WIRE_LEN,
    };

    /// Signed remote configuration override: `(signature, key, value)`.
    pub const CONFIG_OVERRIDE: Self = Self {
        port: 4,
        name: Cow::Borrowed("CONFIG_OVERRIDE"),
        payload_len: payloads::ConfigOverride::WIRE_LEN,
    };

    /// Channelized text chat: `(channel, alias, text)`.
    pub const TEXT_CHAT: Self = Self {
        port: 6,
        name: Cow::Borrowed("TEXT_CHAT"),
        payload_len: payloads::TextChat::WIRE_LEN,
    };

    /// Text chat with an authenticity signature.
    pub const SIGNED_TEXT_CHAT: Self = Self {
        port: 7,
        name: Cow::Borrowed("SIGNED_TEXT_CHAT"),
        payload_len: payloads::SignedTextChat::WIRE_LEN,
    };

    /// Build an application-defined descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ProtocolPayloadTooLarge`] when the declared
    /// payload cannot fit in a frame alongside the header.
    pub fn new(port: u8, name: impl Into<Cow<'static, str>>, payload_len: usize) -> Result<Self> {
        let name = name.into();
        if payload_len > FrameHeader::MAX_PAYLOAD_LEN {
            return Err(ProtocolError::ProtocolPayloadTooLarge {
                protocol: name.into_owned(),
                len: payload_len,
                max: FrameHeader::MAX_PAYLOAD_LEN,
            });
        }
        Ok(Self { port, name, payload_len })
    }

    /// Whole-frame length of a frame carrying this protocol's payload.
    #[must_use]
    pub fn frame_len(&self) -> usize {
        FrameHeader::SIZE + self.payload_len
    }
}

impl fmt::Debug for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {}B)", self.name, self.port, self.payload_len)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.port, self.name)
    }
}

/// Port-keyed table of registered protocol descriptors.
///
/// # Invariants
///
/// - Port 0 always maps to [`Protocol::UNKNOWN`].
/// - A port never changes descriptor: re-registering an identical
///   descriptor is a no-op, any other redefinition fails.
#[derive(Debug, Clone)]
pub struct ProtocolRegistry {
    protocols: HashMap<u8, Protocol>,
}

impl ProtocolRegistry {
    /// Create a registry preloaded with the catch-all descriptor.
    #[must_use]
    pub fn new() -> Self {
        let mut protocols = HashMap::new();
        protocols.insert(0, Protocol::UNKNOWN);
        Self { protocols }
    }

    /// Register a descriptor for debug decoding and dispatch length checks.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::ProtocolPayloadTooLarge`] when the payload cannot
    ///   fit in a frame
    /// - [`ProtocolError::ProtocolConflict`] when the port is taken by a
    ///   different descriptor
    pub fn register(&mut self, protocol: &Protocol) -> Result<()> {
        if protocol.payload_len > FrameHeader::MAX_PAYLOAD_LEN {
            return Err(ProtocolError::ProtocolPayloadTooLarge {
                protocol: protocol.name.clone().into_owned(),
                len: protocol.payload_len,
                max: FrameHeader::MAX_PAYLOAD_LEN,
            });
        }

        match self.protocols.get(&protocol.port) {
            None => {
                self.protocols.insert(protocol.port, protocol.clone());
                Ok(())
            },
            Some(existing) if existing == protocol => Ok(()),
            Some(existing) => Err(ProtocolError::ProtocolConflict {
                port: protocol.port,
                existing: format!("{existing:?}"),
                offered: format!("{protocol:?}"),
            }),
        }
    }

    /// Descriptor registered for a port, if any.
    #[must_use]
    pub fn get(&self, port: u8) -> Option<&Protocol> {
        self.protocols.get(&port)
    }

    /// Name to log for a port, falling back to the catch-all's name.
    #[must_use]
    pub fn name_of(&self, port: u8) -> &str {
        self.protocols.get(&port).map_or("UNKNOWN_PROTOCOL", |p| &p.name)
    }

    /// Iterate over all registered descriptors (unspecified order).
    pub fn iter(&self) -> impl Iterator<Item = &Protocol> {
        self.protocols.values()
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_ports_have_expected_layout_lengths() {
        assert_eq!(Protocol::PING.payload_len, 5);
        assert_eq!(Protocol::PONG.payload_len, 14);
        assert_eq!(Protocol::CONFIG_OVERRIDE.payload_len, 228);
        assert_eq!(Protocol::TEXT_CHAT.payload_len, 112);
        assert_eq!(Protocol::SIGNED_TEXT_CHAT.payload_len, 230);
        assert_eq!(Protocol::UNKNOWN.payload_len, 234);
    }

    #[test]
    fn register_is_idempotent_for_identical_descriptor() {
        let mut registry = ProtocolRegistry::new();
        registry.register(&Protocol::TEXT_CHAT).expect("first registration");
        registry.register(&Protocol::TEXT_CHAT).expect("re-registration is a no-op");
        assert_eq!(registry.get(6), Some(&Protocol::TEXT_CHAT));
    }

    #[test]
    fn conflicting_redefinition_fails() {
        let mut registry = ProtocolRegistry::new();
        registry.register(&Protocol::TEXT_CHAT).expect("first registration");

        let imposter = Protocol::new(6, "GAME_STATE", 32).expect("valid descriptor");
        let result = registry.register(&imposter);
        assert!(matches!(result, Err(ProtocolError::ProtocolConflict { port: 6, .. })));

        // The original descriptor survives.
        assert_eq!(registry.get(6), Some(&Protocol::TEXT_CHAT));
    }

    #[test]
    fn oversized_payload_rejected() {
        let result = Protocol::new(9, "TOO_BIG", 235);
        assert!(matches!(result, Err(ProtocolError::ProtocolPayloadTooLarge { .. })));

        // 234 is the largest payload that fits.
        let max = Protocol::new(9, "JUST_FITS", 234).expect("fits");
        assert_eq!(max.frame_len(), 250);
    }

    #[test]
    fn unknown_is_preregistered() {
        let registry = ProtocolRegistry::new();
        assert_eq!(registry.get(0), Some(&Protocol::UNKNOWN));
        assert_eq!(registry.name_of(42), "UNKNOWN_PROTOCOL");
    }
}
