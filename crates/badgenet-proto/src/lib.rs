//! Wire format for the BadgeNet flood mesh.
//!
//! BadgeNet packs short messages into fixed-header LoRa frames: a 16-byte
//! big-endian header (syncword, CRC-16/XMODEM checksum, TTL, length,
//! addresses, port, sequence) followed by a fixed-length payload whose
//! layout is selected by the 8-bit port.
//!
//! The crate is transport-agnostic and allocation-light: [`FrameHeader`] is
//! a zero-copy packed struct, [`Frame`] keeps the payload as raw [`bytes`]
//! until a consumer asks for the typed [`Payload`]. Frames that are only
//! being flood-forwarded never pay for payload decoding.
//!
//! # Dedup identity
//!
//! The checksum covers bytes `[5..end]` of the frame - everything after the
//! TTL byte. Forwarding decrements the TTL without touching the checksum,
//! so one logical message keeps one CRC identity across every hop. Moving
//! the TTL under CRC coverage would break mesh duplicate suppression.

mod checksum;
pub mod errors;
mod frame;
mod header;
pub mod payloads;
mod protocol;

pub use checksum::{crc16, crc16_of_parts};
pub use errors::{ProtocolError, Result};
pub use frame::{Frame, FrameBuilder};
pub use header::FrameHeader;
pub use payloads::Payload;
pub use protocol::{Protocol, ProtocolRegistry};

/// Destination address that every node accepts.
pub const BROADCAST_ADDRESS: u32 = 0xFFFF_FFFF;
