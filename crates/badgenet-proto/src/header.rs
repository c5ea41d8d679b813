//! Frame header with zero-copy parsing.
//!
//! The `FrameHeader` is a fixed 16-byte structure serialized as raw binary
//! (big endian). The receive pump makes its forward/drop decision from the
//! header alone, without touching the payload.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{ProtocolError, Result};

/// Fixed 16-byte frame header (big-endian network byte order).
///
/// Multi-byte fields are stored as raw byte arrays to avoid alignment
/// issues. Wire layout:
///
/// | Offset | Size | Field |
/// |---|---|---|
/// | 0 | 2 | Syncword `0x07E9` |
/// | 2 | 2 | CRC-16/XMODEM of bytes `[5..end]` |
/// | 4 | 1 | Flags (upper nibble, reserved 0) / TTL (lower nibble) |
/// | 5 | 1 | Whole-frame length in `[16, 250]` |
/// | 6 | 4 | Destination address |
/// | 10 | 4 | Source address |
/// | 14 | 1 | Port (protocol selector) |
/// | 15 | 1 | Sequence number |
///
/// # Invariants
///
/// - The checksum field at offset 2 and the flags/TTL byte at offset 4 are
///   NOT covered by the CRC. Rewriting the TTL for a forward keeps the
///   frame's dedup identity; rewriting anything from offset 5 on requires
///   resealing.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    syncword: [u8; 2],
    checksum: [u8; 2],
    flags_ttl: u8,
    total_len: u8,
    destination: [u8; 4],
    source: [u8; 4],
    port: u8,
    sequence: u8,
}

impl FrameHeader {
    /// Size of the serialized header (16 bytes).
    pub const SIZE: usize = 16;

    /// Constant frame syncword.
    pub const SYNCWORD: u16 = 0x07E9;

    /// Maximum whole-frame length the air interface permits.
    pub const MAX_FRAME_LEN: usize = 250;

    /// Maximum payload length (`MAX_FRAME_LEN` minus the header).
    pub const MAX_PAYLOAD_LEN: usize = Self::MAX_FRAME_LEN - Self::SIZE;

    /// Offset where CRC coverage begins (just after the flags/TTL byte).
    pub const CRC_COVERED_FROM: usize = 5;

    /// Largest TTL the 4-bit field can carry.
    pub const MAX_TTL: u8 = 15;

    /// Create a header with the syncword set and every other field zero.
    ///
    /// Length and checksum are filled in by [`crate::Frame::seal`].
    #[must_use]
    pub fn new(destination: u32, source: u32, port: u8, sequence: u8, ttl: u8) -> Self {
        Self {
            syncword: Self::SYNCWORD.to_be_bytes(),
            checksum: [0; 2],
            flags_ttl: ttl.min(Self::MAX_TTL),
            total_len: 0,
            destination: destination.to_be_bytes(),
            source: source.to_be_bytes(),
            port,
            sequence,
        }
    }

    /// Parse a header from the front of a byte buffer (zero-copy).
    ///
    /// Validates only the properties that are knowable from the header in
    /// isolation: buffer length and syncword. Length consistency and the
    /// checksum are frame-level properties checked by [`crate::Frame::decode`].
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::FrameTooShort`] if the buffer is under 16 bytes
    /// - [`ProtocolError::BadSyncword`] if offset 0 is not `0x07E9`
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let header = Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::FrameTooShort {
                expected: Self::SIZE,
                actual: bytes.len(),
            })?
            .0;

        let found = u16::from_be_bytes(header.syncword);
        if found != Self::SYNCWORD {
            return Err(ProtocolError::BadSyncword { found, expected: Self::SYNCWORD });
        }

        Ok(header)
    }

    /// Serialize the header to its 16 wire bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let bytes = IntoBytes::as_bytes(self);
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(bytes);
        arr
    }

    /// Frame syncword field.
    #[must_use]
    pub fn syncword(&self) -> u16 {
        u16::from_be_bytes(self.syncword)
    }

    /// Stored CRC-16/XMODEM checksum.
    #[must_use]
    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes(self.checksum)
    }

    /// Reserved flag nibble (upper half of byte 4). Zero on conforming frames.
    #[must_use]
    pub fn flags(&self) -> u8 {
        self.flags_ttl >> 4
    }

    /// Remaining hop budget (lower nibble of byte 4).
    #[must_use]
    pub fn ttl(&self) -> u8 {
        self.flags_ttl & 0x0F
    }

    /// Declared whole-frame length in bytes.
    #[must_use]
    pub fn total_len(&self) -> u8 {
        self.total_len
    }

    /// Destination node address (`0xFFFFFFFF` for broadcast).
    #[must_use]
    pub fn destination(&self) -> u32 {
        u32::from_be_bytes(self.destination)
    }

    /// Originating node address. Zero until stamped by the transmit pump.
    #[must_use]
    pub fn source(&self) -> u32 {
        u32::from_be_bytes(self.source)
    }

    /// Protocol selector.
    #[must_use]
    pub fn port(&self) -> u8 {
        self.port
    }

    /// Originator-local sequence number (modulo 256, debug aid only).
    #[must_use]
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Store the frame checksum.
    pub fn set_checksum(&mut self, checksum: u16) {
        self.checksum = checksum.to_be_bytes();
    }

    /// Store the TTL, preserving the reserved flag nibble.
    ///
    /// Values above 15 are clamped to the 4-bit field.
    pub fn set_ttl(&mut self, ttl: u8) {
        self.flags_ttl = (self.flags_ttl & 0xF0) | ttl.min(Self::MAX_TTL);
    }

    /// Store the declared whole-frame length.
    pub fn set_total_len(&mut self, len: u8) {
        self.total_len = len;
    }

    /// Store the destination address.
    pub fn set_destination(&mut self, destination: u32) {
        self.destination = destination.to_be_bytes();
    }

    /// Store the source address.
    pub fn set_source(&mut self, source: u32) {
        self.source = source.to_be_bytes();
    }

    /// Store the sequence number.
    pub fn set_sequence(&mut self, sequence: u8) {
        self.sequence = sequence;
    }
}

// Manual Debug implementation (can't derive due to packed repr)
impl std::fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHeader")
            .field("checksum", &format!("{:#06x}", self.checksum()))
            .field("ttl", &self.ttl())
            .field("total_len", &self.total_len())
            .field("destination", &format!("{:#010x}", self.destination()))
            .field("source", &format!("{:#010x}", self.source()))
            .field("port", &self.port())
            .field("sequence", &self.sequence())
            .finish_non_exhaustive()
    }
}

// Manual PartialEq implementation (can't derive due to packed repr)
impl PartialEq for FrameHeader {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for FrameHeader {}
