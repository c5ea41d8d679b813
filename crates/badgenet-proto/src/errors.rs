//! Error types for frame encoding, decoding, and protocol registration.
//!
//! Decode failures carry a categorical reason so the receive pump can log
//! why a frame was discarded without formatting raw bytes.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced by the frame codec and the protocol registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer shorter than the fixed frame header.
    #[error("frame shorter [{actual}] than required header [{expected}]")]
    FrameTooShort {
        /// Minimum length (the header size).
        expected: usize,
        /// Length of the buffer that was offered.
        actual: usize,
    },

    /// Buffer longer than a LoRa frame can be.
    #[error("frame too long [{actual}] for the air interface [{max}]")]
    FrameTooLong {
        /// Length of the buffer that was offered.
        actual: usize,
        /// Maximum permitted whole-frame length.
        max: usize,
    },

    /// First two bytes are not the BadgeNet syncword.
    #[error("bad syncword {found:#06x}, expected {expected:#06x}")]
    BadSyncword {
        /// Value found at offset 0.
        found: u16,
        /// The constant syncword.
        expected: u16,
    },

    /// Declared whole-frame length outside `[16, 250]`.
    #[error("frame claims illegal length {claimed}: valid range [{min}, {max}]")]
    IllegalLength {
        /// Length byte from the header.
        claimed: u8,
        /// Lower bound (header size).
        min: usize,
        /// Upper bound (maximum frame length).
        max: usize,
    },

    /// Buffer ends before the declared frame length.
    #[error("frame only {actual} bytes long but claims to be {claimed}")]
    Truncated {
        /// Length byte from the header.
        claimed: u8,
        /// Length of the buffer that was offered.
        actual: usize,
    },

    /// Stored checksum disagrees with the recomputed CRC.
    #[error("checksum mismatch: frame carries {claimed:#06x}, computed {computed:#06x}")]
    ChecksumMismatch {
        /// Checksum field from the header.
        claimed: u16,
        /// CRC-16/XMODEM recomputed over the covered region.
        computed: u16,
    },

    /// Payload does not fit the protocol's declared fixed length.
    #[error("payload too long for protocol {protocol}: {len} bytes vs max of {max}")]
    PayloadTooLarge {
        /// Protocol name.
        protocol: String,
        /// Offered payload length.
        len: usize,
        /// Declared fixed length for the port.
        max: usize,
    },

    /// Typed payload bytes have the wrong length for their layout.
    #[error("payload length {actual} does not match layout length {expected}")]
    PayloadLengthMismatch {
        /// Fixed serialized length of the layout.
        expected: usize,
        /// Length of the bytes that were offered.
        actual: usize,
    },

    /// A field exceeds its fixed-width slot in the payload layout.
    #[error("field `{field}` is {len} bytes, limit {max}")]
    FieldTooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Offered length in bytes.
        len: usize,
        /// Fixed slot width.
        max: usize,
    },

    /// A port is already registered with a different descriptor.
    #[error("redefining protocol at port {port} from {existing} to {offered}")]
    ProtocolConflict {
        /// Contested port.
        port: u8,
        /// Descriptor already registered.
        existing: String,
        /// Conflicting descriptor that was offered.
        offered: String,
    },

    /// Descriptor declares a payload that cannot fit in a frame.
    #[error("protocol {protocol} payload length is too large: {len} bytes vs max of {max}")]
    ProtocolPayloadTooLarge {
        /// Protocol name.
        protocol: String,
        /// Declared payload length.
        len: usize,
        /// Maximum payload a frame can carry.
        max: usize,
    },
}
