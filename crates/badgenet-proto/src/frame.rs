//! Frame type combining header and payload.
//!
//! A `Frame` is the unit the radio moves: a validated 16-byte header plus
//! the raw payload bytes. The typed payload is decoded lazily - a node that
//! only forwards a frame never parses the payload at all.

use bytes::{BufMut, Bytes};

use crate::{
    FrameHeader, Payload, Protocol,
    checksum::crc16_of_parts,
    errors::{ProtocolError, Result},
};

/// Complete BadgeNet frame.
///
/// Holds the parsed header and the raw payload bytes, NOT the typed
/// [`Payload`] enum; decode the payload on demand with
/// [`Frame::decode_payload`].
///
/// # Invariants
///
/// - A frame produced by [`Frame::decode`] or sealed by [`Frame::seal`]
///   carries a header checksum equal to CRC-16/XMODEM over bytes `[5..end]`
///   of its wire image, and a declared length equal to `16 + payload.len()`.
/// - `payload.len()` never exceeds [`FrameHeader::MAX_PAYLOAD_LEN`]
///   (enforced at build, seal, and decode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header (16 bytes).
    pub header: FrameHeader,

    /// Raw payload bytes, exactly as they travel on the wire.
    pub payload: Bytes,
}

impl Frame {
    /// Start building a frame for a protocol.
    #[must_use]
    pub fn builder(protocol: &Protocol) -> FrameBuilder {
        FrameBuilder::new(protocol)
    }

    /// Decode and validate a frame from raw air bytes.
    ///
    /// Validation order: buffer at least a header, buffer within the air
    /// MTU, syncword, declared length in `[16, 250]`, buffer covers the
    /// declared length (trailing bytes beyond it are dropped), checksum.
    ///
    /// # Errors
    ///
    /// One [`ProtocolError`] variant per failed step; a frame that fails
    /// here must not be counted in the duplicate cache.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FrameHeader::SIZE {
            return Err(ProtocolError::FrameTooShort {
                expected: FrameHeader::SIZE,
                actual: bytes.len(),
            });
        }
        if bytes.len() > FrameHeader::MAX_FRAME_LEN {
            return Err(ProtocolError::FrameTooLong {
                actual: bytes.len(),
                max: FrameHeader::MAX_FRAME_LEN,
            });
        }

        let header = *FrameHeader::from_bytes(bytes)?;

        let claimed = header.total_len();
        if (claimed as usize) < FrameHeader::SIZE
            || (claimed as usize) > FrameHeader::MAX_FRAME_LEN
        {
            return Err(ProtocolError::IllegalLength {
                claimed,
                min: FrameHeader::SIZE,
                max: FrameHeader::MAX_FRAME_LEN,
            });
        }
        if bytes.len() < claimed as usize {
            return Err(ProtocolError::Truncated { claimed, actual: bytes.len() });
        }

        // Trailing bytes beyond the declared length are not part of the
        // frame and are not covered by the checksum.
        let frame_bytes = &bytes[..claimed as usize];

        let computed = crc16_of_parts(&[&frame_bytes[FrameHeader::CRC_COVERED_FROM..]]);
        if computed != header.checksum() {
            return Err(ProtocolError::ChecksumMismatch {
                claimed: header.checksum(),
                computed,
            });
        }

        Ok(Self {
            header,
            payload: Bytes::copy_from_slice(&frame_bytes[FrameHeader::SIZE..]),
        })
    }

    /// Recompute the declared length and checksum and store them in the
    /// header.
    ///
    /// Must be called after any mutation of CRC-covered fields (anything
    /// from offset 5 on, which includes the source address). The TTL and
    /// the checksum field itself are outside coverage.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FrameTooLong`] when the payload no longer
    /// fits the air MTU.
    pub fn seal(&mut self) -> Result<()> {
        let total = FrameHeader::SIZE + self.payload.len();
        if total > FrameHeader::MAX_FRAME_LEN {
            return Err(ProtocolError::FrameTooLong {
                actual: total,
                max: FrameHeader::MAX_FRAME_LEN,
            });
        }
        self.header.set_total_len(total as u8);

        let header_bytes = self.header.to_bytes();
        let checksum = crc16_of_parts(&[
            &header_bytes[FrameHeader::CRC_COVERED_FROM..],
            &self.payload,
        ]);
        self.header.set_checksum(checksum);
        Ok(())
    }

    /// Stored frame checksum (the frame's dedup identity).
    #[must_use]
    pub fn checksum(&self) -> u16 {
        self.header.checksum()
    }

    /// Whole-frame length on the wire.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        FrameHeader::SIZE + self.payload.len()
    }

    /// Write the wire image into a buffer.
    pub fn encode_into(&self, dst: &mut impl BufMut) {
        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.payload);
    }

    /// Wire image as an owned byte vector.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf
    }

    /// Stamp the source address and reseal.
    ///
    /// The transmit pump uses this on locally originated frames whose
    /// source is still zero. The source lies inside CRC coverage, so the
    /// checksum changes with it.
    pub fn stamp_source(&mut self, address: u32) -> Result<()> {
        self.header.set_source(address);
        self.seal()
    }

    /// The retransmit transform.
    ///
    /// Returns the frame to flood onward, or `None` when this node must not
    /// forward: the frame already reached its destination here, or its hop
    /// budget is spent. The forwarded copy carries TTL minus one and the
    /// SAME checksum - TTL is outside CRC coverage, so every hop of one
    /// logical message shares one dedup identity.
    #[must_use]
    pub fn forward(&self, own_address: u32) -> Option<Self> {
        if self.header.destination() == own_address {
            return None;
        }
        let ttl = self.header.ttl();
        if !(1..=FrameHeader::MAX_TTL).contains(&ttl) {
            return None;
        }

        let mut forwarded = self.clone();
        forwarded.header.set_ttl(ttl - 1);
        Some(forwarded)
    }

    /// Whether this node should dispatch the frame to port callbacks.
    ///
    /// True when addressed to this node or to broadcast, unless the node
    /// hears its own transmission echoed back.
    #[must_use]
    pub fn is_for(&self, own_address: u32) -> bool {
        let destination = self.header.destination();
        (destination == own_address || destination == crate::BROADCAST_ADDRESS)
            && self.header.source() != own_address
    }

    /// Decode the typed payload for this frame's port.
    ///
    /// Unknown ports and layout-length mismatches yield
    /// [`Payload::Unknown`]; the frame remains forwardable either way.
    #[must_use]
    pub fn decode_payload(&self) -> Payload {
        Payload::decode(self.header.port(), &self.payload)
    }
}

/// Builder for locally originated frames.
///
/// Produces a sealed [`Frame`]: declared length and checksum are computed
/// during [`FrameBuilder::build`]. Raw payloads shorter than the protocol's
/// declared length are right-padded with zeros; longer ones fail.
#[derive(Debug)]
pub struct FrameBuilder {
    protocol: Protocol,
    destination: u32,
    source: u32,
    ttl: u8,
    sequence: u8,
    payload: BuilderPayload,
}

#[derive(Debug)]
enum BuilderPayload {
    Empty,
    Typed(Payload),
    Raw(Vec<u8>),
}

impl FrameBuilder {
    /// Start a frame for the given protocol.
    ///
    /// Defaults: broadcast destination, zero source (stamped by the
    /// transmit pump), TTL 0, sequence 0, empty payload.
    #[must_use]
    pub fn new(protocol: &Protocol) -> Self {
        Self {
            protocol: protocol.clone(),
            destination: crate::BROADCAST_ADDRESS,
            source: 0,
            ttl: 0,
            sequence: 0,
            payload: BuilderPayload::Empty,
        }
    }

    /// Destination address (defaults to broadcast).
    #[must_use]
    pub fn destination(mut self, destination: u32) -> Self {
        self.destination = destination;
        self
    }

    /// Source address. Usually left zero; the transmit pump stamps the
    /// node's own address before sending.
    #[must_use]
    pub fn source(mut self, source: u32) -> Self {
        self.source = source;
        self
    }

    /// Hop budget, clamped into `[0, 15]`.
    #[must_use]
    pub fn ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl.min(FrameHeader::MAX_TTL);
        self
    }

    /// Originator-local sequence number.
    #[must_use]
    pub fn sequence(mut self, sequence: u8) -> Self {
        self.sequence = sequence;
        self
    }

    /// Typed payload matching the protocol's layout.
    #[must_use]
    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = BuilderPayload::Typed(payload);
        self
    }

    /// Raw payload bytes (padded to the protocol's declared length).
    #[must_use]
    pub fn raw_payload(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.payload = BuilderPayload::Raw(bytes.into());
        self
    }

    /// Serialize the payload, assemble the header, and seal the frame.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::FieldTooLong`] when a typed payload field
    ///   overflows its slot
    /// - [`ProtocolError::PayloadTooLarge`] when a raw payload exceeds the
    ///   protocol's declared length
    /// - [`ProtocolError::PayloadLengthMismatch`] when a typed payload
    ///   serializes to a different length than the protocol declares
    pub fn build(self) -> Result<Frame> {
        let declared = self.protocol.payload_len;

        let bytes = match self.payload {
            BuilderPayload::Empty => vec![0u8; declared],
            BuilderPayload::Typed(payload) => {
                let bytes = payload.encode()?;
                if bytes.len() != declared {
                    return Err(ProtocolError::PayloadLengthMismatch {
                        expected: declared,
                        actual: bytes.len(),
                    });
                }
                bytes
            },
            BuilderPayload::Raw(mut bytes) => {
                if bytes.len() > declared {
                    return Err(ProtocolError::PayloadTooLarge {
                        protocol: self.protocol.name.clone().into_owned(),
                        len: bytes.len(),
                        max: declared,
                    });
                }
                bytes.resize(declared, 0);
                bytes
            },
        };

        let header = FrameHeader::new(
            self.destination,
            self.source,
            self.protocol.port,
            self.sequence,
            self.ttl,
        );

        let mut frame = Frame { header, payload: Bytes::from(bytes) };
        frame.seal()?;
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{BROADCAST_ADDRESS, crc16, payloads::Ping};

    fn ping_frame(destination: u32, ttl: u8) -> Frame {
        Frame::builder(&Protocol::PING)
            .destination(destination)
            .source(0xAAAA_AAAA)
            .ttl(ttl)
            .sequence(1)
            .payload(Payload::Ping(Ping { target: 0xBBBB_BBBB, seq: 1 }))
            .build()
            .expect("valid ping frame")
    }

    #[test]
    fn round_trip_preserves_all_fields() {
        let frame = ping_frame(BROADCAST_ADDRESS, 7);
        let wire = frame.to_bytes();
        let parsed = Frame::decode(&wire).expect("should decode");
        assert_eq!(parsed, frame);
        assert_eq!(parsed.header.ttl(), 7);
        assert_eq!(parsed.decode_payload(), Payload::Ping(Ping { target: 0xBBBB_BBBB, seq: 1 }));
    }

    #[test]
    fn sealed_checksum_covers_tail() {
        let frame = ping_frame(BROADCAST_ADDRESS, 3);
        let wire = frame.to_bytes();
        assert_eq!(frame.checksum(), crc16(&wire[5..]));
    }

    #[test]
    fn trailing_bytes_are_truncated() {
        let frame = ping_frame(BROADCAST_ADDRESS, 3);
        let mut wire = frame.to_bytes();
        wire.extend_from_slice(&[0xFF; 8]);

        let parsed = Frame::decode(&wire).expect("should decode with trailing garbage");
        assert_eq!(parsed, frame);
    }

    #[test]
    fn reject_truncated_frame() {
        let frame = ping_frame(BROADCAST_ADDRESS, 3);
        let wire = frame.to_bytes();

        let result = Frame::decode(&wire[..wire.len() - 1]);
        assert!(matches!(result, Err(ProtocolError::Truncated { .. })));
    }

    #[test]
    fn reject_corrupted_payload() {
        let frame = ping_frame(BROADCAST_ADDRESS, 3);
        let mut wire = frame.to_bytes();
        wire[18] ^= 0x01;

        let result = Frame::decode(&wire);
        assert!(matches!(result, Err(ProtocolError::ChecksumMismatch { .. })));
    }

    #[test]
    fn reject_oversized_buffer() {
        let result = Frame::decode(&[0u8; 251]);
        assert_eq!(result, Err(ProtocolError::FrameTooLong { actual: 251, max: 250 }));
    }

    #[test]
    fn reject_illegal_claimed_length() {
        let frame = ping_frame(BROADCAST_ADDRESS, 3);
        let mut wire = frame.to_bytes();
        wire[5] = 15; // below the header size

        let result = Frame::decode(&wire);
        assert!(matches!(result, Err(ProtocolError::IllegalLength { claimed: 15, .. })));
    }

    #[test]
    fn minimum_frame_is_header_only() {
        let empty = Protocol::new(40, "EMPTY", 0).expect("zero-length payload is legal");
        let frame = Frame::builder(&empty).sequence(9).build().expect("builds");
        assert_eq!(frame.encoded_len(), 16);

        let parsed = Frame::decode(&frame.to_bytes()).expect("16-byte frame is valid");
        assert!(parsed.payload.is_empty());
    }

    #[test]
    fn maximum_frame_fills_mtu() {
        let frame = Frame::builder(&Protocol::UNKNOWN)
            .raw_payload(vec![0x55; 234])
            .build()
            .expect("max payload builds");
        assert_eq!(frame.encoded_len(), 250);
        assert!(Frame::decode(&frame.to_bytes()).is_ok());
    }

    #[test]
    fn forward_decrements_ttl_and_keeps_checksum() {
        let frame = ping_frame(BROADCAST_ADDRESS, 3);
        let forwarded = frame.forward(0xCCCC_CCCC).expect("forwardable");

        assert_eq!(forwarded.header.ttl(), 2);
        assert_eq!(forwarded.checksum(), frame.checksum());
        // The forwarded wire image still validates: TTL is outside CRC coverage.
        assert!(Frame::decode(&forwarded.to_bytes()).is_ok());
    }

    #[test]
    fn forward_ttl_boundaries() {
        let other = 0xCCCC_CCCC;
        assert_eq!(ping_frame(BROADCAST_ADDRESS, 15).forward(other).map(|f| f.header.ttl()), Some(14));
        assert_eq!(ping_frame(BROADCAST_ADDRESS, 1).forward(other).map(|f| f.header.ttl()), Some(0));
        assert!(ping_frame(BROADCAST_ADDRESS, 0).forward(other).is_none());
    }

    #[test]
    fn never_forward_frames_addressed_to_self() {
        let me = 0xDDDD_DDDD;
        let frame = ping_frame(me, 7);
        assert!(frame.forward(me).is_none());
    }

    #[test]
    fn dispatch_gate() {
        let me = 0xDDDD_DDDD;
        assert!(ping_frame(me, 1).is_for(me));
        assert!(ping_frame(BROADCAST_ADDRESS, 1).is_for(me));
        // Unicast to someone else: forward-only.
        assert!(!ping_frame(0xEEEE_EEEE, 1).is_for(me));
        // Own transmission echoed back.
        assert!(!ping_frame(BROADCAST_ADDRESS, 1).is_for(0xAAAA_AAAA));
    }

    #[test]
    fn stamp_source_reseals() {
        let mut frame = Frame::builder(&Protocol::PING)
            .payload(Payload::Ping(Ping { target: 1, seq: 2 }))
            .ttl(3)
            .build()
            .expect("builds");
        let zero_source_checksum = frame.checksum();

        frame.stamp_source(0x1234_5678).expect("reseal");
        assert_ne!(frame.checksum(), zero_source_checksum);
        assert!(Frame::decode(&frame.to_bytes()).is_ok());
    }

    #[test]
    fn raw_payload_is_zero_padded() {
        let frame = Frame::builder(&Protocol::TEXT_CHAT)
            .raw_payload(b"\x03\x85alice".to_vec())
            .build()
            .expect("short raw payload pads");
        assert_eq!(frame.payload.len(), Protocol::TEXT_CHAT.payload_len);
        assert!(frame.payload[7..].iter().all(|&b| b == 0));
    }

    #[test]
    fn oversized_raw_payload_fails() {
        let result = Frame::builder(&Protocol::PING).raw_payload(vec![0; 6]).build();
        assert!(matches!(result, Err(ProtocolError::PayloadTooLarge { .. })));
    }

    #[test]
    fn builder_clamps_ttl() {
        let frame = Frame::builder(&Protocol::PING)
            .payload(Payload::Ping(Ping { target: 1, seq: 0 }))
            .ttl(99)
            .build()
            .expect("builds");
        assert_eq!(frame.header.ttl(), 15);
    }

    proptest! {
        #[test]
        fn arbitrary_payload_round_trips(
            destination in any::<u32>(),
            source in any::<u32>(),
            ttl in 0u8..=15,
            sequence in any::<u8>(),
            payload in prop::collection::vec(any::<u8>(), 0..=234),
        ) {
            let proto = Protocol::new(99, "FUZZ", payload.len()).expect("fits");
            let frame = Frame::builder(&proto)
                .destination(destination)
                .source(source)
                .ttl(ttl)
                .sequence(sequence)
                .raw_payload(payload.clone())
                .build()
                .expect("builds");

            let parsed = Frame::decode(&frame.to_bytes()).expect("round trip");
            prop_assert_eq!(parsed.header.destination(), destination);
            prop_assert_eq!(parsed.header.source(), source);
            prop_assert_eq!(parsed.header.ttl(), ttl);
            prop_assert_eq!(parsed.header.sequence(), sequence);
            prop_assert_eq!(parsed.payload.as_ref(), payload.as_slice());
        }

        #[test]
        fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..300)) {
            let _ = Frame::decode(&bytes);
        }
    }
}
