//! Fuzz target for the retransmit transform
//!
//! Decodes arbitrary bytes and, when they form a valid frame, applies the
//! TTL-decrement transform. A forwarded frame must itself remain valid and
//! keep its checksum (its dedup identity).

#![no_main]

use badgenet_proto::Frame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (&[u8], u32)| {
    let (data, own_address) = input;
    let Ok(frame) = Frame::decode(data) else { return };

    if let Some(forwarded) = frame.forward(own_address) {
        assert_eq!(forwarded.checksum(), frame.checksum());
        assert_eq!(forwarded.header.ttl(), frame.header.ttl() - 1);

        // The forwarded wire image must validate on the next hop
        let reparsed = Frame::decode(&forwarded.to_bytes()).expect("forwarded frame is valid");
        assert_eq!(reparsed.payload, forwarded.payload);
    }
});
