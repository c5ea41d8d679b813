//! Fuzz target for typed payload decoding
//!
//! This fuzzer tests payload deserialization for every reserved port with:
//! - Arbitrary payload bytes
//! - Wrong lengths for the port's fixed layout
//! - Non-UTF-8 text in string slots
//!
//! The fuzzer should NEVER panic. Anything a layout cannot explain must
//! fall back to the raw Unknown payload.

#![no_main]

use badgenet_proto::Payload;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Reserved ports plus a few unreserved ones
    for port in [0u8, 1, 2, 4, 6, 7, 3, 42, 255] {
        let payload = Payload::decode(port, data);

        // Whatever decoded must re-encode without panicking
        let _ = payload.encode();
    }
});
