//! Frame checksum.
//!
//! BadgeNet uses CRC-16/XMODEM (poly 0x1021, init 0x0000) over everything
//! after the TTL byte. The checksum doubles as the frame's identity in the
//! duplicate-suppression cache, so all nodes must compute it identically.

use crc::{CRC_16_XMODEM, Crc};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// CRC-16/XMODEM of a contiguous byte slice.
#[must_use]
pub fn crc16(bytes: &[u8]) -> u16 {
    CRC16.checksum(bytes)
}

/// CRC-16/XMODEM over several slices as if they were concatenated.
///
/// The covered region of a frame spans the tail of the header plus the
/// payload; this avoids materializing the concatenation.
#[must_use]
pub fn crc16_of_parts(parts: &[&[u8]]) -> u16 {
    let mut digest = CRC16.digest();
    for part in parts {
        digest.update(part);
    }
    digest.finalize()
}
