//! Connectivity-probe payloads (PING / PONG).

use bytes::{Buf, BufMut};

use super::expect_len;
use crate::errors::Result;

/// Connectivity probe, flooded to broadcast (port 1).
///
/// `target` names the node being probed; every node that hears the frame
/// forwards it, but only the target answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping {
    /// Address of the node being probed.
    pub target: u32,
    /// Prober-local sequence number, echoed in the answering [`Pong`].
    pub seq: u8,
}

impl Ping {
    /// Serialized length: `u32 + u8`.
    pub const WIRE_LEN: usize = 5;

    pub(crate) fn encode_into(&self, dst: &mut Vec<u8>) {
        dst.put_u32(self.target);
        dst.put_u8(self.seq);
    }

    pub(crate) fn decode(mut bytes: &[u8]) -> Result<Self> {
        expect_len(bytes, Self::WIRE_LEN)?;
        Ok(Self { target: bytes.get_u32(), seq: bytes.get_u8() })
    }
}

/// Probe response, unicast back to the prober (port 2).
///
/// Carries the link quality the responder measured on the incoming PING so
/// the prober learns both directions of the path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pong {
    /// Address of the node answering the probe.
    pub responder: u32,
    /// TTL the probe arrived with (hop count evidence).
    pub ttl_at_ping: u8,
    /// Sequence number echoed from the probe.
    pub seq: u8,
    /// RSSI in dBm measured on the incoming probe.
    pub rssi: f32,
    /// SNR in dB measured on the incoming probe.
    pub snr: f32,
}

impl Pong {
    /// Serialized length: `u32 + u8 + u8 + f32 + f32`.
    pub const WIRE_LEN: usize = 14;

    pub(crate) fn encode_into(&self, dst: &mut Vec<u8>) {
        dst.put_u32(self.responder);
        dst.put_u8(self.ttl_at_ping);
        dst.put_u8(self.seq);
        dst.put_slice(&self.rssi.to_be_bytes());
        dst.put_slice(&self.snr.to_be_bytes());
    }

    pub(crate) fn decode(mut bytes: &[u8]) -> Result<Self> {
        expect_len(bytes, Self::WIRE_LEN)?;
        let responder = bytes.get_u32();
        let ttl_at_ping = bytes.get_u8();
        let seq = bytes.get_u8();
        let rssi = f32::from_bits(bytes.get_u32());
        let snr = f32::from_bits(bytes.get_u32());
        Ok(Self { responder, ttl_at_ping, seq, rssi, snr })
    }
}
