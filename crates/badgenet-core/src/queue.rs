//! Bounded transmit queue with local-traffic preference.
//!
//! Under congestion the mesh sheds relayed traffic first: forwards are
//! refused once the queue is half full, and when a local origination finds
//! the queue completely full it evicts the oldest relayed frame rather than
//! failing. A node's own messages only fail to enqueue when the queue is
//! full of its own messages.

use std::collections::VecDeque;

use badgenet_proto::Frame;

use crate::error::NetError;

/// Default bound on pending transmissions.
pub const DEFAULT_BOUND: usize = 20;

/// Bounded FIFO of frames awaiting transmission.
#[derive(Debug)]
pub struct TransmitQueue {
    frames: VecDeque<Frame>,
    bound: usize,
}

impl TransmitQueue {
    /// Create a queue with the given bound.
    #[must_use]
    pub fn new(bound: usize) -> Self {
        Self { frames: VecDeque::with_capacity(bound), bound }
    }

    /// Offer a frame received off the air for forwarding.
    ///
    /// Accepted only while the queue is below half its bound; congestion
    /// sheds relay work before it sheds local messages. Returns whether the
    /// frame was enqueued.
    pub fn offer_forward(&mut self, frame: Frame) -> bool {
        if self.frames.len() < self.bound / 2 {
            self.frames.push_back(frame);
            true
        } else {
            false
        }
    }

    /// Enqueue a locally originated frame.
    ///
    /// When the queue is full, the oldest relayed frame is dropped to make
    /// room (local frames are never evicted by this policy).
    ///
    /// # Errors
    ///
    /// [`NetError::TransmitQueueFull`] when the queue is full and every
    /// entry is local.
    pub fn push_originated(&mut self, frame: Frame, own_address: u32) -> Result<(), NetError> {
        if self.frames.len() >= self.bound {
            let victim = self
                .frames
                .iter()
                .position(|f| !Self::is_local(f, own_address));
            match victim {
                Some(idx) => {
                    self.frames.remove(idx);
                },
                None => return Err(NetError::TransmitQueueFull),
            }
        }
        self.frames.push_back(frame);
        Ok(())
    }

    /// Pop the next frame to transmit.
    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    /// Whether the queue is past the congestion threshold (half the bound).
    ///
    /// The transmit pump drops relayed frames it pops while this holds.
    #[must_use]
    pub fn is_congested(&self) -> bool {
        self.frames.len() > self.bound / 2
    }

    /// Number of pending frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no frames are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// A frame counts as local while its source is this node or still
    /// unstamped (zero).
    fn is_local(frame: &Frame, own_address: u32) -> bool {
        let source = frame.header.source();
        source == own_address || source == 0
    }
}

impl Default for TransmitQueue {
    fn default() -> Self {
        Self::new(DEFAULT_BOUND)
    }
}

#[cfg(test)]
mod tests {
    use badgenet_proto::{Payload, Protocol, payloads::Ping};

    use super::*;

    const ME: u32 = 0xAAAA_AAAA;
    const NEIGHBOR: u32 = 0xBBBB_BBBB;

    fn frame_from(source: u32, seq: u8) -> Frame {
        Frame::builder(&Protocol::PING)
            .source(source)
            .sequence(seq)
            .ttl(3)
            .payload(Payload::Ping(Ping { target: 1, seq }))
            .build()
            .expect("valid frame")
    }

    #[test]
    fn forwards_refused_at_half_bound() {
        let mut queue = TransmitQueue::new(20);
        for seq in 0..9 {
            assert!(queue.offer_forward(frame_from(NEIGHBOR, seq)));
        }
        // Entry 10 would reach half the bound.
        assert!(queue.offer_forward(frame_from(NEIGHBOR, 9)));
        assert!(!queue.offer_forward(frame_from(NEIGHBOR, 10)));
        assert_eq!(queue.len(), 10);
    }

    #[test]
    fn local_accepted_at_any_length() {
        let mut queue = TransmitQueue::new(20);
        for seq in 0..20 {
            queue
                .push_originated(frame_from(NEIGHBOR, seq), ME)
                .expect("filling with relays");
        }
        assert_eq!(queue.len(), 20);

        // Full of relays: local origination evicts the oldest relay.
        queue.push_originated(frame_from(0, 99), ME).expect("local always fits");
        assert_eq!(queue.len(), 20);

        // The evicted frame was the oldest relay.
        let head = queue.pop().expect("non-empty");
        assert_eq!(head.header.sequence(), 1);
    }

    #[test]
    fn eviction_skips_local_frames() {
        let mut queue = TransmitQueue::new(4);
        queue.push_originated(frame_from(0, 0), ME).expect("local");
        queue.push_originated(frame_from(NEIGHBOR, 1), ME).expect("relay");
        queue.push_originated(frame_from(ME, 2), ME).expect("local");
        queue.push_originated(frame_from(NEIGHBOR, 3), ME).expect("relay");

        queue.push_originated(frame_from(0, 4), ME).expect("evicts a relay");

        let sequences: Vec<u8> = std::iter::from_fn(|| queue.pop())
            .map(|f| f.header.sequence())
            .collect();
        // Relay seq 1 was evicted; locals survive in order.
        assert_eq!(sequences, vec![0, 2, 3, 4]);
    }

    #[test]
    fn full_of_local_frames_fails() {
        let mut queue = TransmitQueue::new(3);
        for seq in 0..3 {
            queue.push_originated(frame_from(ME, seq), ME).expect("local");
        }
        let result = queue.push_originated(frame_from(0, 9), ME);
        assert_eq!(result.unwrap_err(), NetError::TransmitQueueFull);
    }

    #[test]
    fn congestion_threshold() {
        let mut queue = TransmitQueue::new(20);
        for seq in 0..10 {
            queue.push_originated(frame_from(ME, seq), ME).expect("local");
        }
        assert!(!queue.is_congested());
        queue.push_originated(frame_from(ME, 10), ME).expect("local");
        assert!(queue.is_congested());
    }
}
