//! Radio driver contract.
//!
//! The thin asynchronous abstraction the network core consumes: half-duplex
//! send/receive with carrier sensing, link quality reporting, and band-plan
//! configuration. The SPI/GPIO bring-up of the actual transceiver lives
//! outside this crate; drivers implement this trait.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::RadioError;

/// Result of a carrier-sense probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// No LoRa signal detected; clear to transmit.
    Free,
    /// Another transmission is in the air.
    Busy,
    /// The probe itself failed; treat like busy and retry.
    Error,
}

/// One of the 52 evenly spaced center frequencies in the 902-928 MHz band.
///
/// Slot `k` maps to `902.25 + (k - 1) * 0.5` MHz, matching the short-turbo
/// slot numbering used by neighboring mesh gear on the same band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FreqSlot(u8);

impl FreqSlot {
    /// Lowest valid slot index.
    pub const MIN: u8 = 1;

    /// Highest valid slot index.
    pub const MAX: u8 = 52;

    /// Default slot nodes boot on.
    pub const DEFAULT: Self = Self(9);

    /// Validate a slot index.
    ///
    /// # Errors
    ///
    /// Returns [`RadioError::InvalidSlot`] for indices outside `[1, 52]`.
    pub fn new(slot: u8) -> Result<Self, RadioError> {
        if (Self::MIN..=Self::MAX).contains(&slot) {
            Ok(Self(slot))
        } else {
            Err(RadioError::InvalidSlot { slot })
        }
    }

    /// Slot index in `[1, 52]`.
    #[must_use]
    pub fn index(self) -> u8 {
        self.0
    }

    /// Center frequency in MHz.
    #[must_use]
    pub fn mhz(self) -> f64 {
        902.25 + f64::from(self.0 - 1) * 0.5
    }
}

/// Half-duplex LoRa transceiver contract.
///
/// The driver internally serializes receive and transmit; the core never
/// issues overlapping operations. Methods take `&self` so one driver handle
/// can be shared between the receive and transmit pumps.
#[async_trait]
pub trait Radio: Send + Sync {
    /// Suspend until a frame arrives and return its raw bytes.
    ///
    /// # Errors
    ///
    /// [`RadioError::Fault`] indicates unrecoverable driver state and is
    /// fatal to the receive pump.
    async fn recv(&self) -> Result<Bytes, RadioError>;

    /// Transmit one frame, suspending until the air time completes.
    ///
    /// # Errors
    ///
    /// [`RadioError::Send`] loses this frame only; the transmit pump
    /// continues with the next.
    async fn send(&self, frame: &[u8]) -> Result<(), RadioError>;

    /// Non-suspending carrier sense on the tuned frequency.
    fn scan_channel(&self) -> ChannelStatus;

    /// RSSI of the most recently received packet, in dBm.
    fn rssi(&self) -> f32;

    /// SNR of the most recently received packet, in dB.
    fn snr(&self) -> f32;

    /// Retune to a band-plan slot.
    fn set_frequency(&self, slot: FreqSlot) -> Result<(), RadioError>;

    /// Set transmit power in dBm.
    fn set_tx_power(&self, dbm: i8) -> Result<(), RadioError>;
}
