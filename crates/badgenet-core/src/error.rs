//! Error types for the network core.
//!
//! Strongly-typed errors per layer: radio faults, stack-level failures,
//! configuration storage, and crypto contract errors. The pumps never
//! propagate recoverable errors upward - they log and continue; only an
//! unrecoverable radio receive fault terminates a pump.

use thiserror::Error;

/// Errors surfaced by a radio driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RadioError {
    /// Unrecoverable driver state; fatal to the receive pump.
    #[error("radio fault: {0}")]
    Fault(String),

    /// A single transmission failed; the frame is dropped, no retry.
    #[error("transmit failed: {0}")]
    Send(String),

    /// Frequency slot outside the 52-slot band plan.
    #[error("invalid frequency slot {slot}: must be in [1, 52]")]
    InvalidSlot {
        /// Slot index that was requested.
        slot: u8,
    },

    /// Transmit power outside what the amplifier supports.
    #[error("unsupported tx power {dbm} dBm")]
    InvalidTxPower {
        /// Power that was requested.
        dbm: i8,
    },
}

impl RadioError {
    /// Whether the pump that hit this error can keep running.
    ///
    /// Send failures lose one frame; a `Fault` means the driver state is
    /// gone and the pump must terminate for a supervisor to restart it.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fault(_))
    }
}

/// Errors surfaced by the network stack to its callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetError {
    /// Frame codec or protocol registry failure.
    #[error("protocol error: {0}")]
    Protocol(#[from] badgenet_proto::ProtocolError),

    /// Transmit queue is full of locally originated frames.
    #[error("transmit queue full")]
    TransmitQueueFull,

    /// Radio driver failure (fatal pump exits carry this).
    #[error("radio error: {0}")]
    Radio(#[from] RadioError),
}

/// Error returned by a port callback.
///
/// Callback failures are isolated: the pump logs them and later callbacks
/// for the same frame still run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(
    /// Failure reason shown in the log.
    pub String,
);

impl HandlerError {
    /// Build from anything displayable.
    pub fn new(message: impl std::fmt::Display) -> Self {
        Self(message.to_string())
    }
}

/// Errors from the persistent configuration store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Underlying storage failed.
    #[error("config storage error: {0}")]
    Storage(String),
}

/// Errors from the signing contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// This node carries no private key and cannot sign.
    #[error("no private key on this node, unable to sign")]
    NoPrivateKey,

    /// Key material could not be loaded.
    #[error("key load failed: {0}")]
    KeyLoad(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_faults_are_fatal() {
        assert!(RadioError::Fault("spi bus gone".into()).is_fatal());
        assert!(!RadioError::Send("tx timeout".into()).is_fatal());
        assert!(!RadioError::InvalidSlot { slot: 53 }.is_fatal());
        assert!(!RadioError::InvalidTxPower { dbm: 30 }.is_fatal());
    }

    #[test]
    fn protocol_errors_convert() {
        let err = badgenet_proto::ProtocolError::FrameTooShort { expected: 16, actual: 3 };
        let net: NetError = err.into();
        assert!(matches!(net, NetError::Protocol(_)));
    }
}
