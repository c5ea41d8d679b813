//! BadgeNet network core.
//!
//! Bridges the LoRa radio driver and the applications: validates inbound
//! frames, suppresses duplicates by CRC, flood-forwards within the TTL
//! budget, dispatches typed payloads to registered port callbacks, and
//! drains the transmit queue through carrier sensing and cooldowns.
//!
//! The stack runs as three cooperative pumps ([`NetStack::receive_pump`],
//! [`NetStack::transmit_pump`], [`NetStack::flush_pump`]) scheduled by the
//! application runtime. All shared state sits behind one mutex held only
//! across quick critical sections; port callbacks never run under it.
//!
//! External resources enter through contracts: [`Radio`] for the
//! transceiver, [`Environment`] for time and randomness, [`ConfigStore`]
//! for the persistent key/value config, and [`Signer`]/[`Verifier`] for
//! payload authenticity.

pub mod cache;
pub mod config;
pub mod crypto;
pub mod env;
pub mod error;
pub mod queue;
pub mod radio;
pub mod stack;

pub use cache::DuplicateCache;
pub use config::{ConfigExt, ConfigStore, MemoryConfig, RedbConfig};
pub use crypto::{Signer, Verifier};
pub use env::{Environment, SystemEnv};
pub use error::{ConfigError, CryptoError, HandlerError, NetError, RadioError};
pub use queue::TransmitQueue;
pub use radio::{ChannelStatus, FreqSlot, Radio};
pub use stack::{LinkQuality, NetConfig, NetHandle, NetStack, ReceivedFrame};
