//! Bundled badge applications.
//!
//! Each app follows the same shape: receive callbacks registered in
//! `start()` push frames into a small queue, and the app's foreground or
//! background step drains it. All protocol work happens in the app's own
//! tick, never in the callback.

mod chat;
mod config_manager;
mod nametag;
mod net_tools;
mod shark;

pub use chat::{ChatApp, ChatMessage};
pub use config_manager::ConfigManager;
pub use nametag::Nametag;
pub use net_tools::NetTools;
pub use shark::{PacketFilter, Shark};

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use badgenet_core::ReceivedFrame;

/// Bounded queue the receive callbacks push into.
///
/// Oldest frames are dropped when an app falls behind; a stalled app must
/// not grow without bound.
#[derive(Clone)]
pub(crate) struct ReceiveQueue {
    frames: Arc<Mutex<VecDeque<ReceivedFrame>>>,
    bound: usize,
}

impl ReceiveQueue {
    pub(crate) fn new(bound: usize) -> Self {
        Self { frames: Arc::new(Mutex::new(VecDeque::new())), bound }
    }

    /// Push from a receive callback.
    pub(crate) fn push(&self, frame: ReceivedFrame) {
        if let Ok(mut frames) = self.frames.lock() {
            if frames.len() >= self.bound {
                frames.pop_front();
            }
            frames.push_back(frame);
        }
    }

    /// Drain everything queued since the last tick.
    pub(crate) fn drain(&self) -> Vec<ReceivedFrame> {
        self.frames.lock().map(|mut frames| frames.drain(..).collect()).unwrap_or_default()
    }
}
