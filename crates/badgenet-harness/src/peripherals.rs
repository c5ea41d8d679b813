//! Scripted and recording peripheral doubles.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::Mutex,
};

use badgenet_app::{Display, Key, Keyboard};
use badgenet_core::{CryptoError, Signer, Verifier, crypto::SIGNATURE_LEN};

/// Display that records what apps draw.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    lines: Mutex<BTreeMap<usize, String>>,
    clear_count: Mutex<usize>,
}

impl RecordingDisplay {
    /// Create an empty display.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All visible lines, top to bottom.
    #[must_use]
    pub fn contents(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether any visible line contains `needle`.
    #[must_use]
    pub fn shows(&self, needle: &str) -> bool {
        self.contents().iter().any(|line| line.contains(needle))
    }

    /// How many times the screen was cleared.
    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.clear_count.lock().map(|c| *c).unwrap_or(0)
    }
}

impl Display for RecordingDisplay {
    fn clear(&self) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.clear();
        }
        if let Ok(mut count) = self.clear_count.lock() {
            *count += 1;
        }
    }

    fn line(&self, row: usize, text: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.insert(row, text.to_owned());
        }
    }

    fn soft_keys(&self, _labels: &[&str]) {}
}

/// Keyboard fed from a script of presses.
#[derive(Debug, Default)]
pub struct ScriptedKeyboard {
    function_presses: Mutex<VecDeque<u8>>,
    keys: Mutex<VecDeque<Key>>,
}

impl ScriptedKeyboard {
    /// Create a keyboard with nothing pressed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a function-key press (1-5).
    pub fn press_function(&self, index: u8) {
        if let Ok(mut presses) = self.function_presses.lock() {
            presses.push_back(index);
        }
    }

    /// Queue a regular key press.
    pub fn press(&self, key: Key) {
        if let Ok(mut keys) = self.keys.lock() {
            keys.push_back(key);
        }
    }
}

impl Keyboard for ScriptedKeyboard {
    fn function_key(&self, index: u8) -> bool {
        let Ok(mut presses) = self.function_presses.lock() else {
            return false;
        };
        if presses.front() == Some(&index) {
            presses.pop_front();
            true
        } else {
            false
        }
    }

    fn read_key(&self) -> Option<Key> {
        self.keys.lock().ok()?.pop_front()
    }
}

/// Deterministic signature tag shared by [`StubSigner`] and
/// [`StubVerifier`]: a byte fold of the message repeated across the slot.
fn tag(message: &[u8]) -> [u8; SIGNATURE_LEN] {
    let fold = message.iter().fold(0x5Au8, |acc, &b| acc.wrapping_mul(31).wrapping_add(b));
    [fold; SIGNATURE_LEN]
}

/// Signer producing the deterministic stub tag.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubSigner;

impl Signer for StubSigner {
    fn sign(&self, message: &[u8]) -> Result<[u8; SIGNATURE_LEN], CryptoError> {
        Ok(tag(message))
    }
}

/// Verifier accepting exactly what [`StubSigner`] produces.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubVerifier;

impl Verifier for StubVerifier {
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        signature == tag(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_signatures_round_trip() {
        let signature = StubSigner.sign(b"announcement").unwrap();
        assert!(StubVerifier.verify(b"announcement", &signature));
        assert!(!StubVerifier.verify(b"tampered", &signature));
        assert!(!StubVerifier.verify(b"announcement", &[0u8; SIGNATURE_LEN]));
    }

    #[test]
    fn scripted_function_keys_consume_in_order() {
        let keyboard = ScriptedKeyboard::new();
        keyboard.press_function(1);
        keyboard.press_function(5);

        assert!(!keyboard.function_key(5), "front of queue is F1");
        assert!(keyboard.function_key(1));
        assert!(keyboard.function_key(5));
        assert!(!keyboard.function_key(5));
    }

    #[test]
    fn display_records_and_clears() {
        let display = RecordingDisplay::new();
        display.line(0, "Net Tools");
        display.line(1, "Last Ping RSSI: -80");

        assert!(display.shows("Net Tools"));
        display.clear();
        assert!(!display.shows("Net Tools"));
        assert_eq!(display.clear_count(), 1);
    }
}
