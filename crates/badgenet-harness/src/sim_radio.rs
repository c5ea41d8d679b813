//! Shared-ether simulated radio.
//!
//! One [`Ether`] is the medium; each [`SimRadio`] is a transceiver on it.
//! A transmission is delivered to every other radio tuned to the same
//! frequency slot and reachable from the sender, and appended to the
//! ether's log for test assertions. Carrier-sense results, link quality,
//! and send/receive faults are scriptable per radio.

use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Mutex, atomic::{AtomicUsize, Ordering}},
};

use async_trait::async_trait;
use badgenet_core::{ChannelStatus, FreqSlot, Radio, RadioError};
use bytes::Bytes;
use tokio::sync::mpsc;

/// One logged transmission on the ether.
#[derive(Debug, Clone)]
pub struct Transmission {
    /// Id of the radio that transmitted.
    pub radio: usize,
    /// Raw frame bytes as they went on the air.
    pub bytes: Bytes,
}

struct Port {
    sender: Option<mpsc::UnboundedSender<Bytes>>,
    slot: FreqSlot,
}

#[derive(Default)]
struct EtherInner {
    ports: Vec<Port>,
    log: Vec<Transmission>,
    /// Unordered pairs of radio ids that cannot hear each other.
    severed: HashSet<(usize, usize)>,
}

/// The shared radio medium.
#[derive(Clone, Default)]
pub struct Ether {
    inner: Arc<Mutex<EtherInner>>,
}

impl Ether {
    /// Create an empty medium.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new radio to the medium.
    #[must_use]
    pub fn radio(&self) -> SimRadio {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut inner = self.lock();
            inner.ports.push(Port { sender: Some(tx), slot: FreqSlot::DEFAULT });
            inner.ports.len() - 1
        };
        SimRadio {
            id,
            ether: self.clone(),
            rx: tokio::sync::Mutex::new(rx),
            state: Mutex::new(RadioState::default()),
            scan_count: AtomicUsize::new(0),
        }
    }

    /// Make two radios unable to hear each other (line topologies etc.).
    pub fn sever(&self, a: usize, b: usize) {
        self.lock().severed.insert(pair(a, b));
    }

    /// Restore the link between two radios.
    pub fn restore(&self, a: usize, b: usize) {
        self.lock().severed.remove(&pair(a, b));
    }

    /// Everything transmitted so far, in order.
    #[must_use]
    pub fn transmissions(&self) -> Vec<Transmission> {
        self.lock().log.clone()
    }

    /// Number of transmissions so far.
    #[must_use]
    pub fn transmission_count(&self) -> usize {
        self.lock().log.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EtherInner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn broadcast(&self, from: usize, bytes: &[u8]) {
        let mut inner = self.lock();
        let payload = Bytes::copy_from_slice(bytes);
        inner.log.push(Transmission { radio: from, bytes: payload.clone() });

        let from_slot = inner.ports.get(from).map(|p| p.slot);
        for (id, port) in inner.ports.iter().enumerate() {
            if id == from || Some(port.slot) != from_slot {
                continue;
            }
            if inner.severed.contains(&pair(from, id)) {
                continue;
            }
            if let Some(sender) = &port.sender {
                // A closed receiver just means that node is gone.
                let _ = sender.send(payload.clone());
            }
        }
    }

    fn fault_port(&self, id: usize) {
        if let Some(port) = self.lock().ports.get_mut(id) {
            port.sender = None;
        }
    }

    fn set_slot(&self, id: usize, slot: FreqSlot) {
        if let Some(port) = self.lock().ports.get_mut(id) {
            port.slot = slot;
        }
    }
}

fn pair(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}

struct RadioState {
    scans: VecDeque<ChannelStatus>,
    always_busy: bool,
    fail_sends: usize,
    rssi: f32,
    snr: f32,
    tx_power: i8,
}

impl Default for RadioState {
    fn default() -> Self {
        Self {
            scans: VecDeque::new(),
            always_busy: false,
            fail_sends: 0,
            rssi: -80.0,
            snr: 7.5,
            tx_power: 9,
        }
    }
}

/// A transceiver attached to an [`Ether`].
pub struct SimRadio {
    id: usize,
    ether: Ether,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Bytes>>,
    state: Mutex<RadioState>,
    scan_count: AtomicUsize,
}

impl SimRadio {
    /// This radio's id in the ether's transmission log.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Queue carrier-sense results; once exhausted the channel reads free.
    pub fn script_scans(&self, statuses: &[ChannelStatus]) {
        self.lock_state().scans.extend(statuses.iter().copied());
    }

    /// Make every carrier-sense probe report busy until turned off.
    pub fn set_always_busy(&self, busy: bool) {
        self.lock_state().always_busy = busy;
    }

    /// Fail the next `n` transmissions with a send error.
    pub fn fail_next_sends(&self, n: usize) {
        self.lock_state().fail_sends = n;
    }

    /// Reported link quality for subsequent receptions.
    pub fn set_link_quality(&self, rssi: f32, snr: f32) {
        let mut state = self.lock_state();
        state.rssi = rssi;
        state.snr = snr;
    }

    /// Number of carrier-sense probes so far.
    #[must_use]
    pub fn scan_count(&self) -> usize {
        self.scan_count.load(Ordering::SeqCst)
    }

    /// Last transmit power the stack configured, in dBm.
    #[must_use]
    pub fn tx_power(&self) -> i8 {
        self.lock_state().tx_power
    }

    /// Simulate an unrecoverable driver fault: the next `recv` fails.
    pub fn fault(&self) {
        self.ether.fault_port(self.id);
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RadioState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl Radio for SimRadio {
    async fn recv(&self) -> Result<Bytes, RadioError> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or_else(|| RadioError::Fault("simulated driver fault".into()))
    }

    async fn send(&self, frame: &[u8]) -> Result<(), RadioError> {
        {
            let mut state = self.lock_state();
            if state.fail_sends > 0 {
                state.fail_sends -= 1;
                return Err(RadioError::Send("simulated send failure".into()));
            }
        }
        self.ether.broadcast(self.id, frame);
        Ok(())
    }

    fn scan_channel(&self) -> ChannelStatus {
        self.scan_count.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock_state();
        if state.always_busy {
            return ChannelStatus::Busy;
        }
        state.scans.pop_front().unwrap_or(ChannelStatus::Free)
    }

    fn rssi(&self) -> f32 {
        self.lock_state().rssi
    }

    fn snr(&self) -> f32 {
        self.lock_state().snr
    }

    fn set_frequency(&self, slot: FreqSlot) -> Result<(), RadioError> {
        self.ether.set_slot(self.id, slot);
        Ok(())
    }

    fn set_tx_power(&self, dbm: i8) -> Result<(), RadioError> {
        self.lock_state().tx_power = dbm;
        Ok(())
    }
}
