//! The BadgeNet network stack.
//!
//! [`NetStack`] owns all mesh state - protocol registry, receive callbacks,
//! transmit queue, duplicate cache, promiscuous capture - and exposes it
//! two ways: three cooperative pumps the runtime schedules
//! ([`NetStack::receive_pump`], [`NetStack::transmit_pump`],
//! [`NetStack::flush_pump`]), and a cloneable [`NetHandle`] for
//! applications.
//!
//! # Locking
//!
//! One mutex guards all shared state and is held only across quick
//! critical sections, never across an await point. Port callbacks run
//! OUTSIDE the lock: the dispatch path snapshots the callback list (cheap
//! `Arc` clones) and releases the state first, so a callback may call back
//! into its [`NetHandle`] freely.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use badgenet_proto::{Frame, Payload, Protocol, ProtocolRegistry};

use crate::{
    cache::{DEFAULT_EXPIRATION, DuplicateCache},
    config::{ConfigExt, ConfigStore},
    env::Environment,
    error::{HandlerError, NetError},
    queue::{DEFAULT_BOUND, TransmitQueue},
    radio::{ChannelStatus, Radio},
};

/// RSSI/SNR of a received packet, as reported by the radio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkQuality {
    /// Received signal strength in dBm.
    pub rssi: f32,
    /// Signal-to-noise ratio in dB.
    pub snr: f32,
}

impl Default for LinkQuality {
    fn default() -> Self {
        // No packet heard yet.
        Self { rssi: f32::NEG_INFINITY, snr: f32::NEG_INFINITY }
    }
}

/// A validated frame delivered to a port callback.
///
/// Carries the frame, its typed payload (decoded once, before dispatch),
/// and the link quality sampled when the frame arrived.
#[derive(Debug, Clone)]
pub struct ReceivedFrame {
    /// The validated frame as it arrived.
    pub frame: Frame,
    /// Typed payload for the frame's port.
    pub payload: Payload,
    /// RSSI/SNR sampled with this reception.
    pub link: LinkQuality,
}

impl ReceivedFrame {
    /// Originating node address.
    #[must_use]
    pub fn source(&self) -> u32 {
        self.frame.header.source()
    }

    /// Destination address.
    #[must_use]
    pub fn destination(&self) -> u32 {
        self.frame.header.destination()
    }

    /// Protocol selector.
    #[must_use]
    pub fn port(&self) -> u8 {
        self.frame.header.port()
    }

    /// Hop budget the frame arrived with.
    #[must_use]
    pub fn ttl(&self) -> u8 {
        self.frame.header.ttl()
    }

    /// Originator-local sequence number.
    #[must_use]
    pub fn sequence(&self) -> u8 {
        self.frame.header.sequence()
    }
}

/// Callback invoked for frames on a registered port.
pub type PortHandler = Arc<dyn Fn(&ReceivedFrame) -> Result<(), HandlerError> + Send + Sync>;

/// Stack tuning knobs with mesh-wide defaults.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Transmit queue bound (default 20).
    pub tx_queue_bound: usize,
    /// Promiscuous capture queue bound (default 100).
    pub capture_bound: usize,
    /// Minimum interval between transmissions (default 100 ms).
    pub transmit_cooldown: Duration,
    /// Extra pause after every transmission (config `send_cooldown_ms`).
    pub send_cooldown: Duration,
    /// Duplicate cache expiration window (default 6000 s).
    pub cache_expiration: Duration,
    /// How often the cache flush pump runs (default 1 s).
    pub flush_interval: Duration,
    /// Transmit pump poll interval while the queue is empty.
    pub idle_poll: Duration,
    /// Upper bound of the random carrier-sense backoff (default 10 ms).
    pub max_backoff: Duration,
}

impl NetConfig {
    /// Defaults with the badge's stored `send_cooldown_ms` applied.
    #[must_use]
    pub fn from_store(store: &dyn ConfigStore) -> Self {
        Self { send_cooldown: store.send_cooldown(), ..Self::default() }
    }
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            tx_queue_bound: DEFAULT_BOUND,
            capture_bound: 100,
            transmit_cooldown: Duration::from_millis(100),
            send_cooldown: Duration::from_millis(1),
            cache_expiration: DEFAULT_EXPIRATION,
            flush_interval: Duration::from_secs(1),
            idle_poll: Duration::from_secs(1),
            max_backoff: Duration::from_millis(10),
        }
    }
}

struct StackState {
    registry: ProtocolRegistry,
    handlers: HashMap<u8, Vec<PortHandler>>,
    tx_queue: TransmitQueue,
    cache: DuplicateCache,
    capture: bool,
    captured: VecDeque<Frame>,
    sequence: u8,
    last_link: LinkQuality,
}

struct StackInner {
    address: u32,
    config: NetConfig,
    state: Mutex<StackState>,
}

impl StackInner {
    fn lock(&self) -> MutexGuard<'_, StackState> {
        // A panicking port callback cannot poison this lock (callbacks run
        // outside it); recover rather than propagate if it happens anyway.
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn push_captured(state: &mut StackState, frame: Frame, bound: usize) {
        if state.captured.len() >= bound {
            state.captured.pop_front();
        }
        state.captured.push_back(frame);
    }

    /// One validated-or-discarded pass over a raw inbound frame.
    fn process_inbound(&self, raw: &[u8], link: LinkQuality, now: Duration) {
        let frame = match Frame::decode(raw) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(%err, len = raw.len(), "failed validation, discarding frame");
                return;
            },
        };
        let checksum = frame.checksum();

        let (handlers, declared_len, protocol_name) = {
            let mut state = self.lock();
            state.last_link = link;

            // Insert-or-increment is the forwarding gate: only the first
            // observation of a checksum proceeds past this point.
            let prior = state.cache.observe(checksum, now);
            if prior > 0 {
                tracing::trace!(checksum, "duplicate suppressed");
                return;
            }

            if state.capture {
                Self::push_captured(&mut state, frame.clone(), self.config.capture_bound);
            }

            if let Some(forwarded) = frame.forward(self.address) {
                if !state.tx_queue.offer_forward(forwarded) {
                    tracing::debug!(checksum, "transmit queue congested, not relaying");
                }
            }

            // Frames for other nodes are relay work only.
            if !frame.is_for(self.address) {
                return;
            }

            let port = frame.header.port();
            match state.handlers.get(&port) {
                Some(handlers) if !handlers.is_empty() => {
                    let declared = state.registry.get(port).map(|p| p.payload_len);
                    (handlers.clone(), declared, state.registry.name_of(port).to_owned())
                },
                _ => {
                    tracing::debug!(port, "no receiver registered for port");
                    return;
                },
            }
        };

        // Another badge may define a different layout on the same port;
        // deliver only payloads matching OUR registered layout.
        if declared_len != Some(frame.payload.len()) {
            tracing::debug!(
                protocol = %protocol_name,
                payload_len = frame.payload.len(),
                "payload length does not match registered layout, not dispatched"
            );
            return;
        }

        let received = ReceivedFrame { payload: frame.decode_payload(), frame, link };
        for handler in handlers {
            if let Err(err) = handler(&received) {
                tracing::warn!(protocol = %protocol_name, %err, "exception in receive callback");
            }
        }
    }
}

/// The network stack. Cheap to clone; clones share all state.
///
/// Generic over the [`Environment`] so the pumps run identically on the
/// system clock and on the harness's virtual clock.
pub struct NetStack<E: Environment> {
    inner: Arc<StackInner>,
    env: E,
    epoch: E::Instant,
}

impl<E: Environment> Clone for NetStack<E> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner), env: self.env.clone(), epoch: self.epoch }
    }
}

impl<E: Environment> NetStack<E> {
    /// Create a stack for a node address.
    #[must_use]
    pub fn new(address: u32, config: NetConfig, env: E) -> Self {
        let epoch = env.now();
        let state = StackState {
            registry: ProtocolRegistry::new(),
            handlers: HashMap::new(),
            tx_queue: TransmitQueue::new(config.tx_queue_bound),
            cache: DuplicateCache::new(config.cache_expiration),
            capture: false,
            captured: VecDeque::new(),
            sequence: 0,
            last_link: LinkQuality::default(),
        };
        let inner = Arc::new(StackInner { address, config, state: Mutex::new(state) });
        Self { inner, env, epoch }
    }

    /// This node's address.
    #[must_use]
    pub fn address(&self) -> u32 {
        self.inner.address
    }

    /// Handle for applications to send, register, and observe.
    #[must_use]
    pub fn handle(&self) -> NetHandle {
        NetHandle { inner: Arc::clone(&self.inner) }
    }

    /// Monotonic time since the stack started (the cache's clock).
    fn now_offset(&self) -> Duration {
        self.env.now() - self.epoch
    }

    /// Receive pump: radio to applications.
    ///
    /// Loops forever validating, deduplicating, relaying, and dispatching
    /// inbound frames. Terminates only on an unrecoverable radio fault,
    /// which it returns so a supervisor can restart the pump.
    ///
    /// # Errors
    ///
    /// [`NetError::Radio`] wrapping the fatal driver fault.
    pub async fn receive_pump(self, radio: Arc<dyn Radio>) -> Result<(), NetError> {
        loop {
            let raw = match radio.recv().await {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::error!(%err, "receive fault, pump terminating");
                    return Err(err.into());
                },
            };
            if raw.is_empty() {
                continue;
            }

            let link = LinkQuality { rssi: radio.rssi(), snr: radio.snr() };
            self.inner.process_inbound(&raw, link, self.now_offset());
        }
    }

    /// Transmit pump: applications to radio.
    ///
    /// Drains the transmit queue, enforcing the dedup and congestion gates,
    /// the inter-transmit cooldown, and carrier sensing with random 0-10 ms
    /// backoff. Send failures drop the frame and continue; this pump has no
    /// fatal exit.
    pub async fn transmit_pump(self, radio: Arc<dyn Radio>) {
        let mut last_tx: Option<E::Instant> = None;

        loop {
            let Some(mut frame) = self.inner.lock().tx_queue.pop() else {
                self.env.sleep(self.inner.config.idle_poll).await;
                continue;
            };

            // Locally originated frames carry source 0 until this moment.
            if frame.header.source() == 0 {
                if let Err(err) = frame.stamp_source(self.inner.address) {
                    tracing::warn!(%err, "dropping unsendable frame");
                    continue;
                }
            }
            let checksum = frame.checksum();

            let (already_sent, congested) = {
                let state = self.inner.lock();
                (state.cache.count(checksum) > 1, state.tx_queue.is_congested())
            };
            // Seen never or once: send it. More: we (or the mesh through
            // us) already put this frame on the air.
            if already_sent {
                tracing::trace!(checksum, "dropping recently repeated frame before transmit");
                continue;
            }
            // Under congestion, shed relay traffic in favor of our own.
            if congested && frame.header.source() != self.inner.address {
                tracing::debug!(checksum, "queue congested, dropping relayed frame");
                continue;
            }

            if let Some(last) = last_tx {
                let elapsed = self.env.now() - last;
                if elapsed < self.inner.config.transmit_cooldown {
                    self.env.sleep(self.inner.config.transmit_cooldown - elapsed).await;
                }
            }

            // Carrier sense until the channel is clear.
            loop {
                match radio.scan_channel() {
                    ChannelStatus::Free => break,
                    ChannelStatus::Busy => {},
                    ChannelStatus::Error => tracing::warn!("error scanning channel"),
                }
                self.env.sleep(self.env.random_jitter(self.inner.config.max_backoff)).await;
            }

            let bytes = frame.to_bytes();
            if let Err(err) = radio.send(&bytes).await {
                tracing::warn!(%err, "failed sending, dropping frame");
                continue;
            }
            last_tx = Some(self.env.now());

            {
                let mut state = self.inner.lock();
                state.cache.stamp_sent(checksum, self.now_offset());
                if state.capture {
                    StackInner::push_captured(&mut state, frame, self.inner.config.capture_bound);
                }
            }

            self.env.sleep(self.inner.config.send_cooldown).await;
        }
    }

    /// Cache flush pump: periodically drops expired dedup entries.
    pub async fn flush_pump(self) {
        loop {
            self.env.sleep(self.inner.config.flush_interval).await;
            let now = self.now_offset();
            let purged = self.inner.lock().cache.purge_expired(now);
            if purged > 0 {
                tracing::debug!(purged, "purged expired entries from duplicate cache");
            }
        }
    }
}

/// Application-facing handle to the stack. Clone freely.
#[derive(Clone)]
pub struct NetHandle {
    inner: Arc<StackInner>,
}

impl NetHandle {
    /// This node's address.
    #[must_use]
    pub fn address(&self) -> u32 {
        self.inner.address
    }

    /// Originate a frame into the mesh.
    ///
    /// Stamps the next process-wide sequence number; the source address is
    /// stamped later by the transmit pump. TTL is clamped to `[0, 15]`.
    ///
    /// # Errors
    ///
    /// - [`NetError::Protocol`] when the payload does not fit the protocol
    /// - [`NetError::TransmitQueueFull`] when the queue is full of this
    ///   node's own pending frames
    pub fn originate(
        &self,
        protocol: &Protocol,
        destination: u32,
        ttl: u8,
        payload: Payload,
    ) -> Result<(), NetError> {
        let mut state = self.inner.lock();
        let sequence = state.sequence;
        state.sequence = state.sequence.wrapping_add(1);
        drop(state);

        let frame = Frame::builder(protocol)
            .destination(destination)
            .ttl(ttl)
            .sequence(sequence)
            .payload(payload)
            .build()?;
        self.send_frame(frame)
    }

    /// Enqueue a pre-built frame for transmission.
    ///
    /// # Errors
    ///
    /// [`NetError::TransmitQueueFull`] when the queue is full of this
    /// node's own pending frames.
    pub fn send_frame(&self, frame: Frame) -> Result<(), NetError> {
        self.inner.lock().tx_queue.push_originated(frame, self.inner.address)
    }

    /// Register a protocol descriptor for debug decoding.
    ///
    /// Not required when [`NetHandle::register_receiver`] is used; that
    /// registers the descriptor automatically.
    ///
    /// # Errors
    ///
    /// [`NetError::Protocol`] on a conflicting redefinition.
    pub fn register_protocol(&self, protocol: &Protocol) -> Result<(), NetError> {
        self.inner.lock().registry.register(protocol)?;
        Ok(())
    }

    /// Register a callback for frames addressed to this node on a port.
    ///
    /// Callbacks run on the executor thread from the receive pump, in
    /// registration order, outside the stack lock; they must return
    /// quickly and never block.
    ///
    /// # Errors
    ///
    /// [`NetError::Protocol`] on a conflicting protocol redefinition.
    pub fn register_receiver<F>(&self, protocol: &Protocol, handler: F) -> Result<(), NetError>
    where
        F: Fn(&ReceivedFrame) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let mut state = self.inner.lock();
        state.registry.register(protocol)?;
        state.handlers.entry(protocol.port).or_default().push(Arc::new(handler));
        Ok(())
    }

    /// Enable or disable promiscuous capture.
    pub fn set_capture(&self, enabled: bool) {
        self.inner.lock().capture = enabled;
    }

    /// Drain everything in the promiscuous capture queue.
    #[must_use]
    pub fn drain_captured(&self) -> Vec<Frame> {
        self.inner.lock().captured.drain(..).collect()
    }

    /// Link quality of the most recent reception.
    #[must_use]
    pub fn link_quality(&self) -> LinkQuality {
        self.inner.lock().last_link
    }

    /// Display name of a port's protocol.
    #[must_use]
    pub fn protocol_name(&self, port: u8) -> String {
        self.inner.lock().registry.name_of(port).to_owned()
    }

    /// Number of frames waiting in the transmit queue (debug observation).
    #[must_use]
    pub fn pending_transmissions(&self) -> usize {
        self.inner.lock().tx_queue.len()
    }

    /// Duplicate-cache count for a checksum (debug observation).
    #[must_use]
    pub fn seen_count(&self, checksum: u16) -> u32 {
        self.inner.lock().cache.count(checksum)
    }
}
