//! Network debugging tools: ping your neighbors, watch link quality.

use std::{collections::BTreeMap, time::Duration};

use badgenet_core::{HandlerError, LinkQuality};
use badgenet_proto::{BROADCAST_ADDRESS, Payload, Protocol, payloads::Pong};

use crate::{
    app::{App, AppContext},
    apps::ReceiveQueue,
    error::AppError,
};

const RECEIVE_BOUND: usize = 10;

/// TTL used for probes and their answers.
const PING_TTL: u8 = 7;

/// Foreground ticks between automatic pings (500 ms ticks, ping every 1 s).
const TICKS_PER_PING: u32 = 2;

/// Connectivity probing app.
///
/// Answers every PING aimed at this node (or at broadcast) with a unicast
/// PONG carrying the probe's arrival TTL and link quality; tracks which of
/// its own probes were answered and the resulting success rate.
pub struct NetTools {
    queue: ReceiveQueue,
    /// Probe bookkeeping: sequence number to "was answered".
    pings: BTreeMap<u8, bool>,
    ping_counter: u8,
    ticks_since_ping: u32,
    last_ping_sender: u32,
    last_ping_link: LinkQuality,
    last_pong: Option<Pong>,
    last_pong_link: LinkQuality,
}

impl NetTools {
    /// Create the app.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: ReceiveQueue::new(RECEIVE_BOUND),
            pings: BTreeMap::new(),
            ping_counter: 0,
            ticks_since_ping: 0,
            last_ping_sender: 0,
            last_ping_link: LinkQuality::default(),
            last_pong: None,
            last_pong_link: LinkQuality::default(),
        }
    }

    /// Broadcast a probe; every node in TTL range answers.
    pub fn send_ping(&mut self, ctx: &AppContext, target: u32) {
        let payload = Payload::Ping(badgenet_proto::payloads::Ping {
            target,
            seq: self.ping_counter,
        });
        if let Err(err) = ctx.net.originate(&Protocol::PING, BROADCAST_ADDRESS, PING_TTL, payload)
        {
            tracing::warn!(%err, "failed to send ping");
            return;
        }
        self.pings.insert(self.ping_counter, false);
        self.ping_counter = self.ping_counter.wrapping_add(1);
        self.ticks_since_ping = 0;
    }

    /// `(answered, sent)` counts for the probes of this session.
    #[must_use]
    pub fn success_rate(&self) -> (usize, usize) {
        let answered = self.pings.values().filter(|&&ok| ok).count();
        (answered, self.pings.len())
    }

    /// The most recent answer to one of our probes.
    #[must_use]
    pub fn last_pong(&self) -> Option<&Pong> {
        self.last_pong.as_ref()
    }

    fn process_queue(&mut self, ctx: &AppContext) {
        for frame in self.queue.drain() {
            match &frame.payload {
                Payload::Ping(ping) => {
                    let me = ctx.net.address();
                    if ping.target != me && ping.target != BROADCAST_ADDRESS {
                        continue;
                    }
                    self.last_ping_sender = frame.source();
                    self.last_ping_link = frame.link;

                    // Answer with what we measured on the probe itself.
                    let pong = Pong {
                        responder: me,
                        ttl_at_ping: frame.ttl(),
                        seq: ping.seq,
                        rssi: frame.link.rssi,
                        snr: frame.link.snr,
                    };
                    if let Err(err) = ctx.net.originate(
                        &Protocol::PONG,
                        frame.source(),
                        PING_TTL,
                        Payload::Pong(pong),
                    ) {
                        tracing::warn!(%err, "failed to answer ping");
                    }
                },
                Payload::Pong(pong) => {
                    self.pings.insert(pong.seq, true);
                    self.last_pong = Some(*pong);
                    self.last_pong_link = frame.link;
                },
                _ => {},
            }
        }
    }

    fn render(&self, ctx: &AppContext) {
        let (answered, sent) = self.success_rate();
        let percent = if sent == 0 { 0 } else { answered * 100 / sent };
        ctx.display.line(
            0,
            &format!(
                "Net Tools   My Address: {:x}   Success: {answered}/{sent}  {percent}%",
                ctx.net.address()
            ),
        );
        ctx.display.line(1, &format!("Last Ping Source: {:x}", self.last_ping_sender));
        ctx.display.line(2, &format!("Last Ping RSSI: {}", self.last_ping_link.rssi));
        ctx.display.line(3, &format!("Last Ping SNR: {}", self.last_ping_link.snr));
        if let Some(pong) = &self.last_pong {
            ctx.display.line(4, &format!("Last Ping Responder: {:x}", pong.responder));
            ctx.display.line(5, &format!("Last Sent Ping Received TTL: {}", pong.ttl_at_ping));
            ctx.display.line(6, &format!("Last Sent Ping Received RSSI: {}", pong.rssi));
            ctx.display.line(7, &format!("Last Sent Ping Received SNR: {}", pong.snr));
            ctx.display.line(8, &format!("Last Ping Response RSSI: {}", self.last_pong_link.rssi));
            ctx.display.line(9, &format!("Last Ping Response SNR: {}", self.last_pong_link.snr));
        }
    }
}

impl Default for NetTools {
    fn default() -> Self {
        Self::new()
    }
}

impl App for NetTools {
    fn name(&self) -> &str {
        "Net Tools"
    }

    fn foreground_interval(&self) -> Duration {
        Duration::from_millis(500)
    }

    fn background_interval(&self) -> Duration {
        Duration::from_millis(500)
    }

    fn start(&mut self, ctx: &AppContext) -> Result<(), AppError> {
        let queue = self.queue.clone();
        ctx.net.register_receiver(&Protocol::PING, move |frame| {
            queue.push(frame.clone());
            Ok::<(), HandlerError>(())
        })?;
        let queue = self.queue.clone();
        ctx.net.register_receiver(&Protocol::PONG, move |frame| {
            queue.push(frame.clone());
            Ok::<(), HandlerError>(())
        })?;
        Ok(())
    }

    fn on_foreground(&mut self, ctx: &AppContext) {
        ctx.display.clear();
        ctx.display.soft_keys(&["Ping", "", "", "", "Home"]);
    }

    fn run_foreground(&mut self, ctx: &AppContext) {
        self.process_queue(ctx);

        if ctx.keyboard.function_key(5) {
            ctx.go_home();
            return;
        }
        self.ticks_since_ping += 1;
        if ctx.keyboard.function_key(1) || self.ticks_since_ping >= TICKS_PER_PING {
            self.send_ping(ctx, BROADCAST_ADDRESS);
        }
        self.render(ctx);
    }

    fn run_background(&mut self, ctx: &AppContext) {
        self.process_queue(ctx);
    }
}
