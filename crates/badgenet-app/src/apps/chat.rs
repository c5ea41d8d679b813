//! IRC-like chat over the mesh.
//!
//! Messages are broadcast frames sorted into numbered channels
//! (`frequency_slot * 100 + topic`). Signed messages are verified against
//! the event's public key and dropped when the signature does not check
//! out; everything else is best-effort flood delivery.

use std::{
    collections::{BTreeMap, VecDeque},
    time::Duration,
};

use badgenet_core::{ConfigExt, HandlerError};
use badgenet_proto::{
    BROADCAST_ADDRESS, Payload, Protocol,
    payloads::{SignedTextChat, TextChat},
};

use crate::{
    app::{App, AppContext},
    apps::ReceiveQueue,
    error::AppError,
    peripherals::Key,
};

const RECEIVE_BOUND: usize = 100;

/// Messages kept per channel.
const CHANNEL_HISTORY: usize = 100;

/// Rows of history shown on screen.
const DISPLAY_ROWS: usize = 8;

/// One message in a channel's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Originating node address.
    pub source: u32,
    /// Sender's alias ("" when they have none).
    pub alias: String,
    /// Message text.
    pub text: String,
    /// Whether the message carried a valid signature.
    pub signed: bool,
}

/// Text messaging and chat.
pub struct ChatApp {
    queue: ReceiveQueue,
    channels: BTreeMap<u16, VecDeque<ChatMessage>>,
    active_freq: u8,
    active_topic: u8,
    /// Message being typed; `None` outside compose mode.
    compose: Option<String>,
    /// Jump to whichever channel a message last arrived on.
    follow: bool,
    dirty: bool,
}

impl ChatApp {
    /// Create the app, parked on the default channel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: ReceiveQueue::new(RECEIVE_BOUND),
            channels: BTreeMap::new(),
            active_freq: 9,
            active_topic: 1,
            compose: None,
            follow: false,
            dirty: true,
        }
    }

    /// Channel currently displayed: `freq * 100 + topic`.
    #[must_use]
    pub fn active_channel(&self) -> u16 {
        u16::from(self.active_freq) * 100 + u16::from(self.active_topic)
    }

    /// History of one channel (newest last).
    #[must_use]
    pub fn channel_history(&self, channel: u16) -> Vec<ChatMessage> {
        self.channels.get(&channel).map(|msgs| msgs.iter().cloned().collect()).unwrap_or_default()
    }

    /// Send a plain chat message to the active channel.
    ///
    /// Uses the configured alias and `chat_ttl`.
    ///
    /// # Errors
    ///
    /// [`AppError::Net`] when the text overflows its slot or the queue is
    /// full of pending local frames.
    pub fn send_message(&mut self, ctx: &AppContext, text: &str) -> Result<(), AppError> {
        let alias = ctx.config.alias();
        let message = TextChat {
            channel: self.active_channel(),
            alias: alias.clone(),
            text: text.to_owned(),
        };
        ctx.net.originate(
            &Protocol::TEXT_CHAT,
            BROADCAST_ADDRESS,
            ctx.config.chat_ttl(),
            Payload::TextChat(message),
        )?;

        // Our own frames never come back through the receive path.
        self.record(
            self.active_channel(),
            ChatMessage { source: ctx.net.address(), alias, text: text.to_owned(), signed: false },
        );
        Ok(())
    }

    /// Send a signed chat message to the active channel.
    ///
    /// Only possible on nodes carrying the private key.
    ///
    /// # Errors
    ///
    /// [`AppError::Net`] on send failure; signing failures are logged and
    /// drop the message.
    pub fn send_signed_message(&mut self, ctx: &AppContext, text: &str) -> Result<(), AppError> {
        let Some(signer) = &ctx.signer else {
            tracing::warn!("no private key on this node, sending unsigned instead");
            return self.send_message(ctx, text);
        };

        let slot = match SignedTextChat::signed_bytes(text) {
            Ok(slot) => slot,
            Err(err) => {
                tracing::warn!(%err, "message too long to sign");
                return Err(badgenet_core::NetError::Protocol(err).into());
            },
        };
        let signature = match signer.sign(&slot) {
            Ok(signature) => signature,
            Err(err) => {
                tracing::warn!(%err, "signing failed, message dropped");
                return Ok(());
            },
        };

        let alias = ctx.config.alias();
        let message = SignedTextChat {
            channel: self.active_channel(),
            alias: alias.clone(),
            signature,
            text: text.to_owned(),
        };
        ctx.net.originate(
            &Protocol::SIGNED_TEXT_CHAT,
            BROADCAST_ADDRESS,
            ctx.config.chat_ttl(),
            Payload::SignedTextChat(message),
        )?;

        self.record(
            self.active_channel(),
            ChatMessage { source: ctx.net.address(), alias, text: text.to_owned(), signed: true },
        );
        Ok(())
    }

    fn record(&mut self, channel: u16, message: ChatMessage) {
        let history = self.channels.entry(channel).or_default();
        if history.len() >= CHANNEL_HISTORY {
            history.pop_front();
        }
        history.push_back(message);
        if self.follow && channel != self.active_channel() {
            self.follow_channel(channel);
        }
        if channel == self.active_channel() {
            self.dirty = true;
        }
    }

    /// Retarget the display to a channel a message just arrived on.
    fn follow_channel(&mut self, channel: u16) {
        let freq = channel / 100;
        let topic = channel % 100;
        if (1..=52).contains(&freq) && (1..=99).contains(&topic) {
            self.active_freq = freq as u8;
            self.active_topic = topic as u8;
            self.dirty = true;
        }
    }

    fn process_queue(&mut self, ctx: &AppContext) {
        for frame in self.queue.drain() {
            match &frame.payload {
                Payload::TextChat(chat) => {
                    self.record(
                        chat.channel,
                        ChatMessage {
                            source: frame.source(),
                            alias: chat.alias.clone(),
                            text: chat.text.clone(),
                            signed: false,
                        },
                    );
                },
                Payload::SignedTextChat(chat) => {
                    // Verify over the padded wire slot, not the stripped text.
                    let verified = SignedTextChat::signed_bytes(&chat.text)
                        .map(|slot| ctx.verifier.verify(&slot, &chat.signature))
                        .unwrap_or(false);
                    if !verified {
                        tracing::warn!(source = frame.source(), "dropping signed chat with bad signature");
                        continue;
                    }
                    self.record(
                        chat.channel,
                        ChatMessage {
                            source: frame.source(),
                            alias: chat.alias.clone(),
                            text: chat.text.clone(),
                            signed: true,
                        },
                    );
                },
                _ => {},
            }
        }
    }

    fn seek_topic(&mut self, delta: i16) {
        let topic = i16::from(self.active_topic) + delta;
        self.active_topic = topic.clamp(1, 99) as u8;
        self.dirty = true;
    }

    fn cycle_freq(&mut self) {
        self.active_freq = if self.active_freq >= 52 { 1 } else { self.active_freq + 1 };
        self.dirty = true;
    }

    fn cycle_topic(&mut self) {
        self.active_topic = if self.active_topic >= 99 { 1 } else { self.active_topic + 1 };
        self.dirty = true;
    }

    /// One tick of compose mode: type into the buffer, Enter sends,
    /// Escape abandons.
    fn run_compose(&mut self, ctx: &AppContext) {
        while let Some(key) = ctx.keyboard.read_key() {
            match key {
                Key::Enter => {
                    let text = self.compose.take().unwrap_or_default();
                    self.dirty = true;
                    if !text.is_empty()
                        && let Err(err) = self.send_message(ctx, &text)
                    {
                        tracing::warn!(%err, "failed to send chat message");
                    }
                    return;
                },
                Key::Escape => {
                    self.compose = None;
                    self.dirty = true;
                    return;
                },
                Key::Char(c) => {
                    if let Some(buffer) = &mut self.compose
                        && buffer.len() + c.len_utf8() <= TextChat::TEXT_LEN
                    {
                        buffer.push(c);
                    }
                },
                Key::Up | Key::Down | Key::Left | Key::Right => {},
            }
        }
        if let Some(buffer) = &self.compose {
            ctx.display.line(DISPLAY_ROWS + 1, &format!("> {buffer}"));
        }
    }

    fn render(&mut self, ctx: &AppContext) {
        if !self.dirty {
            return;
        }
        self.dirty = false;

        ctx.display.line(
            0,
            &format!(
                "Channel: {:02}:{:02}{}    {:x} : {}",
                self.active_freq,
                self.active_topic,
                if self.follow { "  [follow]" } else { "" },
                ctx.net.address(),
                ctx.config.alias()
            ),
        );

        let history = self.channels.get(&self.active_channel());
        let messages: Vec<&ChatMessage> = history
            .map(|msgs| msgs.iter().rev().take(DISPLAY_ROWS).collect::<Vec<_>>())
            .unwrap_or_default();
        for (row, message) in messages.iter().rev().enumerate() {
            let who = if message.alias.is_empty() {
                format!("{:x}", message.source)
            } else {
                message.alias.clone()
            };
            ctx.display.line(row + 1, &format!("{who}: {}", message.text));
        }
    }
}

impl Default for ChatApp {
    fn default() -> Self {
        Self::new()
    }
}

impl App for ChatApp {
    fn name(&self) -> &str {
        "Chat"
    }

    fn foreground_interval(&self) -> Duration {
        Duration::from_millis(10)
    }

    fn background_interval(&self) -> Duration {
        Duration::from_millis(2000)
    }

    fn start(&mut self, ctx: &AppContext) -> Result<(), AppError> {
        let queue = self.queue.clone();
        ctx.net.register_receiver(&Protocol::TEXT_CHAT, move |frame| {
            queue.push(frame.clone());
            Ok::<(), HandlerError>(())
        })?;
        let queue = self.queue.clone();
        ctx.net.register_receiver(&Protocol::SIGNED_TEXT_CHAT, move |frame| {
            queue.push(frame.clone());
            Ok::<(), HandlerError>(())
        })?;
        Ok(())
    }

    fn on_foreground(&mut self, ctx: &AppContext) {
        ctx.display.clear();
        ctx.display.soft_keys(&["Compose", "Freq", "Topic", "Follow", "Home"]);
        self.dirty = true;
    }

    fn run_foreground(&mut self, ctx: &AppContext) {
        self.process_queue(ctx);

        if self.compose.is_some() {
            self.run_compose(ctx);
            return;
        }

        if ctx.keyboard.function_key(5) {
            ctx.go_home();
            return;
        }
        if ctx.keyboard.function_key(1) {
            self.compose = Some(String::new());
            ctx.display.line(DISPLAY_ROWS + 1, "> ");
            return;
        }
        if ctx.keyboard.function_key(2) {
            self.cycle_freq();
        }
        if ctx.keyboard.function_key(3) {
            self.cycle_topic();
        }
        if ctx.keyboard.function_key(4) {
            self.follow = !self.follow;
            self.dirty = true;
        }
        match ctx.keyboard.read_key() {
            Some(Key::Up) => self.seek_topic(1),
            Some(Key::Down) => self.seek_topic(-1),
            _ => {},
        }
        self.render(ctx);
    }

    fn run_background(&mut self, ctx: &AppContext) {
        self.process_queue(ctx);
    }
}
