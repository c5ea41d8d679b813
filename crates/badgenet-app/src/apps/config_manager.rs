//! Configuration viewer and signed remote overrides.
//!
//! Shows the badge's key/value config on screen and applies
//! CONFIG_OVERRIDE frames from the mesh - but only when the override's
//! signature over `key ‖ value` verifies against the event's public key.

use std::time::Duration;

use badgenet_core::HandlerError;
use badgenet_proto::{Payload, Protocol, payloads::ConfigOverride};

use crate::{
    app::{App, AppContext},
    apps::ReceiveQueue,
    error::AppError,
};

const RECEIVE_BOUND: usize = 10;

/// View the badge config; accept signed overrides from the mesh.
pub struct ConfigManager {
    queue: ReceiveQueue,
    entries: Vec<(String, String)>,
    cursor: usize,
}

impl ConfigManager {
    /// Create the app.
    #[must_use]
    pub fn new() -> Self {
        Self { queue: ReceiveQueue::new(RECEIVE_BOUND), entries: Vec::new(), cursor: 0 }
    }

    fn reload(&mut self, ctx: &AppContext) {
        self.entries = ctx
            .config
            .entries()
            .into_iter()
            .map(|(key, value)| (key, String::from_utf8_lossy(&value).into_owned()))
            .collect();
        self.cursor = self.cursor.min(self.entries.len().saturating_sub(1));
    }

    fn apply_override(&mut self, ctx: &AppContext, message: &ConfigOverride) {
        let signed = ConfigOverride::signed_bytes(&message.key, &message.value)
            .map(|bytes| ctx.verifier.verify(&bytes, &message.signature))
            .unwrap_or(false);
        tracing::info!(key = %message.key, signed, "got config override message");
        if !signed {
            return;
        }

        if let Err(err) = ctx.config.set(&message.key, &message.value) {
            tracing::warn!(%err, key = %message.key, "failed to apply config override");
            return;
        }
        if let Err(err) = ctx.config.flush() {
            tracing::warn!(%err, "failed to flush config");
        }
        self.reload(ctx);
    }

    fn process_queue(&mut self, ctx: &AppContext) {
        for frame in self.queue.drain() {
            if let Payload::ConfigOverride(message) = &frame.payload {
                self.apply_override(ctx, message);
            }
        }
    }

    fn render(&self, ctx: &AppContext) {
        ctx.display.line(0, "Config Manager");
        for (row, (key, value)) in self.entries.iter().enumerate() {
            let marker = if row == self.cursor { ">" } else { " " };
            ctx.display.line(row + 1, &format!("{marker} {key}: {value}"));
        }
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl App for ConfigManager {
    fn name(&self) -> &str {
        "Config"
    }

    fn foreground_interval(&self) -> Duration {
        Duration::from_millis(100)
    }

    fn background_interval(&self) -> Duration {
        Duration::from_millis(100)
    }

    fn start(&mut self, ctx: &AppContext) -> Result<(), AppError> {
        let queue = self.queue.clone();
        ctx.net.register_receiver(&Protocol::CONFIG_OVERRIDE, move |frame| {
            queue.push(frame.clone());
            Ok::<(), HandlerError>(())
        })?;
        Ok(())
    }

    fn on_foreground(&mut self, ctx: &AppContext) {
        self.reload(ctx);
        ctx.display.clear();
        ctx.display.soft_keys(&["", "", "", "", "Home"]);
        self.render(ctx);
    }

    fn on_background(&mut self, ctx: &AppContext) {
        // Persist anything an override changed while we were on screen.
        if let Err(err) = ctx.config.flush() {
            tracing::warn!(%err, "failed to flush config");
        }
    }

    fn run_foreground(&mut self, ctx: &AppContext) {
        self.process_queue(ctx);

        if ctx.keyboard.function_key(5) {
            ctx.go_home();
            return;
        }
        match ctx.keyboard.read_key() {
            Some(crate::peripherals::Key::Up) => {
                self.cursor = self.cursor.saturating_sub(1);
                self.render(ctx);
            },
            Some(crate::peripherals::Key::Down) => {
                self.cursor = (self.cursor + 1).min(self.entries.len().saturating_sub(1));
                self.render(ctx);
            },
            _ => {},
        }
    }

    fn run_background(&mut self, ctx: &AppContext) {
        self.process_queue(ctx);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use badgenet_core::{
        Environment, LinkQuality, MemoryConfig, NetConfig, NetStack, ReceivedFrame, Verifier,
    };
    use badgenet_proto::Frame;

    use super::*;
    use crate::peripherals::{NullDisplay, NullKeyboard};

    #[derive(Clone)]
    struct TestEnv;

    impl Environment for TestEnv {
        type Instant = std::time::Instant;

        fn now(&self) -> Self::Instant {
            std::time::Instant::now()
        }

        async fn sleep(&self, duration: Duration) {
            tokio::time::sleep(duration).await;
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(7);
        }
    }

    struct TagVerifier;

    impl Verifier for TagVerifier {
        fn verify(&self, _message: &[u8], signature: &[u8]) -> bool {
            signature.iter().all(|&b| b == 0x5A)
        }
    }

    fn test_ctx() -> AppContext {
        let stack = NetStack::new(0xAAAA_AAAA, NetConfig::default(), TestEnv);
        AppContext {
            net: stack.handle(),
            config: Arc::new(MemoryConfig::new()),
            display: Arc::new(NullDisplay),
            keyboard: Arc::new(NullKeyboard),
            verifier: Arc::new(TagVerifier),
            signer: None,
            flags: crate::app::AppFlags::new_background(),
        }
    }

    fn override_frame(signature: [u8; 128], key: &str, value: &[u8]) -> ReceivedFrame {
        let payload = Payload::ConfigOverride(ConfigOverride {
            signature,
            key: key.to_owned(),
            value: value.to_vec(),
        });
        let frame = Frame::builder(&Protocol::CONFIG_OVERRIDE)
            .source(0xBBBB_BBBB)
            .ttl(3)
            .payload(payload.clone())
            .build()
            .unwrap();
        ReceivedFrame { frame, payload, link: LinkQuality::default() }
    }

    #[test]
    fn signed_override_is_applied_and_flushed() {
        let ctx = test_ctx();
        let mut app = ConfigManager::new();
        app.start(&ctx).unwrap();

        app.queue.push(override_frame([0x5A; 128], "chat_ttl", b"5"));
        app.run_background(&ctx);

        assert_eq!(ctx.config.get("chat_ttl"), Some(b"5".to_vec()));
    }

    #[test]
    fn unsigned_override_is_ignored() {
        let ctx = test_ctx();
        let mut app = ConfigManager::new();

        app.queue.push(override_frame([0x00; 128], "chat_ttl", b"15"));
        app.run_background(&ctx);

        assert_eq!(ctx.config.get("chat_ttl"), None);
    }
}
