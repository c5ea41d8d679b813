//! Wireshark, but for BadgeNet.
//!
//! While foregrounded, turns on the stack's promiscuous capture and shows
//! every validated frame on the air, decoded as far as the local protocol
//! registry allows. Capture is switched off the moment the app leaves the
//! foreground.

use std::{collections::VecDeque, time::Duration};

use badgenet_proto::Frame;

use crate::app::{App, AppContext};

/// Predicate over captured frames.
pub type PacketFilter = Box<dyn Fn(&Frame) -> bool + Send>;

const CAPTURE_BOUND: usize = 20;
const DISPLAY_BOUND: usize = 10;

/// Promiscuous packet capture app.
pub struct Shark {
    capture: Vec<Frame>,
    rows: VecDeque<String>,
    capture_filter: Option<PacketFilter>,
    display_filter: Option<PacketFilter>,
}

impl Shark {
    /// Create the app with no filters (accept everything).
    #[must_use]
    pub fn new() -> Self {
        Self {
            capture: Vec::new(),
            rows: VecDeque::new(),
            capture_filter: None,
            display_filter: None,
        }
    }

    /// Keep only frames matching `filter` in the capture list.
    pub fn set_capture_filter(&mut self, filter: PacketFilter) {
        self.capture_filter = Some(filter);
    }

    /// Show only frames matching `filter` on screen.
    pub fn set_display_filter(&mut self, filter: PacketFilter) {
        self.display_filter = Some(filter);
    }

    /// Formatted rows currently on screen (newest last).
    #[must_use]
    pub fn display_rows(&self) -> Vec<String> {
        self.rows.iter().cloned().collect()
    }

    fn passes(filter: Option<&PacketFilter>, frame: &Frame) -> bool {
        filter.is_none_or(|f| f(frame))
    }

    fn pull_captured(&mut self, ctx: &AppContext) {
        for frame in ctx.net.drain_captured() {
            if !Self::passes(self.capture_filter.as_ref(), &frame) {
                continue;
            }
            if self.capture.len() >= CAPTURE_BOUND {
                self.capture.remove(0);
            }
            self.capture.push(frame);
        }
    }

    fn describe(ctx: &AppContext, frame: &Frame) -> String {
        format!(
            "[{:x}] {:x} -> {:x}:{} [{}] {:04x}",
            frame.header.sequence(),
            frame.header.source(),
            frame.header.destination(),
            frame.header.port(),
            ctx.net.protocol_name(frame.header.port()),
            frame.checksum(),
        )
    }
}

impl Default for Shark {
    fn default() -> Self {
        Self::new()
    }
}

impl App for Shark {
    fn name(&self) -> &str {
        "BadgeShark"
    }

    fn foreground_interval(&self) -> Duration {
        Duration::from_millis(5000)
    }

    fn start(&mut self, _ctx: &AppContext) -> Result<(), crate::error::AppError> {
        Ok(())
    }

    fn on_foreground(&mut self, ctx: &AppContext) {
        ctx.net.set_capture(true);
        ctx.display.clear();
        ctx.display.line(0, "BadgeShark - capturing");
        ctx.display.soft_keys(&["", "", "", "", "Home"]);
    }

    fn on_background(&mut self, ctx: &AppContext) {
        ctx.net.set_capture(false);
    }

    fn on_stop(&mut self, ctx: &AppContext) {
        ctx.net.set_capture(false);
    }

    fn run_foreground(&mut self, ctx: &AppContext) {
        if ctx.keyboard.function_key(5) {
            ctx.go_home();
            return;
        }

        self.pull_captured(ctx);
        for frame in self.capture.drain(..) {
            if !Self::passes(self.display_filter.as_ref(), &frame) {
                continue;
            }
            if self.rows.len() >= DISPLAY_BOUND {
                self.rows.pop_front();
            }
            self.rows.push_back(Self::describe(ctx, &frame));
        }

        for (row, text) in self.rows.iter().enumerate() {
            ctx.display.line(row + 1, text);
        }
    }

    fn run_background(&mut self, ctx: &AppContext) {
        // Capture is off in the background; discard anything left over.
        let _ = ctx.net.drain_captured();
    }
}
