//! Nametag: the badge's resting face.

use std::time::Duration;

use badgenet_core::ConfigExt;

use crate::app::{App, AppContext};

/// Shows the configured nametag full-screen.
#[derive(Debug, Default)]
pub struct Nametag;

impl Nametag {
    /// Create the app.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl App for Nametag {
    fn name(&self) -> &str {
        "Nametag"
    }

    fn background_interval(&self) -> Duration {
        Duration::from_millis(5000)
    }

    fn on_foreground(&mut self, ctx: &AppContext) {
        ctx.display.clear();
        ctx.display.line(2, &ctx.config.nametag());
        ctx.display.soft_keys(&["", "", "", "", "Home"]);
    }

    fn run_foreground(&mut self, ctx: &AppContext) {
        if ctx.keyboard.function_key(5) {
            ctx.go_home();
        }
    }
}
