//! Menu / launcher application.
//!
//! Presents up to five labeled slots on the function keys and switches the
//! foreground to whichever app the user picks. The main menu also runs a
//! background heartbeat: whenever no application holds the foreground
//! (e.g. after an app stopped), it brings itself forward so the badge
//! never ends up without input.

use std::sync::Arc;

use crate::{
    app::{App, AppContext, AppFlags},
    runtime::AppRoster,
};

/// One selectable slot in a menu.
#[derive(Clone)]
pub struct LaunchEntry {
    /// Label shown above the function key.
    pub label: String,
    /// Flags of the app this slot launches.
    pub flags: Arc<AppFlags>,
}

/// The menu application.
pub struct Launcher {
    name: String,
    entries: Vec<Option<LaunchEntry>>,
    own_flags: Arc<AppFlags>,
    roster: AppRoster,
    /// Primary menu to return to on Home. `None` on the main menu itself.
    home: Option<Arc<AppFlags>>,
    heartbeat_counter: u32,
}

impl Launcher {
    /// Number of function-key slots.
    pub const SLOTS: usize = 5;

    /// Build the main menu.
    ///
    /// The main menu uses all five slots and self-foregrounds from its
    /// heartbeat whenever the roster shows no foreground app. Its `flags`
    /// must be the same `Arc` later passed to
    /// [`crate::Runtime::spawn_app_with_flags`].
    #[must_use]
    pub fn main_menu(
        name: impl Into<String>,
        entries: Vec<Option<LaunchEntry>>,
        flags: Arc<AppFlags>,
        roster: AppRoster,
    ) -> Self {
        Self {
            name: name.into(),
            entries,
            own_flags: flags,
            roster,
            home: None,
            heartbeat_counter: 0,
        }
    }

    /// Build a secondary menu whose fifth key is "Home".
    #[must_use]
    pub fn secondary_menu(
        name: impl Into<String>,
        entries: Vec<Option<LaunchEntry>>,
        flags: Arc<AppFlags>,
        roster: AppRoster,
        home: Arc<AppFlags>,
    ) -> Self {
        Self {
            name: name.into(),
            entries,
            own_flags: flags,
            roster,
            home: Some(home),
            heartbeat_counter: 0,
        }
    }

    fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self
            .entries
            .iter()
            .take(Self::SLOTS)
            .map(|slot| slot.as_ref().map(|e| e.label.clone()).unwrap_or_default())
            .collect();
        labels.resize(Self::SLOTS, String::new());
        if self.home.is_some() {
            labels[Self::SLOTS - 1] = "Home".to_owned();
        }
        labels
    }

    fn launch(&self, ctx: &AppContext, entry: &LaunchEntry) {
        // The outgoing foreground app may not have ticked yet; clear the
        // screen here so the incoming app starts clean.
        ctx.display.clear();
        self.own_flags.send_background();
        entry.flags.bring_foreground();
    }

    fn slot(&self, index: usize) -> Option<&LaunchEntry> {
        self.entries.get(index).and_then(Option::as_ref)
    }
}

impl App for Launcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn background_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(200)
    }

    fn on_foreground(&mut self, ctx: &AppContext) {
        ctx.display.clear();
        ctx.display.line(0, &self.name);
        let labels = self.labels();
        let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        ctx.display.soft_keys(&refs);
    }

    fn run_foreground(&mut self, ctx: &AppContext) {
        for key in 1..=Self::SLOTS as u8 {
            if !ctx.keyboard.function_key(key) {
                continue;
            }

            let index = usize::from(key - 1);
            // F5 on a secondary menu returns to the primary menu.
            if key == 5 && self.home.is_some() {
                if let Some(home) = &self.home {
                    ctx.display.clear();
                    self.own_flags.send_background();
                    home.bring_foreground();
                }
                return;
            }
            if let Some(entry) = self.slot(index) {
                let entry = entry.clone();
                self.launch(ctx, &entry);
                return;
            }
        }
    }

    fn run_background(&mut self, _ctx: &AppContext) {
        // Only the main menu restores the foreground.
        if self.home.is_some() {
            return;
        }

        match self.roster.foreground_app() {
            None => {
                tracing::info!(menu = %self.name, "no foreground app, menu taking over");
                self.own_flags.bring_foreground();
            },
            Some(current) => {
                if self.heartbeat_counter & 0x0F == 0 {
                    tracing::debug!(menu = %self.name, foreground = %current, "menu heartbeat");
                }
                self.heartbeat_counter = self.heartbeat_counter.wrapping_add(1);
            },
        }
    }
}
