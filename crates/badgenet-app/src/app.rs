//! The application contract and per-app driver loop.
//!
//! An application implements [`App`]; the runtime gives it an
//! [`AppContext`] (network handle, config, peripherals, its own flags) and
//! drives it with the driver loop: run one bounded-time foreground or
//! background step, sleep the mode's interval, repeat. Mode transitions
//! happen through [`AppFlags`] - set by the launcher, by the app itself, or
//! by the runtime - and the loop invokes the matching transition hook on
//! the next tick.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use badgenet_core::{ConfigStore, Environment, NetHandle, Signer, Verifier};

use crate::{
    error::AppError,
    peripherals::{Display, Keyboard},
};

/// Shared foreground/background flags of one application.
///
/// # Invariants
///
/// - At most one of the two flags transitions the app into a mode at a
///   time: entering foreground clears background and vice versa.
/// - Both flags clear means the app stops at its next tick.
#[derive(Debug, Default)]
pub struct AppFlags {
    foreground: AtomicBool,
    background: AtomicBool,
}

impl AppFlags {
    /// Flags for a freshly started app (background mode).
    #[must_use]
    pub fn new_background() -> Arc<Self> {
        let flags = Self::default();
        flags.background.store(true, Ordering::SeqCst);
        Arc::new(flags)
    }

    /// Whether the app currently holds the foreground.
    #[must_use]
    pub fn is_foreground(&self) -> bool {
        self.foreground.load(Ordering::SeqCst)
    }

    /// Whether the app is running in the background.
    #[must_use]
    pub fn is_background(&self) -> bool {
        self.background.load(Ordering::SeqCst)
    }

    /// Whether the app is running at all.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_foreground() || self.is_background()
    }

    /// Make this app the foreground app. Idempotent.
    pub fn bring_foreground(&self) {
        self.background.store(false, Ordering::SeqCst);
        self.foreground.store(true, Ordering::SeqCst);
    }

    /// Send this app to the background. Idempotent.
    pub fn send_background(&self) {
        self.foreground.store(false, Ordering::SeqCst);
        self.background.store(true, Ordering::SeqCst);
    }

    /// Stop the app; its task exits on the next scheduler tick.
    pub fn stop(&self) {
        self.foreground.store(false, Ordering::SeqCst);
        self.background.store(false, Ordering::SeqCst);
    }
}

/// Resources an application may touch.
///
/// Cloned per app by the runtime; `flags` are the app's own.
#[derive(Clone)]
pub struct AppContext {
    /// Handle into the network stack.
    pub net: NetHandle,
    /// Persistent badge configuration.
    pub config: Arc<dyn ConfigStore>,
    /// The display (foreground apps only).
    pub display: Arc<dyn Display>,
    /// The keyboard (foreground apps only).
    pub keyboard: Arc<dyn Keyboard>,
    /// Signature verification with the event's public key.
    pub verifier: Arc<dyn Verifier>,
    /// Signing with this node's private key, when present.
    pub signer: Option<Arc<dyn Signer>>,
    /// This app's own mode flags.
    pub flags: Arc<AppFlags>,
}

impl AppContext {
    /// Send this app to the background (e.g. on a Home key press).
    pub fn go_home(&self) {
        self.flags.send_background();
    }
}

/// One badge application.
///
/// `run_foreground` and `run_background` are bounded-time steps invoked
/// from the app's own task; they must not block and must return quickly.
/// Port handlers registered in [`App::start`] are invoked from the network
/// receive pump under the same rules.
pub trait App: Send + 'static {
    /// Display name, also used in logs and menu slots.
    fn name(&self) -> &str;

    /// Register protocols and receive callbacks. Called once before the
    /// app's task starts (in background mode).
    fn start(&mut self, ctx: &AppContext) -> Result<(), AppError> {
        let _ = ctx;
        Ok(())
    }

    /// The app gained the foreground: acquire the display, build the page.
    fn on_foreground(&mut self, ctx: &AppContext) {
        let _ = ctx;
    }

    /// The app lost the foreground: release the display, keep receiving.
    fn on_background(&mut self, ctx: &AppContext) {
        let _ = ctx;
    }

    /// One bounded-time step of UI/input logic.
    fn run_foreground(&mut self, ctx: &AppContext) {
        let _ = ctx;
    }

    /// One bounded-time step of passive logic.
    fn run_background(&mut self, ctx: &AppContext) {
        let _ = ctx;
    }

    /// Both flags were cleared; release whatever is still held.
    fn on_stop(&mut self, ctx: &AppContext) {
        let _ = ctx;
    }

    /// Suspension between foreground steps.
    fn foreground_interval(&self) -> Duration {
        Duration::from_millis(100)
    }

    /// Suspension between background steps.
    fn background_interval(&self) -> Duration {
        Duration::from_millis(1000)
    }
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum Mode {
    Foreground,
    Background,
}

/// Drive one application until it stops.
///
/// The loop observes the app's flags each tick, invokes the transition
/// hooks on mode edges, runs the step for the current mode, and suspends
/// for the mode's interval. Clearing both flags ends the loop.
pub(crate) async fn drive<E: Environment>(mut app: Box<dyn App>, ctx: AppContext, env: E) {
    let mut mode = Mode::Background;

    loop {
        if ctx.flags.is_foreground() {
            if mode != Mode::Foreground {
                mode = Mode::Foreground;
                app.on_foreground(&ctx);
                tracing::info!(app = app.name(), "is now the active foreground app");
            }
            app.run_foreground(&ctx);
            env.sleep(app.foreground_interval()).await;
        } else if ctx.flags.is_background() {
            if mode != Mode::Background {
                mode = Mode::Background;
                app.on_background(&ctx);
                tracing::info!(app = app.name(), "is now running in the background");
            }
            app.run_background(&ctx);
            env.sleep(app.background_interval()).await;
        } else {
            app.on_stop(&ctx);
            tracing::info!(app = app.name(), "stopped");
            return;
        }
    }
}
