//! Runtime assembly: network pumps plus one driver task per app.
//!
//! The runtime owns the badge's shared resources, spawns the three network
//! pumps and each application's loop onto the executor, and keeps the
//! roster the launcher consults for foreground arbitration. The receive
//! pump is the only task that can die (on an unrecoverable radio fault);
//! [`Runtime::supervise`] surfaces that so the caller can restart it.

use std::sync::{Arc, Mutex};

use badgenet_core::{
    ConfigExt, ConfigStore, Environment, NetError, NetHandle, NetStack, Radio, Signer, Verifier,
};
use tokio::task::JoinHandle;

use crate::{
    app::{App, AppContext, AppFlags, drive},
    error::AppError,
    peripherals::{Display, Keyboard},
};

/// One spawned application as the launcher sees it.
#[derive(Clone)]
pub struct AppSlot {
    /// Display name.
    pub name: String,
    /// The app's mode flags.
    pub flags: Arc<AppFlags>,
}

/// Shared list of every spawned application.
///
/// The launcher's background heartbeat scans this to find out whether any
/// app currently holds the foreground.
#[derive(Clone, Default)]
pub struct AppRoster {
    slots: Arc<Mutex<Vec<AppSlot>>>,
}

impl AppRoster {
    pub(crate) fn register(&self, slot: AppSlot) {
        if let Ok(mut slots) = self.slots.lock() {
            slots.push(slot);
        }
    }

    /// Name of the app currently in the foreground, if any.
    #[must_use]
    pub fn foreground_app(&self) -> Option<String> {
        let slots = self.slots.lock().ok()?;
        slots.iter().find(|s| s.flags.is_foreground()).map(|s| s.name.clone())
    }

    /// How many apps currently claim the foreground (exactly one, outside
    /// an atomic switch).
    #[must_use]
    pub fn foreground_count(&self) -> usize {
        self.slots
            .lock()
            .map(|slots| slots.iter().filter(|s| s.flags.is_foreground()).count())
            .unwrap_or(0)
    }

    /// Snapshot of all registered apps.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AppSlot> {
        self.slots.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

/// The badge's shared peripheral handles.
#[derive(Clone)]
pub struct Peripherals {
    /// Persistent configuration store.
    pub config: Arc<dyn ConfigStore>,
    /// The display.
    pub display: Arc<dyn Display>,
    /// The keyboard.
    pub keyboard: Arc<dyn Keyboard>,
    /// Event public-key verifier.
    pub verifier: Arc<dyn Verifier>,
    /// Private-key signer, on badges that carry one.
    pub signer: Option<Arc<dyn Signer>>,
}

/// Assembles the stack, the peripherals, and the applications.
pub struct Runtime<E: Environment> {
    env: E,
    stack: NetStack<E>,
    peripherals: Peripherals,
    roster: AppRoster,
    receive_pump: Option<JoinHandle<Result<(), NetError>>>,
}

impl<E: Environment> Runtime<E> {
    /// Create a runtime around a network stack and peripherals.
    #[must_use]
    pub fn new(env: E, stack: NetStack<E>, peripherals: Peripherals) -> Self {
        Self { env, stack, peripherals, roster: AppRoster::default(), receive_pump: None }
    }

    /// Handle into the network stack.
    #[must_use]
    pub fn net(&self) -> NetHandle {
        self.stack.handle()
    }

    /// The roster of spawned apps (for launchers).
    #[must_use]
    pub fn roster(&self) -> AppRoster {
        self.roster.clone()
    }

    /// Spawn the receive, transmit, and cache-flush pumps on a radio.
    ///
    /// Applies the stored `radio_tx_power` to the driver first.
    pub fn start_network(&mut self, radio: Arc<dyn Radio>) {
        let tx_power = self.peripherals.config.radio_tx_power();
        if let Err(err) = radio.set_tx_power(tx_power) {
            tracing::warn!(%err, tx_power, "failed to set radio tx power");
        }

        let rx = tokio::spawn(self.stack.clone().receive_pump(Arc::clone(&radio)));
        self.receive_pump = Some(rx);
        tokio::spawn(self.stack.clone().transmit_pump(radio));
        tokio::spawn(self.stack.clone().flush_pump());
    }

    /// Start an app in background mode and return its flags.
    ///
    /// Calls [`App::start`] (protocol/callback registration) before the
    /// app's task begins ticking.
    ///
    /// # Errors
    ///
    /// Whatever [`App::start`] returns; the app is not spawned on error.
    pub fn spawn_app(&mut self, app: Box<dyn App>) -> Result<Arc<AppFlags>, AppError> {
        let flags = AppFlags::new_background();
        self.spawn_app_with_flags(app, Arc::clone(&flags))?;
        Ok(flags)
    }

    /// Start an app whose flags the caller created in advance.
    ///
    /// Launchers need their own flags at construction (to self-foreground
    /// from the heartbeat), so they are spawned through this variant.
    ///
    /// # Errors
    ///
    /// Whatever [`App::start`] returns; the app is not spawned on error.
    pub fn spawn_app_with_flags(
        &mut self,
        mut app: Box<dyn App>,
        flags: Arc<AppFlags>,
    ) -> Result<(), AppError> {
        let ctx = self.context_for(Arc::clone(&flags));
        app.start(&ctx)?;

        self.roster.register(AppSlot { name: app.name().to_owned(), flags });
        tracing::info!(app = app.name(), "starting app task");
        tokio::spawn(drive(app, ctx, self.env.clone()));
        Ok(())
    }

    /// Wait for the receive pump to terminate.
    ///
    /// Only an unrecoverable radio fault ends the pump; the caller decides
    /// whether to restart the network with [`Runtime::start_network`].
    ///
    /// # Errors
    ///
    /// The [`NetError`] the pump died with.
    pub async fn supervise(&mut self) -> Result<(), NetError> {
        let Some(pump) = self.receive_pump.take() else {
            return Ok(());
        };
        match pump.await {
            Ok(result) => result,
            Err(join_err) => Err(NetError::Radio(badgenet_core::RadioError::Fault(format!(
                "receive pump task failed: {join_err}"
            )))),
        }
    }

    fn context_for(&self, flags: Arc<AppFlags>) -> AppContext {
        AppContext {
            net: self.stack.handle(),
            config: Arc::clone(&self.peripherals.config),
            display: Arc::clone(&self.peripherals.display),
            keyboard: Arc::clone(&self.peripherals.keyboard),
            verifier: Arc::clone(&self.peripherals.verifier),
            signer: self.peripherals.signer.clone(),
            flags,
        }
    }
}
