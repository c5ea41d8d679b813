//! Cooperative application runtime for BadgeNet nodes.
//!
//! Every application on a badge is a foreground/background state machine:
//! the foreground app owns the display and keyboard, background apps keep
//! participating in the mesh. One single-threaded executor drives each
//! app's loop alongside the network pumps; apps suspend only at their
//! per-mode intervals and must never block.
//!
//! The [`Launcher`] arbitrates which app holds the foreground - exactly
//! one at any time - and brings itself forward whenever nothing else is.

pub mod app;
pub mod apps;
pub mod error;
pub mod launcher;
pub mod peripherals;
pub mod runtime;

pub use app::{App, AppContext, AppFlags};
pub use error::AppError;
pub use launcher::{LaunchEntry, Launcher};
pub use peripherals::{Display, Key, Keyboard, NullDisplay, NullKeyboard};
pub use runtime::{AppRoster, AppSlot, Peripherals, Runtime};
