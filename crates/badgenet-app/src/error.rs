//! Error types for the application runtime.

use badgenet_core::{ConfigError, NetError};
use thiserror::Error;

/// Errors surfaced while starting or running an application.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Protocol or stack failure during registration or send.
    #[error("network error: {0}")]
    Net(#[from] NetError),

    /// Configuration store failure.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}
