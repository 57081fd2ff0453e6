use crate::bridge::BridgeError;
use crate::config::ConfigError;

use super::session::SessionError;

#[derive(Debug, thiserror::Error)]
pub enum UiError {
    #[error("Browser driver error: {0}")]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("Invalid lifecycle state: cannot {action} while {state}")]
    InvalidState { action: &'static str, state: String },
}
