//! Bridge to the external browser driver
//!
//! This module contains:
//! - `rpc` - JSON-RPC over stdin/stdout, with server notifications
//! - `playwright` - The Playwright driver process and its typed calls

pub mod playwright;
pub mod rpc;

pub use playwright::{DialogHandler, PlaywrightBridge};
pub use rpc::{RpcNotification, RpcRequest};

/// Common error type for bridge operations
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Failed to start driver: {0}")]
    StartupFailed(String),

    #[error("Driver disconnected")]
    Disconnected,

    #[error("Driver error: {0}")]
    ServerError(String),

    #[error("Unexpected driver response for {method}: missing '{field}'")]
    UnexpectedResponse { method: String, field: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
