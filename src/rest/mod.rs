//! REST API testing
//!
//! This module contains:
//! - `client` - reqwest-backed client configured from `qabase.rest`
//! - `expect` - Fluent assertions over a response
//! - `status` - HTTP status families
//! - `support` - JSON helpers and report attachments

use serde::de::DeserializeOwned;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::time::Duration;

use crate::config::ConfigError;
use crate::report::AllureReporter;

pub mod client;
pub mod expect;
pub mod status;
pub mod support;

pub use client::RestClient;
pub use expect::RestExpect;
pub use status::StatusFamily;

pub const MEDIA_JSON: &str = "application/json";

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Assertion failed: {0}")]
    Assertion(String),
}

/// A completed HTTP exchange
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: u16,
    /// Every received header, repeated ones included
    pub headers: HeaderMap,
    /// Parsed JSON, `Value::String` for non-JSON text, `Value::Null` when empty
    pub body: Value,
    /// Raw body text
    pub text: String,
    pub elapsed: Duration,
    pub(crate) reporter: AllureReporter,
}

impl RestResponse {
    /// First value of `name`; names are case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All values of a repeated header such as `set-cookie`, in received order
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn json(&self) -> &Value {
        &self.body
    }

    pub fn as_type<T: DeserializeOwned>(&self) -> Result<T, RestError> {
        Ok(serde_json::from_str(&self.text)?)
    }

    pub fn is_success(&self) -> bool {
        StatusFamily::Success.contains(self.status)
    }

    pub fn expect(self) -> RestExpect {
        RestExpect::new(self)
    }
}
