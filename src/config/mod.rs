//! Typed configuration
//!
//! This module contains:
//! - `provider` - Layered config sources, the ambient provider and `load_mapping`
//! - `mappings` - The `qabase.webui`, `qabase.rest` and `qabase.allure` mappings

use serde::de::DeserializeOwned;

pub mod mappings;
pub mod provider;

pub use mappings::{AllureConfig, BrowserType, RestConfig, Viewport, WebUiConfig};
pub use provider::{load_mapping, load_mapping_with, ConfigBuilder, ConfigProvider};

/// A typed view over every key below `PREFIX`.
///
/// Fields carrying `#[serde(default)]` are optional; fields without one are
/// required and make the lookup fail when no source provides them.
pub trait ConfigMapping: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Dotted key prefix, e.g. `qabase.webui`
    const PREFIX: &'static str;

    /// Extra checks run once after extraction
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config lookup failed for '{prefix}': {message}")]
    Lookup { prefix: String, message: String },

    #[error("Mapping '{0}' is not registered with this provider")]
    Unregistered(&'static str),

    #[error("Invalid value for '{key}': {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    pub(crate) fn lookup(prefix: &str, error: figment::Error) -> Self {
        ConfigError::Lookup {
            prefix: prefix.to_string(),
            message: error.to_string(),
        }
    }
}
