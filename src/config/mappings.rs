//! Configuration mappings
//!
//! Example YAML:
//!
//! ```yaml
//! qabase:
//!   webui:
//!     base-url: "https://www.demoblaze.com"
//!     browser-type: chromium
//!     viewport-width: 1920
//!     viewport-height: 1080
//!     timeout-ms: 10000
//!     headless: true
//!     trace-on-failure: true
//!   rest:
//!     base-url: https://api.example.com
//!     timeout-ms: 20000
//!     auth-token: secret
//!   allure:
//!     enabled: true
//! ```

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use super::{ConfigError, ConfigMapping};

// ============================================================================
// Scalars
// ============================================================================

// Environment variables and properties come in untyped, so `12345` reaches a
// string field as a number.
struct ScalarString;

impl<'de> Visitor<'de> for ScalarString {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number or boolean")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
        Ok(v.to_string())
    }
}

struct OptionalScalarString;

impl<'de> Visitor<'de> for OptionalScalarString {
    type Value = Option<String>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an optional string, number or boolean")
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        scalar_string(deserializer).map(Some)
    }
}

pub(crate) fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    deserializer.deserialize_any(ScalarString)
}

pub(crate) fn optional_scalar_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    deserializer.deserialize_option(OptionalScalarString)
}

// ============================================================================
// Web UI
// ============================================================================

/// Browser engines the Playwright driver can launch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    #[default]
    #[serde(alias = "chrome")]
    Chromium,
    Firefox,
    #[serde(alias = "safari")]
    Webkit,
}

impl BrowserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserType::Chromium => "chromium",
            BrowserType::Firefox => "firefox",
            BrowserType::Webkit => "webkit",
        }
    }
}

/// Viewport configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Settings for the `qabase.webui` prefix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct WebUiConfig {
    /// Base URL for the web UI under test
    #[serde(default = "default_base_url", deserialize_with = "scalar_string")]
    pub base_url: String,

    #[serde(default)]
    pub browser_type: BrowserType,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Default action and navigation timeout in milliseconds
    #[serde(default = "default_webui_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub headless: bool,

    /// Record a Playwright trace and attach it when a test fails
    #[serde(default)]
    pub trace_on_failure: bool,

    /// Node script implementing the Playwright JSON-RPC server
    #[serde(default = "default_driver_script")]
    pub driver_script: PathBuf,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_viewport_width() -> u32 {
    1366
}

fn default_viewport_height() -> u32 {
    768
}

fn default_webui_timeout_ms() -> u64 {
    6000
}

fn default_driver_script() -> PathBuf {
    PathBuf::from("extensions/playwright/server.js")
}

impl Default for WebUiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            browser_type: BrowserType::default(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            timeout_ms: default_webui_timeout_ms(),
            headless: false,
            trace_on_failure: false,
            driver_script: default_driver_script(),
        }
    }
}

impl WebUiConfig {
    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.viewport_width,
            height: self.viewport_height,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ConfigMapping for WebUiConfig {
    const PREFIX: &'static str = "qabase.webui";

    fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "qabase.webui.base-url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(ConfigError::Invalid {
                key: "qabase.webui.viewport-width/height".to_string(),
                message: format!(
                    "viewport must be non-zero, got {}x{}",
                    self.viewport_width, self.viewport_height
                ),
            });
        }
        Ok(())
    }
}

// ============================================================================
// REST
// ============================================================================

/// Settings for the `qabase.rest` prefix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct RestConfig {
    #[serde(default = "default_base_url", deserialize_with = "scalar_string")]
    pub base_url: String,

    /// Whole-request timeout in milliseconds
    #[serde(default = "default_rest_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Sent as `Authorization: Bearer <token>` when present
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub auth_token: Option<String>,
}

fn default_rest_timeout_ms() -> u64 {
    5000
}

fn default_connect_timeout_ms() -> u64 {
    3000
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_rest_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            auth_token: None,
        }
    }
}

impl ConfigMapping for RestConfig {
    const PREFIX: &'static str = "qabase.rest";

    fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "qabase.rest.base-url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Allure
// ============================================================================

/// Settings for the `qabase.allure` prefix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct AllureConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Compress the results directory when a web UI fixture closes
    #[serde(default)]
    pub archive_on_close: bool,
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("allure-results")
}

impl Default for AllureConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            results_dir: default_results_dir(),
            archive_on_close: false,
        }
    }
}

impl AllureConfig {
    /// Legacy process-wide toggle, `ALLURE=on`
    pub const LEGACY_TOGGLE: &'static str = "ALLURE";

    /// Reporting is on when the mapping says so or the legacy toggle is set.
    pub fn reporting_enabled(&self) -> bool {
        self.enabled || legacy_toggle_set(std::env::var(Self::LEGACY_TOGGLE).ok().as_deref())
    }
}

fn legacy_toggle_set(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("on") | Some("true")
    )
}

impl ConfigMapping for AllureConfig {
    const PREFIX: &'static str = "qabase.allure";
}
