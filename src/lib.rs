//! # qabase
//!
//! Base library for automated REST and web UI test suites, with Allure
//! reporting and post-run archiving of the results.
//!
//! ## Features
//!
//! - **Typed configuration** - `qabase.*` mappings layered from YAML, env and properties
//! - **REST testing** - reqwest client with fluent expectations
//! - **Web UI testing** - Playwright driven over a JSON-RPC bridge, with a fixture
//!   that owns the browser lifecycle and captures artifacts on failure
//! - **Allure reporting** - steps, attachments and environment data
//! - **Report archiving** - zip or tar.gz of `allure-results`
//!
//! ## Quick Start - REST
//!
//! ```rust,no_run
//! use qabase::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = RestClient::load()?;
//!     client
//!         .get("/todos/1")
//!         .await?
//!         .expect()
//!         .ok()?
//!         .field_eq("id", 1)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Quick Start - Web UI
//!
//! ```rust,no_run
//! use qabase::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut fixture = WebUiFixture::builder().suite("HomeTest").build();
//!     fixture.before_all().await?;
//!     fixture
//!         .run("opens home", |ui| async move {
//!             ui.home().await?.should_see("h1", "Welcome").await?;
//!             Ok(())
//!         })
//!         .await?;
//!     fixture.after_all().await?;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod logging;
pub mod report;
pub mod rest;
pub mod support;
pub mod webui;

// Re-export main types
pub use bridge::{BridgeError, PlaywrightBridge};
pub use config::{
    load_mapping, AllureConfig, BrowserType, ConfigError, ConfigMapping, ConfigProvider,
    RestConfig, Viewport, WebUiConfig,
};
pub use report::{AllureReporter, ArchiveFormat, ReportArchiver, ReportError, Status};
pub use rest::{RestClient, RestError, RestExpect, RestResponse, StatusFamily};
pub use support::{OsInfo, OsType};
pub use webui::{
    PageFactory, PageObject, Sel, Session, TestOutcome, Ui, UiError, VisiblePage, WebUiFixture,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        load_mapping, AllureConfig, ConfigMapping, ConfigProvider, RestConfig, WebUiConfig,
    };
    pub use crate::report::{AllureReporter, ReportArchiver, Status};
    pub use crate::rest::{RestClient, RestExpect, RestResponse, StatusFamily};
    pub use crate::webui::{
        PageFactory, PageObject, Sel, TestOutcome, Ui, UiError, VisiblePage, WebUiFixture,
    };
}
