//! Web UI testing
//!
//! This module contains:
//! - `driver` - Browser driver traits and the Playwright implementation
//! - `session` - Handles and captured dialogs for the running test
//! - `lifecycle` - The fixture binding browser lifecycle to test execution
//! - `dsl` - Fluent verbs over the session's page
//! - `sel` - Selector helpers
//! - `page` - Page objects and their factory

pub mod driver;
mod error;
pub mod dsl;
pub mod lifecycle;
pub mod page;
pub mod sel;
pub mod session;

pub use driver::{
    Browser, BrowserContext, BrowserDriver, ContextOptions, DialogHandler, Page, PlaywrightDriver,
};
pub use dsl::Ui;
pub use error::UiError;
pub use lifecycle::{LifecycleState, TestOutcome, WebUiFixture, WebUiFixtureBuilder};
pub use page::{PageFactory, PageObject, VisiblePage};
pub use sel::Sel;
pub use session::{Session, SessionError};
