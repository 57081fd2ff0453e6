//! Browser lifecycle bound to test execution
//!
//! `NotStarted -> BrowserReady -> (PageReady -> BrowserReady)* -> Closed`
//!
//! - `before_all` loads configuration, starts the driver and launches one browser
//! - `before_each` opens an isolated context and page for one test
//! - `after_each` captures failure artifacts and always closes the context
//! - `after_all` closes browser and driver
//!
//! [`WebUiFixture::run`] wraps one test body in `before_each`/`after_each`,
//! including when the body returns an error or panics.

use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::driver::{BrowserDriver, ContextOptions, PlaywrightDriver};
use super::dsl::Ui;
use super::page::PageFactory;
use super::session::Session;
use super::UiError;
use crate::config::{load_mapping, AllureConfig, WebUiConfig};
use crate::report::allure::{panic_message, MEDIA_TYPE_HTML, MEDIA_TYPE_PNG, MEDIA_TYPE_ZIP};
use crate::report::{AllureReporter, ReportArchiver, Status};
use crate::support::os::OsInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NotStarted,
    BrowserReady,
    PageReady,
    Closed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::NotStarted => "not started",
            LifecycleState::BrowserReady => "browser ready",
            LifecycleState::PageReady => "page ready",
            LifecycleState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// How a test body finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed(String),
    Panicked(String),
}

impl TestOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, TestOutcome::Passed)
    }

    fn status(&self) -> (Status, Option<String>) {
        match self {
            TestOutcome::Passed => (Status::Passed, None),
            TestOutcome::Failed(message) => (Status::Failed, Some(message.clone())),
            TestOutcome::Panicked(message) => (Status::Broken, Some(message.clone())),
        }
    }
}

#[derive(Default)]
pub struct WebUiFixtureBuilder {
    config: Option<WebUiConfig>,
    allure: Option<AllureConfig>,
    driver: Option<Arc<dyn BrowserDriver>>,
    reporter: Option<AllureReporter>,
    archiver: Option<ReportArchiver>,
    suite: Option<String>,
}

impl WebUiFixtureBuilder {
    /// Use this configuration instead of loading `qabase.webui`
    pub fn config(mut self, config: WebUiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use this configuration instead of loading `qabase.allure`
    pub fn allure(mut self, allure: AllureConfig) -> Self {
        self.allure = Some(allure);
        self
    }

    /// Drive this browser instead of starting the Playwright driver
    pub fn driver(mut self, driver: Arc<dyn BrowserDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn reporter(mut self, reporter: AllureReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Archiver used by `after_all` when `archive-on-close` is set
    pub fn archiver(mut self, archiver: ReportArchiver) -> Self {
        self.archiver = Some(archiver);
        self
    }

    /// Prefix for the Allure full name of each test
    pub fn suite(mut self, suite: impl Into<String>) -> Self {
        self.suite = Some(suite.into());
        self
    }

    pub fn build(self) -> WebUiFixture {
        let reporter_supplied = self.reporter.is_some();
        WebUiFixture {
            state: LifecycleState::NotStarted,
            session: Session::new(),
            config: self.config,
            allure: self.allure,
            driver: self.driver,
            reporter: self.reporter.unwrap_or_else(AllureReporter::disabled),
            reporter_supplied,
            archiver: self.archiver,
            suite: self.suite.unwrap_or_else(|| "webui".to_string()),
            trace_path: None,
        }
    }
}

pub struct WebUiFixture {
    state: LifecycleState,
    session: Arc<Session>,
    config: Option<WebUiConfig>,
    allure: Option<AllureConfig>,
    driver: Option<Arc<dyn BrowserDriver>>,
    reporter: AllureReporter,
    reporter_supplied: bool,
    archiver: Option<ReportArchiver>,
    suite: String,
    trace_path: Option<PathBuf>,
}

impl fmt::Debug for WebUiFixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebUiFixture")
            .field("state", &self.state)
            .field("suite", &self.suite)
            .field("session", &self.session)
            .finish()
    }
}

impl WebUiFixture {
    pub fn builder() -> WebUiFixtureBuilder {
        WebUiFixtureBuilder::default()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn reporter(&self) -> &AllureReporter {
        &self.reporter
    }

    /// Supplied or resolved configuration; `None` until `before_all` loads it
    pub fn config(&self) -> Option<&WebUiConfig> {
        self.config.as_ref()
    }

    fn expect_state(
        &self,
        expected: LifecycleState,
        action: &'static str,
    ) -> Result<(), UiError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(UiError::InvalidState {
                action,
                state: self.state.to_string(),
            })
        }
    }

    fn webui_config(&self) -> Result<&WebUiConfig, UiError> {
        self.config.as_ref().ok_or(UiError::InvalidState {
            action: "read configuration",
            state: self.state.to_string(),
        })
    }

    pub async fn before_all(&mut self) -> Result<(), UiError> {
        self.expect_state(LifecycleState::NotStarted, "run before_all")?;

        let config = match &self.config {
            Some(config) => config.clone(),
            None => load_mapping::<WebUiConfig>()?,
        };
        let allure = match &self.allure {
            Some(allure) => allure.clone(),
            None => load_mapping::<AllureConfig>()?,
        };
        if !self.reporter_supplied {
            self.reporter = AllureReporter::from_config(&allure);
        }

        let driver: Arc<dyn BrowserDriver> = match &self.driver {
            Some(driver) => driver.clone(),
            None => Arc::new(PlaywrightDriver::start(&config).await?),
        };
        self.session.set_driver(driver.clone());

        let browser = match driver.launch(config.browser_type, config.headless).await {
            Ok(browser) => browser,
            Err(e) => {
                if let Err(close_err) = driver.close().await {
                    warn!("Failed to close browser driver: {}", close_err);
                }
                self.session.clear_all();
                return Err(e.into());
            }
        };
        self.session.set_browser(browser);
        info!(
            "Launched {} (headless={}) for {}",
            config.browser_type.as_str(),
            config.headless,
            config.base_url
        );

        self.write_environment(&config);
        self.allure = Some(allure);
        self.config = Some(config);
        self.driver = Some(driver);
        self.state = LifecycleState::BrowserReady;
        Ok(())
    }

    fn write_environment(&self, config: &WebUiConfig) {
        let os = OsInfo::detect();
        let mut entries = os.environment_entries();
        entries.push(("webui.base-url".to_string(), config.base_url.clone()));
        entries.push((
            "webui.browser-type".to_string(),
            config.browser_type.as_str().to_string(),
        ));
        entries.push(("webui.headless".to_string(), config.headless.to_string()));
        self.reporter.write_environment(entries);
    }

    /// Open a fresh context and page for `test_name`.
    pub async fn before_each(&mut self, test_name: &str) -> Result<(), UiError> {
        self.expect_state(LifecycleState::BrowserReady, "run before_each")?;
        let config = self.webui_config()?.clone();

        let context = self
            .session
            .browser()?
            .new_context(ContextOptions {
                base_url: Some(config.base_url.clone()),
                viewport: config.viewport(),
            })
            .await?;
        self.session.set_context(context.clone());
        self.state = LifecycleState::PageReady;

        if let Err(e) = self.open_page(&config, context.as_ref()).await {
            self.release_context(false).await;
            self.session.clear_per_test();
            self.state = LifecycleState::BrowserReady;
            return Err(e);
        }

        self.reporter
            .start_test(test_name, &format!("{}.{}", self.suite, test_name));
        debug!("Page ready for {}", test_name);
        Ok(())
    }

    async fn open_page(
        &mut self,
        config: &WebUiConfig,
        context: &dyn super::driver::BrowserContext,
    ) -> Result<(), UiError> {
        if config.trace_on_failure {
            context.start_tracing().await?;
            self.trace_path = Some(
                std::env::temp_dir().join(format!("playwright-trace-{}.zip", uuid::Uuid::new_v4())),
            );
        }

        let page = context.new_page().await?;
        page.set_default_timeout(config.timeout_ms).await?;
        page.set_default_navigation_timeout(config.timeout_ms).await?;
        page.on_dialog(self.session.dialog_recorder()).await?;
        self.session.set_page(page);
        Ok(())
    }

    /// Finish the current test. Capture and cleanup failures are logged, never
    /// returned.
    pub async fn after_each(&mut self, outcome: &TestOutcome) -> Result<(), UiError> {
        self.expect_state(LifecycleState::PageReady, "run after_each")?;
        let failed = outcome.is_failure();

        if failed && !self.session.failure_captured() {
            self.attach_failure_artifacts().await;
        }
        self.release_context(failed).await;
        self.session.clear_per_test();

        let (status, message) = outcome.status();
        self.reporter.stop_test(status, message);
        self.state = LifecycleState::BrowserReady;
        Ok(())
    }

    async fn attach_failure_artifacts(&self) {
        let Ok(page) = self.session.page() else {
            return;
        };
        match page.screenshot(true).await {
            Ok(png) => self
                .reporter
                .attach_bytes("Screenshot", MEDIA_TYPE_PNG, &png, "png"),
            Err(e) => warn!("Failed to capture screenshot: {}", e),
        }
        match page.content().await {
            Ok(html) => self
                .reporter
                .attach_bytes("Page Source", MEDIA_TYPE_HTML, html.as_bytes(), "html"),
            Err(e) => warn!("Failed to capture page source: {}", e),
        }
    }

    /// Stop tracing (keeping the trace when `failed`) and close the context.
    async fn release_context(&mut self, failed: bool) {
        let Ok(context) = self.session.context() else {
            return;
        };

        if let Some(trace_path) = self.trace_path.take() {
            let keep = failed.then_some(trace_path.as_path());
            match context.stop_tracing(keep).await {
                Ok(()) if failed => self.attach_trace(&trace_path),
                Ok(()) => {}
                Err(e) => warn!("Failed to stop tracing: {}", e),
            }
        }

        if let Err(e) = context.close().await {
            warn!("Failed to close browser context: {}", e);
        }
    }

    fn attach_trace(&self, trace_path: &std::path::Path) {
        match std::fs::read(trace_path) {
            Ok(bytes) => self
                .reporter
                .attach_bytes("Playwright Trace", MEDIA_TYPE_ZIP, &bytes, "zip"),
            Err(e) => warn!("Failed to read trace {}: {}", trace_path.display(), e),
        }
        let _ = std::fs::remove_file(trace_path);
    }

    pub async fn after_all(&mut self) -> Result<(), UiError> {
        self.expect_state(LifecycleState::BrowserReady, "run after_all")?;

        if let Ok(browser) = self.session.browser() {
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser: {}", e);
            }
        }
        if let Ok(driver) = self.session.driver() {
            if let Err(e) = driver.close().await {
                warn!("Failed to close browser driver: {}", e);
            }
        }
        self.session.clear_all();

        if let Some(allure) = self.allure.as_ref().filter(|a| a.archive_on_close) {
            let archiver = self.archiver.clone().unwrap_or_else(|| {
                ReportArchiver::for_current_dir().with_results_dir(&allure.results_dir)
            });
            archiver.archive();
        }
        self.state = LifecycleState::Closed;
        info!("Web UI fixture closed");
        Ok(())
    }

    /// DSL handle for the current test
    pub fn ui(&self) -> Result<Ui, UiError> {
        let config = self.webui_config()?;
        Ok(Ui::new(
            self.session.clone(),
            self.reporter.clone(),
            config.base_url.clone(),
            config.timeout(),
        ))
    }

    pub fn pages(&self) -> Result<PageFactory, UiError> {
        Ok(PageFactory::new(self.ui()?))
    }

    /// Run one test body between `before_each` and `after_each`.
    ///
    /// The body's error is returned unchanged; a panic is resumed after the
    /// context has been closed.
    pub async fn run<F, Fut>(&mut self, name: &str, test: F) -> anyhow::Result<()>
    where
        F: FnOnce(Ui) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        self.before_each(name).await?;
        let ui = self.ui()?;

        let result = AssertUnwindSafe(test(ui)).catch_unwind().await;
        let outcome = match &result {
            Ok(Ok(())) => TestOutcome::Passed,
            Ok(Err(e)) => TestOutcome::Failed(format!("{:#}", e)),
            Err(panic) => TestOutcome::Panicked(panic_message(&**panic)),
        };
        self.after_each(&outcome).await?;

        match result {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}
