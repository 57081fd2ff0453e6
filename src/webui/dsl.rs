//! Fluent UI DSL
//!
//! ```ignore
//! ui.visit("/").await?
//!     .tap("a#signin2").await?
//!     .fill("#sign-username", "alice").await?
//!     .see("#signInModalLabel", "Sign up").await?;
//! ```
//!
//! Every verb runs as an Allure step. When a step fails and reporting is
//! active, a screenshot and the page source are attached before the error
//! is returned.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::driver::Page;
use super::session::Session;
use super::UiError;
use crate::report::allure::{MEDIA_TYPE_HTML, MEDIA_TYPE_PNG};
use crate::report::AllureReporter;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone, Debug)]
pub struct Ui {
    session: Arc<Session>,
    reporter: AllureReporter,
    base_url: String,
    timeout: Duration,
}

impl Ui {
    pub fn new(
        session: Arc<Session>,
        reporter: AllureReporter,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            session,
            reporter,
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn reporter(&self) -> &AllureReporter {
        &self.reporter
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Copy of this handle whose assertions wait up to `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    pub fn page(&self) -> Result<Arc<dyn Page>, UiError> {
        Ok(self.session.page()?)
    }

    /// Absolute URLs pass through; anything else is joined onto the base URL.
    pub fn resolve_url(&self, url: &str) -> String {
        if url.contains("://") {
            return url.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }

    // ---------- navigation ----------

    pub async fn visit(&self, url: &str) -> Result<&Self, UiError> {
        let target = self.resolve_url(url);
        self.step(format!("Visit {}", target), async {
            self.page()?.goto(&target).await?;
            Ok(())
        })
        .await?;
        Ok(self)
    }

    pub async fn home(&self) -> Result<&Self, UiError> {
        self.visit("/").await
    }

    pub async fn title(&self) -> Result<String, UiError> {
        Ok(self.page()?.title().await?)
    }

    pub async fn current_url(&self) -> Result<String, UiError> {
        Ok(self.page()?.url().await?)
    }

    // ---------- actions ----------

    pub async fn click_css(&self, css: &str) -> Result<&Self, UiError> {
        self.step(format!("Click CSS {}", css), async {
            let page = self.page()?;
            let enabled = self
                .eventually(self.timeout, || {
                    let page = page.clone();
                    async move { page.is_enabled(css).await.map_err(UiError::from) }
                })
                .await?;
            if !enabled {
                return Err(UiError::Assertion(format!(
                    "Element {} was not enabled within {}ms",
                    css,
                    self.timeout.as_millis()
                )));
            }
            page.click(css).await?;
            Ok(())
        })
        .await?;
        Ok(self)
    }

    pub async fn type_into(&self, css: &str, value: &str) -> Result<&Self, UiError> {
        self.step(format!("Type '{}' into CSS {}", value, css), async {
            let page = self.page()?;
            self.require_visible(&page, css, self.timeout).await?;
            page.fill(css, value).await?;
            Ok(())
        })
        .await?;
        Ok(self)
    }

    /// Text content of the first element matching `css`, empty when it has none
    pub async fn text_of(&self, css: &str) -> Result<String, UiError> {
        Ok(self.page()?.text(css).await?.unwrap_or_default())
    }

    // ---------- expectations ----------

    pub async fn should_see(&self, css: &str, expected: &str) -> Result<&Self, UiError> {
        self.should_see_within(css, expected, self.timeout).await
    }

    pub async fn should_see_within(
        &self,
        css: &str,
        expected: &str,
        timeout: Duration,
    ) -> Result<&Self, UiError> {
        let name = format!(
            "Expect CSS {} contains '{}' (timeoutMs={})",
            css,
            expected,
            timeout.as_millis()
        );
        self.step(name, async {
            let page = self.page()?;
            let found = self
                .eventually(timeout, || {
                    let page = page.clone();
                    async move {
                        let text = page.text(css).await?.unwrap_or_default();
                        Ok::<_, UiError>(text.contains(expected))
                    }
                })
                .await?;
            if found {
                return Ok(());
            }
            let actual = page.text(css).await.ok().flatten().unwrap_or_default();
            Err(UiError::Assertion(format!(
                "Expected {} to contain '{}' but was '{}'",
                css, expected, actual
            )))
        })
        .await?;
        Ok(self)
    }

    pub async fn should_be_visible(&self, css: &str) -> Result<&Self, UiError> {
        self.should_be_visible_within(css, self.timeout).await
    }

    pub async fn should_be_visible_within(
        &self,
        css: &str,
        timeout: Duration,
    ) -> Result<&Self, UiError> {
        let name = format!("Expect CSS {} is visible (timeoutMs={})", css, timeout.as_millis());
        self.step(name, async {
            let page = self.page()?;
            self.require_visible(&page, css, timeout).await
        })
        .await?;
        Ok(self)
    }

    pub async fn should_have_count(&self, css: &str, count: usize) -> Result<&Self, UiError> {
        self.step(format!("Expect CSS {} count = {}", css, count), async {
            let page = self.page()?;
            let matched = self
                .eventually(self.timeout, || {
                    let page = page.clone();
                    async move { Ok::<_, UiError>(page.count(css).await? == count) }
                })
                .await?;
            if matched {
                return Ok(());
            }
            let actual = page.count(css).await?;
            Err(UiError::Assertion(format!(
                "Expected {} elements matching {} but found {}",
                count, css, actual
            )))
        })
        .await?;
        Ok(self)
    }

    /// Wait for a dialog whose message contains `expected` (ignoring case)
    /// and consume it. Dialogs are accepted as soon as they open.
    pub async fn expect_alert_contains(&self, expected: &str) -> Result<&Self, UiError> {
        self.step(format!("Expect alert contains '{}' and accept", expected), async {
            let session = &self.session;
            let consumed = self
                .eventually(self.timeout, || async move {
                    Ok::<_, UiError>(session.consume_first_matching_dialog_message(expected).is_some())
                })
                .await?;
            if consumed {
                return Ok(());
            }
            Err(UiError::Assertion(format!(
                "Alert text <{}> did not contain <{}>",
                self.session.last_dialog_message().unwrap_or_default(),
                expected
            )))
        })
        .await?;
        Ok(self)
    }

    // ---------- aliases ----------

    /// Alias for [`Ui::visit`]
    pub async fn go(&self, url: &str) -> Result<&Self, UiError> {
        self.visit(url).await
    }

    /// Alias for [`Ui::click_css`]
    pub async fn tap(&self, css: &str) -> Result<&Self, UiError> {
        self.click_css(css).await
    }

    /// Alias for [`Ui::type_into`]
    pub async fn fill(&self, css: &str, value: &str) -> Result<&Self, UiError> {
        self.type_into(css, value).await
    }

    /// Alias for [`Ui::should_see`]
    pub async fn see(&self, css: &str, expected: &str) -> Result<&Self, UiError> {
        self.should_see(css, expected).await
    }

    /// Alias for [`Ui::should_be_visible`]
    pub async fn see_visible(&self, css: &str) -> Result<&Self, UiError> {
        self.should_be_visible(css).await
    }

    /// Alias for [`Ui::should_have_count`]
    pub async fn count(&self, css: &str, n: usize) -> Result<&Self, UiError> {
        self.should_have_count(css, n).await
    }

    // ---------- internals ----------

    async fn require_visible(
        &self,
        page: &Arc<dyn Page>,
        css: &str,
        timeout: Duration,
    ) -> Result<(), UiError> {
        let visible = self
            .eventually(timeout, || {
                let page = page.clone();
                async move { page.is_visible(css).await.map_err(UiError::from) }
            })
            .await?;
        if visible {
            Ok(())
        } else {
            Err(UiError::Assertion(format!(
                "Element {} was not visible within {}ms",
                css,
                timeout.as_millis()
            )))
        }
    }

    /// Re-run `check` until it holds or `timeout` elapses; errors abort early.
    async fn eventually<F, Fut>(&self, timeout: Duration, mut check: F) -> Result<bool, UiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, UiError>>,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if check().await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn step<T, Fut>(&self, name: String, action: Fut) -> Result<T, UiError>
    where
        Fut: Future<Output = Result<T, UiError>>,
    {
        debug!("UI step: {}", name);
        let result = self.reporter.step_async(&name, action).await;
        if result.is_err() {
            self.attach_failure_artifacts().await;
        }
        result
    }

    async fn attach_failure_artifacts(&self) {
        if !self.reporter.is_recording() {
            return;
        }
        let Ok(page) = self.session.page() else {
            return;
        };
        self.session.mark_failure_captured();

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
}
