//! Handles for the running test
//!
//! A `Session` is shared between the lifecycle fixture, which fills and clears
//! it, and the DSL, which reads from it. Slots are guarded by short-lived
//! locks; handles are cloned out before any `.await`.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::driver::{Browser, BrowserContext, BrowserDriver, DialogHandler, Page};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{0} is not initialized")]
    NotInitialized(&'static str),
}

#[derive(Default)]
pub struct Session {
    driver: Mutex<Option<Arc<dyn BrowserDriver>>>,
    browser: Mutex<Option<Arc<dyn Browser>>>,
    context: Mutex<Option<Arc<dyn BrowserContext>>>,
    page: Mutex<Option<Arc<dyn Page>>>,
    dialogs: Arc<Mutex<Vec<String>>>,
    failure_captured: AtomicBool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("driver", &self.driver.lock().is_some())
            .field("browser", &self.browser.lock().is_some())
            .field("context", &self.context.lock().is_some())
            .field("page", &self.page.lock().is_some())
            .field("dialogs", &self.dialogs.lock().len())
            .finish()
    }
}

fn require<T: ?Sized>(slot: &Mutex<Option<Arc<T>>>, name: &'static str) -> Result<Arc<T>, SessionError> {
    slot.lock().clone().ok_or(SessionError::NotInitialized(name))
}

impl Session {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_driver(&self, driver: Arc<dyn BrowserDriver>) {
        *self.driver.lock() = Some(driver);
    }

    pub fn set_browser(&self, browser: Arc<dyn Browser>) {
        *self.browser.lock() = Some(browser);
    }

    pub fn set_context(&self, context: Arc<dyn BrowserContext>) {
        *self.context.lock() = Some(context);
    }

    pub fn set_page(&self, page: Arc<dyn Page>) {
        *self.page.lock() = Some(page);
    }

    pub fn driver(&self) -> Result<Arc<dyn BrowserDriver>, SessionError> {
        require(&self.driver, "Browser driver")
    }

    pub fn browser(&self) -> Result<Arc<dyn Browser>, SessionError> {
        require(&self.browser, "Browser")
    }

    pub fn context(&self) -> Result<Arc<dyn BrowserContext>, SessionError> {
        require(&self.context, "Browser context")
    }

    pub fn page(&self) -> Result<Arc<dyn Page>, SessionError> {
        require(&self.page, "Page")
    }

    pub fn push_dialog_message(&self, message: impl Into<String>) {
        self.dialogs.lock().push(message.into());
    }

    pub fn last_dialog_message(&self) -> Option<String> {
        self.dialogs.lock().last().cloned()
    }

    /// Remove and return the first message containing `expected`, ignoring case.
    pub fn consume_first_matching_dialog_message(&self, expected: &str) -> Option<String> {
        let needle = expected.to_lowercase();
        let mut dialogs = self.dialogs.lock();
        let index = dialogs
            .iter()
            .position(|message| message.to_lowercase().contains(&needle))?;
        Some(dialogs.remove(index))
    }

    pub fn dialog_messages_snapshot(&self) -> Vec<String> {
        self.dialogs.lock().clone()
    }

    /// Dialog handler appending each message to this session
    pub fn dialog_recorder(&self) -> DialogHandler {
        let dialogs = self.dialogs.clone();
        Arc::new(move |message: &str| dialogs.lock().push(message.to_string()))
    }

    /// Record that screenshot and page source were attached for this test
    pub fn mark_failure_captured(&self) {
        self.failure_captured.store(true, Ordering::SeqCst);
    }

    pub fn failure_captured(&self) -> bool {
        self.failure_captured.load(Ordering::SeqCst)
    }

    /// Drop page, context and dialogs; the browser stays.
    pub fn clear_per_test(&self) {
        self.failure_captured.store(false, Ordering::SeqCst);
        self.dialogs.lock().clear();
        self.page.lock().take();
        self.context.lock().take();
    }

    pub fn clear_all(&self) {
        self.clear_per_test();
        self.browser.lock().take();
        self.driver.lock().take();
    }
}
