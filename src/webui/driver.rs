//! Browser driver abstraction
//!
//! The lifecycle fixture and the DSL only talk to these traits. The
//! `Playwright*` types implement them on top of [`PlaywrightBridge`].

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

use crate::bridge::{BridgeError, PlaywrightBridge};
use crate::config::{BrowserType, Viewport, WebUiConfig};

pub use crate::bridge::DialogHandler;

/// Options for a new isolated browser context
#[derive(Debug, Clone, PartialEq)]
pub struct ContextOptions {
    pub base_url: Option<String>,
    pub viewport: Viewport,
}

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn launch(
        &self,
        browser_type: BrowserType,
        headless: bool,
    ) -> Result<Arc<dyn Browser>, BridgeError>;

    async fn close(&self) -> Result<(), BridgeError>;
}

#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_context(
        &self,
        options: ContextOptions,
    ) -> Result<Arc<dyn BrowserContext>, BridgeError>;

    async fn close(&self) -> Result<(), BridgeError>;
}

#[async_trait]
pub trait BrowserContext: Send + Sync {
    async fn new_page(&self) -> Result<Arc<dyn Page>, BridgeError>;

    /// Start recording screenshots, snapshots and sources
    async fn start_tracing(&self) -> Result<(), BridgeError>;

    /// Stop recording; the archive is written to `path` when given
    async fn stop_tracing(&self, path: Option<&Path>) -> Result<(), BridgeError>;

    /// Close the context and every page in it
    async fn close(&self) -> Result<(), BridgeError>;
}

#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), BridgeError>;
    async fn url(&self) -> Result<String, BridgeError>;
    async fn title(&self) -> Result<String, BridgeError>;

    /// Full HTML of the page
    async fn content(&self) -> Result<String, BridgeError>;

    /// PNG bytes
    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, BridgeError>;

    async fn click(&self, selector: &str) -> Result<(), BridgeError>;
    async fn fill(&self, selector: &str, value: &str) -> Result<(), BridgeError>;
    async fn text(&self, selector: &str) -> Result<Option<String>, BridgeError>;
    async fn is_visible(&self, selector: &str) -> Result<bool, BridgeError>;
    async fn is_enabled(&self, selector: &str) -> Result<bool, BridgeError>;
    async fn count(&self, selector: &str) -> Result<usize, BridgeError>;

    async fn set_default_timeout(&self, timeout_ms: u64) -> Result<(), BridgeError>;
    async fn set_default_navigation_timeout(&self, timeout_ms: u64) -> Result<(), BridgeError>;

    /// Accept every dialog the page opens and pass its message to `handler`
    async fn on_dialog(&self, handler: DialogHandler) -> Result<(), BridgeError>;
}

// ============================================================================
// Playwright implementation
// ============================================================================

#[derive(Debug)]
pub struct PlaywrightDriver {
    bridge: Arc<PlaywrightBridge>,
}

impl PlaywrightDriver {
    pub async fn start(config: &WebUiConfig) -> Result<Self, BridgeError> {
        Ok(Self {
            bridge: Arc::new(PlaywrightBridge::start(config).await?),
        })
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightDriver {
    async fn launch(
        &self,
        browser_type: BrowserType,
        headless: bool,
    ) -> Result<Arc<dyn Browser>, BridgeError> {
        let id = self.bridge.browser_launch(browser_type, headless).await?;
        Ok(Arc::new(PlaywrightBrowser {
            bridge: self.bridge.clone(),
            id,
        }))
    }

    async fn close(&self) -> Result<(), BridgeError> {
        self.bridge.shutdown().await
    }
}

struct PlaywrightBrowser {
    bridge: Arc<PlaywrightBridge>,
    id: String,
}

#[async_trait]
impl Browser for PlaywrightBrowser {
    async fn new_context(
        &self,
        options: ContextOptions,
    ) -> Result<Arc<dyn BrowserContext>, BridgeError> {
        let id = self
            .bridge
            .context_new(&self.id, options.base_url.as_deref(), options.viewport)
            .await?;
        Ok(Arc::new(PlaywrightContext {
            bridge: self.bridge.clone(),
            id,
            pages: Mutex::new(Vec::new()),
        }))
    }

    async fn close(&self) -> Result<(), BridgeError> {
        self.bridge.browser_close(&self.id).await
    }
}

struct PlaywrightContext {
    bridge: Arc<PlaywrightBridge>,
    id: String,
    pages: Mutex<Vec<String>>,
}

#[async_trait]
impl BrowserContext for PlaywrightContext {
    async fn new_page(&self) -> Result<Arc<dyn Page>, BridgeError> {
        let id = self.bridge.page_new(&self.id).await?;
        self.pages.lock().push(id.clone());
        Ok(Arc::new(PlaywrightPage {
            bridge: self.bridge.clone(),
            id,
        }))
    }

    async fn start_tracing(&self) -> Result<(), BridgeError> {
        self.bridge.tracing_start(&self.id).await
    }

    async fn stop_tracing(&self, path: Option<&Path>) -> Result<(), BridgeError> {
        self.bridge.tracing_stop(&self.id, path).await
    }

    async fn close(&self) -> Result<(), BridgeError> {
        let pages: Vec<String> = self.pages.lock().drain(..).collect();
        for page in &pages {
            self.bridge.forget_page(page);
        }
        self.bridge.context_close(&self.id).await
    }
}

struct PlaywrightPage {
    bridge: Arc<PlaywrightBridge>,
    id: String,
}

#[async_trait]
impl Page for PlaywrightPage {
    async fn goto(&self, url: &str) -> Result<(), BridgeError> {
        self.bridge.page_goto(&self.id, url).await
    }

    async fn url(&self) -> Result<String, BridgeError> {
        self.bridge.page_url(&self.id).await
    }

    async fn title(&self) -> Result<String, BridgeError> {
        self.bridge.page_title(&self.id).await
    }

    async fn content(&self) -> Result<String, BridgeError> {
        self.bridge.page_content(&self.id).await
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, BridgeError> {
        self.bridge.page_screenshot(&self.id, full_page).await
    }

    async fn click(&self, selector: &str) -> Result<(), BridgeError> {
        self.bridge.element_click(&self.id, selector).await
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), BridgeError> {
        self.bridge.element_fill(&self.id, selector, value).await
    }

    async fn text(&self, selector: &str) -> Result<Option<String>, BridgeError> {
        self.bridge.element_text(&self.id, selector).await
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, BridgeError> {
        self.bridge.element_is_visible(&self.id, selector).await
    }

    async fn is_enabled(&self, selector: &str) -> Result<bool, BridgeError> {
        self.bridge.element_is_enabled(&self.id, selector).await
    }

    async fn count(&self, selector: &str) -> Result<usize, BridgeError> {
        self.bridge.element_count(&self.id, selector).await
    }

    async fn set_default_timeout(&self, timeout_ms: u64) -> Result<(), BridgeError> {
        self.bridge.page_set_default_timeout(&self.id, timeout_ms).await
    }

    async fn set_default_navigation_timeout(&self, timeout_ms: u64) -> Result<(), BridgeError> {
        self.bridge
            .page_set_default_navigation_timeout(&self.id, timeout_ms)
            .await
    }

    async fn on_dialog(&self, handler: DialogHandler) -> Result<(), BridgeError> {
        self.bridge.page_on_dialog(&self.id, handler).await
    }
}
