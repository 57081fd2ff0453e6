//! Playwright Bridge - Communication with Playwright via JSON-RPC

use base64::Engine;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::rpc::{send_request, spawn_communication_task, RequestSender, RpcNotification};
use super::BridgeError;
use crate::config::{BrowserType, Viewport, WebUiConfig};

/// Callback receiving the message of each dialog the page shows
pub type DialogHandler = Arc<dyn Fn(&str) + Send + Sync>;

type DialogHandlers = Arc<Mutex<HashMap<String, DialogHandler>>>;

pub struct PlaywrightBridge {
    request_tx: RequestSender,
    dialog_handlers: DialogHandlers,
    child: tokio::sync::Mutex<Option<Child>>,
}

impl std::fmt::Debug for PlaywrightBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaywrightBridge")
            .field("dialog_handlers", &self.dialog_handlers.lock().len())
            .finish()
    }
}

impl PlaywrightBridge {
    /// Spawn `node <driver-script>` and connect to it.
    pub async fn start(config: &WebUiConfig) -> Result<Self, BridgeError> {
        let node = which::which("node")
            .map_err(|e| BridgeError::StartupFailed(format!("node not found: {}", e)))?;
        if !config.driver_script.exists() {
            return Err(BridgeError::StartupFailed(format!(
                "driver script not found: {}",
                config.driver_script.display()
            )));
        }

        let mut child = Command::new(node)
            .arg(&config.driver_script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BridgeError::StartupFailed(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::StartupFailed("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::StartupFailed("driver stdout unavailable".to_string()))?;

        let (request_tx, request_rx) = mpsc::channel(100);
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        spawn_communication_task(request_rx, stdin, stdout, notify_tx);

        let dialog_handlers: DialogHandlers = Arc::default();
        spawn_notification_task(notify_rx, dialog_handlers.clone());

        info!("Playwright driver started ({})", config.driver_script.display());
        Ok(Self {
            request_tx,
            dialog_handlers,
            child: tokio::sync::Mutex::new(Some(child)),
        })
    }

    /// Raw JSON-RPC call
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, BridgeError> {
        send_request(&self.request_tx, method, params).await
    }

    async fn call_for_str(
        &self,
        method: &str,
        params: Value,
        field: &str,
    ) -> Result<String, BridgeError> {
        let result = self.call(method, params).await?;
        result[field]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| BridgeError::UnexpectedResponse {
                method: method.to_string(),
                field: field.to_string(),
            })
    }

    /// Stop the driver process
    pub async fn shutdown(&self) -> Result<(), BridgeError> {
        self.dialog_handlers.lock().clear();
        if let Some(mut child) = self.child.lock().await.take() {
            child.kill().await?;
            debug!("Playwright driver stopped");
        }
        Ok(())
    }

    // Browser Actions
    pub async fn browser_launch(
        &self,
        browser_type: BrowserType,
        headless: bool,
    ) -> Result<String, BridgeError> {
        self.call_for_str(
            "browser.launch",
            json!({ "browserType": browser_type.as_str(), "headless": headless }),
            "browserId",
        )
        .await
    }

    pub async fn browser_close(&self, browser_id: &str) -> Result<(), BridgeError> {
        self.call("browser.close", json!({ "browserId": browser_id }))
            .await?;
        Ok(())
    }

    // Context Actions
    pub async fn context_new(
        &self,
        browser_id: &str,
        base_url: Option<&str>,
        viewport: Viewport,
    ) -> Result<String, BridgeError> {
        self.call_for_str(
            "context.new",
            json!({
                "browserId": browser_id,
                "baseURL": base_url,
                "viewport": { "width": viewport.width, "height": viewport.height },
            }),
            "contextId",
        )
        .await
    }

    pub async fn context_close(&self, context_id: &str) -> Result<(), BridgeError> {
        self.call("context.close", json!({ "contextId": context_id }))
            .await?;
        Ok(())
    }

    pub async fn tracing_start(&self, context_id: &str) -> Result<(), BridgeError> {
        self.call(
            "context.tracing.start",
            json!({ "contextId": context_id, "screenshots": true, "snapshots": true, "sources": true }),
        )
        .await?;
        Ok(())
    }

    /// Stop tracing, saving the archive to `path` when given.
    pub async fn tracing_stop(
        &self,
        context_id: &str,
        path: Option<&Path>,
    ) -> Result<(), BridgeError> {
        self.call(
            "context.tracing.stop",
            json!({ "contextId": context_id, "path": path.map(|p| p.to_string_lossy()) }),
        )
        .await?;
        Ok(())
    }

    // Page Actions
    pub async fn page_new(&self, context_id: &str) -> Result<String, BridgeError> {
        self.call_for_str("page.new", json!({ "contextId": context_id }), "pageId")
            .await
    }

    pub async fn page_set_default_timeout(
        &self,
        page_id: &str,
        timeout_ms: u64,
    ) -> Result<(), BridgeError> {
        self.call(
            "page.setDefaultTimeout",
            json!({ "pageId": page_id, "timeout": timeout_ms }),
        )
        .await?;
        Ok(())
    }

    pub async fn page_set_default_navigation_timeout(
        &self,
        page_id: &str,
        timeout_ms: u64,
    ) -> Result<(), BridgeError> {
        self.call(
            "page.setDefaultNavigationTimeout",
            json!({ "pageId": page_id, "timeout": timeout_ms }),
        )
        .await?;
        Ok(())
    }

    /// Auto-accept dialogs on the page and report each message to `handler`.
    pub async fn page_on_dialog(
        &self,
        page_id: &str,
        handler: DialogHandler,
    ) -> Result<(), BridgeError> {
        self.dialog_handlers
            .lock()
            .insert(page_id.to_string(), handler);
        self.call("page.onDialog", json!({ "pageId": page_id, "action": "accept" }))
            .await?;
        Ok(())
    }

    pub fn forget_page(&self, page_id: &str) {
        self.dialog_handlers.lock().remove(page_id);
    }

    pub async fn page_goto(&self, page_id: &str, url: &str) -> Result<(), BridgeError> {
        self.call("page.goto", json!({ "pageId": page_id, "url": url }))
            .await?;
        Ok(())
    }

    pub async fn page_url(&self, page_id: &str) -> Result<String, BridgeError> {
        self.call_for_str("page.url", json!({ "pageId": page_id }), "url")
            .await
    }

    pub async fn page_title(&self, page_id: &str) -> Result<String, BridgeError> {
        self.call_for_str("page.title", json!({ "pageId": page_id }), "title")
            .await
    }

    pub async fn page_content(&self, page_id: &str) -> Result<String, BridgeError> {
        self.call_for_str("page.content", json!({ "pageId": page_id }), "html")
            .await
    }

    /// PNG bytes of the page
    pub async fn page_screenshot(
        &self,
        page_id: &str,
        full_page: bool,
    ) -> Result<Vec<u8>, BridgeError> {
        let data = self
            .call_for_str(
                "page.screenshot",
                json!({ "pageId": page_id, "fullPage": full_page }),
                "data",
            )
            .await?;
        Ok(base64::engine::general_purpose::STANDARD.decode(data)?)
    }

    // Element Actions
    pub async fn element_click(&self, page_id: &str, selector: &str) -> Result<(), BridgeError> {
        self.call(
            "element.click",
            json!({ "pageId": page_id, "selector": selector }),
        )
        .await?;
        Ok(())
    }

    pub async fn element_fill(
        &self,
        page_id: &str,
        selector: &str,
        value: &str,
    ) -> Result<(), BridgeError> {
        self.call(
            "element.fill",
            json!({ "pageId": page_id, "selector": selector, "value": value }),
        )
        .await?;
        Ok(())
    }

    /// Text content of the first match; `None` when the element has none
    pub async fn element_text(
        &self,
        page_id: &str,
        selector: &str,
    ) -> Result<Option<String>, BridgeError> {
        let result = self
            .call(
                "element.textContent",
                json!({ "pageId": page_id, "selector": selector }),
            )
            .await?;
        Ok(result["text"].as_str().map(|s| s.to_string()))
    }

    pub async fn element_is_visible(
        &self,
        page_id: &str,
        selector: &str,
    ) -> Result<bool, BridgeError> {
        let result = self
            .call(
                "element.isVisible",
                json!({ "pageId": page_id, "selector": selector }),
            )
            .await?;
        Ok(result["visible"].as_bool().unwrap_or(false))
    }

    pub async fn element_is_enabled(
        &self,
        page_id: &str,
        selector: &str,
    ) -> Result<bool, BridgeError> {
        let result = self
            .call(
                "element.isEnabled",
                json!({ "pageId": page_id, "selector": selector }),
            )
            .await?;
        Ok(result["enabled"].as_bool().unwrap_or(false))
    }

    pub async fn element_count(&self, page_id: &str, selector: &str) -> Result<usize, BridgeError> {
        let result = self
            .call(
                "element.count",
                json!({ "pageId": page_id, "selector": selector }),
            )
            .await?;
        Ok(result["count"].as_u64().unwrap_or(0) as usize)
    }
}

fn spawn_notification_task(
    mut notify_rx: mpsc::UnboundedReceiver<RpcNotification>,
    handlers: DialogHandlers,
) {
    tokio::spawn(async move {
        while let Some(notification) = notify_rx.recv().await {
            route_notification(&notification, &handlers);
        }
    });
}

fn route_notification(notification: &RpcNotification, handlers: &DialogHandlers) {
    match notification.method.as_str() {
        "page.dialog" => {
            let page_id = notification.params["pageId"].as_str().unwrap_or_default();
            let message = notification.params["message"].as_str().unwrap_or_default();
            let handler = handlers.lock().get(page_id).cloned();
            match handler {
                Some(handler) => handler(message),
                None => warn!("Dialog on page {} with no handler: {}", page_id, message),
            }
        }
        other => debug!("Unhandled driver notification: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialog_notification_reaches_page_handler() {
        let handlers: DialogHandlers = Arc::default();
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = seen.clone();
        handlers.lock().insert(
            "page-1".to_string(),
            Arc::new(move |message: &str| sink.lock().push(message.to_string())),
        );

        route_notification(
            &RpcNotification {
                method: "page.dialog".to_string(),
                params: json!({ "pageId": "page-1", "message": "Product added" }),
            },
            &handlers,
        );
        route_notification(
            &RpcNotification {
                method: "page.dialog".to_string(),
                params: json!({ "pageId": "page-2", "message": "elsewhere" }),
            },
            &handlers,
        );

        assert_eq!(*seen.lock(), vec!["Product added".to_string()]);
    }
}
