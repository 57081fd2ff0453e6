#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use qabase::bridge::BridgeError;
use qabase::config::{BrowserType, WebUiConfig};
use qabase::report::TestResult;
use qabase::webui::{Browser, BrowserContext, BrowserDriver, ContextOptions, DialogHandler, Page};

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

pub fn write_file(dir: &Path, relative: &str, content: &str) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&path, content).expect("Failed to write file");
    path
}

/// Every `*-result.json` under `dir`
pub fn read_results(dir: &Path) -> Vec<TestResult> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.to_string_lossy().ends_with("-result.json"))
        .map(|p| serde_json::from_slice(&fs::read(p).unwrap()).unwrap())
        .collect()
}

pub fn webui_config(base_url: &str) -> WebUiConfig {
    WebUiConfig {
        base_url: base_url.to_string(),
        headless: true,
        ..Default::default()
    }
}

// ============================================================================
// Fake browser driver
// ============================================================================

/// Shared by every fake handle; tests inspect and steer it.
#[derive(Default)]
pub struct FakeBrowserState {
    calls: Mutex<Vec<String>>,
    pub fail_launch: AtomicBool,
    pub fail_screenshot: AtomicBool,
    pub fail_content: AtomicBool,
    pub fail_goto: AtomicBool,
    pub fail_new_page: AtomicBool,
    pub fail_context_close: AtomicBool,
    dialog_handler: Mutex<Option<DialogHandler>>,
    texts: Mutex<HashMap<String, String>>,
    visible: Mutex<HashSet<String>>,
    disabled: Mutex<HashSet<String>>,
    counts: Mutex<HashMap<String, usize>>,
    url: Mutex<String>,
    fills: Mutex<Vec<(String, String)>>,
}

impl FakeBrowserState {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn set_text(&self, selector: &str, text: &str) {
        self.texts
            .lock()
            .insert(selector.to_string(), text.to_string());
    }

    pub fn set_visible(&self, selector: &str) {
        self.visible.lock().insert(selector.to_string());
    }

    pub fn set_disabled(&self, selector: &str) {
        self.disabled.lock().insert(selector.to_string());
    }

    pub fn set_count(&self, selector: &str, count: usize) {
        self.counts.lock().insert(selector.to_string(), count);
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.fills.lock().clone()
    }

    pub fn fail(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }

    /// Simulate the page opening an alert
    pub fn fire_dialog(&self, message: &str) -> bool {
        let handler = self.dialog_handler.lock().clone();
        match handler {
            Some(handler) => {
                handler(message);
                true
            }
            None => false,
        }
    }

    fn failure(&self, flag: &AtomicBool, what: &str) -> Result<(), BridgeError> {
        if flag.load(Ordering::SeqCst) {
            Err(BridgeError::ServerError(format!("{} failed", what)))
        } else {
            Ok(())
        }
    }
}

pub struct FakeDriver {
    pub state: Arc<FakeBrowserState>,
}

impl FakeDriver {
    pub fn new() -> (Arc<Self>, Arc<FakeBrowserState>) {
        qabase::logging::init_for_tests();
        let state = Arc::new(FakeBrowserState::default());
        (
            Arc::new(Self {
                state: state.clone(),
            }),
            state,
        )
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn launch(
        &self,
        browser_type: BrowserType,
        headless: bool,
    ) -> Result<Arc<dyn Browser>, BridgeError> {
        self.state.record(format!(
            "driver.launch {} headless={}",
            browser_type.as_str(),
            headless
        ));
        self.state.failure(&self.state.fail_launch, "launch")?;
        Ok(Arc::new(FakeBrowser {
            state: self.state.clone(),
        }))
    }

    async fn close(&self) -> Result<(), BridgeError> {
        self.state.record("driver.close");
        Ok(())
    }
}

struct FakeBrowser {
    state: Arc<FakeBrowserState>,
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn new_context(
        &self,
        options: ContextOptions,
    ) -> Result<Arc<dyn BrowserContext>, BridgeError> {
        self.state.record(format!(
            "browser.new_context {} {}x{}",
            options.base_url.unwrap_or_default(),
            options.viewport.width,
            options.viewport.height
        ));
        Ok(Arc::new(FakeContext {
            state: self.state.clone(),
        }))
    }

    async fn close(&self) -> Result<(), BridgeError> {
        self.state.record("browser.close");
        Ok(())
    }
}

struct FakeContext {
    state: Arc<FakeBrowserState>,
}

#[async_trait]
impl BrowserContext for FakeContext {
    async fn new_page(&self) -> Result<Arc<dyn Page>, BridgeError> {
        self.state.record("context.new_page");
        self.state.failure(&self.state.fail_new_page, "new_page")?;
        Ok(Arc::new(FakePage {
            state: self.state.clone(),
        }))
    }

    async fn start_tracing(&self) -> Result<(), BridgeError> {
        self.state.record("context.start_tracing");
        Ok(())
    }

    async fn stop_tracing(&self, path: Option<&Path>) -> Result<(), BridgeError> {
        self.state
            .record(format!("context.stop_tracing keep={}", path.is_some()));
        if let Some(path) = path {
            fs::write(path, b"PK fake trace")?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), BridgeError> {
        self.state.record("context.close");
        self.state
            .failure(&self.state.fail_context_close, "context close")
    }
}

struct FakePage {
    state: Arc<FakeBrowserState>,
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str) -> Result<(), BridgeError> {
        self.state.record(format!("page.goto {}", url));
        self.state.failure(&self.state.fail_goto, "goto")?;
        *self.state.url.lock() = url.to_string();
        Ok(())
    }

    async fn url(&self) -> Result<String, BridgeError> {
        Ok(self.state.url.lock().clone())
    }

    async fn title(&self) -> Result<String, BridgeError> {
        Ok("STORE".to_string())
    }

    async fn content(&self) -> Result<String, BridgeError> {
        self.state.record("page.content");
        self.state.failure(&self.state.fail_content, "content")?;
        Ok("<html><body>fake</body></html>".to_string())
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, BridgeError> {
        self.state
            .record(format!("page.screenshot full_page={}", full_page));
        self.state
            .failure(&self.state.fail_screenshot, "screenshot")?;
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn click(&self, selector: &str) -> Result<(), BridgeError> {
        self.state.record(format!("page.click {}", selector));
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), BridgeError> {
        self.state.record(format!("page.fill {}", selector));
        self.state
            .fills
            .lock()
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn text(&self, selector: &str) -> Result<Option<String>, BridgeError> {
        Ok(self.state.texts.lock().get(selector).cloned())
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, BridgeError> {
        Ok(self.state.visible.lock().contains(selector))
    }

    async fn is_enabled(&self, selector: &str) -> Result<bool, BridgeError> {
        Ok(!self.state.disabled.lock().contains(selector))
    }

    async fn count(&self, selector: &str) -> Result<usize, BridgeError> {
        Ok(self
            .state
            .counts
            .lock()
            .get(selector)
            .copied()
            .unwrap_or(0))
    }

    async fn set_default_timeout(&self, timeout_ms: u64) -> Result<(), BridgeError> {
        self.state
            .record(format!("page.set_default_timeout {}", timeout_ms));
        Ok(())
    }

    async fn set_default_navigation_timeout(&self, timeout_ms: u64) -> Result<(), BridgeError> {
        self.state
            .record(format!("page.set_default_navigation_timeout {}", timeout_ms));
        Ok(())
    }

    async fn on_dialog(&self, handler: DialogHandler) -> Result<(), BridgeError> {
        self.state.record("page.on_dialog");
        *self.state.dialog_handler.lock() = Some(handler);
        Ok(())
    }
}

// ============================================================================
// Canned HTTP responder
// ============================================================================

/// A request as seen by [`serve_once`]
#[derive(Debug, Clone, Default)]
pub struct CapturedRequest {
    pub method: String,
    pub target: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    pub headers: Vec<(&'static str, &'static str)>,
}

impl CannedResponse {
    pub fn new(status: u16, content_type: &'static str, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.push((name, value));
        self
    }
}

struct Responder {
    responses: Mutex<VecDeque<CannedResponse>>,
    captured: mpsc::UnboundedSender<CapturedRequest>,
}

/// Answer requests in order with the given `(status, content type, body)`
/// triples; returns the base URL and a handle resolving to the captured
/// requests once all of them have been answered.
pub async fn serve_once(
    responses: Vec<(u16, &'static str, String)>,
) -> (String, tokio::task::JoinHandle<Vec<CapturedRequest>>) {
    serve_responses(
        responses
            .into_iter()
            .map(|(status, content_type, body)| CannedResponse::new(status, content_type, body))
            .collect(),
    )
    .await
}

pub async fn serve_responses(
    responses: Vec<CannedResponse>,
) -> (String, tokio::task::JoinHandle<Vec<CapturedRequest>>) {
    qabase::logging::init_for_tests();
    let expected = responses.len();
    let (captured_tx, mut captured_rx) = mpsc::unbounded_channel();
    let responder = Arc::new(Responder {
        responses: Mutex::new(responses.into()),
        captured: captured_tx,
    });

    let app = Router::new().fallback(respond).with_state(responder);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    let handle = tokio::spawn(async move {
        let mut captured = Vec::with_capacity(expected);
        while captured.len() < expected {
            match captured_rx.recv().await {
                Some(request) => captured.push(request),
                None => break,
            }
        }
        captured
    });

    (format!("http://{}", addr), handle)
}

async fn respond(
    State(responder): State<Arc<Responder>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let _ = responder.captured.send(CapturedRequest {
        method: method.to_string(),
        target: uri
            .path_and_query()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string()),
        headers: headers
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect(),
        body: String::from_utf8_lossy(&body).to_string(),
    });

    let next = responder.responses.lock().pop_front();
    let Some(canned) = next else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    let status = StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, canned.body).into_response();
    let response_headers = response.headers_mut();
    response_headers.insert(
        axum::http::header::CONTENT_TYPE,
        HeaderValue::from_static(canned.content_type),
    );
    for (name, value) in canned.headers {
        response_headers.append(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    response
}
