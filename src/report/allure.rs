//! Allure step and attachment bridge
//!
//! Every helper here is gated twice: reporting must be enabled, and a test
//! case must be active on this reporter. Outside that window `step` just runs
//! the action and the attach helpers do nothing, so they are safe to call
//! from any context.

use futures::FutureExt;
use parking_lot::Mutex;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::model::{now_millis, Attachment, Stage, Status, StatusDetails, StepResult, TestResult};
use super::ReportError;
use crate::config::AllureConfig;

pub const MEDIA_TYPE_TEXT: &str = "text/plain";
pub const MEDIA_TYPE_JSON: &str = "application/json";
pub const MEDIA_TYPE_HTML: &str = "text/html";
pub const MEDIA_TYPE_PNG: &str = "image/png";
pub const MEDIA_TYPE_ZIP: &str = "application/zip";

/// Handle to the Allure report sink; cheap to clone.
#[derive(Clone, Debug)]
pub struct AllureReporter {
    inner: Arc<ReporterInner>,
}

#[derive(Debug)]
struct ReporterInner {
    enabled: bool,
    results_dir: PathBuf,
    current: Mutex<Option<TestCase>>,
}

#[derive(Debug)]
struct TestCase {
    result: TestResult,
    open_steps: Vec<StepResult>,
}

impl TestCase {
    fn attachments_mut(&mut self) -> &mut Vec<Attachment> {
        match self.open_steps.last_mut() {
            Some(step) => &mut step.attachments,
            None => &mut self.result.attachments,
        }
    }
}

impl AllureReporter {
    pub fn new(enabled: bool, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(ReporterInner {
                enabled,
                results_dir: results_dir.into(),
                current: Mutex::new(None),
            }),
        }
    }

    pub fn from_config(config: &AllureConfig) -> Self {
        Self::new(config.reporting_enabled(), config.results_dir.clone())
    }

    /// A reporter that never records anything
    pub fn disabled() -> Self {
        Self::new(false, "allure-results")
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    /// True while a test case is open on this reporter
    pub fn is_active(&self) -> bool {
        self.inner.current.lock().is_some()
    }

    /// Both gates hold: reporting enabled and a test case open
    pub fn is_recording(&self) -> bool {
        self.is_enabled() && self.is_active()
    }

    pub fn results_dir(&self) -> &Path {
        &self.inner.results_dir
    }

    /// Open a test case. A test case left open is finished as broken first.
    pub fn start_test(&self, name: &str, full_name: &str) {
        if !self.is_enabled() {
            return;
        }
        let previous = self.inner.current.lock().replace(TestCase {
            result: TestResult::started(name, full_name),
            open_steps: Vec::new(),
        });
        if let Some(previous) = previous {
            warn!("Test '{}' was never stopped, marking broken", previous.result.name);
            self.finish(previous, Status::Broken, Some("test case was not stopped".to_string()));
        }
    }

    /// Close the active test case and write its result file.
    pub fn stop_test(&self, status: Status, message: Option<String>) {
        let current = self.inner.current.lock().take();
        if let Some(test_case) = current {
            self.finish(test_case, status, message);
        }
    }

    fn finish(&self, mut test_case: TestCase, status: Status, message: Option<String>) {
        let now = now_millis();
        while let Some(mut step) = test_case.open_steps.pop() {
            step.status = Status::Broken;
            step.stage = Stage::Finished;
            step.stop = now;
            match test_case.open_steps.last_mut() {
                Some(parent) => parent.steps.push(step),
                None => test_case.result.steps.push(step),
            }
        }

        let result = &mut test_case.result;
        result.status = status;
        result.status_details = message.map(|message| StatusDetails {
            message: Some(message),
            trace: None,
        });
        result.stage = Stage::Finished;
        result.stop = now;

        if let Err(e) = self.write_result(result) {
            warn!("Failed to write Allure result for '{}': {}", result.name, e);
        }
    }

    fn write_result(&self, result: &TestResult) -> Result<(), ReportError> {
        std::fs::create_dir_all(self.results_dir())?;
        let path = self.results_dir().join(format!("{}-result.json", result.uuid));
        std::fs::write(&path, serde_json::to_vec_pretty(result)?)?;
        debug!("Wrote Allure result {}", path.display());
        Ok(())
    }

    /// Run `action`, recording it as a step when a test case is active.
    pub fn step<T, E, F>(&self, name: &str, action: F) -> Result<T, E>
    where
        E: Display,
        F: FnOnce() -> Result<T, E>,
    {
        if !self.begin_step(name) {
            return action();
        }

        match std::panic::catch_unwind(AssertUnwindSafe(action)) {
            Ok(result) => {
                self.end_step(step_outcome(&result));
                result
            }
            Err(panic) => {
                self.end_step((Status::Broken, Some(panic_message(&*panic))));
                std::panic::resume_unwind(panic)
            }
        }
    }

    /// Async counterpart of [`AllureReporter::step`].
    pub async fn step_async<T, E, Fut>(&self, name: &str, action: Fut) -> Result<T, E>
    where
        E: Display,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.begin_step(name) {
            return action.await;
        }

        match AssertUnwindSafe(action).catch_unwind().await {
            Ok(result) => {
                self.end_step(step_outcome(&result));
                result
            }
            Err(panic) => {
                self.end_step((Status::Broken, Some(panic_message(&*panic))));
                std::panic::resume_unwind(panic)
            }
        }
    }

    fn begin_step(&self, name: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let mut current = self.inner.current.lock();
        match current.as_mut() {
            Some(test_case) => {
                test_case.open_steps.push(StepResult::started(name));
                true
            }
            None => false,
        }
    }

    fn end_step(&self, (status, message): (Status, Option<String>)) {
        let mut current = self.inner.current.lock();
        let Some(test_case) = current.as_mut() else {
            return;
        };
        let Some(mut step) = test_case.open_steps.pop() else {
            return;
        };
        step.status = status;
        step.status_details = message.map(|message| StatusDetails {
            message: Some(message),
            trace: None,
        });
        step.stage = Stage::Finished;
        step.stop = now_millis();
        match test_case.open_steps.last_mut() {
            Some(parent) => parent.steps.push(step),
            None => test_case.result.steps.push(step),
        }
    }

    pub fn attach_text(&self, title: &str, body: &str) {
        self.attach_bytes(title, MEDIA_TYPE_TEXT, body.as_bytes(), "txt");
    }

    pub fn attach_json(&self, title: &str, body: &str) {
        self.attach_bytes(title, MEDIA_TYPE_JSON, body.as_bytes(), "json");
    }

    /// Write `content` as an attachment file and link it from the innermost
    /// open step (or the test case itself).
    pub fn attach_bytes(&self, title: &str, mime_type: &str, content: &[u8], extension: &str) {
        if !self.is_recording() {
            return;
        }
        let source = format!(
            "{}-attachment.{}",
            uuid::Uuid::new_v4(),
            extension.trim_start_matches('.')
        );
        if let Err(e) = self.write_attachment(&source, content) {
            warn!("Failed to write attachment '{}': {}", title, e);
            return;
        }

        let mut current = self.inner.current.lock();
        if let Some(test_case) = current.as_mut() {
            test_case.attachments_mut().push(Attachment {
                name: title.to_string(),
                source,
                mime_type: mime_type.to_string(),
            });
        }
    }

    fn write_attachment(&self, source: &str, content: &[u8]) -> Result<(), ReportError> {
        std::fs::create_dir_all(self.results_dir())?;
        std::fs::write(self.results_dir().join(source), content)?;
        Ok(())
    }

    /// Write `environment.properties` into the results directory.
    pub fn write_environment<K, V>(&self, entries: impl IntoIterator<Item = (K, V)>)
    where
        K: Display,
        V: Display,
    {
        if !self.is_enabled() {
            return;
        }
        let body: String = entries
            .into_iter()
            .map(|(key, value)| format!("{}={}\n", key, value))
            .collect();
        let result = std::fs::create_dir_all(self.results_dir()).and_then(|_| {
            std::fs::write(self.results_dir().join("environment.properties"), body)
        });
        if let Err(e) = result {
            warn!("Failed to write Allure environment: {}", e);
        }
    }
}

fn step_outcome<T, E: Display>(result: &Result<T, E>) -> (Status, Option<String>) {
    match result {
        Ok(_) => (Status::Passed, None),
        Err(e) => (Status::Failed, Some(e.to_string())),
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
