mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;

use qabase::config::{BrowserType, Viewport};
use qabase::report::{AllureReporter, Status};
use qabase::webui::{
    BrowserDriver, ContextOptions, PageFactory, PageObject, Sel, Session, Ui, UiError, VisiblePage,
};

async fn ui_with_page(reporter: AllureReporter) -> (Ui, Arc<FakeBrowserState>) {
    let (driver, state) = FakeDriver::new();
    let session = Session::new();
    let browser = driver
        .launch(BrowserType::Chromium, true)
        .await
        .unwrap();
    let context = browser
        .new_context(ContextOptions {
            base_url: None,
            viewport: Viewport {
                width: 1366,
                height: 768,
            },
        })
        .await
        .unwrap();
    let page = context.new_page().await.unwrap();
    page.on_dialog(session.dialog_recorder()).await.unwrap();
    session.set_browser(browser);
    session.set_context(context);
    session.set_page(page);

    let ui = Ui::new(
        session,
        reporter,
        "https://www.demoblaze.com",
        Duration::from_millis(500),
    );
    (ui, state)
}

#[tokio::test]
async fn test_chained_verbs() {
    let (ui, state) = ui_with_page(AllureReporter::disabled()).await;
    state.set_visible("#sign-username");
    state.set_text("#signInModalLabel", "Sign up");

    ui.visit("/")
        .await
        .unwrap()
        .tap("a#signin2")
        .await
        .unwrap()
        .fill("#sign-username", "alice")
        .await
        .unwrap()
        .see("#signInModalLabel", "Sign up")
        .await
        .unwrap();

    assert_eq!(ui.current_url().await.unwrap(), "https://www.demoblaze.com/");
    assert_eq!(
        state.fills(),
        vec![("#sign-username".to_string(), "alice".to_string())]
    );
    assert_eq!(state.count_calls("page.click a#signin2"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_should_see_times_out_with_actual_text() {
    let (ui, state) = ui_with_page(AllureReporter::disabled()).await;
    state.set_text("h1", "Welcome");

    let err = ui.should_see("h1", "Goodbye").await.unwrap_err();
    assert!(matches!(err, UiError::Assertion(_)));
    assert_eq!(
        err.to_string(),
        "Assertion failed: Expected h1 to contain 'Goodbye' but was 'Welcome'"
    );
}

#[tokio::test(start_paused = true)]
async fn test_type_into_requires_visibility() {
    let (ui, state) = ui_with_page(AllureReporter::disabled()).await;

    let err = ui.type_into("#hidden", "x").await.unwrap_err();
    assert!(err.to_string().contains("was not visible"));
    assert!(state.fills().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_click_requires_enabled() {
    let (ui, state) = ui_with_page(AllureReporter::disabled()).await;
    state.set_disabled("#buy");

    assert!(ui.click_css("#buy").await.is_err());
    assert_eq!(state.count_calls("page.click"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_should_have_count_and_visibility() {
    let (ui, state) = ui_with_page(AllureReporter::disabled()).await;
    state.set_count("#tbodyid tr", 2);
    state.set_visible("#orderModal");

    ui.count("#tbodyid tr", 2).await.unwrap();
    ui.see_visible("#orderModal").await.unwrap();

    let err = ui.should_have_count("#tbodyid tr", 3).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Assertion failed: Expected 3 elements matching #tbodyid tr but found 2"
    );
    assert!(ui
        .with_timeout(Duration::from_millis(200))
        .should_be_visible("#missing")
        .await
        .is_err());
}

#[tokio::test]
async fn test_alert_from_page_is_consumed() {
    let (ui, state) = ui_with_page(AllureReporter::disabled()).await;
    assert!(state.fire_dialog("Sign up successful."));

    ui.expect_alert_contains("SIGN UP").await.unwrap();
    assert!(ui.session().dialog_messages_snapshot().is_empty());
}

#[tokio::test]
async fn test_failing_step_attaches_artifacts_when_recording() {
    let dir = create_test_dir();
    let reporter = AllureReporter::new(true, dir.path());
    reporter.start_test("dsl", "suite.dsl");
    let (ui, state) = ui_with_page(reporter.clone()).await;
    FakeBrowserState::fail(&state.fail_goto);

    assert!(ui.visit("/").await.is_err());
    reporter.stop_test(Status::Failed, None);

    let results = read_results(dir.path());
    let names: Vec<&str> = results[0]
        .attachments
        .iter()
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(names, vec!["Screenshot", "Page Source"]);
    assert_eq!(results[0].steps[0].name, "Visit https://www.demoblaze.com/");
}

#[tokio::test]
async fn test_failing_step_without_recording_captures_nothing() {
    let (ui, state) = ui_with_page(AllureReporter::disabled()).await;
    FakeBrowserState::fail(&state.fail_goto);

    assert!(ui.visit("/").await.is_err());
    assert_eq!(state.count_calls("page.screenshot"), 0);
}

struct CartPage {
    pages: PageFactory,
}

impl CartPage {
    const TOTAL: &'static str = "#totalp";
}

impl PageObject for CartPage {
    fn from_factory(pages: &PageFactory) -> Self {
        Self {
            pages: pages.clone(),
        }
    }
}

#[async_trait::async_trait]
impl VisiblePage for CartPage {
    async fn verify_visible(&self) -> Result<&Self, UiError> {
        self.pages.ui().should_be_visible(Self::TOTAL).await?;
        Ok(self)
    }
}

struct HomePage {
    pages: PageFactory,
}

impl HomePage {
    async fn open_cart(&self) -> Result<CartPage, UiError> {
        self.pages.ui().tap(&Sel::id("cartur")).await?;
        Ok(self.pages.get())
    }
}

impl PageObject for HomePage {
    fn from_factory(pages: &PageFactory) -> Self {
        Self {
            pages: pages.clone(),
        }
    }
}

#[tokio::test]
async fn test_page_objects_share_the_ui() {
    let (ui, state) = ui_with_page(AllureReporter::disabled()).await;
    state.set_visible("#totalp");
    let pages = PageFactory::new(ui);

    let cart = pages.get::<HomePage>().open_cart().await.unwrap();
    cart.verify_visible().await.unwrap();
    assert_eq!(state.count_calls("page.click id=cartur"), 1);
}
