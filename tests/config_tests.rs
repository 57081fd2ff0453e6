mod common;

use common::*;

use qabase::config::{
    AllureConfig, BrowserType, ConfigError, ConfigProvider, RestConfig, Viewport, WebUiConfig,
};

const APPLICATION_YAML: &str = r#"
qabase:
  webui:
    base-url: "https://example.com"
    browser-type: firefox
    viewport-width: 1920
    viewport-height: 1080
    timeout-ms: 10000
    headless: true
  rest:
    base-url: https://jsonplaceholder.typicode.com
    timeout-ms: 20000
  allure:
    enabled: true
    results-dir: build/allure-results
"#;

fn provider(dir: &std::path::Path) -> ConfigProvider {
    ConfigProvider::builder()
        .add_discovered_sources()
        .project_root(dir)
        .with_mapping::<WebUiConfig>()
        .with_mapping::<RestConfig>()
        .with_mapping::<AllureConfig>()
        .build()
        .unwrap()
}

#[test]
fn test_yaml_values_load_unchanged() {
    let dir = create_test_dir();
    write_file(dir.path(), "application.yaml", APPLICATION_YAML);

    let provider = provider(dir.path());
    let webui = provider.mapping::<WebUiConfig>().unwrap();
    assert_eq!(webui.base_url, "https://example.com");
    assert_eq!(webui.browser_type, BrowserType::Firefox);
    assert_eq!(webui.viewport(), Viewport { width: 1920, height: 1080 });
    assert_eq!(webui.timeout_ms, 10000);
    assert!(webui.headless);
    assert!(!webui.trace_on_failure);

    let rest = provider.mapping::<RestConfig>().unwrap();
    assert_eq!(rest.base_url, "https://jsonplaceholder.typicode.com");
    assert_eq!(rest.timeout_ms, 20000);
    assert_eq!(rest.auth_token, None);

    let allure = provider.mapping::<AllureConfig>().unwrap();
    assert!(allure.enabled);
    assert_eq!(allure.results_dir, std::path::PathBuf::from("build/allure-results"));
}

#[test]
fn test_loading_twice_is_identical() {
    let dir = create_test_dir();
    write_file(dir.path(), "application.yaml", APPLICATION_YAML);

    let first = provider(dir.path()).mapping::<WebUiConfig>().unwrap();
    let second = provider(dir.path()).mapping::<WebUiConfig>().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_defaults_without_sources() {
    let dir = create_test_dir();
    let provider = provider(dir.path());
    assert_eq!(provider.mapping::<WebUiConfig>().unwrap(), WebUiConfig::default());
    assert_eq!(provider.mapping::<RestConfig>().unwrap(), RestConfig::default());
    assert_eq!(provider.mapping::<AllureConfig>().unwrap(), AllureConfig::default());
}

#[test]
fn test_explicit_file_overrides_discovered() {
    let dir = create_test_dir();
    write_file(dir.path(), "application.yaml", APPLICATION_YAML);
    let extra = write_file(
        dir.path(),
        "ci/override.yaml",
        "qabase:\n  webui:\n    headless: false\n",
    );

    let provider = ConfigProvider::builder()
        .add_discovered_sources()
        .project_root(dir.path())
        .with_file(extra)
        .with_mapping::<WebUiConfig>()
        .build()
        .unwrap();

    let webui = provider.mapping::<WebUiConfig>().unwrap();
    assert!(!webui.headless);
    assert_eq!(webui.timeout_ms, 10000);
}

#[test]
fn test_invalid_values_fail_at_build() {
    let result = ConfigProvider::builder()
        .with_property("qabase.rest.base-url", " ")
        .with_mapping::<RestConfig>()
        .build();
    assert!(matches!(result, Err(ConfigError::Invalid { .. })));

    let result = ConfigProvider::builder()
        .with_property("qabase.webui.browser-type", "netscape")
        .with_mapping::<WebUiConfig>()
        .build();
    assert!(matches!(result, Err(ConfigError::Lookup { .. })));
}
