//! REST client - HTTP requests via reqwest
//!
//! Every request runs as an Allure step. Request and response bodies are
//! attached as JSON while a test case is being recorded.

use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::support::{attach_request, attach_response};
use super::{RestError, RestResponse, MEDIA_JSON};
use crate::config::{load_mapping, AllureConfig, RestConfig};
use crate::report::AllureReporter;

#[derive(Debug, Clone)]
pub struct RestClient {
    config: RestConfig,
    client: reqwest::Client,
    reporter: AllureReporter,
}

impl RestClient {
    pub fn new(config: RestConfig, reporter: AllureReporter) -> Result<Self, RestError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()?;

        Ok(Self {
            config,
            client,
            reporter,
        })
    }

    /// Client built from the `qabase.rest` and `qabase.allure` mappings
    pub fn load() -> Result<Self, RestError> {
        let config = load_mapping::<RestConfig>()?;
        let allure = load_mapping::<AllureConfig>()?;
        Self::new(config, AllureReporter::from_config(&allure))
    }

    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    pub fn reporter(&self) -> &AllureReporter {
        &self.reporter
    }

    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.config.base_url.trim_end_matches('/');
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        format!("{}{}", base, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth_token {
            Some(token) if !token.is_empty() => {
                request.header(AUTHORIZATION, format!("Bearer {}", token))
            }
            _ => request,
        }
    }

    pub async fn get(&self, path: &str) -> Result<RestResponse, RestError> {
        self.request("GET", path, None, None).await
    }

    pub async fn get_with_query(
        &self,
        path: &str,
        query: &HashMap<String, String>,
    ) -> Result<RestResponse, RestError> {
        self.request("GET", path, None, Some(query)).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RestResponse, RestError> {
        let body = serde_json::to_value(body)?;
        self.request("POST", path, Some(body), None).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RestResponse, RestError> {
        let body = serde_json::to_value(body)?;
        self.request("PUT", path, Some(body), None).await
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RestResponse, RestError> {
        let body = serde_json::to_value(body)?;
        self.request("PATCH", path, Some(body), None).await
    }

    pub async fn delete(&self, path: &str) -> Result<RestResponse, RestError> {
        self.request("DELETE", path, None, None).await
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        query: Option<&HashMap<String, String>>,
    ) -> Result<RestResponse, RestError> {
        let method = parse_method(method)?;
        let name = format!("Sending HTTP [ {} ] request to -> {}", method, path);
        self.reporter
            .step_async(&name, self.execute(method, path, body, query))
            .await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        query: Option<&HashMap<String, String>>,
    ) -> Result<RestResponse, RestError> {
        let url = self.build_url(path);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, HeaderValue::from_static(MEDIA_JSON))
            .header(ACCEPT, HeaderValue::from_static(MEDIA_JSON));

        if let Some(query) = query {
            request = request.query(query);
        }
        request = self.apply_auth(request);
        if let Some(body) = &body {
            attach_request(&self.reporter, body);
            request = request.json(body);
        }

        debug!("Executing {} {}", method, url);
        let start = Instant::now();
        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response.text().await?;
        let elapsed = start.elapsed();

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.clone()))
        };
        info!("{} {} -> {} ({}ms)", method, url, status, elapsed.as_millis());

        let response = RestResponse {
            status,
            headers,
            body,
            text,
            elapsed,
            reporter: self.reporter.clone(),
        };
        attach_response(&self.reporter, &response, "Response Body");
        Ok(response)
    }
}

fn parse_method(method: &str) -> Result<Method, RestError> {
    match method.to_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        "HEAD" => Ok(Method::HEAD),
        "OPTIONS" => Ok(Method::OPTIONS),
        _ => Err(RestError::UnsupportedMethod(method.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> RestClient {
        let config = RestConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        };
        RestClient::new(config, AllureReporter::disabled()).unwrap()
    }

    #[test]
    fn test_build_url() {
        let client = client("https://jsonplaceholder.typicode.com");
        assert_eq!(
            client.build_url("/todos/1"),
            "https://jsonplaceholder.typicode.com/todos/1"
        );
        assert_eq!(
            client.build_url("todos"),
            "https://jsonplaceholder.typicode.com/todos"
        );
        assert_eq!(client.build_url("http://other/x"), "http://other/x");
    }

    #[test]
    fn test_build_url_with_trailing_slash() {
        let client = client("https://api.example.com/");
        assert_eq!(client.build_url("/users"), "https://api.example.com/users");
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("get").unwrap(), Method::GET);
        assert_eq!(parse_method("Patch").unwrap(), Method::PATCH);
        assert!(matches!(
            parse_method("BREW"),
            Err(RestError::UnsupportedMethod(m)) if m == "BREW"
        ));
    }
}
