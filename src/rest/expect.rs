//! Fluent response expectations
//!
//! ```ignore
//! let todo: Todo = client.get("/todos/3").await?
//!     .expect()
//!     .ok()?
//!     .content_type("application/json")?
//!     .field_eq("id", 3)?
//!     .attach("Response Body")
//!     .as_type()?;
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use super::status::StatusFamily;
use super::support::{attach_response, json_eq, json_path, size_of};
use super::{RestError, RestResponse};

pub struct RestExpect {
    response: RestResponse,
}

impl RestExpect {
    pub fn new(response: RestResponse) -> Self {
        Self { response }
    }

    pub fn response(&self) -> &RestResponse {
        &self.response
    }

    pub fn into_response(self) -> RestResponse {
        self.response
    }

    fn check(
        self,
        name: &str,
        check: impl FnOnce(&RestResponse) -> Result<(), String>,
    ) -> Result<Self, RestError> {
        let response = &self.response;
        response
            .reporter
            .step(name, || check(response).map_err(RestError::Assertion))?;
        Ok(self)
    }

    /// Expect exactly `expected`
    pub fn status(self, expected: u16) -> Result<Self, RestError> {
        self.check(&format!("Expect HTTP {}", expected), |r| {
            if r.status == expected {
                Ok(())
            } else {
                Err(format!("Expected status code {} but was {}", expected, r.status))
            }
        })
    }

    pub fn ok(self) -> Result<Self, RestError> {
        self.status(200)
    }

    pub fn created(self) -> Result<Self, RestError> {
        self.status(201)
    }

    pub fn no_content(self) -> Result<Self, RestError> {
        self.status(204)
    }

    pub fn client_error(self) -> Result<Self, RestError> {
        self.status_family(StatusFamily::ClientError)
    }

    pub fn server_error(self) -> Result<Self, RestError> {
        self.status_family(StatusFamily::ServerError)
    }

    pub fn status_in(self, codes: &[u16]) -> Result<Self, RestError> {
        let actual = self.response.status;
        let name = format!("Expect HTTP in {:?} (actual={})", codes, actual);
        self.check(&name, |_| {
            if codes.contains(&actual) {
                Ok(())
            } else {
                Err(format!("Expected one of {:?} but was {}", codes, actual))
            }
        })
    }

    pub fn status_family(self, family: StatusFamily) -> Result<Self, RestError> {
        let actual = self.response.status;
        let name = format!("Expect {} (actual={})", family, actual);
        self.check(&name, |_| {
            if family.contains(actual) {
                Ok(())
            } else {
                let range = family.range();
                Err(format!(
                    "Expected {}..{} but was {}",
                    range.start(),
                    range.end(),
                    actual
                ))
            }
        })
    }

    /// Expect the JSON value at `path` to equal `expected`
    pub fn field_eq<V: Serialize>(self, path: &str, expected: V) -> Result<Self, RestError> {
        let expected = serde_json::to_value(expected)?;
        let name = format!("Expect JSON field '{}' == '{}'", path, expected);
        self.check(&name, |r| match json_path(&r.body, path) {
            Some(actual) if json_eq(&actual, &expected) => Ok(()),
            Some(actual) => Err(format!(
                "JSON path {} expected {} but was {}",
                path, expected, actual
            )),
            None => Err(format!("JSON path {} not found in response body", path)),
        })
    }

    /// Compare media types, ignoring parameters such as `charset`
    pub fn content_type(self, expected: &str) -> Result<Self, RestError> {
        self.check(&format!("Expect content type {}", expected), |r| {
            let actual = r.content_type().unwrap_or_default();
            if media_type(actual).eq_ignore_ascii_case(media_type(expected)) {
                Ok(())
            } else {
                Err(format!(
                    "Expected content type {} but was '{}'",
                    expected, actual
                ))
            }
        })
    }

    pub fn time_under(self, millis: u64) -> Result<Self, RestError> {
        self.check(&format!("Expect response time <= {} ms", millis), |r| {
            if r.elapsed < Duration::from_millis(millis) {
                Ok(())
            } else {
                Err(format!(
                    "Expected response time < {}ms but was {}ms",
                    millis,
                    r.elapsed.as_millis()
                ))
            }
        })
    }

    /// Empty body, or a JSON container with at most `max` entries
    pub fn empty_or_size_at_most(self, max: usize) -> Result<Self, RestError> {
        self.check(&format!("Expect JSON body size() <= {}", max), |r| {
            if r.body.is_null() {
                return Ok(());
            }
            match size_of(&r.body) {
                Some(size) if size <= max => Ok(()),
                Some(size) => Err(format!("Expected size() <= {} but was {}", max, size)),
                None => Err(format!("Response body has no size(): {}", r.body)),
            }
        })
    }

    pub fn attach(self, name: &str) -> Self {
        let response = &self.response;
        let _: Result<(), RestError> = response.reporter.step(&format!("Attach: {}", name), || {
            attach_response(&response.reporter, response, name);
            Ok(())
        });
        self
    }

    pub fn attach_if(self, condition: bool, name: &str) -> Self {
        if condition {
            self.attach(name)
        } else {
            self
        }
    }

    /// Deserialize the body
    pub fn as_type<T: DeserializeOwned>(self) -> Result<T, RestError> {
        self.response.as_type()
    }
}

fn media_type(value: &str) -> &str {
    value.split(';').next().unwrap_or_default().trim()
}
