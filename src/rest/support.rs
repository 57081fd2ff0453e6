//! JSON helpers shared by the REST client and expectations

use serde::Serialize;
use serde_json::Value;

use super::{RestError, RestResponse};
use crate::report::AllureReporter;

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, RestError> {
    Ok(serde_json::to_string(value)?)
}

pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String, RestError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Attach a request payload as "Request Body"
pub fn attach_request<T: Serialize + ?Sized>(reporter: &AllureReporter, body: &T) {
    if !reporter.is_recording() {
        return;
    }
    if let Ok(json) = to_pretty_json(body) {
        reporter.attach_json("Request Body", &json);
    }
}

/// Attach a non-blank response body under `name`, pretty-printed when it is JSON
pub fn attach_response(reporter: &AllureReporter, response: &RestResponse, name: &str) {
    if !reporter.is_recording() {
        return;
    }
    let pretty = match &response.body {
        Value::Null => response.text.clone(),
        Value::String(_) => response.text.clone(),
        body => to_pretty_json(body).unwrap_or_else(|_| response.text.clone()),
    };
    if !pretty.trim().is_empty() {
        reporter.attach_json(name, &pretty);
    }
}

/// Look up a dotted path such as `items[0].name`.
///
/// An empty path or `$` is the root. A final `size()` segment yields the
/// length of an array, object or string.
pub fn json_path(root: &Value, path: &str) -> Option<Value> {
    let path = path.trim();
    let path = path.strip_prefix('$').unwrap_or(path);
    let path = path.strip_prefix('.').unwrap_or(path);

    let mut current = root;
    let segments: Vec<&str> = if path.is_empty() {
        Vec::new()
    } else {
        path.split('.').collect()
    };

    for (i, segment) in segments.iter().enumerate() {
        if *segment == "size()" {
            return (i == segments.len() - 1)
                .then(|| size_of(current))
                .flatten()
                .map(Value::from);
        }

        let (name, indexes) = split_indexes(segment)?;
        if !name.is_empty() {
            current = current.get(name)?;
        }
        for index in indexes {
            current = current.get(index)?;
        }
    }
    Some(current.clone())
}

fn split_indexes(segment: &str) -> Option<(&str, Vec<usize>)> {
    let (name, mut rest) = match segment.find('[') {
        Some(pos) => (&segment[..pos], &segment[pos..]),
        None => return Some((segment, Vec::new())),
    };
    let mut indexes = Vec::new();
    while let Some(stripped) = rest.strip_prefix('[') {
        let end = stripped.find(']')?;
        indexes.push(stripped[..end].trim().parse().ok()?);
        rest = &stripped[end + 1..];
    }
    rest.is_empty().then_some((name, indexes))
}

pub(crate) fn size_of(value: &Value) -> Option<usize> {
    match value {
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => Some(map.len()),
        Value::String(s) => Some(s.chars().count()),
        _ => None,
    }
}

/// Equality that treats `1` and `1.0` as the same number
pub(crate) fn json_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => actual == expected,
    }
}
