// Response classification.
//
// The cluster does not use HTTP status codes consistently: errors arrive as
// JSON objects carrying `errorType` + `message`, or just `message`, and
// list responses are never errors. The one exception to the `message` rule
// is the bootstrap progress payload, which carries `message` alongside
// `setupEncryptionAtRest`.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::error::Error;
use crate::value::ValueExt;

/// Key whose presence marks a bootstrap progress payload as a success.
pub const BOOTSTRAP_SENTINEL: &str = "setupEncryptionAtRest";

/// Decoded, classified result of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchResult {
    Object(Map<String, Value>),
    Array(Vec<Value>),
    /// No JSON body; only the HTTP status (e.g. 204 on DELETE).
    Status(u16),
}

impl DispatchResult {
    /// Convert into a plain JSON value. `Status(n)` becomes `{"statusCode": n}`.
    pub fn into_value(self) -> Value {
        match self {
            Self::Object(map) => Value::Object(map),
            Self::Array(items) => Value::Array(items),
            Self::Status(code) => json!({ "statusCode": code }),
        }
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The object payload, or `MissingField` if this is not an object.
    pub fn object(&self) -> Result<&Map<String, Value>, Error> {
        self.as_object().ok_or(Error::MissingField {
            field: "<root>".into(),
            expected: "an object",
        })
    }

    /// The status code of a body-less result.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status(code) => Some(*code),
            _ => None,
        }
    }

    /// Decode into a concrete typed shape.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, Error> {
        let value = self.into_value();
        serde_json::from_value(value.clone()).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: value.to_string(),
        })
    }

    /// Job-status URL from `links[0].href` of a mutating response.
    pub fn job_href(&self) -> Result<&str, Error> {
        let links = self.object()?.array_field("links")?;
        links
            .first()
            .ok_or_else(|| Error::MissingField {
                field: "links[0]".into(),
                expected: "an object",
            })?
            .str_field("href")
    }
}

/// Classify a raw response body and its HTTP status.
pub fn classify(body: &str, status: StatusCode) -> Result<DispatchResult, Error> {
    classify_with(body, status, MessageRule::Error)
}

/// Classify a job-status document.
///
/// Status documents carry an optional `message` next to `status` (progress
/// text, or the failure reason), so only `errorType` marks a domain error.
pub fn classify_job_status(body: &str, status: StatusCode) -> Result<DispatchResult, Error> {
    classify_with(body, status, MessageRule::Ignore)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum MessageRule {
    Error,
    Ignore,
}

fn classify_with(body: &str, status: StatusCode, rule: MessageRule) -> Result<DispatchResult, Error> {
    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        return unparseable(body, status);
    };

    match parsed {
        Value::Array(items) => Ok(DispatchResult::Array(items)),
        Value::Object(map) => classify_object(map, rule),
        _ => Err(Error::Decode {
            status: status.to_string(),
        }),
    }
}

fn classify_object(map: Map<String, Value>, rule: MessageRule) -> Result<DispatchResult, Error> {
    if map.contains_key("errorType") {
        return Err(Error::Api {
            message: message_of(&map),
        });
    }
    if rule == MessageRule::Error
        && map.contains_key("message")
        && !map.contains_key(BOOTSTRAP_SENTINEL)
    {
        return Err(Error::Api {
            message: message_of(&map),
        });
    }
    Ok(DispatchResult::Object(map))
}

fn unparseable(body: &str, status: StatusCode) -> Result<DispatchResult, Error> {
    if status == StatusCode::NO_CONTENT {
        return Ok(DispatchResult::Status(status.as_u16()));
    }
    // Empty 2xx bodies (some POSTs) carry no payload but are not failures.
    if status.is_success() && body.trim().is_empty() {
        return Ok(DispatchResult::Status(status.as_u16()));
    }
    Err(Error::Decode {
        status: status.to_string(),
    })
}

fn message_of(map: &Map<String, Value>) -> String {
    match map.get("message") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
