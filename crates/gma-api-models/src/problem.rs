//! Error bodies returned by the backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// FastAPI-style error document: `{"detail": ...}`.
///
/// `detail` is either a plain string (raised `HTTPException`s) or a list of
/// validation entries carrying a `msg` field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProblemDetails {
    /// Raw detail value.
    #[serde(default)]
    pub detail: Value,
}

impl ProblemDetails {
    /// Flatten the detail into a single human-readable line, if there is one.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match &self.detail {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Value::Array(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .filter_map(|entry| match entry {
                        Value::String(text) => Some(text.clone()),
                        Value::Object(map) => map
                            .get("msg")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        _ => None,
                    })
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("; "))
                }
            }
            _ => None,
        }
    }

    /// Parse a response body, returning its message when it is a problem document.
    #[must_use]
    pub fn message_from_body(body: &str) -> Option<String> {
        serde_json::from_str::<Self>(body)
            .ok()
            .and_then(|problem| problem.message())
    }
}
