use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Application-level failure carried by an envelope with `success: false`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Error)]
#[error("request rejected by server: {}", .message.as_deref().unwrap_or("no reason given"))]
pub struct Rejection {
    pub message: Option<String>,
}

impl Rejection {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// The server reports errors either as a bare string or as an object with
    /// a `message` field; anything else is kept as its JSON text.
    pub fn from_error_value(error: Option<Value>) -> Self {
        let message = match error {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text),
            Some(Value::Object(map)) => match map.get("message") {
                Some(Value::String(text)) => Some(text.clone()),
                _ => Some(Value::Object(map).to_string()),
            },
            Some(other) => Some(other.to_string()),
        };
        Self { message }
    }
}
