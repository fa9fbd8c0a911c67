use citas_core::ErrorDescriptor;
use citas_core::error_code;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("transport error: {0}")]
    Transport(String),
}

impl ApiError {
    /// Message carried by a server error body.
    ///
    /// JSON bodies are searched for a `message` (or `Message`/`error`)
    /// string; anything else is returned as trimmed text.
    pub fn wire_message(&self) -> Option<String> {
        let Self::Server { body, .. } = self else {
            return None;
        };
        let body = body.trim();
        if body.is_empty() {
            return None;
        }
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(serde_json::Value::Object(map)) => ["message", "Message", "error", "title"]
                .iter()
                .find_map(|k| map.get(*k).and_then(|v| v.as_str()))
                .map(str::to_string),
            Ok(serde_json::Value::String(s)) => Some(s),
            _ => Some(body.to_string()),
        }
    }

    /// Interpret this failure for display.
    pub fn describe(&self) -> ErrorDescriptor {
        match self.wire_message() {
            Some(message) => error_code::parse(Some(&message)),
            None => ErrorDescriptor::unknown(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}
