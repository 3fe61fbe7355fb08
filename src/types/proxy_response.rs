use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The uniform envelope returned by the gateway.
///
/// On success `data` holds the backend payload unmodified. On failure it holds a short
/// human-readable string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxyResponse {
    /// Whether the exchange with the backend succeeded.
    pub success: bool,

    /// The backend payload, or the failure description.
    pub data: Value,
}

impl ProxyResponse {
    /// Wrap a parsed backend payload.
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
        }
    }

    /// Report a failure with a human-readable description.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::String(message.into()),
        }
    }

    /// The failure description, if `data` is a string.
    pub fn error_text(&self) -> Option<&str> {
        if self.success {
            None
        } else {
            self.data.as_str()
        }
    }
}
