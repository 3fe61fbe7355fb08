use serde::{Deserialize, Serialize};

/// Body sent to the gateway, and by the gateway to the webhook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyRequest {
    /// The user's text.
    pub message: String,
}

impl ProxyRequest {
    /// Create a new `ProxyRequest`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn proxy_request_serialization() {
        let request = ProxyRequest::new("Hi");
        assert_eq!(to_value(&request).unwrap(), json!({"message": "Hi"}));
    }
}
