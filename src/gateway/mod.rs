//! The proxy gateway.
//!
//! A stateless request handler that sits between the chat client and the conversational
//! webhook. Each request is handled independently:
//!
//! 1. the `message` field is extracted and sanitized; empty text is rejected with 400
//! 2. `{"message": ...}` is posted to the webhook once, with a bounded timeout
//! 3. the webhook body must parse as JSON
//! 4. the parsed payload is wrapped unmodified in a success envelope
//!
//! Failures are reported once with a fixed, non-sensitive message per failure kind.
//! There are no retries.

mod config;
mod sanitize;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use bytes::Bytes;
use reqwest::Client as ReqwestClient;
use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{
    GATEWAY_EMPTY_MESSAGES, GATEWAY_REQUESTS, GATEWAY_UPSTREAM_CONNECT_ERRORS,
    GATEWAY_UPSTREAM_DURATION, GATEWAY_UPSTREAM_INVALID_RESPONSES,
};
use crate::types::{ProxyRequest, ProxyResponse};

pub use config::{DEFAULT_ROUTE, DEFAULT_UPSTREAM_TIMEOUT, GatewayArgs, GatewayConfig};
pub use sanitize::sanitize_text_field;

/// Reported when the sanitized message is empty.
pub const EMPTY_MESSAGE: &str = "Message is empty.";

/// Reported when the webhook call could not complete.
pub const CONNECT_FAILED: &str = "Failed to connect to the webhook.";

/// Reported when the webhook body is not JSON.
pub const INVALID_RESPONSE: &str = "Invalid response from webhook.";

/// Status and envelope produced for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayReply {
    /// HTTP status to answer with.
    pub status: StatusCode,
    /// The envelope body.
    pub body: ProxyResponse,
}

impl GatewayReply {
    fn success(data: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: ProxyResponse::ok(data),
        }
    }

    /// Map an error onto its stable client-facing envelope.
    pub fn from_error(err: &Error) -> Self {
        let (status, message) = if err.is_validation() {
            (StatusCode::BAD_REQUEST, EMPTY_MESSAGE)
        } else if err.is_serialization() {
            (StatusCode::INTERNAL_SERVER_ERROR, INVALID_RESPONSE)
        } else {
            (StatusCode::INTERNAL_SERVER_ERROR, CONNECT_FAILED)
        };
        Self {
            status,
            body: ProxyResponse::failure(message),
        }
    }
}

impl IntoResponse for GatewayReply {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Forwards chat messages to the conversational webhook.
#[derive(Debug, Clone)]
pub struct Gateway {
    client: ReqwestClient,
    webhook_url: Url,
    timeout: Duration,
}

impl Gateway {
    /// Create a gateway for `webhook_url` with the given upstream timeout.
    pub fn new(webhook_url: Url, timeout: Duration) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;
        Ok(Self {
            client,
            webhook_url,
            timeout,
        })
    }

    /// Create a gateway from resolved configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        Self::new(config.webhook_url.clone(), config.timeout)
    }

    /// The webhook this gateway forwards to.
    pub fn webhook_url(&self) -> &Url {
        &self.webhook_url
    }

    /// Handle one raw request body and produce the reply to send back.
    pub async fn handle(&self, body: &[u8]) -> GatewayReply {
        GATEWAY_REQUESTS.click();
        let message = sanitize_text_field(&extract_message(body));
        match self.process(&message).await {
            Ok(data) => {
                tracing::info!(chars = message.chars().count(), "forwarded message");
                GatewayReply::success(data)
            }
            Err(err) => {
                let reply = GatewayReply::from_error(&err);
                if err.is_validation() {
                    GATEWAY_EMPTY_MESSAGES.click();
                    tracing::info!("rejected empty message");
                } else {
                    if err.is_serialization() {
                        GATEWAY_UPSTREAM_INVALID_RESPONSES.click();
                    } else {
                        GATEWAY_UPSTREAM_CONNECT_ERRORS.click();
                    }
                    tracing::warn!(error = %err, status = reply.status.as_u16(), "webhook exchange failed");
                }
                reply
            }
        }
    }

    async fn process(&self, message: &str) -> Result<Value> {
        if message.is_empty() {
            return Err(Error::validation(
                EMPTY_MESSAGE,
                Some("message".to_string()),
            ));
        }
        self.forward(message).await
    }

    /// Post `message` to the webhook once and parse its body as JSON.
    ///
    /// The body is parsed from its raw bytes; invalid UTF-8 is an invalid response.
    pub async fn forward(&self, message: &str) -> Result<Value> {
        let start = Instant::now();
        let body = self.exchange(message).await;
        GATEWAY_UPSTREAM_DURATION.add(start.elapsed().as_secs_f64());
        let body = body?;

        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Null) => Err(Error::serialization("webhook returned null", None)),
            Ok(data) => Ok(data),
            Err(e) => Err(Error::serialization(
                format!("Failed to parse webhook response: {}", e),
                Some(Box::new(e)),
            )),
        }
    }

    async fn exchange(&self, message: &str) -> Result<Bytes> {
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&ProxyRequest::new(message))
            .send()
            .await
            .map_err(|e| Error::from_transport(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "webhook answered with non-success status");
        }

        response
            .bytes()
            .await
            .map_err(|e| Error::from_transport(e, self.timeout))
    }
}

/// Build the router that serves `POST <route>` with `gateway`.
pub fn router(gateway: Arc<Gateway>, route: &str) -> Router {
    Router::new()
        .route(route, post(message_handler))
        .with_state(gateway)
}

async fn message_handler(State(gateway): State<Arc<Gateway>>, body: Bytes) -> GatewayReply {
    gateway.handle(&body).await
}

/// Pull the `message` field out of a request body.
///
/// Scalars are taken as text the way a loosely-typed form field would be; anything
/// else, including a body that is not a JSON object, yields empty text.
fn extract_message(body: &[u8]) -> String {
    let Ok(Value::Object(fields)) = serde_json::from_slice::<Value>(body) else {
        return String::new();
    };
    match fields.get("message") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(true)) => "1".to_string(),
        _ => String::new(),
    }
}
