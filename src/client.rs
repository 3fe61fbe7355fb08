use std::env;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, header};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{ProxyRequest, ProxyResponse};

/// Gateway endpoint used when neither an argument nor CHATGATE_GATEWAY_URL is set.
pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:8080/message";

/// Finite client-side bound on one turn; longer than the gateway's upstream timeout so
/// that the gateway's own failure envelope normally wins the race.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(35);

const GENERIC_FAILURE: &str = "Failed to get response from server.";

/// Carries one user message to the gateway and returns the envelope's `data`.
///
/// The chat session is generic over this so tests can script the exchange.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send `message` and return the backend payload on success.
    async fn send_message(&self, message: &str) -> Result<Value>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send_message(&self, message: &str) -> Result<Value> {
        (**self).send_message(message).await
    }
}

/// HTTP client for the proxy gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: ReqwestClient,
    gateway_url: String,
    timeout: Duration,
}

impl GatewayClient {
    /// Create a new gateway client.
    ///
    /// The URL can be provided directly or read from the CHATGATE_GATEWAY_URL
    /// environment variable; it defaults to [`DEFAULT_GATEWAY_URL`].
    pub fn new(gateway_url: Option<String>) -> Result<Self> {
        Self::with_options(gateway_url, None)
    }

    /// Create a new client with a custom timeout.
    pub fn with_options(gateway_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let gateway_url = gateway_url
            .or_else(|| env::var("CHATGATE_GATEWAY_URL").ok())
            .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string());
        url::Url::parse(&gateway_url)?;

        let timeout = timeout.unwrap_or(DEFAULT_CLIENT_TIMEOUT);
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
            gateway_url,
            timeout,
        })
    }

    /// The endpoint this client posts to.
    pub fn gateway_url(&self) -> &str {
        &self.gateway_url
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Post one message to the gateway and unwrap its envelope.
    pub async fn send(&self, message: &str) -> Result<Value> {
        let response = self
            .client
            .post(&self.gateway_url)
            .headers(Self::default_headers())
            .json(&ProxyRequest::new(message))
            .send()
            .await
            .map_err(|e| Error::from_transport(e, self.timeout))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::from_transport(e, self.timeout))?;

        let envelope = match serde_json::from_slice::<ProxyResponse>(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(Error::serialization(
                    format!("Failed to parse gateway response: {}", e),
                    Some(Box::new(e)),
                ));
            }
            Err(_) => return Err(Error::api(status.as_u16(), GENERIC_FAILURE)),
        };

        if !status.is_success() || !envelope.success {
            let message = envelope.error_text().unwrap_or(GENERIC_FAILURE);
            return Err(Error::api(status.as_u16(), message));
        }

        Ok(envelope.data)
    }
}

#[async_trait::async_trait]
impl Transport for GatewayClient {
    async fn send_message(&self, message: &str) -> Result<Value> {
        self.send(message).await
    }
}
