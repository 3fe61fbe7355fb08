//! Configuration types for the gateway.
//!
//! Everything here is resolved once at startup; the running gateway never changes its
//! webhook or timeout.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use arrrg_derive::CommandLine;
use url::Url;

use crate::error::{Error, Result};

/// Upstream timeout applied to each webhook call.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Path the gateway answers on.
pub const DEFAULT_ROUTE: &str = "/message";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Command-line arguments for the chatgate-gateway server.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct GatewayArgs {
    /// Address to listen on.
    #[arrrg(optional, "Address to listen on (default: 127.0.0.1:8080)", "ADDR")]
    pub bind: Option<String>,

    /// Webhook that produces replies.
    #[arrrg(optional, "Webhook URL (default: $CHATGATE_WEBHOOK_URL)", "URL")]
    pub webhook_url: Option<String>,

    /// Upstream timeout in seconds.
    #[arrrg(optional, "Webhook timeout in seconds (default: 30)", "SECS")]
    pub timeout_secs: Option<u64>,

    /// Path to mount the message endpoint on.
    #[arrrg(optional, "Endpoint path (default: /message)", "PATH")]
    pub route: Option<String>,
}

/// Resolved gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Address the HTTP server binds.
    pub bind_addr: SocketAddr,

    /// Webhook that receives `{"message": ...}`.
    pub webhook_url: Url,

    /// Upstream timeout for a single webhook call.
    pub timeout: Duration,

    /// Path of the message endpoint.
    pub route: String,
}

impl GatewayConfig {
    /// Creates a configuration for `webhook_url` with default values.
    ///
    /// Defaults:
    /// - Bind: 127.0.0.1:8080
    /// - Timeout: 30 seconds
    /// - Route: /message
    pub fn new(webhook_url: Url) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            webhook_url,
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
            route: DEFAULT_ROUTE.to_string(),
        }
    }

    /// Sets the bind address.
    pub fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    /// Sets the upstream timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the endpoint path.
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = route.into();
        self
    }
}

impl TryFrom<GatewayArgs> for GatewayConfig {
    type Error = Error;

    fn try_from(args: GatewayArgs) -> Result<Self> {
        let webhook_url = match args.webhook_url {
            Some(url) => url,
            None => env::var("CHATGATE_WEBHOOK_URL").map_err(|_| {
                Error::validation(
                    "webhook URL not provided and CHATGATE_WEBHOOK_URL environment variable not set",
                    Some("webhook-url".to_string()),
                )
            })?,
        };
        let webhook_url = Url::parse(&webhook_url)?;

        let bind = args.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        let bind_addr = bind.parse::<SocketAddr>().map_err(|_| {
            Error::validation(
                format!("invalid bind address: {bind}"),
                Some("bind".to_string()),
            )
        })?;

        let route = args.route.unwrap_or_else(|| DEFAULT_ROUTE.to_string());
        if !route.starts_with('/') {
            return Err(Error::validation(
                format!("route must start with '/': {route}"),
                Some("route".to_string()),
            ));
        }

        let timeout = match args.timeout_secs {
            Some(0) => {
                return Err(Error::validation(
                    "timeout must be at least one second",
                    Some("timeout-secs".to_string()),
                ));
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_UPSTREAM_TIMEOUT,
        };

        Ok(GatewayConfig {
            bind_addr,
            webhook_url,
            timeout,
            route,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_with_webhook() -> GatewayArgs {
        GatewayArgs {
            webhook_url: Some("http://localhost:5678/webhook/chat".to_string()),
            ..GatewayArgs::default()
        }
    }

    #[test]
    fn default_config() {
        let url = Url::parse("http://localhost:5678/webhook/chat").unwrap();
        let config = GatewayConfig::new(url.clone());
        assert_eq!(config.webhook_url, url);
        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.route, "/message");
    }

    #[test]
    fn config_from_args_defaults() {
        let config = GatewayConfig::try_from(args_with_webhook()).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.timeout, DEFAULT_UPSTREAM_TIMEOUT);
        assert_eq!(config.route, DEFAULT_ROUTE);
        assert_eq!(
            config.webhook_url.as_str(),
            "http://localhost:5678/webhook/chat"
        );
    }

    #[test]
    fn config_from_args_custom() {
        let args = GatewayArgs {
            bind: Some("0.0.0.0:9000".to_string()),
            timeout_secs: Some(5),
            route: Some("/wp-json/chatbot/v1/message".to_string()),
            ..args_with_webhook()
        };
        let config = GatewayConfig::try_from(args).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000".parse().unwrap());
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.route, "/wp-json/chatbot/v1/message");
    }

    #[test]
    fn config_rejects_bad_values() {
        let args = GatewayArgs {
            webhook_url: Some("not a url".to_string()),
            ..GatewayArgs::default()
        };
        assert!(matches!(
            GatewayConfig::try_from(args),
            Err(Error::Url { .. })
        ));

        let args = GatewayArgs {
            bind: Some("localhost".to_string()),
            ..args_with_webhook()
        };
        assert!(GatewayConfig::try_from(args).unwrap_err().is_validation());

        let args = GatewayArgs {
            route: Some("message".to_string()),
            ..args_with_webhook()
        };
        assert!(GatewayConfig::try_from(args).unwrap_err().is_validation());

        let args = GatewayArgs {
            timeout_secs: Some(0),
            ..args_with_webhook()
        };
        assert!(GatewayConfig::try_from(args).unwrap_err().is_validation());
    }

    #[test]
    fn config_builder_pattern() {
        let config = GatewayConfig::new(Url::parse("http://backend/hook").unwrap())
            .with_bind_addr("127.0.0.1:0".parse().unwrap())
            .with_timeout(Duration::from_millis(250))
            .with_route("/chat");
        assert_eq!(config.bind_addr.port(), 0);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.route, "/chat");
    }
}
