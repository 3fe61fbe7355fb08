//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::client::DEFAULT_CLIENT_TIMEOUT;

/// Bot message shown when a session starts.
pub const DEFAULT_GREETING: &str = "Hello! How can I help you today?";

/// Command-line arguments for the chatgate-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Gateway endpoint to post messages to.
    #[arrrg(
        optional,
        "Gateway URL (default: $CHATGATE_GATEWAY_URL or http://127.0.0.1:8080/message)",
        "URL"
    )]
    pub gateway_url: Option<String>,

    /// Client-side timeout for one turn.
    #[arrrg(optional, "Seconds to wait for the gateway (default: 35)", "SECS")]
    pub timeout_secs: Option<u64>,

    /// Start without the greeting message.
    #[arrrg(flag, "Do not show the greeting message")]
    pub no_greeting: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Gateway endpoint; `None` defers to CHATGATE_GATEWAY_URL or the built-in default.
    pub gateway_url: Option<String>,

    /// How long one turn may wait for the gateway before failing.
    pub timeout: Duration,

    /// Bot message appended when the session starts, if any.
    pub greeting: Option<String>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Gateway: resolved by the client
    /// - Timeout: 35 seconds
    /// - Greeting: "Hello! How can I help you today?"
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            gateway_url: None,
            timeout: DEFAULT_CLIENT_TIMEOUT,
            greeting: Some(DEFAULT_GREETING.to_string()),
            use_color: true,
        }
    }

    /// Sets the gateway endpoint.
    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    /// Sets the client-side timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the greeting message.
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = Some(greeting.into());
        self
    }

    /// Starts the session with an empty transcript.
    pub fn without_greeting(mut self) -> Self {
        self.greeting = None;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let defaults = ChatConfig::new();
        ChatConfig {
            gateway_url: args.gateway_url,
            timeout: args
                .timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            greeting: if args.no_greeting {
                None
            } else {
                defaults.greeting
            },
            use_color: !args.no_color,
        }
    }
}
