//! HTTP server hosting the chat proxy gateway.
//!
//! Accepts `POST /message` with `{"message": "..."}`, forwards the text to the
//! configured webhook and answers with `{"success": ..., "data": ...}`.
//!
//! # Usage
//!
//! ```bash
//! # Webhook from the environment
//! CHATGATE_WEBHOOK_URL=http://localhost:5678/webhook/chat chatgate-gateway
//!
//! # Everything on the command line
//! chatgate-gateway --bind 0.0.0.0:8080 --webhook-url http://n8n:5678/webhook/chat --timeout-secs 30
//! ```
//!
//! Logging is controlled with `RUST_LOG` (default `info`).

use std::sync::Arc;

use arrrg::CommandLine;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use chatgate::Gateway;
use chatgate::gateway::{GatewayArgs, GatewayConfig, router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (args, _) = GatewayArgs::from_command_line_relaxed("chatgate-gateway [OPTIONS]");
    let config = GatewayConfig::try_from(args)?;
    let gateway = Arc::new(Gateway::from_config(&config)?);
    let app = router(gateway, &config.route);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        route = %config.route,
        webhook = %config.webhook_url,
        timeout_secs = config.timeout.as_secs_f64(),
        "gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for shutdown signal");
            }
        })
        .await?;

    tracing::info!("gateway stopped");
    Ok(())
}
