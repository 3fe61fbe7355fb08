// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod gateway;
pub mod render;
pub mod types;
pub mod utils;

mod observability;

// Re-exports
pub use client::{GatewayClient, Transport};
pub use error::{Error, Result};
pub use gateway::{Gateway, GatewayConfig, GatewayReply};
pub use observability::register_biometrics;
pub use types::*;
