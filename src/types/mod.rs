// Public modules
pub mod message;
pub mod proxy_request;
pub mod proxy_response;

// Re-exports
pub use message::{Message, Sender};
pub use proxy_request::ProxyRequest;
pub use proxy_response::ProxyResponse;
