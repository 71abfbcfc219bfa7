//! # JSON-RPC 2.0 HTTP Server
//!
//! HTTP transport for [`jsonrpc2_server`]. A single endpoint accepts `POST /`
//! with a JSON-RPC request or batch as body and answers with the JSON-RPC reply.
//!
//! ## Features
//! - Envelope checks (verb and path) reported as JSON-RPC `Invalid Request` errors
//! - Bounded body reads (`max_body_size`)
//! - Empty `204` replies for notifications and all-notification batches
//! - Root cancellation token that stops the listener
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::convert::Infallible;
//! use std::sync::Arc;
//! use jsonrpc2_http_server::JsonRpcHttpServer;
//! use jsonrpc2_server::Service;
//!
//! # async fn demo() -> jsonrpc2_http_server::Result<()> {
//! let server = JsonRpcHttpServer::builder()
//!     .port(8000)
//!     .register(
//!         "",
//!         Service::builder(())
//!             .procedure("Subtract", |_: Arc<()>, a: i64, b: i64| async move {
//!                 Ok::<_, Infallible>(a - b)
//!             })
//!             .build(),
//!     )?
//!     .build();
//!
//! server.run().await
//! # }
//! ```

pub mod endpoint;
pub mod server;
pub mod validator;

#[cfg(test)]
mod tests;

// Re-export main types
pub use endpoint::JsonRpcEndpoint;
pub use server::{JsonRpcHttpServer, JsonRpcHttpServerBuilder, ServerConfig};
pub use validator::{EnvelopeError, validate_http_envelope};

// Re-export foundational types
pub use jsonrpc2_server::{Registry, RegistryError, Service, ServiceBuilder};
pub use tokio_util::sync::CancellationToken;

/// Result type for HTTP JSON-RPC server operations
pub type Result<T> = std::result::Result<T, HttpServerError>;

/// HTTP JSON-RPC server errors
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Registration error: {0}")]
    Registry(#[from] RegistryError),
}
