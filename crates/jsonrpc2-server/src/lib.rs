//! # JSON-RPC 2.0 Server Core
//!
//! A transport-agnostic JSON-RPC 2.0 server implementation. This crate owns the
//! request lifecycle (parse, validate, resolve, coerce, invoke, respond), typed
//! procedure dispatch and concurrent batch execution. Transports such as
//! `jsonrpc2-http-server` feed raw bodies in and write the replies out.
//!
//! ## Features
//! - Full JSON-RPC 2.0 error taxonomy, including the `-32000..-32099` server band
//! - Namespaced method names (`service_procedure`) resolved to registered services
//! - Typed procedures: dynamic `params` are coerced into the declared argument types
//! - Notifications never produce output, including error output
//! - Batches run every element on its own task
//!
//! ## Example
//!
//! ```rust
//! use std::convert::Infallible;
//! use std::sync::Arc;
//! use jsonrpc2_server::{Registry, RequestHandler, Service};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let arithmetic = Service::builder(())
//!     .procedure("Subtract", |_: Arc<()>, a: i64, b: i64| async move {
//!         Ok::<_, Infallible>(a - b)
//!     })
//!     .build();
//!
//! let mut registry = Registry::new();
//! registry.register("", arithmetic)?;
//!
//! let handler = RequestHandler::new(Arc::new(registry));
//! let reply = handler
//!     .handle_bytes(br#"{"jsonrpc":"2.0","method":"subtract","params":[42,23],"id":1}"#)
//!     .await;
//! assert!(reply.is_some());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod error;
pub mod handler;
pub mod method;
pub mod params;
pub mod parse;
pub mod prelude;
pub mod procedure;
pub mod registry;
pub mod request;
pub mod response;
pub mod service;
pub mod types;
pub mod validator;

// Re-export main types
pub use batch::BatchOrchestrator;
pub use error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, ServerErrorCodeOutOfRange};
pub use handler::RequestHandler;
pub use method::{MethodFormatError, MethodPath, parse_method};
pub use params::{Argument, CoercionError, ParamShape, ParamType, coerce_arguments};
pub use parse::{BatchParseError, ParseError, parse_batch, parse_request};
pub use procedure::{IntoProcedure, Procedure, ProcedureFuture};
pub use registry::{DispatchError, ProcedureDescriptor, Registry, RegistryError};
pub use request::JsonRpcRequest;
pub use response::{JsonRpcMessage, JsonRpcReply, JsonRpcResponse};
pub use service::{Service, ServiceBuilder};
pub use types::{JsonRpcVersion, RequestId};
pub use validator::{BracketError, RawRequest, RejectedRequest, ValidationError, is_batch};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;
}
