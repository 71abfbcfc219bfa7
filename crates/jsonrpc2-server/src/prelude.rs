//! # JSON-RPC Server Prelude
//!
//! Re-exports of the types needed to declare services and serve requests.
//!
//! ```rust
//! use jsonrpc2_server::prelude::*;
//! ```

// Wire types
pub use crate::error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject};
pub use crate::request::JsonRpcRequest;
pub use crate::response::{JsonRpcMessage, JsonRpcReply, JsonRpcResponse};
pub use crate::types::{JsonRpcVersion, RequestId};

// Services and dispatch
pub use crate::batch::BatchOrchestrator;
pub use crate::handler::RequestHandler;
pub use crate::registry::{DispatchError, Registry, RegistryError};
pub use crate::service::{Service, ServiceBuilder};

// Standard error codes
pub use crate::error_codes::*;
