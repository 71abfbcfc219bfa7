use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::error_codes::{SERVER_ERROR_END, SERVER_ERROR_START};
use crate::types::{JsonRpcVersion, RequestId};

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError(i64), // -32099 to -32000
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => -32700,
            JsonRpcErrorCode::InvalidRequest => -32600,
            JsonRpcErrorCode::MethodNotFound => -32601,
            JsonRpcErrorCode::InvalidParams => -32602,
            JsonRpcErrorCode::InternalError => -32603,
            JsonRpcErrorCode::ServerError(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::ServerError(_) => "Server error",
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// Returned by [`JsonRpcErrorObject::server_error`] for codes outside the reserved band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("server error code {0} is outside the reserved range -32099..=-32000")]
pub struct ServerErrorCodeOutOfRange(pub i64);

/// JSON-RPC Error object
///
/// The message is always the standard message of the code; anything specific to
/// the failure travels in `data`, which is omitted from the wire when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: JsonRpcErrorCode, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: code.message().to_string(),
            data,
        }
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::ParseError, data)
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidRequest, data)
    }

    pub fn method_not_found(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::MethodNotFound, data)
    }

    pub fn invalid_params(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidParams, data)
    }

    pub fn internal_error(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::InternalError, data)
    }

    /// Implementation-defined server error; `code` must lie in `-32099..=-32000`.
    pub fn server_error(
        code: i64,
        data: Option<Value>,
    ) -> Result<Self, ServerErrorCodeOutOfRange> {
        if !(SERVER_ERROR_START..=SERVER_ERROR_END).contains(&code) {
            return Err(ServerErrorCodeOutOfRange(code));
        }
        Ok(Self::new(JsonRpcErrorCode::ServerError(code), data))
    }

    /// Builds `data` from the display text of a domain error.
    pub fn detail(error: &impl fmt::Display) -> Option<Value> {
        Some(Value::String(error.to_string()))
    }
}

/// JSON-RPC Error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub jsonrpc: JsonRpcVersion,
    pub error: JsonRpcErrorObject,
    pub id: RequestId,
}

impl JsonRpcError {
    pub fn new(id: RequestId, error: JsonRpcErrorObject) -> Self {
        Self {
            jsonrpc: JsonRpcVersion::V2_0,
            error,
            id,
        }
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::new(RequestId::Null, JsonRpcErrorObject::parse_error(data))
    }

    pub fn invalid_request(id: RequestId, data: Option<Value>) -> Self {
        Self::new(id, JsonRpcErrorObject::invalid_request(data))
    }

    pub fn method_not_found(id: RequestId, data: Option<Value>) -> Self {
        Self::new(id, JsonRpcErrorObject::method_not_found(data))
    }

    pub fn invalid_params(id: RequestId, data: Option<Value>) -> Self {
        Self::new(id, JsonRpcErrorObject::invalid_params(data))
    }

    pub fn internal_error(id: RequestId, data: Option<Value>) -> Self {
        Self::new(id, JsonRpcErrorObject::internal_error(data))
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JSON-RPC Error {}: {}",
            self.error.code, self.error.message
        )
    }
}

impl std::error::Error for JsonRpcError {}
