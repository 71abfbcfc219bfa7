use serde::Serialize;
use serde_json::Value;

use crate::types::RequestId;

/// A validated JSON-RPC request.
///
/// Requests reaching the handler have already passed validation: `jsonrpc` is
/// `"2.0"`, `method` is non-empty and `id` is normalized. A rejected request is
/// surfaced partially populated through [`crate::validator::RejectedRequest`].
///
/// The same type is used on the client side to build outgoing requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
}

impl JsonRpcRequest {
    /// Create a notification for `method`; add an id with [`with_id`](Self::with_id).
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: crate::JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: None,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<RequestId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Explicit `"id": null`, which is a call rather than a notification.
    pub fn with_null_id(mut self) -> Self {
        self.id = Some(RequestId::Null);
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Serialize any value as the request parameters.
    pub fn with_serialized_params<T: Serialize>(self, params: &T) -> serde_json::Result<Self> {
        Ok(self.with_params(serde_json::to_value(params)?))
    }

    /// A request without an `id` member expects no response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
