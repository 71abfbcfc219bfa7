use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::JsonRpcError;
use crate::types::{JsonRpcVersion, RequestId};

/// A successful JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: JsonRpcVersion,
    pub result: Value,
    pub id: RequestId,
}

impl JsonRpcResponse {
    pub fn new(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion::V2_0,
            result,
            id,
        }
    }
}

impl<T> From<(RequestId, T)> for JsonRpcResponse
where
    T: Into<Value>,
{
    fn from((id, result): (RequestId, T)) -> Self {
        Self::new(id, result.into())
    }
}

/// Union type that represents either a successful response or an error response
/// This ensures JSON-RPC 2.0 compliance by keeping success and error responses separate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Successful response with result field
    Response(JsonRpcResponse),
    /// Error response with error field
    Error(JsonRpcError),
}

impl JsonRpcMessage {
    /// Create a success message
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::Response(JsonRpcResponse::new(id, result))
    }

    /// Create an error message
    pub fn error(error: JsonRpcError) -> Self {
        Self::Error(error)
    }

    /// Check if this is an error response
    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessage::Error(_))
    }

    /// Get the request ID from either response or error
    pub fn id(&self) -> &RequestId {
        match self {
            JsonRpcMessage::Response(resp) => &resp.id,
            JsonRpcMessage::Error(err) => &err.id,
        }
    }

    /// Error code, if this is an error response
    pub fn error_code(&self) -> Option<i64> {
        match self {
            JsonRpcMessage::Response(_) => None,
            JsonRpcMessage::Error(err) => Some(err.error.code),
        }
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcError> for JsonRpcMessage {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}

/// Everything a transport may have to write back for one body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JsonRpcReply {
    Single(JsonRpcMessage),
    Batch(Vec<JsonRpcMessage>),
}

impl JsonRpcReply {
    pub fn to_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn messages(&self) -> &[JsonRpcMessage] {
        match self {
            JsonRpcReply::Single(message) => std::slice::from_ref(message),
            JsonRpcReply::Batch(messages) => messages,
        }
    }
}

impl From<JsonRpcMessage> for JsonRpcReply {
    fn from(message: JsonRpcMessage) -> Self {
        Self::Single(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JsonRpcErrorObject;
    use serde_json::{from_str, json, to_value};

    #[test]
    fn test_response_serialization() {
        let response = JsonRpcResponse::new(RequestId::Number(1), json!(19));

        assert_eq!(
            to_value(&response).unwrap(),
            json!({"jsonrpc": "2.0", "result": 19, "id": 1})
        );
    }

    #[test]
    fn test_null_result_is_present() {
        let message = JsonRpcMessage::success(RequestId::String("a".to_string()), Value::Null);
        let json = to_value(&message).unwrap();

        assert!(json.as_object().unwrap().contains_key("result"));
        assert!(!json.as_object().unwrap().contains_key("error"));
    }

    #[test]
    fn test_message_roundtrip_picks_variant() {
        let ok: JsonRpcMessage = from_str(r#"{"jsonrpc":"2.0","result":[1,2],"id":5}"#).unwrap();
        assert!(!ok.is_error());
        assert_eq!(ok.id(), &RequestId::Number(5));

        let err: JsonRpcMessage = from_str(
            r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found"},"id":"1"}"#,
        )
        .unwrap();
        assert!(err.is_error());
        assert_eq!(err.error_code(), Some(-32601));
        assert_eq!(err.id(), &RequestId::String("1".to_string()));
    }

    #[test]
    fn test_reply_shapes() {
        let error = JsonRpcMessage::error(JsonRpcError::new(
            RequestId::Null,
            JsonRpcErrorObject::invalid_request(None),
        ));
        let single = JsonRpcReply::from(error.clone());
        assert!(to_value(&single).unwrap().is_object());

        let batch = JsonRpcReply::Batch(vec![error.clone(), error]);
        assert_eq!(to_value(&batch).unwrap().as_array().unwrap().len(), 2);
        assert_eq!(batch.messages().len(), 2);
    }

    #[test]
    fn test_response_from_tuple() {
        let response: JsonRpcResponse = (RequestId::Number(1), json!({"test": true})).into();
        assert_eq!(response.id, RequestId::Number(1));
        assert_eq!(response.result, json!({"test": true}));
    }
}
