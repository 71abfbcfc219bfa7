//! Pure predicates over request bodies and decoded request objects.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::request::JsonRpcRequest;
use crate::types::RequestId;

/// Why a decoded request object is not a valid JSON-RPC request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid JSON RPC version")]
    InvalidJsonVersion,
    #[error("no method provided")]
    MissingMethod,
    #[error("invalid id type")]
    InvalidIdentifierType,
}

/// Malformed outer shape of a body that looks like a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BracketError {
    #[error("invalid batch request: missing closing bracket")]
    MissingClosingBracket,
    #[error("invalid batch request: missing opening bracket")]
    MissingOpeningBracket,
}

/// A request object as decoded from JSON, before any validation.
///
/// Each member keeps the distinction between absent (`None`) and `null`
/// (`Some(Value::Null)`), which matters for `id`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRequest {
    #[serde(default, deserialize_with = "present")]
    pub jsonrpc: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub method: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub params: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub id: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A request that failed validation, populated with whatever could be recovered.
///
/// `request.id` holds the normalized id when the id itself was valid, and
/// `Some(RequestId::Null)` when the id member was present but malformed.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRequest {
    pub request: JsonRpcRequest,
    pub reason: ValidationError,
}

impl RejectedRequest {
    /// The id to echo in the error response.
    pub fn echo_id(&self) -> RequestId {
        self.request.id.clone().unwrap_or(RequestId::Null)
    }
}

const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;
const U64_BOUND: f64 = 18_446_744_073_709_551_616.0;

/// Returns `true` when the body is wrapped in square brackets.
///
/// Leading and trailing whitespace is ignored. A body with only one of the
/// two brackets is reported as malformed rather than treated as a single request.
pub fn is_batch(body: &[u8]) -> Result<bool, BracketError> {
    let mut significant = body.iter().copied().filter(|b| !b.is_ascii_whitespace());
    let first = significant.next();
    let last = significant.next_back().or(first);

    match (first, last) {
        (Some(b'['), Some(b']')) => Ok(true),
        (Some(b'['), _) => Err(BracketError::MissingClosingBracket),
        (_, Some(b']')) => Err(BracketError::MissingOpeningBracket),
        _ => Ok(false),
    }
}

/// Checks an `id` member: strings, integers and `null` are accepted; floats with
/// an integral value are normalized to integers; everything else is rejected.
pub fn normalize_id(raw: &Value) -> Result<RequestId, ValidationError> {
    match raw {
        Value::Null => Ok(RequestId::Null),
        Value::String(s) => Ok(RequestId::String(s.clone())),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(RequestId::Number(i));
            }
            if let Some(u) = n.as_u64() {
                return Ok(RequestId::Unsigned(u));
            }
            match n.as_f64() {
                // 2^63 and 2^64 are exact in f64
                Some(f) if f.fract() == 0.0 && f >= -I64_BOUND && f < I64_BOUND => {
                    Ok(RequestId::Number(f as i64))
                }
                Some(f) if f.fract() == 0.0 && f >= I64_BOUND && f < U64_BOUND => {
                    Ok(RequestId::Unsigned(f as u64))
                }
                _ => Err(ValidationError::InvalidIdentifierType),
            }
        }
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
            Err(ValidationError::InvalidIdentifierType)
        }
    }
}

/// Validates a decoded request object.
///
/// The id is inspected first so that later failures can still echo it, then the
/// protocol version, then the method. The input is consumed and never mutated in
/// place; the normalized id is carried in the returned request.
pub fn validate_request(raw: RawRequest) -> Result<JsonRpcRequest, Box<RejectedRequest>> {
    let (id, id_error) = match raw.id.as_ref().map(normalize_id) {
        None => (None, None),
        Some(Ok(id)) => (Some(id), None),
        Some(Err(reason)) => (Some(RequestId::Null), Some(reason)),
    };

    let jsonrpc = match raw.jsonrpc {
        Some(Value::String(version)) => Some(version),
        _ => None,
    };
    let method = match raw.method {
        Some(Value::String(method)) => method,
        _ => String::new(),
    };

    let reason = if let Some(reason) = id_error {
        Some(reason)
    } else if jsonrpc.as_deref() != Some(crate::JSONRPC_VERSION) {
        Some(ValidationError::InvalidJsonVersion)
    } else if method.is_empty() {
        Some(ValidationError::MissingMethod)
    } else {
        None
    };

    let request = JsonRpcRequest {
        jsonrpc: jsonrpc.unwrap_or_default(),
        method,
        params: raw.params,
        id,
    };

    match reason {
        None => Ok(request),
        Some(reason) => Err(Box::new(RejectedRequest { request, reason })),
    }
}
