//! Byte-level decoding of single requests and batches.

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

use crate::request::JsonRpcRequest;
use crate::types::RequestId;
use crate::validator::{RawRequest, RejectedRequest, validate_request};

/// Failure to turn a body into a [`JsonRpcRequest`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// The body is not JSON at all.
    #[error("invalid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    /// Valid JSON, but not an object.
    #[error("request must be a JSON object")]
    NotAnObject,

    /// A request object that failed validation; carries what could be recovered.
    #[error("{}", .0.reason)]
    Invalid(Box<RejectedRequest>),
}

impl ParseError {
    /// The id to echo in the error response: the request's own id when it was
    /// recovered and valid, `null` otherwise.
    pub fn echo_id(&self) -> RequestId {
        match self {
            ParseError::Invalid(rejected) => rejected.echo_id(),
            ParseError::Syntax(_) | ParseError::NotAnObject => RequestId::Null,
        }
    }
}

/// Failure to split a batch body into its elements.
#[derive(Debug, Error)]
pub enum BatchParseError {
    #[error("invalid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("empty batch")]
    Empty,
}

/// Decodes and validates a single request body.
pub fn parse_request(body: &[u8]) -> Result<JsonRpcRequest, ParseError> {
    let value: Value = serde_json::from_slice(body)?;
    if !value.is_object() {
        return Err(ParseError::NotAnObject);
    }

    let raw: RawRequest = serde_json::from_value(value)?;
    validate_request(raw).map_err(ParseError::Invalid)
}

/// Splits a batch body into one raw blob per element, in order.
///
/// Elements are not validated here so that each one can fail on its own.
pub fn parse_batch(body: &[u8]) -> Result<Vec<Bytes>, BatchParseError> {
    let elements: Vec<Value> = serde_json::from_slice(body)?;
    if elements.is_empty() {
        return Err(BatchParseError::Empty);
    }

    elements
        .iter()
        .map(|element| Ok(Bytes::from(serde_json::to_vec(element)?)))
        .collect()
}
