//! Transport-level checks made before the body is looked at.

use hyper::{Method, Request};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("http method should be POST, got {0}")]
    InvalidHttpMethod(String),

    #[error("http request should target /, got {0}")]
    InvalidPath(String),
}

/// Accepts only `POST /`.
pub fn validate_http_envelope<B>(request: &Request<B>) -> Result<(), EnvelopeError> {
    if request.method() != Method::POST {
        return Err(EnvelopeError::InvalidHttpMethod(request.method().to_string()));
    }

    let path = request.uri().path();
    if path != "/" {
        return Err(EnvelopeError::InvalidPath(path.to_string()));
    }

    Ok(())
}
