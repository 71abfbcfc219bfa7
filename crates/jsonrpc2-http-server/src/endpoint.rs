//! The `POST /` endpoint: envelope checks, body read, single/batch routing.

use std::sync::Arc;

use bytes::Bytes;
use http::HeaderValue;
use http::header::CONTENT_TYPE;
use http_body::Body;
use http_body_util::{BodyExt, Full, Limited};
use hyper::{Request, Response, StatusCode};
use tracing::{debug, error, warn};

use jsonrpc2_server::{
    BatchOrchestrator, JsonRpcError, JsonRpcErrorObject, JsonRpcMessage, JsonRpcReply, Registry,
    RequestHandler, RequestId, is_batch,
};

use crate::server::ServerConfig;
use crate::validator::validate_http_envelope;

/// Maps HTTP requests to JSON-RPC replies.
///
/// Every JSON-RPC outcome, including protocol errors, is written with status
/// `200`; `204` means there is nothing to write back.
#[derive(Clone)]
pub struct JsonRpcEndpoint {
    config: Arc<ServerConfig>,
    handler: RequestHandler,
    batch: BatchOrchestrator,
}

impl JsonRpcEndpoint {
    pub fn new(config: Arc<ServerConfig>, registry: Arc<Registry>) -> Self {
        let handler = RequestHandler::new(registry);
        Self {
            config,
            batch: BatchOrchestrator::new(handler.clone()),
            handler,
        }
    }

    pub fn registry(&self) -> &Registry {
        self.handler.registry()
    }

    pub async fn handle<B>(&self, request: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        debug!("Handling {} {}", request.method(), request.uri().path());

        if let Err(err) = validate_http_envelope(&request) {
            debug!("Rejected HTTP envelope: {}", err);
            return write_reply(Some(invalid_request(&err)));
        }

        let body = match Limited::new(request.into_body(), self.config.max_body_size)
            .collect()
            .await
        {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                warn!("Failed to read request body: {}", err);
                let error = JsonRpcError::parse_error(JsonRpcErrorObject::detail(&err));
                return write_reply(Some(JsonRpcMessage::error(error).into()));
            }
        };

        let reply = match is_batch(&body) {
            Ok(true) => self.batch.handle_batch(&body).await,
            Ok(false) => self.handler.handle_bytes(&body).await.map(JsonRpcReply::from),
            Err(err) => {
                debug!("Rejected batch body: {}", err);
                Some(invalid_request(&err))
            }
        };

        write_reply(reply)
    }
}

fn invalid_request(error: &impl std::fmt::Display) -> JsonRpcReply {
    let error = JsonRpcError::invalid_request(RequestId::Null, JsonRpcErrorObject::detail(error));
    JsonRpcMessage::error(error).into()
}

fn write_reply(reply: Option<JsonRpcReply>) -> Response<Full<Bytes>> {
    let Some(reply) = reply else {
        return respond(StatusCode::NO_CONTENT, Bytes::new());
    };

    match reply.to_vec() {
        Ok(json) => {
            let mut response = respond(StatusCode::OK, Bytes::from(json));
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(err) => {
            error!("Failed to serialize JSON-RPC reply: {}", err);
            respond(StatusCode::INTERNAL_SERVER_ERROR, Bytes::new())
        }
    }
}

fn respond(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
}
