//! Lifecycle of a single request: parse, validate, resolve, coerce, invoke, respond.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{JsonRpcError, JsonRpcErrorObject};
use crate::method::parse_method;
use crate::params::coerce_arguments;
use crate::parse::{ParseError, parse_request};
use crate::registry::{DispatchError, Registry};
use crate::request::JsonRpcRequest;
use crate::response::JsonRpcMessage;
use crate::types::RequestId;

/// Turns request bodies into responses using a shared, read-only registry.
///
/// Cloning is cheap; every clone dispatches into the same registry.
#[derive(Clone)]
pub struct RequestHandler {
    registry: Arc<Registry>,
}

impl RequestHandler {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Handles one request body.
    ///
    /// Returns `None` for notifications, whether they succeeded or not.
    pub async fn handle_bytes(&self, body: &[u8]) -> Option<JsonRpcMessage> {
        match parse_request(body) {
            Ok(request) => self.handle_request(request).await,
            Err(error) => {
                debug!(error = %error, "Rejected request");
                Some(JsonRpcMessage::error(parse_failure(&error)))
            }
        }
    }

    /// Handles a request that already passed validation.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcMessage> {
        let JsonRpcRequest {
            method, params, id, ..
        } = request;

        let outcome = self.process(&method, params).await;
        match (id, outcome) {
            (Some(id), Ok(result)) => {
                debug!(method = %method, id = %id, "Request completed");
                Some(JsonRpcMessage::success(id, result))
            }
            (Some(id), Err(error)) => {
                debug!(method = %method, id = %id, code = error.code, "Request failed");
                Some(JsonRpcMessage::error(JsonRpcError::new(id, error)))
            }
            (None, Ok(_)) => {
                debug!(method = %method, "Notification completed");
                None
            }
            (None, Err(error)) => {
                warn!(
                    method = %method,
                    code = error.code,
                    message = %error.message,
                    "Notification failed; no response is sent"
                );
                None
            }
        }
    }

    async fn process(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, JsonRpcErrorObject> {
        let path = parse_method(method)
            .map_err(|e| JsonRpcErrorObject::invalid_request(JsonRpcErrorObject::detail(&e)))?;
        debug!(method, service = %path.service, procedure = %path.procedure, "Method resolved");

        let descriptor = self
            .registry
            .lookup(&path.service, &path.procedure)
            .map_err(|e| dispatch_error_object(&e))?;

        let args = coerce_arguments(descriptor.params(), params)
            .map_err(|e| JsonRpcErrorObject::invalid_params(JsonRpcErrorObject::detail(&e)))?;

        descriptor
            .invoke(args)
            .await
            .map_err(|e| dispatch_error_object(&e))
    }
}

/// Error response for a body that did not yield a valid request.
fn parse_failure(error: &ParseError) -> JsonRpcError {
    let data = JsonRpcErrorObject::detail(error);
    match error {
        ParseError::Syntax(_) => JsonRpcError::parse_error(data),
        ParseError::NotAnObject | ParseError::Invalid(_) => {
            JsonRpcError::invalid_request(error.echo_id(), data)
        }
    }
}

fn dispatch_error_object(error: &DispatchError) -> JsonRpcErrorObject {
    let data = JsonRpcErrorObject::detail(error);
    match error {
        DispatchError::NonExistentService(_) | DispatchError::NonExistentProcedure { .. } => {
            JsonRpcErrorObject::method_not_found(data)
        }
        DispatchError::InvalidArgumentType { .. } | DispatchError::InvalidArgumentsCount { .. } => {
            JsonRpcErrorObject::invalid_params(data)
        }
        DispatchError::Procedure(_)
        | DispatchError::ResultEncoding(_)
        | DispatchError::Panicked => JsonRpcErrorObject::internal_error(data),
    }
}

/// Error response for a batch element whose id could not be recovered.
pub(crate) fn invalid_request(data: Option<serde_json::Value>) -> JsonRpcMessage {
    JsonRpcMessage::error(JsonRpcError::invalid_request(RequestId::Null, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::Service;
    use serde::Deserialize;
    use serde_json::{Value, json};
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Deserialize, schemars::JsonSchema)]
    struct Operands {
        minuend: i64,
        subtrahend: i64,
    }

    #[derive(Default)]
    struct Updates {
        seen: AtomicUsize,
    }

    fn handler() -> (RequestHandler, Arc<Updates>) {
        let updates = Arc::new(Updates::default());

        let root = Service::from_shared(Arc::clone(&updates))
            .procedure("Subtract", |_: Arc<Updates>, a: i64, b: i64| async move {
                Ok::<_, Infallible>(a - b)
            })
            .procedure("Update", |updates: Arc<Updates>, values: Vec<i64>| async move {
                updates.seen.fetch_add(values.len(), Ordering::SeqCst);
                Ok::<_, Infallible>(())
            })
            .procedure("Fail", |_: Arc<Updates>| async move {
                Err::<(), _>("database unavailable")
            })
            .procedure("Echo", |_: Arc<Updates>, text: String| async move {
                Ok::<_, Infallible>(text)
            })
            .procedure("Inspect", |_: Arc<Updates>, value: Value| async move {
                Ok::<_, Infallible>(value)
            })
            .build();

        let arith = Service::builder(())
            .procedure("Subtract", |_: Arc<()>, ops: Operands| async move {
                Ok::<_, Infallible>(ops.minuend - ops.subtrahend)
            })
            .build();

        let mut registry = Registry::new();
        registry.register("", root).unwrap();
        registry.register("arith", arith).unwrap();
        (RequestHandler::new(Arc::new(registry)), updates)
    }

    async fn call(handler: &RequestHandler, body: Value) -> Value {
        let reply = handler.handle_bytes(body.to_string().as_bytes()).await.unwrap();
        serde_json::to_value(reply).unwrap()
    }

    #[tokio::test]
    async fn test_positional_params() {
        let (handler, _) = handler();
        let reply = call(
            &handler,
            json!({"jsonrpc": "2.0", "method": "subtract", "params": [42, 23], "id": 1}),
        )
        .await;
        assert_eq!(reply, json!({"jsonrpc": "2.0", "result": 19, "id": 1}));
    }

    #[tokio::test]
    async fn test_named_params() {
        let (handler, _) = handler();
        let reply = call(
            &handler,
            json!({"jsonrpc": "2.0", "method": "arith_subtract", "params": {"subtrahend": 23, "minuend": 42}, "id": 3}),
        )
        .await;
        assert_eq!(reply, json!({"jsonrpc": "2.0", "result": 19, "id": 3}));
    }

    #[tokio::test]
    async fn test_notification_runs_without_reply() {
        let (handler, updates) = handler();
        let reply = handler
            .handle_bytes(br#"{"jsonrpc": "2.0", "method": "update", "params": [1, 2, 3, 4, 5]}"#)
            .await;

        assert!(reply.is_none());
        assert_eq!(updates.seen.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_failed_notification_is_silent() {
        let (handler, _) = handler();
        for body in [
            json!({"jsonrpc": "2.0", "method": "foobar"}),
            json!({"jsonrpc": "2.0", "method": "subtract", "params": "x"}),
            json!({"jsonrpc": "2.0", "method": "fail"}),
            json!({"jsonrpc": "2.0", "method": "a_b_c"}),
        ] {
            assert!(handler.handle_bytes(body.to_string().as_bytes()).await.is_none());
        }
    }

    #[tokio::test]
    async fn test_null_id_is_not_a_notification() {
        let (handler, _) = handler();
        let reply = call(
            &handler,
            json!({"jsonrpc": "2.0", "method": "subtract", "params": [1, 1], "id": null}),
        )
        .await;
        assert_eq!(reply, json!({"jsonrpc": "2.0", "result": 0, "id": null}));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (handler, _) = handler();
        let reply = call(&handler, json!({"jsonrpc": "2.0", "method": "foobar", "id": "1"})).await;
        assert_eq!(reply["error"]["code"], -32601);
        assert_eq!(reply["error"]["message"], "Method not found");
        assert_eq!(reply["id"], "1");

        let reply = call(&handler, json!({"jsonrpc": "2.0", "method": "eth_call", "id": 2})).await;
        assert_eq!(reply["error"]["code"], -32601);
        assert_eq!(reply["id"], 2);
    }

    #[tokio::test]
    async fn test_too_many_underscores() {
        let (handler, _) = handler();
        let reply = call(&handler, json!({"jsonrpc": "2.0", "method": "a_b_c", "id": 9})).await;
        assert_eq!(reply["error"]["code"], -32600);
        assert_eq!(reply["id"], 9);
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let (handler, _) = handler();
        let reply = handler
            .handle_bytes(br#"{"jsonrpc": "2.0", "method": "foobar, "params": "bar", "baz]"#)
            .await
            .unwrap();
        let reply = serde_json::to_value(reply).unwrap();

        assert_eq!(reply["error"]["code"], -32700);
        assert_eq!(reply["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_invalid_request_objects() {
        let (handler, _) = handler();

        let reply = call(&handler, json!({"jsonrpc": "1.0", "method": "subtract", "id": 5})).await;
        assert_eq!(reply["error"]["code"], -32600);
        assert_eq!(reply["id"], 5);

        let reply = call(
            &handler,
            json!({"jsonrpc": "2.0", "method": "subtract", "id": 4.5}),
        )
        .await;
        assert_eq!(reply["error"]["code"], -32600);
        assert_eq!(reply["id"], Value::Null);

        // Invalid even without an id, so it still gets a reply.
        let reply = call(&handler, json!({"jsonrpc": "2.0", "params": [1]})).await;
        assert_eq!(reply["error"]["code"], -32600);
        assert_eq!(reply["id"], Value::Null);

        let reply = call(&handler, json!(1)).await;
        assert_eq!(reply["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_integral_float_id_is_normalized() {
        let (handler, _) = handler();
        let reply = call(
            &handler,
            json!({"jsonrpc": "2.0", "method": "subtract", "params": [3, 1], "id": 4.0}),
        )
        .await;
        assert_eq!(reply, json!({"jsonrpc": "2.0", "result": 2, "id": 4}));
    }

    #[tokio::test]
    async fn test_invalid_params() {
        let (handler, _) = handler();
        for params in [json!([1]), json!([1, 2, 3]), json!({"a": 1}), json!([1, "two"])] {
            let reply = call(
                &handler,
                json!({"jsonrpc": "2.0", "method": "subtract", "params": params, "id": 7}),
            )
            .await;
            assert_eq!(reply["error"]["code"], -32602, "params: {params}");
            assert_eq!(reply["error"]["message"], "Invalid params");
            assert_eq!(reply["id"], 7);
        }
    }

    #[tokio::test]
    async fn test_scalar_params_are_invalid() {
        let (handler, _) = handler();
        let reply = call(
            &handler,
            json!({"jsonrpc": "2.0", "method": "echo", "params": "foo", "id": 1}),
        )
        .await;
        assert_eq!(reply["error"]["code"], -32602);
        assert_eq!(reply["id"], 1);

        let reply = call(&handler, json!({"jsonrpc": "2.0", "method": "echo", "id": 2})).await;
        assert_eq!(reply["error"]["code"], -32602);

        let reply = call(
            &handler,
            json!({"jsonrpc": "2.0", "method": "echo", "params": ["foo"], "id": 3}),
        )
        .await;
        assert_eq!(reply, json!({"jsonrpc": "2.0", "result": "foo", "id": 3}));
    }

    #[tokio::test]
    async fn test_dynamic_formal_receives_whole_params() {
        let (handler, _) = handler();
        let reply = call(
            &handler,
            json!({"jsonrpc": "2.0", "method": "inspect", "params": [1, 2, 3], "id": 1}),
        )
        .await;
        assert_eq!(reply, json!({"jsonrpc": "2.0", "result": [1, 2, 3], "id": 1}));
    }

    #[tokio::test]
    async fn test_unsigned_id_is_echoed() {
        let (handler, _) = handler();
        let reply = call(
            &handler,
            json!({"jsonrpc": "2.0", "method": "subtract", "params": [3, 1], "id": u64::MAX}),
        )
        .await;

        assert_eq!(reply["result"], 2);
        assert_eq!(reply["id"], json!(u64::MAX));
    }

    #[tokio::test]
    async fn test_procedure_failure_is_internal_error() {
        let (handler, _) = handler();
        let reply = call(&handler, json!({"jsonrpc": "2.0", "method": "fail", "id": "f"})).await;

        assert_eq!(
            reply,
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32603, "message": "Internal error", "data": "database unavailable"},
                "id": "f"
            })
        );
    }
}
