//! Concurrent execution of batch requests.

use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::error::{JsonRpcError, JsonRpcErrorObject};
use crate::handler::{RequestHandler, invalid_request};
use crate::parse::{BatchParseError, parse_batch};
use crate::response::{JsonRpcMessage, JsonRpcReply};

/// Runs every element of a batch on its own task.
///
/// Responses are collected in completion order; callers correlate them by id.
#[derive(Clone)]
pub struct BatchOrchestrator {
    handler: RequestHandler,
}

impl BatchOrchestrator {
    pub fn new(handler: RequestHandler) -> Self {
        Self { handler }
    }

    /// Handles a batch body.
    ///
    /// Returns `None` when every element was a notification. An empty or
    /// malformed batch yields a single error object rather than an array.
    pub async fn handle_batch(&self, body: &[u8]) -> Option<JsonRpcReply> {
        let elements = match parse_batch(body) {
            Ok(elements) => elements,
            Err(BatchParseError::Empty) => {
                debug!("Rejected empty batch");
                return Some(invalid_request(None).into());
            }
            Err(BatchParseError::Syntax(e)) => {
                debug!(error = %e, "Rejected malformed batch");
                let data = JsonRpcErrorObject::detail(&e);
                return Some(JsonRpcMessage::error(JsonRpcError::parse_error(data)).into());
            }
        };

        let responses = self.execute(elements).await;
        if responses.is_empty() {
            None
        } else {
            Some(JsonRpcReply::Batch(responses))
        }
    }

    /// Handles each raw element concurrently and returns every response produced.
    pub async fn execute(&self, elements: Vec<Bytes>) -> Vec<JsonRpcMessage> {
        let total = elements.len();
        let responses = Arc::new(Mutex::new(Vec::with_capacity(total)));

        let tasks = elements.into_iter().map(|element| {
            let handler = self.handler.clone();
            let responses = Arc::clone(&responses);
            tokio::spawn(async move {
                if let Some(response) = handler.handle_bytes(&element).await {
                    responses.lock().await.push(response);
                }
            })
        });

        for joined in join_all(tasks).await {
            if let Err(e) = joined {
                error!(error = %e, "Batch element task failed");
            }
        }

        let responses = std::mem::take(&mut *responses.lock().await);
        debug!(elements = total, responses = responses.len(), "Batch completed");
        responses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::service::Service;
    use crate::types::RequestId;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn orchestrator(service: Service) -> BatchOrchestrator {
        let mut registry = Registry::new();
        registry.register("", service).unwrap();
        BatchOrchestrator::new(RequestHandler::new(Arc::new(registry)))
    }

    fn demo_service() -> Service {
        Service::builder(())
            .procedure("Sum", |_: Arc<()>, values: Vec<i64>| async move {
                Ok::<_, Infallible>(values.iter().sum::<i64>())
            })
            .procedure("Subtract", |_: Arc<()>, a: i64, b: i64| async move {
                Ok::<_, Infallible>(a - b)
            })
            .procedure("Update", |_: Arc<()>, _: Vec<i64>| async move { Ok::<_, Infallible>(()) })
            .build()
    }

    fn codes_by_id(reply: &JsonRpcReply) -> HashMap<String, Option<i64>> {
        reply
            .messages()
            .iter()
            .map(|message| (message.id().to_string(), message.error_code()))
            .collect()
    }

    #[tokio::test]
    async fn test_mixed_batch() {
        let orchestrator = orchestrator(demo_service());
        let body = json!([
            {"jsonrpc": "2.0", "method": "sum", "params": [1, 2, 4], "id": "1"},
            {"jsonrpc": "2.0", "method": "update", "params": [7]},
            {"jsonrpc": "2.0", "method": "subtract", "params": [42, 23], "id": "2"},
            {"foo": "boo"},
            {"jsonrpc": "2.0", "method": "foo.get", "params": {"name": "myself"}, "id": "5"},
            {"jsonrpc": "2.0", "method": "get_data", "id": "9"}
        ]);

        let reply = orchestrator.handle_batch(body.to_string().as_bytes()).await.unwrap();
        assert!(matches!(reply, JsonRpcReply::Batch(_)));
        assert_eq!(reply.messages().len(), 5);

        let codes = codes_by_id(&reply);
        assert_eq!(codes["1"], None);
        assert_eq!(codes["2"], None);
        assert_eq!(codes["5"], Some(-32601));
        assert_eq!(codes["9"], Some(-32601));
        assert_eq!(codes["null"], Some(-32600));

        let sum = reply
            .messages()
            .iter()
            .find(|m| m.id() == &RequestId::String("1".into()))
            .unwrap();
        assert_eq!(serde_json::to_value(sum).unwrap()["result"], 7);
    }

    #[tokio::test]
    async fn test_all_notifications_yield_nothing() {
        let orchestrator = orchestrator(demo_service());
        let body = br#"[
            {"jsonrpc": "2.0", "method": "update", "params": [1, 2, 4]},
            {"jsonrpc": "2.0", "method": "unknown"}
        ]"#;

        assert!(orchestrator.handle_batch(body).await.is_none());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let orchestrator = orchestrator(demo_service());
        let reply = orchestrator.handle_batch(b"[]").await.unwrap();

        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["error"]["code"], -32600);
        assert_eq!(value["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_malformed_batch() {
        let orchestrator = orchestrator(demo_service());
        let body = br#"[
            {"jsonrpc": "2.0", "method": "sum", "params": [1,2,4], "id": "1"},
            {"jsonrpc": "2.0", "method"
        ]"#;

        let reply = orchestrator.handle_batch(body).await.unwrap();
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["error"]["code"], -32700);
        assert_eq!(value["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_non_object_elements() {
        let orchestrator = orchestrator(demo_service());
        let reply = orchestrator.handle_batch(b"[1, 2, 3]").await.unwrap();

        assert_eq!(reply.messages().len(), 3);
        assert!(reply.messages().iter().all(|m| m.error_code() == Some(-32600)));
        assert!(reply.messages().iter().all(|m| m.id().is_null()));
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_all_answered() {
        let orchestrator = orchestrator(demo_service());
        let body = json!([
            {"jsonrpc": "2.0", "method": "subtract", "params": [2, 1], "id": 1},
            {"jsonrpc": "2.0", "method": "subtract", "params": [3, 1], "id": 1}
        ]);

        let reply = orchestrator.handle_batch(body.to_string().as_bytes()).await.unwrap();
        let mut results: Vec<Value> = reply
            .messages()
            .iter()
            .map(|m| serde_json::to_value(m).unwrap()["result"].clone())
            .collect();
        results.sort_by_key(|v| v.as_i64());

        assert_eq!(results, vec![json!(1), json!(2)]);
        assert!(reply.messages().iter().all(|m| m.id() == &RequestId::Number(1)));
    }

    #[tokio::test]
    async fn test_elements_do_not_block_each_other() {
        let gate = Arc::new(Notify::new());
        let service = Service::from_shared(Arc::clone(&gate))
            .procedure("Wait", |gate: Arc<Notify>| async move {
                gate.notified().await;
                Ok::<_, Infallible>("released")
            })
            .procedure("Release", |gate: Arc<Notify>| async move {
                gate.notify_one();
                Ok::<_, Infallible>("done")
            })
            .build();
        let orchestrator = orchestrator(service);

        let body = json!([
            {"jsonrpc": "2.0", "method": "wait", "id": 1},
            {"jsonrpc": "2.0", "method": "release", "id": 2}
        ]);

        let reply = tokio::time::timeout(
            Duration::from_secs(5),
            orchestrator.handle_batch(body.to_string().as_bytes()),
        )
        .await
        .expect("batch elements should run concurrently")
        .unwrap();

        let codes = codes_by_id(&reply);
        assert_eq!(codes.len(), 2);
        assert!(codes.values().all(Option::is_none));
    }
}
