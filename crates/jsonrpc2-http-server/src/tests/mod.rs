//! Test modules for jsonrpc2-http-server crate
//!
//! Endpoint scenarios run in-process against `JsonRpcEndpoint`; the transport
//! tests go through a real socket.


use std::convert::Infallible;
use std::sync::Arc;

use jsonrpc2_server::{Registry, Service};
use serde::Deserialize;

#[derive(Deserialize, schemars::JsonSchema)]
pub(crate) struct Operands {
    minuend: i64,
    subtrahend: i64,
}

/// Services answering the scenarios of the JSON-RPC 2.0 specification.
pub(crate) fn scenario_services() -> Vec<(&'static str, Service)> {
    let root = Service::builder(())
        .procedure("Subtract", |_: Arc<()>, a: i64, b: i64| async move {
            Ok::<_, Infallible>(a - b)
        })
        .procedure("Sum", |_: Arc<()>, values: Vec<i64>| async move {
            Ok::<_, Infallible>(values.iter().sum::<i64>())
        })
        .procedure("Update", |_: Arc<()>, _: Vec<i64>| async move {
            Ok::<_, Infallible>(())
        })
        .build();

    let arith = Service::builder(())
        .procedure("Subtract", |_: Arc<()>, ops: Operands| async move {
            Ok::<_, Infallible>(ops.minuend - ops.subtrahend)
        })
        .build();

    let notify = Service::builder(())
        .procedure("Hello", |_: Arc<()>, _: Vec<i64>| async move {
            Ok::<_, Infallible>(())
        })
        .build();

    vec![("", root), ("arith", arith), ("notify", notify)]
}

pub(crate) fn scenario_registry() -> Registry {
    let mut registry = Registry::new();
    for (namespace, service) in scenario_services() {
        registry.register(namespace, service).unwrap();
    }
    registry
}
