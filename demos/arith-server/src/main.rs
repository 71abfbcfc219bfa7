//! # Arithmetic JSON-RPC Server
//!
//! Serves the example calls of the JSON-RPC 2.0 specification on `POST /`.
//!
//! ## Usage
//! ```bash
//! cargo run --package arith-server -- --port 8000
//! ```
//!
//! ## Example Calls
//! ```bash
//! curl -X POST http://127.0.0.1:8000/ \
//!   -H "Content-Type: application/json" \
//!   -d '{"jsonrpc":"2.0","method":"subtract","params":[42,23],"id":1}'
//!
//! curl -X POST http://127.0.0.1:8000/ \
//!   -H "Content-Type: application/json" \
//!   -d '{"jsonrpc":"2.0","method":"arith_subtract","params":{"subtrahend":23,"minuend":42},"id":3}'
//! ```

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use clap::Parser;
use jsonrpc2_http_server::JsonRpcHttpServer;
use jsonrpc2_server::Service;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Maximum request body size in bytes
    #[arg(long, default_value = "1048576")]
    max_body_size: usize,
}

/// Named parameters of `arith_subtract`
#[derive(Debug, Deserialize, JsonSchema)]
struct Operands {
    minuend: i64,
    subtrahend: i64,
}

/// Counts values received through notifications
#[derive(Default)]
struct Inbox {
    received: AtomicU64,
}

impl Inbox {
    fn record(&self, method: &str, values: &[i64]) -> u64 {
        let count = values.len() as u64;
        let total = self.received.fetch_add(count, Ordering::Relaxed) + count;
        info!("{} received {:?} ({} values so far)", method, values, total);
        total
    }
}

fn root_service(inbox: Arc<Inbox>) -> Service {
    Service::from_shared(inbox)
        .procedure("Subtract", |_: Arc<Inbox>, a: i64, b: i64| async move {
            a.checked_sub(b).ok_or("integer overflow")
        })
        .procedure("Sum", |_: Arc<Inbox>, values: Vec<i64>| async move {
            values
                .iter()
                .try_fold(0i64, |acc, v| acc.checked_add(*v))
                .ok_or("integer overflow")
        })
        .procedure("Update", |inbox: Arc<Inbox>, values: Vec<i64>| async move {
            inbox.record("update", &values);
            Ok::<_, Infallible>(())
        })
        .build()
}

fn arith_service() -> Service {
    Service::builder(())
        .procedure("Subtract", |_: Arc<()>, ops: Operands| async move {
            ops.minuend.checked_sub(ops.subtrahend).ok_or("integer overflow")
        })
        .build()
}

fn notify_service(inbox: Arc<Inbox>) -> Service {
    Service::from_shared(inbox)
        .procedure("Hello", |inbox: Arc<Inbox>, values: Vec<i64>| async move {
            inbox.record("notify_hello", &values);
            Ok::<_, Infallible>(())
        })
        .build()
}

fn get_service() -> Service {
    Service::builder(())
        .procedure("Data", |_: Arc<()>| async move {
            Ok::<_, Infallible>(("hello", 5))
        })
        .build()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let inbox = Arc::new(Inbox::default());

    let server = JsonRpcHttpServer::builder()
        .bind_address(SocketAddr::new(args.host, args.port))
        .max_body_size(args.max_body_size)
        .register("", root_service(Arc::clone(&inbox)))?
        .register("arith", arith_service())?
        .register("notify", notify_service(inbox))?
        .register("get", get_service())?
        .build();

    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, shutting down");
            shutdown.cancel();
        }
    });

    info!("Starting arithmetic JSON-RPC server on {}", server.config().bind_address);
    info!("Methods: {}", server.endpoint().registry().methods().join(", "));

    server.run().await?;
    Ok(())
}
