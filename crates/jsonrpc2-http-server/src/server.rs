//! HTTP JSON-RPC server: configuration, builder and accept loop.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use jsonrpc2_server::{Registry, Service};

use crate::Result;
use crate::endpoint::JsonRpcEndpoint;

/// Configuration for the HTTP JSON-RPC server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Maximum request body size; larger bodies are answered with a parse error
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8000)),
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Builder for the HTTP JSON-RPC server
pub struct JsonRpcHttpServerBuilder {
    config: ServerConfig,
    registry: Registry,
    shutdown: Option<CancellationToken>,
}

impl JsonRpcHttpServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            registry: Registry::new(),
            shutdown: None,
        }
    }

    /// Set the bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    /// Set the port, keeping the bind host
    pub fn port(mut self, port: u16) -> Self {
        self.config.bind_address.set_port(port);
        self
    }

    /// Set maximum request body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Register a service under `namespace` (`""` for unprefixed methods)
    pub fn register(mut self, namespace: impl Into<String>, service: Service) -> Result<Self> {
        self.registry.register(namespace, service)?;
        Ok(self)
    }

    /// Use an externally owned root cancellation token
    pub fn shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    /// Build the server; the registry is read-only from here on
    pub fn build(self) -> JsonRpcHttpServer {
        let config = Arc::new(self.config);
        let endpoint = JsonRpcEndpoint::new(Arc::clone(&config), Arc::new(self.registry));

        JsonRpcHttpServer {
            config,
            endpoint,
            shutdown: self.shutdown.unwrap_or_else(CancellationToken::new),
        }
    }
}

impl Default for JsonRpcHttpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP JSON-RPC server
#[derive(Clone)]
pub struct JsonRpcHttpServer {
    config: Arc<ServerConfig>,
    endpoint: JsonRpcEndpoint,
    shutdown: CancellationToken,
}

impl JsonRpcHttpServer {
    pub fn builder() -> JsonRpcHttpServerBuilder {
        JsonRpcHttpServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &JsonRpcEndpoint {
        &self.endpoint
    }

    /// Root cancellation token; cancelling it stops accepting connections.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_address).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until shutdown
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!("JSON-RPC server listening on {}", listener.local_addr()?);
        for method in self.endpoint.registry().methods() {
            debug!("Method available: {}", method);
        }

        loop {
            let (stream, peer_addr) = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = listener.accept() => accepted?,
            };
            debug!("New connection from {}", peer_addr);

            let endpoint = self.endpoint.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let endpoint = endpoint.clone();
                    async move { Ok::<_, Infallible>(endpoint.handle(req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    // Filter out common client disconnection errors that aren't actual problems
                    let err_str = err.to_string();
                    if err_str.contains("connection closed before message completed") {
                        debug!("Client disconnected (normal): {}", err);
                    } else {
                        error!("Error serving connection: {}", err);
                    }
                }
            });
        }
    }
}
