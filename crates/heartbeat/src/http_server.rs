//! HTTP servers for the metrics and health endpoints.

use crate::health::health_router;
use crate::metrics::MetricsRegistry;
use crate::types::SHUTDOWN_TIMEOUT;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Content type of the OpenMetrics text written by `prometheus_client`
pub const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Pause after a failed accept, e.g. when out of file descriptors
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// HTTP server error types
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// A single-purpose HTTP server with bounded graceful shutdown
pub struct HttpServer {
    /// Name used in log lines
    name: &'static str,
    /// Listen address
    listen_addr: String,
    /// Routes served
    router: Router,
    /// Time allowed for in-flight requests after cancellation
    shutdown_timeout: Duration,
}

impl HttpServer {
    /// Create a server for an arbitrary router
    pub fn new(name: &'static str, listen_addr: String, router: Router) -> Self {
        Self {
            name,
            listen_addr,
            router,
            shutdown_timeout: SHUTDOWN_TIMEOUT,
        }
    }

    /// Server exposing `GET /metrics`
    pub fn metrics(registry: Arc<MetricsRegistry>, listen_addr: String) -> Self {
        Self::new("metrics", listen_addr, metrics_router(registry))
    }

    /// Server exposing `GET /healthz`
    pub fn health(listen_addr: String) -> Self {
        Self::new("health", listen_addr, health_router())
    }

    /// Override the graceful shutdown window
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn listen_addr(&self) -> &str {
        &self.listen_addr
    }

    /// Bind the listen address and serve until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.listen_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.listen_addr.clone(),
                source,
            })?;

        self.serve(listener, cancel).await
    }

    /// Serve on an already bound listener until `cancel` fires.
    ///
    /// On cancellation the listener is closed and open connections are
    /// asked to finish. Whatever is still running after the shutdown
    /// timeout is aborted, so no connection outlives this call.
    pub async fn serve(
        self,
        listener: TcpListener,
        cancel: CancellationToken,
    ) -> Result<(), ServerError> {
        let addr = listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| self.listen_addr.clone());
        info!(server = self.name, addr = %addr, "{} server is running", self.name);

        let app = self
            .router
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

        let builder = http1::Builder::new();
        let graceful = GracefulShutdown::new();
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(server = self.name, error = %e, "Failed to accept connection");
                            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                            continue;
                        }
                    };

                    let service = TowerToHyperService::new(app.clone());
                    let conn = graceful.watch(builder.serve_connection(TokioIo::new(stream), service));
                    let name = self.name;
                    connections.spawn(async move {
                        if let Err(e) = conn.await {
                            debug!(server = name, peer = %peer, error = %e, "Connection closed with error");
                        }
                    });
                }

                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        drop(listener);
        info!(server = self.name, "Shutting down {} server", self.name);

        let drained = tokio::time::timeout(self.shutdown_timeout, async {
            graceful.shutdown().await;
            while connections.join_next().await.is_some() {}
        })
        .await
        .is_ok();

        if !drained {
            warn!(
                server = self.name,
                timeout = ?self.shutdown_timeout,
                remaining = connections.len(),
                "Graceful shutdown timed out, closing remaining connections"
            );
            connections.shutdown().await;
        }

        Ok(())
    }
}

/// Router for the metrics endpoint
pub fn metrics_router(registry: Arc<MetricsRegistry>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(registry)
}

/// Handler for /metrics endpoint
async fn metrics_handler(State(registry): State<Arc<MetricsRegistry>>) -> Response {
    match registry.encode_text() {
        Ok(buffer) => (
            StatusCode::OK,
            [("content-type", OPENMETRICS_CONTENT_TYPE)],
            buffer,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}
