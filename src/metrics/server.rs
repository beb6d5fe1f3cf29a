//! HTTP server for the Prometheus metrics endpoint.

use crate::config::ServerConfig;
use crate::metrics::{ExportError, Exporter};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;

/// Errors that can occur during metrics server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

/// HTTP server for exposing Prometheus metrics.
pub struct MetricsServer {
    config: ServerConfig,
    exporter: Arc<Exporter>,
}

impl MetricsServer {
    /// Creates a new metrics server.
    pub fn new(config: ServerConfig, exporter: Exporter) -> Self {
        Self {
            config,
            exporter: Arc::new(exporter),
        }
    }

    /// Returns the shared exporter.
    pub fn exporter(&self) -> Arc<Exporter> {
        Arc::clone(&self.exporter)
    }

    /// Builds the router serving `/metrics` and `/health`.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .layer(CorsLayer::permissive())
            .with_state(Arc::clone(&self.exporter))
    }

    /// Starts the HTTP server.
    ///
    /// Runs until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        tracing::info!(%addr, "Metrics server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        Ok(())
    }
}

/// Handler for the /metrics endpoint.
///
/// Each request takes one fresh snapshot per pool. A pool that cannot
/// report fails the scrape with 503.
async fn metrics_handler(State(exporter): State<Arc<Exporter>>) -> impl IntoResponse {
    match exporter.encode() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e @ ExportError::Stats(_)) => {
            tracing::warn!(error = %e, "Scrape failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain; charset=utf-8")],
                format!("Failed to collect metrics: {}", e),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
