//! Prometheus scrape endpoint.
//!
//! Served from its own task next to the IRC session when `[metrics] port`
//! is set.

use axum::{Router, routing::get};
use std::net::SocketAddr;
use tokio::net::TcpListener;

async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

pub fn router() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serve [`router`] on an already bound listener.
pub async fn serve(listener: TcpListener) -> std::io::Result<()> {
    axum::serve(listener, router()).await
}

/// Bind `0.0.0.0:port` and serve `/metrics` until the process exits.
pub async fn run_http_server(port: u16) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind metrics endpoint");
            return;
        }
    };
    tracing::info!(%addr, "Serving metrics");

    if let Err(e) = serve(listener).await {
        tracing::error!(error = %e, "Metrics endpoint stopped");
    }
}
