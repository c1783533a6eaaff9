//! # HTTP Server
//!
//! HTTP server for metrics, health checks, and the last reconciliation outcome.
//!
//! Provides endpoints:
//! - `/metrics` - Prometheus metrics in text format
//! - `/healthz` - Liveness probe (always returns 200)
//! - `/readyz` - Readiness probe (200 while the latest pass finished without error)
//! - `/status` - Last outcome as JSON
//!
//! The server runs on port 5000 by default (configurable via `METRICS_PORT` environment variable).

use crate::controller::reconciler::Outcome;
use crate::observability::metrics::REGISTRY;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// What the watch loop reports to the probes
#[derive(Debug, Default)]
pub struct ServerState {
    ready: AtomicBool,
    completed_passes: AtomicU64,
    last_outcome: RwLock<Option<Outcome>>,
}

impl ServerState {
    /// A pass finished without error; the service is ready whatever the outcome
    pub async fn record_outcome(&self, outcome: Outcome) {
        *self.last_outcome.write().await = Some(outcome);
        self.ready.store(true, Ordering::Relaxed);
        self.completed_passes.fetch_add(1, Ordering::Relaxed);
    }

    /// A pass failed; readiness drops until the next successful one
    pub fn record_failure(&self) {
        self.ready.store(false, Ordering::Relaxed);
        self.completed_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_not_ready(&self) {
        self.ready.store(false, Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    /// Passes run by the watch loop, failed ones included
    pub fn completed_passes(&self) -> u64 {
        self.completed_passes.load(Ordering::Relaxed)
    }

    pub async fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome.read().await.clone()
    }
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .route("/status", get(status_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(port: u16, state: Arc<ServerState>) -> Result<(), anyhow::Error> {
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut body = Vec::new();
    match encoder.encode(&REGISTRY.gather(), &mut body) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", encoder.format_type().to_string())],
            body,
        ),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain".to_string())],
                e.to_string().into_bytes(),
            )
        }
    }
}

async fn healthz_handler() -> &'static str {
    "ok"
}

/// Ready while the latest pass completed; the body names its outcome
async fn readyz_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    match state.last_outcome().await {
        Some(outcome) if state.is_ready() => (StatusCode::OK, outcome.name().to_string()),
        Some(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "latest pass failed or shutting down".to_string(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "no pass has succeeded yet".to_string(),
        ),
    }
}

async fn status_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    match state.last_outcome().await {
        Some(outcome) => (StatusCode::OK, Json(json!(outcome))),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unknown", "message": "no pass has completed yet" })),
        ),
    }
}
