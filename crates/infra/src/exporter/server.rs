//! Exporter HTTP endpoint.
//!
//! Serves `/metrics` in text exposition format from the current snapshot,
//! plus `/healthz` (liveness) and `/readyz` (readiness: a first snapshot has
//! been published). Reading never triggers computation; the refresh
//! scheduler is the only writer.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use ratewatch_domain::{RateWatchError, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::registry::ExporterMetrics;
use crate::scheduling::SnapshotSlot;

#[derive(Clone)]
struct AppState {
    slot: SnapshotSlot,
    metrics: Arc<ExporterMetrics>,
}

/// HTTP server publishing the current snapshot.
pub struct ExporterServer {
    addr: SocketAddr,
    state: AppState,
}

impl ExporterServer {
    pub fn new(addr: SocketAddr, slot: SnapshotSlot, metrics: Arc<ExporterMetrics>) -> Self {
        Self { addr, state: AppState { slot, metrics } }
    }

    /// Serve until the cancellation token fires.
    ///
    /// # Errors
    /// Returns `RateWatchError::Network` if the listener cannot bind, or
    /// `RateWatchError::Internal` if serving fails.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        let router = Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/healthz", get(healthz_handler))
            .route("/readyz", get(readyz_handler))
            .with_state(self.state);

        let listener = tokio::net::TcpListener::bind(self.addr).await.map_err(|e| {
            RateWatchError::Network(format!("failed to bind exporter on {}: {e}", self.addr))
        })?;

        info!(addr = %self.addr, "Exporter endpoint listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| RateWatchError::Internal(format!("exporter server failed: {e}")))?;

        info!("Exporter endpoint stopped");
        Ok(())
    }
}

async fn metrics_handler(State(state): State<AppState>) -> (StatusCode, String) {
    // Refresh the gauges from the current snapshot at scrape time; the
    // registry serializes update and render, so concurrent scrapes each see
    // a complete DPM family. Before the first cycle completes only the
    // (zero-valued) self metrics appear.
    let rendered = match state.slot.current() {
        Some(report) => state.metrics.render_report(&report),
        None => state.metrics.render(),
    };

    match rendered {
        Ok(body) => (StatusCode::OK, body),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

async fn healthz_handler() -> &'static str {
    "ok"
}

async fn readyz_handler(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.slot.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "no snapshot published yet")
    }
}
