//! Prometheus metrics endpoint handler.
//!
//! # Security
//!
//! Public by default (listed in the default auth exceptions) so Prometheus
//! can scrape it. Labels carry no credentials or subjects.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// # Response
///
/// Returns 200 OK with Prometheus text format:
/// ```text
/// # TYPE gate_auth_decisions_total counter
/// gate_auth_decisions_total{result="rejected"} 3
/// ```
#[tracing::instrument(skip_all, name = "gate.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
