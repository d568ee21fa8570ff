//! Metrics definitions for the API Gate.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gate_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: HTTP methods
//! - `endpoint`: the gate's own routes, everything else is `/other`
//! - `status`: 3 values (success, error, timeout)
//! - `result`: 4 gate decisions (excepted, open, authenticated, rejected)
//! - `authenticator`: configured authenticator names (basic, bearer)
//! - `outcome`: authorized, unauthorized

use metrics::counter;
use metrics::histogram;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("gate_http_request".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `gate_http_requests_total`, `gate_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// Includes requests the gate rejected (401) and framework-level errors.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("gate_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("gate_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/health" | "/metrics" | "/api/v1/auth/check" => path.to_string(),
        _ => "/other".to_string(),
    }
}

// ============================================================================
// Authentication Metrics
// ============================================================================

/// Record a gate decision.
///
/// Metric: `gate_auth_decisions_total`
/// Labels: `result`
pub fn record_auth_decision(result: &'static str) {
    counter!("gate_auth_decisions_total", "result" => result).increment(1);
}

/// Record one authenticator verdict.
///
/// Metric: `gate_authenticator_results_total`
/// Labels: `authenticator`, `outcome`
pub fn record_authenticator_result(authenticator: &'static str, authorized: bool) {
    let outcome = if authorized {
        "authorized"
    } else {
        "unauthorized"
    };
    counter!("gate_authenticator_results_total",
        "authenticator" => authenticator,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a JWKS refresh attempt.
///
/// Metric: `gate_jwks_refresh_total`
/// Labels: `status` (success, error)
pub fn record_jwks_refresh(status: &'static str) {
    counter!("gate_jwks_refresh_total", "status" => status).increment(1);
}

// ============================================================================
// Tests
// ============================================================================
