//! HTTP metrics and request logging middleware.
//!
//! Captures every response, including 401s from the gate and
//! framework-level errors that occur before handlers run (404, 405), and
//! logs each request at debug level.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Middleware that records HTTP request metrics and logs every request.
///
/// Applied as the outermost layer so rejected and unrouted requests are
/// counted too.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let uri = request.uri().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status_code = response.status().as_u16();
    record_http_request(&method, &path, status_code, duration);

    tracing::debug!(
        target: "gate.http",
        method = %method,
        uri = %uri,
        status = status_code,
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}
