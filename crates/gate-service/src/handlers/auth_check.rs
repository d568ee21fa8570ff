//! Forward-auth endpoint.
//!
//! A reverse proxy can send each inbound request's headers here and forward
//! the original request only on a 2xx answer. The gate middleware does the
//! actual work; reaching this handler means the request was admitted.

use axum::http::StatusCode;

/// Handler for `/api/v1/auth/check` (any method).
///
/// Returns 204 No Content. Rejected requests never get here; the middleware
/// answers them with 401.
#[tracing::instrument(skip_all, name = "gate.auth.check")]
pub async fn auth_check() -> StatusCode {
    StatusCode::NO_CONTENT
}
