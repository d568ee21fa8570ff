//! API Gate error types.
//!
//! `GateError` maps to HTTP responses via the `IntoResponse` impl. Every
//! rejection produces the same body and challenge; which verification stage
//! failed is only logged server-side.
//!
//! `AuthInitError` covers failures while building authenticators at startup
//! (discovery, key material, secret encoding). These are resolved once and
//! never surface per request.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Value of the `WWW-Authenticate` header sent with every 401.
const WWW_AUTHENTICATE_VALUE: &str = "Basic realm=\"api-gate\", Bearer realm=\"api-gate\"";

/// HTTP-facing error type.
///
/// The gate only ever rejects with one outcome; the reason stays in the
/// server logs.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Unauthorized")]
    Unauthorized,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: &'static str,
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let body = match self {
            GateError::Unauthorized => ErrorResponse {
                error: ErrorDetail {
                    code: "UNAUTHORIZED",
                    message: "Authentication required",
                },
            },
        };

        let mut response = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static(WWW_AUTHENTICATE_VALUE),
        );
        response
    }
}

/// Errors raised while constructing authenticators.
#[derive(Debug, Error)]
pub enum AuthInitError {
    /// Provider metadata could not be fetched or was invalid.
    #[error("OIDC discovery failed: {0}")]
    Discovery(String),

    /// The provider's key set could not be fetched or contained no usable key.
    #[error("JWKS unavailable: {0}")]
    Jwks(String),

    /// The client secret was flagged as base64 but did not decode.
    #[error("Client secret is not valid URL-safe base64")]
    InvalidClientSecret,
}
