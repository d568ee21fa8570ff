//! Authentication middleware.
//!
//! Runs the [`AuthGate`] for every request before it reaches a handler.
//! Rejected requests get a uniform 401; admitted requests carry the
//! [`Decision`] in their extensions.

use crate::auth::authenticator::AuthRequest;
use crate::auth::gate::{AuthGate, Decision};
use crate::errors::GateError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub gate: Arc<AuthGate>,
}

/// Authentication middleware.
///
/// # Response
///
/// - Returns 401 Unauthorized if the gate rejects the request
/// - Continues to next handler with the `Decision` in extensions otherwise
#[instrument(skip_all, name = "gate.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, GateError> {
    let decision = {
        let auth_request = AuthRequest::new(req.uri().path(), req.headers());
        state.gate.check(&auth_request).await
    };

    if !decision.is_admitted() {
        tracing::debug!(
            target: "gate.middleware.auth",
            method = %req.method(),
            path = %req.uri().path(),
            "Unauthorized request"
        );
        return Err(GateError::Unauthorized);
    }

    req.extensions_mut().insert(decision);

    Ok(next.run(req).await)
}

/// Extension trait for reading the gate decision from a request.
pub trait DecisionExt {
    /// Returns `None` if the auth middleware was not applied.
    fn auth_decision(&self) -> Option<Decision>;
}

impl<B> DecisionExt for axum::extract::Request<B> {
    fn auth_decision(&self) -> Option<Decision> {
        self.extensions().get::<Decision>().copied()
    }
}
