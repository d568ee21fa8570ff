//! Authentication gate.
//!
//! Composes authenticators into one admit/reject decision:
//!
//! 1. A path starting with an exception prefix is admitted immediately.
//! 2. With no authenticators configured every request is admitted.
//! 3. Otherwise authenticators run in order until one authorizes.

use crate::auth::authenticator::{AuthRequest, Authenticator};
use crate::observability::metrics::{record_auth_decision, record_authenticator_result};
use std::sync::Arc;
use tracing::instrument;

/// Admission decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Path matched an exception prefix.
    Excepted,
    /// No authenticators are configured.
    Open,
    /// An authenticator accepted the request.
    Authenticated(&'static str),
    Rejected,
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Decision::Rejected)
    }

    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Excepted => "excepted",
            Decision::Open => "open",
            Decision::Authenticated(_) => "authenticated",
            Decision::Rejected => "rejected",
        }
    }
}

/// Ordered authenticators plus path exceptions. Immutable after construction.
#[derive(Clone, Default)]
pub struct AuthGate {
    authenticators: Vec<Arc<dyn Authenticator>>,
    exceptions: Vec<String>,
}

impl AuthGate {
    pub fn new(authenticators: Vec<Arc<dyn Authenticator>>, exceptions: Vec<String>) -> Self {
        Self {
            authenticators,
            exceptions,
        }
    }

    pub fn authenticator_names(&self) -> Vec<&'static str> {
        self.authenticators.iter().map(|a| a.name()).collect()
    }

    pub fn exceptions(&self) -> &[String] {
        &self.exceptions
    }

    fn is_excepted(&self, path: &str) -> bool {
        self.exceptions
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Decide whether `request` may proceed.
    #[instrument(skip_all, fields(path = %request.path))]
    pub async fn check(&self, request: &AuthRequest<'_>) -> Decision {
        let decision = self.evaluate(request).await;
        record_auth_decision(decision.as_str());

        match decision {
            Decision::Rejected => {
                tracing::debug!(target: "gate.auth.gate", "Request rejected by all authenticators");
            }
            _ => {
                tracing::debug!(target: "gate.auth.gate", decision = decision.as_str(), "Request admitted");
            }
        }
        decision
    }

    async fn evaluate(&self, request: &AuthRequest<'_>) -> Decision {
        if self.is_excepted(request.path) {
            return Decision::Excepted;
        }

        if self.authenticators.is_empty() {
            return Decision::Open;
        }

        for authenticator in &self.authenticators {
            let authorized = authenticator.authorize(request).await;
            record_authenticator_result(authenticator.name(), authorized);
            if authorized {
                return Decision::Authenticated(authenticator.name());
            }
        }

        Decision::Rejected
    }
}
