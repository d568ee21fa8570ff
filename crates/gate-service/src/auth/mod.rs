//! Authentication module for the API Gate.
//!
//! # Components
//!
//! - `authenticator` - The `Authenticator` capability and request view
//! - `basic` - Fixed username/password over HTTP Basic
//! - `claims` - Claims decoded from bearer tokens
//! - `jws` - Signed token parsing (compact and JSON serialization)
//! - `discovery` - OIDC provider metadata
//! - `jwks` - Cached provider key set
//! - `oidc` - Delegated verification against provider keys
//! - `token` - Bearer token authenticator (HS256 and delegated paths)
//! - `gate` - Exceptions plus ordered, short-circuit evaluation

pub mod authenticator;
pub mod basic;
pub mod claims;
pub mod discovery;
pub mod gate;
pub mod jwks;
pub mod jws;
pub mod oidc;
pub mod token;

pub use authenticator::{AuthRequest, Authenticator};
pub use basic::BasicAuthenticator;
pub use claims::Claims;
pub use gate::{AuthGate, Decision};
pub use token::{DiscoveryPolicy, TokenAuthSettings, TokenAuthenticator};

use crate::config::Config;
use crate::errors::AuthInitError;
use std::sync::Arc;

/// Build the gate described by `config`.
///
/// Basic auth comes first, then bearer tokens. With `insecure` set no
/// authenticator is built and the gate admits every request; configuration
/// loading rejects `insecure` alongside credentials.
///
/// # Errors
///
/// Returns the `AuthInitError` from building the bearer authenticator.
pub async fn build_gate(config: &Config) -> Result<AuthGate, AuthInitError> {
    let mut authenticators: Vec<Arc<dyn Authenticator>> = Vec::new();

    if config.insecure {
        tracing::warn!(
            target: "gate.auth",
            "Running in insecure mode: every request is admitted"
        );
        return Ok(AuthGate::new(authenticators, config.auth_exceptions.clone()));
    }

    if let (Some(username), Some(password)) =
        (&config.basic_auth_username, &config.basic_auth_password)
    {
        authenticators.push(Arc::new(BasicAuthenticator::new(
            username.clone(),
            password.clone(),
        )));
    }

    if config.bearer_auth_enabled() {
        let token = TokenAuthenticator::new(config.token_auth_settings()).await?;
        authenticators.push(Arc::new(token));
    }

    let gate = AuthGate::new(authenticators, config.auth_exceptions.clone());
    tracing::info!(
        target: "gate.auth",
        authenticators = ?gate.authenticator_names(),
        exceptions = ?gate.exceptions(),
        "Authentication gate configured"
    );

    Ok(gate)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};
    use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
    use base64::Engine;
    use ring::hmac;
    use serde_json::json;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(&vars).unwrap()
    }

    fn hs256_token(secret: &[u8]) -> String {
        let exp = chrono::Utc::now().timestamp() + 300;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(json!({"alg": "HS256", "typ": "JWT"}).to_string()),
            URL_SAFE_NO_PAD.encode(json!({"sub": "user-1", "exp": exp}).to_string())
        );
        let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
        let tag = hmac::sign(&key, signing_input.as_bytes());
        format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(tag.as_ref()))
    }

    fn authorization(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[tokio::test]
    async fn test_build_gate_basic_then_bearer() {
        let gate = build_gate(&config(&[
            ("GATE_BASIC_AUTH_USERNAME", "admin"),
            ("GATE_BASIC_AUTH_PASSWORD", "hunter2"),
            ("GATE_CLIENT_SECRET", "s3cret"),
        ]))
        .await
        .unwrap();

        assert_eq!(gate.authenticator_names(), ["basic", "bearer"]);
        assert_eq!(gate.exceptions(), ["/health", "/metrics"]);
    }

    #[tokio::test]
    async fn test_build_gate_insecure_has_no_authenticators() {
        let gate = build_gate(&config(&[("GATE_INSECURE", "true")]))
            .await
            .unwrap();

        assert!(gate.authenticator_names().is_empty());
        let headers = HeaderMap::new();
        assert_eq!(
            gate.check(&AuthRequest::new("/api/v1/charts", &headers)).await,
            Decision::Open
        );
    }

    #[tokio::test]
    async fn test_token_signed_with_padded_secret_authenticates() {
        let gate = build_gate(&config(&[("GATE_CLIENT_SECRET", " s3cr3t ")]))
            .await
            .unwrap();

        let padded = authorization(&format!("Bearer {}", hs256_token(b" s3cr3t ")));
        assert_eq!(
            gate.check(&AuthRequest::new("/api/v1/charts", &padded)).await,
            Decision::Authenticated("bearer")
        );

        let trimmed = authorization(&format!("Bearer {}", hs256_token(b"s3cr3t")));
        assert_eq!(
            gate.check(&AuthRequest::new("/api/v1/charts", &trimmed)).await,
            Decision::Rejected
        );
    }

    #[tokio::test]
    async fn test_padded_basic_password_authenticates() {
        let gate = build_gate(&config(&[
            ("GATE_BASIC_AUTH_USERNAME", "admin"),
            ("GATE_BASIC_AUTH_PASSWORD", "pw "),
        ]))
        .await
        .unwrap();

        let headers = authorization(&format!("Basic {}", STANDARD.encode("admin:pw ")));
        assert_eq!(
            gate.check(&AuthRequest::new("/api/v1/charts", &headers)).await,
            Decision::Authenticated("basic")
        );
    }

    #[tokio::test]
    async fn test_build_gate_propagates_secret_error() {
        let result = build_gate(&config(&[
            ("GATE_CLIENT_SECRET", "***"),
            ("GATE_CLIENT_SECRET_BASE64", "true"),
        ]))
        .await;

        assert!(matches!(result, Err(AuthInitError::InvalidClientSecret)));
    }
}
