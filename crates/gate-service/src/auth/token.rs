//! Bearer token authenticator.
//!
//! Verifies `Authorization: Bearer <token>` with two independent paths:
//!
//! 1. **Symmetric** - HS256 with the configured client secret, checked by
//!    hand: exactly one signature, HMAC-SHA256 over the signing input, then
//!    issuer, audience and expiry claims.
//! 2. **Delegated** - a [`DelegatedVerifier`] built from OIDC discovery,
//!    verifying asymmetric signatures against the provider's key set.
//!
//! The symmetric path runs first. When it does not authorize, the delegated
//! path gets the same token. Either success admits the request.

use crate::auth::authenticator::{AuthRequest, Authenticator};
use crate::auth::claims::Claims;
use crate::auth::jws::SignedToken;
use crate::auth::oidc::DelegatedVerifier;
use crate::errors::AuthInitError;
use chrono::Utc;
use common::jwt::decode_base64url;
use common::secret::{ExposeSecret, SecretString};
use ring::hmac;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::instrument;

const BEARER_PREFIX: &str = "Bearer ";

/// What to do when OIDC discovery fails at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoveryPolicy {
    /// Abort construction.
    #[default]
    FailFast,
    /// Log a warning and run without the delegated path.
    Degrade,
}

impl FromStr for DiscoveryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-fast" => Ok(Self::FailFast),
            "degrade" => Ok(Self::Degrade),
            other => Err(format!(
                "unknown discovery policy '{other}' (expected 'fail-fast' or 'degrade')"
            )),
        }
    }
}

/// Inputs for building a [`TokenAuthenticator`].
#[derive(Debug, Clone, Default)]
pub struct TokenAuthSettings {
    pub issuer_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    /// The client secret is URL-safe base64 encoded.
    pub client_secret_base64: bool,
    pub discovery_policy: DiscoveryPolicy,
    pub jwks_cache_ttl: Duration,
}

/// Bearer token authenticator with symmetric and delegated verification.
pub struct TokenAuthenticator {
    issuer_url: Option<String>,
    client_id: Option<String>,
    hmac_key: Option<hmac::Key>,
    delegated: Option<DelegatedVerifier>,
}

impl fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("issuer_url", &self.issuer_url)
            .field("client_id", &self.client_id)
            .field("symmetric", &self.hmac_key.is_some())
            .field("delegated", &self.delegated.is_some())
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolve the HMAC key from the client secret. An empty secret disables the
/// symmetric path.
fn hmac_key(
    client_secret: Option<&SecretString>,
    base64_encoded: bool,
) -> Result<Option<hmac::Key>, AuthInitError> {
    let Some(secret) = client_secret else {
        return Ok(None);
    };

    let key_bytes = if base64_encoded {
        decode_base64url(secret.expose_secret()).map_err(|_| AuthInitError::InvalidClientSecret)?
    } else {
        secret.expose_secret().as_bytes().to_vec()
    };

    if key_bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(hmac::Key::new(hmac::HMAC_SHA256, &key_bytes)))
}

impl TokenAuthenticator {
    /// Build the authenticator.
    ///
    /// When an issuer URL is set this performs OIDC discovery and an initial
    /// key set fetch. On failure the configured [`DiscoveryPolicy`] decides
    /// between returning the error and continuing without the delegated path.
    ///
    /// # Errors
    ///
    /// Returns `AuthInitError::InvalidClientSecret` if the secret is flagged
    /// as base64 but does not decode, or the discovery error under
    /// `DiscoveryPolicy::FailFast`.
    #[instrument(skip_all)]
    pub async fn new(settings: TokenAuthSettings) -> Result<Self, AuthInitError> {
        let issuer_url = non_empty(settings.issuer_url);
        let client_id = non_empty(settings.client_id);
        let hmac_key = hmac_key(
            settings.client_secret.as_ref(),
            settings.client_secret_base64,
        )?;

        let delegated = match &issuer_url {
            Some(issuer) => {
                match DelegatedVerifier::discover(issuer, client_id.clone(), settings.jwks_cache_ttl)
                    .await
                {
                    Ok(verifier) => Some(verifier),
                    Err(e) if settings.discovery_policy == DiscoveryPolicy::Degrade => {
                        tracing::warn!(
                            target: "gate.auth.token",
                            error = %e,
                            "OIDC discovery failed, continuing without delegated verification"
                        );
                        None
                    }
                    Err(e) => return Err(e),
                }
            }
            None => None,
        };

        tracing::info!(
            target: "gate.auth.token",
            symmetric = hmac_key.is_some(),
            delegated = delegated.is_some(),
            "Bearer token authenticator configured"
        );

        Ok(Self {
            issuer_url,
            client_id,
            hmac_key,
            delegated,
        })
    }

    /// HS256 verification followed by issuer, audience and expiry checks.
    fn verify_symmetric(&self, token: &SignedToken) -> bool {
        let Some(key) = &self.hmac_key else {
            return false;
        };
        let Some(signature) = token.single_signature() else {
            tracing::debug!(
                target: "gate.auth.token",
                signatures = token.signatures.len(),
                "Symmetric path needs exactly one signature"
            );
            return false;
        };
        if signature.header.alg != "HS256" {
            tracing::debug!(target: "gate.auth.token", alg = %signature.header.alg, "Not an HS256 token");
            return false;
        }

        let signing_input = token.signing_input(signature);
        if hmac::verify(key, signing_input.as_bytes(), &signature.signature).is_err() {
            tracing::debug!(target: "gate.auth.token", "HS256 signature verification failed");
            return false;
        }

        let claims: Claims = match serde_json::from_slice(&token.payload) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(target: "gate.auth.token", error = %e, "Failed to decode token claims");
                return false;
            }
        };

        self.check_claims(&claims)
    }

    fn check_claims(&self, claims: &Claims) -> bool {
        if let Some(issuer) = &self.issuer_url {
            if claims.iss != *issuer {
                tracing::debug!(target: "gate.auth.token", iss = %claims.iss, "Issuer mismatch");
                return false;
            }
        }

        if let Some(client_id) = &self.client_id {
            if !claims.aud.contains(client_id) {
                tracing::debug!(target: "gate.auth.token", aud = ?claims.aud, "Audience mismatch");
                return false;
            }
        }

        if !claims.exp.is_after(Utc::now()) {
            tracing::debug!(target: "gate.auth.token", exp = claims.exp.timestamp(), "Token expired");
            return false;
        }

        true
    }

    async fn verify_delegated(&self, raw: &str, token: &SignedToken) -> bool {
        let Some(verifier) = &self.delegated else {
            return false;
        };
        if !token.is_compact() {
            tracing::debug!(target: "gate.auth.token", "Delegated path only accepts compact tokens");
            return false;
        }

        match verifier.verify(raw).await {
            Ok(claims) => {
                tracing::debug!(target: "gate.auth.token", iss = %claims.iss, "Token verified by provider keys");
                true
            }
            Err(e) => {
                tracing::debug!(target: "gate.auth.token", error = %e, "Delegated verification failed");
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl Authenticator for TokenAuthenticator {
    fn name(&self) -> &'static str {
        "bearer"
    }

    #[instrument(skip_all, fields(path = %request.path))]
    async fn authorize(&self, request: &AuthRequest<'_>) -> bool {
        tracing::debug!(target: "gate.auth.token", "Verifying bearer token");

        let Some(raw) = request
            .authorization()
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        else {
            tracing::debug!(target: "gate.auth.token", "No bearer token in request");
            return false;
        };

        let token = match SignedToken::parse(raw) {
            Ok(token) => token,
            Err(e) => {
                tracing::debug!(target: "gate.auth.token", error = ?e, "Token is not a signed structure");
                return false;
            }
        };

        if self.verify_symmetric(&token) {
            return true;
        }
        self.verify_delegated(raw.trim(), &token).await
    }
}
