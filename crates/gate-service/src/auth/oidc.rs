//! Delegated (discovery-based) token verification.
//!
//! A `DelegatedVerifier` is built once from OIDC provider metadata and then
//! verifies compact tokens signed with the provider's asymmetric keys.
//!
//! # Security
//!
//! - Only asymmetric algorithms listed by the provider are accepted; HMAC
//!   algorithms are always refused so a public key can never be used as an
//!   HMAC secret
//! - Expiration is validated with zero leeway
//! - Issuer is always validated; audience when a client ID is configured

use crate::auth::claims::Claims;
use crate::auth::discovery::{build_http_client, discover};
use crate::auth::jwks::{algorithm_name, Jwk, JwksClient, JwksError};
use crate::errors::AuthInitError;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

/// Algorithm assumed when the provider does not list any.
const DEFAULT_SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

/// Reasons a delegated verification fails. Logged, never returned to clients.
#[derive(Debug, Error)]
pub enum DelegatedVerifyError {
    #[error("token header is malformed")]
    MalformedHeader,

    #[error("algorithm {0} is not accepted")]
    AlgorithmNotAllowed(String),

    #[error("no usable verification key")]
    NoKey,

    #[error("key set unavailable")]
    KeySet(#[from] JwksError),

    #[error("token rejected: {0}")]
    Rejected(jsonwebtoken::errors::Error),
}

/// Verifier bound to one issuer, an optional audience and the provider's keys.
pub struct DelegatedVerifier {
    issuer: String,
    audience: Option<String>,
    allowed_algorithms: Vec<Algorithm>,
    jwks: JwksClient,
}

impl DelegatedVerifier {
    /// Discover the provider at `issuer_url` and prime its key set.
    ///
    /// # Errors
    ///
    /// Returns `AuthInitError::Discovery` if provider metadata cannot be
    /// obtained and `AuthInitError::Jwks` if the key set cannot be fetched or
    /// holds no key usable with the advertised algorithms.
    #[instrument(skip_all, fields(issuer = %issuer_url))]
    pub async fn discover(
        issuer_url: &str,
        audience: Option<String>,
        jwks_cache_ttl: Duration,
    ) -> Result<Self, AuthInitError> {
        let metadata = discover(&build_http_client(), issuer_url).await?;

        let allowed_algorithms =
            allowed_algorithms(&metadata.id_token_signing_alg_values_supported);
        let jwks = JwksClient::with_ttl(metadata.jwks_uri, jwks_cache_ttl);
        jwks.force_refresh()
            .await
            .map_err(|e| AuthInitError::Jwks(e.to_string()))?;

        let keys = jwks
            .keys()
            .await
            .map_err(|e| AuthInitError::Jwks(e.to_string()))?;
        let usable = keys
            .iter()
            .any(|jwk| allowed_algorithms.iter().any(|alg| jwk.supports(*alg)));
        if !usable {
            tracing::error!(
                target: "gate.auth.oidc",
                key_count = keys.len(),
                algorithms = ?allowed_algorithms,
                "Provider key set has no key for the advertised algorithms"
            );
            return Err(AuthInitError::Jwks(
                "no published key matches the advertised algorithms".to_string(),
            ));
        }

        tracing::info!(
            target: "gate.auth.oidc",
            issuer = %metadata.issuer,
            algorithms = ?allowed_algorithms,
            audience_check = audience.is_some(),
            "Delegated verifier ready"
        );

        Ok(Self {
            issuer: metadata.issuer,
            audience,
            allowed_algorithms,
            jwks,
        })
    }

    /// Verify a compact token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns a `DelegatedVerifyError` describing the first failed check.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Claims, DelegatedVerifyError> {
        let header = decode_header(token).map_err(|e| {
            tracing::debug!(target: "gate.auth.oidc", error = %e, "Token header decode failed");
            DelegatedVerifyError::MalformedHeader
        })?;

        if !self.allowed_algorithms.contains(&header.alg) {
            return Err(DelegatedVerifyError::AlgorithmNotAllowed(algorithm_name(
                header.alg,
            )));
        }

        let candidates: Vec<Jwk> = match &header.kid {
            Some(kid) => vec![self.jwks.get_key(kid).await?],
            None => self.jwks.keys().await?,
        }
        .into_iter()
        .filter(|jwk| jwk.supports(header.alg))
        .collect();

        if candidates.is_empty() {
            return Err(DelegatedVerifyError::NoKey);
        }

        let validation = self.validation(header.alg);
        let mut last_error = DelegatedVerifyError::NoKey;
        for jwk in &candidates {
            let key = match jwk.decoding_key() {
                Ok(key) => key,
                Err(e) => {
                    tracing::debug!(target: "gate.auth.oidc", kid = ?jwk.kid, error = %e, "Skipping unusable key");
                    continue;
                }
            };

            match decode::<Claims>(token, &key, &validation) {
                Ok(data) => return Ok(data.claims),
                Err(e) => last_error = DelegatedVerifyError::Rejected(e),
            }
        }

        Err(last_error)
    }

    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_issuer(&[&self.issuer]);

        match &self.audience {
            Some(audience) => {
                validation.set_audience(&[audience]);
                validation.set_required_spec_claims(&["exp", "iss", "aud"]);
            }
            None => {
                validation.validate_aud = false;
                validation.set_required_spec_claims(&["exp", "iss"]);
            }
        }

        validation
    }
}

/// Asymmetric algorithms accepted from the provider's advertised list.
///
/// Unknown names and HMAC algorithms are dropped. An empty list means the
/// provider did not advertise any, and RS256 is assumed.
fn allowed_algorithms(advertised: &[String]) -> Vec<Algorithm> {
    if advertised.is_empty() {
        return vec![DEFAULT_SIGNING_ALGORITHM];
    }

    advertised
        .iter()
        .filter_map(|name| Algorithm::from_str(name).ok())
        .filter(|alg| !is_hmac(*alg))
        .collect()
}

fn is_hmac(alg: Algorithm) -> bool {
    matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}
