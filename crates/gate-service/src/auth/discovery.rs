//! OIDC provider discovery.
//!
//! Fetches `{issuer}/.well-known/openid-configuration` once at startup and
//! checks that the provider describes itself with the configured issuer.

use crate::errors::AuthInitError;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

/// Path appended to the issuer URL to locate provider metadata.
pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// Timeout for discovery and key set requests.
const HTTP_TIMEOUT_SECONDS: u64 = 10;

/// Provider metadata fields used by the delegated verifier.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,

    pub jwks_uri: String,

    /// Algorithms the provider signs ID tokens with. Empty when not listed.
    #[serde(default)]
    pub id_token_signing_alg_values_supported: Vec<String>,
}

/// Build the HTTP client shared by discovery and key set refreshes.
pub fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECONDS))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(target: "gate.auth.discovery", error = %e, "Failed to build HTTP client with custom config, using defaults");
            reqwest::Client::new()
        })
}

/// Metadata URL for `issuer_url`; a trailing slash on the issuer is ignored.
pub fn discovery_url(issuer_url: &str) -> String {
    format!("{}{}", issuer_url.trim_end_matches('/'), DISCOVERY_PATH)
}

/// Fetch and validate provider metadata.
///
/// # Errors
///
/// Returns `AuthInitError::Discovery` when the provider is unreachable,
/// answers with a non-success status, returns unparsable metadata, or
/// reports an issuer other than `issuer_url`.
#[instrument(skip(http_client))]
pub async fn discover(
    http_client: &reqwest::Client,
    issuer_url: &str,
) -> Result<ProviderMetadata, AuthInitError> {
    let url = discovery_url(issuer_url);
    tracing::debug!(target: "gate.auth.discovery", url = %url, "Fetching provider metadata");

    let response = http_client.get(&url).send().await.map_err(|e| {
        tracing::error!(target: "gate.auth.discovery", error = %e, "Failed to reach OIDC provider");
        AuthInitError::Discovery(format!("request to {url} failed"))
    })?;

    if !response.status().is_success() {
        tracing::error!(
            target: "gate.auth.discovery",
            status = %response.status(),
            "Discovery endpoint returned error"
        );
        return Err(AuthInitError::Discovery(format!(
            "{url} returned {}",
            response.status()
        )));
    }

    let metadata: ProviderMetadata = response.json().await.map_err(|e| {
        tracing::error!(target: "gate.auth.discovery", error = %e, "Failed to parse provider metadata");
        AuthInitError::Discovery("invalid provider metadata".to_string())
    })?;

    if metadata.issuer.trim_end_matches('/') != issuer_url.trim_end_matches('/') {
        tracing::error!(
            target: "gate.auth.discovery",
            expected = %issuer_url,
            actual = %metadata.issuer,
            "Provider issuer does not match configured issuer"
        );
        return Err(AuthInitError::Discovery(format!(
            "issuer mismatch: expected {issuer_url}, provider reported {}",
            metadata.issuer
        )));
    }

    tracing::info!(
        target: "gate.auth.discovery",
        issuer = %metadata.issuer,
        jwks_uri = %metadata.jwks_uri,
        "OIDC provider discovered"
    );

    Ok(metadata)
}
