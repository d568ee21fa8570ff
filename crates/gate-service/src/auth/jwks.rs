//! JWKS client for fetching and caching an OIDC provider's public keys.
//!
//! The client fetches the key set from the `jwks_uri` advertised in provider
//! metadata and caches it with a configurable TTL.
//!
//! # Security
//!
//! - Keys are cached to reduce load on the provider and improve latency
//! - Cache is invalidated on TTL expiry to pick up key rotations
//! - An unknown `kid` triggers one refresh, so freshly rotated keys verify
//!   without waiting for the TTL
//! - Refreshes are single-flight: callers that miss while a fetch is in
//!   progress reuse its result instead of fetching again
//! - Keys published for a use other than signing are dropped

use crate::auth::discovery::build_http_client;
use crate::observability::metrics::record_jwks_refresh;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Default cache TTL in seconds (5 minutes).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Errors from key lookups.
#[derive(Debug, Error)]
pub enum JwksError {
    /// The key set could not be fetched or parsed.
    #[error("JWKS endpoint unavailable")]
    Unavailable,

    /// No key with the requested ID, even after a refresh.
    #[error("Signing key not found")]
    KeyNotFound,
}

/// JSON Web Key from the provider's key set.
///
/// Covers RSA (`n`, `e`), EC (`crv`, `x`, `y`) and OKP Ed25519 (`crv`, `x`).
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type: "RSA", "EC" or "OKP".
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// Curve name for EC and OKP keys.
    #[serde(default)]
    pub crv: Option<String>,

    #[serde(default)]
    pub n: Option<String>,

    #[serde(default)]
    pub e: Option<String>,

    #[serde(default)]
    pub x: Option<String>,

    #[serde(default)]
    pub y: Option<String>,

    /// Algorithm the key is restricted to, if any.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use ("sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

impl Jwk {
    /// Keys without a `use` are accepted for signing.
    pub fn is_signing_key(&self) -> bool {
        self.key_use.as_deref().map_or(true, |key_use| key_use == "sig")
    }

    /// Whether this key can verify signatures made with `alg`.
    pub fn supports(&self, alg: Algorithm) -> bool {
        if let Some(key_alg) = &self.alg {
            if *key_alg != algorithm_name(alg) {
                return false;
            }
        }

        match alg {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => self.kty == "RSA",
            Algorithm::ES256 => self.kty == "EC" && self.crv.as_deref() == Some("P-256"),
            Algorithm::ES384 => self.kty == "EC" && self.crv.as_deref() == Some("P-384"),
            Algorithm::EdDSA => self.kty == "OKP" && self.crv.as_deref() == Some("Ed25519"),
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => false,
        }
    }

    /// Build a verification key from the JWK components.
    ///
    /// # Errors
    ///
    /// Returns an error if a required component is missing or not valid
    /// base64url.
    pub fn decoding_key(&self) -> Result<DecodingKey, jsonwebtoken::errors::Error> {
        use jsonwebtoken::errors::ErrorKind;

        let missing = || jsonwebtoken::errors::Error::from(ErrorKind::InvalidKeyFormat);
        match self.kty.as_str() {
            "RSA" => {
                let n = self.n.as_deref().ok_or_else(missing)?;
                let e = self.e.as_deref().ok_or_else(missing)?;
                DecodingKey::from_rsa_components(n, e)
            }
            "EC" => {
                let x = self.x.as_deref().ok_or_else(missing)?;
                let y = self.y.as_deref().ok_or_else(missing)?;
                DecodingKey::from_ec_components(x, y)
            }
            "OKP" => {
                let x = self.x.as_deref().ok_or_else(missing)?;
                DecodingKey::from_ed_components(x)
            }
            _ => Err(missing()),
        }
    }
}

/// JOSE name of an algorithm, e.g. "RS256" or "EdDSA".
pub fn algorithm_name(alg: Algorithm) -> String {
    format!("{alg:?}")
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// Cached JWKS data with expiry time.
struct CachedJwks {
    /// Signing keys in the order the provider published them.
    keys: Vec<Jwk>,

    /// When this cache entry expires.
    expires_at: Instant,

    /// Bumped on every successful fetch.
    generation: u64,
}

impl CachedJwks {
    fn is_fresh(&self) -> bool {
        self.expires_at > Instant::now()
    }

    fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid.as_deref() == Some(kid))
    }
}

fn generation_of(cached: Option<&CachedJwks>) -> Option<u64> {
    cached.map(|cached| cached.generation)
}

/// JWKS client for fetching and caching public keys.
///
/// Thread-safe; clones of the inner cache are shared across request tasks.
pub struct JwksClient {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Cached JWKS data.
    cache: Arc<RwLock<Option<CachedJwks>>>,

    /// Cache TTL duration.
    cache_ttl: Duration,

    /// Held for the duration of a fetch.
    refresh_lock: Mutex<()>,
}

impl JwksClient {
    /// Create a new JWKS client with the default TTL.
    pub fn new(jwks_url: String) -> Self {
        Self::with_ttl(jwks_url, Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS))
    }

    /// Create a new JWKS client with custom cache TTL.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL of the provider's key set
    /// * `cache_ttl` - How long to cache JWKS before refreshing
    pub fn with_ttl(jwks_url: String, cache_ttl: Duration) -> Self {
        Self {
            jwks_url,
            http_client: build_http_client(),
            cache: Arc::new(RwLock::new(None)),
            cache_ttl,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Get a JWK by key ID.
    ///
    /// Serves from cache while fresh. An expired cache or an unknown key ID
    /// triggers a refresh.
    ///
    /// # Errors
    ///
    /// Returns `JwksError::Unavailable` if JWKS cannot be fetched and
    /// `JwksError::KeyNotFound` if the key ID is unknown after refresh.
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, JwksError> {
        let seen = {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|cached| cached.is_fresh()) {
                if let Some(key) = cached.find(kid) {
                    tracing::debug!(target: "gate.auth.jwks", kid = %kid, "JWKS cache hit");
                    return Ok(key.clone());
                }
                tracing::debug!(target: "gate.auth.jwks", kid = %kid, "Key not in JWKS cache, refreshing");
            }
            generation_of(cache.as_ref())
        };

        self.refresh_since(seen).await?;

        let cache = self.cache.read().await;
        if let Some(key) = cache.as_ref().and_then(|cached| cached.find(kid)) {
            return Ok(key.clone());
        }

        tracing::warn!(target: "gate.auth.jwks", kid = %kid, "Key not found in JWKS after refresh");
        Err(JwksError::KeyNotFound)
    }

    /// All cached signing keys, refreshing first if the cache is expired.
    ///
    /// # Errors
    ///
    /// Returns `JwksError::Unavailable` if a needed refresh fails.
    pub async fn keys(&self) -> Result<Vec<Jwk>, JwksError> {
        let seen = {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|cached| cached.is_fresh()) {
                return Ok(cached.keys.clone());
            }
            generation_of(cache.as_ref())
        };

        self.refresh_since(seen).await?;

        let cache = self.cache.read().await;
        Ok(cache
            .as_ref()
            .map(|cached| cached.keys.clone())
            .unwrap_or_default())
    }

    /// Refresh unless another caller already replaced the cache generation
    /// `seen` while this one waited for the refresh lock.
    async fn refresh_since(&self, seen: Option<u64>) -> Result<(), JwksError> {
        let _guard = self.refresh_lock.lock().await;

        let current = generation_of(self.cache.read().await.as_ref());
        if current != seen {
            tracing::debug!(target: "gate.auth.jwks", "JWKS refreshed by a concurrent caller");
            return Ok(());
        }

        self.refresh_cache().await
    }

    /// Refresh the JWKS cache by fetching from the provider.
    ///
    /// Callers must hold `refresh_lock`.
    #[instrument(skip(self))]
    async fn refresh_cache(&self) -> Result<(), JwksError> {
        let result = self.fetch_keys().await;
        record_jwks_refresh(if result.is_ok() { "success" } else { "error" });
        let keys = result?;

        tracing::info!(
            target: "gate.auth.jwks",
            key_count = keys.len(),
            "JWKS cache refreshed"
        );

        let mut cache = self.cache.write().await;
        let generation = generation_of(cache.as_ref()).map_or(1, |g| g.wrapping_add(1));
        *cache = Some(CachedJwks {
            keys,
            expires_at: Instant::now() + self.cache_ttl,
            generation,
        });

        Ok(())
    }

    async fn fetch_keys(&self) -> Result<Vec<Jwk>, JwksError> {
        tracing::debug!(target: "gate.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "gate.auth.jwks", error = %e, "Failed to fetch JWKS");
                JwksError::Unavailable
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "gate.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(JwksError::Unavailable);
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "gate.auth.jwks", error = %e, "Failed to parse JWKS response");
            JwksError::Unavailable
        })?;

        let total = jwks.keys.len();
        let keys: Vec<Jwk> = jwks
            .keys
            .into_iter()
            .filter(Jwk::is_signing_key)
            .collect();
        if keys.len() < total {
            tracing::debug!(
                target: "gate.auth.jwks",
                dropped = total - keys.len(),
                "Ignoring keys not published for signing"
            );
        }

        Ok(keys)
    }

    /// Force refresh the cache.
    ///
    /// Used at startup to prime the cache and fail early when the key set is
    /// unreachable.
    pub async fn force_refresh(&self) -> Result<(), JwksError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_cache().await
    }

    /// Clear the cache.
    #[cfg(test)]
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn okp_key(kid: &str) -> serde_json::Value {
        json!({
            "kty": "OKP",
            "kid": kid,
            "crv": "Ed25519",
            "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo",
            "alg": "EdDSA",
            "use": "sig"
        })
    }

    async fn mount_jwks(server: &MockServer, keys: serde_json::Value, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/keys"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[test]
    fn test_jwk_deserialization_okp() {
        let jwk: Jwk = serde_json::from_value(okp_key("test-key-01")).unwrap();

        assert_eq!(jwk.kty, "OKP");
        assert_eq!(jwk.kid.as_deref(), Some("test-key-01"));
        assert_eq!(jwk.crv.as_deref(), Some("Ed25519"));
        assert_eq!(jwk.alg.as_deref(), Some("EdDSA"));
        assert!(jwk.is_signing_key());
        assert!(jwk.decoding_key().is_ok());
    }

    #[test]
    fn test_jwk_deserialization_rsa_minimal() {
        let jwk: Jwk = serde_json::from_value(json!({
            "kty": "RSA",
            "n": "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw",
            "e": "AQAB"
        }))
        .unwrap();

        assert!(jwk.kid.is_none());
        assert!(jwk.is_signing_key());
        assert!(jwk.supports(Algorithm::RS256));
        assert!(jwk.supports(Algorithm::PS512));
        assert!(!jwk.supports(Algorithm::EdDSA));
        assert!(jwk.decoding_key().is_ok());
    }

    #[test]
    fn test_jwk_supports_respects_declared_alg_and_curve() {
        let ed: Jwk = serde_json::from_value(okp_key("k")).unwrap();
        assert!(ed.supports(Algorithm::EdDSA));
        assert!(!ed.supports(Algorithm::ES256));

        let ec: Jwk = serde_json::from_value(json!({
            "kty": "EC", "crv": "P-256", "x": "eA", "y": "eQ", "alg": "ES256"
        }))
        .unwrap();
        assert!(ec.supports(Algorithm::ES256));
        assert!(!ec.supports(Algorithm::ES384));

        let pinned: Jwk = serde_json::from_value(json!({
            "kty": "RSA", "n": "AQAB", "e": "AQAB", "alg": "RS512"
        }))
        .unwrap();
        assert!(pinned.supports(Algorithm::RS512));
        assert!(!pinned.supports(Algorithm::RS256));
    }

    #[test]
    fn test_jwk_never_supports_hmac() {
        let jwk: Jwk = serde_json::from_value(json!({"kty": "RSA", "n": "AQAB", "e": "AQAB"})).unwrap();
        assert!(!jwk.supports(Algorithm::HS256));
    }

    #[test]
    fn test_jwk_missing_components_rejected() {
        let jwk: Jwk = serde_json::from_value(json!({"kty": "RSA", "n": "AQAB"})).unwrap();
        assert!(jwk.decoding_key().is_err());

        let jwk: Jwk = serde_json::from_value(json!({"kty": "oct", "k": "c2VjcmV0"})).unwrap();
        assert!(jwk.decoding_key().is_err());
    }

    #[test]
    fn test_jwk_encryption_key_is_not_signing_key() {
        let jwk: Jwk = serde_json::from_value(json!({"kty": "RSA", "use": "enc"})).unwrap();
        assert!(!jwk.is_signing_key());
    }

    #[test]
    fn test_algorithm_name() {
        assert_eq!(algorithm_name(Algorithm::RS256), "RS256");
        assert_eq!(algorithm_name(Algorithm::EdDSA), "EdDSA");
    }

    #[test]
    fn test_jwks_client_custom_ttl() {
        let client = JwksClient::with_ttl(
            "http://localhost:8082/keys".to_string(),
            Duration::from_secs(60),
        );
        assert_eq!(client.jwks_url, "http://localhost:8082/keys");
        assert_eq!(client.cache_ttl, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_get_key_is_served_from_cache() {
        let server = MockServer::start().await;
        mount_jwks(&server, json!([okp_key("key-1")]), 1).await;

        let client = JwksClient::new(format!("{}/keys", server.uri()));
        assert!(client.get_key("key-1").await.is_ok());
        assert!(client.get_key("key-1").await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_kid_triggers_refresh() {
        let server = MockServer::start().await;
        mount_jwks(&server, json!([okp_key("key-1")]), 2).await;

        let client = JwksClient::new(format!("{}/keys", server.uri()));
        client.force_refresh().await.unwrap();

        let result = client.get_key("rotated-key").await;
        assert!(matches!(result, Err(JwksError::KeyNotFound)));
    }

    #[tokio::test]
    async fn test_expired_cache_refreshes() {
        let server = MockServer::start().await;
        mount_jwks(&server, json!([okp_key("key-1")]), 2).await;

        let client = JwksClient::with_ttl(format!("{}/keys", server.uri()), Duration::ZERO);
        assert_eq!(client.keys().await.unwrap().len(), 1);
        assert_eq!(client.keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_drops_non_signing_keys() {
        let server = MockServer::start().await;
        let enc_key = json!({"kty": "RSA", "kid": "enc-1", "use": "enc", "n": "AQAB", "e": "AQAB"});
        mount_jwks(&server, json!([okp_key("key-1"), enc_key]), 1).await;

        let client = JwksClient::new(format!("{}/keys", server.uri()));
        let keys = client.keys().await.unwrap();

        assert_eq!(keys.len(), 1);
        assert_eq!(keys.first().unwrap().kid.as_deref(), Some("key-1"));
    }

    #[tokio::test]
    async fn test_unavailable_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/keys"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = JwksClient::new(format!("{}/keys", server.uri()));
        assert!(matches!(
            client.force_refresh().await,
            Err(JwksError::Unavailable)
        ));
        assert!(matches!(
            client.get_key("key-1").await,
            Err(JwksError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_unknown_kids_share_one_refresh() {
        let server = MockServer::start().await;
        mount_jwks(&server, json!([okp_key("key-1")]), 2).await;

        let client = JwksClient::new(format!("{}/keys", server.uri()));
        client.force_refresh().await.unwrap();

        let kids: Vec<String> = (0..16).map(|i| format!("forged-{i}")).collect();
        let results =
            futures::future::join_all(kids.iter().map(|kid| client.get_key(kid))).await;

        assert_eq!(results.len(), 16);
        assert!(results
            .iter()
            .all(|result| matches!(result, Err(JwksError::KeyNotFound))));
    }

    #[tokio::test]
    async fn test_concurrent_cold_lookups_share_one_fetch() {
        let server = MockServer::start().await;
        mount_jwks(&server, json!([okp_key("key-1")]), 1).await;

        let client = JwksClient::new(format!("{}/keys", server.uri()));
        let (a, b, c) = tokio::join!(
            client.get_key("key-1"),
            client.get_key("key-1"),
            client.keys()
        );

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(c.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let server = MockServer::start().await;
        mount_jwks(&server, json!([okp_key("key-1")]), 2).await;

        let client = JwksClient::new(format!("{}/keys", server.uri()));
        client.get_key("key-1").await.unwrap();
        client.clear_cache().await;
        client.get_key("key-1").await.unwrap();
    }
}
