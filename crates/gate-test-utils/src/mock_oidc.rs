//! Mock OIDC provider on wiremock.
//!
//! Serves a discovery document at `/.well-known/openid-configuration` and a
//! key set at `/keys`. The issuer is the mock server's own base URL, so
//! tokens must carry `iss` equal to [`MockOidcProvider::issuer`].

use crate::crypto_fixtures::TestKeypair;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Issuer URL nothing listens on.
pub const UNREACHABLE_ISSUER: &str = "http://127.0.0.1:9";

const KEYS_PATH: &str = "/keys";

/// A running mock provider.
pub struct MockOidcProvider {
    server: MockServer,
}

impl MockOidcProvider {
    /// Start a provider publishing `keys` and advertising EdDSA.
    pub async fn start(keys: &[&TestKeypair]) -> Self {
        Self::start_with_algorithms(keys, &["EdDSA"]).await
    }

    /// Start a provider advertising `algorithms` as supported signing algorithms.
    pub async fn start_with_algorithms(keys: &[&TestKeypair], algorithms: &[&str]) -> Self {
        let jwks = json!({
            "keys": keys.iter().map(|k| k.jwk_json()).collect::<Vec<Value>>(),
        });
        Self::start_with_jwks(jwks, algorithms).await
    }

    /// Start a provider serving an arbitrary key set document.
    pub async fn start_with_jwks(jwks: Value, algorithms: &[&str]) -> Self {
        let server = MockServer::start().await;

        let discovery = json!({
            "issuer": server.uri(),
            "jwks_uri": format!("{}{}", server.uri(), KEYS_PATH),
            "id_token_signing_alg_values_supported": algorithms,
        });

        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(discovery))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(KEYS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks))
            .mount(&server)
            .await;

        Self { server }
    }

    /// Start a provider whose discovery endpoint fails.
    pub async fn start_failing() -> Self {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        Self { server }
    }

    /// Issuer URL (the server's base URL).
    pub fn issuer(&self) -> String {
        self.server.uri()
    }

    /// Number of key set fetches the provider has served.
    pub async fn jwks_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == KEYS_PATH)
            .count()
    }
}
