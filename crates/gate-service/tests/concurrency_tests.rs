//! Concurrent request handling.
//!
//! The gate holds no per-request state; interleaved valid and invalid
//! requests must each get their own verdict.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use futures::future::join_all;
use gate_test_utils::{sign_hs256, MockOidcProvider, TestClaimsBuilder, TestGateServer, TestKeypair};
use reqwest::StatusCode;

const SECRET: &str = "concurrency-secret";
const CLIENT_ID: &str = "gate-concurrency";

#[tokio::test]
async fn test_interleaved_tokens_get_independent_verdicts() -> Result<()> {
    let keypair = TestKeypair::from_seed(11, "concurrent-key")?;
    let provider = MockOidcProvider::start(&[&keypair]).await;
    let issuer = provider.issuer();
    let server = TestGateServer::spawn(&[
        ("GATE_OIDC_ISSUER_URL", issuer.as_str()),
        ("GATE_CLIENT_ID", CLIENT_ID),
        ("GATE_CLIENT_SECRET", SECRET),
        ("GATE_BASIC_AUTH_USERNAME", "admin"),
        ("GATE_BASIC_AUTH_PASSWORD", "hunter2"),
    ])
    .await?;

    let claims = TestClaimsBuilder::new()
        .issuer(&issuer)
        .audience(CLIENT_ID)
        .build();
    let expired = TestClaimsBuilder::new()
        .issuer(&issuer)
        .audience(CLIENT_ID)
        .expires_in(-30)
        .build();

    let cases: Vec<(Option<String>, Option<(&str, &str)>, StatusCode)> = vec![
        (Some(sign_hs256(&claims, SECRET.as_bytes())), None, StatusCode::NO_CONTENT),
        (Some(keypair.sign_token(&claims)?), None, StatusCode::NO_CONTENT),
        (Some(sign_hs256(&claims, b"wrong")), None, StatusCode::UNAUTHORIZED),
        (Some(keypair.sign_token(&expired)?), None, StatusCode::UNAUTHORIZED),
        (None, Some(("admin", "hunter2")), StatusCode::NO_CONTENT),
        (None, Some(("admin", "nope")), StatusCode::UNAUTHORIZED),
        (None, None, StatusCode::UNAUTHORIZED),
    ];

    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/auth/check", server.url());

    let requests = (0..5).flat_map(|_| cases.iter()).map(|(token, basic, expected)| {
        let mut request = client.get(&url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some((user, password)) = basic {
            request = request.basic_auth(user, Some(password));
        }
        async move { (request.send().await.map(|r| r.status()), *expected) }
    });

    for (status, expected) in join_all(requests).await {
        assert_eq!(status?, expected);
    }

    // Every token names a published key, so no request forced a refetch
    assert_eq!(provider.jwks_requests().await, 1);
    Ok(())
}
