//! Builder patterns for test claims construction
//!
//! Claims are produced as raw JSON so tests can shape them the way real
//! providers do (scalar or list audience, float expiry, missing fields).

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Issuer used when a test does not set one.
pub const TEST_ISSUER: &str = "https://issuer.test.example.com";

/// Client ID used when a test does not set one.
pub const TEST_CLIENT_ID: &str = "gate-test-client";

/// Builder for creating test token claims
///
/// # Example
/// ```rust,ignore
/// let claims = TestClaimsBuilder::new()
///     .issuer("https://issuer.example.com")
///     .audiences(&["gate-client", "other"])
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestClaimsBuilder {
    iss: Option<String>,
    sub: String,
    aud: Option<Value>,
    exp: Option<Value>,
    iat: i64,
    nonce: Option<String>,
}

impl TestClaimsBuilder {
    /// Create a new claims builder with defaults valid for one hour
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            iss: Some(TEST_ISSUER.to_string()),
            sub: "test-subject".to_string(),
            aud: Some(json!(TEST_CLIENT_ID)),
            exp: Some(json!((now + Duration::seconds(3600)).timestamp())),
            iat: now.timestamp(),
            nonce: None,
        }
    }

    /// Set the issuer
    pub fn issuer(mut self, issuer: &str) -> Self {
        self.iss = Some(issuer.to_string());
        self
    }

    /// Drop the issuer claim
    pub fn without_issuer(mut self) -> Self {
        self.iss = None;
        self
    }

    /// Set the subject
    pub fn subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set a single audience, serialized as a string
    pub fn audience(mut self, audience: &str) -> Self {
        self.aud = Some(json!(audience));
        self
    }

    /// Set several audiences, serialized as a list
    pub fn audiences(mut self, audiences: &[&str]) -> Self {
        self.aud = Some(json!(audiences));
        self
    }

    /// Drop the audience claim
    pub fn without_audience(mut self) -> Self {
        self.aud = None;
        self
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some(json!((Utc::now() + Duration::seconds(seconds)).timestamp()));
        self
    }

    /// Set expiration as a fractional timestamp
    pub fn expires_at_float(mut self, timestamp: f64) -> Self {
        self.exp = Some(json!(timestamp));
        self
    }

    /// Drop the expiry claim
    pub fn without_expiry(mut self) -> Self {
        self.exp = None;
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Set the nonce
    pub fn nonce(mut self, nonce: &str) -> Self {
        self.nonce = Some(nonce.to_string());
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        let mut claims = Map::new();
        if let Some(iss) = self.iss {
            claims.insert("iss".to_string(), json!(iss));
        }
        claims.insert("sub".to_string(), json!(self.sub));
        if let Some(aud) = self.aud {
            claims.insert("aud".to_string(), aud);
        }
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), exp);
        }
        claims.insert("iat".to_string(), json!(self.iat));
        if let Some(nonce) = self.nonce {
            claims.insert("nonce".to_string(), json!(nonce));
        }
        Value::Object(claims)
    }
}

impl Default for TestClaimsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
