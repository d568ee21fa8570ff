//! API Gate configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output. Empty variables count as unset.
//! Secrets are kept byte-for-byte; every other value is trimmed.

use crate::auth::jwks::DEFAULT_CACHE_TTL_SECONDS;
use crate::auth::token::{DiscoveryPolicy, TokenAuthSettings};
use common::config::{ObservabilityConfig, DEFAULT_LOG_LEVEL};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5000";

/// Paths that bypass authentication unless overridden.
pub const DEFAULT_AUTH_EXCEPTIONS: &[&str] = &["/health", "/metrics"];

/// API Gate configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:5000").
    pub bind_address: String,

    /// Basic auth is enabled when both username and password are set.
    pub basic_auth_username: Option<String>,
    pub basic_auth_password: Option<SecretString>,

    /// OIDC issuer; enables delegated verification and the `iss` check.
    pub oidc_issuer_url: Option<String>,

    /// Expected token audience.
    pub client_id: Option<String>,

    /// Shared secret for HS256 tokens.
    pub client_secret: Option<SecretString>,

    /// `client_secret` is URL-safe base64.
    pub client_secret_base64: bool,

    pub discovery_policy: DiscoveryPolicy,

    pub jwks_cache_ttl_seconds: u64,

    /// Path prefixes that bypass authentication.
    pub auth_exceptions: Vec<String>,

    /// Run with no authenticators (every request admitted).
    pub insecure: bool,

    pub observability: ObservabilityConfig,

    /// Seconds to wait after a shutdown signal before closing connections.
    pub drain_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |present: bool| if present { "[REDACTED]" } else { "[UNSET]" };
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("basic_auth_username", &self.basic_auth_username)
            .field(
                "basic_auth_password",
                &redacted(self.basic_auth_password.is_some()),
            )
            .field("oidc_issuer_url", &self.oidc_issuer_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &redacted(self.client_secret.is_some()))
            .field("client_secret_base64", &self.client_secret_base64)
            .field("discovery_policy", &self.discovery_policy)
            .field("jwks_cache_ttl_seconds", &self.jwks_cache_ttl_seconds)
            .field("auth_exceptions", &self.auth_exceptions)
            .field("insecure", &self.insecure)
            .field("observability", &self.observability)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid boolean for {0}: expected true/false/1/0/yes/no, got '{1}'")]
    InvalidBool(String, String),

    #[error("Invalid OIDC discovery policy: {0}")]
    InvalidDiscoveryPolicy(String),

    #[error("Invalid JWKS cache TTL configuration: {0}")]
    InvalidJwksCacheTtl(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainSeconds(String),

    #[error(
        "No authenticator configured: set basic auth credentials, an OIDC issuer or a client secret, or set GATE_INSECURE=true"
    )]
    NoAuthenticators,

    #[error(
        "GATE_INSECURE=true cannot be combined with configured authenticators; unset the credentials or GATE_INSECURE"
    )]
    InsecureWithAuthenticators,
}

/// Fetch a variable, treating empty values as unset.
fn get_non_empty(vars: &HashMap<String, String>, key: &str) -> Option<String> {
    vars.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Fetch a secret without trimming; whitespace-only values count as unset.
fn get_secret(vars: &HashMap<String, String>, key: &str) -> Option<SecretString> {
    vars.get(key)
        .filter(|v| !v.trim().is_empty())
        .map(|v| SecretString::from(v.as_str()))
}

fn parse_bool(vars: &HashMap<String, String>, key: &str) -> Result<bool, ConfigError> {
    let Some(value) = get_non_empty(vars, key) else {
        return Ok(false);
    };
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBool(key.to_string(), value)),
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = get_non_empty(vars, "GATE_BIND_ADDRESS")
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let basic_auth_username = get_non_empty(vars, "GATE_BASIC_AUTH_USERNAME");
        let basic_auth_password = get_secret(vars, "GATE_BASIC_AUTH_PASSWORD");

        let oidc_issuer_url = get_non_empty(vars, "GATE_OIDC_ISSUER_URL");
        let client_id = get_non_empty(vars, "GATE_CLIENT_ID");
        let client_secret = get_secret(vars, "GATE_CLIENT_SECRET");
        let client_secret_base64 = parse_bool(vars, "GATE_CLIENT_SECRET_BASE64")?;

        let discovery_policy = match get_non_empty(vars, "GATE_OIDC_DISCOVERY_POLICY") {
            Some(value) => value
                .parse::<DiscoveryPolicy>()
                .map_err(ConfigError::InvalidDiscoveryPolicy)?,
            None => DiscoveryPolicy::default(),
        };

        // Parse JWKS cache TTL with validation
        let jwks_cache_ttl_seconds =
            if let Some(value_str) = get_non_empty(vars, "GATE_JWKS_CACHE_TTL_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidJwksCacheTtl(format!(
                        "GATE_JWKS_CACHE_TTL_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 {
                    return Err(ConfigError::InvalidJwksCacheTtl(
                        "GATE_JWKS_CACHE_TTL_SECONDS must be greater than 0".to_string(),
                    ));
                }

                value
            } else {
                DEFAULT_CACHE_TTL_SECONDS
            };

        // An explicitly empty list disables exceptions
        let auth_exceptions = match vars.get("GATE_AUTH_EXCEPTIONS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|prefix| !prefix.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_AUTH_EXCEPTIONS
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
        };

        let insecure = parse_bool(vars, "GATE_INSECURE")?;

        let observability = ObservabilityConfig {
            log_level: get_non_empty(vars, "GATE_LOG_LEVEL")
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            json_logs: parse_bool(vars, "GATE_LOG_JSON")?,
        };

        let drain_seconds = match get_non_empty(vars, "GATE_DRAIN_SECONDS") {
            Some(value_str) => value_str.parse().map_err(|e| {
                ConfigError::InvalidDrainSeconds(format!(
                    "GATE_DRAIN_SECONDS must be a non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?,
            None => 0,
        };

        let config = Config {
            bind_address,
            basic_auth_username,
            basic_auth_password,
            oidc_issuer_url,
            client_id,
            client_secret,
            client_secret_base64,
            discovery_policy,
            jwks_cache_ttl_seconds,
            auth_exceptions,
            insecure,
            observability,
            drain_seconds,
        };

        let has_authenticators = config.basic_auth_enabled() || config.bearer_auth_enabled();
        match (config.insecure, has_authenticators) {
            (false, false) => return Err(ConfigError::NoAuthenticators),
            (true, true) => return Err(ConfigError::InsecureWithAuthenticators),
            _ => {}
        }

        Ok(config)
    }

    /// Both basic auth username and password are configured.
    pub fn basic_auth_enabled(&self) -> bool {
        self.basic_auth_username.is_some() && self.basic_auth_password.is_some()
    }

    /// An OIDC issuer or a client secret is configured.
    pub fn bearer_auth_enabled(&self) -> bool {
        self.oidc_issuer_url.is_some() || self.client_secret.is_some()
    }

    /// Settings for the bearer token authenticator.
    pub fn token_auth_settings(&self) -> TokenAuthSettings {
        TokenAuthSettings {
            issuer_url: self.oidc_issuer_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            client_secret_base64: self.client_secret_base64,
            discovery_policy: self.discovery_policy,
            jwks_cache_ttl: Duration::from_secs(self.jwks_cache_ttl_seconds),
        }
    }
}
