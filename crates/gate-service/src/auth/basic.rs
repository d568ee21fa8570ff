//! HTTP Basic credential authenticator.
//!
//! Admits a request when its `Authorization: Basic` credentials match the
//! single configured username and password. Both comparisons run in constant
//! time and are always both evaluated.

use crate::auth::authenticator::{AuthRequest, Authenticator};
use base64::{engine::general_purpose::STANDARD, Engine};
use common::secret::{ExposeSecret, SecretString};
use ring::constant_time::verify_slices_are_equal;
use tracing::instrument;

const BASIC_SCHEME: &str = "Basic ";

/// Fixed username/password authenticator.
#[derive(Debug)]
pub struct BasicAuthenticator {
    username: String,
    password: SecretString,
}

impl BasicAuthenticator {
    pub fn new(username: String, password: SecretString) -> Self {
        Self { username, password }
    }
}

/// Decode `Basic <b64>` into raw `(username, password)` bytes.
///
/// The scheme name is matched case-insensitively; the credentials split on
/// the first `:`. No text encoding is assumed for the decoded octets.
fn parse_basic_credentials(header_value: &str) -> Option<(Vec<u8>, Vec<u8>)> {
    let scheme = header_value.get(..BASIC_SCHEME.len())?;
    if !scheme.eq_ignore_ascii_case(BASIC_SCHEME) {
        return None;
    }
    let encoded = header_value.get(BASIC_SCHEME.len()..)?;

    let decoded = STANDARD.decode(encoded).ok()?;
    let colon = decoded.iter().position(|&b| b == b':')?;
    let (username, rest) = decoded.split_at(colon);
    let password = rest.get(1..)?;

    Some((username.to_vec(), password.to_vec()))
}

#[async_trait::async_trait]
impl Authenticator for BasicAuthenticator {
    fn name(&self) -> &'static str {
        "basic"
    }

    #[instrument(skip_all, fields(path = %request.path))]
    async fn authorize(&self, request: &AuthRequest<'_>) -> bool {
        tracing::debug!(target: "gate.auth.basic", "Verifying basic credentials");

        let Some((username, password)) = request.authorization().and_then(parse_basic_credentials)
        else {
            tracing::debug!(target: "gate.auth.basic", "No usable basic credentials in request");
            return false;
        };

        let username_ok = verify_slices_are_equal(&username, self.username.as_bytes()).is_ok();
        let password_ok =
            verify_slices_are_equal(&password, self.password.expose_secret().as_bytes()).is_ok();

        if username_ok & password_ok {
            tracing::debug!(target: "gate.auth.basic", "Basic credentials verified");
            true
        } else {
            tracing::debug!(target: "gate.auth.basic", "Basic credentials did not match");
            false
        }
    }
}
