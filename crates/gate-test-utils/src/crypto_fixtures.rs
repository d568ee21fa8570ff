//! Deterministic cryptographic fixtures for testing
//!
//! Provides HS256 signing helpers (compact and JSON serialization) and
//! reproducible Ed25519 keypairs for provider-signed tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use ring::hmac;
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde_json::{json, Value};
use thiserror::Error;

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

fn b64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn hmac_sha256(secret: &[u8], input: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
    b64(hmac::sign(&key, input.as_bytes()).as_ref())
}

/// Sign `claims` as a compact HS256 token.
pub fn sign_hs256(claims: &Value, secret: &[u8]) -> String {
    sign_with_header(&json!({"alg": "HS256", "typ": "JWT"}), claims, secret)
}

/// Sign `claims` with HMAC-SHA256 under an arbitrary protected header.
///
/// The header's `alg` is not checked, which lets tests forge tokens that
/// claim one algorithm while being MACed with another key.
pub fn sign_with_header(header: &Value, claims: &Value, secret: &[u8]) -> String {
    let protected = b64(header.to_string().as_bytes());
    let payload = b64(claims.to_string().as_bytes());
    let signing_input = format!("{protected}.{payload}");
    let signature = hmac_sha256(secret, &signing_input);
    format!("{signing_input}.{signature}")
}

/// Sign `claims` once per secret and emit the general JSON serialization.
pub fn sign_hs256_json_general(claims: &Value, secrets: &[&[u8]]) -> String {
    let protected = b64(json!({"alg": "HS256"}).to_string().as_bytes());
    let payload = b64(claims.to_string().as_bytes());
    let signing_input = format!("{protected}.{payload}");

    let signatures: Vec<Value> = secrets
        .iter()
        .map(|secret| {
            json!({
                "protected": protected,
                "signature": hmac_sha256(secret, &signing_input),
            })
        })
        .collect();

    json!({"payload": payload, "signatures": signatures}).to_string()
}

/// Sign `claims` once and emit the flattened JSON serialization.
pub fn sign_hs256_json_flattened(claims: &Value, secret: &[u8]) -> String {
    let protected = b64(json!({"alg": "HS256"}).to_string().as_bytes());
    let payload = b64(claims.to_string().as_bytes());
    let signature = hmac_sha256(secret, &format!("{protected}.{payload}"));

    json!({
        "payload": payload,
        "protected": protected,
        "signature": signature,
    })
    .to_string()
}

/// A deterministic Ed25519 keypair standing in for an OIDC provider key.
pub struct TestKeypair {
    kid: String,
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl TestKeypair {
    /// Generate a keypair from `seed`.
    ///
    /// The same seed always produces the same keypair, ensuring test
    /// reproducibility.
    pub fn from_seed(seed: u8, kid: &str) -> Result<Self, FixtureError> {
        let mut seed_bytes = [0u8; 32];
        for (i, byte) in seed_bytes.iter_mut().enumerate() {
            *byte = seed.wrapping_mul(i as u8 + 1).wrapping_add(i as u8);
        }

        let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
            .map_err(|e| FixtureError::Crypto(format!("Failed to generate test keypair: {e:?}")))?;

        Ok(Self {
            kid: kid.to_string(),
            pkcs8: build_pkcs8_from_seed(&seed_bytes),
            public_key: key_pair.public_key().as_ref().to_vec(),
        })
    }

    /// Key ID published in the JWK and set in signed headers.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Raw 32-byte public key.
    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key
    }

    /// The public key as a JWK object.
    pub fn jwk_json(&self) -> Value {
        json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "x": b64(&self.public_key),
            "kid": self.kid,
            "alg": "EdDSA",
            "use": "sig",
        })
    }

    /// Sign `claims` as a compact EdDSA token carrying this key's ID.
    pub fn sign_token(&self, claims: &Value) -> Result<String, FixtureError> {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(self.kid.clone());
        self.sign(&header, claims)
    }

    /// Sign `claims` as a compact EdDSA token with no key ID.
    pub fn sign_token_without_kid(&self, claims: &Value) -> Result<String, FixtureError> {
        self.sign(&Header::new(Algorithm::EdDSA), claims)
    }

    fn sign(&self, header: &Header, claims: &Value) -> Result<String, FixtureError> {
        let encoding_key = EncodingKey::from_ed_der(&self.pkcs8);
        jsonwebtoken::encode(header, claims, &encoding_key)
            .map_err(|e| FixtureError::Crypto(format!("Failed to sign token: {e}")))
    }
}

/// Build PKCS#8 v1 document from Ed25519 seed
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    // SEQUENCE { INTEGER 0, SEQUENCE { OID 1.3.101.112 }, OCTET STRING { OCTET STRING seed } }
    let mut pkcs8 = vec![
        0x30, 0x2e, // SEQUENCE, 46 bytes
        0x02, 0x01, 0x00, // version 0
        0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, // Ed25519 algorithm identifier
        0x04, 0x22, 0x04, 0x20, // private key octet strings
    ];
    pkcs8.extend_from_slice(seed);
    pkcs8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_is_deterministic() {
        let a = TestKeypair::from_seed(1, "k1").unwrap();
        let b = TestKeypair::from_seed(1, "k1").unwrap();
        let c = TestKeypair::from_seed(2, "k2").unwrap();

        assert_eq!(a.public_key_bytes(), b.public_key_bytes());
        assert_ne!(a.public_key_bytes(), c.public_key_bytes());
        assert_eq!(a.public_key_bytes().len(), 32);
    }

    #[test]
    fn test_signed_token_has_kid_and_three_segments() {
        let keypair = TestKeypair::from_seed(3, "provider-key").unwrap();
        let token = keypair.sign_token(&json!({"sub": "x"})).unwrap();

        assert_eq!(token.split('.').count(), 3);
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::EdDSA);
        assert_eq!(header.kid.as_deref(), Some("provider-key"));
    }

    #[test]
    fn test_hs256_signature_is_verifiable() {
        let token = sign_hs256(&json!({"sub": "x"}), b"s3cret");
        let (signing_input, signature) = token.rsplit_once('.').unwrap();

        let key = hmac::Key::new(hmac::HMAC_SHA256, b"s3cret");
        let signature = URL_SAFE_NO_PAD.decode(signature).unwrap();
        assert!(hmac::verify(&key, signing_input.as_bytes(), &signature).is_ok());
    }

    #[test]
    fn test_json_general_carries_every_signature() {
        let token = sign_hs256_json_general(&json!({"sub": "x"}), &[b"a".as_slice(), b"b".as_slice()]);
        let value: Value = serde_json::from_str(&token).unwrap();

        assert_eq!(value["signatures"].as_array().unwrap().len(), 2);
    }
}
