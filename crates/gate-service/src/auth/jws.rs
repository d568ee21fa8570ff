//! Signed token parsing.
//!
//! Parses a bearer token into its protected header(s), payload and
//! signature(s) without verifying anything. Two serializations are accepted:
//!
//! - compact: `header.payload.signature`, each segment base64url (unpadded)
//! - JSON: flattened (`protected`/`header`/`signature` at the top level) or
//!   general (`signatures` array, one or more entries)
//!
//! Every signature must carry a string `alg`, taken from the protected header
//! or, failing that, the unprotected header.

use common::jwt::{check_token_size, decode_segment, JwtValidationError};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Header parameters used by the verifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwsHeader {
    pub alg: String,
    pub kid: Option<String>,
}

/// One signature over the payload.
#[derive(Debug, Clone)]
pub struct JwsSignature {
    /// Protected header exactly as transmitted (base64url). Part of the
    /// signing input.
    protected: String,

    pub header: JwsHeader,

    pub signature: Vec<u8>,
}

/// A parsed, unverified signed token.
#[derive(Debug, Clone)]
pub struct SignedToken {
    /// Payload exactly as transmitted (base64url).
    payload_b64: String,

    /// Decoded payload bytes.
    pub payload: Vec<u8>,

    pub signatures: Vec<JwsSignature>,

    compact: bool,
}

impl SignedToken {
    /// Parse a token in compact or JSON serialization.
    ///
    /// # Errors
    ///
    /// Returns `JwtValidationError::TokenTooLarge` for oversized input and
    /// `JwtValidationError::MalformedToken` for anything that is not a
    /// well-formed signed structure.
    pub fn parse(token: &str) -> Result<Self, JwtValidationError> {
        check_token_size(token)?;

        let token = token.trim();
        if token.starts_with('{') {
            Self::parse_json(token)
        } else {
            Self::parse_compact(token)
        }
    }

    fn parse_compact(token: &str) -> Result<Self, JwtValidationError> {
        let parts: Vec<&str> = token.split('.').collect();
        let [protected, payload_b64, signature] = parts.as_slice() else {
            tracing::debug!(
                target: "gate.auth.jws",
                part_count = parts.len(),
                "Compact token does not have three segments"
            );
            return Err(JwtValidationError::MalformedToken);
        };

        let header = parse_header(Some(*protected), None)?;
        let signature = JwsSignature {
            protected: (*protected).to_string(),
            header,
            signature: decode_segment(signature)?,
        };

        Ok(Self {
            payload_b64: (*payload_b64).to_string(),
            payload: decode_segment(payload_b64)?,
            signatures: vec![signature],
            compact: true,
        })
    }

    fn parse_json(token: &str) -> Result<Self, JwtValidationError> {
        let raw: RawJsonJws = serde_json::from_str(token).map_err(|e| {
            tracing::debug!(target: "gate.auth.jws", error = %e, "Invalid JSON serialization");
            JwtValidationError::MalformedToken
        })?;

        let raw_signatures = match (raw.signatures, raw.flattened) {
            (Some(signatures), flattened) if flattened.signature.is_none() => signatures,
            (None, flattened) => vec![flattened],
            _ => {
                tracing::debug!(
                    target: "gate.auth.jws",
                    "Token mixes general and flattened serialization"
                );
                return Err(JwtValidationError::MalformedToken);
            }
        };

        if raw_signatures.is_empty() {
            tracing::debug!(target: "gate.auth.jws", "Token carries no signatures");
            return Err(JwtValidationError::MalformedToken);
        }

        let signatures = raw_signatures
            .into_iter()
            .map(RawJsonSignature::into_signature)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            payload: decode_segment(&raw.payload)?,
            payload_b64: raw.payload,
            signatures,
            compact: false,
        })
    }

    /// Returns the only signature, or `None` when there are several.
    pub fn single_signature(&self) -> Option<&JwsSignature> {
        match self.signatures.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Bytes covered by `signature`: `protected || "." || payload`.
    pub fn signing_input(&self, signature: &JwsSignature) -> String {
        format!("{}.{}", signature.protected, self.payload_b64)
    }

    /// True when the token arrived in compact form.
    pub fn is_compact(&self) -> bool {
        self.compact
    }
}

#[derive(Deserialize)]
struct RawJsonJws {
    payload: String,

    #[serde(default)]
    signatures: Option<Vec<RawJsonSignature>>,

    #[serde(flatten)]
    flattened: RawJsonSignature,
}

#[derive(Deserialize)]
struct RawJsonSignature {
    #[serde(default)]
    protected: Option<String>,

    #[serde(default)]
    header: Option<Map<String, Value>>,

    #[serde(default)]
    signature: Option<String>,
}

impl RawJsonSignature {
    fn into_signature(self) -> Result<JwsSignature, JwtValidationError> {
        let signature = self.signature.ok_or_else(|| {
            tracing::debug!(target: "gate.auth.jws", "Signature entry has no signature value");
            JwtValidationError::MalformedToken
        })?;
        let header = parse_header(self.protected.as_deref(), self.header.as_ref())?;

        Ok(JwsSignature {
            protected: self.protected.unwrap_or_default(),
            header,
            signature: decode_segment(&signature)?,
        })
    }
}

/// Merge protected and unprotected header parameters, protected first.
fn parse_header(
    protected: Option<&str>,
    unprotected: Option<&Map<String, Value>>,
) -> Result<JwsHeader, JwtValidationError> {
    let protected: Map<String, Value> = match protected {
        Some(segment) if !segment.is_empty() => {
            let bytes = decode_segment(segment)?;
            serde_json::from_slice(&bytes).map_err(|e| {
                tracing::debug!(target: "gate.auth.jws", error = %e, "Protected header is not a JSON object");
                JwtValidationError::MalformedToken
            })?
        }
        _ => Map::new(),
    };

    let lookup = |name: &str| -> Option<&Value> {
        protected
            .get(name)
            .or_else(|| unprotected.and_then(|h| h.get(name)))
    };

    let alg = match lookup("alg") {
        Some(Value::String(alg)) => alg.clone(),
        _ => {
            tracing::debug!(target: "gate.auth.jws", "Header has no string alg");
            return Err(JwtValidationError::MalformedToken);
        }
    };
    let kid = match lookup("kid") {
        Some(Value::String(kid)) => Some(kid.clone()),
        None => None,
        Some(_) => {
            tracing::debug!(target: "gate.auth.jws", "Header kid is not a string");
            return Err(JwtValidationError::MalformedToken);
        }
    };

    Ok(JwsHeader { alg, kid })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use common::jwt::MAX_JWT_SIZE_BYTES;
    use serde_json::json;

    fn b64(value: &Value) -> String {
        URL_SAFE_NO_PAD.encode(value.to_string())
    }

    #[test]
    fn test_parse_compact_token() {
        let header = b64(&json!({"alg": "HS256", "typ": "JWT", "kid": "k1"}));
        let payload = b64(&json!({"sub": "user-42"}));
        let signature = URL_SAFE_NO_PAD.encode(b"sig");
        let token = format!("{header}.{payload}.{signature}");

        let parsed = SignedToken::parse(&token).unwrap();

        assert!(parsed.is_compact());
        let sig = parsed.single_signature().unwrap();
        assert_eq!(sig.header.alg, "HS256");
        assert_eq!(sig.header.kid.as_deref(), Some("k1"));
        assert_eq!(sig.signature, b"sig");
        assert_eq!(parsed.signing_input(sig), format!("{header}.{payload}"));
        assert_eq!(parsed.payload, json!({"sub": "user-42"}).to_string().as_bytes());
    }

    #[test]
    fn test_parse_compact_wrong_segment_count() {
        assert!(SignedToken::parse("only.two").is_err());
        assert!(SignedToken::parse("a.b.c.d").is_err());
        assert!(SignedToken::parse("single").is_err());
        assert!(SignedToken::parse("").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_header() {
        let payload = b64(&json!({}));

        let not_json = URL_SAFE_NO_PAD.encode("not json");
        assert!(SignedToken::parse(&format!("{not_json}.{payload}.c2ln")).is_err());

        let no_alg = b64(&json!({"typ": "JWT"}));
        assert!(SignedToken::parse(&format!("{no_alg}.{payload}.c2ln")).is_err());

        let numeric_alg = b64(&json!({"alg": 256}));
        assert!(SignedToken::parse(&format!("{numeric_alg}.{payload}.c2ln")).is_err());

        let array_header = b64(&json!(["alg", "HS256"]));
        assert!(SignedToken::parse(&format!("{array_header}.{payload}.c2ln")).is_err());
    }

    #[test]
    fn test_parse_rejects_invalid_base64_segments() {
        let header = b64(&json!({"alg": "HS256"}));
        assert!(SignedToken::parse(&format!("{header}.!!!.c2ln")).is_err());
        assert!(SignedToken::parse(&format!("{header}.e30.!!!")).is_err());
    }

    #[test]
    fn test_parse_rejects_oversized_token() {
        let token = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(
            SignedToken::parse(&token).unwrap_err(),
            JwtValidationError::TokenTooLarge
        );
    }

    #[test]
    fn test_parse_flattened_json() {
        let protected = b64(&json!({"alg": "HS256"}));
        let payload = b64(&json!({"iss": "https://issuer.test"}));
        let token = json!({
            "payload": payload,
            "protected": protected,
            "header": {"kid": "k1"},
            "signature": URL_SAFE_NO_PAD.encode(b"sig"),
        })
        .to_string();

        let parsed = SignedToken::parse(&token).unwrap();

        assert!(!parsed.is_compact());
        let sig = parsed.single_signature().unwrap();
        assert_eq!(sig.header.alg, "HS256");
        assert_eq!(sig.header.kid.as_deref(), Some("k1"));
        assert_eq!(parsed.signing_input(sig), format!("{protected}.{payload}"));
    }

    #[test]
    fn test_parse_general_json_with_two_signatures() {
        let payload = b64(&json!({"sub": "user-42"}));
        let token = json!({
            "payload": payload,
            "signatures": [
                {"protected": b64(&json!({"alg": "HS256"})), "signature": "c2lnMQ"},
                {"protected": b64(&json!({"alg": "RS256", "kid": "rsa-1"})), "signature": "c2lnMg"},
            ],
        })
        .to_string();

        let parsed = SignedToken::parse(&token).unwrap();

        assert_eq!(parsed.signatures.len(), 2);
        assert!(parsed.single_signature().is_none());
        let algs: Vec<&str> = parsed
            .signatures
            .iter()
            .map(|s| s.header.alg.as_str())
            .collect();
        assert_eq!(algs, ["HS256", "RS256"]);
    }

    #[test]
    fn test_parse_json_requires_alg_in_every_signature() {
        let token = json!({
            "payload": b64(&json!({})),
            "signatures": [
                {"protected": b64(&json!({"alg": "HS256"})), "signature": "c2lnMQ"},
                {"protected": b64(&json!({"typ": "JWT"})), "signature": "c2lnMg"},
            ],
        })
        .to_string();

        assert!(SignedToken::parse(&token).is_err());
    }

    #[test]
    fn test_parse_json_rejects_empty_or_mixed_signatures() {
        let empty = json!({"payload": "e30", "signatures": []}).to_string();
        assert!(SignedToken::parse(&empty).is_err());

        let mixed = json!({
            "payload": "e30",
            "signature": "c2ln",
            "protected": b64(&json!({"alg": "HS256"})),
            "signatures": [{"protected": b64(&json!({"alg": "HS256"})), "signature": "c2ln"}],
        })
        .to_string();
        assert!(SignedToken::parse(&mixed).is_err());
    }
}
