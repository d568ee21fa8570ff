//! JWT utilities shared across API Gate components.
//!
//! This module provides low-level helpers used before any signature
//! verification takes place:
//! - Size limits for DoS prevention
//! - Base64url decoding for token segments and encoded secrets
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Error messages are generic and never echo token contents

use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Tokens larger than this are rejected BEFORE any base64 decoding, JSON
/// parsing or cryptographic work.
///
/// - Typical HS256 ID tokens are 200-500 bytes
/// - RS256 ID tokens with a handful of claims stay well below 2KB
/// - 8KB leaves room for large claim sets while bounding work per request
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// URL-safe base64 engine that accepts both padded and unpadded input.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during structural JWT checks.
///
/// Messages never echo token contents.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid signed structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,
}

// =============================================================================
// Functions
// =============================================================================

/// Reject tokens larger than [`MAX_JWT_SIZE_BYTES`].
///
/// # Errors
///
/// Returns `JwtValidationError::TokenTooLarge` if the token exceeds the limit.
pub fn check_token_size(token: &str) -> Result<(), JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }
    Ok(())
}

/// Decode one segment of a signed token (base64url, no padding).
///
/// # Errors
///
/// Returns `JwtValidationError::MalformedToken` if the segment is not valid
/// unpadded base64url.
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, JwtValidationError> {
    URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode token segment");
        JwtValidationError::MalformedToken
    })
}

/// Decode a URL-safe base64 value, padded or not.
///
/// Used for operator-provided material such as base64-encoded client
/// secrets, where both forms show up in practice.
///
/// # Errors
///
/// Returns `base64::DecodeError` if the content is not URL-safe base64.
pub fn decode_base64url(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_LENIENT.decode(value.trim())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_max_jwt_size_is_8kb() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
    }

    #[test]
    fn test_check_token_size_at_limit_is_accepted() {
        let token = "a".repeat(MAX_JWT_SIZE_BYTES);
        assert!(check_token_size(&token).is_ok());
    }

    #[test]
    fn test_check_token_size_over_limit_is_rejected() {
        let token = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(
            check_token_size(&token),
            Err(JwtValidationError::TokenTooLarge)
        );
    }

    #[test]
    fn test_decode_segment_unpadded() {
        let encoded = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#);
        let decoded = decode_segment(&encoded).unwrap();
        assert_eq!(decoded, br#"{"alg":"HS256"}"#);
    }

    #[test]
    fn test_decode_segment_rejects_padding_and_garbage() {
        assert_eq!(
            decode_segment("aGVsbG8="),
            Err(JwtValidationError::MalformedToken)
        );
        assert_eq!(
            decode_segment("!!!invalid!!!"),
            Err(JwtValidationError::MalformedToken)
        );
    }

    #[test]
    fn test_decode_base64url_accepts_padded_and_unpadded() {
        // Leading bytes encode to "-_-_", which only the URL-safe alphabet accepts
        let raw = b"\xfb\xff\xbfs3cr3t";
        let padded = base64::engine::general_purpose::URL_SAFE.encode(raw);
        let unpadded = URL_SAFE_NO_PAD.encode(raw);

        assert_eq!(decode_base64url(&padded).unwrap(), raw);
        assert_eq!(decode_base64url(&unpadded).unwrap(), raw);
    }

    #[test]
    fn test_decode_base64url_rejects_standard_alphabet() {
        // '+' and '/' belong to the standard alphabet only
        assert!(decode_base64url("ab+/").is_err());
    }
}
