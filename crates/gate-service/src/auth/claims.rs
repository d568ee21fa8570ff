//! JWT claims structure.
//!
//! Contains the claims decoded from a verified bearer token. Claims live for
//! the duration of one verification call and are never stored.
//!
//! Two fields need custom (de)serialization:
//! - `aud` may be a single string or an array of strings ([`Audience`])
//! - `exp`/`iat` may be integer or floating point epoch seconds ([`NumericDate`])
//!
//! The `sub` and `nonce` fields are redacted in Debug output.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// JWT Claims structure for verified tokens.
///
/// Missing claims fall back to their defaults (empty strings, empty
/// audience, Unix epoch). A token without `exp` therefore reads as expired.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Claims {
    /// Issuer.
    pub iss: String,

    /// Subject (user or client identifier) - redacted in Debug output.
    pub sub: String,

    /// Intended audience(s).
    pub aud: Audience,

    /// Expiration time.
    pub exp: NumericDate,

    /// Issued-at time.
    pub iat: NumericDate,

    /// Nonce bound to the authentication request - redacted in Debug output.
    pub nonce: String,
}

/// Custom Debug implementation that redacts `sub` and `nonce`.
impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("nonce", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Audience
// =============================================================================

/// The `aud` claim: one or more audience identifiers.
///
/// Decodes from either a JSON string or a JSON array of strings. A
/// one-element audience encodes back to a plain string, any other size to an
/// array, so tokens written by older issuers round-trip unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Audience(Vec<String>);

impl Audience {
    /// Create an audience from a list of identifiers.
    pub fn new(values: Vec<String>) -> Self {
        Self(values)
    }

    /// Check whether `client_id` is one of the audiences.
    pub fn contains(&self, client_id: &str) -> bool {
        self.0.iter().any(|aud| aud == client_id)
    }

    /// The audiences in the order they were decoded.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Audience {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<Vec<String>> for Audience {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AudienceRepr {
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for Audience {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let audience = match Option::<AudienceRepr>::deserialize(deserializer)? {
            Some(AudienceRepr::One(aud)) => vec![aud],
            Some(AudienceRepr::Many(auds)) => auds,
            None => Vec::new(),
        };
        Ok(Self(audience))
    }
}

impl Serialize for Audience {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.as_slice() {
            [single] => serializer.serialize_str(single),
            many => many.serialize(serializer),
        }
    }
}

// =============================================================================
// NumericDate
// =============================================================================

/// A JWT NumericDate: seconds since the Unix epoch, UTC.
///
/// Accepts integer and floating point JSON numbers. Fractional seconds are
/// truncated toward zero, so `1700000000` and `1700000000.9` decode to the
/// same instant. Always encodes as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NumericDate(DateTime<Utc>);

impl NumericDate {
    /// Build from whole epoch seconds. Returns `None` when out of range.
    pub fn from_timestamp(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(Self)
    }

    /// Epoch seconds.
    pub fn timestamp(&self) -> i64 {
        self.0.timestamp()
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// True when this instant is strictly after `now`.
    pub fn is_after(&self, now: DateTime<Utc>) -> bool {
        self.0 > now
    }
}

impl Default for NumericDate {
    fn default() -> Self {
        Self(DateTime::<Utc>::UNIX_EPOCH)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumericDateRepr {
    Int(i64),
    Float(f64),
}

impl<'de> Deserialize<'de> for NumericDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let secs = match NumericDateRepr::deserialize(deserializer)? {
            NumericDateRepr::Int(secs) => secs,
            NumericDateRepr::Float(value) => {
                if !value.is_finite() {
                    return Err(de::Error::custom("NumericDate must be finite"));
                }
                // `as` saturates; the range check below rejects saturated values
                value.trunc() as i64
            }
        };
        NumericDate::from_timestamp(secs)
            .ok_or_else(|| de::Error::custom(format!("NumericDate out of range: {secs}")))
    }
}

impl Serialize for NumericDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0.timestamp())
    }
}
