//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Use these types
//! for every credential the gate holds: basic-auth passwords, OAuth client
//! secrets, and raw bearer tokens kept beyond a single log line.
//!
//! `SecretString` implements `Debug` with redaction, so any struct that
//! derives `Debug` and holds one stays safe to log. The value is zeroized on
//! drop and can only be read through [`ExposeSecret::expose_secret`].
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct BasicCredentials {
//!     username: String,
//!     password: SecretString,
//! }
//!
//! let creds = BasicCredentials {
//!     username: "admin".to_string(),
//!     password: SecretString::from("hunter2"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("hunter2"));
//! assert_eq!(creds.password.expose_secret(), "hunter2");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
