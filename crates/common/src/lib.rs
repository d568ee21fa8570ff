//! Common utilities and types shared across API Gate components.

#![warn(clippy::pedantic)]

/// Module for common configuration
pub mod config;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (size limits, base64url decoding)
pub mod jwt;
